use crate::commons::{CommonGames, CommonsFinder, GameAggregate};
use crate::player::PlayerId;
use crate::steam::SteamError;

/// Runs the filter and renders one `name (owners/players)` line per game,
/// most owned first.
pub fn format(
    finder: &CommonsFinder,
    players: &[PlayerId],
    minimum_percentage: f64,
    multiplayer_only: bool,
) -> Result<String, SteamError> {
    let commons = finder.filter(players, minimum_percentage, multiplayer_only)?;
    Ok(render(&commons, players.len()))
}

pub fn render(commons: &CommonGames, total_players: usize) -> String {
    let mut games: Vec<&GameAggregate> = commons.iter().collect();

    // Stable, so equally owned games keep their first-seen order.
    games.sort_by(|a, b| b.owner_count().cmp(&a.owner_count()));

    games
        .iter()
        .map(|g| format!("{} ({}/{})", g.name(), g.owner_count(), total_players))
        .collect::<Vec<_>>()
        .join("\n")
}
