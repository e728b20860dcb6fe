use std::{collections::HashMap, panic, thread};

use log::{debug, info};

use crate::game::OwnedGame;
use crate::player::PlayerId;
use crate::prober;
use crate::steam::{DetailService, LibraryService, SteamError};

pub const MIN_PERCENTAGE: f64 = 0.01;
pub const MAX_PERCENTAGE: f64 = 1.0;

/// Upper bound for libraries fetched at the same time.
pub const MAX_CONCURRENCY: u8 = 64;

/// One game name seen across the queried libraries, with everyone who owns it.
#[derive(Debug, Clone)]
pub struct GameAggregate {
    game: OwnedGame,
    owners: Vec<PlayerId>,
}

impl GameAggregate {
    pub fn new(game: OwnedGame, first_owner: PlayerId) -> Self {
        Self {
            game,
            owners: vec![first_owner],
        }
    }

    pub(crate) fn add_owner(&mut self, owner: PlayerId) {
        self.owners.push(owner);
    }

    pub fn name(&self) -> &str {
        &self.game.name
    }

    pub fn app_id(&self) -> u32 {
        self.game.app_id
    }

    /// The first record seen for this name.
    pub fn game(&self) -> &OwnedGame {
        &self.game
    }

    pub fn owners(&self) -> &[PlayerId] {
        &self.owners
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }
}

/// Merges libraries into per-name aggregates.
#[derive(Debug, Default)]
pub struct CommonsBuilder {
    index: HashMap<String, usize>,
    games: Vec<GameAggregate>,
}

impl CommonsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_library(&mut self, owner: PlayerId, library: Vec<OwnedGame>) {
        for game in library {
            if let Some(&i) = self.index.get(&game.name) {
                self.games[i].add_owner(owner);
                continue;
            }

            self.index.insert(game.name.clone(), self.games.len());
            self.games.push(GameAggregate::new(game, owner));
        }
    }

    /// Freezes the aggregates, dropping everything only one player owns.
    pub fn build(self) -> CommonGames {
        CommonGames::from(
            self.games
                .into_iter()
                .filter(|g| g.owner_count() > 1)
                .collect::<Vec<_>>(),
        )
    }
}

/// Read-only view of aggregated games, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct CommonGames {
    games: Vec<GameAggregate>,
}

impl CommonGames {
    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&GameAggregate> {
        self.games.iter().find(|g| g.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameAggregate> {
        self.games.iter()
    }

    fn retain(&mut self, keep: impl FnMut(&GameAggregate) -> bool) {
        self.games.retain(keep);
    }
}

impl From<Vec<GameAggregate>> for CommonGames {
    fn from(games: Vec<GameAggregate>) -> Self {
        Self { games }
    }
}

/// Clamps a share of players into `[0.01, 1.0]`. NaN counts as the minimum.
pub fn clamp_percentage(minimum_percentage: f64) -> f64 {
    minimum_percentage.max(MIN_PERCENTAGE).min(MAX_PERCENTAGE)
}

pub fn minimum_owners(minimum_percentage: f64, player_count: usize) -> usize {
    (clamp_percentage(minimum_percentage) * player_count as f64).ceil() as usize
}

/// Finds games shared by a set of players.
pub struct CommonsFinder<'a> {
    library: &'a (dyn LibraryService + Sync),
    details: &'a (dyn DetailService + Sync),
    concurrency: usize,
}

impl<'a> CommonsFinder<'a> {
    pub fn new(
        library: &'a (dyn LibraryService + Sync),
        details: &'a (dyn DetailService + Sync),
    ) -> Self {
        Self {
            library,
            details,
            concurrency: 1,
        }
    }

    /// Number of libraries fetched at the same time. `1` fetches one after another.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn fetch_library(&self, player: PlayerId) -> Result<Vec<OwnedGame>, SteamError> {
        info!("retrieving games for player {player}");
        self.library.owned_games(player)
    }

    /// Libraries in the same order as `players`. The first failure in that order wins.
    fn fetch_libraries(&self, players: &[PlayerId]) -> Result<Vec<Vec<OwnedGame>>, SteamError> {
        let mut libraries = Vec::with_capacity(players.len());

        if self.concurrency == 1 {
            for &player in players {
                libraries.push(self.fetch_library(player)?);
            }
            return Ok(libraries);
        }

        for chunk in players.chunks(self.concurrency) {
            // Thread scope waits for every fetch in the chunk before we look at results.
            let results: Vec<_> = thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|&player| scope.spawn(move || self.fetch_library(player)))
                    .collect();

                handles.into_iter().map(|h| h.join()).collect()
            });

            for result in results {
                match result {
                    Ok(library) => libraries.push(library?),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
        }

        Ok(libraries)
    }

    /// Maps every game owned by at least two of `players` to its owners.
    pub fn aggregate(&self, players: &[PlayerId]) -> Result<CommonGames, SteamError> {
        info!("finding commons for {} players", players.len());

        let libraries = self.fetch_libraries(players)?;

        let mut builder = CommonsBuilder::new();
        for (&player, library) in players.iter().zip(libraries) {
            builder.add_library(player, library);
        }

        Ok(builder.build())
    }

    /// [`aggregate`](Self::aggregate), keeping games owned by at least
    /// `minimum_percentage` of `players` and, if asked, only multiplayer ones.
    pub fn filter(
        &self,
        players: &[PlayerId],
        minimum_percentage: f64,
        multiplayer_only: bool,
    ) -> Result<CommonGames, SteamError> {
        let minimum_owners = minimum_owners(minimum_percentage, players.len());
        debug!("games need at least {minimum_owners} of {} owners", players.len());

        let mut commons = self.aggregate(players)?;
        let candidates = commons.len();

        // Probe only what already passed the owner threshold.
        commons.retain(|game| {
            game.owner_count() >= minimum_owners
                && (!multiplayer_only || prober::is_multiplayer(self.details, game.app_id()))
        });

        debug!("{} of {candidates} shared games left after filtering", commons.len());
        Ok(commons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSteam;

    fn ids(raw: &[u64]) -> Vec<PlayerId> {
        raw.iter().copied().map(PlayerId).collect()
    }

    fn owner_counts(commons: &CommonGames) -> Vec<(&str, usize)> {
        commons.iter().map(|g| (g.name(), g.owner_count())).collect()
    }

    #[test]
    fn percentage_is_clamped() {
        assert_eq!(clamp_percentage(0.0), MIN_PERCENTAGE);
        assert_eq!(clamp_percentage(-3.0), MIN_PERCENTAGE);
        assert_eq!(clamp_percentage(f64::NAN), MIN_PERCENTAGE);
        assert_eq!(clamp_percentage(0.5), 0.5);
        assert_eq!(clamp_percentage(1.0), MAX_PERCENTAGE);
        assert_eq!(clamp_percentage(7.0), MAX_PERCENTAGE);
    }

    #[test]
    fn minimum_owners_rounds_up() {
        assert_eq!(minimum_owners(0.34, 3), 2);
        assert_eq!(minimum_owners(1.0, 3), 3);
        assert_eq!(minimum_owners(0.5, 4), 2);
        assert_eq!(minimum_owners(0.0, 5), 1);
        assert_eq!(minimum_owners(2.0, 5), 5);
    }

    #[test]
    fn builder_keeps_first_record_per_name() {
        let mut builder = CommonsBuilder::new();
        builder.add_library(PlayerId(1), vec![OwnedGame::new("Portal".to_string(), 400, 15)]);
        builder.add_library(PlayerId(2), vec![OwnedGame::new("Portal".to_string(), 401, 99)]);

        let commons = builder.build();
        let portal = commons.get("Portal").unwrap();
        assert_eq!(portal.app_id(), 400);
        assert_eq!(portal.game().playtime_forever, 15);
        assert_eq!(portal.owners(), &[PlayerId(1), PlayerId(2)]);
    }

    #[test]
    fn aggregate_drops_single_owner_games() {
        let steam = FakeSteam::new()
            .with_library(1, &[(10, "Counter-Strike"), (570, "Dota 2"), (400, "Portal")])
            .with_library(2, &[(570, "Dota 2"), (440, "Team Fortress 2")])
            .with_library(3, &[(570, "Dota 2"), (400, "Portal")]);
        let finder = CommonsFinder::new(&steam, &steam);

        let commons = finder.aggregate(&ids(&[1, 2, 3])).unwrap();

        assert_eq!(owner_counts(&commons), vec![("Dota 2", 3), ("Portal", 2)]);
        assert!(commons.get("Counter-Strike").is_none());
        assert!(commons.get("Team Fortress 2").is_none());
        assert_eq!(
            commons.get("Portal").unwrap().owners(),
            &[PlayerId(1), PlayerId(3)]
        );
    }

    #[test]
    fn no_shared_games() {
        let steam = FakeSteam::new()
            .with_library(1, &[(10, "Counter-Strike")])
            .with_library(2, &[(440, "Team Fortress 2")]);
        let finder = CommonsFinder::new(&steam, &steam);

        assert!(finder.aggregate(&ids(&[1, 2])).unwrap().is_empty());
    }

    #[test]
    fn duplicate_players_count_twice() {
        let steam = FakeSteam::new().with_library(1, &[(10, "Counter-Strike")]);
        let finder = CommonsFinder::new(&steam, &steam);

        let commons = finder.aggregate(&ids(&[1, 1])).unwrap();

        assert_eq!(owner_counts(&commons), vec![("Counter-Strike", 2)]);
        assert_eq!(steam.fetched(), ids(&[1, 1]));
    }

    #[test]
    fn failed_fetch_aborts_aggregation() {
        let steam = FakeSteam::new()
            .with_library(1, &[(10, "Counter-Strike")])
            .with_failing_player(2)
            .with_library(3, &[(10, "Counter-Strike")]);
        let finder = CommonsFinder::new(&steam, &steam);

        let err = finder.aggregate(&ids(&[1, 2, 3])).unwrap_err();

        assert!(matches!(err, SteamError::UnexpectedStatus { status: 500, .. }));
        assert_eq!(steam.fetched(), ids(&[1, 2]));
    }

    #[test]
    fn concurrent_fetch_matches_sequential() {
        let steam = FakeSteam::new()
            .with_library(1, &[(1, "A"), (2, "B"), (3, "C")])
            .with_library(2, &[(3, "C"), (2, "B")])
            .with_library(3, &[(4, "D"), (2, "B"), (3, "C")])
            .with_library(4, &[(4, "D"), (1, "A")])
            .with_library(5, &[(3, "C")]);
        let players = ids(&[1, 2, 3, 4, 5]);

        let sequential = CommonsFinder::new(&steam, &steam)
            .aggregate(&players)
            .unwrap();
        let concurrent = CommonsFinder::new(&steam, &steam)
            .with_concurrency(3)
            .aggregate(&players)
            .unwrap();

        assert_eq!(owner_counts(&sequential), owner_counts(&concurrent));
        for game in sequential.iter() {
            assert_eq!(concurrent.get(game.name()).unwrap().owners(), game.owners());
        }
    }

    #[test]
    fn concurrent_fetch_reports_failure() {
        let steam = FakeSteam::new()
            .with_library(1, &[(10, "Counter-Strike")])
            .with_failing_player(2);
        let finder = CommonsFinder::new(&steam, &steam).with_concurrency(4);

        assert!(finder.aggregate(&ids(&[1, 2])).is_err());
    }

    #[test]
    fn full_ownership_required_by_default() {
        let steam = FakeSteam::new()
            .with_library(1, &[(1, "A"), (2, "B")])
            .with_library(2, &[(1, "A")])
            .with_library(3, &[(1, "A"), (2, "B")]);
        let finder = CommonsFinder::new(&steam, &steam);

        let commons = finder.filter(&ids(&[1, 2, 3]), 1.0, false).unwrap();

        assert_eq!(owner_counts(&commons), vec![("A", 3)]);
        assert!(steam.probed().is_empty());
    }

    #[test]
    fn lower_percentage_keeps_partial_ownership() {
        let steam = FakeSteam::new()
            .with_library(1, &[(1, "A"), (2, "B")])
            .with_library(2, &[(1, "A")])
            .with_library(3, &[(1, "A"), (2, "B")]);
        let finder = CommonsFinder::new(&steam, &steam);

        let commons = finder.filter(&ids(&[1, 2, 3]), 0.34, false).unwrap();

        assert_eq!(owner_counts(&commons), vec![("A", 3), ("B", 2)]);
    }

    #[test]
    fn multiplayer_only_drops_single_player_games() {
        let steam = FakeSteam::new()
            .with_library(1, &[(550, "Left 4 Dead 2"), (400, "Portal"), (730, "CS2")])
            .with_library(2, &[(550, "Left 4 Dead 2"), (400, "Portal"), (730, "CS2")])
            .with_categories(550, &["Multi-player", "Co-op"])
            .with_categories(400, &["Single-player"])
            .with_status(730, 404);
        let finder = CommonsFinder::new(&steam, &steam);

        let commons = finder.filter(&ids(&[1, 2]), 1.0, true).unwrap();

        assert_eq!(owner_counts(&commons), vec![("Left 4 Dead 2", 2)]);
        assert_eq!(steam.probed(), vec![550, 400, 730]);
    }

    #[test]
    fn multiplayer_games_still_need_enough_owners() {
        let steam = FakeSteam::new()
            .with_library(1, &[(550, "Left 4 Dead 2"), (570, "Dota 2")])
            .with_library(2, &[(550, "Left 4 Dead 2"), (570, "Dota 2")])
            .with_library(3, &[(570, "Dota 2")])
            .with_categories(550, &["Multi-player"])
            .with_categories(570, &["Multi-player"]);
        let finder = CommonsFinder::new(&steam, &steam);

        let commons = finder.filter(&ids(&[1, 2, 3]), 1.0, true).unwrap();

        assert_eq!(owner_counts(&commons), vec![("Dota 2", 3)]);
        // Left 4 Dead 2 fails the owner threshold and is never probed.
        assert_eq!(steam.probed(), vec![570]);
    }
}
