// Steam's GetOwnedGames returns nothing but an empty `response` object for
// private profiles, so every player has to have "Game details" set to public.

use std::process::ExitCode;

use log::info;
use steam_commons::{
    cli::{self, CliArgs},
    commons::CommonsFinder,
    config::{Settings, API_KEY_ENV},
    logging, report,
    steam::SteamClient,
};

fn main() -> ExitCode {
    let args = CliArgs::from_matches(&cli::build_command().get_matches());

    let settings = match Settings::resolve(args, std::env::var(API_KEY_ENV).ok()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(settings.log_level, settings.log_file.as_deref()) {
        eprintln!("ERROR: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        "{} players, {}% ownership, multiplayer only: {}",
        settings.players.len(),
        settings.percentage,
        settings.multiplayer_only
    );

    let client = SteamClient::new(&settings.api_key);
    let finder = CommonsFinder::new(&client, &client).with_concurrency(settings.concurrency);

    match report::format(
        &finder,
        &settings.players,
        settings.minimum_percentage(),
        settings.multiplayer_only,
    ) {
        Ok(report) => {
            if !report.is_empty() {
                println!("{report}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
