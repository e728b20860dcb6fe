use std::{path::PathBuf, str::FromStr};

use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command, ValueHint};

use crate::commons::MAX_CONCURRENCY;
use crate::player::PlayerId;

pub fn build_command() -> Command {
    command!().args([
        Arg::new("player_ids")
            .value_name("STEAM_ID")
            .num_args(1..)
            .value_parser(PlayerId::from_str)
            .help("SteamID64s of the players to compare (space separated)."),
        Arg::new("api_key")
            .short('k')
            .long("api-key")
            .alias("key")
            .value_name("KEY")
            .help("Steam Web API key. Can be obtained at https://steamcommunity.com/dev/apikey"),
        Arg::new("api_key_file")
            .long("api-key-file")
            .conflicts_with("api_key")
            .value_hint(ValueHint::FilePath)
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help("Path to a file containing a Steam API key."),
        Arg::new("config")
            .short('c')
            .long("config-file")
            .alias("config")
            .value_hint(ValueHint::FilePath)
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help("Path to the YAML config file."),
        Arg::new("percentage")
            .short('p')
            .long("percentage")
            .value_name("PERCENT")
            .value_parser(value_parser!(u8).range(1..=100))
            .help("Percentage of players that have to own a game for it to be considered common [default: 100]"),
        Arg::new("multiplayer_only")
            .long("multiplayer-only")
            .action(ArgAction::SetTrue)
            .overrides_with("no_multiplayer_only")
            .help("Only list games with a Multi-player store category."),
        Arg::new("no_multiplayer_only")
            .long("no-multiplayer-only")
            .action(ArgAction::SetTrue)
            .overrides_with("multiplayer_only")
            .help("List single-player games too (default)."),
        Arg::new("concurrency")
            .short('j')
            .long("concurrency")
            .value_name("N")
            .value_parser(value_parser!(u8).range(1..=i64::from(MAX_CONCURRENCY)))
            .help("Number of libraries fetched at the same time [default: 1]"),
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .help("Log more (-v for info, -vv for debug)."),
        Arg::new("log_file")
            .long("log-file")
            .value_hint(ValueHint::FilePath)
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help("Also write the log to this file."),
    ])
}

/// Everything the command line can say. `None` means "not given".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CliArgs {
    pub players: Vec<PlayerId>,
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub percentage: Option<u8>,
    pub multiplayer_only: Option<bool>,
    pub concurrency: Option<usize>,
    pub verbosity: u8,
    pub log_file: Option<PathBuf>,
}

impl CliArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let multiplayer_only = if matches.get_flag("multiplayer_only") {
            Some(true)
        } else if matches.get_flag("no_multiplayer_only") {
            Some(false)
        } else {
            None
        };

        Self {
            players: matches
                .get_many::<PlayerId>("player_ids")
                .map(|ids| ids.copied().collect())
                .unwrap_or_default(),
            api_key: matches.get_one::<String>("api_key").cloned(),
            api_key_file: matches.get_one::<PathBuf>("api_key_file").cloned(),
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            percentage: matches.get_one::<u8>("percentage").copied(),
            multiplayer_only,
            concurrency: matches.get_one::<u8>("concurrency").map(|&n| usize::from(n)),
            verbosity: matches.get_count("verbose"),
            log_file: matches.get_one::<PathBuf>("log_file").cloned(),
        }
    }
}
