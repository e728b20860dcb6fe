//! Settings resolution.
//!
//! Values come from the command line first, then `STEAM_API_KEY` (key only),
//! then the YAML config file, then defaults. A config file looks like:
//!
//! ```yaml
//! api_key_file: steam_api_key.secret
//! players:
//!   - 76561197960287930
//!   - "76561197960287931"
//! percentage: 60
//! multiplayer_only: true
//! concurrency: 4
//! log_level: info
//! log_file: steam-commons.log
//! ```

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::LevelFilter;
use thiserror::Error;
use yaml_rust2::{Yaml, YamlLoader};

use crate::cli::CliArgs;
use crate::commons::MAX_CONCURRENCY;
use crate::player::PlayerId;

pub const API_KEY_ENV: &str = "STEAM_API_KEY";
pub const DEFAULT_PERCENTAGE: u8 = 100;
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: yaml_rust2::ScanError,
    },

    #[error("invalid value for `{key}`: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("missing Steam API key: pass --api-key, --api-key-file, set STEAM_API_KEY or add `api_key` to the config file")]
    MissingApiKey,

    #[error("no Steam IDs given")]
    NoPlayers,
}

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub players: Vec<PlayerId>,
    pub percentage: Option<u8>,
    pub multiplayer_only: Option<bool>,
    pub concurrency: Option<usize>,
    pub log_level: Option<LevelFilter>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&text).map_err(|e| match e {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let docs = YamlLoader::load_from_str(text).map_err(|source| ConfigError::Yaml {
            path: PathBuf::new(),
            source,
        })?;

        // An empty file is a valid, empty config.
        let Some(doc) = docs.first() else {
            return Ok(Self::default());
        };

        if !doc.is_null() && doc.as_hash().is_none() {
            return Err(ConfigError::InvalidValue {
                key: "<root>",
                message: "expected a mapping".to_string(),
            });
        }

        let percentage = match optional(doc, "percentage") {
            None => None,
            Some(value) => {
                let n = value.as_i64().ok_or_else(|| invalid("percentage", "expected an integer"))?;
                if !(1..=100).contains(&n) {
                    return Err(invalid("percentage", "must be between 1 and 100"));
                }
                Some(n as u8)
            }
        };

        let concurrency = match optional(doc, "concurrency") {
            None => None,
            Some(value) => {
                let n = value.as_i64().ok_or_else(|| invalid("concurrency", "expected an integer"))?;
                if !(1..=i64::from(MAX_CONCURRENCY)).contains(&n) {
                    return Err(invalid(
                        "concurrency",
                        &format!("must be between 1 and {MAX_CONCURRENCY}"),
                    ));
                }
                Some(n as usize)
            }
        };

        let multiplayer_only = match optional(doc, "multiplayer_only") {
            None => None,
            Some(value) => Some(
                value
                    .as_bool()
                    .ok_or_else(|| invalid("multiplayer_only", "expected true or false"))?,
            ),
        };

        let log_level = match optional(doc, "log_level") {
            None => None,
            Some(value) => {
                let level = string(value, "log_level")?;
                Some(
                    LevelFilter::from_str(&level)
                        .map_err(|_| invalid("log_level", "expected off, error, warn, info, debug or trace"))?,
                )
            }
        };

        Ok(Self {
            api_key: optional(doc, "api_key").map(|v| string(v, "api_key")).transpose()?,
            api_key_file: optional(doc, "api_key_file")
                .map(|v| string(v, "api_key_file").map(PathBuf::from))
                .transpose()?,
            players: players(doc)?,
            percentage,
            multiplayer_only,
            concurrency,
            log_level,
            log_file: optional(doc, "log_file")
                .map(|v| string(v, "log_file").map(PathBuf::from))
                .transpose()?,
        })
    }
}

fn invalid(key: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        message: message.to_string(),
    }
}

/// `None` for absent keys and explicit nulls.
fn optional<'a>(doc: &'a Yaml, key: &str) -> Option<&'a Yaml> {
    let value = &doc[key];
    (!value.is_badvalue() && !value.is_null()).then_some(value)
}

fn string(value: &Yaml, key: &'static str) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(key, "expected a string"))
}

/// Steam IDs may be written as integers or as quoted strings.
fn players(doc: &Yaml) -> Result<Vec<PlayerId>, ConfigError> {
    let Some(value) = optional(doc, "players") else {
        return Ok(Vec::new());
    };

    let list = value
        .as_vec()
        .ok_or_else(|| invalid("players", "expected a list of Steam IDs"))?;

    list.iter()
        .map(|entry| match entry {
            Yaml::Integer(n) if *n >= 0 => Ok(PlayerId(*n as u64)),
            Yaml::String(s) => s
                .parse::<PlayerId>()
                .map_err(|e| invalid("players", &e.to_string())),
            other => Err(invalid("players", &format!("not a Steam ID: {other:?}"))),
        })
        .collect()
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub players: Vec<PlayerId>,
    pub percentage: u8,
    pub multiplayer_only: bool,
    pub concurrency: usize,
    pub log_level: LevelFilter,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Reads the config file named on the command line (if any) and merges.
    pub fn resolve(cli: CliArgs, env_api_key: Option<String>) -> Result<Self, ConfigError> {
        let file = match &cli.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Self::merge(cli, env_api_key, file)
    }

    pub fn merge(
        cli: CliArgs,
        env_api_key: Option<String>,
        file: FileConfig,
    ) -> Result<Self, ConfigError> {
        let api_key = match (cli.api_key, cli.api_key_file) {
            (Some(key), _) => Some(key),
            (None, Some(path)) => Some(read_api_key(&path)?),
            (None, None) => match (env_api_key, file.api_key, file.api_key_file) {
                (Some(key), _, _) => Some(key),
                (None, Some(key), _) => Some(key),
                (None, None, Some(path)) => Some(read_api_key(&path)?),
                (None, None, None) => None,
            },
        };

        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let players = if cli.players.is_empty() {
            file.players
        } else {
            cli.players
        };

        if players.is_empty() {
            return Err(ConfigError::NoPlayers);
        }

        let log_level = match cli.verbosity {
            0 => file.log_level.unwrap_or(DEFAULT_LOG_LEVEL),
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        };

        Ok(Self {
            api_key,
            players,
            percentage: cli.percentage.or(file.percentage).unwrap_or(DEFAULT_PERCENTAGE),
            multiplayer_only: cli.multiplayer_only.or(file.multiplayer_only).unwrap_or(false),
            concurrency: cli.concurrency.or(file.concurrency).unwrap_or(1),
            log_level,
            log_file: cli.log_file.or(file.log_file),
        })
    }

    /// The percentage as a share of players, e.g. `0.6` for 60.
    pub fn minimum_percentage(&self) -> f64 {
        f64::from(self.percentage) / 100.0
    }
}

fn read_api_key(path: &Path) -> Result<String, ConfigError> {
    read_to_string(path)
        .map(|key| key.trim().to_string())
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
}
