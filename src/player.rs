use std::{fmt, num::ParseIntError, str::FromStr};

use thiserror::Error;

/// A SteamID64 identifying one player account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

#[derive(Debug, Error)]
#[error("invalid Steam ID {input:?}: {source}")]
pub struct ParsePlayerIdError {
    input: String,
    #[source]
    source: ParseIntError,
}

impl FromStr for PlayerId {
    type Err = ParsePlayerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|source| ParsePlayerIdError {
                input: s.to_string(),
                source,
            })
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
