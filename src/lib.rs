//! Finds games on Steam that are common to a group of players.
//!
//! [`commons::CommonsFinder`] fetches every player's library through a
//! [`steam::LibraryService`], merges them by game name and filters the result
//! by ownership share and, optionally, the store's "Multi-player" category.
//! [`report::format`] turns that into one line per game.

pub mod cli;
pub mod commons;
pub mod config;
pub mod game;
pub mod logging;
pub mod player;
pub mod prober;
pub mod report;
pub mod steam;
#[cfg(test)]
mod testing;
