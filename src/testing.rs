//! In-memory Steam for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::game::{AppDetails, Category, OwnedGame};
use crate::player::PlayerId;
use crate::steam::{DetailService, LibraryService, SteamError};

enum Details {
    Categories(Vec<&'static str>),
    NoCategories,
    Status(u16),
}

#[derive(Default)]
pub struct FakeSteam {
    libraries: HashMap<PlayerId, Vec<OwnedGame>>,
    failing_players: HashSet<PlayerId>,
    details: HashMap<u32, Details>,
    fetched: Mutex<Vec<PlayerId>>,
    probed: Mutex<Vec<u32>>,
}

impl FakeSteam {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `player` a library of `(app id, name)` pairs.
    pub fn with_library(mut self, player: u64, games: &[(u32, &str)]) -> Self {
        let games = games
            .iter()
            .map(|&(app_id, name)| OwnedGame::new(name.to_string(), app_id, 0))
            .collect();
        self.libraries.insert(PlayerId(player), games);
        self
    }

    pub fn with_failing_player(mut self, player: u64) -> Self {
        self.failing_players.insert(PlayerId(player));
        self
    }

    pub fn with_categories(mut self, app_id: u32, categories: &[&'static str]) -> Self {
        self.details
            .insert(app_id, Details::Categories(categories.to_vec()));
        self
    }

    pub fn without_categories(mut self, app_id: u32) -> Self {
        self.details.insert(app_id, Details::NoCategories);
        self
    }

    pub fn with_status(mut self, app_id: u32, status: u16) -> Self {
        self.details.insert(app_id, Details::Status(status));
        self
    }

    pub fn fetched(&self) -> Vec<PlayerId> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn probed(&self) -> Vec<u32> {
        self.probed.lock().unwrap().clone()
    }
}

impl LibraryService for FakeSteam {
    fn owned_games(&self, player: PlayerId) -> Result<Vec<OwnedGame>, SteamError> {
        self.fetched.lock().unwrap().push(player);

        if self.failing_players.contains(&player) {
            return Err(SteamError::UnexpectedStatus {
                status: 500,
                url: "fake://owned-games",
            });
        }

        self.libraries
            .get(&player)
            .cloned()
            .ok_or(SteamError::LibraryUnavailable(player))
    }
}

impl DetailService for FakeSteam {
    fn app_details(&self, app_id: u32) -> Result<AppDetails, SteamError> {
        self.probed.lock().unwrap().push(app_id);

        let categories = match self.details.get(&app_id) {
            Some(Details::Categories(categories)) => Some(
                categories
                    .iter()
                    .map(|&description| Category {
                        description: Some(description.to_string()),
                    })
                    .collect(),
            ),
            Some(Details::NoCategories) => None,
            Some(&Details::Status(status)) => {
                return Err(SteamError::UnexpectedStatus {
                    status,
                    url: "fake://appdetails",
                })
            }
            None => return Err(SteamError::MissingField(app_id.to_string())),
        };

        Ok(AppDetails {
            app_id,
            name: None,
            categories,
        })
    }
}
