//! Steam Web API and store API access.
//!
//! The pipeline only ever talks to Steam through [`LibraryService`] and
//! [`DetailService`], so tests can swap in an in-memory implementation.

use json::JsonValue;
use log::debug;
use reqwest::{blocking::RequestBuilder, StatusCode};
use thiserror::Error;

use crate::game::{AppDetails, OwnedGame};
use crate::player::PlayerId;

const OWNED_GAMES_URL: &str = "https://api.steampowered.com/IPlayerService/GetOwnedGames/v0001/";
const APP_DETAILS_URL: &str = "https://store.steampowered.com/api/appdetails";

#[derive(Debug, Error)]
pub enum SteamError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status code {status} from {url}")]
    UnexpectedStatus { status: u16, url: &'static str },

    #[error("malformed JSON in response: {0}")]
    Json(#[from] json::Error),

    #[error("response is missing `{0}`")]
    MissingField(String),

    #[error("library of player {0} is not visible (private profile or unknown Steam ID)")]
    LibraryUnavailable(PlayerId),

    #[error("store has no details for app {0}")]
    AppUnavailable(u32),
}

/// Source of owned-game lists.
pub trait LibraryService {
    fn owned_games(&self, player: PlayerId) -> Result<Vec<OwnedGame>, SteamError>;
}

/// Source of per-app store details.
pub trait DetailService {
    fn app_details(&self, app_id: u32) -> Result<AppDetails, SteamError>;
}

pub struct SteamClient {
    http: reqwest::blocking::Client,
    api_key: String,
}

impl SteamClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_key: api_key.trim().to_string(),
        }
    }
}

impl LibraryService for SteamClient {
    fn owned_games(&self, player: PlayerId) -> Result<Vec<OwnedGame>, SteamError> {
        let steam_id = player.to_string();

        // No `appids_filter` means "all games".
        let request = self.http.get(OWNED_GAMES_URL).query(&[
            ("key", self.api_key.as_str()),
            ("steamid", steam_id.as_str()),
            ("include_appinfo", "true"),
            ("include_played_free_games", "true"),
            ("include_free_sub", "false"),
            ("format", "json"),
        ]);

        let body = send(request, OWNED_GAMES_URL)?;
        parse_owned_games(player, &body)
    }
}

impl DetailService for SteamClient {
    fn app_details(&self, app_id: u32) -> Result<AppDetails, SteamError> {
        let app_id_param = app_id.to_string();
        let request = self
            .http
            .get(APP_DETAILS_URL)
            .query(&[("appids", app_id_param.as_str())]);

        let body = send(request, APP_DETAILS_URL)?;
        parse_app_details(app_id, &body)
    }
}

fn send(request: RequestBuilder, url: &'static str) -> Result<String, SteamError> {
    let response = request
        .send()
        .map_err(|source| SteamError::Request { url, source })?;

    let status = response.status();
    debug!("{url} answered with {status}");

    if status != StatusCode::OK {
        return Err(SteamError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        });
    }

    response
        .text()
        .map_err(|source| SteamError::Request { url, source })
}

/// Parses a `GetOwnedGames` body into the player's library.
pub fn parse_owned_games(player: PlayerId, body: &str) -> Result<Vec<OwnedGame>, SteamError> {
    let parsed = json::parse(body)?;
    let response = &parsed["response"];

    if !response.is_object() {
        return Err(SteamError::MissingField("response".to_string()));
    }

    // Steam answers private profiles with an empty `response` object.
    if !response["games"].is_array() {
        return Err(SteamError::LibraryUnavailable(player));
    }

    response["games"].members().map(OwnedGame::from_json).collect()
}

/// Parses an `appdetails` body. The payload is keyed by the app id as a string.
pub fn parse_app_details(app_id: u32, body: &str) -> Result<AppDetails, SteamError> {
    let parsed = json::parse(body)?;
    let key = app_id.to_string();
    let entry: &JsonValue = &parsed[key.as_str()];

    if entry.is_null() {
        return Err(SteamError::MissingField(key));
    }

    if entry["success"].as_bool() == Some(false) {
        return Err(SteamError::AppUnavailable(app_id));
    }

    let data = &entry["data"];
    if !data.is_object() {
        return Err(SteamError::MissingField(format!("{key}.data")));
    }

    Ok(AppDetails::from_json(app_id, data))
}
