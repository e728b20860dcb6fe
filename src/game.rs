use json::JsonValue;

use crate::steam::SteamError;

/// One entry of a player's library as returned by `GetOwnedGames`.
#[derive(Debug, Clone)]
pub struct OwnedGame {
    pub name: String,
    pub app_id: u32,
    pub playtime_forever: u32,
    /// The untouched record as JSON text, kept for anything we don't interpret ourselves.
    pub raw: String,
}

impl OwnedGame {
    pub fn new(name: String, app_id: u32, playtime_forever: u32) -> Self {
        let mut record = JsonValue::new_object();
        record["appid"] = app_id.into();
        record["name"] = name.as_str().into();
        record["playtime_forever"] = playtime_forever.into();

        Self {
            name,
            app_id,
            playtime_forever,
            raw: record.dump(),
        }
    }

    pub fn from_json(record: &JsonValue) -> Result<Self, SteamError> {
        let app_id = record["appid"]
            .as_u32()
            .ok_or_else(|| SteamError::MissingField("appid".to_string()))?;

        let name = record["name"]
            .as_str()
            .ok_or_else(|| SteamError::MissingField("name".to_string()))?
            .to_string();

        Ok(Self {
            name,
            app_id,
            playtime_forever: record["playtime_forever"].as_u32().unwrap_or(0),
            raw: record.dump(),
        })
    }

    /// The full record, including fields like `img_icon_url` or `rtime_last_played`.
    pub fn metadata(&self) -> JsonValue {
        json::parse(&self.raw).unwrap_or(JsonValue::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub description: Option<String>,
}

/// The parts of a store `appdetails` payload we look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDetails {
    pub app_id: u32,
    pub name: Option<String>,
    pub categories: Option<Vec<Category>>,
}

impl AppDetails {
    pub fn from_json(app_id: u32, data: &JsonValue) -> Self {
        let categories = data["categories"].is_array().then(|| {
            data["categories"]
                .members()
                .map(|c| Category {
                    description: c["description"].as_str().map(str::to_string),
                })
                .collect()
        });

        Self {
            app_id,
            name: data["name"].as_str().map(str::to_string),
            categories,
        }
    }

    /// `Portal (400)` when the store sent a name, `app 400` otherwise.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{name} ({})", self.app_id),
            None => format!("app {}", self.app_id),
        }
    }

    pub fn has_category(&self, description: &str) -> bool {
        self.categories.as_ref().is_some_and(|categories| {
            categories
                .iter()
                .any(|c| c.description.as_deref() == Some(description))
        })
    }
}
