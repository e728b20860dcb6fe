use log::warn;

use crate::steam::{DetailService, SteamError};

pub const MULTIPLAYER_CATEGORY: &str = "Multi-player";

/// Checks if a game is multiplayer capable.
///
/// Never fails: any error on the way is logged and counts as "not multiplayer".
pub fn is_multiplayer(details: &dyn DetailService, app_id: u32) -> bool {
    match details.app_details(app_id) {
        Ok(app) if app.categories.is_some() => app.has_category(MULTIPLAYER_CATEGORY),
        Ok(app) => {
            warn!("no categories listed for {}", app.label());
            false
        }
        Err(SteamError::UnexpectedStatus { status, .. }) => {
            warn!("unexpected status code for app {app_id}: {status}");
            false
        }
        Err(e) => {
            warn!("can not retrieve app details for app {app_id}: {e}");
            false
        }
    }
}
