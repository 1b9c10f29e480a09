// Settings command handlers
use super::AppState;
use crate::config::{self, UpdateSettingsParams};
use crate::models::Settings;
use log::info;

/// Get current settings from the JSON file
#[tauri::command]
pub fn get_settings() -> Result<Settings, String> {
    Ok(config::load_settings())
}

/// Update settings with partial update support. The controller is rebuilt so
/// a new server URL or timing takes effect for the next job.
#[tauri::command]
pub async fn update_settings(
    state: AppState<'_>,
    settings: UpdateSettingsParams,
) -> Result<Settings, String> {
    let updated = config::update_settings(settings)?;
    state.rebuild(&updated).await?;

    info!("Settings updated, server is {}", updated.server_url);
    Ok(updated)
}
