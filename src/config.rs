// Settings persistence with partial update support
use crate::file_manager::{read_json_file_or_default, write_json_file};
use crate::models::Settings;
use crate::utils::{get_results_dir, get_settings_json_path};
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsParams {
    pub server_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub backstop_timeout_secs: Option<u64>,
    pub result_timeout_secs: Option<u64>,
    pub upload_timeout_secs: Option<u64>,
    pub completion_delay_ms: Option<u64>,
    pub error_return_delay_ms: Option<u64>,
    pub download_path: Option<String>,
}

/// Load settings, falling back to defaults when the file is missing or unreadable
pub fn load_settings() -> Settings {
    load_settings_from(&get_settings_json_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    read_json_file_or_default(path).unwrap_or_else(|e| {
        warn!("Using default settings: {}", e);
        Settings::default()
    })
}

pub fn update_settings(params: UpdateSettingsParams) -> Result<Settings, String> {
    let path = get_settings_json_path();
    let mut settings = load_settings_from(&path);
    apply_update(&mut settings, params)?;
    write_json_file(&path, &settings)?;

    debug!("Updated settings: {:?}", settings);
    Ok(settings)
}

pub fn apply_update(settings: &mut Settings, params: UpdateSettingsParams) -> Result<(), String> {
    if let Some(server_url) = params.server_url {
        let trimmed = server_url.trim();
        url::Url::parse(trimmed).map_err(|e| format!("Invalid server URL {}: {}", trimmed, e))?;
        settings.server_url = trimmed.to_string();
    }
    if let Some(poll_interval_ms) = params.poll_interval_ms {
        if poll_interval_ms == 0 {
            return Err("Poll interval must be greater than zero".to_string());
        }
        settings.poll_interval_ms = poll_interval_ms;
    }
    if let Some(backstop_timeout_secs) = params.backstop_timeout_secs {
        settings.backstop_timeout_secs = backstop_timeout_secs;
    }
    if let Some(result_timeout_secs) = params.result_timeout_secs {
        settings.result_timeout_secs = result_timeout_secs;
    }
    if let Some(upload_timeout_secs) = params.upload_timeout_secs {
        settings.upload_timeout_secs = upload_timeout_secs;
    }
    if let Some(completion_delay_ms) = params.completion_delay_ms {
        settings.completion_delay_ms = completion_delay_ms;
    }
    if let Some(error_return_delay_ms) = params.error_return_delay_ms {
        settings.error_return_delay_ms = error_return_delay_ms;
    }
    if let Some(download_path) = params.download_path {
        settings.download_path = if download_path.is_empty() {
            None
        } else {
            Some(download_path)
        };
    }
    Ok(())
}

/// Folder that receives downloaded pdf/musicxml results
pub fn results_dir(settings: &Settings) -> PathBuf {
    settings
        .download_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(get_results_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_take_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"server_url": "http://10.0.0.5:8000"}"#).unwrap();
        assert_eq!(settings.server_url, "http://10.0.0.5:8000");
        assert_eq!(settings.poll_interval_ms, 2000);
        assert_eq!(settings.backstop_timeout_secs, 30);
        assert_eq!(settings.result_timeout_secs, 10);
        assert_eq!(settings.upload_timeout_secs, 120);
    }

    #[test]
    fn test_partial_update() {
        let mut settings = Settings::default();
        apply_update(
            &mut settings,
            UpdateSettingsParams {
                server_url: Some(" https://tabs.example.com ".to_string()),
                download_path: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(settings.server_url, "https://tabs.example.com");
        assert_eq!(settings.download_path, None);
        assert_eq!(settings.poll_interval_ms, 2000);
    }

    #[test]
    fn test_update_rejects_bad_values() {
        let mut settings = Settings::default();
        let bad_url = UpdateSettingsParams {
            server_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(apply_update(&mut settings, bad_url).is_err());

        let zero_interval = UpdateSettingsParams {
            poll_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(apply_update(&mut settings, zero_interval).is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_corrupt_settings_file_falls_back() {
        let dir = std::env::temp_dir().join(format!("tabscribe-settings-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();

        assert_eq!(load_settings_from(&path), Settings::default());
    }
}
