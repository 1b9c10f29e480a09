pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod file_manager;
pub mod form;
pub mod headless;
pub mod history;
pub mod logging;
pub mod models;
pub mod poller;
pub mod render;
pub mod selection;
pub mod utils;
pub mod view;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
pub mod desktop;

#[cfg(test)]
mod testing;

use file_manager::initialize_json_file;
use log::debug;
use models::{HistoryEntry, Settings};
use utils::{get_history_json_path, get_settings_json_path, initialize_data_directories};

pub fn initialize_app_data() -> Result<(), String> {
    // Create directory structure
    initialize_data_directories()?;

    // Initialize JSON files with defaults
    initialize_json_file(&get_history_json_path(), &Vec::<HistoryEntry>::new())?;
    initialize_json_file(&get_settings_json_path(), &Settings::default())?;

    debug!("App data initialized");
    Ok(())
}

#[cfg(feature = "desktop")]
pub use desktop::run;
