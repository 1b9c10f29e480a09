// Tauri command handlers - one file per domain
pub mod history;
pub mod options;
pub mod settings;
pub mod transcription;

use crate::desktop::DesktopState;
use std::sync::Arc;
use tauri::State;

/// Managed state as seen by command handlers
pub type AppState<'a> = State<'a, Arc<DesktopState>>;
