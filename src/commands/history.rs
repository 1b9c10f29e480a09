// History command handlers
use super::AppState;
use crate::error::TranscriptionError;
use crate::models::HistoryEntry;

#[tauri::command]
pub async fn list_history(state: AppState<'_>) -> Result<Vec<HistoryEntry>, String> {
    let session = state.session().await;
    Ok(session.controller.history().to_vec())
}

/// Re-open a past job; results arrive through the `tabscribe://results` event
#[tauri::command]
pub async fn select_history_entry(state: AppState<'_>, entry_id: String) -> Result<(), String> {
    let (epoch, fetch) = {
        let mut session = state.session().await;
        let fetch = session.controller.begin_history(&entry_id).map_err(|e| e.to_string())?;
        (session.epoch(), fetch)
    };

    let outcome = fetch.send().await;
    let mut session = state.session().await;
    if session.epoch() != epoch {
        return Err(TranscriptionError::Cancelled.to_string());
    }
    session.controller.finish_fetch(outcome).map_err(|e| e.to_string())
}

/// Remove every entry for `job_id`; returns how many were removed
#[tauri::command]
pub async fn remove_history_entry(state: AppState<'_>, job_id: String) -> Result<usize, String> {
    let mut session = state.session().await;
    Ok(session.controller.remove_history(&job_id))
}

#[tauri::command]
pub async fn clear_history(state: AppState<'_>) -> Result<(), String> {
    let mut session = state.session().await;
    session.controller.clear_history();
    Ok(())
}
