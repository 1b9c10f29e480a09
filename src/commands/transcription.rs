// Transcription command handlers: file selection, submission and results
use super::AppState;
use crate::error::TranscriptionError;
use crate::models::{Job, ResultFormat};
use crate::poller::JobPhase;
use crate::render::RenderedResults;
use crate::selection::StagedFile;
use crate::view::Screen;
use log::{debug, info};
use serde::Serialize;
use tauri::AppHandle;
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;
use tokio::sync::oneshot;

/// Snapshot of the controller for a freshly loaded webview
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: JobPhase,
    pub screen: Screen,
    pub staged_file: Option<StagedFile>,
    pub job: Option<Job>,
}

/// Open the native file picker filtered to supported audio and stage the pick
#[tauri::command]
pub async fn pick_audio_file(app: AppHandle, state: AppState<'_>) -> Result<Option<StagedFile>, String> {
    let (tx, rx) = oneshot::channel();
    app.dialog()
        .file()
        .add_filter("Audio", &["mp3", "wav", "ogg"])
        .pick_file(move |picked| {
            let _ = tx.send(picked);
        });

    let picked = rx.await.map_err(|_| "File dialog closed unexpectedly".to_string())?;
    let Some(picked) = picked else {
        debug!("File dialog cancelled");
        return Ok(None);
    };
    let path = picked.into_path().map_err(|e| e.to_string())?;

    let mut session = state.session().await;
    session
        .controller
        .select_file(&path)
        .map(Some)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn select_file(state: AppState<'_>, path: String) -> Result<StagedFile, String> {
    let mut session = state.session().await;
    session.controller.select_file(&path).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn clear_selection(state: AppState<'_>) -> Result<(), String> {
    let mut session = state.session().await;
    session.controller.clear_selection();
    Ok(())
}

/// Upload the staged file; progress and results arrive as events
#[tauri::command]
pub async fn submit_transcription(state: AppState<'_>) -> Result<String, String> {
    let (epoch, upload) = {
        let mut session = state.session().await;
        let upload = session.controller.begin_submit().map_err(|e| e.to_string())?;
        (session.epoch(), upload)
    };

    let outcome = upload.send().await;
    let mut session = state.session().await;
    if session.epoch() != epoch {
        return Err(TranscriptionError::Cancelled.to_string());
    }
    let job_id = session.controller.finish_submit(outcome).map_err(|e| e.to_string())?;

    info!("Submitted transcription job {}", job_id);
    Ok(job_id)
}

#[tauri::command]
pub async fn get_session(state: AppState<'_>) -> Result<SessionSnapshot, String> {
    let session = state.session().await;
    let controller = &session.controller;
    Ok(SessionSnapshot {
        phase: controller.phase(),
        screen: controller.screen(),
        staged_file: controller.staged_file().cloned(),
        job: controller.current_job().cloned(),
    })
}

#[tauri::command]
pub async fn get_results(state: AppState<'_>) -> Result<Option<RenderedResults>, String> {
    let session = state.session().await;
    Ok(session.controller.last_results().cloned())
}

/// Cancel any job in flight and return to the upload screen
#[tauri::command]
pub async fn reset_view(state: AppState<'_>) -> Result<(), String> {
    let mut session = state.session().await;
    session.controller.reset();
    Ok(())
}

/// Save a result document and open it with the system's default app
#[tauri::command]
pub async fn download_result(
    app: AppHandle,
    state: AppState<'_>,
    format: ResultFormat,
    job_id: Option<String>,
) -> Result<String, String> {
    let path = {
        let mut session = state.session().await;
        session
            .controller
            .download_result(job_id.as_deref(), format)
            .await
            .map_err(|e| e.to_string())?
    };

    let path = path.to_string_lossy().into_owned();
    app.opener()
        .open_path(path.as_str(), None::<&str>)
        .map_err(|e| format!("Saved to {} but could not open it: {}", path, e))?;
    Ok(path)
}
