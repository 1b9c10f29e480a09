// Tauri shell: a webview view sink plus the managed controller session
use crate::api::HttpTranscriptionApi;
use crate::commands::{
    history::{clear_history, list_history, remove_history_entry, select_history_entry},
    options::{get_instruments, get_options, set_instrument, set_tempo, set_tuning},
    settings::{get_settings, update_settings},
    transcription::{
        clear_selection, download_result, get_results, get_session, pick_audio_file, reset_view,
        select_file, submit_transcription,
    },
};
use crate::config::load_settings;
use crate::controller::AppController;
use crate::history::{HistoryStore, LoadOutcome};
use crate::logging::cleanup_old_logs;
use crate::models::{HistoryEntry, Settings, DEFAULT_SERVER_URL};
use crate::poller::SessionEvent;
use crate::render::RenderedResults;
use crate::utils::get_history_json_path;
use crate::view::{ProgressStage, Region, Screen, ViewSink};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager};
use tokio::sync::mpsc::UnboundedReceiver;

pub type DesktopController = AppController<HttpTranscriptionApi, TauriView>;

/// Progress event payload for the frontend
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub percent: u8,
    pub message: &'static str,
}

/// Pushes every region update to the webview as a `tabscribe://` event
pub struct TauriView {
    app: AppHandle,
}

impl TauriView {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit<S: Serialize + Clone>(&self, region: Region, payload: S) {
        if let Err(e) = self.app.emit(region.event_name(), payload) {
            warn!("Failed to emit {}: {}", region.event_name(), e);
        }
    }
}

impl ViewSink for TauriView {
    fn show_screen(&mut self, screen: Screen) {
        self.emit(Region::Screen, screen);
    }

    fn set_progress(&mut self, stage: ProgressStage) {
        self.emit(
            Region::Progress,
            ProgressEvent {
                stage,
                percent: stage.percent(),
                message: stage.message(),
            },
        );
    }

    fn set_status(&mut self, message: &str) {
        self.emit(Region::Status, message);
    }

    fn show_error(&mut self, message: &str) {
        self.emit(Region::Error, Some(message));
    }

    fn clear_error(&mut self) {
        self.emit(Region::Error, None::<&str>);
    }

    fn render_results(&mut self, results: &RenderedResults) {
        self.emit(Region::Results, results);
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.emit(Region::History, entries);
    }
}

/// The controller plus the epoch of the event pump allowed to drive it.
/// Rebuilding after a settings change bumps the epoch so the old pump exits.
pub struct Session {
    epoch: u64,
    pub controller: DesktopController,
}

impl Session {
    /// Changes whenever the controller is replaced, so work started on one
    /// controller is never finished on another
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

pub struct DesktopState {
    app: AppHandle,
    session: tokio::sync::Mutex<Session>,
}

impl DesktopState {
    pub fn new(app: &AppHandle, settings: &Settings) -> Result<Arc<Self>, String> {
        let (controller, events) = build_controller(app, settings)?;
        let state = Arc::new(Self {
            app: app.clone(),
            session: tokio::sync::Mutex::new(Session { epoch: 0, controller }),
        });
        state.spawn_pump(0, events);
        Ok(state)
    }

    pub async fn session(&self) -> tokio::sync::MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Replace the controller after the server or timing settings changed.
    /// Any job in flight is cancelled.
    pub async fn rebuild(self: &Arc<Self>, settings: &Settings) -> Result<(), String> {
        let (controller, events) = build_controller(&self.app, settings)?;
        let epoch = {
            let mut session = self.session.lock().await;
            session.epoch += 1;
            session.controller = controller;
            session.epoch
        };
        info!("Controller rebuilt for {}", settings.server_url);
        self.spawn_pump(epoch, events);
        Ok(())
    }

    fn spawn_pump(self: &Arc<Self>, epoch: u64, mut events: UnboundedReceiver<SessionEvent>) {
        let state = Arc::clone(self);
        tauri::async_runtime::spawn(async move {
            while let Some(event) = events.recv().await {
                let fetch = {
                    let mut session = state.session.lock().await;
                    if session.epoch != epoch {
                        break;
                    }
                    session.controller.apply_event(event)
                };
                let Some(fetch) = fetch else {
                    continue;
                };

                // Unlocked so reset and other commands stay responsive
                let outcome = fetch.send().await;
                let mut session = state.session.lock().await;
                if session.epoch != epoch {
                    break;
                }
                let _ = session.controller.finish_fetch(outcome);
            }
            debug!("Event pump {} stopped", epoch);
        });
    }
}

fn build_controller(
    app: &AppHandle,
    settings: &Settings,
) -> Result<(DesktopController, UnboundedReceiver<SessionEvent>), String> {
    let api = HttpTranscriptionApi::from_settings(settings)?;
    let (history, outcome) = HistoryStore::open(get_history_json_path());
    if let LoadOutcome::Discarded(reason) = outcome {
        warn!("History discarded on load: {}", reason);
    }

    Ok(AppController::new(
        Arc::new(api),
        TauriView::new(app.clone()),
        history,
        settings,
    ))
}

fn focus_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window("main") {
        let _ = window.show();
        let _ = window.unminimize();
        let _ = window.set_focus();
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if let Err(e) = crate::initialize_app_data() {
        eprintln!("Failed to initialize app data: {}", e);
    }

    tauri::Builder::default()
        .plugin(crate::logging::plugin())
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            // Another instance tried to launch - focus the existing window
            focus_main_window(app);
        }))
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let removed = cleanup_old_logs();
            if removed > 0 {
                info!("Removed {} old log file(s)", removed);
            }

            let mut settings = load_settings();
            let state = match DesktopState::new(app.handle(), &settings) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Invalid server URL in settings ({}), using {}", e, DEFAULT_SERVER_URL);
                    settings.server_url = DEFAULT_SERVER_URL.to_string();
                    DesktopState::new(app.handle(), &settings)?
                }
            };
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Transcription commands
            pick_audio_file,
            select_file,
            clear_selection,
            submit_transcription,
            get_session,
            get_results,
            reset_view,
            download_result,
            // Options commands
            get_instruments,
            get_options,
            set_instrument,
            set_tuning,
            set_tempo,
            // History commands
            list_history,
            select_history_entry,
            remove_history_entry,
            clear_history,
            // Settings commands
            get_settings,
            update_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
