// Instrument, tuning and tempo command handlers
use super::AppState;
use crate::models::{FormOptions, Instrument, InstrumentInfo, Tuning};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct OptionsState {
    pub options: FormOptions,
    pub tunings: &'static [Tuning],
    pub valid: bool,
}

#[tauri::command]
pub fn get_instruments() -> Vec<InstrumentInfo> {
    Instrument::ALL.iter().copied().map(InstrumentInfo::from).collect()
}

#[tauri::command]
pub async fn get_options(state: AppState<'_>) -> Result<OptionsState, String> {
    let session = state.session().await;
    let form = session.controller.form();
    Ok(OptionsState {
        options: form.get_options(),
        tunings: form.tunings(),
        valid: form.is_valid(),
    })
}

/// Switch instrument; returns the new tuning set with its first entry selected
#[tauri::command]
pub async fn set_instrument(state: AppState<'_>, instrument: Instrument) -> Result<OptionsState, String> {
    let mut session = state.session().await;
    session.controller.set_instrument(instrument);
    let form = session.controller.form();
    Ok(OptionsState {
        options: form.get_options(),
        tunings: form.tunings(),
        valid: form.is_valid(),
    })
}

#[tauri::command]
pub async fn set_tuning(state: AppState<'_>, tuning: String) -> Result<FormOptions, String> {
    let mut session = state.session().await;
    session.controller.set_tuning(&tuning).map_err(|e| e.to_string())?;
    Ok(session.controller.options())
}

/// Store the raw tempo text; returns whether the form is now valid
#[tauri::command]
pub async fn set_tempo(state: AppState<'_>, tempo: String) -> Result<bool, String> {
    let mut session = state.session().await;
    session.controller.set_tempo(tempo);
    Ok(session.controller.form().is_valid())
}
