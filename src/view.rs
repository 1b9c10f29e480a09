// UI regions and the sink the controller draws through
use crate::models::HistoryEntry;
use crate::render::RenderedResults;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Upload,
    Processing,
    Results,
}

/// The fixed set of named regions a front end binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Screen,
    Progress,
    Status,
    Error,
    Results,
    History,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Screen,
        Region::Progress,
        Region::Status,
        Region::Error,
        Region::Results,
        Region::History,
    ];

    /// Event name the desktop webview listens on
    pub fn event_name(self) -> &'static str {
        match self {
            Region::Screen => "tabscribe://screen",
            Region::Progress => "tabscribe://progress",
            Region::Status => "tabscribe://status",
            Region::Error => "tabscribe://error",
            Region::Results => "tabscribe://results",
            Region::History => "tabscribe://history",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Uploading,
    Pending,
    Processing,
    LoadingResults,
    Done,
}

impl ProgressStage {
    pub fn percent(self) -> u8 {
        match self {
            ProgressStage::Uploading => 10,
            ProgressStage::Pending => 30,
            ProgressStage::Processing => 60,
            ProgressStage::LoadingResults => 90,
            ProgressStage::Done => 100,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ProgressStage::Uploading => "Uploading audio...",
            ProgressStage::Pending => "Waiting in queue...",
            ProgressStage::Processing => "Transcribing...",
            ProgressStage::LoadingResults => "Loading results...",
            ProgressStage::Done => "Done",
        }
    }
}

/// Everything the controller can ask a front end to show
pub trait ViewSink: Send {
    fn show_screen(&mut self, screen: Screen);
    fn set_progress(&mut self, stage: ProgressStage);
    /// Transient status text, e.g. an unrecognized job status shown verbatim
    fn set_status(&mut self, message: &str);
    fn show_error(&mut self, message: &str);
    fn clear_error(&mut self);
    fn render_results(&mut self, results: &RenderedResults);
    fn render_history(&mut self, entries: &[HistoryEntry]);
}
