//! Command-line front end.
//!
//! Runs the same controller as the desktop shell, drawing to the terminal
//! instead of a webview.

use crate::api::HttpTranscriptionApi;
use crate::config::{apply_update, load_settings, UpdateSettingsParams};
use crate::controller::AppController;
use crate::history::{HistoryStore, LoadOutcome};
use crate::models::{HistoryEntry, Instrument, ResultFormat};
use crate::poller::JobPhase;
use crate::render::RenderedResults;
use crate::utils::get_history_json_path;
use crate::view::{ProgressStage, Screen, ViewSink};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "tabscribe", version, about = "Turn audio recordings into tablature")]
pub struct Cli {
    /// Audio file to transcribe (mp3, wav or ogg)
    pub file: Option<PathBuf>,

    /// Transcription server base URL
    #[arg(long)]
    pub server: Option<String>,

    #[arg(short, long)]
    pub instrument: Option<Instrument>,

    /// Tuning id for the chosen instrument, e.g. drop-d
    #[arg(short, long)]
    pub tuning: Option<String>,

    /// Tempo in BPM (1-300)
    #[arg(long)]
    pub tempo: Option<String>,

    /// Re-open a past result by history entry id instead of uploading
    #[arg(long, conflicts_with = "file")]
    pub history: Option<String>,

    /// List past uploads and exit
    #[arg(long)]
    pub list_history: bool,

    /// Also save the result as json, pdf or musicxml
    #[arg(long)]
    pub save: Option<ResultFormat>,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Terminal view: progress and errors go to stderr, results to stdout
#[derive(Debug, Default)]
pub struct ConsoleView {
    last_progress: Option<ProgressStage>,
}

impl ViewSink for ConsoleView {
    fn show_screen(&mut self, screen: Screen) {
        if screen == Screen::Upload {
            self.last_progress = None;
        }
    }

    fn set_progress(&mut self, stage: ProgressStage) {
        if self.last_progress != Some(stage) {
            eprintln!("[{:>3}%] {}", stage.percent(), stage.message());
            self.last_progress = Some(stage);
        }
    }

    fn set_status(&mut self, message: &str) {
        eprintln!("       {}", message);
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("error: {}", message);
    }

    fn clear_error(&mut self) {}

    fn render_results(&mut self, results: &RenderedResults) {
        println!("{}", results.to_text());
    }

    fn render_history(&mut self, _entries: &[HistoryEntry]) {}
}

fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No past uploads");
        return;
    }
    for entry in entries {
        println!(
            "{}  {}  {}  {} / {} / {} bpm  job {}",
            entry.id,
            entry.timestamp,
            entry.name,
            entry.metadata.instrument,
            entry.metadata.tuning,
            entry.metadata.tempo,
            entry.job_id
        );
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init_console_logging(cli.verbose);

    if let Err(e) = crate::initialize_app_data() {
        error!("Failed to initialize app data: {}", e);
        return ExitCode::FAILURE;
    }

    let mut settings = load_settings();
    if let Some(server) = cli.server.clone() {
        let params = UpdateSettingsParams {
            server_url: Some(server),
            ..UpdateSettingsParams::default()
        };
        if let Err(e) = apply_update(&mut settings, params) {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let (history, outcome) = HistoryStore::open(get_history_json_path());
    if let LoadOutcome::Discarded(reason) = &outcome {
        warn!("Past uploads were unreadable and have been cleared: {}", reason);
    }

    if cli.list_history {
        print_history(history.entries());
        return ExitCode::SUCCESS;
    }

    if cli.file.is_none() && cli.history.is_none() {
        eprintln!("error: {}", crate::error::TranscriptionError::NoFileSelected);
        return ExitCode::FAILURE;
    }

    let api = match HttpTranscriptionApi::from_settings(&settings) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        let (mut controller, mut events) =
            AppController::new(api, ConsoleView::default(), history, &settings);
        info!("Using transcription server {}", settings.server_url);

        if let Some(instrument) = cli.instrument {
            controller.set_instrument(instrument);
        }
        if let Some(tuning) = cli.tuning.as_deref() {
            if let Err(e) = controller.set_tuning(tuning) {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        if let Some(tempo) = cli.tempo.clone() {
            controller.set_tempo(tempo);
        }

        if let Some(entry_id) = cli.history.as_deref() {
            if controller.select_history(entry_id).await.is_err() {
                return ExitCode::FAILURE;
            }
        } else if let Some(file) = cli.file.as_ref() {
            if controller.select_file(file).is_err() || controller.submit().await.is_err() {
                return ExitCode::FAILURE;
            }
            controller.drive_until_settled(&mut events).await;
        }

        if controller.phase() != JobPhase::Done {
            return ExitCode::FAILURE;
        }

        if let Some(format) = cli.save {
            match controller.download_result(None, format).await {
                Ok(path) => eprintln!("Saved {}", path.display()),
                Err(_) => return ExitCode::FAILURE,
            }
        }
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_options() {
        let cli = Cli::try_parse_from([
            "tabscribe",
            "riff.wav",
            "--instrument",
            "guitar",
            "--tuning",
            "drop-d",
            "--tempo",
            "95",
            "--save",
            "pdf",
        ])
        .unwrap();

        assert_eq!(cli.file, Some(PathBuf::from("riff.wav")));
        assert_eq!(cli.instrument, Some(Instrument::Guitar));
        assert_eq!(cli.tuning.as_deref(), Some("drop-d"));
        assert_eq!(cli.save, Some(ResultFormat::Pdf));
    }

    #[test]
    fn test_history_conflicts_with_file() {
        assert!(Cli::try_parse_from(["tabscribe", "riff.wav", "--history", "abc"]).is_err());
        assert!(Cli::try_parse_from(["tabscribe", "--instrument", "banjo", "riff.wav"]).is_err());
    }
}
