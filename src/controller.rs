// Owns the workflow: selection, options, history and the job poller, and is
// the only place that draws to the view.
use crate::api::TranscriptionApi;
use crate::config::results_dir;
use crate::error::TranscriptionError;
use crate::form::OptionsForm;
use crate::history::HistoryStore;
use crate::models::{FormOptions, HistoryEntry, Instrument, Job, JobStatus, PollerConfig, ResultFormat, Settings};
use crate::poller::{EventKind, FetchOutcome, JobPhase, JobPoller, PendingFetch, PendingUpload, SessionEvent, UploadOutcome};
use crate::render::{render, RenderedResults};
use crate::selection::{FileSelection, StagedFile};
use crate::view::{ProgressStage, Screen, ViewSink};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub const INVALID_TEMPO: &str = "Tempo must be a whole number between 1 and 300";

pub struct AppController<A: TranscriptionApi, V: ViewSink> {
    poller: JobPoller<A>,
    view: V,
    selection: FileSelection,
    options: OptionsForm,
    history: HistoryStore,
    download_dir: PathBuf,
    error_return_delay: Duration,
    screen: Screen,
    current_job: Option<Job>,
    metadata: Option<FormOptions>,
    last_results: Option<RenderedResults>,
}

impl<A: TranscriptionApi, V: ViewSink> AppController<A, V> {
    /// Build a controller and the receiver its background tasks post to.
    /// The caller feeds every received event back through `handle_event`.
    pub fn new(
        api: Arc<A>,
        mut view: V,
        history: HistoryStore,
        settings: &Settings,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let config = PollerConfig::from(settings);
        let (poller, events) = JobPoller::new(api, config);

        view.render_history(history.entries());
        view.show_screen(Screen::Upload);

        let controller = Self {
            poller,
            view,
            selection: FileSelection::new(),
            options: OptionsForm::new(),
            history,
            download_dir: results_dir(settings),
            error_return_delay: config.error_return_delay,
            screen: Screen::Upload,
            current_job: None,
            metadata: None,
            last_results: None,
        };
        (controller, events)
    }

    pub fn phase(&self) -> JobPhase {
        self.poller.phase()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// No job is in flight: the last one finished, failed, or none was started
    pub fn is_settled(&self) -> bool {
        !self.phase().is_busy()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.current_job.as_ref()
    }

    pub fn last_results(&self) -> Option<&RenderedResults> {
        self.last_results.as_ref()
    }

    pub fn staged_file(&self) -> Option<&StagedFile> {
        self.selection.current()
    }

    pub fn form(&self) -> &OptionsForm {
        &self.options
    }

    pub fn options(&self) -> FormOptions {
        self.options.get_options()
    }

    fn show_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.view.show_screen(screen);
    }

    pub fn select_file(&mut self, path: impl AsRef<Path>) -> Result<StagedFile, TranscriptionError> {
        match self.selection.stage(path) {
            Ok(staged) => {
                let staged = staged.clone();
                self.view.clear_error();
                Ok(staged)
            }
            Err(e) => {
                self.view.show_error(&e.to_string());
                Err(e)
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn set_instrument(&mut self, instrument: Instrument) {
        self.options.set_instrument(instrument);
    }

    pub fn set_tuning(&mut self, tuning: &str) -> Result<(), TranscriptionError> {
        self.options
            .set_tuning(tuning)
            .map_err(TranscriptionError::InvalidOptions)
    }

    pub fn set_tempo(&mut self, tempo: impl Into<String>) {
        self.options.set_tempo(tempo);
    }

    /// Validate the form, upload the staged file and start polling.
    /// Validation errors are shown without leaving the upload screen.
    pub async fn submit(&mut self) -> Result<String, TranscriptionError> {
        let upload = self.begin_submit()?;
        let outcome = upload.send().await;
        self.finish_submit(outcome)
    }

    /// First half of `submit`: validate, switch to the processing screen and
    /// hand back the upload. Callers sharing the controller behind a lock
    /// should release it while the upload runs.
    pub fn begin_submit(&mut self) -> Result<PendingUpload<A>, TranscriptionError> {
        let Some(file) = self.selection.current().cloned() else {
            let err = TranscriptionError::NoFileSelected;
            self.view.show_error(&err.to_string());
            return Err(err);
        };
        if !self.options.is_valid() {
            let err = TranscriptionError::InvalidOptions(INVALID_TEMPO.to_string());
            self.view.show_error(&err.to_string());
            return Err(err);
        }

        let options = self.options.get_options();
        let upload = self.poller.prepare_upload(Some(&file), &options)?;
        self.current_job = None;
        self.last_results = None;
        self.metadata = Some(options);
        self.view.clear_error();
        self.show_screen(Screen::Processing);
        self.view.set_progress(ProgressStage::Uploading);
        Ok(upload)
    }

    /// Second half of `submit`. An upload that comes back after a reset or a
    /// newer submission is discarded with `Cancelled` and leaves the view alone.
    pub fn finish_submit(&mut self, outcome: UploadOutcome) -> Result<String, TranscriptionError> {
        if !self.poller.is_current(outcome.generation) || self.phase() != JobPhase::Submitting {
            debug!("Discarding upload of {}, submission was cancelled", outcome.file.name);
            return Err(TranscriptionError::Cancelled);
        }

        match outcome.result {
            Ok(job_id) => {
                if !self.poller.start_polling(outcome.generation, &job_id) {
                    return Err(TranscriptionError::Cancelled);
                }
                self.history.record(&outcome.file, &job_id, outcome.options);
                self.view.render_history(self.history.entries());
                self.current_job = Some(Job::new(job_id.clone()));
                self.view.set_progress(ProgressStage::Pending);
                Ok(job_id)
            }
            Err(e) => {
                self.fail(e.clone());
                Err(e)
            }
        }
    }

    /// Consume one event from a background task. Events from a superseded
    /// submission are dropped.
    pub async fn handle_event(&mut self, event: SessionEvent) {
        if let Some(fetch) = self.apply_event(event) {
            let outcome = fetch.send().await;
            // Failures are already shown and scheduled by finish_fetch()
            let _ = self.finish_fetch(outcome);
        }
    }

    /// Apply an event without awaiting. A `Ready` event hands back the result
    /// fetch, which the caller runs and passes to `finish_fetch`.
    pub fn apply_event(&mut self, event: SessionEvent) -> Option<PendingFetch<A>> {
        if !self.poller.is_current(event.generation) {
            debug!("Dropping stale event {:?}", event);
            return None;
        }

        match event.kind {
            EventKind::Progress { job_id, status } => {
                if self.phase() != JobPhase::Polling {
                    return None;
                }
                if let Some(job) = self.current_job.as_mut().filter(|job| job.job_id == job_id) {
                    job.apply_status(status, None);
                }
                let stage = match status {
                    JobStatus::Pending => ProgressStage::Pending,
                    _ => ProgressStage::Processing,
                };
                self.view.set_progress(stage);
            }
            EventKind::StatusMessage { message, .. } => {
                if self.phase() == JobPhase::Polling {
                    self.view.set_status(&message);
                }
            }
            EventKind::Ready { job_id, forced } => {
                if self.phase() != JobPhase::Completing {
                    return None;
                }
                if forced {
                    warn!("Fetching results for {} without a completed status", job_id);
                }
                return Some(self.begin_fetch(&job_id));
            }
            EventKind::Failed { job_id, error } => {
                if let Some(job) = self.current_job.as_mut().filter(|job| job.job_id == job_id) {
                    job.apply_status(JobStatus::Error, Some(error.to_string()));
                }
                self.fail(error);
            }
            EventKind::ReturnToUpload => {
                if self.phase() == JobPhase::Failed {
                    self.reset();
                }
            }
        }
        None
    }

    /// Handle events until no job is in flight
    pub async fn drive_until_settled(&mut self, events: &mut UnboundedReceiver<SessionEvent>) {
        while !self.is_settled() {
            match events.recv().await {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }
    }

    /// Re-open a past job from history without uploading or polling
    pub async fn select_history(&mut self, entry_id: &str) -> Result<(), TranscriptionError> {
        let fetch = self.begin_history(entry_id)?;
        let outcome = fetch.send().await;
        self.finish_fetch(outcome)
    }

    /// First half of `select_history`; finish with `finish_fetch`
    pub fn begin_history(&mut self, entry_id: &str) -> Result<PendingFetch<A>, TranscriptionError> {
        let Some(entry) = self.history.find(entry_id).cloned() else {
            let err = TranscriptionError::HistoryEntryNotFound(entry_id.to_string());
            self.view.show_error(&err.to_string());
            return Err(err);
        };

        info!("Loading past results for {} ({})", entry.name, entry.job_id);
        self.poller.begin_past_result(&entry.job_id);
        self.current_job = Some(Job::new(entry.job_id.clone()));
        self.metadata = Some(entry.metadata);
        self.last_results = None;
        self.view.clear_error();
        self.show_screen(Screen::Processing);
        Ok(self.begin_fetch(&entry.job_id))
    }

    fn begin_fetch(&mut self, job_id: &str) -> PendingFetch<A> {
        self.view.set_progress(ProgressStage::LoadingResults);
        self.poller.prepare_fetch(job_id)
    }

    /// Render a fetched result, or fail with the fetch error. Results that
    /// arrive after a reset or a newer job are discarded with `Cancelled`.
    pub fn finish_fetch(&mut self, outcome: FetchOutcome) -> Result<(), TranscriptionError> {
        let fetching = matches!(self.phase(), JobPhase::Completing | JobPhase::FetchingPastResult);
        if !self.poller.is_current(outcome.generation) || !fetching {
            debug!("Discarding result for {}, job was cancelled", outcome.job_id);
            return Err(TranscriptionError::Cancelled);
        }

        let job_id = outcome.job_id;
        match outcome.result {
            Ok(payload) => {
                let rendered = render(&job_id, &payload, self.metadata.as_ref());
                if let Some(job) = self.current_job.as_mut().filter(|job| job.job_id == job_id) {
                    job.complete(payload);
                }
                self.poller.mark_done();
                self.view.render_results(&rendered);
                self.view.set_progress(ProgressStage::Done);
                self.show_screen(Screen::Results);
                self.last_results = Some(rendered);
                Ok(())
            }
            Err(e) => {
                self.fail(e.clone());
                Err(e)
            }
        }
    }

    fn fail(&mut self, err: TranscriptionError) {
        if let TranscriptionError::SourceFileGone(_) = err {
            if let Some(job_id) = self.poller.job_id() {
                self.history.remove(&job_id);
                self.view.render_history(self.history.entries());
            }
        }

        warn!("Transcription failed: {}", err);
        self.view.show_error(&err.to_string());
        self.poller.mark_failed();
        self.poller.schedule_return(self.error_return_delay);
    }

    /// Cancel everything and go back to an empty upload screen
    pub fn reset(&mut self) {
        self.poller.reset();
        self.selection.clear();
        self.current_job = None;
        self.metadata = None;
        self.last_results = None;
        self.view.clear_error();
        self.show_screen(Screen::Upload);
    }

    pub fn remove_history(&mut self, job_id: &str) -> usize {
        let removed = self.history.remove(job_id);
        self.view.render_history(self.history.entries());
        removed
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.view.render_history(self.history.entries());
    }

    /// Save the result of `job_id` (or the current job) in `format` to the downloads folder
    pub async fn download_result(
        &mut self,
        job_id: Option<&str>,
        format: ResultFormat,
    ) -> Result<PathBuf, TranscriptionError> {
        let job_id = match job_id {
            Some(id) => id.to_string(),
            None => self
                .current_job
                .as_ref()
                .map(|job| job.job_id.clone())
                .ok_or_else(|| TranscriptionError::ResultFetchFailed("No job to download".to_string()))?,
        };

        let result = self
            .poller
            .download_result(&job_id, format, &self.download_dir)
            .await;
        if let Err(TranscriptionError::SourceFileGone(_)) = &result {
            self.remove_history(&job_id);
        }
        if let Err(e) = &result {
            self.view.show_error(&e.to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::{ResultPayload, Tablature};
    use crate::testing::{scratch_dir, RecordingView, ScriptedApi};
    use std::fs;

    struct Harness {
        controller: AppController<ScriptedApi, RecordingView>,
        events: UnboundedReceiver<SessionEvent>,
        api: Arc<ScriptedApi>,
        view: RecordingView,
        dir: PathBuf,
    }

    fn harness(statuses: &[&str]) -> Harness {
        let dir = scratch_dir("controller");
        let api = Arc::new(ScriptedApi::with_statuses(statuses));
        api.set_result(Ok(ResultPayload {
            tablature: Some(Tablature::Preformatted("G|-3-|".to_string())),
            ..ResultPayload::default()
        }));
        let view = RecordingView::default();
        let settings = Settings {
            download_path: Some(dir.join("downloads").to_string_lossy().into_owned()),
            ..Settings::default()
        };
        let history = HistoryStore::new(dir.join("history.json"));
        let (controller, events) = AppController::new(api.clone(), view.clone(), history, &settings);
        Harness { controller, events, api, view, dir }
    }

    impl Harness {
        fn stage(&mut self, name: &str) {
            let path = self.dir.join(name);
            fs::write(&path, b"ID3 riff").unwrap();
            self.controller.select_file(&path).unwrap();
        }

        async fn run(&mut self) {
            self.controller.drive_until_settled(&mut self.events).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_then_completed() {
        let mut h = harness(&["processing", "completed"]);
        h.stage("riff.mp3");

        let job_id = h.controller.submit().await.unwrap();
        h.run().await;

        assert_eq!(h.controller.phase(), JobPhase::Done);
        assert_eq!(h.api.result_count(), 1);
        assert_eq!(h.view.last_screen(), Some(Screen::Results));
        assert_eq!(h.controller.history().len(), 1);
        assert_eq!(h.controller.history()[0].job_id, job_id);
        assert_eq!(h.controller.current_job().unwrap().status, JobStatus::Completed);

        let log = h.view.log.lock();
        assert_eq!(log.results.len(), 1);
        assert_eq!(log.results[0].tablature.as_deref(), Some("G|-3-|"));
        assert_eq!(
            log.progress,
            vec![
                ProgressStage::Uploading,
                ProgressStage::Pending,
                ProgressStage::Processing,
                ProgressStage::LoadingResults,
                ProgressStage::Done,
            ]
        );
        assert!(log.errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backstop_forces_one_fetch() {
        let mut h = harness(&["processing"]);
        h.stage("riff.mp3");
        let started = tokio::time::Instant::now();

        h.controller.submit().await.unwrap();
        h.run().await;

        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(31));
        assert_eq!(h.controller.phase(), JobPhase::Done);
        assert_eq!(h.api.result_count(), 1);

        let polls = h.api.status_count();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.api.status_count(), polls);
        assert_eq!(h.api.result_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_file_gone_evicts_history() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        h.api.set_result(Err(ApiError::Server {
            status: 404,
            detail: Some("Original audio file no longer exists".to_string()),
        }));

        h.controller.submit().await.unwrap();
        assert_eq!(h.controller.history().len(), 1);
        h.run().await;

        assert_eq!(h.controller.phase(), JobPhase::Failed);
        assert!(h.controller.history().is_empty());
        assert_eq!(h.view.log.lock().errors, vec!["Original audio file no longer exists".to_string()]);

        let event = h.events.recv().await.unwrap();
        h.controller.handle_event(event).await;
        assert_eq!(h.controller.phase(), JobPhase::Idle);
        assert_eq!(h.view.last_screen(), Some(Screen::Upload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_reselect_skips_polling() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        h.controller.submit().await.unwrap();
        h.run().await;
        let polls = h.api.status_count();
        let entry_id = h.controller.history()[0].id.clone();

        h.controller.select_history(&entry_id).await.unwrap();
        assert_eq!(h.controller.phase(), JobPhase::Done);
        assert_eq!(h.api.status_count(), polls);
        assert_eq!(h.api.result_count(), 2);

        h.api.set_result(Err(ApiError::Server {
            status: 404,
            detail: Some("Original audio file no longer exists".to_string()),
        }));
        let err = h.controller.select_history(&entry_id).await.unwrap_err();
        assert!(matches!(err, TranscriptionError::SourceFileGone(_)));
        assert!(h.controller.history().is_empty());

        let err = h.controller.select_history(&entry_id).await.unwrap_err();
        assert_eq!(err, TranscriptionError::HistoryEntryNotFound(entry_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_file() {
        let mut h = harness(&["completed"]);

        let err = h.controller.submit().await.unwrap_err();
        assert_eq!(err, TranscriptionError::NoFileSelected);
        assert_eq!(h.controller.phase(), JobPhase::Idle);
        assert_eq!(h.view.log.lock().errors, vec!["Please select an audio file first".to_string()]);
        assert_eq!(h.view.last_screen(), Some(Screen::Upload));
        assert!(h.api.uploads.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_tempo_blocks_upload() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        h.controller.set_tempo("301");

        let err = h.controller.submit().await.unwrap_err();
        assert!(matches!(err, TranscriptionError::InvalidOptions(_)));
        assert!(h.api.uploads.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_returns_to_upload() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        h.api.fail_upload(ApiError::Transport("connection refused".to_string()));

        let err = h.controller.submit().await.unwrap_err();
        assert_eq!(err, TranscriptionError::UploadFailed("connection refused".to_string()));
        assert_eq!(h.controller.phase(), JobPhase::Failed);
        assert!(h.controller.history().is_empty());

        let started = tokio::time::Instant::now();
        let event = h.events.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::ReturnToUpload);
        assert!(started.elapsed() >= Duration::from_secs(3));
        h.controller.handle_event(event).await;
        assert_eq!(h.view.last_screen(), Some(Screen::Upload));
        assert!(h.controller.staged_file().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_drops_in_flight_events() {
        let mut h = harness(&["processing"]);
        h.stage("riff.mp3");
        h.controller.submit().await.unwrap();

        let stale = h.events.recv().await.unwrap();
        h.controller.reset();
        h.controller.handle_event(stale).await;

        assert_eq!(h.controller.phase(), JobPhase::Idle);
        assert_eq!(h.view.last_screen(), Some(Screen::Upload));
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert!(h.events.try_recv().is_err());
        assert_eq!(h.api.result_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_upload_discards_it() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        h.api.delay_uploads(Duration::from_secs(5));

        let upload = h.controller.begin_submit().unwrap();
        assert_eq!(h.view.last_screen(), Some(Screen::Processing));
        let (outcome, ()) = tokio::join!(upload.send(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            h.controller.reset();
        });

        let err = h.controller.finish_submit(outcome).unwrap_err();
        assert_eq!(err, TranscriptionError::Cancelled);
        assert_eq!(h.controller.phase(), JobPhase::Idle);
        assert_eq!(h.view.last_screen(), Some(Screen::Upload));
        assert!(h.controller.history().is_empty());
        assert!(h.controller.current_job().is_none());

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(h.api.status_count(), 0);
        assert!(h.events.try_recv().is_err());
        assert!(h.view.log.lock().errors.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_result_fetch_discards_it() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        h.api.delay_results(Duration::from_secs(5));
        h.controller.submit().await.unwrap();

        let fetch = loop {
            let event = h.events.recv().await.unwrap();
            if let Some(fetch) = h.controller.apply_event(event) {
                break fetch;
            }
        };
        assert_eq!(h.controller.phase(), JobPhase::Completing);
        h.controller.reset();
        let outcome = fetch.send().await;

        let err = h.controller.finish_fetch(outcome).unwrap_err();
        assert_eq!(err, TranscriptionError::Cancelled);
        assert_eq!(h.controller.phase(), JobPhase::Idle);
        assert!(h.controller.last_results().is_none());
        assert!(h.view.log.lock().results.is_empty());
        assert_eq!(h.view.last_screen(), Some(Screen::Upload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_upload_fails_and_returns() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        h.api.delay_uploads(Duration::from_secs(600));

        let err = h.controller.submit().await.unwrap_err();
        assert_eq!(err, TranscriptionError::Timeout(120));
        assert_eq!(h.controller.phase(), JobPhase::Failed);
        assert!(h.controller.history().is_empty());

        let event = h.events.recv().await.unwrap();
        h.controller.handle_event(event).await;
        assert_eq!(h.view.last_screen(), Some(Screen::Upload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_document() {
        let mut h = harness(&["completed"]);
        h.stage("riff.mp3");
        let job_id = h.controller.submit().await.unwrap();
        h.run().await;

        let path = h.controller.download_result(None, ResultFormat::Musicxml).await.unwrap();
        assert_eq!(path, h.dir.join("downloads").join(format!("{}.musicxml", job_id)));
        assert!(path.exists());
    }
}
