// In-memory service and view doubles for workflow tests
use crate::api::{ApiError, TranscriptionApi};
use crate::models::{FormOptions, HistoryEntry, ResultFormat, ResultPayload, StatusResponse};
use crate::render::RenderedResults;
use crate::selection::StagedFile;
use crate::view::{ProgressStage, Screen, ViewSink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Scripted transcription service. Statuses are served in order; once the
/// script runs out the last status repeats.
pub struct ScriptedApi {
    statuses: Mutex<VecDeque<Result<StatusResponse, ApiError>>>,
    last_status: Mutex<Result<StatusResponse, ApiError>>,
    upload_error: Mutex<Option<ApiError>>,
    upload_delay: Mutex<Option<Duration>>,
    result: Mutex<Result<ResultPayload, ApiError>>,
    result_delay: Mutex<Option<Duration>>,
    pub uploads: Mutex<Vec<String>>,
    pub status_calls: Mutex<Vec<String>>,
    pub result_calls: Mutex<Vec<String>>,
}

pub fn status(value: &str) -> Result<StatusResponse, ApiError> {
    Ok(StatusResponse {
        job_id: None,
        status: value.to_string(),
        error: None,
    })
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(status("pending")),
            upload_error: Mutex::new(None),
            upload_delay: Mutex::new(None),
            result: Mutex::new(Ok(ResultPayload::default())),
            result_delay: Mutex::new(None),
            uploads: Mutex::new(Vec::new()),
            status_calls: Mutex::new(Vec::new()),
            result_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_statuses(values: &[&str]) -> Self {
        let api = Self::new();
        api.script(values.iter().map(|v| status(v)).collect());
        api
    }

    pub fn script(&self, responses: Vec<Result<StatusResponse, ApiError>>) {
        *self.statuses.lock() = responses.into_iter().collect();
    }

    pub fn fail_upload(&self, err: ApiError) {
        *self.upload_error.lock() = Some(err);
    }

    pub fn set_result(&self, result: Result<ResultPayload, ApiError>) {
        *self.result.lock() = result;
    }

    pub fn delay_uploads(&self, delay: Duration) {
        *self.upload_delay.lock() = Some(delay);
    }

    pub fn delay_results(&self, delay: Duration) {
        *self.result_delay.lock() = Some(delay);
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.lock().len()
    }

    pub fn result_count(&self) -> usize {
        self.result_calls.lock().len()
    }
}

impl TranscriptionApi for ScriptedApi {
    fn upload(
        &self,
        file: &StagedFile,
        _options: &FormOptions,
    ) -> impl Future<Output = Result<String, ApiError>> + Send {
        let outcome = match self.upload_error.lock().clone() {
            Some(err) => Err(err),
            None => {
                let mut uploads = self.uploads.lock();
                uploads.push(file.name.clone());
                Ok(format!("job-{}", uploads.len()))
            }
        };
        let delay = *self.upload_delay.lock();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
    }

    fn status(&self, job_id: &str) -> impl Future<Output = Result<StatusResponse, ApiError>> + Send {
        self.status_calls.lock().push(job_id.to_string());
        let next = self.statuses.lock().pop_front();
        let outcome = match next {
            Some(response) => {
                *self.last_status.lock() = response.clone();
                response
            }
            None => self.last_status.lock().clone(),
        };
        async move { outcome }
    }

    fn result(&self, job_id: &str) -> impl Future<Output = Result<ResultPayload, ApiError>> + Send {
        self.result_calls.lock().push(job_id.to_string());
        let outcome = self.result.lock().clone();
        let delay = *self.result_delay.lock();
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
    }

    fn document(
        &self,
        job_id: &str,
        format: ResultFormat,
    ) -> impl Future<Output = Result<Vec<u8>, ApiError>> + Send {
        self.result_calls.lock().push(job_id.to_string());
        let outcome = self
            .result
            .lock()
            .clone()
            .map(|_| format!("{} document for {}", format.as_query(), job_id).into_bytes());
        async move { outcome }
    }
}

#[derive(Debug, Default)]
pub struct ViewLog {
    pub screens: Vec<Screen>,
    pub progress: Vec<ProgressStage>,
    pub statuses: Vec<String>,
    pub errors: Vec<String>,
    pub results: Vec<RenderedResults>,
    pub history_sizes: Vec<usize>,
}

/// View that records every call; clones share the same log
#[derive(Clone, Default)]
pub struct RecordingView {
    pub log: Arc<Mutex<ViewLog>>,
}

impl RecordingView {
    pub fn last_screen(&self) -> Option<Screen> {
        self.log.lock().screens.last().copied()
    }
}

impl ViewSink for RecordingView {
    fn show_screen(&mut self, screen: Screen) {
        self.log.lock().screens.push(screen);
    }

    fn set_progress(&mut self, stage: ProgressStage) {
        self.log.lock().progress.push(stage);
    }

    fn set_status(&mut self, message: &str) {
        self.log.lock().statuses.push(message.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.log.lock().errors.push(message.to_string());
    }

    fn clear_error(&mut self) {}

    fn render_results(&mut self, results: &RenderedResults) {
        self.log.lock().results.push(results.clone());
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.log.lock().history_sizes.push(entries.len());
    }
}

pub fn staged_file(name: &str) -> StagedFile {
    StagedFile {
        path: PathBuf::from(name),
        name: name.to_string(),
        size: 4096,
        mime_type: "audio/mpeg".to_string(),
    }
}

pub fn scratch_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tabscribe-{}-{}", prefix, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
