//! Job submission and status polling.
//!
//! One job is active at a time. The poll loop, backstop timer and delayed
//! transitions are tokio tasks whose abort handles live in a single shared
//! slot together with a generation counter; every state-changing entry point
//! aborts the previous tasks and bumps the generation before doing anything
//! else. Tasks report back only through `SessionEvent`s.

pub mod events;
pub mod state;

pub use events::{EventKind, SessionEvent};
pub use state::JobPhase;

use crate::api::{ApiError, TranscriptionApi};
use crate::error::TranscriptionError;
use crate::models::{FormOptions, JobStatus, PollerConfig, ResultFormat, ResultPayload, StatusResponse};
use crate::selection::StagedFile;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

struct ActiveJob {
    generation: u64,
    job_id: Option<String>,
    phase: JobPhase,
    poll: Option<AbortHandle>,
    backstop: Option<AbortHandle>,
    timer: Option<AbortHandle>,
}

impl ActiveJob {
    fn cancel_tasks(&mut self) {
        for handle in [self.poll.take(), self.backstop.take(), self.timer.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }

    fn advance(&mut self, next: JobPhase) -> bool {
        if self.phase == next {
            return true;
        }
        if !self.phase.can_transition_to(next) {
            warn!("Ignoring phase change {:?} -> {:?}", self.phase, next);
            return false;
        }
        debug!("Job phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        true
    }

    fn is_polling(&self, generation: u64) -> bool {
        self.generation == generation && self.phase == JobPhase::Polling
    }
}

type Slot = Arc<Mutex<ActiveJob>>;
type EventTx = mpsc::UnboundedSender<SessionEvent>;

pub struct JobPoller<A: TranscriptionApi> {
    api: Arc<A>,
    config: PollerConfig,
    slot: Slot,
    events: EventTx,
}

impl<A: TranscriptionApi> JobPoller<A> {
    pub fn new(api: Arc<A>, config: PollerConfig) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let slot = Arc::new(Mutex::new(ActiveJob {
            generation: 0,
            job_id: None,
            phase: JobPhase::Idle,
            poll: None,
            backstop: None,
            timer: None,
        }));
        (Self { api, config, slot, events }, rx)
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn phase(&self) -> JobPhase {
        self.slot.lock().phase
    }

    pub fn job_id(&self) -> Option<String> {
        self.slot.lock().job_id.clone()
    }

    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.slot.lock().generation == generation
    }

    /// Number of background tasks (poll loop, backstop, timer) still alive
    pub fn live_tasks(&self) -> usize {
        let active = self.slot.lock();
        [&active.poll, &active.backstop, &active.timer]
            .into_iter()
            .flatten()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Cancel everything from earlier submissions and start a new generation at `phase`
    fn begin(&self, phase: JobPhase) -> u64 {
        let mut active = self.slot.lock();
        active.cancel_tasks();
        active.generation += 1;
        active.job_id = None;
        active.phase = JobPhase::Idle;
        active.advance(phase);
        active.generation
    }

    /// Full reset to idle. Stale tasks are aborted and their events ignored.
    pub fn reset(&self) -> u64 {
        self.begin(JobPhase::Idle)
    }

    /// Upload `file` and start polling for the returned job id
    pub async fn submit(
        &self,
        file: Option<&StagedFile>,
        options: &FormOptions,
    ) -> Result<String, TranscriptionError> {
        let outcome = self.prepare_upload(file, options)?.send().await;
        let job_id = outcome.result?;
        if self.start_polling(outcome.generation, &job_id) {
            Ok(job_id)
        } else {
            Err(TranscriptionError::Cancelled)
        }
    }

    /// Start a new generation for an upload of `file`. The returned request
    /// owns everything it needs, so it can be awaited without borrowing the poller.
    pub fn prepare_upload(
        &self,
        file: Option<&StagedFile>,
        options: &FormOptions,
    ) -> Result<PendingUpload<A>, TranscriptionError> {
        let file = file.ok_or(TranscriptionError::NoFileSelected)?;
        let generation = self.begin(JobPhase::Submitting);
        Ok(PendingUpload {
            api: self.api.clone(),
            generation,
            file: file.clone(),
            options: options.clone(),
            timeout: self.config.upload_timeout,
        })
    }

    /// Poll `job_id` for `generation`. Returns false if a reset or another
    /// submission superseded it while the upload was in flight.
    pub fn start_polling(&self, generation: u64, job_id: &str) -> bool {
        let mut active = self.slot.lock();
        if active.generation != generation {
            warn!("Submission for job {} was superseded before polling started", job_id);
            return false;
        }

        active.cancel_tasks();
        active.job_id = Some(job_id.to_string());
        if !active.advance(JobPhase::Polling) {
            return false;
        }

        let poll = tokio::spawn(poll_loop(
            self.api.clone(),
            self.slot.clone(),
            self.events.clone(),
            generation,
            self.config,
        ));
        let backstop = tokio::spawn(backstop(
            self.slot.clone(),
            self.events.clone(),
            generation,
            job_id.to_string(),
            self.config.backstop_timeout,
        ));
        active.poll = Some(poll.abort_handle());
        active.backstop = Some(backstop.abort_handle());
        true
    }

    /// Secondary entry point: go straight to fetching a past job's results
    pub fn begin_past_result(&self, job_id: &str) -> u64 {
        let generation = self.begin(JobPhase::FetchingPastResult);
        self.slot.lock().job_id = Some(job_id.to_string());
        generation
    }

    pub fn mark_done(&self) -> bool {
        let mut active = self.slot.lock();
        active.cancel_tasks();
        active.advance(JobPhase::Done)
    }

    /// Move to `Failed`, stopping the poll loop and backstop
    pub fn mark_failed(&self) -> bool {
        let mut active = self.slot.lock();
        active.cancel_tasks();
        active.advance(JobPhase::Failing) && active.advance(JobPhase::Failed)
    }

    /// Post `ReturnToUpload` for the current generation after `delay`
    pub fn schedule_return(&self, delay: Duration) {
        let mut active = self.slot.lock();
        if let Some(timer) = active.timer.take() {
            timer.abort();
        }

        let generation = active.generation;
        let events = self.events.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            send(&events, generation, EventKind::ReturnToUpload);
        });
        active.timer = Some(timer.abort_handle());
    }

    /// Fetch the JSON result, bounded by the result timeout
    pub async fn fetch_result(&self, job_id: &str) -> Result<ResultPayload, TranscriptionError> {
        fetch_with_timeout(self.api.as_ref(), job_id, self.config.result_timeout).await
    }

    /// A result fetch for `job_id` tagged with the current generation
    pub fn prepare_fetch(&self, job_id: &str) -> PendingFetch<A> {
        PendingFetch {
            api: self.api.clone(),
            generation: self.generation(),
            job_id: job_id.to_string(),
            timeout: self.config.result_timeout,
        }
    }

    /// Download the result in `format` into `dir` as `<job_id>.<ext>`
    pub async fn download_result(
        &self,
        job_id: &str,
        format: ResultFormat,
        dir: &Path,
    ) -> Result<PathBuf, TranscriptionError> {
        let bytes = match format {
            ResultFormat::Json => {
                let payload = self.fetch_result(job_id).await?;
                serde_json::to_vec_pretty(&payload)
                    .map_err(|e| TranscriptionError::Storage(e.to_string()))?
            }
            _ => match tokio::time::timeout(self.config.result_timeout, self.api.document(job_id, format)).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => return Err(classify_result_error(&e)),
                Err(_) => {
                    return Err(TranscriptionError::Timeout(self.config.result_timeout.as_secs()))
                }
            },
        };

        fs::create_dir_all(dir)
            .map_err(|e| TranscriptionError::Storage(format!("Failed to create {:?}: {}", dir, e)))?;
        let path = dir.join(format!("{}.{}", sanitize_file_stem(job_id), format.extension()));
        fs::write(&path, bytes)
            .map_err(|e| TranscriptionError::Storage(format!("Failed to write {:?}: {}", path, e)))?;

        info!("Saved {} result for {} to {:?}", format.as_query(), job_id, path);
        Ok(path)
    }
}

impl<A: TranscriptionApi> Drop for JobPoller<A> {
    fn drop(&mut self) {
        self.slot.lock().cancel_tasks();
    }
}

/// An upload detached from the poller. Await `send` without holding the
/// controller, then hand the outcome back so a stale generation is discarded.
pub struct PendingUpload<A: TranscriptionApi> {
    api: Arc<A>,
    generation: u64,
    file: StagedFile,
    options: FormOptions,
    timeout: Duration,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub generation: u64,
    pub file: StagedFile,
    pub options: FormOptions,
    pub result: Result<String, TranscriptionError>,
}

impl<A: TranscriptionApi> PendingUpload<A> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn send(self) -> UploadOutcome {
        let file = &self.file;
        info!("Uploading {} ({} bytes) as {:?}", file.name, file.size, self.options);

        let result = match tokio::time::timeout(self.timeout, self.api.upload(file, &self.options)).await {
            Ok(Ok(job_id)) => {
                info!("Upload accepted, job id {}", job_id);
                Ok(job_id)
            }
            Ok(Err(e)) => {
                error!("Upload of {} failed: {}", file.name, e);
                Err(TranscriptionError::UploadFailed(e.detail()))
            }
            Err(_) => {
                warn!("Upload of {} timed out after {}s", file.name, self.timeout.as_secs());
                Err(TranscriptionError::Timeout(self.timeout.as_secs()))
            }
        };

        UploadOutcome {
            generation: self.generation,
            file: self.file,
            options: self.options,
            result,
        }
    }
}

/// A result fetch detached from the poller, bounded by the result timeout
pub struct PendingFetch<A: TranscriptionApi> {
    api: Arc<A>,
    generation: u64,
    job_id: String,
    timeout: Duration,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub job_id: String,
    pub result: Result<ResultPayload, TranscriptionError>,
}

impl<A: TranscriptionApi> PendingFetch<A> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn send(self) -> FetchOutcome {
        let result = fetch_with_timeout(self.api.as_ref(), &self.job_id, self.timeout).await;
        FetchOutcome {
            generation: self.generation,
            job_id: self.job_id,
            result,
        }
    }
}

async fn fetch_with_timeout<A: TranscriptionApi>(
    api: &A,
    job_id: &str,
    timeout: Duration,
) -> Result<ResultPayload, TranscriptionError> {
    debug!("Fetching result for job {}", job_id);
    match tokio::time::timeout(timeout, api.result(job_id)).await {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(e)) => {
            error!("Failed to fetch result for {}: {}", job_id, e);
            Err(classify_result_error(&e))
        }
        Err(_) => {
            warn!("Result fetch for {} timed out", job_id);
            Err(TranscriptionError::Timeout(timeout.as_secs()))
        }
    }
}

/// Split result failures into "source audio deleted" and everything else
pub fn classify_result_error(err: &ApiError) -> TranscriptionError {
    let detail = err.detail();
    if detail.to_ascii_lowercase().contains("no longer exists") {
        TranscriptionError::SourceFileGone(detail)
    } else {
        TranscriptionError::ResultFetchFailed(detail)
    }
}

fn sanitize_file_stem(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn send(events: &EventTx, generation: u64, kind: EventKind) {
    if events.send(SessionEvent { generation, kind }).is_err() {
        debug!("Session event dropped, controller is gone");
    }
}

enum Step {
    Continue(EventKind),
    Stop(EventKind),
    Complete(String),
}

async fn poll_loop<A: TranscriptionApi>(
    api: Arc<A>,
    slot: Slot,
    events: EventTx,
    generation: u64,
    config: PollerConfig,
) {
    // First tick fires immediately
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let job_id = {
            let active = slot.lock();
            if !active.is_polling(generation) {
                return;
            }
            active.job_id.clone()
        };
        let Some(job_id) = job_id else {
            continue;
        };

        let response = api.status(&job_id).await;

        let step = {
            let mut active = slot.lock();
            if !active.is_polling(generation) {
                return;
            }
            classify_status(&mut active, job_id, response)
        };

        match step {
            Step::Continue(kind) => send(&events, generation, kind),
            Step::Stop(kind) => {
                send(&events, generation, kind);
                return;
            }
            Step::Complete(job_id) => {
                tokio::time::sleep(config.completion_delay).await;
                send(&events, generation, EventKind::Ready { job_id, forced: false });
                return;
            }
        }
    }
}

fn classify_status(
    active: &mut ActiveJob,
    job_id: String,
    response: Result<StatusResponse, ApiError>,
) -> Step {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            error!("Status check for {} failed: {}", job_id, e);
            stop_backstop(active);
            active.advance(JobPhase::Failing);
            return Step::Stop(EventKind::Failed {
                job_id,
                error: TranscriptionError::StatusCheckFailed(e.detail()),
            });
        }
    };

    match JobStatus::parse(&response.status) {
        Some(status @ (JobStatus::Pending | JobStatus::Processing)) => {
            Step::Continue(EventKind::Progress { job_id, status })
        }
        Some(JobStatus::Completed) => {
            info!("Job {} completed", job_id);
            stop_backstop(active);
            active.advance(JobPhase::Completing);
            Step::Complete(job_id)
        }
        Some(JobStatus::Error) => {
            warn!("Job {} reported an error: {:?}", job_id, response.error);
            stop_backstop(active);
            active.advance(JobPhase::Failing);
            Step::Stop(EventKind::Failed {
                job_id,
                error: TranscriptionError::job_error(response.error),
            })
        }
        None => {
            debug!("Job {} reported unrecognized status {:?}", job_id, response.status);
            Step::Continue(EventKind::StatusMessage {
                job_id,
                message: response.status,
            })
        }
    }
}

fn stop_backstop(active: &mut ActiveJob) {
    if let Some(backstop) = active.backstop.take() {
        backstop.abort();
    }
}

/// Forced-progress fallback: if the job is still polling when the timer
/// fires, stop polling and fetch results anyway.
async fn backstop(slot: Slot, events: EventTx, generation: u64, job_id: String, timeout: Duration) {
    tokio::time::sleep(timeout).await;

    {
        let mut active = slot.lock();
        if !active.is_polling(generation) {
            return;
        }
        if let Some(poll) = active.poll.take() {
            poll.abort();
        }
        active.backstop = None;
        active.advance(JobPhase::Completing);
    }

    warn!(
        "Job {} unresolved after {}s, fetching results anyway",
        job_id,
        timeout.as_secs()
    );
    send(&events, generation, EventKind::Ready { job_id, forced: true });
}
