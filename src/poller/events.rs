// Typed outcomes posted by background tasks to the controller
use crate::error::TranscriptionError;
use crate::models::JobStatus;

/// An event tagged with the submission generation that produced it.
/// Events from a superseded generation must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub generation: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Job is still pending or processing
    Progress { job_id: String, status: JobStatus },
    /// Unrecognized status string, shown verbatim
    StatusMessage { job_id: String, message: String },
    /// Results should be fetched now. `forced` is set when the backstop fired
    /// before the server reported completion.
    Ready { job_id: String, forced: bool },
    Failed { job_id: String, error: TranscriptionError },
    /// Delayed return to the upload screen after a failure
    ReturnToUpload,
}
