// Transcription job data models
use super::result::ResultPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Map a status string from the server onto one of the canonical states.
    /// The service reports lowercase values; matching is case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(JobStatus::Pending),
            "PROCESSING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "ERROR" => Some(JobStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// Response body of `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response body of `GET /status/{job_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub result: Option<ResultPayload>,
}

impl Job {
    pub fn new(job_id: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            error: None,
            result: None,
        }
    }

    /// Apply a status observed by polling. Returns false once the job is terminal,
    /// since completed and failed jobs never change again.
    pub fn apply_status(&mut self, status: JobStatus, error: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        if status == JobStatus::Error {
            self.error = error;
        }
        true
    }

    /// Attach the fetched result. Failed jobs and jobs that already hold a
    /// result are left untouched.
    pub fn complete(&mut self, result: ResultPayload) -> bool {
        if self.status == JobStatus::Error || self.result.is_some() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
