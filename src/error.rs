use thiserror::Error;

/// Everything the transcription workflow can surface to the user
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptionError {
    #[error("Please select an audio file first")]
    NoFileSelected,

    #[error("Unsupported file type: {0}. Allowed types: MP3, WAV, OGG")]
    UnsupportedFileType(String),

    #[error("File is too large ({size} bytes, limit is {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Error checking status: {0}")]
    StatusCheckFailed(String),

    #[error("{0}")]
    JobError(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Carries the server's detail, which already explains that the file is gone
    #[error("{0}")]
    SourceFileGone(String),

    #[error("Failed to load results: {0}")]
    ResultFetchFailed(String),

    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// The request finished after a reset or a newer submission replaced it
    #[error("Transcription cancelled")]
    Cancelled,
}

impl TranscriptionError {
    /// Default message for a job the server marked as failed without saying why
    pub const GENERIC_JOB_FAILURE: &'static str = "Transcription failed";

    pub fn job_error(message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| Self::GENERIC_JOB_FAILURE.to_string());
        TranscriptionError::JobError(message)
    }
}
