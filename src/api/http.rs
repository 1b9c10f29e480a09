// ureq-backed transcription service client
use super::multipart::MultipartBody;
use super::{extract_detail, ApiError, TranscriptionApi};
use crate::models::{FormOptions, ResultFormat, ResultPayload, Settings, StatusResponse, UploadResponse};
use crate::selection::StagedFile;
use log::debug;
use std::future::Future;
use std::io::Read;
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Whole-request deadline for uploads, which can be large
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
/// Whole-request deadline for status, result and document calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                ApiError::Server {
                    status,
                    detail: extract_detail(&body),
                }
            }
            ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct HttpTranscriptionApi {
    agent: ureq::Agent,
    base_url: Url,
    upload_timeout: Duration,
    request_timeout: Duration,
}

impl HttpTranscriptionApi {
    pub fn new(server_url: &str) -> Result<Self, String> {
        let base_url = Url::parse(server_url.trim())
            .map_err(|e| format!("Invalid server URL {}: {}", server_url, e))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("Server URL cannot be used as a base: {}", server_url));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(DEFAULT_UPLOAD_TIMEOUT)
            .timeout_write(DEFAULT_UPLOAD_TIMEOUT)
            .build();

        Ok(Self {
            agent,
            base_url,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Client for the configured server with the configured deadlines
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        Ok(Self::new(&settings.server_url)?.with_timeouts(
            Duration::from_secs(settings.upload_timeout_secs),
            Duration::from_secs(settings.result_timeout_secs),
        ))
    }

    /// Set the per-request deadlines. ureq abandons the connection when they
    /// pass, so a request dropped by the poller does not linger on the blocking pool.
    pub fn with_timeouts(mut self, upload: Duration, request: Duration) -> Self {
        self.upload_timeout = upload;
        self.request_timeout = request;
        self
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn result_url(&self, job_id: &str, format: ResultFormat) -> Url {
        let mut url = self.endpoint(&["result", job_id]);
        url.query_pairs_mut().append_pair("format", format.as_query());
        url
    }
}

/// Run a blocking ureq call on tokio's blocking pool
async fn blocking<T, F>(call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ApiError::Transport(format!("Request task failed: {}", e)))?
}

impl TranscriptionApi for HttpTranscriptionApi {
    fn upload(
        &self,
        file: &StagedFile,
        options: &FormOptions,
    ) -> impl Future<Output = Result<String, ApiError>> + Send {
        let agent = self.agent.clone();
        let url = self.endpoint(&["upload"]);
        let timeout = self.upload_timeout;
        let file = file.clone();
        let options = options.clone();

        blocking(move || {
            let bytes = std::fs::read(&file.path)
                .map_err(|e| ApiError::Transport(format!("Failed to read {}: {}", file.name, e)))?;

            let (content_type, body) = MultipartBody::new()
                .file("file", &file.name, &file.mime_type, &bytes)
                .text("instrument", options.instrument.as_str())
                .text("tuning", &options.tuning)
                .text("tempo", &options.tempo.to_string())
                .finish();

            debug!("POST {} ({} bytes)", url, body.len());
            let response = agent
                .request_url("POST", &url)
                .timeout(timeout)
                .set("Content-Type", &content_type)
                .send_bytes(&body)?;

            let parsed: UploadResponse = response
                .into_json()
                .map_err(|e| ApiError::Decode(format!("Failed to parse upload response: {}", e)))?;
            Ok(parsed.job_id)
        })
    }

    fn status(&self, job_id: &str) -> impl Future<Output = Result<StatusResponse, ApiError>> + Send {
        let agent = self.agent.clone();
        let url = self.endpoint(&["status", job_id]);
        let timeout = self.request_timeout;

        blocking(move || {
            let response = agent.request_url("GET", &url).timeout(timeout).call()?;
            response
                .into_json::<StatusResponse>()
                .map_err(|e| ApiError::Decode(format!("Failed to parse status response: {}", e)))
        })
    }

    fn result(&self, job_id: &str) -> impl Future<Output = Result<ResultPayload, ApiError>> + Send {
        let agent = self.agent.clone();
        let url = self.result_url(job_id, ResultFormat::Json);
        let timeout = self.request_timeout;

        blocking(move || {
            let response = agent.request_url("GET", &url).timeout(timeout).call()?;
            response
                .into_json::<ResultPayload>()
                .map_err(|e| ApiError::Decode(format!("Failed to parse result: {}", e)))
        })
    }

    fn document(
        &self,
        job_id: &str,
        format: ResultFormat,
    ) -> impl Future<Output = Result<Vec<u8>, ApiError>> + Send {
        let agent = self.agent.clone();
        let url = self.result_url(job_id, format);
        let timeout = self.request_timeout;

        blocking(move || {
            let response = agent.request_url("GET", &url).timeout(timeout).call()?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| ApiError::Transport(format!("Failed to read document: {}", e)))?;
            Ok(bytes)
        })
    }
}
