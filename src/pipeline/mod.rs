use crate::limiter::RateLimiter;
use crate::stats::ServiceStats;

use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Hard bound on the remote-upload stage.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Requests and Outcomes
// ============================================================================

/// One inbound image event, alive only for the duration of a pipeline run.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: u64,
    /// Platform-supplied file reference; opaque to the pipeline.
    pub file_id: String,
    /// Byte size as declared by the inbound event. Informational only; the
    /// size check uses the resolved metadata.
    pub declared_size: u64,
}

/// Resolved metadata for a platform-hosted file.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub path: String,
    pub size: u64,
}

/// A successfully hosted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub url: String,
    pub delete_url: String,
    pub title: Option<String>,
}

/// Terminal result of one pipeline run.
pub type UploadOutcome = Result<HostedImage, UploadError>;

/// Everything that can terminate an upload short of success. Every variant is
/// an anticipated, user-reported outcome; none of them crash the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("rate limited")]
    RateLimited,
    #[error("file metadata unavailable")]
    MetadataUnavailable,
    #[error("file too large ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },
    #[error("download failed")]
    DownloadFailed,
    #[error("upload timed out")]
    UploadTimeout,
    #[error("image host returned HTTP {0}")]
    UploadHttpError(u16),
    #[error("image host unreachable")]
    UploadUnreachable,
    #[error("image host rejected the upload: {0}")]
    RemoteRejected(String),
    #[error("internal error")]
    Internal,
}

impl UploadError {
    /// Render the reply shown to the end user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => {
                "🚫 Too many requests. Please wait a minute before sending more images."
                    .to_string()
            }
            Self::MetadataUnavailable => {
                "❌ Error: Could not retrieve the file details from Telegram. Please try again."
                    .to_string()
            }
            Self::TooLarge { size, limit } => format!(
                "🚫 *Error*: The image is too large ({:.2}MB). The limit is {}MB.",
                megabytes(*size),
                limit / (1024 * 1024)
            ),
            Self::DownloadFailed => {
                "❌ Error: Could not download the image from Telegram servers.".to_string()
            }
            Self::UploadTimeout => {
                "❌ Upload Failed: The ImgBB server took too long to respond. Please try again."
                    .to_string()
            }
            Self::UploadHttpError(status) => {
                format!("❌ Upload Failed due to HTTP Error: {status}")
            }
            Self::UploadUnreachable => {
                "❌ Upload Failed: Could not connect to the ImgBB server.".to_string()
            }
            Self::RemoteRejected(message) => format!("❌ ImgBB Upload Failed: {message}"),
            Self::Internal => {
                "❌ An unexpected error occurred during the upload process.".to_string()
            }
        }
    }
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

// ============================================================================
// Collaborator Ports
// ============================================================================

/// Transport outcome talking to the image host. The client maps raw HTTP
/// errors into these before the pipeline ever sees them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("request timed out")]
    Timeout,
    #[error("unexpected HTTP status {0}")]
    Http(u16),
    #[error("transport failure")]
    Unreachable,
    #[error("rejected by host: {0}")]
    Rejected(String),
    /// Request could not even be constructed. Not user-attributable.
    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Source of platform-hosted file bytes (the messaging platform's file API).
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Resolve a file reference to its download path and byte size.
    async fn resolve(&self, file_id: &str) -> anyhow::Result<RemoteFile>;

    /// Fetch the full file content into memory.
    async fn fetch(&self, file: &RemoteFile) -> anyhow::Result<Bytes>;
}

/// Remote image-hosting API.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: Bytes, content_type: &str) -> Result<HostedImage, HostError>;
}

/// Intermediate stage transitions, surfaced so the caller can update its
/// progress message. Not part of the terminal result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Downloading,
    Uploading,
}

/// Observer for stage transitions.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn stage(&self, stage: UploadStage);
}

/// Progress sink that discards all transitions.
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn stage(&self, _stage: UploadStage) {}
}

// ============================================================================
// Upload Pipeline
// ============================================================================

/// Orchestrates one inbound image from admission to terminal outcome.
///
/// Stages run sequentially: admission, metadata fetch, size validation,
/// content retrieval, remote upload, response interpretation. Each stage is a
/// termination point; the first failure wins and later stages never run.
/// No lock is held across any await.
pub struct UploadPipeline {
    limiter: Arc<RateLimiter>,
    stats: Arc<ServiceStats>,
    max_bytes: u64,
    upload_timeout: Duration,
}

impl UploadPipeline {
    pub fn new(limiter: Arc<RateLimiter>, stats: Arc<ServiceStats>, max_bytes: u64) -> Self {
        Self {
            limiter,
            stats,
            max_bytes,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Override the remote-upload stage bound. Used by tests.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Run the full pipeline for one request. Always yields a terminal
    /// outcome; a panic anywhere in the stages is caught and reported as
    /// [`UploadError::Internal`] rather than propagated to the dispatcher.
    pub async fn process<S, H, P>(
        &self,
        source: &S,
        host: &H,
        progress: &P,
        request: UploadRequest,
    ) -> UploadOutcome
    where
        S: FileSource,
        H: ImageHost,
        P: ProgressSink,
    {
        let user_id = request.user_id;
        let stages = AssertUnwindSafe(self.run_stages(source, host, progress, request));

        match stages.catch_unwind().await {
            Ok(Ok(hosted)) => {
                self.stats.record_upload();
                info!(user_id, url = %hosted.url, "image uploaded");
                Ok(hosted)
            }
            Ok(Err(err)) => {
                warn!(user_id, %err, "upload failed");
                Err(err)
            }
            Err(_) => {
                error!(user_id, "upload pipeline panicked");
                Err(UploadError::Internal)
            }
        }
    }

    async fn run_stages<S, H, P>(
        &self,
        source: &S,
        host: &H,
        progress: &P,
        request: UploadRequest,
    ) -> Result<HostedImage, UploadError>
    where
        S: FileSource,
        H: ImageHost,
        P: ProgressSink,
    {
        if !self.limiter.admit(request.user_id) {
            return Err(UploadError::RateLimited);
        }

        let file = source.resolve(&request.file_id).await.map_err(|err| {
            warn!(user_id = request.user_id, "metadata fetch failed: {err:#}");
            UploadError::MetadataUnavailable
        })?;

        if file.size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: file.size,
                limit: self.max_bytes,
            });
        }

        progress.stage(UploadStage::Downloading).await;
        let image = source.fetch(&file).await.map_err(|err| {
            warn!(user_id = request.user_id, "download failed: {err:#}");
            UploadError::DownloadFailed
        })?;
        if (image.len() as u64) < file.size {
            warn!(
                user_id = request.user_id,
                got = image.len(),
                expected = file.size,
                "download truncated"
            );
            return Err(UploadError::DownloadFailed);
        }

        progress.stage(UploadStage::Uploading).await;
        let upload = host.upload(image, mime::IMAGE_JPEG.as_ref());
        match tokio::time::timeout(self.upload_timeout, upload).await {
            Ok(Ok(hosted)) => Ok(hosted),
            Ok(Err(HostError::Timeout)) => Err(UploadError::UploadTimeout),
            Ok(Err(HostError::Http(status))) => Err(UploadError::UploadHttpError(status)),
            Ok(Err(HostError::Unreachable)) => Err(UploadError::UploadUnreachable),
            Ok(Err(HostError::Rejected(message))) => Err(UploadError::RemoteRejected(message)),
            Ok(Err(HostError::Invalid(detail))) => {
                error!(user_id = request.user_id, detail, "malformed upload request");
                Err(UploadError::Internal)
            }
            Err(_elapsed) => Err(UploadError::UploadTimeout),
        }
    }
}
