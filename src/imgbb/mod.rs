use crate::pipeline::{HostError, HostedImage, ImageHost};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Production upload endpoint.
pub const DEFAULT_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

const FALLBACK_ERROR: &str = "Unknown upload error.";

/// Client for the ImgBB upload API.
///
/// One POST per upload: the API key as a form field plus the raw bytes as an
/// `image` multipart part. The response carries a `success` flag and either a
/// `data` object with the hosted URLs or an `error` object with a message.
pub struct ImgbbClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl ImgbbClient {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    success: bool,
    data: Option<ApiData>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    url: String,
    delete_url: String,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[async_trait]
impl ImageHost for ImgbbClient {
    async fn upload(&self, image: Bytes, content_type: &str) -> Result<HostedImage, HostError> {
        let part = Part::bytes(image.to_vec())
            .file_name("image.jpg")
            .mime_str(content_type)
            .map_err(|err| HostError::Invalid(err.to_string()))?;
        let form = Form::new()
            .text("key", self.api_key.clone())
            .part("image", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "imgbb returned non-success status");
            return Err(HostError::Http(status.as_u16()));
        }

        let body: ApiResponse = response.json().await.map_err(|err| {
            warn!("imgbb response body unparseable: {err}");
            HostError::Rejected(FALLBACK_ERROR.to_string())
        })?;

        match (body.success, body.data) {
            (true, Some(data)) => {
                debug!(url = %data.url, "imgbb accepted upload");
                Ok(HostedImage {
                    url: data.url,
                    delete_url: data.delete_url,
                    title: data.title,
                })
            }
            _ => {
                let message = body
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| FALLBACK_ERROR.to_string());
                warn!(message, "imgbb declined upload");
                Err(HostError::Rejected(message))
            }
        }
    }
}

fn classify_transport(err: reqwest::Error) -> HostError {
    if err.is_timeout() {
        HostError::Timeout
    } else {
        debug!("imgbb transport error: {err}");
        HostError::Unreachable
    }
}
