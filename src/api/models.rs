use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::qr::{OutputFormat, QrError, QrImage, RenderOptions};

/// Body of `POST /api/validate`
#[derive(Debug, Deserialize, Clone)]
pub struct ValidateRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub status: String,
    pub normalized_url: String,
}

/// Generation request, read from a JSON body or from query parameters.
/// Unset fields fall back to the configured defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct QrRequest {
    pub url: String,

    /// PNG or SVG, case-insensitive
    pub format: Option<String>,

    pub module_size: Option<u32>,

    pub border: Option<u32>,

    /// `#rgb`, `#rrggbb` or a color name
    pub fill_color: Option<String>,

    pub back_color: Option<String>,

    /// Save the image in storage and answer with its file name
    #[serde(default)]
    pub store: bool,

    /// Answer with JSON carrying a base64 data URL instead of raw bytes
    #[serde(default)]
    pub inline: bool,
}

/// JSON answer for stored or inline images
#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub status: String,
    pub normalized_url: String,
    pub format: OutputFormat,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: String,
    pub filename: String,
    /// False when the file was already gone
    pub deleted: bool,
}

/// Work item for the render queue
#[derive(Debug)]
pub struct RenderJob {
    /// Already validated URL
    pub url: String,
    pub format: OutputFormat,
    pub options: RenderOptions,
    /// Where to save the image; bytes are returned when unset
    pub output_path: Option<PathBuf>,
    pub response_tx: oneshot::Sender<Result<QrImage, QrError>>,
}

/// Health status response for the /health endpoint
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// healthy, or degraded when the job queue is full
    pub status: String,

    pub queued_jobs: usize,

    pub queue_capacity: usize,

    pub workers: usize,

    pub uptime_secs: u64,
}

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,

    /// Machine readable category, e.g. InvalidURL or UnsupportedFormat
    pub kind: String,

    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}
