use std::time::{Duration, Instant};

use crate::config::{AppConfig, ConfigError};
use crate::qr::{OutputFormat, RenderOptions};

/// Runtime settings shared by the API handlers
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Format used when a request does not name one
    pub default_format: OutputFormat,

    /// Rendering options a request starts from before its own overrides
    pub render_defaults: RenderOptions,

    /// Whether SVG output may be requested
    pub svg_enabled: bool,

    /// How long a handler waits for a render job
    pub request_timeout: Duration,

    /// Number of render workers
    pub workers: usize,

    /// Capacity of the job queue
    pub queue_size: usize,

    /// When the server was started, for uptime reporting
    pub started_at: Instant,
}

impl ApiConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            default_format: config.default_format()?,
            render_defaults: config.render_options()?,
            svg_enabled: config.qr.svg_enabled,
            request_timeout: config.server.request_timeout(),
            workers: config.server.workers,
            queue_size: config.server.queue_size,
            started_at: Instant::now(),
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Png,
            render_defaults: RenderOptions::default(),
            svg_enabled: true,
            request_timeout: Duration::from_secs(30),
            workers: 4,
            queue_size: 100,
            started_at: Instant::now(),
        }
    }
}
