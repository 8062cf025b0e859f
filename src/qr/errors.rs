use thiserror::Error;

use crate::url_validator::InvalidUrlError;

/// Coarse error categories used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUrl,
    UnsupportedFormat,
    GenerationFailed,
}

impl ErrorKind {
    /// Whether the caller caused the failure (bad input) rather than the server.
    pub fn is_client_error(self) -> bool {
        !matches!(self, ErrorKind::GenerationFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "InvalidURL",
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::GenerationFailed => "GenerationFailed",
        }
    }
}

/// Low-level cause of a failed render or write.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid render options: {0}")]
    InvalidOptions(String),

    #[error("rendered image would be {0} pixels wide, which is too large")]
    TooLarge(u64),
}

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Invalid URL provided: '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: InvalidUrlError,
    },

    #[error("Unsupported QR code format: '{0}'. Supported formats are PNG, SVG")]
    UnsupportedFormat(String),

    #[error("Failed to generate QR code for URL '{url}': {source}")]
    Generation {
        url: String,
        #[source]
        source: GenerationError,
    },
}

impl QrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QrError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            QrError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            QrError::Generation { .. } => ErrorKind::GenerationFailed,
        }
    }

    pub(crate) fn generation(url: &str, source: impl Into<GenerationError>) -> Self {
        QrError::Generation {
            url: url.to_string(),
            source: source.into(),
        }
    }
}
