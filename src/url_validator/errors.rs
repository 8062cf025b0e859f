use thiserror::Error;

/// Reasons a candidate URL is refused by the validator.
///
/// Messages are diagnostic and can echo parts of the input, so callers should
/// log them rather than show them verbatim to end users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUrlError {
    #[error("URL cannot be empty")]
    Empty,

    #[error("URL exceeds maximum allowed length of {max} characters (got {length})")]
    TooLong { length: usize, max: usize },

    #[error("URL is malformed or missing a valid scheme and domain/IP: {0}")]
    Malformed(String),

    #[error("Invalid URL scheme '{0}'. Only http, https are allowed")]
    DisallowedScheme(String),

    #[error("URL is missing a hostname (domain or IP address)")]
    MissingHost,

    #[error("Invalid Internationalized Domain Name (IDN): {0}")]
    InvalidIdn(String),

    #[error("URL points to a private or loopback IP address ({0}), which is not allowed")]
    PrivateAddress(String),

    #[error("URL points to a local-only hostname ({0}), which is not allowed")]
    LocalHostname(String),

    #[error("Normalized URL is empty or invalid after processing")]
    EmptyNormalized,
}
