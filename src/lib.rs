//! QR Code Genius: URL validation and QR code generation, usable as a
//! library, from the command line, or over HTTP.

pub mod api;
pub mod config;
pub mod qr;
pub mod storage;
pub mod url_validator;
pub mod utils;

pub use config::AppConfig;
pub use qr::{ErrorKind, OutputFormat, QrError, QrGenerator, QrImage, RenderOptions};
pub use storage::{unique_filename, QrStorage, StorageError};
pub use url_validator::{validate, InvalidUrlError, NormalizedUrl, UrlValidator, ValidatorPolicy};
