use actix_web::{web, HttpResponse, Responder};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

use crate::api::config::ApiConfig;
use crate::api::models::{
    DeleteResponse, ErrorResponse, HealthStatus, QrRequest, QrResponse, RenderJob,
    ValidateRequest, ValidateResponse,
};
use crate::qr::{Color, GenerationError, OutputFormat, QrError, QrImage, RenderOptions};
use crate::storage::{unique_filename, QrStorage, StorageError};
use crate::url_validator::UrlValidator;

/// Largest module size a request may ask for
pub const MAX_MODULE_SIZE: u32 = 100;
/// Largest border a request may ask for, in modules
pub const MAX_BORDER: u32 = 100;

const MAX_ENQUEUE_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

fn qr_error_response(err: &QrError) -> HttpResponse {
    // Options inside the request bounds can still produce an image that is too
    // large once the symbol size is known
    if let QrError::Generation {
        source: GenerationError::TooLarge(_) | GenerationError::InvalidOptions(_),
        ..
    } = err
    {
        return invalid_options(err.to_string());
    }
    let kind = err.kind();
    let body = ErrorResponse::new(kind.as_str(), err.to_string());
    if kind.is_client_error() {
        HttpResponse::BadRequest().json(body)
    } else {
        HttpResponse::InternalServerError().json(body)
    }
}

fn storage_error_response(err: &StorageError) -> HttpResponse {
    match err {
        StorageError::InvalidFilename(_) => {
            HttpResponse::BadRequest().json(ErrorResponse::new("InvalidFilename", err.to_string()))
        }
        StorageError::NotFound(_) => {
            HttpResponse::NotFound().json(ErrorResponse::new("NotFound", err.to_string()))
        }
        StorageError::Io(_) => HttpResponse::InternalServerError()
            .json(ErrorResponse::new("StorageError", err.to_string())),
    }
}

fn invalid_options(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::new("InvalidOptions", message))
}

/// Applies the request's overrides on top of the configured defaults.
fn render_options(request: &QrRequest, defaults: &RenderOptions) -> Result<RenderOptions, String> {
    let mut options = defaults.clone();
    if let Some(module_size) = request.module_size {
        if module_size == 0 || module_size > MAX_MODULE_SIZE {
            return Err(format!("module_size must be between 1 and {}", MAX_MODULE_SIZE));
        }
        options.module_size = module_size;
    }
    if let Some(border) = request.border {
        if border > MAX_BORDER {
            return Err(format!("border must be at most {}", MAX_BORDER));
        }
        options.border = border;
    }
    if let Some(fill) = &request.fill_color {
        options.fill = fill.parse::<Color>().map_err(|e| e.to_string())?;
    }
    if let Some(back) = &request.back_color {
        options.back = back.parse::<Color>().map_err(|e| e.to_string())?;
    }
    Ok(options)
}

fn resolve_format(request: &QrRequest, config: &ApiConfig) -> Result<OutputFormat, QrError> {
    let format = match request.format.as_deref() {
        Some(raw) => raw.parse::<OutputFormat>()?,
        None => config.default_format,
    };
    if format == OutputFormat::Svg && !config.svg_enabled {
        return Err(QrError::UnsupportedFormat(format.to_string()));
    }
    Ok(format)
}

/// Waits for a job whose caller already gave up and removes the file it
/// saved, since nobody learned its name.
async fn discard_late_result(
    storage: QrStorage,
    filename: String,
    response_rx: oneshot::Receiver<Result<QrImage, QrError>>,
) {
    if let Ok(Ok(QrImage::Saved(_))) = response_rx.await {
        match storage.delete(&filename) {
            Ok(_) => debug!("Removed {} written after its request timed out", filename),
            Err(e) => warn!("Failed to remove orphaned {}: {}", filename, e),
        }
    }
}

/// Shared path of the POST and GET generation endpoints.
///
/// The format and URL are checked up front so bad requests never occupy the
/// queue; the render itself runs on a worker with a timeout.
async fn render_qr(
    request: QrRequest,
    config: &ApiConfig,
    validator: &UrlValidator,
    storage: &QrStorage,
    job_tx: &mpsc::Sender<RenderJob>,
) -> HttpResponse {
    let format = match resolve_format(&request, config) {
        Ok(format) => format,
        Err(e) => {
            warn!("Rejected QR request: {}", e);
            return qr_error_response(&e);
        }
    };

    let normalized = match validator.validate(&request.url) {
        Ok(url) => url,
        Err(source) => {
            warn!("Rejected invalid URL: {}", source);
            return qr_error_response(&QrError::InvalidUrl {
                url: request.url.clone(),
                source,
            });
        }
    };

    let options = match render_options(&request, &config.render_defaults) {
        Ok(options) => options,
        Err(message) => {
            warn!("Rejected render options: {}", message);
            return invalid_options(message);
        }
    };

    let stored = if request.store {
        let host = normalized.host();
        let filename = unique_filename(format, host.as_deref());
        match storage.path_for(&filename) {
            Ok(path) => Some((filename, path)),
            Err(e) => {
                error!("Failed to prepare storage path: {}", e);
                return storage_error_response(&e);
            }
        }
    } else {
        None
    };

    let (response_tx, mut response_rx) = oneshot::channel();
    let mut job = RenderJob {
        url: normalized.as_str().to_string(),
        format,
        options,
        output_path: stored.as_ref().map(|(_, path)| path.clone()),
        response_tx,
    };

    // Try sending a few times with a short delay between attempts
    let mut attempts = 0;
    loop {
        match job_tx.try_send(job) {
            Ok(()) => {
                debug!("Job enqueued after {} attempt(s)", attempts + 1);
                break;
            }
            Err(mpsc::error::TrySendError::Full(returned)) => {
                attempts += 1;
                if attempts >= MAX_ENQUEUE_ATTEMPTS {
                    warn!("Queue full after {} attempts, rejecting request", attempts);
                    return HttpResponse::TooManyRequests().json(ErrorResponse::new(
                        "ServerBusy",
                        format!(
                            "Server is busy, try again later. Queue has been full for {:?}",
                            RETRY_DELAY * attempts
                        ),
                    ));
                }
                warn!("Queue full, retrying (attempt {}/{})", attempts, MAX_ENQUEUE_ATTEMPTS);
                sleep(RETRY_DELAY).await;
                job = returned;
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("Render queue has been closed");
                return HttpResponse::ServiceUnavailable().json(ErrorResponse::new(
                    "Unavailable",
                    "Service is shutting down or unavailable.",
                ));
            }
        }
    }

    debug!("Waiting for result with timeout: {:?}", config.request_timeout);
    let image = match timeout(config.request_timeout, &mut response_rx).await {
        Ok(Ok(Ok(image))) => image,
        Ok(Ok(Err(e))) => {
            error!("QR generation failed: {}", e);
            return qr_error_response(&e);
        }
        Ok(Err(_)) => {
            error!("Worker channel closed unexpectedly");
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::new("GenerationFailed", "Worker dropped."));
        }
        Err(_) => {
            error!("Request timed out after {:?}", config.request_timeout);
            if let Some((filename, _)) = stored {
                tokio::spawn(discard_late_result(storage.clone(), filename, response_rx));
            }
            return HttpResponse::RequestTimeout()
                .json(ErrorResponse::new("Timeout", "Request timed out."));
        }
    };

    info!("Generated {} QR code for {}", format, normalized);
    match image {
        QrImage::Saved(path) => HttpResponse::Ok().json(QrResponse {
            status: "success".to_string(),
            normalized_url: normalized.into_string(),
            format,
            filename: stored.map(|(filename, _)| filename),
            path: Some(path.display().to_string()),
            data_url: None,
        }),
        QrImage::Bytes(bytes) if request.inline => HttpResponse::Ok().json(QrResponse {
            status: "success".to_string(),
            normalized_url: normalized.into_string(),
            format,
            filename: None,
            path: None,
            data_url: Some(format!(
                "data:{};base64,{}",
                format.content_type(),
                BASE64.encode(&bytes)
            )),
        }),
        QrImage::Bytes(bytes) => HttpResponse::Ok()
            .content_type(format.content_type())
            .body(bytes),
    }
}

/// `POST /api/validate`: normalizes a URL or explains why it is refused.
#[instrument(skip(validator))]
pub async fn validate_handler(
    request: web::Json<ValidateRequest>,
    validator: web::Data<UrlValidator>,
) -> impl Responder {
    match validator.validate(&request.url) {
        Ok(url) => {
            debug!("URL validation passed: {}", url);
            HttpResponse::Ok().json(ValidateResponse {
                status: "success".to_string(),
                normalized_url: url.into_string(),
            })
        }
        Err(e) => {
            warn!("Rejected invalid URL: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse::new("InvalidURL", e.to_string()))
        }
    }
}

/// `POST /api/qr`: renders a QR code from a JSON body.
///
/// Responds with raw image bytes, or with JSON when `store` or `inline` is set.
#[instrument(skip(config, validator, storage, job_tx), fields(url = %request.url))]
pub async fn generate_handler(
    request: web::Json<QrRequest>,
    config: web::Data<ApiConfig>,
    validator: web::Data<UrlValidator>,
    storage: web::Data<QrStorage>,
    job_tx: web::Data<mpsc::Sender<RenderJob>>,
) -> impl Responder {
    info!("Received QR request for URL: {}", request.url);
    render_qr(request.into_inner(), &config, &validator, &storage, &job_tx).await
}

/// `GET /api/qr`: same as the POST form with query parameters, always
/// answering with image bytes.
#[instrument(skip(config, validator, storage, job_tx), fields(url = %query.url))]
pub async fn generate_query_handler(
    query: web::Query<QrRequest>,
    config: web::Data<ApiConfig>,
    validator: web::Data<UrlValidator>,
    storage: web::Data<QrStorage>,
    job_tx: web::Data<mpsc::Sender<RenderJob>>,
) -> impl Responder {
    let request = QrRequest {
        store: false,
        inline: false,
        ..query.into_inner()
    };
    render_qr(request, &config, &validator, &storage, &job_tx).await
}

#[instrument(skip(storage))]
pub async fn download_handler(
    filename: web::Path<String>,
    storage: web::Data<QrStorage>,
) -> impl Responder {
    let filename = filename.into_inner();
    match storage.read(&filename) {
        Ok(bytes) => {
            let content_type = filename
                .rsplit_once('.')
                .and_then(|(_, ext)| ext.parse::<OutputFormat>().ok())
                .map(OutputFormat::content_type)
                .unwrap_or("application/octet-stream");
            HttpResponse::Ok().content_type(content_type).body(bytes)
        }
        Err(e) => {
            warn!("Download of {} failed: {}", filename, e);
            storage_error_response(&e)
        }
    }
}

/// Deleting a file that does not exist succeeds with `deleted: false`.
#[instrument(skip(storage))]
pub async fn delete_handler(
    filename: web::Path<String>,
    storage: web::Data<QrStorage>,
) -> impl Responder {
    let filename = filename.into_inner();
    match storage.delete(&filename) {
        Ok(deleted) => HttpResponse::Ok().json(DeleteResponse {
            status: "success".to_string(),
            filename,
            deleted,
        }),
        Err(e) => {
            error!("Delete of {} failed: {}", filename, e);
            storage_error_response(&e)
        }
    }
}

#[instrument(skip(config, job_tx))]
pub async fn health_check(
    config: web::Data<ApiConfig>,
    job_tx: web::Data<mpsc::Sender<RenderJob>>,
) -> impl Responder {
    let capacity = job_tx.max_capacity();
    let queued = capacity - job_tx.capacity();
    let status = if job_tx.is_closed() {
        warn!("Health check: render queue is closed");
        "unhealthy"
    } else if queued >= capacity {
        "degraded"
    } else {
        "healthy"
    };

    debug!("Health check: status={}, queued={}/{}", status, queued, capacity);
    HttpResponse::Ok().json(HealthStatus {
        status: status.to_string(),
        queued_jobs: queued,
        queue_capacity: capacity,
        workers: config.workers,
        uptime_secs: config.started_at.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_overrides() {
        let request = QrRequest {
            url: "example.com".to_string(),
            module_size: Some(4),
            border: Some(1),
            fill_color: Some("#123456".to_string()),
            ..QrRequest::default()
        };
        let options = render_options(&request, &RenderOptions::default()).unwrap();
        assert_eq!(options.module_size, 4);
        assert_eq!(options.border, 1);
        assert_eq!(options.fill, Color::new(0x12, 0x34, 0x56));
        assert_eq!(options.back, Color::WHITE);
    }

    #[test]
    fn test_render_options_rejects_bad_values() {
        let defaults = RenderOptions::default();
        for request in [
            QrRequest { module_size: Some(0), ..QrRequest::default() },
            QrRequest { module_size: Some(MAX_MODULE_SIZE + 1), ..QrRequest::default() },
            QrRequest { border: Some(MAX_BORDER + 1), ..QrRequest::default() },
            QrRequest { back_color: Some("transparent".to_string()), ..QrRequest::default() },
        ] {
            assert!(render_options(&request, &defaults).is_err(), "{:?}", request);
        }
    }

    #[test]
    fn test_oversized_render_is_client_error() {
        let err = QrError::Generation {
            url: "http://example.com".to_string(),
            source: GenerationError::TooLarge(22_900),
        };
        let resp = qr_error_response(&err);
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_late_stored_result_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = QrStorage::new(dir.path());
        let path = storage.path_for("late.png").unwrap();
        std::fs::write(&path, b"png").unwrap();

        let (tx, rx) = oneshot::channel();
        tx.send(Ok(QrImage::Saved(path.clone()))).unwrap();
        discard_late_result(storage.clone(), "late.png".to_string(), rx).await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_late_failure_leaves_storage_alone() {
        let dir = tempfile::tempdir().unwrap();
        let storage = QrStorage::new(dir.path());
        let path = storage.path_for("kept.png").unwrap();
        std::fs::write(&path, b"png").unwrap();

        let (tx, rx) = oneshot::channel::<Result<QrImage, QrError>>();
        drop(tx);
        discard_late_result(storage, "kept.png".to_string(), rx).await;
        assert!(path.exists());
    }

    #[test]
    fn test_resolve_format_honors_svg_switch() {
        let request = QrRequest {
            format: Some("svg".to_string()),
            ..QrRequest::default()
        };
        let mut config = ApiConfig::default();
        assert_eq!(resolve_format(&request, &config).unwrap(), OutputFormat::Svg);

        config.svg_enabled = false;
        assert!(matches!(
            resolve_format(&request, &config),
            Err(QrError::UnsupportedFormat(_))
        ));
        assert_eq!(
            resolve_format(&QrRequest::default(), &config).unwrap(),
            OutputFormat::Png
        );
    }
}
