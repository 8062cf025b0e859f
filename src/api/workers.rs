use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, trace, warn};

use crate::api::models::RenderJob;
use crate::qr::QrGenerator;

/// Starts `count` workers that pull render jobs from the shared queue.
///
/// Encoding is CPU-bound, so each job runs on the blocking pool. A worker
/// exits once every sender has been dropped.
pub fn start_workers(job_rx: mpsc::Receiver<RenderJob>, generator: Arc<QrGenerator>, count: usize) {
    let job_rx = Arc::new(Mutex::new(job_rx));

    info!("Spawning {} render workers", count);
    for worker_id in 0..count {
        let generator = generator.clone();
        let job_rx = job_rx.clone();

        tokio::spawn(async move {
            debug!("Worker {} started", worker_id);
            loop {
                trace!("Worker {} waiting for job", worker_id);
                let job_opt = { job_rx.lock().await.recv().await };

                let job = match job_opt {
                    Some(job) => job,
                    None => {
                        info!("Worker {} shutting down - channel closed", worker_id);
                        break;
                    }
                };

                debug!("Worker {} rendering {} for {}", worker_id, job.format, job.url);
                let RenderJob {
                    url,
                    format,
                    options,
                    output_path,
                    response_tx,
                } = job;

                let generator = generator.clone();
                let result = tokio::task::spawn_blocking(move || {
                    generator.generate_as(&url, format, &options, output_path.as_deref())
                })
                .await;

                let result = match result {
                    Ok(result) => result,
                    Err(e) => {
                        // Dropping the sender reports the failure to the handler
                        error!("Worker {} render task failed: {}", worker_id, e);
                        continue;
                    }
                };

                match &result {
                    Ok(_) => debug!("Worker {} completed job successfully", worker_id),
                    Err(e) => warn!("Worker {} job failed: {}", worker_id, e),
                }

                if response_tx.send(result).is_err() {
                    warn!("Worker {} failed to send response - receiver dropped", worker_id);
                }
            }
        });
    }
}
