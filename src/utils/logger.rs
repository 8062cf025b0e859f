use anyhow::Result;
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. With a `log_dir` the output goes to
/// a timestamped file inside it, otherwise to stdout.
pub fn init_logger(log_dir: Option<&Path>, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(false);

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let log_file = dir.join(format!("qr_genius_{}.log", timestamp));
            let subscriber = builder
                .with_ansi(false)
                .with_writer(fs::File::create(&log_file)?)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
            info!("Logger initialized, writing to {}", log_file.display());
        }
        None => {
            tracing::subscriber::set_global_default(builder.finish())?;
            info!("Logger initialized");
        }
    }

    Ok(())
}
