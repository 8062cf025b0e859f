use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use qr_genius::api::start_server;
use qr_genius::config::AppConfig;
use qr_genius::qr::{Color, OutputFormat, QrGenerator, QrImage};
use qr_genius::storage::unique_filename;
use qr_genius::url_validator::UrlValidator;
use qr_genius::utils::logger::init_logger;

#[derive(Parser, Debug)]
#[command(name = "qr_genius", version, about = "Validate URLs and turn them into QR codes")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a URL and print its normalized form
    Validate { url: String },

    /// Generate a QR code for a URL
    Generate {
        url: String,

        /// PNG or SVG; defaults to the configured format
        #[arg(short, long)]
        format: Option<String>,

        /// Output file; "-" writes the image to stdout. Defaults to a
        /// generated name in the storage directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        module_size: Option<u32>,

        #[arg(long)]
        border: Option<u32>,

        #[arg(long)]
        fill_color: Option<Color>,

        #[arg(long)]
        back_color: Option<Color>,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    init_logger(config.logging.dir.as_deref(), &config.logging.level)?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            start_server(&config).await?;
        }
        Command::Validate { url } => {
            let validator = UrlValidator::new(config.validator_policy());
            match validator.validate(&url) {
                Ok(normalized) => println!("{}", normalized),
                Err(e) => {
                    error!("Validation failed: {}", e);
                    anyhow::bail!("invalid URL: {}", e);
                }
            }
        }
        Command::Generate {
            url,
            format,
            output,
            module_size,
            border,
            fill_color,
            back_color,
        } => {
            let format = match format {
                Some(format) => format.parse::<OutputFormat>()?,
                None => config.default_format()?,
            };
            if format == OutputFormat::Svg && !config.qr.svg_enabled {
                anyhow::bail!("SVG output is disabled by configuration");
            }

            let mut options = config.render_options()?;
            if let Some(module_size) = module_size {
                options.module_size = module_size;
            }
            if let Some(border) = border {
                options.border = border;
            }
            if let Some(fill) = fill_color {
                options.fill = fill;
            }
            if let Some(back) = back_color {
                options.back = back;
            }

            let generator = QrGenerator::new(UrlValidator::new(config.validator_policy()));
            let output = match output {
                Some(path) if path.as_os_str() == "-" => None,
                Some(path) => Some(path),
                None => {
                    let host = generator.validator().validate(&url).ok().and_then(|u| u.host());
                    Some(config.qr.storage_dir.join(unique_filename(format, host.as_deref())))
                }
            };

            match generator.generate_as(&url, format, &options, output.as_deref())? {
                QrImage::Saved(path) => {
                    info!("Wrote {} QR code to {}", format, path.display());
                    println!("{}", path.display());
                }
                QrImage::Bytes(bytes) => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
            }
        }
    }

    Ok(())
}
