use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use imager::config::{parse_size, AppConfig};
use imager::formats::supported_mime_types;
use imager::{CacheKey, CachedPayload, ImageFormatId, ImagerError, PlaceholderGenerator};

#[derive(Parser, Debug)]
#[command(name = "imager", version, about = "Render blank placeholder images")]
struct Args {
    /// MIME type to render, e.g. image/png (case-insensitive)
    #[arg(short, long)]
    format: Option<ImageFormatId>,

    /// Size as WIDTHxHEIGHT, e.g. 200x200
    #[arg(short, long, value_parser = size_arg)]
    size: Option<(u32, u32)>,

    /// Write the image here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print JSON metadata about the rendered image instead of its bytes
    #[arg(long)]
    info: bool,

    /// List the supported MIME types and exit
    #[arg(long)]
    list: bool,
}

fn size_arg(value: &str) -> Result<(u32, u32), String> {
    parse_size(value).ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))
}

#[derive(Serialize)]
struct PlaceholderInfo {
    mime_type: &'static str,
    codec: String,
    width: u32,
    height: u32,
    bytes: usize,
    etag: String,
    cache_key: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();

    // Logs go to stderr; stdout may carry image bytes
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if args.list {
        for mime in supported_mime_types() {
            println!("{}", mime);
        }
        return ExitCode::SUCCESS;
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Configuration loaded successfully");

    let generator = PlaceholderGenerator::from_config(&config);

    let sizes = config.prewarm_sizes();
    if !sizes.is_empty() {
        match generator.prewarm(config.default_format, &sizes) {
            Ok(count) => info!("Prewarmed {} {} placeholders", count, config.default_format),
            Err(e) => warn!("Prewarm stopped early: {}", e),
        }
    }

    let format = args.format.unwrap_or(config.default_format);
    let (width, height) = args
        .size
        .unwrap_or((config.default_width, config.default_height));

    let payload = match generator.get_bytes_async(format, width, height).await {
        Ok(payload) => payload,
        Err(e) => return report(e),
    };

    let result = if args.info {
        print_info(&generator, &payload, CacheKey::new(format, width, height))
    } else {
        write_payload(&payload, args.output.as_ref()).await
    };

    if let Err(e) = result {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    info!("{}", generator.stats());
    ExitCode::SUCCESS
}

fn report(e: ImagerError) -> ExitCode {
    error!("{}", e);
    if e.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn print_info(
    generator: &PlaceholderGenerator,
    payload: &CachedPayload,
    key: CacheKey,
) -> Result<(), String> {
    let decoded = generator.decode(payload.as_bytes()).map_err(|e| e.to_string())?;

    let info = PlaceholderInfo {
        mime_type: payload.content_type(),
        codec: format!("{:?}", decoded.format()),
        width: decoded.width(),
        height: decoded.height(),
        bytes: payload.len(),
        etag: payload.etag(),
        cache_key: key.to_string(),
    };

    let json = serde_json::to_string_pretty(&info).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn write_payload(payload: &CachedPayload, output: Option<&PathBuf>) -> Result<(), String> {
    match output {
        Some(path) => {
            tokio::fs::write(path, payload.as_bytes())
                .await
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            info!("Wrote {} bytes to {}", payload.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(payload.as_bytes())
                .await
                .map_err(|e| format!("Failed to write to stdout: {}", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| format!("Failed to flush stdout: {}", e))?;
        }
    }
    Ok(())
}
