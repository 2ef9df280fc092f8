mod resolve;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use {
    clap::Parser,
    pageshot_capture::{CaptureConfig, CaptureRequest, ChromiumSession, capture},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::resolve::{resolve_output, resolve_source};

#[derive(Parser)]
#[command(
    name = "pageshot",
    about = "Render a page in headless Chrome and save a full-page screenshot"
)]
struct Cli {
    /// URL of the remote page to render.
    #[arg(long)]
    url: Option<String>,

    /// Path to a local HTML file to render.
    #[arg(long)]
    html: Option<PathBuf>,

    /// URL or HTML file path, auto-detected by http(s):// prefix or file
    /// existence.
    #[arg(value_name = "INPUT")]
    input: Option<String>,

    /// Destination image path. Defaults to the input basename with a .png
    /// extension, or screenshot.png for URLs.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Rendering DPI; 96 corresponds to a device scale factor of 1.0.
    #[arg(long, default_value_t = 200)]
    dpi: u32,

    /// Capture quality, 0-100. 100 produces PNG, lower values JPEG.
    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: u8,

    /// Seconds to wait for the page to reach network idle.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Chrome/Chromium executable to use.
    #[arg(long, env = "CHROME")]
    chrome: Option<String>,

    /// Show the browser window instead of running headless.
    #[arg(long, default_value_t = false)]
    headful: bool,

    /// Exit with code 2 on usage errors instead of the default no-op
    /// success.
    #[arg(long, default_value_t = false)]
    strict_usage: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Write the image bytes to the destination path, overwriting any existing
/// file. Called only after a fully successful capture, so a failed run
/// never leaves a partial file behind.
fn write_output(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let source = match resolve_source(cli.url.clone(), cli.html.clone(), cli.input.clone()) {
        Ok(source) => source,
        Err(err) => {
            // Usage problems are a no-op success by default so scripted
            // callers can probe safely; --strict-usage opts into exit 2.
            eprintln!("{err}");
            eprintln!(
                "Usage: pageshot [--url <URL> | --html <FILE> | <INPUT>] \
                 [--output <PATH>] [--dpi <N>] [--quality <N>]"
            );
            return Ok(if cli.strict_usage {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            });
        },
    };

    let output = resolve_output(&source, cli.output.clone());

    let config = CaptureConfig {
        chrome_path: cli.chrome.clone(),
        headless: !cli.headful,
        ready_timeout_ms: cli.timeout.saturating_mul(1000),
        ..CaptureConfig::default()
    };

    let request = CaptureRequest {
        source,
        quality: cli.quality,
        dpi: Some(cli.dpi),
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %request.source,
        output = %output.display(),
        "pageshot starting"
    );

    // The session is released on every path; only a successful capture
    // reaches the byte write.
    let session = ChromiumSession::launch(&config).await?;
    let result = capture(
        &session,
        &request,
        Duration::from_millis(config.ready_timeout_ms),
    )
    .await;
    session.close().await;

    let bytes = result?;
    write_output(&output, &bytes)?;

    info!(
        bytes = bytes.len(),
        output = %output.display(),
        "screenshot written"
    );

    Ok(ExitCode::SUCCESS)
}
