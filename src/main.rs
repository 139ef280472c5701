//! Entry point for insight-reader.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Run the fetch/extract/analyze pipeline and print the insight.
//! - Optionally read the insight aloud with terminal controls, until the
//!   user quits or, once stdin is exhausted, until playback ends.

use anyhow::{Context, Result, anyhow};
use insight_reader::cancellation::CancellationToken;
use insight_reader::config::{AppConfig, load_config, serialize_config};
use insight_reader::controls::{Controls, read_aloud};
use insight_reader::pipeline::{InputSource, Pipeline};
use insight_reader::session::InsightsView;
use insight_reader::speech::{SpeechAdapter, UtteranceConfig, default_platform};
use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str =
    "Usage: insight-reader [--config <path>] [--speak] [--no-cache] [--print-config] <url|file|->";

struct CliArgs {
    config_path: PathBuf,
    speak: bool,
    no_cache: bool,
    print_config: bool,
    source: Option<String>,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config = load_config(&args.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());

    if args.print_config {
        print!("{}", serialize_config(&config).context("Serializing configuration")?);
        return Ok(());
    }
    let source = args.source.as_deref().ok_or_else(|| anyhow!(USAGE))?;
    let source = read_source(source)?;

    info!(
        provider = %config.analysis_provider,
        model = %config.analysis_model,
        poll_ms = config.poll_interval().as_millis() as u64,
        "Starting insight-reader"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Building async runtime")?;
    let result = runtime.block_on(run_async(args, config, source));
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();
    result
}

async fn run_async(args: CliArgs, config: AppConfig, source: InputSource) -> Result<()> {
    let mut pipeline = Pipeline::from_config(&config)?;
    if args.no_cache {
        pipeline = pipeline.without_cache();
    }
    let insight = pipeline.run(source).await?;
    if let Some(title) = &insight.title {
        println!("# {title}\n");
    }
    println!("{}", insight.text);
    if insight.from_cache {
        info!("Insight served from cache");
    }

    if !args.speak {
        return Ok(());
    }

    let token = CancellationToken::new();
    let handler_token = token.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C; stopping playback");
        handler_token.cancel();
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }

    let adapter = Arc::new(SpeechAdapter::new(default_platform(&config)));
    let mut view = InsightsView::open(
        adapter,
        insight.text,
        UtteranceConfig::from_app_config(&config),
        config.poll_interval(),
    );
    let controls = Controls::from_config(&config);
    let stdin = BufReader::new(tokio::io::stdin());
    let result = read_aloud(&mut view, &controls, &token, stdin).await;
    view.close().await;
    match result.context("Reading controls from stdin")? {
        Some(Err(err)) => warn!("Last utterance failed: {err}"),
        Some(Ok(outcome)) => info!(?outcome, "Read-aloud finished"),
        None => info!("Read-aloud stopped"),
    }
    Ok(())
}

fn read_source(arg: &str) -> Result<InputSource> {
    if arg == "-" {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("Reading document from stdin")?;
        return Ok(InputSource::from_document(contents));
    }
    let lower = arg.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Ok(InputSource::Url(arg.to_string()));
    }
    let path = Path::new(arg);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let is_html = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    if is_html {
        return Ok(InputSource::Html(contents));
    }
    Ok(InputSource::from_document(contents))
}

fn parse_args() -> Result<CliArgs> {
    let mut parsed = CliArgs {
        config_path: PathBuf::from("conf/config.toml"),
        speak: false,
        no_cache: false,
        print_config: false,
        source: None,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                parsed.config_path = PathBuf::from(path);
            }
            "--speak" => parsed.speak = true,
            "--no-cache" => parsed.no_cache = true,
            "--print-config" => parsed.print_config = true,
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            other if parsed.source.is_none() && (other == "-" || !other.starts_with('-')) => {
                parsed.source = Some(other.to_string());
            }
            other => return Err(anyhow!("Unexpected argument {other:?}\n{USAGE}")),
        }
    }
    Ok(parsed)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        info!("RUST_LOG is set; ignoring config log level");
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
