//! Entry point for the narration runner.
//!
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml`.
//! - Index the document, optionally jump to a page, and narrate into the log.
//! - Optionally write the read-along transcript as JSON.

mod sources;

use crate::sources::{LogNarrator, PlainTextSource};
use anyhow::{Context, Result, anyhow};
use narrator_core::{SyncEvent, SyncSession, load_config};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: pdf-narrator <pdftotext-output> [--page N] [--sentences N] \
                     [--export transcript.json] [--config path]";

#[derive(Debug)]
struct Args {
    text_path: PathBuf,
    config_path: PathBuf,
    page: Option<usize>,
    sentences: usize,
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle).await {
        error!("{err:?}");
        std::process::exit(1);
    }
}

async fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(&args.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %args.text_path.display(),
        level = %config.log_level,
        debounce_ms = config.debounce_ms,
        strategy = %config.mapping_strategy,
        "Starting narration"
    );

    let session = SyncSession::new(config);
    session.subscribe(|event| match event {
        SyncEvent::StateChanged { state } => debug!(
            page = state.current_page,
            sentence = state.current_sentence_index,
            position = state.playback_position,
            "Playback state changed"
        ),
        SyncEvent::Redirected {
            requested_page,
            resolved_page,
        } => info!(requested_page, resolved_page, "Empty page skipped"),
        SyncEvent::Error { info, recovered } if !recovered => {
            warn!(error_type = %info.error_type, "{}", info.user_message());
        }
        SyncEvent::Error { .. } => {}
    });

    let shutdown = session.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C; stopping narration");
        shutdown.destroy();
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }

    let source = PlainTextSource::open(&args.text_path)?;
    let state = session
        .load_document(&source)
        .with_context(|| format!("Failed to index {}", args.text_path.display()))?;
    info!(
        pages = state.total_pages,
        sentences = state.total_sentences,
        "Document ready"
    );

    if let Some(export) = &args.export {
        let transcript = session
            .transcript()
            .ok_or_else(|| anyhow!("No document loaded"))?;
        fs::write(export, transcript.to_json_pretty()?)
            .with_context(|| format!("Failed to write {}", export.display()))?;
        info!(path = %export.display(), "Wrote transcript");
    }

    if let Some(page) = args.page
        && !session.navigate_to_page(page, false).await
    {
        return Err(anyhow!("Could not open page {page}"));
    }

    session.set_playing(true);
    let spoken = session.narrate(&LogNarrator, args.sentences);
    if !session.verify_sync() {
        warn!("Narration drifted from the page view");
    }
    let stats = session.errors().stats();
    info!(spoken, errors = stats.total, "Narration finished");
    session.destroy();
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut text_path = None;
    let mut parsed = Args {
        text_path: PathBuf::new(),
        config_path: PathBuf::from("conf/config.toml"),
        page: None,
        sentences: usize::MAX,
        export: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--page" => parsed.page = Some(parse_number(&mut args, "--page")?),
            "--sentences" => parsed.sentences = parse_number(&mut args, "--sentences")?,
            "--export" => parsed.export = Some(PathBuf::from(next_value(&mut args, "--export")?)),
            "--config" => parsed.config_path = PathBuf::from(next_value(&mut args, "--config")?),
            flag if flag.starts_with("--") => return Err(anyhow!("Unknown flag {flag}\n{USAGE}")),
            _ if text_path.is_none() => text_path = Some(PathBuf::from(arg)),
            _ => return Err(anyhow!("Unexpected argument {arg}\n{USAGE}")),
        }
    }

    let text_path = text_path.ok_or_else(|| anyhow!(USAGE))?;
    if !Path::new(&text_path).exists() {
        return Err(anyhow!("File not found: {}", text_path.display()));
    }
    parsed.text_path = text_path;
    Ok(parsed)
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} expects a value\n{USAGE}"))
}

fn parse_number(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<usize> {
    let value = next_value(args, flag)?;
    value
        .parse()
        .with_context(|| format!("{flag} expects a number, got {value}"))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
