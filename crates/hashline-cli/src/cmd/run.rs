//! `hashline run` - fingerprint a list of items

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;

use hashline_core::{
    CancelToken, DigestKind, Fingerprint, PipelineBuilder, SharedProgress, fingerprint,
};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Items to fingerprint
    pub items: Vec<String>,

    /// Read additional items from a file, one per line ("-" for stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Digest used for checksums (crc32, md5, xxh32, xxh64, blake3)
    #[arg(long)]
    pub hash1: Option<DigestKind>,

    /// Digest applied before the right-hand checksum (crc32, md5, xxh32, xxh64, blake3)
    #[arg(long)]
    pub hash2: Option<DigestKind>,

    /// Items each stage may process at once
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Concurrent digest calls per stage
    #[arg(long)]
    pub max_digest_calls: Option<usize>,

    /// Seconds to wait for an item's sub-tasks before failing it
    #[arg(long)]
    pub join_timeout: Option<u64>,

    /// Print a JSON report instead of the bare fingerprint
    #[arg(long)]
    pub json: bool,
}

/// Machine-readable run report (`--json`).
#[derive(Debug, Serialize)]
struct Report<'a> {
    started_at: String,
    elapsed_ms: u64,
    items: usize,
    hash1: DigestKind,
    hash2: DigestKind,
    fingerprint: &'a str,
    failures: Vec<FailureReport<'a>>,
}

#[derive(Debug, Serialize)]
struct FailureReport<'a> {
    stage: &'a str,
    item: &'a str,
    error: String,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let mut items = args.items;
    if let Some(path) = &args.input {
        items.extend(read_items(path)?);
    }
    if items.is_empty() {
        bail!("no input items (pass them as arguments or with --input)");
    }

    let mut section = config.pipeline;
    if let Some(n) = args.max_in_flight {
        section.max_in_flight = n;
    }
    if let Some(n) = args.max_digest_calls {
        section.max_digest_calls = n;
    }
    if let Some(secs) = args.join_timeout {
        section.join_timeout_secs = secs;
    }
    let pipeline_config = section.to_pipeline_config();
    let hash1 = args.hash1.unwrap_or(config.digest.hash1);
    let hash2 = args.hash2.unwrap_or(config.digest.hash2);

    let cancel = CancelToken::new();
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, cancel.flag())
            .context("Failed to register signal handler")?;
    }

    log::debug!(
        "hash1={hash1} hash2={hash2} max_in_flight={} max_digest_calls={} join_timeout={}s",
        pipeline_config.max_in_flight,
        pipeline_config.max_digest_calls,
        pipeline_config.join_timeout.as_secs()
    );

    let started_at = chrono::Utc::now();
    let builder = PipelineBuilder::new(pipeline_config, cancel).with_progress(progress.clone());
    let result = fingerprint(items, hash1.shared(), hash2.shared(), builder)?;

    if args.json {
        let report = build_report(&result, started_at, hash1, hash2);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", result.value);
    }

    if !result.is_complete() {
        for failure in &result.failures {
            log::error!("{failure}");
        }
        bail!(
            "{} of {} items failed; fingerprint covers the rest",
            result.failures.len(),
            result.items
        );
    }
    Ok(())
}

/// Read one item per line from a file or stdin, skipping blank lines.
fn read_items(path: &Path) -> Result<Vec<String>> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read items from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read items from {}", path.display()))?
    };
    Ok(parse_items(&content))
}

fn parse_items(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn build_report<'a>(
    result: &'a Fingerprint,
    started_at: chrono::DateTime<chrono::Utc>,
    hash1: DigestKind,
    hash2: DigestKind,
) -> Report<'a> {
    Report {
        started_at: started_at.to_rfc3339(),
        elapsed_ms: result.elapsed.as_millis() as u64,
        items: result.items,
        hash1,
        hash2,
        fingerprint: &result.value,
        failures: result
            .failures
            .iter()
            .map(|f| FailureReport {
                stage: f.stage,
                item: &f.item,
                error: f.error.to_string(),
            })
            .collect(),
    }
}
