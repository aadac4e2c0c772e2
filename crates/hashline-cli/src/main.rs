//! hashline - deterministic fingerprints from concurrent fan-out hashing
//!
//! Feeds items through SingleHash → MultiHash → CombineResults and prints
//! the combined fingerprint.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;
use hashline_core::{ProgressContext, Verbosity};

#[derive(Parser)]
#[command(name = "hashline")]
#[command(about = "Deterministic fingerprints from concurrent fan-out hashing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./hashline.toml or ~/.config/hashline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fingerprint items given as arguments, a file, or stdin
    Run(cmd::run::RunArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, stage lines show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    hashline_core::init_logging(Verbosity::from_flags(quiet, cli.debug), multi)
        .context("Failed to initialize logging")?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Hash1", config.digest.hash1.name()]);
            table.add_row(vec!["Hash2", config.digest.hash2.name()]);
            table.add_row(vec![
                "Max in-flight items",
                &config.pipeline.max_in_flight.to_string(),
            ]);
            table.add_row(vec![
                "Max digest calls",
                &config.pipeline.max_digest_calls.to_string(),
            ]);
            table.add_row(vec![
                "Join timeout",
                &format!("{}s", config.pipeline.join_timeout_secs),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
