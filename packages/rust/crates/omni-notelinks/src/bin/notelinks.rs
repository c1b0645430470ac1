#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use omni_notelinks::{ApplyOptions, NoteLinksConfig, ScanOptions, apply, init_logger, notes, scan};

const NOTES_FOLDER_ENV: &str = "NOTELINKS_NOTES_FOLDER";

#[derive(Parser, Debug)]
#[command(
    name = "notelinks",
    about = "Maintain backlinks sections across a folder of markdown notes",
    arg_required_else_help = true
)]
struct Cli {
    /// Explicit notelinks config file (YAML).
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the notes folder and record which notes need new backlinks.
    Scan {
        #[arg(value_name = "DIR", env = NOTES_FOLDER_ENV)]
        dir: PathBuf,
        /// Discard the persisted index and process every note.
        #[arg(long, default_value_t = false)]
        rebuild: bool,
    },
    /// Rewrite the backlinks section of notes flagged by the last scan.
    Apply {
        #[arg(value_name = "DIR", env = NOTES_FOLDER_ENV)]
        dir: PathBuf,
        /// Rewrite every note, flagged or not.
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Print the indexed notes with their links.
    Notes {
        #[arg(value_name = "DIR", env = NOTES_FOLDER_ENV)]
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger();

    let config = NoteLinksConfig::resolve(cli.config_file.as_deref())?;
    match &cli.command {
        Command::Scan { dir, rebuild } => {
            let report = scan(dir, &config, ScanOptions { rebuild: *rebuild })
                .with_context(|| format!("scan of {} failed", dir.display()))?;
            emit(&report, cli.output)
        }
        Command::Apply { dir, all } => {
            let report = apply(dir, &config, ApplyOptions { all: *all })?;
            emit(&report, cli.output)
        }
        Command::Notes { dir } => emit(&notes(dir, &config)?, cli.output),
    }
}
