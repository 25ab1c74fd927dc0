//! `ufdr-extract <container> [--config <file>] [--summary] [--verbose]`
//!
//! Prints the extracted evidence set as JSON on stdout, or per-category
//! counts with `--summary`. Logs go to stderr; control them with RUST_LOG.

use std::path::PathBuf;
use std::process::ExitCode;

use ufdr_extract::{logging, EngineConfig, NormalizedEvidenceSet};

const USAGE: &str = "usage: ufdr-extract <container.ufdr> [--config <file.json>] [--summary] [--verbose]";

struct Args {
    container: PathBuf,
    config: Option<PathBuf>,
    summary: bool,
    verbose: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut container = None;
    let mut config = None;
    let mut summary = false;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            "--summary" => summary = true,
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            other if other.starts_with('-') => return Err(format!("unknown option: {}\n{}", other, USAGE)),
            other if container.is_none() => container = Some(PathBuf::from(other)),
            other => return Err(format!("unexpected argument: {}\n{}", other, USAGE)),
        }
    }

    Ok(Args {
        container: container.ok_or_else(|| USAGE.to_string())?,
        config,
        summary,
        verbose,
    })
}

fn print_summary(set: &NormalizedEvidenceSet) {
    println!("container:  {:?}", set.metadata.container_kind);
    if let Some(manifest) = &set.metadata.manifest_path {
        println!("manifest:   {}", manifest);
    }
    if let Some(model) = &set.device_info.model {
        println!("device:     {}", model);
    }
    println!("chats:      {}", set.chat_records.len());
    println!("calls:      {}", set.call_records.len());
    println!("contacts:   {}", set.contacts.len());
    println!("media:      {}", set.media_files.len());
    println!("artifacts:  {}", set.metadata.artifacts.len());
    println!("skipped:    {}", set.metadata.skipped.len());
    println!("duplicates: {}", set.metadata.duplicates_suppressed);
}

fn run(args: Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => EngineConfig::default(),
    };

    let set = ufdr_extract::extract_path(&args.container, config).map_err(|e| e.to_string())?;

    if args.summary {
        print_summary(&set);
    } else {
        let json = serde_json::to_string_pretty(&set).map_err(|e| e.to_string())?;
        println!("{}", json);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    if args.verbose {
        logging::init_verbose();
    } else {
        logging::init();
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}
