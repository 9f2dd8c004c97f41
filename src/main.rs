//! Command-line wrapper around the replay parser.
//!
//! Prints a human-readable report and writes the JSON export document next
//! to the replay (or to `--output`).

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use sgreplay::catalog::{AbilityCatalog, StructureCatalog};
use sgreplay::export::{Document, ExportOptions};
use sgreplay::wire::SimplifyOptions;
use sgreplay::{raw, Catalogs, Log};

/// Parse Stormgate replay files (.SGReplay).
#[derive(Debug, Parser)]
#[command(name = "sgreplay", version, about)]
struct Args {
    /// Path to the .SGReplay file.
    replay: PathBuf,

    /// Export the full action stream instead of just the summary.
    #[arg(long)]
    json: bool,

    /// Output JSON file path (default: derived from the replay name).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Suppress console output (only write the JSON export).
    #[arg(long, short)]
    quiet: bool,

    /// Disable capability-name lookup.
    #[arg(long)]
    no_lookup: bool,

    /// Capability dictionary (the game's runtime_session.json).
    #[arg(long, default_value = "assets/runtime_session.json")]
    lookup: PathBuf,

    /// Structure dictionary used to filter build orders.
    #[arg(long, default_value = "assets/buildings.json")]
    structures: PathBuf,

    /// Keep a truncated hex preview of opaque byte leaves in the export.
    #[arg(long)]
    include_bytes: bool,

    /// Maximum number of bytes in the hex preview.
    #[arg(long, default_value_t = 64)]
    bytes_hex_limit: usize,

    /// Include the raw record trees in the export (large).
    #[arg(long)]
    include_messages: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let catalogs = load_catalogs(&args);

    let raw = raw::parse_file(&args.replay)?;
    let mut log = sgreplay::process(&raw, &catalogs);
    log.set_file_name(
        args.replay
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
    );

    if !args.quiet {
        report(&log);
    }

    let opts = ExportOptions {
        include_actions: args.json,
        include_messages: args.include_messages,
        simplify: SimplifyOptions {
            include_bytes: args.include_bytes,
            bytes_hex_limit: args.bytes_hex_limit,
        },
    };
    let document = Document::new(&log, Some(&raw), &opts);

    let output = args.output.clone().unwrap_or_else(|| {
        let stem = args
            .replay
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "replay".to_owned());
        let suffix = if args.json { "_actions.json" } else { "_summary.json" };
        args.replay.with_file_name(format!("{}{}", stem, suffix))
    });
    fs::write(&output, serde_json::to_string_pretty(&document)?)?;
    if !args.quiet {
        println!();
        println!("Exported to: {}", output.display());
    }

    Ok(())
}

fn load_catalogs(args: &Args) -> Catalogs {
    if args.no_lookup {
        return Catalogs::default();
    }

    let abilities = match AbilityCatalog::from_path(&args.lookup) {
        Ok(catalog) => {
            if !args.quiet {
                println!("Loaded capability dictionary ({} entries)", catalog.len());
            }
            Some(catalog)
        }
        Err(error) => {
            warn!(path = %args.lookup.display(), %error, "capability dictionary unavailable");
            None
        }
    };
    let structures = match StructureCatalog::from_path(&args.structures) {
        Ok(catalog) => Some(catalog),
        Err(error) => {
            warn!(path = %args.structures.display(), %error, "structure dictionary unavailable");
            None
        }
    };

    Catalogs {
        abilities,
        structures,
    }
}

fn report(log: &Log) {
    println!("{:=<60}", "");
    println!("REPLAY ANALYSIS");
    println!("{:=<60}", "");

    if let Some(name) = log.file_name() {
        println!("File:       {}", name);
    }
    println!("Changelist: {}", log.header().changelist);
    println!("Version:    {}", log.header().version);
    println!("Map:        {}", log.map_name().as_deref().unwrap_or("Unknown"));
    let duration = log.duration_seconds();
    println!(
        "Duration:   {}m {:02}s",
        (duration as u64) / 60,
        (duration as u64) % 60
    );
    println!("Records:    {}", log.record_count());

    println!();
    println!("Players:");
    for (&slot, name) in log.players() {
        let faction = log
            .factions()
            .get(&slot)
            .map(|f| f.to_string())
            .unwrap_or_else(|| "Unknown".to_owned());
        let team = log
            .teams()
            .get(&slot)
            .map(|team| format!("team {}", team))
            .unwrap_or_else(|| "no team".to_owned());
        let verdict = log
            .result()
            .player_results
            .get(&slot)
            .map(|outcome| format!("{:?}", outcome).to_lowercase())
            .unwrap_or_else(|| "unknown".to_owned());
        println!(
            "  Slot {}: {:20} {:10} {:8} {}",
            slot, name, faction, team, verdict
        );
    }

    println!();
    println!("Action summary:");
    let mut stats: Vec<(&String, &u64)> = log.action_stats().iter().collect();
    stats.sort_by(|a, b| b.1.cmp(a.1));
    for (label, count) in stats.into_iter().take(10) {
        println!("  {:20} {:6}", label, count);
    }

    for (&slot, events) in log.building_orders() {
        println!();
        println!("Build order — {}:", log.player_name(slot));
        for event in events.iter().take(15) {
            let marker = if event.inferred { " (inferred)" } else { "" };
            println!("  [{}] {}{}", event.time, event.building_name, marker);
        }
    }

    if !log.chat().is_empty() {
        println!();
        println!("Chat:");
        for message in log.chat() {
            println!("  [{}] {}: {}", message.time, message.player, message.text);
        }
    }

    println!();
    println!("Entities (top 10 by activity):");
    for entity in log.tracker().by_activity().into_iter().take(10) {
        let owner = entity
            .owner()
            .map(|owner| log.player_name(owner))
            .unwrap_or_else(|| "Unknown".to_owned());
        println!(
            "  {:>12}: {:16} owner={:16} actions={}",
            entity.id(),
            entity.kind().to_string(),
            owner,
            entity.action_count()
        );
    }
}
