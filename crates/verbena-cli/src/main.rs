//! Verbena CLI
//!
//! Thin wrapper around verbena-core functions for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Run the kiosk: rotating backgrounds until Ctrl+C
//! verbena run
//!
//! # Record an RSVP (and forward it to the configured sinks)
//! verbena rsvp "Ana"
//!
//! # List all registrations
//! verbena list
//!
//! # Export registrations
//! verbena export --format csv
//! verbena export --format json --out /tmp
//!
//! # Show engine statistics
//! verbena stats
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use verbena_core::{Config, InvitationEngine};

/// Verbena - Party Kiosk and RSVP Registry
#[derive(Parser)]
#[command(name = "verbena")]
#[command(version = "0.1.0")]
#[command(about = "Verbena - Party Kiosk and RSVP Registry")]
#[command(
    long_about = "A local-first birthday-invitation kiosk: rotating meme backgrounds, durable RSVP storage and best-effort submission to external sinks."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.verbena/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the kiosk: apply a background and rotate on a timer
    Run,

    /// Record an RSVP confirmation
    Rsvp {
        /// Guest name
        name: String,
    },

    /// List all registrations
    List,

    /// Export registrations to a dated file
    Export {
        /// Output format: csv or json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show engine statistics
    Stats,
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

/// Get the default data directory (~/.verbena/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".verbena")
        .join("data")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let engine = InvitationEngine::new(&data_dir, config)?;

    match cli.command {
        Commands::Run => {
            println!("Starting Verbena...");
            println!();
            println!("Catalog: {} images", engine.catalog().len());
            println!("Data directory: {}", engine.data_dir().display());
            println!();

            engine.init_background().await;
            if let Some(reference) = engine.current_background() {
                println!("[background] {reference}");
            }
            engine.start_rotation();

            println!();
            println!("Kiosk is running. Press Ctrl+C to stop.");
            println!();

            let mut background = engine.background();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        println!();
                        println!("Received shutdown signal...");
                        break;
                    }
                    changed = background.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = background.borrow_and_update().clone();
                        if let Some(reference) = current {
                            println!("[background] {reference}");
                        }
                    }
                }
            }

            println!("Goodbye.");
        }

        Commands::Rsvp { name } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                anyhow::bail!("Please provide a non-empty name");
            }

            let outcome = engine.dispatch_rsvp(&name).await;
            if !outcome.local_ok {
                anyhow::bail!("Could not save the RSVP");
            }

            if outcome.saved_locally_only() {
                println!(
                    "{name}, your RSVP was saved locally, but could not be submitted externally."
                );
            } else {
                println!("Thanks {name}! Your RSVP has been registered.");
            }
        }

        Commands::List => {
            let records = engine.registrations();
            if records.is_empty() {
                println!("No registrations yet.");
            } else {
                println!("Registrations ({}):", records.len());
                println!();
                for (index, record) in records.iter().enumerate() {
                    println!(
                        "  {}. {} - {} {}",
                        index + 1,
                        record.name,
                        record.date,
                        record.time
                    );
                }
            }
        }

        Commands::Export { format, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from("."));
            let exported = match format.as_str() {
                "csv" => engine.export_csv(&out)?,
                "json" => engine.export_json(&out)?,
                other => anyhow::bail!("Unknown format '{}'. Must be one of: csv, json", other),
            };

            match exported {
                Some(path) => println!(
                    "Exported {} registrations to {}",
                    engine.registrations().len(),
                    path.display()
                ),
                None => println!("No registrations to export."),
            }
        }

        Commands::Stats => {
            let stats = engine.loader_stats();
            println!("Verbena v0.1.0");
            println!();
            println!("Registrations: {}", engine.registrations().len());
            println!();
            println!("Image cache:");
            println!("  Cached: {}", stats.cache_size);
            println!("  Loaded: {}", stats.loaded_count);
            println!("  Failed: {}", stats.failed_count);
            println!("  Errors: {}", stats.total_errors);
            println!("  Avg load time: {:.1} ms", stats.avg_load_time_ms);
        }
    }

    Ok(())
}
