//! Hoover CLI
//!
//! Command-line tools for the sticker hoover's state file.
//!
//! # Commands
//!
//! - `inspect` - Display the allocator state and ledger size
//! - `reset` - Forget the current pack, optionally clearing the ledger
//! - `slug` - Preview generated pack names and titles
//! - `replay` - Run an item stream through the pipeline against an in-memory directory

mod commands;

use clap::{Parser, Subcommand};
use hoover_core::{parse_reference_packs, HooverConfig, OwnerId};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sticker hoover command-line tools.
#[derive(Parser)]
#[command(name = "hoover")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the allocator state file
    #[arg(global = true, long, env = "DATA_FILE", default_value = "pack_state.json")]
    data_file: PathBuf,

    /// Numeric id of the user owning the packs
    #[arg(global = true, long, env = "OWNER_ID", default_value = "0")]
    owner_id: u64,

    /// Bot handle used as the pack name suffix
    #[arg(global = true, long, env = "BOT_USERNAME", default_value = "hoover_bot")]
    bot_username: String,

    /// Base name for generated packs
    #[arg(global = true, long, env = "PACK_BASENAME", default_value = hoover_core::DEFAULT_BASE_NAME)]
    pack_basename: String,

    /// Comma-separated packs whose contents count as already seen
    #[arg(global = true, long, env = "EXTRA_PACKS", default_value = "")]
    extra_packs: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn hoover_config(&self) -> HooverConfig {
        HooverConfig::new(OwnerId(self.owner_id), self.bot_username.clone())
            .with_base_name(self.pack_basename.clone())
            .with_reference_packs(parse_reference_packs(&self.extra_packs))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Display the allocator state and ledger size
    Inspect {
        /// List every seen identity
        #[arg(short, long)]
        seen: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Forget the current pack so the next item opens a new one
    Reset {
        /// Also clear the ledger (the pack index is kept)
        #[arg(long)]
        full: bool,

        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Preview generated pack names
    Slug {
        /// First index to show
        #[arg(short, long, default_value = "1")]
        start: u64,

        /// Number of names to show
        #[arg(short, long, default_value = "5")]
        count: u64,
    },

    /// Replay a JSON-lines item stream against an in-memory directory
    Replay {
        /// File with one item per line
        input: PathBuf,

        /// Read and update the state file instead of starting blank
        #[arg(long)]
        persist: bool,

        /// Submit without waiting when the queue is full
        #[arg(long)]
        burst: bool,

        /// Number of workers
        #[arg(long, default_value = "3")]
        concurrency: usize,

        /// Capacity of static packs
        #[arg(long, default_value = "120")]
        static_capacity: u32,

        /// Capacity of animated packs
        #[arg(long, default_value = "50")]
        animated_capacity: u32,

        /// Skip the pacing delay
        #[arg(long)]
        no_pacing: bool,

        /// Number of recent events to print
        #[arg(long, default_value = "20")]
        events: usize,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.hoover_config();
    match cli.command {
        Commands::Inspect { seen, ref format } => {
            commands::inspect::run(&cli.data_file, seen, format)?;
        }
        Commands::Reset { full, dry_run } => {
            commands::reset::run(&cli.data_file, full, dry_run)?;
        }
        Commands::Slug { start, count } => {
            commands::slug::run(&config, start, count);
        }
        Commands::Replay {
            ref input,
            persist,
            burst,
            concurrency,
            static_capacity,
            animated_capacity,
            no_pacing,
            events,
        } => {
            let options = commands::replay::ReplayOptions {
                state_file: persist.then(|| cli.data_file.clone()),
                burst,
                concurrency,
                no_pacing,
                events,
            };
            let config = config.with_capacities(static_capacity, animated_capacity);
            commands::replay::run(input, config, options).await?;
        }
        Commands::Version => {
            println!("Hoover CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
