use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "possync: mirror legacy POS files into the live store", long_about = None)]
pub struct Cli {
    /// Directory holding the legacy .DBF files (overrides POS_LEGACY_ROOT)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// libsql database used as the live store
    #[arg(long, global = true, env = "POS_DATABASE", default_value = "possync.db")]
    pub db: PathBuf,

    /// Sync into a throwaway in-memory store instead of --db
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Comma-separated YYYY-MM-DD sale days (overrides POS_TARGET_DATES)
    #[arg(long, global = true)]
    pub dates: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SyncTarget {
    All,
    Products,
    Sales,
    Clients,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a sync now and print the counts
    Sync {
        #[arg(value_enum, default_value_t = SyncTarget::All)]
        target: SyncTarget,
    },

    /// Count legacy-sourced entities in the live store
    Stats,

    /// Watch the legacy files and sync on change until Ctrl-C
    Watch {
        /// Seconds between triggered syncs (overrides POS_SYNC_COOLDOWN_SECS)
        #[arg(long)]
        cooldown: Option<u64>,
    },

    /// Print header, inferred fields, fingerprint and sample records of one file
    Inspect {
        file: PathBuf,
        /// Records to show (defaults to the configured sample size)
        #[arg(long)]
        sample: Option<usize>,
    },

    /// Find legacy files under a directory and summarize their headers
    Scan { dir: PathBuf },
}
