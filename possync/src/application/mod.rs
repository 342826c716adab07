pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use possync_core::error::Result;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = handlers::config_from_args(cli.root, cli.dates)?;
    let backend = handlers::backend_from_args(cli.db, cli.dry_run);
    match cli.command {
        Commands::Sync { target } => handlers::handle_sync(cfg, backend, target).await,
        Commands::Stats => handlers::handle_stats(cfg, backend).await,
        Commands::Watch { cooldown } => handlers::handle_watch(cfg, backend, cooldown).await,
        Commands::Inspect { file, sample } => {
            handlers::handle_inspect(file, sample.unwrap_or(cfg.sample_size))
        }
        Commands::Scan { dir } => handlers::handle_scan(dir),
    }
}
