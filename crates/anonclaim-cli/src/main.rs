mod cli;
mod config;

use clap::Parser;
use cli::{
    generate_key, handle_claim, handle_registry, handle_snapshot, init_config, init_logging, run_setup, Cli,
    Commands,
};
use config::{default_data_dir, ClaimConfig, CONFIG_FILE};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let config_path = cli.config.clone().unwrap_or_else(|| data_dir.join(CONFIG_FILE));

    let config_found = config_path.exists();
    let mut config = ClaimConfig::load(&config_path)?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    init_logging(&cli, &config.logging)?;
    if !config_found {
        info!("Config file {:?} not found, using defaults", config_path);
    }

    match cli.command {
        Commands::Init { force, backend } => {
            init_config(&config_path, &config, force, backend, cli.format)?;
        }
        Commands::Keygen { output } => {
            generate_key(output.as_deref(), cli.format)?;
        }
        Commands::Setup { force } => {
            run_setup(&config, force, cli.format)?;
        }
        Commands::Snapshot { action } => {
            handle_snapshot(action, &config, cli.format)?;
        }
        Commands::Claim { action } => {
            handle_claim(action, &config, cli.format)?;
        }
        Commands::Registry { action } => {
            handle_registry(action, &config, cli.format).await?;
        }
    }

    Ok(())
}
