use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use attend_cli::commands::{import, preview, status};
use attend_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr, operator output to stdout
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    match command {
        Commands::Import(args) => {
            config.validate()?;
            let stdin = io::stdin();
            import::run(&mut stdin.lock(), &mut writer, args, &config)?;
        }
        Commands::Preview(args) => {
            preview::run(&mut writer, args, &config)?;
        }
        Commands::Status => {
            config.validate()?;
            status::run(&mut writer, &config)?;
        }
    }

    Ok(())
}
