//! Lotus Adapter CLI entry point.

use clap::Parser;

use lotus_adapter::cli::{commands, handle_error, Cli, Commands};
use lotus_adapter::infrastructure::config::ConfigLoader;
use lotus_adapter::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Gateway(args) => commands::gateway::execute(args, &config, cli.json).await,
        Commands::Monitor(args) => commands::monitor::execute(args, &config, cli.json).await,
        Commands::Snapshot(args) => commands::snapshot::execute(args, &config, cli.json).await,
        Commands::Auth(args) => commands::auth::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
