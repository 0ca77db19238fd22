use clap::Parser;
use schedule_display::commands::{self, Cli, CommandContext};
use schedule_display::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    startup::init_logging()?;

    info!("Starting schedule-display");

    // Load configuration
    let config = startup::load_config()?;

    let client = startup::build_http_client(&config)?;
    let sources = startup::build_sources(&config, &client)?;
    let service = startup::build_service(&config).await?;
    let ctx = CommandContext::new(config, sources, service);

    commands::run(cli.command, &ctx).await?;
    Ok(())
}
