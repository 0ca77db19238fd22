use crate::components::{EventSource, ScheduleService};
use crate::config::Config;
use crate::error::ScheduleResult;
use clap::{Parser, Subcommand};
use std::sync::Arc;

// Export submodules
pub mod cache;
pub mod schedule;

pub use schedule::ShowArgs;

#[derive(Debug, Parser)]
#[command(name = "schedule-display")]
#[command(version, about = "Render configured calendars as a month list or month grid")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the schedule view as JSON
    Show(ShowArgs),
    /// Remove every cached aggregation
    ClearCache,
}

/// Shared context for all commands
pub struct CommandContext {
    pub config: Arc<Config>,
    pub sources: Vec<Arc<dyn EventSource>>,
    pub service: ScheduleService,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("config", &self.config)
            .field("sources", &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>())
            .field("service", &self.service)
            .finish()
    }
}

impl CommandContext {
    pub fn new(config: Arc<Config>, sources: Vec<Arc<dyn EventSource>>, service: ScheduleService) -> Self {
        Self {
            config,
            sources,
            service,
        }
    }
}

/// Type alias for command result
pub type CommandResult = ScheduleResult<()>;

/// Dispatch a parsed command line
pub async fn run(command: Command, ctx: &CommandContext) -> CommandResult {
    match command {
        Command::Show(args) => schedule::show(ctx, &args).await,
        Command::ClearCache => cache::clear(ctx).await,
    }
}
