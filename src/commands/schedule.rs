use super::{CommandContext, CommandResult};
use crate::components::models::MAX_DAYS_AHEAD;
use crate::components::schedule::{DisplayMode, ScheduleRequest, ScheduleView};
use crate::utils::time::WeekStart;
use clap::Args;
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone, Default, Args)]
pub struct ShowArgs {
    /// Layout of the output
    #[arg(long, value_enum)]
    pub mode: Option<DisplayMode>,

    /// Days after today to include
    #[arg(long, value_parser = clap::value_parser!(u32).range(..=MAX_DAYS_AHEAD as i64))]
    pub days: Option<u32>,

    /// First day of the week: 0 = Sunday, 1 = Monday
    #[arg(long = "start-day", value_parser = parse_week_start)]
    pub start_day: Option<WeekStart>,

    /// Comma separated title substrings to hide
    #[arg(long)]
    pub exclude: Option<String>,

    /// Skip the cache and include diagnostics
    #[arg(long)]
    pub debug: bool,
}

fn parse_week_start(value: &str) -> Result<WeekStart, String> {
    let day: u8 = value
        .trim()
        .parse()
        .map_err(|_| format!("expected 0 or 1, got '{value}'"))?;
    WeekStart::try_from(day)
}

impl ShowArgs {
    /// Command line values take precedence over the configuration
    pub fn request(&self, ctx: &CommandContext) -> ScheduleRequest {
        let config = &ctx.config;
        ScheduleRequest {
            sources: ctx.sources.clone(),
            days_ahead: self.days.unwrap_or(config.days_ahead),
            exclude_patterns: self
                .exclude
                .clone()
                .unwrap_or_else(|| config.exclude_patterns.clone()),
            mode: self.mode.unwrap_or(config.display_mode),
            week_start: self.start_day.unwrap_or(config.calendar_start_day),
            debug: self.debug || config.debug,
        }
    }
}

/// Render the schedule and print it to stdout
pub async fn show(ctx: &CommandContext, args: &ShowArgs) -> CommandResult {
    let request = args.request(ctx);
    let outcome = ctx.service.render(&request).await?;

    if outcome.view == ScheduleView::Empty {
        info!("{}", t!("no_events"));
    }

    let json = serde_json::to_string_pretty(&outcome)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        args: ShowArgs,
    }

    #[test]
    fn test_parse_show_flags() {
        let parsed = Harness::try_parse_from([
            "show", "--mode", "grid", "--days", "14", "--start-day", "1", "--exclude", "lunch", "--debug",
        ])
        .unwrap();
        assert_eq!(parsed.args.mode, Some(DisplayMode::Grid));
        assert_eq!(parsed.args.days, Some(14));
        assert_eq!(parsed.args.start_day, Some(WeekStart::Monday));
        assert_eq!(parsed.args.exclude.as_deref(), Some("lunch"));
        assert!(parsed.args.debug);

        assert!(Harness::try_parse_from(["show", "--start-day", "2"]).is_err());
        assert!(Harness::try_parse_from(["show", "--days", "3661"]).is_err());
        assert!(Harness::try_parse_from(["show", "--days", "3660"]).is_ok());
    }
}
