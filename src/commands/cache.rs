use super::{CommandContext, CommandResult};
use std::io::Write;

/// Clear every cached aggregation and report how many entries went away
pub async fn clear(ctx: &CommandContext) -> CommandResult {
    let removed = ctx.service.clear_cache().await?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Removed {removed} cached schedule entries")?;
    Ok(())
}
