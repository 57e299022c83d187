//! Run command - replay or execute and cache

use crate::error::MemoizeResult;
use crate::pipeline::{resolve_cwd, Invocation, Memoizer, Outcome};
use crate::shell::CommandLine;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Execute the command through the cache, streaming to stdout
pub async fn execute(memoizer: &Memoizer, command: CommandLine, reset: bool) -> MemoizeResult<()> {
    let invocation = Invocation {
        command,
        reset,
        cwd: resolve_cwd(),
    };

    let mut stdout = tokio::io::stdout();
    let outcome = memoizer.run(&invocation, &mut stdout).await?;
    if let Err(e) = stdout.flush().await {
        warn!("Failed to flush output: {}", e);
    }

    match outcome {
        Outcome::Hit { key } => debug!("Served {} from cache", key),
        Outcome::Miss {
            key,
            status,
            cached,
        } => debug!("Ran {} ({}), cached: {}", key, status, cached),
    }

    Ok(())
}
