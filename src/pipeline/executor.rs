//! Sequential step execution.

use anyhow::Result;
use std::time::Instant;
use tracing::info;

use crate::build::context::BuildContext;
use crate::steps::{Step, Toolbox};

/// Run `steps` in order, stopping at the first failure.
///
/// Artifacts produced before a failure are left in place; the next build
/// recreates or overwrites them.
pub fn execute(steps: &[Step], ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<()> {
    let total = steps.len();
    for (i, step) in steps.iter().enumerate() {
        info!(step = step.name(), "[{}/{}] starting", i + 1, total);
        let started = Instant::now();
        step.run(ctx, toolbox)?;
        info!(
            step = step.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "[{}/{}] done",
            i + 1,
            total
        );
    }
    Ok(())
}
