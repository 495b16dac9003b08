use anyhow::Result;
use tracing::info;

use super::Toolbox;
use crate::artifact_store::{ISO_FILENAME, QCOW2_FILENAME};
use crate::build::context::BuildContext;

/// Convert the published ISO into `slim.qcow2` inside the output dir.
pub fn convert_qcow2(ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<()> {
    toolbox
        .tools
        .convert_qcow2(&ctx.output_dir, ISO_FILENAME, QCOW2_FILENAME)?;
    info!(qcow2 = %ctx.output(QCOW2_FILENAME).display(), "qcow2 created");
    Ok(())
}
