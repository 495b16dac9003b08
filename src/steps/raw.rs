use anyhow::Result;
use tracing::info;

use super::Toolbox;
use crate::artifact::filesystem::{move_file, publish};
use crate::artifact::rootfs::find_kernel;
use crate::build::context::BuildContext;

/// Produce `vmlinuz` + `initrd` from the exported rootfs and publish both.
///
/// The kernel is moved out of the tree first so it is not packed into the
/// initrd as well.
pub fn assemble_raw(ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<()> {
    let rootfs = ctx.store.rootfs_dir();
    let kernel = ctx.store.kernel();
    let initrd = ctx.store.initrd();

    let found = find_kernel(&rootfs)?;
    move_file(&found, &kernel)?;
    info!(kernel = %found.display(), "kernel relocated");

    toolbox.tools.make_initrd(&rootfs, &initrd, ctx.gzip_level)?;
    info!(initrd = %initrd.display(), "initrd created");

    publish(&kernel, &ctx.output_dir)?;
    publish(&initrd, &ctx.output_dir)?;
    Ok(())
}
