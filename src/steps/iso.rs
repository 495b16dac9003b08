use anyhow::{Context, Result};
use std::fs;
use tracing::info;

use super::Toolbox;
use crate::artifact::iso::{install_bootloader, setup_iso_structure, ISO_BOOT_DIR};
use crate::artifact_store::{INITRD_FILENAME, ISO_FILENAME, KERNEL_FILENAME};
use crate::build::context::BuildContext;

/// Stage kernel, initrd and bootloader, then master `slim.iso` into the output dir.
pub fn build_iso(ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<()> {
    let iso_root = ctx.store.iso_root();
    setup_iso_structure(&iso_root)?;
    install_bootloader(&ctx.bootloader_dir, &iso_root)?;

    let boot = iso_root.join(ISO_BOOT_DIR);
    for (src, name) in [
        (ctx.store.kernel(), KERNEL_FILENAME),
        (ctx.store.initrd(), INITRD_FILENAME),
    ] {
        fs::copy(&src, boot.join(name))
            .with_context(|| format!("staging '{}' for the ISO", src.display()))?;
    }

    let output = ctx.output(ISO_FILENAME);
    toolbox.tools.make_iso(&iso_root, &output)?;
    info!(iso = %output.display(), "ISO created");
    Ok(())
}
