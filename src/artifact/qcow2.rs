//! qcow2 conversion with qemu-img.

use anyhow::Result;
use std::path::Path;

use crate::process::Cmd;

/// Convert `source` into a qcow2 image named `target`, both relative to `workdir`.
pub fn convert_to_qcow2(workdir: &Path, source: &str, target: &str) -> Result<()> {
    Cmd::new("qemu-img")
        .args(["convert", "-O", "qcow2", source, target])
        .dir(workdir)
        .error_msg(format!(
            "qemu-img failed converting '{}' to '{}' in '{}'",
            source,
            target,
            workdir.display()
        ))
        .run()?;
    Ok(())
}
