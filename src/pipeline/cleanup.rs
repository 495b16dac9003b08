//! Post-build cleanup policy.
//!
//! Deletes the artifact tier that was built only as a means to the requested
//! outputs. Anything the caller listed in `formats` is never touched.
//!
//! | provider     | condition          | removed from output dir |
//! |--------------|--------------------|-------------------------|
//! | not vbox     | `iso` not requested | `slim.iso`             |
//! | virtualbox   | `raw` not requested | `initrd`, `vmlinuz`    |
//! | anything else |                   | nothing                 |

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::artifact::filesystem::remove_if_exists;
use crate::artifact_store::{INITRD_FILENAME, ISO_FILENAME, KERNEL_FILENAME};
use crate::build::context::{BuildContext, Format, FormatSet, Provider};

/// Output files the policy would delete for this `(provider, formats)` pair.
pub fn intermediates(provider: Provider, formats: &FormatSet) -> &'static [&'static str] {
    if provider != Provider::Virtualbox && !formats.contains(Format::Iso) {
        return &[ISO_FILENAME];
    }
    if provider == Provider::Virtualbox && !formats.contains(Format::Raw) {
        return &[INITRD_FILENAME, KERNEL_FILENAME];
    }
    &[]
}

/// Apply the policy to `ctx.output_dir`. Returns the paths actually removed.
pub fn apply(ctx: &BuildContext) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for name in intermediates(ctx.provider, &ctx.formats) {
        let path = ctx.output(name);
        if remove_if_exists(&path)? {
            info!(artifact = %path.display(), "removed intermediate artifact");
            removed.push(path);
        }
    }
    Ok(removed)
}
