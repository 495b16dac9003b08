//! Exported root filesystem handling.
//!
//! The container engine hands us the image filesystem as a tar stream; it is
//! unpacked into the staging area and the kernel is then pulled out of it.

use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Unpack a tar stream into `destination`, keeping permissions and ownership bits.
pub fn extract_archive(stream: impl Read, destination: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(stream);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    archive
        .unpack(destination)
        .with_context(|| format!("extracting filesystem into '{}'", destination.display()))
}

/// Locate the kernel inside an exported rootfs.
///
/// Checks `/vmlinuz`, then `/boot/vmlinuz`, then the lexically greatest
/// `/boot/vmlinuz-*`. Dangling symlinks are skipped.
pub fn find_kernel(rootfs: &Path) -> Result<PathBuf> {
    for candidate in ["vmlinuz", "boot/vmlinuz"] {
        let path = rootfs.join(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }

    let boot = rootfs.join("boot");
    if boot.is_dir() {
        let mut versioned = Vec::new();
        for entry in fs::read_dir(&boot)
            .with_context(|| format!("reading '{}'", boot.display()))?
        {
            let path = entry?.path();
            let is_kernel = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("vmlinuz-"));
            if is_kernel && path.is_file() {
                versioned.push(path);
            }
        }
        versioned.sort();
        if let Some(path) = versioned.pop() {
            return Ok(path);
        }
    }

    Err(ConfigError::KernelNotFound(rootfs.to_path_buf()).into())
}
