//! Staging and publishing helpers.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Copy everything under `src` into `dst`, creating `dst` if needed.
///
/// Symlinks are recreated as links, never followed. Existing files in `dst`
/// with the same relative path are replaced.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.with_context(|| format!("walking '{}'", src.display()))?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dst.join(relative);
        let kind = entry.file_type();

        if kind.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("creating '{}'", target.display()))?;
        } else if kind.is_symlink() {
            let link = fs::read_link(entry.path())?;
            remove_if_exists(&target)?;
            std::os::unix::fs::symlink(&link, &target)
                .with_context(|| format!("linking '{}' -> '{}'", target.display(), link.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("copying '{}' to '{}'", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

/// Move a file, falling back to copy + delete when `rename` crosses filesystems.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst)
        .with_context(|| format!("moving '{}' to '{}'", src.display(), dst.display()))?;
    fs::remove_file(src).with_context(|| format!("removing moved '{}'", src.display()))
}

/// Copy a staged artifact into the output directory under the same file name.
pub fn publish(src: &Path, output_dir: &Path) -> Result<()> {
    let name = src
        .file_name()
        .with_context(|| format!("artifact path '{}' has no file name", src.display()))?;
    let dst = output_dir.join(name);
    fs::copy(src, &dst)
        .with_context(|| format!("copying '{}' to '{}'", src.display(), dst.display()))?;
    Ok(())
}

/// Remove a file; a file that is already gone counts as removed.
///
/// Returns whether something was deleted.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("removing '{}'", path.display())),
    }
}
