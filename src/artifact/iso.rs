//! Bootable ISO 9660 image creation.
//!
//! The image boots through isolinux in El Torito no-emulation mode. The
//! staging tree looks like:
//!
//! ```text
//! slim-iso/
//!   boot/vmlinuz
//!   boot/initrd
//!   isolinux/isolinux.bin
//!   isolinux/ldlinux.c32
//!   isolinux/isolinux.cfg
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::thread;

use crate::process::Cmd;

pub const ISO_BOOT_DIR: &str = "boot";
pub const ISO_LOADER_DIR: &str = "isolinux";

/// Boot image, relative to the ISO root.
pub const BOOT_IMAGE: &str = "isolinux/isolinux.bin";
/// Boot catalog, relative to the ISO root. Generated by mkisofs.
pub const BOOT_CATALOG: &str = "isolinux/boot.cat";
pub const VOLUME_LABEL: &str = "SLIM";

pub const ISOLINUX_CFG_FILENAME: &str = "isolinux.cfg";

/// Written when the bootloader bundle does not carry its own configuration.
pub const DEFAULT_ISOLINUX_CFG: &str = "\
default slim
prompt 0
timeout 0

label slim
  kernel /boot/vmlinuz
  append initrd=/boot/initrd console=tty0 console=ttyS0
";

/// Create the empty ISO staging layout, removing any previous tree.
///
/// `boot/` and `isolinux/` have no dependency on each other and are created
/// concurrently; both must exist before this returns.
pub fn setup_iso_structure(iso_root: &Path) -> Result<()> {
    if iso_root.exists() {
        fs::remove_dir_all(iso_root)
            .with_context(|| format!("removing previous ISO tree '{}'", iso_root.display()))?;
    }

    let dirs = [iso_root.join(ISO_BOOT_DIR), iso_root.join(ISO_LOADER_DIR)];
    thread::scope(|scope| {
        let handles: Vec<_> = dirs
            .iter()
            .map(|dir| {
                scope.spawn(move || {
                    fs::create_dir_all(dir)
                        .with_context(|| format!("creating '{}'", dir.display()))
                })
            })
            .collect();

        handles.into_iter().try_for_each(|handle| {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("ISO staging thread panicked"))?
        })
    })
}

/// Copy the bootloader bundle into `isolinux/`, adding the default config if absent.
pub fn install_bootloader(bundle_dir: &Path, iso_root: &Path) -> Result<()> {
    let loader_dir = iso_root.join(ISO_LOADER_DIR);
    crate::artifact::filesystem::copy_tree(bundle_dir, &loader_dir).with_context(
        || {
            format!(
                "copying bootloader bundle '{}' into '{}'",
                bundle_dir.display(),
                loader_dir.display()
            )
        },
    )?;

    let cfg = loader_dir.join(ISOLINUX_CFG_FILENAME);
    if !cfg.exists() {
        fs::write(&cfg, DEFAULT_ISOLINUX_CFG)
            .with_context(|| format!("writing '{}'", cfg.display()))?;
    }
    Ok(())
}

/// Master the ISO with mkisofs.
pub fn run_mkisofs(iso_root: &Path, output: &Path) -> Result<()> {
    Cmd::new("mkisofs")
        .arg("-o")
        .arg_path(output)
        .args(["-b", BOOT_IMAGE])
        .args(["-c", BOOT_CATALOG])
        .args(["-no-emul-boot", "-boot-load-size", "4", "-boot-info-table"])
        .args(["-J", "-R"])
        .args(["-V", VOLUME_LABEL])
        .arg_path(iso_root)
        .error_msg("mkisofs failed. Install genisoimage or cdrtools.")
        .run()?;
    Ok(())
}
