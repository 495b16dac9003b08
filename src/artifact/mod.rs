//! Artifact builders for VM images.
//!
//! - [`cpio`] - gzip-compressed newc cpio archives for the initrd
//! - [`iso`] - isolinux ISO staging and mastering (mkisofs)
//! - [`qcow2`] - ISO to qcow2 conversion (qemu-img)
//! - [`rootfs`] - unpacking the exported container filesystem
//! - [`filesystem`] - copy/move/publish helpers
//!
//! Steps reach the host tools through [`ImageTools`] so the pipeline can run
//! against a different toolchain (or none, in tests).

pub mod cpio;
pub mod filesystem;
pub mod iso;
pub mod qcow2;
pub mod rootfs;

use anyhow::Result;
use std::path::Path;

/// Host tools that turn staged files into images.
pub trait ImageTools {
    /// Write a gzip-compressed newc cpio of `root` to `output`.
    fn make_initrd(&self, root: &Path, output: &Path, gzip_level: u32) -> Result<()>;

    /// Master a bootable ISO from the staging tree at `iso_root`.
    fn make_iso(&self, iso_root: &Path, output: &Path) -> Result<()>;

    /// Convert `iso_name` to `qcow2_name`, both relative to `workdir`.
    fn convert_qcow2(&self, workdir: &Path, iso_name: &str, qcow2_name: &str) -> Result<()>;
}

/// [`ImageTools`] backed by cpio/gzip, mkisofs and qemu-img on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostTools;

impl ImageTools for HostTools {
    fn make_initrd(&self, root: &Path, output: &Path, gzip_level: u32) -> Result<()> {
        cpio::build_cpio(root, output, gzip_level)
    }

    fn make_iso(&self, iso_root: &Path, output: &Path) -> Result<()> {
        iso::run_mkisofs(iso_root, output)
    }

    fn convert_qcow2(&self, workdir: &Path, iso_name: &str, qcow2_name: &str) -> Result<()> {
        qcow2::convert_to_qcow2(workdir, iso_name, qcow2_name)
    }
}
