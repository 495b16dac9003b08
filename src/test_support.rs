//! Fakes and fixtures shared by the unit tests.

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::artifact::ImageTools;
use crate::artifact_store::ArtifactStore;
use crate::build::context::{BuildContext, DockerOpts, FormatSet, Provider};
use crate::container::{ContainerEngine, ContainerId};

/// In-memory tar archive with the given `(path, content)` entries.
pub fn rootfs_tar(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

/// A build context rooted in a temporary directory.
pub struct Fixture {
    pub ctx: BuildContext,
    _temp: TempDir,
}

impl Fixture {
    pub fn output(&self, name: &str) -> PathBuf {
        self.ctx.output(name)
    }
}

pub fn fixture(provider: Provider, formats: &[&str]) -> Fixture {
    let temp = TempDir::new().unwrap();
    let build_path = temp.path().join("context");
    let output_dir = temp.path().join("out");
    let bootloader = temp.path().join("isolinux");
    for dir in [&build_path, &output_dir, &bootloader] {
        fs::create_dir_all(dir).unwrap();
    }
    fs::write(build_path.join("Dockerfile"), "FROM alpine\n").unwrap();
    fs::write(bootloader.join("isolinux.bin"), b"loader").unwrap();
    fs::write(bootloader.join("ldlinux.c32"), b"ldlinux").unwrap();

    let store = ArtifactStore::open(&temp.path().join("stage")).unwrap();
    let ctx = BuildContext::new(
        provider,
        FormatSet::parse(formats).unwrap(),
        build_path,
        output_dir,
        store,
    )
    .with_bootloader_dir(bootloader);

    Fixture { ctx, _temp: temp }
}

#[derive(Default, Clone, Copy)]
enum Failure {
    #[default]
    None,
    Build,
    Export,
    Remove,
    Iso,
}

/// Container engine that serves a tiny rootfs and records each call.
#[derive(Default)]
pub struct FakeEngine {
    fail: Failure,
    calls: RefCell<Vec<&'static str>>,
}

impl FakeEngine {
    pub fn failing_build() -> Self {
        Self {
            fail: Failure::Build,
            ..Default::default()
        }
    }

    pub fn failing_export() -> Self {
        Self {
            fail: Failure::Export,
            ..Default::default()
        }
    }

    pub fn failing_remove() -> Self {
        Self {
            fail: Failure::Remove,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl ContainerEngine for FakeEngine {
    fn build(&self, _context_dir: &Path, _tag: &str, _opts: &DockerOpts) -> Result<()> {
        self.calls.borrow_mut().push("build");
        if let Failure::Build = self.fail {
            bail!("engine: build failed at step 2/3");
        }
        Ok(())
    }

    fn create(&self, _image: &str) -> Result<ContainerId> {
        self.calls.borrow_mut().push("create");
        Ok(ContainerId("c0ffee".into()))
    }

    fn export(&self, _id: &ContainerId) -> Result<Box<dyn Read>> {
        self.calls.borrow_mut().push("export");
        if let Failure::Export = self.fail {
            bail!("engine: export stream broke");
        }
        let archive = rootfs_tar(&[
            ("vmlinuz", "kernel-image"),
            ("init", "#!/bin/sh\n"),
            ("etc/hostname", "slim\n"),
        ]);
        Ok(Box::new(std::io::Cursor::new(archive)))
    }

    fn remove(&self, _id: &ContainerId) -> Result<()> {
        self.calls.borrow_mut().push("remove");
        if let Failure::Remove = self.fail {
            bail!("engine: no such container");
        }
        Ok(())
    }
}

/// Image tools that write placeholder files after checking their inputs exist.
#[derive(Default)]
pub struct FakeTools {
    fail: Failure,
    calls: RefCell<Vec<&'static str>>,
}

impl FakeTools {
    pub fn failing_iso() -> Self {
        Self {
            fail: Failure::Iso,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl ImageTools for FakeTools {
    fn make_initrd(&self, root: &Path, output: &Path, _gzip_level: u32) -> Result<()> {
        self.calls.borrow_mut().push("initrd");
        if !root.join("init").exists() {
            bail!("initrd root '{}' is not an exported rootfs", root.display());
        }
        fs::write(output, b"initrd")?;
        Ok(())
    }

    fn make_iso(&self, iso_root: &Path, output: &Path) -> Result<()> {
        self.calls.borrow_mut().push("iso");
        if let Failure::Iso = self.fail {
            bail!("mkisofs exploded");
        }
        for required in ["boot/vmlinuz", "boot/initrd", "isolinux/isolinux.bin"] {
            if !iso_root.join(required).exists() {
                bail!("ISO tree is missing {required}");
            }
        }
        fs::write(output, b"iso")?;
        Ok(())
    }

    fn convert_qcow2(&self, workdir: &Path, iso_name: &str, qcow2_name: &str) -> Result<()> {
        self.calls.borrow_mut().push("qcow2");
        if !workdir.join(iso_name).exists() {
            bail!("{iso_name} not found in {}", workdir.display());
        }
        fs::write(workdir.join(qcow2_name), b"qcow2")?;
        Ok(())
    }
}
