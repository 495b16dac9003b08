//! Staging area for intermediate build products.
//!
//! Layout under the store root:
//!
//! ```text
//! <stage>/
//!   .lock          advisory lock held by the running build
//!   slim-vm/       exported container root filesystem
//!   vmlinuz        kernel relocated out of the rootfs
//!   initrd         newc cpio, gzip-compressed
//!   slim-iso/      ISO staging tree (boot/, isolinux/)
//! ```
//!
//! The store is owned by exactly one build at a time. Nothing here persists
//! across builds except what steps copy into the output directory.

use anyhow::{Context, Result};
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Tag given to the built image; also the name of the exported rootfs directory.
pub const IMAGE_NAME: &str = "slim-vm";

pub const KERNEL_FILENAME: &str = "vmlinuz";
pub const INITRD_FILENAME: &str = "initrd";
pub const ISO_STAGING_DIRNAME: &str = "slim-iso";
pub const ISO_FILENAME: &str = "slim.iso";
pub const QCOW2_FILENAME: &str = "slim.qcow2";

const LOCK_FILENAME: &str = ".lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (and create if needed) the staging area at `root`.
    ///
    /// The stored root is absolute, so every staging path stays valid for
    /// tools that run with a different working directory.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("creating staging directory '{}'", root.display()))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("resolving staging directory '{}'", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rootfs_dir(&self) -> PathBuf {
        self.root.join(IMAGE_NAME)
    }

    pub fn kernel(&self) -> PathBuf {
        self.root.join(KERNEL_FILENAME)
    }

    pub fn initrd(&self) -> PathBuf {
        self.root.join(INITRD_FILENAME)
    }

    pub fn iso_root(&self) -> PathBuf {
        self.root.join(ISO_STAGING_DIRNAME)
    }

    /// Take the exclusive build lock on this staging area.
    ///
    /// Fails immediately if another process holds it.
    pub fn lock(&self) -> Result<StoreLock> {
        let lock_path = self.root.join(LOCK_FILENAME);

        // Never unlink the lock file: a second process could create a fresh
        // inode at the same path and lock that one instead.
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("creating lock file '{}'", lock_path.display()))?;

        if file.try_lock_exclusive().is_err() {
            anyhow::bail!(
                "staging area '{}' is in use by another build",
                self.root.display()
            );
        }

        Ok(StoreLock { file })
    }
}

/// Guard for [`ArtifactStore::lock`]. Unlocks on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Create `path` as an empty directory, removing any previous contents.
pub fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("removing existing directory '{}'", path.display()))?;
    }
    fs::create_dir_all(path)
        .with_context(|| format!("creating directory '{}'", path.display()))?;
    Ok(())
}

/// Hex sha256 and size of a file.
pub fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let f = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = r
            .read(&mut buf)
            .with_context(|| format!("reading '{}'", path.display()))?;
        if n == 0 {
            break;
        }
        size += n as u64;
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    Ok((hex, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_paths() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(&tmp.path().join("stage")).unwrap();
        let base = tmp.path().canonicalize().unwrap();

        assert!(store.root().is_dir());
        assert_eq!(store.rootfs_dir(), base.join("stage/slim-vm"));
        assert_eq!(store.kernel(), base.join("stage/vmlinuz"));
        assert_eq!(store.initrd(), base.join("stage/initrd"));
        assert_eq!(store.iso_root(), base.join("stage/slim-iso"));
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let tmp = tempfile::Builder::new()
            .prefix("slim-stage-")
            .tempdir_in(".")
            .unwrap();
        let relative = Path::new(tmp.path().file_name().unwrap()).join("stage");

        let store = ArtifactStore::open(&relative).unwrap();

        assert!(store.root().is_absolute());
        assert_eq!(store.root(), relative.canonicalize().unwrap());
        assert!(store.initrd().is_absolute());
    }

    #[test]
    fn second_lock_is_refused_until_release() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();

        let guard = store.lock().unwrap();
        assert!(store.lock().is_err());
        drop(guard);
        assert!(store.lock().is_ok());
    }

    #[test]
    fn recreate_dir_empties_existing() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("rootfs");
        fs::create_dir_all(dir.join("old")).unwrap();
        fs::write(dir.join("old/file"), "stale").unwrap();

        recreate_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn sha256_of_known_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, b"hello").unwrap();

        let (sha, size) = sha256_file(&path).unwrap();
        assert_eq!(size, 5);
        assert_eq!(
            sha,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
