//! CPIO archive creation for the initrd.

use anyhow::{Context, Result};
use std::path::Path;

use crate::process::shell;

/// Build a gzip-compressed newc cpio archive from a directory.
///
/// `root` becomes `/` of the archive. The pipeline runs under `pipefail`, so a
/// failure in `find`, `cpio` or `gzip` fails the build with that tool's output.
///
/// # Example
///
/// ```rust,ignore
/// use slim_builder::artifact::cpio::build_cpio;
/// use std::path::Path;
///
/// build_cpio(Path::new("/tmp/stage/slim-vm"), Path::new("/tmp/stage/initrd"), 9)?;
/// ```
pub fn build_cpio(root: &Path, output: &Path, gzip_level: u32) -> Result<()> {
    let cwd = std::env::current_dir().context("resolving current directory")?;
    let cpio_cmd = initrd_script(root, &cwd.join(output), gzip_level);

    shell(&cpio_cmd).with_context(|| {
        format!(
            "creating initrd '{}' from '{}'",
            output.display(),
            root.display()
        )
    })?;

    Ok(())
}

/// Shell pipeline for [`build_cpio`]. `output` must be absolute: the script
/// changes into `root` before redirecting into it.
fn initrd_script(root: &Path, output: &Path, gzip_level: u32) -> String {
    // find . -print0 | cpio --null: NUL-separated names survive any character
    // -H newc: the only format the kernel unpacks as an initramfs
    format!(
        "cd {} && find . -print0 | cpio --null -o -H newc --quiet | gzip -{} > {}",
        shell_quote(&root.display().to_string()),
        gzip_level,
        shell_quote(&output.display().to_string())
    )
}

fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("a'b"), r"'a'\''b'");
    }

    #[test]
    fn relative_output_lands_outside_the_rootfs() {
        let cwd = std::env::current_dir().unwrap();
        let script = initrd_script(
            Path::new("stage/slim-vm"),
            &cwd.join("stage/initrd"),
            1,
        );
        let expected = shell_quote(&cwd.join("stage/initrd").display().to_string());
        assert!(script.starts_with("cd 'stage/slim-vm' && "), "{script}");
        assert!(script.ends_with(&format!("> {expected}")), "{script}");
    }

    #[test]
    #[ignore = "needs cpio and gzip on PATH"]
    fn relative_paths_build_an_initrd() {
        let tmp = tempfile::Builder::new()
            .prefix("slim-cpio-")
            .tempdir_in(".")
            .unwrap();
        let base = Path::new(tmp.path().file_name().unwrap());
        fs::create_dir_all(base.join("slim-vm")).unwrap();
        fs::write(base.join("slim-vm/init"), "#!/bin/sh\n").unwrap();

        build_cpio(&base.join("slim-vm"), &base.join("initrd"), 1).unwrap();

        assert!(fs::metadata(base.join("initrd")).unwrap().len() > 0);
    }

    #[test]
    #[ignore = "needs cpio and gzip on PATH"]
    fn archive_lists_rootfs_entries() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("slim vm");
        let initrd = temp.path().join("initrd");
        fs::create_dir_all(root.join("etc")).unwrap();
        fs::write(root.join("etc/hostname"), "slim\n").unwrap();
        fs::write(root.join("init"), "#!/bin/sh\n").unwrap();

        build_cpio(&root, &initrd, 1).unwrap();

        let listing = shell(&format!(
            "gzip -dc {} | cpio -t --quiet",
            shell_quote(&initrd.display().to_string())
        ))
        .unwrap()
        .stdout;
        let entries: Vec<_> = listing
            .lines()
            .map(|line| line.trim_start_matches("./"))
            .collect();
        assert!(entries.contains(&"init"), "{entries:?}");
        assert!(entries.contains(&"etc/hostname"), "{entries:?}");
    }

    #[test]
    fn missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let result = build_cpio(
            &temp.path().join("does-not-exist"),
            &temp.path().join("initrd"),
            6,
        );
        assert!(result.is_err());
    }
}
