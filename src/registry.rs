//! Image registry and build manifests.
//!
//! Every successful build leaves a `slim-manifest.json` in its output
//! directory. A registry is a directory of such output directories, one per
//! image name.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use walkdir::WalkDir;

use crate::artifact_store::{
    sha256_file, INITRD_FILENAME, ISO_FILENAME, KERNEL_FILENAME, QCOW2_FILENAME,
};
use crate::build::context::{BuildContext, Format, Provider};
use crate::error::ConfigError;
use crate::steps::Step;

pub const MANIFEST_FILENAME: &str = "slim-manifest.json";

const FINAL_ARTIFACTS: &[&str] = &[KERNEL_FILENAME, INITRD_FILENAME, ISO_FILENAME, QCOW2_FILENAME];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub name: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildManifest {
    pub provider: Provider,
    pub formats: Vec<Format>,
    pub steps: Vec<String>,
    pub finished_at_utc: String,
    pub artifacts: Vec<ArtifactRecord>,
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

/// Record what a finished build left in its output directory.
pub fn write_manifest(ctx: &BuildContext, steps: &[Step]) -> Result<BuildManifest> {
    let mut artifacts = Vec::new();
    for name in FINAL_ARTIFACTS {
        let path = ctx.output(name);
        if !path.is_file() {
            continue;
        }
        let (sha256, size_bytes) = sha256_file(&path)?;
        artifacts.push(ArtifactRecord {
            name: name.to_string(),
            size_bytes,
            sha256,
        });
    }

    let finished_at_utc = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("formatting build timestamp")?;

    let manifest = BuildManifest {
        provider: ctx.provider,
        formats: ctx.formats.as_slice().to_vec(),
        steps: steps.iter().map(|s| s.name().to_string()).collect(),
        finished_at_utc,
        artifacts,
    };

    let path = manifest_path(&ctx.output_dir);
    let bytes = serde_json::to_vec_pretty(&manifest)?;
    fs::write(&path, bytes).with_context(|| format!("writing manifest '{}'", path.display()))?;
    Ok(manifest)
}

pub fn read_manifest(output_dir: &Path) -> Result<BuildManifest> {
    let path = manifest_path(output_dir);
    let bytes =
        fs::read(&path).with_context(|| format!("reading manifest '{}'", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing manifest '{}'", path.display()))
}

/// A registered image as shown by `slim images`.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub name: String,
    pub dir: PathBuf,
    pub manifest: BuildManifest,
    pub disk_bytes: u64,
}

/// Images under `registry`, sorted by name. Directories without a manifest are skipped.
pub fn list_images(registry: &Path) -> Result<Vec<ImageEntry>> {
    if !registry.is_dir() {
        return Ok(Vec::new());
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(registry)
        .with_context(|| format!("reading registry '{}'", registry.display()))?
    {
        let dir = entry?.path();
        if !dir.is_dir() || !manifest_path(&dir).is_file() {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let manifest = read_manifest(&dir)?;
        let disk_bytes = WalkDir::new(&dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum();
        images.push(ImageEntry {
            name,
            dir,
            manifest,
            disk_bytes,
        });
    }
    images.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(images)
}

/// Directory for `name` inside `registry`. `name` must be a single path component.
pub fn image_dir(registry: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(registry.join(name)),
        _ => Err(ConfigError::InvalidImageName(name.to_string()).into()),
    }
}

/// Delete a registered image.
pub fn remove_image(registry: &Path, name: &str) -> Result<()> {
    let dir = image_dir(registry, name)?;
    if !manifest_path(&dir).is_file() {
        anyhow::bail!("no image named '{}' in '{}'", name, registry.display());
    }
    fs::remove_dir_all(&dir).with_context(|| format!("removing image '{}'", dir.display()))
}
