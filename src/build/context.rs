//! Build context threaded through every step.
//!
//! `provider` and `formats` fully determine the step plan; everything else in
//! [`BuildContext`] only matters once steps start touching the filesystem.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::artifact_store::ArtifactStore;
use crate::error::ConfigError;

/// Virtualization target that consumes the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Boots kernel + initrd directly.
    Hyperkit,
    Kvm,
    /// Boots from an ISO attached as a CD-ROM.
    Virtualbox,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Hyperkit, Provider::Kvm, Provider::Virtualbox];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Hyperkit => "hyperkit",
            Provider::Kvm => "kvm",
            Provider::Virtualbox => "virtualbox",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hyperkit" => Ok(Provider::Hyperkit),
            "kvm" | "qemu" => Ok(Provider::Kvm),
            "virtualbox" | "vbox" => Ok(Provider::Virtualbox),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Output artifact tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Kernel + initrd.
    Raw,
    Iso,
    Qcow2,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Raw => "raw",
            Format::Iso => "iso",
            Format::Qcow2 => "qcow2",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Format::Raw),
            "iso" => Ok(Format::Iso),
            "qcow2" => Ok(Format::Qcow2),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Ordered, non-empty, duplicate-free list of requested formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormatSet(Vec<Format>);

impl FormatSet {
    pub fn new(formats: Vec<Format>) -> Result<Self, ConfigError> {
        if formats.is_empty() {
            return Err(ConfigError::EmptyFormatSet);
        }
        for (i, format) in formats.iter().enumerate() {
            if formats[..i].contains(format) {
                return Err(ConfigError::DuplicateFormat(format.to_string()));
            }
        }
        Ok(Self(formats))
    }

    /// Parse user-supplied format names, rejecting unknown values.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let formats = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Format>, _>>()?;
        Self::new(formats)
    }

    pub fn contains(&self, format: Format) -> bool {
        self.0.contains(&format)
    }

    pub fn iter(&self) -> impl Iterator<Item = Format> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Format] {
        &self.0
    }
}

/// Pass-through options for the container engine. The core never reads these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerOpts {
    pub build_args: BTreeMap<String, String>,
    pub no_cache: bool,
    pub pull: bool,
    pub extra_args: Vec<String>,
}

impl DockerOpts {
    /// Parse a `KEY=VALUE` build argument.
    pub fn push_build_arg(&mut self, raw: &str) -> anyhow::Result<()> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("build arg '{}' must be KEY=VALUE", raw))?;
        if key.is_empty() {
            anyhow::bail!("build arg '{}' has an empty key", raw);
        }
        self.build_args.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Everything one build invocation needs. Created once, discarded after cleanup.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub provider: Provider,
    pub formats: FormatSet,
    pub build_path: PathBuf,
    pub output_dir: PathBuf,
    pub docker_opts: DockerOpts,
    pub store: ArtifactStore,
    /// Directory whose files are copied into `isolinux/` on the ISO.
    pub bootloader_dir: PathBuf,
    pub gzip_level: u32,
}

impl BuildContext {
    pub fn new(
        provider: Provider,
        formats: FormatSet,
        build_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            provider,
            formats,
            build_path: build_path.into(),
            output_dir: output_dir.into(),
            docker_opts: DockerOpts::default(),
            store,
            bootloader_dir: PathBuf::from(crate::config::DEFAULT_BOOTLOADER_DIR),
            gzip_level: crate::config::DEFAULT_GZIP_LEVEL,
        }
    }

    pub fn with_docker_opts(mut self, opts: DockerOpts) -> Self {
        self.docker_opts = opts;
        self
    }

    pub fn with_bootloader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bootloader_dir = dir.into();
        self
    }

    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level;
        self
    }

    /// Path of a final artifact in the caller-visible output directory.
    pub fn output(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn recipe_path(&self) -> PathBuf {
        recipe_path(&self.build_path)
    }
}

/// Build recipe file expected inside a build context directory.
pub const RECIPE_FILENAME: &str = "Dockerfile";

pub fn recipe_path(build_path: &Path) -> PathBuf {
    build_path.join(RECIPE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parse_rejects_unknown() {
        assert_eq!("ISO".parse::<Format>().unwrap(), Format::Iso);
        assert_eq!(
            "vmdk".parse::<Format>().unwrap_err(),
            ConfigError::UnsupportedFormat("vmdk".into())
        );
    }

    #[test]
    fn provider_parse_accepts_aliases() {
        assert_eq!("qemu".parse::<Provider>().unwrap(), Provider::Kvm);
        assert_eq!("VirtualBox".parse::<Provider>().unwrap(), Provider::Virtualbox);
        assert!("xen".parse::<Provider>().is_err());
    }

    #[test]
    fn format_set_rejects_empty_and_duplicates() {
        assert_eq!(
            FormatSet::new(vec![]).unwrap_err(),
            ConfigError::EmptyFormatSet
        );
        assert_eq!(
            FormatSet::parse(&["iso", "raw", "iso"]).unwrap_err(),
            ConfigError::DuplicateFormat("iso".into())
        );
    }

    #[test]
    fn format_set_preserves_caller_order() {
        let set = FormatSet::parse(&["qcow2", "raw"]).unwrap();
        assert_eq!(set.as_slice(), &[Format::Qcow2, Format::Raw]);
        assert!(set.contains(Format::Raw));
        assert!(!set.contains(Format::Iso));
    }

    #[test]
    fn build_arg_requires_key_value() {
        let mut opts = DockerOpts::default();
        opts.push_build_arg("VERSION=1.2=3").unwrap();
        assert_eq!(opts.build_args["VERSION"], "1.2=3");
        assert!(opts.push_build_arg("NOVALUE").is_err());
        assert!(opts.push_build_arg("=x").is_err());
    }
}
