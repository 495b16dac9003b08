//! User configuration.
//!
//! Lives at `<config_dir>/slim/slim.toml`. CLI flags override file values,
//! which override the defaults below. A missing file means all defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::build::context::Provider;
use crate::error::ConfigError;

pub const DEFAULT_BOOTLOADER_DIR: &str = "/usr/share/slim/isolinux";
pub const DEFAULT_GZIP_LEVEL: u32 = 9;
const CONFIG_DIR_NAME: &str = "slim";
const CONFIG_FILE_NAME: &str = "slim.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlimConfig {
    pub stage_dir: PathBuf,
    pub registry_dir: PathBuf,
    pub bootloader_dir: PathBuf,
    pub docker_bin: String,
    pub default_provider: Provider,
    pub gzip_level: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SlimToml {
    stage_dir: Option<PathBuf>,
    registry_dir: Option<PathBuf>,
    bootloader_dir: Option<PathBuf>,
    docker_bin: Option<String>,
    default_provider: Option<String>,
    gzip_level: Option<u32>,
}

impl Default for SlimConfig {
    fn default() -> Self {
        let home = slim_home();
        Self {
            stage_dir: home.join("stage"),
            registry_dir: home.join("registry"),
            bootloader_dir: PathBuf::from(DEFAULT_BOOTLOADER_DIR),
            docker_bin: "docker".to_string(),
            default_provider: Provider::Kvm,
            gzip_level: DEFAULT_GZIP_LEVEL,
        }
    }
}

/// `~/.slim`, or `./.slim` when no home directory can be resolved.
fn slim_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".slim")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl SlimConfig {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        Self::parse(&raw, &path)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self> {
        let parsed: SlimToml = toml::from_str(raw)
            .with_context(|| format!("parsing config '{}'", path.display()))?;
        let invalid = |message: String| ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            message,
        };

        let defaults = Self::default();
        let default_provider = match parsed.default_provider {
            Some(name) => name
                .parse()
                .map_err(|e: ConfigError| invalid(e.to_string()))?,
            None => defaults.default_provider,
        };
        let gzip_level = parsed.gzip_level.unwrap_or(defaults.gzip_level);
        if !(1..=9).contains(&gzip_level) {
            return Err(invalid(format!("gzip_level must be 1-9, got {gzip_level}")).into());
        }

        Ok(Self {
            stage_dir: parsed.stage_dir.unwrap_or(defaults.stage_dir),
            registry_dir: parsed.registry_dir.unwrap_or(defaults.registry_dir),
            bootloader_dir: parsed.bootloader_dir.unwrap_or(defaults.bootloader_dir),
            docker_bin: parsed.docker_bin.unwrap_or(defaults.docker_bin),
            default_provider,
            gzip_level,
        })
    }
}
