//! Configuration errors.
//!
//! These are detected before any side effect and are never retried. Tool and
//! filesystem failures travel as `anyhow::Error` with context attached; match
//! on this type with `err.downcast_ref::<ConfigError>()` when the distinction
//! matters.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported format '{0}' (expected raw, iso or qcow2)")]
    UnsupportedFormat(String),

    #[error("unsupported provider '{0}' (expected hyperkit, kvm or virtualbox)")]
    UnsupportedProvider(String),

    #[error("at least one output format must be requested")]
    EmptyFormatSet,

    #[error("format '{0}' requested more than once")]
    DuplicateFormat(String),

    #[error("build recipe not found: {}", .0.display())]
    MissingRecipe(PathBuf),

    #[error("no kernel image found in exported filesystem '{}'", .0.display())]
    KernelNotFound(PathBuf),

    #[error("invalid image name '{0}'")]
    InvalidImageName(String),

    #[error("invalid config '{}': {message}", .path.display())]
    InvalidConfig { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ConfigError::UnsupportedFormat("vmdk".into());
        assert_eq!(
            err.to_string(),
            "unsupported format 'vmdk' (expected raw, iso or qcow2)"
        );

        let err = ConfigError::MissingRecipe(PathBuf::from("/tmp/ctx/Dockerfile"));
        assert!(err.to_string().contains("/tmp/ctx/Dockerfile"));
    }
}
