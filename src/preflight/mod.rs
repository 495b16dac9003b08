//! Host tool checks run before a build touches anything.
//!
//! The tool list is derived from the step plan, so a raw-only build never
//! asks for `mkisofs` or `qemu-img`.
//!
//! # Example
//!
//! ```rust,ignore
//! use slim_builder::pipeline::plan::plan;
//! use slim_builder::preflight::{check_required_tools, required_tools};
//!
//! let steps = plan(provider, &formats);
//! check_required_tools(&required_tools(&steps, "docker"))?;
//! ```

use anyhow::{bail, Result};

use crate::steps::Step;

/// Whether `cmd` resolves on `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools needed by the given steps, as (command, package) pairs.
///
/// `docker_bin` is the container engine binary the build will drive.
pub fn required_tools<'a>(steps: &[Step], docker_bin: &'a str) -> Vec<(&'a str, &'a str)> {
    let mut tools = Vec::new();
    for step in steps {
        match step {
            Step::BuildImage | Step::ExportFilesystem => tools.push((docker_bin, "docker")),
            Step::AssembleRaw => tools.extend_from_slice(&[
                ("bash", "bash"),
                ("find", "findutils"),
                ("cpio", "cpio"),
                ("gzip", "gzip"),
            ]),
            Step::BuildIso => tools.push(("mkisofs", "genisoimage")),
            Step::ConvertQcow2 => tools.push(("qemu-img", "qemu-utils")),
            Step::Cleanup => {}
        }
    }

    let mut seen = std::collections::HashSet::new();
    tools.retain(|(cmd, _)| seen.insert(*cmd));
    tools
}

/// Fail unless every `(command, package)` pair resolves on `PATH`.
///
/// Reports every missing tool with its package in one error.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .map(|(tool, package)| format!("  {} (install: {})", tool, package))
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        bail!("Missing required host tools:\n{}", missing.join("\n"));
    }

    Ok(())
}
