//! External process invocation.
//!
//! Every host tool the builder drives goes through [`Cmd`]. A non-zero exit
//! becomes an error carrying the tool's own output verbatim, so the user sees
//! the diagnostic the tool printed rather than a paraphrase.

use anyhow::{bail, Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured output of a successful command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
}

/// Builder around [`std::process::Command`] with captured output.
#[derive(Debug)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    dir: Option<PathBuf>,
    error_msg: Option<String>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            dir: None,
            error_msg: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Working directory for the child process.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    /// Message prefixed to the tool output when the command fails.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    pub fn run(self) -> Result<CommandResult> {
        let rendered = self.render();
        tracing::debug!(command = %rendered, "running");

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .with_context(|| format!("spawning '{}'", rendered))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let msg = self
                .error_msg
                .unwrap_or_else(|| format!("'{}' failed", rendered));
            bail!(
                "{} ({})\n{}\n{}",
                msg,
                output.status,
                stderr.trim(),
                stdout.trim()
            );
        }

        Ok(CommandResult { stdout, stderr })
    }

    fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run a shell pipeline with `pipefail`, so a failing stage fails the whole line.
pub fn shell(script: &str) -> Result<CommandResult> {
    Cmd::new("bash")
        .args(["-o", "pipefail", "-c", script])
        .error_msg("shell pipeline failed")
        .run()
}
