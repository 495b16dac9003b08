//! Container engine adapter.
//!
//! The builder needs four things from an engine: build an image from a
//! context directory, create a container without starting it, stream that
//! container's filesystem as a tar archive, and remove it again. [`DockerCli`]
//! gets them from the `docker` binary.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::build::context::DockerOpts;
use crate::process::Cmd;

/// Handle to a created (never started) container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerId(pub String);

pub trait ContainerEngine {
    /// Build `context_dir` into an image tagged `tag`, blocking until the
    /// engine reports success or failure. Progress goes to the caller's terminal.
    fn build(&self, context_dir: &Path, tag: &str, opts: &DockerOpts) -> Result<()>;

    /// Instantiate a container from `image` without running any process.
    fn create(&self, image: &str) -> Result<ContainerId>;

    /// Stream the container filesystem as a tar archive.
    fn export(&self, id: &ContainerId) -> Result<Box<dyn Read>>;

    /// Remove the container. Callers treat failure as best-effort.
    fn remove(&self, id: &ContainerId) -> Result<()>;
}

/// [`ContainerEngine`] backed by the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn build_args(context_dir: &Path, tag: &str, opts: &DockerOpts) -> Vec<String> {
        let mut args = vec!["build".to_string(), "-t".to_string(), tag.to_string()];
        for (key, value) in &opts.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{key}={value}"));
        }
        if opts.no_cache {
            args.push("--no-cache".to_string());
        }
        if opts.pull {
            args.push("--pull".to_string());
        }
        args.extend(opts.extra_args.iter().cloned());
        args.push(context_dir.display().to_string());
        args
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl ContainerEngine for DockerCli {
    fn build(&self, context_dir: &Path, tag: &str, opts: &DockerOpts) -> Result<()> {
        let args = Self::build_args(context_dir, tag, opts);
        tracing::debug!(binary = %self.binary, ?args, "starting image build");

        let status = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("running '{} build'", self.binary))?;

        if !status.success() {
            bail!(
                "image build of '{}' failed ({})",
                context_dir.display(),
                status
            );
        }
        Ok(())
    }

    fn create(&self, image: &str) -> Result<ContainerId> {
        let result = Cmd::new(&self.binary)
            .args(["create", image])
            .error_msg(format!("creating container from image '{image}' failed"))
            .run()?;

        let id = result.stdout.trim();
        if id.is_empty() {
            bail!("'{} create {}' printed no container id", self.binary, image);
        }
        Ok(ContainerId(id.to_string()))
    }

    fn export(&self, id: &ContainerId) -> Result<Box<dyn Read>> {
        let child = Command::new(&self.binary)
            .args(["export", &id.0])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("running '{} export {}'", self.binary, id.0))?;
        Ok(Box::new(ExportStream::new(child)?))
    }

    fn remove(&self, id: &ContainerId) -> Result<()> {
        Cmd::new(&self.binary)
            .args(["rm", "-f", &id.0])
            .error_msg(format!("removing container '{}' failed", id.0))
            .run()?;
        Ok(())
    }
}

/// Stdout of a running `docker export`.
///
/// At end of stream the child is reaped; a non-zero exit turns the final read
/// into an error carrying the engine's stderr, so a truncated archive never
/// looks like a complete one.
struct ExportStream {
    child: Child,
    stdout: ChildStdout,
    finished: bool,
}

impl ExportStream {
    fn new(mut child: Child) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .context("container export has no stdout pipe")?;
        Ok(Self {
            child,
            stdout,
            finished: false,
        })
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.finished = true;
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            pipe.read_to_string(&mut stderr)?;
        }
        let status = self.child.wait()?;
        if !status.success() {
            return Err(std::io::Error::other(format!(
                "container export failed ({}): {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Read for ExportStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.stdout.read(buf)?;
        if n == 0 && !buf.is_empty() && !self.finished {
            self.finish()?;
        }
        Ok(n)
    }
}

impl Drop for ExportStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
