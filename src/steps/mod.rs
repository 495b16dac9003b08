//! Build steps.
//!
//! A step takes the [`BuildContext`] and the adapters in a [`Toolbox`], and
//! communicates with later steps only through files in the artifact store
//! and the output directory.

mod image;
mod iso;
mod qcow2;
mod raw;

use anyhow::{Context, Result};
use std::fmt;

use crate::artifact::ImageTools;
use crate::build::context::BuildContext;
use crate::container::ContainerEngine;

pub use image::{build_image, export_filesystem};
pub use iso::build_iso;
pub use qcow2::convert_qcow2;
pub use raw::assemble_raw;

/// External collaborators a step may call.
#[derive(Clone, Copy)]
pub struct Toolbox<'a> {
    pub engine: &'a dyn ContainerEngine,
    pub tools: &'a dyn ImageTools,
}

impl<'a> Toolbox<'a> {
    pub fn new(engine: &'a dyn ContainerEngine, tools: &'a dyn ImageTools) -> Self {
        Self { engine, tools }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    BuildImage,
    ExportFilesystem,
    AssembleRaw,
    BuildIso,
    ConvertQcow2,
    Cleanup,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::BuildImage => "build-image",
            Step::ExportFilesystem => "export-filesystem",
            Step::AssembleRaw => "assemble-raw",
            Step::BuildIso => "build-iso",
            Step::ConvertQcow2 => "convert-qcow2",
            Step::Cleanup => "cleanup",
        }
    }

    pub fn run(self, ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<()> {
        match self {
            Step::BuildImage => build_image(ctx, toolbox),
            Step::ExportFilesystem => export_filesystem(ctx, toolbox),
            Step::AssembleRaw => assemble_raw(ctx, toolbox),
            Step::BuildIso => build_iso(ctx, toolbox),
            Step::ConvertQcow2 => convert_qcow2(ctx, toolbox),
            Step::Cleanup => crate::pipeline::cleanup::apply(ctx).map(|_| ()),
        }
        .with_context(|| format!("step '{}' failed", self.name()))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
