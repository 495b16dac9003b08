//! Build orchestration.
//!
//! - [`catalog`] - static format → steps and provider → formats tables
//! - [`plan`] - ordered, duplicate-free step selection
//! - [`executor`] - sequential, fail-fast execution
//! - [`cleanup`] - removal of intermediate artifacts nobody asked for

pub mod catalog;
pub mod cleanup;
pub mod executor;
pub mod plan;

use anyhow::{Context, Result};
use tracing::info;

use crate::build::context::BuildContext;
use crate::error::ConfigError;
use crate::registry::{write_manifest, BuildManifest};
use crate::steps::{Step, Toolbox};

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub steps: Vec<Step>,
    pub manifest: BuildManifest,
}

/// Plan, execute and record one build.
pub fn run_build(ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<BuildReport> {
    let steps = plan::plan(ctx.provider, &ctx.formats);
    info!(
        provider = %ctx.provider,
        formats = ?ctx.formats.as_slice(),
        plan = ?steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "build planned"
    );

    let recipe = ctx.recipe_path();
    if !recipe.is_file() {
        return Err(ConfigError::MissingRecipe(recipe).into());
    }

    std::fs::create_dir_all(&ctx.output_dir).with_context(|| {
        format!("creating output directory '{}'", ctx.output_dir.display())
    })?;

    executor::execute(&steps, ctx, toolbox)?;
    let manifest = write_manifest(ctx, &steps)?;

    info!(output = %ctx.output_dir.display(), "build finished");
    Ok(BuildReport { steps, manifest })
}
