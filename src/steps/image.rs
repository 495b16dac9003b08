use anyhow::Result;
use tracing::{info, warn};

use super::Toolbox;
use crate::artifact::rootfs::extract_archive;
use crate::artifact_store::{recreate_dir, IMAGE_NAME};
use crate::build::context::BuildContext;
use crate::error::ConfigError;

/// Build the container image from the recipe at `build_path`.
///
/// The recipe is checked before the engine is touched; a missing recipe is a
/// configuration error.
pub fn build_image(ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<()> {
    let recipe = ctx.recipe_path();
    if !recipe.is_file() {
        return Err(ConfigError::MissingRecipe(recipe).into());
    }

    info!(context = %ctx.build_path.display(), tag = IMAGE_NAME, "building image");
    toolbox
        .engine
        .build(&ctx.build_path, IMAGE_NAME, &ctx.docker_opts)
}

/// Materialize the image filesystem as `<stage>/slim-vm/`.
///
/// The throwaway container is always removed afterwards; failing to remove it
/// is logged and otherwise ignored.
pub fn export_filesystem(ctx: &BuildContext, toolbox: &Toolbox<'_>) -> Result<()> {
    let rootfs = ctx.store.rootfs_dir();
    recreate_dir(&rootfs)?;

    let container = toolbox.engine.create(IMAGE_NAME)?;
    info!(container = %container.0, rootfs = %rootfs.display(), "exporting filesystem");

    let extracted = toolbox
        .engine
        .export(&container)
        .and_then(|stream| extract_archive(stream, &rootfs));

    if let Err(e) = toolbox.engine.remove(&container) {
        warn!(container = %container.0, error = %e, "could not remove export container");
    }

    extracted
}
