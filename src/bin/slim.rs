use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use slim_builder::artifact_store::ArtifactStore;
use slim_builder::build::context::{BuildContext, DockerOpts, FormatSet, Provider};
use slim_builder::config::SlimConfig;
use slim_builder::pipeline::{catalog::base_format, plan::plan, run_build};
use slim_builder::preflight::{check_required_tools, required_tools};
use slim_builder::registry::{list_images, remove_image};
use slim_builder::{DockerCli, HostTools, Toolbox};

#[derive(Debug, Parser)]
#[command(name = "slim", version, about = "Build VM images from Dockerfiles")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: <config_dir>/slim/slim.toml)
    #[arg(long, global = true, env = "SLIM_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build artifacts from a directory containing a Dockerfile
    Build(BuildArgs),
    /// List built images in the registry
    Images,
    /// Remove a built image from the registry
    Rm { name: String },
    /// Check that the host has every tool a build would need
    Preflight(TargetArgs),
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// hyperkit, kvm or virtualbox
    #[arg(short, long)]
    provider: Option<String>,

    /// raw, iso or qcow2; repeat for several
    #[arg(short, long = "format")]
    formats: Vec<String>,
}

#[derive(Debug, Args)]
struct BuildArgs {
    path: PathBuf,

    #[command(flatten)]
    target: TargetArgs,

    /// Output directory (default: <registry>/<basename of path>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    pull: bool,

    /// KEY=VALUE passed to the image build
    #[arg(long = "build-arg")]
    build_args: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = SlimConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Build(args) => build(&config, args),
        Command::Images => images(&config),
        Command::Rm { name } => {
            remove_image(&config.registry_dir, &name)?;
            println!("removed {name}");
            Ok(())
        }
        Command::Preflight(target) => {
            let (provider, formats) = resolve_target(&config, &target)?;
            let steps = plan(provider, &formats);
            check_required_tools(&required_tools(&steps, &config.docker_bin))?;
            println!("all tools present for {provider} {:?}", formats.as_slice());
            Ok(())
        }
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "slim=info,slim_builder=info",
        1 => "slim=debug,slim_builder=debug",
        _ => "slim=trace,slim_builder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

/// Provider from the flag or config, formats from the flags or the provider's base format.
fn resolve_target(config: &SlimConfig, target: &TargetArgs) -> Result<(Provider, FormatSet)> {
    let provider = match &target.provider {
        Some(name) => name.parse::<Provider>()?,
        None => config.default_provider,
    };
    let formats = if target.formats.is_empty() {
        FormatSet::new(vec![base_format(provider)])?
    } else {
        FormatSet::parse(&target.formats)?
    };
    Ok((provider, formats))
}

fn default_output(config: &SlimConfig, path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("resolving build path '{}'", path.display()))?;
    let name = canonical
        .file_name()
        .with_context(|| format!("build path '{}' has no basename", canonical.display()))?;
    Ok(config.registry_dir.join(name))
}

fn build(config: &SlimConfig, args: BuildArgs) -> Result<()> {
    let (provider, formats) = resolve_target(config, &args.target)?;

    let mut docker_opts = DockerOpts {
        no_cache: args.no_cache,
        pull: args.pull,
        ..DockerOpts::default()
    };
    for raw in &args.build_args {
        docker_opts.push_build_arg(raw)?;
    }

    let output_dir = match args.output {
        Some(dir) => dir,
        None => default_output(config, &args.path)?,
    };

    check_required_tools(&required_tools(
        &plan(provider, &formats),
        &config.docker_bin,
    ))?;

    let store = ArtifactStore::open(&config.stage_dir)?;
    let _lock = store.lock()?;

    let ctx = BuildContext::new(provider, formats, args.path, output_dir, store)
        .with_docker_opts(docker_opts)
        .with_bootloader_dir(config.bootloader_dir.clone())
        .with_gzip_level(config.gzip_level);

    let engine = DockerCli::new(config.docker_bin.clone());
    let report = run_build(&ctx, &Toolbox::new(&engine, &HostTools))?;

    for artifact in &report.manifest.artifacts {
        info!(
            artifact = %ctx.output(&artifact.name).display(),
            size_bytes = artifact.size_bytes,
            "artifact ready"
        );
    }
    println!("{}", ctx.output_dir.display());
    Ok(())
}

fn images(config: &SlimConfig) -> Result<()> {
    let images = list_images(&config.registry_dir)?;
    if images.is_empty() {
        println!("no images in '{}'", config.registry_dir.display());
        return Ok(());
    }

    println!("{:<24} {:<11} {:<16} {:>10}  FINISHED", "NAME", "PROVIDER", "FORMATS", "SIZE");
    for image in images {
        let formats = image
            .manifest
            .formats
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<24} {:<11} {:<16} {:>10}  {}",
            image.name,
            image.manifest.provider.as_str(),
            formats,
            human_size(image.disk_bytes),
            image.manifest.finished_at_utc
        );
    }
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
