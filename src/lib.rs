//! Turns a container build context into bootable VM artifacts.
//!
//! A `Dockerfile` describes the guest root filesystem. The builder asks a
//! container engine to build and export it, pulls the kernel out, packs the
//! rest into an initrd and, depending on what was requested, masters an ISO
//! and converts that into a qcow2 disk.
//!
//! # Architecture
//!
//! ```text
//! BuildContext (provider, formats, paths)
//!     │
//!     ├── pipeline::plan      static catalog → ordered, duplicate-free steps
//!     ├── pipeline::executor  runs steps one by one, stops at first failure
//!     │       │
//!     │       └── steps       build-image, export-filesystem, assemble-raw,
//!     │                       build-iso, convert-qcow2, cleanup
//!     │               │
//!     │               ├── container::ContainerEngine   (docker CLI)
//!     │               └── artifact::ImageTools         (cpio/gzip, mkisofs, qemu-img)
//!     │
//!     └── pipeline::cleanup   drops intermediates nobody asked for
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use slim_builder::{run_build, ArtifactStore, BuildContext, DockerCli, FormatSet, HostTools};
//! use slim_builder::{Provider, Toolbox};
//!
//! let store = ArtifactStore::open(Path::new("/var/tmp/slim"))?;
//! let ctx = BuildContext::new(
//!     Provider::Kvm,
//!     FormatSet::parse(&["qcow2"])?,
//!     "images/alpine3.12-raw",
//!     "out/alpine",
//!     store,
//! );
//! let engine = DockerCli::default();
//! run_build(&ctx, &Toolbox::new(&engine, &HostTools))?;
//! ```

pub mod artifact;
pub mod artifact_store;
pub mod build;
pub mod config;
pub mod container;
pub mod error;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod registry;
pub mod steps;

#[cfg(test)]
mod test_support;

pub use artifact::{HostTools, ImageTools};
pub use artifact_store::ArtifactStore;
pub use build::context::{BuildContext, DockerOpts, Format, FormatSet, Provider};
pub use config::SlimConfig;
pub use container::{ContainerEngine, DockerCli};
pub use error::ConfigError;
pub use pipeline::{run_build, BuildReport};
pub use steps::{Step, Toolbox};
