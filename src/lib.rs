// src/lib.rs

//! Graminized Shielded Containers
//!
//! Transforms an existing Docker image into a graminized variant that runs
//! the original application inside an Intel SGX enclave:
//!
//! - Inspects the source image's entrypoint, command, environment and user
//! - Synthesizes the enclave loader's launch parameters from them
//! - Merges the distro manifest template with a user-supplied manifest
//! - Stages distro subscription credentials into the build context
//! - Drives the Docker build that produces the `gsc-<image>-unsigned` tag
//!
//! The pipeline is strictly sequential; the only shared resource is the
//! per-invocation build-context directory under `build/`.

pub mod config;
pub mod credentials;
pub mod distro;
pub mod docker;
mod error;
pub mod launch;
pub mod manifest;
pub mod template;

pub use config::BuildConfig;
pub use credentials::HostPaths;
pub use distro::Distro;
pub use docker::{gsc_build_path, gsc_image_name, gsc_unsigned_image_name, ImageConfig};
pub use error::{Error, Result};
pub use launch::{BinaryDescriptor, LaunchSpec};
pub use template::TemplateContext;
