// src/error.rs
//! Error types for the graminization pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type for graminization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while graminizing an image
#[derive(Error, Debug)]
pub enum Error {
    /// The source application image does not exist in the local Docker daemon
    #[error("image not found: {0}. Pull or build it before graminizing.")]
    ImageNotFound(String),

    /// The image defines neither an entrypoint nor a command
    #[error("could not find the entrypoint binary to the application image")]
    NoEntrypoint,

    /// The OS distro of the image could not be determined automatically
    #[error(
        "could not automatically detect the OS distro of the supplied Docker image; \
         please specify the OS distro manually in the configuration file"
    )]
    DistroRetrieval,

    /// The distro identifier does not name a supported base image
    #[error("invalid or unsupported distro format: {0}")]
    InvalidDistroFormat(String),

    /// Host subscription data required for the distro's package repos is missing
    #[error(
        "{0}. Register and subscribe your RHEL system to the Red Hat Customer Portal \
         using Red Hat Subscription-Manager."
    )]
    MissingSubscription(String),

    /// The SUSE Customer Center credentials file is absent
    #[error(
        "cannot find your SUSE Customer Center credentials file at {}. Please register \
         and subscribe your SUSE system to the SUSE Customer Center.",
        .0.display()
    )]
    MissingSccCredentials(PathBuf),

    /// `--build-arg KEY` named a variable absent from the process environment
    #[error("could not set build arg `{0}` from environment")]
    InvalidBuildArg(String),

    /// `--define` entry without a `KEY=VALUE` shape
    #[error("invalid value for argument `{0}`, expected `--define {0}=<value>`")]
    InvalidDefine(String),

    /// A value that should parse as a boolean flag does not
    #[error("invalid boolean value: `{0}` (expected true/false, on/off, yes/no or a number)")]
    InvalidBool(String),

    /// The Docker daemon reported a build failure
    #[error("docker build failed: {0}")]
    BuildFailed(String),

    /// Docker Engine API error
    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    /// IO error during staging or file copies
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest could not be parsed as TOML
    #[error("manifest parse error: {0}")]
    ManifestParse(#[from] toml::de::Error),

    /// Manifest could not be serialized back to TOML
    #[error("manifest write error: {0}")]
    ManifestWrite(#[from] toml::ser::Error),

    /// Tool configuration file could not be parsed
    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),
}
