// src/cli.rs
//! CLI definitions for the graminized-image builder
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gsc")]
#[command(version)]
#[command(
    about = "Build graminized Docker images that run existing applications inside SGX enclaves",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Graminize an application image, producing `gsc-<image>-unsigned`
    Build {
        /// Name of the application Docker image
        image: String,

        /// Path to the application-specific enclave manifest
        manifest: PathBuf,

        /// Path to the tool configuration file
        #[arg(short = 'c', long, default_value = "config.yaml")]
        config_file: PathBuf,

        /// Compile the enclave with debug logging
        #[arg(short, long)]
        debug: bool,

        /// Allow the run-time command line to override the manifest argv
        #[arg(long)]
        insecure_args: bool,

        /// Build without using the Docker cache
        #[arg(long)]
        no_cache: bool,

        /// Remove intermediate containers after a successful build
        #[arg(long)]
        rm: bool,

        /// Docker build argument; KEY=VALUE, or KEY to take the value
        /// from the environment
        #[arg(long = "build-arg", value_name = "KEY[=VALUE]")]
        build_arg: Vec<String>,

        /// Override a configuration or template variable
        #[arg(short = 'D', long = "define", value_name = "KEY=VALUE")]
        define: Vec<String>,
    },

    /// Show the launch configuration that would be derived from an image
    Info {
        /// Name of the application Docker image
        image: String,

        /// Path to the tool configuration file
        #[arg(short = 'c', long, default_value = "config.yaml")]
        config_file: PathBuf,
    },
}
