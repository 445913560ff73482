// src/commands/info.rs
//! Inspection command: show what graminization would derive from an image

use anyhow::{Context, Result};
use gsc::docker::DockerService;
use gsc::{distro, launch, BuildConfig, LaunchSpec};
use std::path::Path;

/// Print the image configuration and the launch parameters that a build
/// would synthesize from it, without building anything.
pub async fn cmd_info(image: &str, config_file: &Path) -> Result<()> {
    let build_config = BuildConfig::load(config_file)?;

    let docker = DockerService::connect().context("connecting to the Docker daemon")?;
    let image_config = docker.image_config(image).await?;

    println!("Image: {image}");
    println!("  Entrypoint: {:?}", image_config.entrypoint);
    println!("  Cmd: {:?}", image_config.cmd);
    println!("  WorkingDir: {:?}", image_config.working_dir);
    println!("  User: {:?}", image_config.user);
    println!("  Env entries: {}", image_config.env.len());

    if build_config.distro == distro::AUTO {
        println!("Distro: auto (detected at build time)");
    } else {
        println!("Distro: {}", build_config.distro);
    }

    let launch_spec = LaunchSpec::assemble(&image_config, false, false)?;
    println!("Derived launch configuration:");
    println!("  Binary: {}", launch_spec.descriptor.binary);
    println!("  Fixed arguments: {:?}", launch_spec.descriptor.binary_arguments);
    println!("  Command remainder: {:?}", launch_spec.descriptor.cmd_remainder);
    println!("  Working directory: {}", launch_spec.descriptor.working_dir);
    println!("  Runs as: {}", launch::app_user(&image_config));

    if !launch_spec.env_block.is_empty() {
        println!("Manifest environment:");
        for line in launch_spec.env_block.lines() {
            println!("  {line}");
        }
    }

    Ok(())
}
