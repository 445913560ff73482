// src/commands/build.rs
//! The graminization pipeline: inspect, synthesize, merge, stage, build

use anyhow::{Context, Result};
use gsc::docker::DockerService;
use gsc::{config, credentials, distro, docker, manifest};
use gsc::{BuildConfig, Distro, HostPaths, LaunchSpec, TemplateContext};
use std::fs;
use std::path::Path;
use tracing::info;

/// Build a graminized variant of `image`, tagged
/// `gsc-<image>-unsigned`.
#[allow(clippy::too_many_arguments)]
pub async fn cmd_build(
    image: &str,
    manifest_path: &Path,
    config_file: &Path,
    debug: bool,
    insecure_args: bool,
    no_cache: bool,
    rm: bool,
    build_args: &[String],
    defines: &[String],
) -> Result<()> {
    let build_args = config::parse_build_args(build_args)?;
    let defines = config::parse_define_args(defines)?;

    let mut build_config = BuildConfig::load(config_file)?;
    build_config.apply_defines(&defines);

    let docker = DockerService::connect().context("connecting to the Docker daemon")?;
    let image_config = docker.image_config(image).await?;

    let distro_id = if build_config.distro == distro::AUTO {
        let detected = distro::detect(&docker, image).await?;
        info!("Detected distro {detected} for {image}");
        detected
    } else {
        build_config.distro.clone()
    };
    let distro = Distro::from_identifier(&distro_id)?;
    info!("Using the {distro} distro template for {distro_id}");

    let launch_spec = LaunchSpec::assemble(&image_config, debug, insecure_args)?;
    info!("Entrypoint binary: {}", launch_spec.descriptor.binary);

    let context_dir = docker::gsc_build_path(image);
    if context_dir.exists() {
        fs::remove_dir_all(&context_dir)?;
    }
    fs::create_dir_all(&context_dir)?;

    let mut ctx = TemplateContext::new();
    ctx.set("image", image);
    build_config.populate(&mut ctx);
    launch_spec.populate(&mut ctx);
    for (key, value) in &defines {
        ctx.set(key.as_str(), value.as_str());
    }

    stage_build_context(
        &ctx,
        distro,
        &distro_id,
        manifest_path,
        &context_dir,
        &HostPaths::default(),
    )?;

    let tag = docker::gsc_unsigned_image_name(image);
    docker
        .build_image(&context_dir, &tag, "Dockerfile", &build_args, no_cache, rm)
        .await?;

    println!("Successfully built graminized image `{tag}`.");
    println!(
        "Sign its enclave to produce `{}` before deployment.",
        docker::gsc_image_name(image)
    );
    Ok(())
}

/// Write the rendered Dockerfile, apploader, merged enclave manifest and
/// staged credentials into the build context
pub fn stage_build_context(
    ctx: &TemplateContext,
    distro: Distro,
    distro_id: &str,
    manifest_path: &Path,
    context_dir: &Path,
    host: &HostPaths,
) -> Result<()> {
    let base_manifest = ctx
        .render(distro::ENTRYPOINT_MANIFEST_TEMPLATE)
        .parse::<toml::Table>()
        .context("rendered distro manifest template is not valid TOML")?;
    let user_manifest = manifest::read_manifest(manifest_path)
        .with_context(|| format!("reading manifest {}", manifest_path.display()))?;
    let merged = manifest::merge(
        user_manifest,
        base_manifest,
        &manifest_path.display().to_string(),
        "distro manifest template",
    );
    manifest::write_manifest(&context_dir.join("entrypoint.manifest"), &merged)?;

    fs::write(
        context_dir.join("apploader.sh"),
        ctx.render(distro::APPLOADER_TEMPLATE),
    )?;
    fs::write(
        context_dir.join("Dockerfile"),
        ctx.render(distro.dockerfile_template()),
    )?;

    credentials::stage_redhat(distro_id, host, context_dir)?;
    credentials::stage_suse(distro_id, host, context_dir)?;

    info!("Staged build context at {}", context_dir.display());
    Ok(())
}
