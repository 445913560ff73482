// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            image,
            manifest,
            config_file,
            debug,
            insecure_args,
            no_cache,
            rm,
            build_arg,
            define,
        } => {
            commands::cmd_build(
                &image,
                &manifest,
                &config_file,
                debug,
                insecure_args,
                no_cache,
                rm,
                &build_arg,
                &define,
            )
            .await
        }
        Commands::Info { image, config_file } => commands::cmd_info(&image, &config_file).await,
    }
}
