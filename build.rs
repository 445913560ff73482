// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: tool configuration file
fn config_file_arg() -> Arg {
    Arg::new("config_file")
        .short('c')
        .long("config-file")
        .value_name("PATH")
        .default_value("config.yaml")
        .help("Tool configuration file")
}

fn build_cli() -> Command {
    Command::new("gsc")
        .version(env!("CARGO_PKG_VERSION"))
        .author("GSC Contributors")
        .about("Build graminized Docker images that run existing applications inside SGX enclaves")
        .subcommand_required(true)
        .subcommand(
            Command::new("build")
                .about("Graminize an application image, producing gsc-<image>-unsigned")
                .arg(Arg::new("image").required(true).help("Application Docker image"))
                .arg(
                    Arg::new("manifest")
                        .required(true)
                        .help("Application-specific enclave manifest"),
                )
                .arg(config_file_arg())
                .arg(
                    Arg::new("debug")
                        .short('d')
                        .long("debug")
                        .action(clap::ArgAction::SetTrue)
                        .help("Compile the enclave with debug logging"),
                )
                .arg(
                    Arg::new("insecure_args")
                        .long("insecure-args")
                        .action(clap::ArgAction::SetTrue)
                        .help("Allow the run-time command line to override the manifest argv"),
                )
                .arg(
                    Arg::new("no_cache")
                        .long("no-cache")
                        .action(clap::ArgAction::SetTrue)
                        .help("Build without using the Docker cache"),
                )
                .arg(
                    Arg::new("rm")
                        .long("rm")
                        .action(clap::ArgAction::SetTrue)
                        .help("Remove intermediate containers after a successful build"),
                )
                .arg(
                    Arg::new("build_arg")
                        .long("build-arg")
                        .value_name("KEY[=VALUE]")
                        .action(clap::ArgAction::Append)
                        .help("Docker build argument, taken from the environment when no value is given"),
                )
                .arg(
                    Arg::new("define")
                        .short('D')
                        .long("define")
                        .value_name("KEY=VALUE")
                        .action(clap::ArgAction::Append)
                        .help("Override a configuration or template variable"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Show the launch configuration that would be derived from an image")
                .arg(Arg::new("image").required(true).help("Application Docker image"))
                .arg(config_file_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("gsc.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
