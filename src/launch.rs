// src/launch.rs

//! Launch-parameter synthesis from an image configuration
//!
//! A Docker image describes how to start the application via `Entrypoint`,
//! `Cmd`, `WorkingDir`, `Env` and `User`. The enclave loader needs the same
//! information in a different shape: one binary path, its fixed arguments,
//! the overridable command tail, and `loader.env.*` manifest lines. This
//! module derives that shape once and packages it as an immutable
//! [`LaunchSpec`] handed to the templating pass.

use crate::docker::ImageConfig;
use crate::error::{Error, Result};
use crate::template::TemplateContext;
use tracing::warn;

/// The binary the enclave will launch, split into its fixed and
/// overridable argument parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDescriptor {
    /// Path of the executable, absolute whenever it can be resolved
    pub binary: String,
    /// Arguments fixed by the image's entrypoint (never overridable)
    pub binary_arguments: Vec<String>,
    /// Trailing arguments contributed by the image's command; a runtime
    /// command line may replace these
    pub cmd_remainder: Vec<String>,
    /// Working directory, always ending in `/`
    pub working_dir: String,
}

impl BinaryDescriptor {
    /// Derive the descriptor from an image configuration.
    ///
    /// The entrypoint and command are concatenated (entrypoint first);
    /// an image defining neither cannot be graminized and fails with
    /// [`Error::NoEntrypoint`]. A multi-element entrypoint fixes its
    /// elements after the first as binary arguments, and the first command
    /// element is skipped because it may repeat the binary itself; a
    /// single-element entrypoint contributes no fixed arguments and the
    /// whole command becomes the overridable remainder.
    pub fn derive(config: &ImageConfig) -> Result<Self> {
        let working_dir = canonical_working_dir(&config.working_dir);

        let fixed_count = config.entrypoint.len();
        let mut merged = config.entrypoint.clone();
        merged.extend(config.cmd.iter().cloned());
        if merged.is_empty() {
            return Err(Error::NoEntrypoint);
        }

        let mut binary = merged[0].clone();
        if !binary.starts_with('/') && binary.contains('/') {
            // Relative path such as `./my_app` or `some_dir/my_app`:
            // anchor it at the working directory. Bare command names stay
            // untouched for PATH lookup inside the enclave.
            let relative = binary.strip_prefix("./").unwrap_or(&binary).to_string();
            binary = format!("{working_dir}{relative}");
        }

        let (binary_arguments, boundary) = if fixed_count > 1 {
            (merged[1..fixed_count].to_vec(), fixed_count)
        } else {
            (Vec::new(), 0)
        };

        let cmd_remainder = if merged.len() > boundary + 1 {
            merged[boundary + 1..].to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            binary,
            binary_arguments,
            cmd_remainder,
            working_dir,
        })
    }

    /// Last path component of the binary
    pub fn binary_basename(&self) -> &str {
        self.binary.rsplit('/').next().unwrap_or(&self.binary)
    }

    /// Full launch argument vector: binary, fixed arguments, remainder
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(1 + self.binary_arguments.len() + self.cmd_remainder.len());
        argv.push(self.binary.clone());
        argv.extend(self.binary_arguments.iter().cloned());
        argv.extend(self.cmd_remainder.iter().cloned());
        argv
    }
}

/// Everything the templating pass needs about the application image,
/// assembled once and passed by value
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub descriptor: BinaryDescriptor,
    /// Rendered `loader.env.KEY = "VALUE"` manifest lines
    pub env_block: String,
    /// User the containerized application runs as
    pub user: String,
    /// Compile the enclave with debug logging
    pub debug: bool,
    /// Allow the run-time command line to override the manifest argv
    pub insecure_args: bool,
}

impl LaunchSpec {
    pub fn assemble(config: &ImageConfig, debug: bool, insecure_args: bool) -> Result<Self> {
        Ok(Self {
            descriptor: BinaryDescriptor::derive(config)?,
            env_block: environment_block(config),
            user: app_user(config),
            debug,
            insecure_args,
        })
    }

    /// Project the launch parameters into template variables
    pub fn populate(&self, ctx: &mut TemplateContext) {
        ctx.set("binary", self.descriptor.binary.as_str());
        ctx.set("binary_basename", self.descriptor.binary_basename());
        ctx.set("binary_arguments", self.descriptor.binary_arguments.join(" "));
        ctx.set("cmd", self.descriptor.cmd_remainder.join(" "));
        ctx.set("argv", toml_string_array(&self.descriptor.argv()));
        ctx.set("working_dir", self.descriptor.working_dir.as_str());
        ctx.set("app_user", self.user.as_str());
        ctx.set("env", self.env_block.as_str());
        ctx.set("log_level", if self.debug { "debug" } else { "error" });
        ctx.set("debug", bool_str(self.debug));
        ctx.set("insecure_args", bool_str(self.insecure_args));
    }
}

/// Render the image environment as `loader.env.KEY = "VALUE"` lines.
///
/// Values containing newlines cannot be represented in the manifest's
/// single-line strings; those entries are skipped with a warning and the
/// remaining variables are still emitted. Duplicate keys are preserved in
/// original order; collision policy belongs to the manifest merge.
pub fn environment_block(config: &ImageConfig) -> String {
    let mut block = String::new();
    for entry in &config.env {
        if entry.contains('\n') {
            let name = entry.split('=').next().unwrap_or(entry);
            warn!("Skipping environment variable `{name}`: its value contains newlines.");
            continue;
        }
        let escaped = escape_toml(entry);
        match escaped.split_once('=') {
            Some((name, value)) => {
                block.push_str(&format!("loader.env.{name} = \"{value}\"\n"));
            }
            None => {
                warn!("Skipping malformed environment entry `{entry}`.");
            }
        }
    }
    block
}

/// User the application runs as, defaulting to `root` when the image
/// leaves it unset
pub fn app_user(config: &ImageConfig) -> String {
    if config.user.is_empty() {
        "root".to_string()
    } else {
        config.user.clone()
    }
}

/// Escape backslashes and double quotes for embedding in a TOML
/// basic string; nothing else is touched
pub fn escape_toml(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render a list of strings as the inside of a TOML array literal
fn toml_string_array(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", escape_toml(item)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn canonical_working_dir(working_dir: &str) -> String {
    if working_dir.is_empty() {
        "/".to_string()
    } else if working_dir.ends_with('/') {
        working_dir.to_string()
    } else {
        format!("{working_dir}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entrypoint: &[&str], cmd: &[&str], working_dir: &str) -> ImageConfig {
        ImageConfig {
            entrypoint: entrypoint.iter().map(|s| s.to_string()).collect(),
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
            working_dir: working_dir.to_string(),
            env: Vec::new(),
            user: String::new(),
        }
    }

    #[test]
    fn test_entrypoint_only() {
        let desc = BinaryDescriptor::derive(&config(&["/bin/app", "-a", "-b"], &[], "")).unwrap();
        assert_eq!(desc.binary, "/bin/app");
        assert_eq!(desc.binary_arguments, vec!["-a", "-b"]);
        assert!(desc.cmd_remainder.is_empty());
    }

    #[test]
    fn test_cmd_only() {
        let desc = BinaryDescriptor::derive(&config(&[], &["/bin/app", "-a", "-b"], "")).unwrap();
        assert_eq!(desc.binary, "/bin/app");
        assert!(desc.binary_arguments.is_empty());
        assert_eq!(desc.cmd_remainder, vec!["-a", "-b"]);
    }

    #[test]
    fn test_single_entrypoint_with_cmd() {
        // A one-element entrypoint fixes no arguments; the whole command
        // stays overridable.
        let desc = BinaryDescriptor::derive(&config(&["/bin/app"], &["-a", "-b"], "")).unwrap();
        assert_eq!(desc.binary, "/bin/app");
        assert!(desc.binary_arguments.is_empty());
        assert_eq!(desc.cmd_remainder, vec!["-a", "-b"]);
    }

    #[test]
    fn test_multi_entrypoint_skips_first_cmd_element() {
        let desc = BinaryDescriptor::derive(&config(
            &["/bin/wrapper", "--fixed"],
            &["/bin/wrapper", "-x", "-y"],
            "",
        ))
        .unwrap();
        assert_eq!(desc.binary, "/bin/wrapper");
        assert_eq!(desc.binary_arguments, vec!["--fixed"]);
        assert_eq!(desc.cmd_remainder, vec!["-x", "-y"]);
    }

    #[test]
    fn test_empty_entrypoint_and_cmd_fails() {
        let err = BinaryDescriptor::derive(&config(&[], &[], "")).unwrap_err();
        assert!(matches!(err, Error::NoEntrypoint));
    }

    #[test]
    fn test_relative_binary_resolved_against_working_dir() {
        let desc = BinaryDescriptor::derive(&config(&["./app"], &[], "")).unwrap();
        assert_eq!(desc.binary, "/app");

        let desc = BinaryDescriptor::derive(&config(&["some_dir/my_app"], &[], "/srv")).unwrap();
        assert_eq!(desc.binary, "/srv/some_dir/my_app");
    }

    #[test]
    fn test_bare_and_absolute_binaries_untouched() {
        let desc = BinaryDescriptor::derive(&config(&["app"], &[], "/srv")).unwrap();
        assert_eq!(desc.binary, "app");

        let desc = BinaryDescriptor::derive(&config(&["/usr/bin/app"], &[], "/srv")).unwrap();
        assert_eq!(desc.binary, "/usr/bin/app");
    }

    #[test]
    fn test_working_dir_canonicalization() {
        assert_eq!(canonical_working_dir(""), "/");
        assert_eq!(canonical_working_dir("/srv"), "/srv/");
        assert_eq!(canonical_working_dir("/srv/"), "/srv/");
    }

    #[test]
    fn test_environment_block_escaping() {
        let mut cfg = config(&["/bin/app"], &[], "");
        cfg.env = vec![
            r#"QUOTED=say "hi""#.to_string(),
            r"SLASH=C:\path".to_string(),
        ];
        let block = environment_block(&cfg);
        assert_eq!(
            block,
            "loader.env.QUOTED = \"say \\\"hi\\\"\"\nloader.env.SLASH = \"C:\\\\path\"\n"
        );
    }

    #[test]
    fn test_environment_block_skips_newline_values() {
        let mut cfg = config(&["/bin/app"], &[], "");
        cfg.env = vec![
            "GOOD=1".to_string(),
            "BAD=line1\nline2".to_string(),
            "ALSO_GOOD=2".to_string(),
        ];
        let block = environment_block(&cfg);
        assert_eq!(
            block,
            "loader.env.GOOD = \"1\"\nloader.env.ALSO_GOOD = \"2\"\n"
        );
    }

    #[test]
    fn test_environment_block_keeps_duplicates_in_order() {
        let mut cfg = config(&["/bin/app"], &[], "");
        cfg.env = vec!["PATH=/a".to_string(), "PATH=/b".to_string()];
        let block = environment_block(&cfg);
        assert_eq!(block, "loader.env.PATH = \"/a\"\nloader.env.PATH = \"/b\"\n");
    }

    #[test]
    fn test_app_user_defaults_to_root() {
        let cfg = config(&["/bin/app"], &[], "");
        assert_eq!(app_user(&cfg), "root");

        let mut cfg = config(&["/bin/app"], &[], "");
        cfg.user = "daemon".to_string();
        assert_eq!(app_user(&cfg), "daemon");
    }

    #[test]
    fn test_launch_spec_populates_context() {
        let mut cfg = config(&["/bin/app", "-f"], &["--serve"], "/srv");
        cfg.env = vec!["MODE=prod".to_string()];
        cfg.user = "svc".to_string();

        let spec = LaunchSpec::assemble(&cfg, true, false).unwrap();
        let mut ctx = TemplateContext::new();
        spec.populate(&mut ctx);

        assert_eq!(ctx.get("binary"), Some("/bin/app"));
        assert_eq!(ctx.get("binary_basename"), Some("app"));
        assert_eq!(ctx.get("binary_arguments"), Some("-f"));
        assert_eq!(ctx.get("argv"), Some(r#""/bin/app", "-f""#));
        assert_eq!(ctx.get("working_dir"), Some("/srv/"));
        assert_eq!(ctx.get("app_user"), Some("svc"));
        assert_eq!(ctx.get("log_level"), Some("debug"));
        assert_eq!(ctx.get("insecure_args"), Some("false"));
        assert_eq!(ctx.get("env"), Some("loader.env.MODE = \"prod\"\n"));
    }
}
