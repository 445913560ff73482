// src/config.rs

//! Tool configuration and command-line value parsing
//!
//! The configuration file is YAML (`config.yaml` by default). Every value
//! has a default, so a missing file means "all defaults"; `--define`
//! entries overlay individual values and double as extra template
//! variables.

use crate::error::{Error, Result};
use crate::template::TemplateContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Tool configuration loaded from the YAML config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Distro identifier of the application image's base, or `auto` to
    /// detect it from the image
    pub distro: String,

    /// Where the Gramine packages come from
    pub gramine: GramineSource,
}

/// Package source for the enclave runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GramineSource {
    /// Base URL of the Gramine package repository
    pub repository: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            distro: crate::distro::AUTO.to_string(),
            gramine: GramineSource::default(),
        }
    }
}

impl Default for GramineSource {
    fn default() -> Self {
        Self {
            repository: "https://packages.gramineproject.io".to_string(),
        }
    }
}

impl BuildConfig {
    /// Load the configuration file, or fall back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No configuration file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Overlay `--define` values onto the configuration
    pub fn apply_defines(&mut self, defines: &HashMap<String, String>) {
        if let Some(distro) = defines.get("distro") {
            self.distro = distro.clone();
        }
        if let Some(repository) = defines.get("gramine.repository") {
            self.gramine.repository = repository.clone();
        }
    }

    /// Project configuration values into template variables
    pub fn populate(&self, ctx: &mut TemplateContext) {
        ctx.set("distro", self.distro.as_str());
        ctx.set("gramine_repository", self.gramine.repository.as_str());
    }
}

/// Parse `--define KEY=VALUE` entries; a bare `KEY` is a usage error
pub fn parse_define_args(items: &[String]) -> Result<HashMap<String, String>> {
    let mut defines = HashMap::new();
    for item in items {
        match item.split_once('=') {
            Some((key, value)) => {
                defines.insert(key.to_string(), value.to_string());
            }
            None => return Err(Error::InvalidDefine(item.clone())),
        }
    }
    Ok(defines)
}

/// Parse `--build-arg KEY[=VALUE]` entries; a bare `KEY` takes its value
/// from the process environment and fails when the variable is unset
pub fn parse_build_args(items: &[String]) -> Result<HashMap<String, String>> {
    let mut build_args = HashMap::new();
    for item in items {
        match item.split_once('=') {
            Some((key, value)) => {
                build_args.insert(key.to_string(), value.to_string());
            }
            None => match std::env::var(item) {
                Ok(value) => {
                    build_args.insert(item.clone(), value);
                }
                Err(_) => return Err(Error::InvalidBuildArg(item.clone())),
            },
        }
    }
    Ok(build_args)
}

/// Lenient boolean parsing for flag-valued defines: `true`/`on`/`yes`,
/// `false`/`off`/`no`, or any integer by truthiness; the empty string is
/// false
pub fn parse_trueish(value: &str) -> Result<bool> {
    if value.is_empty() {
        return Ok(false);
    }
    match value.to_lowercase().as_str() {
        "false" | "off" | "no" => Ok(false),
        "true" | "on" | "yes" => Ok(true),
        digits if digits.chars().all(|c| c.is_ascii_digit()) => {
            Ok(digits.chars().any(|c| c != '0'))
        }
        _ => Err(Error::InvalidBool(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = BuildConfig::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config.distro, "auto");
        assert_eq!(
            config.gramine.repository,
            "https://packages.gramineproject.io"
        );
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "distro: redhat/ubi9\n").unwrap();
        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.distro, "redhat/ubi9");
        assert_eq!(
            config.gramine.repository,
            "https://packages.gramineproject.io"
        );
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "distro: ubuntu:22.04\ngramine:\n  repository: https://mirror.example.com\n",
        )
        .unwrap();
        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.distro, "ubuntu:22.04");
        assert_eq!(config.gramine.repository, "https://mirror.example.com");
    }

    #[test]
    fn test_apply_defines_overrides_config() {
        let mut config = BuildConfig::default();
        let defines = HashMap::from([
            ("distro".to_string(), "debian:12".to_string()),
            ("gramine.repository".to_string(), "https://pkgs.local".to_string()),
        ]);
        config.apply_defines(&defines);
        assert_eq!(config.distro, "debian:12");
        assert_eq!(config.gramine.repository, "https://pkgs.local");
    }

    #[test]
    fn test_parse_define_args() {
        let defines =
            parse_define_args(&["a=1".to_string(), "b=x=y".to_string()]).unwrap();
        assert_eq!(defines["a"], "1");
        assert_eq!(defines["b"], "x=y");

        let err = parse_define_args(&["bare".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidDefine(_)));
    }

    #[test]
    fn test_parse_build_args_inline_value() {
        let args = parse_build_args(&["KEY=value".to_string()]).unwrap();
        assert_eq!(args["KEY"], "value");
    }

    #[test]
    fn test_parse_build_args_from_environment() {
        unsafe {
            std::env::set_var("GSC_TEST_BUILD_ARG", "from-env");
        }
        let args = parse_build_args(&["GSC_TEST_BUILD_ARG".to_string()]).unwrap();
        assert_eq!(args["GSC_TEST_BUILD_ARG"], "from-env");
        unsafe {
            std::env::remove_var("GSC_TEST_BUILD_ARG");
        }

        let err = parse_build_args(&["GSC_TEST_UNSET_ARG".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidBuildArg(_)));
    }

    #[test]
    fn test_parse_trueish() {
        assert!(!parse_trueish("").unwrap());
        assert!(!parse_trueish("false").unwrap());
        assert!(!parse_trueish("OFF").unwrap());
        assert!(!parse_trueish("no").unwrap());
        assert!(parse_trueish("true").unwrap());
        assert!(parse_trueish("On").unwrap());
        assert!(parse_trueish("yes").unwrap());
        assert!(!parse_trueish("0").unwrap());
        assert!(parse_trueish("1").unwrap());
        assert!(parse_trueish("42").unwrap());
        assert!(matches!(
            parse_trueish("maybe").unwrap_err(),
            Error::InvalidBool(_)
        ));
    }
}
