// src/distro.rs

//! Distro families, auto-detection and build templates
//!
//! The distro identifier (e.g. `ubuntu:22.04`, `redhat/ubi9-minimal`,
//! `registry.suse.com/suse/sle15`) selects the Dockerfile template and the
//! credential-staging branch for a build. When the tool configuration says
//! `auto`, the identifier is recovered from the image itself by reading its
//! `/etc/os-release`.

use crate::docker::DockerService;
use crate::error::{Error, Result};
use regex::Regex;
use tracing::debug;

/// Distro value in the tool configuration requesting auto-detection
pub const AUTO: &str = "auto";

/// Base-image family of the application image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distro {
    Ubuntu,
    Debian,
    RedHatUbi,
    RedHatUbiMinimal,
    Suse,
}

impl Distro {
    /// Map a distro identifier to its family.
    ///
    /// Red Hat identifiers must match `redhat/ubi<N>[-minimal]`; anything
    /// else under `redhat/` is rejected as unsupported.
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        if identifier.starts_with("redhat/") {
            let caps = ubi_pattern()
                .captures(identifier)
                .ok_or_else(|| Error::InvalidDistroFormat(identifier.to_string()))?;
            if caps.get(2).is_some() {
                return Ok(Self::RedHatUbiMinimal);
            }
            return Ok(Self::RedHatUbi);
        }
        if identifier.starts_with("registry.suse.com/suse/sle") {
            return Ok(Self::Suse);
        }
        if identifier.starts_with("ubuntu") {
            return Ok(Self::Ubuntu);
        }
        if identifier.starts_with("debian") {
            return Ok(Self::Debian);
        }
        Err(Error::InvalidDistroFormat(identifier.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ubuntu => "ubuntu",
            Self::Debian => "debian",
            Self::RedHatUbi => "redhat-ubi",
            Self::RedHatUbiMinimal => "redhat-ubi-minimal",
            Self::Suse => "suse",
        }
    }

    /// Dockerfile template for this family
    pub fn dockerfile_template(&self) -> &'static str {
        match self {
            Self::Ubuntu | Self::Debian => DOCKERFILE_APT_TEMPLATE,
            Self::RedHatUbi => DOCKERFILE_DNF_TEMPLATE,
            Self::RedHatUbiMinimal => DOCKERFILE_MICRODNF_TEMPLATE,
            Self::Suse => DOCKERFILE_ZYPPER_TEMPLATE,
        }
    }
}

impl std::fmt::Display for Distro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recover the distro identifier of an image by running it with the
/// entrypoint `cat /etc/os-release`. Any failure, including an
/// unrecognized distro, reports as [`Error::DistroRetrieval`].
pub async fn detect(docker: &DockerService, image: &str) -> Result<String> {
    let output = docker
        .run_with_entrypoint(image, &["cat", "/etc/os-release"])
        .await
        .map_err(|err| {
            debug!("os-release probe of {image} failed: {err}");
            Error::DistroRetrieval
        })?;
    identifier_from_os_release(&output).ok_or(Error::DistroRetrieval)
}

/// UBI version number out of a `redhat/ubi<N>[-minimal]` identifier
pub fn ubi_version(identifier: &str) -> Result<String> {
    let caps = ubi_pattern()
        .captures(identifier)
        .ok_or_else(|| Error::InvalidDistroFormat(identifier.to_string()))?;
    Ok(caps[1].to_string())
}

fn ubi_pattern() -> Regex {
    Regex::new(r"^redhat/ubi(\d+)(-minimal)?$").unwrap()
}

/// Translate `/etc/os-release` contents into a distro identifier
pub fn identifier_from_os_release(contents: &str) -> Option<String> {
    let mut id = None;
    let mut version_id = None;
    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key.trim() {
            "ID" => id = Some(value.to_string()),
            "VERSION_ID" => version_id = Some(value.to_string()),
            _ => {}
        }
    }

    let id = id?;
    let version = version_id?;
    let major = version.split('.').next().unwrap_or(&version);
    match id.as_str() {
        "ubuntu" => Some(format!("ubuntu:{version}")),
        "debian" => Some(format!("debian:{version}")),
        "rhel" => Some(format!("redhat/ubi{major}")),
        "sles" => Some(format!("registry.suse.com/suse/sle{major}")),
        _ => None,
    }
}

/// Enclave manifest assembled from the image configuration; merged with
/// the user manifest before it reaches the build context
pub const ENTRYPOINT_MANIFEST_TEMPLATE: &str = r#"libos.entrypoint = "%(binary)s"

loader.entrypoint = "file:/usr/lib/gramine/libsysdb.so"
loader.log_level = "%(log_level)s"
loader.argv = [%(argv)s]
loader.insecure__use_cmdline_argv = %(insecure_args)s

%(env)s
fs.start_dir = "%(working_dir)s"

fs.mounts = [
    { path = "/lib", uri = "file:/lib" },
    { path = "/lib64", uri = "file:/lib64" },
    { path = "/usr", uri = "file:/usr" },
    { path = "/etc", uri = "file:/etc" },
]

sgx.debug = %(debug)s
sgx.enclave_size = "1G"
sgx.max_threads = 32
"#;

/// Launcher script staged into the image; the enclave runtime reads the
/// manifest next to the entrypoint
pub const APPLOADER_TEMPLATE: &str = r#"#!/bin/sh
set -e

exec gramine-sgx /gramine/app_files/entrypoint "$@"
"#;

const DOCKERFILE_APT_TEMPLATE: &str = r#"FROM %(image)s

RUN apt-get update \
    && apt-get install -y --no-install-recommends ca-certificates curl gnupg \
    && curl -fsSL %(gramine_repository)s/gramine-keyring.gpg \
        -o /usr/share/keyrings/gramine-keyring.gpg \
    && echo "deb [signed-by=/usr/share/keyrings/gramine-keyring.gpg] %(gramine_repository)s/ stable main" \
        > /etc/apt/sources.list.d/gramine.list \
    && apt-get update \
    && apt-get install -y --no-install-recommends gramine \
    && rm -rf /var/lib/apt/lists/*

COPY apploader.sh /gramine/apploader.sh
COPY entrypoint.manifest /gramine/app_files/entrypoint.manifest
RUN chmod 755 /gramine/apploader.sh

USER %(app_user)s
ENTRYPOINT ["/gramine/apploader.sh"]
"#;

const DOCKERFILE_DNF_TEMPLATE: &str = r#"FROM %(image)s

COPY redhat.repo /etc/yum.repos.d/redhat.repo
COPY redhat-uep.pem /etc/rhsm/ca/redhat-uep.pem
COPY pki /etc/pki

RUN dnf config-manager --add-repo %(gramine_repository)s/rpm/gramine.repo \
    && dnf install -y gramine \
    && dnf clean all

COPY apploader.sh /gramine/apploader.sh
COPY entrypoint.manifest /gramine/app_files/entrypoint.manifest
RUN chmod 755 /gramine/apploader.sh

USER %(app_user)s
ENTRYPOINT ["/gramine/apploader.sh"]
"#;

const DOCKERFILE_MICRODNF_TEMPLATE: &str = r#"FROM %(image)s

COPY redhat.repo /etc/yum.repos.d/redhat.repo
COPY redhat-uep.pem /etc/rhsm/ca/redhat-uep.pem
COPY pki /etc/pki

RUN curl -fsSL %(gramine_repository)s/rpm/gramine.repo \
        -o /etc/yum.repos.d/gramine.repo \
    && microdnf install -y gramine \
    && microdnf clean all

COPY apploader.sh /gramine/apploader.sh
COPY entrypoint.manifest /gramine/app_files/entrypoint.manifest
RUN chmod 755 /gramine/apploader.sh

USER %(app_user)s
ENTRYPOINT ["/gramine/apploader.sh"]
"#;

const DOCKERFILE_ZYPPER_TEMPLATE: &str = r#"FROM %(image)s

COPY SCCcredentials /etc/zypp/credentials.d/SCCcredentials

RUN zypper --non-interactive addrepo %(gramine_repository)s/rpm/gramine.repo gramine \
    && zypper --non-interactive --gpg-auto-import-keys refresh \
    && zypper --non-interactive install gramine \
    && zypper clean --all

COPY apploader.sh /gramine/apploader.sh
COPY entrypoint.manifest /gramine/app_files/entrypoint.manifest
RUN chmod 755 /gramine/apploader.sh

USER %(app_user)s
ENTRYPOINT ["/gramine/apploader.sh"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ubi_version_extraction() {
        assert_eq!(ubi_version("redhat/ubi9").unwrap(), "9");
        assert_eq!(ubi_version("redhat/ubi9-minimal").unwrap(), "9");
        assert_eq!(ubi_version("redhat/ubi8").unwrap(), "8");
        assert!(matches!(
            ubi_version("redhat/centos8").unwrap_err(),
            Error::InvalidDistroFormat(_)
        ));
    }

    #[test]
    fn test_from_identifier() {
        assert_eq!(
            Distro::from_identifier("ubuntu:22.04").unwrap(),
            Distro::Ubuntu
        );
        assert_eq!(Distro::from_identifier("debian:12").unwrap(), Distro::Debian);
        assert_eq!(
            Distro::from_identifier("redhat/ubi9").unwrap(),
            Distro::RedHatUbi
        );
        assert_eq!(
            Distro::from_identifier("redhat/ubi8-minimal").unwrap(),
            Distro::RedHatUbiMinimal
        );
        assert_eq!(
            Distro::from_identifier("registry.suse.com/suse/sle15").unwrap(),
            Distro::Suse
        );
    }

    #[test]
    fn test_from_identifier_rejects_unknown() {
        assert!(matches!(
            Distro::from_identifier("redhat/centos8").unwrap_err(),
            Error::InvalidDistroFormat(_)
        ));
        assert!(matches!(
            Distro::from_identifier("alpine:3.20").unwrap_err(),
            Error::InvalidDistroFormat(_)
        ));
    }

    #[test]
    fn test_identifier_from_os_release() {
        let ubuntu = "NAME=\"Ubuntu\"\nID=ubuntu\nVERSION_ID=\"22.04\"\n";
        assert_eq!(
            identifier_from_os_release(ubuntu).unwrap(),
            "ubuntu:22.04"
        );

        let rhel = "ID=\"rhel\"\nVERSION_ID=\"9.4\"\n";
        assert_eq!(identifier_from_os_release(rhel).unwrap(), "redhat/ubi9");

        let sles = "ID=sles\nVERSION_ID=\"15.5\"\n";
        assert_eq!(
            identifier_from_os_release(sles).unwrap(),
            "registry.suse.com/suse/sle15"
        );
    }

    #[test]
    fn test_identifier_from_os_release_incomplete() {
        assert!(identifier_from_os_release("NAME=Whatever\n").is_none());
        assert!(identifier_from_os_release("ID=gentoo\nVERSION_ID=2.15\n").is_none());
    }

    #[test]
    fn test_manifest_template_renders_to_valid_toml() {
        let mut ctx = crate::template::TemplateContext::new();
        ctx.set("binary", "/usr/bin/python3");
        ctx.set("argv", "\"/usr/bin/python3\", \"-u\"");
        ctx.set("log_level", "error");
        ctx.set("insecure_args", "false");
        ctx.set("debug", "false");
        ctx.set("working_dir", "/app/");
        ctx.set("env", "loader.env.MODE = \"prod\"\n");

        let rendered = ctx.render(ENTRYPOINT_MANIFEST_TEMPLATE);
        let manifest = rendered.parse::<toml::Table>().unwrap();
        assert_eq!(
            manifest["libos"].as_table().unwrap()["entrypoint"]
                .as_str()
                .unwrap(),
            "/usr/bin/python3"
        );
        let loader = manifest["loader"].as_table().unwrap();
        assert_eq!(
            loader["env"].as_table().unwrap()["MODE"].as_str().unwrap(),
            "prod"
        );
    }
}
