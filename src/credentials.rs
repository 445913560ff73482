// src/credentials.rs

//! Package-repository credential staging
//!
//! Building a graminized Red Hat or SUSE image needs live package-repo
//! access during the Docker build, which requires the host's subscription
//! data inside the build context. Each branch is keyed on a distro
//! identifier prefix and is a no-op, with no file I/O, when the prefix does
//! not match. The host paths are parameters so tests can point them at
//! fixtures instead of the real subscription files.

use crate::distro::ubi_version;
use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Host-side locations of subscription data
#[derive(Debug, Clone)]
pub struct HostPaths {
    /// Red Hat Subscription-Manager repository definitions
    pub redhat_repo: PathBuf,
    /// SUSE Customer Center credentials
    pub scc_credentials: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            redhat_repo: PathBuf::from("/etc/yum.repos.d/redhat.repo"),
            scc_credentials: PathBuf::from("/etc/zypp/credentials.d/SCCcredentials"),
        }
    }
}

/// Stage Red Hat entitlement data into the build context.
///
/// No-op unless the distro identifier starts with `redhat/`. Requires the
/// host to be subscribed: the BaseOS repo for the UBI version must appear
/// in the repo file, and the repo file must name the SSL client key and CA
/// certificate. Copies the repo file, the CA certificate (as
/// `redhat-uep.pem`, used to validate the Red Hat Update Engine Proxy) and
/// the entitlement key directory tree (as `pki/entitlement`, replacing any
/// previous staging).
pub fn stage_redhat(distro_id: &str, host: &HostPaths, build_path: &Path) -> Result<()> {
    if !distro_id.starts_with("redhat/") {
        return Ok(());
    }

    let version = ubi_version(distro_id)?;
    let repo_name = format!("rhel-{version}-for-x86_64-baseos-rpms");

    let repo_contents = fs::read_to_string(&host.redhat_repo)?;
    if !repo_contents.contains(&repo_name) {
        return Err(Error::MissingSubscription(format!(
            "cannot find {repo_name} in {}",
            host.redhat_repo.display()
        )));
    }

    info!("Staging Red Hat entitlement data for {distro_id}");
    fs::copy(&host.redhat_repo, build_path.join("redhat.repo"))?;

    let client_key_path = repo_value(&repo_contents, "sslclientkey").ok_or_else(|| {
        Error::MissingSubscription(format!(
            "cannot find SSL client key path in {}",
            host.redhat_repo.display()
        ))
    })?;
    let ca_cert_path = repo_value(&repo_contents, "sslcacert").ok_or_else(|| {
        Error::MissingSubscription(format!(
            "cannot find SSL CA certificate path in {}",
            host.redhat_repo.display()
        ))
    })?;

    fs::copy(&ca_cert_path, build_path.join("redhat-uep.pem"))?;

    let entitlement_dir = Path::new(&client_key_path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let staged_pki = build_path.join("pki");
    if staged_pki.exists() {
        fs::remove_dir_all(&staged_pki)?;
    }
    copy_tree(&entitlement_dir, &staged_pki.join("entitlement"))?;

    Ok(())
}

/// Stage the SUSE Customer Center credentials file into the build context.
///
/// No-op unless the distro identifier starts with
/// `registry.suse.com/suse/sle`.
pub fn stage_suse(distro_id: &str, host: &HostPaths, build_path: &Path) -> Result<()> {
    if !distro_id.starts_with("registry.suse.com/suse/sle") {
        return Ok(());
    }

    if !host.scc_credentials.exists() {
        return Err(Error::MissingSccCredentials(host.scc_credentials.clone()));
    }

    info!("Staging SUSE Customer Center credentials for {distro_id}");
    fs::copy(&host.scc_credentials, build_path.join("SCCcredentials"))?;
    Ok(())
}

/// First un-commented `name = value` assignment in repo-file contents
fn repo_value(contents: &str, name: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r"(?m)^\s*{name}\s*=\s*(.*)$")).unwrap();
    pattern
        .captures(contents)
        .map(|caps| caps[1].trim().to_string())
}

fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let destination = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}
