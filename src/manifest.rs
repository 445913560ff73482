// src/manifest.rs

//! Enclave manifest handling
//!
//! Manifests are TOML trees: tables, arrays and scalars. Two manifests meet
//! during a build, the user-authored one and the distro template one, and
//! are merged with deterministic conflict resolution: the user manifest
//! wins scalar conflicts, list values concatenate, and the well-known
//! search-path variables under `loader.env` concatenate with `:`. Conflicts
//! are never fatal; each resolution is reported as a warning so manifest
//! authors can see silent overrides.

use crate::error::Result;
use std::fs;
use std::path::Path;
use toml::map::Entry;
use toml::{Table, Value};
use tracing::warn;

/// Environment variables whose conflicting values are colon-joined
/// instead of overridden
const CONCAT_ENV_KEYS: &[&str] = &["LD_LIBRARY_PATH", "PATH", "LD_PRELOAD"];

/// Table path under which [`CONCAT_ENV_KEYS`] applies
const ENV_TABLE_PATH: &[&str] = &["loader", "env"];

/// Read a manifest file into a TOML table
pub fn read_manifest(path: &Path) -> Result<Table> {
    let contents = fs::read_to_string(path)?;
    Ok(contents.parse::<Table>()?)
}

/// Serialize a merged manifest into the build context
pub fn write_manifest(path: &Path, manifest: &Table) -> Result<()> {
    let rendered = toml::to_string(manifest)?;
    fs::write(path, rendered)?;
    Ok(())
}

/// Merge `secondary` into `primary` and return the combined manifest.
///
/// Walks `secondary`'s keys recursively:
/// - key absent in `primary`: copied as-is
/// - both values tables: merged recursively
/// - both values arrays: concatenated, `primary`'s elements first
/// - equal scalars: no-op
/// - differing scalars at `loader.env.{LD_LIBRARY_PATH,PATH,LD_PRELOAD}`:
///   colon-joined, `primary` first, with a warning
/// - any other conflict: `primary` wins, with a warning
///
/// `primary_name` and `secondary_name` identify the inputs in warnings.
pub fn merge(
    mut primary: Table,
    secondary: Table,
    primary_name: &str,
    secondary_name: &str,
) -> Table {
    let mut path = Vec::new();
    merge_tables(&mut primary, secondary, primary_name, secondary_name, &mut path);
    primary
}

fn merge_tables(
    primary: &mut Table,
    secondary: Table,
    primary_name: &str,
    secondary_name: &str,
    path: &mut Vec<String>,
) {
    for (key, incoming) in secondary {
        match primary.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => {
                path.push(key);
                merge_values(slot.get_mut(), incoming, primary_name, secondary_name, path);
                path.pop();
            }
        }
    }
}

fn merge_values(
    existing: &mut Value,
    incoming: Value,
    primary_name: &str,
    secondary_name: &str,
    path: &mut Vec<String>,
) {
    match (existing, incoming) {
        (Value::Table(primary), Value::Table(secondary)) => {
            merge_tables(primary, secondary, primary_name, secondary_name, path);
        }
        (Value::Array(primary), Value::Array(mut secondary)) => {
            primary.append(&mut secondary);
        }
        (existing, incoming) if *existing == incoming => {}
        (existing, incoming) => {
            let dotted = path.join(".");
            if is_concat_env_path(path) {
                warn!(
                    "Duplicate key `{dotted}`. Concatenating values from \
                     `{primary_name}` and `{secondary_name}`."
                );
                let joined = format!(
                    "{}:{}",
                    scalar_text(existing),
                    scalar_text(&incoming)
                );
                *existing = Value::String(joined);
            } else {
                warn!(
                    "Duplicate key `{dotted}`. Overriding value from \
                     `{secondary_name}` by the one in `{primary_name}`."
                );
            }
        }
    }
}

/// True for `loader.env.<K>` where `<K>` is one of the search-path keys
fn is_concat_env_path(path: &[String]) -> bool {
    let Some((key, parents)) = path.split_last() else {
        return false;
    };
    parents == ENV_TABLE_PATH && CONCAT_ENV_KEYS.contains(&key.as_str())
}

/// Scalar rendered without TOML quoting, for colon-joined concatenation
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
