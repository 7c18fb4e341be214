//! `bun.lock` reader.
//!
//! The lockfile is JSON with JavaScript-style trailing commas. After a single
//! regex repair pass the document is decoded strictly and every entry under
//! `packages` whose value is `["name@version", ...]` becomes a [`PackageRef`].

use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::model::PackageRef;

/// Errors that make the lockfile unusable. Always fatal for a run.
#[derive(Error, Debug)]
pub enum LockfileError {
    /// The file could not be read
    #[error("Failed to read lockfile '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content is not valid JSON even after trailing-comma repair
    #[error("Error parsing lockfile: {0}. The file may have syntax that's not compatible with JSON.")]
    InvalidJson(#[from] serde_json::Error),
}

fn trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"))
}

/// Removes commas that directly precede a closing `}` or `]`.
pub fn strip_trailing_commas(content: &str) -> String {
    trailing_comma().replace_all(content, "$1").into_owned()
}

/// Reads and parses the lockfile at `path`.
pub fn parse(path: &Path) -> Result<Vec<PackageRef>, LockfileError> {
    let content = std::fs::read_to_string(path).map_err(|source| LockfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content)
}

/// Parses lockfile text into package refs, in file order.
pub fn parse_str(content: &str) -> Result<Vec<PackageRef>, LockfileError> {
    let repaired = strip_trailing_commas(content);
    let document: Value = serde_json::from_str(&repaired)?;

    let Some(entries) = document.get("packages").and_then(Value::as_object) else {
        debug!("Lockfile has no packages section");
        return Ok(Vec::new());
    };

    let packages: Vec<PackageRef> = entries
        .iter()
        .filter_map(|(key, info)| {
            let spec = info.as_array()?.first()?.as_str()?;
            let parsed = split_spec(spec);
            if parsed.is_none() {
                debug!(key = key.as_str(), "Skipping entry without a version: {spec}");
            }
            parsed
        })
        .collect();

    Ok(packages)
}

/// Splits `"name@version"`, honouring scoped names like `@babel/core@7.27.4`.
pub fn split_spec(spec: &str) -> Option<PackageRef> {
    if !spec.contains('@') {
        return None;
    }

    if spec.starts_with('@') {
        let (name, version) = spec.rsplit_once('@')?;
        Some(PackageRef::new(name, version))
    } else {
        let mut parts = spec.split('@');
        let name = parts.next()?;
        let version = parts.next()?;
        Some(PackageRef::new(name, version))
    }
}
