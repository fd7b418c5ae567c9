//! Host build snapshot: the task graph and per-variant manifest locations
//! exported by the build tool, read from a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use variant_resolver::TaskGraphSnapshot;
use walkdir::WalkDir;

use crate::dispatch::ManifestBatch;

/// File name searched for under `manifest_dirs`.
pub const MANIFEST_FILE_NAME: &str = "AndroidManifest.xml";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Manifest files of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantManifests {
    /// The application module's own manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_manifest: Option<PathBuf>,

    /// Dependency manifests listed explicitly.
    #[serde(default)]
    pub manifests: Vec<PathBuf>,

    /// Directories searched recursively for dependency manifests.
    #[serde(default)]
    pub manifest_dirs: Vec<PathBuf>,
}

/// Everything the pipeline needs from the host build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildSnapshot {
    /// Application project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Application minimum SDK; 0 when not configured.
    #[serde(default)]
    pub min_sdk: i64,

    #[serde(default)]
    pub tasks: TaskGraphSnapshot,

    #[serde(default)]
    pub variants: BTreeMap<String, VariantManifests>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl BuildSnapshot {
    /// Load a snapshot; relative paths resolve against its directory.
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let json = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_json(&json, base_dir)
    }

    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let mut snapshot: Self = serde_json::from_str(json)?;
        snapshot.base_dir = base_dir.into();
        Ok(snapshot)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Collect the manifests of `variant`. `None` when the snapshot does not
    /// know the variant.
    pub fn batch_for(&self, variant: &str) -> Option<ManifestBatch> {
        let manifests = self.variants.get(variant)?;

        let mut dependencies: Vec<PathBuf> = manifests
            .manifests
            .iter()
            .map(|p| self.resolve_path(p))
            .collect();
        for dir in &manifests.manifest_dirs {
            dependencies.extend(discover_manifests(&self.resolve_path(dir)));
        }

        let primary = manifests.main_manifest.as_deref().map(|p| self.resolve_path(p));
        Some(ManifestBatch::new(dependencies, primary).for_variant(variant))
    }
}

/// Every `AndroidManifest.xml` below `dir`, in walk order sorted by name.
/// A directory that does not exist yields nothing; entries that cannot be
/// read are logged and skipped.
pub fn discover_manifests(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "manifest directory does not exist");
        return Vec::new();
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE_NAME {
            found.push(entry.into_path());
        }
    }
    found
}
