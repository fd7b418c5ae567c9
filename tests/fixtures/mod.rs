//! Shared fixtures for integration tests
//!
//! - Manifest corpus (`manifests/*.xml` plus expectations in `corpus.json`)
//! - Scratch project trees built in a temp directory

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Directory holding the manifest corpus
pub fn manifests_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/manifests")
}

/// Contents of one corpus manifest
pub fn manifest(name: &str) -> String {
    fs::read_to_string(manifests_path().join(name))
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", name, e))
}

/// One corpus entry
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ManifestCase {
    pub file: String,
    pub floor: i64,
    /// `android:name` of every component that gains `exported`
    pub exported_added: Vec<String>,
    /// `minSdkVersion` after one enforce pass, if the file declares one
    pub min_sdk_after: Option<String>,
}

/// Full manifest corpus
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ManifestCorpus {
    pub schema_version: u32,
    pub description: String,
    pub cases: Vec<ManifestCase>,
}

impl ManifestCorpus {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(manifests_path().join("corpus.json"))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A manifest that needs `android:exported` added to one receiver.
pub const NEEDS_EXPORTED: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android">
    <uses-sdk android:minSdkVersion="28" />
    <application>
        <receiver android:name=".Boot">
            <intent-filter>
                <action android:name="android.intent.action.BOOT_COMPLETED" />
            </intent-filter>
        </receiver>
    </application>
</manifest>
"#;

/// Scratch project directory
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `contents` at `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).expect("read fixture")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_corpus_loads() {
        let corpus = ManifestCorpus::load().expect("Failed to load corpus");
        assert_eq!(corpus.schema_version, 1);
        for case in &corpus.cases {
            assert!(manifests_path().join(&case.file).exists(), "{}", case.file);
        }
    }

    #[test]
    fn test_workspace_write_and_read() {
        let ws = Workspace::new();
        ws.write("a/b/AndroidManifest.xml", "<manifest/>");
        assert_eq!(ws.read("a/b/AndroidManifest.xml"), "<manifest/>");
    }
}
