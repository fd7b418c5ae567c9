//! Fans manifest rewriting out over a worker pool.
//!
//! Each file is one unit of work that owns its document for the whole
//! read, rewrite and write cycle. Dependency manifests run in parallel; the
//! primary manifest runs after all of them, in report-only mode.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use manifest_doc::AttributeMutation;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rewriter::{ManifestRewriter, PolicyViolation, RewriteMode, RewriteOutcome};
use crate::rules;
use crate::signal::CancelToken;

/// Manifests belonging to one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestBatch {
    /// Variant the batch was collected for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    /// Manifests contributed by dependency modules; rewritten in place.
    #[serde(default)]
    pub dependency_manifests: Vec<PathBuf>,

    /// The application module's own manifest; only checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_manifest: Option<PathBuf>,
}

impl ManifestBatch {
    pub fn new(dependency_manifests: Vec<PathBuf>, primary_manifest: Option<PathBuf>) -> Self {
        Self {
            variant: None,
            dependency_manifests,
            primary_manifest,
        }
    }

    pub fn for_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Dependency manifests with duplicates and the primary manifest removed,
    /// in first-seen order.
    pub fn unique_dependencies(&self) -> Vec<PathBuf> {
        let mut seen: HashSet<&Path> = HashSet::new();
        if let Some(primary) = &self.primary_manifest {
            seen.insert(primary.as_path());
        }
        self.dependency_manifests
            .iter()
            .filter(|p| seen.insert(p.as_path()))
            .cloned()
            .collect()
    }
}

/// Which side of the build a manifest came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestRole {
    Dependency,
    Primary,
}

/// Final state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unchanged,
    Rewritten,
    Violations,
    Skipped,
    Failed,
    Cancelled,
}

/// Outcome of one unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub role: ManifestRole,
    pub status: FileStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutations: Vec<AttributeMutation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<PolicyViolation>,

    /// Error or skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileReport {
    fn new(path: &Path, role: ManifestRole, status: FileStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            role,
            status,
            mutations: Vec::new(),
            violations: Vec::new(),
            message: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Per-variant summary of a dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub files: Vec<FileReport>,
    pub rewritten: usize,
    pub unchanged: usize,
    pub violations: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub duration_ms: u64,
}

impl BatchReport {
    fn from_files(variant: Option<String>, files: Vec<FileReport>, duration_ms: u64) -> Self {
        let mut report = Self {
            variant,
            duration_ms,
            ..Self::default()
        };
        for file in &files {
            match file.status {
                FileStatus::Rewritten => report.rewritten += 1,
                FileStatus::Unchanged => report.unchanged += 1,
                FileStatus::Violations => report.violations += 1,
                FileStatus::Skipped => report.skipped += 1,
                FileStatus::Failed => report.failed += 1,
                FileStatus::Cancelled => report.cancelled += 1,
            }
        }
        report.files = files;
        report
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn has_violations(&self) -> bool {
        self.violations > 0
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }

    /// Every policy violation in the batch with the file it was found in.
    pub fn violations(&self) -> impl Iterator<Item = (&Path, &PolicyViolation)> {
        self.files
            .iter()
            .flat_map(|f| f.violations.iter().map(move |v| (f.path.as_path(), v)))
    }

    /// Report for a given path, if it was part of the batch.
    pub fn file(&self, path: &Path) -> Option<&FileReport> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One-line summary.
    pub fn human_summary(&self) -> String {
        let mut parts = vec![
            format!("{} rewritten", self.rewritten),
            format!("{} unchanged", self.unchanged),
        ];
        for (count, label) in [
            (self.violations, "with violations"),
            (self.skipped, "skipped"),
            (self.failed, "failed"),
            (self.cancelled, "cancelled"),
        ] {
            if count > 0 {
                parts.push(format!("{} {}", count, label));
            }
        }
        let prefix = match &self.variant {
            Some(v) => format!("{}: ", v),
            None => String::new(),
        };
        format!("{}{} file(s): {}", prefix, self.files.len(), parts.join(", "))
    }

    /// Multi-line listing of files that need attention.
    pub fn to_human(&self) -> String {
        let mut out = self.human_summary();
        for file in &self.files {
            match file.status {
                FileStatus::Rewritten => {
                    out.push_str(&format!("\n  rewritten  {}", file.path.display()));
                    for m in &file.mutations {
                        out.push_str(&format!("\n             {}", m.describe()));
                    }
                }
                FileStatus::Violations => {
                    out.push_str(&format!("\n  violation  {}", file.path.display()));
                    for v in &file.violations {
                        out.push_str(&format!("\n             {}", v));
                    }
                }
                FileStatus::Failed => {
                    out.push_str(&format!(
                        "\n  failed     {}: {}",
                        file.path.display(),
                        file.message.as_deref().unwrap_or("unknown error")
                    ));
                }
                FileStatus::Skipped => {
                    out.push_str(&format!("\n  skipped    {}", file.path.display()));
                }
                FileStatus::Unchanged | FileStatus::Cancelled => {}
            }
        }
        out
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Runs manifest batches on a dedicated thread pool.
pub struct Dispatcher {
    pool: rayon::ThreadPool,
    dependency: ManifestRewriter,
    primary: ManifestRewriter,
    cancel: CancelToken,
}

impl Dispatcher {
    /// Dispatcher with the standard rule sets for the given minimum SDK floor.
    /// `jobs == 0` uses the available parallelism.
    pub fn new(jobs: usize, min_sdk_floor: i64, cancel: CancelToken) -> Result<Self, DispatchError> {
        Self::with_rewriters(
            jobs,
            ManifestRewriter::new(rules::dependency_rules(min_sdk_floor), RewriteMode::Enforce),
            ManifestRewriter::new(rules::primary_rules(), RewriteMode::ReportOnly),
            cancel,
        )
    }

    pub fn with_rewriters(
        jobs: usize,
        dependency: ManifestRewriter,
        primary: ManifestRewriter,
        cancel: CancelToken,
    ) -> Result<Self, DispatchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("manifest-fixup-{}", i))
            .build()?;
        Ok(Self {
            pool,
            dependency,
            primary,
            cancel,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Process every manifest in `batch`. Never fails as a whole; per-file
    /// problems are recorded in the report.
    pub fn dispatch(&self, batch: &ManifestBatch) -> BatchReport {
        let started = Instant::now();
        let dependencies = batch.unique_dependencies();
        tracing::info!(
            variant = batch.variant.as_deref().unwrap_or("-"),
            files = dependencies.len(),
            threads = self.threads(),
            "processing dependency manifests"
        );

        let mut files: Vec<FileReport> = self.pool.install(|| {
            dependencies
                .par_iter()
                .map(|path| self.run_unit(path, ManifestRole::Dependency))
                .collect()
        });

        if let Some(primary) = &batch.primary_manifest {
            files.push(self.run_unit(primary, ManifestRole::Primary));
        }

        let report = BatchReport::from_files(
            batch.variant.clone(),
            files,
            started.elapsed().as_millis() as u64,
        );
        tracing::info!("{}", report.human_summary());
        report
    }

    fn run_unit(&self, path: &Path, role: ManifestRole) -> FileReport {
        if self.cancel.is_cancelled() {
            return FileReport::new(path, role, FileStatus::Cancelled);
        }
        let rewriter = match role {
            ManifestRole::Dependency => &self.dependency,
            ManifestRole::Primary => &self.primary,
        };

        match rewriter.rewrite_file(path) {
            Ok(RewriteOutcome::Clean) => FileReport::new(path, role, FileStatus::Unchanged),
            Ok(RewriteOutcome::Rewritten(mutations)) => FileReport {
                mutations,
                ..FileReport::new(path, role, FileStatus::Rewritten)
            },
            Ok(RewriteOutcome::Violations(violations)) => FileReport {
                violations,
                ..FileReport::new(path, role, FileStatus::Violations)
            },
            Err(err) if err.is_missing() => {
                tracing::info!(path = %path.display(), "skipped, does not exist");
                FileReport::new(path, role, FileStatus::Skipped).with_message("does not exist")
            }
            Err(err) => {
                tracing::warn!(error = %err, "manifest left unchanged");
                FileReport::new(path, role, FileStatus::Failed).with_message(err.to_string())
            }
        }
    }
}
