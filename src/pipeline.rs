//! End-to-end run: resolve the variants of an invocation, collect their
//! manifests from the build snapshot and dispatch one batch per variant.
//!
//! Variants are processed one after another, so a manifest shared by two
//! variants is never written by two units at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use variant_resolver::{Resolution, Resolver, ResolverError};

use crate::config::{ConfigError, FixupSettings, PolicySettings};
use crate::dispatch::{BatchReport, DispatchError, Dispatcher, ManifestBatch};
use crate::signal::{CancelToken, EXIT_CODE_CANCELLED};
use crate::snapshot::{BuildSnapshot, SnapshotError};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} manifest(s) could not be processed")]
    FilesFailed(usize),

    #[error("{0} policy violation(s) in the application manifest")]
    Violations(usize),

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_)
            | PipelineError::Snapshot(_)
            | PipelineError::Resolver(_)
            | PipelineError::Dispatch(_)
            | PipelineError::Serialization(_) => 1,
            PipelineError::FilesFailed(_) => 2,
            PipelineError::Violations(_) => 3,
            PipelineError::Cancelled => EXIT_CODE_CANCELLED,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything one run did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub created_at: DateTime<Utc>,

    /// Floor the clamp rule ran with; 0 when disabled.
    pub min_sdk: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// Resolved variants the snapshot has no manifests for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_variants: Vec<String>,

    pub batches: Vec<BatchReport>,
}

impl RunReport {
    fn new(min_sdk: i64) -> Self {
        Self {
            created_at: Utc::now(),
            min_sdk,
            resolution: None,
            unknown_variants: Vec::new(),
            batches: Vec::new(),
        }
    }

    pub fn failed(&self) -> usize {
        self.batches.iter().map(|b| b.failed).sum()
    }

    pub fn violations(&self) -> usize {
        self.batches.iter().map(|b| b.violations().count()).sum()
    }

    pub fn rewritten(&self) -> usize {
        self.batches.iter().map(|b| b.rewritten).sum()
    }

    pub fn was_cancelled(&self) -> bool {
        self.batches.iter().any(BatchReport::was_cancelled)
    }

    /// Turn the report into the run's verdict under `policy`.
    pub fn verdict(&self, policy: &PolicySettings) -> PipelineResult<()> {
        if self.was_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let failed = self.failed();
        if failed > 0 {
            return Err(PipelineError::FilesFailed(failed));
        }
        let violations = self.violations();
        if violations > 0 && policy.fail_on_violation {
            return Err(PipelineError::Violations(violations));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(resolution) = &self.resolution {
            lines.push(resolution.to_human());
        }
        for variant in &self.unknown_variants {
            lines.push(format!("variant {} has no manifests in the snapshot", variant));
        }
        for batch in &self.batches {
            lines.push(batch.to_human());
        }
        if self.batches.is_empty() {
            lines.push("nothing to do".to_string());
        }
        lines.join("\n")
    }
}

/// Runs resolution and rewriting with one set of settings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: FixupSettings,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(settings: FixupSettings, cancel: CancelToken) -> Self {
        Self { settings, cancel }
    }

    pub fn settings(&self) -> &FixupSettings {
        &self.settings
    }

    /// Floor for the clamp rule: the configured value, else the snapshot's.
    pub fn min_sdk_floor(&self, snapshot: Option<&BuildSnapshot>) -> i64 {
        if self.settings.min_sdk != 0 {
            return self.settings.min_sdk;
        }
        snapshot.map(|s| s.min_sdk).unwrap_or(0)
    }

    fn resolver(&self, snapshot: &BuildSnapshot) -> PipelineResult<Resolver> {
        let mut config = self.settings.resolver_config();
        if config.project.is_none() {
            config.project = snapshot.project.clone();
        }
        Ok(Resolver::new(config)?)
    }

    fn dispatcher(&self, min_sdk: i64) -> PipelineResult<Dispatcher> {
        Ok(Dispatcher::new(
            self.settings.jobs as usize,
            min_sdk,
            self.cancel.clone(),
        )?)
    }

    /// Resolve the variants `invocation` builds.
    pub fn resolve(&self, invocation: &[String], snapshot: &BuildSnapshot) -> PipelineResult<Resolution> {
        let resolution = self.resolver(snapshot)?.resolve(invocation, &snapshot.tasks);
        for miss in &resolution.misses {
            tracing::warn!(code = %miss.to_code(), "variant resolution miss");
        }
        if resolution.is_empty() {
            tracing::info!("no variants in scope");
        } else {
            tracing::info!(variants = ?resolution.variants, "resolved variants");
        }
        Ok(resolution)
    }

    /// Resolve, then rewrite the manifests of every resolved variant.
    pub fn run(&self, invocation: &[String], snapshot: &BuildSnapshot) -> PipelineResult<RunReport> {
        let resolution = self.resolve(invocation, snapshot)?;
        let min_sdk = self.min_sdk_floor(Some(snapshot));
        let mut report = RunReport::new(min_sdk);

        if !resolution.is_empty() {
            let dispatcher = self.dispatcher(min_sdk)?;
            for variant in &resolution.variants {
                match snapshot.batch_for(variant) {
                    Some(batch) => report.batches.push(dispatcher.dispatch(&batch)),
                    None => {
                        tracing::warn!(variant = %variant, "variant not found in build snapshot, skipped");
                        report.unknown_variants.push(variant.clone());
                    }
                }
            }
        }

        report.resolution = Some(resolution);
        Ok(report)
    }

    /// Rewrite one explicit batch, without resolution.
    pub fn rewrite(&self, batch: &ManifestBatch) -> PipelineResult<RunReport> {
        let min_sdk = self.min_sdk_floor(None);
        let mut report = RunReport::new(min_sdk);
        report.batches.push(self.dispatcher(min_sdk)?.dispatch(batch));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectiveConfig;

    fn settings() -> FixupSettings {
        EffectiveConfig::build(None, None).unwrap().settings().unwrap()
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(PipelineError::Cancelled.exit_code(), 80);
        assert_eq!(PipelineError::FilesFailed(1).exit_code(), 2);
        assert_eq!(PipelineError::Violations(1).exit_code(), 3);
        assert_eq!(
            PipelineError::Config(ConfigError::ValidationError("x".into())).exit_code(),
            1
        );
    }

    #[test]
    fn test_min_sdk_floor_falls_back_to_snapshot() {
        let snapshot = BuildSnapshot {
            min_sdk: 23,
            ..BuildSnapshot::default()
        };
        let pipeline = Pipeline::new(settings(), CancelToken::new());
        assert_eq!(pipeline.min_sdk_floor(Some(&snapshot)), 23);
        assert_eq!(pipeline.min_sdk_floor(None), 0);

        let configured = FixupSettings {
            min_sdk: 21,
            ..settings()
        };
        let pipeline = Pipeline::new(configured, CancelToken::new());
        assert_eq!(pipeline.min_sdk_floor(Some(&snapshot)), 21);
    }

    #[test]
    fn test_empty_invocation_is_a_noop() {
        let pipeline = Pipeline::new(settings(), CancelToken::new());
        let report = pipeline.run(&[], &BuildSnapshot::default()).unwrap();
        assert!(report.batches.is_empty());
        assert!(report.verdict(&PolicySettings::default()).is_ok());
        assert!(report.to_human().ends_with("nothing to do"));
    }

    #[test]
    fn test_verdict_precedence() {
        let mut report = RunReport::new(0);
        report.batches.push(BatchReport {
            failed: 1,
            cancelled: 1,
            ..BatchReport::default()
        });
        assert!(matches!(
            report.verdict(&PolicySettings::default()),
            Err(PipelineError::Cancelled)
        ));

        report.batches[0].cancelled = 0;
        assert!(matches!(
            report.verdict(&PolicySettings::default()),
            Err(PipelineError::FilesFailed(1))
        ));
    }
}
