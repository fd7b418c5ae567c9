//! Manifest fixup
//!
//! Build-time post-processor for application manifests: resolves which
//! variants a build invocation produces, then applies the exported and
//! minimum-SDK rules to every dependency manifest of those variants, and
//! checks the application's own manifest without modifying it.

pub mod config;
pub mod dispatch;
pub mod logging;
pub mod pipeline;
pub mod rewriter;
pub mod rules;
pub mod signal;
pub mod snapshot;

pub use config::{ConfigError, EffectiveConfig, FixupSettings};
pub use dispatch::{BatchReport, Dispatcher, FileReport, FileStatus, ManifestBatch, ManifestRole};
pub use pipeline::{Pipeline, PipelineError, RunReport};
pub use rewriter::{ManifestRewriter, PolicyViolation, RewriteError, RewriteMode, RewriteOutcome};
pub use rules::{Rule, RuleKind};
pub use signal::CancelToken;
pub use snapshot::{BuildSnapshot, SnapshotError, VariantManifests};

pub use manifest_doc;
pub use variant_resolver;
