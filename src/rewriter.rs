//! Applies rules to one manifest and persists or reports the result.
//!
//! In `Enforce` mode planned changes are applied and the document is written
//! back when anything changed. In `ReportOnly` mode nothing is ever written;
//! each planned change becomes a [`PolicyViolation`].

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use manifest_doc::names::attr;
use manifest_doc::{AttributeMutation, ManifestDocument, ManifestError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::{Rule, RuleKind};

/// Whether planned changes are written or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    Enforce,
    ReportOnly,
}

/// A change a rule wanted to make to a manifest that may not be edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    pub rule: RuleKind,
    /// Tag of the offending element.
    pub element: String,
    /// `android:name` of the element, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Qualified attribute name.
    pub attribute: String,
    /// Value the rule would have set.
    pub expected: String,
    /// Value currently declared, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
}

impl PolicyViolation {
    fn from_mutation(rule: RuleKind, doc: &ManifestDocument, mutation: &AttributeMutation) -> Self {
        let component = doc
            .element(&mutation.target)
            .and_then(|e| e.android_attribute(attr::NAME))
            .map(|a| a.value().into_owned());
        Self {
            rule,
            element: mutation.element.clone(),
            component,
            attribute: mutation.name.qualified(),
            expected: mutation.value.clone(),
            found: mutation.previous.clone(),
        }
    }

    /// Human-readable description for build output.
    pub fn message(&self) -> String {
        let subject = match &self.component {
            Some(name) => format!("<{}> {}", self.element, name),
            None => format!("<{}>", self.element),
        };
        match (self.rule, &self.found) {
            (RuleKind::Exported, _) => format!(
                "{} has an intent filter but does not declare {}; add {}=\"{}\"",
                subject, self.attribute, self.attribute, self.expected
            ),
            (RuleKind::MinSdkClamp, Some(found)) => format!(
                "{} declares {}=\"{}\" above the application minimum {}",
                subject, self.attribute, found, self.expected
            ),
            (RuleKind::MinSdkClamp, None) => format!(
                "{} must declare {}=\"{}\"",
                subject, self.attribute, self.expected
            ),
        }
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Result of running the rules over one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// No rule wanted a change.
    Clean,
    /// Changes that were applied to the document, in application order.
    Rewritten(Vec<AttributeMutation>),
    /// Changes that were withheld (report-only mode).
    Violations(Vec<PolicyViolation>),
}

impl RewriteOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, RewriteOutcome::Clean)
    }
}

/// Errors from processing one manifest file.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("{} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("failed to apply changes to {}: {source}", path.display())]
    Apply {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RewriteError {
    /// The input file was absent; callers treat this as a skip.
    pub fn is_missing(&self) -> bool {
        matches!(self, RewriteError::Missing { .. })
    }
}

/// Runs a fixed list of rules over manifests in one mode.
#[derive(Debug, Clone)]
pub struct ManifestRewriter {
    rules: Vec<Rule>,
    mode: RewriteMode,
}

impl ManifestRewriter {
    pub fn new(rules: Vec<Rule>, mode: RewriteMode) -> Self {
        Self { rules, mode }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn mode(&self) -> RewriteMode {
        self.mode
    }

    /// Run every rule over `doc` in order.
    ///
    /// In enforce mode each rule sees the changes of the rules before it.
    /// In report-only mode `doc` is left untouched.
    pub fn process(&self, doc: &mut ManifestDocument) -> Result<RewriteOutcome, ManifestError> {
        match self.mode {
            RewriteMode::Enforce => {
                let mut applied = Vec::new();
                for rule in &self.rules {
                    for mutation in rule.plan(doc) {
                        if doc.apply(&mutation)? {
                            tracing::debug!(rule = %rule.kind(), change = %mutation.describe(), "applied");
                            applied.push(mutation);
                        }
                    }
                }
                if applied.is_empty() {
                    Ok(RewriteOutcome::Clean)
                } else {
                    Ok(RewriteOutcome::Rewritten(applied))
                }
            }
            RewriteMode::ReportOnly => {
                let doc: &ManifestDocument = doc;
                let violations: Vec<PolicyViolation> = self
                    .rules
                    .iter()
                    .flat_map(|rule| {
                        rule.plan(doc)
                            .iter()
                            .map(|m| PolicyViolation::from_mutation(rule.kind(), doc, m))
                            .collect::<Vec<_>>()
                    })
                    .collect();
                if violations.is_empty() {
                    Ok(RewriteOutcome::Clean)
                } else {
                    Ok(RewriteOutcome::Violations(violations))
                }
            }
        }
    }

    /// Read, process and (in enforce mode, when changed) rewrite one file.
    ///
    /// The new content is written to a sibling temporary file which is then
    /// renamed over the original, so readers see either the old or the new
    /// document.
    pub fn rewrite_file(&self, path: &Path) -> Result<RewriteOutcome, RewriteError> {
        let bytes = fs::read(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RewriteError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                RewriteError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let mut doc = ManifestDocument::from_bytes(&bytes).map_err(|source| RewriteError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let outcome = self.process(&mut doc).map_err(|source| RewriteError::Apply {
            path: path.to_path_buf(),
            source,
        })?;

        match &outcome {
            RewriteOutcome::Clean => {
                tracing::debug!(path = %path.display(), "no changes needed");
            }
            RewriteOutcome::Rewritten(mutations) => {
                write_atomic(path, doc.to_xml_string().as_bytes()).map_err(|source| {
                    RewriteError::Write {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                tracing::info!(
                    path = %path.display(),
                    changes = mutations.len(),
                    "rewrote manifest"
                );
            }
            RewriteOutcome::Violations(violations) => {
                for violation in violations {
                    tracing::warn!(path = %path.display(), "{}", violation);
                }
            }
        }

        Ok(outcome)
    }
}

/// Temporary file used while replacing `path`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` through a temp file and rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp = temp_path(path);
    let result = fs::write(&temp, contents).and_then(|()| fs::rename(&temp, path));
    if result.is_err() && temp.is_file() {
        let _ = fs::remove_file(&temp);
    }
    result
}
