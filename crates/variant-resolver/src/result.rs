//! Resolution result types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Machine-readable reason a requested task contributed nothing.
///
/// None of these are errors: a run with zero variants is a legitimate no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "detail")]
pub enum ResolutionMiss {
    /// Requested task matches no recognized prefix.
    #[serde(rename = "UNSUPPORTED_TASK")]
    UnsupportedTask(String),

    /// A task named along the way does not exist in the graph.
    #[serde(rename = "LOOKUP_FAILURE")]
    LookupFailure { task: String, origin: String },

    /// The dependency walk hit the depth cap.
    #[serde(rename = "DEPTH_EXCEEDED")]
    DepthExceeded { task: String, origin: String },

    /// A recognized task never reached a manifest-merge task.
    #[serde(rename = "NO_VARIANT")]
    NoVariant(String),
}

impl ResolutionMiss {
    /// Get a machine-readable string representation.
    pub fn to_code(&self) -> String {
        match self {
            ResolutionMiss::UnsupportedTask(t) => format!("UNSUPPORTED_TASK:{}", t),
            ResolutionMiss::LookupFailure { task, origin } => {
                format!("LOOKUP_FAILURE:{}<-{}", task, origin)
            }
            ResolutionMiss::DepthExceeded { task, origin } => {
                format!("DEPTH_EXCEEDED:{}<-{}", task, origin)
            }
            ResolutionMiss::NoVariant(t) => format!("NO_VARIANT:{}", t),
        }
    }
}

/// Result of resolving one build invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    /// The invocation as received.
    pub invocation: Vec<String>,

    /// Concrete variants in scope, ordered by name.
    pub variants: BTreeSet<String>,

    /// Why individual candidates produced nothing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub misses: Vec<ResolutionMiss>,
}

impl Resolution {
    /// Whether no variant is in scope.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Whether `variant` is in scope.
    pub fn contains(&self, variant: &str) -> bool {
        self.variants.contains(variant)
    }

    /// Get misses as machine-readable strings.
    pub fn miss_codes(&self) -> Vec<String> {
        self.misses.iter().map(|m| m.to_code()).collect()
    }

    /// Serialize to JSON string with pretty formatting
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary.
    pub fn to_human(&self) -> String {
        let mut out = String::new();
        if self.variants.is_empty() {
            out.push_str("No variants in scope.\n");
        } else {
            out.push_str("Variants in scope:\n");
            for v in &self.variants {
                out.push_str(&format!("  {}\n", v));
            }
        }
        if !self.misses.is_empty() {
            out.push_str("Skipped:\n");
            for code in self.miss_codes() {
                out.push_str(&format!("  {}\n", code));
            }
        }
        out
    }
}
