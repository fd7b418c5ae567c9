//! Resolver configuration types.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the capitalized variant token.
pub const VARIANT_PLACEHOLDER: &str = "{}";

/// Default recognized task-name prefixes.
pub const DEFAULT_TASK_PREFIXES: &[&str] = &["assemble"];

/// Default name format of the per-variant manifest-merge task.
pub const DEFAULT_MANIFEST_TASK_FORMAT: &str = "process{}MainManifest";

/// Default cap on how deep the dependency walk may go.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Configuration for the variant resolver, derived from the effective config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Task-name prefixes that may name a packaging task (e.g. "assemble").
    #[serde(default = "default_task_prefixes")]
    pub task_prefixes: Vec<String>,

    /// Name format of the manifest-merge task; `{}` is the variant token.
    #[serde(default = "default_manifest_task_format")]
    pub manifest_task_format: String,

    /// Application project name. When set, a qualified task path must end
    /// with this project (`:app:assembleRelease`).
    #[serde(default)]
    pub project: Option<String>,

    /// Maximum dependency depth walked below a requested task.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_task_prefixes() -> Vec<String> {
    DEFAULT_TASK_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_manifest_task_format() -> String {
    DEFAULT_MANIFEST_TASK_FORMAT.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            task_prefixes: default_task_prefixes(),
            manifest_task_format: default_manifest_task_format(),
            project: None,
            max_depth: default_max_depth(),
        }
    }
}

impl ResolverConfig {
    /// Set the application project name.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the maximum dependency depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Name of the manifest-merge task for a capitalized variant token.
    pub fn manifest_task_name(&self, token: &str) -> String {
        self.manifest_task_format.replacen(VARIANT_PLACEHOLDER, token, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.task_prefixes, vec!["assemble".to_string()]);
        assert_eq!(config.manifest_task_format, "process{}MainManifest");
        assert!(config.project.is_none());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_manifest_task_name() {
        let config = ResolverConfig::default();
        assert_eq!(
            config.manifest_task_name("FreeRelease"),
            "processFreeReleaseMainManifest"
        );
    }

    #[test]
    fn test_config_deserialization_fills_defaults() {
        let config: ResolverConfig = serde_json::from_str(r#"{"project": "app"}"#).unwrap();
        assert_eq!(config.project.as_deref(), Some("app"));
        assert_eq!(config.task_prefixes, vec!["assemble".to_string()]);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }
}
