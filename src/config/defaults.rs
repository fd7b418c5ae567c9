//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};
use variant_resolver::ResolverConfig;

/// Policy applied to violations found in the application manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Fail the run (exit code 3) instead of only warning.
    #[serde(default)]
    pub fail_on_violation: bool,
}

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Minimum SDK floor (default: 0, take it from the build snapshot)
    pub min_sdk: i64,

    /// Worker threads (default: 0 = available parallelism)
    pub jobs: u64,

    pub resolver: ResolverConfig,

    pub policy: PolicySettings,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            min_sdk: 0,
            jobs: 0,
            resolver: ResolverConfig::default(),
            policy: PolicySettings::default(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "min_sdk": self.min_sdk,
            "jobs": self.jobs,
            "resolver": {
                "task_prefixes": self.resolver.task_prefixes,
                "manifest_task_format": self.resolver.manifest_task_format,
                "max_depth": self.resolver.max_depth
            },
            "policy": {
                "fail_on_violation": self.policy.fail_on_violation
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.min_sdk, 0);
        assert_eq!(defaults.jobs, 0);
        assert_eq!(defaults.resolver.task_prefixes, vec!["assemble".to_string()]);
        assert_eq!(defaults.resolver.max_depth, 16);
        assert!(!defaults.policy.fail_on_violation);
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["min_sdk"], 0);
        assert_eq!(value["resolver"]["manifest_task_format"], "process{}MainManifest");
        assert_eq!(value["resolver"]["task_prefixes"][0], "assemble");
        assert_eq!(value["policy"]["fail_on_violation"], false);
        assert!(value.get("project").is_none());
    }
}
