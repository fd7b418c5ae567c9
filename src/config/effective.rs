//! Effective configuration with provenance
//!
//! The merged configuration plus the sources it came from, each file source
//! identified by the SHA-256 digest of its bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use variant_resolver::ResolverConfig;

use super::defaults::{BuiltinDefaults, PolicySettings};
use super::merge::merge_layers;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = ".manifest-fixup.toml";

/// Highest accepted `resolver.max_depth`.
const MAX_DEPTH_LIMIT: usize = 256;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Repo,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixupSettings {
    #[serde(default)]
    pub min_sdk: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default)]
    pub jobs: u64,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub policy: PolicySettings,
}

impl FixupSettings {
    /// Resolver configuration with the top-level `project` applied.
    pub fn resolver_config(&self) -> ResolverConfig {
        let mut resolver = self.resolver.clone();
        if resolver.project.is_none() {
            resolver.project = self.project.clone();
        }
        resolver
    }
}

/// Effective configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build from an explicit config file, or `.manifest-fixup.toml` in the
    /// working directory when it exists.
    pub fn load(explicit: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) if !path.exists() => Err(ConfigError::Missing(path.to_path_buf())),
            Some(path) => Self::build(Some(path), cli_overrides),
            None => Self::build(Some(Path::new(DEFAULT_CONFIG_FILE)), cli_overrides),
        }
    }

    /// Build from layers. A repo config path that does not exist is skipped.
    pub fn build(
        repo_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = repo_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Repo,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let config = Self {
            created_at: Utc::now(),
            config: merge_layers(layers),
            sources,
        };
        config.settings()?;
        Ok(config)
    }

    /// Load a TOML file, returning its JSON value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    /// Typed, validated settings.
    pub fn settings(&self) -> Result<FixupSettings, ConfigError> {
        let settings: FixupSettings = serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let depth = settings.resolver.max_depth;
        if depth == 0 || depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "resolver.max_depth must be in [1, {}]",
                MAX_DEPTH_LIMIT
            )));
        }
        if settings.resolver.task_prefixes.is_empty() {
            return Err(ConfigError::ValidationError(
                "resolver.task_prefixes must not be empty".to_string(),
            ));
        }
        if !settings
            .resolver
            .manifest_task_format
            .contains(variant_resolver::VARIANT_PLACEHOLDER)
        {
            return Err(ConfigError::ValidationError(
                "resolver.manifest_task_format must contain {}".to_string(),
            ));
        }
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_only() {
        let config = EffectiveConfig::build(None, None).unwrap();
        let settings = config.settings().unwrap();

        assert_eq!(settings.min_sdk, 0);
        assert_eq!(settings.jobs, 0);
        assert_eq!(settings.project, None);
        assert_eq!(settings.resolver, ResolverConfig::default());
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_repo_file_and_cli() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "min_sdk = 24").unwrap();
        writeln!(temp, "project = \"app\"").unwrap();
        writeln!(temp, "[resolver]").unwrap();
        writeln!(temp, "task_prefixes = [\"assemble\", \"bundle\"]").unwrap();
        writeln!(temp, "[policy]").unwrap();
        writeln!(temp, "fail_on_violation = true").unwrap();

        let cli = serde_json::json!({"min_sdk": 21, "jobs": 4});
        let config = EffectiveConfig::build(Some(temp.path()), Some(cli)).unwrap();
        let settings = config.settings().unwrap();

        assert_eq!(settings.min_sdk, 21);
        assert_eq!(settings.jobs, 4);
        assert_eq!(settings.resolver.task_prefixes, vec!["assemble", "bundle"]);
        assert_eq!(settings.resolver.max_depth, 16);
        assert!(settings.policy.fail_on_violation);
        assert_eq!(settings.resolver_config().project.as_deref(), Some("app"));

        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[1].origin, ConfigOrigin::Repo);
        assert_eq!(config.sources[1].digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_max_depth_bounds() {
        for depth in [0, 257] {
            let cli = serde_json::json!({"resolver": {"max_depth": depth}});
            let err = EffectiveConfig::build(None, Some(cli)).unwrap_err();
            assert!(err.to_string().contains("max_depth"));
        }
        let cli = serde_json::json!({"resolver": {"max_depth": 256}});
        assert!(EffectiveConfig::build(None, Some(cli)).is_ok());
    }

    #[test]
    fn test_bad_format_and_types() {
        let cli = serde_json::json!({"resolver": {"manifest_task_format": "processMainManifest"}});
        assert!(EffectiveConfig::build(None, Some(cli)).is_err());

        let cli = serde_json::json!({"jobs": "many"});
        assert!(matches!(
            EffectiveConfig::build(None, Some(cli)),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "min_sdk = ").unwrap();
        assert!(matches!(
            EffectiveConfig::build(Some(temp.path()), None),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = EffectiveConfig::load(Some(Path::new("/nonexistent/fixup.toml")), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_get_by_path() {
        let config = EffectiveConfig::build(None, None).unwrap();
        assert_eq!(
            config.get("resolver.manifest_task_format").and_then(|v| v.as_str()),
            Some("process{}MainManifest")
        );
        assert!(config.get("resolver.nope").is_none());
    }
}
