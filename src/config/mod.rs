//! Layered configuration
//!
//! Three layers, later ones winning:
//! 1. Built-in defaults
//! 2. Repo config (`.manifest-fixup.toml` or `--config <path>`)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, PolicySettings};
pub use effective::{
    ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, FixupSettings, DEFAULT_CONFIG_FILE,
};
pub use merge::{deep_merge, merge_layers};
