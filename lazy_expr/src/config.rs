//! Builder configuration
//!
//! Settings that affect how trees are constructed, loadable from TOML:
//!
//! ```toml
//! uid_prefix = "__uid"
//! diagnostics = false
//! dedup_threshold = 5
//! ```

use std::env;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExprError, ExprResult};

/// Environment variable naming a TOML file read by `BuilderConfig::from_env`
pub const CONFIG_ENV_VAR: &str = "LAZY_EXPR_CONFIG";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Construction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    /// Prefix of minted bound-variable names
    pub uid_prefix: String,
    /// Enable the diagnostics collector on the constructing thread
    pub diagnostics: bool,
    /// Number of reads from one struct source at which `InsertFields`
    /// binds that source once
    pub dedup_threshold: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            uid_prefix: "__uid".to_string(),
            diagnostics: false,
            dedup_threshold: 5,
        }
    }
}

impl BuilderConfig {
    /// Parse from TOML text; absent keys take their defaults
    pub fn from_toml_str(text: &str) -> ExprResult<Self> {
        let parsed: BuilderConfig =
            toml::from_str(text).map_err(|e| ExprError::config(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Read and parse a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> ExprResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ExprError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Load from the file named by `LAZY_EXPR_CONFIG`, or defaults if unset
    pub fn from_env() -> ExprResult<Self> {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Render as TOML text
    pub fn to_toml_string(&self) -> ExprResult<String> {
        toml::to_string(self).map_err(|e| ExprError::config(e.to_string()))
    }

    /// Check field values
    pub fn validate(&self) -> ExprResult<()> {
        if !IDENTIFIER.is_match(&self.uid_prefix) {
            return Err(ExprError::config(format!(
                "uid_prefix '{}' is not a valid identifier",
                self.uid_prefix
            )));
        }
        if self.dedup_threshold < 2 {
            return Err(ExprError::config(format!(
                "dedup_threshold must be at least 2, got {}",
                self.dedup_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuilderConfig::from_toml_str("").unwrap();
        assert_eq!(config, BuilderConfig::default());
        assert_eq!(config.uid_prefix, "__uid");
        assert_eq!(config.dedup_threshold, 5);
    }

    #[test]
    fn test_partial_override() {
        let config = BuilderConfig::from_toml_str("uid_prefix = \"tmp\"\n").unwrap();
        assert_eq!(config.uid_prefix, "tmp");
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            BuilderConfig::from_toml_str("uid_prefix = \"1x\""),
            Err(ExprError::Config(_))
        ));
        assert!(matches!(
            BuilderConfig::from_toml_str("dedup_threshold = 1"),
            Err(ExprError::Config(_))
        ));
        assert!(matches!(
            BuilderConfig::from_toml_str("colour = 3"),
            Err(ExprError::Config(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = BuilderConfig {
            uid_prefix: "v".to_string(),
            diagnostics: true,
            dedup_threshold: 3,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(BuilderConfig::from_toml_str(&text).unwrap(), config);
    }
}
