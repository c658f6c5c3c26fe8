//! Frontend configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs controlling how the frontend lowers a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Fail on named types that match no registered struct or enum.
    /// When off they resolve to the unknown type.
    pub strict_types: bool,
    /// Splice out pass-through no-op nodes after lowering
    pub simplify: bool,
    /// Return the first lowering error instead of recording it
    pub fail_fast: bool,
    /// Prefix of the hidden iterator variable introduced by `for` loops
    pub fresh_prefix: String,
}

impl FrontendConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            strict_types: true,
            simplify: true,
            fail_fast: false,
            fresh_prefix: "__iter".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = FrontendConfig::default();
        assert!(config.strict_types);
        assert!(config.simplify);
        assert!(!config.fail_fast);
        assert_eq!(config.fresh_prefix, "__iter");
    }

    #[test]
    fn test_config_from_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"strict_types": false, "fresh_prefix": "it"}}"#).unwrap();

        let config = FrontendConfig::from_file(file.path()).unwrap();
        assert!(!config.strict_types);
        assert!(config.simplify);
        assert_eq!(config.fresh_prefix, "it");
    }

    #[test]
    fn test_config_from_missing_file() {
        assert!(FrontendConfig::from_file(Path::new("/nonexistent/rustlisa.json")).is_err());
    }
}
