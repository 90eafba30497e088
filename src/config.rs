//! Projection settings
//!
//! ```toml
//! # initfs.toml
//! manifest_name = "META.TXT"
//! strict = false
//! ```

use crate::error::Result;
use crate::manifest::MANIFEST_V1;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// File name of the manifest inside an unpacked directory
    pub manifest_name: String,

    /// Fail on top-level entries that carry no file record instead of
    /// skipping them
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest_name: MANIFEST_V1.file_name.to_string(),
            strict: false,
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InitFsError;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.manifest_name, "META.TXT");
        assert!(!config.strict);
        assert_eq!(Config::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml_str("strict = true").unwrap();
        assert!(config.strict);
        assert_eq!(config.manifest_name, "META.TXT");

        let config = Config::from_toml_str("manifest_name = \"manifest.txt\"").unwrap();
        assert_eq!(config.manifest_name, "manifest.txt");
    }

    #[test]
    fn test_rejects_unknown_and_mistyped_keys() {
        assert!(matches!(
            Config::from_toml_str("strikt = true"),
            Err(InitFsError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("strict = \"yes\""),
            Err(InitFsError::Config(_))
        ));
    }
}
