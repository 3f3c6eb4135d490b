//! User configuration at ~/.config/cctool/config.toml
//!
//! Every key may also be set through a `CCTOOL_`-prefixed environment
//! variable, e.g. `CCTOOL_MERGE_POLICY=exact`, which wins over the file.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{CctoolError, CctoolResult};
use crate::formats::Format;
use crate::merge::MergePolicy;

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct CctoolConfig {
    /// Output format used when neither `--to` nor the output file name
    /// decides one.
    pub default_output_format: Option<String>,

    #[serde(default)]
    pub merge_policy: MergePolicy,
}

impl CctoolConfig {
    pub fn config_path() -> CctoolResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CctoolError::Config("Could not determine config directory".into()))?
            .join("cctool");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config file (if any) and the environment overrides.
    pub fn load() -> CctoolResult<Self> {
        Self::build(&Self::config_path()?, Some(Environment::with_prefix("CCTOOL")))
    }

    /// Load only the given file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> CctoolResult<Self> {
        Self::build(path, None)
    }

    fn build(path: &Path, env: Option<Environment>) -> CctoolResult<Self> {
        let mut builder = Config::builder().add_source(File::from(path).required(false));
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        builder
            .build()
            .map_err(|e| CctoolError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CctoolError::Config(e.to_string()))
    }

    /// The configured default output format, if set and known.
    pub fn default_output_format(&self) -> CctoolResult<Option<Format>> {
        self.default_output_format
            .as_deref()
            .map(str::parse::<Format>)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CctoolConfig::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, CctoolConfig::default());
        assert_eq!(config.merge_policy, MergePolicy::Overlap);
        assert_eq!(config.default_output_format().unwrap(), None);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_output_format = \"vcf\"\nmerge_policy = \"exact\"\n").unwrap();

        let config = CctoolConfig::load_from(&path).unwrap();
        assert_eq!(config.merge_policy, MergePolicy::Exact);
        assert_eq!(config.default_output_format().unwrap(), Some(Format::Vcard));
    }

    #[test]
    fn test_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "merge_policy = \"fuzzy\"\n").unwrap();
        assert!(matches!(
            CctoolConfig::load_from(&path),
            Err(CctoolError::Config(_))
        ));

        std::fs::write(&path, "default_output_format = \"csv\"\n").unwrap();
        let config = CctoolConfig::load_from(&path).unwrap();
        assert!(matches!(
            config.default_output_format(),
            Err(CctoolError::UnsupportedFormat(_))
        ));
    }
}
