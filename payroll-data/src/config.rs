use std::fs;
use std::path::{Path, PathBuf};

use payroll_core::{PayrollError, TaxConfig};
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading a tax configuration snapshot.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] PayrollError),
}

/// Reads and writes [`TaxConfig`] snapshots as TOML.
///
/// Every snapshot is validated on load; an inconsistent configuration is
/// rejected, never patched up.
pub struct TaxConfigLoader;

impl TaxConfigLoader {
    pub fn from_toml_str(source: &str) -> Result<TaxConfig, ConfigLoadError> {
        let config: TaxConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<TaxConfig, ConfigLoadError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;

        info!(
            path = %path.display(),
            tax_year = config.tax_year,
            version = %config.version,
            "loaded tax configuration"
        );
        Ok(config)
    }

    pub fn to_toml_string(config: &TaxConfig) -> Result<String, ConfigLoadError> {
        Ok(toml::to_string_pretty(config)?)
    }
}
