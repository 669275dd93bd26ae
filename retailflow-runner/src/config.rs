//! Serializable run configuration (TOML).

use std::path::{Path, PathBuf};

use retailflow_core::{EquityParams, ExecutionRules, MarkerParams, SignalParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to reproduce a run.
///
/// Every section is optional in the file. Missing keys default to a 200 000
/// fund, 200 fee per side, 50 per point, a 60-day Sharpe window and a
/// retail-net threshold of 40.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub signal: SignalParams,
    pub markers: MarkerParams,
    pub equity: EquityParams,
    pub rules: ExecutionRules,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Daily price CSV.
    pub prices: Option<PathBuf>,
    /// Daily open-interest CSV.
    pub open_interest: Option<PathBuf>,
    pub columns: ColumnConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub prices: PriceColumns,
    pub open_interest: OpenInterestColumns,
}

/// Header names in the price CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceColumns {
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
}

impl Default for PriceColumns {
    fn default() -> Self {
        Self {
            date: "Date".into(),
            open: "Open".into(),
            high: "High".into(),
            low: "Low".into(),
            close: "Close".into(),
        }
    }
}

/// Header names in the open-interest CSV. Defaults match the exchange's
/// micro-contract export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenInterestColumns {
    pub date: String,
    pub total: String,
    pub institutional_long: String,
    pub institutional_short: String,
}

impl Default for OpenInterestColumns {
    fn default() -> Self {
        Self {
            date: "Date".into(),
            total: "TMF_全市場".into(),
            institutional_long: "TMF_多方未平倉口數".into(),
            institutional_short: "TMF_空方未平倉口數".into(),
        }
    }
}

impl RunConfig {
    /// Load and validate a TOML config file. Relative data paths resolve
    /// against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.data.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let eq = &self.equity;
        if !(eq.starting_fund.is_finite() && eq.starting_fund > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "equity.starting_fund must be positive, got {}",
                eq.starting_fund
            )));
        }
        if !(eq.fee_per_side.is_finite() && eq.fee_per_side >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "equity.fee_per_side must be non-negative, got {}",
                eq.fee_per_side
            )));
        }
        if !(eq.contract_multiplier.is_finite() && eq.contract_multiplier > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "equity.contract_multiplier must be positive, got {}",
                eq.contract_multiplier
            )));
        }
        if eq.sharpe_window == 0 {
            return Err(ConfigError::Invalid(
                "equity.sharpe_window must be at least 1".into(),
            ));
        }
        if !(eq.periods_per_year.is_finite() && eq.periods_per_year > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "equity.periods_per_year must be positive, got {}",
                eq.periods_per_year
            )));
        }
        if !self.signal.retail_net_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "signal.retail_net_threshold must be a finite number".into(),
            ));
        }
        let offset = self.markers.anchor_offset;
        if !(offset.is_finite() && (0.0..1.0).contains(&offset)) {
            return Err(ConfigError::Invalid(format!(
                "markers.anchor_offset must be in [0, 1), got {offset}"
            )));
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the strategy-relevant settings.
    ///
    /// Data paths and column names are excluded: two runs over the same
    /// tables with the same parameters share a hash wherever the files live.
    pub fn config_hash(&self) -> String {
        let key = (&self.signal, &self.markers, &self.equity, &self.rules);
        let json = serde_json::to_string(&key).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl DataConfig {
    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.prices, &mut self.open_interest].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
