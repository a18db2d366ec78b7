//! Configuration types for Loopwise

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{constants, Error, LoopError};

/// How a headline APY is presented to a caller.
///
/// The aggregator always computes a fraction; the scale is picked explicitly
/// by whoever formats the value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApyScale {
    /// 0.051 means 5.1%
    #[default]
    Fraction,
    /// 5.1 means 5.1%
    Percent,
}

impl ApyScale {
    pub fn apply(self, apy_fraction: Decimal) -> Decimal {
        match self {
            Self::Fraction => apy_fraction,
            Self::Percent => apy_fraction * dec!(100),
        }
    }
}

/// Looping strategy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Fraction knocked off every swap-out estimate (0.005 = 0.5%)
    #[serde(default = "default_slippage_tolerance")]
    pub slippage_tolerance: Decimal,

    /// Loop cap shared by APY estimation and simulation, at most the
    /// protocol cap
    #[serde(default = "default_max_loops")]
    pub max_loops: u32,

    /// Decimal places of displayed step amounts
    #[serde(default = "default_amount_decimals")]
    pub amount_decimals: u32,

    /// Presentation of headline APY values
    #[serde(default)]
    pub apy_scale: ApyScale,
}

fn default_slippage_tolerance() -> Decimal {
    constants::SLIPPAGE_TOLERANCE
}

fn default_max_loops() -> u32 {
    constants::MAX_LOOPS
}

fn default_amount_decimals() -> u32 {
    constants::AMOUNT_DECIMALS
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            slippage_tolerance: default_slippage_tolerance(),
            max_loops: default_max_loops(),
            amount_decimals: default_amount_decimals(),
            apy_scale: ApyScale::default(),
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), LoopError> {
        if self.slippage_tolerance < Decimal::ZERO || self.slippage_tolerance >= Decimal::ONE {
            return Err(LoopError::invalid(
                "slippage_tolerance",
                format!("must be within [0, 1), got {}", self.slippage_tolerance),
            ));
        }
        if self.max_loops > constants::MAX_LOOPS {
            return Err(LoopError::invalid(
                "max_loops",
                format!(
                    "protocol allows at most {} loops, got {}",
                    constants::MAX_LOOPS,
                    self.max_loops
                ),
            ));
        }
        if self.amount_decimals > 18 {
            return Err(LoopError::invalid(
                "amount_decimals",
                format!("at most 18 supported, got {}", self.amount_decimals),
            ));
        }
        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Looping strategy settings
    #[serde(default)]
    pub looping: LoopConfig,

    /// Tracing directives used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "loopwise=debug,looping=debug,info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            looping: LoopConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        config
            .looping
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load from a JSON file; a missing file yields defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}
