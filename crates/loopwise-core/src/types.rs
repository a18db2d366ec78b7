//! Core type definitions for Loopwise

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::LoopError;

/// Asset identifier as reported by the market-data provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An asset together with its display symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: AssetId,
    pub symbol: String,
}

impl Asset {
    pub fn new(asset_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            asset_id: AssetId::new(asset_id),
            symbol: symbol.into(),
        }
    }

    /// Attach an amount, producing a token quantity
    pub fn with_amount(&self, amount: Decimal) -> Token {
        Token {
            asset_id: self.asset_id.clone(),
            symbol: self.symbol.clone(),
            amount: Some(amount),
        }
    }
}

/// Typed quantity of an asset at a strategy step.
///
/// `amount` is `None` for steps that move no value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub asset_id: AssetId,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// Interest rate as delivered by a collaborator.
///
/// Lending pools report rates as ray integers (scaled by 10^27); other
/// sources already hand out plain fractions. `normalize` is the single
/// place the ray scale is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rate {
    Ray(Decimal),
    Plain(Decimal),
}

impl Rate {
    /// Parse an on-chain ray integer such as `"35000000000000000000000000"`
    pub fn from_ray_str(raw: &str) -> Result<Self, LoopError> {
        let value = Decimal::from_str(raw.trim())
            .map_err(|e| LoopError::invalid("rate", format!("bad ray value {raw:?}: {e}")))?;
        Ok(Self::Ray(value))
    }

    pub fn plain(value: Decimal) -> Self {
        Self::Plain(value)
    }

    pub fn zero() -> Self {
        Self::Plain(Decimal::ZERO)
    }

    /// Rate as a plain fraction (0.035 = 3.5%)
    pub fn normalize(&self) -> Result<Decimal, LoopError> {
        let value = match *self {
            Self::Ray(raw) => raw
                .checked_div(constants::ray())
                .ok_or_else(|| LoopError::invalid("rate", format!("ray value {raw} overflows")))?,
            Self::Plain(value) => value,
        };
        if value.is_sign_negative() && !value.is_zero() {
            return Err(LoopError::invalid(
                "rate",
                format!("rate must not be negative, got {value}"),
            ));
        }
        Ok(value)
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::zero()
    }
}

/// Round a displayed amount half away from zero
pub fn round_amount(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Exponent of the ray fixed-point scale
    pub const RAY_DECIMALS: u32 = 27;

    /// Decimal places kept for every displayed amount
    pub const AMOUNT_DECIMALS: u32 = 3;

    /// Fraction knocked off each swap-out estimate unless configured otherwise
    pub const SLIPPAGE_TOLERANCE: Decimal = dec!(0.005);

    /// Protocol cap on loop iterations
    pub const MAX_LOOPS: u32 = 10;

    /// 10^27
    pub fn ray() -> Decimal {
        Decimal::from_i128_with_scale(10i128.pow(RAY_DECIMALS), 0)
    }
}
