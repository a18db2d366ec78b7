//! Looping State Types
//!
//! Inputs and outputs of the APY aggregator and the loop simulator.

use loopwise_core::{ApyScale, Asset, AssetId, LoopError, Rate, Token};
use market_data::PoolData;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::{validate_loops, validate_ltv};
use crate::simulator::StrategyVariant;

/// Point-in-time rates of one lending pool for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolRateSnapshot {
    pub liquidity_rate: Rate,
    pub variable_borrow_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_numerator: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_denominator: Option<Decimal>,
}

impl From<&PoolData> for PoolRateSnapshot {
    fn from(pool: &PoolData) -> Self {
        Self {
            liquidity_rate: pool.liquidity_rate,
            variable_borrow_rate: pool.variable_borrow_rate,
            fee_numerator: pool.fee_numerator,
            fee_denominator: pool.fee_denominator,
        }
    }
}

/// Leverage shape of a looping position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopParameters {
    /// Loan-to-value as a fraction, within [0, 1)
    pub ltv: Decimal,
    pub loops: u32,
    /// Staking yield of the collateral, 0 when unknown
    pub external_stake_apy: Decimal,
}

impl LoopParameters {
    /// Check the leverage shape against a loop cap
    pub fn validate(&self, max_loops: u32) -> Result<(), LoopError> {
        validate_ltv(self.ltv)?;
        validate_loops(self.loops, max_loops)?;
        if self.external_stake_apy < Decimal::ZERO {
            return Err(LoopError::invalid(
                "external_stake_apy",
                format!("must not be negative, got {}", self.external_stake_apy),
            ));
        }
        Ok(())
    }
}

/// Everything `compute_apy` needs, with rates still in collaborator form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApyParams {
    pub base_liquidity_rate: Rate,
    /// Liquidity rate of an auxiliary (LP) pool, zero if absent
    #[serde(default)]
    pub aux_liquidity_rate: Rate,
    pub borrow_rate: Rate,
    #[serde(default)]
    pub fee_numerator: Decimal,
    #[serde(default)]
    pub fee_denominator: Decimal,
    #[serde(default)]
    pub external_stake_apy: Decimal,
    pub ltv: Decimal,
    pub loops: u32,
}

impl ApyParams {
    pub fn loop_parameters(&self) -> LoopParameters {
        LoopParameters {
            ltv: self.ltv,
            loops: self.loops,
            external_stake_apy: self.external_stake_apy,
        }
    }
}

/// Headline APY and the components it was built from.
///
/// `apy` is always a fraction (0.051 = 5.1%); use [`ApyBreakdown::scaled`]
/// for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApyBreakdown {
    pub apy: Decimal,
    pub liquidity_rate: Decimal,
    pub borrow_rate: Decimal,
    pub fee_lp: Decimal,
    pub supply_exposure: Decimal,
    pub borrow_exposure: Decimal,
}

impl ApyBreakdown {
    pub fn scaled(&self, scale: ApyScale) -> Decimal {
        scale.apply(self.apy)
    }
}

/// Kind of on-chain action in a strategy plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    EnableBorrowing,
    EnableEMode,
    /// Swap-like entry into a yield token
    JoinStrategy,
    Swap,
    Supply,
    Borrow,
}

impl StepKind {
    /// Setup steps carry no token amounts
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::EnableBorrowing | Self::EnableEMode)
    }
}

/// One action in a simulated plan. Indices start at 1 and have no gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub index: u32,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_in: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_out: Option<Token>,
}

/// Caller request for a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub in_asset_id: AssetId,
    pub amount: Decimal,
    pub iterations: u32,
}

/// Complete simulated plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub initial_capital: Token,
    pub loops: u32,
    pub fee: Decimal,
    pub total_supply: Decimal,
    pub total_borrow: Decimal,
    pub steps: Vec<Step>,
}

impl SimulationResult {
    pub fn borrow_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.kind == StepKind::Borrow)
    }
}

/// The asset pair a looping strategy moves between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAssets {
    /// Asset deposited and borrowed
    pub base: Asset,
    /// Yield-bearing collateral
    pub yield_asset: Asset,
}

/// A catalogued looping strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub id: String,
    pub name: String,
    /// Selects the simulation variant (see [`StrategyVariant::from_strategist`])
    pub strategist: String,
    pub base: Asset,
    pub yield_asset: Asset,
    /// Lending pool holding the yield asset as collateral
    pub collateral_pool_id: String,
    /// LP pool contributing fee yield
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_pool_id: Option<String>,
    /// Symbol to query the external staking yield for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake_symbol: Option<String>,
}

impl StrategyDefinition {
    pub fn variant(&self) -> Result<StrategyVariant, LoopError> {
        StrategyVariant::from_strategist(&self.strategist)
    }

    pub fn assets(&self) -> StrategyAssets {
        StrategyAssets {
            base: self.base.clone(),
            yield_asset: self.yield_asset.clone(),
        }
    }
}
