//! Scenario files: a strategy, a market snapshot and what to compute

use std::path::Path;

use anyhow::Context;
use looping::{estimate_strategy_apy, simulate_strategy, StrategyDefinition};
use loopwise_core::{ApyScale, LoopConfig, LoopError};
use market_data::{MarketSession, StaticMarket, StaticMarketSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::report::StrategyReport;

/// Deposit to plan steps for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub amount: Decimal,
    pub iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub strategy: StrategyDefinition,
    pub market: StaticMarketSnapshot,
    /// Loop count for the headline APY
    #[serde(default = "default_loops")]
    pub loops: u32,
    /// Overrides the configured APY scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apy_scale: Option<ApyScale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationRequest>,
}

fn default_loops() -> u32 {
    3
}

impl Scenario {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing scenario")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

/// Compute the headline APY and, if requested, the step plan
pub fn evaluate(scenario: &Scenario, config: &LoopConfig) -> Result<StrategyReport, LoopError> {
    let strategy = &scenario.strategy;
    let variant = strategy.variant()?;

    let session = MarketSession::open(StaticMarket::new(scenario.market.clone()))
        .map_err(|e| LoopError::unavailable("connect", e))?;
    let market = session
        .port()
        .map_err(|e| LoopError::unavailable("connect", e))?;

    let breakdown = estimate_strategy_apy(market, strategy, scenario.loops, config)?;
    let simulation = scenario
        .simulation
        .as_ref()
        .map(|req| simulate_strategy(market, strategy, req.amount, req.iterations, config))
        .transpose()?;

    session.close();

    let scale = scenario.apy_scale.unwrap_or(config.apy_scale);
    tracing::info!(
        strategy_id = %strategy.id,
        variant = %variant,
        apy = %breakdown.scaled(scale),
        ?scale,
        "Scenario evaluated"
    );

    Ok(StrategyReport::new(
        strategy,
        variant,
        breakdown,
        scenario.loops,
        scale,
        simulation,
    ))
}
