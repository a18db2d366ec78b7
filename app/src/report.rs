//! Report DTOs printed by the CLI

use looping::{ApyBreakdown, SimulationResult, StrategyDefinition, StrategyVariant};
use loopwise_core::ApyScale;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Headline APY in the caller's chosen convention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApyInfo {
    pub value: Decimal,
    pub scale: ApyScale,
    pub loops: u32,
    pub breakdown: ApyBreakdown,
}

/// Everything computed for one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub strategy_id: String,
    pub name: String,
    pub variant: StrategyVariant,
    pub apy: ApyInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationResult>,
}

impl StrategyReport {
    pub fn new(
        strategy: &StrategyDefinition,
        variant: StrategyVariant,
        breakdown: ApyBreakdown,
        loops: u32,
        scale: ApyScale,
        simulation: Option<SimulationResult>,
    ) -> Self {
        Self {
            strategy_id: strategy.id.clone(),
            name: strategy.name.clone(),
            variant,
            apy: ApyInfo {
                value: breakdown.scaled(scale),
                scale,
                loops,
                breakdown,
            },
            simulation,
        }
    }
}
