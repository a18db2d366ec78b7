//! Strategy Data Resolution
//!
//! Pulls pool data, prices and staking yields from a market-data port and
//! feeds them to the calculator and simulator.

use loopwise_core::{LoopConfig, LoopError, Rate};
use market_data::{MarketDataPort, PoolData};
use rust_decimal::Decimal;

use crate::calculator::{self, validate_loops};
use crate::simulator::{self, StrategyVariant};
use crate::state::{ApyBreakdown, ApyParams, SimulationInput, SimulationResult, StrategyDefinition};

/// LTV a variant may borrow at against `pool`.
///
/// E-mode variants use the pool's e-mode LTV when it has one.
pub fn resolve_ltv(pool: &PoolData, variant: StrategyVariant) -> Decimal {
    match pool.emode_ltv {
        Some(emode_ltv) if variant.uses_emode() => emode_ltv,
        _ => pool.ltv,
    }
}

/// External staking yield, or 0 when the provider has none
pub fn resolve_stake_apy(market: &dyn MarketDataPort, symbol: Option<&str>) -> Decimal {
    let Some(symbol) = symbol else {
        return Decimal::ZERO;
    };
    match market.get_external_stake_apy(symbol) {
        Ok(apy) if apy >= Decimal::ZERO => apy,
        Ok(apy) => {
            tracing::warn!(symbol, apy = %apy, "Negative staking yield ignored");
            Decimal::ZERO
        }
        Err(e) => {
            tracing::warn!(symbol, error = %e, "Staking yield unavailable, using 0");
            Decimal::ZERO
        }
    }
}

/// Headline APY of a catalogued strategy at `loops` iterations.
///
/// `loops` is capped by `config.max_loops`, the same cap the simulator
/// applies. The collateral pool (supply rate, LTV) and the borrow pool are
/// required. The auxiliary LP pool and the staking yield degrade to a zero
/// contribution when they cannot be fetched.
pub fn estimate_strategy_apy(
    market: &dyn MarketDataPort,
    strategy: &StrategyDefinition,
    loops: u32,
    config: &LoopConfig,
) -> Result<ApyBreakdown, LoopError> {
    config.validate()?;
    validate_loops(loops, config.max_loops)?;
    let variant = strategy.variant()?;

    let collateral_pool = market
        .get_pool_by_id(&strategy.collateral_pool_id)
        .map_err(|e| LoopError::unavailable("get_pool_by_id", e))?;
    let borrow_pool = market
        .get_pool_data_by_symbol(&strategy.base.symbol)
        .map_err(|e| LoopError::unavailable("get_pool_data_by_symbol", e))?;

    let aux_pool = strategy
        .aux_pool_id
        .as_deref()
        .and_then(|id| match market.get_pool_by_id(id) {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!(
                    strategy_id = %strategy.id,
                    pool_id = %id,
                    error = %e,
                    "Auxiliary pool unavailable, fee and aux rate count as 0"
                );
                None
            }
        });

    let (aux_liquidity_rate, fee_numerator, fee_denominator) = match &aux_pool {
        Some(pool) => (
            pool.liquidity_rate,
            pool.fee_numerator.unwrap_or_default(),
            pool.fee_denominator.unwrap_or_default(),
        ),
        None => (Rate::zero(), Decimal::ZERO, Decimal::ZERO),
    };

    let params = ApyParams {
        base_liquidity_rate: collateral_pool.liquidity_rate,
        aux_liquidity_rate,
        borrow_rate: borrow_pool.variable_borrow_rate,
        fee_numerator,
        fee_denominator,
        external_stake_apy: resolve_stake_apy(market, strategy.stake_symbol.as_deref()),
        ltv: resolve_ltv(&collateral_pool, variant),
        loops,
    };
    let breakdown = calculator::compute_apy(&params)?;

    tracing::debug!(
        strategy_id = %strategy.id,
        loops,
        apy = %breakdown.apy,
        "Estimated strategy APY"
    );
    Ok(breakdown)
}

/// Simulate a catalogued strategy for a deposit of `amount` base asset
pub fn simulate_strategy(
    market: &dyn MarketDataPort,
    strategy: &StrategyDefinition,
    amount: Decimal,
    iterations: u32,
    config: &LoopConfig,
) -> Result<SimulationResult, LoopError> {
    let variant = strategy.variant()?;
    let collateral_pool = market
        .get_pool_by_id(&strategy.collateral_pool_id)
        .map_err(|e| LoopError::unavailable("get_pool_by_id", e))?;

    let input = SimulationInput {
        in_asset_id: strategy.base.asset_id.clone(),
        amount,
        iterations,
    };
    simulator::simulate(
        variant,
        &strategy.assets(),
        &input,
        resolve_ltv(&collateral_pool, variant),
        market,
        config,
    )
}
