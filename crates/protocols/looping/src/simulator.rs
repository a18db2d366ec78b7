//! Loop Simulator
//!
//! Expands a strategy variant into the ordered steps a user would execute
//! for a given deposit. Single pass, no state kept between calls.

use std::fmt;
use std::str::FromStr;

use loopwise_core::{round_amount, LoopConfig, LoopError, Token};
use market_data::MarketDataPort;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::{max_borrow, swap_out, validate_loops, validate_ltv};
use crate::constants::{agents, strategists};
use crate::state::{SimulationInput, SimulationResult, Step, StepKind, StrategyAssets};

/// Supported looping strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyVariant {
    /// Swap the base asset into the yield token on a DEX, supply it, borrow
    /// the base asset and repeat. Runs in e-mode.
    SwapEntryLooping,
    /// Join the yield strategy with the base asset directly and borrow
    /// against the position, without a DEX swap.
    DirectBorrowLooping,
}

impl StrategyVariant {
    pub const ALL: [StrategyVariant; 2] = [Self::SwapEntryLooping, Self::DirectBorrowLooping];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SwapEntryLooping => strategists::SWAP_ENTRY_LOOPING,
            Self::DirectBorrowLooping => strategists::DIRECT_BORROW_LOOPING,
        }
    }

    /// Resolve a catalogue strategist name (case and `_`/`-` insensitive)
    pub fn from_strategist(name: &str) -> Result<Self, LoopError> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| LoopError::invalid("strategist", format!("unknown strategist {name:?}")))
    }

    /// Steps emitted once before the first loop
    pub fn setup_steps(&self) -> &'static [StepKind] {
        match self {
            Self::SwapEntryLooping => &[StepKind::EnableBorrowing, StepKind::EnableEMode],
            Self::DirectBorrowLooping => &[StepKind::EnableBorrowing],
        }
    }

    pub fn uses_emode(&self) -> bool {
        self.setup_steps().contains(&StepKind::EnableEMode)
    }

    /// Whether each loop supplies the yield token after entering
    pub fn requires_supply_step(&self) -> bool {
        matches!(self, Self::SwapEntryLooping)
    }

    /// Step kind and agent of the leg that turns base asset into yield asset
    pub fn entry_leg(&self) -> (StepKind, &'static str) {
        match self {
            Self::SwapEntryLooping => (StepKind::Swap, agents::DEX_ROUTER),
            Self::DirectBorrowLooping => (StepKind::JoinStrategy, agents::STRATEGY_VAULT),
        }
    }
}

impl fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyVariant {
    type Err = LoopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_strategist(s)
    }
}

/// Values fixed for a whole simulated run
struct LoopContext<'a> {
    variant: StrategyVariant,
    assets: &'a StrategyAssets,
    entry_price: Decimal,
    ltv: Decimal,
    slippage: Decimal,
    decimals: u32,
}

/// Step list that hands out gapless 1-based indices
#[derive(Default)]
struct StepPlan {
    steps: Vec<Step>,
}

impl StepPlan {
    fn push(
        &mut self,
        kind: StepKind,
        agent: &str,
        token_in: Option<Token>,
        token_out: Option<Token>,
    ) {
        let index = self.steps.len() as u32 + 1;
        self.steps.push(Step {
            index,
            kind,
            agent: agent.to_string(),
            token_in,
            token_out,
        });
    }
}

/// Emit one loop iteration and return the amount fed into the next one
fn run_iteration(
    ctx: &LoopContext<'_>,
    amount: Decimal,
    plan: &mut StepPlan,
) -> Result<Decimal, LoopError> {
    let base = &ctx.assets.base;
    let yield_asset = &ctx.assets.yield_asset;

    let (entry_kind, entry_agent) = ctx.variant.entry_leg();
    let out = swap_out(amount, ctx.entry_price, ctx.slippage, ctx.decimals)?;
    plan.push(
        entry_kind,
        entry_agent,
        Some(base.with_amount(amount)),
        Some(yield_asset.with_amount(out)),
    );

    if ctx.variant.requires_supply_step() {
        // Supply leg shows the pre-slippage amount
        plan.push(
            StepKind::Supply,
            agents::LENDING_POOL,
            Some(yield_asset.with_amount(amount)),
            None,
        );
    }

    let borrowed = max_borrow(amount, ctx.ltv, ctx.decimals)?;
    plan.push(
        StepKind::Borrow,
        agents::LENDING_POOL,
        None,
        Some(base.with_amount(borrowed)),
    );
    Ok(borrowed)
}

/// Simulate `variant` for a deposit of `input.amount` base asset.
///
/// The entry price is quoted once and held for the whole run; only the
/// swap-out leg carries slippage. Every amount is rounded when its step is
/// emitted, so rounding carries into the next iteration.
pub fn simulate(
    variant: StrategyVariant,
    assets: &StrategyAssets,
    input: &SimulationInput,
    ltv: Decimal,
    market: &dyn MarketDataPort,
    config: &LoopConfig,
) -> Result<SimulationResult, LoopError> {
    config.validate()?;
    if input.amount <= Decimal::ZERO {
        return Err(LoopError::invalid(
            "amount",
            format!("must be positive, got {}", input.amount),
        ));
    }
    if input.in_asset_id != assets.base.asset_id {
        return Err(LoopError::invalid(
            "in_asset_id",
            format!(
                "strategy deposits {}, got {}",
                assets.base.asset_id, input.in_asset_id
            ),
        ));
    }
    let mut amount = round_amount(input.amount, config.amount_decimals);
    if amount.is_zero() {
        return Err(LoopError::invalid(
            "amount",
            format!(
                "{} rounds to zero at {} decimal places",
                input.amount, config.amount_decimals
            ),
        ));
    }
    validate_loops(input.iterations, config.max_loops)?;
    validate_ltv(ltv)?;

    let mut plan = StepPlan::default();
    for &kind in variant.setup_steps() {
        plan.push(kind, agents::LENDING_POOL, None, None);
    }

    if input.iterations > 0 {
        let entry_price = market
            .get_asset_price(&assets.base.asset_id, &assets.yield_asset.asset_id)
            .map_err(|e| LoopError::unavailable("get_asset_price", e))?;
        if entry_price <= Decimal::ZERO {
            return Err(LoopError::invalid(
                "entry_price",
                format!(
                    "{}/{} quoted at {entry_price}",
                    assets.base.symbol, assets.yield_asset.symbol
                ),
            ));
        }

        let ctx = LoopContext {
            variant,
            assets,
            entry_price,
            ltv,
            slippage: config.slippage_tolerance,
            decimals: config.amount_decimals,
        };
        for _ in 0..input.iterations {
            amount = run_iteration(&ctx, amount, &mut plan)?;
        }
    }

    tracing::debug!(
        variant = %variant,
        iterations = input.iterations,
        steps = plan.steps.len(),
        "Simulated looping strategy"
    );

    // Aggregate totals and fee are not accumulated here; fees belong to the
    // APY aggregator.
    Ok(SimulationResult {
        initial_capital: assets.base.with_amount(input.amount),
        loops: input.iterations,
        fee: Decimal::ZERO,
        total_supply: Decimal::ZERO,
        total_borrow: Decimal::ZERO,
        steps: plan.steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopwise_core::{Asset, AssetId};
    use market_data::{StaticMarket, StaticMarketSnapshot};
    use rust_decimal_macros::dec;

    fn assets() -> StrategyAssets {
        StrategyAssets {
            base: Asset::new("weth", "WETH"),
            yield_asset: Asset::new("wsteth", "wstETH"),
        }
    }

    fn market(price: Decimal) -> StaticMarket {
        let mut market = StaticMarket::new(StaticMarketSnapshot::default()).with_price(
            AssetId::new("weth"),
            AssetId::new("wsteth"),
            price,
        );
        market.connect().unwrap();
        market
    }

    fn input(amount: Decimal, iterations: u32) -> SimulationInput {
        SimulationInput {
            in_asset_id: AssetId::new("weth"),
            amount,
            iterations,
        }
    }

    fn amount_out(step: &Step) -> Decimal {
        step.token_out.as_ref().and_then(|t| t.amount).unwrap()
    }

    fn amount_in(step: &Step) -> Decimal {
        step.token_in.as_ref().and_then(|t| t.amount).unwrap()
    }

    #[test]
    fn test_direct_borrow_scenario() {
        let result = simulate(
            StrategyVariant::DirectBorrowLooping,
            &assets(),
            &input(dec!(1000), 3),
            dec!(0.9),
            &market(dec!(1.0)),
            &LoopConfig::default(),
        )
        .unwrap();

        // 1 setup + 3 * (join, borrow)
        assert_eq!(result.steps.len(), 7);
        assert_eq!(result.steps[0].kind, StepKind::EnableBorrowing);
        assert!(result.steps[0].token_in.is_none());

        let borrows: Vec<Decimal> = result.borrow_steps().map(amount_out).collect();
        assert_eq!(borrows, vec![dec!(900), dec!(810), dec!(729)]);

        let joins: Vec<&Step> = result
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::JoinStrategy)
            .collect();
        assert_eq!(joins.len(), 3);
        assert_eq!(amount_in(joins[0]), dec!(1000));
        // slippage only on the join leg: 1000 * 0.995
        assert_eq!(amount_out(joins[0]), dec!(995));
        assert_eq!(amount_in(joins[1]), dec!(900));
        assert_eq!(amount_out(joins[1]), dec!(895.5));
        assert_eq!(joins[0].agent, agents::STRATEGY_VAULT);

        assert_eq!(result.loops, 3);
        assert_eq!(result.initial_capital.amount, Some(dec!(1000)));
        assert_eq!(result.total_supply, Decimal::ZERO);
        assert_eq!(result.total_borrow, Decimal::ZERO);
        assert_eq!(result.fee, Decimal::ZERO);
    }

    #[test]
    fn test_swap_entry_steps() {
        let result = simulate(
            StrategyVariant::SwapEntryLooping,
            &assets(),
            &input(dec!(10), 2),
            dec!(0.93),
            &market(dec!(0.8)),
            &LoopConfig::default(),
        )
        .unwrap();

        let kinds: Vec<StepKind> = result.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::EnableBorrowing,
                StepKind::EnableEMode,
                StepKind::Swap,
                StepKind::Supply,
                StepKind::Borrow,
                StepKind::Swap,
                StepKind::Supply,
                StepKind::Borrow,
            ]
        );

        // swap: round(10 * 0.8, 3) * 0.995 = 7.96
        assert_eq!(amount_out(&result.steps[2]), dec!(7.96));
        assert_eq!(result.steps[2].token_out.as_ref().unwrap().symbol, "wstETH");
        assert_eq!(result.steps[2].agent, agents::DEX_ROUTER);

        // supply keeps the pre-slippage iteration amount
        let supply = &result.steps[3];
        assert_eq!(supply.token_in.as_ref().unwrap().symbol, "wstETH");
        assert_eq!(amount_in(supply), dec!(10));

        // borrow: 10 * 0.93 = 9.3, then 9.3 * 0.93 = 8.649
        assert_eq!(amount_out(&result.steps[4]), dec!(9.3));
        assert_eq!(amount_out(&result.steps[7]), dec!(8.649));
        assert_eq!(amount_in(&result.steps[5]), dec!(9.3));
    }

    #[test]
    fn test_zero_iterations_emits_only_setup() {
        // no price in the market: zero iterations never asks for one
        let mut empty = StaticMarket::new(StaticMarketSnapshot::default());
        empty.connect().unwrap();

        for variant in StrategyVariant::ALL {
            let result = simulate(
                variant,
                &assets(),
                &input(dec!(5), 0),
                dec!(0.8),
                &empty,
                &LoopConfig::default(),
            )
            .unwrap();

            assert_eq!(result.steps.len(), variant.setup_steps().len());
            assert!(result.steps.iter().all(|s| s.kind.is_setup()));
            assert_eq!(result.initial_capital.amount, Some(dec!(5)));
            assert_eq!(result.loops, 0);
        }
    }

    #[test]
    fn test_indices_are_gapless() {
        let market = market(dec!(1.1));
        for variant in StrategyVariant::ALL {
            for iterations in 0..=6 {
                let result = simulate(
                    variant,
                    &assets(),
                    &input(dec!(123.456), iterations),
                    dec!(0.75),
                    &market,
                    &LoopConfig::default(),
                )
                .unwrap();

                let indices: Vec<u32> = result.steps.iter().map(|s| s.index).collect();
                let expected: Vec<u32> = (1..=result.steps.len() as u32).collect();
                assert_eq!(indices, expected, "{variant} x{iterations}");
            }
        }
    }

    #[test]
    fn test_borrow_never_exceeds_ltv_of_previous_amount() {
        let ltv = dec!(0.77);
        let result = simulate(
            StrategyVariant::SwapEntryLooping,
            &assets(),
            &input(dec!(3.333), 8),
            ltv,
            &market(dec!(0.9)),
            &LoopConfig::default(),
        )
        .unwrap();

        let mut previous = dec!(3.333);
        for step in result.borrow_steps() {
            let borrowed = amount_out(step);
            assert_eq!(borrowed, round_amount(previous * ltv, 3));
            assert!(borrowed <= round_amount(previous * ltv, 3));
            previous = borrowed;
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let market = market(dec!(1.0));
        let config = LoopConfig::default();
        let variant = StrategyVariant::DirectBorrowLooping;

        let err = simulate(variant, &assets(), &input(Decimal::ZERO, 1), dec!(0.9), &market, &config)
            .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "amount", .. }));

        let err = simulate(variant, &assets(), &input(dec!(-5), 1), dec!(0.9), &market, &config)
            .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "amount", .. }));

        let err = simulate(variant, &assets(), &input(dec!(5), 11), dec!(0.9), &market, &config)
            .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "loops", .. }));

        let err = simulate(variant, &assets(), &input(dec!(5), 1), Decimal::ONE, &market, &config)
            .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "ltv", .. }));

        let mut wrong_asset = input(dec!(5), 1);
        wrong_asset.in_asset_id = AssetId::new("usdc");
        let err = simulate(variant, &assets(), &wrong_asset, dec!(0.9), &market, &config)
            .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "in_asset_id", .. }));
    }

    #[test]
    fn test_missing_price_is_collaborator_failure() {
        let mut empty = StaticMarket::new(StaticMarketSnapshot::default());
        empty.connect().unwrap();

        let err = simulate(
            StrategyVariant::SwapEntryLooping,
            &assets(),
            &input(dec!(5), 1),
            dec!(0.9),
            &empty,
            &LoopConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoopError::CollaboratorUnavailable {
                call: "get_asset_price",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_price_rejected() {
        let err = simulate(
            StrategyVariant::SwapEntryLooping,
            &assets(),
            &input(dec!(5), 1),
            dec!(0.9),
            &market(Decimal::ZERO),
            &LoopConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "entry_price", .. }));
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!(
            StrategyVariant::from_strategist("Swap_Entry_Looping").unwrap(),
            StrategyVariant::SwapEntryLooping
        );
        assert_eq!(
            "direct-borrow-looping".parse::<StrategyVariant>().unwrap(),
            StrategyVariant::DirectBorrowLooping
        );
        assert!(StrategyVariant::from_strategist("yolo").is_err());

        assert!(StrategyVariant::SwapEntryLooping.uses_emode());
        assert!(!StrategyVariant::DirectBorrowLooping.uses_emode());
        assert!(StrategyVariant::SwapEntryLooping.requires_supply_step());
        assert!(!StrategyVariant::DirectBorrowLooping.requires_supply_step());
    }

    #[test]
    fn test_supply_steps_follow_variant() {
        let market = market(dec!(1.0));
        for variant in StrategyVariant::ALL {
            let result = simulate(
                variant,
                &assets(),
                &input(dec!(100), 4),
                dec!(0.8),
                &market,
                &LoopConfig::default(),
            )
            .unwrap();

            let supplies = result.steps.iter().filter(|s| s.kind == StepKind::Supply).count();
            let expected = if variant.requires_supply_step() { 4 } else { 0 };
            assert_eq!(supplies, expected, "{variant}");

            let (entry_kind, entry_agent) = variant.entry_leg();
            let entries: Vec<&Step> = result.steps.iter().filter(|s| s.kind == entry_kind).collect();
            assert_eq!(entries.len(), 4);
            assert!(entries.iter().all(|s| s.agent == entry_agent));
        }
    }

    #[test]
    fn test_amount_rounding_to_zero_rejected() {
        let err = simulate(
            StrategyVariant::DirectBorrowLooping,
            &assets(),
            &input(dec!(0.0004), 2),
            dec!(0.9),
            &market(dec!(1.0)),
            &LoopConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "amount", .. }));

        // 0.0005 rounds up to 0.001 and is accepted
        let result = simulate(
            StrategyVariant::DirectBorrowLooping,
            &assets(),
            &input(dec!(0.0005), 1),
            dec!(0.9),
            &market(dec!(1.0)),
            &LoopConfig::default(),
        )
        .unwrap();
        assert_eq!(amount_in(&result.steps[1]), dec!(0.001));
    }

    #[test]
    fn test_oversized_deposit_is_rejected_not_panicking() {
        let err = simulate(
            StrategyVariant::DirectBorrowLooping,
            &assets(),
            &input(dec!(50000000000000000000000000000), 1),
            dec!(0.9),
            &market(dec!(2)),
            &LoopConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LoopError::InvalidParameter { param: "amount", .. }));
    }
}
