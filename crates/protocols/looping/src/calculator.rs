//! Looping Calculator
//!
//! Pure math for leveraged looping: LP fee yield, geometric exposure of N
//! loops, borrow caps and the headline APY. No I/O, no logging.
//!
//! Arithmetic is checked throughout; an input large enough to overflow
//! `Decimal` comes back as `InvalidParameter` instead of a panic.

use loopwise_core::{round_amount, LoopError, Rate};
use rust_decimal::Decimal;

use crate::constants::MAX_LOOPS;
use crate::state::{ApyBreakdown, ApyParams, PoolRateSnapshot};

fn overflow(param: &'static str, what: &str) -> LoopError {
    LoopError::invalid(param, format!("{what} overflows the decimal range"))
}

/// LP fee as a fraction: numerator / denominator, or 0 for a fee-less pool
pub fn fee_rate(fee_numerator: Decimal, fee_denominator: Decimal) -> Result<Decimal, LoopError> {
    if fee_denominator.is_zero() {
        return Ok(Decimal::ZERO);
    }
    fee_numerator
        .checked_div(fee_denominator)
        .ok_or_else(|| overflow("fee", &format!("{fee_numerator} / {fee_denominator}")))
}

/// Reject an LTV outside [0, 1); the exposure series only converges below 1
pub fn validate_ltv(ltv: Decimal) -> Result<(), LoopError> {
    if ltv < Decimal::ZERO || ltv >= Decimal::ONE {
        return Err(LoopError::invalid(
            "ltv",
            format!("must be within [0, 1), got {ltv}"),
        ));
    }
    Ok(())
}

pub fn validate_loops(loops: u32, max_loops: u32) -> Result<(), LoopError> {
    if loops > max_loops {
        return Err(LoopError::invalid(
            "loops",
            format!("at most {max_loops} loops supported, got {loops}"),
        ));
    }
    Ok(())
}

/// Borrow-side multiplier: ltv + ltv^2 + ... + ltv^loops.
///
/// Saturates instead of overflowing for an LTV outside [0, 1).
pub fn borrow_exposure(ltv: Decimal, loops: u32) -> Decimal {
    let mut power = Decimal::ONE;
    let mut total = Decimal::ZERO;
    for _ in 0..loops {
        power = power.saturating_mul(ltv);
        total = total.saturating_add(power);
    }
    total
}

/// Supply-side multiplier: 1 + ltv + ... + ltv^loops
pub fn supply_exposure(ltv: Decimal, loops: u32) -> Decimal {
    Decimal::ONE.saturating_add(borrow_exposure(ltv, loops))
}

/// Both exposure multipliers as `(supply, borrow)`
pub fn exposures(ltv: Decimal, loops: u32) -> (Decimal, Decimal) {
    let borrow = borrow_exposure(ltv, loops);
    (Decimal::ONE.saturating_add(borrow), borrow)
}

/// Maximum borrow against `amount` of collateral, rounded for display
pub fn max_borrow(amount: Decimal, ltv: Decimal, decimals: u32) -> Result<Decimal, LoopError> {
    let borrowed = amount
        .checked_mul(ltv)
        .ok_or_else(|| overflow("amount", &format!("{amount} * ltv {ltv}")))?;
    Ok(round_amount(borrowed, decimals))
}

/// Expected swap output after slippage.
///
/// The gross output is rounded before slippage is applied, and the net
/// figure is rounded again at emission.
pub fn swap_out(
    amount: Decimal,
    price: Decimal,
    slippage: Decimal,
    decimals: u32,
) -> Result<Decimal, LoopError> {
    let gross = amount
        .checked_mul(price)
        .ok_or_else(|| overflow("amount", &format!("{amount} at price {price}")))?;
    let gross = round_amount(gross, decimals);
    let net = Decimal::ONE
        .checked_sub(slippage)
        .and_then(|keep| gross.checked_mul(keep))
        .ok_or_else(|| overflow("slippage_tolerance", &format!("{gross} less {slippage}")))?;
    Ok(round_amount(net, decimals))
}

/// Headline APY of a looped position.
///
/// apy = (base + aux + fee_lp + stake) * supply_exposure - borrow * borrow_exposure
pub fn compute_apy(params: &ApyParams) -> Result<ApyBreakdown, LoopError> {
    params.loop_parameters().validate(MAX_LOOPS)?;

    let base_liquidity = params.base_liquidity_rate.normalize()?;
    let aux_liquidity = params.aux_liquidity_rate.normalize()?;
    let borrow_rate = params.borrow_rate.normalize()?;
    let fee_lp = fee_rate(params.fee_numerator, params.fee_denominator)?;
    let (supply_exposure, borrow_exposure) = exposures(params.ltv, params.loops);

    let liquidity_rate = base_liquidity
        .checked_add(aux_liquidity)
        .ok_or_else(|| overflow("liquidity_rate", "base + aux liquidity rate"))?;
    let supply_yield = liquidity_rate
        .checked_add(fee_lp)
        .and_then(|y| y.checked_add(params.external_stake_apy))
        .ok_or_else(|| overflow("liquidity_rate", "supply yield"))?;
    let supply_term = supply_yield
        .checked_mul(supply_exposure)
        .ok_or_else(|| overflow("liquidity_rate", "levered supply yield"))?;
    let borrow_term = borrow_rate
        .checked_mul(borrow_exposure)
        .ok_or_else(|| overflow("borrow_rate", "levered borrow cost"))?;
    let apy = supply_term
        .checked_sub(borrow_term)
        .ok_or_else(|| overflow("borrow_rate", "net APY"))?;

    Ok(ApyBreakdown {
        apy,
        liquidity_rate,
        borrow_rate,
        fee_lp,
        supply_exposure,
        borrow_exposure,
    })
}

/// Headline APY straight from pool snapshots.
///
/// The borrow rate is the base pool's variable borrow rate; a missing
/// auxiliary pool contributes nothing.
pub fn compute_apy_from_snapshots(
    base: &PoolRateSnapshot,
    aux: Option<&PoolRateSnapshot>,
    fee_numerator: Decimal,
    fee_denominator: Decimal,
    external_stake_apy: Decimal,
    ltv: Decimal,
    loops: u32,
) -> Result<ApyBreakdown, LoopError> {
    let params = ApyParams {
        base_liquidity_rate: base.liquidity_rate,
        aux_liquidity_rate: aux.map(|a| a.liquidity_rate).unwrap_or_else(Rate::zero),
        borrow_rate: base.variable_borrow_rate,
        fee_numerator,
        fee_denominator,
        external_stake_apy,
        ltv,
        loops,
    };
    compute_apy(&params)
}
