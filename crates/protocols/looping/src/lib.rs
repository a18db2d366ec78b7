//! Leveraged Looping Strategies
//!
//! Deposit a base asset, move it into a yield-bearing collateral, borrow
//! against it up to the pool LTV and feed the borrowed amount back through
//! the same cycle. This crate prices that exposure and lays out the steps.
//!
//! # Components
//!
//! - [`calculator`]: headline APY from pool rates, fees, staking yield and
//!   the geometric exposure of N loops. Pure arithmetic, no I/O.
//! - [`simulator`]: ordered execution plan (enable, swap/join, supply,
//!   borrow) for a concrete deposit.
//! - [`fetch`]: resolves pool data and prices through a
//!   [`market_data::MarketDataPort`] and feeds the two above.

pub mod calculator;
pub mod constants;
pub mod fetch;
pub mod simulator;
pub mod state;

// Re-exports
pub use calculator::*;
pub use fetch::*;
pub use simulator::*;
pub use state::*;
