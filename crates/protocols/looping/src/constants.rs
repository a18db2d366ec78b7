//! Looping Strategy Constants

pub use loopwise_core::constants::{AMOUNT_DECIMALS, MAX_LOOPS, SLIPPAGE_TOLERANCE};

/// Who executes each kind of step
pub mod agents {
    pub const LENDING_POOL: &str = "lending-pool";
    pub const DEX_ROUTER: &str = "dex-router";
    pub const STRATEGY_VAULT: &str = "strategy-vault";
}

/// Strategist names used by the strategy catalogue
pub mod strategists {
    pub const SWAP_ENTRY_LOOPING: &str = "swap-entry-looping";
    pub const DIRECT_BORROW_LOOPING: &str = "direct-borrow-looping";
}
