//! market-data: Market-data collaborator port for Loopwise
//!
//! The looping core never owns a network client. Callers inject something
//! implementing [`MarketDataPort`] and control its lifecycle through
//! [`MarketSession`].

pub mod static_market;

use loopwise_core::{AssetId, MarketError, Rate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use static_market::{PriceQuote, StaticMarket, StaticMarketSnapshot};

/// Result type for market-data operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Lending/AMM pool data as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolData {
    pub id: String,
    pub symbol: String,
    pub asset_id: AssetId,
    pub liquidity_rate: Rate,
    pub variable_borrow_rate: Rate,
    /// Base loan-to-value as a fraction
    pub ltv: Decimal,
    /// Loan-to-value while e-mode is active, if the pool has an e-mode category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emode_ltv: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_numerator: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_denominator: Option<Decimal>,
}

/// Price and pool lookups consumed by the looping core.
///
/// Implementations may block on network round trips. Retries and timeouts
/// are the implementation's or the caller's business.
pub trait MarketDataPort: Send + Sync {
    /// Units of `asset_out` received per unit of `asset_in`
    fn get_asset_price(&self, asset_in: &AssetId, asset_out: &AssetId) -> Result<Decimal>;

    fn get_pool_data_by_symbol(&self, symbol: &str) -> Result<PoolData>;

    fn get_pool_by_id(&self, id: &str) -> Result<PoolData>;

    /// Base yield of a staking derivative as a fraction
    fn get_external_stake_apy(&self, symbol: &str) -> Result<Decimal>;

    /// Establish whatever connection the provider needs
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn disconnect(&mut self) {}
}

/// An open market-data connection with an explicit lifecycle.
///
/// `open` connects the port, `close` disconnects and hands it back.
/// Dropping an open session disconnects as well.
pub struct MarketSession<P: MarketDataPort> {
    port: Option<P>,
}

impl<P: MarketDataPort> MarketSession<P> {
    pub fn open(mut port: P) -> Result<Self> {
        port.connect()?;
        tracing::debug!("Market session opened");
        Ok(Self { port: Some(port) })
    }

    /// Borrow the connected port
    pub fn port(&self) -> Result<&P> {
        self.port.as_ref().ok_or(MarketError::SessionClosed)
    }

    /// Disconnect and return the port
    pub fn close(mut self) -> Option<P> {
        let mut port = self.port.take()?;
        port.disconnect();
        tracing::debug!("Market session closed");
        Some(port)
    }
}

impl<P: MarketDataPort> Drop for MarketSession<P> {
    fn drop(&mut self) {
        if let Some(port) = self.port.as_mut() {
            port.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market() -> StaticMarket {
        StaticMarket::new(StaticMarketSnapshot::default()).with_price(
            AssetId::new("weth"),
            AssetId::new("wsteth"),
            dec!(0.85),
        )
    }

    #[test]
    fn test_session_lifecycle() {
        let session = MarketSession::open(market()).unwrap();
        let price = session
            .port()
            .unwrap()
            .get_asset_price(&AssetId::new("weth"), &AssetId::new("wsteth"))
            .unwrap();
        assert_eq!(price, dec!(0.85));

        let port = session.close().unwrap();
        assert!(!port.is_connected());
        let err = port
            .get_asset_price(&AssetId::new("weth"), &AssetId::new("wsteth"))
            .unwrap_err();
        assert!(matches!(err, MarketError::SessionClosed));
    }

    #[test]
    fn test_unopened_market_refuses_calls() {
        let err = market().get_external_stake_apy("wstETH").unwrap_err();
        assert!(matches!(err, MarketError::SessionClosed));
    }

    #[test]
    fn test_pool_data_serde_defaults() {
        let json = r#"{
            "id": "pool-wsteth",
            "symbol": "wstETH",
            "asset_id": "wsteth",
            "liquidity_rate": {"ray": "1000000000000000000000000"},
            "variable_borrow_rate": {"plain": "0.03"},
            "ltv": "0.8"
        }"#;
        let pool: PoolData = serde_json::from_str(json).unwrap();
        assert_eq!(pool.ltv, dec!(0.8));
        assert!(pool.emode_ltv.is_none());
        assert!(pool.fee_denominator.is_none());
        assert_eq!(pool.liquidity_rate.normalize().unwrap(), dec!(0.001));
    }
}
