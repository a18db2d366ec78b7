//! In-memory market snapshot
//!
//! Serves pools, prices and staking yields captured at one point in time.
//! Used by the CLI scenarios and as the test market throughout the workspace.

use std::collections::BTreeMap;

use loopwise_core::{AssetId, MarketError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketDataPort, PoolData, Result};

/// Quoted price of `asset_out` per unit of `asset_in`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub price: Decimal,
}

/// Serializable market contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticMarketSnapshot {
    #[serde(default)]
    pub pools: Vec<PoolData>,
    #[serde(default)]
    pub prices: Vec<PriceQuote>,
    /// Staking yield by derivative symbol, as fractions
    #[serde(default)]
    pub stake_apys: BTreeMap<String, Decimal>,
}

/// Market-data provider backed by a fixed snapshot
#[derive(Debug, Clone)]
pub struct StaticMarket {
    snapshot: StaticMarketSnapshot,
    connected: bool,
}

impl StaticMarket {
    pub fn new(snapshot: StaticMarketSnapshot) -> Self {
        Self {
            snapshot,
            connected: false,
        }
    }

    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn with_pool(mut self, pool: PoolData) -> Self {
        self.snapshot.pools.push(pool);
        self
    }

    pub fn with_price(mut self, asset_in: AssetId, asset_out: AssetId, price: Decimal) -> Self {
        self.snapshot.prices.push(PriceQuote {
            asset_in,
            asset_out,
            price,
        });
        self
    }

    pub fn with_stake_apy(mut self, symbol: impl Into<String>, apy: Decimal) -> Self {
        self.snapshot.stake_apys.insert(symbol.into(), apy);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn snapshot(&self) -> &StaticMarketSnapshot {
        &self.snapshot
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(MarketError::SessionClosed)
        }
    }
}

impl MarketDataPort for StaticMarket {
    fn get_asset_price(&self, asset_in: &AssetId, asset_out: &AssetId) -> Result<Decimal> {
        self.ensure_connected()?;
        if asset_in == asset_out {
            return Ok(Decimal::ONE);
        }

        let direct = self
            .snapshot
            .prices
            .iter()
            .find(|q| &q.asset_in == asset_in && &q.asset_out == asset_out);
        if let Some(quote) = direct {
            return Ok(quote.price);
        }

        // Fall back to inverting the reverse quote
        let reverse = self
            .snapshot
            .prices
            .iter()
            .find(|q| &q.asset_in == asset_out && &q.asset_out == asset_in);
        match reverse {
            Some(quote) if !quote.price.is_zero() => Ok(Decimal::ONE / quote.price),
            Some(_) => Err(MarketError::IncompleteData {
                key: format!("{asset_out}/{asset_in}"),
                field: "price",
            }),
            None => Err(MarketError::NotFound {
                kind: "Price",
                key: format!("{asset_in}/{asset_out}"),
            }),
        }
    }

    fn get_pool_data_by_symbol(&self, symbol: &str) -> Result<PoolData> {
        self.ensure_connected()?;
        self.snapshot
            .pools
            .iter()
            .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .ok_or_else(|| MarketError::NotFound {
                kind: "Pool",
                key: symbol.to_string(),
            })
    }

    fn get_pool_by_id(&self, id: &str) -> Result<PoolData> {
        self.ensure_connected()?;
        self.snapshot
            .pools
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| MarketError::NotFound {
                kind: "Pool",
                key: id.to_string(),
            })
    }

    fn get_external_stake_apy(&self, symbol: &str) -> Result<Decimal> {
        self.ensure_connected()?;
        self.snapshot
            .stake_apys
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketError::Unavailable {
                call: "get_external_stake_apy",
                reason: format!("no staking yield published for {symbol}"),
            })
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
