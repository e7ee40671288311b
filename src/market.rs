// 7.0: market configuration and runtime state. a market is one tradable
// instrument: an AMM handle for pricing and execution, the name of the oracle
// underlying, and the funding state that positions settle against.

use crate::amm::Amm;
use crate::funding::{FundingParams, FundingState};
use crate::types::{MarketId, Timestamp};
use serde::{Deserialize, Serialize};

/// Static market configuration (immutable after creation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub id: MarketId,
    /// Human-readable name (e.g., "ETH-PERP").
    pub name: String,
    /// Oracle asset symbol for the underlying (e.g., "ETH").
    pub underlying: String,
    pub funding_params: FundingParams,
}

impl MarketConfig {
    pub fn new(id: MarketId, name: &str, underlying: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            underlying: underlying.to_string(),
            funding_params: FundingParams::default(),
        }
    }

    pub fn with_funding_params(mut self, params: FundingParams) -> Self {
        self.funding_params = params;
        self
    }
}

/// Dynamic market state. The funding index only moves inside
/// `Engine::settle_funding`; the AMM mutates only on committed trades.
#[derive(Debug)]
pub struct MarketState {
    pub config: MarketConfig,
    pub amm: Box<dyn Amm>,
    pub funding_state: FundingState,
}

impl MarketState {
    pub fn new(config: MarketConfig, amm: Box<dyn Amm>, timestamp: Timestamp) -> Self {
        Self {
            config,
            amm,
            funding_state: FundingState::new(timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_feed::ReferenceAmm;
    use crate::types::Price;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn fresh_market_has_zero_index() {
        let config = MarketConfig::new(MarketId(1), "ETH-PERP", "ETH");
        let amm = Box::new(ReferenceAmm::new(Price::new_unchecked(dec!(1000))));
        let state = MarketState::new(config, amm, Timestamp::from_millis(5000));

        assert_eq!(state.funding_state.cumulative_premium_fraction, Decimal::ZERO);
        assert_eq!(state.funding_state.last_settlement.as_millis(), 5000);
        assert_eq!(state.amm.mark_price().value(), dec!(1000));
    }
}
