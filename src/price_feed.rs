// 9.0: mocked external collaborators. the real curve and oracle live outside this
// crate; these reference implementations exist so the simulation binary and the
// test suites have something deterministic to trade against.

use crate::amm::{limit_violated, value_position, Amm, AmmError, Oracle, TradeExec};
use crate::types::{BaseSize, Price, Quote, Ratio};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Oracle with per-asset settable TWAPs. Drivers push prices in, the engine
/// reads them out during funding settlement.
#[derive(Debug, Default)]
pub struct SettableOracle {
    prices: HashMap<String, Price>,
}

impl SettableOracle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Oracle for SettableOracle {
    fn underlying_twap_price(&self, asset: &str) -> Option<Price> {
        self.prices.get(asset).copied()
    }

    fn set_underlying_twap_price(&mut self, asset: &str, price: Price) {
        self.prices.insert(asset.to_string(), price);
    }
}

// 9.1: flat-price AMM. executes everything at the current mark plus a linear
// impact per base unit, charges a proportional fee, honors price limits.
// twap defaults to mark unless pinned by the driver.
#[derive(Debug)]
pub struct ReferenceAmm {
    mark: Price,
    twap_override: Option<Price>,
    fee_ratio: Ratio,
    /// Mark moves by this much per base unit traded (signed with the trade).
    impact_per_unit: Decimal,
}

impl ReferenceAmm {
    pub fn new(initial_price: Price) -> Self {
        Self {
            mark: initial_price,
            twap_override: None,
            fee_ratio: Ratio::new(dec!(0.0005)).unwrap(),
            impact_per_unit: Decimal::ZERO,
        }
    }

    pub fn with_fee_ratio(mut self, fee_ratio: Ratio) -> Self {
        self.fee_ratio = fee_ratio;
        self
    }

    pub fn with_impact_per_unit(mut self, impact: Decimal) -> Self {
        self.impact_per_unit = impact;
        self
    }

    pub fn set_mark_price(&mut self, price: Price) {
        self.mark = price;
    }

    /// Pin the funding TWAP independently of the instantaneous mark.
    pub fn set_twap_price(&mut self, price: Price) {
        self.twap_override = Some(price);
    }

    fn price_trade(&self, size_delta: BaseSize, price_limit: Price) -> Result<TradeExec, AmmError> {
        if size_delta.is_zero() {
            return Err(AmmError::ZeroSize);
        }
        if limit_violated(size_delta, self.mark, price_limit) {
            return Err(AmmError::SlippageExceeded {
                limit: price_limit,
                execution: self.mark,
            });
        }
        let quote = Quote::new(size_delta.abs() * self.mark.value());
        let fee = Quote::new(quote.value() * self.fee_ratio.value());
        Ok(TradeExec {
            quote_asset: quote,
            fee,
        })
    }
}

impl Amm for ReferenceAmm {
    fn mark_price(&self) -> Price {
        self.mark
    }

    fn twap_price(&self, _window_ms: i64) -> Price {
        self.twap_override.unwrap_or(self.mark)
    }

    fn notional_position_and_unrealized_pnl(
        &self,
        size: BaseSize,
        open_notional: Quote,
    ) -> (Quote, Quote) {
        value_position(size, open_notional, self.mark)
    }

    fn quote_trade(&self, size_delta: BaseSize, price_limit: Price) -> Result<TradeExec, AmmError> {
        self.price_trade(size_delta, price_limit)
    }

    fn execute_trade(
        &mut self,
        size_delta: BaseSize,
        price_limit: Price,
    ) -> Result<TradeExec, AmmError> {
        let exec = self.price_trade(size_delta, price_limit)?;
        if !self.impact_per_unit.is_zero() {
            let moved = self.mark.value() + size_delta.value() * self.impact_per_unit;
            if let Some(p) = Price::new(moved) {
                self.mark = p;
            }
        }
        Ok(exec)
    }
}
