//! External collaborator contracts: the pricing AMM and the spot oracle.
//!
//! The clearing engine never prices anything itself. Each market delegates mark
//! price, TWAP, notional/PnL valuation, and trade execution to an [`Amm`]
//! implementation, and reads spot via an [`Oracle`]. The bonding-curve math
//! behind these calls lives outside this crate.

use crate::types::{BaseSize, Price, Quote};

// 2.0: result and error surface shared by both trade entry points.

/// Result of pricing or executing a trade on the AMM.
#[derive(Debug, Clone, Copy)]
pub struct TradeExec {
    /// Quote-asset amount moved by the trade (always positive).
    pub quote_asset: Quote,
    /// Trade fee charged by the venue.
    pub fee: Quote,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AmmError {
    #[error("slippage exceeded: limit {limit}, execution price {execution}")]
    SlippageExceeded { limit: Price, execution: Price },

    #[error("zero-size trade")]
    ZeroSize,
}

// 2.1: the pricing/execution seam.

/// Per-market virtual AMM, consumed but not implemented by the core.
///
/// `quote_trade` and `execute_trade` are the same pricing split in two: the
/// engine quotes first, runs every margin check against the quoted numbers,
/// and only calls `execute_trade` once the whole operation is known to go
/// through. A failed trade therefore never touches curve state.
pub trait Amm: std::fmt::Debug {
    fn mark_price(&self) -> Price;

    /// Time-weighted mark price over the trailing `window_ms`.
    fn twap_price(&self, window_ms: i64) -> Price;

    /// Value a position at the current curve: (notional position, unrealized pnl).
    fn notional_position_and_unrealized_pnl(
        &self,
        size: BaseSize,
        open_notional: Quote,
    ) -> (Quote, Quote);

    /// Price `size_delta` without committing curve state.
    fn quote_trade(&self, size_delta: BaseSize, price_limit: Price) -> Result<TradeExec, AmmError>;

    /// Commit `size_delta` to the curve. Must price identically to a
    /// `quote_trade` issued in the same engine operation.
    fn execute_trade(
        &mut self,
        size_delta: BaseSize,
        price_limit: Price,
    ) -> Result<TradeExec, AmmError>;
}

// 2.2: spot side of the funding premium.

/// Spot price source for funding settlement. Feeds are push-based: the
/// adapter ingests updates from its transport, the engine only reads.
pub trait Oracle: std::fmt::Debug {
    /// Underlying TWAP for `asset`, or None if the feed has no price yet.
    fn underlying_twap_price(&self, asset: &str) -> Option<Price>;

    /// Ingest a fresh TWAP observation for `asset`.
    fn set_underlying_twap_price(&mut self, asset: &str, price: Price);
}

// 2.3: valuation shared by every curve implementation: notional is size at
// mark, unrealized pnl is the difference against entry notional.
pub fn value_position(
    size: BaseSize,
    open_notional: Quote,
    mark_price: Price,
) -> (Quote, Quote) {
    if size.is_zero() {
        return (Quote::zero(), Quote::zero());
    }
    let notional = Quote::new(size.abs() * mark_price.value());
    let pnl = if size.is_long() {
        notional.sub(open_notional)
    } else {
        open_notional.sub(notional)
    };
    (notional, pnl)
}

/// Price-limit check: buys must not pay above the limit, sells must not
/// receive below it.
pub fn limit_violated(size_delta: BaseSize, execution: Price, limit: Price) -> bool {
    if size_delta.is_long() {
        execution.value() > limit.value()
    } else {
        execution.value() < limit.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn long_position_valuation() {
        let (notional, pnl) = value_position(
            BaseSize::new(dec!(2)),
            Quote::new(dec!(1000)),
            Price::new_unchecked(dec!(550)),
        );
        assert_eq!(notional.value(), dec!(1100));
        assert_eq!(pnl.value(), dec!(100));
    }

    #[test]
    fn short_position_valuation() {
        let (notional, pnl) = value_position(
            BaseSize::new(dec!(-2)),
            Quote::new(dec!(1000)),
            Price::new_unchecked(dec!(550)),
        );
        assert_eq!(notional.value(), dec!(1100));
        assert_eq!(pnl.value(), dec!(-100));
    }

    #[test]
    fn flat_position_has_no_value() {
        let (notional, pnl) = value_position(
            BaseSize::zero(),
            Quote::zero(),
            Price::new_unchecked(dec!(550)),
        );
        assert!(notional.is_zero());
        assert!(pnl.is_zero());
    }

    #[test]
    fn limit_direction() {
        let exec = Price::new_unchecked(dec!(100));
        // buyer caps the price they pay
        assert!(limit_violated(BaseSize::new(dec!(1)), exec, Price::new_unchecked(dec!(99))));
        assert!(!limit_violated(BaseSize::new(dec!(1)), exec, Price::new_unchecked(dec!(101))));
        // seller floors the price they receive
        assert!(limit_violated(BaseSize::new(dec!(-1)), exec, Price::new_unchecked(dec!(101))));
        assert!(!limit_violated(BaseSize::new(dec!(-1)), exec, Price::new_unchecked(dec!(99))));
    }
}
