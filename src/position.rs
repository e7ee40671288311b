// 4.0: position ledger records. per (trader, market): signed size, the quote
// notional paid/received at entry, and the premium index the position last
// settled against. 4.1+ has the trade application logic: increase, reduce,
// full close, and flip (close-then-reopen, never netting across zero).

use crate::types::{BaseSize, MarketId, Quote, Side, TraderId};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub trader: TraderId,
    pub market: MarketId,
    /// Signed size in base units. Zero size always means zero open notional.
    pub size: BaseSize,
    /// Quote-asset entry notional, never negative.
    pub open_notional: Quote,
    /// Index value this position last settled funding against. Updated only
    /// by reconciliation.
    pub last_premium_fraction: Decimal,
}

impl Position {
    pub fn new(trader: TraderId, market: MarketId, premium_fraction: Decimal) -> Self {
        Self {
            trader,
            market,
            size: BaseSize::zero(),
            open_notional: Quote::zero(),
            last_premium_fraction: premium_fraction,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }

    pub fn side(&self) -> Option<Side> {
        self.size.side()
    }
}

/// Result of applying one trade to a position.
#[derive(Debug, Clone, Copy)]
pub struct TradeApplication {
    pub new_size: BaseSize,
    pub new_open_notional: Quote,
    /// PnL realized by the reducing/closing portion of the trade.
    pub realized_pnl: Quote,
}

// 4.1: dispatch on how the trade interacts with the existing exposure.
// quote_asset is the positive quote amount the AMM moved for size_delta.
pub fn apply_trade(
    position: &Position,
    size_delta: BaseSize,
    quote_asset: Quote,
) -> Option<TradeApplication> {
    debug_assert!(!size_delta.is_zero());
    debug_assert!(!quote_asset.is_negative());

    let same_direction = position.is_flat()
        || position.size.value().signum() == size_delta.value().signum();

    if same_direction {
        return apply_increase(position, size_delta, quote_asset);
    }

    if size_delta.abs() < position.size.abs() {
        apply_reduce(position, size_delta, quote_asset)
    } else if size_delta.abs() == position.size.abs() {
        apply_full_close(position, quote_asset)
    } else {
        apply_flip(position, size_delta, quote_asset)
    }
}

// 4.2: same-direction trade. exposure and entry notional both grow.
fn apply_increase(
    position: &Position,
    size_delta: BaseSize,
    quote_asset: Quote,
) -> Option<TradeApplication> {
    Some(TradeApplication {
        new_size: position.size.checked_add(size_delta.value())?,
        new_open_notional: position.open_notional.checked_add(quote_asset)?,
        realized_pnl: Quote::zero(),
    })
}

// 4.3: opposite-direction trade smaller than the position. releases entry
// notional proportionally and realizes the difference against the fill.
fn apply_reduce(
    position: &Position,
    size_delta: BaseSize,
    quote_asset: Quote,
) -> Option<TradeApplication> {
    let fraction = size_delta.abs().checked_div(position.size.abs())?;
    let released = Quote::new(position.open_notional.value().checked_mul(fraction)?);

    let realized_pnl = if position.size.is_long() {
        quote_asset.checked_sub(released)?
    } else {
        released.checked_sub(quote_asset)?
    };

    Some(TradeApplication {
        new_size: position.size.checked_add(size_delta.value())?,
        new_open_notional: position.open_notional.checked_sub(released)?,
        realized_pnl,
    })
}

fn apply_full_close(position: &Position, quote_asset: Quote) -> Option<TradeApplication> {
    let realized_pnl = if position.size.is_long() {
        quote_asset.checked_sub(position.open_notional)?
    } else {
        position.open_notional.checked_sub(quote_asset)?
    };

    Some(TradeApplication {
        new_size: BaseSize::zero(),
        new_open_notional: Quote::zero(),
        realized_pnl,
    })
}

// 4.4: trade crosses through zero. the old position is closed at its share of
// the executed quote and the remainder opens fresh, with entry notional
// pro-rated from the same fill. no netting across the sign change.
fn apply_flip(
    position: &Position,
    size_delta: BaseSize,
    quote_asset: Quote,
) -> Option<TradeApplication> {
    let close_fraction = position.size.abs().checked_div(size_delta.abs())?;
    let close_quote = Quote::new(quote_asset.value().checked_mul(close_fraction)?);

    let closed = apply_full_close(position, close_quote)?;

    Some(TradeApplication {
        new_size: position.size.checked_add(size_delta.value())?,
        new_open_notional: quote_asset.checked_sub(close_quote)?,
        realized_pnl: closed.realized_pnl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn long_position() -> Position {
        let mut p = Position::new(TraderId(1), MarketId(1), Decimal::ZERO);
        p.size = BaseSize::new(dec!(10));
        p.open_notional = Quote::new(dec!(1000)); // entry 100
        p
    }

    fn short_position() -> Position {
        let mut p = Position::new(TraderId(1), MarketId(1), Decimal::ZERO);
        p.size = BaseSize::new(dec!(-10));
        p.open_notional = Quote::new(dec!(1000));
        p
    }

    #[test]
    fn flat_position_invariant() {
        let p = Position::new(TraderId(1), MarketId(1), Decimal::ZERO);
        assert!(p.is_flat());
        assert!(p.open_notional.is_zero());
    }

    #[test]
    fn increase_accumulates_notional() {
        let p = long_position();
        let applied = apply_trade(&p, BaseSize::new(dec!(5)), Quote::new(dec!(550))).unwrap();

        assert_eq!(applied.new_size.value(), dec!(15));
        assert_eq!(applied.new_open_notional.value(), dec!(1550));
        assert!(applied.realized_pnl.is_zero());
    }

    #[test]
    fn reduce_long_realizes_gain() {
        let p = long_position();
        // sell 4 units at 110
        let applied = apply_trade(&p, BaseSize::new(dec!(-4)), Quote::new(dec!(440))).unwrap();

        assert_eq!(applied.new_size.value(), dec!(6));
        assert_eq!(applied.new_open_notional.value(), dec!(600));
        assert_eq!(applied.realized_pnl.value(), dec!(40));
    }

    #[test]
    fn reduce_short_realizes_gain() {
        let p = short_position();
        // buy back 4 units at 90
        let applied = apply_trade(&p, BaseSize::new(dec!(4)), Quote::new(dec!(360))).unwrap();

        assert_eq!(applied.new_size.value(), dec!(-6));
        assert_eq!(applied.new_open_notional.value(), dec!(600));
        assert_eq!(applied.realized_pnl.value(), dec!(40));
    }

    #[test]
    fn full_close_zeroes_notional() {
        let p = long_position();
        let applied = apply_trade(&p, BaseSize::new(dec!(-10)), Quote::new(dec!(1100))).unwrap();

        assert!(applied.new_size.is_zero());
        assert!(applied.new_open_notional.is_zero());
        assert_eq!(applied.realized_pnl.value(), dec!(100));
    }

    #[test]
    fn flip_long_to_short() {
        let mut p = long_position();
        p.size = BaseSize::new(dec!(2));
        p.open_notional = Quote::new(dec!(200));

        // sell 5 at 110: 2 close the long, 3 open a short
        let applied = apply_trade(&p, BaseSize::new(dec!(-5)), Quote::new(dec!(550))).unwrap();

        assert_eq!(applied.new_size.value(), dec!(-3));
        // closing quote = 550 * 2/5 = 220, realized = 220 - 200
        assert_eq!(applied.realized_pnl.value(), dec!(20));
        // fresh entry notional for the short remainder
        assert_eq!(applied.new_open_notional.value(), dec!(330));
    }

    #[test]
    fn flip_short_to_long() {
        let mut p = short_position();
        p.size = BaseSize::new(dec!(-2));
        p.open_notional = Quote::new(dec!(200));

        // buy 5 at 90
        let applied = apply_trade(&p, BaseSize::new(dec!(5)), Quote::new(dec!(450))).unwrap();

        assert_eq!(applied.new_size.value(), dec!(3));
        // closing quote = 450 * 2/5 = 180, realized = 200 - 180
        assert_eq!(applied.realized_pnl.value(), dec!(20));
        assert_eq!(applied.new_open_notional.value(), dec!(270));
    }
}
