//! Position lifecycle: open, increase, reduce, flip, close.
//!
//! Every trade is all-or-nothing. The AMM is quoted first, all margin checks
//! run against the quoted numbers and a scratch copy of the position, and
//! only then is anything committed: curve state, margin, position record.

use super::core::Engine;
use super::results::{EngineError, TradeResult};
use crate::events::{EventPayload, PositionUpdatedEvent};
use crate::position::{apply_trade, Position};
use crate::types::{BaseSize, MarketId, Price, Quote, TraderId};

impl Engine {
    /// Trade `size_delta` against the market's AMM. Fails with
    /// `SlippageExceeded` if the execution price violates `price_limit`, and
    /// with `BelowMinimumAllowableMargin` if the post-trade margin would not
    /// support the post-trade notional at the trade-time bound.
    pub fn open_position(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        size_delta: BaseSize,
        price_limit: Price,
    ) -> Result<TradeResult, EngineError> {
        if size_delta.is_zero() {
            return Err(EngineError::ZeroSizeTrade {
                trader,
                market: market_id,
            });
        }
        self.market_or_err(market_id)?;

        // funding must be settled into margin before any margin math
        self.reconcile_position(trader, market_id)?;

        let current_index = self
            .market_or_err(market_id)?
            .funding_state
            .cumulative_premium_fraction;

        let position = self
            .positions
            .get(&(trader, market_id))
            .cloned()
            .unwrap_or_else(|| Position::new(trader, market_id, current_index));

        // price the trade without touching curve state
        let market = self.market_or_err(market_id)?;
        let exec = market
            .amm
            .quote_trade(size_delta, price_limit)
            .map_err(|e| EngineError::from_amm(e, trader, market_id))?;

        let applied = apply_trade(&position, size_delta, exec.quote_asset)
            .ok_or(EngineError::ArithmeticOverflow("trade application"))?;

        let margin_delta = applied
            .realized_pnl
            .checked_sub(exec.fee)
            .ok_or(EngineError::ArithmeticOverflow("trade margin delta"))?;

        // post-trade margin check over all markets, with this market's
        // exposure replaced by the prospective position
        let free_margin = self.free_margin_with_override(
            trader,
            market_id,
            applied.new_size,
            applied.new_open_notional,
            margin_delta,
        )?;
        if free_margin.is_negative() {
            return Err(EngineError::BelowMinimumAllowableMargin {
                trader,
                free_margin,
            });
        }

        // commit: curve first (priced identically to the quote), then ledger
        let market = self.markets.get_mut(&market_id).unwrap();
        let exec = market
            .amm
            .execute_trade(size_delta, price_limit)
            .map_err(|e| EngineError::from_amm(e, trader, market_id))?;

        self.margin_ledger
            .apply_to_unit_margin(trader, margin_delta)
            .ok_or(EngineError::ArithmeticOverflow("margin commit"))?;
        self.insurance.deposit(exec.fee);

        let old_size = position.size;
        if applied.new_size.is_zero() {
            self.positions.remove(&(trader, market_id));
        } else {
            let mut updated = position;
            updated.size = applied.new_size;
            updated.open_notional = applied.new_open_notional;
            updated.last_premium_fraction = current_index;
            self.positions.insert((trader, market_id), updated);
        }

        self.emit_event(EventPayload::PositionUpdated(PositionUpdatedEvent {
            trader,
            market: market_id,
            old_size,
            new_size: applied.new_size,
            new_open_notional: applied.new_open_notional,
            realized_pnl: applied.realized_pnl,
            fee: exec.fee,
        }));

        Ok(TradeResult {
            trader,
            market: market_id,
            quote_asset: exec.quote_asset,
            fee: exec.fee,
            realized_pnl: applied.realized_pnl,
            new_size: applied.new_size,
            new_open_notional: applied.new_open_notional,
        })
    }

    /// Fully close the trader's position in `market_id`.
    pub fn close_position(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
        price_limit: Price,
    ) -> Result<TradeResult, EngineError> {
        let size = self
            .positions
            .get(&(trader, market_id))
            .filter(|p| !p.is_flat())
            .map(|p| p.size)
            .ok_or(EngineError::NoPosition {
                trader,
                market: market_id,
            })?;

        self.open_position(trader, market_id, size.negate(), price_limit)
    }

    /// Free margin with one market's exposure swapped for a prospective
    /// position and the unit margin shifted by the trade's pnl/fee delta.
    fn free_margin_with_override(
        &self,
        trader: TraderId,
        market_id: MarketId,
        new_size: BaseSize,
        new_open_notional: Quote,
        margin_delta: Quote,
    ) -> Result<Quote, EngineError> {
        let margin = self
            .normalized_margin(trader)?
            .checked_add(margin_delta)
            .ok_or(EngineError::ArithmeticOverflow("prospective margin"))?;

        let mut notional = Quote::zero();
        let mut upnl = Quote::zero();
        for id in self.open_markets(trader) {
            if id == market_id {
                continue;
            }
            let position = &self.positions[&(trader, id)];
            let market = self.market_or_err(id)?;
            let (n, p) = market
                .amm
                .notional_position_and_unrealized_pnl(position.size, position.open_notional);
            notional = notional
                .checked_add(n)
                .ok_or(EngineError::ArithmeticOverflow("aggregate notional"))?;
            upnl = upnl
                .checked_add(p)
                .ok_or(EngineError::ArithmeticOverflow("aggregate pnl"))?;
        }

        let market = self.market_or_err(market_id)?;
        let (n, p) = market
            .amm
            .notional_position_and_unrealized_pnl(new_size, new_open_notional);
        notional = notional
            .checked_add(n)
            .ok_or(EngineError::ArithmeticOverflow("aggregate notional"))?;
        upnl = upnl
            .checked_add(p)
            .ok_or(EngineError::ArithmeticOverflow("aggregate pnl"))?;

        let required = notional
            .checked_mul_ratio(self.config.min_allowable_margin_ratio)
            .ok_or(EngineError::ArithmeticOverflow("margin requirement"))?;
        margin
            .checked_add(upnl)
            .and_then(|m| m.checked_sub(required))
            .ok_or(EngineError::ArithmeticOverflow("free margin"))
    }
}
