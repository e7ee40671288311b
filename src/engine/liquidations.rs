//! Liquidation: the maintenance-margin test and forced close-out.
//!
//! A liquidation closes every open position the trader holds, at whatever
//! price the AMM gives. The penalty is charged per market on the notional
//! closed and split between the liquidator and the insurance fund.

use super::core::Engine;
use super::results::{EngineError, LiquidationOutcome};
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::liquidation::calculate_liquidation_penalty;
use crate::position::apply_trade;
use crate::types::{Price, Quote, TraderId};

impl Engine {
    /// Maintenance-margin test. Reconciles outstanding funding first, so the
    /// answer reflects payments the trader has accrued but not yet settled.
    /// A trader with no open notional is trivially safe.
    pub fn is_above_maintenance_margin(&mut self, trader: TraderId) -> Result<bool, EngineError> {
        self.update_positions(trader)?;

        let (notional, upnl) = self.aggregate_exposure(trader)?;
        if notional.is_zero() {
            return Ok(true);
        }

        let margin = self
            .normalized_margin(trader)?
            .checked_add(upnl)
            .ok_or(EngineError::ArithmeticOverflow("account value"))?;
        let required = notional
            .checked_mul_ratio(self.config.maintenance_margin_ratio)
            .ok_or(EngineError::ArithmeticOverflow("maintenance requirement"))?;

        Ok(margin >= required)
    }

    /// Force-close all of `trader`'s positions. Fails with
    /// `AboveMaintenanceMargin` if the account is still safe.
    pub fn liquidate(
        &mut self,
        trader: TraderId,
        liquidator: TraderId,
    ) -> Result<LiquidationOutcome, EngineError> {
        if self.is_above_maintenance_margin(trader)? {
            return Err(EngineError::AboveMaintenanceMargin { trader });
        }

        let mut notional_closed = Quote::zero();
        let mut realized_pnl = Quote::zero();
        let mut penalty_total = Quote::zero();
        let mut liquidator_reward = Quote::zero();
        let mut markets_closed = Vec::new();

        for market_id in self.open_markets(trader) {
            let position = self.positions[&(trader, market_id)].clone();
            let market = self.markets.get_mut(&market_id).unwrap();
            let (notional, _) = market
                .amm
                .notional_position_and_unrealized_pnl(position.size, position.open_notional);

            // closing a long sells, closing a short buys; accept any price
            let limit = if position.size.is_long() {
                Price::MIN
            } else {
                Price::MAX
            };
            let exec = market
                .amm
                .execute_trade(position.size.negate(), limit)
                .map_err(|e| EngineError::from_amm(e, trader, market_id))?;

            let applied = apply_trade(&position, position.size.negate(), exec.quote_asset)
                .ok_or(EngineError::ArithmeticOverflow("liquidation close"))?;
            let penalty = calculate_liquidation_penalty(
                notional,
                self.config.liquidation_penalty_ratio,
                self.config.liquidator_share,
            )
            .ok_or(EngineError::ArithmeticOverflow("liquidation penalty"))?;

            // the penalty replaces the trade fee on a forced close: the
            // trader settles realized pnl minus the penalty, nothing else
            let margin_delta = applied
                .realized_pnl
                .checked_sub(penalty.total)
                .ok_or(EngineError::ArithmeticOverflow("liquidation settlement"))?;
            self.margin_ledger
                .apply_to_unit_margin(trader, margin_delta)
                .ok_or(EngineError::ArithmeticOverflow("liquidation settlement"))?;
            self.margin_ledger
                .apply_to_unit_margin(liquidator, penalty.liquidator_reward)
                .ok_or(EngineError::ArithmeticOverflow("liquidator reward"))?;
            self.insurance.deposit(penalty.insurance_contribution);

            self.positions.remove(&(trader, market_id));

            notional_closed = notional_closed.add(notional);
            realized_pnl = realized_pnl.add(applied.realized_pnl);
            penalty_total = penalty_total.add(penalty.total);
            liquidator_reward = liquidator_reward.add(penalty.liquidator_reward);
            markets_closed.push(market_id);

            self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
                trader,
                market: market_id,
                liquidated_size: position.size,
                notional_position: notional,
                penalty: penalty.total,
                liquidator,
            }));
        }

        Ok(LiquidationOutcome {
            trader,
            liquidator,
            notional_closed,
            realized_pnl,
            penalty: penalty_total,
            liquidator_reward,
            markets_closed,
        })
    }
}
