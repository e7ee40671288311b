//! Funding settlement and lazy per-position reconciliation.
//!
//! `settle_funding` is the only writer of a market's cumulative premium
//! fraction and is rate-limited to one append per funding period; calls
//! inside the window are idempotent no-ops. Positions catch up lazily:
//! `update_positions` settles a trader against the current index in O(1) per
//! position no matter how many periods have passed, and every entry point
//! that reads margin calls it first.

use super::core::Engine;
use super::results::{EngineError, FundingUpdate};
use crate::events::{EventPayload, FundingRateUpdatedEvent, FundingReconciledEvent};
use crate::funding::{apply_retention, clamp_premium, pending_funding, premium_fraction};
use crate::types::{MarketId, TraderId};

impl Engine {
    /// Advance a market's funding index. Returns `Ok(None)` while the
    /// rate-limit window is still open; stale settlement is not an error.
    pub fn settle_funding(
        &mut self,
        market_id: MarketId,
    ) -> Result<Option<FundingUpdate>, EngineError> {
        let market = self.market_or_err(market_id)?;
        let params = market.config.funding_params.clone();

        if market.funding_state.within_period(self.current_time, &params) {
            return Ok(None);
        }

        let amm_twap = market.amm.twap_price(params.period_ms);
        let oracle_twap = self
            .oracle
            .underlying_twap_price(&market.config.underlying)
            .ok_or_else(|| EngineError::NoOraclePrice(market.config.underlying.clone()))?;

        let raw = premium_fraction(amm_twap, oracle_twap);
        let premium = clamp_premium(raw, oracle_twap, params.max_funding_rate);

        let market = self.markets.get_mut(&market_id).unwrap();
        let cumulative = market
            .funding_state
            .cumulative_premium_fraction
            .checked_add(premium)
            .ok_or(EngineError::ArithmeticOverflow("cumulative premium"))?;
        market.funding_state.cumulative_premium_fraction = cumulative;
        market.funding_state.last_settlement = self.current_time;

        self.emit_event(EventPayload::FundingRateUpdated(FundingRateUpdatedEvent {
            market: market_id,
            premium,
            cumulative_premium_fraction: cumulative,
        }));

        Ok(Some(FundingUpdate {
            market: market_id,
            premium,
            cumulative_premium_fraction: cumulative,
        }))
    }

    /// Reconcile every position the trader holds against the current indices.
    /// Idempotent: a second call with no intervening settlement is a no-op.
    pub fn update_positions(&mut self, trader: TraderId) -> Result<(), EngineError> {
        let market_ids: Vec<MarketId> = self
            .positions
            .keys()
            .filter(|(t, _)| *t == trader)
            .map(|(_, m)| *m)
            .collect();

        for market_id in market_ids {
            self.reconcile_position(trader, market_id)?;
        }
        Ok(())
    }

    /// Apply the pending premium delta for one position to the trader's
    /// unit-of-account margin. Credits are skimmed per the market's retention
    /// policy with the dust routed to the insurance reserve; debits apply in
    /// full.
    pub(super) fn reconcile_position(
        &mut self,
        trader: TraderId,
        market_id: MarketId,
    ) -> Result<(), EngineError> {
        let Some(position) = self.positions.get(&(trader, market_id)) else {
            return Ok(());
        };

        let market = self.market_or_err(market_id)?;
        let current = market.funding_state.cumulative_premium_fraction;

        if position.last_premium_fraction == current {
            return Ok(());
        }

        let owed = pending_funding(position.size, position.last_premium_fraction, current)
            .ok_or(EngineError::ArithmeticOverflow("pending funding"))?;

        if owed.is_zero() {
            // flat or dust-free position: just stamp the index
            self.positions
                .get_mut(&(trader, market_id))
                .unwrap()
                .last_premium_fraction = current;
            return Ok(());
        }

        let params = &market.config.funding_params;
        let applied = apply_retention(owed, params)
            .ok_or(EngineError::ArithmeticOverflow("funding retention"))?;

        self.margin_ledger
            .apply_to_unit_margin(trader, applied.margin_delta)
            .ok_or(EngineError::ArithmeticOverflow("funding margin delta"))?;
        if applied.retained.is_positive() {
            self.insurance.deposit(applied.retained);
        }

        self.positions
            .get_mut(&(trader, market_id))
            .unwrap()
            .last_premium_fraction = current;

        self.emit_event(EventPayload::FundingReconciled(FundingReconciledEvent {
            trader,
            market: market_id,
            margin_delta: applied.margin_delta,
            retained: applied.retained,
        }));

        Ok(())
    }
}
