// 8.1: the clearing house. single writer over every market, the margin
// ledger, and the position arena; nothing else is allowed to mutate them.
// trading, funding, and liquidation entry points live in the sibling modules.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::amm::Oracle;
use crate::events::{Event, EventId, EventPayload, MarginAddedEvent, MarginRemovedEvent};
use crate::liquidation::InsuranceFund;
use crate::margin_account::{CollateralAsset, MarginAccount};
use crate::market::{MarketConfig, MarketState};
use crate::position::Position;
use crate::types::{AssetIdx, MarketId, Price, Quote, Timestamp, TraderId};
use std::collections::HashMap;

#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) markets: HashMap<MarketId, MarketState>,
    pub(super) margin_ledger: MarginAccount,
    /// Arena keyed by (trader, market); positions hold no references back
    /// into markets or the ledger.
    pub(super) positions: HashMap<(TraderId, MarketId), Position>,
    pub(super) insurance: InsuranceFund,
    pub(super) oracle: Box<dyn Oracle>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl Engine {
    pub fn new(config: EngineConfig, oracle: Box<dyn Oracle>) -> Result<Self, EngineError> {
        if !config.buffer_is_ordered() {
            return Err(EngineError::InvalidMarginOrdering);
        }
        Ok(Self {
            config,
            markets: HashMap::new(),
            margin_ledger: MarginAccount::new(),
            positions: HashMap::new(),
            insurance: InsuranceFund::new(Quote::zero()),
            oracle,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        })
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = self.current_time.plus_millis(millis);
    }

    pub fn add_market(
        &mut self,
        config: MarketConfig,
        amm: Box<dyn crate::amm::Amm>,
    ) -> MarketId {
        let market_id = config.id;
        let state = MarketState::new(config, amm, self.current_time);
        self.markets.insert(market_id, state);
        market_id
    }

    pub fn market(&self, market_id: MarketId) -> Option<&MarketState> {
        self.markets.get(&market_id)
    }

    pub(super) fn market_or_err(&self, market_id: MarketId) -> Result<&MarketState, EngineError> {
        self.markets
            .get(&market_id)
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    /// Push a fresh spot TWAP into the oracle feed.
    pub fn set_oracle_price(&mut self, asset: &str, price: Price) {
        self.oracle.set_underlying_twap_price(asset, price);
    }

    pub fn whitelist_collateral(&mut self, asset: CollateralAsset) -> Result<AssetIdx, EngineError> {
        Ok(self.margin_ledger.whitelist_collateral(asset)?)
    }

    pub fn position(&self, trader: TraderId, market: MarketId) -> Option<&Position> {
        self.positions.get(&(trader, market))
    }

    /// Markets where the trader currently has exposure.
    pub(super) fn open_markets(&self, trader: TraderId) -> Vec<MarketId> {
        let mut ids: Vec<MarketId> = self
            .positions
            .iter()
            .filter(|((t, _), p)| *t == trader && !p.is_flat())
            .map(|((_, m), _)| *m)
            .collect();
        ids.sort();
        ids
    }

    /// Raw signed balance for one collateral asset.
    pub fn margin(&self, asset: AssetIdx, trader: TraderId) -> Quote {
        self.margin_ledger.margin(asset, trader)
    }

    /// Weighted margin across all collateral. Callers needing
    /// funding-accurate numbers must call `update_positions` first; the
    /// trading/liquidation paths do this internally.
    pub fn normalized_margin(&self, trader: TraderId) -> Result<Quote, EngineError> {
        self.margin_ledger
            .normalized_margin(trader)
            .ok_or(EngineError::ArithmeticOverflow("normalized margin"))
    }

    /// Σ notional and Σ unrealized pnl over the trader's open positions,
    /// valued by each market's AMM.
    pub(super) fn aggregate_exposure(
        &self,
        trader: TraderId,
    ) -> Result<(Quote, Quote), EngineError> {
        let mut notional = Quote::zero();
        let mut upnl = Quote::zero();

        for market_id in self.open_markets(trader) {
            let position = &self.positions[&(trader, market_id)];
            let market = self.market_or_err(market_id)?;
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

        Ok((notional, upnl))
    }

    /// margin + upnl - min_allowable_ratio * notional, against current AMM
    /// prices. Does not reconcile; callers do.
    pub fn free_margin(&self, trader: TraderId) -> Result<Quote, EngineError> {
        let margin = self.normalized_margin(trader)?;
        let (notional, upnl) = self.aggregate_exposure(trader)?;
        let required = notional
            .checked_mul_ratio(self.config.min_allowable_margin_ratio)
            .ok_or(EngineError::ArithmeticOverflow("margin requirement"))?;
        margin
            .checked_add(upnl)
            .and_then(|m| m.checked_sub(required))
            .ok_or(EngineError::ArithmeticOverflow("free margin"))
    }

    /// Deposit collateral. Always safe, no solvency check.
    pub fn add_margin(
        &mut self,
        trader: TraderId,
        asset: AssetIdx,
        amount: Quote,
    ) -> Result<(), EngineError> {
        let new_balance = self.margin_ledger.add_margin(trader, asset, amount)?;
        self.emit_event(EventPayload::MarginAdded(MarginAddedEvent {
            trader,
            asset,
            amount,
            new_balance,
        }));
        Ok(())
    }

    /// Withdraw collateral. Reconciles pending funding first, then requires
    /// the remaining weighted margin to stay above the minimum-allowable
    /// bound for the trader's aggregate open notional.
    pub fn remove_margin(
        &mut self,
        trader: TraderId,
        asset: AssetIdx,
        amount: Quote,
    ) -> Result<(), EngineError> {
        self.update_positions(trader)?;

        let weight = self
            .margin_ledger
            .collateral(asset)
            .ok_or(EngineError::Margin(
                crate::margin_account::MarginError::InvalidCollateral(asset),
            ))?
            .weight;
        let weighted_removal = amount
            .checked_mul_ratio(weight)
            .ok_or(EngineError::ArithmeticOverflow("weighted withdrawal"))?;

        let free_margin = self.free_margin(trader)?;
        if weighted_removal > free_margin {
            return Err(EngineError::InsufficientMargin {
                trader,
                requested: amount,
                free_margin,
            });
        }

        let new_balance = self.margin_ledger.remove_margin(trader, asset, amount)?;
        self.emit_event(EventPayload::MarginRemoved(MarginRemovedEvent {
            trader,
            asset,
            amount,
            new_balance,
        }));
        Ok(())
    }

    pub fn insurance_balance(&self) -> Quote {
        self.insurance.balance
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
