// 10.0: every state change produces an event. used for audit trails and for
// off-chain indexers; the engine keeps a bounded in-memory log.

use crate::types::{AssetIdx, BaseSize, MarketId, Quote, TraderId, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // margin ledger events
    MarginAdded(MarginAddedEvent),
    MarginRemoved(MarginRemovedEvent),

    // trading events
    PositionUpdated(PositionUpdatedEvent),

    // funding events
    FundingRateUpdated(FundingRateUpdatedEvent),
    FundingReconciled(FundingReconciledEvent),

    // risk events
    PositionLiquidated(PositionLiquidatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginAddedEvent {
    pub trader: TraderId,
    pub asset: AssetIdx,
    pub amount: Quote,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginRemovedEvent {
    pub trader: TraderId,
    pub asset: AssetIdx,
    pub amount: Quote,
    pub new_balance: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdatedEvent {
    pub trader: TraderId,
    pub market: MarketId,
    pub old_size: BaseSize,
    pub new_size: BaseSize,
    pub new_open_notional: Quote,
    pub realized_pnl: Quote,
    pub fee: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRateUpdatedEvent {
    pub market: MarketId,
    /// The clamped premium applied this period.
    pub premium: Decimal,
    pub cumulative_premium_fraction: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingReconciledEvent {
    pub trader: TraderId,
    pub market: MarketId,
    /// Signed amount applied to the trader's unit-of-account margin.
    pub margin_delta: Quote,
    /// Credit dust skimmed to the insurance reserve.
    pub retained: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub trader: TraderId,
    pub market: MarketId,
    pub liquidated_size: BaseSize,
    pub notional_position: Quote,
    pub penalty: Quote,
    pub liquidator: TraderId,
}
