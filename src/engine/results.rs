// 8.0.2: result types and errors for clearing house operations.

use crate::amm::AmmError;
use crate::margin_account::MarginError;
use crate::types::{BaseSize, MarketId, Quote, TraderId};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
pub struct TradeResult {
    pub trader: TraderId,
    pub market: MarketId,
    /// Quote amount moved by the trade.
    pub quote_asset: Quote,
    pub fee: Quote,
    pub realized_pnl: Quote,
    pub new_size: BaseSize,
    pub new_open_notional: Quote,
}

/// Outcome of a due funding settlement. A settlement inside the rate-limit
/// window returns no update at all.
#[derive(Debug, Clone, Copy)]
pub struct FundingUpdate {
    pub market: MarketId,
    /// Clamped premium appended this period.
    pub premium: Decimal,
    pub cumulative_premium_fraction: Decimal,
}

#[derive(Debug, Clone)]
pub struct LiquidationOutcome {
    pub trader: TraderId,
    pub liquidator: TraderId,
    /// Notional closed across all of the trader's markets.
    pub notional_closed: Quote,
    pub realized_pnl: Quote,
    pub penalty: Quote,
    pub liquidator_reward: Quote,
    pub markets_closed: Vec<MarketId>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("{trader:?} has no position in market {market:?}")]
    NoPosition { trader: TraderId, market: MarketId },

    #[error("no oracle price for underlying {0}")]
    NoOraclePrice(String),

    #[error(
        "slippage exceeded for {trader:?} in {market:?}: limit {limit}, execution {execution}"
    )]
    SlippageExceeded {
        trader: TraderId,
        market: MarketId,
        limit: crate::types::Price,
        execution: crate::types::Price,
    },

    #[error("zero-size trade for {trader:?} in {market:?}")]
    ZeroSizeTrade { trader: TraderId, market: MarketId },

    #[error(
        "below minimum allowable margin for {trader:?}: free margin {free_margin} after trade"
    )]
    BelowMinimumAllowableMargin { trader: TraderId, free_margin: Quote },

    #[error("{trader:?} is above maintenance margin, not liquidatable")]
    AboveMaintenanceMargin { trader: TraderId },

    #[error(
        "insufficient margin for {trader:?}: withdrawal of {requested} leaves free margin {free_margin}"
    )]
    InsufficientMargin {
        trader: TraderId,
        requested: Quote,
        free_margin: Quote,
    },

    #[error("margin ledger error: {0}")]
    Margin(#[from] MarginError),

    #[error("min allowable margin ratio must exceed maintenance margin ratio")]
    InvalidMarginOrdering,

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

impl EngineError {
    /// Attach trader/market context to an AMM-side failure.
    pub(super) fn from_amm(err: AmmError, trader: TraderId, market: MarketId) -> Self {
        match err {
            AmmError::SlippageExceeded { limit, execution } => EngineError::SlippageExceeded {
                trader,
                market,
                limit,
                execution,
            },
            AmmError::ZeroSize => EngineError::ZeroSizeTrade { trader, market },
        }
    }
}
