// clearing-core: perpetual futures clearing engine.
// funding is settled lazily: markets append to a cumulative premium index,
// positions reconcile against it on touch. all computation is deterministic
// with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: TraderId, MarketId, BaseSize, Price, Quote, Ratio
//   2.x  amm.rs: Amm and Oracle traits, trade execution contract
//   3.x  margin_account.rs: multi-collateral ledger, normalized margin
//   4.x  position.rs: position struct, increase/reduce/flip/close application
//   5.x  funding.rs: premium fraction, clamp, pending funding, retention
//   6.x  liquidation.rs: penalty split, insurance fund
//   7.x  market.rs: market config + runtime state
//   8.x  engine/: clearing house: margin, trades, funding, liquidations
//   9.x  price_feed.rs: settable oracle + reference AMM (mocked)
//   10.x events.rs: state transition events for audit

pub mod amm;
pub mod engine;
pub mod events;
pub mod funding;
pub mod liquidation;
pub mod margin_account;
pub mod market;
pub mod position;
pub mod price_feed;
pub mod types;

// re exports for convenience
pub use amm::*;
pub use engine::*;
pub use events::*;
pub use funding::*;
pub use liquidation::*;
pub use margin_account::*;
pub use market::*;
pub use position::*;
pub use price_feed::*;
pub use types::*;
