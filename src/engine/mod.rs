//! The clearing house. One `Engine` value owns the markets, the margin
//! ledger, the position arena and the insurance fund; every state change
//! goes through a method here.
//!
//! Split by concern:
//!   core         - construction, time, markets, margin in/out, events
//!   funding      - periodic settlement and lazy per-position reconciliation
//!   positions    - trade application with the trade-time margin check
//!   liquidations - maintenance-margin test and forced close-out
//!   config       - ratios and operational knobs
//!   results      - operation outcomes and the error type

mod config;
mod core;
mod funding;
mod liquidations;
mod positions;
mod results;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{EngineError, FundingUpdate, LiquidationOutcome, TradeResult};
