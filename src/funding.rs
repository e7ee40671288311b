// 5.0: funding. every period the divergence between the AMM's mark TWAP and the
// spot oracle TWAP is appended to a running index; positions settle against the
// index lazily, whenever they are next touched. 5.0 has the params/state
// structs, 5.1+ the premium and settlement math.

use crate::types::{BaseSize, Price, Quote, Ratio, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The raw mark/oracle TWAP gap reads as a daily rate; divide by 24 for the
/// hourly premium. Funding period is fixed at one hour in this design.
pub const DAILY_TO_HOURLY: Decimal = dec!(24);

/// Which side of a funding flow the retention skim applies to.
///
/// The skim guards against index-manipulation griefing via many tiny
/// positions. Debits are always collected in full; the open policy question
/// is whether credits are skimmed, so it is explicit configuration here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionScope {
    /// Skim only amounts credited to the trader (the defensive default).
    CreditsOnly,
    /// No skim at all.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingParams {
    /// Minimum wall-clock gap between two settlements.
    pub period_ms: i64,
    /// Per-period clamp on the premium as a fraction of the oracle TWAP.
    /// Zero disables the clamp.
    pub max_funding_rate: Ratio,
    /// Fraction of funding credits retained for the protocol reserve.
    pub retention_ratio: Ratio,
    pub retention_scope: RetentionScope,
}

impl Default for FundingParams {
    fn default() -> Self {
        Self {
            period_ms: 3_600_000,
            max_funding_rate: Ratio::zero(),
            retention_ratio: Ratio::new(dec!(0.001)).unwrap(),
            retention_scope: RetentionScope::CreditsOnly,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingState {
    /// Running sum of applied per-period premia, in quote units per base unit.
    /// Only ever appended to, and only inside a settlement call.
    pub cumulative_premium_fraction: Decimal,
    pub last_settlement: Timestamp,
}

impl FundingState {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            cumulative_premium_fraction: Decimal::ZERO,
            last_settlement: timestamp,
        }
    }

    /// True while the rate limit window is still open.
    pub fn within_period(&self, now: Timestamp, params: &FundingParams) -> bool {
        now.as_millis() < self.last_settlement.as_millis() + params.period_ms
    }
}

// 5.1: raw hourly premium. positive = perp trades rich = longs pay shorts.
pub fn premium_fraction(amm_twap: Price, oracle_twap: Price) -> Decimal {
    (amm_twap.value() - oracle_twap.value()) / DAILY_TO_HOURLY
}

// 5.2: clamp to +/- oracle_twap * max_rate. a zero rate means uncapped.
pub fn clamp_premium(raw: Decimal, oracle_twap: Price, max_rate: Ratio) -> Decimal {
    if max_rate.is_zero() {
        return raw;
    }
    let bound = oracle_twap.value() * max_rate.value();
    raw.max(-bound).min(bound)
}

// 5.3: funding owed by a position since it last settled against the index.
// positive premium delta times positive (long) size = the long pays.
pub fn pending_funding(
    size: BaseSize,
    last_applied: Decimal,
    current: Decimal,
) -> Option<Quote> {
    let delta = current.checked_sub(last_applied)?;
    size.checked_mul_per_unit(delta)
}

/// Outcome of applying a funding payment to a margin balance.
#[derive(Debug, Clone, Copy)]
pub struct FundingApplication {
    /// Signed amount applied to the trader's asset-0 margin.
    pub margin_delta: Quote,
    /// Skimmed dust routed to the protocol reserve.
    pub retained: Quote,
}

// 5.4: turn the owed amount into a margin delta, skimming credits per policy.
pub fn apply_retention(owed: Quote, params: &FundingParams) -> Option<FundingApplication> {
    let credit = owed.negate();
    if credit.is_positive() && params.retention_scope == RetentionScope::CreditsOnly {
        let retained = credit.checked_mul_ratio(params.retention_ratio)?;
        let margin_delta = credit.checked_sub(retained)?;
        Some(FundingApplication {
            margin_delta,
            retained,
        })
    } else {
        Some(FundingApplication {
            margin_delta: credit,
            retained: Quote::zero(),
        })
    }
}
