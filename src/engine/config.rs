//! Clearing house configuration.

use crate::types::Ratio;
use rust_decimal_macros::dec;

/// Protocol-wide risk parameters.
///
/// `min_allowable_margin_ratio` gates new risk at trade time and must sit
/// strictly above `maintenance_margin_ratio`, which gates liquidation. The gap
/// is the buffer zone where a trader can no longer add risk but is not yet
/// liquidatable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub maintenance_margin_ratio: Ratio,
    pub min_allowable_margin_ratio: Ratio,
    pub liquidation_penalty_ratio: Ratio,
    /// Share of the penalty credited to the caller of a liquidation.
    pub liquidator_share: Ratio,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Enable verbose logging.
    pub verbose: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            maintenance_margin_ratio: Ratio::new(dec!(0.1)).unwrap(),
            min_allowable_margin_ratio: Ratio::new(dec!(0.2)).unwrap(),
            liquidation_penalty_ratio: Ratio::new(dec!(0.05)).unwrap(),
            liquidator_share: Ratio::new(dec!(0.5)).unwrap(),
            max_events: 100_000,
            verbose: false,
        }
    }
}

impl EngineConfig {
    pub fn buffer_is_ordered(&self) -> bool {
        self.min_allowable_margin_ratio > self.maintenance_margin_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buffer_ordering() {
        let config = EngineConfig::default();
        assert!(config.buffer_is_ordered());
    }
}
