// 6.0: liquidation penalty math and the protocol insurance reserve. when an
// undercollateralized position is unwound, the trader pays a penalty
// proportional to the closed notional. half rewards the caller who triggered
// the liquidation, half is retained by the insurance reserve. the reserve also
// collects trade fees and funding retention dust.

use crate::types::{Quote, Ratio};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct LiquidationPenalty {
    pub total: Quote,
    pub liquidator_reward: Quote,
    pub insurance_contribution: Quote,
}

// 6.1: penalty = notional * penalty_ratio, split by liquidator_share.
// None on overflow.
pub fn calculate_liquidation_penalty(
    notional_position: Quote,
    penalty_ratio: Ratio,
    liquidator_share: Ratio,
) -> Option<LiquidationPenalty> {
    let total = notional_position.checked_mul_ratio(penalty_ratio)?;
    let liquidator_reward = total.checked_mul_ratio(liquidator_share)?;
    let insurance_contribution = total.checked_sub(liquidator_reward)?;

    Some(LiquidationPenalty {
        total,
        liquidator_reward,
        insurance_contribution,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceFund {
    pub balance: Quote,
    pub total_deposits: Quote,
}

impl InsuranceFund {
    pub fn new(initial_balance: Quote) -> Self {
        Self {
            balance: initial_balance,
            total_deposits: initial_balance,
        }
    }

    pub fn deposit(&mut self, amount: Quote) {
        self.balance = self.balance.add(amount);
        self.total_deposits = self.total_deposits.add(amount);
    }
}
