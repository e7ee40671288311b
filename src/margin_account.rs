// 3.0: multi-collateral margin ledger. traders share one margin account across
// every market. each whitelisted collateral asset carries a governance-set
// weight; normalized margin is the weighted sum of a trader's balances,
// recomputed on demand and never cached. asset 0 is the unit of account: it is
// the only balance allowed to go negative, representing debt from funding
// payments and penalties. the solvency checks that gate withdrawals live in
// the clearing house, which must reconcile funding before reading margin.
// 3.1+ has the balance operations.

use crate::types::{AssetIdx, Quote, Ratio, TraderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralAsset {
    pub symbol: String,
    /// Haircut applied when converting a balance into normalized margin.
    /// Set once at whitelisting, read-only afterward.
    pub weight: Ratio,
    pub decimals: u32,
}

impl CollateralAsset {
    pub fn new(symbol: &str, weight: Ratio, decimals: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            weight,
            decimals,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarginAccount {
    collaterals: Vec<CollateralAsset>,
    /// Per-trader balances, index-aligned with `collaterals`.
    balances: HashMap<TraderId, Vec<Decimal>>,
}

impl MarginAccount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collateral asset. The first asset is the unit of account
    /// and must carry weight 1; weights are immutable once registered.
    pub fn whitelist_collateral(
        &mut self,
        asset: CollateralAsset,
    ) -> Result<AssetIdx, MarginError> {
        if self.collaterals.iter().any(|c| c.symbol == asset.symbol) {
            return Err(MarginError::DuplicateCollateral(asset.symbol));
        }
        if self.collaterals.is_empty() && asset.weight != Ratio::one() {
            return Err(MarginError::UnitOfAccountWeight(asset.weight));
        }
        let idx = AssetIdx(self.collaterals.len());
        self.collaterals.push(asset);
        for balances in self.balances.values_mut() {
            balances.push(Decimal::ZERO);
        }
        Ok(idx)
    }

    pub fn collateral(&self, idx: AssetIdx) -> Option<&CollateralAsset> {
        self.collaterals.get(idx.0)
    }

    pub fn collateral_count(&self) -> usize {
        self.collaterals.len()
    }

    fn balances_mut(&mut self, trader: TraderId) -> &mut Vec<Decimal> {
        let n = self.collaterals.len();
        self.balances
            .entry(trader)
            .or_insert_with(|| vec![Decimal::ZERO; n])
    }

    /// Raw signed balance for one asset.
    pub fn margin(&self, idx: AssetIdx, trader: TraderId) -> Quote {
        self.balances
            .get(&trader)
            .and_then(|b| b.get(idx.0))
            .map(|v| Quote::new(*v))
            .unwrap_or_else(Quote::zero)
    }

    /// Weighted aggregation over all balances. Pure: no state is touched, and
    /// callers needing funding-accurate numbers must reconcile first.
    pub fn normalized_margin(&self, trader: TraderId) -> Option<Quote> {
        let Some(balances) = self.balances.get(&trader) else {
            return Some(Quote::zero());
        };
        let mut total = Decimal::ZERO;
        for (balance, asset) in balances.iter().zip(&self.collaterals) {
            let weighted = balance.checked_mul(asset.weight.value())?;
            total = total.checked_add(weighted)?;
        }
        Some(Quote::new(total))
    }

    // 3.1: deposits are always safe; no solvency check.
    pub fn add_margin(
        &mut self,
        trader: TraderId,
        idx: AssetIdx,
        amount: Quote,
    ) -> Result<Quote, MarginError> {
        if idx.0 >= self.collaterals.len() {
            return Err(MarginError::InvalidCollateral(idx));
        }
        if !amount.is_positive() {
            return Err(MarginError::NonPositiveAmount(amount));
        }
        let balance = &mut self.balances_mut(trader)[idx.0];
        *balance += amount.value();
        Ok(Quote::new(*balance))
    }

    // 3.2: balance-level withdrawal. can never push a balance negative, debt
    // arises only from funding and penalties.
    pub fn remove_margin(
        &mut self,
        trader: TraderId,
        idx: AssetIdx,
        amount: Quote,
    ) -> Result<Quote, MarginError> {
        if idx.0 >= self.collaterals.len() {
            return Err(MarginError::InvalidCollateral(idx));
        }
        if !amount.is_positive() {
            return Err(MarginError::NonPositiveAmount(amount));
        }
        let available = self.margin(idx, trader);
        if amount > available {
            return Err(MarginError::InsufficientBalance {
                trader,
                requested: amount,
                available,
            });
        }
        let balance = &mut self.balances_mut(trader)[idx.0];
        *balance -= amount.value();
        Ok(Quote::new(*balance))
    }

    // 3.3: signed adjustment to the unit-of-account balance. funding, realized
    // pnl, fees, and penalties all land here; this is the one path that may
    // leave a trader in debt.
    pub fn apply_to_unit_margin(&mut self, trader: TraderId, delta: Quote) -> Option<Quote> {
        debug_assert!(!self.collaterals.is_empty());
        let balance = &mut self.balances_mut(trader)[0];
        *balance = balance.checked_add(delta.value())?;
        Some(Quote::new(*balance))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MarginError {
    #[error("collateral index {0:?} is not whitelisted")]
    InvalidCollateral(AssetIdx),

    #[error("collateral {0} already whitelisted")]
    DuplicateCollateral(String),

    #[error("unit of account must carry weight 1, got {0}")]
    UnitOfAccountWeight(Ratio),

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Quote),

    #[error("insufficient margin for {trader:?}: requested {requested}, available {available}")]
    InsufficientBalance {
        trader: TraderId,
        requested: Quote,
        available: Quote,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ledger() -> MarginAccount {
        let mut m = MarginAccount::new();
        m.whitelist_collateral(CollateralAsset::new("vUSD", Ratio::one(), 6))
            .unwrap();
        m.whitelist_collateral(CollateralAsset::new(
            "WETH",
            Ratio::new(dec!(0.8)).unwrap(),
            18,
        ))
        .unwrap();
        m
    }

    #[test]
    fn unit_of_account_must_have_full_weight() {
        let mut m = MarginAccount::new();
        let result =
            m.whitelist_collateral(CollateralAsset::new("vUSD", Ratio::new(dec!(0.9)).unwrap(), 6));
        assert!(matches!(result, Err(MarginError::UnitOfAccountWeight(_))));
    }

    #[test]
    fn duplicate_collateral_rejected() {
        let mut m = ledger();
        let result = m.whitelist_collateral(CollateralAsset::new("WETH", Ratio::one(), 18));
        assert!(matches!(result, Err(MarginError::DuplicateCollateral(_))));
    }

    #[test]
    fn normalized_margin_is_weighted_sum() {
        let mut m = ledger();
        let alice = TraderId(1);

        m.add_margin(alice, AssetIdx(0), Quote::new(dec!(1000))).unwrap();
        m.add_margin(alice, AssetIdx(1), Quote::new(dec!(500))).unwrap();

        // 1000 * 1 + 500 * 0.8
        assert_eq!(m.normalized_margin(alice).unwrap().value(), dec!(1400));
    }

    #[test]
    fn unknown_trader_has_zero_margin() {
        let m = ledger();
        assert!(m.normalized_margin(TraderId(99)).unwrap().is_zero());
        assert!(m.margin(AssetIdx(0), TraderId(99)).is_zero());
    }

    #[test]
    fn withdrawal_cannot_overdraw() {
        let mut m = ledger();
        let alice = TraderId(1);
        m.add_margin(alice, AssetIdx(1), Quote::new(dec!(10))).unwrap();

        let result = m.remove_margin(alice, AssetIdx(1), Quote::new(dec!(11)));
        assert!(matches!(result, Err(MarginError::InsufficientBalance { .. })));

        m.remove_margin(alice, AssetIdx(1), Quote::new(dec!(10))).unwrap();
        assert!(m.margin(AssetIdx(1), alice).is_zero());
    }

    #[test]
    fn invalid_collateral_index() {
        let mut m = ledger();
        let result = m.add_margin(TraderId(1), AssetIdx(5), Quote::new(dec!(1)));
        assert!(matches!(result, Err(MarginError::InvalidCollateral(_))));
    }

    #[test]
    fn unit_margin_can_go_negative_via_debits() {
        let mut m = ledger();
        let alice = TraderId(1);
        m.add_margin(alice, AssetIdx(0), Quote::new(dec!(10))).unwrap();

        let balance = m.apply_to_unit_margin(alice, Quote::new(dec!(-25))).unwrap();
        assert_eq!(balance.value(), dec!(-15));
        assert_eq!(m.normalized_margin(alice).unwrap().value(), dec!(-15));
    }

    #[test]
    fn late_whitelisting_extends_existing_accounts() {
        let mut m = ledger();
        let alice = TraderId(1);
        m.add_margin(alice, AssetIdx(0), Quote::new(dec!(10))).unwrap();

        let idx = m
            .whitelist_collateral(CollateralAsset::new(
                "WBTC",
                Ratio::new(dec!(0.7)).unwrap(),
                8,
            ))
            .unwrap();
        assert_eq!(idx, AssetIdx(2));
        m.add_margin(alice, idx, Quote::new(dec!(1))).unwrap();
        assert_eq!(m.normalized_margin(alice).unwrap().value(), dec!(10.7));
    }
}
