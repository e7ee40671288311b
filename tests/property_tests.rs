//! Property tests for the clearing invariants.
//!
//! These check the relationships that must hold for arbitrary inputs: funding
//! flows net to zero across the two sides before retention, the premium clamp
//! is a true bound, reconciliation is idempotent, and a liquidation always
//! leaves the trader flat and safe.

use clearing_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const HOUR_MS: i64 = 3_600_000;

fn engine_with_market(initial_mark: Decimal) -> (Engine, MarketId) {
    let mut engine = Engine::new(EngineConfig::default(), Box::new(SettableOracle::new()))
        .expect("ordered config");
    engine
        .whitelist_collateral(CollateralAsset::new("USDC", Ratio::one(), 6))
        .unwrap();
    let amm = ReferenceAmm::new(Price::new_unchecked(initial_mark)).with_impact_per_unit(dec!(1));
    engine.set_oracle_price("ETH", Price::new_unchecked(initial_mark));
    let market =
        engine.add_market(MarketConfig::new(MarketId(1), "ETH-PERP", "ETH"), Box::new(amm));
    (engine, market)
}

proptest! {
    /// Funding owed by a long and a short of equal size nets to zero before
    /// the retention skim, for any index movement.
    #[test]
    fn funding_flows_net_to_zero(
        size_raw in 1i64..10_000i64,
        last_raw in -1_000_000i64..1_000_000i64,
        current_raw in -1_000_000i64..1_000_000i64,
    ) {
        let size = Decimal::new(size_raw, 2);
        let last = Decimal::new(last_raw, 4);
        let current = Decimal::new(current_raw, 4);

        let long = pending_funding(BaseSize::new(size), last, current).unwrap();
        let short = pending_funding(BaseSize::new(-size), last, current).unwrap();

        prop_assert!(long.add(short).is_zero());
    }

    /// The clamp is a hard bound when the rate is set and the identity when
    /// the raw premium already sits inside it.
    #[test]
    fn clamp_premium_respects_bound(
        raw_scaled in -10_000_000i64..10_000_000i64,
        oracle_raw in 1i64..1_000_000i64,
        rate_raw in 1i64..1000i64,
    ) {
        let raw = Decimal::new(raw_scaled, 4);
        let oracle = Price::new_unchecked(Decimal::new(oracle_raw, 2));
        let rate = Ratio::new(Decimal::new(rate_raw, 4)).unwrap();

        let clamped = clamp_premium(raw, oracle, rate);
        let bound = oracle.value() * rate.value();

        prop_assert!(clamped.abs() <= bound);
        if raw.abs() <= bound {
            prop_assert_eq!(clamped, raw);
        }
    }

    /// Retention never creates or destroys value: the margin delta and the
    /// skimmed amount always recombine into the full owed flow.
    #[test]
    fn retention_conserves_the_owed_amount(owed_raw in -1_000_000i64..1_000_000i64) {
        let owed = Quote::new(Decimal::new(owed_raw, 3));
        let params = FundingParams::default();

        let applied = apply_retention(owed, &params).unwrap();
        prop_assert_eq!(applied.margin_delta.add(applied.retained), owed.negate());
        prop_assert!(!applied.retained.is_negative());
        // debits pass through whole
        if owed.is_positive() {
            prop_assert!(applied.retained.is_zero());
        }
    }

    /// Reducing a position preserves its side, shrinks it, and releases entry
    /// notional in exact proportion.
    #[test]
    fn reduce_releases_notional_proportionally(
        size_raw in 2i64..10_000i64,
        notional_raw in 1i64..100_000_000i64,
        reduce_pct in 1i64..100i64,
        quote_raw in 1i64..100_000_000i64,
    ) {
        let size = Decimal::new(size_raw, 2);
        let mut position = Position::new(TraderId(1), MarketId(1), Decimal::ZERO);
        position.size = BaseSize::new(size);
        position.open_notional = Quote::new(Decimal::new(notional_raw, 2));

        let delta = -size * Decimal::new(reduce_pct, 2);
        prop_assume!(!delta.is_zero() && delta.abs() < size);

        let applied =
            apply_trade(&position, BaseSize::new(delta), Quote::new(Decimal::new(quote_raw, 2)))
                .unwrap();

        prop_assert!(applied.new_size.is_long());
        prop_assert!(applied.new_size.abs() < size);

        let released = position.open_notional.sub(applied.new_open_notional);
        let expected = position.open_notional.value() * (delta.abs() / size);
        prop_assert_eq!(released.value(), expected);
    }

    /// A second reconciliation with no settlement in between never moves
    /// margin, however many periods have accrued before the first.
    #[test]
    fn reconciliation_is_idempotent(
        periods in 1usize..12usize,
        oracle_raw in 500i64..1500i64,
        size_raw in 1i64..50i64,
    ) {
        let (mut engine, market) = engine_with_market(dec!(1000));
        let bob = TraderId(2);
        engine.add_margin(bob, AssetIdx(0), Quote::new(dec!(1_000_000))).unwrap();
        engine
            .open_position(bob, market, BaseSize::new(Decimal::from(-size_raw)), Price::MIN)
            .unwrap();

        engine.set_oracle_price("ETH", Price::new_unchecked(Decimal::from(oracle_raw)));
        for _ in 0..periods {
            engine.advance_time(HOUR_MS);
            engine.settle_funding(market).unwrap();
        }

        engine.update_positions(bob).unwrap();
        let settled = engine.margin(AssetIdx(0), bob);
        let reserve = engine.insurance_balance();

        engine.update_positions(bob).unwrap();
        prop_assert_eq!(engine.margin(AssetIdx(0), bob), settled);
        prop_assert_eq!(engine.insurance_balance(), reserve);
    }

    /// However deep underwater, a liquidation leaves the trader flat and the
    /// maintenance test passing, and pays the liquidator exactly half the
    /// penalty.
    #[test]
    fn liquidation_leaves_trader_flat_and_safe(
        position_size in 2i64..20i64,
        crash_size in 100i64..500i64,
    ) {
        let (mut engine, market) = engine_with_market(dec!(1000));
        let alice = TraderId(1);
        let keeper = TraderId(9);
        let whale = TraderId(99);

        // deposit pinned just above the trade-time bound so a crash breaches
        // maintenance
        let deposit = Decimal::from(position_size) * dec!(1000) * dec!(0.22);
        engine.add_margin(alice, AssetIdx(0), Quote::new(deposit)).unwrap();
        engine.add_margin(whale, AssetIdx(0), Quote::new(dec!(100_000_000))).unwrap();

        engine
            .open_position(alice, market, BaseSize::new(Decimal::from(position_size)), Price::MAX)
            .unwrap();
        engine
            .open_position(whale, market, BaseSize::new(Decimal::from(-crash_size)), Price::MIN)
            .unwrap();

        if engine.is_above_maintenance_margin(alice).unwrap() {
            // crash too shallow for this size: nothing to check
            return Ok(());
        }

        let keeper_before = engine.margin(AssetIdx(0), keeper);
        let outcome = engine.liquidate(alice, keeper).unwrap();

        prop_assert!(engine.position(alice, market).is_none());
        prop_assert!(engine.is_above_maintenance_margin(alice).unwrap());
        prop_assert_eq!(
            outcome.liquidator_reward,
            outcome.penalty.checked_mul_ratio(Ratio::new(dec!(0.5)).unwrap()).unwrap()
        );
        prop_assert_eq!(
            engine.margin(AssetIdx(0), keeper),
            keeper_before.add(outcome.liquidator_reward)
        );
    }

    /// Opening and fully closing nets to exactly the two fees plus the pnl
    /// realized from the AMM's own impact, nothing else.
    #[test]
    fn open_close_margin_accounting(size_raw in 1i64..100i64) {
        let (mut engine, market) = engine_with_market(dec!(1000));
        let alice = TraderId(1);
        engine.add_margin(alice, AssetIdx(0), Quote::new(dec!(10_000_000))).unwrap();

        let size = Decimal::from(size_raw);
        let opened = engine
            .open_position(alice, market, BaseSize::new(size), Price::MAX)
            .unwrap();
        let closed = engine.close_position(alice, market, Price::MIN).unwrap();

        prop_assert!(engine.position(alice, market).is_none());

        let expected = dec!(10_000_000) - opened.fee.value() - closed.fee.value()
            + closed.realized_pnl.value();
        prop_assert_eq!(engine.margin(AssetIdx(0), alice).value(), expected);
    }
}
