//! Perpetual Clearing House Simulation.
//!
//! Demonstrates the full clearing lifecycle: multi-collateral deposits,
//! trading against the reference AMM, lazy funding settlement against the
//! cumulative premium index, and liquidation.

use clearing_core::*;
use rust_decimal_macros::dec;

fn main() {
    println!("Perpetual Clearing House Simulation");
    println!("Cross-Collateral Margin, Lazy Funding, Liquidation\n");

    scenario_1_collateral_and_margin();
    scenario_2_trade_lifecycle();
    scenario_3_funding_settlement();
    scenario_4_funding_flip();
    scenario_5_liquidation();

    println!("\nAll simulations completed successfully.");
}

fn new_engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default(), Box::new(SettableOracle::new()))
        .expect("default config is ordered");
    engine
        .whitelist_collateral(CollateralAsset::new("USDC", Ratio::one(), 6))
        .expect("unit collateral");
    engine
}

fn add_eth_market(engine: &mut Engine, initial_mark: rust_decimal::Decimal) -> MarketId {
    let amm = ReferenceAmm::new(Price::new_unchecked(initial_mark)).with_impact_per_unit(dec!(1));
    engine.set_oracle_price("ETH", Price::new_unchecked(initial_mark));
    engine.add_market(MarketConfig::new(MarketId(1), "ETH-PERP", "ETH"), Box::new(amm))
}

/// Multi-collateral deposits and the weighted margin view.
fn scenario_1_collateral_and_margin() {
    println!("Scenario 1: Collateral and Margin\n");

    let mut engine = new_engine();
    let weth = engine
        .whitelist_collateral(CollateralAsset::new("WETH", Ratio::new(dec!(0.8)).unwrap(), 18))
        .unwrap();

    let alice = TraderId(1);
    engine.add_margin(alice, AssetIdx(0), Quote::new(dec!(2000))).unwrap();
    engine.add_margin(alice, weth, Quote::new(dec!(1000))).unwrap();

    println!("  Alice deposits 2,000 USDC and 1,000 WETH (weight 0.8)");
    println!("  Normalized margin: {}", engine.normalized_margin(alice).unwrap());

    engine.remove_margin(alice, weth, Quote::new(dec!(500))).unwrap();
    println!("  After withdrawing 500 WETH: {}\n", engine.normalized_margin(alice).unwrap());
}

/// Open, increase, reduce, and close a position.
fn scenario_2_trade_lifecycle() {
    println!("Scenario 2: Trade Lifecycle\n");

    let mut engine = new_engine();
    let market = add_eth_market(&mut engine, dec!(1000));

    let alice = TraderId(1);
    engine.add_margin(alice, AssetIdx(0), Quote::new(dec!(5000))).unwrap();

    println!("  Opening 2 ETH long...");
    let result = engine
        .open_position(alice, market, BaseSize::new(dec!(2)), Price::new_unchecked(dec!(1100)))
        .unwrap();
    println!("  Position: {} ETH, notional {}", result.new_size, result.new_open_notional);

    println!("  Adding 1 ETH...");
    let result = engine
        .open_position(alice, market, BaseSize::new(dec!(1)), Price::new_unchecked(dec!(1100)))
        .unwrap();
    println!("  Position: {} ETH, notional {}", result.new_size, result.new_open_notional);

    println!("  Reducing by 1 ETH...");
    let result = engine
        .open_position(alice, market, BaseSize::new(dec!(-1)), Price::new_unchecked(dec!(900)))
        .unwrap();
    println!("  Position: {} ETH, realized pnl {}", result.new_size, result.realized_pnl);

    println!("  Closing remaining...");
    let result = engine.close_position(alice, market, Price::new_unchecked(dec!(900))).unwrap();
    println!(
        "  Flat, realized pnl {}, unit margin {}\n",
        result.realized_pnl,
        engine.margin(AssetIdx(0), alice)
    );
}

/// One funding period where the perp trades rich: the long pays, the short
/// receives (minus the 0.1% retention skim).
fn scenario_3_funding_settlement() {
    println!("Scenario 3: Funding Settlement\n");

    let mut engine = new_engine();
    let market = add_eth_market(&mut engine, dec!(1000));

    let alice = TraderId(1);
    let bob = TraderId(2);
    engine.add_margin(alice, AssetIdx(0), Quote::new(dec!(5000))).unwrap();
    engine.add_margin(bob, AssetIdx(0), Quote::new(dec!(5000))).unwrap();

    engine
        .open_position(alice, market, BaseSize::new(dec!(5)), Price::new_unchecked(dec!(1100)))
        .unwrap();
    engine
        .open_position(bob, market, BaseSize::new(dec!(-5)), Price::new_unchecked(dec!(900)))
        .unwrap();

    // spot trades well below the perp
    engine.set_oracle_price("ETH", Price::new_unchecked(dec!(900)));
    engine.advance_time(3_600_000);

    let update = engine.settle_funding(market).unwrap().unwrap();
    println!("  Premium this period: {}", update.premium);
    println!("  Cumulative index: {}", update.cumulative_premium_fraction);

    let alice_before = engine.margin(AssetIdx(0), alice);
    let bob_before = engine.margin(AssetIdx(0), bob);
    engine.update_positions(alice).unwrap();
    engine.update_positions(bob).unwrap();

    println!(
        "  Long margin: {} -> {}",
        alice_before,
        engine.margin(AssetIdx(0), alice)
    );
    println!(
        "  Short margin: {} -> {}",
        bob_before,
        engine.margin(AssetIdx(0), bob)
    );
    println!("  Insurance reserve: {}\n", engine.insurance_balance());
}

/// The premium flips sign when spot trades above the perp.
fn scenario_4_funding_flip() {
    println!("Scenario 4: Funding Flip\n");

    let mut engine = new_engine();
    let market = add_eth_market(&mut engine, dec!(1000));

    let bob = TraderId(2);
    engine.add_margin(bob, AssetIdx(0), Quote::new(dec!(5000))).unwrap();
    engine
        .open_position(bob, market, BaseSize::new(dec!(-5)), Price::new_unchecked(dec!(900)))
        .unwrap();

    engine.set_oracle_price("ETH", Price::new_unchecked(dec!(900)));
    engine.advance_time(3_600_000);
    let update = engine.settle_funding(market).unwrap().unwrap();
    println!("  Period 1 premium: {} (short receives)", update.premium);

    engine.set_oracle_price("ETH", Price::new_unchecked(dec!(1100)));
    engine.advance_time(3_600_000);
    let update = engine.settle_funding(market).unwrap().unwrap();
    println!("  Period 2 premium: {} (short pays)", update.premium);

    engine.update_positions(bob).unwrap();
    println!("  Short margin after both periods: {}\n", engine.margin(AssetIdx(0), bob));
}

/// An underwater long is force-closed; the penalty splits between the
/// liquidator and the insurance fund.
fn scenario_5_liquidation() {
    println!("Scenario 5: Liquidation\n");

    let mut engine = new_engine();
    let market = add_eth_market(&mut engine, dec!(1000));

    let alice = TraderId(1);
    let whale = TraderId(2);
    let keeper = TraderId(3);
    engine.add_margin(alice, AssetIdx(0), Quote::new(dec!(1100))).unwrap();
    engine.add_margin(whale, AssetIdx(0), Quote::new(dec!(1_000_000))).unwrap();

    engine
        .open_position(alice, market, BaseSize::new(dec!(5)), Price::new_unchecked(dec!(1100)))
        .unwrap();
    println!("  Alice longs 5 ETH near her margin limit");
    println!("  Safe: {}", engine.is_above_maintenance_margin(alice).unwrap());

    println!("  Whale dumps 200 ETH, mark collapses...");
    engine
        .open_position(whale, market, BaseSize::new(dec!(-200)), Price::MIN)
        .unwrap();
    println!("  Mark price: {}", engine.market(market).unwrap().amm.mark_price());
    println!("  Safe: {}", engine.is_above_maintenance_margin(alice).unwrap());

    let outcome = engine.liquidate(alice, keeper).unwrap();
    println!("  Liquidated {} notional, penalty {}", outcome.notional_closed, outcome.penalty);
    println!("  Keeper reward: {}", outcome.liquidator_reward);
    println!("  Alice unit margin: {}", engine.margin(AssetIdx(0), alice));
    println!("  Insurance reserve: {}", engine.insurance_balance());
    println!("  Events generated: {}", engine.events().len());
}
