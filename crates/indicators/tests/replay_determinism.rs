//! Replaying the same trade sequence after a reset must reproduce every
//! order-sensitive accumulator exactly.

use berg_core::Trade;
use berg_indicators::{IndicatorConfig, IndicatorSuite};
use chrono::{Duration, TimeZone, Utc};

fn scripted_trades() -> Vec<Trade> {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
    (0..2_000i64)
        .map(|i| {
            // Deterministic zig-zag with drift
            let price = 4000 + (i / 50) + ((i * 7) % 11) - 5;
            let size = 1 + ((i * 13) % 9) as u64;
            let ts = t0 + Duration::milliseconds(i * 750);
            if (i * 31) % 5 < 3 {
                Trade::buy(price, size, ts)
            } else {
                Trade::sell(price, size, ts)
            }
        })
        .collect()
}

fn run(suite: &mut IndicatorSuite, trades: &[Trade]) {
    for trade in trades {
        suite.on_trade(trade);
    }
}

#[test]
fn test_cvd_is_running_signed_sum() {
    let trades = scripted_trades();
    let mut suite = IndicatorSuite::default();
    run(&mut suite, &trades);

    let expected: i64 = trades.iter().map(|t| t.signed_size()).sum();
    assert_eq!(suite.cvd().value(), expected);
}

#[test]
fn test_replay_after_reset_is_identical() {
    let _ = env_logger::try_init();
    let trades = scripted_trades();
    let mut suite = IndicatorSuite::new(IndicatorConfig {
        ema_periods: vec![3, 5, 8],
        atr_period: 5,
        ..Default::default()
    });

    run(&mut suite, &trades);
    let last = trades.last().unwrap().timestamp;
    let first_pass = suite.values(last);
    assert!(first_pass.atr.is_some());
    assert!(first_pass.emas.iter().all(|(_, v)| v.is_some()));

    suite.reset();
    run(&mut suite, &trades);
    let second_pass = suite.values(last);

    assert_eq!(first_pass.cvd, second_pass.cvd);
    assert_eq!(first_pass.vwap, second_pass.vwap);
    assert_eq!(first_pass.atr, second_pass.atr);
    assert_eq!(first_pass.emas, second_pass.emas);
    assert_eq!(first_pass, second_pass);
}
