//! Engine-level integration tests.
//!
//! Tests cover:
//! - End-to-end fee scenario on a single winning long
//! - Balance accounting and position ordering under random markets (proptest)
//! - Stop-loss precedence, cooldown enforcement, long/short symmetry
//! - Insufficient-balance halt, feature exhaustion and early stopping
//! - Drawdown over a mixed run and interval-based indexing

mod common;

use approx::assert_relative_eq;
use common::*;
use plutus::adapters::interval_indexer::IntervalIndexer;
use plutus::domain::backtest::{run, BacktestConfig};
use plutus::domain::candlestick::{add_minutes, Candlestick, MINUTE_MS};
use plutus::domain::early_stopping::EarlyStoppingConfig;
use plutus::domain::fees::FeeModel;
use plutus::domain::percentage::percentage_change;
use plutus::domain::performance::{Performance, Termination};
use plutus::domain::position::PositionType;
use plutus::domain::signal::{classify, Signal, SignalThresholds};
use plutus::ports::data_port::FeatureFrame;
use proptest::prelude::*;

fn run_minutes(config: &BacktestConfig, candles: &[Candlestick], frame: &FeatureFrame) -> Performance {
    run(
        config,
        candles,
        &frame.features,
        &frame.features_sum,
        &minute_indexer(candles),
    )
    .unwrap()
}

mod end_to_end_fee_scenario {
    use super::*;

    #[test]
    fn single_winning_long() {
        let candles = with_highs(flat_minutes(10, 100.0), &[7], 102.5);
        let config = BacktestConfig {
            idle_minutes_on_close: 30,
            ..sample_config(10)
        };
        let perf = run_minutes(&config, &candles, &rising_frame(10));

        assert_eq!(perf.position_count(), 1);
        assert_eq!(perf.long_count, 1);
        assert_eq!(perf.long_success_count, 1);
        // equity 500; +2% gross 10; fees 0.325 open + 0.3315 close
        assert_relative_eq!(perf.fees, 0.6565, epsilon = 1e-12);
        assert_relative_eq!(perf.profit, 9.3435, epsilon = 1e-9);
        assert_relative_eq!(perf.final_balance, 159.3435, epsilon = 1e-9);
        assert_relative_eq!(perf.long_accuracy, 100.0);
        assert_eq!(perf.short_accuracy, 0.0);
        assert_eq!(perf.increase_outcome_count, 1);
        assert_eq!(perf.decrease_outcome_count, 0);
        assert_eq!(perf.points_history, vec![0.0, 1.8]);
        assert_eq!(perf.termination, Termination::EndOfData);
    }

    #[test]
    fn report_echoes_config() {
        let candles = flat_minutes(10, 100.0);
        let config = BacktestConfig {
            idle_minutes_on_close: 15,
            ..sample_config(10)
        };
        let perf = run_minutes(&config, &candles, &rising_frame(10));
        assert_eq!(perf.position_size, 100.0);
        assert_eq!(perf.leverage, 5.0);
        assert_eq!(perf.exchange_fee_pct, 0.065);
        assert_eq!(perf.idle_minutes_on_close, 15);
        assert_eq!(perf.price_change_requirement, 2.0);
        assert_eq!(perf.min_increase_sum, 1.0);
        assert_eq!(perf.min_decrease_sum, -1.0);
    }
}

mod balance_accounting {
    use super::*;

    proptest! {
        #[test]
        fn balance_moves_only_by_net_outcomes(
            moves in prop::collection::vec((0.0f64..4.0, 0.0f64..4.0), 10..90),
            idle in 0i64..4,
        ) {
            let candles: Vec<Candlestick> = moves
                .iter()
                .enumerate()
                .map(|(i, &(up, down))| make_candle(i, 100.0, 100.0 + up, 100.0 - down, 100.0))
                .collect();
            let config = BacktestConfig {
                idle_minutes_on_close: idle,
                initial_balance: 1000.0,
                ..sample_config(candles.len())
            };
            let perf = run_minutes(&config, &candles, &rising_frame(candles.len()));
            let fees = FeeModel::new(100.0, 5.0, 0.065, 2.0);

            let successes = perf.long_success_count + perf.short_success_count;
            let failures = perf.position_count() - successes;
            let expected = 1000.0 + successes as f64 * fees.net_profit - failures as f64 * fees.net_loss;
            prop_assert!((perf.final_balance - expected).abs() < 1e-6);

            let expected_fees = successes as f64 * fees.total_fee(true)
                + failures as f64 * fees.total_fee(false);
            prop_assert!((perf.fees - expected_fees).abs() < 1e-6);
            prop_assert_eq!(perf.positions.len(), perf.long_count + perf.short_count);

            let mut balance = 1000.0;
            for p in &perf.positions {
                balance += fees.balance_delta(p.outcome);
                prop_assert!((p.balance_after - balance).abs() < 1e-6);
            }

            for pair in perf.positions.windows(2) {
                prop_assert!(pair[1].open_time() > pair[0].close_time);
                prop_assert!(pair[1].open_time() >= add_minutes(pair[0].close_time, idle));
            }
        }
    }
}

mod stop_loss_precedence {
    use super::*;

    #[test]
    fn long_bar_hitting_both_exits_loses() {
        let candles = with_lows(with_highs(flat_minutes(9, 100.0), &[7], 103.0), &[7], 97.0);
        let perf = run_minutes(&sample_config(9), &candles, &rising_frame(9));

        let p = &perf.positions[0];
        assert_eq!(p.position_type(), PositionType::Long);
        assert!(!p.outcome);
        assert_relative_eq!(p.close_price, 98.0);
        assert_relative_eq!(perf.final_balance, 139.3565, epsilon = 1e-9);
    }

    #[test]
    fn short_bar_hitting_both_exits_loses() {
        let candles = with_lows(with_highs(flat_minutes(9, 100.0), &[7], 103.0), &[7], 97.0);
        let perf = run_minutes(&sample_config(9), &candles, &falling_frame(9));

        let p = &perf.positions[0];
        assert_eq!(p.position_type(), PositionType::Short);
        assert!(!p.outcome);
        assert_relative_eq!(p.close_price, 102.0);
        assert_eq!(perf.decrease_outcome_count, 0);
        assert_eq!(perf.increase_outcome_count, 1);
    }
}

mod cooldown_enforcement {
    use super::*;

    #[test]
    fn reopens_on_first_bar_after_cooldown() {
        for idle in [0, 1, 3, 10] {
            let candles = with_highs(flat_minutes(60, 100.0), &(0..60).collect::<Vec<_>>(), 102.5);
            let config = BacktestConfig {
                idle_minutes_on_close: idle,
                ..sample_config(60)
            };
            let perf = run_minutes(&config, &candles, &rising_frame(60));

            assert!(perf.position_count() >= 2, "idle {idle}");
            for pair in perf.positions.windows(2) {
                // close_time is the last millisecond of its minute
                assert_eq!(
                    pair[1].open_time(),
                    pair[0].close_time + 1 + idle * MINUTE_MS,
                    "idle {idle}"
                );
            }
        }
    }
}

mod signal_symmetry {
    use super::*;

    #[test]
    fn mirrored_market_gives_mirrored_result() {
        let up = with_highs(flat_minutes(10, 100.0), &[7], 102.5);
        let down = with_lows(flat_minutes(10, 100.0), &[7], 97.5);
        let config = BacktestConfig {
            idle_minutes_on_close: 30,
            ..sample_config(10)
        };

        let long = run_minutes(&config, &up, &rising_frame(10));
        let short = run_minutes(&config, &down, &falling_frame(10));

        assert_eq!(long.long_count, 1);
        assert_eq!(short.short_count, 1);
        assert_eq!(short.short_success_count, 1);
        assert_eq!(long.positions[0].open_time(), short.positions[0].open_time());
        assert_relative_eq!(long.final_balance, short.final_balance, epsilon = 1e-12);
        assert_relative_eq!(short.positions[0].close_price, 98.0);
    }

    proptest! {
        #[test]
        fn classifier_is_mirror_symmetric(
            window in prop::array::uniform6(-5.0f64..5.0),
            threshold in 0.0f64..3.0,
        ) {
            let thresholds = SignalThresholds {
                min_increase_sum: threshold,
                min_decrease_sum: -threshold,
            };
            let mirrored = window.map(|v| -v);
            let expected = match classify(&window, &thresholds) {
                Signal::Long => Signal::Short,
                Signal::Short => Signal::Long,
                Signal::Neutral => Signal::Neutral,
            };
            prop_assert_eq!(classify(&mirrored, &thresholds), expected);
        }
    }
}

mod run_termination {
    use super::*;

    #[test]
    fn insufficient_balance_halts() {
        let candles = with_lows(flat_minutes(30, 100.0), &[7], 97.0);
        let candles = with_highs(candles, &(8..30).collect::<Vec<_>>(), 102.5);
        let config = BacktestConfig {
            initial_balance: 100.0,
            ..sample_config(30)
        };
        let perf = run_minutes(&config, &candles, &rising_frame(30));

        assert_eq!(perf.position_count(), 1);
        assert!(matches!(
            perf.termination,
            Termination::InsufficientBalance { balance } if balance < 100.0
        ));
    }

    #[test]
    fn features_exhausted() {
        let candles = flat_minutes(20, 100.0);
        let perf = run_minutes(&sample_config(12), &candles, &rising_frame(20));
        assert_eq!(
            perf.termination,
            Termination::FeaturesExhausted {
                open_time: candles[12].open_time
            }
        );
    }

    #[test]
    fn early_stop_at_first_checkpoint() {
        let candles = with_highs(flat_minutes(100, 100.0), &(0..100).collect::<Vec<_>>(), 102.5);
        let config = BacktestConfig {
            early_stopping: Some(EarlyStoppingConfig::default()),
            ..sample_config(100)
        };
        let perf = run_minutes(&config, &candles, &rising_frame(100));

        // Longs only: the 15% checkpoint needs one short.
        assert!(perf.long_count >= 1);
        assert_eq!(perf.short_count, 0);
        assert_eq!(
            perf.early_stopping(),
            Some(
                "Backtest stopped early because the model had less than 1 longs or 1 shorts at 15% of the dataset."
            )
        );
    }

    #[test]
    fn early_stop_on_points_floor() {
        let candles = with_lows(flat_minutes(40, 100.0), &(0..40).collect::<Vec<_>>(), 97.0);
        let config = BacktestConfig {
            initial_balance: 1000.0,
            early_stopping: Some(EarlyStoppingConfig {
                checkpoints: vec![],
                min_points: Some(-3.0),
            }),
            ..sample_config(40)
        };
        let perf = run_minutes(&config, &candles, &rising_frame(40));

        assert_eq!(perf.position_count(), 2);
        assert_relative_eq!(perf.points, -4.4);
        assert_eq!(
            perf.early_stopping(),
            Some("Backtest stopped early because the model has less than -3 points.")
        );
    }
}

mod drawdown {
    use super::*;

    #[test]
    fn drawdown_over_mixed_run() {
        // win, loss, loss, win with no cooldown
        let candles = flat_minutes(16, 100.0);
        let candles = with_highs(candles, &[7, 13], 102.5);
        let candles = with_lows(candles, &[9, 11], 97.5);
        let perf = run_minutes(&sample_config(16), &candles, &rising_frame(16));

        let outcomes: Vec<bool> = perf.positions.iter().map(|p| p.outcome).collect();
        assert_eq!(outcomes, vec![true, false, false, true]);

        let peak = perf.positions[0].balance_after;
        let trough = perf.positions[2].balance_after;
        assert_relative_eq!(
            perf.largest_balance_drawdown,
            percentage_change(peak, trough),
            epsilon = 1e-9
        );
        assert!(perf.largest_balance_drawdown < 0.0);
    }
}

mod interval_indexing {
    use super::*;

    #[test]
    fn five_minute_rows_delay_first_signal() {
        let candles = with_highs(flat_minutes(60, 100.0), &(0..60).collect::<Vec<_>>(), 102.5);
        let frame = rising_frame(12);
        let indexer = IntervalIndexer::new(START, 5);
        let perf = run(
            &sample_config(12),
            &candles,
            &frame.features,
            &frame.features_sum,
            &indexer,
        )
        .unwrap();

        // Row 6 starts at minute 30.
        let first = &perf.positions[0];
        assert_eq!(first.open_time(), START + 30 * MINUTE_MS);
        assert_eq!(first.position.prediction.time, first.open_time());
        assert_eq!(first.position.prediction.features, frame.features[6]);
        assert_eq!(perf.termination, Termination::EndOfData);
    }
}
