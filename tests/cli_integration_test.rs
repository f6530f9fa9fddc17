//! CLI integration tests: INI parsing into strategy and runtime config, and
//! whole commands run against strategy and candle files on disk.

mod common;

use common::*;
use ruletrader::adapters::csv_adapter::CsvCandleProvider;
use ruletrader::adapters::file_config_adapter::FileConfigAdapter;
use ruletrader::cli::{self, Cli};
use ruletrader::domain::error::RuletraderError;
use ruletrader::domain::indicator::IndicatorKind;
use ruletrader::domain::rule::RuleOperator;
use ruletrader::domain::strategy::{StrategyType, Timeframe};
use ruletrader::ports::data_port::CandleDataProvider;
use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn ini(content: &str) -> FileConfigAdapter {
    FileConfigAdapter::from_string(content).unwrap()
}

const STRATEGY_INI: &str = r#"
# SMA breakout with RSI confirmation
[strategy]
name = SMA breakout
description = Buy strength above the 3-bar mean
type = breakout
symbols = BTCUSDT, ETH/USD
timeframe = 1h
position_size = 10
max_drawdown = 25
stop_loss = 5           # percent below entry
take_profit = 15
entry_rules = sma > 105; macd.histogram crosses_above 0
exit_rules = rsi > 70; bands.upper < 100

[indicators]
sma = SMA(3)
rsi = RSI(14)
macd = MACD(12,26,9)
bands = BOLLINGER(20,2)
"#;

const RUNTIME_INI: &str = r#"
[backtest]
initial_capital = 25000
start = 2024-01-01
end = 2024-02-01 12:00:00

[data]
csv_dir = /var/lib/candles

[live]
tick_interval_secs = 30
pair_timeout_ms = 1500
tick_deadline_ms = 10000
max_concurrency = 4
warmup_buffer = 3
"#;

fn exit_code_eq(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{actual:?}") == format!("{expected:?}")
}

mod strategy_parsing {
    use super::*;

    #[test]
    fn builds_full_strategy_from_ini() {
        let config = cli::build_strategy_config(&ini(STRATEGY_INI)).unwrap();

        assert_eq!(config.name, "SMA breakout");
        assert_eq!(
            config.description.as_deref(),
            Some("Buy strength above the 3-bar mean")
        );
        assert_eq!(config.strategy_type, StrategyType::Breakout);
        assert_eq!(config.symbols, vec!["BTCUSDT", "ETH/USD"]);
        assert_eq!(config.timeframe, Timeframe::H1);
        assert_eq!(config.risk.position_size_percent, 10.0);
        assert_eq!(config.risk.stop_loss_percent, Some(5.0));
        assert_eq!(config.risk.take_profit_percent, Some(15.0));

        assert_eq!(config.indicators.len(), 4);
        let macd = config.indicators.iter().find(|i| i.key == "macd").unwrap();
        assert_eq!(
            macd.kind,
            IndicatorKind::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
        );

        assert_eq!(config.rules.entry.len(), 2);
        assert_eq!(config.rules.entry[1].field, "macd.histogram");
        assert_eq!(config.rules.entry[1].operator, RuleOperator::CrossesAbove);
        assert_eq!(config.rules.exit.len(), 2);
        assert_eq!(config.required_candles(), 34);
        assert!(config.unresolved_rule_keys().is_empty());
    }

    #[test]
    fn optional_keys_take_defaults() {
        let config = cli::build_strategy_config(&ini(
            "[strategy]\nname = Minimal\nsymbols = BTCUSDT\nposition_size = 5\n\
             max_drawdown = 20\nentry_rules = sma > 1\n[indicators]\nsma = SMA(2)\n",
        ))
        .unwrap();
        assert_eq!(config.strategy_type, StrategyType::Custom);
        assert_eq!(config.timeframe, Timeframe::H1);
        assert!(config.description.is_none());
        assert!(config.rules.exit.is_empty());
        assert_eq!(config.risk.stop_loss_percent, None);
    }

    #[test]
    fn malformed_rule_is_a_parse_error() {
        let content = STRATEGY_INI.replace("sma > 105;", "sma >> 105;");
        let err = cli::build_strategy_config(&ini(&content)).unwrap_err();
        assert!(matches!(err, RuletraderError::RuleParse(_)));
    }

    #[test]
    fn unknown_indicator_is_a_parse_error() {
        let content = STRATEGY_INI.replace("RSI(14)", "KAMA(14)");
        let err = cli::build_strategy_config(&ini(&content)).unwrap_err();
        assert!(matches!(err, RuletraderError::RuleParse(_)));
    }

    #[test]
    fn unknown_timeframe_is_invalid_config() {
        let content = STRATEGY_INI.replace("timeframe = 1h", "timeframe = 2h");
        let err = cli::build_strategy_config(&ini(&content)).unwrap_err();
        assert!(matches!(err, RuletraderError::ConfigInvalid { key, .. } if key == "timeframe"));
    }

    #[test]
    fn out_of_range_risk_fails_validation() {
        let content = STRATEGY_INI.replace("position_size = 10", "position_size = 150");
        let err = cli::build_strategy_config(&ini(&content)).unwrap_err();
        assert!(matches!(err, RuletraderError::Validation { .. }));
    }

    #[test]
    fn invalid_macd_periods_fail_validation() {
        let content = STRATEGY_INI.replace("MACD(12,26,9)", "MACD(26,12,9)");
        let err = cli::build_strategy_config(&ini(&content)).unwrap_err();
        assert!(matches!(err, RuletraderError::Validation { .. }));
    }
}

mod runtime_parsing {
    use super::*;

    #[test]
    fn builds_runtime_config() {
        let runtime = cli::build_runtime_config(&ini(RUNTIME_INI)).unwrap();
        assert_eq!(runtime.initial_capital, 25_000.0);
        assert_eq!(runtime.csv_dir, Path::new("/var/lib/candles"));
        assert_eq!(runtime.tick_interval, Duration::from_secs(30));
        assert_eq!(runtime.scheduler.pair_timeout, Duration::from_millis(1500));
        assert_eq!(runtime.scheduler.tick_deadline, Duration::from_secs(10));
        assert_eq!(runtime.scheduler.max_concurrency, 4);
        assert_eq!(runtime.scheduler.warmup_buffer, 3);

        let request = runtime.backtest_request().unwrap();
        assert_eq!(request.start, t0());
        assert_eq!(request.end, t0() + chrono::Duration::days(31) + chrono::Duration::hours(12));
    }

    #[test]
    fn empty_runtime_file_gives_defaults() {
        let runtime = cli::build_runtime_config(&ini("")).unwrap();
        assert_eq!(runtime, cli::RuntimeConfig::default());
    }

    #[test]
    fn negative_capital_is_rejected() {
        let err = cli::build_runtime_config(&ini("[backtest]\ninitial_capital = -5\n")).unwrap_err();
        assert!(matches!(err, RuletraderError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }
}

mod commands {
    use super::*;

    fn write_csv(dir: &Path, name: &str, closes: &[f64]) {
        let mut body = String::from("time,open,high,low,close,volume\n");
        for candle in hourly_candles(closes) {
            body.push_str(&format!(
                "{},{},{},{},{},{}\n",
                candle.time.to_rfc3339(),
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume
            ));
        }
        std::fs::write(dir.join(name), body).unwrap();
    }

    const SIMPLE_STRATEGY: &str = "[strategy]\nname = SMA breakout\nsymbols = BTCUSDT\n\
        timeframe = 1h\nposition_size = 10\nmax_drawdown = 25\nentry_rules = sma > 105\n\
        [indicators]\nsma = SMA(3)\n";

    #[tokio::test]
    async fn csv_candles_feed_the_simulator() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "BTCUSDT_1h.csv", &[100.0, 102.0, 104.0, 106.0, 108.0, 110.0]);

        let config = cli::build_strategy_config(&ini(SIMPLE_STRATEGY)).unwrap();
        let provider = CsvCandleProvider::new(dir.path());
        let candles = provider
            .get_historical_candles("BTCUSDT", Timeframe::H1, t0(), t0() + chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(candles.len(), 6);

        let data = std::collections::HashMap::from([("BTCUSDT".to_string(), candles)]);
        let result = ruletrader::domain::backtest::run_backtest(&config, &data, 10_000.0).unwrap();
        assert_eq!(result.total_trades, 1);
        assert!(result.passes(config.risk.max_drawdown_percent));
    }

    #[test]
    fn validate_command_succeeds_on_good_file() {
        let file = write_temp_ini(STRATEGY_INI);
        let cli = Cli::try_parse_from([
            "ruletrader",
            "validate",
            "--strategy",
            file.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(exit_code_eq(cli::run(cli), ExitCode::SUCCESS));
    }

    #[test]
    fn validate_command_reports_rule_errors_with_code_4() {
        let file = write_temp_ini(&STRATEGY_INI.replace("sma > 105", "sma ! 105"));
        let cli = Cli::try_parse_from([
            "ruletrader",
            "validate",
            "--strategy",
            file.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(exit_code_eq(cli::run(cli), ExitCode::from(4)));
    }

    #[test]
    fn missing_strategy_file_is_config_error() {
        let cli = Cli::try_parse_from([
            "ruletrader",
            "validate",
            "--strategy",
            "/nonexistent/strategy.ini",
        ])
        .unwrap();
        assert!(exit_code_eq(cli::run(cli), ExitCode::from(2)));
    }

    #[test]
    fn backtest_command_runs_against_csv_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "BTCUSDT.csv", &[100.0, 102.0, 104.0, 106.0, 108.0, 110.0]);
        let strategy = write_temp_ini(SIMPLE_STRATEGY);

        let cli = Cli::try_parse_from([
            "ruletrader",
            "backtest",
            "--strategy",
            strategy.path().to_str().unwrap(),
            "--data",
            dir.path().to_str().unwrap(),
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-02",
            "--json",
        ])
        .unwrap();
        assert!(exit_code_eq(cli::run(cli), ExitCode::SUCCESS));
    }

    #[test]
    fn backtest_without_window_is_config_error() {
        let strategy = write_temp_ini(SIMPLE_STRATEGY);
        let cli = Cli::try_parse_from([
            "ruletrader",
            "backtest",
            "--strategy",
            strategy.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(exit_code_eq(cli::run(cli), ExitCode::from(2)));
    }

    #[test]
    fn live_command_paper_trades_after_passing_backtest() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "BTCUSDT_1h.csv", &[100.0, 102.0, 104.0, 106.0, 108.0, 110.0]);
        let strategy = write_temp_ini(SIMPLE_STRATEGY);
        let runtime = write_temp_ini(&format!(
            "[backtest]\nstart = 2024-01-01\nend = 2024-01-01 05:00:00\n\
             [data]\ncsv_dir = {}\n[live]\ntick_interval_secs = 1\n",
            dir.path().display()
        ));

        let cli = Cli::try_parse_from([
            "ruletrader",
            "live",
            "--strategy",
            strategy.path().to_str().unwrap(),
            "--config",
            runtime.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(exit_code_eq(cli::run(cli), ExitCode::SUCCESS));
    }
}
