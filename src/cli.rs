//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::channel_event_publisher::ChannelEventPublisher;
use crate::adapters::csv_adapter::CsvCandleProvider;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::logging_order_sink::LoggingOrderSink;
use crate::adapters::memory_repository::InMemoryStrategyRepository;
use crate::domain::candle::parse_timestamp;
use crate::domain::config_validation::{
    DEFAULT_INITIAL_CAPITAL, DEFAULT_MAX_CONCURRENCY, DEFAULT_PAIR_TIMEOUT_MS,
    DEFAULT_TICK_DEADLINE_MS, DEFAULT_TICK_INTERVAL_SECS, DEFAULT_WARMUP_BUFFER, config_time,
    read_int, validate_runtime_config, validate_strategy_sections,
};
use crate::domain::error::RuletraderError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::lifecycle::StrategyStatus;
use crate::domain::rule::{Rule, RuleSet};
use crate::domain::rule_parser::{parse_indicator, parse_rules};
use crate::domain::strategy::{
    RiskParameters, Strategy, StrategyConfig, StrategyType, Timeframe,
};
use crate::ports::config_port::ConfigPort;
use crate::services::backtest_service::{BacktestRequest, BacktestService};
use crate::services::scheduler::{LiveExecutionScheduler, SchedulerConfig};
use crate::services::strategy_service::StrategyService;

const CLI_OWNER: &str = "cli";
const DEFAULT_CSV_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "ruletrader", about = "Rules-based strategy backtester and paper trader")]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and validate a strategy file
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Backtest a strategy against CSV candles
    Backtest {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory holding candle CSV files
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        capital: Option<f64>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Backtest, activate when passed, then run scheduler ticks in paper mode
    Live {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        ticks: u32,
    },
}

/// Backtest and live settings from the runtime INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub initial_capital: f64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub csv_dir: PathBuf,
    pub tick_interval: Duration,
    pub scheduler: SchedulerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            start: None,
            end: None,
            csv_dir: PathBuf::from(DEFAULT_CSV_DIR),
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS as u64),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn backtest_request(&self) -> Result<BacktestRequest, RuletraderError> {
        let missing = |key: &str| RuletraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        };
        let request = BacktestRequest {
            start: self.start.ok_or_else(|| missing("start"))?,
            end: self.end.ok_or_else(|| missing("end"))?,
            initial_capital: self.initial_capital,
        };
        request.validate()?;
        Ok(request)
    }

    fn apply_overrides(
        &mut self,
        data: Option<&Path>,
        start: Option<&str>,
        end: Option<&str>,
        capital: Option<f64>,
    ) -> Result<(), RuletraderError> {
        if let Some(dir) = data {
            self.csv_dir = dir.to_path_buf();
        }
        if let Some(raw) = start {
            self.start = Some(parse_cli_time("--start", raw)?);
        }
        if let Some(raw) = end {
            self.end = Some(parse_cli_time("--end", raw)?);
        }
        if let Some(capital) = capital {
            self.initial_capital = capital;
        }
        Ok(())
    }
}

fn parse_cli_time(flag: &str, raw: &str) -> Result<DateTime<Utc>, RuletraderError> {
    parse_timestamp(raw).ok_or_else(|| {
        RuletraderError::validation(flag, format!("'{raw}' is not a date or timestamp"))
    })
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(&cli.log_level, cli.log_json);

    let result = match cli.command {
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Backtest {
            strategy,
            config,
            data,
            start,
            end,
            capital,
            json,
        } => load_runtime(config.as_deref()).and_then(|mut runtime| {
            runtime.apply_overrides(data.as_deref(), start.as_deref(), end.as_deref(), capital)?;
            block_on(run_backtest(&strategy, runtime, json))
        }),
        Command::Live {
            strategy,
            config,
            data,
            ticks,
        } => load_runtime(config.as_deref()).and_then(|mut runtime| {
            runtime.apply_overrides(data.as_deref(), None, None, None)?;
            block_on(run_live(&strategy, runtime, ticks))
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// `RUST_LOG` wins over `--log-level`. Logs go to stderr so stdout stays
/// clean for results.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        warn!("tracing subscriber already installed");
    }
}

fn block_on<F>(future: F) -> Result<(), RuletraderError>
where
    F: std::future::Future<Output = Result<(), RuletraderError>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RuletraderError> {
    FileConfigAdapter::from_file(path).map_err(|e| RuletraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_runtime(path: Option<&Path>) -> Result<RuntimeConfig, RuletraderError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            build_runtime_config(&load_config(path)?)
        }
        None => Ok(RuntimeConfig::default()),
    }
}

pub fn build_runtime_config(config: &dyn ConfigPort) -> Result<RuntimeConfig, RuletraderError> {
    validate_runtime_config(config)?;

    let millis = |key: &str, default: i64| -> Result<Duration, RuletraderError> {
        Ok(Duration::from_millis(read_int(config, "live", key, default)? as u64))
    };

    Ok(RuntimeConfig {
        initial_capital: config
            .get_f64_opt("backtest", "initial_capital")?
            .unwrap_or(DEFAULT_INITIAL_CAPITAL),
        start: config_time(config, "backtest", "start")?,
        end: config_time(config, "backtest", "end")?,
        csv_dir: config
            .get_string("data", "csv_dir")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_DIR)),
        tick_interval: Duration::from_secs(
            read_int(config, "live", "tick_interval_secs", DEFAULT_TICK_INTERVAL_SECS)? as u64,
        ),
        scheduler: SchedulerConfig {
            pair_timeout: millis("pair_timeout_ms", DEFAULT_PAIR_TIMEOUT_MS)?,
            tick_deadline: millis("tick_deadline_ms", DEFAULT_TICK_DEADLINE_MS)?,
            max_concurrency: read_int(config, "live", "max_concurrency", DEFAULT_MAX_CONCURRENCY)?
                as usize,
            warmup_buffer: read_int(config, "live", "warmup_buffer", DEFAULT_WARMUP_BUFFER)?
                as usize,
        },
    })
}

pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_rule_list(key: &str, raw: &str) -> Result<Vec<Rule>, RuletraderError> {
    parse_rules(raw).map_err(|e| {
        eprintln!("error: failed to parse {key}:\n{}", e.display_with_context(raw));
        RuletraderError::from(e)
    })
}

fn parse_enum<T>(config: &dyn ConfigPort, key: &str, default: T) -> Result<T, RuletraderError>
where
    T: std::str::FromStr<Err = RuletraderError>,
{
    match config.get_string("strategy", key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.parse::<T>().map_err(|e| RuletraderError::ConfigInvalid {
                section: "strategy".to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

/// Build and validate a strategy from its INI file.
pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, RuletraderError> {
    validate_strategy_sections(config)?;

    let mut indicators = Vec::new();
    for key in config.keys("indicators") {
        let raw = config.require_string("indicators", &key)?;
        let kind = parse_indicator(&raw).map_err(|e| {
            eprintln!(
                "error: failed to parse indicator '{key}':\n{}",
                e.display_with_context(&raw)
            );
            RuletraderError::from(e)
        })?;
        indicators.push(IndicatorConfig::new(key, kind));
    }

    let entry_raw = config.require_string("strategy", "entry_rules")?;
    let entry = parse_rule_list("entry_rules", &entry_raw)?;
    let exit = match config.get_string("strategy", "exit_rules") {
        Some(raw) if !raw.trim().is_empty() => parse_rule_list("exit_rules", &raw)?,
        _ => Vec::new(),
    };

    let strategy = StrategyConfig {
        name: config.require_string("strategy", "name")?.trim().to_string(),
        description: config
            .get_string("strategy", "description")
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        strategy_type: parse_enum(config, "type", StrategyType::Custom)?,
        symbols: parse_symbols(&config.require_string("strategy", "symbols")?),
        timeframe: parse_enum(config, "timeframe", Timeframe::H1)?,
        indicators,
        rules: RuleSet::new(entry, exit),
        risk: RiskParameters {
            position_size_percent: config.require_f64("strategy", "position_size")?,
            max_drawdown_percent: config.require_f64("strategy", "max_drawdown")?,
            stop_loss_percent: config.get_f64_opt("strategy", "stop_loss")?,
            take_profit_percent: config.get_f64_opt("strategy", "take_profit")?,
        },
    };
    strategy.validate()?;
    Ok(strategy)
}

fn load_strategy(path: &Path) -> Result<StrategyConfig, RuletraderError> {
    eprintln!("Loading strategy from {}", path.display());
    build_strategy_config(&load_config(path)?)
}

fn run_validate(path: &Path) -> Result<(), RuletraderError> {
    let config = load_strategy(path)?;

    println!("Strategy:   {} ({})", config.name, config.strategy_type);
    println!("Symbols:    {}", config.symbols.join(", "));
    println!("Timeframe:  {}", config.timeframe);
    println!("Indicators:");
    for indicator in &config.indicators {
        println!(
            "  {:<12} {:<20} warm-up {}",
            indicator.key,
            indicator.kind.to_string(),
            indicator.kind.min_candles()
        );
    }
    println!("Entry (all): ");
    for rule in &config.rules.entry {
        println!("  {rule}");
    }
    println!("Exit (any):  ");
    for rule in &config.rules.exit {
        println!("  {rule}");
    }
    println!("Required candles: {}", config.required_candles());

    for key in config.unresolved_rule_keys() {
        eprintln!("warning: rule field '{key}' matches no indicator and will never be true");
    }
    println!("\nStrategy configuration is valid.");
    Ok(())
}

/// In-process wiring: memory repository, CSV candles, channel events
/// drained into the log.
struct App {
    repo: Arc<InMemoryStrategyRepository>,
    data: Arc<CsvCandleProvider>,
    strategies: StrategyService,
    backtests: BacktestService,
}

impl App {
    fn new(csv_dir: &Path) -> Self {
        let repo = Arc::new(InMemoryStrategyRepository::new());
        let data = Arc::new(CsvCandleProvider::new(csv_dir));
        let (publisher, mut events) = ChannelEventPublisher::channel(64);
        let publisher = Arc::new(publisher);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                info!(strategy_id = %event.strategy_id(), event = event.name(), "lifecycle event");
            }
        });

        Self {
            strategies: StrategyService::new(repo.clone(), publisher.clone()),
            backtests: BacktestService::new(repo.clone(), data.clone(), publisher),
            repo,
            data,
        }
    }

    async fn backtest(
        &self,
        config: StrategyConfig,
        request: &BacktestRequest,
    ) -> Result<Strategy, RuletraderError> {
        let created = self.strategies.create(CLI_OWNER, config).await?;
        self.backtests.run(created.id(), request).await
    }
}

fn print_summary(strategy: &Strategy) {
    println!("\nStrategy {} [{}]", strategy.name(), strategy.id());
    println!("Status:           {}", strategy.status());
    let Some(result) = strategy.backtest_results() else {
        return;
    };
    if let Some(error) = &result.error {
        println!("Error:            {error}");
    }
    println!("Initial capital:  {:.2}", result.initial_capital);
    println!("Final capital:    {:.2}", result.final_capital);
    println!("Profitability:    {:.2}%", result.profitability);
    println!(
        "Trades:           {} ({} won, {} lost)",
        result.total_trades, result.winning_trades, result.losing_trades
    );
    println!("Win rate:         {:.2}%", result.win_rate);
    println!("Max drawdown:     {:.2}%", result.max_drawdown);
    let stats = result.stats();
    if stats.total_trades > 0 {
        println!("Profit factor:    {:.2}", stats.profit_factor());
        println!("Largest win:      {:.2}", stats.largest_win);
        println!("Largest loss:     {:.2}", stats.largest_loss);
        println!("Average win:      {:.2}", stats.average_win());
        println!("Average loss:     {:.2}", stats.average_loss());
    }
}

async fn run_backtest(path: &Path, runtime: RuntimeConfig, json: bool) -> Result<(), RuletraderError> {
    let config = load_strategy(path)?;
    let request = runtime.backtest_request()?;
    let app = App::new(&runtime.csv_dir);

    let strategy = app.backtest(config, &request).await?;
    if json {
        let out = serde_json::to_string_pretty(&strategy.backtest_results())
            .map_err(std::io::Error::from)?;
        println!("{out}");
    } else {
        print_summary(&strategy);
    }
    Ok(())
}

/// Paper mode: ticks are evaluated as of the end of the backtest window so
/// the CSV history stands in for a live feed.
async fn run_live(path: &Path, runtime: RuntimeConfig, ticks: u32) -> Result<(), RuletraderError> {
    runtime.scheduler.validate()?;
    let config = load_strategy(path)?;
    let request = runtime.backtest_request()?;
    let app = App::new(&runtime.csv_dir);

    let strategy = app.backtest(config, &request).await?;
    print_summary(&strategy);
    if strategy.status() != StrategyStatus::BacktestPassed {
        eprintln!("Backtest did not pass; strategy not activated.");
        return Ok(());
    }
    let id = strategy.id().to_string();
    app.strategies.activate(&id).await?;

    let sink = Arc::new(LoggingOrderSink::new());
    let scheduler = LiveExecutionScheduler::new(
        app.repo.clone(),
        app.data.clone(),
        sink.clone(),
        runtime.scheduler.clone(),
    );
    let mut interval = tokio::time::interval(runtime.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    for n in 1..=ticks {
        interval.tick().await;
        let report = scheduler.tick(request.end).await?;
        println!(
            "tick {n}: {} pairs, {} signals, {} failures, {} timed out",
            report.pairs, report.signals, report.failures, report.timed_out
        );
    }

    for signal in sink.submitted() {
        let out = serde_json::to_string(&signal).map_err(std::io::Error::from)?;
        println!("{out}");
    }
    app.strategies.stop(&id).await?;
    Ok(())
}
