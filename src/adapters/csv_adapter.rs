//! CSV file candle provider.
//!
//! Looks for `<dir>/<SYMBOL>_<timeframe>.csv`, then `<dir>/<SYMBOL>.csv`.
//! A `/` in the symbol becomes `-` in the file name. Columns are
//! `time,open,high,low,close,volume` after a header row.

use crate::domain::candle::{Candle, parse_timestamp};
use crate::domain::error::RuletraderError;
use crate::domain::strategy::Timeframe;
use crate::ports::data_port::CandleDataProvider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub struct CsvCandleProvider {
    base_path: PathBuf,
}

impl CsvCandleProvider {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn file_stem(symbol: &str) -> String {
        symbol.trim().replace('/', "-")
    }

    /// Candidate paths for `symbol`, most specific first.
    pub fn csv_paths(&self, symbol: &str, timeframe: Timeframe) -> [PathBuf; 2] {
        let stem = Self::file_stem(symbol);
        [
            self.base_path.join(format!("{stem}_{timeframe}.csv")),
            self.base_path.join(format!("{stem}.csv")),
        ]
    }

    async fn read_file(&self, symbol: &str, timeframe: Timeframe) -> Result<String, RuletraderError> {
        let paths = self.csv_paths(symbol, timeframe);
        for path in &paths {
            match tokio::fs::read_to_string(path).await {
                Ok(content) => return Ok(content),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(RuletraderError::DataProvider {
                        reason: format!("failed to read {}: {}", path.display(), e),
                    });
                }
            }
        }
        Err(RuletraderError::DataProvider {
            reason: format!(
                "no candle file for {symbol} (tried {} and {})",
                paths[0].display(),
                paths[1].display()
            ),
        })
    }
}

fn column(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<f64, RuletraderError> {
    let raw = record.get(index).ok_or_else(|| RuletraderError::DataProvider {
        reason: format!("line {line}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| RuletraderError::DataProvider {
        reason: format!("line {line}: invalid {name} value '{raw}': {e}"),
    })
}

/// Parse CSV content, keeping candles inside `[start, end]`, sorted by time
/// with duplicate timestamps dropped (first occurrence wins).
pub fn parse_candles(
    content: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Candle>, RuletraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut candles = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| RuletraderError::DataProvider {
            reason: format!("CSV parse error: {}", e),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let time_str = record.get(0).ok_or_else(|| RuletraderError::DataProvider {
            reason: format!("line {line}: missing time column"),
        })?;
        let time = parse_timestamp(time_str).ok_or_else(|| RuletraderError::DataProvider {
            reason: format!("line {line}: invalid time '{time_str}'"),
        })?;

        if time < start || time > end {
            continue;
        }

        candles.push(Candle {
            time,
            open: column(&record, 1, "open", line)?,
            high: column(&record, 2, "high", line)?,
            low: column(&record, 3, "low", line)?,
            close: column(&record, 4, "close", line)?,
            volume: column(&record, 5, "volume", line)?,
        });
    }

    candles.sort_by_key(|c| c.time);
    candles.dedup_by_key(|c| c.time);
    Ok(candles)
}

#[async_trait]
impl CandleDataProvider for CsvCandleProvider {
    async fn get_historical_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, RuletraderError> {
        let content = self.read_file(symbol, timeframe).await?;
        parse_candles(&content, start, end)
    }
}
