//! Collaborators at the edges of a forecast run: where bars come from and
//! where results go.
//!
//! - [`PriceSource`] fetches chronological [`PriceBar`]s for a ticker and an
//!   inclusive ISO date range. [`CsvPriceSource`] reads `<dir>/<TICKER>.csv`.
//! - [`ForecastReporter`] consumes predicted/actual series and a title.
//!   [`CsvReporter`] writes `<dir>/<title>.csv`.
//! - [`publish`] hands an outcome to a reporter and only logs a failure, so
//!   reporting can never change a forecast result.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use ndarray::ArrayView1;
use tracing::{info, warn};

use crate::forecasting::{
    core::bars::PriceBar,
    engine::ForecastOutcome,
    errors::{ForecastError, ForecastResult},
};

/// Source of historical daily bars.
pub trait PriceSource {
    /// Bars for `ticker` with `start <= date <= end` (ISO `YYYY-MM-DD`),
    /// oldest first. Failures are returned as-is; nothing is retried.
    fn fetch(&self, ticker: &str, start: &str, end: &str) -> ForecastResult<Vec<PriceBar>>;
}

/// Reads `<dir>/<TICKER>.csv` files with `date,open,high,low,close` columns.
///
/// Header names are matched case-insensitively and extra columns (volume,
/// adjusted close, ...) are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvPriceSource {
    dir: PathBuf,
}

impl CsvPriceSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CsvPriceSource { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

impl PriceSource for CsvPriceSource {
    fn fetch(&self, ticker: &str, start: &str, end: &str) -> ForecastResult<Vec<PriceBar>> {
        let path = self.path_for(ticker);
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(&path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_lowercase()).collect();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| ForecastError::Source {
                text: format!("{}: missing '{name}' column", path.display()),
            })
        };
        let date_col = column("date")?;
        let open_col = column("open")?;
        let high_col = column("high")?;
        let low_col = column("low")?;
        let close_col = column("close")?;

        let mut bars = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let date = record.get(date_col).unwrap_or("");
            if date.is_empty() {
                return Err(ForecastError::Source {
                    text: format!("{} row {row}: missing date", path.display()),
                });
            }
            let day = date.get(..10).unwrap_or(date);
            if day < start || day > end {
                continue;
            }
            let field = |col: usize, name: &str| -> ForecastResult<f64> {
                let raw = record.get(col).unwrap_or("");
                raw.parse::<f64>().map_err(|_| ForecastError::Source {
                    text: format!("{} row {row}: bad {name} value '{raw}'", path.display()),
                })
            };
            bars.push(
                PriceBar::new(
                    field(open_col, "open")?,
                    field(high_col, "high")?,
                    field(low_col, "low")?,
                    field(close_col, "close")?,
                )
                .with_date(day),
            );
        }
        bars.sort_by(|a, b| a.date.cmp(&b.date));
        info!(ticker, start, end, bars = bars.len(), "loaded price bars");
        Ok(bars)
    }
}

/// Consumer of forecast results (charts, files, dashboards).
pub trait ForecastReporter {
    fn report(
        &self, predicted: ArrayView1<f64>, actual: ArrayView1<f64>, title: &str,
    ) -> anyhow::Result<()>;
}

/// Writes `step,predicted,actual` rows to `<dir>/<title>.csv`.
///
/// Characters outside `[A-Za-z0-9_-]` in the title become `_`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvReporter {
    dir: PathBuf,
}

impl CsvReporter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CsvReporter { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path_for(&self, title: &str) -> PathBuf {
        let stem: String = title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{stem}.csv"))
    }
}

impl ForecastReporter for CsvReporter {
    fn report(
        &self, predicted: ArrayView1<f64>, actual: ArrayView1<f64>, title: &str,
    ) -> anyhow::Result<()> {
        if predicted.len() != actual.len() {
            bail!("cannot report {} predictions against {} actuals", predicted.len(), actual.len());
        }
        let path = self.path_for(title);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating report {}", path.display()))?;
        writer.write_record(["step", "predicted", "actual"])?;
        for (step, (p, a)) in predicted.iter().zip(actual.iter()).enumerate() {
            writer.write_record([step.to_string(), p.to_string(), a.to_string()])?;
        }
        writer.flush().with_context(|| format!("flushing report {}", path.display()))?;
        Ok(())
    }
}

/// Send `outcome` to `reporter`; a failure is logged and otherwise ignored.
///
/// Returns whether the reporter succeeded.
pub fn publish<R: ForecastReporter + ?Sized>(
    reporter: &R, outcome: &ForecastOutcome, title: &str,
) -> bool {
    match reporter.report(outcome.predicted.view(), outcome.actual.view(), title) {
        Ok(()) => true,
        Err(err) => {
            let error = format!("{err:#}");
            warn!(title, error = error.as_str(), "forecast reporter failed");
            false
        }
    }
}
