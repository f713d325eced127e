//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV files with a `date,open,high,low,close,volume` header
//! 2. Seeded synthetic random walks for demos and tests
//!
//! Loaded bars are sorted by date. Duplicate dates are rejected since the
//! engine requires a strictly ascending series.

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crosslab_core::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("bad row {row} in {path}: {source}")]
    Parse {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("{path} contains no bars")]
    Empty { path: PathBuf },

    #[error("duplicate date {date} in {path}")]
    DuplicateDate { path: PathBuf, date: NaiveDate },
}

/// One CSV row. Volume may be fractional or missing in some exports.
#[derive(Debug, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

impl From<CsvBar> for Bar {
    fn from(row: CsvBar) -> Self {
        Bar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.map(|v| v.max(0.0).round() as u64).unwrap_or(0),
        }
    }
}

/// Load daily bars from a CSV file.
///
/// Rows are sorted by date after loading. Rows that fail the OHLC sanity
/// check are kept but logged, so the caller sees the data it supplied.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let mut bars = Vec::new();
    for (i, record) in reader.deserialize::<CsvBar>().enumerate() {
        let row = record.map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            row: i + 1,
            source,
        })?;
        bars.push(Bar::from(row));
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    bars.sort_by_key(|b| b.date);
    if let Some(w) = bars.windows(2).find(|w| w[0].date == w[1].date) {
        return Err(LoadError::DuplicateDate {
            path: path.to_path_buf(),
            date: w[1].date,
        });
    }

    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        warn!(path = %path.display(), rows = insane, "bars failed OHLC sanity check");
    }
    debug!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Generate `n` weekday bars of a seeded random walk starting at 100.0.
///
/// The same `(n, seed)` always yields the same series.
pub fn generate_synthetic_bars(n: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0_f64;
    let mut current = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    // Slow regime drift so crossovers actually occur.
    let mut drift = 0.0_f64;

    while bars.len() < n {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        if bars.len() % 40 == 0 {
            drift = rng.gen_range(-0.004..0.004);
        }
        let daily_return: f64 = drift + rng.gen_range(-0.02..0.02);
        let open = price;
        let close = (price * (1.0 + daily_return)).max(1.0);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

/// Write bars as CSV in the format `load_bars_csv` reads.
pub fn write_bars_csv(bars: &[Bar], path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for bar in bars {
        writer.serialize(bar)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_and_sorts_rows() {
        let file = write_temp(
            "date,open,high,low,close,volume\n\
             2024-01-03,101,103,100,102,2000\n\
             2024-01-02,100,102,99,101,1000\n",
        );
        let bars = load_bars_csv(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].close, 102.0);
        assert_eq!(bars[1].volume, 2000);
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let file = write_temp("date,open,high,low,close,volume\n2024-01-02,100,102,99,101,\n");
        let bars = load_bars_csv(file.path()).unwrap();
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = write_temp("date,open,high,low,close,volume\n");
        assert!(matches!(
            load_bars_csv(file.path()),
            Err(LoadError::Empty { .. })
        ));
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let file = write_temp(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,102,99,101,1000\n\
             2024-01-02,101,103,100,102,2000\n",
        );
        assert!(matches!(
            load_bars_csv(file.path()),
            Err(LoadError::DuplicateDate { .. })
        ));
    }

    #[test]
    fn malformed_row_reports_row_number() {
        let file = write_temp(
            "date,open,high,low,close,volume\n\
             2024-01-02,100,102,99,101,1000\n\
             2024-01-03,abc,103,100,102,2000\n",
        );
        match load_bars_csv(file.path()) {
            Err(LoadError::Parse { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn synthetic_is_deterministic_and_ascending() {
        let a = generate_synthetic_bars(300, 42);
        let b = generate_synthetic_bars(300, 42);
        let c = generate_synthetic_bars(300, 7);
        assert_eq!(a.len(), 300);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.windows(2).all(|w| w[0].date < w[1].date));
        assert!(a.iter().all(|bar| bar.is_sane()));
        assert!(a
            .iter()
            .all(|bar| !matches!(bar.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)));
    }

    #[test]
    fn written_csv_loads_back() {
        let bars = generate_synthetic_bars(20, 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        write_bars_csv(&bars, &path).unwrap();
        let loaded = load_bars_csv(&path).unwrap();
        assert_eq!(loaded.len(), bars.len());
        assert_eq!(loaded[0].date, bars[0].date);
        assert!((loaded[19].close - bars[19].close).abs() < 1e-9);
    }
}
