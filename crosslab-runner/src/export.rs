//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full analysis results and optimization summaries
//! - **CSV**: trade tape, equity curve, optimizer table, and heatmap grid
//! - **Markdown**: human-readable single-run report

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crosslab_core::{AnalysisResult, EquityCurvePoint, Trade};

use crate::heatmap::Heatmap;
use crate::optimizer::{OptimizationResult, OptimizationSummary};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AnalysisResult` to pretty JSON.
pub fn export_analysis_json(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize AnalysisResult to JSON")
}

/// Serialize an `OptimizationSummary` to pretty JSON.
pub fn export_summary_json(summary: &OptimizationSummary) -> Result<String> {
    serde_json::to_string_pretty(summary)
        .context("failed to serialize OptimizationSummary to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: side, signal_date, entry_index, entry_date, entry_price, shares,
/// exit_index, exit_date, exit_price, exit_reason, pnl, pnl_percent,
/// duration_days, is_reentry, reentry_count, running_pnl, running_capital,
/// drawdown_percent
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "signal_date",
        "entry_index",
        "entry_date",
        "entry_price",
        "shares",
        "exit_index",
        "exit_date",
        "exit_price",
        "exit_reason",
        "pnl",
        "pnl_percent",
        "duration_days",
        "is_reentry",
        "reentry_count",
        "running_pnl",
        "running_capital",
        "drawdown_percent",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.position_side.to_string(),
            &t.signal_date.to_string(),
            &t.entry_index.to_string(),
            &t.entry_date.to_string(),
            &format!("{:.4}", t.entry_price),
            &t.shares.to_string(),
            &t.exit_index.to_string(),
            &t.exit_date.to_string(),
            &format!("{:.4}", t.exit_price),
            t.exit_reason.label(),
            &format!("{:.2}", t.pnl),
            &format!("{:.4}", t.pnl_percent),
            &t.duration_days.to_string(),
            &t.is_reentry.to_string(),
            &t.reentry_count.to_string(),
            &format!("{:.2}", t.running_pnl),
            &format!("{:.2}", t.running_capital),
            &format!("{:.4}", t.drawdown_percent),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with date and equity columns.
pub fn export_equity_csv(equity_curve: &[EquityCurvePoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"])?;
    for point in equity_curve {
        wtr.write_record([&point.date.to_string(), &format!("{:.2}", point.equity)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export ranked optimizer results as CSV, one row per pair.
///
/// An infinite profit factor is written as `inf`.
pub fn export_optimization_csv(results: &[OptimizationResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "fast_period",
        "slow_period",
        "distance",
        "total_return_percent",
        "sharpe_ratio",
        "max_drawdown_percent",
        "win_rate",
        "profit_factor",
        "total_trades",
        "avg_trade_duration",
    ])?;
    for (i, r) in results.iter().enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &r.fast_period.to_string(),
            &r.slow_period.to_string(),
            &r.distance.to_string(),
            &format!("{:.4}", r.total_return_percent),
            &format!("{:.2}", r.sharpe_ratio),
            &format!("{:.4}", r.max_drawdown_percent),
            &format!("{:.2}", r.win_rate),
            &format_profit_factor(r.profit_factor),
            &r.total_trades.to_string(),
            &format!("{:.1}", r.avg_trade_duration),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a heatmap as a grid: one row per fast period, one column per slow
/// period. Missing cells are empty.
pub fn export_heatmap_csv(heatmap: &Heatmap) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![format!("fast\\slow ({})", heatmap.metric)];
    header.extend(heatmap.slow_periods.iter().map(|s| s.to_string()));
    wtr.write_record(&header)?;

    for (fast, row) in heatmap.fast_periods.iter().zip(&heatmap.cells) {
        let mut record = vec![fast.to_string()];
        record.extend(
            row.iter()
                .map(|cell| cell.map(|v| format!("{v:.4}")).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn format_profit_factor(pf: f64) -> String {
    if pf.is_infinite() {
        "inf".to_string()
    } else {
        format!("{pf:.2}")
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one analysis.
///
/// Creates `{symbol}_{config_hash[..12]}/` under `output_dir` containing:
/// - `analysis.json` the full `AnalysisResult`
/// - `trades.csv` trade tape
/// - `equity.csv` bar-by-bar equity curve
/// - `report.md` Markdown summary
///
/// Returns the path to the created directory.
pub fn save_analysis_artifacts(result: &AnalysisResult, output_dir: &Path) -> Result<PathBuf> {
    let short_hash: String = result.config_hash.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{short_hash}", result.symbol));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("analysis.json"), export_analysis_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(&result.equity_curve)?)?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))?;

    Ok(run_dir)
}

/// Save `summary.json`, `results.csv`, and one heatmap CSV per metric.
pub fn save_optimization_artifacts(
    summary: &OptimizationSummary,
    output_dir: &Path,
) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("{}_optimization", summary.symbol));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("summary.json"), export_summary_json(summary)?)?;
    std::fs::write(
        run_dir.join("results.csv"),
        export_optimization_csv(summary.ranked())?,
    )?;
    for metric in crate::heatmap::HeatmapMetric::ALL {
        let csv = export_heatmap_csv(&summary.heatmap(metric))?;
        std::fs::write(run_dir.join(format!("heatmap_{metric}.csv")), csv)?;
    }

    Ok(run_dir)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Human-readable Markdown summary of one analysis.
pub fn generate_report(result: &AnalysisResult) -> String {
    let m = &result.performance_metrics;
    let c = &result.config;
    let mut out = String::new();

    let _ = writeln!(out, "# {}: MA crossover analysis\n", result.symbol);
    let _ = writeln!(
        out,
        "{} to {} ({} days), {} {}/{} MAs, mode {}\n",
        result.start_date,
        result.end_date,
        result.total_days,
        c.ma_type.to_string().to_uppercase(),
        c.fast_period,
        c.slow_period,
        c.strategy_mode
    );

    let _ = writeln!(out, "## Performance\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|---|---|");
    let rows: [(&str, String); 10] = [
        ("Total trades", m.total_trades.to_string()),
        ("Win rate", format!("{:.1}%", m.win_rate)),
        ("Total P&L", format!("{:.2}", m.total_pnl)),
        ("Total return", format!("{:.2}%", m.total_return_percent)),
        ("Avg duration", format!("{:.1} days", m.avg_trade_duration)),
        ("Largest win", format!("{:.2}", m.largest_win)),
        ("Largest loss", format!("{:.2}", m.largest_loss)),
        ("Max drawdown", format!("{:.2} ({:.2}%)", m.max_drawdown, m.max_drawdown_percent)),
        ("Sharpe (per trade)", format!("{:.2}", m.sharpe_ratio)),
        ("Final capital", format!("{:.2}", m.final_capital)),
    ];
    for (name, value) in rows {
        let _ = writeln!(out, "| {name} | {value} |");
    }

    let _ = writeln!(out, "\n## Trades\n");
    let _ = writeln!(out, "| # | Side | Entry | Exit | Shares | P&L | Exit reason |");
    let _ = writeln!(out, "|---|---|---|---|---|---|---|");
    for (i, t) in result.trades.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {}{} | {} @ {:.2} | {} @ {:.2} | {} | {:.2} | {} |",
            i + 1,
            t.position_side,
            if t.is_reentry { " (re-entry)" } else { "" },
            t.entry_date,
            t.entry_price,
            t.exit_date,
            t.exit_price,
            t.shares,
            t.pnl,
            t.exit_reason
        );
    }

    if !result.mean_reversion_alerts.is_empty() {
        let _ = writeln!(out, "\n## Mean-reversion alerts\n");
        for alert in &result.mean_reversion_alerts {
            let _ = writeln!(out, "- {}: {}", alert.date, alert.message);
        }
    }

    out
}
