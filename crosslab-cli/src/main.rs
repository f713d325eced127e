//! CrossLab CLI: analyze, optimize, compare, and synthetic-data commands.
//!
//! Commands:
//! - `analyze`: run one MA-crossover analysis and save its artifacts
//! - `optimize`: sweep a fast/slow period grid and rank the pairs
//! - `compare`: evaluate an explicit list of pairs
//! - `synthetic`: write a seeded random-walk series as CSV

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crosslab_core::{AnalysisResult, Bar, Engine, MaType, StrategyMode};
use crosslab_runner::export::export_analysis_json;
use crosslab_runner::{
    generate_synthetic_bars, load_bars_csv, parse_pairs, save_analysis_artifacts,
    save_optimization_artifacts, write_bars_csv, CrossLabConfig, HeatmapMetric, OptimizationResult,
    ParameterOptimizer, PeriodRange,
};

#[derive(Parser)]
#[command(name = "crosslab", about = "CrossLab: MA crossover analysis and optimization")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis with the configured MA pair.
    Analyze {
        #[command(flatten)]
        data: DataArgs,

        /// Fast MA period (overrides config).
        #[arg(long)]
        fast: Option<usize>,

        /// Slow MA period (overrides config).
        #[arg(long)]
        slow: Option<usize>,

        /// Moving average type: ema or sma.
        #[arg(long)]
        ma_type: Option<MaType>,

        /// Strategy mode: long, short, or both.
        #[arg(long)]
        mode: Option<StrategyMode>,

        /// Print the full result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Output directory for artifacts.
        #[arg(long = "output", default_value = "results")]
        output_dir: PathBuf,
    },
    /// Sweep a fast/slow period grid and rank every pair by total return.
    Optimize {
        #[command(flatten)]
        data: DataArgs,

        #[arg(long)]
        fast_min: Option<usize>,

        #[arg(long)]
        fast_max: Option<usize>,

        #[arg(long)]
        slow_min: Option<usize>,

        #[arg(long)]
        slow_max: Option<usize>,

        /// Minimum slow - fast distance.
        #[arg(long)]
        min_distance: Option<usize>,

        /// Rows to print.
        #[arg(long)]
        top: Option<usize>,

        /// Evaluate pairs on the current thread only.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Output directory for artifacts.
        #[arg(long = "output", default_value = "results")]
        output_dir: PathBuf,
    },
    /// Evaluate an explicit list of pairs, e.g. `--pairs 10/50 20/100`.
    Compare {
        #[command(flatten)]
        data: DataArgs,

        /// Pairs as fast/slow or fast:slow.
        #[arg(long, required = true, num_args = 1..)]
        pairs: Vec<String>,

        /// Order the table by this metric instead of total return.
        #[arg(long)]
        metric: Option<HeatmapMetric>,
    },
    /// Write a seeded synthetic bar series as CSV.
    Synthetic {
        /// Number of bars.
        #[arg(long, default_value_t = 500)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
}

/// Where bars come from, plus the optional config file.
#[derive(Args)]
struct DataArgs {
    /// CSV file with date,open,high,low,close,volume columns.
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate this many synthetic bars instead of reading a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for synthetic bars.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Symbol label for reports.
    #[arg(long, default_value = "SYNTH")]
    symbol: String,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl DataArgs {
    fn load_bars(&self) -> Result<Vec<Bar>> {
        match (&self.data, self.synthetic) {
            (Some(path), _) => load_bars_csv(path)
                .with_context(|| format!("failed to load bars from {}", path.display())),
            (None, Some(n)) => {
                info!(bars = n, seed = self.seed, "generating synthetic bars");
                Ok(generate_synthetic_bars(n, self.seed))
            }
            (None, None) => bail!("one of --data or --synthetic is required"),
        }
    }

    fn load_config(&self) -> Result<CrossLabConfig> {
        match &self.config {
            Some(path) => CrossLabConfig::load(path)
                .with_context(|| format!("invalid config {}", path.display())),
            None => Ok(CrossLabConfig::default()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            data,
            fast,
            slow,
            ma_type,
            mode,
            json,
            output_dir,
        } => run_analyze(&data, fast, slow, ma_type, mode, json, &output_dir),
        Commands::Optimize {
            data,
            fast_min,
            fast_max,
            slow_min,
            slow_max,
            min_distance,
            top,
            sequential,
            output_dir,
        } => {
            let mut config = data.load_config()?;
            let settings = &mut config.optimizer;
            settings.fast_min = fast_min.unwrap_or(settings.fast_min);
            settings.fast_max = fast_max.unwrap_or(settings.fast_max);
            settings.slow_min = slow_min.unwrap_or(settings.slow_min);
            settings.slow_max = slow_max.unwrap_or(settings.slow_max);
            settings.min_distance = min_distance.unwrap_or(settings.min_distance);
            settings.top_n = top.unwrap_or(settings.top_n);
            if sequential {
                settings.parallel = false;
            }
            run_optimize(&data, &config, &output_dir)
        }
        Commands::Compare {
            data,
            pairs,
            metric,
        } => run_compare(&data, &pairs, metric),
        Commands::Synthetic { bars, seed, out } => run_synthetic(bars, seed, &out),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_analyze(
    data: &DataArgs,
    fast: Option<usize>,
    slow: Option<usize>,
    ma_type: Option<MaType>,
    mode: Option<StrategyMode>,
    json: bool,
    output_dir: &Path,
) -> Result<()> {
    let mut config = data.load_config()?.engine;
    config.fast_period = fast.unwrap_or(config.fast_period);
    config.slow_period = slow.unwrap_or(config.slow_period);
    config.ma_type = ma_type.unwrap_or(config.ma_type);
    config.strategy_mode = mode.unwrap_or(config.strategy_mode);

    let bars = data.load_bars()?;
    let engine = Engine::new(config)?;
    let result = engine.run_analysis(&bars, &data.symbol)?;

    if json {
        println!("{}", export_analysis_json(&result)?);
    } else {
        print_analysis(&result);
    }

    let run_dir = save_analysis_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_optimize(data: &DataArgs, config: &CrossLabConfig, output_dir: &Path) -> Result<()> {
    let settings = &config.optimizer;
    let fast_range = PeriodRange::new(settings.fast_min, settings.fast_max)?;
    let slow_range = PeriodRange::new(settings.slow_min, settings.slow_max)?;

    let bars = data.load_bars()?;
    let optimizer =
        ParameterOptimizer::new(config.engine.clone()).with_parallelism(settings.parallel);
    let summary = optimizer.optimize_ma_pairs(
        &bars,
        &data.symbol,
        fast_range,
        slow_range,
        settings.min_distance,
    )?;

    println!(
        "{}: {} bars, {} | {} pairs tested, {} skipped",
        summary.symbol,
        summary.bar_count,
        summary.date_range,
        summary.pairs_tested,
        summary.pairs_skipped
    );
    print_results(summary.top(settings.top_n));

    let run_dir = save_optimization_artifacts(&summary, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_compare(data: &DataArgs, specs: &[String], metric: Option<HeatmapMetric>) -> Result<()> {
    let pairs = parse_pairs(specs)?;
    let config = data.load_config()?;
    let bars = data.load_bars()?;
    let mut results = ParameterOptimizer::new(config.engine)
        .with_parallelism(config.optimizer.parallel)
        .compare_pairs(&bars, &data.symbol, &pairs)?;

    if results.len() < pairs.len() {
        println!(
            "{} of {} pairs produced results",
            results.len(),
            pairs.len()
        );
    }
    if let Some(metric) = metric {
        results.sort_by(|a, b| {
            let (a, b) = (metric.extract(a), metric.extract(b));
            if metric.is_higher_better() {
                b.total_cmp(&a)
            } else {
                a.total_cmp(&b)
            }
        });
    }
    print_results(&results);
    Ok(())
}

fn run_synthetic(n: usize, seed: u64, out: &Path) -> Result<()> {
    let bars = generate_synthetic_bars(n, seed);
    write_bars_csv(&bars, out).with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {n} bars to {}", out.display());
    Ok(())
}

fn print_analysis(result: &AnalysisResult) {
    let m = &result.performance_metrics;
    let c = &result.config;
    println!("=== {} ===", result.symbol);
    println!(
        "Period:       {} to {} ({} days)",
        result.start_date, result.end_date, result.total_days
    );
    println!(
        "Strategy:     {} {}/{} ({})",
        c.ma_type.to_string().to_uppercase(),
        c.fast_period,
        c.slow_period,
        c.strategy_mode
    );
    println!("Config hash:  {}", &result.config_hash[..12.min(result.config_hash.len())]);
    println!();
    println!(
        "Trades:       {} ({} long, {} short, {} re-entries)",
        m.total_trades, m.long_trades, m.short_trades, m.reentry_trades
    );
    println!("Win rate:     {:.1}%", m.win_rate);
    println!("Total P&L:    {:.2}", m.total_pnl);
    println!("Return:       {:.2}%", m.total_return_percent);
    println!(
        "Max DD:       {:.2} ({:.2}%)",
        m.max_drawdown, m.max_drawdown_percent
    );
    println!("Sharpe:       {:.2}", m.sharpe_ratio);
    println!("Final:        {:.2}", m.final_capital);
    println!("Signals:      {}", result.signals.len());
    println!("MR alerts:    {}", result.mean_reversion_alerts.len());
}

fn print_results(results: &[OptimizationResult]) {
    println!(
        "{:<4} {:>9} {:>10} {:>8} {:>8} {:>7} {:>7} {:>7}",
        "#", "Pair", "Return%", "Sharpe", "MaxDD%", "Win%", "PF", "Trades"
    );
    println!("{}", "-".repeat(68));
    for (i, r) in results.iter().enumerate() {
        let pf = if r.profit_factor.is_infinite() {
            "inf".to_string()
        } else {
            format!("{:.2}", r.profit_factor)
        };
        println!(
            "{:<4} {:>9} {:>10.2} {:>8.2} {:>8.2} {:>7.1} {:>7} {:>7}",
            i + 1,
            r.pair().to_string(),
            r.total_return_percent,
            r.sharpe_ratio,
            r.max_drawdown_percent,
            r.win_rate,
            pf,
            r.total_trades
        );
    }
}
