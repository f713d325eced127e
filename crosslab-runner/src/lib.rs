//! CrossLab Runner: MA pair optimization, heatmaps, and run artifacts.
//!
//! This crate builds on `crosslab-core` to provide:
//! - CSV and synthetic bar loading
//! - TOML configuration for engine and optimizer settings
//! - Grid sweeps and explicit pair comparison over MA periods
//! - Annualized optimizer metrics and metric heatmaps
//! - JSON, CSV, and Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod heatmap;
pub mod metrics;
pub mod optimizer;

pub use config::{ConfigError, CrossLabConfig, OptimizerSettings};
pub use data_loader::{generate_synthetic_bars, load_bars_csv, write_bars_csv, LoadError};
pub use export::{generate_report, save_analysis_artifacts, save_optimization_artifacts};
pub use heatmap::{Heatmap, HeatmapMetric};
pub use optimizer::{
    generate_pairs, parse_pairs, DateRange, MaPair, OptimizationResult, OptimizationSummary,
    ParameterOptimizer, PeriodRange,
};
