//! End-to-end: config file, CSV bars, analysis, optimization, and artifacts.

use crosslab_core::Engine;
use crosslab_runner::{
    generate_synthetic_bars, load_bars_csv, save_analysis_artifacts,
    save_optimization_artifacts, write_bars_csv, CrossLabConfig, HeatmapMetric,
    ParameterOptimizer,
};

const CONFIG: &str = r#"
[engine]
ma_type = "sma"
fast_period = 10
slow_period = 30
strategy_mode = "both"

[optimizer]
fast_min = 5
fast_max = 12
slow_min = 20
slow_max = 40
min_distance = 10
parallel = false
"#;

#[test]
fn csv_to_analysis_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("crosslab.toml");
    std::fs::write(&config_path, CONFIG).unwrap();
    let config = CrossLabConfig::load(&config_path).unwrap();
    assert_eq!(config.engine.fast_period, 10);
    assert!(!config.optimizer.parallel);

    let csv_path = dir.path().join("bars.csv");
    write_bars_csv(&generate_synthetic_bars(300, 5), &csv_path).unwrap();
    let bars = load_bars_csv(&csv_path).unwrap();
    assert_eq!(bars.len(), 300);

    let engine = Engine::new(config.engine.clone()).unwrap();
    let result = engine.run_analysis(&bars, "SYN").unwrap();
    assert_eq!(result.config_hash, engine.config_hash());

    let out = dir.path().join("out");
    let run_dir = save_analysis_artifacts(&result, &out).unwrap();
    for file in ["analysis.json", "trades.csv", "equity.csv", "report.md"] {
        assert!(run_dir.join(file).exists(), "{file} missing");
    }

    let json = std::fs::read_to_string(run_dir.join("analysis.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["symbol"], "SYN");
    assert_eq!(
        value["trades"].as_array().map(Vec::len),
        Some(result.trades.len())
    );

    let trades_csv = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades_csv.lines().count(), result.trades.len() + 1);
}

#[test]
fn optimization_artifacts_include_every_heatmap() {
    let config = CrossLabConfig::from_toml_str(CONFIG).unwrap();
    let settings = &config.optimizer;
    let bars = generate_synthetic_bars(400, 9);

    let summary = ParameterOptimizer::new(config.engine.clone())
        .with_parallelism(settings.parallel)
        .optimize_ma_pairs(
            &bars,
            "SYN",
            settings.fast_range().unwrap(),
            settings.slow_range().unwrap(),
            settings.min_distance,
        )
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_optimization_artifacts(&summary, dir.path()).unwrap();
    assert!(run_dir.join("summary.json").exists());

    let results_csv = std::fs::read_to_string(run_dir.join("results.csv")).unwrap();
    assert_eq!(results_csv.lines().count(), summary.results.len() + 1);

    for metric in HeatmapMetric::ALL {
        let path = run_dir.join(format!("heatmap_{metric}.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        // Header plus one row per fast period.
        assert_eq!(
            content.lines().count(),
            summary.heatmap(metric).fast_periods.len() + 1
        );
    }
}
