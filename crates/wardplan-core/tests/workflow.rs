use std::io::Write;

use wardplan_core::{
    AllocationEvaluator, CapacityAnalysis, ConfigurationOptimizer, CrossCheck, DEFAULT_ROLLING_WINDOW, ModelComparison,
    OptimizeError, RoomConfiguration, WardConfig, WasteAnalysis, census, monthly_trends, report, rolling_efficiency,
    sweep,
};

const CENSUS: &str = "\
date,single_demand,double_demand,closed_rooms
2024-01-30,11,9,0
2024-01-31,8,12,0
2024-02-01,12,10,0
2024-02-02,11,9,1
2024-02-03,8,12,0
";

const CONFIG: &str = "
[ward]
total_beds = 26
max_single_rooms = 10

[objective]
wasted_beds_weight = 1.0
wasted_potential_weight = 1.0
";

fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_optimize_evaluate_sweep_compare() {
    let dir = tempfile::tempdir().unwrap();
    let config = WardConfig::from_file(write_temp(&dir, "ward.toml", CONFIG)).unwrap();
    let series = census::read_csv(write_temp(&dir, "census.csv", CENSUS)).unwrap();
    assert_eq!(series.len(), 5);

    let result = ConfigurationOptimizer::new(config.clone()).optimize(&series).unwrap();
    assert_eq!(result.configuration, RoomConfiguration::new(10, 8, 26).unwrap());
    assert_eq!(result.daily.len(), 5);

    let evaluator = AllocationEvaluator::new(&config);
    let candidate = evaluator.evaluate(&result.configuration, &series).unwrap();
    let baseline = evaluator.evaluate(&RoomConfiguration::all_double(26), &series).unwrap();

    // closed room on 2024-02-02 leaves 24 beds
    assert_eq!(candidate.outcomes()[3].available_beds, 24);
    let last = candidate.outcomes().last().unwrap();
    assert_eq!(last.cumulative_efficiency, candidate.cumulative_efficiency());

    let comparison = ModelComparison::new(&baseline, &candidate);
    assert!(comparison.candidate_is_better());
    assert!(comparison.cumulative_efficiency_gain > 0.0);

    let report_sweep = sweep(&config, &series).unwrap();
    assert_eq!(report_sweep.candidates.len(), 6);
    let check = CrossCheck::new(&result, &report_sweep);
    assert!(check.agree, "{check}");

    let trends = monthly_trends(&candidate);
    assert_eq!(trends.len(), 2);
    assert_eq!(trends.iter().map(|t| t.days).sum::<usize>(), 5);

    let analysis = WasteAnalysis::from_series(&candidate);
    assert_eq!(analysis.longest_bed_waste_streak, 2);

    let capacity = CapacityAnalysis::from_series(&candidate);
    assert_eq!(capacity.days, 5);
    assert!(capacity.turn_away_dates.is_empty());
    assert_eq!(capacity.daily[3].available_beds, 24);
    assert_eq!(rolling_efficiency(&candidate, DEFAULT_ROLLING_WINDOW).len(), 5);

    let out = dir.path().join("outcomes.csv");
    report::write_outcomes_csv(report::create_file(&out).unwrap(), &candidate).unwrap();
    assert_eq!(std::fs::read_to_string(&out).unwrap().lines().count(), 6);
}

#[test]
fn test_infeasible_bounds_yield_no_configuration() {
    let config = WardConfig::from_toml_str("[ward]\ntotal_beds = 26\nmax_single_rooms = 10\nmax_double_rooms = 5\n").unwrap();
    let series = census::from_reader(CENSUS.as_bytes()).unwrap();

    let err = ConfigurationOptimizer::new(config).optimize(&series).unwrap_err();
    match err {
        OptimizeError::Infeasible { violations } => assert!(!violations.is_empty()),
        other => panic!("expected infeasible, got {other}"),
    }
}
