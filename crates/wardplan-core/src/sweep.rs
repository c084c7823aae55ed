//! Brute-force check of every room mix the ward admits.

use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::census::DemandSeries;
use crate::config::{WardConfig, WardSettings};
use crate::evaluator::{AllocationEvaluator, EvaluationError, EvaluationSummary};
use crate::optimizer::OptimizationResult;
use crate::room::RoomConfiguration;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("No room configuration of a {total_beds}-bed ward fits within the room bounds")]
    NoCandidates { total_beds: u32 },
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Every configuration with `S + 2D == total_beds` inside the room bounds,
/// in ascending order of double rooms
pub fn candidates(ward: &WardSettings) -> Vec<RoomConfiguration> {
    (0..=ward.max_double_rooms())
        .map_while(|double| RoomConfiguration::with_double_rooms(double, ward.total_beds))
        .filter(|c| c.single_rooms() <= ward.max_single_rooms())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepCandidate {
    pub configuration: RoomConfiguration,
    pub summary: EvaluationSummary,
}

impl SweepCandidate {
    pub fn weighted_waste(&self) -> f64 {
        self.summary.weighted_waste
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Every candidate in ascending order of double rooms
    pub candidates: Vec<SweepCandidate>,
    /// Lowest weighted waste; ties go to fewer double rooms
    pub best: SweepCandidate,
}

impl SweepReport {
    pub fn find(&self, configuration: &RoomConfiguration) -> Option<&SweepCandidate> {
        self.candidates.iter().find(|c| c.configuration == *configuration)
    }
}

pub fn sweep(config: &WardConfig, series: &DemandSeries) -> Result<SweepReport, SweepError> {
    let configurations = candidates(&config.ward);
    info!("Sweeping {} room configurations over {} days", configurations.len(), series.len());

    let evaluator = AllocationEvaluator::new(config);
    let rows = configurations
        .par_iter()
        .map(|configuration| {
            evaluator.evaluate(configuration, series).map(|evaluation| SweepCandidate {
                configuration: *configuration,
                summary: evaluation.summary().clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let best = rows
        .iter()
        .min_by(|a, b| a.weighted_waste().total_cmp(&b.weighted_waste()))
        .cloned()
        .ok_or(SweepError::NoCandidates {
            total_beds: config.ward.total_beds,
        })?;

    info!(
        "Sweep best {} with weighted waste {:.2}",
        best.configuration,
        best.weighted_waste()
    );

    Ok(SweepReport { candidates: rows, best })
}

/// The optimizer's answer set against the sweep winner. The two measure
/// overflow differently, so disagreement is a finding, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossCheck {
    pub optimizer_configuration: RoomConfiguration,
    pub optimizer_objective: f64,
    /// The optimizer's configuration scored by the evaluator, when the sweep covered it
    pub optimizer_weighted_waste: Option<f64>,
    pub sweep_configuration: RoomConfiguration,
    pub sweep_weighted_waste: f64,
    pub agree: bool,
}

impl CrossCheck {
    pub fn new(result: &OptimizationResult, report: &SweepReport) -> Self {
        let agree = result.configuration == report.best.configuration;
        let check = Self {
            optimizer_configuration: result.configuration,
            optimizer_objective: result.objective_value,
            optimizer_weighted_waste: report.find(&result.configuration).map(SweepCandidate::weighted_waste),
            sweep_configuration: report.best.configuration,
            sweep_weighted_waste: report.best.weighted_waste(),
            agree,
        };
        if !agree {
            info!("Optimizer and sweep disagree: {}", check);
        }
        check
    }
}

impl fmt::Display for CrossCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.agree {
            return write!(
                f,
                "optimizer and sweep agree on {} (weighted waste {:.2})",
                self.sweep_configuration, self.sweep_weighted_waste
            );
        }
        write!(
            f,
            "optimizer chose {} (objective {:.2}",
            self.optimizer_configuration, self.optimizer_objective
        )?;
        if let Some(waste) = self.optimizer_weighted_waste {
            write!(f, ", evaluated waste {:.2}", waste)?;
        }
        write!(
            f,
            "), sweep chose {} (weighted waste {:.2})",
            self.sweep_configuration, self.sweep_weighted_waste
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::census::DailyDemand;
    use crate::config::ObjectiveWeights;
    use crate::optimizer::ConfigurationOptimizer;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn series(days: &[(u32, u32)]) -> DemandSeries {
        DemandSeries::new(
            days.iter()
                .enumerate()
                .map(|(i, &(s, d))| {
                    DailyDemand::new(NaiveDate::from_ymd_opt(2024, 7, i as u32 + 1).unwrap(), s, d)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_default_ward_has_fourteen_candidates() {
        let all = candidates(&WardSettings::new(26));
        assert_eq!(all.len(), 14);
        assert_eq!(all[0], RoomConfiguration::new(26, 0, 26).unwrap());
        assert_eq!(all[13], RoomConfiguration::all_double(26));
        assert!(all.iter().all(|c| c.total_beds() == 26));
    }

    #[rstest]
    #[case(WardSettings::new(26).with_max_single_rooms(10), 6)]
    #[case(WardSettings::new(26).with_max_double_rooms(4), 5)]
    #[case(WardSettings::new(25), 13)]
    #[case(WardSettings::new(25).with_max_single_rooms(0), 0)]
    #[case(WardSettings::new(26).with_max_double_rooms(40), 14)]
    fn test_candidate_bounds(#[case] ward: WardSettings, #[case] expected: usize) {
        assert_eq!(candidates(&ward).len(), expected);
    }

    #[test]
    fn test_sweep_ranks_by_weighted_waste() {
        let config = WardConfig::new(WardSettings::new(26).with_max_single_rooms(10));
        let report = sweep(&config, &series(&[(11, 9), (8, 12), (12, 10)])).unwrap();

        assert_eq!(report.candidates.len(), 6);
        assert_eq!(report.best.configuration, RoomConfiguration::new(10, 8, 26).unwrap());
        assert_eq!(report.best.weighted_waste(), 14.0);
        assert_eq!(report.candidates[1].weighted_waste(), 16.0);

        let doubles: Vec<u32> = report.candidates.iter().map(|c| c.configuration.double_rooms()).collect();
        assert_eq!(doubles, (8..=13).collect::<Vec<_>>());
    }

    #[test]
    fn test_ties_keep_fewer_double_rooms() {
        let config = WardConfig::default().with_weights(ObjectiveWeights::new(1.0, 0.0));
        let report = sweep(&config, &series(&[(0, 0), (0, 0)])).unwrap();

        assert!(report.candidates.iter().all(|c| c.weighted_waste() == 0.0));
        assert_eq!(report.best.configuration.double_rooms(), 0);
    }

    #[test]
    fn test_no_candidates() {
        let config = WardConfig::new(WardSettings::new(25).with_max_single_rooms(0));
        let err = sweep(&config, &series(&[(0, 4)])).unwrap_err();
        assert!(matches!(err, SweepError::NoCandidates { total_beds: 25 }));
    }

    #[test]
    fn test_invalid_day_fails_sweep() {
        let err = sweep(&WardConfig::default(), &series(&[(20, 10)])).unwrap_err();
        assert!(matches!(err, SweepError::Evaluation(EvaluationError::InvalidDemand { .. })));
    }

    #[test]
    fn test_cross_check_agreement() {
        let config = WardConfig::new(WardSettings::new(26).with_max_single_rooms(10));
        let series = series(&[(11, 9), (8, 12), (12, 10)]);

        let result = ConfigurationOptimizer::new(config.clone()).optimize(&series).unwrap();
        let report = sweep(&config, &series).unwrap();
        let check = CrossCheck::new(&result, &report);

        assert!(check.agree);
        assert_eq!(check.optimizer_weighted_waste, Some(14.0));
        assert!(check.to_string().contains("agree on 10S/8D"));
    }

    #[test]
    fn test_cross_check_reports_divergence() {
        let config = WardConfig::new(WardSettings::new(26).with_max_single_rooms(6))
            .with_weights(ObjectiveWeights::new(1.0, 2.0));
        let series = series(&[(5, 21), (9, 8)]);

        let result = ConfigurationOptimizer::new(config.clone()).optimize(&series).unwrap();
        let report = sweep(&config, &series).unwrap();
        let check = CrossCheck::new(&result, &report);

        assert!(!check.agree);
        assert_eq!(check.optimizer_configuration, RoomConfiguration::new(6, 10, 26).unwrap());
        assert!((check.optimizer_objective - 15.0).abs() < 1e-6);
        assert_eq!(check.optimizer_weighted_waste, Some(15.0));
        assert_eq!(check.sweep_configuration, RoomConfiguration::new(4, 11, 26).unwrap());
        assert_eq!(check.sweep_weighted_waste, 14.0);
        assert!(check.to_string().contains("sweep chose 4S/11D"));
    }
}
