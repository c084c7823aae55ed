use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use wardplan_solver::{ConstraintViolation, Solution, SolutionStatus, Solver};

use crate::census::DemandSeries;
use crate::config::WardConfig;
use crate::evaluator::EvaluationError;
use crate::formulation::{DOUBLE_ROOMS, Formulation, SINGLE_ROOMS};
use crate::room::RoomConfiguration;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Cannot optimize over an empty demand series")]
    EmptySeries,
    #[error("No room configuration satisfies the ward constraints{}", describe(.violations))]
    Infeasible { violations: Vec<ConstraintViolation> },
    #[error("Optimization problem is unbounded")]
    Unbounded,
    #[error("Solver failure: {0}")]
    SolverFailure(String),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

fn describe(violations: &[ConstraintViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("\n  {}: {}", v.constraint, v.description))
        .collect()
}

/// Auxiliary variable values for one day of the series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyAuxiliary {
    pub date: NaiveDate,
    pub single_overflow: f64,
    pub unused_double_beds: f64,
    pub paired_in_single: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub configuration: RoomConfiguration,
    pub objective_value: f64,
    pub status: SolutionStatus,
    /// One entry per day in date order, also when identical days were collapsed
    pub daily: Vec<DailyAuxiliary>,
    pub nodes: usize,
    pub iterations: usize,
}

/// Chooses the room mix minimizing weighted waste over a demand series
#[derive(Debug, Clone)]
pub struct ConfigurationOptimizer {
    config: WardConfig,
    solver: Solver,
}

impl ConfigurationOptimizer {
    pub fn new(config: WardConfig) -> Self {
        let solver = Solver::new()
            .with_max_nodes(config.solver.max_nodes)
            .with_max_iterations(config.solver.max_iterations)
            .with_integrality_tolerance(config.solver.integrality_tolerance);
        Self { config, solver }
    }

    pub fn config(&self) -> &WardConfig {
        &self.config
    }

    pub fn formulate(&self, series: &DemandSeries) -> Formulation {
        Formulation::build(&self.config, series)
    }

    pub fn optimize(&self, series: &DemandSeries) -> Result<OptimizationResult, OptimizeError> {
        if series.is_empty() {
            return Err(OptimizeError::EmptySeries);
        }

        let formulation = self.formulate(series);
        info!(
            "Optimizing {}-bed ward over {} days ({} demand profiles)",
            self.config.ward.total_beds,
            series.len(),
            formulation.num_profiles()
        );

        let solution = self.solver.solve(&formulation.problem);
        debug!(
            status = %solution.status,
            nodes = solution.nodes,
            iterations = solution.iterations,
            "Solver finished"
        );

        match solution.status {
            SolutionStatus::Optimal => self.extract(&formulation, solution),
            SolutionStatus::Infeasible => {
                warn!("Room mix optimization infeasible{}", describe(&solution.violations));
                Err(OptimizeError::Infeasible {
                    violations: solution.violations,
                })
            }
            SolutionStatus::Unbounded => {
                warn!("Room mix optimization unbounded");
                Err(OptimizeError::Unbounded)
            }
            SolutionStatus::NodeLimit => {
                warn!("Branch-and-bound hit its node limit after {} nodes", solution.nodes);
                Err(OptimizeError::SolverFailure(format!(
                    "node limit of {} reached before an integer optimum was proven",
                    self.config.solver.max_nodes
                )))
            }
            SolutionStatus::Error => Err(OptimizeError::SolverFailure(
                "simplex did not converge or the model was malformed".to_string(),
            )),
        }
    }

    fn extract(&self, formulation: &Formulation, solution: Solution) -> Result<OptimizationResult, OptimizeError> {
        let room_count = |idx: usize| {
            solution
                .integer_value(idx)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| OptimizeError::SolverFailure(format!("no usable value for variable {}", idx)))
        };
        let configuration = RoomConfiguration::new(
            room_count(SINGLE_ROOMS)?,
            room_count(DOUBLE_ROOMS)?,
            self.config.ward.total_beds,
        )?;

        let value = |idx: usize| solution.values.get(idx).copied().unwrap_or(0.0).max(0.0);
        let mut daily = Vec::new();
        for (profile, cols) in formulation.profiles.iter().zip(&formulation.columns) {
            for &date in &profile.dates {
                daily.push(DailyAuxiliary {
                    date,
                    single_overflow: value(cols.overflow),
                    unused_double_beds: value(cols.unused),
                    paired_in_single: cols.paired.map_or(0.0, value),
                });
            }
        }
        daily.sort_by_key(|aux| aux.date);

        info!(
            "Optimal configuration {} with objective {:.2} ({} nodes)",
            configuration, solution.objective_value, solution.nodes
        );

        Ok(OptimizationResult {
            configuration,
            objective_value: solution.objective_value,
            status: solution.status,
            daily,
            nodes: solution.nodes,
            iterations: solution.iterations,
        })
    }
}
