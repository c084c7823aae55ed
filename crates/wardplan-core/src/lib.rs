pub mod analysis;
pub mod census;
pub mod config;
pub mod evaluator;
pub mod formulation;
pub mod optimizer;
pub mod report;
pub mod room;
pub mod sweep;

pub use analysis::{
    CapacityAnalysis, CapacityComparison, DEFAULT_ROLLING_WINDOW, DailyUtilization, ModelComparison, PeakDay,
    PeriodTrend, RollingEfficiency, WasteAnalysis, monthly_trends, rolling_efficiency,
};
pub use census::{CensusError, CensusRecord, DailyDemand, DemandSeries};
pub use config::{ConfigError, ObjectiveWeights, SolverSettings, WardConfig, WardSettings};
pub use evaluator::{AllocationEvaluator, DailyOutcome, EvaluationError, EvaluationSeries, EvaluationSummary};
pub use formulation::{DemandProfile, Formulation, relaxed_day_cost};
pub use optimizer::{ConfigurationOptimizer, DailyAuxiliary, OptimizationResult, OptimizeError};
pub use report::ReportError;
pub use room::RoomConfiguration;
pub use sweep::{CrossCheck, SweepCandidate, SweepError, SweepReport, sweep};
