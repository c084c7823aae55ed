//! Derived views over an evaluation: where waste happens, how full the ward
//! gets, how both move over time, and how two room mixes compare.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::config::DOUBLE_ROOM_CAPACITY;
use crate::evaluator::{DailyOutcome, EvaluationSeries};
use crate::room::RoomConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeakDay {
    pub date: NaiveDate,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteAnalysis {
    pub total_wasted_beds: u64,
    pub total_wasted_potential: u64,
    pub days_with_bed_waste: usize,
    pub days_with_potential_waste: usize,
    pub days_with_any_waste: usize,
    /// Earliest day with the most wasted beds, if any bed was wasted
    pub peak_wasted_beds: Option<PeakDay>,
    pub peak_wasted_potential: Option<PeakDay>,
    /// Longest run of consecutive calendar days with wasted beds
    pub longest_bed_waste_streak: usize,
    pub longest_potential_waste_streak: usize,
}

impl WasteAnalysis {
    pub fn from_series(series: &EvaluationSeries) -> Self {
        let outcomes = series.outcomes();
        let summary = series.summary();
        Self {
            total_wasted_beds: summary.total_wasted_beds,
            total_wasted_potential: summary.total_wasted_potential,
            days_with_bed_waste: summary.days_with_waste,
            days_with_potential_waste: summary.days_with_wasted_potential,
            days_with_any_waste: outcomes.iter().filter(|o| o.total_waste() > 0).count(),
            peak_wasted_beds: peak(outcomes, |o| o.wasted_beds),
            peak_wasted_potential: peak(outcomes, |o| o.wasted_potential),
            longest_bed_waste_streak: longest_streak(outcomes, |o| o.wasted_beds > 0),
            longest_potential_waste_streak: longest_streak(outcomes, |o| o.wasted_potential > 0),
        }
    }
}

fn peak(outcomes: &[DailyOutcome], value: impl Fn(&DailyOutcome) -> u32) -> Option<PeakDay> {
    outcomes
        .iter()
        .map(|o| PeakDay {
            date: o.date,
            value: value(o),
        })
        .filter(|p| p.value > 0)
        // reversed so ties resolve to the earliest date
        .rev()
        .max_by_key(|p| p.value)
}

fn longest_streak(outcomes: &[DailyOutcome], wasteful: impl Fn(&DailyOutcome) -> bool) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for outcome in outcomes {
        if !wasteful(outcome) {
            current = 0;
        } else if current > 0 && previous.and_then(|d| d.succ_opt()) == Some(outcome.date) {
            current += 1;
        } else {
            current = 1;
        }
        longest = longest.max(current);
        previous = Some(outcome.date);
    }
    longest
}

/// Aggregates for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTrend {
    pub year: i32,
    pub month: u32,
    pub days: usize,
    pub available_beds: u64,
    pub occupied_beds: u64,
    pub wasted_beds: u64,
    pub wasted_potential: u64,
    pub over_capacity_days: usize,
    /// Bed-day weighted efficiency within the month
    pub period_efficiency: f64,
    pub mean_daily_efficiency: f64,
}

impl PeriodTrend {
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// One trend row per calendar month present in the series, in order
pub fn monthly_trends(series: &EvaluationSeries) -> Vec<PeriodTrend> {
    let mut months: BTreeMap<(i32, u32), Vec<&DailyOutcome>> = BTreeMap::new();
    for outcome in series.outcomes() {
        months
            .entry((outcome.date.year(), outcome.date.month()))
            .or_default()
            .push(outcome);
    }

    months
        .into_iter()
        .map(|((year, month), days)| {
            let available_beds: u64 = days.iter().map(|o| o.available_beds as u64).sum();
            let occupied_beds: u64 = days.iter().map(|o| o.occupied_beds as u64).sum();
            let period_efficiency = if available_beds == 0 {
                1.0
            } else {
                occupied_beds as f64 / available_beds as f64
            };
            PeriodTrend {
                year,
                month,
                days: days.len(),
                available_beds,
                occupied_beds,
                wasted_beds: days.iter().map(|o| o.wasted_beds as u64).sum(),
                wasted_potential: days.iter().map(|o| o.wasted_potential as u64).sum(),
                over_capacity_days: days.iter().filter(|o| o.over_capacity).count(),
                period_efficiency,
                mean_daily_efficiency: days.iter().map(|o| o.daily_efficiency).sum::<f64>() / days.len() as f64,
            }
        })
        .collect()
}

/// Patient occupancy of one day. Unlike `DailyOutcome::occupied_beds`,
/// which only subtracts waste, this counts the patients actually in a bed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyUtilization {
    pub date: NaiveDate,
    pub patients_housed: u32,
    pub rooms_used: u32,
    pub available_beds: u32,
    /// `patients_housed / available_beds`; 0 with no open bed, above 1 when
    /// closures leave fewer open beds than patients placed
    pub utilization_rate: f64,
    /// Every open bed or every room taken, or somebody turned away
    pub at_max_capacity: bool,
}

/// How close one room mix runs to full over a series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityAnalysis {
    pub configuration: RoomConfiguration,
    pub days: usize,
    pub daily: Vec<DailyUtilization>,
    pub max_capacity_dates: Vec<NaiveDate>,
    pub turn_away_dates: Vec<NaiveDate>,
    pub mean_utilization: f64,
    /// Sample standard deviation, 0 below two days
    pub utilization_std_dev: f64,
    pub min_utilization: f64,
    pub max_utilization: f64,
}

impl CapacityAnalysis {
    pub fn from_series(series: &EvaluationSeries) -> Self {
        let configuration = series.configuration();
        let total_rooms = configuration.total_rooms();

        let daily: Vec<DailyUtilization> = series
            .outcomes()
            .iter()
            .map(|o| {
                let singles_placed = o.single_demand - o.single_overflow;
                let rooms_used = singles_placed
                    + o.overflow_in_doubles
                    + o.doubles_placed.div_ceil(DOUBLE_ROOM_CAPACITY)
                    + o.doubles_in_singles;
                let utilization_rate = if o.available_beds == 0 {
                    0.0
                } else {
                    o.patients_housed as f64 / o.available_beds as f64
                };
                DailyUtilization {
                    date: o.date,
                    patients_housed: o.patients_housed,
                    rooms_used,
                    available_beds: o.available_beds,
                    utilization_rate,
                    at_max_capacity: o.patients_housed >= o.available_beds
                        || rooms_used >= total_rooms
                        || o.turned_away > 0,
                }
            })
            .collect();

        let rates: Vec<f64> = daily.iter().map(|d| d.utilization_rate).collect();
        let n = rates.len() as f64;
        let mean = if rates.is_empty() { 0.0 } else { rates.iter().sum::<f64>() / n };
        let std_dev = if rates.len() < 2 {
            0.0
        } else {
            (rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };

        let analysis = Self {
            configuration,
            days: daily.len(),
            max_capacity_dates: daily.iter().filter(|d| d.at_max_capacity).map(|d| d.date).collect(),
            turn_away_dates: series
                .outcomes()
                .iter()
                .filter(|o| o.turned_away > 0)
                .map(|o| o.date)
                .collect(),
            mean_utilization: mean,
            utilization_std_dev: std_dev,
            min_utilization: rates.iter().copied().reduce(f64::min).unwrap_or(0.0),
            max_utilization: rates.iter().copied().reduce(f64::max).unwrap_or(0.0),
            daily,
        };
        debug!(
            "Capacity of {}: {} of {} days at max capacity, mean utilization {:.1}%",
            configuration,
            analysis.max_capacity_dates.len(),
            analysis.days,
            analysis.mean_utilization * 100.0
        );
        analysis
    }
}

/// Capacity of a candidate against a baseline over the same days.
/// Reductions are `baseline - candidate`, gains are `candidate - baseline`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityComparison {
    pub baseline: RoomConfiguration,
    pub candidate: RoomConfiguration,
    pub max_capacity_day_reduction: i64,
    pub turn_away_day_reduction: i64,
    pub utilization_gain: f64,
    /// Drop in the day-to-day spread of utilization
    pub utilization_stability_gain: f64,
}

impl CapacityComparison {
    pub fn new(baseline: &CapacityAnalysis, candidate: &CapacityAnalysis) -> Self {
        Self {
            baseline: baseline.configuration,
            candidate: candidate.configuration,
            max_capacity_day_reduction: baseline.max_capacity_dates.len() as i64
                - candidate.max_capacity_dates.len() as i64,
            turn_away_day_reduction: baseline.turn_away_dates.len() as i64 - candidate.turn_away_dates.len() as i64,
            utilization_gain: candidate.mean_utilization - baseline.mean_utilization,
            utilization_stability_gain: baseline.utilization_std_dev - candidate.utilization_std_dev,
        }
    }
}

pub const DEFAULT_ROLLING_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollingEfficiency {
    pub date: NaiveDate,
    /// Days the mean covers; fewer than the window at the start of a series
    pub days: usize,
    pub efficiency: f64,
}

/// Trailing mean of daily efficiency over the last `window` evaluated days
/// (at least one)
pub fn rolling_efficiency(series: &EvaluationSeries, window: usize) -> Vec<RollingEfficiency> {
    let window = window.max(1);
    let outcomes = series.outcomes();
    outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| {
            let covered = &outcomes[(i + 1).saturating_sub(window)..=i];
            RollingEfficiency {
                date: outcome.date,
                days: covered.len(),
                efficiency: covered.iter().map(|o| o.daily_efficiency).sum::<f64>() / covered.len() as f64,
            }
        })
        .collect()
}

/// A candidate room mix measured against a baseline over the same days.
/// Reductions are `baseline - candidate`, gains are `candidate - baseline`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelComparison {
    pub baseline: RoomConfiguration,
    pub candidate: RoomConfiguration,
    pub wasted_bed_reduction: i64,
    pub wasted_potential_reduction: i64,
    pub total_waste_reduction: i64,
    pub weighted_waste_reduction: f64,
    pub cumulative_efficiency_gain: f64,
    pub mean_daily_efficiency_gain: f64,
    /// Candidate over-capacity days minus baseline ones
    pub over_capacity_day_difference: i64,
}

impl ModelComparison {
    pub fn new(baseline: &EvaluationSeries, candidate: &EvaluationSeries) -> Self {
        let b = baseline.summary();
        let c = candidate.summary();
        Self {
            baseline: baseline.configuration(),
            candidate: candidate.configuration(),
            wasted_bed_reduction: b.total_wasted_beds as i64 - c.total_wasted_beds as i64,
            wasted_potential_reduction: b.total_wasted_potential as i64 - c.total_wasted_potential as i64,
            total_waste_reduction: b.total_waste() as i64 - c.total_waste() as i64,
            weighted_waste_reduction: b.weighted_waste - c.weighted_waste,
            cumulative_efficiency_gain: c.cumulative_efficiency - b.cumulative_efficiency,
            mean_daily_efficiency_gain: c.mean_daily_efficiency - b.mean_daily_efficiency,
            over_capacity_day_difference: c.over_capacity_days as i64 - b.over_capacity_days as i64,
        }
    }

    pub fn candidate_is_better(&self) -> bool {
        self.weighted_waste_reduction > 0.0
    }
}
