//! Deterministic allocation of one day's census onto a fixed room mix.
//!
//! Patients are placed in a fixed order: single-occupancy patients fill the
//! single rooms, the overflow takes a double room each (alone), paired
//! patients share what double rooms remain, and any paired patients still
//! waiting take idle single rooms. Whoever is left after that is turned away.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::census::{DailyDemand, DemandSeries};
use crate::config::{DOUBLE_ROOM_CAPACITY, ObjectiveWeights, WardConfig, WardSettings};
use crate::room::RoomConfiguration;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(
        "Configuration of {single_rooms} single and {double_rooms} double rooms holds {beds} beds, but the ward has {total_beds}"
    )]
    InvalidConfiguration {
        single_rooms: u32,
        double_rooms: u32,
        beds: u64,
        total_beds: u32,
    },
    #[error("{field} on {date} is {value}, above the ward limit of {limit}")]
    InvalidDemand {
        date: NaiveDate,
        field: &'static str,
        value: u32,
        limit: u32,
    },
}

/// What happened on one day under one configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyOutcome {
    pub date: NaiveDate,
    pub single_demand: u32,
    pub double_demand: u32,
    pub closed_rooms: u32,
    /// Single-occupancy patients beyond the single rooms
    pub single_overflow: u32,
    /// One idle bed per overflow patient alone in a double room
    pub wasted_beds: u32,
    /// Double-room beds left empty after paired and overflow patients
    pub wasted_potential: u32,
    /// Paired patients sharing double rooms
    pub doubles_placed: u32,
    /// Overflow patients who actually got a double room to themselves;
    /// `wasted_beds` also counts the ones turned away
    pub overflow_in_doubles: u32,
    /// Paired patients housed alone in otherwise idle single rooms
    pub doubles_in_singles: u32,
    /// Patients the configuration cannot house at all
    pub turned_away: u32,
    /// Demand exceeded the day's available beds or somebody was turned away
    pub over_capacity: bool,
    /// Beds holding a patient: everyone not turned away
    pub patients_housed: u32,
    pub available_beds: u32,
    pub occupied_beds: u32,
    pub daily_efficiency: f64,
    /// Bed-day weighted efficiency from the first day of the series to this one
    pub cumulative_efficiency: f64,
}

impl DailyOutcome {
    pub fn total_waste(&self) -> u32 {
        self.wasted_beds + self.wasted_potential
    }

    pub fn weighted_waste(&self, weights: &ObjectiveWeights) -> f64 {
        weights.apply(
            self.wasted_beds as u64,
            self.wasted_potential as u64,
            self.doubles_in_singles as u64,
        )
    }
}

/// Scalar roll-up of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub days: usize,
    pub total_available_beds: u64,
    pub total_occupied_beds: u64,
    pub total_wasted_beds: u64,
    pub total_wasted_potential: u64,
    pub total_overflow_in_doubles: u64,
    pub total_doubles_in_singles: u64,
    pub total_turned_away: u64,
    pub weighted_waste: f64,
    /// Occupied bed-days over available bed-days
    pub cumulative_efficiency: f64,
    /// Arithmetic mean of daily efficiencies (day weighted)
    pub mean_daily_efficiency: f64,
    pub min_daily_efficiency: f64,
    pub max_daily_efficiency: f64,
    pub days_with_waste: usize,
    pub days_with_wasted_potential: usize,
    pub over_capacity_days: usize,
}

impl EvaluationSummary {
    pub fn total_waste(&self) -> u64 {
        self.total_wasted_beds + self.total_wasted_potential
    }

    fn from_outcomes(outcomes: &[DailyOutcome], weights: &ObjectiveWeights) -> Self {
        let sum = |f: fn(&DailyOutcome) -> u32| outcomes.iter().map(|o| f(o) as u64).sum::<u64>();

        let total_available_beds = sum(|o| o.available_beds);
        let total_occupied_beds = sum(|o| o.occupied_beds);
        let total_wasted_beds = sum(|o| o.wasted_beds);
        let total_wasted_potential = sum(|o| o.wasted_potential);
        let total_doubles_in_singles = sum(|o| o.doubles_in_singles);

        let efficiencies = outcomes.iter().map(|o| o.daily_efficiency);
        let (min, max) = efficiencies
            .clone()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| (lo.min(e), hi.max(e)));
        let mean = if outcomes.is_empty() {
            1.0
        } else {
            efficiencies.sum::<f64>() / outcomes.len() as f64
        };

        Self {
            days: outcomes.len(),
            total_available_beds,
            total_occupied_beds,
            total_wasted_beds,
            total_wasted_potential,
            total_overflow_in_doubles: sum(|o| o.overflow_in_doubles),
            total_doubles_in_singles,
            total_turned_away: sum(|o| o.turned_away),
            weighted_waste: weights.apply(total_wasted_beds, total_wasted_potential, total_doubles_in_singles),
            cumulative_efficiency: ratio(total_occupied_beds, total_available_beds),
            mean_daily_efficiency: mean,
            min_daily_efficiency: if outcomes.is_empty() { 1.0 } else { min },
            max_daily_efficiency: if outcomes.is_empty() { 1.0 } else { max },
            days_with_waste: outcomes.iter().filter(|o| o.wasted_beds > 0).count(),
            days_with_wasted_potential: outcomes.iter().filter(|o| o.wasted_potential > 0).count(),
            over_capacity_days: outcomes.iter().filter(|o| o.over_capacity).count(),
        }
    }
}

/// Day-by-day outcomes of one configuration over one demand series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSeries {
    configuration: RoomConfiguration,
    outcomes: Vec<DailyOutcome>,
    summary: EvaluationSummary,
}

impl EvaluationSeries {
    pub fn configuration(&self) -> RoomConfiguration {
        self.configuration
    }

    pub fn outcomes(&self) -> &[DailyOutcome] {
        &self.outcomes
    }

    pub fn summary(&self) -> &EvaluationSummary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Cumulative efficiency after the last day
    pub fn cumulative_efficiency(&self) -> f64 {
        self.summary.cumulative_efficiency
    }
}

/// Applies the allocation rule for any room configuration of one ward
#[derive(Debug, Clone)]
pub struct AllocationEvaluator {
    ward: WardSettings,
    weights: ObjectiveWeights,
}

impl AllocationEvaluator {
    pub fn new(config: &WardConfig) -> Self {
        Self {
            ward: config.ward,
            weights: config.objective,
        }
    }

    pub fn total_beds(&self) -> u32 {
        self.ward.total_beds
    }

    pub fn weights(&self) -> &ObjectiveWeights {
        &self.weights
    }

    /// Reject census values no configuration of this ward could represent
    pub fn validate_day(&self, day: &DailyDemand) -> Result<(), EvaluationError> {
        let limit = self.ward.total_beds;
        let checks = [
            ("closed_rooms", day.closed_rooms, limit / DOUBLE_ROOM_CAPACITY),
            ("single_demand", day.single_demand, limit),
            ("double_demand", day.double_demand, limit),
            ("single_demand + double_demand", day.total_demand(), limit),
        ];
        for (field, value, limit) in checks {
            if value > limit {
                return Err(EvaluationError::InvalidDemand {
                    date: day.date,
                    field,
                    value,
                    limit,
                });
            }
        }
        Ok(())
    }

    /// Outcome of a single day on its own (cumulative equals daily)
    pub fn evaluate_day(&self, config: &RoomConfiguration, day: &DailyDemand) -> Result<DailyOutcome, EvaluationError> {
        config.check(self.ward.total_beds)?;
        self.validate_day(day)?;
        Ok(allocate(config, day, self.ward.total_beds))
    }

    pub fn evaluate(&self, config: &RoomConfiguration, series: &DemandSeries) -> Result<EvaluationSeries, EvaluationError> {
        self.evaluate_days(config, series.days())
    }

    /// Evaluate days in the given order. Any invalid day aborts the whole run.
    pub fn evaluate_days(&self, config: &RoomConfiguration, days: &[DailyDemand]) -> Result<EvaluationSeries, EvaluationError> {
        config.check(self.ward.total_beds)?;

        let mut outcomes = Vec::with_capacity(days.len());
        let mut occupied_so_far = 0u64;
        let mut available_so_far = 0u64;

        for day in days {
            self.validate_day(day)?;
            let mut outcome = allocate(config, day, self.ward.total_beds);

            occupied_so_far += outcome.occupied_beds as u64;
            available_so_far += outcome.available_beds as u64;
            outcome.cumulative_efficiency = ratio(occupied_so_far, available_so_far);

            if outcome.over_capacity {
                warn!(
                    date = %day.date,
                    turned_away = outcome.turned_away,
                    demand = day.total_demand(),
                    available = outcome.available_beds,
                    "Over-capacity day under {}", config
                );
            } else if outcome.wasted_beds > 0 {
                debug!(date = %day.date, wasted_beds = outcome.wasted_beds, "Single-room overflow under {}", config);
            }

            outcomes.push(outcome);
        }

        let summary = EvaluationSummary::from_outcomes(&outcomes, &self.weights);
        info!(
            "Evaluated {} over {} days: cumulative efficiency {:.2}%, {} wasted beds, {} wasted potential",
            config,
            summary.days,
            summary.cumulative_efficiency * 100.0,
            summary.total_wasted_beds,
            summary.total_wasted_potential
        );

        Ok(EvaluationSeries {
            configuration: *config,
            outcomes,
            summary,
        })
    }
}

fn allocate(config: &RoomConfiguration, day: &DailyDemand, total_beds: u32) -> DailyOutcome {
    let single_rooms = config.single_rooms();
    let double_rooms = config.double_rooms();

    let available_beds = total_beds - DOUBLE_ROOM_CAPACITY * day.closed_rooms;

    let singles_placed = day.single_demand.min(single_rooms);
    let single_overflow = day.single_demand - singles_placed;

    // each overflow patient holds a whole double room
    let remaining_double_rooms = double_rooms.saturating_sub(single_overflow);
    let doubles_placed = day.double_demand.min(remaining_double_rooms * DOUBLE_ROOM_CAPACITY);

    let doubles_waiting = day.double_demand - doubles_placed;
    let idle_single_rooms = single_rooms - singles_placed;
    let doubles_in_singles = doubles_waiting.min(idle_single_rooms);

    let wasted_beds = single_overflow;
    // an empty ward has no patients left unpaired
    let wasted_potential = if day.total_demand() == 0 {
        0
    } else {
        (DOUBLE_ROOM_CAPACITY * double_rooms).saturating_sub(doubles_placed + DOUBLE_ROOM_CAPACITY * single_overflow)
    };

    let overflow_in_doubles = single_overflow.min(double_rooms);
    let turned_away = (single_overflow - overflow_in_doubles) + (doubles_waiting - doubles_in_singles);
    let over_capacity = turned_away > 0 || day.total_demand() > available_beds;

    let occupied_beds = available_beds.saturating_sub(wasted_beds);
    let daily_efficiency = ratio(occupied_beds as u64, available_beds as u64);

    DailyOutcome {
        date: day.date,
        single_demand: day.single_demand,
        double_demand: day.double_demand,
        closed_rooms: day.closed_rooms,
        single_overflow,
        wasted_beds,
        wasted_potential,
        doubles_placed,
        overflow_in_doubles,
        doubles_in_singles,
        turned_away,
        over_capacity,
        patients_housed: day.total_demand() - turned_away,
        available_beds,
        occupied_beds,
        daily_efficiency,
        cumulative_efficiency: daily_efficiency,
    }
}

/// `num / den` clamped to [0, 1]; an empty denominator counts as fully efficient
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        1.0
    } else {
        (num as f64 / den as f64).clamp(0.0, 1.0)
    }
}
