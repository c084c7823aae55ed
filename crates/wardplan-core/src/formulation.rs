//! Translation of a demand series into a mixed-integer program.
//!
//! Variables: integer `single_rooms` and `double_rooms`, then per demand
//! profile a `overflow_k` and an `unused_k` (and `paired_k` when paired
//! patients alone in single rooms carry a weight). Rows per profile `k`
//! with demand `(s, d)`:
//!
//! ```text
//! single_rooms + overflow_k                 >= s     single_cover_k
//! overflow_k                                <= s     overflow_cap_k
//! unused_k + overflow_k - 2 double_rooms    >= -d    double_balance_k
//! paired_k + 2 double_rooms - 2 overflow_k  >= d     pairing_k
//! ```
//!
//! plus `single_rooms + 2 double_rooms = total_beds`. A profile with no
//! demand at all gets no `double_balance_k` row, so an empty day costs
//! nothing. Each profile's objective terms are scaled by the number of days
//! sharing it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use wardplan_solver::{ConstraintOp, LpProblem, Variable};

use crate::census::{DailyDemand, DemandSeries};
use crate::config::{DOUBLE_ROOM_CAPACITY, ObjectiveWeights, WardConfig};
use crate::room::RoomConfiguration;

/// A distinct `(single_demand, double_demand)` pair and the days it occurs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandProfile {
    pub single_demand: u32,
    pub double_demand: u32,
    pub dates: Vec<NaiveDate>,
}

impl DemandProfile {
    pub fn multiplicity(&self) -> usize {
        self.dates.len()
    }
}

/// Group days by demand profile, or keep one profile per day
pub fn demand_profiles(days: &[DailyDemand], collapse: bool) -> Vec<DemandProfile> {
    if !collapse {
        return days
            .iter()
            .map(|day| DemandProfile {
                single_demand: day.single_demand,
                double_demand: day.double_demand,
                dates: vec![day.date],
            })
            .collect();
    }

    let mut grouped: BTreeMap<(u32, u32), Vec<NaiveDate>> = BTreeMap::new();
    for day in days {
        grouped.entry(day.profile()).or_default().push(day.date);
    }
    grouped
        .into_iter()
        .map(|((single_demand, double_demand), dates)| DemandProfile {
            single_demand,
            double_demand,
            dates,
        })
        .collect()
}

/// Column indices of one profile's auxiliary variables
#[derive(Debug, Clone, Copy)]
pub(crate) struct ProfileColumns {
    pub overflow: usize,
    pub unused: usize,
    pub paired: Option<usize>,
}

/// A compiled optimization model and the map back to its variables
#[derive(Debug, Clone)]
pub struct Formulation {
    pub problem: LpProblem,
    pub profiles: Vec<DemandProfile>,
    pub(crate) columns: Vec<ProfileColumns>,
}

pub(crate) const SINGLE_ROOMS: usize = 0;
pub(crate) const DOUBLE_ROOMS: usize = 1;

impl Formulation {
    pub fn build(config: &WardConfig, series: &DemandSeries) -> Self {
        let profiles = demand_profiles(series.days(), config.solver.collapse_identical_days);
        let weights = config.objective;
        let pairing = weights.paired_in_single_weight > 0.0;

        let mut variables = vec![Variable::integer("single_rooms"), Variable::integer("double_rooms")];
        let mut columns = Vec::with_capacity(profiles.len());
        for k in 0..profiles.len() {
            let overflow = variables.len();
            variables.push(Variable::continuous(format!("overflow_{}", k)));
            let unused = variables.len();
            variables.push(Variable::continuous(format!("unused_{}", k)));
            let paired = pairing.then(|| {
                variables.push(Variable::continuous(format!("paired_{}", k)));
                variables.len() - 1
            });
            columns.push(ProfileColumns {
                overflow,
                unused,
                paired,
            });
        }

        let mut problem = LpProblem::with_variables(variables);
        let ward = &config.ward;
        problem.set_bounds(SINGLE_ROOMS, 0.0, Some(ward.max_single_rooms() as f64));
        problem.set_bounds(DOUBLE_ROOMS, 0.0, Some(ward.max_double_rooms() as f64));

        let capacity = DOUBLE_ROOM_CAPACITY as f64;
        problem.add_sparse_constraint(
            "total_beds",
            &[(SINGLE_ROOMS, 1.0), (DOUBLE_ROOMS, capacity)],
            ConstraintOp::Eq,
            ward.total_beds as f64,
        );

        let mut objective = vec![0.0; problem.num_variables()];
        for (k, (profile, cols)) in profiles.iter().zip(&columns).enumerate() {
            let s = profile.single_demand as f64;
            let d = profile.double_demand as f64;

            problem.add_sparse_constraint(
                format!("single_cover_{}", k),
                &[(SINGLE_ROOMS, 1.0), (cols.overflow, 1.0)],
                ConstraintOp::Ge,
                s,
            );
            problem.add_sparse_constraint(format!("overflow_cap_{}", k), &[(cols.overflow, 1.0)], ConstraintOp::Le, s);
            if profile.single_demand + profile.double_demand > 0 {
                problem.add_sparse_constraint(
                    format!("double_balance_{}", k),
                    &[(cols.unused, 1.0), (cols.overflow, 1.0), (DOUBLE_ROOMS, -capacity)],
                    ConstraintOp::Ge,
                    -d,
                );
            }

            let days = profile.multiplicity() as f64;
            objective[cols.overflow] = days * weights.wasted_beds_weight;
            objective[cols.unused] = days * weights.wasted_potential_weight;

            if let Some(paired) = cols.paired {
                problem.add_sparse_constraint(
                    format!("pairing_{}", k),
                    &[(paired, 1.0), (DOUBLE_ROOMS, capacity), (cols.overflow, -capacity)],
                    ConstraintOp::Ge,
                    d,
                );
                objective[paired] = days * weights.paired_in_single_weight;
            }
        }
        problem.set_objective(objective, true);

        Self {
            problem,
            profiles,
            columns,
        }
    }

    pub fn num_profiles(&self) -> usize {
        self.profiles.len()
    }
}

/// The model's own per-day cost for a fixed room mix: the minimum of its
/// objective terms over the overflow values the day's rows allow.
///
/// This is the continuous model's view of waste and differs from the
/// evaluator, which counts each overflow patient against two double-room
/// beds rather than one.
pub fn relaxed_day_cost(config: &RoomConfiguration, day: &DailyDemand, weights: &ObjectiveWeights) -> f64 {
    if day.total_demand() == 0 {
        return 0.0;
    }
    let s = day.single_demand as f64;
    let d = day.double_demand as f64;
    let single_rooms = config.single_rooms() as f64;
    let double_beds = (DOUBLE_ROOM_CAPACITY * config.double_rooms()) as f64;

    let lo = (s - single_rooms).max(0.0);
    let hi = s;

    let cost = |overflow: f64| {
        let mut total = weights.wasted_beds_weight * overflow
            + weights.wasted_potential_weight * (double_beds - d - overflow).max(0.0);
        if weights.paired_in_single_weight > 0.0 {
            total += weights.paired_in_single_weight * (d - double_beds + DOUBLE_ROOM_CAPACITY as f64 * overflow).max(0.0);
        }
        total
    };

    // piecewise linear and convex: the minimum sits on an endpoint or a kink
    let kinks = [double_beds - d, (double_beds - d) / DOUBLE_ROOM_CAPACITY as f64];
    kinks
        .into_iter()
        .map(|k| k.clamp(lo, hi))
        .chain([lo, hi])
        .map(cost)
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WardSettings;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn series(days: &[(u32, u32)]) -> DemandSeries {
        DemandSeries::new(
            days.iter()
                .enumerate()
                .map(|(i, &(s, d))| DailyDemand::new(date(i as u32 + 1), s, d))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_profiles_collapse_identical_days() {
        let series = series(&[(4, 10), (6, 8), (4, 10), (4, 10)]);

        let collapsed = demand_profiles(series.days(), true);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].single_demand, 4);
        assert_eq!(collapsed[0].dates, vec![date(1), date(3), date(4)]);
        assert_eq!(collapsed[1].multiplicity(), 1);

        assert_eq!(demand_profiles(series.days(), false).len(), 4);
    }

    #[test]
    fn test_model_shape() {
        let config = WardConfig::new(WardSettings::new(26).with_max_single_rooms(10));
        let formulation = Formulation::build(&config, &series(&[(11, 9), (8, 12)]));
        let problem = &formulation.problem;

        assert_eq!(problem.num_variables(), 2 + 2 * 2);
        assert_eq!(problem.num_constraints(), 1 + 3 * 2);
        assert_eq!(problem.variable_index("double_rooms"), Some(DOUBLE_ROOMS));
        assert_eq!(problem.integer_variables(), vec![SINGLE_ROOMS, DOUBLE_ROOMS]);
        assert_eq!(problem.variables[SINGLE_ROOMS].upper, Some(10.0));
        assert_eq!(problem.variables[DOUBLE_ROOMS].upper, Some(13.0));

        // profiles are ordered by demand, so (8, 12) comes first
        assert_eq!((formulation.profiles[0].single_demand, formulation.profiles[0].double_demand), (8, 12));
        assert_eq!(formulation.profiles[0].dates, vec![date(2)]);

        let balance = &problem.constraints[3];
        assert_eq!(balance.name, "double_balance_0");
        assert_eq!(balance.rhs, -12.0);
        assert_eq!(balance.coefficients[DOUBLE_ROOMS], -2.0);

        let cover = problem.constraints.iter().find(|c| c.name == "single_cover_1").unwrap();
        assert_eq!(cover.rhs, 11.0);
    }

    #[test]
    fn test_uncollapsed_rows_follow_day_order() {
        let mut config = WardConfig::new(WardSettings::new(26).with_max_single_rooms(10));
        config.solver.collapse_identical_days = false;
        let formulation = Formulation::build(&config, &series(&[(11, 9), (8, 12)]));

        let balance = &formulation.problem.constraints[3];
        assert_eq!(balance.name, "double_balance_0");
        assert_eq!(balance.rhs, -9.0);
    }

    #[test]
    fn test_empty_days_have_no_balance_row() {
        let formulation = Formulation::build(&WardConfig::default(), &series(&[(0, 0), (4, 10)]));
        let names: Vec<&str> = formulation.problem.constraints.iter().map(|c| c.name.as_str()).collect();

        assert!(!names.contains(&"double_balance_0"));
        assert!(names.contains(&"double_balance_1"));
        assert_eq!(formulation.problem.num_constraints(), 1 + 2 + 3);
    }

    #[test]
    fn test_objective_scaled_by_multiplicity() {
        let config = WardConfig::default().with_weights(ObjectiveWeights::new(3.0, 0.5));
        let formulation = Formulation::build(&config, &series(&[(4, 10), (4, 10), (6, 8)]));
        let objective = &formulation.problem.objective.coefficients;

        let first = formulation.columns[0];
        assert_eq!(objective[first.overflow], 6.0);
        assert_eq!(objective[first.unused], 1.0);
        assert_eq!(objective[SINGLE_ROOMS], 0.0);
        assert!(first.paired.is_none());
    }

    #[test]
    fn test_pairing_columns_only_when_weighted() {
        let weights = ObjectiveWeights::default().with_paired_in_single_weight(0.25);
        let config = WardConfig::default().with_weights(weights);
        let formulation = Formulation::build(&config, &series(&[(4, 10)]));

        let paired = formulation.columns[0].paired.unwrap();
        assert_eq!(formulation.problem.variables[paired].name, "paired_0");
        assert!(formulation.problem.constraints.iter().any(|c| c.name == "pairing_0"));
    }

    #[test]
    fn test_relaxed_day_cost() {
        let weights = ObjectiveWeights::default();
        let config = RoomConfiguration::new(10, 8, 26).unwrap();

        // overflow forced to 1, unused double beds 16 - 9 - 1 = 6
        assert_eq!(relaxed_day_cost(&config, &DailyDemand::new(date(1), 11, 9), &weights), 7.0);
        assert_eq!(relaxed_day_cost(&config, &DailyDemand::new(date(1), 8, 12), &weights), 4.0);
        assert_eq!(relaxed_day_cost(&config, &DailyDemand::new(date(1), 12, 10), &weights), 6.0);
        // overflow beyond the double beds costs one per patient
        assert_eq!(relaxed_day_cost(&config, &DailyDemand::new(date(1), 30, 0), &weights), 20.0);
        assert_eq!(relaxed_day_cost(&config, &DailyDemand::new(date(1), 0, 0), &weights), 0.0);
    }

    #[test]
    fn test_relaxed_day_cost_with_pairing_weight() {
        let weights = ObjectiveWeights::default().with_paired_in_single_weight(1.0);
        let config = RoomConfiguration::new(20, 3, 26).unwrap();

        // 10 paired patients, 6 double beds: at least 4 go to single rooms
        let cost = relaxed_day_cost(&config, &DailyDemand::new(date(1), 2, 10), &weights);
        assert_eq!(cost, 4.0);
    }
}
