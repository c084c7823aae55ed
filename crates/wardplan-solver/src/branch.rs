//! Depth-first branch-and-bound over LP relaxations.

use tracing::{debug, warn};

use crate::problem::LpProblem;
use crate::simplex::{Solver, objective_at};
use crate::solution::{ConstraintViolation, Solution, SolutionStatus};

struct Node {
    problem: LpProblem,
    relaxation: Solution,
}

pub(crate) fn branch_and_bound(solver: &Solver, problem: &LpProblem) -> Solution {
    // The root keeps the relaxation diagnostics: if the continuous problem
    // is already infeasible the violations explain why.
    let root = solver.solve_lp(problem);
    if root.status != SolutionStatus::Optimal {
        return root;
    }

    let integers = problem.integer_variables();
    let sense = if problem.objective.minimize { 1.0 } else { -1.0 };
    let int_tol = solver.integrality_tolerance();

    let mut iterations = root.iterations;
    let mut nodes = 1;
    let mut limit_hit = false;
    let mut incumbent: Option<(Vec<f64>, f64)> = None;
    let mut stack = vec![Node {
        problem: problem.clone(),
        relaxation: root,
    }];

    while let Some(Node { problem: node_problem, relaxation }) = stack.pop() {
        if let Some((_, best)) = &incumbent {
            if sense * relaxation.objective_value >= sense * best - solver.tolerance() {
                continue;
            }
        }

        let Some((idx, value)) = most_fractional(&relaxation.values, &integers, int_tol) else {
            debug!(objective = relaxation.objective_value, nodes, "New incumbent");
            incumbent = Some((relaxation.values, relaxation.objective_value));
            continue;
        };

        let floor = value.floor();
        let ceil = value.ceil();
        let var = &node_problem.variables[idx];

        let down = (floor >= var.lower).then(|| {
            let mut child = node_problem.clone();
            child.set_bounds(idx, var.lower, Some(var.upper.map_or(floor, |u| u.min(floor))));
            child
        });
        let up = var.upper.is_none_or(|u| ceil <= u).then(|| {
            let mut child = node_problem.clone();
            child.set_bounds(idx, var.lower.max(ceil), var.upper);
            child
        });

        // Explore the side nearer the fractional value first (pushed last)
        let children = if value - floor < 0.5 { [up, down] } else { [down, up] };
        for child in children.into_iter().flatten() {
            if nodes >= solver.max_nodes() {
                limit_hit = true;
                break;
            }
            let relaxation = solver.solve_relaxed(&child);
            nodes += 1;
            iterations += relaxation.iterations;
            if relaxation.status == SolutionStatus::Optimal {
                stack.push(Node {
                    problem: child,
                    relaxation,
                });
            }
        }
        if limit_hit {
            break;
        }
    }

    match incumbent {
        Some((mut values, _)) => {
            for &idx in &integers {
                values[idx] = values[idx].round();
            }
            let objective_value = objective_at(problem, &values);
            let status = if limit_hit {
                warn!("Branch-and-bound hit the node limit of {}", solver.max_nodes());
                SolutionStatus::NodeLimit
            } else {
                SolutionStatus::Optimal
            };
            Solution {
                status,
                values,
                objective_value,
                violations: Vec::new(),
                iterations,
                nodes,
            }
        }
        None if limit_hit => Solution {
            status: SolutionStatus::NodeLimit,
            iterations,
            nodes,
            ..Solution::error()
        },
        None => {
            let names: Vec<&str> = integers
                .iter()
                .map(|&i| problem.variables[i].name.as_str())
                .collect();
            Solution {
                iterations,
                nodes,
                ..Solution::infeasible_with_violations(vec![ConstraintViolation {
                    constraint: "integrality".to_string(),
                    required: 0.0,
                    actual: 0.0,
                    violation_amount: 0.0,
                    description: format!(
                        "The continuous relaxation is feasible but no integral values of {} satisfy every constraint",
                        names.join(", ")
                    ),
                }])
            }
        }
    }
}

/// Integer variable furthest from an integral value, if any
fn most_fractional(values: &[f64], integers: &[usize], tol: f64) -> Option<(usize, f64)> {
    integers
        .iter()
        .map(|&i| (i, values[i], (values[i] - values[i].round()).abs()))
        .filter(|&(_, _, frac)| frac > tol)
        .max_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(i, v, _)| (i, v))
}

#[cfg(test)]
mod tests {
    use crate::problem::{ConstraintOp, LpProblem, Variable};
    use crate::simplex::Solver;
    use crate::solution::SolutionStatus;
    use rstest::rstest;

    #[test]
    fn test_integer_knapsack() {
        // Maximize 5x + 4y
        //   6x + 4y <= 24
        //   x + 2y <= 6
        // LP optimum is (3, 1.5) = 21; best integer point is (4, 0) = 20
        let mut problem = LpProblem::with_variables(vec![Variable::integer("x"), Variable::integer("y")]);
        problem.set_objective(vec![5.0, 4.0], false);
        problem.add_constraint("c1", vec![6.0, 4.0], ConstraintOp::Le, 24.0);
        problem.add_constraint("c2", vec![1.0, 2.0], ConstraintOp::Le, 6.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.values, vec![4.0, 0.0]);
        assert!((solution.objective_value - 20.0).abs() < 1e-6);
        assert!(solution.nodes > 1);
    }

    #[rstest]
    #[case(26.0, Some(13.0))]
    #[case(24.0, Some(12.0))]
    #[case(2.0, Some(1.0))]
    fn test_even_total_has_integral_doubles(#[case] total: f64, #[case] doubles: Option<f64>) {
        // s + 2d = total, s <= 0
        let mut problem = LpProblem::with_variables(vec![Variable::integer("s"), Variable::integer("d")]);
        problem.set_objective(vec![0.0, 1.0], true);
        problem.add_constraint("total_beds", vec![1.0, 2.0], ConstraintOp::Eq, total);
        problem.set_bounds(0, 0.0, Some(0.0));

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.values.get(1).copied(), doubles);
    }

    #[test]
    fn test_odd_total_without_single_rooms_is_integer_infeasible() {
        // s + 2d = 25 with s fixed at 0 relaxes to d = 12.5
        let mut problem = LpProblem::with_variables(vec![Variable::integer("s"), Variable::integer("d")]);
        problem.set_objective(vec![0.0, 1.0], true);
        problem.add_constraint("total_beds", vec![1.0, 2.0], ConstraintOp::Eq, 25.0);
        problem.set_bounds(0, 0.0, Some(0.0));

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert_eq!(solution.violations[0].constraint, "integrality");
    }

    #[test]
    fn test_node_limit_is_reported() {
        let mut problem = LpProblem::with_variables(vec![Variable::integer("x"), Variable::integer("y")]);
        problem.set_objective(vec![5.0, 4.0], false);
        problem.add_constraint("c1", vec![6.0, 4.0], ConstraintOp::Le, 24.0);
        problem.add_constraint("c2", vec![1.0, 2.0], ConstraintOp::Le, 6.0);

        let solution = Solver::new().with_max_nodes(1).solve(&problem);

        assert_eq!(solution.status, SolutionStatus::NodeLimit);
    }
}
