use std::collections::HashMap;

use tracing::{debug, warn};

use crate::branch;
use crate::problem::{Constraint, ConstraintOp, LpProblem};
use crate::solution::{ConstraintViolation, Solution, SolutionStatus};

/// Consecutive zero-step pivots tolerated before switching to Bland's rule
const DEGENERATE_PIVOT_LIMIT: usize = 50;

/// Residual artificial value (or pivot magnitude) treated as zero after phase 1
const FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Simplex solver for linear programming problems, with branch-and-bound
/// on top for problems that declare integer variables
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots per LP solve before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Maximum branch-and-bound nodes
    max_nodes: usize,
    /// Distance from the nearest integer still accepted as integral
    integrality_tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: 1e-9,
            max_nodes: 10_000,
            integrality_tolerance: 1e-6,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max.max(1);
        self
    }

    pub fn with_integrality_tolerance(mut self, tol: f64) -> Self {
        self.integrality_tolerance = tol;
        self
    }

    pub(crate) fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub(crate) fn integrality_tolerance(&self) -> f64 {
        self.integrality_tolerance
    }

    pub(crate) fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the problem. Integer variables are handled by branch-and-bound
    /// over LP relaxations; otherwise this is a single two-phase simplex run.
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            warn!("Rejected malformed LP problem: {}", e);
            return Solution::error();
        }

        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            integers = problem.integer_variables().len(),
            "Solving LP problem"
        );

        if problem.has_integer_variables() {
            return branch::branch_and_bound(self, problem);
        }
        self.solve_lp(problem)
    }

    /// Solve the continuous relaxation; when infeasible, report which
    /// constraints a best-effort relaxed solution violates
    pub(crate) fn solve_lp(&self, problem: &LpProblem) -> Solution {
        let expanded = problem.with_bound_rows();
        match self.run(&expanded) {
            (SimplexResult::Optimal, Some(tableau), iterations) => {
                let mut solution = self.extract_solution(&tableau, &expanded);
                solution.iterations = iterations;
                solution
            }
            (SimplexResult::Unbounded, _, iterations) => Solution {
                iterations,
                nodes: 1,
                ..Solution::unbounded()
            },
            (SimplexResult::IterationLimit, _, iterations) => {
                warn!("Simplex stopped after {} pivots without converging", iterations);
                Solution {
                    iterations,
                    nodes: 1,
                    ..Solution::error()
                }
            }
            (_, _, iterations) => {
                let mut solution = self.solve_with_relaxation(&expanded);
                solution.iterations += iterations;
                solution.nodes = 1;
                solution
            }
        }
    }

    /// Solve without infeasibility diagnostics (used for branch-and-bound
    /// nodes and for relaxed problems)
    pub(crate) fn solve_relaxed(&self, problem: &LpProblem) -> Solution {
        let expanded = problem.with_bound_rows();
        let (result, tableau, iterations) = self.run(&expanded);
        let mut solution = match (result, tableau) {
            (SimplexResult::Optimal, Some(tableau)) => self.extract_solution(&tableau, &expanded),
            (SimplexResult::Unbounded, _) => Solution::unbounded(),
            (SimplexResult::IterationLimit, _) => Solution::error(),
            _ => Solution::infeasible(),
        };
        solution.iterations = iterations;
        solution.nodes = 1;
        solution
    }

    fn run(&self, problem: &LpProblem) -> (SimplexResult, Option<Tableau>, usize) {
        let mut tableau = self.build_tableau(problem);
        let mut iterations = 0;

        // Phase 1: Find initial basic feasible solution
        if tableau.has_artificial {
            match self.phase1(&mut tableau, &mut iterations) {
                SimplexResult::Optimal => {}
                other => return (other, None, iterations),
            }
        }

        // Phase 2: Optimize
        match self.phase2(&mut tableau, &mut iterations) {
            SimplexResult::Optimal => (SimplexResult::Optimal, Some(tableau), iterations),
            other => (other, None, iterations),
        }
    }

    /// When the original problem is infeasible, try to find a "best effort" solution
    /// by relaxing constraints and reporting which ones are violated
    fn solve_with_relaxation(&self, problem: &LpProblem) -> Solution {
        // Keep <= and = rows (capacity limits and structural equalities),
        // drop >= rows (demand floors) and see which of those break
        let mut relaxed = LpProblem::with_variables(problem.variables.clone());
        relaxed.set_objective(
            problem.objective.coefficients.clone(),
            problem.objective.minimize,
        );
        for c in problem.constraints.iter().filter(|c| c.op != ConstraintOp::Ge) {
            relaxed.add_constraint(c.name.clone(), c.coefficients.clone(), c.op, c.rhs);
        }

        let relaxed_solution = self.solve_relaxed(&relaxed);

        if relaxed_solution.status != SolutionStatus::Optimal {
            // Even relaxed problem fails - analyze direct conflicts
            return self.analyze_conflicts(problem);
        }

        let violations = self.find_violations(problem, &relaxed_solution.values);

        if violations.is_empty() {
            // The original was feasible after all
            return relaxed_solution;
        }

        Solution::infeasible_with_relaxed(
            relaxed_solution.values,
            relaxed_solution.objective_value,
            violations,
        )
    }

    /// Find which constraints are violated by a given solution
    fn find_violations(&self, problem: &LpProblem, values: &[f64]) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in &problem.constraints {
            let lhs: f64 = c
                .coefficients
                .iter()
                .zip(values)
                .map(|(coef, v)| coef * v)
                .sum();

            let violation = match c.op {
                ConstraintOp::Le if lhs > c.rhs + self.tolerance => {
                    let amt = lhs - c.rhs;
                    Some((amt, format!("{} exceeds maximum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Ge if lhs < c.rhs - self.tolerance => {
                    let amt = c.rhs - lhs;
                    Some((amt, format!("{} is below minimum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Eq if (lhs - c.rhs).abs() > self.tolerance => Some((
                    (lhs - c.rhs).abs(),
                    format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs),
                )),
                _ => None,
            };

            if let Some((violation_amount, description)) = violation {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        // Worst first
        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));

        violations
    }

    /// Analyze direct constraint conflicts when even relaxed solve fails
    fn analyze_conflicts(&self, problem: &LpProblem) -> Solution {
        let mut violations = Vec::new();

        // Group rows by coefficient sign pattern and look for min > max on the
        // same expression, then for bounds that cannot reach an equality
        let mut constraint_groups: HashMap<Vec<i8>, Vec<&Constraint>> = HashMap::new();
        for c in &problem.constraints {
            let key: Vec<i8> = c
                .coefficients
                .iter()
                .map(|&x| {
                    if x.abs() < self.tolerance {
                        0
                    } else if x > 0.0 {
                        1
                    } else {
                        -1
                    }
                })
                .collect();
            constraint_groups.entry(key).or_default().push(c);
        }

        for constraints in constraint_groups.values() {
            let mut min_bound: Option<(f64, &str)> = None;
            let mut max_bound: Option<(f64, &str)> = None;

            for c in constraints {
                match c.op {
                    ConstraintOp::Ge => {
                        if min_bound.is_none_or(|(v, _)| c.rhs > v) {
                            min_bound = Some((c.rhs, &c.name));
                        }
                    }
                    ConstraintOp::Le => {
                        if max_bound.is_none_or(|(v, _)| c.rhs < v) {
                            max_bound = Some((c.rhs, &c.name));
                        }
                    }
                    ConstraintOp::Eq => {
                        min_bound = Some((c.rhs, &c.name));
                        max_bound = Some((c.rhs, &c.name));
                    }
                }
            }

            if let (Some((min_val, min_name)), Some((max_val, max_name))) = (min_bound, max_bound) {
                if min_val > max_val + self.tolerance {
                    violations.push(ConstraintViolation {
                        constraint: format!("{} vs {}", min_name, max_name),
                        required: min_val,
                        actual: max_val,
                        violation_amount: min_val - max_val,
                        description: format!(
                            "Conflict: {} requires >= {:.2} but {} requires <= {:.2}",
                            min_name, min_val, max_name, max_val
                        ),
                    });
                }
            }
        }

        violations.extend(self.unreachable_equalities(problem));
        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));

        Solution::infeasible_with_violations(violations)
    }

    /// Equalities with non-negative coefficients whose right-hand side exceeds
    /// what the single-variable upper limits (`<var>_max` rows) allow
    fn unreachable_equalities(&self, problem: &LpProblem) -> Vec<ConstraintViolation> {
        let mut upper: Vec<Option<f64>> = vec![None; problem.num_variables()];
        for c in problem.constraints.iter().filter(|c| c.op == ConstraintOp::Le) {
            let nonzero: Vec<usize> = c
                .coefficients
                .iter()
                .enumerate()
                .filter(|(_, x)| x.abs() > self.tolerance)
                .map(|(j, _)| j)
                .collect();
            if let &[j] = nonzero.as_slice() {
                if c.coefficients[j] > 0.0 {
                    let limit = c.rhs / c.coefficients[j];
                    upper[j] = Some(upper[j].map_or(limit, |u| u.min(limit)));
                }
            }
        }

        let mut violations = Vec::new();
        for c in problem.constraints.iter().filter(|c| c.op == ConstraintOp::Eq) {
            if c.coefficients.iter().any(|&x| x < -self.tolerance) {
                continue;
            }
            let reachable: Option<f64> = c
                .coefficients
                .iter()
                .zip(&upper)
                .filter(|(x, _)| x.abs() > self.tolerance)
                .map(|(x, u)| u.map(|u| x * u))
                .sum();
            if let Some(max_lhs) = reachable {
                if max_lhs + self.tolerance < c.rhs {
                    violations.push(ConstraintViolation {
                        constraint: c.name.clone(),
                        required: c.rhs,
                        actual: max_lhs,
                        violation_amount: c.rhs - max_lhs,
                        description: format!(
                            "{} requires exactly {:.2} but variable limits allow at most {:.2}",
                            c.name, c.rhs, max_lhs
                        ),
                    });
                }
            }
        }
        violations
    }

    fn build_tableau(&self, problem: &LpProblem) -> Tableau {
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // Count slack and artificial variables needed. A negative RHS flips
        // the row, which turns <= into >= and vice versa.
        let mut n_slack = 0;
        let mut n_artificial = 0;
        for c in &problem.constraints {
            match effective_op(c) {
                ConstraintOp::Le => n_slack += 1,
                ConstraintOp::Ge => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                ConstraintOp::Eq => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            has_artificial: n_artificial > 0,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, c) in problem.constraints.iter().enumerate() {
            let sign = if c.rhs < 0.0 { -1.0 } else { 1.0 };
            for (j, &coef) in c.coefficients.iter().enumerate() {
                tableau.data[i][j] = sign * coef;
            }
            tableau.data[i][total_cols - 1] = sign * c.rhs;

            match effective_op(c) {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // Simplex maximizes, so for minimization we negate the coefficients
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_vars + tableau.n_slack;

        let orig_obj = tableau.data[n_constraints].clone();

        // Maximize -sum(artificials)
        tableau.data[n_constraints].fill(0.0);
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Make objective row consistent with basic artificial variables
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        match self.iterate(tableau, n_cols - 1, iterations) {
            // Unbounded in phase 1 cannot happen for a bounded auxiliary
            // objective; treat it like a failed feasibility search
            SimplexResult::Optimal => {}
            SimplexResult::IterationLimit => return SimplexResult::IterationLimit,
            _ => return SimplexResult::Infeasible,
        }

        let rhs_col = n_cols - 1;
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start && tableau.data[i][rhs_col].abs() > FEASIBILITY_TOLERANCE {
                return SimplexResult::Infeasible;
            }
        }

        // Drive zero-level artificials out of the basis so phase 2 pivots
        // cannot push them above zero
        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let entering = (0..art_start).find(|&j| tableau.data[i][j].abs() > FEASIBILITY_TOLERANCE);
            if let Some(j) = entering {
                self.pivot(tableau, i, j);
            }
            // otherwise the row is redundant and stays pinned at zero
        }

        // Restore original objective and adjust for basic variables
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[n_constraints][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        SimplexResult::Optimal
    }

    fn phase2(&self, tableau: &mut Tableau, iterations: &mut usize) -> SimplexResult {
        // Exclude artificial variable columns from pivoting
        let exclude_from = tableau.n_vars + tableau.n_slack;
        self.iterate(tableau, exclude_from, iterations)
    }

    /// Pivot until no column below `col_limit` can improve the objective
    fn iterate(&self, tableau: &mut Tableau, col_limit: usize, iterations: &mut usize) -> SimplexResult {
        let rhs_col = tableau.data[0].len() - 1;
        let mut degenerate_streak = 0;

        for _ in 0..self.max_iterations {
            let bland = degenerate_streak > DEGENERATE_PIVOT_LIMIT;
            let Some(pivot_col) = self.find_pivot_column(tableau, col_limit, bland) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col, bland) else {
                return SimplexResult::Unbounded;
            };
            if tableau.data[pivot_row][rhs_col].abs() <= self.tolerance {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }
            self.pivot(tableau, pivot_row, pivot_col);
            *iterations += 1;
        }
        SimplexResult::IterationLimit
    }

    fn find_pivot_column(&self, tableau: &Tableau, col_limit: usize, bland: bool) -> Option<usize> {
        let obj_row = &tableau.data[tableau.data.len() - 1];

        if bland {
            return (0..col_limit).find(|&j| obj_row[j] > self.tolerance);
        }

        // Most positive reduced cost
        let mut max_val = self.tolerance;
        let mut max_col = None;
        for (j, &val) in obj_row.iter().enumerate().take(col_limit) {
            if val > max_val {
                max_val = val;
                max_col = Some(j);
            }
        }
        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize, bland: bool) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row: Option<usize> = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val > self.tolerance {
                let ratio = (tableau.data[i][rhs_col] / val).max(0.0);
                let better = match min_row {
                    None => true,
                    Some(r) if (ratio - min_ratio).abs() <= self.tolerance => {
                        // Tie: Bland picks the lowest basic index, otherwise
                        // prefer the larger pivot element for stability
                        if bland {
                            tableau.basic_vars[i] < tableau.basic_vars[r]
                        } else {
                            val > tableau.data[r][col]
                        }
                    }
                    Some(_) => ratio < min_ratio,
                };
                if better {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        let pivot_row = tableau.data[row].clone();
        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                if factor.abs() > 0.0 {
                    for (cell, &p) in tableau.data[i].iter_mut().zip(&pivot_row) {
                        *cell -= factor * p;
                    }
                }
            }
        }
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Solution {
        let n_vars = problem.num_variables();
        let rhs_col = tableau.data[0].len() - 1;

        let mut values = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                // clear round-off below zero
                values[basic] = tableau.data[i][rhs_col].max(0.0);
            }
        }

        let objective_value = objective_at(problem, &values);

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            violations: Vec::new(),
            iterations: 0,
            nodes: 1,
        }
    }
}

pub(crate) fn objective_at(problem: &LpProblem, values: &[f64]) -> f64 {
    problem
        .objective
        .coefficients
        .iter()
        .zip(values)
        .map(|(c, v)| c * v)
        .sum()
}

fn effective_op(c: &Constraint) -> ConstraintOp {
    match (c.op, c.rhs < 0.0) {
        (ConstraintOp::Le, true) => ConstraintOp::Ge,
        (ConstraintOp::Ge, true) => ConstraintOp::Le,
        (op, _) => op,
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    has_artificial: bool,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    Infeasible,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::LpProblem;

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-6, "obj = {} (expected 11)", solution.objective_value);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3, y <= 3 (as variable bounds)
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.set_bounds(0, 0.0, Some(3.0));
        problem.set_bounds(1, 0.0, Some(3.0));

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 9.0).abs() < 1e-6, "obj = {} (expected 9)", solution.objective_value);
    }

    #[test]
    fn test_equality_with_negative_rhs_row() {
        // Minimize u subject to u - 2d >= -10, s + 2d = 26, s <= 10
        // s <= 10 forces d >= 8, so u >= 6
        let mut problem = LpProblem::new(vec!["s".to_string(), "d".to_string(), "u".to_string()]);
        problem.set_objective(vec![0.0, 0.0, 1.0], true);
        problem.add_constraint("beds", vec![1.0, 2.0, 0.0], ConstraintOp::Eq, 26.0);
        problem.add_constraint("unused", vec![0.0, -2.0, 1.0], ConstraintOp::Ge, -10.0);
        problem.set_bounds(0, 0.0, Some(10.0));

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 6.0).abs() < 1e-6, "obj = {}", solution.objective_value);
        assert!((solution.values[0] + 2.0 * solution.values[1] - 26.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(!solution.violations.is_empty());
    }

    #[test]
    fn test_unreachable_equality_is_reported() {
        // s + 2d = 26 with s <= 10 and d <= 5 can reach at most 20
        let mut problem = LpProblem::new(vec!["s".to_string(), "d".to_string()]);
        problem.set_objective(vec![0.0, 0.0], true);
        problem.add_constraint("total_beds", vec![1.0, 2.0], ConstraintOp::Eq, 26.0);
        problem.set_bounds(0, 0.0, Some(10.0));
        problem.set_bounds(1, 0.0, Some(5.0));

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        let violation = solution
            .violations
            .iter()
            .find(|v| v.constraint == "total_beds")
            .expect("total_beds violation");
        assert!((violation.actual - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("floor", vec![1.0], ConstraintOp::Ge, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_malformed_problem_is_an_error() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0, 2.0], true);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Error);
    }
}
