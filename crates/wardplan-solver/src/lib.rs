mod branch;
mod problem;
mod simplex;
mod solution;

pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, ProblemError, Variable};
pub use simplex::Solver;
pub use solution::{ConstraintViolation, Solution, SolutionStatus};
