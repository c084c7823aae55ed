use thiserror::Error;

/// Represents a (mixed-integer) linear programming problem
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Decision variables, in column order
    pub variables: Vec<Variable>,
    /// Objective function coefficients (costs)
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

/// A decision variable. Variables are always non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Lower bound (>= 0)
    pub lower: f64,
    /// Optional upper bound
    pub upper: Option<f64>,
    /// Whether the variable must take an integral value
    pub integer: bool,
}

#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Whether to minimize or maximize
    pub minimize: bool,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Constraint {name} has {actual} coefficients, expected {expected}")]
    CoefficientCount { name: String, expected: usize, actual: usize },
    #[error("Objective has {actual} coefficients, expected {expected}")]
    ObjectiveCount { expected: usize, actual: usize },
    #[error("Variable {0} has an empty domain")]
    EmptyDomain(String),
    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

impl Variable {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: 0.0,
            upper: None,
            integer: false,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            integer: true,
            ..Self::continuous(name)
        }
    }
}

impl LpProblem {
    /// Create a problem with continuous, non-negative variables
    pub fn new(variables: Vec<String>) -> Self {
        Self::with_variables(variables.into_iter().map(Variable::continuous).collect())
    }

    pub fn with_variables(variables: Vec<Variable>) -> Self {
        let n = variables.len();
        Self {
            variables,
            objective: Objective {
                coefficients: vec![0.0; n],
                minimize: true,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            op,
            rhs,
        });
    }

    /// Add a constraint given as `(variable index, coefficient)` terms
    pub fn add_sparse_constraint(&mut self, name: impl Into<String>, terms: &[(usize, f64)], op: ConstraintOp, rhs: f64) {
        let mut coefficients = vec![0.0; self.num_variables()];
        for &(idx, coef) in terms {
            coefficients[idx] += coef;
        }
        self.add_constraint(name, coefficients, op, rhs);
    }

    pub fn set_bounds(&mut self, idx: usize, lower: f64, upper: Option<f64>) {
        let var = &mut self.variables[idx];
        var.lower = lower.max(0.0);
        var.upper = upper;
    }

    pub fn set_integer(&mut self, idx: usize, integer: bool) {
        self.variables[idx].integer = integer;
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    pub fn integer_variables(&self) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.integer)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.variables.iter().any(|v| v.integer)
    }

    /// Check dimensions and values before building a tableau
    pub fn validate(&self) -> Result<(), ProblemError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(ProblemError::ObjectiveCount {
                expected: n,
                actual: self.objective.coefficients.len(),
            });
        }
        if self.objective.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ProblemError::NonFinite("objective".to_string()));
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(ProblemError::CoefficientCount {
                    name: c.name.clone(),
                    expected: n,
                    actual: c.coefficients.len(),
                });
            }
            if !c.rhs.is_finite() || c.coefficients.iter().any(|x| !x.is_finite()) {
                return Err(ProblemError::NonFinite(c.name.clone()));
            }
        }
        for v in &self.variables {
            if let Some(upper) = v.upper {
                if !upper.is_finite() {
                    return Err(ProblemError::NonFinite(v.name.clone()));
                }
                if upper < v.lower {
                    return Err(ProblemError::EmptyDomain(v.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Copy of the problem with variable bounds turned into explicit rows.
    ///
    /// The simplex tableau only knows `x >= 0`, so `x <= u` becomes a `Le`
    /// row named `<var>_max` and `x >= l` (l > 0) a `Ge` row named `<var>_min`.
    pub fn with_bound_rows(&self) -> LpProblem {
        let n = self.num_variables();
        let mut expanded = self.clone();
        for (j, v) in self.variables.iter().enumerate() {
            if let Some(upper) = v.upper {
                let mut row = vec![0.0; n];
                row[j] = 1.0;
                expanded.add_constraint(format!("{}_max", v.name), row, ConstraintOp::Le, upper);
            }
            if v.lower > 0.0 {
                let mut row = vec![0.0; n];
                row[j] = 1.0;
                expanded.add_constraint(format!("{}_min", v.name), row, ConstraintOp::Ge, v.lower);
            }
        }
        for v in &mut expanded.variables {
            v.lower = 0.0;
            v.upper = None;
        }
        expanded
    }
}
