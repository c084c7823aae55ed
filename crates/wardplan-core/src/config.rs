//! Ward configuration loaded from TOML.
//!
//! Every value has a default, so an empty file (or no file at all) describes
//! the 26-bed ward with equal weighting of wasted beds and wasted potential.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Beds in a double room
pub const DOUBLE_ROOM_CAPACITY: u32 = 2;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardConfig {
    pub ward: WardSettings,
    pub objective: ObjectiveWeights,
    pub solver: SolverSettings,
}

/// Physical ward parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardSettings {
    pub total_beds: u32,
    /// Upper bound on double rooms; defaults to `total_beds / 2`
    pub max_double_rooms: Option<u32>,
    /// Upper bound on single rooms; defaults to `total_beds`
    pub max_single_rooms: Option<u32>,
}

/// Weights applied to the waste components, both in the optimizer's
/// objective and when ranking sweep candidates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    /// Single-occupancy patients housed alone in a double room
    pub wasted_beds_weight: f64,
    /// Idle double-room beds
    pub wasted_potential_weight: f64,
    /// Double-occupancy patients housed alone in a single room
    pub paired_in_single_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub max_nodes: usize,
    pub max_iterations: usize,
    pub integrality_tolerance: f64,
    /// Share auxiliary variables between days with identical demand
    pub collapse_identical_days: bool,
}

impl Default for WardSettings {
    fn default() -> Self {
        Self {
            total_beds: 26,
            max_double_rooms: None,
            max_single_rooms: None,
        }
    }
}

impl WardSettings {
    pub fn new(total_beds: u32) -> Self {
        Self {
            total_beds,
            ..Self::default()
        }
    }

    pub fn with_max_double_rooms(mut self, max: u32) -> Self {
        self.max_double_rooms = Some(max);
        self
    }

    pub fn with_max_single_rooms(mut self, max: u32) -> Self {
        self.max_single_rooms = Some(max);
        self
    }

    pub fn max_double_rooms(&self) -> u32 {
        self.max_double_rooms
            .unwrap_or(self.total_beds / DOUBLE_ROOM_CAPACITY)
    }

    pub fn max_single_rooms(&self) -> u32 {
        self.max_single_rooms.unwrap_or(self.total_beds)
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            wasted_beds_weight: 1.0,
            wasted_potential_weight: 1.0,
            paired_in_single_weight: 0.0,
        }
    }
}

impl ObjectiveWeights {
    pub fn new(wasted_beds_weight: f64, wasted_potential_weight: f64) -> Self {
        Self {
            wasted_beds_weight,
            wasted_potential_weight,
            paired_in_single_weight: 0.0,
        }
    }

    pub fn with_paired_in_single_weight(mut self, weight: f64) -> Self {
        self.paired_in_single_weight = weight;
        self
    }

    /// Weighted waste for the given component totals
    pub fn apply(&self, wasted_beds: u64, wasted_potential: u64, paired_in_single: u64) -> f64 {
        self.wasted_beds_weight * wasted_beds as f64
            + self.wasted_potential_weight * wasted_potential as f64
            + self.paired_in_single_weight * paired_in_single as f64
    }
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            max_iterations: 50_000,
            integrality_tolerance: 1e-6,
            collapse_identical_days: true,
        }
    }
}

impl WardConfig {
    pub fn new(ward: WardSettings) -> Self {
        Self {
            ward,
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.objective = weights;
        self
    }

    pub fn with_solver(mut self, solver: SolverSettings) -> Self {
        self.solver = solver;
        self
    }

    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: WardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no ward can have. Bounds that merely make the
    /// optimization infeasible are left for the solver to report.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ward.total_beds == 0 {
            return Err(ConfigError::Invalid {
                field: "ward.total_beds",
                reason: "must be greater than zero".to_string(),
            });
        }

        let weights = [
            ("objective.wasted_beds_weight", self.objective.wasted_beds_weight),
            ("objective.wasted_potential_weight", self.objective.wasted_potential_weight),
            ("objective.paired_in_single_weight", self.objective.paired_in_single_weight),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a non-negative number, got {}", value),
                });
            }
        }

        if self.solver.max_nodes == 0 {
            return Err(ConfigError::Invalid {
                field: "solver.max_nodes",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.solver.integrality_tolerance > 0.0 && self.solver.integrality_tolerance < 0.5) {
            return Err(ConfigError::Invalid {
                field: "solver.integrality_tolerance",
                reason: format!("must lie in (0, 0.5), got {}", self.solver.integrality_tolerance),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WardConfig::default();
        assert_eq!(config.ward.total_beds, 26);
        assert_eq!(config.ward.max_double_rooms(), 13);
        assert_eq!(config.ward.max_single_rooms(), 26);
        assert_eq!(config.objective.wasted_beds_weight, 1.0);
        assert_eq!(config.objective.wasted_potential_weight, 1.0);
        assert_eq!(config.objective.paired_in_single_weight, 0.0);
        assert!(config.solver.collapse_identical_days);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = WardConfig::from_toml_str("").unwrap();
        assert_eq!(config, WardConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[ward]
total_beds = 30
max_single_rooms = 12

[objective]
wasted_potential_weight = 0.5
"#;
        let config = WardConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.ward.total_beds, 30);
        // derived from the new total
        assert_eq!(config.ward.max_double_rooms(), 15);
        assert_eq!(config.ward.max_single_rooms(), 12);
        assert_eq!(config.objective.wasted_beds_weight, 1.0);
        assert_eq!(config.objective.wasted_potential_weight, 0.5);
        assert_eq!(config.solver.max_nodes, 10_000);
    }

    #[test]
    fn test_zero_beds_rejected() {
        let err = WardConfig::from_toml_str("[ward]\ntotal_beds = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ward.total_beds", .. }));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = WardConfig::from_toml_str("[objective]\nwasted_beds_weight = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "objective.wasted_beds_weight", .. }));
    }

    #[test]
    fn test_infeasible_bounds_are_not_a_config_error() {
        let toml = "[ward]\ntotal_beds = 26\nmax_double_rooms = 5\nmax_single_rooms = 10\n";
        assert!(WardConfig::from_toml_str(toml).is_ok());
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        let err = WardConfig::from_toml_str("[ward]\ntotal_beds = \"many\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[solver]\nmax_nodes = 50\ncollapse_identical_days = false").unwrap();

        let config = WardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.solver.max_nodes, 50);
        assert!(!config.solver.collapse_identical_days);
    }

    #[test]
    fn test_missing_file() {
        let err = WardConfig::from_file("/nonexistent/ward.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_weights_apply() {
        let weights = ObjectiveWeights::new(1.0, 0.5).with_paired_in_single_weight(2.0);
        assert_eq!(weights.apply(4, 6, 1), 4.0 + 3.0 + 2.0);
    }
}
