use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{Result, WingMorphError};

/// Configuration for WingMorph
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub input_path: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Pixel value treated as foreground when thresholding segmented images
    #[serde(default = "default_foreground_value")]
    pub foreground_value: u8,

    /// Pixel value treated as background
    #[serde(default = "default_background_value")]
    pub background_value: u8,

    /// Total number of samples budgeted for a full traversal of the
    /// structure (two spokes plus the center). The per-unit sampling rate
    /// R of the snake is derived from this and M0.
    #[serde(default = "default_expression_num_points")]
    pub expression_num_points: usize,

    /// Number of snake control points per quadrant segment (M0, >= 3)
    #[serde(default = "default_control_points_per_segment")]
    pub control_points_per_segment: usize,

    /// If true, the shared center node is moved to the intersection of the
    /// diagonals formed by the innermost spoke nodes after the model is built
    #[serde(default = "default_correct_boundaries_intersection")]
    pub correct_boundaries_intersection: bool,

    /// Number of points per half-row of the projection grid; the generated
    /// grid is square with side 2*grid_num_points-1
    #[serde(default = "default_grid_num_points")]
    pub grid_num_points: usize,

    /// Which of the two designated boundary curves is the projection equator
    #[serde(default = "default_equator")]
    pub equator: EquatorChoice,

    /// Process directory inputs in parallel
    #[serde(default = "default_use_parallel")]
    pub use_parallel: bool,
}

/// Equator choice enum
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum EquatorChoice {
    /// The first designated boundary curve is the equator
    A,
    /// The second designated boundary curve is the equator
    B,
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_foreground_value() -> u8 {
    255
}

fn default_background_value() -> u8 {
    0
}

fn default_expression_num_points() -> usize {
    1000
}

fn default_control_points_per_segment() -> usize {
    8
}

fn default_correct_boundaries_intersection() -> bool {
    false
}

fn default_grid_num_points() -> usize {
    501
}

fn default_equator() -> EquatorChoice {
    EquatorChoice::A
}

fn default_use_parallel() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        // An empty TOML document deserializes to all defaults
        toml::from_str("").expect("default configuration must deserialize")
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| WingMorphError::ConfigLoad {
            source: e,
            path: path.to_path_buf(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Basic sanity checks on parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.control_points_per_segment < 3 {
            return Err(WingMorphError::Config(
                "control_points_per_segment must be >= 3".to_string(),
            ));
        }
        if self.expression_num_points <= 1 {
            return Err(WingMorphError::Config(
                "expression_num_points must be > 1".to_string(),
            ));
        }
        if self.grid_num_points < 2 {
            return Err(WingMorphError::Config(
                "grid_num_points must be >= 2".to_string(),
            ));
        }
        if self.foreground_value == self.background_value {
            return Err(WingMorphError::Config(
                "foreground_value and background_value must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_toml() {
        let config = Config::default();
        assert_eq!(config.foreground_value, 255);
        assert_eq!(config.background_value, 0);
        assert_eq!(config.expression_num_points, 1000);
        assert_eq!(config.control_points_per_segment, 8);
        assert!(!config.correct_boundaries_intersection);
        assert_eq!(config.grid_num_points, 501);
        assert_eq!(config.equator, EquatorChoice::A);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_parameters() {
        let mut config = Config::default();
        config.control_points_per_segment = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.foreground_value = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_file_content() {
        let config: Config =
            toml::from_str("foreground_value = 1\nequator = \"B\"").unwrap();
        assert_eq!(config.foreground_value, 1);
        assert_eq!(config.equator, EquatorChoice::B);
        assert_eq!(config.grid_num_points, 501);
    }
}
