use crate::consistency::ConsistencyConfig;
use crate::coverage::CoverageWeights;
use crate::error::Result;
use crate::io;
use crate::pivot::PivotConfig;
use crate::roadmap::RoadmapConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub consistency: ConsistencyConfig,
    #[serde(default)]
    pub pivot: PivotConfig,
    #[serde(default)]
    pub roadmap: RoadmapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    #[serde(default)]
    pub weights: CoverageWeights,
    /// Default coverage threshold for new sessions.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
}

fn default_threshold() -> f64 {
    70.0
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            weights: CoverageWeights::default(),
            default_threshold: default_threshold(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())
    }

    /// Sanity-check the numbers a deployment is allowed to tune.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let sum = self.coverage.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("coverage weights must sum to 1.0, got {sum}"),
            });
        }
        if !(0.0..=100.0).contains(&self.coverage.default_threshold) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "default coverage threshold must be within 0..=100, got {}",
                    self.coverage.default_threshold
                ),
            });
        }
        if self.consistency.min_samples == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "min_samples of 0 flags every decision with any history".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.pivot.risk_bound) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("pivot risk bound must be within 0..=1, got {}", self.pivot.risk_bound),
            });
        }
        if self.roadmap.markers.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no dependency markers configured; roadmap dependency extraction is off"
                    .to_string(),
            });
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        let warnings = EngineConfig::default().validate();
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn bad_weights_flagged_as_error() {
        let mut cfg = EngineConfig::default();
        cfg.coverage.weights.constraints = 0.9;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("sum to 1.0")));
    }

    #[test]
    fn empty_markers_is_a_warning_not_an_error() {
        let mut cfg = EngineConfig::default();
        cfg.roadmap.markers.clear();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.level == WarnLevel::Warning));
        assert!(warnings.iter().all(|w| w.level != WarnLevel::Error));
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = EngineConfig::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(cfg.consistency.min_samples, 3);
    }

    #[test]
    fn config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let mut cfg = EngineConfig::default();
        cfg.consistency.min_samples = 5;
        cfg.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.consistency.min_samples, 5);
        assert_eq!(loaded.coverage.weights, CoverageWeights::default());
    }

    #[test]
    fn sparse_yaml_fills_defaults() {
        let yaml = "consistency:\n  min_samples: 4\n";
        let cfg: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.consistency.min_samples, 4);
        assert_eq!(cfg.coverage.default_threshold, 70.0);
        assert!(!cfg.roadmap.markers.is_empty());
    }
}
