use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::benchmark::{BehaviorConfig, RunSettings};
use crate::error::CoreError;
use crate::evaluation::{validate_terminal_conditions, EvaluatorKind, EvaluatorSet, Predicate, TerminalConditions};
use crate::world::BehaviorModel;
use crate::Result;

/// Benchmark suite stored as TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Limit each scenario set to its first N scenarios
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_scenarios: Option<usize>,
    /// Requested worker count (clamped to available cores)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default)]
    pub settings: RunSettings,
    #[serde(default)]
    pub evaluators: EvaluatorSet,
    #[serde(default)]
    pub terminal_when: TerminalConditions,
    #[serde(default)]
    pub behaviors: Vec<BehaviorConfig>,
}

impl SuiteConfig {
    /// Suite with the stock evaluators, terminal conditions and behaviors
    pub fn standard() -> Self {
        let mut evaluators = EvaluatorSet::new();
        evaluators.insert("success".to_string(), EvaluatorKind::GoalReached);
        evaluators.insert("collision".to_string(), EvaluatorKind::Collision);
        evaluators.insert("drivable_area".to_string(), EvaluatorKind::DrivableArea);
        evaluators.insert("step".to_string(), EvaluatorKind::StepCount);

        let mut terminal_when = TerminalConditions::new();
        terminal_when.insert("collision".to_string(), Predicate::IsTrue);
        terminal_when.insert("success".to_string(), Predicate::IsTrue);
        terminal_when.insert("drivable_area".to_string(), Predicate::IsFalse);
        terminal_when.insert("step".to_string(), Predicate::GreaterThan(100.0));

        Self {
            num_scenarios: None,
            workers: None,
            settings: RunSettings::default(),
            evaluators,
            terminal_when,
            behaviors: vec![
                BehaviorConfig::new("constant_velocity", BehaviorModel::ConstantVelocity),
                BehaviorConfig::new(
                    "accelerate",
                    BehaviorModel::ConstantAcceleration {
                        acceleration: 2.0,
                        max_velocity: 20.0,
                    },
                ),
            ],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.behaviors.is_empty() {
            return Err(CoreError::InvalidConfig("suite defines no behaviors".to_string()));
        }
        let mut names = BTreeSet::new();
        for behavior in &self.behaviors {
            if !names.insert(behavior.name.as_str()) {
                return Err(CoreError::InvalidConfig(format!(
                    "behavior '{}' defined twice",
                    behavior.name
                )));
            }
        }
        self.settings.validate()?;
        validate_terminal_conditions(&self.evaluators, &self.terminal_when)
    }
}

/// Load and validate a suite file
pub fn load_suite_config(path: &Path) -> Result<SuiteConfig> {
    if !path.exists() {
        return Err(CoreError::file_not_found(path));
    }
    let content = std::fs::read_to_string(path)?;
    let config: SuiteConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Save a suite file
pub fn save_suite_config(path: &Path, config: &SuiteConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SUITE: &str = r#"
num_scenarios = 2
workers = 4

[settings]
max_steps = 50
step_time = 0.1

[evaluators]
collision = "collision"
step = "step_count"

[terminal_when]
collision = { op = "is_true" }
step = { op = "greater_than", value = 40 }

[[behaviors]]
name = "cv"
model = { type = "constant_velocity" }

[[behaviors]]
name = "fast"
model = { type = "constant_acceleration", acceleration = 1.5, max_velocity = 25.0 }
"#;

    #[test]
    fn test_parse_suite() {
        let suite: SuiteConfig = toml::from_str(SUITE).unwrap();
        suite.validate().unwrap();

        assert_eq!(suite.num_scenarios, Some(2));
        assert_eq!(suite.workers, Some(4));
        assert_eq!(suite.settings.max_steps, 50);
        assert_eq!(suite.evaluators["step"], EvaluatorKind::StepCount);
        assert_eq!(suite.terminal_when["step"], Predicate::GreaterThan(40.0));
        assert_eq!(suite.behaviors.len(), 2);
        assert_eq!(
            suite.behaviors[1].model,
            BehaviorModel::ConstantAcceleration {
                acceleration: 1.5,
                max_velocity: 25.0
            }
        );
    }

    #[test]
    fn test_suite_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suite.toml");

        let suite = SuiteConfig::standard();
        save_suite_config(&path, &suite).unwrap();
        let loaded = load_suite_config(&path).unwrap();

        assert_eq!(loaded, suite);
    }

    #[test]
    fn test_duplicate_behavior_rejected() {
        let mut suite = SuiteConfig::standard();
        suite.behaviors.push(suite.behaviors[0].clone());
        assert!(suite.validate().is_err());
    }

    #[test]
    fn test_degenerate_settings_rejected() {
        let behaviors = "[[behaviors]]\nname = \"cv\"\nmodel = { type = \"constant_velocity\" }\n";
        for settings in [
            "[settings]\nstep_time = nan\n",
            "[settings]\nstep_time = inf\n",
            "[settings]\nstep_time = -0.2\n",
            "[settings]\nmax_steps = 0\n",
        ] {
            let suite: SuiteConfig = toml::from_str(&format!("{}{}", settings, behaviors)).unwrap();
            assert!(
                matches!(suite.validate(), Err(CoreError::InvalidConfig(_))),
                "accepted {}",
                settings
            );
        }
    }

    #[test]
    fn test_settings_default_when_missing() {
        let suite: SuiteConfig = toml::from_str(
            r#"
[[behaviors]]
name = "cv"
model = { type = "constant_velocity" }
"#,
        )
        .unwrap();
        assert_eq!(suite.settings, RunSettings::default());
        suite.validate().unwrap();
    }
}
