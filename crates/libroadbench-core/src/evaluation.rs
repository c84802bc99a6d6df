//! Evaluators and terminal predicates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::world::World;
use crate::Result;

/// Evaluators by result column name
pub type EvaluatorSet = BTreeMap<String, EvaluatorKind>;

/// Terminal predicates by evaluator name; an episode ends when any holds
pub type TerminalConditions = BTreeMap<String, Predicate>;

/// Value produced by an evaluator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvalValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl EvalValue {
    /// Numeric view; booleans map to 0/1
    pub fn as_f64(&self) -> f64 {
        match self {
            EvalValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            EvalValue::Int(i) => *i as f64,
            EvalValue::Float(f) => *f,
        }
    }
}

impl std::fmt::Display for EvalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalValue::Bool(b) => write!(f, "{}", b),
            EvalValue::Int(i) => write!(f, "{}", i),
            EvalValue::Float(x) => write!(f, "{:.3}", x),
        }
    }
}

/// Built-in evaluators, all measured on the ego agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// Number of steps simulated so far
    StepCount,
    /// Ego center inside the goal region
    GoalReached,
    /// Ego footprint overlaps another agent
    Collision,
    /// Ego footprint inside the map bounds
    DrivableArea,
    /// Ego velocity in m/s
    EgoVelocity,
}

impl EvaluatorKind {
    pub fn evaluate(&self, world: &World, step: u64) -> EvalValue {
        match self {
            EvaluatorKind::StepCount => EvalValue::Int(step as i64),
            EvaluatorKind::GoalReached => EvalValue::Bool(match (world.ego(), world.goal()) {
                (Some(ego), Some(goal)) => goal.contains_point(ego.state.x, ego.state.y),
                _ => false,
            }),
            EvaluatorKind::Collision => EvalValue::Bool(ego_collides(world)),
            EvaluatorKind::DrivableArea => EvalValue::Bool(
                world
                    .ego()
                    .map(|ego| world.bounds().contains(&ego.footprint()))
                    .unwrap_or(false),
            ),
            EvaluatorKind::EgoVelocity => {
                EvalValue::Float(world.ego().map(|ego| ego.state.velocity).unwrap_or(0.0))
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorKind::StepCount => "step_count",
            EvaluatorKind::GoalReached => "goal_reached",
            EvaluatorKind::Collision => "collision",
            EvaluatorKind::DrivableArea => "drivable_area",
            EvaluatorKind::EgoVelocity => "ego_velocity",
        }
    }
}

fn ego_collides(world: &World) -> bool {
    let Some(ego) = world.ego() else {
        return false;
    };
    let footprint = ego.footprint();
    world
        .agents()
        .filter(|other| other.id != ego.id)
        .any(|other| footprint.intersects(&other.footprint()))
}

/// Predicate over an evaluator value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    IsTrue,
    IsFalse,
    GreaterThan(f64),
    LessThan(f64),
    AtLeast(f64),
}

impl Predicate {
    pub fn holds(&self, value: &EvalValue) -> bool {
        match self {
            Predicate::IsTrue => value.as_f64() != 0.0,
            Predicate::IsFalse => value.as_f64() == 0.0,
            Predicate::GreaterThan(t) => value.as_f64() > *t,
            Predicate::LessThan(t) => value.as_f64() < *t,
            Predicate::AtLeast(t) => value.as_f64() >= *t,
        }
    }
}

/// Evaluate every evaluator on the current world
pub fn evaluate_all(evaluators: &EvaluatorSet, world: &World, step: u64) -> BTreeMap<String, EvalValue> {
    evaluators
        .iter()
        .map(|(name, kind)| (name.clone(), kind.evaluate(world, step)))
        .collect()
}

/// Names of the terminal conditions satisfied by `values`
pub fn triggered_conditions(
    terminal_when: &TerminalConditions,
    values: &BTreeMap<String, EvalValue>,
) -> Vec<String> {
    terminal_when
        .iter()
        .filter(|(name, predicate)| values.get(*name).map(|v| predicate.holds(v)).unwrap_or(false))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Every terminal condition must refer to a configured evaluator
pub fn validate_terminal_conditions(
    evaluators: &EvaluatorSet,
    terminal_when: &TerminalConditions,
) -> Result<()> {
    for name in terminal_when.keys() {
        if !evaluators.contains_key(name) {
            return Err(CoreError::InvalidConfig(format!(
                "terminal condition '{}' refers to an unknown evaluator",
                name
            )));
        }
    }
    Ok(())
}
