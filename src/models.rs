use serde::{Deserialize, Serialize};

/// Informational tag on a step. The engine never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    Activation,
    Strengthening,
    Release,
    Maintenance,
    StrengthTraining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineStep {
    pub id: String,
    pub duration_seconds: u32,
    pub category: StepCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub display_name: String,
    pub total_minutes_hint: u32,
    pub description: String,
    pub steps: Vec<RoutineStep>,
}

impl Routine {
    /// Sum of all step durations, in seconds.
    pub fn total_seconds(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| u64::from(step.duration_seconds))
            .sum()
    }
}

/// Record appended to the history sink once per fully-completed session.
/// `duration_seconds` is running wall time with paused time excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub routine_id: String,
    pub duration_seconds: u64,
    pub completed_at: String,
    pub step_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

/// Read-only view of the session for display layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub step_index: usize,
    pub step_remaining_seconds: u64,
    pub total_elapsed_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percentage: f32,
}

#[cfg(test)]
mod tests {
    use super::{Routine, RoutineStep, StepCategory};

    fn step(id: &str, duration_seconds: u32) -> RoutineStep {
        RoutineStep {
            id: id.to_string(),
            duration_seconds,
            category: StepCategory::Activation,
        }
    }

    #[test]
    fn total_seconds_sums_step_durations() {
        let routine = Routine {
            id: "routine-1".to_string(),
            display_name: "Sample".to_string(),
            total_minutes_hint: 5,
            description: String::new(),
            steps: vec![step("a", 60), step("b", 180), step("c", 60)],
        };
        assert_eq!(routine.total_seconds(), 300);
    }

    #[test]
    fn step_category_uses_snake_case_names() {
        let json = serde_json::to_string(&StepCategory::StrengthTraining).expect("serialize");
        assert_eq!(json, "\"strength_training\"");
    }
}
