use crate::models::{Routine, RoutineStep, StepCategory};
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum CatalogError {
    Empty,
    EmptyRoutine(String),
    ZeroDurationStep { routine_id: String, step_id: String },
    UnknownDefault(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "catalog must contain at least one routine"),
            CatalogError::EmptyRoutine(id) => {
                write!(f, "routine {id} must have at least one step")
            }
            CatalogError::ZeroDurationStep {
                routine_id,
                step_id,
            } => write!(
                f,
                "step {step_id} in routine {routine_id} must last at least 1 second"
            ),
            CatalogError::UnknownDefault(id) => {
                write!(f, "default routine {id} is not in the catalog")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Read-only routine catalog. Unknown lookups fall back to the default
/// entry, so resolution never fails once the catalog is built.
#[derive(Debug, Clone)]
pub struct RoutineCatalog {
    routines: Vec<Routine>,
    default_index: usize,
}

impl RoutineCatalog {
    pub fn new(routines: Vec<Routine>, default_id: &str) -> Result<Self, CatalogError> {
        if routines.is_empty() {
            return Err(CatalogError::Empty);
        }
        for routine in &routines {
            if routine.steps.is_empty() {
                return Err(CatalogError::EmptyRoutine(routine.id.clone()));
            }
            if let Some(step) = routine.steps.iter().find(|step| step.duration_seconds == 0) {
                return Err(CatalogError::ZeroDurationStep {
                    routine_id: routine.id.clone(),
                    step_id: step.id.clone(),
                });
            }
        }
        let default_index = routines
            .iter()
            .position(|routine| routine.id == default_id)
            .ok_or_else(|| CatalogError::UnknownDefault(default_id.to_string()))?;
        Ok(Self {
            routines,
            default_index,
        })
    }

    /// The two routines shipped with the posture coach, `posture` being
    /// the default.
    pub fn builtin() -> Self {
        Self {
            routines: vec![posture_routine(), posture_strength_routine()],
            default_index: 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Routine> {
        self.routines.iter().find(|routine| routine.id == id)
    }

    /// Resolves an id, silently falling back to the default routine.
    pub fn resolve(&self, id: &str) -> &Routine {
        self.get(id).unwrap_or(&self.routines[self.default_index])
    }

    pub fn default_routine(&self) -> &Routine {
        &self.routines[self.default_index]
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }
}

fn step(id: &str, duration_seconds: u32, category: StepCategory) -> RoutineStep {
    RoutineStep {
        id: id.to_string(),
        duration_seconds,
        category,
    }
}

fn posture_routine() -> Routine {
    Routine {
        id: "posture".to_string(),
        display_name: "Daily Posture Routine".to_string(),
        total_minutes_hint: 10,
        description: "10-minute micro-routine to improve alignment".to_string(),
        steps: vec![
            step("posture_wall_check", 60, StepCategory::Activation),
            step("posture_chin_tucks", 180, StepCategory::Strengthening),
            step("posture_pull_aparts", 180, StepCategory::Strengthening),
            step("posture_pec_stretch", 60, StepCategory::Release),
            step("posture_cat_camel", 120, StepCategory::Maintenance),
        ],
    }
}

fn posture_strength_routine() -> Routine {
    Routine {
        id: "posture_strength".to_string(),
        display_name: "Strength Session (Optional)".to_string(),
        total_minutes_hint: 25,
        description: "Twice-weekly strength add-on to reinforce posture".to_string(),
        steps: vec![
            step("foam_roller_thoracic", 120, StepCategory::Activation),
            step("prone_y_raise", 180, StepCategory::Strengthening),
            step("supine_neck_nod", 180, StepCategory::Strengthening),
            step("face_pull_band", 180, StepCategory::Strengthening),
            step("reverse_fly", 180, StepCategory::Strengthening),
            step("dead_bug", 180, StepCategory::StrengthTraining),
        ],
    }
}
