//! Domain priority tables shared by the prompt layer, the validator and
//! the fallback planner.

use crate::{MuscleGroup, Split, StrengthTier, UserProgress};

/// Mandatory primary lifts, highest priority first
pub const PRIMARY_LIFTS: &[&str] = &[
    "barbell_back_squat",
    "barbell_bench_press",
    "conventional_deadlift",
    "overhead_press",
    "front_squat",
    "sumo_deadlift",
];

/// Secondary compounds the fallback planner reaches for after the primary lift
pub const SECONDARY_PRIORITY: &[&str] = &[
    "barbell_row",
    "romanian_deadlift",
    "pull_up",
    "incline_bench_press",
    "parallel_dip",
    "dumbbell_bench_press",
    "goblet_squat",
    "walking_lunge",
    "kettlebell_swing",
    "push_up",
];

/// Percentile assumed when no usable progress record exists.
///
/// Brand-new users (and users whose rankings are all zero) are gated as if
/// they sat at the median. This changes which catalog entries they see.
pub const DEFAULT_PERCENTILE: f64 = 50.0;

/// Length of the split weakness window
pub const WEAKNESS_WINDOW_DAYS: i64 = 21;

/// Number of recent sessions whose exercises count as recently used
pub const RECENT_SESSION_COUNT: usize = 3;

pub fn is_primary_lift(id: &str) -> bool {
    PRIMARY_LIFTS.contains(&id)
}

pub fn is_secondary_priority(id: &str) -> bool {
    SECONDARY_PRIORITY.contains(&id)
}

impl Split {
    /// Muscle groups a session of this split should train
    pub fn target_muscles(&self) -> &'static [MuscleGroup] {
        use MuscleGroup::*;
        match self {
            Split::Push => &[Chest, Shoulders, Triceps],
            Split::Pull => &[Back, Biceps],
            Split::Legs => &[Quadriceps, Hamstrings, Glutes, Calves],
            Split::Upper => &[Chest, Back, Shoulders, Biceps, Triceps],
            Split::Lower => &[Quadriceps, Hamstrings, Glutes, Calves, Core],
            Split::FullBody => &[Chest, Back, Shoulders, Quadriceps, Hamstrings, Glutes, Core],
        }
    }

    /// Primary lifts that best anchor this split, highest priority first
    pub fn required_primary_lifts(&self) -> &'static [&'static str] {
        match self {
            Split::Push | Split::Upper => &["barbell_bench_press", "overhead_press"],
            Split::Pull => &["conventional_deadlift", "sumo_deadlift"],
            Split::Legs => &["barbell_back_squat", "front_squat", "conventional_deadlift"],
            Split::Lower => &["barbell_back_squat", "conventional_deadlift", "front_squat"],
            Split::FullBody => &[
                "barbell_back_squat",
                "barbell_bench_press",
                "conventional_deadlift",
            ],
        }
    }
}

/// Average percentile across progress records.
///
/// Non-positive and non-finite rankings are ignored; when nothing remains
/// the result is [`DEFAULT_PERCENTILE`].
pub fn average_percentile(progress: &[UserProgress]) -> f64 {
    let usable: Vec<f64> = progress
        .iter()
        .map(|p| p.percentile_ranking)
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();

    if usable.is_empty() {
        return DEFAULT_PERCENTILE;
    }

    let avg = usable.iter().sum::<f64>() / usable.len() as f64;
    avg.clamp(0.0, 100.0)
}

/// Difficulty label written onto plans for a given percentile
pub fn difficulty_for(percentile: f64) -> &'static str {
    match StrengthTier::from_percentile(percentile) {
        StrengthTier::Beginner | StrengthTier::Novice => "beginner",
        StrengthTier::Intermediate => "intermediate",
        StrengthTier::Advanced | StrengthTier::Elite => "advanced",
    }
}
