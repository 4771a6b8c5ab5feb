//! Deterministic plan validation.
//!
//! Scoring starts at 100 and subtracts fixed penalties. A plan is valid
//! when no critical issue was raised and the score is at least 60. The
//! same function judges oracle output and fallback output.

use crate::catalog::ExerciseLookup;
use crate::rules::is_primary_lift;
use crate::{ExerciseCategory, GeneratedWorkout, ValidationResult};
use std::collections::HashSet;

pub const MIN_EXERCISES: usize = 4;
pub const PASSING_SCORE: u32 = 60;

const PENALTY_NO_PRIMARY_LIFT: u32 = 40;
const PENALTY_TOO_FEW_EXERCISES: u32 = 25;
const PENALTY_TOO_MANY_EXERCISES: u32 = 10;
const PENALTY_NO_COMPOUND: u32 = 30;
const PENALTY_ISOLATION_HEAVY: u32 = 10;
const PENALTY_PRIMARY_HIGH_REPS: u32 = 15;
const PENALTY_NARROW_MUSCLES: u32 = 10;
const PENALTY_PRIMARY_LATE: u32 = 5;
const PENALTY_SHORT_DURATION: u32 = 10;
const PENALTY_LONG_DURATION: u32 = 5;
const PENALTY_LOW_VOLUME: u32 = 10;
const PENALTY_HIGH_VOLUME: u32 = 5;

/// Endurance rep markers that do not belong on a primary lift
const HIGH_REP_MARKERS: [&str; 3] = ["15", "20", "25"];

/// Rule switches contributed by the active strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub require_primary_lift: bool,
    pub max_exercises: usize,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            require_primary_lift: true,
            max_exercises: 7,
        }
    }
}

/// Score a candidate plan
///
/// Pure function of the plan, the lookup and the policy.
pub fn validate_plan(
    plan: &GeneratedWorkout,
    lookup: &ExerciseLookup<'_>,
    policy: ValidationPolicy,
) -> ValidationResult {
    let mut penalty: u32 = 0;
    let mut feedback = Vec::new();
    let mut critical_issues = Vec::new();
    let mut suggestions = Vec::new();

    let count = plan.exercises.len();

    // Structural integrity: ids resolve, sets/reps are concrete integers.
    let unknown: Vec<&str> = plan
        .exercises
        .iter()
        .filter(|e| lookup.get(&e.id).is_none())
        .map(|e| e.id.as_str())
        .collect();
    if !unknown.is_empty() {
        critical_issues.push(format!(
            "Unknown exercise ids (not in the catalog or custom exercises): {}",
            unknown.join(", ")
        ));
    }

    for exercise in &plan.exercises {
        if exercise.sets == 0 {
            critical_issues.push(format!("{} has zero sets", exercise.id));
        }
        if parse_rep_target(&exercise.reps).is_none() {
            critical_issues.push(format!(
                "{} has rep target \"{}\"; reps must be a single integer",
                exercise.id, exercise.reps
            ));
        }
    }

    // Primary lift inclusion
    let primary_positions: Vec<usize> = plan
        .exercises
        .iter()
        .enumerate()
        .filter(|(_, e)| is_primary_lift(&e.id))
        .map(|(i, _)| i)
        .collect();

    if policy.require_primary_lift && primary_positions.is_empty() {
        critical_issues.push(
            "No primary lift (squat, bench press, deadlift or overhead press variant) included"
                .to_string(),
        );
        penalty += PENALTY_NO_PRIMARY_LIFT;
    }

    // Exercise count
    if count < MIN_EXERCISES {
        critical_issues.push(format!(
            "Only {} exercises; at least {} required",
            count, MIN_EXERCISES
        ));
        penalty += PENALTY_TOO_FEW_EXERCISES;
    } else if count > policy.max_exercises {
        critical_issues.push(format!(
            "{} exercises exceeds the maximum of {}",
            count, policy.max_exercises
        ));
        penalty += PENALTY_TOO_MANY_EXERCISES;
    }

    // Compound priority
    let categories: Vec<ExerciseCategory> = plan
        .exercises
        .iter()
        .filter_map(|e| lookup.get(&e.id))
        .map(|entry| entry.category)
        .collect();
    let compound = categories
        .iter()
        .filter(|c| **c == ExerciseCategory::Compound)
        .count();
    let isolation = categories
        .iter()
        .filter(|c| **c == ExerciseCategory::Isolation)
        .count();

    if compound == 0 {
        critical_issues.push("No compound movements included".to_string());
        penalty += PENALTY_NO_COMPOUND;
    } else if count > MIN_EXERCISES && isolation > compound {
        feedback.push(format!(
            "{} isolation exercises outnumber {} compound movements",
            isolation, compound
        ));
        penalty += PENALTY_ISOLATION_HEAVY;
    }

    // Rep-range discipline on primary lifts
    let high_rep_primaries: Vec<&str> = primary_positions
        .iter()
        .map(|&i| &plan.exercises[i])
        .filter(|e| HIGH_REP_MARKERS.iter().any(|m| e.reps.contains(m)))
        .map(|e| e.id.as_str())
        .collect();
    if !high_rep_primaries.is_empty() {
        feedback.push(format!(
            "Primary lifts must stay in strength rep ranges: {}",
            high_rep_primaries.join(", ")
        ));
        penalty += PENALTY_PRIMARY_HIGH_REPS;
    }

    // Muscle coverage
    if count > MIN_EXERCISES {
        let muscles: HashSet<_> = plan
            .exercises
            .iter()
            .filter_map(|e| lookup.get(&e.id))
            .flat_map(|entry| entry.primary_muscles.iter().copied())
            .collect();
        if muscles.len() < 2 {
            feedback.push(format!(
                "Only {} distinct primary muscle group(s) trained",
                muscles.len()
            ));
            penalty += PENALTY_NARROW_MUSCLES;
        }
    }

    // Structural ordering
    if primary_positions.iter().any(|&i| i > 2) {
        suggestions.push("Move primary lifts into the first three exercise slots".to_string());
        penalty += PENALTY_PRIMARY_LATE;
    }

    // Duration
    if plan.estimated_duration < 30 {
        feedback.push(format!(
            "Estimated duration of {} minutes is under 30",
            plan.estimated_duration
        ));
        penalty += PENALTY_SHORT_DURATION;
    } else if plan.estimated_duration > 90 {
        feedback.push(format!(
            "Estimated duration of {} minutes is over 90",
            plan.estimated_duration
        ));
        penalty += PENALTY_LONG_DURATION;
    }

    // Volume
    let total_sets = plan.total_sets();
    if total_sets < 10 {
        feedback.push(format!("Total volume of {} sets is under 10", total_sets));
        penalty += PENALTY_LOW_VOLUME;
    } else if total_sets > 25 {
        feedback.push(format!("Total volume of {} sets is over 25", total_sets));
        penalty += PENALTY_HIGH_VOLUME;
    }

    let score = 100u32.saturating_sub(penalty);
    let is_valid = critical_issues.is_empty() && score >= PASSING_SCORE;

    ValidationResult {
        is_valid,
        score: score as u8,
        feedback,
        critical_issues,
        suggestions,
    }
}

/// A rep target is a single positive integer, surrounding whitespace allowed
pub fn parse_rep_target(reps: &str) -> Option<u32> {
    reps.trim().parse::<u32>().ok().filter(|r| *r > 0)
}
