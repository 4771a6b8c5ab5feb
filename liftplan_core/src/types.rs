//! Core domain types for the workout plan generator.
//!
//! This module defines the fundamental types used throughout the system:
//! - Catalog entries and their muscle/equipment metadata
//! - User profile, progress records and logged history
//! - The derived workout analysis
//! - Candidate plans and validation verdicts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Catalog Types
// ============================================================================

/// Equipment an exercise needs
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    Barbell,
    Dumbbell,
    Kettlebell,
    Bodyweight,
    PullupBar,
    Bench,
    Cable,
    Machine,
    Bands,
}

impl Equipment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Equipment::Barbell => "barbell",
            Equipment::Dumbbell => "dumbbell",
            Equipment::Kettlebell => "kettlebell",
            Equipment::Bodyweight => "bodyweight",
            Equipment::PullupBar => "pullup_bar",
            Equipment::Bench => "bench",
            Equipment::Cable => "cable",
            Equipment::Machine => "machine",
            Equipment::Bands => "bands",
        }
    }
}

impl FromStr for Equipment {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "barbell" => Ok(Equipment::Barbell),
            "dumbbell" | "dumbbells" => Ok(Equipment::Dumbbell),
            "kettlebell" | "kettlebells" => Ok(Equipment::Kettlebell),
            "bodyweight" | "none" => Ok(Equipment::Bodyweight),
            "pullup_bar" | "pull_up_bar" => Ok(Equipment::PullupBar),
            "bench" => Ok(Equipment::Bench),
            "cable" | "cables" => Ok(Equipment::Cable),
            "machine" | "machines" => Ok(Equipment::Machine),
            "bands" | "band" => Ok(Equipment::Bands),
            other => Err(crate::Error::Other(format!("Unknown equipment: {}", other))),
        }
    }
}

/// Muscle groups used for split targeting and gap analysis
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Quadriceps,
    Hamstrings,
    Glutes,
    Calves,
    Core,
}

impl MuscleGroup {
    /// Groups tracked by the auto-focus gap analysis
    pub const MAJOR: [MuscleGroup; 6] = [
        MuscleGroup::Chest,
        MuscleGroup::Back,
        MuscleGroup::Shoulders,
        MuscleGroup::Quadriceps,
        MuscleGroup::Hamstrings,
        MuscleGroup::Glutes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleGroup::Chest => "chest",
            MuscleGroup::Back => "back",
            MuscleGroup::Shoulders => "shoulders",
            MuscleGroup::Biceps => "biceps",
            MuscleGroup::Triceps => "triceps",
            MuscleGroup::Quadriceps => "quadriceps",
            MuscleGroup::Hamstrings => "hamstrings",
            MuscleGroup::Glutes => "glutes",
            MuscleGroup::Calves => "calves",
            MuscleGroup::Core => "core",
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movement category of a catalog entry
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Compound,
    Isolation,
    Cardio,
    Flexibility,
}

/// A single exercise exposed by the catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub category: ExerciseCategory,
    pub primary_muscles: Vec<MuscleGroup>,
    #[serde(default)]
    pub secondary_muscles: Vec<MuscleGroup>,
    pub equipment: Vec<Equipment>,
    /// Minimum user percentile at which this entry becomes visible
    #[serde(default)]
    pub percentile_tier: u8,
}

impl CatalogEntry {
    /// True when the entry needs nothing beyond body weight
    pub fn is_bodyweight_only(&self) -> bool {
        self.equipment.iter().all(|e| *e == Equipment::Bodyweight)
    }

    /// Every non-bodyweight item must be available; bodyweight always is.
    pub fn fits_equipment(&self, available: &[Equipment]) -> bool {
        self.equipment
            .iter()
            .all(|e| *e == Equipment::Bodyweight || available.contains(e))
    }

    pub fn targets_any(&self, muscles: &[MuscleGroup]) -> bool {
        self.primary_muscles.iter().any(|m| muscles.contains(m))
    }
}

// ============================================================================
// Splits and Workout Types
// ============================================================================

/// Named training focus for a session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    Push,
    Pull,
    Legs,
    Upper,
    Lower,
    FullBody,
}

impl Split {
    pub const ALL: [Split; 6] = [
        Split::Push,
        Split::Pull,
        Split::Legs,
        Split::Upper,
        Split::Lower,
        Split::FullBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Push => "push",
            Split::Pull => "pull",
            Split::Legs => "legs",
            Split::Upper => "upper",
            Split::Lower => "lower",
            Split::FullBody => "full_body",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "push" => Ok(Split::Push),
            "pull" => Ok(Split::Pull),
            "legs" | "leg" => Ok(Split::Legs),
            "upper" | "upper_body" => Ok(Split::Upper),
            "lower" | "lower_body" => Ok(Split::Lower),
            "full_body" | "fullbody" | "full" => Ok(Split::FullBody),
            other => Err(crate::Error::Other(format!("Unknown split: {}", other))),
        }
    }
}

/// User-selected workout type filter; keys the prompt strategy lookup
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Powerlifting,
    Strength,
    Bodyweight,
    Calisthenics,
    General,
    Hypertrophy,
}

impl FromStr for WorkoutType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "powerlifting" => Ok(WorkoutType::Powerlifting),
            "strength" => Ok(WorkoutType::Strength),
            "bodyweight" => Ok(WorkoutType::Bodyweight),
            "calisthenics" => Ok(WorkoutType::Calisthenics),
            "general" => Ok(WorkoutType::General),
            "hypertrophy" => Ok(WorkoutType::Hypertrophy),
            other => Err(crate::Error::Other(format!("Unknown workout type: {}", other))),
        }
    }
}

// ============================================================================
// Profile, Progress and History
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    Kg,
    #[default]
    Lbs,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }
}

/// Static user profile
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserProfile {
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub body_weight: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
}

/// Relative strength tier derived from percentile rankings
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StrengthTier {
    Beginner,
    Novice,
    Intermediate,
    Advanced,
    Elite,
}

impl StrengthTier {
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 90.0 {
            StrengthTier::Elite
        } else if percentile >= 75.0 {
            StrengthTier::Advanced
        } else if percentile >= 50.0 {
            StrengthTier::Intermediate
        } else if percentile >= 25.0 {
            StrengthTier::Novice
        } else {
            StrengthTier::Beginner
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrengthTier::Beginner => "beginner",
            StrengthTier::Novice => "novice",
            StrengthTier::Intermediate => "intermediate",
            StrengthTier::Advanced => "advanced",
            StrengthTier::Elite => "elite",
        }
    }
}

/// Per-exercise progress record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserProgress {
    pub exercise_id: String,
    pub personal_record: f64,
    pub percentile_ranking: f64,
    pub strength_tier: StrengthTier,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedSet {
    pub weight: f64,
    pub reps: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedExercise {
    pub exercise_id: String,
    #[serde(default)]
    pub sets: Vec<LoggedSet>,
}

/// A completed training session from the user's history
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub performed_at: DateTime<Utc>,
    #[serde(default)]
    pub exercises: Vec<LoggedExercise>,
}

/// Optional narrowing of what a generation call may use
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct WorkoutFilters {
    #[serde(default)]
    pub equipment: Option<Vec<Equipment>>,
    #[serde(default)]
    pub workout_type: Option<WorkoutType>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct GenerationPreferences {
    #[serde(default)]
    pub target_duration_minutes: Option<u32>,
    #[serde(default)]
    pub exclude_bodyweight: bool,
}

/// Immutable input snapshot for a single generation call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutContext {
    #[serde(default = "Utc::now")]
    pub now: DateTime<Utc>,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub progress: Vec<UserProgress>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub history: Vec<WorkoutSession>,
    #[serde(default)]
    pub filters: WorkoutFilters,
    #[serde(default)]
    pub custom_exercises: Vec<CatalogEntry>,
    #[serde(default)]
    pub preferences: GenerationPreferences,
}

impl WorkoutContext {
    /// An empty context at `now` with the given equipment
    pub fn new(now: DateTime<Utc>, equipment: Vec<Equipment>) -> Self {
        Self {
            now,
            profile: UserProfile::default(),
            progress: Vec::new(),
            equipment,
            history: Vec::new(),
            filters: WorkoutFilters::default(),
            custom_exercises: Vec::new(),
            preferences: GenerationPreferences::default(),
        }
    }

    /// Equipment filter when set, otherwise the declared equipment
    pub fn effective_equipment(&self) -> &[Equipment] {
        self.filters
            .equipment
            .as_deref()
            .unwrap_or(&self.equipment)
    }
}

// ============================================================================
// Analysis Types
// ============================================================================

/// Recommendation when the user did not choose a split
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoFocus {
    pub recommended_split: Split,
    pub reasoning: String,
    pub muscle_gaps: Vec<String>,
}

/// Flat-or-declining trend for one exercise inside the analysis window
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionIssue {
    pub exercise_id: String,
    pub sessions: usize,
    pub weight_delta: f64,
    pub reps_delta: i64,
}

/// Weakness analysis for a user-chosen split
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SplitWeaknesses {
    pub split: Split,
    pub weak_areas: Vec<String>,
    pub progression_narrative: String,
    pub progression_issues: Vec<ProgressionIssue>,
}

/// Exactly one analysis branch per call
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisFocus {
    AutoFocus(AutoFocus),
    SplitWeaknesses(SplitWeaknesses),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutAnalysis {
    /// Exercise ids of the last three sessions, newest first, not deduplicated
    pub recent_exercise_ids: Vec<String>,
    pub overall_percentile: f64,
    pub strength_tier: String,
    pub focus: AnalysisFocus,
}

impl WorkoutAnalysis {
    /// The split this analysis points at
    pub fn split(&self) -> Split {
        match &self.focus {
            AnalysisFocus::AutoFocus(auto) => auto.recommended_split,
            AnalysisFocus::SplitWeaknesses(weak) => weak.split,
        }
    }
}

// ============================================================================
// Plan Types
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedSet {
    pub weight: f64,
    pub reps: u32,
}

/// One exercise slot in a generated plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedExercise {
    pub id: String,
    pub sets: u32,
    /// Exact integer rep target, string-encoded
    pub reps: String,
    #[serde(default)]
    pub completed_sets: Vec<CompletedSet>,
    #[serde(default)]
    pub completed: bool,
}

impl PlannedExercise {
    pub fn new(id: impl Into<String>, sets: u32, reps: u32) -> Self {
        Self {
            id: id.into(),
            sets,
            reps: reps.to_string(),
            completed_sets: Vec::new(),
            completed: false,
        }
    }
}

/// A candidate or accepted workout plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWorkout {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub exercises: Vec<PlannedExercise>,
    pub estimated_duration: u32,
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedWorkout {
    pub fn exercise_ids(&self) -> BTreeSet<&str> {
        self.exercises.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(|e| e.sets).sum()
    }
}

/// Verdict of the plan validator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub score: u8,
    pub feedback: Vec<String>,
    pub critical_issues: Vec<String>,
    pub suggestions: Vec<String>,
}
