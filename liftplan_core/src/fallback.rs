//! Deterministic catalog-only planner.
//!
//! Used when the oracle is disabled or the retry loop is exhausted. The
//! plan is built by a tiered greedy fill; each tier only adds exercises not
//! already selected:
//!
//! 1. **Primary lift**: the split's required lifts, then any mandatory
//!    primary lift in the filtered catalog, then (emergency) any mandatory
//!    primary lift at percentile 100 that fits the equipment.
//! 2. **Secondary compounds**: up to 2 from the secondary priority list.
//! 3. **Compounds** from the filtered catalog until 4 exercises.
//! 4. **Isolation** from the filtered catalog until 6 exercises.
//! 5. **Sparse catalog**: still under 4, fill ignoring muscle focus and
//!    percentile; equipment is dropped only as a last resort.
//! 6. Truncate to 6.
//!
//! Exercises from the previous plan and recent sessions are pushed to the
//! back of each candidate list so a regenerated plan differs where the
//! catalog allows it.

use crate::catalog::{filter_for_context, ExerciseCatalog, ExerciseLookup};
use crate::prompt::PromptStrategy;
use crate::rules::{self, PRIMARY_LIFTS, SECONDARY_PRIORITY};
use crate::validator::{validate_plan, MIN_EXERCISES};
use crate::{
    CatalogEntry, ExerciseCategory, GeneratedWorkout, PlannedExercise, Split, WorkoutAnalysis,
    WorkoutContext,
};
use std::collections::HashSet;
use uuid::Uuid;

/// Upper bound on fallback plan size
pub const MAX_FALLBACK_EXERCISES: usize = 6;

const MAX_SECONDARY: usize = 2;

/// (sets, reps) per selection tier
const PRIMARY_PRESCRIPTION: (u32, u32) = (4, 5);
const SECONDARY_PRESCRIPTION: (u32, u32) = (3, 8);
const ACCESSORY_PRESCRIPTION: (u32, u32) = (3, 12);

/// Fallback duration: `count * 10 + 15`
pub fn fallback_duration(exercise_count: usize) -> u32 {
    exercise_count as u32 * 10 + 15
}

/// Greedy selection state
struct Selection<'c> {
    picked: Vec<&'c CatalogEntry>,
    ids: HashSet<&'c str>,
    avoid: HashSet<&'c str>,
}

impl<'c> Selection<'c> {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn push(&mut self, entry: &'c CatalogEntry) {
        if self.ids.insert(entry.id.as_str()) {
            self.picked.push(entry);
        }
    }

    /// Unpicked candidates, avoided ids moved to the back (stable)
    fn fresh(&self, candidates: &[&'c CatalogEntry]) -> Vec<&'c CatalogEntry> {
        let (preferred, avoided): (Vec<&'c CatalogEntry>, Vec<&'c CatalogEntry>) = candidates
            .iter()
            .copied()
            .filter(|e| !self.contains(&e.id))
            .partition(|e| !self.avoid.contains(e.id.as_str()));
        preferred.into_iter().chain(avoided).collect()
    }

    fn fill_until(&mut self, target: usize, candidates: Vec<&'c CatalogEntry>) {
        for entry in candidates {
            if self.picked.len() >= target {
                break;
            }
            self.push(entry);
        }
    }
}

fn first_in_order<'c>(order: &[&str], pool: &[&'c CatalogEntry]) -> Option<&'c CatalogEntry> {
    order
        .iter()
        .find_map(|id| pool.iter().find(|e| e.id == *id).copied())
}

fn prescription_for(id: &str) -> (u32, u32) {
    if rules::is_primary_lift(id) {
        PRIMARY_PRESCRIPTION
    } else if rules::is_secondary_priority(id) {
        SECONDARY_PRESCRIPTION
    } else {
        ACCESSORY_PRESCRIPTION
    }
}

fn split_title(split: Split) -> &'static str {
    match split {
        Split::Push => "Push",
        Split::Pull => "Pull",
        Split::Legs => "Legs",
        Split::Upper => "Upper Body",
        Split::Lower => "Lower Body",
        Split::FullBody => "Full Body",
    }
}

/// Build a plan from the catalog alone
///
/// Never fails. The result is re-validated with `strategy`'s policy and a
/// failure is logged, not returned.
pub fn build_fallback_plan(
    ctx: &WorkoutContext,
    analysis: &WorkoutAnalysis,
    catalog: &dyn ExerciseCatalog,
    split: Split,
    previous: Option<&GeneratedWorkout>,
    strategy: &dyn PromptStrategy,
) -> GeneratedWorkout {
    let equipment = ctx.effective_equipment();
    let filtered = filter_for_context(
        catalog,
        ctx,
        analysis.overall_percentile,
        Some(split.target_muscles()),
    );

    let mut avoid: HashSet<&str> = analysis
        .recent_exercise_ids
        .iter()
        .map(String::as_str)
        .collect();
    if let Some(previous) = previous {
        avoid.extend(previous.exercises.iter().map(|e| e.id.as_str()));
    }

    let mut selection = Selection {
        picked: Vec::new(),
        ids: HashSet::new(),
        avoid,
    };

    // Tier 1
    let primary = first_in_order(split.required_primary_lifts(), &filtered)
        .or_else(|| first_in_order(PRIMARY_LIFTS, &filtered))
        .or_else(|| {
            let unfiltered = catalog.list_by_percentile_and_equipment(100.0, equipment, None);
            let found = first_in_order(PRIMARY_LIFTS, &unfiltered);
            if let Some(entry) = found {
                tracing::info!("Fallback tier 1: emergency primary lift {}", entry.id);
            }
            found
        });
    match primary {
        Some(entry) => selection.push(entry),
        None => tracing::warn!("Fallback tier 1: no primary lift fits the available equipment"),
    }

    // Tier 2
    let secondary: Vec<&CatalogEntry> = SECONDARY_PRIORITY
        .iter()
        .filter_map(|id| filtered.iter().find(|e| e.id == *id))
        .filter(|e| e.category == ExerciseCategory::Compound)
        .copied()
        .collect();
    let secondary = selection.fresh(&secondary);
    let target = selection.picked.len() + MAX_SECONDARY;
    selection.fill_until(target, secondary);

    // Tier 3
    let compounds: Vec<&CatalogEntry> = filtered
        .iter()
        .filter(|e| e.category == ExerciseCategory::Compound)
        .copied()
        .collect();
    let compounds = selection.fresh(&compounds);
    selection.fill_until(MIN_EXERCISES, compounds);

    // Tier 4
    let isolation: Vec<&CatalogEntry> = filtered
        .iter()
        .filter(|e| e.category == ExerciseCategory::Isolation)
        .copied()
        .collect();
    let isolation = selection.fresh(&isolation);
    selection.fill_until(MAX_FALLBACK_EXERCISES, isolation);

    // Tier 5
    if selection.picked.len() < MIN_EXERCISES {
        tracing::info!(
            "Fallback tier 5: only {} exercises after filtering, widening search",
            selection.picked.len()
        );
        let wide = catalog.list_by_percentile_and_equipment(100.0, equipment, None);
        let wide = selection.fresh(&wide);
        selection.fill_until(MIN_EXERCISES, wide);
    }
    if selection.picked.len() < MIN_EXERCISES {
        let all: Vec<&CatalogEntry> = catalog.entries().iter().collect();
        let all = selection.fresh(&all);
        selection.fill_until(MIN_EXERCISES, all);
    }

    // Tier 6
    selection.picked.truncate(MAX_FALLBACK_EXERCISES);

    let exercises: Vec<PlannedExercise> = selection
        .picked
        .iter()
        .map(|entry| {
            let (sets, reps) = prescription_for(&entry.id);
            PlannedExercise::new(entry.id.clone(), sets, reps)
        })
        .collect();

    let plan = GeneratedWorkout {
        id: Uuid::new_v4(),
        title: format!("{} Strength Session", split_title(split)),
        description: format!(
            "Catalog-built {} session: primary lift first, compounds before accessories.",
            split
        ),
        estimated_duration: fallback_duration(exercises.len()),
        exercises,
        difficulty: rules::difficulty_for(analysis.overall_percentile).to_string(),
        created_at: ctx.now,
    };

    tracing::info!(
        "Fallback plan for {}: {}",
        split,
        plan.exercises
            .iter()
            .map(|e| e.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let lookup = ExerciseLookup::new(catalog, &ctx.custom_exercises);
    let check = validate_plan(&plan, &lookup, strategy.validation_policy());
    if !check.is_valid {
        tracing::error!(
            "Fallback plan failed validation (score {}): {:?}",
            check.score,
            check.critical_issues
        );
    }

    plan
}
