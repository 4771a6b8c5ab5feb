//! Prompt strategies for the generation oracle.
//!
//! Each strategy turns (context, analysis, catalog subset) into a single
//! request with an embedded output contract. The allowed-id list is what
//! bounds the oracle's output; the validator catches everything else.

use crate::catalog::{filter_for_context, ExerciseCatalog};
use crate::rules::PRIMARY_LIFTS;
use crate::validator::ValidationPolicy;
use crate::{
    AnalysisFocus, CatalogEntry, Equipment, ExerciseCategory, GeneratedWorkout, Split,
    WorkoutAnalysis, WorkoutContext, WorkoutType,
};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Everything a strategy needs to build one prompt
#[derive(Clone, Copy)]
pub struct PromptRequest<'a> {
    pub context: &'a WorkoutContext,
    pub analysis: &'a WorkoutAnalysis,
    pub catalog: &'a dyn ExerciseCatalog,
    pub custom_request: Option<&'a str>,
    /// Split forced by the caller; overrides the analysis
    pub split: Option<Split>,
    /// Plan to vary from on a "make it different" request
    pub previous: Option<&'a GeneratedWorkout>,
}

impl<'a> PromptRequest<'a> {
    pub fn target_split(&self) -> Split {
        self.split.unwrap_or_else(|| self.analysis.split())
    }
}

/// One interchangeable prompt builder
pub trait PromptStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Inclusive exercise-count bounds written into the contract
    fn exercise_bounds(&self) -> (usize, usize);

    fn minutes_per_exercise(&self) -> u32;

    /// Whether plans from this strategy may omit a primary lift
    fn waives_primary_lift(&self) -> bool {
        false
    }

    /// Catalog entries offered to the oracle, in presentation order
    fn candidate_exercises<'a>(&self, req: &PromptRequest<'a>) -> Vec<&'a CatalogEntry>;

    /// Strategy-specific coaching brief opening the prompt
    fn coaching_brief(&self, req: &PromptRequest<'_>) -> String;

    fn build_prompt(&self, req: &PromptRequest<'_>) -> String {
        render_prompt(self, req)
    }

    fn estimated_duration(&self, exercise_count: usize) -> u32 {
        exercise_count as u32 * self.minutes_per_exercise()
    }

    fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            require_primary_lift: !self.waives_primary_lift(),
            max_exercises: self.exercise_bounds().1,
        }
    }
}

/// Competition-lift-biased strategy; the default
pub struct CompetitionStrategy;

/// Minimal-equipment strategy; waives the primary-lift rule
pub struct BodyweightStrategy;

/// General fitness strategy
pub struct GeneralStrategy;

/// Pure lookup from the workout-type filter to a strategy
pub fn strategy_for(workout_type: Option<WorkoutType>) -> &'static dyn PromptStrategy {
    match workout_type {
        Some(WorkoutType::Bodyweight | WorkoutType::Calisthenics) => &BodyweightStrategy,
        Some(WorkoutType::General | WorkoutType::Hypertrophy) => &GeneralStrategy,
        Some(WorkoutType::Powerlifting | WorkoutType::Strength) | None => &CompetitionStrategy,
    }
}

/// Ids an oracle plan may use for this request.
///
/// The strategy's candidates and the custom exercises, widened to every
/// catalog entry that passes the context's percentile and equipment gate so
/// a primary lift outside the split's muscle filter stays usable.
pub fn allowed_exercise_ids<'a, S: PromptStrategy + ?Sized>(
    strategy: &S,
    req: &PromptRequest<'a>,
) -> HashSet<&'a str> {
    let gated = filter_for_context(
        req.catalog,
        req.context,
        req.analysis.overall_percentile,
        None,
    );
    strategy
        .candidate_exercises(req)
        .into_iter()
        .chain(gated)
        .chain(req.context.custom_exercises.iter())
        .map(|e| e.id.as_str())
        .collect()
}

fn split_filtered<'a>(req: &PromptRequest<'a>) -> Vec<&'a CatalogEntry> {
    filter_for_context(
        req.catalog,
        req.context,
        req.analysis.overall_percentile,
        Some(req.target_split().target_muscles()),
    )
}

impl PromptStrategy for CompetitionStrategy {
    fn name(&self) -> &'static str {
        "competition"
    }

    fn exercise_bounds(&self) -> (usize, usize) {
        (4, 7)
    }

    fn minutes_per_exercise(&self) -> u32 {
        12
    }

    fn candidate_exercises<'a>(&self, req: &PromptRequest<'a>) -> Vec<&'a CatalogEntry> {
        split_filtered(req)
    }

    fn coaching_brief(&self, req: &PromptRequest<'_>) -> String {
        format!(
            "You are a strength coach preparing a lifter for powerlifting-style training. \
             Build a {} session anchored on the competition lifts. Primary lifts stay in \
             strength rep ranges (3-6 reps); accessories support them.",
            req.target_split()
        )
    }
}

impl PromptStrategy for BodyweightStrategy {
    fn name(&self) -> &'static str {
        "bodyweight"
    }

    fn exercise_bounds(&self) -> (usize, usize) {
        (4, 8)
    }

    fn minutes_per_exercise(&self) -> u32 {
        10
    }

    fn waives_primary_lift(&self) -> bool {
        true
    }

    /// No muscle filtering and no bodyweight exclusion; bodyweight first,
    /// then dumbbell/kettlebell.
    fn candidate_exercises<'a>(&self, req: &PromptRequest<'a>) -> Vec<&'a CatalogEntry> {
        let mut entries = req.catalog.list_by_percentile_and_equipment(
            req.analysis.overall_percentile,
            req.context.effective_equipment(),
            None,
        );
        entries.sort_by_key(|e| minimal_equipment_rank(e));
        entries
    }

    fn coaching_brief(&self, req: &PromptRequest<'_>) -> String {
        format!(
            "You are a calisthenics and minimal-equipment coach. Build a {} session that \
             favours bodyweight, dumbbell and kettlebell movements.",
            req.target_split()
        )
    }
}

fn minimal_equipment_rank(entry: &CatalogEntry) -> u8 {
    if entry.is_bodyweight_only() {
        0
    } else if entry.equipment.iter().all(|e| {
        matches!(
            e,
            Equipment::Bodyweight | Equipment::Dumbbell | Equipment::Kettlebell
        )
    }) {
        1
    } else {
        2
    }
}

impl PromptStrategy for GeneralStrategy {
    fn name(&self) -> &'static str {
        "general"
    }

    fn exercise_bounds(&self) -> (usize, usize) {
        (4, 8)
    }

    fn minutes_per_exercise(&self) -> u32 {
        11
    }

    fn candidate_exercises<'a>(&self, req: &PromptRequest<'a>) -> Vec<&'a CatalogEntry> {
        split_filtered(req)
    }

    fn coaching_brief(&self, req: &PromptRequest<'_>) -> String {
        format!(
            "You are a personal trainer focused on general fitness and muscle balance. \
             Build a {} session with a compound lift first and moderate rep ranges \
             (6-12) for accessories.",
            req.target_split()
        )
    }
}

fn category_label(category: ExerciseCategory) -> &'static str {
    match category {
        ExerciseCategory::Compound => "compound",
        ExerciseCategory::Isolation => "isolation",
        ExerciseCategory::Cardio => "cardio",
        ExerciseCategory::Flexibility => "flexibility",
    }
}

fn render_entry(out: &mut String, entry: &CatalogEntry) {
    let muscles: Vec<&str> = entry.primary_muscles.iter().map(|m| m.as_str()).collect();
    let _ = writeln!(
        out,
        "- {} | {} | {} | {}",
        entry.id,
        entry.name,
        category_label(entry.category),
        muscles.join(", ")
    );
}

/// Shared prompt layout; strategies differ in brief, candidates and contract numbers.
fn render_prompt<S: PromptStrategy + ?Sized>(strategy: &S, req: &PromptRequest<'_>) -> String {
    let ctx = req.context;
    let analysis = req.analysis;
    let split = req.target_split();
    let (min_exercises, max_exercises) = strategy.exercise_bounds();
    let minutes = strategy.minutes_per_exercise();

    let mut out = String::new();
    let _ = writeln!(out, "{}\n", strategy.coaching_brief(req));

    out.push_str("ATHLETE PROFILE:\n");
    let profile = &ctx.profile;
    let _ = writeln!(out, "- Gender: {:?}", profile.gender);
    if let Some(age) = profile.age {
        let _ = writeln!(out, "- Age: {}", age);
    }
    if let Some(weight) = profile.body_weight {
        let _ = writeln!(out, "- Body weight: {} {}", weight, profile.weight_unit.as_str());
    }
    if let Some(height) = profile.height_cm {
        let _ = writeln!(out, "- Height: {} cm", height);
    }
    let _ = writeln!(
        out,
        "- Strength tier: {} (overall percentile {:.0})",
        analysis.strength_tier, analysis.overall_percentile
    );
    let equipment: Vec<&str> = ctx.effective_equipment().iter().map(|e| e.as_str()).collect();
    let _ = writeln!(
        out,
        "- Available equipment: {}",
        if equipment.is_empty() {
            "bodyweight only".to_string()
        } else {
            equipment.join(", ")
        }
    );
    if let Some(minutes) = ctx.preferences.target_duration_minutes {
        let _ = writeln!(out, "- Target session length: about {} minutes", minutes);
    }

    out.push_str("\nSESSION FOCUS:\n");
    let targets: Vec<&str> = split.target_muscles().iter().map(|m| m.as_str()).collect();
    let _ = writeln!(out, "- Split: {} (targets: {})", split, targets.join(", "));
    match &analysis.focus {
        AnalysisFocus::AutoFocus(auto) => {
            let _ = writeln!(out, "- Why: {}", auto.reasoning);
            for gap in &auto.muscle_gaps {
                let _ = writeln!(out, "- Gap: {}", gap);
            }
        }
        AnalysisFocus::SplitWeaknesses(weak) => {
            for area in &weak.weak_areas {
                let _ = writeln!(out, "- Weak area: {}", area);
            }
            for issue in &weak.progression_issues {
                let _ = writeln!(
                    out,
                    "- Stalled: {} over {} sessions (weight {:+.1}, reps {:+}); vary its stimulus",
                    issue.exercise_id, issue.sessions, issue.weight_delta, issue.reps_delta
                );
            }
            let _ = writeln!(out, "{}", weak.progression_narrative);
        }
    }

    if !analysis.recent_exercise_ids.is_empty() {
        out.push_str("\nRECENTLY TRAINED (avoid overusing):\n");
        let _ = writeln!(out, "{}", analysis.recent_exercise_ids.join(", "));
    }

    if let Some(request) = req.custom_request.map(str::trim).filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "\nUSER REQUEST:\n{}", request);
    }

    if let Some(previous) = req.previous {
        let ids: Vec<&str> = previous.exercises.iter().map(|e| e.id.as_str()).collect();
        let _ = writeln!(
            out,
            "\nPREVIOUS WORKOUT (the user asked for something different):\n\
             Do not fully repeat this exercise set: {}\n\
             Swap at least one exercise for a different allowed exercise.",
            ids.join(", ")
        );
    }

    out.push_str("\nALLOWED EXERCISES (id | name | category | primary muscles):\n");
    let candidates = strategy.candidate_exercises(req);
    if candidates.is_empty() && ctx.custom_exercises.is_empty() {
        out.push_str("(no catalog exercises match the current filters)\n");
    }
    for entry in &candidates {
        render_entry(&mut out, entry);
    }
    for entry in &ctx.custom_exercises {
        render_entry(&mut out, entry);
    }
    out.push_str("Use ONLY ids from this list.\n");

    out.push_str("\nPRIMARY LIFTS:\n");
    if strategy.waives_primary_lift() {
        let _ = writeln!(
            out,
            "Optional for this session. If equipment allows, one of: {}",
            PRIMARY_LIFTS.join(", ")
        );
    } else {
        let _ = writeln!(
            out,
            "REQUIRED. Include at least one of: {}. Place it within the first three exercises \
             and keep its reps between 3 and 6.",
            PRIMARY_LIFTS.join(", ")
        );
    }

    out.push_str("\nOUTPUT CONTRACT:\n");
    let _ = writeln!(
        out,
        "- Choose between {} and {} exercises, compound movements before isolation.",
        min_exercises, max_exercises
    );
    out.push_str(
        "- \"sets\" is a single integer. \"reps\" is a string holding one integer (\"5\"), never a range.\n",
    );
    let _ = writeln!(
        out,
        "- estimatedDuration = number of exercises x {} (for example {} exercises -> {}).",
        minutes,
        min_exercises + 1,
        (min_exercises as u32 + 1) * minutes
    );
    out.push_str(
        "- Respond with exactly one JSON object and nothing else:\n\
         {\"title\": string, \"description\": string, \
         \"exercises\": [{\"id\": string, \"sets\": integer, \"reps\": string}], \
         \"estimatedDuration\": integer, \"difficulty\": string}\n",
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_context;
    use crate::catalog::ExerciseLookup;
    use crate::{build_default_catalog, Catalog, PlannedExercise};
    use chrono::Utc;
    use uuid::Uuid;

    fn fixture(equipment: Vec<Equipment>) -> (Catalog, WorkoutContext) {
        (
            build_default_catalog(),
            WorkoutContext::new(Utc::now(), equipment),
        )
    }

    fn request<'a>(
        catalog: &'a Catalog,
        ctx: &'a WorkoutContext,
        analysis: &'a WorkoutAnalysis,
    ) -> PromptRequest<'a> {
        PromptRequest {
            context: ctx,
            analysis,
            catalog,
            custom_request: None,
            split: None,
            previous: None,
        }
    }

    #[test]
    fn test_strategy_lookup() {
        assert_eq!(strategy_for(None).name(), "competition");
        assert_eq!(strategy_for(Some(WorkoutType::Strength)).name(), "competition");
        assert_eq!(strategy_for(Some(WorkoutType::Calisthenics)).name(), "bodyweight");
        assert_eq!(strategy_for(Some(WorkoutType::Hypertrophy)).name(), "general");
    }

    #[test]
    fn test_contract_numbers_per_strategy() {
        assert_eq!(CompetitionStrategy.estimated_duration(5), 60);
        assert_eq!(BodyweightStrategy.estimated_duration(5), 50);
        assert_eq!(GeneralStrategy.estimated_duration(5), 55);
        assert!(BodyweightStrategy.validation_policy().max_exercises == 8);
        assert!(!BodyweightStrategy.validation_policy().require_primary_lift);
        assert!(CompetitionStrategy.validation_policy().require_primary_lift);
    }

    #[test]
    fn test_prompt_lists_only_allowed_ids() {
        let (catalog, ctx) = fixture(vec![Equipment::Barbell, Equipment::Bench]);
        let analysis = analyze_context(&ctx, &ExerciseLookup::catalog_only(&catalog), Some(Split::Push));
        let mut req = request(&catalog, &ctx, &analysis);
        req.split = Some(Split::Push);

        let prompt = CompetitionStrategy.build_prompt(&req);
        assert!(prompt.contains("- barbell_bench_press |"));
        assert!(!prompt.contains("- barbell_back_squat |"));
        assert!(!prompt.contains("- dumbbell_curl |"));
        assert!(prompt.contains("between 4 and 7 exercises"));
        assert!(prompt.contains("number of exercises x 12"));
    }

    #[test]
    fn test_bodyweight_strategy_ranks_bodyweight_first() {
        let (catalog, ctx) = fixture(vec![Equipment::Barbell, Equipment::Dumbbell]);
        let analysis = analyze_context(&ctx, &ExerciseLookup::catalog_only(&catalog), None);
        let req = request(&catalog, &ctx, &analysis);

        let candidates = BodyweightStrategy.candidate_exercises(&req);
        let first_non_bw = candidates
            .iter()
            .position(|e| !e.is_bodyweight_only())
            .unwrap();
        assert!(candidates[..first_non_bw].iter().all(|e| e.is_bodyweight_only()));
        assert!(candidates[first_non_bw..].iter().all(|e| !e.is_bodyweight_only()));
        // Muscle filtering is skipped: calves and biceps both appear.
        assert!(candidates.iter().any(|e| e.id == "standing_calf_raise"));
        assert!(candidates.iter().any(|e| e.id == "dumbbell_curl"));
    }

    #[test]
    fn test_regeneration_embeds_previous_ids() {
        let (catalog, ctx) = fixture(vec![Equipment::Barbell]);
        let analysis = analyze_context(&ctx, &ExerciseLookup::catalog_only(&catalog), None);
        let previous = GeneratedWorkout {
            id: Uuid::new_v4(),
            title: "Old".into(),
            description: String::new(),
            exercises: vec![
                PlannedExercise::new("barbell_back_squat", 4, 5),
                PlannedExercise::new("barbell_row", 3, 8),
            ],
            estimated_duration: 24,
            difficulty: "beginner".into(),
            created_at: Utc::now(),
        };
        let mut req = request(&catalog, &ctx, &analysis);
        req.previous = Some(&previous);
        req.custom_request = Some("  more hinge work ");

        let prompt = GeneralStrategy.build_prompt(&req);
        assert!(prompt.contains("Do not fully repeat this exercise set: barbell_back_squat, barbell_row"));
        assert!(prompt.contains("USER REQUEST:\nmore hinge work"));
    }

    #[test]
    fn test_empty_candidate_list_still_builds_prompt() {
        let catalog = Catalog::new(vec![]);
        let ctx = WorkoutContext::new(Utc::now(), vec![]);
        let analysis = analyze_context(&ctx, &ExerciseLookup::catalog_only(&catalog), None);
        let req = request(&catalog, &ctx, &analysis);

        let prompt = CompetitionStrategy.build_prompt(&req);
        assert!(prompt.contains("no catalog exercises match"));
        assert!(prompt.contains("OUTPUT CONTRACT"));
    }

    #[test]
    fn test_allowed_ids_respect_equipment_and_percentile() {
        let (catalog, mut ctx) = fixture(vec![Equipment::Dumbbell]);
        ctx.custom_exercises.push(CatalogEntry {
            id: "custom_sled_push".into(),
            name: "Sled Push".into(),
            category: ExerciseCategory::Compound,
            primary_muscles: vec![crate::MuscleGroup::Quadriceps],
            secondary_muscles: vec![],
            equipment: vec![Equipment::Machine],
            percentile_tier: 0,
        });
        let lookup = ExerciseLookup::new(&catalog, &ctx.custom_exercises);
        let analysis = analyze_context(&ctx, &lookup, Some(Split::Push));
        let req = PromptRequest {
            split: Some(Split::Push),
            ..request(&catalog, &ctx, &analysis)
        };

        let allowed = allowed_exercise_ids(&CompetitionStrategy, &req);
        assert!(allowed.contains("dumbbell_shoulder_press"));
        // Outside the push muscle filter but inside the gate
        assert!(allowed.contains("goblet_squat"));
        assert!(allowed.contains("custom_sled_push"));
        assert!(!allowed.contains("barbell_back_squat"));
        assert!(!allowed.contains("leg_press"));
        assert!(!allowed.contains("lat_pulldown"));
        // Tier 70 at the default percentile of 50
        assert!(!allowed.contains("pistol_squat"));
    }
}
