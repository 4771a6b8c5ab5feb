//! Exercise catalog: the query interface the generator consumes and the
//! built-in default catalog.

use crate::rules::{PRIMARY_LIFTS, SECONDARY_PRIORITY};
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

/// Read-only query interface over a set of exercises
pub trait ExerciseCatalog: Send + Sync {
    /// All entries in stable catalog order
    fn entries(&self) -> &[CatalogEntry];

    fn get_by_id(&self, id: &str) -> Option<&CatalogEntry>;

    /// Entries visible at `percentile` that fit `equipment`, optionally
    /// restricted to entries whose primary muscles hit `muscle_filter`.
    fn list_by_percentile_and_equipment(
        &self,
        percentile: f64,
        equipment: &[Equipment],
        muscle_filter: Option<&[MuscleGroup]>,
    ) -> Vec<&CatalogEntry> {
        self.entries()
            .iter()
            .filter(|e| f64::from(e.percentile_tier) <= percentile)
            .filter(|e| e.fits_equipment(equipment))
            .filter(|e| muscle_filter.map_or(true, |m| e.targets_any(m)))
            .collect()
    }
}

/// An ordered, id-indexed exercise collection
#[derive(Clone, Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog; later duplicates of an id are kept in `entries` but
    /// are unreachable by id and reported by [`Catalog::validate`].
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            index.entry(entry.id.clone()).or_insert(i);
        }
        Self { entries, index }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for entry in &self.entries {
            if entry.id.is_empty() {
                errors.push("Catalog entry has empty ID".to_string());
            }
            if !seen.insert(entry.id.as_str()) {
                errors.push(format!("Duplicate catalog id '{}'", entry.id));
            }
            if entry.name.is_empty() {
                errors.push(format!("Entry '{}' has empty name", entry.id));
            }
            if entry.primary_muscles.is_empty() {
                errors.push(format!("Entry '{}' has no primary muscles", entry.id));
            }
            if entry.equipment.is_empty() {
                errors.push(format!("Entry '{}' lists no equipment", entry.id));
            }
            if entry.percentile_tier > 100 {
                errors.push(format!(
                    "Entry '{}': percentile tier {} > 100",
                    entry.id, entry.percentile_tier
                ));
            }
        }

        for id in PRIMARY_LIFTS.iter().chain(SECONDARY_PRIORITY) {
            match self.get_by_id(id) {
                None => errors.push(format!("Priority exercise '{}' missing from catalog", id)),
                Some(e) if e.category != ExerciseCategory::Compound => {
                    errors.push(format!("Priority exercise '{}' is not a compound", id))
                }
                Some(_) => {}
            }
        }

        for category in [ExerciseCategory::Compound, ExerciseCategory::Isolation] {
            if !self.entries.iter().any(|e| e.category == category) {
                errors.push(format!("Catalog has no {:?} exercises", category));
            }
        }

        errors
    }
}

impl ExerciseCatalog for Catalog {
    fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    fn get_by_id(&self, id: &str) -> Option<&CatalogEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }
}

/// Id resolution over the catalog plus the user's custom exercises
#[derive(Clone, Copy)]
pub struct ExerciseLookup<'a> {
    catalog: &'a dyn ExerciseCatalog,
    custom: &'a [CatalogEntry],
}

impl<'a> ExerciseLookup<'a> {
    pub fn new(catalog: &'a dyn ExerciseCatalog, custom: &'a [CatalogEntry]) -> Self {
        Self { catalog, custom }
    }

    pub fn catalog_only(catalog: &'a dyn ExerciseCatalog) -> Self {
        Self { catalog, custom: &[] }
    }

    pub fn get(&self, id: &str) -> Option<&'a CatalogEntry> {
        self.catalog
            .get_by_id(id)
            .or_else(|| self.custom.iter().find(|c| c.id == id))
    }

    pub fn custom(&self) -> &'a [CatalogEntry] {
        self.custom
    }
}

/// Percentile → equipment → muscle gating for a context, honouring the
/// exclude-bodyweight preference.
pub fn filter_for_context<'c>(
    catalog: &'c dyn ExerciseCatalog,
    ctx: &WorkoutContext,
    percentile: f64,
    muscles: Option<&[MuscleGroup]>,
) -> Vec<&'c CatalogEntry> {
    catalog
        .list_by_percentile_and_equipment(percentile, ctx.effective_equipment(), muscles)
        .into_iter()
        .filter(|e| !(ctx.preferences.exclude_bodyweight && e.is_bodyweight_only()))
        .collect()
}

fn entry(
    id: &str,
    name: &str,
    category: ExerciseCategory,
    primary: &[MuscleGroup],
    secondary: &[MuscleGroup],
    equipment: &[Equipment],
    percentile_tier: u8,
) -> CatalogEntry {
    CatalogEntry {
        id: id.into(),
        name: name.into(),
        category,
        primary_muscles: primary.to_vec(),
        secondary_muscles: secondary.to_vec(),
        equipment: equipment.to_vec(),
        percentile_tier,
    }
}

/// Internal function that actually builds the catalog
fn build_default_catalog_internal() -> Catalog {
    use Equipment::*;
    use ExerciseCategory::*;
    use MuscleGroup::*;

    let entries = vec![
        // ====================================================================
        // Primary lifts
        // ====================================================================
        entry(
            "barbell_back_squat",
            "Barbell Back Squat",
            Compound,
            &[Quadriceps, Glutes],
            &[Hamstrings, Core],
            &[Barbell],
            0,
        ),
        entry(
            "barbell_bench_press",
            "Barbell Bench Press",
            Compound,
            &[Chest],
            &[Triceps, Shoulders],
            &[Barbell, Bench],
            0,
        ),
        entry(
            "conventional_deadlift",
            "Conventional Deadlift",
            Compound,
            &[Hamstrings, Glutes, Back],
            &[Core],
            &[Barbell],
            0,
        ),
        entry(
            "overhead_press",
            "Overhead Press",
            Compound,
            &[Shoulders],
            &[Triceps, Core],
            &[Barbell],
            0,
        ),
        entry(
            "front_squat",
            "Front Squat",
            Compound,
            &[Quadriceps],
            &[Glutes, Core],
            &[Barbell],
            40,
        ),
        entry(
            "sumo_deadlift",
            "Sumo Deadlift",
            Compound,
            &[Glutes, Hamstrings, Back],
            &[Quadriceps],
            &[Barbell],
            30,
        ),
        // ====================================================================
        // Secondary compounds
        // ====================================================================
        entry(
            "barbell_row",
            "Barbell Row",
            Compound,
            &[Back],
            &[Biceps],
            &[Barbell],
            0,
        ),
        entry(
            "romanian_deadlift",
            "Romanian Deadlift",
            Compound,
            &[Hamstrings, Glutes],
            &[Back],
            &[Barbell],
            20,
        ),
        entry(
            "pull_up",
            "Pull-up",
            Compound,
            &[Back],
            &[Biceps],
            &[PullupBar],
            30,
        ),
        entry(
            "incline_bench_press",
            "Incline Bench Press",
            Compound,
            &[Chest, Shoulders],
            &[Triceps],
            &[Barbell, Bench],
            25,
        ),
        entry(
            "parallel_dip",
            "Parallel Bar Dip",
            Compound,
            &[Chest, Triceps],
            &[Shoulders],
            &[Bodyweight],
            35,
        ),
        entry(
            "dumbbell_bench_press",
            "Dumbbell Bench Press",
            Compound,
            &[Chest],
            &[Triceps, Shoulders],
            &[Dumbbell, Bench],
            0,
        ),
        entry(
            "goblet_squat",
            "Goblet Squat",
            Compound,
            &[Quadriceps, Glutes],
            &[Core],
            &[Dumbbell],
            0,
        ),
        entry(
            "walking_lunge",
            "Walking Lunge",
            Compound,
            &[Quadriceps, Glutes],
            &[Hamstrings],
            &[Bodyweight],
            0,
        ),
        entry(
            "kettlebell_swing",
            "Kettlebell Swing",
            Compound,
            &[Glutes, Hamstrings],
            &[Core, Back],
            &[Kettlebell],
            0,
        ),
        entry(
            "push_up",
            "Push-up",
            Compound,
            &[Chest],
            &[Triceps, Shoulders],
            &[Bodyweight],
            0,
        ),
        // ====================================================================
        // Other compounds
        // ====================================================================
        entry(
            "chin_up",
            "Chin-up",
            Compound,
            &[Back, Biceps],
            &[],
            &[PullupBar],
            20,
        ),
        entry(
            "inverted_row",
            "Inverted Row",
            Compound,
            &[Back],
            &[Biceps],
            &[Bodyweight],
            0,
        ),
        entry(
            "bodyweight_squat",
            "Bodyweight Squat",
            Compound,
            &[Quadriceps, Glutes],
            &[],
            &[Bodyweight],
            0,
        ),
        entry(
            "pike_push_up",
            "Pike Push-up",
            Compound,
            &[Shoulders],
            &[Triceps],
            &[Bodyweight],
            20,
        ),
        entry(
            "pistol_squat",
            "Pistol Squat",
            Compound,
            &[Quadriceps],
            &[Glutes, Core],
            &[Bodyweight],
            70,
        ),
        entry(
            "dumbbell_row",
            "One-arm Dumbbell Row",
            Compound,
            &[Back],
            &[Biceps],
            &[Dumbbell],
            0,
        ),
        entry(
            "dumbbell_shoulder_press",
            "Dumbbell Shoulder Press",
            Compound,
            &[Shoulders],
            &[Triceps],
            &[Dumbbell],
            0,
        ),
        entry(
            "kettlebell_clean_and_press",
            "Kettlebell Clean and Press",
            Compound,
            &[Shoulders, Glutes],
            &[Core],
            &[Kettlebell],
            40,
        ),
        entry(
            "hip_thrust",
            "Barbell Hip Thrust",
            Compound,
            &[Glutes],
            &[Hamstrings],
            &[Barbell, Bench],
            20,
        ),
        entry(
            "leg_press",
            "Leg Press",
            Compound,
            &[Quadriceps],
            &[Glutes],
            &[Machine],
            0,
        ),
        entry(
            "lat_pulldown",
            "Lat Pulldown",
            Compound,
            &[Back],
            &[Biceps],
            &[Cable],
            0,
        ),
        entry(
            "seated_cable_row",
            "Seated Cable Row",
            Compound,
            &[Back],
            &[Biceps],
            &[Cable],
            0,
        ),
        entry(
            "close_grip_bench_press",
            "Close-grip Bench Press",
            Compound,
            &[Triceps, Chest],
            &[Shoulders],
            &[Barbell, Bench],
            40,
        ),
        entry(
            "pause_squat",
            "Pause Squat",
            Compound,
            &[Quadriceps],
            &[Glutes, Core],
            &[Barbell],
            60,
        ),
        entry(
            "deficit_deadlift",
            "Deficit Deadlift",
            Compound,
            &[Hamstrings, Back],
            &[Glutes],
            &[Barbell],
            75,
        ),
        // ====================================================================
        // Isolation
        // ====================================================================
        entry(
            "barbell_curl",
            "Barbell Curl",
            Isolation,
            &[Biceps],
            &[],
            &[Barbell],
            0,
        ),
        entry(
            "dumbbell_curl",
            "Dumbbell Curl",
            Isolation,
            &[Biceps],
            &[],
            &[Dumbbell],
            0,
        ),
        entry(
            "hammer_curl",
            "Hammer Curl",
            Isolation,
            &[Biceps],
            &[],
            &[Dumbbell],
            10,
        ),
        entry(
            "skull_crusher",
            "Skull Crusher",
            Isolation,
            &[Triceps],
            &[],
            &[Barbell, Bench],
            30,
        ),
        entry(
            "triceps_pushdown",
            "Triceps Pushdown",
            Isolation,
            &[Triceps],
            &[],
            &[Cable],
            0,
        ),
        entry(
            "diamond_push_up",
            "Diamond Push-up",
            Isolation,
            &[Triceps],
            &[Chest],
            &[Bodyweight],
            20,
        ),
        entry(
            "lateral_raise",
            "Lateral Raise",
            Isolation,
            &[Shoulders],
            &[],
            &[Dumbbell],
            0,
        ),
        entry(
            "face_pull",
            "Face Pull",
            Isolation,
            &[Shoulders, Back],
            &[],
            &[Cable],
            0,
        ),
        entry(
            "band_pull_apart",
            "Band Pull-apart",
            Isolation,
            &[Shoulders],
            &[Back],
            &[Bands],
            0,
        ),
        entry(
            "dumbbell_fly",
            "Dumbbell Fly",
            Isolation,
            &[Chest],
            &[],
            &[Dumbbell, Bench],
            10,
        ),
        entry(
            "barbell_shrug",
            "Barbell Shrug",
            Isolation,
            &[Back],
            &[],
            &[Barbell],
            10,
        ),
        entry(
            "leg_extension",
            "Leg Extension",
            Isolation,
            &[Quadriceps],
            &[],
            &[Machine],
            0,
        ),
        entry(
            "leg_curl",
            "Lying Leg Curl",
            Isolation,
            &[Hamstrings],
            &[],
            &[Machine],
            0,
        ),
        entry(
            "nordic_curl",
            "Nordic Hamstring Curl",
            Isolation,
            &[Hamstrings],
            &[],
            &[Bodyweight],
            60,
        ),
        entry(
            "glute_bridge",
            "Glute Bridge",
            Isolation,
            &[Glutes],
            &[Hamstrings],
            &[Bodyweight],
            0,
        ),
        entry(
            "standing_calf_raise",
            "Standing Calf Raise",
            Isolation,
            &[Calves],
            &[],
            &[Bodyweight],
            0,
        ),
        entry(
            "plank",
            "Plank",
            Isolation,
            &[Core],
            &[],
            &[Bodyweight],
            0,
        ),
        entry(
            "hanging_leg_raise",
            "Hanging Leg Raise",
            Isolation,
            &[Core],
            &[],
            &[PullupBar],
            30,
        ),
        // ====================================================================
        // Conditioning and mobility
        // ====================================================================
        entry(
            "burpee",
            "Burpee",
            Cardio,
            &[Quadriceps, Chest],
            &[Core],
            &[Bodyweight],
            0,
        ),
        entry(
            "rowing_machine",
            "Rowing Machine",
            Cardio,
            &[Back, Quadriceps],
            &[],
            &[Machine],
            0,
        ),
        entry(
            "hip_cars",
            "Hip CARs",
            Flexibility,
            &[Glutes],
            &[],
            &[Bodyweight],
            0,
        ),
        entry(
            "shoulder_cars",
            "Shoulder CARs",
            Flexibility,
            &[Shoulders],
            &[],
            &[Bodyweight],
            0,
        ),
    ];

    Catalog::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_cached_catalog_matches_built() {
        assert_eq!(get_default_catalog().len(), build_default_catalog().len());
    }

    #[test]
    fn test_get_by_id() {
        let catalog = build_default_catalog();
        let squat = catalog.get_by_id("barbell_back_squat").unwrap();
        assert_eq!(squat.category, ExerciseCategory::Compound);
        assert!(catalog.get_by_id("underwater_basket_weaving").is_none());
    }

    #[test]
    fn test_percentile_gating() {
        let catalog = build_default_catalog();
        let low = catalog.list_by_percentile_and_equipment(10.0, &[Equipment::Barbell], None);
        assert!(low.iter().all(|e| e.percentile_tier <= 10));
        assert!(!low.iter().any(|e| e.id == "front_squat"));

        let high = catalog.list_by_percentile_and_equipment(100.0, &[Equipment::Barbell], None);
        assert!(high.iter().any(|e| e.id == "deficit_deadlift"));
    }

    #[test]
    fn test_equipment_gating_always_allows_bodyweight() {
        let catalog = build_default_catalog();
        let entries = catalog.list_by_percentile_and_equipment(100.0, &[], None);
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.is_bodyweight_only()));
    }

    #[test]
    fn test_muscle_filter() {
        let catalog = build_default_catalog();
        let entries = catalog.list_by_percentile_and_equipment(
            100.0,
            &[Equipment::Barbell, Equipment::Bench],
            Some(&[MuscleGroup::Chest]),
        );
        assert!(entries.iter().any(|e| e.id == "barbell_bench_press"));
        assert!(!entries.iter().any(|e| e.id == "barbell_back_squat"));
    }

    #[test]
    fn test_duplicate_ids_reported() {
        let mut entries = build_default_catalog().entries().to_vec();
        entries.push(entries[0].clone());
        let catalog = Catalog::new(entries);
        assert!(catalog
            .validate()
            .iter()
            .any(|e| e.contains("Duplicate catalog id")));
    }

    #[test]
    fn test_lookup_resolves_custom_exercises() {
        let catalog = build_default_catalog();
        let custom = vec![CatalogEntry {
            id: "custom_sled_push".into(),
            name: "Sled Push".into(),
            category: ExerciseCategory::Compound,
            primary_muscles: vec![MuscleGroup::Quadriceps],
            secondary_muscles: vec![],
            equipment: vec![Equipment::Bodyweight],
            percentile_tier: 0,
        }];
        let lookup = ExerciseLookup::new(&catalog, &custom);
        assert!(lookup.get("custom_sled_push").is_some());
        assert!(lookup.get("barbell_row").is_some());
        assert!(ExerciseLookup::catalog_only(&catalog)
            .get("custom_sled_push")
            .is_none());
    }

    #[test]
    fn test_filter_for_context_excludes_bodyweight() {
        let catalog = build_default_catalog();
        let mut ctx = WorkoutContext::new(chrono::Utc::now(), vec![Equipment::Barbell]);
        ctx.preferences.exclude_bodyweight = true;
        let entries = filter_for_context(&catalog, &ctx, 100.0, None);
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| !e.is_bodyweight_only()));
    }
}
