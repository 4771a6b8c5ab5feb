//! Public generation entry point.
//!
//! `analyze → select strategy → build prompt → retry loop → accept or
//! fallback`. Every error is absorbed here; callers always get a plan.

use crate::analysis::analyze_context;
use crate::catalog::{ExerciseCatalog, ExerciseLookup};
use crate::fallback::build_fallback_plan;
use crate::oracle::GenerationOracle;
use crate::prompt::{allowed_exercise_ids, strategy_for, PromptRequest};
use crate::retry::{CandidateJudge, RetryController, RetryState, DEFAULT_MAX_RETRIES};
use crate::validator::validate_plan;
use crate::{GeneratedWorkout, Split, ValidationResult, WorkoutContext};
use serde::Serialize;

/// Why the fallback planner produced the plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    OracleUnavailable,
    Exhausted,
}

/// Where the returned plan came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PlanOrigin {
    Oracle { attempts: u32 },
    Fallback { reason: FallbackReason },
}

/// A plan together with how it was produced
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub plan: GeneratedWorkout,
    pub origin: PlanOrigin,
    pub strategy: &'static str,
    pub validation: ValidationResult,
}

/// Orchestrates one generation call per request
pub struct WorkoutGenerator<'a> {
    catalog: &'a dyn ExerciseCatalog,
    oracle: Option<Box<dyn GenerationOracle>>,
    max_retries: u32,
}

impl<'a> WorkoutGenerator<'a> {
    /// A generator without an oracle; every plan comes from the fallback
    pub fn new(catalog: &'a dyn ExerciseCatalog) -> Self {
        Self {
            catalog,
            oracle: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_oracle(mut self, oracle: Box<dyn GenerationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Produce a plan for `ctx`
    ///
    /// `split` overrides the analyzer's recommendation. `previous` asks for
    /// a plan that differs from an earlier one.
    pub async fn generate_plan(
        &self,
        ctx: &WorkoutContext,
        custom_request: Option<&str>,
        split: Option<Split>,
        previous: Option<&GeneratedWorkout>,
    ) -> GeneratedWorkout {
        self.generate_plan_with_report(ctx, custom_request, split, previous)
            .await
            .plan
    }

    /// Same as [`WorkoutGenerator::generate_plan`], keeping the provenance
    pub async fn generate_plan_with_report(
        &self,
        ctx: &WorkoutContext,
        custom_request: Option<&str>,
        split: Option<Split>,
        previous: Option<&GeneratedWorkout>,
    ) -> GenerationReport {
        let lookup = ExerciseLookup::new(self.catalog, &ctx.custom_exercises);
        let analysis = analyze_context(ctx, &lookup, split);
        let strategy = strategy_for(ctx.filters.workout_type);
        let request = PromptRequest {
            context: ctx,
            analysis: &analysis,
            catalog: self.catalog,
            custom_request,
            split,
            previous,
        };
        let target_split = request.target_split();
        tracing::info!("Using {} strategy for {} split", strategy.name(), target_split);

        let reason = match &self.oracle {
            None => {
                tracing::info!("No generation oracle configured, using fallback planner");
                FallbackReason::OracleUnavailable
            }
            Some(oracle) => {
                let allowed = allowed_exercise_ids(strategy, &request);
                let judge = CandidateJudge {
                    strategy,
                    lookup,
                    previous,
                    allowed: Some(&allowed),
                    now: ctx.now,
                };
                let state = RetryController::new(strategy.build_prompt(&request), judge)
                    .with_max_retries(self.max_retries)
                    .run(oracle.as_ref())
                    .await;

                match state {
                    RetryState::Accepted {
                        plan,
                        validation,
                        attempts,
                    } => {
                        return GenerationReport {
                            plan,
                            origin: PlanOrigin::Oracle { attempts },
                            strategy: strategy.name(),
                            validation,
                        };
                    }
                    RetryState::Exhausted { .. } | RetryState::Attempt(_) => {
                        FallbackReason::Exhausted
                    }
                }
            }
        };

        let plan = build_fallback_plan(
            ctx,
            &analysis,
            self.catalog,
            target_split,
            previous,
            strategy,
        );
        let validation = validate_plan(&plan, &lookup, strategy.validation_policy());

        GenerationReport {
            plan,
            origin: PlanOrigin::Fallback { reason },
            strategy: strategy.name(),
            validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;
    use crate::oracle::{ScriptedOracle, ScriptedReply};
    use crate::{build_default_catalog, Equipment, WorkoutType};
    use chrono::Utc;
    use std::sync::Arc;

    const VALID_PLAN: &str = r#"{
        "title": "Squat and Press",
        "description": "Heavy compounds first",
        "exercises": [
            {"id": "barbell_back_squat", "sets": 4, "reps": "5"},
            {"id": "barbell_bench_press", "sets": 4, "reps": "5"},
            {"id": "barbell_row", "sets": 3, "reps": "8"},
            {"id": "romanian_deadlift", "sets": 3, "reps": "8"},
            {"id": "plank", "sets": 3, "reps": "12"}
        ],
        "estimatedDuration": 45,
        "difficulty": "intermediate"
    }"#;

    /// Lets a test keep a handle on the oracle after boxing it
    struct Shared(Arc<ScriptedOracle>);

    #[async_trait::async_trait]
    impl GenerationOracle for Shared {
        fn name(&self) -> &str {
            self.0.name()
        }

        async fn generate(&self, prompt: &str) -> crate::Result<String> {
            self.0.generate(prompt).await
        }
    }

    fn context() -> WorkoutContext {
        WorkoutContext::new(
            Utc::now(),
            vec![Equipment::Barbell, Equipment::Bench, Equipment::Dumbbell],
        )
    }

    #[tokio::test]
    async fn test_no_oracle_falls_back() {
        logging::init_test();
        let catalog = build_default_catalog();
        let generator = WorkoutGenerator::new(&catalog);
        assert!(!generator.has_oracle());

        let report = generator
            .generate_plan_with_report(&context(), None, None, None)
            .await;

        assert_eq!(
            report.origin,
            PlanOrigin::Fallback {
                reason: FallbackReason::OracleUnavailable
            }
        );
        assert!(report.validation.is_valid, "{:?}", report.validation);
        assert_eq!(report.strategy, "competition");
    }

    #[tokio::test]
    async fn test_three_malformed_replies_fall_back() {
        logging::init_test();
        let catalog = build_default_catalog();
        let oracle = Arc::new(ScriptedOracle::with_texts(["nope", "```\nnot json\n```", "{"]));
        let generator =
            WorkoutGenerator::new(&catalog).with_oracle(Box::new(Shared(oracle.clone())));

        let report = generator
            .generate_plan_with_report(&context(), None, None, None)
            .await;

        assert_eq!(oracle.calls(), 3);
        assert_eq!(
            report.origin,
            PlanOrigin::Fallback {
                reason: FallbackReason::Exhausted
            }
        );
        assert!(report.validation.is_valid);
        assert!(report.plan.exercises.len() >= 4);
    }

    #[tokio::test]
    async fn test_oracle_failures_then_valid_plan() {
        let catalog = build_default_catalog();
        let oracle = Arc::new(ScriptedOracle::new(vec![
            ScriptedReply::Failure("connection reset".into()),
            ScriptedReply::Text(format!("```json\n{}\n```", VALID_PLAN)),
        ]));
        let generator =
            WorkoutGenerator::new(&catalog).with_oracle(Box::new(Shared(oracle.clone())));

        let ctx = context();
        let report = generator
            .generate_plan_with_report(&ctx, Some("heavy day please"), None, None)
            .await;

        assert_eq!(report.origin, PlanOrigin::Oracle { attempts: 2 });
        assert_eq!(report.plan.title, "Squat and Press");
        assert_eq!(report.plan.estimated_duration, 60);
        assert_eq!(report.plan.created_at, ctx.now);
        assert!(oracle.prompts()[0].contains("heavy day please"));
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let catalog = build_default_catalog();
        let oracle = Arc::new(ScriptedOracle::with_texts(["bad", VALID_PLAN]));
        let generator = WorkoutGenerator::new(&catalog)
            .with_oracle(Box::new(Shared(oracle.clone())))
            .with_max_retries(0);

        let plan = generator.generate_plan(&context(), None, None, None).await;
        assert_eq!(oracle.calls(), 1);
        assert_ne!(plan.title, "Squat and Press");
    }

    #[tokio::test]
    async fn test_regeneration_rejects_identical_plan() {
        let catalog = build_default_catalog();
        let ctx = context();
        let first = WorkoutGenerator::new(&catalog)
            .with_oracle(Box::new(ScriptedOracle::with_texts([VALID_PLAN])))
            .generate_plan(&ctx, None, None, None)
            .await;
        assert_eq!(first.title, "Squat and Press");

        let oracle = Arc::new(ScriptedOracle::with_texts([VALID_PLAN, VALID_PLAN, VALID_PLAN]));
        let report = WorkoutGenerator::new(&catalog)
            .with_oracle(Box::new(Shared(oracle.clone())))
            .generate_plan_with_report(&ctx, None, None, Some(&first))
            .await;

        assert_eq!(oracle.calls(), 3);
        assert!(oracle.prompts()[0].contains("PREVIOUS WORKOUT"));
        assert!(matches!(report.origin, PlanOrigin::Fallback { .. }));
        assert_ne!(report.plan.exercise_ids(), first.exercise_ids());
    }

    #[tokio::test]
    async fn test_oversized_plans_fall_back() {
        let catalog = build_default_catalog();
        let oversized = r#"{"title": "Everything", "description": "",
            "exercises": [
                {"id": "barbell_back_squat", "sets": 3, "reps": "5"},
                {"id": "barbell_bench_press", "sets": 3, "reps": "5"},
                {"id": "conventional_deadlift", "sets": 2, "reps": "5"},
                {"id": "overhead_press", "sets": 2, "reps": "6"},
                {"id": "barbell_row", "sets": 2, "reps": "8"},
                {"id": "romanian_deadlift", "sets": 2, "reps": "8"},
                {"id": "goblet_squat", "sets": 2, "reps": "10"},
                {"id": "dumbbell_row", "sets": 2, "reps": "10"},
                {"id": "dumbbell_curl", "sets": 2, "reps": "12"},
                {"id": "plank", "sets": 2, "reps": "12"}
            ],
            "estimatedDuration": 90, "difficulty": "advanced"}"#;
        let oracle = Arc::new(ScriptedOracle::with_texts([oversized, oversized, oversized]));

        let report = WorkoutGenerator::new(&catalog)
            .with_oracle(Box::new(Shared(oracle.clone())))
            .generate_plan_with_report(&context(), None, None, None)
            .await;

        assert_eq!(oracle.calls(), 3);
        assert!(oracle.prompts()[1].contains("10 exercises exceeds the maximum of 7"));
        assert_eq!(
            report.origin,
            PlanOrigin::Fallback {
                reason: FallbackReason::Exhausted
            }
        );
        assert!((4..=7).contains(&report.plan.exercises.len()));
    }

    #[tokio::test]
    async fn test_plans_outside_equipment_and_strength_gate_fall_back() {
        let catalog = build_default_catalog();
        let ctx = WorkoutContext::new(Utc::now(), vec![Equipment::Dumbbell]);
        let ungated = r#"{"title": "Gym Day", "description": "",
            "exercises": [
                {"id": "barbell_back_squat", "sets": 4, "reps": "5"},
                {"id": "deficit_deadlift", "sets": 3, "reps": "5"},
                {"id": "leg_press", "sets": 3, "reps": "10"},
                {"id": "lat_pulldown", "sets": 3, "reps": "10"},
                {"id": "barbell_bench_press", "sets": 3, "reps": "5"}
            ],
            "estimatedDuration": 60, "difficulty": "advanced"}"#;
        let oracle = Arc::new(ScriptedOracle::with_texts([ungated, ungated, ungated]));

        let report = WorkoutGenerator::new(&catalog)
            .with_oracle(Box::new(Shared(oracle.clone())))
            .generate_plan_with_report(&ctx, None, None, None)
            .await;

        assert_eq!(oracle.calls(), 3);
        assert!(oracle.prompts()[1].contains("outside the allowed list"));
        assert!(matches!(report.origin, PlanOrigin::Fallback { .. }));
        for exercise in &report.plan.exercises {
            assert!(
                !["barbell_back_squat", "deficit_deadlift", "leg_press", "lat_pulldown"]
                    .contains(&exercise.id.as_str()),
                "{}",
                exercise.id
            );
        }
    }

    #[tokio::test]
    async fn test_bodyweight_filter_selects_bodyweight_strategy() {
        let catalog = build_default_catalog();
        let mut ctx = WorkoutContext::new(Utc::now(), vec![]);
        ctx.filters.workout_type = Some(WorkoutType::Bodyweight);

        let report = WorkoutGenerator::new(&catalog)
            .generate_plan_with_report(&ctx, None, Some(Split::FullBody), None)
            .await;

        assert_eq!(report.strategy, "bodyweight");
        assert!(report.validation.is_valid, "{:?}", report.validation);
        for exercise in &report.plan.exercises {
            let entry = catalog.get_by_id(&exercise.id).unwrap();
            assert!(entry.fits_equipment(&[]), "{}", entry.id);
        }
    }
}
