//! Bounded generate → validate → repair loop.
//!
//! The controller is a small state machine: `Attempt(n)` for
//! `n = 0..=max_retries`, ending in `Accepted` or `Exhausted`. Oracle call
//! failures, unparseable responses and rejected plans all consume one
//! attempt. The controller never returns an error; `Exhausted` hands
//! control to the fallback planner.

use crate::catalog::ExerciseLookup;
use crate::oracle::GenerationOracle;
use crate::prompt::PromptStrategy;
use crate::response::parse_candidate;
use crate::rules::PRIMARY_LIFTS;
use crate::validator::{validate_plan, MIN_EXERCISES};
use crate::{GeneratedWorkout, ValidationResult};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Retries after the first attempt (three tries in total)
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Controller state
#[derive(Clone, Debug, PartialEq)]
pub enum RetryState {
    /// About to run attempt `n` (zero based)
    Attempt(u32),
    Accepted {
        plan: GeneratedWorkout,
        validation: ValidationResult,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
    },
}

/// Result of one oracle round trip
#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    CallFailed(String),
    Malformed(String),
    Rejected {
        plan: GeneratedWorkout,
        validation: ValidationResult,
    },
    Passed {
        plan: GeneratedWorkout,
        validation: ValidationResult,
    },
}

impl AttemptOutcome {
    fn describe(&self) -> String {
        match self {
            AttemptOutcome::CallFailed(e) => format!("oracle call failed: {}", e),
            AttemptOutcome::Malformed(e) => format!("malformed response: {}", e),
            AttemptOutcome::Rejected { validation, .. } => format!(
                "rejected with score {} and {} critical issue(s)",
                validation.score,
                validation.critical_issues.len()
            ),
            AttemptOutcome::Passed { validation, .. } => {
                format!("passed with score {}", validation.score)
            }
        }
    }
}

/// Next state after attempt `n` produced `outcome`
pub fn transition(n: u32, max_retries: u32, outcome: AttemptOutcome) -> RetryState {
    match outcome {
        AttemptOutcome::Passed { plan, validation } => RetryState::Accepted {
            plan,
            validation,
            attempts: n + 1,
        },
        _ if n >= max_retries => RetryState::Exhausted { attempts: n + 1 },
        _ => RetryState::Attempt(n + 1),
    }
}

/// Turns raw oracle text into an [`AttemptOutcome`]
#[derive(Clone, Copy)]
pub struct CandidateJudge<'a> {
    pub strategy: &'a dyn PromptStrategy,
    pub lookup: ExerciseLookup<'a>,
    /// Plan the user asked to vary from
    pub previous: Option<&'a GeneratedWorkout>,
    /// Ids offered in the prompt; `None` accepts anything the lookup resolves
    pub allowed: Option<&'a HashSet<&'a str>>,
    pub now: DateTime<Utc>,
}

impl<'a> CandidateJudge<'a> {
    pub fn judge(&self, text: &str) -> AttemptOutcome {
        let plan = match parse_candidate(text, |n| self.strategy.estimated_duration(n), self.now)
        {
            Ok(plan) => plan,
            Err(e) => return AttemptOutcome::Malformed(e.to_string()),
        };

        let mut validation = validate_plan(&plan, &self.lookup, self.strategy.validation_policy());

        if let Some(allowed) = self.allowed {
            let outside: Vec<&str> = plan
                .exercises
                .iter()
                .map(|e| e.id.as_str())
                .filter(|id| self.lookup.get(id).is_some() && !allowed.contains(id))
                .collect();
            if !outside.is_empty() {
                validation.critical_issues.push(format!(
                    "Exercises outside the allowed list (equipment or strength level): {}",
                    outside.join(", ")
                ));
                validation.is_valid = false;
            }
        }

        if let Some(previous) = self.previous {
            if previous.exercise_ids() == plan.exercise_ids() {
                validation.critical_issues.push(
                    "Plan repeats the previous workout's exercise set; swap at least one exercise"
                        .to_string(),
                );
                validation.is_valid = false;
            }
        }

        if validation.is_valid {
            AttemptOutcome::Passed { plan, validation }
        } else {
            AttemptOutcome::Rejected { plan, validation }
        }
    }
}

/// Drives attempts against one oracle
pub struct RetryController<'a> {
    judge: CandidateJudge<'a>,
    base_prompt: String,
    max_retries: u32,
    last_feedback: Option<ValidationResult>,
}

impl<'a> RetryController<'a> {
    pub fn new(base_prompt: String, judge: CandidateJudge<'a>) -> Self {
        Self {
            judge,
            base_prompt,
            max_retries: DEFAULT_MAX_RETRIES,
            last_feedback: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Fresh prompt on attempt 0, feedback-augmented afterwards
    pub fn prompt_for_attempt(&self, n: u32) -> String {
        if n == 0 {
            return self.base_prompt.clone();
        }
        let mut prompt = self.base_prompt.clone();
        prompt.push('\n');
        prompt.push_str(&render_feedback(
            self.last_feedback.as_ref(),
            self.judge.strategy,
        ));
        prompt
    }

    fn record_feedback(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Rejected { validation, .. } => {
                self.last_feedback = Some(validation.clone());
            }
            AttemptOutcome::Malformed(message) => {
                self.last_feedback = Some(ValidationResult {
                    critical_issues: vec![format!(
                        "Response was not a single JSON plan object ({})",
                        message
                    )],
                    ..ValidationResult::default()
                });
            }
            // Nothing new to say; keep whatever the last readable attempt produced
            AttemptOutcome::CallFailed(_) | AttemptOutcome::Passed { .. } => {}
        }
    }

    /// Run attempts sequentially until accepted or exhausted
    pub async fn run(mut self, oracle: &dyn GenerationOracle) -> RetryState {
        let total = self.max_retries + 1;
        let mut state = RetryState::Attempt(0);

        while let RetryState::Attempt(n) = state {
            let prompt = self.prompt_for_attempt(n);
            tracing::info!("Attempt {}/{} via {} oracle", n + 1, total, oracle.name());

            let outcome = match oracle.generate(&prompt).await {
                Ok(text) => self.judge.judge(&text),
                Err(e) => AttemptOutcome::CallFailed(e.to_string()),
            };

            match &outcome {
                AttemptOutcome::Passed { .. } => {
                    tracing::info!("Attempt {}/{} {}", n + 1, total, outcome.describe())
                }
                _ => tracing::warn!("Attempt {}/{} {}", n + 1, total, outcome.describe()),
            }

            self.record_feedback(&outcome);
            state = transition(n, self.max_retries, outcome);
        }

        match &state {
            RetryState::Accepted { plan, attempts, .. } => {
                tracing::info!("Accepted \"{}\" after {} attempt(s)", plan.title, attempts)
            }
            RetryState::Exhausted { attempts } => {
                tracing::warn!("Oracle exhausted after {} attempt(s)", attempts)
            }
            RetryState::Attempt(_) => {}
        }

        state
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}:", heading);
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
}

/// Corrective block appended to the base prompt on retries
fn render_feedback(last: Option<&ValidationResult>, strategy: &dyn PromptStrategy) -> String {
    let mut out = String::from("PREVIOUS ATTEMPT WAS REJECTED. Fix every issue below and answer again.\n");

    if let Some(result) = last {
        push_list(&mut out, "Critical issues", &result.critical_issues);
        push_list(&mut out, "Feedback", &result.feedback);
        push_list(&mut out, "Suggestions", &result.suggestions);
    }

    let (min, max) = strategy.exercise_bounds();
    out.push_str("\nHARD RULES CHECKLIST:\n");
    if strategy.waives_primary_lift() {
        let _ = writeln!(
            out,
            "1. Primary lift: optional here, but only use ids from the allowed list."
        );
    } else {
        let _ = writeln!(
            out,
            "1. Primary lift: include at least one of {}.",
            PRIMARY_LIFTS.join(", ")
        );
    }
    let _ = writeln!(
        out,
        "2. Exercise count: at least {} and at most {} exercises.",
        MIN_EXERCISES.max(min),
        max
    );
    out.push_str(
        "3. Rep ranges: \"reps\" is one integer, never a range; primary lifts stay between 3 and 6 reps.\n",
    );
    out.push_str(
        "4. Compound priority: include compound movements and keep them at least as numerous as isolation work.\n",
    );
    out.push_str(
        "5. Structure: primary lift within the first three exercises, compounds before isolation.\n",
    );
    out
}
