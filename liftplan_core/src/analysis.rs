//! Context analysis: derives a training focus from the user's history.
//!
//! Without a chosen split the analyzer looks for the major muscle groups
//! that have gone longest without work and recommends a split. With a
//! chosen split it looks at the trailing 21 days for stalled exercises.

use crate::catalog::ExerciseLookup;
use crate::rules::{self, RECENT_SESSION_COUNT, WEAKNESS_WINDOW_DAYS};
use crate::{
    AnalysisFocus, AutoFocus, MuscleGroup, ProgressionIssue, Split, SplitWeaknesses,
    StrengthTier, WorkoutAnalysis, WorkoutContext, WorkoutSession,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Minimum staleness of a major group with no recorded training; it also
/// always ranks above the stalest trained group
const NEVER_TRAINED_DAYS: i64 = 60;

/// Groups trained at least this long ago are reported as gaps
const GAP_THRESHOLD_DAYS: i64 = 4;

/// Analyze a context for one generation call
///
/// Exactly one of the two focus branches is populated. Empty history
/// produces empty gap/weakness lists, never an error.
pub fn analyze_context(
    ctx: &WorkoutContext,
    lookup: &ExerciseLookup<'_>,
    chosen_split: Option<Split>,
) -> WorkoutAnalysis {
    let sessions = sorted_newest_first(&ctx.history);
    let recent_exercise_ids = recent_exercise_ids(&sessions);
    let overall_percentile = rules::average_percentile(&ctx.progress);
    let strength_tier = StrengthTier::from_percentile(overall_percentile)
        .label()
        .to_string();

    let focus = match chosen_split {
        None => AnalysisFocus::AutoFocus(auto_focus(&sessions, lookup, ctx.now)),
        Some(split) => {
            AnalysisFocus::SplitWeaknesses(split_weaknesses(&sessions, lookup, split, ctx.now))
        }
    };

    let analysis = WorkoutAnalysis {
        recent_exercise_ids,
        overall_percentile,
        strength_tier,
        focus,
    };

    tracing::info!(
        "Analyzed {} sessions: split {}, percentile {:.1} ({})",
        sessions.len(),
        analysis.split(),
        analysis.overall_percentile,
        analysis.strength_tier
    );

    analysis
}

fn sorted_newest_first(history: &[WorkoutSession]) -> Vec<&WorkoutSession> {
    let mut sessions: Vec<_> = history.iter().collect();
    sessions.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
    sessions
}

/// Exercise ids of the last sessions, verbatim
fn recent_exercise_ids(sessions: &[&WorkoutSession]) -> Vec<String> {
    sessions
        .iter()
        .take(RECENT_SESSION_COUNT)
        .flat_map(|s| s.exercises.iter().map(|e| e.exercise_id.clone()))
        .collect()
}

/// Most recent date each major muscle group was trained as a primary mover
fn last_trained(
    sessions: &[&WorkoutSession],
    lookup: &ExerciseLookup<'_>,
) -> BTreeMap<MuscleGroup, DateTime<Utc>> {
    let mut last = BTreeMap::new();
    for session in sessions {
        for logged in &session.exercises {
            let Some(entry) = lookup.get(&logged.exercise_id) else {
                tracing::debug!("Ignoring unknown exercise '{}' in history", logged.exercise_id);
                continue;
            };
            for muscle in &entry.primary_muscles {
                last.entry(*muscle)
                    .and_modify(|d: &mut DateTime<Utc>| {
                        if session.performed_at > *d {
                            *d = session.performed_at;
                        }
                    })
                    .or_insert(session.performed_at);
            }
        }
    }
    last
}

fn auto_focus(
    sessions: &[&WorkoutSession],
    lookup: &ExerciseLookup<'_>,
    now: DateTime<Utc>,
) -> AutoFocus {
    if sessions.is_empty() {
        return AutoFocus {
            recommended_split: Split::FullBody,
            reasoning: "No training history yet; starting with a balanced full-body session."
                .to_string(),
            muscle_gaps: Vec::new(),
        };
    }

    let last = last_trained(sessions, lookup);
    let days_since = |d: &DateTime<Utc>| (now - *d).num_days().max(0);
    let never_trained = last
        .values()
        .map(days_since)
        .max()
        .map_or(NEVER_TRAINED_DAYS, |stalest| (stalest + 1).max(NEVER_TRAINED_DAYS));
    let staleness = |muscle: &MuscleGroup| -> i64 {
        last.get(muscle).map(days_since).unwrap_or(never_trained)
    };

    let mut majors: Vec<(MuscleGroup, i64)> =
        MuscleGroup::MAJOR.iter().map(|m| (*m, staleness(m))).collect();
    majors.sort_by(|a, b| b.1.cmp(&a.1));

    let muscle_gaps = majors
        .iter()
        .filter(|(_, days)| *days >= GAP_THRESHOLD_DAYS)
        .map(|(muscle, days)| match last.get(muscle) {
            Some(_) => format!("{}: not trained in {} days", muscle, days),
            None => format!("{}: no recorded training", muscle),
        })
        .collect();

    // Mean staleness of each split's major targets; first maximum wins.
    let mut best: Option<(Split, f64, Vec<MuscleGroup>)> = None;
    for split in Split::ALL {
        let targets: Vec<MuscleGroup> = split
            .target_muscles()
            .iter()
            .copied()
            .filter(|m| MuscleGroup::MAJOR.contains(m))
            .collect();
        if targets.is_empty() {
            continue;
        }
        let mean = targets.iter().map(|m| staleness(m) as f64).sum::<f64>() / targets.len() as f64;
        if best.as_ref().map_or(true, |(_, b, _)| mean > *b) {
            best = Some((split, mean, targets));
        }
    }

    let (recommended_split, mean, targets) =
        best.unwrap_or((Split::FullBody, 0.0, MuscleGroup::MAJOR.to_vec()));
    let names: Vec<&str> = targets.iter().map(|m| m.as_str()).collect();

    AutoFocus {
        recommended_split,
        reasoning: format!(
            "{} has gone longest without training (average {:.1} days across {}).",
            recommended_split,
            mean,
            names.join(", ")
        ),
        muscle_gaps,
    }
}

/// Top weight and best reps of one exercise in one session
struct TrendPoint {
    weight: f64,
    reps: u32,
}

fn split_weaknesses(
    sessions: &[&WorkoutSession],
    lookup: &ExerciseLookup<'_>,
    split: Split,
    now: DateTime<Utc>,
) -> SplitWeaknesses {
    let targets = split.target_muscles();
    let cutoff = now - Duration::days(WEAKNESS_WINDOW_DAYS);

    // Oldest first so deltas read last - first.
    let window: Vec<&WorkoutSession> = sessions
        .iter()
        .rev()
        .filter(|s| s.performed_at >= cutoff && s.performed_at <= now)
        .copied()
        .collect();

    if window.is_empty() {
        return SplitWeaknesses {
            split,
            weak_areas: Vec::new(),
            progression_narrative: format!(
                "No sessions in the last {} days to assess the {} split.",
                WEAKNESS_WINDOW_DAYS, split
            ),
            progression_issues: Vec::new(),
        };
    }

    let mut trends: BTreeMap<&str, Vec<TrendPoint>> = BTreeMap::new();
    let mut trained: Vec<MuscleGroup> = Vec::new();

    for session in &window {
        for logged in &session.exercises {
            let Some(entry) = lookup.get(&logged.exercise_id) else {
                continue;
            };
            if !entry.targets_any(targets) || logged.sets.is_empty() {
                continue;
            }
            trained.extend(entry.primary_muscles.iter().copied());
            let weight = logged.sets.iter().map(|s| s.weight).fold(0.0, f64::max);
            let reps = logged.sets.iter().map(|s| s.reps).max().unwrap_or(0);
            trends
                .entry(logged.exercise_id.as_str())
                .or_default()
                .push(TrendPoint { weight, reps });
        }
    }

    let mut progression_issues = Vec::new();
    let mut narrative = Vec::new();

    for (exercise_id, points) in &trends {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            continue;
        };
        let weight_delta = last.weight - first.weight;
        let reps_delta = i64::from(last.reps) - i64::from(first.reps);

        narrative.push(format!(
            "{}: {} sessions, weight {:+.1}, reps {:+}",
            exercise_id,
            points.len(),
            weight_delta,
            reps_delta
        ));

        if points.len() >= 2 && weight_delta <= 0.0 && reps_delta <= 0 {
            progression_issues.push(ProgressionIssue {
                exercise_id: exercise_id.to_string(),
                sessions: points.len(),
                weight_delta,
                reps_delta,
            });
        }
    }

    let mut weak_areas: Vec<String> = targets
        .iter()
        .filter(|m| !trained.contains(m))
        .map(|m| format!("{}: no work in the last {} days", m, WEAKNESS_WINDOW_DAYS))
        .collect();

    for issue in &progression_issues {
        if let Some(entry) = lookup.get(&issue.exercise_id) {
            for muscle in entry.primary_muscles.iter().filter(|m| targets.contains(m)) {
                weak_areas.push(format!("{}: stalled on {}", muscle, entry.name));
            }
        }
    }

    let progression_narrative = if narrative.is_empty() {
        format!(
            "No {} exercises logged in the last {} days.",
            split, WEAKNESS_WINDOW_DAYS
        )
    } else {
        format!(
            "{}-day trend for the {} split:\n{}",
            WEAKNESS_WINDOW_DAYS,
            split,
            narrative.join("\n")
        )
    };

    SplitWeaknesses {
        split,
        weak_areas,
        progression_narrative,
        progression_issues,
    }
}
