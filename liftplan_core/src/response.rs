//! Parsing of oracle responses into candidate plans.

use crate::{Error, GeneratedWorkout, PlannedExercise, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Plan shape the oracle is asked to emit
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    title: String,
    #[serde(default)]
    description: String,
    exercises: Vec<RawExercise>,
    #[serde(default)]
    estimated_duration: Option<u32>,
    #[serde(default)]
    difficulty: String,
}

#[derive(Debug, Deserialize)]
struct RawExercise {
    id: String,
    sets: u32,
    reps: RepTarget,
}

/// Models sometimes emit `"reps": 8` instead of `"reps": "8"`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RepTarget {
    Text(String),
    Count(u32),
}

impl From<RepTarget> for String {
    fn from(reps: RepTarget) -> Self {
        match reps {
            RepTarget::Text(s) => s.trim().to_string(),
            RepTarget::Count(n) => n.to_string(),
        }
    }
}

/// Locate the JSON object in free text.
///
/// Tries, in order: the whole text, the body of a markdown fence, and the
/// span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip an info string such as `json` up to the end of the line
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') && inner.ends_with('}') {
                return Some(inner);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end).then(|| &trimmed[start..=end])
}

/// Parse oracle text into a candidate plan.
///
/// The plan gets a fresh id, `created_at`, empty completion state, and the
/// supplied `estimated_duration` (the strategy formula) in place of the
/// oracle's own figure.
pub fn parse_candidate(
    text: &str,
    estimated_duration: impl Fn(usize) -> u32,
    created_at: DateTime<Utc>,
) -> Result<GeneratedWorkout> {
    let json = extract_json(text).ok_or_else(|| {
        Error::MalformedResponse(format!(
            "no JSON object found in response ({} chars)",
            text.len()
        ))
    })?;

    let raw: RawPlan = serde_json::from_str(json)
        .map_err(|e| Error::MalformedResponse(format!("plan does not match schema: {}", e)))?;

    if let Some(reported) = raw.estimated_duration {
        tracing::debug!("Oracle reported estimatedDuration {}", reported);
    }

    let exercises: Vec<PlannedExercise> = raw
        .exercises
        .into_iter()
        .map(|e| PlannedExercise {
            id: e.id.trim().to_string(),
            sets: e.sets,
            reps: e.reps.into(),
            completed_sets: Vec::new(),
            completed: false,
        })
        .collect();

    Ok(GeneratedWorkout {
        id: Uuid::new_v4(),
        title: raw.title,
        description: raw.description,
        estimated_duration: estimated_duration(exercises.len()),
        exercises,
        difficulty: raw.difficulty,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "title": "Heavy Lower",
        "description": "Squat focus",
        "exercises": [
            {"id": "barbell_back_squat", "sets": 4, "reps": "5"},
            {"id": "romanian_deadlift", "sets": 3, "reps": 8}
        ],
        "estimatedDuration": 999,
        "difficulty": "intermediate"
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let now = Utc::now();
        let plan = parse_candidate(PLAN, |n| n as u32 * 12, now).unwrap();
        assert_eq!(plan.title, "Heavy Lower");
        assert_eq!(plan.exercises.len(), 2);
        assert_eq!(plan.exercises[1].reps, "8");
        assert_eq!(plan.estimated_duration, 24);
        assert_eq!(plan.created_at, now);
        assert!(plan.exercises.iter().all(|e| !e.completed && e.completed_sets.is_empty()));
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = format!("Here is your plan:\n```json\n{}\n```\nEnjoy!", PLAN);
        let plan = parse_candidate(&text, |n| n as u32 * 10, Utc::now()).unwrap();
        assert_eq!(plan.estimated_duration, 20);
    }

    #[test]
    fn test_parse_bare_fence() {
        let text = format!("```\n{}\n```", PLAN);
        assert!(parse_candidate(&text, |n| n as u32, Utc::now()).is_ok());
    }

    #[test]
    fn test_parse_embedded_json() {
        let text = format!("Sure! {} Let me know.", PLAN);
        assert!(parse_candidate(&text, |n| n as u32, Utc::now()).is_ok());
    }

    #[test]
    fn test_malformed_responses() {
        for text in [
            "I cannot help with that.",
            "{ \"title\": \"x\", \"exercises\": [ }",
            "{\"title\": \"x\"}",
            "{\"title\": \"x\", \"exercises\": [{\"id\": \"a\", \"sets\": \"three\", \"reps\": \"5\"}]}",
        ] {
            let err = parse_candidate(text, |n| n as u32, Utc::now()).unwrap_err();
            assert!(matches!(err, Error::MalformedResponse(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_range_reps_survive_parsing() {
        // Ranges are the validator's job, not the parser's.
        let text = r#"{"title": "t", "exercises": [{"id": "a", "sets": 3, "reps": "8-10"}]}"#;
        let plan = parse_candidate(text, |n| n as u32, Utc::now()).unwrap();
        assert_eq!(plan.exercises[0].reps, "8-10");
    }
}
