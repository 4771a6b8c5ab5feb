//! Training history loading.
//!
//! Sessions come from a JSON-lines log (one `WorkoutSession` per line) and
//! from a CSV archive holding one row per logged set. Sessions present in
//! both are taken from the log.

use crate::{LoggedExercise, LoggedSet, Result, WorkoutSession};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use fs2::FileExt;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use uuid::Uuid;

pub const HISTORY_JSONL: &str = "sessions.jsonl";
pub const HISTORY_CSV: &str = "sessions.csv";

/// CSV row format: one logged set
#[derive(Debug, Deserialize)]
struct CsvRow {
    session_id: String,
    performed_at: String,
    exercise_id: String,
    weight: f64,
    reps: u32,
}

/// Load every session from both sources
///
/// Returns sessions sorted by performed_at (newest first), deduplicated by
/// session id. Missing files are treated as empty.
pub fn load_history(jsonl_path: &Path, csv_path: &Path) -> Result<Vec<WorkoutSession>> {
    let mut sessions = Vec::new();
    let mut seen_ids = HashSet::new();

    for session in read_jsonl_sessions(jsonl_path)? {
        if seen_ids.insert(session.id) {
            sessions.push(session);
        }
    }
    let from_log = sessions.len();

    if csv_path.exists() {
        for session in load_sessions_from_csv(csv_path)? {
            if seen_ids.insert(session.id) {
                sessions.push(session);
            }
        }
    }
    tracing::debug!(
        "Loaded {} sessions from log, {} from CSV",
        from_log,
        sessions.len() - from_log
    );

    sessions.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));

    tracing::info!("Loaded {} sessions of history", sessions.len());
    Ok(sessions)
}

/// [`load_history`] over the standard file names inside `dir`
pub fn load_history_dir(dir: &Path) -> Result<Vec<WorkoutSession>> {
    load_history(&dir.join(HISTORY_JSONL), &dir.join(HISTORY_CSV))
}

/// Read sessions from a JSON-lines log under a shared lock
///
/// Unparseable lines are skipped with a warning.
pub fn read_jsonl_sessions(path: &Path) -> Result<Vec<WorkoutSession>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut sessions = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WorkoutSession>(&line) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                tracing::warn!("Failed to parse session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    Ok(sessions)
}

/// Group per-set CSV rows back into sessions, in first-seen order
fn load_sessions_from_csv(path: &Path) -> Result<Vec<WorkoutSession>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut sessions: Vec<WorkoutSession> = Vec::new();
    let mut by_id: HashMap<Uuid, usize> = HashMap::new();

    for (row_num, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row {}: {}", row_num + 1, e);
                continue;
            }
        };

        let id = match Uuid::parse_str(&row.session_id) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Invalid session id in CSV row {}: {}", row_num + 1, e);
                continue;
            }
        };
        let performed_at = match DateTime::parse_from_rfc3339(&row.performed_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!("Invalid date in CSV row {}: {}", row_num + 1, e);
                continue;
            }
        };

        let index = *by_id.entry(id).or_insert_with(|| {
            sessions.push(WorkoutSession {
                id,
                performed_at,
                exercises: Vec::new(),
            });
            sessions.len() - 1
        });

        let set = LoggedSet {
            weight: row.weight,
            reps: row.reps,
        };
        let exercises = &mut sessions[index].exercises;
        match exercises.last_mut() {
            Some(last) if last.exercise_id == row.exercise_id => last.sets.push(set),
            _ => exercises.push(LoggedExercise {
                exercise_id: row.exercise_id,
                sets: vec![set],
            }),
        }
    }

    Ok(sessions)
}
