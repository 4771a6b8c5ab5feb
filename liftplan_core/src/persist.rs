//! Plan and context files.
//!
//! Plans are written atomically (temp file in the target directory, then
//! rename) under an exclusive lock, so a reader never sees half a plan.

use crate::{Error, GeneratedWorkout, Result, WorkoutContext};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Read a whole file under a shared lock
fn read_locked(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    Ok(contents)
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let contents = read_locked(path)?;
    let value = serde_json::from_str(&contents)?;
    tracing::debug!("Loaded {} from {:?}", what, path);
    Ok(value)
}

/// Replace `path` with `contents` atomically
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(contents)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

impl GeneratedWorkout {
    /// Load a plan, e.g. as the previous plan for a regeneration
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path, "plan")
    }

    /// Save as pretty JSON, replacing any existing file atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomic(path, contents.as_bytes())?;
        tracing::info!("Saved plan {} to {:?}", self.id, path);
        Ok(())
    }
}

impl WorkoutContext {
    /// Load a generation context from JSON
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path, "workout context")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        write_atomic(path, contents.as_bytes())
    }
}
