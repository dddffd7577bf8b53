use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::deal::DealInput;
use crate::error::CreError;
use crate::CreResult;

/// A named, timestamped copy of a deal's inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSnapshot {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub inputs: DealInput,
}

/// Write `input` under `dir` as `<name>_<YYYYmmdd_HHMMSS>.json`, creating the
/// directory if needed. Returns the written path.
pub fn save_snapshot(dir: &Path, name: &str, input: &DealInput) -> CreResult<PathBuf> {
    save_snapshot_at(dir, name, input, Utc::now())
}

/// As [`save_snapshot`] with an explicit timestamp.
pub fn save_snapshot_at(
    dir: &Path,
    name: &str,
    input: &DealInput,
    created_at: DateTime<Utc>,
) -> CreResult<PathBuf> {
    if name.trim().is_empty() {
        return Err(CreError::invalid("name", "Snapshot name cannot be empty"));
    }
    input.validate()?;

    fs::create_dir_all(dir)?;
    let file_name = format!(
        "{}_{}.json",
        sanitize_name(name),
        created_at.format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(file_name);

    let snapshot = ScenarioSnapshot {
        name: name.to_string(),
        created_at,
        inputs: input.clone(),
    };
    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(&path, json)?;

    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(path)
}

pub fn load_snapshot(path: &Path) -> CreResult<ScenarioSnapshot> {
    let content = fs::read_to_string(path)?;
    let snapshot: ScenarioSnapshot = serde_json::from_str(&content)?;
    Ok(snapshot)
}

/// Snapshot files in `dir`, newest name first. A missing directory has none.
pub fn list_snapshots(dir: &Path) -> CreResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(paths)
}

/// Alphanumerics, spaces, `_` and `-` survive; spaces become underscores.
fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let cleaned = kept.trim().replace(' ', "_");
    if cleaned.is_empty() {
        "scenario".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Main St / Base Case!"), "Main_St__Base_Case");
        assert_eq!(sanitize_name("  deal-1_a "), "deal-1_a");
        assert_eq!(sanitize_name("???"), "scenario");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let input = DealInput {
            interest_rate: dec!(0.0675),
            ..DealInput::default()
        };

        let path = save_snapshot_at(dir.path(), "Base Case", &input, at).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Base_Case_20240309_140507.json"
        );

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.name, "Base Case");
        assert_eq!(loaded.created_at, at);
        assert_eq!(loaded.inputs, input);
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let input = DealInput::default();
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        save_snapshot_at(dir.path(), "deal", &input, early).unwrap();
        save_snapshot_at(dir.path(), "deal", &input, late).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed = list_snapshots(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].to_string_lossy().contains("20240601"));
        assert!(listed[1].to_string_lossy().contains("20240101"));
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let listed = list_snapshots(&dir.path().join("nope")).unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_snapshot(dir.path(), "   ", &DealInput::default()).unwrap_err();
        assert!(matches!(err, CreError::InvalidInput { .. }));
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = load_snapshot(&path).unwrap_err();
        assert!(matches!(err, CreError::SerializationError(_)));
    }
}
