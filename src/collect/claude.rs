use crate::activity::ActivityEntry;
use crate::error::Result;
use crate::range::DateRange;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// One line of ~/.claude/history.jsonl
#[derive(Debug, Deserialize)]
struct HistoryLine {
    /// Milliseconds since epoch
    timestamp: f64,
    #[serde(default)]
    project: String,
    #[serde(default, rename = "sessionId")]
    session_id: String,
}

/// Default location of the session history log
pub fn default_history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join("history.jsonl")
}

/// Collect Claude Code sessions per project per day.
///
/// Malformed lines are skipped; a missing history file is an empty
/// contribution, not an error.
pub fn collect(history_path: &Path, range: DateRange) -> Result<Vec<(NaiveDate, ActivityEntry)>> {
    if !history_path.exists() {
        tracing::debug!("no history file at {}", history_path.display());
        return Ok(Vec::new());
    }

    let contents = fs::read_to_string(history_path)?;
    let mut sessions: BTreeMap<(NaiveDate, String), BTreeSet<String>> = BTreeMap::new();

    for line in contents.lines() {
        let Ok(entry) = serde_json::from_str::<HistoryLine>(line) else {
            continue;
        };
        let Some(ts) = DateTime::<Utc>::from_timestamp_millis(entry.timestamp as i64) else {
            continue;
        };
        if !range.contains(&ts) || entry.project.is_empty() {
            continue;
        }
        let project = project_short_name(&entry.project);
        sessions
            .entry((ts.date_naive(), project))
            .or_default()
            .insert(entry.session_id);
    }

    Ok(sessions
        .into_iter()
        .map(|((date, project), ids)| {
            (
                date,
                ActivityEntry::ClaudeSession {
                    project,
                    sessions: ids.len(),
                },
            )
        })
        .collect())
}

/// Resolve a project path to a short display name.
///
/// Worktree session directories (session-*, pl-*, HIVE-*) belong to the
/// parent project, not to the session dir itself.
fn project_short_name(path: &str) -> String {
    let path = Path::new(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.starts_with("session-") || name.starts_with("pl-") || name.starts_with("HIVE-") {
        if let Some(parent) = path.parent().and_then(|p| p.file_name()) {
            return parent.to_string_lossy().to_string();
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn range() -> DateRange {
        let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        DateRange::new(d("2026-02-01"), d("2026-02-07")).unwrap()
    }

    fn ms(s: &str) -> i64 {
        let d = NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        d.and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp_millis()
    }

    #[test]
    fn test_sessions_grouped_per_project_per_day() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"timestamp": {}, "project": "/home/u/repos/planner", "sessionId": "s1"}}"#,
            ms("2026-02-03")
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"timestamp": {}, "project": "/home/u/repos/planner", "sessionId": "s2"}}"#,
            ms("2026-02-03")
        )
        .unwrap();
        // Same session mentioned twice counts once
        writeln!(
            file,
            r#"{{"timestamp": {}, "project": "/home/u/repos/planner", "sessionId": "s2"}}"#,
            ms("2026-02-03")
        )
        .unwrap();

        let entries = collect(file.path(), range()).unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0].1 {
            ActivityEntry::ClaudeSession { project, sessions } => {
                assert_eq!(project, "planner");
                assert_eq!(*sessions, 2);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_and_malformed_lines_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(
            file,
            r#"{{"timestamp": {}, "project": "/home/u/repos/old", "sessionId": "s1"}}"#,
            ms("2025-12-01")
        )
        .unwrap();
        let entries = collect(file.path(), range()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_missing_file_is_empty_contribution() {
        let entries = collect(Path::new("/nonexistent/history.jsonl"), range()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_worktree_paths_resolve_to_parent() {
        assert_eq!(
            project_short_name("/home/u/.orcha/worktrees/TeamPlanner/session-1-abc"),
            "TeamPlanner"
        );
        assert_eq!(
            project_short_name("/home/u/worktrees/Billing/pl-42"),
            "Billing"
        );
        assert_eq!(project_short_name("/home/u/repos/planner"), "planner");
    }
}
