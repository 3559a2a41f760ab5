use crate::range::DateRange;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// External source a piece of activity evidence came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    DevOps,
    Claude,
    Git,
    Calendar,
    /// Anthropic admin usage API; feeds the cost section, never day buckets
    Anthropic,
}

impl SourceKind {
    /// Short tag used in the text digest
    pub fn tag(&self) -> &'static str {
        match self {
            Self::DevOps => "PR",
            Self::Claude => "CODE",
            Self::Git => "GIT",
            Self::Calendar => "CAL",
            Self::Anthropic => "COST",
        }
    }

    /// Human-readable source label
    pub fn label(&self) -> &'static str {
        match self {
            Self::DevOps => "Azure DevOps",
            Self::Claude => "Claude Code history",
            Self::Git => "local git repositories",
            Self::Calendar => "MS365 calendar",
            Self::Anthropic => "Anthropic usage API",
        }
    }
}

/// A single day-bucketed unit of work evidence.
///
/// Constructed fresh per run; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEntry {
    PrCreated {
        project: String,
        repo: String,
        pr_id: u64,
        title: String,
        status: String,
        target: String,
    },
    PrCompleted {
        project: String,
        repo: String,
        pr_id: u64,
        title: String,
        target: String,
    },
    ClaudeSession {
        project: String,
        sessions: usize,
    },
    GitCommit {
        repo: String,
        commits: usize,
    },
    Calendar {
        subject: String,
        start: String,
        end: String,
        organizer: String,
    },
}

impl ActivityEntry {
    /// Which collector produced this entry
    pub fn source(&self) -> SourceKind {
        match self {
            Self::PrCreated { .. } | Self::PrCompleted { .. } => SourceKind::DevOps,
            Self::ClaudeSession { .. } => SourceKind::Claude,
            Self::GitCommit { .. } => SourceKind::Git,
            Self::Calendar { .. } => SourceKind::Calendar,
        }
    }
}

/// Warning recorded when a source is skipped or degraded.
///
/// Both renderers list these so output completeness is self-describing.
#[derive(Debug, Clone, Serialize)]
pub struct SourceWarning {
    pub source: SourceKind,
    pub message: String,
}

impl SourceWarning {
    pub fn new(source: SourceKind, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
        }
    }
}

/// Per-day activity buckets over a fixed date range.
///
/// Every calendar day of the range has a bucket, empty or not. Inserts
/// outside the range are dropped. Insertion order within a day follows
/// source-processing order, not chronological order.
#[derive(Debug, Clone)]
pub struct DayBuckets {
    range: DateRange,
    days: BTreeMap<NaiveDate, Vec<ActivityEntry>>,
}

impl DayBuckets {
    /// Create buckets pre-populated with every day in the range
    pub fn new(range: DateRange) -> Self {
        let days = range.days().map(|d| (d, Vec::new())).collect();
        Self { range, days }
    }

    /// The range these buckets cover
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Insert one entry; returns false if the date is outside the range
    pub fn insert(&mut self, date: NaiveDate, entry: ActivityEntry) -> bool {
        match self.days.get_mut(&date) {
            Some(bucket) => {
                bucket.push(entry);
                true
            }
            None => false,
        }
    }

    /// Insert a batch of dated entries, dropping out-of-range dates
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (NaiveDate, ActivityEntry)>) {
        for (date, entry) in entries {
            self.insert(date, entry);
        }
    }

    /// Entries for a single day (empty slice for in-range days without activity)
    pub fn entries(&self, date: NaiveDate) -> &[ActivityEntry] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate (date, entries) in calendar order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[ActivityEntry])> {
        self.days.iter().map(|(d, v)| (*d, v.as_slice()))
    }

    /// Total entry count across all days
    pub fn total_entries(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// Remove every entry belonging to one source
    pub fn remove_source(&mut self, source: SourceKind) {
        for bucket in self.days.values_mut() {
            bucket.retain(|e| e.source() != source);
        }
    }

    /// Days as a serializable map keyed by YYYY-MM-DD
    pub fn to_json_days(&self) -> BTreeMap<String, &[ActivityEntry]> {
        self.days
            .iter()
            .map(|(d, v)| (d.format("%Y-%m-%d").to_string(), v.as_slice()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(d("2026-02-01"), d("2026-02-07")).unwrap()
    }

    fn git_entry(repo: &str) -> ActivityEntry {
        ActivityEntry::GitCommit {
            repo: repo.to_string(),
            commits: 3,
        }
    }

    #[test]
    fn test_buckets_cover_every_day_in_range() {
        let buckets = DayBuckets::new(range());
        let keys: Vec<_> = buckets.iter().map(|(d, _)| d).collect();
        let expected: Vec<_> = range().days().collect();
        assert_eq!(keys, expected);
        assert_eq!(buckets.total_entries(), 0);
    }

    #[test]
    fn test_out_of_range_insert_dropped() {
        let mut buckets = DayBuckets::new(range());
        assert!(buckets.insert(d("2026-02-03"), git_entry("a")));
        assert!(!buckets.insert(d("2026-02-09"), git_entry("b")));
        assert!(!buckets.insert(d("2026-01-31"), git_entry("c")));
        assert_eq!(buckets.total_entries(), 1);
    }

    #[test]
    fn test_remove_source_leaves_others_intact() {
        let mut buckets = DayBuckets::new(range());
        buckets.insert(d("2026-02-02"), git_entry("a"));
        buckets.insert(
            d("2026-02-02"),
            ActivityEntry::ClaudeSession {
                project: "planner".to_string(),
                sessions: 2,
            },
        );
        buckets.remove_source(SourceKind::Git);
        let entries = buckets.entries(d("2026-02-02"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source(), SourceKind::Claude);
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = ActivityEntry::PrCreated {
            project: "Planner".to_string(),
            repo: "api".to_string(),
            pr_id: 42,
            title: "Add endpoint".to_string(),
            status: "active".to_string(),
            target: "main".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "pr_created");
        assert_eq!(json["pr_id"], 42);
    }

    #[test]
    fn test_insertion_order_preserved_within_day() {
        let mut buckets = DayBuckets::new(range());
        buckets.insert(d("2026-02-05"), git_entry("first"));
        buckets.insert(d("2026-02-05"), git_entry("second"));
        let repos: Vec<_> = buckets
            .entries(d("2026-02-05"))
            .iter()
            .map(|e| match e {
                ActivityEntry::GitCommit { repo, .. } => repo.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(repos, vec!["first", "second"]);
    }
}
