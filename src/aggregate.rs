use crate::activity::{SourceKind, SourceWarning};
use crate::devops::rest::RestClient;
use crate::devops::{DiffCounts, FileChange, PrStatus, PullRequest};
use crate::range::DateRange;
use chrono::NaiveDate;
use indicatif::ProgressBar;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Default number of concurrent enrichment workers
pub const DEFAULT_WORKERS: usize = 6;

/// A fully enriched pull request.
///
/// Records are complete or absent: an enrichment failure drops the PR
/// from the output with a warning instead of publishing partial state.
#[derive(Debug, Clone)]
pub struct PrRecord {
    pub pr: PullRequest,
    pub files: Vec<FileChange>,
    pub diff: DiffCounts,
}

impl PrRecord {
    /// Record without file details, for --no-files runs
    pub fn bare(pr: PullRequest) -> Self {
        Self {
            pr,
            files: Vec::new(),
            diff: DiffCounts::default(),
        }
    }
}

/// Drop duplicate PRs within the same project.
///
/// The three status queries can return the same PR twice; a PR id seen
/// under two different projects stays distinct.
pub fn dedupe_prs(prs: Vec<PullRequest>) -> Vec<PullRequest> {
    let mut seen: HashSet<(String, u64)> = HashSet::new();
    prs.into_iter()
        .filter(|pr| seen.insert((pr.repository.project.name.clone(), pr.pull_request_id)))
        .collect()
}

/// Sort newest-first by creation date, with the id as tiebreaker so the
/// ordering is identical regardless of worker interleaving.
pub fn sort_records(records: &mut [PrRecord]) {
    records.sort_by(|a, b| {
        b.pr.creation_date
            .cmp(&a.pr.creation_date)
            .then_with(|| a.pr.pull_request_id.cmp(&b.pr.pull_request_id))
            .then_with(|| a.pr.repository.project.name.cmp(&b.pr.repository.project.name))
    });
}

/// Global summary counters over a set of enriched PRs
#[derive(Debug, Clone, Default)]
pub struct PrSummary {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub abandoned: usize,
    pub files_changed: usize,
    /// Distinct (email, display name) pairs
    pub users: Vec<(String, String)>,
    pub projects: Vec<String>,
    pub repos: Vec<String>,
}

impl PrSummary {
    pub fn from_records(records: &[PrRecord]) -> Self {
        let mut users = BTreeSet::new();
        let mut projects = BTreeSet::new();
        let mut repos = BTreeSet::new();
        let mut summary = Self::default();

        for record in records {
            summary.total += 1;
            match record.pr.status {
                PrStatus::Completed => summary.completed += 1,
                PrStatus::Active => summary.active += 1,
                PrStatus::Abandoned => summary.abandoned += 1,
                PrStatus::Unknown => {}
            }
            summary.files_changed += record.files.len();
            users.insert((
                record.pr.created_by.unique_name.clone(),
                record.pr.created_by.display_name.clone(),
            ));
            projects.insert(record.pr.repository.project.name.clone());
            repos.insert(record.pr.repository.name.clone());
        }

        summary.users = users.into_iter().collect();
        summary.projects = projects.into_iter().collect();
        summary.repos = repos.into_iter().collect();
        summary
    }

    pub fn contributors(&self) -> usize {
        self.users.len()
    }
}

/// Per-day PR counts by status across the full requested range.
///
/// Every day of the range has a slot, zero or not.
#[derive(Debug, Clone)]
pub struct TimelineSeries {
    pub dates: Vec<NaiveDate>,
    pub completed: Vec<u32>,
    pub active: Vec<u32>,
    pub abandoned: Vec<u32>,
}

impl TimelineSeries {
    pub fn from_records(records: &[PrRecord], range: DateRange) -> Self {
        let dates: Vec<NaiveDate> = range.days().collect();
        let mut completed = vec![0u32; dates.len()];
        let mut active = vec![0u32; dates.len()];
        let mut abandoned = vec![0u32; dates.len()];

        for record in records {
            let day = record.pr.creation_date.date_naive();
            let Some(idx) = dates.iter().position(|d| *d == day) else {
                continue;
            };
            match record.pr.status {
                PrStatus::Completed => completed[idx] += 1,
                PrStatus::Active => active[idx] += 1,
                PrStatus::Abandoned => abandoned[idx] += 1,
                PrStatus::Unknown => {}
            }
        }

        Self {
            dates,
            completed,
            active,
            abandoned,
        }
    }

    /// Short axis labels ("Feb 03")
    pub fn labels(&self) -> Vec<String> {
        self.dates.iter().map(|d| d.format("%b %d").to_string()).collect()
    }
}

/// Enrich PRs with file lists and diff counts across a bounded worker pool.
///
/// Results are appended under a mutex in arrival order, then re-sorted by
/// creation date, so the worker count never affects the final ordering.
/// With `rest == None` (--no-files) records are completed without fetching.
pub async fn enrich_all(
    prs: Vec<PullRequest>,
    rest: Option<Arc<RestClient>>,
    workers: usize,
    progress: Option<ProgressBar>,
) -> (Vec<PrRecord>, Vec<SourceWarning>) {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let results: Arc<Mutex<Vec<PrRecord>>> = Arc::new(Mutex::new(Vec::with_capacity(prs.len())));
    let warnings: Arc<Mutex<Vec<SourceWarning>>> = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::with_capacity(prs.len());
    for pr in prs {
        let semaphore = Arc::clone(&semaphore);
        let results = Arc::clone(&results);
        let warnings = Arc::clone(&warnings);
        let rest = rest.clone();
        let progress = progress.clone();

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let pr_id = pr.pull_request_id;
            let outcome = match rest.as_deref() {
                None => Ok(PrRecord::bare(pr)),
                Some(client) => enrich_one(client, pr).await,
            };
            match outcome {
                Ok(record) => {
                    if let Ok(mut guard) = results.lock() {
                        guard.push(record);
                    }
                }
                Err(message) => {
                    tracing::warn!(pr_id, "{}", message);
                    if let Ok(mut guard) = warnings.lock() {
                        guard.push(SourceWarning::new(SourceKind::DevOps, message));
                    }
                }
            }
            if let Some(bar) = progress {
                bar.inc(1);
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let mut records = match Arc::try_unwrap(results) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|p| p.into_inner()),
        Err(_) => Vec::new(),
    };
    let mut warnings = match Arc::try_unwrap(warnings) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|p| p.into_inner()),
        Err(_) => Vec::new(),
    };

    sort_records(&mut records);
    warnings.sort_by(|a, b| a.message.cmp(&b.message));
    (records, warnings)
}

async fn enrich_one(client: &RestClient, pr: PullRequest) -> Result<PrRecord, String> {
    let project_id = pr.repository.project.id.clone();
    let repo_id = pr.repository.id.clone();
    let pr_id = pr.pull_request_id;

    let files = client
        .pr_changes(&project_id, &repo_id, pr_id)
        .await
        .map_err(|e| format!("PR #{} skipped, file fetch failed: {}", pr_id, e))?;

    let source = pr
        .last_merge_source_commit
        .as_ref()
        .map(|c| c.commit_id.clone())
        .unwrap_or_default();
    let target = pr
        .last_merge_target_commit
        .as_ref()
        .map(|c| c.commit_id.clone())
        .unwrap_or_default();
    let diff = client
        .diff_counts(&project_id, &repo_id, &source, &target)
        .await
        .map_err(|e| format!("PR #{} skipped, diff fetch failed: {}", pr_id, e))?;

    Ok(PrRecord { pr, files, diff })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devops::decode_pr_list;
    use chrono::NaiveDate;

    fn make_pr(id: u64, project: &str, date: &str, status: &str) -> PullRequest {
        let json = format!(
            r#"[{{
                "pullRequestId": {id},
                "title": "PR {id}",
                "status": "{status}",
                "creationDate": "{date}T10:00:00Z",
                "createdBy": {{"displayName": "Alice", "uniqueName": "alice@contoso.com"}},
                "repository": {{
                    "id": "repo-{id}",
                    "name": "api",
                    "project": {{"id": "pid", "name": "{project}"}}
                }},
                "sourceRefName": "refs/heads/f",
                "targetRefName": "refs/heads/main"
            }}]"#
        );
        decode_pr_list(&json).unwrap().remove(0)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_dedupe_within_project_only() {
        let prs = vec![
            make_pr(1, "Planner", "2026-02-03", "active"),
            make_pr(1, "Planner", "2026-02-03", "active"),
            make_pr(1, "Billing", "2026-02-03", "active"),
        ];
        let unique = dedupe_prs(prs);
        // Same id in another project is a distinct record
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            PrRecord::bare(make_pr(1, "Planner", "2026-02-03", "completed")),
            PrRecord::bare(make_pr(2, "Planner", "2026-02-04", "active")),
            PrRecord::bare(make_pr(3, "Billing", "2026-02-05", "abandoned")),
        ];
        let summary = PrSummary::from_records(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.abandoned, 1);
        assert_eq!(summary.contributors(), 1);
        assert_eq!(summary.projects, vec!["Billing", "Planner"]);
    }

    #[test]
    fn test_summary_is_idempotent() {
        let records = vec![
            PrRecord::bare(make_pr(1, "Planner", "2026-02-03", "completed")),
            PrRecord::bare(make_pr(2, "Planner", "2026-02-05", "active")),
        ];
        let first = PrSummary::from_records(&records);
        let second = PrSummary::from_records(&records);
        assert_eq!(first.total, second.total);
        assert_eq!(first.users, second.users);
        assert_eq!(first.projects, second.projects);
    }

    #[test]
    fn test_timeline_covers_range_with_zero_days() {
        // Two PRs inside 2026-02-01..07: buckets exist for all seven days,
        // five of them with zero counts.
        let range = DateRange::new(d("2026-02-01"), d("2026-02-07")).unwrap();
        let records = vec![
            PrRecord::bare(make_pr(1, "Planner", "2026-02-03", "completed")),
            PrRecord::bare(make_pr(2, "Planner", "2026-02-05", "active")),
        ];
        let summary = PrSummary::from_records(&records);
        assert_eq!(summary.total, 2);

        let timeline = TimelineSeries::from_records(&records, range);
        assert_eq!(timeline.dates.len(), 7);
        assert_eq!(timeline.completed, vec![0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(timeline.active, vec![0, 0, 0, 0, 1, 0, 0]);
        assert_eq!(timeline.abandoned, vec![0; 7]);
    }

    #[test]
    fn test_timeline_ignores_out_of_range_records() {
        let range = DateRange::new(d("2026-02-01"), d("2026-02-07")).unwrap();
        let records = vec![PrRecord::bare(make_pr(1, "Planner", "2026-03-01", "active"))];
        let timeline = TimelineSeries::from_records(&records, range);
        assert_eq!(timeline.active, vec![0; 7]);
    }

    #[tokio::test]
    async fn test_worker_count_does_not_affect_ordering() {
        let prs: Vec<PullRequest> = (0..20)
            .map(|i| {
                make_pr(
                    100 - i,
                    "Planner",
                    &format!("2026-02-{:02}", (i % 7) + 1),
                    "active",
                )
            })
            .collect();

        let (one, _) = enrich_all(prs.clone(), None, 1, None).await;
        let (six, _) = enrich_all(prs, None, 6, None).await;

        let ids_one: Vec<u64> = one.iter().map(|r| r.pr.pull_request_id).collect();
        let ids_six: Vec<u64> = six.iter().map(|r| r.pr.pull_request_id).collect();
        assert_eq!(ids_one, ids_six);

        // Newest first
        let mut sorted = one.clone();
        sort_records(&mut sorted);
        let resorted: Vec<u64> = sorted.iter().map(|r| r.pr.pull_request_id).collect();
        assert_eq!(ids_one, resorted);
    }
}
