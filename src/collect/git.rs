use crate::activity::ActivityEntry;
use crate::error::Result;
use crate::range::DateRange;
use chrono::{NaiveDate, TimeZone, Utc};
use git2::Repository;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default directories scanned for repositories
pub fn default_repo_roots() -> Vec<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    vec![
        home.join("repos"),
        home.join("orcha-worktrees"),
        home.join("hive-repos"),
    ]
}

/// Collect local commit counts per repository per day.
///
/// Scans each root one and two levels deep for git checkouts (worktree
/// checkouts have a .git file rather than a directory). Repositories
/// that cannot be walked are skipped.
pub fn collect(repo_roots: &[PathBuf], range: DateRange) -> Result<Vec<(NaiveDate, ActivityEntry)>> {
    let mut commits: BTreeMap<(NaiveDate, String), usize> = BTreeMap::new();

    for repo_path in discover_repos(repo_roots) {
        let repo_name = repo_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if let Err(e) = count_commits(&repo_path, &repo_name, range, &mut commits) {
            tracing::debug!("skipping {}: {}", repo_path.display(), e);
        }
    }

    Ok(commits
        .into_iter()
        .map(|((date, repo), count)| {
            (
                date,
                ActivityEntry::GitCommit {
                    repo,
                    commits: count,
                },
            )
        })
        .collect())
}

/// Find git checkouts under the given roots (direct children plus one
/// nested level, e.g. clones grouped in a subdirectory).
fn discover_repos(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut repos = Vec::new();
    for root in roots {
        if !root.exists() {
            continue;
        }
        for dir in subdirs(root) {
            if is_git_checkout(&dir) {
                repos.push(dir.clone());
            }
            for nested in subdirs(&dir) {
                if is_git_checkout(&nested) {
                    repos.push(nested);
                }
            }
        }
    }
    repos.sort();
    repos.dedup();
    repos
}

fn subdirs(path: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(path) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect()
}

fn is_git_checkout(path: &Path) -> bool {
    // .git is a file in worktree checkouts
    path.join(".git").exists() && Repository::open(path).is_ok()
}

fn count_commits(
    repo_path: &Path,
    repo_name: &str,
    range: DateRange,
    commits: &mut BTreeMap<(NaiveDate, String), usize>,
) -> Result<()> {
    let repo = Repository::open(repo_path)?;
    let mut revwalk = repo.revwalk()?;
    revwalk.push_glob("refs/heads/*")?;
    revwalk.set_sorting(git2::Sort::TIME)?;

    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let seconds = commit.time().seconds();
        let Some(ts) = Utc.timestamp_opt(seconds, 0).single() else {
            continue;
        };
        if !range.contains(&ts) {
            continue;
        }
        *commits
            .entry((ts.date_naive(), repo_name.to_string()))
            .or_insert(0) += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use std::io::Write;
    use tempfile::TempDir;

    fn commit_on(repo: &Repository, dir: &Path, file: &str, date: &str) {
        let file_path = dir.join(file);
        let mut f = fs::File::create(&file_path).unwrap();
        writeln!(f, "content for {}", file).unwrap();
        drop(f);

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let seconds = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();
        let sig = Signature::new("Test", "test@example.com", &Time::new(seconds, 0)).unwrap();

        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .and_then(|t| repo.find_commit(t).ok());
        let parents: Vec<_> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "test commit", &tree, &parents)
            .unwrap();
    }

    fn range() -> DateRange {
        let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        DateRange::new(d("2026-02-01"), d("2026-02-07")).unwrap()
    }

    #[test]
    fn test_commits_counted_per_day_within_range() {
        let root = TempDir::new().unwrap();
        let repo_dir = root.path().join("planner");
        fs::create_dir(&repo_dir).unwrap();
        let repo = Repository::init(&repo_dir).unwrap();

        commit_on(&repo, &repo_dir, "a.txt", "2026-02-03");
        commit_on(&repo, &repo_dir, "b.txt", "2026-02-03");
        commit_on(&repo, &repo_dir, "c.txt", "2026-01-15"); // out of range

        let entries = collect(&[root.path().to_path_buf()], range()).unwrap();
        assert_eq!(entries.len(), 1);
        let (date, entry) = &entries[0];
        assert_eq!(*date, NaiveDate::parse_from_str("2026-02-03", "%Y-%m-%d").unwrap());
        match entry {
            ActivityEntry::GitCommit { repo, commits } => {
                assert_eq!(repo, "planner");
                assert_eq!(*commits, 2);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_discover_finds_nested_repos() {
        let root = TempDir::new().unwrap();
        let direct = root.path().join("direct");
        let nested = root.path().join("group").join("nested");
        fs::create_dir_all(&direct).unwrap();
        fs::create_dir_all(&nested).unwrap();
        Repository::init(&direct).unwrap();
        Repository::init(&nested).unwrap();

        let repos = discover_repos(&[root.path().to_path_buf()]);
        assert_eq!(repos.len(), 2);
        assert!(repos.iter().any(|p| p.ends_with("direct")));
        assert!(repos.iter().any(|p| p.ends_with("nested")));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let entries = collect(&[PathBuf::from("/nonexistent/repos")], range()).unwrap();
        assert!(entries.is_empty());
    }
}
