use crate::activity::{ActivityEntry, DayBuckets, SourceKind, SourceWarning};
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Render the per-day plain-text digest.
///
/// Within a day the order is fixed: calendar events, PRs created, PRs
/// merged, Claude sessions (busiest project first), then git commits.
/// Git lines are suppressed for repos that already have a Claude
/// session entry that day, since those overlap almost entirely.
pub fn format_text(buckets: &DayBuckets, warnings: &[SourceWarning]) -> String {
    let mut out = String::new();
    let range = buckets.range();
    let _ = writeln!(out, "Time report {} .. {}", range.from, range.to);
    let _ = writeln!(out);

    let mut total_prs = 0usize;
    let mut pr_projects: BTreeSet<String> = BTreeSet::new();
    let mut claude_projects: BTreeSet<String> = BTreeSet::new();
    let mut working_days = 0usize;

    for (date, entries) in buckets.iter() {
        let _ = writeln!(out, "{} ({})", date, date.format("%a"));
        if entries.is_empty() {
            let _ = writeln!(out, "  --");
            let _ = writeln!(out);
            continue;
        }
        working_days += 1;

        let claude_repos: BTreeSet<&str> = entries
            .iter()
            .filter_map(|e| match e {
                ActivityEntry::ClaudeSession { project, .. } => Some(project.as_str()),
                _ => None,
            })
            .collect();

        for entry in ordered(entries) {
            match entry {
                ActivityEntry::Calendar {
                    subject,
                    start,
                    end,
                    organizer,
                } => {
                    let when = if end.is_empty() {
                        start.clone()
                    } else {
                        format!("{}-{}", start, end)
                    };
                    let who = if organizer.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", organizer)
                    };
                    let _ = writeln!(out, "  CAL  {:<12} {}{}", when, subject, who);
                }
                ActivityEntry::PrCreated {
                    project,
                    repo,
                    pr_id,
                    title,
                    status,
                    target,
                } => {
                    total_prs += 1;
                    pr_projects.insert(project.clone());
                    let mut tags = String::new();
                    if status != "completed" {
                        let _ = write!(tags, " [{}]", status);
                    }
                    if target != "main" {
                        let _ = write!(tags, " -> {}", target);
                    }
                    let _ = writeln!(
                        out,
                        "  PR   {}/{} #{} created: {}{}",
                        project, repo, pr_id, title, tags
                    );
                }
                ActivityEntry::PrCompleted {
                    project,
                    repo,
                    pr_id,
                    title,
                    ..
                } => {
                    pr_projects.insert(project.clone());
                    let _ = writeln!(
                        out,
                        "  PR   {}/{} #{} merged: {}",
                        project, repo, pr_id, title
                    );
                }
                ActivityEntry::ClaudeSession { project, sessions } => {
                    claude_projects.insert(project.clone());
                    let plural = if *sessions == 1 { "session" } else { "sessions" };
                    let _ = writeln!(out, "  CODE {} ({} {})", project, sessions, plural);
                }
                ActivityEntry::GitCommit { repo, commits } => {
                    if claude_repos.contains(repo.as_str()) {
                        continue;
                    }
                    let plural = if *commits == 1 { "commit" } else { "commits" };
                    let _ = writeln!(out, "  GIT  {}: {} {}", repo, commits, plural);
                }
            }
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  PRs created: {}", total_prs);
    let _ = writeln!(out, "  DevOps projects: {}", set_line(&pr_projects));
    let _ = writeln!(out, "  Claude projects: {}", set_line(&claude_projects));
    let _ = writeln!(
        out,
        "  Days with activity: {} of {}",
        working_days,
        range.len_days()
    );

    if !warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for w in warnings {
            let _ = writeln!(out, "  - {}: {}", w.source.label(), w.message);
        }
    }

    out
}

/// Render the digest as a JSON document for downstream tooling.
pub fn format_json(buckets: &DayBuckets, warnings: &[SourceWarning]) -> serde_json::Value {
    let range = buckets.range();
    json!({
        "range": {
            "from": range.from.format("%Y-%m-%d").to_string(),
            "to": range.to.format("%Y-%m-%d").to_string(),
        },
        "days": buckets.to_json_days(),
        "warnings": warnings,
    })
}

/// Order one day's entries for display. Claude sessions and git commits
/// sort by volume descending so the busiest project leads; everything
/// else keeps its collection order within its group.
fn ordered(entries: &[ActivityEntry]) -> Vec<&ActivityEntry> {
    let mut sorted: Vec<&ActivityEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| group(a).cmp(&group(b)).then_with(|| volume(b).cmp(&volume(a))));
    sorted
}

fn group(entry: &ActivityEntry) -> u8 {
    match entry.source() {
        SourceKind::Calendar => 0,
        SourceKind::DevOps => match entry {
            ActivityEntry::PrCompleted { .. } => 2,
            _ => 1,
        },
        SourceKind::Claude => 3,
        SourceKind::Git => 4,
        SourceKind::Anthropic => 5,
    }
}

fn volume(entry: &ActivityEntry) -> usize {
    match entry {
        ActivityEntry::ClaudeSession { sessions, .. } => *sessions,
        ActivityEntry::GitCommit { commits, .. } => *commits,
        _ => 0,
    }
}

fn set_line(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "none".to_string()
    } else {
        format!("{} ({})", set.len(), set.iter().cloned().collect::<Vec<_>>().join(", "))
    }
}
