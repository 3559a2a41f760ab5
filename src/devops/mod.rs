pub mod az;
pub mod rest;

use crate::error::{ReportError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::fmt;

/// Pull request as returned by `az repos pr list`.
///
/// Decoded with explicit schemas so a malformed response surfaces as a
/// ParseError instead of a missing-field lookup at render time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub pull_request_id: u64,
    #[serde(default)]
    pub title: String,
    pub status: PrStatus,
    pub creation_date: DateTime<Utc>,
    #[serde(default)]
    pub closed_date: Option<DateTime<Utc>>,
    pub created_by: Identity,
    pub repository: RepositoryRef,
    #[serde(default)]
    pub source_ref_name: String,
    #[serde(default)]
    pub target_ref_name: String,
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_merge_source_commit: Option<CommitRef>,
    #[serde(default)]
    pub last_merge_target_commit: Option<CommitRef>,
    #[serde(default)]
    pub completion_options: Option<CompletionOptions>,
}

/// PR lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Active,
    Completed,
    Abandoned,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// DevOps user identity reference
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub display_name: String,
    /// Usually the email address
    #[serde(default)]
    pub unique_name: String,
}

/// Repository reference embedded in a PR
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub project: ProjectRef,
}

/// Project reference embedded in a repository
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Reviewer with their vote (-10 rejected .. 10 approved)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub vote: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRef {
    #[serde(default)]
    pub commit_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    #[serde(default)]
    pub merge_commit_message: Option<String>,
}

/// Kind of change applied to one file within a PR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Edit,
    Delete,
    Other,
}

impl ChangeKind {
    /// Parse the REST API changeType string ("edit, rename" counts as edit)
    pub fn from_api(s: &str) -> Self {
        let s = s.to_ascii_lowercase();
        if s.contains("add") {
            Self::Add
        } else if s.contains("delete") {
            Self::Delete
        } else if s.contains("edit") {
            Self::Edit
        } else {
            Self::Other
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Edit => "~",
            Self::Delete => "\u{2212}",
            Self::Other => "?",
        }
    }
}

/// A single changed file within a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
}

/// Per-PR file-change totals from the commit-diff endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffCounts {
    pub add: u32,
    pub edit: u32,
    pub delete: u32,
}

impl DiffCounts {
    pub fn is_empty(&self) -> bool {
        self.add == 0 && self.edit == 0 && self.delete == 0
    }
}

impl PullRequest {
    /// Web URL of this PR
    pub fn url(&self, org: &str) -> String {
        format!(
            "{}/{}/_git/{}/pullrequest/{}",
            org, self.repository.project.name, self.repository.name, self.pull_request_id
        )
    }

    /// Source branch without the refs/heads/ prefix
    pub fn source_branch(&self) -> &str {
        branch_name(&self.source_ref_name)
    }

    /// Target branch without the refs/heads/ prefix
    pub fn target_branch(&self) -> &str {
        branch_name(&self.target_ref_name)
    }

    /// Work-item ids referenced in the description or merge commit message
    pub fn work_items(&self) -> Vec<String> {
        let re = match Regex::new(r"#(\d{5,})") {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };
        let merge_msg = self
            .completion_options
            .as_ref()
            .and_then(|o| o.merge_commit_message.as_deref())
            .unwrap_or("");
        let haystack = format!("{} {}", self.description.as_deref().unwrap_or(""), merge_msg);

        let mut items = Vec::new();
        for cap in re.captures_iter(&haystack) {
            let id = cap[1].to_string();
            if !items.contains(&id) {
                items.push(id);
            }
        }
        items
    }
}

/// Strip the refs/heads/ prefix from a ref name
pub fn branch_name(ref_name: &str) -> &str {
    ref_name.strip_prefix("refs/heads/").unwrap_or(ref_name)
}

/// Decode a PR list response, converting schema mismatches into ParseError
pub fn decode_pr_list(json: &str) -> Result<Vec<PullRequest>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
        .map_err(|e| ReportError::parse(format!("unexpected PR list shape: {}", e)))
}
