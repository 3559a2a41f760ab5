use crate::devops::{ChangeKind, DiffCounts, FileChange};
use crate::error::{ReportError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const API_VERSION: &str = "7.1";

/// Client for the DevOps REST endpoints the az CLI does not cover
/// (per-PR iteration changes and commit diff counts).
pub struct RestClient {
    org: String,
    token: String,
    http: Client,
}

impl RestClient {
    /// Create a new REST client for an organization
    pub fn new(org: String, token: String) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self { org, token, http })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ReportError::auth(format!(
                    "DevOps API rejected the access token ({})",
                    response.status()
                )));
            }
            status if !status.is_success() => {
                return Err(ReportError::network(format!(
                    "DevOps API returned {} for {}",
                    status, url
                )));
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ReportError::parse(format!("unexpected DevOps response shape: {}", e)))
    }

    /// Changed files of the last iteration of a PR
    pub async fn pr_changes(
        &self,
        project_id: &str,
        repo_id: &str,
        pr_id: u64,
    ) -> Result<Vec<FileChange>> {
        let url = format!(
            "{}/{}/_apis/git/repositories/{}/pullRequests/{}/iterations?api-version={}",
            self.org, project_id, repo_id, pr_id, API_VERSION
        );
        let iterations: IterationList = self.get_json(&url).await?;
        let last = match iterations.value.last() {
            Some(iteration) => iteration.id,
            None => return Ok(Vec::new()),
        };

        let url = format!(
            "{}/{}/_apis/git/repositories/{}/pullRequests/{}/iterations/{}/changes?api-version={}",
            self.org, project_id, repo_id, pr_id, last, API_VERSION
        );
        let changes: ChangeList = self.get_json(&url).await?;
        Ok(collect_file_changes(changes))
    }

    /// Add/edit/delete file counts between the PR merge base and source commit
    pub async fn diff_counts(
        &self,
        project_id: &str,
        repo_id: &str,
        source_commit: &str,
        target_commit: &str,
    ) -> Result<DiffCounts> {
        if source_commit.is_empty() || target_commit.is_empty() {
            return Ok(DiffCounts::default());
        }
        let url = format!(
            "{}/{}/_apis/git/repositories/{}/diffs/commits\
             ?baseVersionType=commit&baseVersion={}\
             &targetVersionType=commit&targetVersion={}&api-version={}",
            self.org, project_id, repo_id, target_commit, source_commit, API_VERSION
        );
        let diff: DiffResponse = self.get_json(&url).await?;
        Ok(DiffCounts {
            add: diff.count("Add"),
            edit: diff.count("Edit"),
            delete: diff.count("Delete"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct IterationList {
    #[serde(default)]
    value: Vec<Iteration>,
}

#[derive(Debug, Deserialize)]
struct Iteration {
    id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeList {
    #[serde(default)]
    change_entries: Vec<ChangeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeEntry {
    #[serde(default)]
    item: ChangeItem,
    #[serde(default)]
    change_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeItem {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiffResponse {
    #[serde(default)]
    change_counts: HashMap<String, u32>,
}

impl DiffResponse {
    fn count(&self, key: &str) -> u32 {
        self.change_counts.get(key).copied().unwrap_or(0)
    }
}

/// Keep file entries only; folder entries end with a slash
fn collect_file_changes(changes: ChangeList) -> Vec<FileChange> {
    changes
        .change_entries
        .into_iter()
        .filter(|c| !c.item.path.is_empty() && !c.item.path.ends_with('/'))
        .map(|c| FileChange {
            path: c.item.path,
            kind: ChangeKind::from_api(&c.change_type),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_file_changes_skips_folders() {
        let changes: ChangeList = serde_json::from_str(
            r#"{"changeEntries": [
                {"item": {"path": "/src/lib.rs"}, "changeType": "edit"},
                {"item": {"path": "/src/"}, "changeType": "add"},
                {"item": {"path": "/docs/new.md"}, "changeType": "add"}
            ]}"#,
        )
        .unwrap();
        let files = collect_file_changes(changes);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/src/lib.rs");
        assert_eq!(files[0].kind, ChangeKind::Edit);
        assert_eq!(files[1].kind, ChangeKind::Add);
    }

    #[test]
    fn test_diff_response_counts() {
        let diff: DiffResponse =
            serde_json::from_str(r#"{"changeCounts": {"Add": 3, "Edit": 5}}"#).unwrap();
        assert_eq!(diff.count("Add"), 3);
        assert_eq!(diff.count("Edit"), 5);
        assert_eq!(diff.count("Delete"), 0);
    }

    #[test]
    fn test_empty_iteration_list_decodes() {
        let iterations: IterationList = serde_json::from_str("{}").unwrap();
        assert!(iterations.value.is_empty());
    }
}
