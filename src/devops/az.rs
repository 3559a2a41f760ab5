use crate::devops::{decode_pr_list, PrStatus, PullRequest};
use crate::error::{ReportError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::process::Command;

/// Resource id for Azure DevOps access tokens
const DEVOPS_RESOURCE: &str = "499b84ac-1321-427f-aa17-267ca6975798";

/// Timeout for a single az invocation
const AZ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum PRs requested per project/status query
const PR_LIST_TOP: u32 = 200;

/// Run an az CLI command and return stdout.
///
/// Non-zero exits become Network errors, except recognizable sign-in
/// failures which become Auth errors.
pub async fn run_az(args: &[&str]) -> Result<String> {
    let output = tokio::time::timeout(AZ_TIMEOUT, Command::new("az").args(args).output())
        .await
        .map_err(|_| ReportError::network(format!("az {} timed out", args_summary(args))))?
        .map_err(|e| ReportError::network(format!("failed to spawn az: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let snippet: String = stderr.trim().chars().take(200).collect();
        if stderr.contains("az login") || stderr.contains("AADSTS") {
            return Err(ReportError::auth(snippet));
        }
        return Err(ReportError::network(format!(
            "az {} failed: {}",
            args_summary(args),
            snippet
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn args_summary(args: &[&str]) -> String {
    args.iter().take(4).copied().collect::<Vec<_>>().join(" ")
}

/// Read `az devops configure --list` into a key=value map
pub async fn devops_defaults() -> Result<BTreeMap<String, String>> {
    let output = run_az(&["devops", "configure", "--list"]).await?;
    Ok(parse_defaults(&output))
}

fn parse_defaults(output: &str) -> BTreeMap<String, String> {
    let mut defaults = BTreeMap::new();
    for line in output.lines() {
        if line.starts_with('[') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            defaults.insert(key.trim().to_string(), val.trim().to_string());
        }
    }
    defaults
}

/// Email of the currently signed-in az account
pub async fn current_user() -> Result<String> {
    let user = run_az(&["account", "show", "--query", "user.name", "-o", "tsv"]).await?;
    if user.is_empty() {
        return Err(ReportError::auth("no signed-in az account".to_string()));
    }
    Ok(user)
}

/// Bearer token for the DevOps REST API
pub async fn access_token() -> Result<String> {
    let token = run_az(&[
        "account",
        "get-access-token",
        "--resource",
        DEVOPS_RESOURCE,
        "--query",
        "accessToken",
        "-o",
        "tsv",
    ])
    .await?;
    if token.is_empty() {
        return Err(ReportError::auth("empty access token".to_string()));
    }
    Ok(token)
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    #[serde(default)]
    value: Vec<ProjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    name: String,
}

/// List all project names in the organization
pub async fn list_projects(org: &str) -> Result<Vec<String>> {
    let output = run_az(&[
        "devops", "project", "list", "--org", org, "-o", "json", "--top", "500",
    ])
    .await?;
    if output.is_empty() {
        return Ok(Vec::new());
    }
    let list: ProjectList = serde_json::from_str(&output)
        .map_err(|e| ReportError::parse(format!("unexpected project list shape: {}", e)))?;
    Ok(list.value.into_iter().map(|p| p.name).collect())
}

/// Fetch PRs for one project and status, optionally filtered by creator
pub async fn list_pull_requests(
    org: &str,
    project: &str,
    status: PrStatus,
    creator: Option<&str>,
) -> Result<Vec<PullRequest>> {
    let top = PR_LIST_TOP.to_string();
    let status = status.to_string();
    let mut args = vec![
        "repos", "pr", "list", "--status", &status, "--top", &top, "--org", org, "--project",
        project, "-o", "json",
    ];
    if let Some(creator) = creator {
        args.push("--creator");
        args.push(creator);
    }
    let output = run_az(&args).await?;
    decode_pr_list(&output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let output = "[defaults]\norganization = https://dev.azure.com/contoso\nproject = TeamPlanner";
        let defaults = parse_defaults(output);
        assert_eq!(
            defaults.get("organization").map(String::as_str),
            Some("https://dev.azure.com/contoso")
        );
        assert_eq!(defaults.get("project").map(String::as_str), Some("TeamPlanner"));
        assert_eq!(defaults.len(), 2);
    }

    #[test]
    fn test_parse_defaults_ignores_sections_and_noise() {
        let defaults = parse_defaults("[core]\nno separator here\nkey = value");
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults.get("key").map(String::as_str), Some("value"));
    }

    #[test]
    fn test_args_summary_truncates() {
        assert_eq!(
            args_summary(&["repos", "pr", "list", "--status", "active"]),
            "repos pr list --status"
        );
    }
}
