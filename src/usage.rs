use crate::aggregate::PrRecord;
use crate::error::{ReportError, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

const API_BASE: &str = "https://api.anthropic.com/v1/organizations";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Per-million token pricing (USD): input, cache read, cache write, output
const MODEL_PRICING: [(&str, [f64; 4]); 3] = [
    ("claude-opus-4", [15.00, 1.50, 18.75, 75.00]),
    ("claude-sonnet-4", [3.00, 0.30, 3.75, 15.00]),
    ("claude-haiku-4", [0.80, 0.08, 1.00, 4.00]),
];
const DEFAULT_PRICING: [f64; 4] = [3.00, 0.30, 3.75, 15.00];

/// Client for the Anthropic admin API (key listing + usage report)
pub struct UsageClient {
    api_key: String,
    http: Client,
}

/// One daily usage bucket, grouped by api_key_id and model
#[derive(Debug, Clone, Deserialize)]
pub struct UsageBucket {
    #[serde(default)]
    pub starting_at: String,
    #[serde(default)]
    pub results: Vec<UsageResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageResult {
    #[serde(default)]
    pub api_key_id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub uncached_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation: CacheCreation,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheCreation {
    #[serde(default)]
    pub ephemeral_5m_input_tokens: u64,
    #[serde(default)]
    pub ephemeral_1h_input_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiKey {
    id: String,
    name: String,
}

/// A person inferred from API key names, optionally matched to a PR author
#[derive(Debug, Clone)]
pub struct Person {
    pub display_name: String,
    pub key_ids: BTreeSet<String>,
    pub email: Option<String>,
}

impl UsageClient {
    pub fn new(api_key: String) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self { api_key, http })
    }

    async fn get_page<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        let response = self
            .http
            .get(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ReportError::auth(format!(
                "Anthropic admin API rejected the key ({})",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(ReportError::network(format!(
                "Anthropic API error {}: {}",
                status, snippet
            )));
        }

        response
            .json::<Page<T>>()
            .await
            .map_err(|e| ReportError::parse(format!("unexpected Anthropic response shape: {}", e)))
    }

    /// Fetch all API keys as an id -> name mapping
    pub async fn list_api_keys(&self) -> Result<BTreeMap<String, String>> {
        let mut keys = BTreeMap::new();
        let mut url = format!("{}/api_keys?limit=100", API_BASE);
        loop {
            let page: Page<ApiKey> = self.get_page(&url).await?;
            for key in page.data {
                keys.insert(key.id, key.name);
            }
            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => {
                    url = format!("{}/api_keys?limit=100&after_id={}", API_BASE, last_id);
                }
                _ => break,
            }
        }
        Ok(keys)
    }

    /// Fetch daily usage buckets for the last N days, grouped by key and model
    pub async fn usage_report(&self, days: u32) -> Result<Vec<UsageBucket>> {
        let end = chrono::Utc::now();
        let start = end - chrono::Duration::days(days as i64);
        let base = format!(
            "{}/usage_report/messages\
             ?starting_at={}T00:00:00Z&ending_at={}T23:59:59Z\
             &bucket_width=1d&group_by[]=api_key_id&group_by[]=model&limit=31",
            API_BASE,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let mut buckets = Vec::new();
        let mut url = base.clone();
        loop {
            let page: Page<UsageBucket> = self.get_page(&url).await?;
            buckets.extend(page.data);
            match (page.has_more, page.next_page) {
                (true, Some(next)) => url = format!("{}&page={}", base, next),
                _ => break,
            }
        }
        Ok(buckets)
    }
}

fn pricing_for(model: &str) -> [f64; 4] {
    let model = model.to_ascii_lowercase();
    MODEL_PRICING
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, pricing)| *pricing)
        .unwrap_or(DEFAULT_PRICING)
}

/// USD cost of one usage result, by the model's per-token pricing
pub fn cost_usd(result: &UsageResult) -> f64 {
    let [input, cache_read, cache_write, output] = pricing_for(&result.model);
    let cache_written =
        result.cache_creation.ephemeral_5m_input_tokens + result.cache_creation.ephemeral_1h_input_tokens;
    (result.uncached_input_tokens as f64 * input
        + result.cache_read_input_tokens as f64 * cache_read
        + cache_written as f64 * cache_write
        + result.output_tokens as f64 * output)
        / 1_000_000.0
}

/// Total cost across every bucket
pub fn total_cost(buckets: &[UsageBucket]) -> f64 {
    buckets
        .iter()
        .flat_map(|b| b.results.iter())
        .map(cost_usd)
        .sum()
}

/// Extract user initials from an API key name.
///
/// Handles `claude_code_key_alice_xxxx`, `alice-my-org`, `bob_key` and
/// short bare names; anything else is truncated to ten characters.
pub fn user_from_key_name(name: &str) -> String {
    let name = name.trim().to_ascii_lowercase();

    if let Ok(re) = Regex::new(r"^claude_code_key_([a-z]+)_") {
        if let Some(cap) = re.captures(&name) {
            return cap[1].to_string();
        }
    }
    if let Ok(re) = Regex::new(r"^([a-z]{2,6})[-_]") {
        if let Some(cap) = re.captures(&name) {
            return cap[1].to_string();
        }
    }
    if let Ok(re) = Regex::new(r"^[a-z]{2,6}$") {
        if re.is_match(&name) {
            return name;
        }
    }
    name.chars().take(10).collect()
}

/// Map API key ids to people by matching extracted initials against PR
/// author email prefixes.
pub fn map_keys_to_people(
    key_map: &BTreeMap<String, String>,
    records: &[PrRecord],
) -> BTreeMap<String, Person> {
    let mut user_keys: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (key_id, key_name) in key_map {
        user_keys
            .entry(user_from_key_name(key_name))
            .or_default()
            .insert(key_id.clone());
    }

    // email prefix -> (email, display name)
    let mut email_map: BTreeMap<String, (String, String)> = BTreeMap::new();
    for record in records {
        let email = &record.pr.created_by.unique_name;
        if email.is_empty() {
            continue;
        }
        let prefix = email
            .split('@')
            .next()
            .unwrap_or(email)
            .to_ascii_lowercase();
        email_map.insert(prefix, (email.clone(), record.pr.created_by.display_name.clone()));
    }

    user_keys
        .into_iter()
        .map(|(initials, key_ids)| {
            let (display_name, email) = match email_map.get(&initials) {
                Some((email, name)) => (name.clone(), Some(email.clone())),
                None => (initials.to_ascii_uppercase(), None),
            };
            (
                initials,
                Person {
                    display_name,
                    key_ids,
                    email,
                },
            )
        })
        .collect()
}

/// Per-person cost/output summary row for the report table
#[derive(Debug, Clone)]
pub struct PersonSummary {
    pub initials: String,
    pub display_name: String,
    pub cost: f64,
    pub prs: usize,
    pub pct_of_total: f64,
    pub cost_per_pr: f64,
}

/// Daily cost and PR-output series over the report range, joined by date
#[derive(Debug, Clone)]
pub struct CostSeries {
    pub dates: Vec<chrono::NaiveDate>,
    pub cost_per_day: Vec<f64>,
    pub prs_per_day: Vec<u32>,
    pub persons: Vec<PersonSummary>,
    pub grand_total: f64,
}

impl CostSeries {
    pub fn build(
        buckets: &[UsageBucket],
        people: &BTreeMap<String, Person>,
        records: &[PrRecord],
        range: crate::range::DateRange,
    ) -> Self {
        let dates: Vec<chrono::NaiveDate> = range.days().collect();
        let index_of = |date: chrono::NaiveDate| dates.iter().position(|d| *d == date);

        let mut key_to_person: BTreeMap<&str, &str> = BTreeMap::new();
        for (initials, person) in people {
            for key_id in &person.key_ids {
                key_to_person.insert(key_id, initials);
            }
        }

        let mut cost_per_day = vec![0.0; dates.len()];
        let mut person_cost: BTreeMap<String, f64> = BTreeMap::new();
        for bucket in buckets {
            let Ok(date) =
                chrono::NaiveDate::parse_from_str(bucket.starting_at.get(..10).unwrap_or(""), "%Y-%m-%d")
            else {
                continue;
            };
            for result in &bucket.results {
                let cost = cost_usd(result);
                if cost <= 0.0 {
                    continue;
                }
                if let Some(idx) = index_of(date) {
                    cost_per_day[idx] += cost;
                }
                let initials = key_to_person
                    .get(result.api_key_id.as_str())
                    .copied()
                    .unwrap_or("_other");
                *person_cost.entry(initials.to_string()).or_insert(0.0) += cost;
            }
        }

        let mut prs_per_day = vec![0u32; dates.len()];
        let mut person_prs: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            if let Some(idx) = index_of(record.pr.creation_date.date_naive()) {
                prs_per_day[idx] += 1;
            }
            let prefix = record
                .pr
                .created_by
                .unique_name
                .split('@')
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            let initials = if people.contains_key(&prefix) {
                prefix
            } else {
                "_other".to_string()
            };
            *person_prs.entry(initials).or_insert(0) += 1;
        }

        let grand_total: f64 = cost_per_day.iter().sum();
        let mut persons: Vec<PersonSummary> = person_cost
            .keys()
            .chain(person_prs.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|initials| {
                let cost = person_cost.get(initials).copied().unwrap_or(0.0);
                let prs = person_prs.get(initials).copied().unwrap_or(0);
                let display_name = people
                    .get(initials)
                    .map(|p| p.display_name.clone())
                    .unwrap_or_else(|| initials.to_ascii_uppercase());
                PersonSummary {
                    initials: initials.clone(),
                    display_name,
                    cost,
                    prs,
                    pct_of_total: if grand_total > 0.0 {
                        cost / grand_total * 100.0
                    } else {
                        0.0
                    },
                    cost_per_pr: cost / prs.max(1) as f64,
                }
            })
            .collect();
        persons.sort_by(|a, b| b.cost.partial_cmp(&a.cost).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            dates,
            cost_per_day,
            prs_per_day,
            persons,
            grand_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devops::decode_pr_list;

    #[test]
    fn test_pricing_lookup() {
        assert_eq!(pricing_for("claude-opus-4-20260101")[0], 15.00);
        assert_eq!(pricing_for("claude-haiku-4")[3], 4.00);
        assert_eq!(pricing_for("some-future-model"), DEFAULT_PRICING);
    }

    #[test]
    fn test_cost_computation() {
        let result = UsageResult {
            model: "claude-sonnet-4-20260101".to_string(),
            uncached_input_tokens: 1_000_000,
            cache_read_input_tokens: 1_000_000,
            output_tokens: 1_000_000,
            cache_creation: CacheCreation {
                ephemeral_5m_input_tokens: 500_000,
                ephemeral_1h_input_tokens: 500_000,
            },
            ..Default::default()
        };
        // 3.00 + 0.30 + 3.75 + 15.00
        let cost = cost_usd(&result);
        assert!((cost - 22.05).abs() < 1e-9);
    }

    #[test]
    fn test_user_from_key_name_patterns() {
        assert_eq!(user_from_key_name("claude_code_key_alice_x9f2"), "alice");
        assert_eq!(user_from_key_name("alice-my-org"), "alice");
        assert_eq!(user_from_key_name("bob_key"), "bob");
        assert_eq!(user_from_key_name("carol"), "carol");
        assert_eq!(user_from_key_name("SomeVeryLongKeyName"), "someverylo");
    }

    #[test]
    fn test_map_keys_matches_pr_authors() {
        let mut key_map = BTreeMap::new();
        key_map.insert("k1".to_string(), "claude_code_key_alice_x1".to_string());
        key_map.insert("k2".to_string(), "alice-backup".to_string());
        key_map.insert("k3".to_string(), "zed-key".to_string());

        let records: Vec<PrRecord> = decode_pr_list(
            r#"[{
                "pullRequestId": 1,
                "title": "t",
                "status": "active",
                "creationDate": "2026-02-03T10:00:00Z",
                "createdBy": {"displayName": "Alice Veen", "uniqueName": "alice@contoso.com"},
                "repository": {"id": "r", "name": "api", "project": {"id": "p", "name": "Planner"}}
            }]"#,
        )
        .unwrap()
        .into_iter()
        .map(PrRecord::bare)
        .collect();

        let people = map_keys_to_people(&key_map, &records);
        let alice = &people["alice"];
        assert_eq!(alice.display_name, "Alice Veen");
        assert_eq!(alice.email.as_deref(), Some("alice@contoso.com"));
        assert_eq!(alice.key_ids.len(), 2);

        let zed = &people["zed"];
        assert_eq!(zed.display_name, "ZED");
        assert!(zed.email.is_none());
    }

    #[test]
    fn test_cost_series_joins_by_date() {
        use crate::range::DateRange;
        use chrono::NaiveDate;

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 7).unwrap(),
        )
        .unwrap();

        let buckets = vec![UsageBucket {
            starting_at: "2026-02-03T00:00:00Z".to_string(),
            results: vec![UsageResult {
                api_key_id: "k1".to_string(),
                model: "claude-sonnet-4".to_string(),
                output_tokens: 1_000_000,
                ..Default::default()
            }],
        }];

        let records: Vec<PrRecord> = decode_pr_list(
            r#"[{
                "pullRequestId": 1,
                "title": "t",
                "status": "active",
                "creationDate": "2026-02-03T10:00:00Z",
                "createdBy": {"displayName": "Alice", "uniqueName": "alice@contoso.com"},
                "repository": {"id": "r", "name": "api", "project": {"id": "p", "name": "Planner"}}
            }]"#,
        )
        .unwrap()
        .into_iter()
        .map(PrRecord::bare)
        .collect();

        let mut key_map = BTreeMap::new();
        key_map.insert("k1".to_string(), "alice-key".to_string());
        let people = map_keys_to_people(&key_map, &records);

        let series = CostSeries::build(&buckets, &people, &records, range);
        assert_eq!(series.dates.len(), 7);
        assert!((series.cost_per_day[2] - 15.0).abs() < 1e-9);
        assert_eq!(series.prs_per_day[2], 1);
        assert!((series.grand_total - 15.0).abs() < 1e-9);
        assert_eq!(series.persons[0].initials, "alice");
        assert_eq!(series.persons[0].prs, 1);
    }
}
