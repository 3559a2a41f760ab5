use clap::Parser;
use devops_report::activity::{SourceKind, SourceWarning};
use devops_report::aggregate::{dedupe_prs, enrich_all, PrRecord, PrSummary, TimelineSeries};
use devops_report::cli::PrReportCli;
use devops_report::config::{Config, Identity};
use devops_report::devops::az;
use devops_report::devops::rest::RestClient;
use devops_report::devops::PrStatus;
use devops_report::error::{ReportError, Result};
use devops_report::range::DateRange;
use devops_report::render::html::{self, HtmlReport};
use devops_report::usage::{map_keys_to_people, CostSeries, UsageClient};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = PrReportCli::parse();
    devops_report::init_tracing(cli.verbose);

    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: PrReportCli) -> Result<()> {
    let config = Config::load_or_default()?;
    let identity = Identity::resolve(cli.org.as_deref(), cli.user.as_deref(), &config).await?;
    let org = identity.organization.clone();
    let range = DateRange::last_days(cli.days);

    let projects = resolve_projects(&cli, &config, &org).await?;
    let creator = if cli.all {
        None
    } else {
        Some(identity.user.clone())
    };
    tracing::info!(
        "querying {} over {} ({} project{})",
        org,
        range,
        projects.len(),
        if projects.len() == 1 { "" } else { "s" }
    );

    let mut warnings: Vec<SourceWarning> = Vec::new();
    let mut prs = Vec::new();
    for project in &projects {
        for status in [PrStatus::Active, PrStatus::Completed, PrStatus::Abandoned] {
            match az::list_pull_requests(&org, project, status, creator.as_deref()).await {
                Ok(batch) => prs.extend(batch),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("{} ({}): {}", project, status, e);
                    warnings.push(SourceWarning::new(
                        SourceKind::DevOps,
                        format!("{} {} PRs skipped: {}", project, status, e),
                    ));
                }
            }
        }
    }

    let mut prs = dedupe_prs(prs);
    prs.retain(|pr| range.contains(&pr.creation_date));
    tracing::info!("{} pull requests in range", prs.len());

    let rest = if cli.no_files || prs.is_empty() {
        None
    } else {
        let token = az::access_token().await?;
        Some(Arc::new(RestClient::new(org.clone(), token)?))
    };

    let workers = cli.workers.unwrap_or(config.workers);
    let progress = rest.as_ref().map(|_| {
        let bar = ProgressBar::new(prs.len() as u64);
        bar.set_style(bar_style());
        bar
    });
    let (records, enrich_warnings) = enrich_all(prs, rest, workers, progress.clone()).await;
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    warnings.extend(enrich_warnings);

    let anthropic_key = cli
        .anthropic_key
        .clone()
        .or_else(|| config.anthropic_admin_key.clone());
    let cost = match anthropic_key {
        None => None,
        Some(key) => match build_cost_series(key, &records, range, cli.days).await {
            Ok(series) => Some(series),
            Err(e) => {
                tracing::warn!("cost section skipped: {}", e);
                warnings.push(SourceWarning::new(
                    SourceKind::Anthropic,
                    format!("cost section skipped: {}", e),
                ));
                None
            }
        },
    };

    let summary = PrSummary::from_records(&records);
    let timeline = TimelineSeries::from_records(&records, range);
    let title = if cli.all {
        "Pull Request Report — all users".to_string()
    } else {
        format!("Pull Request Report — {}", identity.user)
    };
    let page = html::render(&HtmlReport {
        title,
        subtitle: format!("{} &middot; {}", projects.join(", "), range),
        org: &org,
        records: &records,
        summary: &summary,
        timeline: &timeline,
        cost: cost.as_ref(),
        warnings: &warnings,
    });

    let output = cli.output.unwrap_or_else(|| config.output.clone());
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&output, page)?;
    println!("Report written to {}", output.display());
    Ok(())
}

async fn resolve_projects(cli: &PrReportCli, config: &Config, org: &str) -> Result<Vec<String>> {
    if let Some(list) = &cli.project {
        return Ok(list.clone());
    }
    if cli.all {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message("Listing projects...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        let projects = az::list_projects(org).await?;
        spinner.finish_with_message(format!("Found {} projects", projects.len()));
        return Ok(projects);
    }
    if let Some(project) = &config.project {
        return Ok(vec![project.clone()]);
    }
    let defaults = az::devops_defaults().await.unwrap_or_default();
    if let Some(project) = defaults.get("project") {
        return Ok(vec![project.clone()]);
    }
    Err(ReportError::config(
        "no project configured; pass --project, --all, or set project in config.toml",
    ))
}

async fn build_cost_series(
    key: String,
    records: &[PrRecord],
    range: DateRange,
    days: u32,
) -> Result<CostSeries> {
    let client = UsageClient::new(key)?;
    let keys = client.list_api_keys().await?;
    let people = map_keys_to_people(&keys, records);
    let buckets = client.usage_report(days).await?;
    Ok(CostSeries::build(&buckets, &people, records, range))
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{bar:40.cyan/blue} {pos}/{len} PRs enriched")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
