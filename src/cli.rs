use crate::error::{ReportError, Result};
use crate::range::DateRange;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pr-report")]
#[command(author, version)]
#[command(
    about = "Generate an HTML pull-request report from Azure DevOps",
    long_about = "pr-report queries Azure DevOps for pull requests via the az CLI and the \
                  REST API, enriches them with changed files and diff statistics, and \
                  writes a self-contained HTML report. Optionally it overlays Anthropic \
                  API spend against PR output."
)]
pub struct PrReportCli {
    /// Filter PRs by creator email (default: the signed-in az user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Comma-separated project names (default: configured project)
    #[arg(short, long, value_delimiter = ',')]
    pub project: Option<Vec<String>>,

    /// Number of days to look back
    #[arg(short, long, default_value_t = 30)]
    pub days: u32,

    /// Include PRs from all users and all projects in the organization
    #[arg(long)]
    pub all: bool,

    /// Organization URL, e.g. https://dev.azure.com/contoso
    #[arg(long)]
    pub org: Option<String>,

    /// Output file path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip per-PR file and diff enrichment (much faster)
    #[arg(long)]
    pub no_files: bool,

    /// Number of concurrent enrichment requests (default from config, else 6)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Anthropic admin API key for the cost section
    #[arg(long, env = "ANTHROPIC_ADMIN_KEY", hide_env_values = true)]
    pub anthropic_key: Option<String>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl PrReportCli {
    /// Validate argument combinations before doing any network work
    pub fn validate(&self) -> Result<()> {
        if self.days == 0 {
            return Err(ReportError::config("--days must be at least 1"));
        }
        if self.workers == Some(0) {
            return Err(ReportError::config("--workers must be at least 1"));
        }
        if self.all && self.user.is_some() {
            return Err(ReportError::config(
                "--all includes every user; drop --user or drop --all",
            ));
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(name = "time-report")]
#[command(author, version)]
#[command(
    about = "Per-day digest of development activity",
    long_about = "time-report assembles a per-day digest from Azure DevOps pull requests, \
                  Claude Code session history, local git commits and (optionally) the \
                  MS365 calendar, and prints it as text or JSON."
)]
pub struct TimeReportCli {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// End date (YYYY-MM-DD, defaults to today when --from is given)
    #[arg(long)]
    pub to: Option<String>,

    /// Report a single day (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// Number of days to look back when no explicit dates are given
    #[arg(short, long, default_value_t = 14)]
    pub days: u32,

    /// Comma-separated DevOps project names to collect from
    #[arg(short, long, value_delimiter = ',')]
    pub project: Option<Vec<String>>,

    /// Collect PRs from every project in the organization
    #[arg(long)]
    pub all_projects: bool,

    /// Include MS365 calendar events (requires Calendars.Read consent)
    #[arg(long)]
    pub calendar: bool,

    /// Skip the Azure DevOps source
    #[arg(long)]
    pub no_devops: bool,

    /// Skip the Claude Code history source
    #[arg(long)]
    pub no_claude: bool,

    /// Skip the local git source
    #[arg(long)]
    pub no_git: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl TimeReportCli {
    /// Validate argument combinations
    pub fn validate(&self) -> Result<()> {
        if self.date.is_some() && (self.from.is_some() || self.to.is_some()) {
            return Err(ReportError::config(
                "--date cannot be combined with --from/--to",
            ));
        }
        if self.to.is_some() && self.from.is_none() {
            return Err(ReportError::config("--to requires --from"));
        }
        if self.days == 0 {
            return Err(ReportError::config("--days must be at least 1"));
        }
        if self.project.is_some() && self.all_projects {
            return Err(ReportError::config(
                "--all-projects includes every project; drop --project",
            ));
        }
        Ok(())
    }

    /// Resolve the reporting range from --date, --from/--to or --days
    pub fn resolve_range(&self) -> Result<DateRange> {
        if let Some(date) = &self.date {
            return Ok(DateRange::single_day(DateRange::parse_date(date)?));
        }
        if let Some(from) = &self.from {
            let from = DateRange::parse_date(from)?;
            let to = match &self.to {
                Some(to) => DateRange::parse_date(to)?,
                None => chrono::Utc::now().date_naive(),
            };
            return DateRange::new(from, to);
        }
        Ok(DateRange::last_days(self.days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_pr_report_defaults() {
        let cli = PrReportCli::parse_from(vec!["pr-report"]);
        assert_eq!(cli.days, 30);
        assert!(cli.workers.is_none());
        assert!(!cli.all);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_pr_report_project_list() {
        let cli = PrReportCli::parse_from(vec!["pr-report", "--project", "Planner,Infra"]);
        assert_eq!(
            cli.project,
            Some(vec!["Planner".to_string(), "Infra".to_string()])
        );
    }

    #[test]
    fn test_pr_report_all_conflicts_with_user() {
        let cli = PrReportCli::parse_from(vec!["pr-report", "--all", "--user", "a@b.com"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_pr_report_zero_workers_rejected() {
        let cli = PrReportCli::parse_from(vec!["pr-report", "--workers", "0"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_time_report_defaults() {
        let cli = TimeReportCli::parse_from(vec!["time-report"]);
        assert_eq!(cli.days, 14);
        assert!(!cli.json);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.resolve_range().unwrap().len_days(), 15);
    }

    #[test]
    fn test_time_report_single_date() {
        let cli = TimeReportCli::parse_from(vec!["time-report", "--date", "2026-02-11"]);
        let range = cli.resolve_range().unwrap();
        assert_eq!(range.len_days(), 1);
        assert_eq!(
            range.from,
            NaiveDate::parse_from_str("2026-02-11", "%Y-%m-%d").unwrap()
        );
    }

    #[test]
    fn test_time_report_explicit_range() {
        let cli = TimeReportCli::parse_from(vec![
            "time-report",
            "--from",
            "2026-02-01",
            "--to",
            "2026-02-07",
        ]);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.resolve_range().unwrap().len_days(), 7);
    }

    #[test]
    fn test_time_report_project_list() {
        let cli = TimeReportCli::parse_from(vec!["time-report", "--project", "Planner,Billing"]);
        assert_eq!(
            cli.project,
            Some(vec!["Planner".to_string(), "Billing".to_string()])
        );
    }

    #[test]
    fn test_time_report_date_conflicts_with_range() {
        let cli = TimeReportCli::parse_from(vec![
            "time-report",
            "--date",
            "2026-02-11",
            "--from",
            "2026-02-01",
        ]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_time_report_to_requires_from() {
        let cli = TimeReportCli::parse_from(vec!["time-report", "--to", "2026-02-07"]);
        assert!(cli.validate().is_err());
    }
}
