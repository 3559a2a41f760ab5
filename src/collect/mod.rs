pub mod calendar;
pub mod claude;
pub mod devops;
pub mod git;

use crate::activity::{DayBuckets, SourceKind, SourceWarning};
use crate::range::DateRange;
use std::path::PathBuf;

/// Which sources a run is allowed to consult.
///
/// Flags like --no-git map here once, so the aggregation below never
/// branches on individual CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct SourceSet {
    pub devops: bool,
    pub claude: bool,
    pub git: bool,
    pub calendar: bool,
}

impl SourceSet {
    pub fn enabled(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::DevOps => self.devops,
            SourceKind::Claude => self.claude,
            SourceKind::Git => self.git,
            SourceKind::Calendar => self.calendar,
            // Usage data is a pr-report concern, never a digest source
            SourceKind::Anthropic => false,
        }
    }
}

impl Default for SourceSet {
    fn default() -> Self {
        Self {
            devops: true,
            claude: true,
            git: true,
            calendar: false,
        }
    }
}

/// Everything a time-report collection run needs, resolved up front
#[derive(Debug, Clone)]
pub struct CollectContext {
    /// DevOps organization URL, if one is configured
    pub org: Option<String>,
    /// Projects to scan for PR activity
    pub projects: Vec<String>,
    /// Creator email filter (the signed-in user)
    pub creator: Option<String>,
    /// Claude Code history file
    pub history_path: PathBuf,
    /// Directories scanned for git repositories
    pub repo_roots: Vec<PathBuf>,
}

/// Run every enabled collector and merge the results into day buckets.
///
/// Source-processing order is fixed (PR, CODE, GIT, CAL) so insertion
/// order within a day is stable. A failing source contributes nothing
/// and leaves a warning; it never aborts the others.
pub async fn collect_all(
    ctx: &CollectContext,
    range: DateRange,
    sources: &SourceSet,
) -> (DayBuckets, Vec<SourceWarning>) {
    let mut buckets = DayBuckets::new(range);
    let mut warnings = Vec::new();

    if sources.enabled(SourceKind::DevOps) {
        match &ctx.org {
            None => {
                tracing::warn!("DevOps: no organization configured, skipping");
                warnings.push(SourceWarning::new(
                    SourceKind::DevOps,
                    "no organization configured, source skipped",
                ));
            }
            Some(org) => {
                match devops::collect(org, &ctx.projects, ctx.creator.as_deref(), range).await {
                    Ok(entries) => buckets.extend(entries),
                    Err(e) => {
                        tracing::warn!("DevOps: {}", e);
                        warnings.push(SourceWarning::new(SourceKind::DevOps, e.to_string()));
                    }
                }
            }
        }
    }

    if sources.enabled(SourceKind::Claude) {
        match claude::collect(&ctx.history_path, range) {
            Ok(entries) => buckets.extend(entries),
            Err(e) => {
                tracing::warn!("Claude: {}", e);
                warnings.push(SourceWarning::new(SourceKind::Claude, e.to_string()));
            }
        }
    }

    if sources.enabled(SourceKind::Git) {
        match git::collect(&ctx.repo_roots, range) {
            Ok(entries) => buckets.extend(entries),
            Err(e) => {
                tracing::warn!("Git: {}", e);
                warnings.push(SourceWarning::new(SourceKind::Git, e.to_string()));
            }
        }
    }

    if sources.enabled(SourceKind::Calendar) {
        match calendar::collect(range).await {
            Ok(entries) => buckets.extend(entries),
            Err(e) => {
                tracing::warn!("Calendar: {}", e);
                tracing::warn!(
                    "Tip: run az login --scope \"https://graph.microsoft.com/Calendars.Read\""
                );
                warnings.push(SourceWarning::new(SourceKind::Calendar, e.to_string()));
            }
        }
    }

    (buckets, warnings)
}
