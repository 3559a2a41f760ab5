use crate::activity::ActivityEntry;
use crate::devops::az;
use crate::devops::PrStatus;
use crate::error::Result;
use crate::range::DateRange;
use chrono::NaiveDate;

const STATUSES: [PrStatus; 3] = [PrStatus::Completed, PrStatus::Active, PrStatus::Abandoned];

/// Collect per-day PR activity for the given projects.
///
/// A PR created in range yields a `pr_created` entry on its creation day;
/// a PR closed in range on a *different* day additionally yields a
/// `pr_completed` entry. A failing project/status query degrades to an
/// empty batch; a fatal (auth) failure aborts the whole source.
pub async fn collect(
    org: &str,
    projects: &[String],
    creator: Option<&str>,
    range: DateRange,
) -> Result<Vec<(NaiveDate, ActivityEntry)>> {
    let mut entries = Vec::new();

    for project in projects {
        for status in STATUSES {
            let prs = match az::list_pull_requests(org, project, status, creator).await {
                Ok(prs) => prs,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("DevOps: {} ({}) fetch failed: {}", project, status, e);
                    continue;
                }
            };

            for pr in prs {
                let created_day = pr.creation_date.date_naive();
                if range.contains(&pr.creation_date) {
                    entries.push((
                        created_day,
                        ActivityEntry::PrCreated {
                            project: project.clone(),
                            repo: pr.repository.name.clone(),
                            pr_id: pr.pull_request_id,
                            title: pr.title.clone(),
                            status: pr.status.to_string(),
                            target: pr.target_branch().to_string(),
                        },
                    ));
                }

                if let Some(closed) = pr.closed_date {
                    let closed_day = closed.date_naive();
                    if range.contains(&closed) && closed_day != created_day {
                        entries.push((
                            closed_day,
                            ActivityEntry::PrCompleted {
                                project: project.clone(),
                                repo: pr.repository.name.clone(),
                                pr_id: pr.pull_request_id,
                                title: pr.title.clone(),
                                target: pr.target_branch().to_string(),
                            },
                        ));
                    }
                }
            }
        }
    }

    Ok(entries)
}
