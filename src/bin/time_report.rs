use clap::Parser;
use devops_report::cli::TimeReportCli;
use devops_report::collect::{self, CollectContext, SourceSet};
use devops_report::config::Config;
use devops_report::devops::az;
use devops_report::error::Result;
use devops_report::render::digest;

#[tokio::main]
async fn main() {
    let cli = TimeReportCli::parse();
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

async fn run(cli: TimeReportCli) -> Result<()> {
    let config = Config::load_or_default()?;
    let range = cli.resolve_range()?;
    let sources = SourceSet {
        devops: !cli.no_devops,
        claude: !cli.no_claude,
        git: !cli.no_git,
        calendar: cli.calendar,
    };

    let ctx = resolve_context(&cli, &config, &sources).await?;
    tracing::info!("collecting activity for {}", range);

    let (buckets, warnings) = collect::collect_all(&ctx, range, &sources).await;

    if cli.json {
        let doc = digest::format_json(&buckets, &warnings);
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", digest::format_text(&buckets, &warnings));
    }
    Ok(())
}

/// Resolve organization, projects and creator for the DevOps source.
/// Everything here degrades: a missing az session just means the DevOps
/// source contributes a warning instead of entries.
async fn resolve_context(
    cli: &TimeReportCli,
    config: &Config,
    sources: &SourceSet,
) -> Result<CollectContext> {
    let mut org = config.organization.clone();
    let mut projects: Vec<String> = match &cli.project {
        Some(list) => list.clone(),
        None => config.project.iter().cloned().collect(),
    };
    let mut creator = config.user.clone();

    if sources.devops {
        if org.is_none() || (projects.is_empty() && !cli.all_projects) {
            if let Ok(defaults) = az::devops_defaults().await {
                if org.is_none() {
                    org = defaults.get("organization").cloned();
                }
                if projects.is_empty() && !cli.all_projects {
                    projects.extend(defaults.get("project").cloned());
                }
            }
        }
        if cli.all_projects {
            if let Some(org) = &org {
                projects = az::list_projects(org).await?;
            }
        }
        if creator.is_none() {
            creator = az::current_user().await.ok();
        }
        if org.is_some() && projects.is_empty() {
            tracing::warn!("no DevOps project configured; use --project or --all-projects");
        }
    }

    Ok(CollectContext {
        org,
        projects,
        creator,
        history_path: config
            .claude_history
            .clone()
            .unwrap_or_else(collect::claude::default_history_path),
        repo_roots: if config.repo_roots.is_empty() {
            collect::git::default_repo_roots()
        } else {
            config.repo_roots.clone()
        },
    })
}
