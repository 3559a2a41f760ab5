use crate::activity::SourceWarning;
use crate::aggregate::{PrRecord, PrSummary, TimelineSeries};
use crate::devops::PrStatus;
use crate::render::{days_ago, escape_html, escape_js, format_date};
use crate::usage::CostSeries;
use chrono::Utc;
use serde_json::json;

const USER_COLORS: [&str; 10] = [
    "#58a6ff", "#3fb950", "#d29922", "#f85149", "#bc8cff", "#f778ba", "#79c0ff", "#56d364",
    "#e3b341", "#ff7b72",
];

/// Everything the HTML renderer needs; rendering itself does no I/O.
pub struct HtmlReport<'a> {
    pub title: String,
    pub subtitle: String,
    pub org: &'a str,
    pub records: &'a [PrRecord],
    pub summary: &'a PrSummary,
    pub timeline: &'a TimelineSeries,
    pub cost: Option<&'a CostSeries>,
    pub warnings: &'a [SourceWarning],
}

/// Render the full self-contained HTML document. Chart data is embedded
/// inline, so the file has no network dependency at view time.
pub fn render(report: &HtmlReport) -> String {
    let now = Utc::now().format("%b %d, %Y %H:%M UTC");
    let summary = report.summary;

    let cards: String = report.records.iter().map(|r| pr_card(r, report.org)).collect();
    let cards = if cards.is_empty() {
        r#"<div class="empty-state">No pull requests found for this period.</div>"#.to_string()
    } else {
        cards
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
<div class="container">
    <h1>{title}</h1>
    <p class="subtitle">{subtitle} &middot; generated {now}</p>
{stats}
{cost}
{timeline}
{comparison}
{warnings}
    <div class="filter-bar">
{filters}
    </div>
    <div id="pr-count"></div>
    <div id="pr-list">
{cards}
    </div>
    <div class="footer">
        Generated by pr-report &middot; Azure DevOps &middot; {org}
    </div>
</div>
<script>
{filter_js}
{timeline_js}
</script>
</body>
</html>"#,
        title = escape_html(&report.title),
        subtitle = report.subtitle,
        now = now,
        css = CSS,
        stats = stats_grid(summary),
        cost = report.cost.map(cost_section).unwrap_or_default(),
        timeline = timeline_section(report.timeline),
        comparison = comparison_section(report.records, summary),
        warnings = warnings_section(report.warnings),
        filters = filter_bar(report.records, summary),
        cards = cards,
        org = escape_html(report.org),
        filter_js = filter_js(summary.total),
        timeline_js = timeline_js(report.timeline),
    )
}

fn stats_grid(summary: &PrSummary) -> String {
    let card = |number: String, label: &str, style: &str| {
        format!(
            r#"<div class="stat-card"><div class="number"{style}>{number}</div><div class="label">{label}</div></div>"#
        )
    };
    format!(
        r#"    <div class="stats-grid">
{}{}{}{}{}{}    </div>"#,
        card(summary.total.to_string(), "Total PRs", ""),
        card(
            summary.completed.to_string(),
            "Completed",
            r#" style="color:var(--green)""#
        ),
        card(
            summary.active.to_string(),
            "Active",
            r#" style="color:var(--blue)""#
        ),
        card(summary.files_changed.to_string(), "Files Changed", ""),
        card(summary.contributors().to_string(), "Contributors", ""),
        card(summary.projects.len().to_string(), "Projects", ""),
    )
}

fn status_badge(status: PrStatus) -> String {
    let color = match status {
        PrStatus::Active => "#0078d4",
        PrStatus::Completed => "#107c10",
        PrStatus::Abandoned => "#a80000",
        PrStatus::Unknown => "#666",
    };
    format!(r#"<span class="badge" style="background:{}">{}</span>"#, color, status)
}

fn pr_card(record: &PrRecord, org: &str) -> String {
    let pr = &record.pr;

    let files_html = if record.files.is_empty() {
        String::new()
    } else {
        let rows: String = record
            .files
            .iter()
            .map(|f| {
                let cls = match f.kind {
                    crate::devops::ChangeKind::Add => "file-add",
                    crate::devops::ChangeKind::Edit => "file-edit",
                    crate::devops::ChangeKind::Delete => "file-delete",
                    crate::devops::ChangeKind::Other => "",
                };
                format!(
                    r#"<tr><td class="file-change {}">{}</td><td class="file-path">{}</td></tr>"#,
                    cls,
                    f.kind.icon(),
                    escape_html(&f.path)
                )
            })
            .collect();
        let n = record.files.len();
        format!(
            r#"<details class="files-section"><summary>{} file{} changed</summary><table class="file-table">{}</table></details>"#,
            n,
            if n == 1 { "" } else { "s" },
            rows
        )
    };

    let mut stat_parts = Vec::new();
    if record.diff.add > 0 {
        stat_parts.push(format!(
            r#"<span class="stat-add">+{} added</span>"#,
            record.diff.add
        ));
    }
    if record.diff.edit > 0 {
        stat_parts.push(format!(
            r#"<span class="stat-edit">~{} modified</span>"#,
            record.diff.edit
        ));
    }
    if record.diff.delete > 0 {
        stat_parts.push(format!(
            r#"<span class="stat-del">&#8722;{} deleted</span>"#,
            record.diff.delete
        ));
    }

    let reviewers_html = if pr.reviewers.is_empty() {
        String::new()
    } else {
        let items: String = pr
            .reviewers
            .iter()
            .map(|r| {
                let (icon, cls) = match r.vote {
                    10 => ("&#10003;", "vote-approved"),
                    5 => ("&#10003;", "vote-approved-suggest"),
                    -5 => ("&#8265;", "vote-wait"),
                    -10 => ("&#10007;", "vote-rejected"),
                    _ => ("&#8226;", "vote-none"),
                };
                format!(
                    r#"<span class="reviewer {}" title="vote: {}">{} {}</span>"#,
                    cls,
                    r.vote,
                    icon,
                    escape_html(&r.display_name)
                )
            })
            .collect();
        format!(r#"<div class="reviewers">{}</div>"#, items)
    };

    let desc_html = match pr.description.as_deref() {
        None | Some("") => String::new(),
        Some(desc) => {
            let truncated: String = desc.chars().take(400).collect();
            let suffix = if desc.chars().count() > 400 { "..." } else { "" };
            format!(
                r#"<div class="pr-desc">{}{}</div>"#,
                escape_html(&truncated),
                suffix
            )
        }
    };

    let work_items = pr.work_items();
    let wi_html = if work_items.is_empty() {
        String::new()
    } else {
        let ids: Vec<String> = work_items.iter().map(|w| format!("#{}", w)).collect();
        format!(
            r#"<div class="work-items">Work items: {}</div>"#,
            ids.join(", ")
        )
    };

    let closed_span = match &pr.closed_date {
        Some(closed) => format!(
            "<span>Closed: {} ({})</span>",
            format_date(closed),
            days_ago(closed)
        ),
        None => String::new(),
    };

    format!(
        r#"
    <div class="pr-card" data-status="{status}" data-repo="{repo}" data-user="{user}" data-project="{project}">
        <div class="pr-header">
            <a href="{url}" target="_blank" class="pr-title">{title}</a>
            <div class="pr-meta">
                {badge}
                <span class="pr-id">#{id}</span>
                <span class="pr-repo">{repo}</span>
                <span class="pr-creator">{creator}</span>
            </div>
        </div>
        <div class="pr-details">
            <div class="pr-branches">
                <code>{source}</code> &rarr; <code>{target}</code>
            </div>
            <div class="pr-dates">
                <span>Created: {created} ({created_ago})</span>
                {closed_span}
            </div>
            {reviewers}
            {desc}
            {work_items}
            <div class="pr-stats">{stats}</div>
            {files}
        </div>
    </div>"#,
        status = pr.status,
        repo = escape_html(&pr.repository.name),
        user = escape_html(&pr.created_by.unique_name),
        project = escape_html(&pr.repository.project.name),
        url = escape_html(&pr.url(org)),
        title = escape_html(&pr.title),
        badge = status_badge(pr.status),
        id = pr.pull_request_id,
        creator = escape_html(&pr.created_by.display_name),
        source = escape_html(pr.source_branch()),
        target = escape_html(pr.target_branch()),
        created = format_date(&pr.creation_date),
        created_ago = days_ago(&pr.creation_date),
        closed_span = closed_span,
        reviewers = reviewers_html,
        desc = desc_html,
        work_items = wi_html,
        stats = stat_parts.join(" "),
        files = files_html,
    )
}

fn cost_section(cost: &CostSeries) -> String {
    let total_prs: u32 = cost.prs_per_day.iter().sum();
    let rows: String = cost
        .persons
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let color = USER_COLORS[i % USER_COLORS.len()];
            format!(
                r#"<tr class="user-row"><td><span class="user-dot" style="background:{}"></span>{}</td><td class="num">{}</td><td class="num">${:.2}</td><td class="num">{:.0}%</td><td class="num">${:.2}</td></tr>"#,
                color,
                escape_html(&p.display_name),
                p.prs,
                p.cost,
                p.pct_of_total,
                p.cost_per_pr
            )
        })
        .collect();

    let labels: Vec<String> = cost.dates.iter().map(|d| d.format("%b %d").to_string()).collect();
    let rounded: Vec<f64> = cost.cost_per_day.iter().map(|c| (c * 100.0).round() / 100.0).collect();
    let chart_data = json!({
        "labels": labels,
        "prCounts": cost.prs_per_day,
        "cost": rounded,
    });

    format!(
        r#"    <div class="consumption-section">
        <h2>AI Cost vs PR Output</h2>
        <div class="cons-stats">
            <div class="cons-stat"><span class="cons-num">${total:.2}</span><span class="cons-label">Total Spend</span></div>
            <div class="cons-stat"><span class="cons-num">{prs}</span><span class="cons-label">PRs Created</span></div>
            <div class="cons-stat"><span class="cons-num">${per_pr:.2}</span><span class="cons-label">Cost / PR</span></div>
            <div class="cons-stat"><span class="cons-num">{users}</span><span class="cons-label">Users</span></div>
        </div>
        <canvas id="costChart" height="280"></canvas>
        <div class="cons-legend">
            <span class="cons-legend-item"><span class="cons-swatch" style="background:rgba(88,166,255,0.4)"></span> PRs (bars)</span>
            <span class="cons-legend-item"><span class="cons-swatch cons-swatch-line" style="background:#f0883e"></span> Cost $ (line)</span>
        </div>
        <details style="margin-top:1rem">
            <summary style="cursor:pointer;color:var(--text-muted);font-size:0.85rem">Per-user breakdown</summary>
            <table class="comparison-table" style="margin-top:0.5rem">
                <thead><tr><th>User</th><th>PRs</th><th>Spend</th><th>% of Total</th><th>Cost/PR</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </details>
    </div>
    <script>
    (function() {{
        const data = {chart_data};
        const canvas = document.getElementById('costChart');
        const ctx = canvas.getContext('2d');
        const dpr = window.devicePixelRatio || 1;
        function fmtDollar(v) {{
            if (v >= 1000) return '$' + (v/1000).toFixed(1) + 'K';
            if (v >= 1) return '$' + v.toFixed(0);
            return '$' + v.toFixed(2);
        }}
        function draw() {{
            const rect = canvas.parentElement.getBoundingClientRect();
            const W = rect.width, H = 280;
            canvas.width = W * dpr; canvas.height = H * dpr;
            canvas.style.width = W + 'px'; canvas.style.height = H + 'px';
            ctx.setTransform(dpr, 0, 0, dpr, 0, 0);
            const pad = {{ top: 20, right: 65, bottom: 45, left: 45 }};
            const cW = W - pad.left - pad.right, cH = H - pad.top - pad.bottom;
            const n = data.labels.length;
            const barW = Math.max(3, (cW / n) * 0.7);
            const maxPR = Math.max(1, ...data.prCounts);
            const maxCost = Math.max(1, ...data.cost);
            ctx.clearRect(0, 0, W, H);
            ctx.strokeStyle = '#30363d'; ctx.lineWidth = 0.5;
            const gridN = Math.min(5, maxPR);
            for (let i = 0; i <= gridN; i++) {{
                const val = Math.round((maxPR / gridN) * i);
                const y = pad.top + cH - (val / maxPR) * cH;
                ctx.beginPath(); ctx.moveTo(pad.left, y); ctx.lineTo(W - pad.right, y); ctx.stroke();
                ctx.fillStyle = '#58a6ff'; ctx.font = '10px sans-serif'; ctx.textAlign = 'right';
                ctx.fillText(val, pad.left - 6, y + 3);
            }}
            for (let i = 0; i <= 4; i++) {{
                const val = (maxCost / 4) * i;
                const y = pad.top + cH - (val / maxCost) * cH;
                ctx.fillStyle = '#f0883e'; ctx.font = '10px sans-serif'; ctx.textAlign = 'left';
                ctx.fillText(fmtDollar(val), W - pad.right + 6, y + 3);
            }}
            ctx.fillStyle = 'rgba(88,166,255,0.4)';
            for (let i = 0; i < n; i++) {{
                const x = pad.left + (i / n) * cW + ((cW / n) - barW) / 2;
                const h = (data.prCounts[i] / maxPR) * cH;
                ctx.fillRect(x, pad.top + cH - h, barW, h);
            }}
            ctx.beginPath(); ctx.strokeStyle = '#f0883e'; ctx.lineWidth = 2.5; ctx.lineJoin = 'round';
            for (let i = 0; i < n; i++) {{
                const x = pad.left + (i / n) * cW + (cW / n) / 2;
                const y = pad.top + cH - (data.cost[i] / maxCost) * cH;
                if (i === 0) ctx.moveTo(x, y); else ctx.lineTo(x, y);
            }}
            ctx.stroke();
            ctx.fillStyle = '#f0883e';
            for (let i = 0; i < n; i++) {{
                const x = pad.left + (i / n) * cW + (cW / n) / 2;
                const y = pad.top + cH - (data.cost[i] / maxCost) * cH;
                ctx.beginPath(); ctx.arc(x, y, 3, 0, Math.PI * 2); ctx.fill();
            }}
            ctx.fillStyle = '#8b949e'; ctx.font = '10px sans-serif'; ctx.textAlign = 'center';
            const every = Math.max(1, Math.floor(n / 10));
            for (let i = 0; i < n; i += every) {{
                const x = pad.left + (i / n) * cW + (cW / n) / 2;
                ctx.save(); ctx.translate(x, H - pad.bottom + 14); ctx.rotate(-0.5);
                ctx.fillText(data.labels[i], 0, 0); ctx.restore();
            }}
        }}
        draw();
        window.addEventListener('resize', draw);
    }})();
    </script>"#,
        total = cost.grand_total,
        prs = total_prs,
        per_pr = cost.grand_total / (total_prs.max(1) as f64),
        users = cost.persons.len(),
        rows = rows,
        chart_data = chart_data,
    )
}

fn timeline_section(timeline: &TimelineSeries) -> String {
    if timeline.dates.is_empty() {
        return String::new();
    }
    r#"    <div class="timeline-section">
        <h2>PR Activity Over Time</h2>
        <canvas id="timelineChart" height="200"></canvas>
    </div>"#
        .to_string()
}

fn timeline_js(timeline: &TimelineSeries) -> String {
    if timeline.dates.is_empty() {
        return String::new();
    }
    let chart_data = json!({
        "labels": timeline.labels(),
        "completed": timeline.completed,
        "active": timeline.active,
        "abandoned": timeline.abandoned,
    });
    format!(
        r#"(function() {{
    const data = {chart_data};
    const canvas = document.getElementById('timelineChart');
    const ctx = canvas.getContext('2d');
    const dpr = window.devicePixelRatio || 1;
    function draw() {{
        const rect = canvas.parentElement.getBoundingClientRect();
        canvas.width = rect.width * dpr; canvas.height = 220 * dpr;
        canvas.style.width = rect.width + 'px'; canvas.style.height = '220px';
        ctx.setTransform(dpr, 0, 0, dpr, 0, 0);
        const W = rect.width, H = 220;
        const pad = {{ top: 20, right: 20, bottom: 40, left: 40 }};
        const chartW = W - pad.left - pad.right, chartH = H - pad.top - pad.bottom;
        const n = data.labels.length;
        const barW = Math.max(2, (chartW / n) - 1);
        let maxVal = 1;
        for (let i = 0; i < n; i++) {{
            const total = data.completed[i] + data.active[i] + data.abandoned[i];
            if (total > maxVal) maxVal = total;
        }}
        ctx.clearRect(0, 0, W, H);
        ctx.strokeStyle = '#30363d'; ctx.lineWidth = 0.5;
        ctx.fillStyle = '#8b949e'; ctx.font = '11px sans-serif'; ctx.textAlign = 'right';
        const gridLines = Math.min(5, maxVal);
        for (let i = 0; i <= gridLines; i++) {{
            const val = Math.round((maxVal / gridLines) * i);
            const y = pad.top + chartH - (val / maxVal) * chartH;
            ctx.beginPath(); ctx.moveTo(pad.left, y); ctx.lineTo(W - pad.right, y); ctx.stroke();
            ctx.fillText(val, pad.left - 6, y + 4);
        }}
        const colors = {{ completed: '#3fb950', active: '#58a6ff', abandoned: '#a80000' }};
        for (let i = 0; i < n; i++) {{
            const x = pad.left + (i / n) * chartW + 0.5;
            let yBase = pad.top + chartH;
            for (const status of ['completed', 'active', 'abandoned']) {{
                const val = data[status][i];
                if (val === 0) continue;
                const barH = (val / maxVal) * chartH;
                ctx.fillStyle = colors[status];
                ctx.fillRect(x, yBase - barH, barW, barH);
                yBase -= barH;
            }}
        }}
        ctx.fillStyle = '#8b949e'; ctx.font = '10px sans-serif'; ctx.textAlign = 'center';
        const every = Math.max(1, Math.floor(n / 10));
        for (let i = 0; i < n; i += every) {{
            const x = pad.left + (i / n) * chartW + barW / 2;
            ctx.save(); ctx.translate(x, H - pad.bottom + 14); ctx.rotate(-0.5);
            ctx.fillText(data.labels[i], 0, 0); ctx.restore();
        }}
        let legendX = pad.left;
        for (const [label, color] of [['Completed', '#3fb950'], ['Active', '#58a6ff'], ['Abandoned', '#a80000']]) {{
            ctx.fillStyle = color; ctx.fillRect(legendX, pad.top - 14, 10, 10);
            ctx.fillStyle = '#8b949e'; ctx.font = '11px sans-serif'; ctx.textAlign = 'left';
            ctx.fillText(label, legendX + 14, pad.top - 5);
            legendX += ctx.measureText(label).width + 28;
        }}
    }}
    draw();
    window.addEventListener('resize', draw);
}})();"#,
        chart_data = chart_data
    )
}

fn comparison_section(records: &[PrRecord], summary: &PrSummary) -> String {
    if summary.users.len() < 2 {
        return String::new();
    }

    struct Row {
        email: String,
        name: String,
        total: usize,
        completed: usize,
        active: usize,
        files: usize,
        projects: std::collections::BTreeSet<String>,
        repos: std::collections::BTreeSet<String>,
    }

    let mut rows: Vec<Row> = summary
        .users
        .iter()
        .map(|(email, name)| Row {
            email: email.clone(),
            name: name.clone(),
            total: 0,
            completed: 0,
            active: 0,
            files: 0,
            projects: Default::default(),
            repos: Default::default(),
        })
        .collect();

    for record in records {
        let Some(row) = rows
            .iter_mut()
            .find(|r| r.email == record.pr.created_by.unique_name)
        else {
            continue;
        };
        row.total += 1;
        match record.pr.status {
            PrStatus::Completed => row.completed += 1,
            PrStatus::Active => row.active += 1,
            _ => {}
        }
        row.files += record.files.len();
        row.projects.insert(record.pr.repository.project.name.clone());
        row.repos.insert(record.pr.repository.name.clone());
    }

    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.email.cmp(&b.email)));
    let max_total = rows.iter().map(|r| r.total).max().unwrap_or(1).max(1);

    let mut table_rows = String::new();
    let mut bars = String::new();
    for (i, row) in rows.iter().enumerate() {
        let color = USER_COLORS[i % USER_COLORS.len()];
        let pct = (row.total as f64 / max_total as f64) * 100.0;
        let short = row.name.split_whitespace().next().unwrap_or(&row.name);
        table_rows.push_str(&format!(
            r#"<tr class="user-row" onclick="filterByUser('{email}')" style="cursor:pointer">
            <td><span class="user-dot" style="background:{color}"></span>{name}</td>
            <td class="num">{total}</td>
            <td class="num" style="color:var(--green)">{completed}</td>
            <td class="num" style="color:var(--blue)">{active}</td>
            <td class="num">{files}</td>
            <td class="num">{projects}</td>
            <td class="num">{repos}</td>
        </tr>"#,
            email = escape_js(&row.email),
            color = color,
            name = escape_html(&row.name),
            total = row.total,
            completed = row.completed,
            active = row.active,
            files = row.files,
            projects = row.projects.len(),
            repos = row.repos.len(),
        ));
        bars.push_str(&format!(
            r#"<div class="bar-row" onclick="filterByUser('{email}')" style="cursor:pointer">
            <div class="bar-label">{short}</div>
            <div class="bar-track">
                <div class="bar-fill" style="width:{pct:.0}%;background:{color}"></div>
                <span class="bar-value">{total}</span>
            </div>
        </div>"#,
            email = escape_js(&row.email),
            short = escape_html(short),
            pct = pct,
            color = color,
            total = row.total,
        ));
    }

    format!(
        r#"    <div class="comparison-section">
        <h2>User Comparison</h2>
        <div class="comparison-grid">
            <div class="bar-chart">{bars}</div>
            <div class="comparison-table-wrap">
                <table class="comparison-table">
                    <thead><tr>
                        <th>Author</th><th>Total</th><th>Merged</th>
                        <th>Active</th><th>Files</th><th>Projects</th><th>Repos</th>
                    </tr></thead>
                    <tbody>{table_rows}</tbody>
                </table>
            </div>
        </div>
    </div>"#
    )
}

fn warnings_section(warnings: &[SourceWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let items: String = warnings
        .iter()
        .map(|w| {
            format!(
                "<li><strong>{}</strong>: {}</li>",
                escape_html(w.source.label()),
                escape_html(&w.message)
            )
        })
        .collect();
    format!(
        r#"    <div class="warnings-section">
        <h2>Skipped or degraded sources</h2>
        <ul>{}</ul>
    </div>"#,
        items
    )
}

fn filter_bar(records: &[PrRecord], summary: &PrSummary) -> String {
    let mut buttons = vec![format!(
        r#"<button class="filter-btn active" onclick="filterPRs('all')">All ({})</button>"#,
        summary.total
    )];
    buttons.push(format!(
        r#"<button class="filter-btn" onclick="filterPRs('status:active')">Active ({})</button>"#,
        summary.active
    ));
    buttons.push(format!(
        r#"<button class="filter-btn" onclick="filterPRs('status:completed')">Completed ({})</button>"#,
        summary.completed
    ));

    if summary.users.len() > 1 {
        for (email, name) in &summary.users {
            let short = name.split_whitespace().next().unwrap_or(name);
            let count = records
                .iter()
                .filter(|r| &r.pr.created_by.unique_name == email)
                .count();
            buttons.push(format!(
                r#"<button class="filter-btn" onclick="filterByUser('{}')">{} ({})</button>"#,
                escape_js(email),
                escape_html(short),
                count
            ));
        }
    }
    if summary.projects.len() > 1 {
        for project in &summary.projects {
            let count = records
                .iter()
                .filter(|r| &r.pr.repository.project.name == project)
                .count();
            buttons.push(format!(
                r#"<button class="filter-btn" onclick="filterPRs('project:{}')">{} ({})</button>"#,
                escape_js(project),
                escape_html(project),
                count
            ));
        }
    }
    if summary.repos.len() > 1 && summary.repos.len() <= 10 {
        for repo in &summary.repos {
            let count = records
                .iter()
                .filter(|r| &r.pr.repository.name == repo)
                .count();
            buttons.push(format!(
                r#"<button class="filter-btn" onclick="filterPRs('repo:{}')">{} ({})</button>"#,
                escape_js(repo),
                escape_html(repo),
                count
            ));
        }
    }

    buttons.join("\n")
}

fn filter_js(total: usize) -> String {
    format!(
        r#"function filterPRs(filter) {{
    document.querySelectorAll('.filter-btn').forEach(b => b.classList.remove('active'));
    if (event && event.target) event.target.classList.add('active');
    let shown = 0;
    document.querySelectorAll('.pr-card').forEach(card => {{
        let show = true;
        if (filter === 'all') {{
            show = true;
        }} else if (filter.startsWith('status:')) {{
            show = card.dataset.status === filter.slice(7);
        }} else if (filter.startsWith('repo:')) {{
            show = card.dataset.repo === filter.slice(5);
        }} else if (filter.startsWith('user:')) {{
            show = card.dataset.user === filter.slice(5);
        }} else if (filter.startsWith('project:')) {{
            show = card.dataset.project === filter.slice(8);
        }}
        card.style.display = show ? '' : 'none';
        if (show) shown++;
    }});
    document.getElementById('pr-count').textContent = 'Showing ' + shown + ' of {total} PRs';
}}
function filterByUser(email) {{
    document.querySelectorAll('.filter-btn').forEach(b => b.classList.remove('active'));
    filterPRs('user:' + email);
}}"#,
        total = total
    )
}

const CSS: &str = r#"
    :root {
        --bg: #0d1117; --surface: #161b22; --border: #30363d;
        --text: #e6edf3; --text-muted: #8b949e; --accent: #58a6ff;
        --green: #3fb950; --red: #f85149; --orange: #d29922; --blue: #58a6ff;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
        background: var(--bg); color: var(--text); line-height: 1.5; padding: 2rem;
    }
    .container { max-width: 1060px; margin: 0 auto; }
    h1 { font-size: 1.8rem; margin-bottom: 0.25rem; }
    h2 { font-size: 1.3rem; margin-bottom: 1rem; color: var(--text); }
    .subtitle { color: var(--text-muted); margin-bottom: 1.5rem; font-size: 0.9rem; }
    .stats-grid {
        display: grid; grid-template-columns: repeat(auto-fit, minmax(130px, 1fr));
        gap: 1rem; margin-bottom: 2rem;
    }
    .stat-card {
        background: var(--surface); border: 1px solid var(--border);
        border-radius: 8px; padding: 1rem; text-align: center;
    }
    .stat-card .number { font-size: 2rem; font-weight: 700; }
    .stat-card .label {
        color: var(--text-muted); font-size: 0.8rem;
        text-transform: uppercase; letter-spacing: 0.05em;
    }
    .consumption-section, .timeline-section, .comparison-section, .warnings-section {
        background: var(--surface); border: 1px solid var(--border);
        border-radius: 8px; padding: 1.25rem; margin-bottom: 2rem;
    }
    .consumption-section canvas, .timeline-section canvas { width: 100%; }
    .cons-stats { display: flex; gap: 1.5rem; margin-bottom: 1rem; flex-wrap: wrap; }
    .cons-stat { display: flex; flex-direction: column; align-items: center; }
    .cons-num { font-size: 1.4rem; font-weight: 700; color: var(--text); }
    .cons-label { font-size: 0.75rem; color: var(--text-muted); text-transform: uppercase; letter-spacing: 0.04em; }
    .cons-legend {
        display: flex; gap: 1.5rem; justify-content: center; margin-top: 0.5rem;
        font-size: 0.8rem; color: var(--text-muted);
    }
    .cons-legend-item { display: flex; align-items: center; gap: 0.35rem; }
    .cons-swatch { display: inline-block; width: 14px; height: 10px; border-radius: 2px; }
    .cons-swatch-line { height: 3px; border-radius: 2px; }
    .warnings-section ul { margin-left: 1.2rem; color: var(--orange); font-size: 0.85rem; }
    .comparison-grid { display: grid; grid-template-columns: 280px 1fr; gap: 1.5rem; align-items: start; }
    .bar-chart { display: flex; flex-direction: column; gap: 0.5rem; }
    .bar-row { display: flex; align-items: center; gap: 0.5rem; }
    .bar-row:hover .bar-fill { opacity: 0.8; }
    .bar-label { width: 70px; font-size: 0.82rem; text-align: right; color: var(--text-muted); flex-shrink: 0; }
    .bar-track { flex: 1; background: var(--bg); border-radius: 4px; height: 22px; position: relative; overflow: hidden; }
    .bar-fill { height: 100%; border-radius: 4px; transition: width 0.3s; min-width: 2px; }
    .bar-value { position: absolute; right: 6px; top: 1px; font-size: 0.75rem; font-weight: 600; }
    .comparison-table-wrap { overflow-x: auto; }
    .comparison-table { width: 100%; border-collapse: collapse; font-size: 0.85rem; }
    .comparison-table th {
        text-align: left; padding: 0.5rem 0.6rem; border-bottom: 1px solid var(--border);
        color: var(--text-muted); font-weight: 600; font-size: 0.75rem; text-transform: uppercase;
    }
    .comparison-table td { padding: 0.5rem 0.6rem; border-bottom: 1px solid rgba(48,54,61,0.5); }
    .comparison-table .num { text-align: center; }
    .user-row:hover { background: rgba(88,166,255,0.05); }
    .user-dot { display: inline-block; width: 8px; height: 8px; border-radius: 50%; margin-right: 6px; vertical-align: middle; }
    .filter-bar { display: flex; gap: 0.5rem; margin-bottom: 1.5rem; flex-wrap: wrap; }
    .filter-btn {
        background: var(--surface); border: 1px solid var(--border); color: var(--text);
        padding: 0.4rem 0.8rem; border-radius: 20px; cursor: pointer;
        font-size: 0.82rem; transition: all 0.15s;
    }
    .filter-btn:hover, .filter-btn.active {
        background: var(--accent); color: var(--bg); border-color: var(--accent);
    }
    .pr-card {
        background: var(--surface); border: 1px solid var(--border);
        border-radius: 8px; margin-bottom: 0.75rem; overflow: hidden; transition: border-color 0.15s;
    }
    .pr-card:hover { border-color: var(--accent); }
    .pr-header {
        padding: 0.85rem 1.1rem; display: flex; justify-content: space-between;
        align-items: flex-start; gap: 0.75rem;
    }
    .pr-title {
        color: var(--accent); text-decoration: none; font-weight: 600;
        font-size: 1rem; line-height: 1.3;
    }
    .pr-title:hover { text-decoration: underline; }
    .pr-meta { display: flex; align-items: center; gap: 0.4rem; flex-shrink: 0; flex-wrap: wrap; }
    .badge {
        color: #fff; padding: 0.12rem 0.45rem; border-radius: 12px;
        font-size: 0.72rem; font-weight: 600; text-transform: uppercase;
    }
    .pr-id { color: var(--text-muted); font-size: 0.82rem; }
    .pr-repo {
        color: var(--text-muted); font-size: 0.78rem;
        background: var(--bg); padding: 0.1rem 0.4rem; border-radius: 4px;
    }
    .pr-creator {
        color: var(--accent); font-size: 0.78rem; font-weight: 500;
        background: rgba(88,166,255,0.1); padding: 0.1rem 0.4rem; border-radius: 4px;
    }
    .pr-details { padding: 0 1.1rem 0.85rem; display: flex; flex-direction: column; gap: 0.4rem; }
    .pr-branches code {
        background: rgba(88,166,255,0.15); color: var(--accent);
        padding: 0.1rem 0.4rem; border-radius: 4px; font-size: 0.8rem;
    }
    .pr-dates { display: flex; gap: 1.5rem; color: var(--text-muted); font-size: 0.8rem; }
    .pr-desc {
        color: var(--text-muted); font-size: 0.82rem; white-space: pre-line;
        max-height: 100px; overflow-y: auto; padding: 0.4rem;
        background: var(--bg); border-radius: 6px; border: 1px solid var(--border);
    }
    .reviewers { display: flex; flex-wrap: wrap; gap: 0.35rem; }
    .reviewer {
        font-size: 0.8rem; padding: 0.12rem 0.45rem; border-radius: 12px;
        background: var(--bg); border: 1px solid var(--border);
    }
    .vote-approved { color: var(--green); border-color: var(--green); }
    .vote-approved-suggest { color: #3fb950; border-color: #2ea04366; }
    .vote-wait { color: var(--orange); border-color: var(--orange); }
    .vote-rejected { color: var(--red); border-color: var(--red); }
    .vote-none { color: var(--text-muted); }
    .work-items { font-size: 0.8rem; color: var(--text-muted); }
    .pr-stats { display: flex; gap: 0.75rem; font-size: 0.8rem; }
    .stat-add { color: var(--green); }
    .stat-edit { color: var(--orange); }
    .stat-del { color: var(--red); }
    .files-section { font-size: 0.8rem; }
    .files-section summary { cursor: pointer; color: var(--text-muted); padding: 0.25rem 0; }
    .files-section summary:hover { color: var(--accent); }
    .file-table { width: 100%; border-collapse: collapse; margin-top: 0.25rem; }
    .file-table tr:hover { background: rgba(255,255,255,0.03); }
    .file-change { width: 24px; text-align: center; font-weight: 700; padding: 0.15rem 0.35rem; }
    .file-add { color: var(--green); }
    .file-edit { color: var(--orange); }
    .file-delete { color: var(--red); }
    .file-path {
        padding: 0.15rem 0.35rem;
        font-family: 'SF Mono', SFMono-Regular, Consolas, 'Liberation Mono', Menlo, monospace;
        font-size: 0.75rem; color: var(--text-muted);
    }
    .empty-state { text-align: center; padding: 3rem; color: var(--text-muted); }
    .footer {
        text-align: center; color: var(--text-muted); font-size: 0.75rem;
        margin-top: 2rem; padding-top: 1rem; border-top: 1px solid var(--border);
    }
    #pr-count { color: var(--text-muted); font-size: 0.85rem; margin-bottom: 0.75rem; }
    @media (max-width: 768px) {
        body { padding: 1rem; }
        .pr-header { flex-direction: column; }
        .pr-dates { flex-direction: column; gap: 0.2rem; }
        .stats-grid { grid-template-columns: repeat(2, 1fr); }
        .comparison-grid { grid-template-columns: 1fr; }
    }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devops::decode_pr_list;
    use crate::range::DateRange;
    use chrono::NaiveDate;

    fn sample_records() -> Vec<PrRecord> {
        decode_pr_list(
            r#"[{
                "pullRequestId": 1,
                "title": "Add <script> guard",
                "status": "completed",
                "creationDate": "2026-02-03T10:00:00Z",
                "createdBy": {"displayName": "Alice Veen", "uniqueName": "alice@contoso.com"},
                "repository": {"id": "r", "name": "api", "project": {"id": "p", "name": "Planner"}},
                "sourceRefName": "refs/heads/fix",
                "targetRefName": "refs/heads/main",
                "reviewers": [{"displayName": "Bob", "vote": 10}]
            },
            {
                "pullRequestId": 2,
                "title": "Second",
                "status": "active",
                "creationDate": "2026-02-05T10:00:00Z",
                "createdBy": {"displayName": "Bob Smit", "uniqueName": "bob@contoso.com"},
                "repository": {"id": "r", "name": "web", "project": {"id": "p", "name": "Planner"}}
            }]"#,
        )
        .unwrap()
        .into_iter()
        .map(PrRecord::bare)
        .collect()
    }

    fn range() -> DateRange {
        let d = |s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        DateRange::new(d("2026-02-01"), d("2026-02-07")).unwrap()
    }

    #[test]
    fn test_render_is_self_contained() {
        let records = sample_records();
        let summary = PrSummary::from_records(&records);
        let timeline = TimelineSeries::from_records(&records, range());
        let html = render(&HtmlReport {
            title: "PR Report \u{2014} alice@contoso.com".to_string(),
            subtitle: "Planner &middot; last 7 days".to_string(),
            org: "https://dev.azure.com/contoso",
            records: &records,
            summary: &summary,
            timeline: &timeline,
            cost: None,
            warnings: &[],
        });

        assert!(html.starts_with("<!DOCTYPE html>"));
        // Titles are escaped
        assert!(html.contains("Add &lt;script&gt; guard"));
        assert!(!html.contains("Add <script> guard"));
        // Chart data embedded inline
        assert!(html.contains("timelineChart"));
        assert!(html.contains("\"completed\""));
        // No external resources
        assert!(!html.contains("src=\"http"));
        assert!(!html.contains("link rel"));
    }

    #[test]
    fn test_user_comparison_only_for_multiple_authors() {
        let records = sample_records();
        let summary = PrSummary::from_records(&records);
        assert!(comparison_section(&records, &summary).contains("User Comparison"));

        let single = vec![records[0].clone()];
        let summary = PrSummary::from_records(&single);
        assert!(comparison_section(&single, &summary).is_empty());
    }

    #[test]
    fn test_warnings_listed_in_report() {
        use crate::activity::{SourceKind, SourceWarning};
        let records = sample_records();
        let summary = PrSummary::from_records(&records);
        let timeline = TimelineSeries::from_records(&records, range());
        let warnings = vec![SourceWarning::new(
            SourceKind::DevOps,
            "PR #9 skipped, file fetch failed: timeout",
        )];
        let html = render(&HtmlReport {
            title: "t".to_string(),
            subtitle: "s".to_string(),
            org: "o",
            records: &records,
            summary: &summary,
            timeline: &timeline,
            cost: None,
            warnings: &warnings,
        });
        assert!(html.contains("Skipped or degraded sources"));
        assert!(html.contains("PR #9 skipped"));
    }

    #[test]
    fn test_cost_failure_listed_as_warning() {
        use crate::activity::{SourceKind, SourceWarning};
        let records = sample_records();
        let summary = PrSummary::from_records(&records);
        let timeline = TimelineSeries::from_records(&records, range());
        let warnings = vec![SourceWarning::new(
            SourceKind::Anthropic,
            "cost section skipped: Anthropic API error 500",
        )];
        let html = render(&HtmlReport {
            title: "t".to_string(),
            subtitle: "s".to_string(),
            org: "o",
            records: &records,
            summary: &summary,
            timeline: &timeline,
            cost: None,
            warnings: &warnings,
        });
        assert!(html.contains("Anthropic usage API"));
        assert!(html.contains("cost section skipped"));
    }

    #[test]
    fn test_onclick_handlers_survive_apostrophes() {
        let records: Vec<PrRecord> = decode_pr_list(
            r#"[{
                "pullRequestId": 1,
                "title": "First",
                "status": "active",
                "creationDate": "2026-02-03T10:00:00Z",
                "createdBy": {"displayName": "Miles O'Brien", "uniqueName": "o'brien@contoso.com"},
                "repository": {"id": "r", "name": "api", "project": {"id": "p", "name": "Planner"}}
            },
            {
                "pullRequestId": 2,
                "title": "Second",
                "status": "active",
                "creationDate": "2026-02-04T10:00:00Z",
                "createdBy": {"displayName": "Alice", "uniqueName": "alice@contoso.com"},
                "repository": {"id": "r", "name": "api", "project": {"id": "p", "name": "Planner"}}
            }]"#,
        )
        .unwrap()
        .into_iter()
        .map(PrRecord::bare)
        .collect();
        let summary = PrSummary::from_records(&records);
        let timeline = TimelineSeries::from_records(&records, range());
        let html = render(&HtmlReport {
            title: "t".to_string(),
            subtitle: "s".to_string(),
            org: "o",
            records: &records,
            summary: &summary,
            timeline: &timeline,
            cost: None,
            warnings: &[],
        });
        // The apostrophe must not terminate the JS string literal: hex
        // escapes survive HTML entity decoding, quote entities do not.
        assert!(html.contains(r"filterByUser('o\x27brien@contoso.com')"));
        assert!(!html.contains("filterByUser('o'brien"));
        assert!(!html.contains("filterByUser('o&#x27;brien"));
    }

    #[test]
    fn test_empty_record_set_renders_placeholder() {
        let records: Vec<PrRecord> = Vec::new();
        let summary = PrSummary::from_records(&records);
        let timeline = TimelineSeries::from_records(&records, range());
        let html = render(&HtmlReport {
            title: "t".to_string(),
            subtitle: "s".to_string(),
            org: "o",
            records: &records,
            summary: &summary,
            timeline: &timeline,
            cost: None,
            warnings: &[],
        });
        assert!(html.contains("No pull requests found"));
    }
}
