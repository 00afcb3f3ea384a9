use crate::branches::types::{AuthorGroups, BranchRecord, Category, RecencyTier};
use crate::error::BranchboardError;
use crate::summary::Dashboard;
use crate::web::OrphanPage;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin-bottom:1.5em}\
td,th{border:1px solid #ccc;padding:.25em .6em;text-align:left}\
th{background:#eee}.label{background:#ddd;border-radius:3px;padding:0 .3em;margin-right:.2em}";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>{STYLE}</style></head><body>{body}</body></html>\n",
        escape(title)
    )
}

fn section_id(category: Category) -> &'static str {
    match category {
        Category::Open => "open",
        Category::Closed => "closed",
        Category::Unlinked => "unlinked",
        Category::NeverLinked => "never-linked",
    }
}

fn section_title(category: Category) -> &'static str {
    match category {
        Category::Open => "Linked to open issues",
        Category::Closed => "Linked to closed issues",
        Category::Unlinked => "Issue number not found",
        Category::NeverLinked => "No issue number",
    }
}

fn branch_row(record: &BranchRecord) -> String {
    let (age, color) = match &record.display {
        Some(d) => (d.age.as_str(), d.tier.color()),
        None => ("", RecencyTier::Fresh.color()),
    };
    let labels: String = record
        .labels()
        .iter()
        .map(|l| format!("<span class=\"label\">{}</span>", escape(l)))
        .collect();
    let issue = record
        .issue_number
        .map(|n| format!("#{n}"))
        .unwrap_or_default();

    format!(
        "<tr><td>{}</td><td>{}</td><td>{issue}</td><td>{labels}</td><td>{}</td>\
         <td style=\"color:{color}\">{}</td></tr>",
        escape(&record.repo.name),
        escape(&record.branch),
        escape(&record.last_commit.message),
        escape(age),
    )
}

fn branch_table(groups: &AuthorGroups) -> String {
    let mut html = String::new();
    for (dev, records) in groups {
        html.push_str(&format!("<h3>{}</h3>", escape(dev.handle())));
        html.push_str(
            "<table><tr><th>Repository</th><th>Branch</th><th>Issue</th>\
             <th>Labels</th><th>Last commit</th><th>Age</th></tr>",
        );
        for record in records {
            html.push_str(&branch_row(record));
        }
        html.push_str("</table>");
    }
    html
}

pub fn render_index(dashboard: &Dashboard) -> String {
    let report = &dashboard.report;
    let mut body = format!(
        "<h1>Open branches in {}</h1><p>Signed in as {}. Fetched in {:.2} s. \
         <a href=\"/orphans.html\">Forks and member repositories</a></p>",
        escape(&dashboard.org_name),
        escape(&dashboard.user_name),
        dashboard.elapsed_secs,
    );

    body.push_str("<h2>Branches per developer</h2><table><tr><th>Developer</th><th>Total</th>");
    for category in Category::ALL {
        body.push_str(&format!("<th>{}</th>", category.label()));
    }
    body.push_str("</tr>");
    for (dev, total) in &report.ranking {
        body.push_str(&format!("<tr><td>{}</td><td>{total}</td>", escape(dev.handle())));
        for category in Category::ALL {
            let n = report
                .counts
                .get(dev)
                .and_then(|c| c.get(&category))
                .copied()
                .unwrap_or(0);
            body.push_str(&format!("<td>{n}</td>"));
        }
        body.push_str("</tr>");
    }
    body.push_str("</table>");

    for category in Category::ALL {
        if !report.non_empty.get(&category).copied().unwrap_or(false) {
            continue;
        }
        body.push_str(&format!(
            "<section id=\"{}\"><h2>{}</h2>",
            section_id(category),
            section_title(category)
        ));
        body.push_str(&branch_table(report.buckets.get(category)));
        body.push_str("</section>");
    }

    page(&format!("{} branches", dashboard.org_name), &body)
}

pub fn render_orphans(orphan_page: &OrphanPage) -> String {
    let report = &orphan_page.report;
    let mut body = format!(
        "<h1>Forks of {} repositories</h1><p>Fetched in {:.2} s. <a href=\"/\">Open branches</a></p>",
        escape(&orphan_page.org_name),
        orphan_page.elapsed_secs,
    );

    body.push_str("<table><tr><th>Repository</th><th>Fork owner</th><th>Last commit</th></tr>");
    for orphan in &report.orphans {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&orphan.repo),
            escape(orphan.owner.as_deref().unwrap_or("unknown")),
            escape(&orphan.activity.to_string()),
        ));
    }
    body.push_str("</table>");

    body.push_str("<h2>Member repositories</h2><table><tr><th>Member</th><th>Repository</th></tr>");
    for record in &report.member_repos {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&record.member),
            escape(&record.repo),
        ));
    }
    body.push_str("</table>");

    page(&format!("{} forks", orphan_page.org_name), &body)
}

pub fn render_error(e: &BranchboardError) -> String {
    page(
        "upstream error",
        &format!("<h1>Could not reach GitHub</h1><pre>{}</pre>", escape(&e.to_string())),
    )
}
