//! Report building and rendering for audit results.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::domain::{FileFlags, InspectionFailure, Project, Repo};

/// Policy verdicts and metadata for one repository, evaluated at report time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    /// Repository slug.
    pub name: String,
    /// Key of the owning project.
    pub project_key: String,
    /// Size in megabytes.
    pub size_in_megabytes: f64,
    /// Size as formatted by the server.
    pub human_readable_size: String,
    /// Presence of each probed file.
    pub files: FileFlags,
    /// Author time of the most recent commit.
    pub last_commit: Option<DateTime<Utc>>,
    /// Larger than the size threshold.
    pub oversized: bool,
    /// Every probed file is present.
    pub complete: bool,
    /// No commit within the staleness window.
    pub stale: bool,
}

impl RepoSummary {
    fn evaluate(repo: &Repo, now: DateTime<Utc>) -> Self {
        Self {
            name: repo.name().to_string(),
            project_key: repo.project_key().to_string(),
            size_in_megabytes: repo.size(),
            human_readable_size: repo.human_readable_size().to_string(),
            files: repo.files().clone(),
            last_commit: repo.last_commit(),
            oversized: repo.oversized(),
            complete: repo.has_all_files(),
            stale: repo.old_at(now),
        }
    }
}

/// Verdict counts over a set of repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Repositories counted.
    pub repositories: usize,
    /// Repositories over the size threshold.
    pub oversized: usize,
    /// Repositories missing at least one probed file.
    pub incomplete: usize,
    /// Repositories without a recent commit.
    pub stale: usize,
}

impl Totals {
    fn add(&mut self, repo: &RepoSummary) {
        self.repositories += 1;
        self.oversized += usize::from(repo.oversized);
        self.incomplete += usize::from(!repo.complete);
        self.stale += usize::from(repo.stale);
    }

    fn merge(&mut self, other: &Totals) {
        self.repositories += other.repositories;
        self.oversized += other.oversized;
        self.incomplete += other.incomplete;
        self.stale += other.stale;
    }
}

/// Repositories of one project with their verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Project display name.
    pub name: String,
    /// Repository rows in project order.
    pub repos: Vec<RepoSummary>,
    /// Verdict counts for this project.
    pub totals: Totals,
}

/// Complete audit report for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Server the repositories were read from.
    pub server_url: String,
    /// Instant every staleness verdict was evaluated against.
    pub generated_at: DateTime<Utc>,
    /// Probed file paths, used as report columns.
    pub probe_files: Vec<String>,
    /// Per-project results.
    pub projects: Vec<ProjectSummary>,
    /// Repositories skipped because inspection failed.
    pub failures: Vec<InspectionFailure>,
    /// Verdict counts across every project.
    pub totals: Totals,
}

impl Report {
    /// Evaluate every repository against a single instant taken from the clock.
    pub fn build<C: Clock + ?Sized>(
        projects: &[Project],
        failures: Vec<InspectionFailure>,
        server_url: &str,
        clock: &C,
    ) -> Self {
        let now = clock.now();
        let mut probe_files: Vec<String> = Vec::new();
        let mut totals = Totals::default();
        let mut summaries = Vec::with_capacity(projects.len());

        for project in projects {
            let mut project_totals = Totals::default();
            let mut repos = Vec::with_capacity(project.repos.len());
            for repo in &project.repos {
                let summary = RepoSummary::evaluate(repo, now);
                for flag in summary.files.iter() {
                    if !probe_files.contains(&flag.path) {
                        probe_files.push(flag.path.clone());
                    }
                }
                project_totals.add(&summary);
                repos.push(summary);
            }
            totals.merge(&project_totals);
            summaries.push(ProjectSummary {
                name: project.name.clone(),
                repos,
                totals: project_totals,
            });
        }

        Self {
            server_url: server_url.to_string(),
            generated_at: now,
            probe_files,
            projects: summaries,
            failures,
            totals,
        }
    }
}

/// Render the report as a standalone HTML document.
pub fn render_html(report: &Report) -> String {
    let mut output = String::new();
    let title = format!("Repository audit: {}", report.server_url);
    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">\n<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\">");
    let _ = writeln!(output, "<title>{}</title>", escape_html(&title));
    let _ = writeln!(output, "<style>{HTML_STYLE}</style>");
    let _ = writeln!(output, "</head>\n<body>");
    let _ = writeln!(output, "<h1>{}</h1>", escape_html(&title));
    let _ = writeln!(
        output,
        "<p class=\"generated\">Generated {}</p>",
        format_timestamp(report.generated_at)
    );
    let _ = writeln!(
        output,
        "<p class=\"summary\">{}</p>",
        escape_html(&format_totals(&report.totals))
    );

    if report.projects.is_empty() {
        let _ = writeln!(output, "<p>No repositories found.</p>");
    }
    for project in &report.projects {
        append_html_project(&mut output, project, &report.probe_files);
    }
    append_html_failures(&mut output, &report.failures);

    let _ = writeln!(output, "</body>\n</html>");
    output
}

/// Render the report as Markdown.
pub fn render_markdown(report: &Report) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Repository Audit Report\n");
    let _ = writeln!(output, "- Server: {}", report.server_url);
    let _ = writeln!(
        output,
        "- Generated: {}",
        format_timestamp(report.generated_at)
    );
    let _ = writeln!(output, "- {}\n", format_totals(&report.totals));

    if report.projects.is_empty() {
        let _ = writeln!(output, "No repositories found.\n");
    }
    for project in &report.projects {
        append_markdown_project(&mut output, project, &report.probe_files);
    }
    append_markdown_failures(&mut output, &report.failures);
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

const HTML_STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
td.flag{background:#f8d7da}td.ok{background:#d4edda}";

fn append_html_project(output: &mut String, project: &ProjectSummary, probe_files: &[String]) {
    let _ = writeln!(output, "<h2>{}</h2>", escape_html(&project.name));
    let _ = writeln!(
        output,
        "<p class=\"summary\">{}</p>",
        escape_html(&format_totals(&project.totals))
    );
    let _ = writeln!(output, "<table>\n<thead><tr>");
    let _ = write!(output, "<th>Repository</th><th>Size (MB)</th><th>Size</th>");
    for file in probe_files {
        let _ = write!(output, "<th>{}</th>", escape_html(file));
    }
    let _ = writeln!(
        output,
        "<th>Last commit</th><th>Oversized</th><th>Complete</th><th>Stale</th></tr></thead>"
    );
    let _ = writeln!(output, "<tbody>");
    for repo in &project.repos {
        let _ = write!(
            output,
            "<tr><td>{}</td><td>{:.2}</td><td>{}</td>",
            escape_html(&repo.name),
            repo.size_in_megabytes,
            escape_html(&repo.human_readable_size)
        );
        for file in probe_files {
            let present = repo.files.get(file).unwrap_or(false);
            let _ = write!(output, "{}", html_cell(yes_no(present), !present));
        }
        let _ = writeln!(
            output,
            "<td>{}</td>{}{}{}</tr>",
            format_last_commit(repo.last_commit),
            html_cell(yes_no(repo.oversized), repo.oversized),
            html_cell(yes_no(repo.complete), !repo.complete),
            html_cell(yes_no(repo.stale), repo.stale),
        );
    }
    let _ = writeln!(output, "</tbody>\n</table>");
}

fn append_html_failures(output: &mut String, failures: &[InspectionFailure]) {
    if failures.is_empty() {
        return;
    }
    let _ = writeln!(output, "<h2>Inspection errors</h2>\n<ul>");
    for failure in failures {
        let _ = writeln!(
            output,
            "<li>{}/{}: {}</li>",
            escape_html(&failure.project),
            escape_html(&failure.repository),
            escape_html(&failure.error)
        );
    }
    let _ = writeln!(output, "</ul>");
}

fn append_markdown_project(output: &mut String, project: &ProjectSummary, probe_files: &[String]) {
    let _ = writeln!(output, "## {}\n", escape_markdown(&project.name));
    let _ = writeln!(output, "{}\n", format_totals(&project.totals));
    let _ = write!(output, "| Repository | Size (MB) | Size |");
    for file in probe_files {
        let _ = write!(output, " {} |", escape_markdown(file));
    }
    let _ = writeln!(output, " Last commit | Oversized | Complete | Stale |");
    let _ = write!(output, "|---|---:|---|");
    for _ in probe_files {
        let _ = write!(output, ":-:|");
    }
    let _ = writeln!(output, "---|:-:|:-:|:-:|");
    for repo in &project.repos {
        let _ = write!(
            output,
            "| {} | {:.2} | {} |",
            escape_markdown(&repo.name),
            repo.size_in_megabytes,
            escape_markdown(&repo.human_readable_size)
        );
        for file in probe_files {
            let _ = write!(output, " {} |", yes_no(repo.files.get(file).unwrap_or(false)));
        }
        let _ = writeln!(
            output,
            " {} | {} | {} | {} |",
            format_last_commit(repo.last_commit),
            yes_no(repo.oversized),
            yes_no(repo.complete),
            yes_no(repo.stale)
        );
    }
    let _ = writeln!(output);
}

fn append_markdown_failures(output: &mut String, failures: &[InspectionFailure]) {
    if failures.is_empty() {
        return;
    }
    let _ = writeln!(output, "## Inspection errors\n");
    for failure in failures {
        let _ = writeln!(
            output,
            "- {}/{}: {}",
            escape_markdown(&failure.project),
            escape_markdown(&failure.repository),
            escape_markdown(&failure.error)
        );
    }
    let _ = writeln!(output);
}

fn html_cell(text: &str, flagged: bool) -> String {
    let class = if flagged { "flag" } else { "ok" };
    format!("<td class=\"{class}\">{text}</td>")
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn format_totals(totals: &Totals) -> String {
    format!(
        "{} repositories: {} oversized, {} incomplete, {} stale",
        totals.repositories, totals.oversized, totals.incomplete, totals.stale
    )
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn format_last_commit(last_commit: Option<DateTime<Utc>>) -> String {
    match last_commit {
        Some(timestamp) => timestamp.format("%Y-%m-%d").to_string(),
        None => "never".to_string(),
    }
}

fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::domain::{DEFAULT_PROBE_FILES, RepositoryIdentity, RepositoryMetadata};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn clock() -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().times(1).return_const(now());
        clock
    }

    fn repo(name: &str, project: &str, size: f64, complete: bool, age_days: Option<i64>) -> Repo {
        let mut files = FileFlags::default();
        for file in DEFAULT_PROBE_FILES {
            files.set(file, complete || file != "LICENSE");
        }
        Repo::new(RepositoryMetadata {
            identity: RepositoryIdentity::new(name, project, "KEY"),
            size_in_megabytes: size,
            human_readable_size: format!("{size:.2} MB"),
            file_flags: files,
            last_commit: age_days.map(|days| now() - Duration::days(days)),
        })
    }

    fn sample_projects() -> Vec<Project> {
        let mut infra = Project::new("Infra");
        infra.add_repo(repo("api", "Infra", 25.0, true, Some(10)));
        infra.add_repo(repo("legacy", "Infra", 2.0, false, Some(400)));
        let mut web = Project::new("Web & <Docs>");
        web.add_repo(repo("site", "Web & <Docs>", 1.0, true, None));
        vec![infra, web]
    }

    #[test]
    fn build_evaluates_verdicts_against_clock() {
        let report = Report::build(&sample_projects(), Vec::new(), "https://stash", &clock());

        assert_eq!(report.generated_at, now());
        assert_eq!(report.probe_files, DEFAULT_PROBE_FILES.to_vec());
        let infra = &report.projects[0];
        assert!(infra.repos[0].oversized);
        assert!(!infra.repos[0].stale);
        assert!(infra.repos[1].stale);
        assert!(!infra.repos[1].complete);
        assert_eq!(
            infra.totals,
            Totals {
                repositories: 2,
                oversized: 1,
                incomplete: 1,
                stale: 1
            }
        );
        assert_eq!(report.totals.repositories, 3);
        assert!(!report.projects[1].repos[0].stale);
    }

    #[test]
    fn renders_html_with_escaping() {
        let failures = vec![InspectionFailure {
            repository: "broken".to_string(),
            project: "Infra".to_string(),
            error: "transport error: <timeout>".to_string(),
        }];
        let report = Report::build(&sample_projects(), failures, "https://stash", &clock());

        let output = render_html(&report);

        assert!(output.starts_with("<!DOCTYPE html>"));
        assert!(output.contains("<h2>Web &amp; &lt;Docs&gt;</h2>"));
        assert!(output.contains("<th>CONTRIBUTORS</th>"));
        assert!(output.contains("<td>never</td>"));
        assert!(output.contains("<td class=\"flag\">yes</td>"));
        assert!(output.contains("Inspection errors"));
        assert!(output.contains("&lt;timeout&gt;"));
        assert!(!output.contains("<Docs>"));
    }

    #[test]
    fn renders_markdown_tables() {
        let report = Report::build(&sample_projects(), Vec::new(), "https://stash", &clock());

        let output = render_markdown(&report);

        assert!(output.contains("# Repository Audit Report"));
        assert!(output.contains("## Infra"));
        assert!(output.contains("| api | 25.00 | 25.00 MB |"));
        assert!(output.contains("3 repositories: 1 oversized, 1 incomplete, 1 stale"));
        assert!(!output.contains("Inspection errors"));
    }

    #[test]
    fn renders_empty_report() {
        let report = Report::build(&[], Vec::new(), "https://stash", &clock());
        assert!(render_html(&report).contains("No repositories found."));
        assert!(render_markdown(&report).contains("No repositories found."));
    }

    #[test]
    fn renders_json_payload() {
        let report = Report::build(&sample_projects(), Vec::new(), "https://stash", &clock());
        let json = render_json(&report).expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed["serverUrl"], "https://stash");
        assert_eq!(parsed["projects"][0]["repos"][0]["oversized"], true);
        assert_eq!(parsed["projects"][0]["repos"][0]["files"][0]["path"], "README.md");
        assert!(parsed["projects"][1]["repos"][0]["lastCommit"].is_null());
    }

    #[test]
    fn markdown_escapes_pipes_in_cells() {
        let mut project = Project::new("Ops | Tools");
        project.add_repo(repo("a|b", "Ops | Tools", 1.0, true, Some(1)));
        let failures = vec![InspectionFailure {
            repository: "c|d".to_string(),
            project: "Ops | Tools".to_string(),
            error: "malformed response: x|y".to_string(),
        }];
        let report = Report::build(&[project], failures, "https://stash", &clock());

        let output = render_markdown(&report);

        assert!(output.contains("## Ops \\| Tools"));
        assert!(output.contains("| a\\|b | 1.00 |"));
        assert!(output.contains("- Ops \\| Tools/c\\|d: malformed response: x\\|y"));
        assert!(!output.contains("a|b"));
    }

    #[test]
    fn escape_html_handles_quotes() {
        assert_eq!(escape_html("a\"b'c"), "a&quot;b&#39;c");
    }
}
