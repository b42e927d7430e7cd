#![deny(missing_docs)]
//! stash-inspector command-line interface.
//!
//! Audits every repository on a Stash / Bitbucket Server instance and writes a
//! hygiene report grouped by project.

mod credentials;
mod pipeline;
#[cfg(test)]
mod test_support;

use clap::{Args, Parser, ValueEnum};
use log::info;
use pipeline::{PipelineOptions, inspect_all};
use stash_inspector_core::client::normalize_base_url;
use stash_inspector_core::{
    Clock, DEFAULT_PAGE_SIZE, ProjectFilter, Report, RepositoryEnumerator, RepositoryInspector,
    StashClient, default_probe_files, render_html, render_json, render_markdown,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(
    name = "stash-inspector",
    version,
    about = "Audit repository hygiene on a Stash / Bitbucket Server instance"
)]
struct Cli {
    /// Base URL of the repository server.
    #[arg(env = "STASH_URL")]
    server_url: String,
    /// Regular expression selecting projects by name.
    project_filter: Option<String>,
    #[command(flatten)]
    auth: AuthArgs,
    #[command(flatten)]
    inspection: InspectionArgs,
    #[command(flatten)]
    report: OutputArgs,
}

#[derive(Args, Debug, Clone)]
struct AuthArgs {
    /// Account name. Prompted for when absent.
    #[arg(short, long, env = "STASH_USERNAME")]
    username: Option<String>,
    /// Account password. Prompted for without echo when absent.
    #[arg(long, env = "STASH_PASSWORD", hide = true, hide_env_values = true)]
    password: Option<String>,
    /// Verify the server's TLS certificate instead of accepting any certificate.
    #[arg(long)]
    verify_tls: bool,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct InspectionArgs {
    /// Files probed at each repository root (repeatable or comma-separated).
    #[arg(long = "probe-file", value_delimiter = ',', default_values_t = default_probe_files())]
    probe_files: Vec<String>,
    /// Repositories requested per listing page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,
    /// Maximum number of repositories inspected concurrently.
    #[arg(short = 'j', long, default_value_t = 1)]
    concurrency: usize,
    /// Record failing repositories in the report instead of aborting the run.
    #[arg(long)]
    skip_failed: bool,
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Report destination, or `-` for stdout.
    #[arg(short, long, default_value = "output.html")]
    output: PathBuf,
    /// Report format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
    format: ReportFormat,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum ReportFormat {
    Html,
    Markdown,
    Json,
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    use stash_inspector_core::{ClientConfig, HttpStashClient, SystemClock};

    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let credentials =
        credentials::resolve_credentials(cli.auth.username.clone(), cli.auth.password.clone())?;
    let config = ClientConfig {
        accept_invalid_certs: !cli.auth.verify_tls,
        timeout: cli.auth.timeout_secs.map(std::time::Duration::from_secs),
        ..ClientConfig::default()
    };
    let client = HttpStashClient::with_config(&cli.server_url, credentials, config)?;

    run_audit(client, &cli, &SystemClock).await
}

#[cfg(test)]
fn main() {}

async fn run_audit<C, K>(client: C, cli: &Cli, clock: &K) -> CliResult<()>
where
    C: StashClient + Send + Sync + 'static,
    K: Clock + ?Sized,
{
    let server_url = normalize_base_url(&cli.server_url)?;
    let filter = ProjectFilter::new(cli.project_filter.as_deref())?;
    let probe_files = normalize_probe_files(&cli.inspection.probe_files);
    if probe_files.is_empty() {
        return Err("at least one probe file is required".into());
    }

    let identities = RepositoryEnumerator::new(&client)
        .with_page_size(cli.inspection.page_size)
        .list_matching(&filter)
        .await?;
    info!("Retrieving info from {} repositories", identities.len());

    let inspector = Arc::new(RepositoryInspector::with_probe_files(client, probe_files));
    let options = PipelineOptions {
        concurrency: cli.inspection.concurrency,
        skip_failed: cli.inspection.skip_failed,
    };
    let outcome = inspect_all(inspector, identities, options).await?;

    let report = Report::build(&outcome.projects, outcome.failures, &server_url, clock);
    emit_report(&report, &cli.report).await?;
    if cli.report.output != Path::new("-") {
        info!("Report written to {}", cli.report.output.display());
    }
    Ok(())
}

fn normalize_probe_files(files: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for file in files {
        let file = file.trim().trim_start_matches('/');
        if file.is_empty() || normalized.iter().any(|existing| existing == file) {
            continue;
        }
        normalized.push(file.to_string());
    }
    normalized
}

fn render_report(report: &Report, format: ReportFormat) -> CliResult<String> {
    Ok(match format {
        ReportFormat::Html => render_html(report),
        ReportFormat::Markdown => render_markdown(report),
        ReportFormat::Json => render_json(report)?,
    })
}

async fn emit_report(report: &Report, output: &OutputArgs) -> CliResult<()> {
    let contents = render_report(report, output.format)?;
    if output.output == Path::new("-") {
        print!("{contents}");
        return Ok(());
    }
    if let Some(parent) = output.output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(&output.output, contents).await?;
    Ok(())
}
