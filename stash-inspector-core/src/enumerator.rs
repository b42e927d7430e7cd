//! Repository listing across every page the server returns.

use log::{debug, info};
use regex::Regex;
use serde::Deserialize;

use crate::client::StashClient;
use crate::domain::RepositoryIdentity;
use crate::endpoint::{Endpoint, LIMIT, RequestParams, START};
use crate::error::{Result, StashError};

/// Page size requested from the listing endpoint unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryPage {
    values: Vec<RepositoryEntry>,
    #[serde(default)]
    is_last_page: bool,
    next_page_start: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RepositoryEntry {
    slug: String,
    project: ProjectRef,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    name: String,
    key: String,
}

impl From<RepositoryEntry> for RepositoryIdentity {
    fn from(entry: RepositoryEntry) -> Self {
        RepositoryIdentity::new(entry.slug, entry.project.name, entry.project.key)
    }
}

/// Regular expression restricting which projects are inspected.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pattern: Option<Regex>,
}

impl ProjectFilter {
    /// Match every project.
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile a filter. Blank or absent patterns match every project.
    pub fn new(pattern: Option<&str>) -> Result<Self> {
        let pattern = match pattern {
            Some(pattern) if !pattern.trim().is_empty() => Some(Regex::new(pattern)?),
            _ => None,
        };
        Ok(Self { pattern })
    }

    /// Whether the project name contains a match for the pattern.
    pub fn matches(&self, project_name: &str) -> bool {
        self.pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(project_name))
    }
}

/// Lists every repository visible to the client's credentials.
pub struct RepositoryEnumerator<'a, C: StashClient + ?Sized> {
    client: &'a C,
    page_size: u32,
}

impl<'a, C: StashClient + ?Sized> RepositoryEnumerator<'a, C> {
    /// Create an enumerator with the default page size.
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size. Zero falls back to one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetch every page and return repositories in server order.
    pub async fn list_all(&self) -> Result<Vec<RepositoryIdentity>> {
        let mut repositories = Vec::new();
        let mut start = 0u64;

        loop {
            let params = RequestParams::new()
                .with(LIMIT, self.page_size)
                .with(START, start);
            let body = self
                .client
                .get_json(Endpoint::ListRepositories, &params)
                .await?;
            let page: RepositoryPage = serde_json::from_value(body).map_err(|err| {
                StashError::MalformedResponse(format!("repository listing: {err}"))
            })?;
            debug!(
                "listing page at {start} returned {} repositories",
                page.values.len()
            );
            repositories.extend(page.values.into_iter().map(RepositoryIdentity::from));

            if page.is_last_page {
                break;
            }
            match page.next_page_start {
                Some(next) if next > start => start = next,
                _ => break,
            }
        }

        Ok(repositories)
    }

    /// List every repository whose project matches the filter.
    pub async fn list_matching(&self, filter: &ProjectFilter) -> Result<Vec<RepositoryIdentity>> {
        let all = self.list_all().await?;
        let total = all.len();
        let matching: Vec<RepositoryIdentity> = all
            .into_iter()
            .filter(|identity| filter.matches(&identity.project_name))
            .collect();
        info!(
            "{} of {total} repositories match the project filter",
            matching.len()
        );
        Ok(matching)
    }
}
