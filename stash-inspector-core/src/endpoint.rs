//! REST endpoint templates for the repository server.

use std::collections::BTreeMap;

use crate::error::{Result, StashError};

/// Placeholder filled with the server base URL.
pub const BASE: &str = "base";
/// Placeholder filled with the page size of a listing request.
pub const LIMIT: &str = "limit";
/// Placeholder filled with the offset of a listing request.
pub const START: &str = "start";
/// Placeholder filled with the project key.
pub const PROJECT_KEY: &str = "projectKey";
/// Placeholder filled with the repository slug.
pub const NAME: &str = "name";
/// Placeholder filled with a path relative to the repository root.
pub const FILE: &str = "file";

/// Remote endpoints consumed by the inspector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Every repository visible to the credentials, one page at a time.
    ListRepositories,
    /// Metadata for one path at the repository root.
    BrowseFile,
    /// Repository size, served by the reposize plugin.
    RepositorySize,
    /// Most recent commit on the default branch.
    LastCommit,
}

impl Endpoint {
    /// URL template with `{placeholder}` markers.
    pub fn template(&self) -> &'static str {
        match self {
            Self::ListRepositories => "{base}/rest/api/1.0/repos?limit={limit}&start={start}",
            Self::BrowseFile => {
                "{base}/rest/api/1.0/projects/{projectKey}/repos/{name}/browse/{file}?type=true"
            }
            Self::RepositorySize => "{base}/rest/reposize/latest/projects/{projectKey}/repos/{name}",
            Self::LastCommit => {
                "{base}/rest/api/1.0/projects/{projectKey}/repos/{name}/commits?limit=1"
            }
        }
    }

    /// Stable label used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListRepositories => "list_repositories",
            Self::BrowseFile => "browse_file",
            Self::RepositorySize => "repository_size",
            Self::LastCommit => "last_commit",
        }
    }

    /// Substitute the base URL and parameters into the template.
    pub fn render(&self, base_url: &str, params: &RequestParams) -> Result<String> {
        let template = self.template();
        let mut output = String::with_capacity(template.len() + base_url.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            output.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| StashError::Other(format!("unterminated placeholder in {template}")))?;
            let key = &after[..close];
            output.push_str(&resolve(key, base_url, params)?);
            rest = &after[close + 1..];
        }
        output.push_str(rest);

        Ok(output)
    }
}

fn resolve(key: &str, base_url: &str, params: &RequestParams) -> Result<String> {
    if key == BASE {
        return Ok(base_url.trim_end_matches('/').to_string());
    }
    let value = params
        .get(key)
        .ok_or_else(|| StashError::MissingParameter(key.to_string()))?;
    if key == FILE {
        return Ok(encode_path(value));
    }
    Ok(urlencoding::encode(value).into_owned())
}

fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<String>>()
        .join("/")
}

/// Named values substituted into an endpoint template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: BTreeMap<String, String>,
}

impl RequestParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any earlier value.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Parameters addressing one repository.
    pub fn repository(project_key: &str, name: &str) -> Self {
        Self::new().with(PROJECT_KEY, project_key).with(NAME, name)
    }

    /// Look up a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_listing_url() {
        let params = RequestParams::new().with(LIMIT, 1000).with(START, 0);
        let url = Endpoint::ListRepositories
            .render("https://stash.example.com/", &params)
            .expect("render");
        assert_eq!(
            url,
            "https://stash.example.com/rest/api/1.0/repos?limit=1000&start=0"
        );
    }

    #[test]
    fn renders_browse_url_keeping_path_separators() {
        let params = RequestParams::repository("INF", "api").with(FILE, "docs/READ ME.md");
        let url = Endpoint::BrowseFile
            .render("https://stash.example.com", &params)
            .expect("render");
        assert_eq!(
            url,
            "https://stash.example.com/rest/api/1.0/projects/INF/repos/api/browse/docs/READ%20ME.md?type=true"
        );
    }

    #[test]
    fn encodes_repository_segments() {
        let params = RequestParams::repository("INF", "my repo");
        let url = Endpoint::RepositorySize
            .render("http://localhost", &params)
            .expect("render");
        assert_eq!(
            url,
            "http://localhost/rest/reposize/latest/projects/INF/repos/my%20repo"
        );
    }

    #[test]
    fn renders_last_commit_url() {
        let params = RequestParams::repository("WEB", "site");
        let url = Endpoint::LastCommit
            .render("http://localhost", &params)
            .expect("render");
        assert_eq!(
            url,
            "http://localhost/rest/api/1.0/projects/WEB/repos/site/commits?limit=1"
        );
    }

    #[test]
    fn missing_parameter_is_reported() {
        let params = RequestParams::new().with(PROJECT_KEY, "INF");
        let err = Endpoint::LastCommit
            .render("http://localhost", &params)
            .unwrap_err();
        assert!(matches!(err, StashError::MissingParameter(ref key) if key == "name"));
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(Endpoint::ListRepositories.as_str(), "list_repositories");
        assert_eq!(Endpoint::BrowseFile.as_str(), "browse_file");
        assert_eq!(Endpoint::RepositorySize.as_str(), "repository_size");
        assert_eq!(Endpoint::LastCommit.as_str(), "last_commit");
    }
}
