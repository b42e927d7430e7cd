//! Domain entities for stash-inspector.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StashError};

/// Number of bytes in one megabyte, as the server's size plugin counts them.
pub const BYTES_IN_MEGABYTE: f64 = 1024.0 * 1024.0;
/// Repositories larger than this many megabytes are oversized.
pub const OVERSIZE_THRESHOLD_MB: f64 = 20.0;
/// Repositories without a commit in this many days are stale.
pub const STALE_AFTER_DAYS: i64 = 120;
/// Hygiene files probed at the repository root unless configured otherwise.
pub const DEFAULT_PROBE_FILES: [&str; 4] = ["README.md", "LICENSE", "AUTHORS", "CONTRIBUTORS"];

/// Returns the default probe file list as owned strings.
pub fn default_probe_files() -> Vec<String> {
    DEFAULT_PROBE_FILES.iter().map(|file| file.to_string()).collect()
}

/// Identifies one repository on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryIdentity {
    /// Repository slug, unique within its project.
    pub name: String,
    /// Display name of the owning project.
    pub project_name: String,
    /// Short unique key of the owning project.
    pub project_key: String,
}

impl RepositoryIdentity {
    /// Create a new repository identity.
    pub fn new(
        name: impl Into<String>,
        project_name: impl Into<String>,
        project_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            project_name: project_name.into(),
            project_key: project_key.into(),
        }
    }
}

/// Presence of one probed file at the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFlag {
    /// Path that was probed, relative to the repository root.
    pub path: String,
    /// Whether the server reported the file.
    pub present: bool,
}

/// Ordered presence flags, one per probed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileFlags(Vec<FileFlag>);

impl FileFlags {
    /// Record the presence of a file, replacing any earlier value for the same path.
    pub fn set(&mut self, path: &str, present: bool) {
        match self.0.iter_mut().find(|flag| flag.path == path) {
            Some(flag) => flag.present = present,
            None => self.0.push(FileFlag {
                path: path.to_string(),
                present,
            }),
        }
    }

    /// Presence of the given file, if it was probed.
    pub fn get(&self, path: &str) -> Option<bool> {
        self.0
            .iter()
            .find(|flag| flag.path == path)
            .map(|flag| flag.present)
    }

    /// Iterate over the flags in probe order.
    pub fn iter(&self) -> impl Iterator<Item = &FileFlag> {
        self.0.iter()
    }

    /// Whether every probed file is present.
    pub fn all_present(&self) -> bool {
        self.0.iter().all(|flag| flag.present)
    }

    /// Number of probed files.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no file was probed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Raw inspection results for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryMetadata {
    /// Which repository these results describe.
    #[serde(flatten)]
    pub identity: RepositoryIdentity,
    /// Repository size in megabytes.
    pub size_in_megabytes: f64,
    /// Size as formatted by the server.
    pub human_readable_size: String,
    /// Presence of each probed hygiene file.
    pub file_flags: FileFlags,
    /// Author time of the most recent commit, absent for empty repositories.
    pub last_commit: Option<DateTime<Utc>>,
}

/// Collects probe results for a repository until inspection completes.
#[derive(Debug, Clone)]
pub struct RepositoryMetadataBuilder {
    identity: RepositoryIdentity,
    probe_files: Vec<String>,
    file_flags: FileFlags,
    size: Option<(f64, String)>,
    last_commit: Option<DateTime<Utc>>,
}

impl RepositoryMetadataBuilder {
    /// Start collecting results for a repository probed for the given files.
    pub fn new(identity: RepositoryIdentity, probe_files: &[String]) -> Self {
        Self {
            identity,
            probe_files: probe_files.to_vec(),
            file_flags: FileFlags::default(),
            size: None,
            last_commit: None,
        }
    }

    /// Record whether a probed file exists.
    pub fn file(&mut self, path: &str, present: bool) -> &mut Self {
        self.file_flags.set(path, present);
        self
    }

    /// Record the raw size in bytes and the server's formatted size, if it sent one.
    pub fn size(&mut self, size_in_bytes: f64, human_readable: Option<String>) -> Result<&mut Self> {
        if !size_in_bytes.is_finite() || size_in_bytes < 0.0 {
            return Err(StashError::MalformedResponse(format!(
                "invalid repository size {size_in_bytes} for {}",
                self.identity.name
            )));
        }
        let megabytes = size_in_bytes / BYTES_IN_MEGABYTE;
        let human = human_readable.unwrap_or_else(|| format!("{megabytes:.2} MB"));
        self.size = Some((megabytes, human));
        Ok(self)
    }

    /// Record the last commit time.
    pub fn last_commit(&mut self, timestamp: Option<DateTime<Utc>>) -> &mut Self {
        self.last_commit = timestamp;
        self
    }

    /// Freeze the collected results. Probe files never recorded count as absent.
    pub fn build(self) -> Result<RepositoryMetadata> {
        let Some((size_in_megabytes, human_readable_size)) = self.size else {
            return Err(StashError::Other(format!(
                "size was never recorded for {}",
                self.identity.name
            )));
        };
        let mut file_flags = FileFlags::default();
        for path in &self.probe_files {
            file_flags.set(path, self.file_flags.get(path).unwrap_or(false));
        }
        for flag in self.file_flags.iter() {
            if file_flags.get(&flag.path).is_none() {
                file_flags.set(&flag.path, flag.present);
            }
        }
        Ok(RepositoryMetadata {
            identity: self.identity,
            size_in_megabytes,
            human_readable_size,
            file_flags,
            last_commit: self.last_commit,
        })
    }
}

/// Read-only policy view over a fully inspected repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Repo {
    metadata: RepositoryMetadata,
}

impl Repo {
    /// Wrap completed inspection results.
    pub fn new(metadata: RepositoryMetadata) -> Self {
        Self { metadata }
    }

    /// Repository slug.
    pub fn name(&self) -> &str {
        &self.metadata.identity.name
    }

    /// Key of the owning project.
    pub fn project_key(&self) -> &str {
        &self.metadata.identity.project_key
    }

    /// Size in megabytes.
    pub fn size(&self) -> f64 {
        self.metadata.size_in_megabytes
    }

    /// Size as formatted by the server.
    pub fn human_readable_size(&self) -> &str {
        &self.metadata.human_readable_size
    }

    /// Presence of each probed file.
    pub fn files(&self) -> &FileFlags {
        &self.metadata.file_flags
    }

    /// Author time of the most recent commit.
    pub fn last_commit(&self) -> Option<DateTime<Utc>> {
        self.metadata.last_commit
    }

    /// Underlying inspection results.
    pub fn metadata(&self) -> &RepositoryMetadata {
        &self.metadata
    }

    /// Whether the repository exceeds the size threshold.
    pub fn oversized(&self) -> bool {
        self.metadata.size_in_megabytes > OVERSIZE_THRESHOLD_MB
    }

    /// Whether every probed hygiene file is present.
    pub fn has_all_files(&self) -> bool {
        self.metadata.file_flags.all_present()
    }

    /// Whether the last commit is older than the staleness window.
    pub fn old(&self) -> bool {
        self.old_at(Utc::now())
    }

    /// Staleness evaluated against a fixed instant.
    pub fn old_at(&self, now: DateTime<Utc>) -> bool {
        match self.metadata.last_commit {
            Some(last_commit) => now - last_commit > Duration::days(STALE_AFTER_DAYS),
            None => false,
        }
    }
}

/// Repositories grouped under one project.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Project display name.
    pub name: String,
    /// Repositories in the order they were added.
    pub repos: Vec<Repo>,
}

impl Project {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repos: Vec::new(),
        }
    }

    /// Append a repository.
    pub fn add_repo(&mut self, repo: Repo) {
        self.repos.push(repo);
    }
}

/// A repository whose inspection failed while the rest of the run continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionFailure {
    /// Repository slug.
    pub repository: String,
    /// Display name of the owning project.
    pub project: String,
    /// Rendered error message.
    pub error: String,
}
