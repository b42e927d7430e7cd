//! Remote inspection of a single repository.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

use crate::client::StashClient;
use crate::domain::{
    RepositoryIdentity, RepositoryMetadata, RepositoryMetadataBuilder, default_probe_files,
};
use crate::endpoint::{Endpoint, FILE, RequestParams};
use crate::error::{Result, StashError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizeResponse {
    size_raw: Option<f64>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitPage {
    #[serde(default)]
    values: Vec<Value>,
}

/// Probes a repository for hygiene files, size, and last commit.
pub struct RepositoryInspector<C: StashClient> {
    client: C,
    probe_files: Vec<String>,
}

impl<C: StashClient> RepositoryInspector<C> {
    /// Create an inspector probing the default hygiene files.
    pub fn new(client: C) -> Self {
        Self {
            client,
            probe_files: default_probe_files(),
        }
    }

    /// Create an inspector probing a custom file list.
    pub fn with_probe_files(client: C, probe_files: Vec<String>) -> Self {
        Self {
            client,
            probe_files,
        }
    }

    /// Files checked at each repository root.
    pub fn probe_files(&self) -> &[String] {
        &self.probe_files
    }

    /// Borrow the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run every probe for the repository, in order, and collect the results.
    pub async fn inspect(&self, identity: &RepositoryIdentity) -> Result<RepositoryMetadata> {
        info!("[{}/{}]", identity.project_key, identity.name);
        let repository = RequestParams::repository(&identity.project_key, &identity.name);
        let mut builder = RepositoryMetadataBuilder::new(identity.clone(), &self.probe_files);

        for file in &self.probe_files {
            let present = self.probe_file(&repository, file).await?;
            debug!("{}: {file} present={present}", identity.name);
            builder.file(file, present);
        }

        let (size_in_bytes, human_readable) = self.probe_size(&repository).await?;
        debug!("{}: size={size_in_bytes} bytes", identity.name);
        builder.size(size_in_bytes, human_readable)?;

        let last_commit = self.probe_last_commit(&repository).await?;
        debug!("{}: last_commit={last_commit:?}", identity.name);
        builder.last_commit(last_commit);

        builder.build()
    }

    async fn probe_file(&self, repository: &RequestParams, file: &str) -> Result<bool> {
        let params = repository.clone().with(FILE, file);
        match self.client.get_json(Endpoint::BrowseFile, &params).await {
            Ok(body) => Ok(has_type_key(&body)),
            Err(err) if err.is_malformed() => {
                debug!("treating unreadable probe for {file} as absent: {err}");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn probe_size(&self, repository: &RequestParams) -> Result<(f64, Option<String>)> {
        let body = self
            .client
            .get_json(Endpoint::RepositorySize, repository)
            .await?;
        let response: SizeResponse = serde_json::from_value(body)
            .map_err(|err| StashError::MalformedResponse(format!("repository size: {err}")))?;
        let size_raw = response.size_raw.ok_or_else(|| {
            StashError::MalformedResponse(
                "repository size response missing sizeRaw (is the reposize plugin installed?)"
                    .to_string(),
            )
        })?;
        Ok((size_raw, response.size))
    }

    async fn probe_last_commit(&self, repository: &RequestParams) -> Result<Option<DateTime<Utc>>> {
        let body = self
            .client
            .get_json(Endpoint::LastCommit, repository)
            .await?;
        let page: CommitPage = serde_json::from_value(body)
            .map_err(|err| StashError::MalformedResponse(format!("last commit: {err}")))?;
        let Some(first) = page.values.first() else {
            return Ok(None);
        };
        let millis = first
            .get("authorTimestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                StashError::MalformedResponse("last commit missing authorTimestamp".to_string())
            })?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            StashError::MalformedResponse(format!("authorTimestamp out of range: {millis}"))
        })?;
        Ok(Some(timestamp))
    }
}

fn has_type_key(body: &Value) -> bool {
    body.as_object()
        .is_some_and(|object| object.contains_key("type"))
}
