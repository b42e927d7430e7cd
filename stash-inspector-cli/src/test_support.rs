//! In-memory repository server used by CLI tests.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use stash_inspector_core::endpoint::{FILE, NAME};
use stash_inspector_core::{
    Clock, Endpoint, JsonFuture, RepositoryIdentity, RequestParams, StashClient, StashError,
};

/// Serves a fixed repository listing and canned probe responses.
pub(crate) struct FakeServer {
    listing: Value,
    failing: HashSet<String>,
}

impl FakeServer {
    pub(crate) fn new(identities: &[RepositoryIdentity]) -> Self {
        let values: Vec<Value> = identities
            .iter()
            .map(|identity| {
                json!({
                    "slug": identity.name,
                    "project": {"name": identity.project_name, "key": identity.project_key}
                })
            })
            .collect();
        Self {
            listing: json!({"values": values, "isLastPage": true}),
            failing: HashSet::new(),
        }
    }

    /// Make the size probe of the named repository fail with a transport error.
    pub(crate) fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    fn respond(&self, endpoint: Endpoint, params: &RequestParams) -> Result<Value, StashError> {
        let name = params.get(NAME).unwrap_or_default();
        match endpoint {
            Endpoint::ListRepositories => Ok(self.listing.clone()),
            Endpoint::BrowseFile => match params.get(FILE) {
                Some("README.md") => Ok(json!({"type": "FILE"})),
                _ => Ok(json!({"errors": [{"message": "not found"}]})),
            },
            Endpoint::RepositorySize if self.failing.contains(name) => {
                Err(StashError::Transport("connection reset".to_string()))
            }
            Endpoint::RepositorySize => {
                let size_raw = if name == "api" { 31_457_280 } else { 524_288 };
                Ok(json!({"sizeRaw": size_raw, "size": format!("{size_raw} B")}))
            }
            Endpoint::LastCommit if name == "docs" => Ok(json!({"values": []})),
            Endpoint::LastCommit => {
                Ok(json!({"values": [{"authorTimestamp": 1_577_836_800_000i64}]}))
            }
        }
    }
}

impl StashClient for FakeServer {
    fn get_json<'a>(&'a self, endpoint: Endpoint, params: &'a RequestParams) -> JsonFuture<'a> {
        Box::pin(async move { self.respond(endpoint, params) })
    }
}

/// Clock pinned to a single instant.
pub(crate) struct FixedClock(pub(crate) DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
