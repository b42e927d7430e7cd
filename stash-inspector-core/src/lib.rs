#![deny(missing_docs)]
//! stash-inspector core library.
//!
//! This crate contains the domain types, server client, and inspection pipeline
//! stages used to audit repositories hosted on a Stash / Bitbucket Server instance.

pub mod aggregate;
pub mod client;
pub mod clock;
pub mod domain;
pub mod endpoint;
pub mod enumerator;
pub mod error;
pub mod inspector;
pub mod report;

pub use aggregate::aggregate;
pub use client::{ClientConfig, Credentials, HttpStashClient, JsonFuture, StashClient};
pub use clock::{Clock, SystemClock};
pub use domain::{
    BYTES_IN_MEGABYTE, DEFAULT_PROBE_FILES, FileFlag, FileFlags, InspectionFailure,
    OVERSIZE_THRESHOLD_MB, Project, Repo, RepositoryIdentity, RepositoryMetadata,
    RepositoryMetadataBuilder, STALE_AFTER_DAYS, default_probe_files,
};
pub use endpoint::{Endpoint, RequestParams};
pub use enumerator::{DEFAULT_PAGE_SIZE, ProjectFilter, RepositoryEnumerator};
pub use error::{Result, StashError};
pub use inspector::RepositoryInspector;
pub use report::{
    ProjectSummary, RepoSummary, Report, Totals, render_html, render_json, render_markdown,
};
