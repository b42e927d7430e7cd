//! Bounded-concurrency inspection of every enumerated repository.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use stash_inspector_core::{
    InspectionFailure, Project, RepositoryIdentity, RepositoryInspector, RepositoryMetadata,
    StashClient, StashError, aggregate,
};
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};

use crate::CliResult;

/// How repositories are scheduled and how failures are handled.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PipelineOptions {
    /// Maximum repositories inspected at once.
    pub(crate) concurrency: usize,
    /// Record failing repositories and keep going instead of aborting.
    pub(crate) skip_failed: bool,
}

/// Aggregated projects plus any repositories that could not be inspected.
#[derive(Debug)]
pub(crate) struct AuditOutcome {
    pub(crate) projects: Vec<Project>,
    pub(crate) failures: Vec<InspectionFailure>,
}

type Joined = Result<(Id, Result<RepositoryMetadata, StashError>), JoinError>;

/// Inspect every repository and group the results by project.
///
/// Repositories start in enumeration order, at most `concurrency` at a time.
/// Probes within a repository always run in order.
pub(crate) async fn inspect_all<C>(
    inspector: Arc<RepositoryInspector<C>>,
    identities: Vec<RepositoryIdentity>,
    options: PipelineOptions,
) -> CliResult<AuditOutcome>
where
    C: StashClient + Send + Sync + 'static,
{
    let concurrency = if options.concurrency == 0 {
        1
    } else {
        options.concurrency
    };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();
    let mut collector = Collector::new(options.skip_failed);

    for (index, identity) in identities.into_iter().enumerate() {
        while let Some(joined) = tasks.try_join_next_with_id() {
            collector.record(joined);
        }
        if collector.aborted() {
            break;
        }
        let permit = semaphore.clone().acquire_owned().await?;
        let inspector = inspector.clone();
        let target = identity.clone();
        let handle = tasks.spawn(async move {
            let _permit = permit;
            inspector.inspect(&target).await
        });
        collector.track(handle.id(), index, identity);
    }

    while let Some(joined) = tasks.join_next_with_id().await {
        collector.record(joined);
        if collector.aborted() {
            tasks.abort_all();
        }
    }

    collector.finish()
}

/// Maps finished tasks back to their repositories.
struct Collector {
    skip_failed: bool,
    pending: HashMap<Id, (usize, RepositoryIdentity)>,
    inspected: Vec<(usize, RepositoryMetadata)>,
    failures: Vec<(usize, InspectionFailure)>,
    first_error: Option<(usize, String)>,
}

impl Collector {
    fn new(skip_failed: bool) -> Self {
        Self {
            skip_failed,
            pending: HashMap::new(),
            inspected: Vec::new(),
            failures: Vec::new(),
            first_error: None,
        }
    }

    fn track(&mut self, id: Id, index: usize, identity: RepositoryIdentity) {
        self.pending.insert(id, (index, identity));
    }

    fn aborted(&self) -> bool {
        self.first_error.is_some()
    }

    fn record(&mut self, joined: Joined) {
        let (id, outcome) = match joined {
            Ok((id, result)) => (id, result.map_err(|err| err.to_string())),
            Err(err) if err.is_cancelled() && self.aborted() => {
                self.pending.remove(&err.id());
                return;
            }
            Err(err) => (err.id(), Err(format!("inspection task failed: {err}"))),
        };
        let Some((index, identity)) = self.pending.remove(&id) else {
            warn!("dropping result of untracked inspection task {id}");
            return;
        };

        match outcome {
            Ok(metadata) => self.inspected.push((index, metadata)),
            Err(error) if self.skip_failed => {
                warn!(
                    "skipping {}/{}: {error}",
                    identity.project_key, identity.name
                );
                self.failures.push((
                    index,
                    InspectionFailure {
                        repository: identity.name,
                        project: identity.project_name,
                        error,
                    },
                ));
            }
            Err(error) => {
                let message = format!(
                    "inspection of {}/{} failed: {error}",
                    identity.project_key, identity.name
                );
                // Keep the earliest failure in enumeration order.
                if self
                    .first_error
                    .as_ref()
                    .is_none_or(|(first, _)| index < *first)
                {
                    self.first_error = Some((index, message));
                }
            }
        }
    }

    fn finish(mut self) -> CliResult<AuditOutcome> {
        if let Some((_, message)) = self.first_error {
            return Err(message.into());
        }
        self.inspected.sort_by_key(|(index, _)| *index);
        self.failures.sort_by_key(|(index, _)| *index);
        info!(
            "inspected {} repositories, {} failed",
            self.inspected.len(),
            self.failures.len()
        );

        Ok(AuditOutcome {
            projects: aggregate(self.inspected.into_iter().map(|(_, metadata)| metadata)),
            failures: self
                .failures
                .into_iter()
                .map(|(_, failure)| failure)
                .collect(),
        })
    }
}
