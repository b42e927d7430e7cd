//! Grouping of inspected repositories by owning project.

use std::collections::HashMap;

use crate::domain::{Project, Repo, RepositoryMetadata};

/// Group inspection results into projects.
///
/// Projects appear in the order their first repository was seen, and each project's
/// repositories keep their input order.
pub fn aggregate<I>(metadata: I) -> Vec<Project>
where
    I: IntoIterator<Item = RepositoryMetadata>,
{
    let mut projects: Vec<Project> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in metadata {
        let slot = match index.get(&entry.identity.project_name) {
            Some(slot) => *slot,
            None => {
                let name = entry.identity.project_name.clone();
                projects.push(Project::new(name.clone()));
                index.insert(name, projects.len() - 1);
                projects.len() - 1
            }
        };
        projects[slot].add_repo(Repo::new(entry));
    }

    projects
}

#[cfg(test)]
mod tests {
    use super::aggregate;
    use crate::domain::{FileFlags, Project, Repo, RepositoryIdentity, RepositoryMetadata};
    use std::collections::{BTreeMap, BTreeSet};

    fn metadata(name: &str, project: &str) -> RepositoryMetadata {
        RepositoryMetadata {
            identity: RepositoryIdentity::new(name, project, project.to_uppercase()),
            size_in_megabytes: 1.0,
            human_readable_size: "1 MB".to_string(),
            file_flags: FileFlags::default(),
            last_commit: None,
        }
    }

    fn as_sets(projects: &[Project]) -> BTreeMap<String, BTreeSet<String>> {
        projects
            .iter()
            .map(|project| {
                let repos = project.repos.iter().map(|r| r.name().to_string()).collect();
                (project.name.clone(), repos)
            })
            .collect()
    }

    #[test]
    fn empty_input_yields_no_projects() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[test]
    fn groups_by_project_name() {
        let projects = aggregate(vec![
            metadata("api", "Infra"),
            metadata("site", "Web"),
            metadata("deploy", "Infra"),
        ]);

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Infra");
        let infra: Vec<&str> = projects[0].repos.iter().map(Repo::name).collect();
        assert_eq!(infra, vec!["api", "deploy"]);
        assert_eq!(projects[1].name, "Web");
        assert_eq!(projects[1].repos.len(), 1);
    }

    #[test]
    fn grouping_is_independent_of_input_order() {
        let forward = vec![
            metadata("api", "Infra"),
            metadata("site", "Web"),
            metadata("deploy", "Infra"),
            metadata("docs", "Web"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(as_sets(&aggregate(forward)), as_sets(&aggregate(reversed)));
    }
}
