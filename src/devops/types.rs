use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use super::links;
use super::models::{
    Build, BuildDefinition, BuildDefinitionReference, GitBranchStats, GitItem, GitRepository,
    ReferenceLinks, TeamProject, VariableGroupModel,
};

/// Name of the placeholder record returned for pipeline id 0.
pub const NO_PIPELINE_NAME: &str = "No pipeline yet";

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProjectInfo {
    pub project_id: String,
    pub project_name: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub resource_url: String,
    pub git_repos: Vec<RepoInfo>,
}

impl From<&TeamProject> for ProjectInfo {
    fn from(project: &TeamProject) -> Self {
        Self {
            project_id: project.id.clone(),
            project_name: project.name.clone(),
            creation_date: project.last_update_time,
            resource_url: ReferenceLinks::web_href(project.links.as_ref()),
            git_repos: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RepoInfo {
    pub repo_id: String,
    pub repo_name: String,
    pub resource_url: String,
    pub default_branch: Option<String>,
}

impl From<&GitRepository> for RepoInfo {
    fn from(repo: &GitRepository) -> Self {
        Self {
            repo_id: repo.id.clone(),
            repo_name: repo.name.clone(),
            resource_url: repo.web_href(),
            default_branch: repo.default_branch.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BranchInfo {
    pub branch_name: String,
    pub last_commit_date: Option<DateTime<Utc>>,
    pub resource_url: String,
}

impl BranchInfo {
    pub fn new(branch: &GitBranchStats, repo_url: &str) -> Self {
        Self {
            branch_name: branch.name.clone(),
            last_commit_date: branch.last_commit_date(),
            resource_url: links::branch_url(repo_url, &branch.name),
        }
    }
}

fn app_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\.app\.[^/\\]+$").expect("valid regex"))
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FileItem {
    pub path: String,
    /// Extension including the dot, empty when the file has none.
    pub file_type: String,
    pub resource_url: String,
    /// File follows the `name.app.ext` extension-point convention.
    pub is_app_file: bool,
}

impl FileItem {
    pub fn new(item: &GitItem, branch_url: &str) -> Self {
        let file_name = item.path.rsplit('/').next().unwrap_or(&item.path);
        let file_type = file_name
            .rfind('.')
            .filter(|idx| *idx > 0)
            .map(|idx| file_name[idx..].to_string())
            .unwrap_or_default();

        Self {
            path: item.path.clone(),
            file_type,
            resource_url: links::file_url(branch_url, &item.path),
            is_app_file: app_file_pattern().is_match(file_name),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PipelineDefinitionInfo {
    pub id: i32,
    pub name: String,
    pub queue_status: String,
    pub yaml_file_name: String,
    pub path: String,
    pub repo_guid: String,
    pub repository_name: String,
    pub default_branch: String,
    pub resource_url: String,
}

impl PipelineDefinitionInfo {
    pub fn placeholder() -> Self {
        Self {
            name: NO_PIPELINE_NAME.to_string(),
            ..Self::default()
        }
    }

    /// Listing entries take name, status and path from the reference and the
    /// repository binding from the full definition.
    pub fn from_reference(reference: &BuildDefinitionReference, full: &BuildDefinition) -> Self {
        Self {
            id: reference.id,
            name: reference.name.clone(),
            queue_status: reference.queue_status.as_str().to_string(),
            path: reference.path.clone(),
            ..Self::from(full)
        }
    }
}

impl From<&BuildDefinition> for PipelineDefinitionInfo {
    fn from(definition: &BuildDefinition) -> Self {
        let repository = definition.repository.as_ref();
        Self {
            id: definition.id,
            name: definition.name.clone(),
            queue_status: definition.queue_status.as_str().to_string(),
            yaml_file_name: definition.yaml_filename(),
            path: definition.path.clone(),
            repo_guid: repository.map(|r| r.id.clone()).unwrap_or_default(),
            repository_name: repository.map(|r| r.name.clone()).unwrap_or_default(),
            default_branch: repository
                .map(|r| r.default_branch.clone())
                .unwrap_or_default(),
            resource_url: ReferenceLinks::web_href(definition.links.as_ref()),
        }
    }
}

/// Summary returned by the pipeline create/update flow.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BuildDefinitionSummary {
    pub id: i32,
    pub name: String,
    pub queue_status: String,
    pub yaml_file_name: String,
    pub repo_guid: String,
    pub repository_name: String,
    pub default_branch: String,
    pub resource_url: String,
    pub yaml_contents: String,
}

impl BuildDefinitionSummary {
    pub fn new(definition: &BuildDefinition, yaml_contents: String) -> Self {
        let info = PipelineDefinitionInfo::from(definition);
        Self {
            id: info.id,
            name: info.name,
            queue_status: info.queue_status,
            yaml_file_name: info.yaml_file_name,
            repo_guid: info.repo_guid,
            repository_name: info.repository_name,
            default_branch: info.default_branch,
            resource_url: info.resource_url,
            yaml_contents,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub is_secret: bool,
    pub is_read_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct VariableGroup {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub resource_url: String,
    pub variables: Vec<Variable>,
}

impl VariableGroup {
    pub fn new(group: &VariableGroupModel, project_url: &str) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            description: group.description.clone().unwrap_or_default(),
            resource_url: links::variable_group_url(project_url, group.id),
            variables: group
                .variables
                .iter()
                .map(|(name, value)| Variable {
                    name: name.clone(),
                    value: value.value.clone().unwrap_or_default(),
                    is_secret: value.is_secret,
                    is_read_only: value.is_read_only,
                })
                .collect(),
        }
    }

    /// Reconciliation identity: trimmed, case-insensitive name.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PipelineRun {
    pub id: i32,
    pub status: String,
    pub result: String,
    pub queue_time: DateTime<Utc>,
    pub resource_url: String,
}

impl From<&Build> for PipelineRun {
    fn from(build: &Build) -> Self {
        Self {
            id: build.id,
            status: build.status.clone().unwrap_or_default(),
            result: build.result.clone().unwrap_or_default(),
            queue_time: build.queue_time.unwrap_or_else(Utc::now),
            resource_url: ReferenceLinks::web_href(build.links.as_ref()),
        }
    }
}

/// Outcome of a git file write. Failures are reported here, not raised.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct GitUpdateResult {
    pub success: bool,
    pub message: String,
}

impl GitUpdateResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devops::models::{BuildRepository, DefinitionQueueStatus, Link};

    fn item(path: &str) -> GitItem {
        GitItem {
            path: path.to_string(),
            ..GitItem::default()
        }
    }

    #[test]
    fn test_file_item_flags_app_files() {
        let branch = "https://dev.azure.com/o/p/_git/r?version=GBmain";

        let app = FileItem::new(&item("/Web/DataAccess.App.cs"), branch);
        assert!(app.is_app_file);
        assert_eq!(app.file_type, ".cs");
        assert_eq!(app.resource_url, format!("{branch}&path=/Web/DataAccess.App.cs"));

        let core = FileItem::new(&item("/Web/DataAccess.cs"), branch);
        assert!(!core.is_app_file);

        let folder_named_app = FileItem::new(&item("/my.app.folder/readme"), branch);
        assert!(!folder_named_app.is_app_file);
        assert_eq!(folder_named_app.file_type, "");
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        let file = FileItem::new(&item("/.gitignore"), "u");
        assert_eq!(file.file_type, "");
    }

    #[test]
    fn test_pipeline_listing_mixes_reference_and_definition() {
        let reference = BuildDefinitionReference {
            id: 3,
            name: "web".into(),
            path: "\\Projects\\Web".into(),
            queue_status: DefinitionQueueStatus::Disabled,
        };
        let full = BuildDefinition {
            id: 3,
            name: "stale".into(),
            repository: Some(BuildRepository {
                id: "r-1".into(),
                name: "Pipelines".into(),
                default_branch: "refs/heads/main".into(),
                ..BuildRepository::default()
            }),
            links: Some(ReferenceLinks {
                web: Some(Link {
                    href: "https://dev.azure.com/o/p/_build/definition?definitionId=3".into(),
                }),
            }),
            ..BuildDefinition::default()
        };

        let info = PipelineDefinitionInfo::from_reference(&reference, &full);
        assert_eq!(info.name, "web");
        assert_eq!(info.queue_status, "Disabled");
        assert_eq!(info.repository_name, "Pipelines");
        assert_eq!(info.default_branch, "refs/heads/main");
        assert!(info.resource_url.ends_with("definitionId=3"));
    }

    #[test]
    fn test_run_without_queue_time_uses_now() {
        let before = Utc::now();
        let run = PipelineRun::from(&Build {
            id: 1,
            ..Build::default()
        });
        assert!(run.queue_time >= before);
        assert_eq!(run.result, "");
    }

    #[test]
    fn test_variable_group_name_match_is_trimmed_and_case_insensitive() {
        let group = VariableGroup {
            name: " Web-Dev ".into(),
            ..VariableGroup::default()
        };
        assert!(group.matches_name("web-dev"));
        assert!(!group.matches_name("web-prod"));
    }
}
