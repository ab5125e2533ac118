//! Wire-level shapes of the Azure DevOps REST resources this tool touches.
//!
//! Only the fields the pipeline workflow reads or writes are modelled. Build
//! definitions keep every other field in a flattened map so an update sends
//! back what it received.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Standard `{ "count": n, "value": [...] }` collection envelope.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<Link>,
}

impl ReferenceLinks {
    pub fn web_href(links: Option<&Self>) -> String {
        links
            .and_then(|l| l.web.as_ref())
            .map(|web| web.href.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<DateTime<Utc>>,
    #[serde(rename = "_links", default)]
    pub links: Option<ReferenceLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Option<ReferenceLinks>,
}

impl GitRepository {
    pub fn web_href(&self) -> String {
        let href = ReferenceLinks::web_href(self.links.as_ref());
        if href.is_empty() {
            self.web_url.clone().unwrap_or_default()
        } else {
            href
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitUserDate {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommitSummary {
    #[serde(default)]
    pub commit_id: String,
    #[serde(default)]
    pub committer: Option<GitUserDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitBranchStats {
    pub name: String,
    #[serde(default)]
    pub commit: Option<GitCommitSummary>,
}

impl GitBranchStats {
    pub fn last_commit_date(&self) -> Option<DateTime<Utc>> {
        self.commit
            .as_ref()
            .and_then(|c| c.committer.as_ref())
            .and_then(|committer| committer.date)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitItem {
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub commit_id: String,
    pub path: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    pub name: String,
    pub object_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContent {
    pub content: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItem {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitChange {
    pub change_type: ChangeType,
    pub item: ChangeItem,
    pub new_content: ItemContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCommitRef {
    pub comment: String,
    pub changes: Vec<GitChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRefUpdate {
    pub name: String,
    pub old_object_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitPush {
    pub ref_updates: Vec<GitRefUpdate>,
    pub commits: Vec<GitCommitRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_id: Option<i64>,
}

impl GitPush {
    /// A push carrying a single commit with a single raw-text change.
    pub fn single_change(
        branch_ref: String,
        old_object_id: String,
        comment: &str,
        change_type: ChangeType,
        path: String,
        content: String,
    ) -> Self {
        Self {
            ref_updates: vec![GitRefUpdate {
                name: branch_ref,
                old_object_id,
            }],
            commits: vec![GitCommitRef {
                comment: comment.to_string(),
                changes: vec![GitChange {
                    change_type,
                    item: ChangeItem { path },
                    new_content: ItemContent {
                        content,
                        content_type: "rawtext".to_string(),
                    },
                }],
            }],
            push_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefinitionQueueStatus {
    #[default]
    Enabled,
    Paused,
    Disabled,
}

impl DefinitionQueueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "Enabled",
            Self::Paused => "Paused",
            Self::Disabled => "Disabled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPoolQueue {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentQueue {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Repository property key for clean options.
pub const CLEAN_OPTIONS_PROPERTY: &str = "cleanOptions";
/// Repository property key for shallow fetch depth.
pub const FETCH_DEPTH_PROPERTY: &str = "fetchDepth";
/// `RepositoryCleanOptions.AllBuildDir`
pub const CLEAN_ALL_BUILD_DIRECTORY: i32 = 3;
pub const TFS_GIT_REPOSITORY: &str = "TfsGit";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRepository {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// YAML process type id.
pub const YAML_PROCESS_TYPE: i32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildProcess {
    #[serde(rename = "type", default)]
    pub kind: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildProcess {
    pub fn yaml(filename: String) -> Self {
        Self {
            kind: YAML_PROCESS_TYPE,
            yaml_filename: Some(filename),
            extra: Map::new(),
        }
    }
}

pub const CONTINUOUS_INTEGRATION_TRIGGER: &str = "continuousIntegration";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTrigger {
    pub trigger_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_source_type: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_changes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_builds_per_branch: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildTrigger {
    /// CI trigger driven by the YAML file, batched, one build per branch at a time.
    pub fn continuous_integration() -> Self {
        Self {
            trigger_type: CONTINUOUS_INTEGRATION_TRIGGER.to_string(),
            settings_source_type: Some(2),
            batch_changes: Some(true),
            max_concurrent_builds_per_branch: Some(1),
            extra: Map::new(),
        }
    }

    pub fn is_continuous_integration(&self) -> bool {
        self.trigger_type == CONTINUOUS_INTEGRATION_TRIGGER
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefinition {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i32>,
    #[serde(default)]
    pub queue_status: DefinitionQueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<AgentPoolQueue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<BuildRepository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<BuildProcess>,
    #[serde(default)]
    pub triggers: Vec<BuildTrigger>,
    #[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ReferenceLinks>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildDefinition {
    pub fn yaml_filename(&self) -> String {
        self.process
            .as_ref()
            .filter(|p| p.kind == YAML_PROCESS_TYPE || p.yaml_filename.is_some())
            .and_then(|p| p.yaml_filename.clone())
            .unwrap_or_default()
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i32) -> bool {
    *value == 0
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefinitionReference {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub queue_status: DefinitionQueueStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: i32,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub queue_time: Option<DateTime<Utc>>,
    #[serde(rename = "_links", default)]
    pub links: Option<ReferenceLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValue {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub is_read_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableGroupModel {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub variables: IndexMap<String, VariableValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableGroupProjectReference {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_reference: ProjectReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableGroupParameters {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub variables: IndexMap<String, VariableValue>,
    pub variable_group_project_references: Vec<VariableGroupProjectReference>,
}
