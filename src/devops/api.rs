use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::auth::Connection;
use crate::error::Result;

use super::models::{
    AgentQueue, Build, BuildDefinition, BuildDefinitionReference, GitBranchStats, GitItem,
    GitPush, GitRef, GitRepository, TeamProject, VariableGroupModel, VariableGroupParameters,
};

/// Remote operations against one Azure DevOps organization.
///
/// `project` arguments accept either the project name or its id. Every call
/// observes the session's cancellation token and fails with
/// [`FreeCicdError::Cancelled`](crate::error::FreeCicdError::Cancelled) once it fires.
#[async_trait]
pub trait DevOpsApi: Send + Sync {
    /// Organization root, e.g. `https://dev.azure.com/contoso/`.
    fn org_url(&self) -> String;

    async fn list_projects(&self) -> Result<Vec<TeamProject>>;

    async fn get_project(&self, project: &str) -> Result<TeamProject>;

    async fn list_repositories(&self, project: &str) -> Result<Vec<GitRepository>>;

    async fn get_repository(&self, project: &str, repo: &str) -> Result<GitRepository>;

    async fn list_branches(&self, project: &str, repo: &str) -> Result<Vec<GitBranchStats>>;

    async fn get_branch(&self, project: &str, repo: &str, branch: &str)
        -> Result<GitBranchStats>;

    /// Full recursive listing of a branch.
    async fn list_items(&self, project: &str, repo: &str, branch: &str) -> Result<Vec<GitItem>>;

    /// Returns `Ok(None)` when the path does not exist at that version.
    async fn get_item(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
        include_content: bool,
    ) -> Result<Option<GitItem>>;

    async fn get_refs(&self, project: &str, repo: &str, filter: &str) -> Result<Vec<GitRef>>;

    async fn create_push(&self, project: &str, repo: &str, push: &GitPush) -> Result<GitPush>;

    async fn list_definitions(&self, project: &str) -> Result<Vec<BuildDefinitionReference>>;

    async fn get_definition(&self, project: &str, definition_id: i32) -> Result<BuildDefinition>;

    async fn create_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition>;

    async fn update_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition>;

    /// Builds of one definition, in the order the service returns them.
    async fn list_builds(&self, project: &str, definition_id: i32) -> Result<Vec<Build>>;

    async fn list_agent_queues(&self, project: &str) -> Result<Vec<AgentQueue>>;

    async fn list_variable_groups(&self, project: &str) -> Result<Vec<VariableGroupModel>>;

    async fn add_variable_group(
        &self,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel>;

    async fn update_variable_group(
        &self,
        group_id: i32,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel>;
}

/// Opens sessions against Azure DevOps.
///
/// One session is opened per top-level operation and released when it is
/// dropped, whether the operation succeeded or not.
pub trait Connector: Send + Sync {
    type Session: DevOpsApi;

    fn connect(&self, connection: &Connection, cancel: CancellationToken) -> Result<Self::Session>;
}
