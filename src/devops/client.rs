mod build;
mod distributed_task;
mod git;
mod projects;
mod rest;

use async_trait::async_trait;

pub use self::rest::{DevOpsClient, RestConnector};

use super::api::DevOpsApi;
use super::models::{
    AgentQueue, Build, BuildDefinition, BuildDefinitionReference, GitBranchStats, GitItem,
    GitPush, GitRef, GitRepository, TeamProject, VariableGroupModel, VariableGroupParameters,
};
use crate::error::Result;

#[async_trait]
impl DevOpsApi for DevOpsClient {
    fn org_url(&self) -> String {
        self.org_url().to_string()
    }

    async fn list_projects(&self) -> Result<Vec<TeamProject>> {
        self.fetch_projects().await
    }

    async fn get_project(&self, project: &str) -> Result<TeamProject> {
        self.fetch_project(project).await
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<GitRepository>> {
        self.fetch_repositories(project).await
    }

    async fn get_repository(&self, project: &str, repo: &str) -> Result<GitRepository> {
        self.fetch_repository(project, repo).await
    }

    async fn list_branches(&self, project: &str, repo: &str) -> Result<Vec<GitBranchStats>> {
        self.fetch_branches(project, repo).await
    }

    async fn get_branch(
        &self,
        project: &str,
        repo: &str,
        branch: &str,
    ) -> Result<GitBranchStats> {
        self.fetch_branch(project, repo, branch).await
    }

    async fn list_items(&self, project: &str, repo: &str, branch: &str) -> Result<Vec<GitItem>> {
        self.fetch_items(project, repo, branch).await
    }

    async fn get_item(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
        include_content: bool,
    ) -> Result<Option<GitItem>> {
        self.fetch_item(project, repo, path, branch, include_content)
            .await
    }

    async fn get_refs(&self, project: &str, repo: &str, filter: &str) -> Result<Vec<GitRef>> {
        self.fetch_refs(project, repo, filter).await
    }

    async fn create_push(&self, project: &str, repo: &str, push: &GitPush) -> Result<GitPush> {
        self.push(project, repo, push).await
    }

    async fn list_definitions(&self, project: &str) -> Result<Vec<BuildDefinitionReference>> {
        self.fetch_definitions(project).await
    }

    async fn get_definition(&self, project: &str, definition_id: i32) -> Result<BuildDefinition> {
        self.fetch_definition(project, definition_id).await
    }

    async fn create_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        self.post_definition(project, definition).await
    }

    async fn update_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        self.put_definition(project, definition).await
    }

    async fn list_builds(&self, project: &str, definition_id: i32) -> Result<Vec<Build>> {
        self.fetch_builds(project, definition_id).await
    }

    async fn list_agent_queues(&self, project: &str) -> Result<Vec<AgentQueue>> {
        self.fetch_agent_queues(project).await
    }

    async fn list_variable_groups(&self, project: &str) -> Result<Vec<VariableGroupModel>> {
        self.fetch_variable_groups(project).await
    }

    async fn add_variable_group(
        &self,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel> {
        self.post_variable_group(parameters).await
    }

    async fn update_variable_group(
        &self,
        group_id: i32,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel> {
        self.put_variable_group(group_id, parameters).await
    }
}
