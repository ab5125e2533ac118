use reqwest::Method;

use super::rest::{DevOpsClient, API_VERSION};
use crate::devops::models::{GitBranchStats, GitItem, GitPush, GitRef, GitRepository};
use crate::error::{FreeCicdError, Result};

impl DevOpsClient {
    fn repo_endpoint(&self, project: &str, repo: &str, path: &str) -> Result<url::Url> {
        self.project_endpoint(
            project,
            &format!("_apis/git/repositories/{}{path}", urlencoding::encode(repo)),
        )
    }

    pub(super) async fn fetch_repositories(&self, project: &str) -> Result<Vec<GitRepository>> {
        let url = self.project_endpoint(project, "_apis/git/repositories")?;
        self.get_list(url, API_VERSION, &format!("repositories of '{project}'"))
            .await
    }

    pub(super) async fn fetch_repository(
        &self,
        project: &str,
        repo: &str,
    ) -> Result<GitRepository> {
        let url = self.repo_endpoint(project, repo, "")?;
        self.get_json(url, API_VERSION, &format!("repository '{repo}' in '{project}'"))
            .await
    }

    pub(super) async fn fetch_branches(
        &self,
        project: &str,
        repo: &str,
    ) -> Result<Vec<GitBranchStats>> {
        let url = self.repo_endpoint(project, repo, "/stats/branches")?;
        self.get_list(url, API_VERSION, &format!("branches of '{repo}'"))
            .await
    }

    pub(super) async fn fetch_branch(
        &self,
        project: &str,
        repo: &str,
        branch: &str,
    ) -> Result<GitBranchStats> {
        let mut url = self.repo_endpoint(project, repo, "/stats/branches")?;
        url.query_pairs_mut().append_pair("name", branch);
        self.get_json(url, API_VERSION, &format!("branch '{branch}' in '{repo}'"))
            .await
    }

    pub(super) async fn fetch_items(
        &self,
        project: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<GitItem>> {
        let mut url = self.repo_endpoint(project, repo, "/items")?;
        url.query_pairs_mut()
            .append_pair("recursionLevel", "Full")
            .append_pair("versionDescriptor.version", branch)
            .append_pair("versionDescriptor.versionType", "branch");
        self.get_list(url, API_VERSION, &format!("branch '{branch}' in '{repo}'"))
            .await
    }

    pub(super) async fn fetch_item(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
        include_content: bool,
    ) -> Result<Option<GitItem>> {
        let mut url = self.repo_endpoint(project, repo, "/items")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("path", path)
                .append_pair("includeContent", if include_content { "true" } else { "false" })
                .append_pair("$format", "json");
            if let Some(branch) = branch {
                query
                    .append_pair("versionDescriptor.version", branch)
                    .append_pair("versionDescriptor.versionType", "branch");
            }
        }

        match self
            .get_json(url, API_VERSION, &format!("item '{path}' in '{repo}'"))
            .await
        {
            Ok(item) => Ok(Some(item)),
            Err(FreeCicdError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(super) async fn fetch_refs(
        &self,
        project: &str,
        repo: &str,
        filter: &str,
    ) -> Result<Vec<GitRef>> {
        let mut url = self.repo_endpoint(project, repo, "/refs")?;
        url.query_pairs_mut().append_pair("filter", filter);
        self.get_list(url, API_VERSION, &format!("refs of '{repo}'"))
            .await
    }

    pub(super) async fn push(&self, project: &str, repo: &str, push: &GitPush) -> Result<GitPush> {
        let url = self.repo_endpoint(project, repo, "/pushes")?;
        self.send_json(
            Method::POST,
            url,
            API_VERSION,
            push,
            &format!("repository '{repo}' in '{project}'"),
        )
        .await
    }
}
