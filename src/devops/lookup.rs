use futures::future::join_all;
use log::{info, warn};

use crate::error::Result;

use super::api::{Connector, DevOpsApi};
use super::links;
use super::service::DevOpsService;
use super::types::{BranchInfo, FileItem, PipelineDefinitionInfo, ProjectInfo, RepoInfo};

pub(super) async fn project_info<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &str,
) -> Result<ProjectInfo> {
    let project = api.get_project(project).await?;
    Ok(ProjectInfo::from(&project))
}

pub(super) async fn repo_info<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &str,
    repo: &str,
) -> Result<RepoInfo> {
    let repo = api.get_repository(project, repo).await?;
    Ok(RepoInfo::from(&repo))
}

pub(super) async fn branch_info<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &str,
    repo: &RepoInfo,
    branch: &str,
) -> Result<BranchInfo> {
    let stats = api
        .get_branch(project, &repo.repo_id, links::short_branch_name(branch))
        .await?;
    Ok(BranchInfo::new(&stats, &repo.resource_url))
}

/// Pipeline id 0 means "no pipeline yet" and is answered without a remote call.
pub(super) async fn pipeline_info<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &str,
    pipeline_id: i32,
) -> Result<PipelineDefinitionInfo> {
    if pipeline_id == 0 {
        return Ok(PipelineDefinitionInfo::placeholder());
    }
    let definition = api.get_definition(project, pipeline_id).await?;
    Ok(PipelineDefinitionInfo::from(&definition))
}

impl<C: Connector> DevOpsService<C> {
    pub async fn get_project(&self, project: &str) -> Result<ProjectInfo> {
        self.progress.status("Start of lookup project");
        let session = self.session()?;
        let info = project_info(&session, project).await?;
        self.progress.status(format!("Found project {}", info.project_name));
        Ok(info)
    }

    /// All projects except the ignored prefixes, one detail read per project.
    pub async fn get_projects(&self) -> Result<Vec<ProjectInfo>> {
        self.progress.status("Start of lookup");
        let session = self.session()?;

        let projects: Vec<_> = session
            .list_projects()
            .await?
            .into_iter()
            .filter(|p| !self.settings().is_ignored_project(&p.name))
            .collect();

        info!("Fetching details for {} projects...", projects.len());

        let futures: Vec<_> = projects
            .iter()
            .map(|project| {
                self.progress
                    .status(format!("Found project {}", project.name));
                project_info(&session, &project.id)
            })
            .collect();

        join_all(futures).await.into_iter().collect()
    }

    pub async fn get_repo(&self, project: &str, repo: &str) -> Result<RepoInfo> {
        self.progress.status("Start of lookup");
        let session = self.session()?;
        let info = repo_info(&session, project, repo).await?;
        self.progress.status(format!("Found repo {}", info.repo_name));
        Ok(info)
    }

    pub async fn get_repos(&self, project: &str) -> Result<Vec<RepoInfo>> {
        self.progress.status("Start of lookup");
        let session = self.session()?;

        let repos = session.list_repositories(project).await?;
        info!("Fetching details for {} repositories...", repos.len());

        let futures: Vec<_> = repos
            .iter()
            .map(|repo| {
                self.progress.status(format!("Found repo {}", repo.name));
                repo_info(&session, project, &repo.id)
            })
            .collect();

        join_all(futures).await.into_iter().collect()
    }

    pub async fn get_branch(&self, project: &str, repo: &str, branch: &str) -> Result<BranchInfo> {
        let session = self.session()?;
        let repo = repo_info(&session, project, repo).await?;
        let info = branch_info(&session, project, &repo, branch).await?;
        self.progress.status(format!("Found branch {}", info.branch_name));
        Ok(info)
    }

    pub async fn get_branches(&self, project: &str, repo: &str) -> Result<Vec<BranchInfo>> {
        self.progress.status("Start of lookup");
        let session = self.session()?;
        let repo = repo_info(&session, project, repo).await?;

        let branches = session.list_branches(project, &repo.repo_id).await?;
        Ok(branches
            .iter()
            .map(|branch| {
                self.progress
                    .status(format!("Found branch {} in repo {}", branch.name, repo.repo_name));
                BranchInfo::new(branch, &repo.resource_url)
            })
            .collect())
    }

    pub async fn get_pipeline(
        &self,
        project: &str,
        pipeline_id: i32,
    ) -> Result<PipelineDefinitionInfo> {
        self.progress.status("Start of lookup of pipeline");
        if pipeline_id == 0 {
            return Ok(PipelineDefinitionInfo::placeholder());
        }
        let session = self.session()?;
        let info = pipeline_info(&session, project, pipeline_id).await?;
        self.progress.status(format!("Found pipeline {}", info.name));
        Ok(info)
    }

    /// Pipelines whose full definition cannot be read are left out.
    pub async fn get_pipelines(&self, project: &str) -> Result<Vec<PipelineDefinitionInfo>> {
        self.progress.status("Start of lookup");
        let session = self.session()?;

        let references = session.list_definitions(project).await?;
        let mut pipelines = Vec::with_capacity(references.len());

        for reference in &references {
            match session.get_definition(project, reference.id).await {
                Ok(full) => {
                    let info = PipelineDefinitionInfo::from_reference(reference, &full);
                    self.progress.status(format!("Found pipeline {}", info.name));
                    pipelines.push(info);
                }
                Err(e) => warn!(
                    "Skipping pipeline {} ({}): {e}",
                    reference.id, reference.name
                ),
            }
        }

        Ok(pipelines)
    }

    /// Files (not folders) of a branch, recursively.
    pub async fn list_files_in_branch(
        &self,
        project: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<FileItem>> {
        let session = self.session()?;
        let repo = repo_info(&session, project, repo).await?;
        let branch = branch_info(&session, project, &repo, branch).await?;

        let items = session
            .list_items(project, &repo.repo_id, links::short_branch_name(&branch.branch_name))
            .await?;

        Ok(items
            .iter()
            .filter(|item| !item.is_folder)
            .map(|item| {
                let file = FileItem::new(item, &branch.resource_url);
                if file.file_type == ".csproj" || file.file_type == ".yml" {
                    self.progress.status(format!(
                        "Found file {} in branch {} in repo {}",
                        file.path, branch.branch_name, repo.repo_name
                    ));
                }
                file
            })
            .collect())
    }
}
