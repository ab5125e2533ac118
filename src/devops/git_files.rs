use log::{debug, info};

use crate::error::{FreeCicdError, Result};

use super::api::{Connector, DevOpsApi};
use super::links;
use super::models::{ChangeType, GitPush};
use super::service::DevOpsService;
use super::types::GitUpdateResult;

fn repo_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches(['/', '\\']))
}

/// Adds the file when it is missing from the branch, edits it otherwise.
///
/// Remote failures are reported through the returned result rather than as
/// an error, so callers decide whether a failed write is fatal.
pub(super) async fn write_file<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &str,
    repo: &str,
    branch: &str,
    path: &str,
    content: &str,
) -> Result<GitUpdateResult> {
    let path = repo_path(path);
    let short = links::short_branch_name(branch);
    let branch_ref = links::full_branch_ref(short);

    let existing = match api.get_item(project, repo, &path, Some(short), false).await {
        Ok(existing) => existing,
        Err(FreeCicdError::Cancelled) => return Err(FreeCicdError::Cancelled),
        Err(e) => return Ok(GitUpdateResult::failed(format!("Error creating file: {e}"))),
    };

    match existing {
        Some(existing) => {
            debug!("Editing {path} at commit {}", existing.commit_id);
            let push = GitPush::single_change(
                branch_ref,
                existing.commit_id,
                "Editing file",
                ChangeType::Edit,
                path,
                content.to_string(),
            );
            Ok(match api.create_push(project, repo, &push).await {
                Ok(_) => GitUpdateResult::ok("File edited successfully."),
                Err(FreeCicdError::Cancelled) => return Err(FreeCicdError::Cancelled),
                Err(e) => GitUpdateResult::failed(format!("Error editing file: {e}")),
            })
        }
        None => {
            let refs = match api.get_refs(project, repo, &format!("heads/{short}")).await {
                Ok(refs) => refs,
                Err(FreeCicdError::Cancelled) => return Err(FreeCicdError::Cancelled),
                Err(e) => return Ok(GitUpdateResult::failed(format!("Error creating file: {e}"))),
            };
            let Some(head) = refs.into_iter().find(|r| r.name == branch_ref) else {
                return Ok(GitUpdateResult::failed(format!(
                    "Error creating file: Branch '{short}' not found."
                )));
            };

            debug!("Creating {path} on {branch_ref} at {}", head.object_id);
            let push = GitPush::single_change(
                branch_ref,
                head.object_id,
                "Creating file",
                ChangeType::Add,
                path,
                content.to_string(),
            );
            Ok(match api.create_push(project, repo, &push).await {
                Ok(_) => GitUpdateResult::ok("File created successfully."),
                Err(FreeCicdError::Cancelled) => return Err(FreeCicdError::Cancelled),
                Err(e) => GitUpdateResult::failed(format!("Error creating file: {e}")),
            })
        }
    }
}

/// Content of a file at the tip of a branch.
pub(super) async fn read_file<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &str,
    repo: &str,
    branch: &str,
    path: &str,
) -> Result<String> {
    let path = repo_path(path);
    api.get_item(project, repo, &path, Some(links::short_branch_name(branch)), true)
        .await?
        .and_then(|item| item.content)
        .ok_or_else(|| FreeCicdError::NotFound(format!("file '{path}' on branch '{branch}'")))
}

impl<C: Connector> DevOpsService<C> {
    pub async fn create_or_update_file(
        &self,
        project: &str,
        repo: &str,
        branch: &str,
        path: &str,
        content: &str,
    ) -> Result<GitUpdateResult> {
        let session = self.session()?;
        let result = write_file(&session, project, repo, branch, path, content).await?;
        if result.success {
            info!("{} ({path} on {branch})", result.message);
        }
        Ok(result)
    }

    pub async fn get_file(
        &self,
        project: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<String> {
        let session = self.session()?;
        read_file(&session, project, repo, branch, path).await
    }
}
