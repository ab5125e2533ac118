/// Browse URL of a branch, built from the repository's web URL.
///
/// # Arguments
///
/// * `repo_url` - Repository web URL (e.g., <https://dev.azure.com/org/proj/_git/repo>)
/// * `branch_name` - Branch name, with or without the `refs/heads/` prefix
///
/// # Returns
///
/// URL pinned to the branch (e.g., <https://dev.azure.com/org/proj/_git/repo?version=GBmain>)
pub fn branch_url(repo_url: &str, branch_name: &str) -> String {
    format!(
        "{repo_url}?version=GB{}",
        urlencoding::encode(short_branch_name(branch_name))
    )
}

/// Browse URL of a file on a branch.
pub fn file_url(branch_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{branch_url}&path={path}")
    } else {
        format!("{branch_url}&path=/{path}")
    }
}

/// Library page of a variable group inside its project.
pub fn variable_group_url(project_url: &str, group_id: i32) -> String {
    format!(
        "{}/_library?itemType=VariableGroups&view=VariableGroupView&variableGroupId={group_id}",
        project_url.trim_end_matches('/')
    )
}

/// Web URL of a project when the service did not return one.
pub fn project_url(org_url: &str, project_name: &str) -> String {
    format!(
        "{}/{}",
        org_url.trim_end_matches('/'),
        urlencoding::encode(project_name)
    )
}

pub fn short_branch_name(branch_name: &str) -> &str {
    branch_name
        .strip_prefix("refs/heads/")
        .unwrap_or(branch_name)
}

pub fn full_branch_ref(branch_name: &str) -> String {
    format!("refs/heads/{}", short_branch_name(branch_name))
}
