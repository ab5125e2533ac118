use super::rest::{DevOpsClient, API_VERSION};
use crate::devops::models::TeamProject;
use crate::error::Result;

impl DevOpsClient {
    pub(super) async fn fetch_projects(&self) -> Result<Vec<TeamProject>> {
        let url = self.org_endpoint("_apis/projects")?;
        self.get_list(url, API_VERSION, "projects").await
    }

    pub(super) async fn fetch_project(&self, project: &str) -> Result<TeamProject> {
        let url = self.org_endpoint(&format!(
            "_apis/projects/{}",
            urlencoding::encode(project)
        ))?;
        self.get_json(url, API_VERSION, &format!("project '{project}'"))
            .await
    }
}
