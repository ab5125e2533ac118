use reqwest::Method;

use super::rest::{DevOpsClient, API_VERSION};
use crate::devops::models::{Build, BuildDefinition, BuildDefinitionReference};
use crate::error::Result;

impl DevOpsClient {
    pub(super) async fn fetch_definitions(
        &self,
        project: &str,
    ) -> Result<Vec<BuildDefinitionReference>> {
        let url = self.project_endpoint(project, "_apis/build/definitions")?;
        self.get_list(url, API_VERSION, &format!("pipelines of '{project}'"))
            .await
    }

    pub(super) async fn fetch_definition(
        &self,
        project: &str,
        definition_id: i32,
    ) -> Result<BuildDefinition> {
        let url = self.project_endpoint(
            project,
            &format!("_apis/build/definitions/{definition_id}"),
        )?;
        self.get_json(url, API_VERSION, &format!("pipeline {definition_id}"))
            .await
    }

    pub(super) async fn post_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let url = self.project_endpoint(project, "_apis/build/definitions")?;
        self.send_json(
            Method::POST,
            url,
            API_VERSION,
            definition,
            &format!("project '{project}'"),
        )
        .await
    }

    pub(super) async fn put_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let url = self.project_endpoint(
            project,
            &format!("_apis/build/definitions/{}", definition.id),
        )?;
        self.send_json(
            Method::PUT,
            url,
            API_VERSION,
            definition,
            &format!("pipeline {}", definition.id),
        )
        .await
    }

    pub(super) async fn fetch_builds(
        &self,
        project: &str,
        definition_id: i32,
    ) -> Result<Vec<Build>> {
        let mut url = self.project_endpoint(project, "_apis/build/builds")?;
        url.query_pairs_mut()
            .append_pair("definitions", &definition_id.to_string());
        self.get_list(url, API_VERSION, &format!("runs of pipeline {definition_id}"))
            .await
    }
}
