use reqwest::Method;

use super::rest::{DevOpsClient, QUEUE_API_VERSION, TASK_API_VERSION};
use crate::devops::models::{AgentQueue, VariableGroupModel, VariableGroupParameters};
use crate::error::Result;

impl DevOpsClient {
    pub(super) async fn fetch_agent_queues(&self, project: &str) -> Result<Vec<AgentQueue>> {
        let url = self.project_endpoint(project, "_apis/distributedtask/queues")?;
        self.get_list(url, QUEUE_API_VERSION, &format!("agent queues of '{project}'"))
            .await
    }

    pub(super) async fn fetch_variable_groups(
        &self,
        project: &str,
    ) -> Result<Vec<VariableGroupModel>> {
        let url = self.project_endpoint(project, "_apis/distributedtask/variablegroups")?;
        self.get_list(url, TASK_API_VERSION, &format!("variable groups of '{project}'"))
            .await
    }

    pub(super) async fn post_variable_group(
        &self,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel> {
        let url = self.org_endpoint("_apis/distributedtask/variablegroups")?;
        self.send_json(
            Method::POST,
            url,
            TASK_API_VERSION,
            parameters,
            &format!("variable group '{}'", parameters.name),
        )
        .await
    }

    pub(super) async fn put_variable_group(
        &self,
        group_id: i32,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel> {
        let url = self.org_endpoint(&format!("_apis/distributedtask/variablegroups/{group_id}"))?;
        self.send_json(
            Method::PUT,
            url,
            TASK_API_VERSION,
            parameters,
            &format!("variable group {group_id}"),
        )
        .await
    }
}
