use log::info;

use crate::error::Result;

use super::api::{Connector, DevOpsApi};
use super::service::DevOpsService;
use super::types::PipelineRun;

impl<C: Connector> DevOpsService<C> {
    /// One page of a pipeline's runs, in the order the service lists them.
    pub async fn get_pipeline_runs(
        &self,
        project: &str,
        pipeline_id: i32,
        skip: usize,
        top: usize,
    ) -> Result<Vec<PipelineRun>> {
        self.progress
            .status(format!("Loading runs of pipeline {pipeline_id}"));
        let session = self.session()?;

        let builds = session.list_builds(project, pipeline_id).await?;
        info!("Found {} runs for pipeline {pipeline_id}", builds.len());

        Ok(builds
            .iter()
            .skip(skip)
            .take(top)
            .map(PipelineRun::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PipelineSettings;
    use crate::devops::testing::{FakeConnector, FakeState};
    use crate::devops::DevOpsService;

    fn service() -> DevOpsService<FakeConnector> {
        DevOpsService::new(
            FakeConnector::new(FakeState::sample()),
            FakeConnector::connection(),
            PipelineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_runs_are_paged() {
        let runs = service().get_pipeline_runs("Pipelines", 12, 5, 10).await.unwrap();

        let ids: Vec<_> = runs.iter().map(|r| r.id).collect();
        assert_eq!(ids, (6..=15).collect::<Vec<_>>());
        assert_eq!(runs[0].result, "succeeded");
        assert!(runs[0].resource_url.ends_with("buildId=6"));
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let runs = service().get_pipeline_runs("Pipelines", 12, 40, 10).await.unwrap();
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_pipeline_has_no_runs() {
        let runs = service().get_pipeline_runs("Pipelines", 99, 0, 10).await.unwrap();
        assert!(runs.is_empty());
    }
}
