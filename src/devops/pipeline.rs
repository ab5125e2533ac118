//! Create-or-update of a YAML deployment pipeline.
//!
//! The flow runs inside one session: resolve resources, reconcile variable
//! groups, render and commit the YAML, resolve the agent pool, save the build
//! definition, then read the committed YAML back. A failure at any step is
//! returned as a [`PipelineFailure`] naming the step and the remote changes
//! already applied. Nothing is rolled back.

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::PipelineSettings;
use crate::environment::{EnvSetting, EnvironmentType};
use crate::error::{AppliedChanges, FreeCicdError, PipelineFailure, PipelineStep, Result};

use super::api::{Connector, DevOpsApi};
use super::git_files::{read_file, write_file};
use super::links;
use super::lookup::{branch_info, project_info, repo_info};
use super::models::{
    AgentPoolQueue, BuildDefinition, BuildProcess, BuildRepository, BuildTrigger,
    DefinitionQueueStatus, ProjectReference, TeamProject, CLEAN_ALL_BUILD_DIRECTORY,
    CLEAN_OPTIONS_PROPERTY, FETCH_DEPTH_PROPERTY, TFS_GIT_REPOSITORY,
};
use super::service::DevOpsService;
use super::types::{BuildDefinitionSummary, RepoInfo};
use super::variable_groups::{project_variable_groups, reconcile, ReconcileTarget};
use super::yaml::{render_deploy_stages, render_template, render_variables, TemplateValues};

/// Inputs of a pipeline create-or-update.
///
/// The `devops_*` fields name where the pipeline YAML and definition live;
/// the `code_*` fields name the application that gets built and deployed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineRequest {
    pub devops_project: String,
    pub devops_repo: String,
    pub devops_branch: String,
    /// Existing definition to update. Missing or 0 creates a new one.
    #[serde(default)]
    pub pipeline_id: Option<i32>,
    #[serde(default)]
    pub pipeline_name: Option<String>,
    /// Repository path of the YAML file. Defaults to
    /// `Projects/<code project>/<pipeline name>.yml`.
    #[serde(default)]
    pub yaml_path: Option<String>,
    pub code_project: String,
    pub code_repo: String,
    pub code_branch: String,
    #[serde(default)]
    pub cs_project_file: String,
    #[serde(default)]
    pub environments: IndexMap<EnvironmentType, EnvSetting>,
}

impl PipelineRequest {
    pub fn existing_pipeline_id(&self) -> Option<i32> {
        self.pipeline_id.filter(|id| *id > 0)
    }

    fn requested_name(&self) -> Option<&str> {
        self.pipeline_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("devops-project", &self.devops_project),
            ("devops-repo", &self.devops_repo),
            ("devops-branch", &self.devops_branch),
            ("code-project", &self.code_project),
            ("code-repo", &self.code_repo),
            ("code-branch", &self.code_branch),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(FreeCicdError::Validation(format!("{field} is required")));
        }
        if self.environments.is_empty() {
            return Err(FreeCicdError::Validation(
                "at least one environment is required".to_string(),
            ));
        }
        if self.existing_pipeline_id().is_none() && self.requested_name().is_none() {
            return Err(FreeCicdError::Validation(
                "pipeline-name is required when creating a pipeline".to_string(),
            ));
        }
        Ok(())
    }
}

/// Identifiers resolved against the remote service.
struct Resources {
    devops_project: TeamProject,
    devops_repo: RepoInfo,
    devops_branch: String,
    code_project_name: String,
    code_repo: RepoInfo,
    code_branch: String,
}

async fn resolve_resources<A: DevOpsApi + ?Sized>(
    api: &A,
    request: &PipelineRequest,
) -> Result<Resources> {
    let devops_project = api.get_project(&request.devops_project).await?;
    let devops_repo = repo_info(api, &devops_project.id, &request.devops_repo).await?;
    let devops_branch =
        branch_info(api, &devops_project.id, &devops_repo, &request.devops_branch).await?;

    let code_project = project_info(api, &request.code_project).await?;
    let code_repo = repo_info(api, &code_project.project_id, &request.code_repo).await?;
    let code_branch =
        branch_info(api, &code_project.project_id, &code_repo, &request.code_branch).await?;

    Ok(Resources {
        devops_project,
        devops_repo,
        devops_branch: links::short_branch_name(&devops_branch.branch_name).to_string(),
        code_project_name: code_project.project_name,
        code_repo,
        code_branch: links::short_branch_name(&code_branch.branch_name).to_string(),
    })
}

fn render(
    settings: &PipelineSettings,
    request: &PipelineRequest,
    resources: &Resources,
) -> Result<String> {
    let values = TemplateValues {
        devops_project_name: resources.devops_project.name.clone(),
        devops_repo_name: resources.devops_repo.repo_name.clone(),
        devops_repo_branch: resources.devops_branch.clone(),
        code_project_name: resources.code_project_name.clone(),
        code_repo_name: resources.code_repo.repo_name.clone(),
        code_repo_branch: resources.code_branch.clone(),
        pipeline_pool: settings.pool_name.clone(),
        pipeline_variables: render_variables(
            settings,
            &resources.code_project_name,
            &request.cs_project_file,
            &request.environments,
        ),
        deploy_stages: render_deploy_stages(settings, &request.environments)?,
    };
    render_template(&settings.template, &values)
}

fn yaml_path(request: &PipelineRequest, code_project_name: &str, pipeline_name: &str) -> String {
    match request.yaml_path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => format!("Projects/{code_project_name}/{pipeline_name}.yml"),
    }
}

/// Repository binding shared by created and updated definitions.
fn bind_repository(repository: &mut BuildRepository, repo: &RepoInfo, branch: &str) {
    repository.id.clone_from(&repo.repo_id);
    repository.name.clone_from(&repo.repo_name);
    repository.kind = TFS_GIT_REPOSITORY.to_string();
    repository.default_branch = links::full_branch_ref(branch);
    repository.properties.insert(
        CLEAN_OPTIONS_PROPERTY.to_string(),
        CLEAN_ALL_BUILD_DIRECTORY.to_string(),
    );
    repository
        .properties
        .insert(FETCH_DEPTH_PROPERTY.to_string(), "1".to_string());
}

fn process_filename(path: &str) -> String {
    path.trim_start_matches(['/', '\\']).to_string()
}

fn failure(step: PipelineStep, applied: &AppliedChanges, source: FreeCicdError) -> FreeCicdError {
    PipelineFailure::new(step, applied, source).into()
}

impl<C: Connector> DevOpsService<C> {
    /// Renders the pipeline YAML for a request without writing anything.
    pub async fn generate_yaml(&self, request: &PipelineRequest) -> Result<String> {
        let session = self.session()?;
        let resources = resolve_resources(&session, request).await?;
        render(self.settings(), request, &resources)
    }

    pub async fn create_or_update_pipeline(
        &self,
        request: &PipelineRequest,
    ) -> Result<BuildDefinitionSummary> {
        let mut applied = AppliedChanges::default();
        request
            .validate()
            .map_err(|e| failure(PipelineStep::ResolveResources, &applied, e))?;

        let session = self.session()?;
        let settings = self.settings();

        self.progress.step("Resolving projects, repositories and branches");
        let (resources, existing) = async {
            let resources = resolve_resources(&session, request).await?;
            let existing = match request.existing_pipeline_id() {
                Some(id) => Some(session.get_definition(&resources.devops_project.id, id).await?),
                None => None,
            };
            Ok::<_, FreeCicdError>((resources, existing))
        }
        .await
        .map_err(|e| failure(PipelineStep::ResolveResources, &applied, e))?;

        // A blank name on update keeps the definition's current name.
        let pipeline_name = request
            .requested_name()
            .map(str::to_string)
            .or_else(|| existing.as_ref().map(|definition| definition.name.clone()))
            .ok_or_else(|| {
                let missing = FreeCicdError::Validation("pipeline-name is required".to_string());
                failure(PipelineStep::ResolveResources, &applied, missing)
            })?;
        let project_id = resources.devops_project.id.clone();
        info!("Setting up pipeline '{pipeline_name}' in {}", resources.devops_project.name);

        self.progress.step("Reconciling variable groups");
        let reconciled = async {
            let mut known = project_variable_groups(&session, &resources.devops_project).await?;
            let target = ReconcileTarget {
                project: &resources.devops_project,
                code_project_name: &resources.code_project_name,
            };
            reconcile(
                &session,
                &target,
                settings.ordered(&request.environments),
                &mut known,
                &mut applied.created_variable_groups,
            )
            .await
        }
        .await;
        let groups = reconciled
            .map_err(|e| failure(PipelineStep::ReconcileVariableGroups, &applied, e))?;
        info!("{} variable groups in place", groups.len());

        self.progress.step("Rendering pipeline YAML");
        let yaml = render(settings, request, &resources)
            .map_err(|e| failure(PipelineStep::RenderYaml, &applied, e))?;

        let path = yaml_path(request, &resources.code_project_name, &pipeline_name);
        self.progress.step(format!("Committing {path}"));
        let written = write_file(
            &session,
            &project_id,
            &resources.devops_repo.repo_id,
            &resources.devops_branch,
            &path,
            &yaml,
        )
        .await
        .and_then(|result| {
            if result.success {
                Ok(result)
            } else {
                Err(FreeCicdError::GitWrite(result.message))
            }
        })
        .map_err(|e| failure(PipelineStep::CommitYaml, &applied, e))?;
        info!("{}", written.message);
        applied.committed_yaml_path = Some(path.clone());

        self.progress.step("Resolving agent pool");
        let queue = session
            .list_agent_queues(&project_id)
            .await
            .and_then(|queues| {
                queues
                    .into_iter()
                    .find(|q| q.name == settings.pool_name)
                    .ok_or_else(|| {
                        FreeCicdError::NotFound(format!("agent pool '{}'", settings.pool_name))
                    })
            })
            .map_err(|e| failure(PipelineStep::ResolveAgentPool, &applied, e))?;
        let queue = AgentPoolQueue {
            id: queue.id,
            name: queue.name,
        };

        self.progress.step("Saving build definition");
        let saved = match existing {
            Some(mut definition) => {
                info!("Updating build definition {}", definition.id);
                definition.triggers = vec![BuildTrigger::continuous_integration()];
                let repository = definition.repository.get_or_insert_with(BuildRepository::default);
                bind_repository(repository, &resources.devops_repo, &resources.devops_branch);
                let filename = process_filename(&path);
                let mut process = definition
                    .process
                    .take()
                    .unwrap_or_else(|| BuildProcess::yaml(filename.clone()));
                process.yaml_filename = Some(filename);
                definition.process = Some(process);
                definition.queue = Some(queue);
                definition.queue_status = DefinitionQueueStatus::Enabled;
                session.update_definition(&project_id, &definition).await
            }
            None => {
                info!("Creating build definition '{pipeline_name}'");
                let mut repository = BuildRepository::default();
                bind_repository(&mut repository, &resources.devops_repo, &resources.devops_branch);
                let definition = BuildDefinition {
                    name: pipeline_name,
                    path: format!("Projects/{}", resources.code_project_name),
                    queue: Some(queue),
                    project: Some(ProjectReference {
                        id: project_id.clone(),
                        name: Some(resources.devops_project.name.clone()),
                    }),
                    repository: Some(repository),
                    process: Some(BuildProcess::yaml(process_filename(&path))),
                    triggers: vec![BuildTrigger::continuous_integration()],
                    queue_status: DefinitionQueueStatus::Enabled,
                    ..BuildDefinition::default()
                };
                session.create_definition(&project_id, &definition).await
            }
        }
        .map_err(|e| failure(PipelineStep::SaveDefinition, &applied, e))?;
        applied.definition_id = Some(saved.id);

        self.progress.step("Reading back pipeline YAML");
        let contents = read_file(
            &session,
            &project_id,
            &resources.devops_repo.repo_id,
            &resources.devops_branch,
            &path,
        )
        .await
        .map_err(|e| failure(PipelineStep::ReadBackYaml, &applied, e))?;

        info!("Pipeline '{}' saved as definition {}", saved.name, saved.id);
        Ok(BuildDefinitionSummary::new(&saved, contents))
    }
}
