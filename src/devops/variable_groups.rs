use indexmap::IndexMap;
use log::info;

use crate::environment::{EnvSetting, EnvironmentType};
use crate::error::{FreeCicdError, Result};

use super::api::{Connector, DevOpsApi};
use super::links;
use super::models::{
    ProjectReference, TeamProject, VariableGroupParameters, VariableGroupProjectReference,
    VariableValue,
};
use super::service::DevOpsService;
use super::types::{ProjectInfo, Variable, VariableGroup};

const VARIABLE_GROUP_TYPE: &str = "Vsts";

fn project_web_url(project: &TeamProject, org_url: &str) -> String {
    let href = ProjectInfo::from(project).resource_url;
    if href.is_empty() {
        links::project_url(org_url, &project.name)
    } else {
        href
    }
}

fn parameters(
    name: &str,
    description: &str,
    variables: &[Variable],
    project: &TeamProject,
    reference_name: &str,
) -> VariableGroupParameters {
    VariableGroupParameters {
        name: name.to_string(),
        description: Some(description.to_string()),
        kind: VARIABLE_GROUP_TYPE.to_string(),
        variables: variables
            .iter()
            .map(|v| {
                (
                    v.name.clone(),
                    VariableValue {
                        // A null secret keeps the value stored on the server.
                        value: (!(v.is_secret && v.value.is_empty())).then(|| v.value.clone()),
                        is_secret: v.is_secret,
                        is_read_only: v.is_read_only,
                    },
                )
            })
            .collect::<IndexMap<_, _>>(),
        variable_group_project_references: vec![VariableGroupProjectReference {
            name: reference_name.to_string(),
            description: project.description.clone(),
            project_reference: ProjectReference {
                id: project.id.clone(),
                name: Some(project.name.clone()),
            },
        }],
    }
}

/// Variables every newly created environment group starts with.
pub fn default_variables(env: &EnvSetting, database_name: &str) -> Vec<Variable> {
    vec![
        Variable {
            name: "BasePath".to_string(),
            value: env.virtual_path.clone(),
            ..Variable::default()
        },
        Variable {
            name: "ConnectionStrings.AppData".to_string(),
            value: format!(
                "Data Source=localhost;Initial Catalog={database_name};TrustServerCertificate=True;Integrated Security=true;MultipleActiveResultSets=True;"
            ),
            ..Variable::default()
        },
        Variable {
            name: "LocalModelUrl".to_string(),
            value: String::new(),
            ..Variable::default()
        },
    ]
}

pub(super) async fn project_variable_groups<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &TeamProject,
) -> Result<Vec<VariableGroup>> {
    let project_url = project_web_url(project, &api.org_url());
    let groups = api.list_variable_groups(&project.id).await?;
    Ok(groups
        .iter()
        .map(|group| VariableGroup::new(group, &project_url))
        .collect())
}

pub(super) async fn create_group<A: DevOpsApi + ?Sized>(
    api: &A,
    project: &TeamProject,
    name: &str,
    description: &str,
    variables: &[Variable],
) -> Result<VariableGroup> {
    let request = parameters(name, description, variables, project, name);
    let created = api.add_variable_group(&request).await?;
    Ok(VariableGroup::new(
        &created,
        &project_web_url(project, &api.org_url()),
    ))
}

/// What the reconciler needs to know about the target project.
pub(super) struct ReconcileTarget<'a> {
    pub project: &'a TeamProject,
    /// Name of the code project, used in new group descriptions.
    pub code_project_name: &'a str,
}

/// Makes sure a variable group exists for every configured environment.
///
/// Existing groups are matched by trimmed, case-insensitive name and left
/// untouched. Missing groups are created with the default variables and
/// appended to `known`, so a second environment naming the same group reuses
/// it. Names of created groups are appended to `created` as they happen.
pub(super) async fn reconcile<A: DevOpsApi + ?Sized>(
    api: &A,
    target: &ReconcileTarget<'_>,
    environments: impl IntoIterator<Item = (EnvironmentType, &EnvSetting)>,
    known: &mut Vec<VariableGroup>,
    created: &mut Vec<String>,
) -> Result<Vec<VariableGroup>> {
    let mut resolved = Vec::new();

    for (env, setting) in environments {
        let wanted = setting.variable_group_name.trim();
        if wanted.is_empty() {
            return Err(FreeCicdError::Validation(format!(
                "{env} has no variable group name"
            )));
        }

        if let Some(existing) = known.iter().find(|g| g.matches_name(wanted)) {
            info!("Reusing variable group '{}' for {env}", existing.name);
            resolved.push(existing.clone());
            continue;
        }

        info!("Creating variable group '{wanted}' for {env}");
        let group = create_group(
            api,
            target.project,
            &setting.variable_group_name,
            &format!("Variable group for project {}", target.code_project_name),
            &default_variables(setting, &target.project.name),
        )
        .await?;

        created.push(group.name.clone());
        known.push(group.clone());
        resolved.push(group);
    }

    Ok(resolved)
}

impl<C: Connector> DevOpsService<C> {
    /// Variable groups of a project, with library browse URLs.
    pub async fn get_project_variable_groups(&self, project: &str) -> Result<Vec<VariableGroup>> {
        let session = self.session()?;
        let project = session.get_project(project).await?;
        project_variable_groups(&session, &project).await
    }

    /// Creates a variable group in a project.
    pub async fn create_variable_group(
        &self,
        project: &str,
        name: &str,
        description: &str,
        variables: &[Variable],
    ) -> Result<VariableGroup> {
        let session = self.session()?;
        let project = session.get_project(project).await?;
        create_group(&session, &project, name, description, variables).await
    }

    /// Replaces name, description and variables of an existing group.
    pub async fn update_variable_group(
        &self,
        project: &str,
        group: &VariableGroup,
    ) -> Result<VariableGroup> {
        let session = self.session()?;
        let project = session.get_project(project).await?;

        let existing = session.list_variable_groups(&project.id).await?;
        if !existing.iter().any(|g| g.id == group.id) {
            return Err(FreeCicdError::NotFound(format!(
                "variable group {} in project '{}'",
                group.id, project.name
            )));
        }

        let request = parameters(
            &group.name,
            &group.description,
            &group.variables,
            &project,
            &project.name,
        );
        let updated = session.update_variable_group(group.id, &request).await?;
        info!("Updated variable group '{}' ({})", updated.name, updated.id);

        Ok(VariableGroup::new(
            &updated,
            &project_web_url(&project, &session.org_url()),
        ))
    }
}
