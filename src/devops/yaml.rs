//! Pipeline YAML rendering.
//!
//! Pure string generation: the variable block and the deploy-stage block are
//! built from the per-environment settings, then every `{{TOKEN}}` in the
//! template is substituted in a single pass.

use std::fmt::Write;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::config::PipelineSettings;
use crate::environment::{EnvSetting, EnvironmentType};
use crate::error::{FreeCicdError, Result};

/// Values substituted into the pipeline template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    pub devops_project_name: String,
    pub devops_repo_name: String,
    pub devops_repo_branch: String,
    pub code_project_name: String,
    pub code_repo_name: String,
    pub code_repo_branch: String,
    pub pipeline_pool: String,
    pub pipeline_variables: String,
    pub deploy_stages: String,
}

impl TemplateValues {
    fn lookup(&self, token: &str) -> Option<&str> {
        let value = match token {
            "DEVOPS_PROJECTNAME" => &self.devops_project_name,
            "DEVOPS_REPO_NAME" => &self.devops_repo_name,
            "DEVOPS_REPO_BRANCH" => &self.devops_repo_branch,
            "CODE_PROJECT_NAME" => &self.code_project_name,
            "CODE_REPO_NAME" => &self.code_repo_name,
            "CODE_REPO_BRANCH" => &self.code_repo_branch,
            "PIPELINE_POOL" => &self.pipeline_pool,
            "PIPELINE_VARIABLES" => &self.pipeline_variables,
            "DEPLOY_STAGES" => &self.deploy_stages,
            _ => return None,
        };
        Some(value)
    }
}

pub(super) fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([A-Z0-9_]+)\}\}").expect("valid token regex"))
}

/// Substitutes every `{{TOKEN}}` placeholder in one pass.
///
/// Substituted text is never rescanned. A placeholder with no known value
/// fails with [`FreeCicdError::UnresolvedToken`].
pub fn render_template(template: &str, values: &TemplateValues) -> Result<String> {
    if template.trim().is_empty() {
        return Err(FreeCicdError::Template("pipeline template is empty".to_string()));
    }

    let mut unresolved: Option<String> = None;

    let rendered = token_pattern().replace_all(template, |caps: &Captures<'_>| {
        let token = &caps[1];
        match values.lookup(token) {
            Some(value) => value.to_string(),
            None => {
                unresolved.get_or_insert_with(|| token.to_string());
                caps[0].to_string()
            }
        }
    });

    match unresolved {
        Some(token) => Err(FreeCicdError::UnresolvedToken(token)),
        None => Ok(rendered.into_owned()),
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn push_variable(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "  - name: {name}");
    let _ = writeln!(out, "    value: {}", quoted(value));
}

/// Renders the `variables:` entries for the template.
///
/// Base variables come first, then one section per environment in the
/// configured order. The shared `CI_AuthUsername` takes the first non-blank
/// auth user in that order.
pub fn render_variables(
    settings: &PipelineSettings,
    project_name: &str,
    cs_project_file: &str,
    environments: &IndexMap<EnvironmentType, EnvSetting>,
) -> String {
    let mut out = String::new();

    push_variable(&mut out, "CI_ProjectName", project_name);
    push_variable(&mut out, "CI_BUILD_CsProjectPath", cs_project_file);
    push_variable(&mut out, "CI_BUILD_Namespace", "");

    let mut auth_username: Option<&str> = None;

    for (env, setting) in settings.ordered(environments) {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Environment: {}", setting.display_name_or(env));
        let per_env = [
            ("IISDeploymentType", &setting.iis_deployment_type),
            ("WebsiteName", &setting.website_name),
            ("VirtualPath", &setting.virtual_path),
            ("AppPoolName", &setting.app_pool_name),
            ("VariableGroup", &setting.variable_group_name),
        ];
        for (suffix, value) in per_env {
            push_variable(&mut out, &format!("CI_{env}_{suffix}"), value);
        }

        if let Some(binding) = setting.binding_info() {
            let _ = writeln!(out, "  - name: CI_{env}_BindingInfo");
            let _ = writeln!(out, "    value: >");
            for line in binding.lines() {
                let _ = writeln!(out, "      {line}");
            }
        }

        if auth_username.is_none() {
            auth_username = setting.auth_user();
        }
    }

    if let Some(user) = auth_username {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "# username used for app pool configuration and/or to set file and folder permissions."
        );
        push_variable(&mut out, "CI_AuthUsername", user);
    }

    out
}

/// Renders one deploy stage per environment in the configured order.
///
/// Fails when an environment has no entry in the options table.
pub fn render_deploy_stages(
    settings: &PipelineSettings,
    environments: &IndexMap<EnvironmentType, EnvSetting>,
) -> Result<String> {
    let mut out = String::new();

    for (env, setting) in settings.ordered(environments) {
        let options = settings.environment_options(env)?;
        let _ = writeln!(out, "  - stage: Deploy{env}Stage");
        let _ = writeln!(out, "    displayName: {}", quoted(&format!("Deploy to {env}")));
        let _ = writeln!(out, "    dependsOn: InfoStage");
        let _ = writeln!(out, "    variables:");
        let _ = writeln!(out, "      - group: ${{{{ variables.CI_{env}_VariableGroup }}}}");
        let _ = writeln!(out, "    jobs:");
        let _ = writeln!(out, "      - deployment: Deploy{env}");
        let _ = writeln!(out, "        workspace:");
        let _ = writeln!(out, "          clean: all");
        let _ = writeln!(
            out,
            "        displayName: {}",
            quoted(&format!("Deploy to {env} (Environment-based)"))
        );
        let _ = writeln!(out, "        environment:");
        let _ = writeln!(out, "          name: {}", quoted(&options.agent_pool));
        let _ = writeln!(out, "          resourceType: \"VirtualMachine\"");
        let _ = writeln!(out, "        strategy:");
        let _ = writeln!(out, "          runOnce:");
        let _ = writeln!(out, "            deploy:");
        let _ = writeln!(out, "              steps:");
        let _ = writeln!(out, "                - checkout: none");
        let _ = writeln!(
            out,
            "                - template: Templates/dump-env-variables-template.yml@TemplateRepo"
        );
        let _ = writeln!(
            out,
            "                - template: Templates/deploy-template.yml@TemplateRepo"
        );
        let _ = writeln!(out, "                  parameters:");

        let parameters = [
            ("envFolderName", env.to_string()),
            ("basePath", format!("$(CI_PIPELINE_COMMON_ApplicationFolder_{env})")),
            ("projectName", "$(CI_ProjectName)".to_string()),
            ("releaseRetention", "$(CI_PIPELINE_COMMON_ReleaseRetention)".to_string()),
            ("IISDeploymentType", format!("$(CI_{env}_IISDeploymentType)")),
            ("WebsiteName", format!("$(CI_{env}_WebsiteName)")),
            ("VirtualPath", format!("$(CI_{env}_VirtualPath)")),
            ("AppPoolName", format!("$(CI_{env}_AppPoolName)")),
            ("DotNetVersion", format!("$(CI_PIPELINE_COMMON_DotNetVersion_{env})")),
            ("AppPoolIdentity", format!("$(CI_PIPELINE_COMMON_AppPoolIdentity_{env})")),
        ];
        for (name, value) in &parameters {
            let _ = writeln!(out, "                    {name}: {}", quoted(value));
        }
        if setting.binding_info().is_some() {
            let _ = writeln!(
                out,
                "                    CustomBindings: {}",
                quoted(&format!("$(CI_{env}_BindingInfo)"))
            );
        }

        let _ = writeln!(
            out,
            "                - template: Templates/clean-workspace-template.yml@TemplateRepo"
        );
        let _ = writeln!(out);
    }

    Ok(out)
}
