use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::auth::{Connection, Token};
use crate::config::{load_document, Config, OutputFormat};
use crate::devops::{
    DevOpsService, IisInfoCache, LogProgress, PipelineRequest, ProgressReporter, RestConnector,
    Variable,
};
use crate::error::FreeCicdError;
use crate::output::{self, ProgressSpinner};

#[derive(Parser)]
#[command(name = "freecicd")]
#[command(author, version, about = "Azure DevOps pipeline wiring", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Azure DevOps organization name
    #[arg(long, global = true, env = "AZURE_DEVOPS_ORG")]
    org: Option<String>,

    /// Personal access token
    #[arg(long, global = true, env = "AZURE_DEVOPS_PAT", hide_env_values = true)]
    token: Option<String>,

    /// Service host, defaults to https://dev.azure.com
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print JSON instead of summary tables
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Write the result to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Tag attached to progress updates
    #[arg(long, global = true, default_value = "freecicd")]
    correlation_id: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects of the organization
    Projects,
    Project {
        name: String,
    },
    Repos {
        #[arg(short = 'P', long)]
        project: String,
    },
    Repo {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(short, long)]
        repo: String,
    },
    Branches {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(short, long)]
        repo: String,
    },
    Branch {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(short, long)]
        repo: String,
        #[arg(short, long)]
        branch: String,
    },
    /// List files of a branch
    Files {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(short, long)]
        repo: String,
        #[arg(short, long)]
        branch: String,
        /// Only files following the `.app.` naming convention
        #[arg(long, default_value_t = false)]
        app_only: bool,
    },
    Pipelines {
        #[arg(short = 'P', long)]
        project: String,
    },
    Pipeline {
        #[arg(short = 'P', long)]
        project: String,
        /// Pipeline id, 0 for the "no pipeline yet" placeholder
        #[arg(long)]
        id: i32,
    },
    Runs {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(long)]
        id: i32,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    VariableGroups {
        #[arg(short = 'P', long)]
        project: String,
    },
    CreateVariableGroup {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Variable as KEY=VALUE, repeatable
        #[arg(long = "var")]
        variables: Vec<String>,
    },
    /// Add or replace one variable of an existing group
    SetVariable {
        #[arg(short = 'P', long)]
        project: String,
        /// Group name or id
        #[arg(short, long)]
        group: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: String,
        #[arg(long, default_value_t = false)]
        secret: bool,
    },
    GetFile {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(short, long)]
        repo: String,
        #[arg(short, long)]
        branch: String,
        #[arg(long)]
        path: String,
    },
    /// Add or edit a file on a branch
    PutFile {
        #[arg(short = 'P', long)]
        project: String,
        #[arg(short, long)]
        repo: String,
        #[arg(short, long)]
        branch: String,
        #[arg(long)]
        path: String,
        /// Local file holding the new content
        #[arg(long)]
        file: PathBuf,
    },
    /// Render the pipeline YAML for a request file without committing it
    RenderYaml {
        request: PathBuf,
    },
    /// Create or update a deployment pipeline from a request file
    CreatePipeline {
        request: PathBuf,
    },
    /// Show the IIS info files of the configured environments
    IisInfo {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

/// What a command produced.
enum Report {
    /// Structured result, printed as JSON or as its summary rendering.
    Data {
        value: serde_json::Value,
        summary: String,
    },
    /// Raw text printed as is (file contents, YAML).
    Text(String),
}

impl Report {
    fn data<T: Serialize>(value: &T, summary: String) -> Result<Self> {
        Ok(Self::Data {
            value: serde_json::to_value(value)?,
            summary,
        })
    }
}

fn parse_variables(pairs: &[String]) -> Result<Vec<Variable>> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{pair}'"))?;
            Ok(Variable {
                name: name.trim().to_string(),
                value: value.to_string(),
                ..Variable::default()
            })
        })
        .collect()
}

fn load_request(path: &Path) -> Result<PipelineRequest> {
    load_document(path)
        .with_context(|| format!("Failed to load pipeline request: {}", path.display()))
}

impl Cli {
    fn json_output(&self, config: &Config) -> bool {
        self.json || config.output.format == OutputFormat::Json
    }

    fn service(
        &self,
        config: &Config,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<DevOpsService<RestConnector>> {
        let organization = self
            .org
            .clone()
            .or_else(|| config.devops.organization.clone())
            .context(
                "Azure DevOps organization is required (--org, AZURE_DEVOPS_ORG or devops.organization)",
            )?;
        let token = self
            .token
            .clone()
            .or_else(|| config.devops.token.clone())
            .context("Azure DevOps token is required (--token, AZURE_DEVOPS_PAT or devops.token)")?;
        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| config.devops.base_url.clone());

        Ok(DevOpsService::new(
            RestConnector::new(base_url),
            Connection::new(organization, Token::from(token)),
            config.pipeline_settings()?,
        )
        .with_progress(progress)
        .with_cancellation(cancel))
    }

    fn emit(&self, report: Report, config: &Config) -> Result<()> {
        let text = match report {
            Report::Text(text) => text,
            Report::Data { value, summary } => {
                if self.json_output(config) {
                    if self.pretty || config.output.pretty {
                        serde_json::to_string_pretty(&value)?
                    } else {
                        serde_json::to_string(&value)?
                    }
                } else {
                    summary
                }
            }
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, text)?;
            info!("Result written to: {}", output_path.display());
        } else {
            println!("{text}");
        }

        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    async fn run(&self, service: &DevOpsService<RestConnector>) -> Result<Report> {
        match &self.command {
            Commands::Projects => {
                let projects = service.get_projects().await?;
                Report::data(&projects, output::render_projects(&projects))
            }
            Commands::Project { name } => {
                let project = service.get_project(name).await?;
                Report::data(&project, output::render_projects(std::slice::from_ref(&project)))
            }
            Commands::Repos { project } => {
                let repos = service.get_repos(project).await?;
                Report::data(&repos, output::render_repos(&repos))
            }
            Commands::Repo { project, repo } => {
                let repo = service.get_repo(project, repo).await?;
                Report::data(&repo, output::render_repos(std::slice::from_ref(&repo)))
            }
            Commands::Branches { project, repo } => {
                let branches = service.get_branches(project, repo).await?;
                Report::data(&branches, output::render_branches(&branches))
            }
            Commands::Branch {
                project,
                repo,
                branch,
            } => {
                let branch = service.get_branch(project, repo, branch).await?;
                Report::data(&branch, output::render_branches(std::slice::from_ref(&branch)))
            }
            Commands::Files {
                project,
                repo,
                branch,
                app_only,
            } => {
                let mut files = service.list_files_in_branch(project, repo, branch).await?;
                if *app_only {
                    files.retain(|file| file.is_app_file);
                }
                Report::data(&files, output::render_files(&files))
            }
            Commands::Pipelines { project } => {
                let pipelines = service.get_pipelines(project).await?;
                Report::data(&pipelines, output::render_pipelines(&pipelines))
            }
            Commands::Pipeline { project, id } => {
                let pipeline = service.get_pipeline(project, *id).await?;
                Report::data(
                    &pipeline,
                    output::render_pipelines(std::slice::from_ref(&pipeline)),
                )
            }
            Commands::Runs {
                project,
                id,
                skip,
                top,
            } => {
                let runs = service.get_pipeline_runs(project, *id, *skip, *top).await?;
                Report::data(&runs, output::render_runs(*id, &runs))
            }
            Commands::VariableGroups { project } => {
                let groups = service.get_project_variable_groups(project).await?;
                Report::data(&groups, output::render_variable_groups(&groups))
            }
            Commands::CreateVariableGroup {
                project,
                name,
                description,
                variables,
            } => {
                let variables = parse_variables(variables)?;
                let group = service
                    .create_variable_group(project, name, description, &variables)
                    .await?;
                Report::data(&group, output::render_variable_groups(std::slice::from_ref(&group)))
            }
            Commands::SetVariable {
                project,
                group,
                name,
                value,
                secret,
            } => {
                let mut target = service
                    .get_project_variable_groups(project)
                    .await?
                    .into_iter()
                    .find(|g| g.id.to_string() == *group || g.matches_name(group))
                    .ok_or_else(|| {
                        anyhow!("Variable group '{group}' not found in project '{project}'")
                    })?;

                match target
                    .variables
                    .iter_mut()
                    .find(|v| v.name.eq_ignore_ascii_case(name))
                {
                    Some(variable) => {
                        variable.value.clone_from(value);
                        variable.is_secret = *secret;
                    }
                    None => target.variables.push(Variable {
                        name: name.clone(),
                        value: value.clone(),
                        is_secret: *secret,
                        is_read_only: false,
                    }),
                }

                let updated = service.update_variable_group(project, &target).await?;
                Report::data(
                    &updated,
                    output::render_variable_groups(std::slice::from_ref(&updated)),
                )
            }
            Commands::GetFile {
                project,
                repo,
                branch,
                path,
            } => Ok(Report::Text(
                service.get_file(project, repo, branch, path).await?,
            )),
            Commands::PutFile {
                project,
                repo,
                branch,
                path,
                file,
            } => {
                let content = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read file: {}", file.display()))?;
                let result = service
                    .create_or_update_file(project, repo, branch, path, &content)
                    .await?;
                if !result.success {
                    warn!("{}", result.message);
                }
                Report::data(&result, output::render_git_result(&result))
            }
            Commands::RenderYaml { request } => {
                let request = load_request(request)?;
                Ok(Report::Text(service.generate_yaml(&request).await?))
            }
            Commands::CreatePipeline { request } => {
                let request = load_request(request)?;
                let summary = service.create_or_update_pipeline(&request).await?;
                Report::data(&summary, output::render_definition(&summary))
            }
            Commands::IisInfo { .. } => Err(anyhow!("iis-info does not use a DevOps session")),
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        if let Commands::IisInfo { dir } = &self.command {
            let settings = config.pipeline_settings()?;
            let info = IisInfoCache::new(dir).load(&settings.environment_order)?;
            return self.emit(Report::data(&info, output::render_iis_info(&info))?, &config);
        }

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling remote calls");
                on_interrupt.cancel();
            }
        });

        // Progress goes to a spinner on a terminal and to the log otherwise.
        let (spinner, progress) = if console::Term::stderr().is_term() {
            let (spinner, progress) =
                ProgressSpinner::start("Talking to Azure DevOps", &self.correlation_id);
            (Some(spinner), progress)
        } else {
            let progress =
                ProgressReporter::new(Arc::new(LogProgress), Some(self.correlation_id.clone()));
            (None, progress)
        };
        let service = self.service(&config, progress, cancel)?;
        info!("Using Azure DevOps organization {}", service.organization());

        match self.run(&service).await {
            Ok(report) => {
                if let Some(spinner) = spinner {
                    spinner.finish("Done");
                }
                self.emit(report, &config)
            }
            Err(e) => {
                if let Some(spinner) = spinner {
                    spinner.fail("Failed");
                }
                if let Some(error) = e.downcast_ref::<FreeCicdError>() {
                    debug!("Command failed with a {:?} error", error.kind());
                    if let Some(failure) = error.as_pipeline_failure() {
                        eprintln!("{}", output::render_pipeline_failure(failure));
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "freecicd", "runs", "-P", "Pipelines", "--id", "12", "--json", "--org", "contoso",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.org.as_deref(), Some("contoso"));
        assert!(matches!(
            cli.command,
            Commands::Runs { id: 12, skip: 0, top: 20, .. }
        ));
    }

    #[test]
    fn test_parse_variables() {
        let variables =
            parse_variables(&["BasePath=/web".to_string(), "Conn=a=b".to_string()]).unwrap();

        assert_eq!(variables[0].name, "BasePath");
        assert_eq!(variables[0].value, "/web");
        assert_eq!(variables[1].value, "a=b");
        assert!(parse_variables(&["novalue".to_string()]).is_err());
    }

    #[test]
    fn test_request_file_is_loaded_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(
            &path,
            r#"{
                "devops-project": "Pipelines",
                "devops-repo": "Pipelines",
                "devops-branch": "main",
                "pipeline-name": "web-ci",
                "code-project": "Web",
                "code-repo": "Website",
                "code-branch": "develop",
                "environments": {"AzureProd": {"variable-group-name": "web-prod"}}
            }"#,
        )
        .unwrap();

        let request = load_request(&path).unwrap();

        assert_eq!(request.pipeline_name.as_deref(), Some("web-ci"));
        assert!(request.validate().is_ok());
    }
}
