use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::environment::{EnvironmentOptions, EnvironmentType};
use crate::error::FreeCicdError;

/// Pipeline template shipped with the binary, used unless `pipeline.template-path` is set.
pub const DEFAULT_PIPELINE_TEMPLATE: &str = include_str!("../templates/build-pipeline.yml");

const CONFIG_CANDIDATES: [&str; 4] = [
    "freecicd.toml",
    "freecicd.json",
    "freecicd.yaml",
    "freecicd.yml",
];

/// Configuration file structure for FreeCICD.
///
/// Holds the Azure DevOps connection defaults and the static pipeline tables
/// (environment ordering, per-environment options, agent pool name).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub devops: DevOpsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DevOpsConfig {
    /// Azure DevOps organization name
    pub organization: Option<String>,

    /// Personal access token
    pub token: Option<String>,

    /// Service host, the organization is appended as the first path segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Projects whose name starts with one of these (case-insensitive) are hidden from listings
    #[serde(default)]
    pub ignore_project_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Agent pool queue the build definition is bound to
    #[serde(default = "default_pool")]
    pub pool: String,

    /// Optional override for the embedded pipeline template
    pub template_path: Option<PathBuf>,

    /// Order in which environments appear in variables and deploy stages
    #[serde(default = "default_environment_order")]
    pub environment_order: Vec<EnvironmentType>,

    /// Per-environment-type options
    #[serde(default = "default_environment_options")]
    pub environments: IndexMap<EnvironmentType, EnvironmentOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for DevOpsConfig {
    fn default() -> Self {
        Self {
            organization: None,
            token: None,
            base_url: default_base_url(),
            ignore_project_prefixes: Vec::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pool: default_pool(),
            template_path: None,
            environment_order: default_environment_order(),
            environments: default_environment_options(),
        }
    }
}

fn default_base_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_pool() -> String {
    "Default".to_string()
}

fn default_environment_order() -> Vec<EnvironmentType> {
    EnvironmentType::ALL.to_vec()
}

fn default_environment_options() -> IndexMap<EnvironmentType, EnvironmentOptions> {
    EnvironmentType::ALL
        .into_iter()
        .map(|env| (env, EnvironmentOptions::for_environment(env)))
        .collect()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./freecicd.toml, ./freecicd.json, ./freecicd.yaml, ./freecicd.yml
    /// 3. `<user config dir>/freecicd/freecicd.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return load_document(path);
        }

        for candidate in &CONFIG_CANDIDATES {
            let path = Path::new(candidate);
            if path.exists() {
                return load_document(path);
            }
        }

        let user_config = dirs::config_dir().map(|dir| dir.join("freecicd").join("freecicd.toml"));
        if let Some(user_config) = user_config {
            if user_config.exists() {
                return load_document(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Builds the pipeline settings handed to the DevOps service.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let template = match &self.pipeline.template_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read pipeline template: {}", path.display()))?,
            None => DEFAULT_PIPELINE_TEMPLATE.to_string(),
        };

        Ok(PipelineSettings {
            pool_name: self.pipeline.pool.clone(),
            template,
            environment_order: self.pipeline.environment_order.clone(),
            environment_options: self.pipeline.environments.clone(),
            ignore_project_prefixes: self.devops.ignore_project_prefixes.clone(),
        })
    }
}

/// Reads a TOML, JSON or YAML document, picking the parser from the extension.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML: {}", path.display())),
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON: {}", path.display())),
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML: {}", path.display())),
        _ => {
            // Try TOML first, then JSON, then YAML
            toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse file: {}", path.display()))
        }
    }
}

/// Static pipeline tables injected into the reconciler and the renderer.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub pool_name: String,
    pub template: String,
    pub environment_order: Vec<EnvironmentType>,
    pub environment_options: IndexMap<EnvironmentType, EnvironmentOptions>,
    pub ignore_project_prefixes: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            pool_name: pipeline.pool,
            template: DEFAULT_PIPELINE_TEMPLATE.to_string(),
            environment_order: pipeline.environment_order,
            environment_options: pipeline.environments,
            ignore_project_prefixes: Vec::new(),
        }
    }
}

impl PipelineSettings {
    /// Yields the configured environments in the fixed ordering, skipping
    /// environments the caller did not configure. Each key is yielded once.
    pub fn ordered<'a, T>(
        &'a self,
        configured: &'a IndexMap<EnvironmentType, T>,
    ) -> impl Iterator<Item = (EnvironmentType, &'a T)> + 'a {
        self.environment_order
            .iter()
            .enumerate()
            .filter(move |(idx, env)| !self.environment_order[..*idx].contains(*env))
            .filter_map(move |(_, env)| configured.get(env).map(|value| (*env, value)))
    }

    pub fn environment_options(
        &self,
        env: EnvironmentType,
    ) -> crate::error::Result<&EnvironmentOptions> {
        self.environment_options.get(&env).ok_or_else(|| {
            FreeCicdError::Config(format!("No environment options configured for {env}"))
        })
    }

    pub fn is_ignored_project(&self, project_name: &str) -> bool {
        let name = project_name.to_lowercase();
        self.ignore_project_prefixes
            .iter()
            .filter(|prefix| !prefix.is_empty())
            .any(|prefix| name.starts_with(&prefix.to_lowercase()))
    }
}
