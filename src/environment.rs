use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Deployment environment a pipeline can target.
///
/// The string form is used verbatim in generated variable and stage names
/// (e.g. `CI_AzureDev_WebsiteName`, `DeployAzureDevStage`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvironmentType {
    AzureDev,
    AzureProd,
    AzureCms,
}

impl EnvironmentType {
    pub const ALL: [Self; 3] = [Self::AzureDev, Self::AzureProd, Self::AzureCms];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AzureDev => "AzureDev",
            Self::AzureProd => "AzureProd",
            Self::AzureCms => "AzureCMS",
        }
    }
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown environment type '{s}'"))
    }
}

// Hand-written so the type also works as a map key in TOML and YAML.
impl Serialize for EnvironmentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EnvironmentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-environment deployment settings supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EnvSetting {
    /// Human-readable environment name used in comments and display names.
    pub display_name: String,
    pub website_name: String,
    pub app_pool_name: String,
    pub virtual_path: String,
    pub iis_deployment_type: String,
    pub variable_group_name: String,
    pub binding_info: Option<String>,
    pub auth_user: Option<String>,
}

impl EnvSetting {
    pub fn binding_info(&self) -> Option<&str> {
        non_blank(self.binding_info.as_deref())
    }

    pub fn auth_user(&self) -> Option<&str> {
        non_blank(self.auth_user.as_deref())
    }

    pub fn display_name_or(&self, env: EnvironmentType) -> String {
        if self.display_name.trim().is_empty() {
            env.to_string()
        } else {
            self.display_name.trim().to_string()
        }
    }
}

/// Static per-environment-type options (agent pool, runtime, identity).
///
/// Only `agent_pool` reaches the rendered YAML, as the deployment
/// environment name. The .NET version and app-pool identity are
/// configuration data: deploy stages read them at run time from the
/// `CI_PIPELINE_COMMON_DotNetVersion_<env>` and
/// `CI_PIPELINE_COMMON_AppPoolIdentity_<env>` variables of the common group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvironmentOptions {
    pub agent_pool: String,
    #[serde(default = "default_dotnet_version")]
    pub dotnet_version: String,
    #[serde(default = "default_app_pool_identity")]
    pub app_pool_identity: String,
}

impl EnvironmentOptions {
    pub fn for_environment(env: EnvironmentType) -> Self {
        Self {
            agent_pool: env.to_string(),
            dotnet_version: default_dotnet_version(),
            app_pool_identity: default_app_pool_identity(),
        }
    }
}

fn default_dotnet_version() -> String {
    "8.0".to_string()
}

fn default_app_pool_identity() -> String {
    "ApplicationPoolIdentity".to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_type_serde_names() {
        let json = serde_json::to_string(&EnvironmentType::AzureCms).unwrap();
        assert_eq!(json, "\"AzureCMS\"");

        let parsed: EnvironmentType = serde_json::from_str("\"AzureProd\"").unwrap();
        assert_eq!(parsed, EnvironmentType::AzureProd);
    }

    #[test]
    fn test_environment_type_parse_is_case_insensitive() {
        assert_eq!("azurecms".parse::<EnvironmentType>(), Ok(EnvironmentType::AzureCms));
        assert!("staging".parse::<EnvironmentType>().is_err());
    }

    #[test]
    fn test_blank_optional_fields_are_treated_as_absent() {
        let env = EnvSetting {
            binding_info: Some("   ".to_string()),
            auth_user: Some(" svc-deploy ".to_string()),
            ..EnvSetting::default()
        };
        assert_eq!(env.binding_info(), None);
        assert_eq!(env.auth_user(), Some("svc-deploy"));
    }

    #[test]
    fn test_display_name_falls_back_to_environment() {
        let env = EnvSetting::default();
        assert_eq!(env.display_name_or(EnvironmentType::AzureDev), "AzureDev");
    }
}
