use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FreeCicdError {
    #[error("API request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Unresolved template token: {{{{{0}}}}}")]
    UnresolvedToken(String),

    #[error("Git write rejected: {0}")]
    GitWrite(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pipeline(Box<PipelineFailure>),
}

pub type Result<T> = std::result::Result<T, FreeCicdError>;

/// Coarse classification of a failure, independent of where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Remote,
    NotFound,
    Configuration,
    Validation,
    Template,
    Cancelled,
    Io,
}

impl FreeCicdError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { .. } | Self::GitWrite(_) | Self::Network(_) | Self::Json(_) => {
                ErrorKind::Remote
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Template(_) | Self::UnresolvedToken(_) => ErrorKind::Template,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
            Self::Pipeline(failure) => failure.source.kind(),
        }
    }

    /// Returns the orchestration failure details when this error came out of
    /// the pipeline create/update flow.
    pub fn as_pipeline_failure(&self) -> Option<&PipelineFailure> {
        match self {
            Self::Pipeline(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Steps of the create-or-update pipeline flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStep {
    ResolveResources,
    ReconcileVariableGroups,
    RenderYaml,
    CommitYaml,
    ResolveAgentPool,
    SaveDefinition,
    ReadBackYaml,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ResolveResources => "resolving resources",
            Self::ReconcileVariableGroups => "reconciling variable groups",
            Self::RenderYaml => "rendering pipeline YAML",
            Self::CommitYaml => "committing pipeline YAML",
            Self::ResolveAgentPool => "resolving agent pool",
            Self::SaveDefinition => "saving build definition",
            Self::ReadBackYaml => "reading back pipeline YAML",
        };
        f.write_str(label)
    }
}

/// Remote side effects that were already applied when the flow stopped.
///
/// None of these are rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedChanges {
    pub created_variable_groups: Vec<String>,
    pub committed_yaml_path: Option<String>,
    pub definition_id: Option<i32>,
}

impl AppliedChanges {
    pub fn is_empty(&self) -> bool {
        self.created_variable_groups.is_empty()
            && self.committed_yaml_path.is_none()
            && self.definition_id.is_none()
    }
}

#[derive(Error, Debug)]
#[error("Pipeline setup failed while {step}: {source}")]
pub struct PipelineFailure {
    pub step: PipelineStep,
    pub applied: AppliedChanges,
    #[source]
    pub source: FreeCicdError,
}

impl PipelineFailure {
    pub fn new(step: PipelineStep, applied: &AppliedChanges, source: FreeCicdError) -> Self {
        Self {
            step,
            applied: applied.clone(),
            source,
        }
    }

    pub fn is_partially_applied(&self) -> bool {
        !self.applied.is_empty()
    }
}

impl From<PipelineFailure> for FreeCicdError {
    fn from(failure: PipelineFailure) -> Self {
        Self::Pipeline(Box::new(failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_token_message_keeps_braces() {
        let err = FreeCicdError::UnresolvedToken("PIPELINE_POOL".to_string());
        assert_eq!(err.to_string(), "Unresolved template token: {{PIPELINE_POOL}}");
    }

    #[test]
    fn test_pipeline_failure_reports_step_and_inner_kind() {
        let applied = AppliedChanges {
            created_variable_groups: vec!["web-dev".to_string()],
            ..AppliedChanges::default()
        };
        let err: FreeCicdError = PipelineFailure::new(
            PipelineStep::CommitYaml,
            &applied,
            FreeCicdError::NotFound("branch 'main'".to_string()),
        )
        .into();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("committing pipeline YAML"));

        let failure = err.as_pipeline_failure().unwrap();
        assert_eq!(failure.step, PipelineStep::CommitYaml);
        assert!(failure.is_partially_applied());
    }

    #[test]
    fn test_empty_applied_changes() {
        assert!(AppliedChanges::default().is_empty());
    }
}
