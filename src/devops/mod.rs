mod api;
mod client;
mod git_files;
mod iis_info;
mod links;
mod lookup;
mod models;
mod pipeline;
mod progress;
mod runs;
mod service;
mod types;
mod variable_groups;
mod yaml;

#[cfg(test)]
pub(crate) mod testing;

pub use client::RestConnector;
pub use iis_info::IisInfoCache;
pub use pipeline::PipelineRequest;
pub use progress::{ChannelProgress, LogProgress, ProgressReporter, ProgressUpdate, UpdateType};
pub use service::DevOpsService;
pub use types::{
    BranchInfo, BuildDefinitionSummary, FileItem, GitUpdateResult, PipelineDefinitionInfo,
    PipelineRun, ProjectInfo, RepoInfo, Variable, VariableGroup,
};
