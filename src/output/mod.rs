mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::ProgressSpinner;
pub use styling::{blue_bold, dim};
pub use summary::{
    render_branches, render_definition, render_files, render_git_result, render_iis_info,
    render_pipeline_failure, render_pipelines, render_projects, render_repos, render_runs,
    render_variable_groups,
};

/// Prints the `FreeCICD` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        blue_bold("🛠️ FreeCICD"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Azure DevOps Pipeline Wiring")
    );
}
