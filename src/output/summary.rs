use std::fmt::Write;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::devops::{
    BranchInfo, BuildDefinitionSummary, FileItem, GitUpdateResult, PipelineDefinitionInfo,
    PipelineRun, ProjectInfo, RepoInfo, VariableGroup,
};
use crate::environment::EnvironmentType;
use crate::error::PipelineFailure;

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{build_result_cell, check_cell, create_table, header, queue_status_cell};

const SECRET_MASK: &str = "********";

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d %H:%M").to_string())
}

fn add_count(output: &mut String, label: &str, count: usize) {
    let _ = writeln!(output, "  {} {}\n", dim(label), bright_yellow(count));
}

pub fn render_projects(projects: &[ProjectInfo]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "📁", "Projects");
    add_count(&mut output, "Projects:", projects.len());

    let mut table = create_table();
    table.set_header(header(&["Name", "Id", "Created", "URL"]));
    for project in projects {
        table.add_row(vec![
            project.project_name.clone(),
            project.project_id.clone(),
            format_date(project.creation_date),
            project.resource_url.clone(),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

pub fn render_repos(repos: &[RepoInfo]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "📦", "Repositories");
    add_count(&mut output, "Repositories:", repos.len());

    let mut table = create_table();
    table.set_header(header(&["Name", "Id", "Default branch", "URL"]));
    for repo in repos {
        table.add_row(vec![
            repo.repo_name.clone(),
            repo.repo_id.clone(),
            repo.default_branch.clone().unwrap_or_else(|| "-".to_string()),
            repo.resource_url.clone(),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

pub fn render_branches(branches: &[BranchInfo]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🌿", "Branches");
    add_count(&mut output, "Branches:", branches.len());

    let mut table = create_table();
    table.set_header(header(&["Branch", "Last commit", "URL"]));
    for branch in branches {
        table.add_row(vec![
            branch.branch_name.clone(),
            format_date(branch.last_commit_date),
            branch.resource_url.clone(),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

pub fn render_files(files: &[FileItem]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "📄", "Files");
    add_count(&mut output, "Files:", files.len());

    let mut table = create_table();
    table.set_header(header(&["Path", "Type", "App file"]));
    for file in files {
        table.add_row(vec![
            comfy_table::Cell::new(&file.path),
            comfy_table::Cell::new(&file.file_type),
            check_cell(file.is_app_file),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

pub fn render_pipelines(pipelines: &[PipelineDefinitionInfo]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🚀", "Pipelines");
    add_count(&mut output, "Pipelines:", pipelines.len());

    let mut table = create_table();
    table.set_header(header(&["Id", "Name", "Status", "YAML", "Repository", "Branch"]));
    for pipeline in pipelines {
        table.add_row(vec![
            comfy_table::Cell::new(pipeline.id),
            comfy_table::Cell::new(&pipeline.name),
            queue_status_cell(&pipeline.queue_status),
            comfy_table::Cell::new(&pipeline.yaml_file_name),
            comfy_table::Cell::new(&pipeline.repository_name),
            comfy_table::Cell::new(&pipeline.default_branch),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

pub fn render_runs(pipeline_id: i32, runs: &[PipelineRun]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "⏱️", &format!("Runs of pipeline {pipeline_id}"));
    add_count(&mut output, "Runs:", runs.len());

    let mut table = create_table();
    table.set_header(header(&["Id", "Status", "Result", "Queued", "URL"]));
    for run in runs {
        table.add_row(vec![
            comfy_table::Cell::new(run.id),
            comfy_table::Cell::new(&run.status),
            build_result_cell(&run.result),
            comfy_table::Cell::new(run.queue_time.format("%Y-%m-%d %H:%M")),
            comfy_table::Cell::new(&run.resource_url),
        ]);
    }
    let _ = writeln!(output, "{table}");
    output
}

/// Secret values are never printed.
pub fn render_variable_groups(groups: &[VariableGroup]) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🔧", "Variable Groups");
    add_count(&mut output, "Groups:", groups.len());

    for group in groups {
        let _ = writeln!(output, "  {} {}", cyan(&group.name), dim(format!("(id {})", group.id)));
        if !group.description.is_empty() {
            let _ = writeln!(output, "  {}", dim(&group.description));
        }
        let _ = writeln!(output, "  {}", dim(&group.resource_url));

        let mut table = create_table();
        table.set_header(header(&["Variable", "Value", "Secret", "Read-only"]));
        for variable in &group.variables {
            let value = if variable.is_secret {
                SECRET_MASK
            } else {
                variable.value.as_str()
            };
            table.add_row(vec![
                comfy_table::Cell::new(&variable.name),
                comfy_table::Cell::new(value),
                check_cell(variable.is_secret),
                check_cell(variable.is_read_only),
            ]);
        }
        let _ = writeln!(output, "{table}\n");
    }
    output
}

pub fn render_git_result(result: &GitUpdateResult) -> String {
    if result.success {
        format!("{} {}", bright_green("✓"), result.message)
    } else {
        format!("{} {}", bright_red("✗"), result.message)
    }
}

pub fn render_definition(summary: &BuildDefinitionSummary) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🚀", "Pipeline");

    let rows = [
        ("Id:", summary.id.to_string()),
        ("Name:", summary.name.clone()),
        ("Status:", summary.queue_status.clone()),
        ("YAML file:", summary.yaml_file_name.clone()),
        ("Repository:", summary.repository_name.clone()),
        ("Default branch:", summary.default_branch.clone()),
        ("URL:", summary.resource_url.clone()),
    ];
    for (label, value) in rows {
        let _ = writeln!(output, "  {} {}", dim(label), cyan(value));
    }
    let _ = writeln!(
        output,
        "  {} {}",
        dim("YAML size:"),
        bright_yellow(format!("{} lines", summary.yaml_contents.lines().count()))
    );
    output
}

/// Names the failing step and every remote change left behind.
pub fn render_pipeline_failure(failure: &PipelineFailure) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} {}",
        bright_red("Pipeline setup failed while"),
        bright_red(failure.step)
    );
    let _ = writeln!(output, "  {} {}", dim("Cause:"), failure.source);

    if !failure.is_partially_applied() {
        let _ = writeln!(output, "  {}", dim("No remote changes were made."));
        return output;
    }

    let _ = writeln!(output, "  {}", bright_yellow("Changes already applied:"));
    for group in &failure.applied.created_variable_groups {
        let _ = writeln!(output, "    - created variable group {}", cyan(group));
    }
    if let Some(path) = &failure.applied.committed_yaml_path {
        let _ = writeln!(output, "    - committed {}", cyan(path));
    }
    if let Some(id) = failure.applied.definition_id {
        let _ = writeln!(output, "    - saved build definition {}", cyan(id));
    }
    output
}

pub fn render_iis_info(info: &IndexMap<EnvironmentType, Option<Value>>) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🖥️", "IIS Info");

    if info.is_empty() {
        let _ = writeln!(output, "  {}", dim("No IIS info files found."));
        return output;
    }

    for (env, value) in info {
        let _ = writeln!(output, "  {}", cyan(env));
        let body = match value {
            Some(value) => serde_json::to_string_pretty(value).unwrap_or_default(),
            None => "null".to_string(),
        };
        for line in body.lines() {
            let _ = writeln!(output, "    {line}");
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devops::Variable;
    use crate::error::{AppliedChanges, FreeCicdError, PipelineStep};

    #[test]
    fn test_secret_values_are_masked() {
        let groups = vec![VariableGroup {
            id: 10,
            name: "web-dev".into(),
            variables: vec![
                Variable {
                    name: "BasePath".into(),
                    value: "/web".into(),
                    ..Variable::default()
                },
                Variable {
                    name: "Password".into(),
                    value: "hunter2".into(),
                    is_secret: true,
                    ..Variable::default()
                },
            ],
            ..VariableGroup::default()
        }];

        let output = render_variable_groups(&groups);

        assert!(output.contains("BasePath"));
        assert!(output.contains("/web"));
        assert!(output.contains(SECRET_MASK));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn test_pipelines_table_lists_each_pipeline() {
        let pipelines = vec![PipelineDefinitionInfo {
            id: 12,
            name: "web-deploy".into(),
            queue_status: "Paused".into(),
            yaml_file_name: "Projects/Web/web-deploy.yml".into(),
            ..PipelineDefinitionInfo::default()
        }];

        let output = render_pipelines(&pipelines);

        assert!(output.contains("web-deploy"));
        assert!(output.contains("Paused"));
        assert!(output.contains("Projects/Web/web-deploy.yml"));
    }

    #[test]
    fn test_failure_lists_applied_changes() {
        let failure = PipelineFailure::new(
            PipelineStep::SaveDefinition,
            &AppliedChanges {
                created_variable_groups: vec!["web-prod".into()],
                committed_yaml_path: Some("Projects/Web/web-ci.yml".into()),
                definition_id: None,
            },
            FreeCicdError::Api {
                status: 400,
                message: "bad definition".into(),
            },
        );

        let output = render_pipeline_failure(&failure);

        assert!(output.contains("saving build definition"));
        assert!(output.contains("web-prod"));
        assert!(output.contains("Projects/Web/web-ci.yml"));
        assert!(!output.contains("saved build definition"));
    }

    #[test]
    fn test_failure_without_changes_says_so() {
        let failure = PipelineFailure::new(
            PipelineStep::ResolveResources,
            &AppliedChanges::default(),
            FreeCicdError::NotFound("branch 'release'".into()),
        );

        assert!(render_pipeline_failure(&failure).contains("No remote changes were made."));
    }
}
