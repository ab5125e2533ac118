//! In-memory Azure DevOps used by the orchestration tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use serde_json::Map;
use tokio_util::sync::CancellationToken;

use crate::auth::{Connection, Token};
use crate::error::{FreeCicdError, Result};

use super::api::{Connector, DevOpsApi};
use super::models::{
    AgentQueue, Build, BuildDefinition, BuildDefinitionReference, BuildProcess, BuildRepository,
    BuildTrigger, ChangeType, DefinitionQueueStatus, GitBranchStats, GitCommitSummary, GitItem,
    GitPush, GitRef, GitRepository, GitUserDate, Link, ReferenceLinks, TeamProject,
    VariableGroupModel, VariableGroupParameters, VariableValue,
};

#[derive(Default)]
pub struct FakeState {
    pub projects: Vec<TeamProject>,
    /// (project name, repository)
    pub repos: Vec<(String, GitRepository)>,
    /// (repository name, branch)
    pub branches: Vec<(String, GitBranchStats)>,
    /// (repository name, branch name, item)
    pub items: Vec<(String, String, GitItem)>,
    /// (repository name, ref)
    pub refs: Vec<(String, GitRef)>,
    pub definitions: Vec<BuildDefinition>,
    /// (definition id, build)
    pub builds: Vec<(i32, Build)>,
    pub queues: Vec<AgentQueue>,
    pub groups: Vec<VariableGroupModel>,
    pub pushes: Vec<GitPush>,
    pub created_definitions: Vec<BuildDefinition>,
    pub updated_definitions: Vec<BuildDefinition>,
    pub group_requests: Vec<VariableGroupParameters>,
    pub calls: Vec<String>,
    /// Operation names that answer with a 500.
    pub failing: HashSet<&'static str>,
    /// Definition ids whose full read answers with a 500.
    pub failing_definitions: HashSet<i32>,
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    next_id: i32,
}

fn links(href: &str) -> Option<ReferenceLinks> {
    Some(ReferenceLinks {
        web: Some(Link {
            href: href.to_string(),
        }),
    })
}

fn project(id: &str, name: &str) -> TeamProject {
    TeamProject {
        id: id.to_string(),
        name: name.to_string(),
        description: Some(format!("{name} project")),
        last_update_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single(),
        links: links(&format!("https://dev.azure.com/contoso/{name}")),
    }
}

fn repo(id: &str, project: &str, name: &str) -> GitRepository {
    GitRepository {
        id: id.to_string(),
        name: name.to_string(),
        default_branch: Some("refs/heads/main".to_string()),
        web_url: None,
        links: links(&format!("https://dev.azure.com/contoso/{project}/_git/{name}")),
    }
}

fn branch(name: &str, commit_id: &str) -> GitBranchStats {
    GitBranchStats {
        name: name.to_string(),
        commit: Some(GitCommitSummary {
            commit_id: commit_id.to_string(),
            committer: Some(GitUserDate {
                date: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).single(),
            }),
        }),
    }
}

fn file(path: &str, content: &str) -> GitItem {
    GitItem {
        object_id: format!("obj{path}"),
        commit_id: "c-initial".to_string(),
        path: path.to_string(),
        is_folder: false,
        content: Some(content.to_string()),
    }
}

impl FakeState {
    /// An organization with a pipelines project and a code project.
    ///
    /// - `Pipelines` project (`p-ops`) with repo `Pipelines` (`r-ops`), branch `main`
    /// - `Web` project (`p-web`) with repo `Website` (`r-web`), branch `develop`
    /// - `Archive-2019` project, hidden by an `archive` ignore prefix
    /// - agent queues `Default` and `Hosted`, variable group `web-dev` (id 10)
    /// - definition 12 `web-deploy` with a schedule and a CI trigger, 20 builds
    pub fn sample() -> Self {
        let mut state = Self {
            next_id: 100,
            ..Self::default()
        };

        state.projects = vec![
            project("p-ops", "Pipelines"),
            project("p-web", "Web"),
            project("p-old", "Archive-2019"),
        ];
        state.repos = vec![
            ("Pipelines".into(), repo("r-ops", "Pipelines", "Pipelines")),
            ("Web".into(), repo("r-web", "Web", "Website")),
            ("Web".into(), repo("r-docs", "Web", "Docs")),
        ];
        state.branches = vec![
            ("Pipelines".into(), branch("main", "c-main")),
            ("Website".into(), branch("develop", "c-dev")),
            ("Website".into(), branch("main", "c-web-main")),
        ];
        state.refs = vec![(
            "Pipelines".into(),
            GitRef {
                name: "refs/heads/main".into(),
                object_id: "c-main".into(),
            },
        )];
        state.items = vec![
            (
                "Website".into(),
                "develop".into(),
                file("/src/Web/Web.csproj", "<Project />"),
            ),
            (
                "Website".into(),
                "develop".into(),
                file("/src/Web/DataAccess.App.cs", "// app"),
            ),
            (
                "Website".into(),
                "develop".into(),
                GitItem {
                    path: "/src/Web".into(),
                    is_folder: true,
                    ..GitItem::default()
                },
            ),
        ];
        state.queues = vec![
            AgentQueue {
                id: 1,
                name: "Default".into(),
            },
            AgentQueue {
                id: 2,
                name: "Hosted".into(),
            },
        ];
        state.groups = vec![VariableGroupModel {
            id: 10,
            name: "web-dev".into(),
            description: Some("existing".into()),
            variables: IndexMap::from([(
                "BasePath".to_string(),
                VariableValue {
                    value: Some("/web".into()),
                    ..VariableValue::default()
                },
            )]),
        }];

        let mut schedule = Map::new();
        schedule.insert("schedules".into(), serde_json::json!([]));
        state.definitions = vec![BuildDefinition {
            id: 12,
            name: "web-deploy".into(),
            path: "\\Projects\\Web".into(),
            revision: Some(3),
            queue_status: DefinitionQueueStatus::Paused,
            repository: Some(BuildRepository {
                id: "r-old".into(),
                name: "Pipelines".into(),
                kind: "TfsGit".into(),
                default_branch: "refs/heads/old".into(),
                properties: IndexMap::from([("cleanOptions".to_string(), "0".to_string())]),
                extra: Map::new(),
            }),
            process: Some(BuildProcess::yaml("Projects/Web/web-deploy.yml".into())),
            triggers: vec![
                BuildTrigger {
                    trigger_type: "schedule".into(),
                    settings_source_type: None,
                    batch_changes: None,
                    max_concurrent_builds_per_branch: None,
                    extra: schedule,
                },
                BuildTrigger::continuous_integration(),
            ],
            links: links(
                "https://dev.azure.com/contoso/Pipelines/_build/definition?definitionId=12",
            ),
            ..BuildDefinition::default()
        }];
        state.builds = (1..=20)
            .map(|id| {
                (
                    12,
                    Build {
                        id,
                        status: Some("completed".into()),
                        result: Some("succeeded".into()),
                        queue_time: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single(),
                        links: links(&format!(
                            "https://dev.azure.com/contoso/Pipelines/_build/results?buildId={id}"
                        )),
                    },
                )
            })
            .collect();

        state
    }

    fn find_project(&self, project: &str) -> Result<&TeamProject> {
        self.projects
            .iter()
            .find(|p| p.id == project || p.name.eq_ignore_ascii_case(project))
            .ok_or_else(|| FreeCicdError::NotFound(format!("project '{project}'")))
    }

    fn find_repo(&self, project: &str, repo: &str) -> Result<&GitRepository> {
        let project_name = self.find_project(project)?.name.clone();
        self.repos
            .iter()
            .filter(|(owner, _)| *owner == project_name)
            .map(|(_, r)| r)
            .find(|r| r.id == repo || r.name.eq_ignore_ascii_case(repo))
            .ok_or_else(|| FreeCicdError::NotFound(format!("repository '{repo}'")))
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn apply_push(&mut self, repo_name: &str, push: &GitPush) -> Result<()> {
        let update = push
            .ref_updates
            .first()
            .ok_or_else(|| FreeCicdError::Validation("push without ref update".into()))?;
        let branch_name = update.name.trim_start_matches("refs/heads/").to_string();
        let commit_id = format!("c-push-{}", self.pushes.len() + 1);

        for change in push.commits.iter().flat_map(|c| c.changes.iter()) {
            let existing = self.items.iter().position(|(r, b, item)| {
                r == repo_name && *b == branch_name && item.path == change.item.path
            });
            match (change.change_type, existing) {
                (ChangeType::Add, Some(_)) => {
                    return Err(FreeCicdError::Api {
                        status: 409,
                        message: format!("'{}' already exists", change.item.path),
                    })
                }
                (ChangeType::Edit, None) => {
                    return Err(FreeCicdError::Api {
                        status: 409,
                        message: format!("'{}' does not exist", change.item.path),
                    })
                }
                (ChangeType::Edit, Some(idx)) => {
                    let item = &mut self.items[idx].2;
                    item.content = Some(change.new_content.content.clone());
                    item.commit_id.clone_from(&commit_id);
                }
                (ChangeType::Add, None) => self.items.push((
                    repo_name.to_string(),
                    branch_name.clone(),
                    GitItem {
                        object_id: format!("obj{}", change.item.path),
                        commit_id: commit_id.clone(),
                        path: change.item.path.clone(),
                        is_folder: false,
                        content: Some(change.new_content.content.clone()),
                    },
                )),
            }
        }

        for (_, git_ref) in self
            .refs
            .iter_mut()
            .filter(|(r, g)| r == repo_name && g.name == update.name)
        {
            git_ref.object_id.clone_from(&commit_id);
        }

        let mut stored = push.clone();
        stored.push_id = Some(self.pushes.len() as i64 + 1);
        self.pushes.push(stored);
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeConnector {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn connection() -> Connection {
        Connection::new("contoso", Token::from("pat"))
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    fn connect(&self, connection: &Connection, cancel: CancellationToken) -> Result<FakeSession> {
        connection.validate()?;
        self.state().sessions_opened += 1;
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            cancel,
        })
    }
}

pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    cancel: CancellationToken,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.sessions_closed += 1;
        }
    }
}

impl FakeSession {
    /// Records the call and applies cancellation and injected failures.
    fn enter(&self, operation: &'static str) -> Result<MutexGuard<'_, FakeState>> {
        if self.cancel.is_cancelled() {
            return Err(FreeCicdError::Cancelled);
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            return Err(FreeCicdError::Api {
                status: 500,
                message: format!("{operation} failed"),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl DevOpsApi for FakeSession {
    fn org_url(&self) -> String {
        "https://dev.azure.com/contoso/".to_string()
    }

    async fn list_projects(&self) -> Result<Vec<TeamProject>> {
        let state = self.enter("list_projects")?;
        Ok(state.projects.clone())
    }

    async fn get_project(&self, project: &str) -> Result<TeamProject> {
        let state = self.enter("get_project")?;
        state.find_project(project).cloned()
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<GitRepository>> {
        let state = self.enter("list_repositories")?;
        let name = state.find_project(project)?.name.clone();
        Ok(state
            .repos
            .iter()
            .filter(|(owner, _)| *owner == name)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn get_repository(&self, project: &str, repo: &str) -> Result<GitRepository> {
        let state = self.enter("get_repository")?;
        state.find_repo(project, repo).cloned()
    }

    async fn list_branches(&self, project: &str, repo: &str) -> Result<Vec<GitBranchStats>> {
        let state = self.enter("list_branches")?;
        let name = state.find_repo(project, repo)?.name.clone();
        Ok(state
            .branches
            .iter()
            .filter(|(r, _)| *r == name)
            .map(|(_, b)| b.clone())
            .collect())
    }

    async fn get_branch(
        &self,
        project: &str,
        repo: &str,
        branch: &str,
    ) -> Result<GitBranchStats> {
        let state = self.enter("get_branch")?;
        let name = state.find_repo(project, repo)?.name.clone();
        state
            .branches
            .iter()
            .find(|(r, b)| *r == name && b.name == branch)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| FreeCicdError::NotFound(format!("branch '{branch}'")))
    }

    async fn list_items(&self, project: &str, repo: &str, branch: &str) -> Result<Vec<GitItem>> {
        let state = self.enter("list_items")?;
        let name = state.find_repo(project, repo)?.name.clone();
        Ok(state
            .items
            .iter()
            .filter(|(r, b, _)| *r == name && b == branch)
            .map(|(_, _, item)| GitItem {
                content: None,
                ..item.clone()
            })
            .collect())
    }

    async fn get_item(
        &self,
        project: &str,
        repo: &str,
        path: &str,
        branch: Option<&str>,
        include_content: bool,
    ) -> Result<Option<GitItem>> {
        let state = self.enter("get_item")?;
        let name = state.find_repo(project, repo)?.name.clone();
        Ok(state
            .items
            .iter()
            .find(|(r, b, item)| {
                *r == name && branch.map_or(true, |wanted| b == wanted) && item.path == path
            })
            .map(|(_, _, item)| GitItem {
                content: if include_content { item.content.clone() } else { None },
                ..item.clone()
            }))
    }

    async fn get_refs(&self, project: &str, repo: &str, filter: &str) -> Result<Vec<GitRef>> {
        let state = self.enter("get_refs")?;
        let name = state.find_repo(project, repo)?.name.clone();
        let prefix = format!("refs/{filter}");
        Ok(state
            .refs
            .iter()
            .filter(|(r, g)| *r == name && g.name.starts_with(&prefix))
            .map(|(_, g)| g.clone())
            .collect())
    }

    async fn create_push(&self, project: &str, repo: &str, push: &GitPush) -> Result<GitPush> {
        let mut state = self.enter("create_push")?;
        let name = state.find_repo(project, repo)?.name.clone();
        state.apply_push(&name, push)?;
        Ok(state.pushes.last().cloned().unwrap_or_else(|| push.clone()))
    }

    async fn list_definitions(&self, _project: &str) -> Result<Vec<BuildDefinitionReference>> {
        let state = self.enter("list_definitions")?;
        Ok(state
            .definitions
            .iter()
            .map(|d| BuildDefinitionReference {
                id: d.id,
                name: d.name.clone(),
                path: d.path.clone(),
                queue_status: d.queue_status,
            })
            .collect())
    }

    async fn get_definition(&self, _project: &str, definition_id: i32) -> Result<BuildDefinition> {
        let state = self.enter("get_definition")?;
        if state.failing_definitions.contains(&definition_id) {
            return Err(FreeCicdError::Api {
                status: 500,
                message: format!("definition {definition_id} unreadable"),
            });
        }
        state
            .definitions
            .iter()
            .find(|d| d.id == definition_id)
            .cloned()
            .ok_or_else(|| FreeCicdError::NotFound(format!("pipeline {definition_id}")))
    }

    async fn create_definition(
        &self,
        _project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let mut state = self.enter("create_definition")?;
        let mut created = definition.clone();
        created.id = state.next_id();
        created.revision = Some(1);
        created.links = links(&format!(
            "https://dev.azure.com/contoso/Pipelines/_build/definition?definitionId={}",
            created.id
        ));
        if let Some(repository) = created.repository.as_mut() {
            if let Some((_, r)) = state.repos.iter().find(|(_, r)| r.id == repository.id) {
                repository.name.clone_from(&r.name);
            }
        }
        state.created_definitions.push(definition.clone());
        state.definitions.push(created.clone());
        Ok(created)
    }

    async fn update_definition(
        &self,
        _project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let mut state = self.enter("update_definition")?;
        state.updated_definitions.push(definition.clone());
        let stored = state
            .definitions
            .iter_mut()
            .find(|d| d.id == definition.id)
            .ok_or_else(|| FreeCicdError::NotFound(format!("pipeline {}", definition.id)))?;
        *stored = definition.clone();
        stored.revision = stored.revision.map(|r| r + 1);
        Ok(stored.clone())
    }

    async fn list_builds(&self, _project: &str, definition_id: i32) -> Result<Vec<Build>> {
        let state = self.enter("list_builds")?;
        Ok(state
            .builds
            .iter()
            .filter(|(d, _)| *d == definition_id)
            .map(|(_, b)| b.clone())
            .collect())
    }

    async fn list_agent_queues(&self, _project: &str) -> Result<Vec<AgentQueue>> {
        let state = self.enter("list_agent_queues")?;
        Ok(state.queues.clone())
    }

    async fn list_variable_groups(&self, _project: &str) -> Result<Vec<VariableGroupModel>> {
        let state = self.enter("list_variable_groups")?;
        Ok(state.groups.clone())
    }

    async fn add_variable_group(
        &self,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel> {
        let mut state = self.enter("add_variable_group")?;
        let group = VariableGroupModel {
            id: state.next_id(),
            name: parameters.name.clone(),
            description: parameters.description.clone(),
            variables: parameters.variables.clone(),
        };
        state.group_requests.push(parameters.clone());
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn update_variable_group(
        &self,
        group_id: i32,
        parameters: &VariableGroupParameters,
    ) -> Result<VariableGroupModel> {
        let mut state = self.enter("update_variable_group")?;
        state.group_requests.push(parameters.clone());
        let group = state
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or_else(|| FreeCicdError::NotFound(format!("variable group {group_id}")))?;
        group.name.clone_from(&parameters.name);
        group.description.clone_from(&parameters.description);
        group.variables.clone_from(&parameters.variables);
        Ok(group.clone())
    }
}
