//! HTTP route handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::{self, Agent};
use crate::config::Config;
use crate::githubfs::{FsError, GitHubFs};
use crate::llm::{AnthropicClient, LlmClient, LlmError};
use crate::plan::PlanError;
use crate::plugin::{PluginError, PluginGateway, PluginOperation};

use super::types::*;

/// Main goal for the process-wide agent session.
const MAIN_GOAL: &str = "Coordinate semi-autonomous AI coding agents";

/// Maximum tokens requested per completion.
const CHAT_MAX_TOKENS: u32 = 1024;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// The single agent session; all plan mutation goes through this lock
    pub agent: RwLock<Agent>,
    /// LLM completion client
    pub llm: Arc<dyn LlmClient>,
    /// Gateway to the repository-indexing plugin
    pub plugin: PluginGateway,
}

/// Error response wrapper: typed module errors mapped to HTTP statuses.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<PlanError> for ApiError {
    fn from(e: PlanError) -> Self {
        let status = match e {
            PlanError::InvalidId(_) | PlanError::InvalidState(_) => StatusCode::BAD_REQUEST,
            PlanError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<FsError> for ApiError {
    fn from(e: FsError) -> Self {
        let status = match e {
            FsError::NotFound(_) => StatusCode::NOT_FOUND,
            FsError::Auth => StatusCode::UNAUTHORIZED,
            FsError::Invalid(_) => StatusCode::BAD_REQUEST,
            FsError::Remote(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: e.to_string(),
        }
    }
}

impl From<PluginError> for ApiError {
    fn from(e: PluginError) -> Self {
        let status = match e {
            PluginError::Spawn(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PluginError::Failed { .. } | PluginError::Parse(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm: Arc<dyn LlmClient> = Arc::new(AnthropicClient::with_model(
        &config.anthropic_api_key,
        &config.default_model,
    ));
    let plugin = PluginGateway::new(
        &config.plugin_runtime,
        &config.plugin_wasm,
        &config.greptile_api_key,
        &config.github_token,
    );

    let state = Arc::new(AppState {
        agent: RwLock::new(Agent::new(MAIN_GOAL)),
        llm,
        plugin,
        config: config.clone(),
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/plan", get(get_plan))
        .route("/api/plan/subtasks", post(add_subtask))
        .route("/api/plan/state", post(set_state))
        .route("/api/plan/current", get(current_task))
        .route("/api/plan/reset", post(reset_plan))
        .route("/api/plan/updates", get(plan_updates))
        .route("/api/plugin/run", post(run_plugin))
        .route("/api/repos/:owner/:repo/branches", get(repo_branches))
        .route("/api/repos/:owner/:repo/tree", get(repo_tree))
        .route("/api/repos/:owner/:repo/file", get(repo_file))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Send a message to the LLM and fold its reply into the plan.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    // Record the user message and snapshot the transcript, then release the
    // lock for the duration of the upstream call.
    let transcript = {
        let mut agent = state.agent.write().await;
        agent.push_user(&request.message);
        agent.history().to_vec()
    };

    let response = state.llm.complete(&transcript, CHAT_MAX_TOKENS).await?;

    let mut agent = state.agent.write().await;
    agent.push_assistant(&response);
    agent.plan_mut().add_subtask("0", &response)?;

    Ok(Json(ChatResponse {
        response,
        plan: agent.plan().dump(),
    }))
}

async fn get_plan(State(state): State<Arc<AppState>>) -> Json<PlanResponse> {
    let agent = state.agent.read().await;
    Json(PlanResponse {
        main_goal: agent.plan().main_goal().to_string(),
        outline: agent.plan().render(),
        tree: agent.plan().dump(),
    })
}

async fn add_subtask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddSubtaskRequest>,
) -> Result<Json<AddSubtaskResponse>, ApiError> {
    let mut agent = state.agent.write().await;
    let id = agent
        .plan_mut()
        .add_subtask(&request.parent_id, request.goal)?;
    Ok(Json(AddSubtaskResponse { id }))
}

async fn set_state(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetStateRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let mut agent = state.agent.write().await;
    agent
        .plan_mut()
        .set_subtask_state(&request.id, &request.state)?;
    Ok(Json(PlanResponse {
        main_goal: agent.plan().main_goal().to_string(),
        outline: agent.plan().render(),
        tree: agent.plan().dump(),
    }))
}

async fn current_task(State(state): State<Arc<AppState>>) -> Json<Option<CurrentTaskResponse>> {
    let agent = state.agent.read().await;
    Json(agent.plan().current_task().map(|task| CurrentTaskResponse {
        id: task.id().to_string(),
        goal: task.goal().to_string(),
        state: task.state().to_string(),
    }))
}

async fn reset_plan(State(state): State<Arc<AppState>>) -> StatusCode {
    let mut agent = state.agent.write().await;
    agent.reset_plan();
    StatusCode::NO_CONTENT
}

/// Stream the scripted demo plan via SSE.
async fn plan_updates(
    State(_state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = agent::demo_updates();
    let stream = async_stream::stream! {
        while let Some(update) = rx.recv().await {
            yield Ok(Event::default().event("plan_update").json_data(&update).unwrap());
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Run an index/query/search operation through the plugin.
async fn run_plugin(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunPluginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let branch = request.branch.unwrap_or_else(|| "main".to_string());
    let operation = PluginOperation::from_parts(
        &request.operation,
        request.repository,
        branch,
        request.query,
    )
    .ok_or_else(|| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("invalid operation: {}", request.operation),
    })?;

    let result = state.plugin.run(&operation).await?;
    Ok(Json(result))
}

fn remote_fs(state: &AppState, owner: &str, repo: &str) -> Result<GitHubFs, ApiError> {
    Ok(GitHubFs::new(
        &format!("{}/{}", owner, repo),
        &state.config.github_token,
    )?)
}

/// Branch names plus per-branch file counts.
async fn repo_branches(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<BranchesResponse>, ApiError> {
    let fs = remote_fs(&state, &owner, &repo)?;
    let branches = fs.branches().await?;

    let mut branch_file_counts = std::collections::HashMap::new();
    let mut total_files = 0;
    for branch in &branches {
        let count = fs.file_count(branch).await?;
        total_files += count;
        branch_file_counts.insert(branch.clone(), count);
    }

    Ok(Json(BranchesResponse {
        branches,
        branch_file_counts,
        total_files,
    }))
}

async fn repo_tree(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<Vec<crate::githubfs::RemoteEntry>>, ApiError> {
    let fs = remote_fs(&state, &owner, &repo)?;
    let entries = fs.list_dir(&query.branch, &query.path).await?;
    Ok(Json(entries))
}

async fn repo_file(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<FileResponse>, ApiError> {
    let fs = remote_fs(&state, &owner, &repo)?;
    let content = fs.read_file(&query.branch, &query.path).await?;
    Ok(Json(FileResponse {
        path: query.path,
        content,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_errors_map_to_client_statuses() {
        let e: ApiError = PlanError::InvalidId("x".to_string()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        let e: ApiError = PlanError::InvalidState("done".to_string()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        let e: ApiError = PlanError::NotFound("0.9".to_string()).into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn fs_errors_map_by_cause() {
        let e: ApiError = FsError::NotFound("src".to_string()).into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);
        let e: ApiError = FsError::Auth.into();
        assert_eq!(e.status, StatusCode::UNAUTHORIZED);
        let e: ApiError = FsError::Remote("boom".to_string()).into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
        let e: ApiError = FsError::Invalid("bad slug".to_string()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let e: ApiError = PluginError::Failed {
            code: 2,
            stderr: "no wasm".to_string(),
        }
        .into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
        let e: ApiError = LlmError::Http {
            status: 500,
            message: "overloaded".to_string(),
        }
        .into();
        assert_eq!(e.status, StatusCode::BAD_GATEWAY);
    }
}
