//! API request and response types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::plan::TaskDump;

/// Request to chat with the agent.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user's message
    pub message: String,
}

/// Response to a chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// The assistant's reply
    pub response: String,

    /// The plan after the reply was folded in
    pub plan: TaskDump,
}

/// Current plan snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    /// The plan's main goal
    pub main_goal: String,

    /// Human-readable outline of the tree
    pub outline: String,

    /// Structured task tree
    pub tree: TaskDump,
}

/// Request to add a subtask.
#[derive(Debug, Clone, Deserialize)]
pub struct AddSubtaskRequest {
    /// Dotted-path id of the parent task
    pub parent_id: String,

    /// What the subtask accomplishes
    pub goal: String,
}

/// Response after adding a subtask.
#[derive(Debug, Clone, Serialize)]
pub struct AddSubtaskResponse {
    /// The new task's id
    pub id: String,
}

/// Request to change a task's state.
#[derive(Debug, Clone, Deserialize)]
pub struct SetStateRequest {
    /// Dotted-path id of the task
    pub id: String,

    /// New state (wire form, e.g. `in_progress`)
    pub state: String,
}

/// The task currently in progress, if any.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentTaskResponse {
    pub id: String,
    pub goal: String,
    pub state: String,
}

/// Request to run a plugin operation.
#[derive(Debug, Clone, Deserialize)]
pub struct RunPluginRequest {
    /// Operation kind: `index`, `query`, or `search`
    pub operation: String,

    /// Repository slug (`owner/name`)
    pub repository: String,

    /// Branch to operate on (defaults to `main`)
    pub branch: Option<String>,

    /// Question or search query (required by `query` and `search`)
    pub query: Option<String>,
}

/// Branch overview for a repository.
#[derive(Debug, Clone, Serialize)]
pub struct BranchesResponse {
    /// Branch names
    pub branches: Vec<String>,

    /// Files reachable per branch
    pub branch_file_counts: HashMap<String, usize>,

    /// Sum over all branches
    pub total_files: usize,
}

/// Query parameters addressing a path on a branch.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeQuery {
    pub branch: String,

    /// Path inside the repository (defaults to the root)
    #[serde(default)]
    pub path: String,
}

/// File content response.
#[derive(Debug, Clone, Serialize)]
pub struct FileResponse {
    pub path: String,
    pub content: String,
}
