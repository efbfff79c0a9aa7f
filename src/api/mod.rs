//! HTTP API for the panel.
//!
//! ## Endpoints
//!
//! - `GET  /api/health` - Health check
//! - `POST /api/chat` - Send a message to the LLM, fold the reply into the plan
//! - `GET  /api/plan` - Current plan (outline + tree)
//! - `POST /api/plan/subtasks` - Add a subtask under a parent id
//! - `POST /api/plan/state` - Set a task's state (with propagation)
//! - `GET  /api/plan/current` - The task currently in progress
//! - `POST /api/plan/reset` - Start the plan over
//! - `GET  /api/plan/updates` - Scripted demo progress via SSE
//! - `POST /api/plugin/run` - Run an index/query/search plugin operation
//! - `GET  /api/repos/:owner/:repo/branches` - Branches with file counts
//! - `GET  /api/repos/:owner/:repo/tree` - Directory listing
//! - `GET  /api/repos/:owner/:repo/file` - File content

mod routes;
mod types;

pub use routes::{serve, AppState};
pub use types::*;
