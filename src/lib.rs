//! # devpanel
//!
//! Web panel for orchestrating AI coding-agent operations.
//!
//! This library provides:
//! - A hierarchical task plan with dotted-path ids and state propagation
//! - An HTTP API for chatting with an LLM and steering the plan
//! - A gateway to an external repository-indexing plugin
//! - A read-only filesystem view of GitHub repositories
//!
//! ## Modules
//! - `plan`: the task-plan tree (the core of the system)
//! - `agent`: session holder (plan + transcript) and the demo planner
//! - `api`: axum HTTP surface
//! - `llm`: chat completion client
//! - `plugin`: indexing-plugin gateway
//! - `githubfs`: GitHub repository browser

pub mod agent;
pub mod api;
pub mod config;
pub mod githubfs;
pub mod llm;
pub mod plan;
pub mod plugin;

pub use config::Config;
pub use plan::{Plan, PlanError, Task, TaskDump, TaskState};
