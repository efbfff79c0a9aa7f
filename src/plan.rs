//! Hierarchical task plan: a tree of goals addressed by dotted-path ids.
//!
//! # Structure
//! - One root task with id `"0"`, holding the plan's main goal
//! - Every child id is `<parent id>.<index among siblings at creation>`
//! - Subtask lists are append-only; ids are assigned once and never reused
//!
//! # State machine
//! Setting `completed`, `abandoned`, or `verified` cascades the same state
//! to every descendant, skipping branches that are already `abandoned`.
//! Setting `in_progress` walks the parent chain and marks every ancestor
//! `in_progress` up to the root. `open` propagates in neither direction.
//!
//! Nodes live in an arena indexed by `usize`; the parent link is an index,
//! not an owning reference, so ownership stays strictly top-down.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Errors from plan operations.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Malformed task id (wrong root component or non-integer segment).
    #[error("invalid task id: {0}")]
    InvalidId(String),

    /// Well-formed id that does not address an existing task.
    #[error("task does not exist: {0}")]
    NotFound(String),

    /// State string outside the five-value enumeration.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Open,
    InProgress,
    Completed,
    Abandoned,
    Verified,
}

impl TaskState {
    /// Whether setting this state also closes out the whole subtree.
    fn cascades_down(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Abandoned | TaskState::Verified
        )
    }

    /// Fixed glyph used in the rendered outline.
    pub fn marker(self) -> &'static str {
        match self {
            TaskState::Open => "🔵",
            TaskState::InProgress => "💪",
            TaskState::Completed => "🟢",
            TaskState::Abandoned => "❌",
            TaskState::Verified => "✅",
        }
    }

    /// Wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Open => "open",
            TaskState::InProgress => "in_progress",
            TaskState::Completed => "completed",
            TaskState::Abandoned => "abandoned",
            TaskState::Verified => "verified",
        }
    }
}

impl FromStr for TaskState {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskState::Open),
            "in_progress" => Ok(TaskState::InProgress),
            "completed" => Ok(TaskState::Completed),
            "abandoned" => Ok(TaskState::Abandoned),
            "verified" => Ok(TaskState::Verified),
            other => Err(PlanError::InvalidState(other.to_string())),
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single task in the plan.
///
/// Owned by the plan's arena; handlers only ever see `&Task`. State is
/// mutated exclusively through [`Plan::set_subtask_state`].
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    goal: String,
    state: TaskState,
    parent: Option<usize>,
    subtasks: Vec<usize>,
}

impl Task {
    /// Dotted-path id, e.g. `"0.1.2"`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Number of direct subtasks.
    pub fn subtask_count(&self) -> usize {
        self.subtasks.len()
    }
}

/// Serializable snapshot of a task and its descendants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDump {
    pub id: String,
    pub goal: String,
    pub state: TaskState,
    pub subtasks: Vec<TaskDump>,
}

/// A plan: one main goal and its task tree.
#[derive(Debug, Clone)]
pub struct Plan {
    main_goal: String,
    nodes: Vec<Task>,
}

impl Plan {
    /// Create a plan whose root task carries the main goal.
    pub fn new(main_goal: impl Into<String>) -> Self {
        let main_goal = main_goal.into();
        let root = Task {
            id: "0".to_string(),
            goal: main_goal.clone(),
            state: TaskState::Open,
            parent: None,
            subtasks: Vec::new(),
        };
        Self {
            main_goal,
            nodes: vec![root],
        }
    }

    pub fn main_goal(&self) -> &str {
        &self.main_goal
    }

    pub fn root(&self) -> &Task {
        &self.nodes[0]
    }

    /// Resolve a dotted-path id to an arena index.
    ///
    /// The first component must be exactly `"0"`; each further component is
    /// a zero-based index into the current task's subtask list.
    fn resolve(&self, id: &str) -> Result<usize, PlanError> {
        let mut parts = id.split('.');
        if parts.next() != Some("0") {
            return Err(PlanError::InvalidId(id.to_string()));
        }

        let mut cur = 0usize;
        for part in parts {
            let index: usize = part
                .parse()
                .map_err(|_| PlanError::InvalidId(id.to_string()))?;
            cur = *self.nodes[cur]
                .subtasks
                .get(index)
                .ok_or_else(|| PlanError::NotFound(id.to_string()))?;
        }
        Ok(cur)
    }

    /// Look up a task by its dotted-path id.
    pub fn task(&self, id: &str) -> Result<&Task, PlanError> {
        let idx = self.resolve(id)?;
        Ok(&self.nodes[idx])
    }

    /// Append a new open subtask under `parent_id` and return its id.
    ///
    /// The child id is the parent id joined with the child's position among
    /// its siblings; positions are assigned once and never renumbered.
    pub fn add_subtask(&mut self, parent_id: &str, goal: impl Into<String>) -> Result<String, PlanError> {
        let parent = self.resolve(parent_id)?;
        let id = format!("{}.{}", self.nodes[parent].id, self.nodes[parent].subtasks.len());
        let child = Task {
            id: id.clone(),
            goal: goal.into(),
            state: TaskState::Open,
            parent: Some(parent),
            subtasks: Vec::new(),
        };
        let idx = self.nodes.len();
        self.nodes.push(child);
        self.nodes[parent].subtasks.push(idx);
        Ok(id)
    }

    /// Set the state of the task at `id`, applying the propagation rules.
    pub fn set_state(&mut self, id: &str, state: TaskState) -> Result<(), PlanError> {
        let idx = self.resolve(id)?;
        self.apply_state(idx, state);
        Ok(())
    }

    /// Set the state of the task at `id` from its wire-string form.
    ///
    /// Fails with whichever error lookup or state parsing raised; the tree
    /// is untouched on error.
    pub fn set_subtask_state(&mut self, id: &str, state: &str) -> Result<(), PlanError> {
        let idx = self.resolve(id)?;
        let state: TaskState = state.parse()?;
        self.apply_state(idx, state);
        Ok(())
    }

    fn apply_state(&mut self, idx: usize, state: TaskState) {
        self.nodes[idx].state = state;

        if state.cascades_down() {
            // An already-abandoned branch is never resurrected by a
            // parent-level completion or verification.
            let children = self.nodes[idx].subtasks.clone();
            for child in children {
                if self.nodes[child].state != TaskState::Abandoned {
                    self.apply_state(child, state);
                }
            }
        } else if state == TaskState::InProgress {
            if let Some(parent) = self.nodes[idx].parent {
                self.apply_state(parent, state);
            }
        }
    }

    /// The deepest `in_progress` task, children before self, left to right.
    pub fn current_task(&self) -> Option<&Task> {
        self.current_at(0).map(|idx| &self.nodes[idx])
    }

    fn current_at(&self, idx: usize) -> Option<usize> {
        for &child in &self.nodes[idx].subtasks {
            if let Some(found) = self.current_at(child) {
                return Some(found);
            }
        }
        if self.nodes[idx].state == TaskState::InProgress {
            Some(idx)
        } else {
            None
        }
    }

    /// Indented outline of the whole tree, one task per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_at(0, "", &mut out);
        out
    }

    fn render_at(&self, idx: usize, indent: &str, out: &mut String) {
        let task = &self.nodes[idx];
        out.push_str(&format!(
            "{}{} {} {}\n",
            indent,
            task.state.marker(),
            task.id,
            task.goal
        ));
        let deeper = format!("{}    ", indent);
        for &child in &task.subtasks {
            self.render_at(child, &deeper, out);
        }
    }

    /// Serializable snapshot of the task at `id` and its descendants.
    pub fn dump_task(&self, id: &str) -> Result<TaskDump, PlanError> {
        let idx = self.resolve(id)?;
        Ok(self.dump_at(idx))
    }

    /// Serializable snapshot of the whole tree.
    pub fn dump(&self) -> TaskDump {
        self.dump_at(0)
    }

    fn dump_at(&self, idx: usize) -> TaskDump {
        let task = &self.nodes[idx];
        TaskDump {
            id: task.id.clone(),
            goal: task.goal.clone(),
            state: task.state,
            subtasks: task.subtasks.iter().map(|&c| self.dump_at(c)).collect(),
        }
    }

    /// Discard the tree and start over with the same main goal.
    pub fn reset(&mut self) {
        *self = Plan::new(self.main_goal.clone());
    }
}
