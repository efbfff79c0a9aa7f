//! Agent session: the current plan plus the conversation transcript.
//!
//! One session per server process. The API layer serializes access behind a
//! lock, so the plan only ever sees one writer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::llm::ChatMessage;
use crate::plan::Plan;

/// A single agent session.
pub struct Agent {
    plan: Plan,
    history: Vec<ChatMessage>,
}

impl Agent {
    /// Start a session with a fresh plan for `main_goal`.
    pub fn new(main_goal: impl Into<String>) -> Self {
        Self {
            plan: Plan::new(main_goal),
            history: Vec::new(),
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    /// Conversation transcript, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage::assistant(content));
    }

    /// Replace the plan with a fresh one sharing the same main goal.
    pub fn reset_plan(&mut self) {
        self.plan.reset();
    }
}

/// One step of the scripted demo plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanUpdate {
    pub task_id: String,
    pub goal: String,
    pub state: String,
}

const DEMO_STEPS: &[&str] = &[
    "Analyze project requirements",
    "Set up development environment",
    "Design system architecture",
    "Implement core functionality",
    "Write unit tests",
    "Perform integration testing",
    "Deploy to staging environment",
    "Conduct user acceptance testing",
    "Prepare documentation",
    "Deploy to production",
];

/// Stream a canned planning session for the dashboard.
///
/// Walks each scripted step through open, in progress, and completed with
/// short pauses in between. Display-only: the updates carry flat numeric
/// ids and never touch a real [`Plan`].
pub fn demo_updates() -> mpsc::Receiver<PlanUpdate> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        for (index, goal) in DEMO_STEPS.iter().enumerate() {
            let task_id = (index + 1).to_string();
            let update = |state: &str| PlanUpdate {
                task_id: task_id.clone(),
                goal: goal.to_string(),
                state: state.to_string(),
            };

            tokio::time::sleep(Duration::from_millis(500)).await;
            if tx.send(update("open")).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            if tx.send(update("in_progress")).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            if tx.send(update("completed")).await.is_err() {
                return;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_tracks_transcript_order() {
        let mut agent = Agent::new("Ship feature");
        agent.push_user("hello");
        agent.push_assistant("hi");
        agent.push_user("next");

        let roles: Vec<_> = agent.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                crate::llm::Role::User,
                crate::llm::Role::Assistant,
                crate::llm::Role::User
            ]
        );
    }

    #[test]
    fn reset_plan_keeps_goal_and_history() {
        let mut agent = Agent::new("Ship feature");
        agent.plan_mut().add_subtask("0", "a").unwrap();
        agent.push_user("hello");

        agent.reset_plan();

        assert_eq!(agent.plan().main_goal(), "Ship feature");
        assert_eq!(agent.plan().root().subtask_count(), 0);
        assert_eq!(agent.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn demo_updates_walk_each_step_through_three_states() {
        let mut rx = demo_updates();
        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }

        assert_eq!(updates.len(), DEMO_STEPS.len() * 3);
        for (i, chunk) in updates.chunks(3).enumerate() {
            let expected_id = (i + 1).to_string();
            assert!(chunk.iter().all(|u| u.task_id == expected_id));
            let states: Vec<&str> = chunk.iter().map(|u| u.state.as_str()).collect();
            assert_eq!(states, vec!["open", "in_progress", "completed"]);
        }
    }
}
