//! Gateway to the external repository-indexing plugin.
//!
//! Operations are a closed set (index, query, search), each marshaled to
//! the plugin's wire JSON and executed through the plugin runtime binary.
//! The plugin does its own network I/O; this side only builds input,
//! invokes the runtime, and parses the JSON result.

use serde_json::{json, Value};
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

const PLUGIN_ENTRYPOINT: &str = "run";
const PLUGIN_ALLOWED_HOST: &str = "api.greptile.com";

/// Errors from plugin invocations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The runtime binary could not be started.
    #[error("failed to start plugin runtime: {0}")]
    Spawn(#[from] std::io::Error),

    /// The plugin ran but exited non-zero.
    #[error("plugin exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    /// The plugin output was not the expected JSON.
    #[error("failed to parse plugin output: {0}")]
    Parse(String),
}

/// One repository-indexing operation.
///
/// Each variant carries exactly the fields its wire form needs; there is no
/// open string-keyed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOperation {
    /// Index a repository so it can be queried.
    Index { repository: String, branch: String },
    /// Ask a natural-language question about an indexed repository.
    Query {
        repository: String,
        branch: String,
        query: String,
    },
    /// Search an indexed repository for relevant code.
    Search {
        repository: String,
        branch: String,
        query: String,
    },
}

impl PluginOperation {
    /// Parse the operation kind from its wire name plus request fields.
    pub fn from_parts(
        operation: &str,
        repository: String,
        branch: String,
        query: Option<String>,
    ) -> Option<Self> {
        match operation {
            "index" => Some(PluginOperation::Index { repository, branch }),
            "query" => Some(PluginOperation::Query {
                repository,
                branch,
                query: query.unwrap_or_default(),
            }),
            "search" => Some(PluginOperation::Search {
                repository,
                branch,
                query: query.unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// Build the plugin's input JSON.
    ///
    /// `session_id` distinguishes conversations on the plugin side; callers
    /// normally pass a fresh one per invocation.
    fn to_wire(&self, api_key: &str, github_token: &str, session_id: &str) -> Value {
        match self {
            PluginOperation::Index { repository, branch } => json!({
                "operation": "index",
                "repository": repository,
                "remote": "github",
                "branch": branch,
                "api_key": api_key,
                "github_token": github_token,
            }),
            PluginOperation::Query {
                repository,
                branch,
                query,
            } => json!({
                "operation": "query",
                "repository": repository,
                "remote": "github",
                "branch": branch,
                "api_key": api_key,
                "github_token": github_token,
                "messages": [{
                    "id": "1",
                    "content": query,
                    "role": "user",
                }],
                "session_id": session_id,
                "stream": false,
                "genius": true,
            }),
            PluginOperation::Search {
                repository,
                branch,
                query,
            } => json!({
                "operation": "search",
                "repository": repository,
                "remote": "github",
                "branch": branch,
                "api_key": api_key,
                "github_token": github_token,
                "query": query,
                "session_id": session_id,
                "stream": false,
            }),
        }
    }
}

/// Handle to the plugin runtime.
pub struct PluginGateway {
    runtime: String,
    wasm_path: String,
    api_key: String,
    github_token: String,
}

impl PluginGateway {
    pub fn new(
        runtime: impl Into<String>,
        wasm_path: impl Into<String>,
        api_key: impl Into<String>,
        github_token: impl Into<String>,
    ) -> Self {
        Self {
            runtime: runtime.into(),
            wasm_path: wasm_path.into(),
            api_key: api_key.into(),
            github_token: github_token.into(),
        }
    }

    /// Run one operation through the plugin and return its JSON result.
    pub async fn run(&self, operation: &PluginOperation) -> Result<Value, PluginError> {
        let session_id = format!("session-{}", Uuid::new_v4());
        let input = operation.to_wire(&self.api_key, &self.github_token, &session_id);

        tracing::info!(runtime = %self.runtime, wasm = %self.wasm_path, "invoking indexing plugin");

        let output = Command::new(&self.runtime)
            .arg("call")
            .arg(&self.wasm_path)
            .arg(PLUGIN_ENTRYPOINT)
            .arg("--wasi")
            .args(["--allow-host", PLUGIN_ALLOWED_HOST])
            .args(["--input", &input.to_string()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PluginError::Failed { code, stderr });
        }

        parse_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the plugin's stdout into its JSON result.
///
/// The plugin logs a response summary before the payload; the JSON proper
/// starts after a `Body: ` tag when that logging is on.
fn parse_output(stdout: &str) -> Result<Value, PluginError> {
    let payload = match stdout.find("Body: ") {
        Some(index) => &stdout[index + "Body: ".len()..],
        None => stdout,
    };
    serde_json::from_str(payload.trim())
        .map_err(|e| PluginError::Parse(format!("{}: {}", e, payload.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_wire_has_no_query_fields() {
        let op = PluginOperation::Index {
            repository: "owner/repo".to_string(),
            branch: "main".to_string(),
        };
        let wire = op.to_wire("k", "t", "session-1");
        assert_eq!(wire["operation"], "index");
        assert_eq!(wire["repository"], "owner/repo");
        assert_eq!(wire["remote"], "github");
        assert_eq!(wire["branch"], "main");
        assert!(wire.get("messages").is_none());
        assert!(wire.get("query").is_none());
        assert!(wire.get("session_id").is_none());
    }

    #[test]
    fn query_wire_wraps_the_question_in_a_message() {
        let op = PluginOperation::Query {
            repository: "owner/repo".to_string(),
            branch: "dev".to_string(),
            query: "where is the parser?".to_string(),
        };
        let wire = op.to_wire("k", "t", "session-2");
        assert_eq!(wire["operation"], "query");
        assert_eq!(wire["messages"][0]["content"], "where is the parser?");
        assert_eq!(wire["messages"][0]["role"], "user");
        assert_eq!(wire["session_id"], "session-2");
        assert_eq!(wire["genius"], true);
        assert_eq!(wire["stream"], false);
    }

    #[test]
    fn search_wire_carries_the_raw_query() {
        let op = PluginOperation::Search {
            repository: "owner/repo".to_string(),
            branch: "main".to_string(),
            query: "fn resolve".to_string(),
        };
        let wire = op.to_wire("k", "t", "session-3");
        assert_eq!(wire["operation"], "search");
        assert_eq!(wire["query"], "fn resolve");
        assert!(wire.get("messages").is_none());
        assert!(wire.get("genius").is_none());
    }

    #[test]
    fn from_parts_rejects_unknown_operations() {
        assert!(PluginOperation::from_parts("index", "o/r".into(), "main".into(), None).is_some());
        assert!(PluginOperation::from_parts("delete", "o/r".into(), "main".into(), None).is_none());
    }

    #[test]
    fn parse_output_strips_the_body_tag() {
        let out = "Status: 200\nBody: {\"message\": \"ok\"}";
        let value = parse_output(out).unwrap();
        assert_eq!(value["message"], "ok");
    }

    #[test]
    fn parse_output_accepts_bare_json() {
        let value = parse_output("{\"sources\": []}").unwrap();
        assert_eq!(value["sources"], serde_json::json!([]));
    }

    #[test]
    fn parse_output_rejects_garbage() {
        assert!(matches!(
            parse_output("not json at all"),
            Err(PluginError::Parse(_))
        ));
    }
}
