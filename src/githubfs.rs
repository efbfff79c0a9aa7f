//! Read-only filesystem view of a GitHub repository.
//!
//! Thin adapter over the GitHub REST API: branch listing, directory
//! listing, and file reads by branch and path. No caching; every call is
//! one upstream request (the file counter walks the tree).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("devpanel/", env!("CARGO_PKG_VERSION"));

/// Errors from the remote filesystem.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The branch or path does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// The token was rejected.
    #[error("GitHub API authentication failed")]
    Auth,

    /// Upstream or transport failure.
    #[error("GitHub API request failed: {0}")]
    Remote(String),

    /// The request itself was malformed (bad slug, path is a directory).
    #[error("{0}")]
    Invalid(String),
}

impl From<reqwest::Error> for FsError {
    fn from(e: reqwest::Error) -> Self {
        FsError::Remote(e.to_string())
    }
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry in a remote directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
}

#[derive(Deserialize)]
struct BranchItem {
    name: String,
}

#[derive(Deserialize)]
struct ContentItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
}

impl ContentItem {
    fn kind(&self) -> EntryKind {
        if self.item_type == "dir" {
            EntryKind::Dir
        } else {
            EntryKind::File
        }
    }
}

/// Directory listings come back as an array, file reads as one object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Dir(Vec<ContentItem>),
    File(ContentItem),
}

/// Read-only view of one GitHub repository.
pub struct GitHubFs {
    client: reqwest::Client,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubFs {
    /// Create a view of `owner/name`.
    ///
    /// # Errors
    ///
    /// Returns `FsError::Invalid` when the slug is not `owner/name`.
    pub fn new(repo: &str, token: impl Into<String>) -> Result<Self, FsError> {
        let (owner, name) = repo
            .split_once('/')
            .filter(|(owner, name)| {
                !owner.is_empty() && !name.is_empty() && !name.contains('/')
            })
            .ok_or_else(|| FsError::Invalid(format!("invalid repository format: {}", repo)))?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: name.to_string(),
            token: token.into(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, FsError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        match response.status().as_u16() {
            404 => return Err(FsError::NotFound(what.to_string())),
            401 | 403 => return Err(FsError::Auth),
            status if !response.status().is_success() => {
                return Err(FsError::Remote(format!(
                    "HTTP {} for {}",
                    status, what
                )));
            }
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| FsError::Remote(format!("bad response for {}: {}", what, e)))
    }

    fn contents_url(&self, branch: &str, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect();
        format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            GITHUB_API_URL,
            self.owner,
            self.repo,
            encoded.join("/"),
            urlencoding::encode(branch)
        )
    }

    /// List the repository's branch names.
    pub async fn branches(&self) -> Result<Vec<String>, FsError> {
        let url = format!(
            "{}/repos/{}/{}/branches",
            GITHUB_API_URL, self.owner, self.repo
        );
        let branches: Vec<BranchItem> = self
            .get_json(&url, &format!("{}/{}", self.owner, self.repo))
            .await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    /// List a directory on a branch.
    pub async fn list_dir(&self, branch: &str, path: &str) -> Result<Vec<RemoteEntry>, FsError> {
        let url = self.contents_url(branch, path);
        let response: ContentsResponse = self.get_json(&url, path).await?;
        match response {
            ContentsResponse::Dir(items) => Ok(items
                .into_iter()
                .map(|item| RemoteEntry {
                    kind: item.kind(),
                    name: item.name,
                    path: item.path,
                    size: item.size,
                })
                .collect()),
            ContentsResponse::File(_) => {
                Err(FsError::Invalid(format!("path is not a directory: {}", path)))
            }
        }
    }

    /// Read a file's content on a branch.
    pub async fn read_file(&self, branch: &str, path: &str) -> Result<String, FsError> {
        let url = self.contents_url(branch, path);
        let response: ContentsResponse = self.get_json(&url, path).await?;
        match response {
            ContentsResponse::File(item) => {
                let encoded = item.content.ok_or_else(|| {
                    FsError::Remote(format!("no content returned for {}", path))
                })?;
                decode_content(&encoded)
            }
            ContentsResponse::Dir(_) => {
                Err(FsError::Invalid(format!("path is a directory, not a file: {}", path)))
            }
        }
    }

    /// Count the files reachable on a branch.
    pub async fn file_count(&self, branch: &str) -> Result<usize, FsError> {
        self.count_files(branch, "").await
    }

    #[async_recursion::async_recursion]
    async fn count_files(&self, branch: &str, path: &str) -> Result<usize, FsError> {
        let mut count = 0;
        for entry in self.list_dir(branch, path).await? {
            match entry.kind {
                EntryKind::File => count += 1,
                EntryKind::Dir => count += self.count_files(branch, &entry.path).await?,
            }
        }
        Ok(count)
    }
}

/// Decode the contents API's base64 payload (newline-wrapped).
fn decode_content(encoded: &str) -> Result<String, FsError> {
    let stripped: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(stripped.as_bytes())
        .map_err(|e| FsError::Remote(format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| FsError::Remote(format!("non-UTF-8 content: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_must_be_owner_slash_name() {
        assert!(GitHubFs::new("owner/repo", "t").is_ok());
        assert!(matches!(GitHubFs::new("owner", "t"), Err(FsError::Invalid(_))));
        assert!(matches!(GitHubFs::new("a/b/c", "t"), Err(FsError::Invalid(_))));
        assert!(matches!(GitHubFs::new("/repo", "t"), Err(FsError::Invalid(_))));
    }

    #[test]
    fn contents_url_encodes_segments_and_branch() {
        let fs = GitHubFs::new("owner/repo", "t").unwrap();
        let url = fs.contents_url("feature/x", "src/some file.rs");
        assert_eq!(
            url,
            "https://api.github.com/repos/owner/repo/contents/src/some%20file.rs?ref=feature%2Fx"
        );
    }

    #[test]
    fn contents_response_distinguishes_dir_and_file() {
        let dir = r#"[{"name":"src","path":"src","type":"dir"},{"name":"a.rs","path":"src/a.rs","type":"file","size":10}]"#;
        match serde_json::from_str::<ContentsResponse>(dir).unwrap() {
            ContentsResponse::Dir(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].kind(), EntryKind::Dir);
                assert_eq!(items[1].kind(), EntryKind::File);
            }
            ContentsResponse::File(_) => panic!("expected a directory listing"),
        }

        let file = r#"{"name":"a.rs","path":"src/a.rs","type":"file","size":10,"content":"Zm4=","encoding":"base64"}"#;
        assert!(matches!(
            serde_json::from_str::<ContentsResponse>(file).unwrap(),
            ContentsResponse::File(_)
        ));
    }

    #[test]
    fn decode_content_handles_newline_wrapping() {
        assert_eq!(decode_content("aGVsbG8g\nd29ybGQ=\n").unwrap(), "hello world");
        assert!(decode_content("!!!").is_err());
    }
}
