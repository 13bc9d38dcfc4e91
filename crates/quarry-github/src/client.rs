use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// Blobs larger than this are skipped (200 KiB).
pub const MAX_FILE_SIZE: u64 = 200 * 1024;

/// How many blob fetches run concurrently per request.
const FETCH_CONCURRENCY: usize = 10;

/// Extensions eligible for indexing.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "md", "mdx", "py", "go", "rs", "java", "kt", "rb", "php", "c",
    "cpp", "cs", "sql", "json",
];

/// One text file fetched from a repository. `sha` is the Git blob object id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub size: u64,
    pub sha: String,
}

/// GitHub REST API client scoped to tree listing and blob fetching.
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl GithubClient {
    /// Create a client. `token` enables authenticated requests for higher rate limits;
    /// public repositories work without one.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest` client cannot be constructed (unreachable in practice).
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client builder should not fail with timeout and user_agent");
        Self {
            client,
            api_base: GITHUB_API_BASE.to_owned(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Override the API base URL. Intended for tests.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        self.api_base = base;
        self
    }

    /// Fetch all indexable text files of `owner/name` at `git_ref`.
    ///
    /// Lists the tree recursively, keeps blobs under [`MAX_FILE_SIZE`] with an
    /// allow-listed extension, then fetches blob contents with a bounded
    /// fan-out. Results come back in tree order. Individual blob failures are
    /// logged and skipped; only the tree listing itself is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] / [`FetchError::AccessDenied`] for
    /// missing or forbidden repositories, and transport/decode errors otherwise.
    pub async fn fetch_repo_files(
        &self,
        owner: &str,
        name: &str,
        git_ref: &str,
    ) -> Result<Vec<FileRecord>> {
        let url = format!(
            "{}/repos/{owner}/{name}/git/trees/{git_ref}?recursive=true",
            self.api_base
        );
        let tree: TreeResponse = self.get_json(&url).await?;

        if tree.truncated {
            tracing::warn!("tree listing for {owner}/{name} was truncated by the GitHub API");
        }

        let candidates: Vec<TreeEntry> = tree
            .tree
            .into_iter()
            .filter(is_indexable_blob)
            .collect();

        tracing::debug!(
            candidates = candidates.len(),
            "fetching blobs for {owner}/{name}@{git_ref}"
        );

        let files: Vec<FileRecord> = futures::stream::iter(
            candidates
                .into_iter()
                .map(|entry| self.fetch_blob(owner, name, entry)),
        )
        .buffered(FETCH_CONCURRENCY)
        .filter_map(|record| async move { record })
        .collect()
        .await;

        Ok(files)
    }

    /// Fetch and decode a single blob. Failures degrade to `None` so one bad
    /// blob cannot fail the whole repository fetch.
    async fn fetch_blob(&self, owner: &str, name: &str, entry: TreeEntry) -> Option<FileRecord> {
        let url = format!("{}/repos/{owner}/{name}/git/blobs/{}", self.api_base, entry.sha);
        let blob: BlobResponse = match self.get_json(&url).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("failed to fetch blob {}: {e}", entry.path);
                return None;
            }
        };

        match decode_blob_content(&blob.content) {
            Ok(content) => Some(FileRecord {
                path: entry.path,
                content,
                size: entry.size.unwrap_or(0),
                sha: entry.sha,
            }),
            Err(e) => {
                tracing::warn!("failed to decode blob {}: {e}", entry.path);
                None
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut req = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::AccessDenied);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Keep blobs with a known size under the ceiling and an allow-listed extension.
fn is_indexable_blob(entry: &TreeEntry) -> bool {
    if entry.kind != "blob" || entry.path.is_empty() {
        return false;
    }
    let Some(size) = entry.size else {
        return false;
    };
    if size == 0 || size > MAX_FILE_SIZE {
        return false;
    }
    extension_allowed(&entry.path)
}

fn extension_allowed(path: &str) -> bool {
    let Some((stem, ext)) = path.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// GitHub wraps blob base64 at 60 columns; strip the newlines before decoding.
fn decode_blob_content(raw: &str) -> Result<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| FetchError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    #[serde(default)]
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn b64(content: &str) -> String {
        STANDARD.encode(content.as_bytes())
    }

    fn client_for(server: &MockServer) -> GithubClient {
        GithubClient::new(None).with_api_base(server.uri())
    }

    #[test]
    fn extension_allow_list() {
        assert!(extension_allowed("src/main.rs"));
        assert!(extension_allowed("README.md"));
        assert!(extension_allowed("a/b/C.SQL"));
        assert!(!extension_allowed("image.png"));
        assert!(!extension_allowed("Makefile"));
        assert!(!extension_allowed(".gitignore"));
    }

    #[test]
    fn indexable_blob_filters() {
        let blob = |kind: &str, path: &str, size: Option<u64>| TreeEntry {
            path: path.into(),
            sha: "abc".into(),
            kind: kind.into(),
            size,
        };
        assert!(is_indexable_blob(&blob("blob", "main.rs", Some(100))));
        assert!(!is_indexable_blob(&blob("tree", "src", None)));
        assert!(!is_indexable_blob(&blob("blob", "main.rs", None)));
        assert!(!is_indexable_blob(&blob("blob", "main.rs", Some(0))));
        assert!(!is_indexable_blob(&blob(
            "blob",
            "main.rs",
            Some(MAX_FILE_SIZE + 1)
        )));
        assert!(!is_indexable_blob(&blob("blob", "big.bin", Some(100))));
    }

    #[test]
    fn decode_handles_newline_wrapped_base64() {
        let encoded = "Zm4gbWFpbigpIHt9\nCg==\n";
        let decoded = decode_blob_content(encoded).unwrap();
        assert_eq!(decoded, "fn main() {}\n");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(matches!(
            decode_blob_content("not base64 !!!"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let client = GithubClient::new(Some("ghp_secret".into()));
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("ghp_secret"));
    }

    #[tokio::test]
    async fn tree_not_found_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/main"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_repo_files("o", "r", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound));
    }

    #[tokio::test]
    async fn tree_forbidden_maps_to_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/main"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_repo_files("o", "r", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::AccessDenied));
    }

    #[tokio::test]
    async fn fetches_filtered_blobs_in_tree_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree": [
                    {"path": "src/lib.rs", "sha": "s1", "type": "blob", "size": 20},
                    {"path": "logo.png", "sha": "s2", "type": "blob", "size": 20},
                    {"path": "src", "sha": "s3", "type": "tree"},
                    {"path": "README.md", "sha": "s4", "type": "blob", "size": 20}
                ],
                "truncated": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/blobs/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": b64("pub fn lib() {}"), "encoding": "base64"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/blobs/s4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": b64("# readme"), "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let files = client_for(&server)
            .fetch_repo_files("o", "r", "main")
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "src/lib.rs");
        assert_eq!(files[0].content, "pub fn lib() {}");
        assert_eq!(files[0].sha, "s1");
        assert_eq!(files[1].path, "README.md");
        assert_eq!(files[1].content, "# readme");
    }

    #[tokio::test]
    async fn failing_blob_is_skipped_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree": [
                    {"path": "a.rs", "sha": "s1", "type": "blob", "size": 10},
                    {"path": "b.rs", "sha": "s2", "type": "blob", "size": 10}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/blobs/s1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/blobs/s2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": b64("fn b() {}"), "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let files = client_for(&server)
            .fetch_repo_files("o", "r", "main")
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "b.rs");
    }

    #[tokio::test]
    async fn empty_tree_yields_no_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/main"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"tree": []})),
            )
            .mount(&server)
            .await;

        let files = client_for(&server)
            .fetch_repo_files("o", "r", "main")
            .await
            .unwrap();
        assert!(files.is_empty());
    }
}
