use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tokio::runtime::{Builder, Runtime};

use crate::error::FetchError;

/// Source of raw Markdown documents, addressed by document identifier.
///
/// Implementations are shared with background fetch threads, so they must be
/// `Send + Sync`.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, id: &str) -> Result<String, FetchError>;

    /// Human-readable location shown in the header and logs
    fn describe(&self) -> String;
}

/// Reject identifiers that could escape the `docs/` directory
pub fn validate_id(id: &str) -> Result<(), FetchError> {
    let bad = id.is_empty()
        || id.starts_with('/')
        || id.contains('\\')
        || id.split('/').any(|part| part == "..");
    if bad {
        return Err(FetchError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Fetches `GET <base_url>/docs/<id>` over HTTP(S)
pub struct HttpFetcher {
    base_url: String,
    client: Client,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        // block_on is called from several fetch threads at once
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(FetchError::Io)?;

        let client = Client::builder()
            .user_agent(concat!("docview/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            runtime,
        })
    }

    pub fn document_url(&self, id: &str) -> String {
        format!("{}/docs/{}", self.base_url, id)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, id: &str) -> Result<String, FetchError> {
        validate_id(id)?;
        let url = self.document_url(id);

        self.runtime.block_on(async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            response
                .text()
                .await
                .map_err(|e| FetchError::Transport(format!("Failed to read body: {}", e)))
        })
    }

    fn describe(&self) -> String {
        format!("{}/docs", self.base_url)
    }
}

/// Reads `<root>/docs/<id>` from the local filesystem
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    root: PathBuf,
}

impl LocalFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("docs")
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.docs_dir().join(Path::new(id))
    }
}

impl Fetcher for LocalFetcher {
    fn fetch(&self, id: &str) -> Result<String, FetchError> {
        validate_id(id)?;
        let path = self.document_path(id);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            // Treat a missing file like an HTTP 404 so both sources log alike
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FetchError::Status(404)),
            Err(e) => Err(FetchError::Io(e)),
        }
    }

    fn describe(&self) -> String {
        self.docs_dir().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_accepts_plain_names() {
        assert!(validate_id("welcome.md").is_ok());
        assert!(validate_id("guides/install.md").is_ok());
    }

    #[test]
    fn test_validate_id_rejects_traversal() {
        assert!(matches!(validate_id("../secret.md"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_id("a/../../b.md"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_id("/etc/passwd"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_id("a\\b.md"), Err(FetchError::InvalidId(_))));
        assert!(matches!(validate_id(""), Err(FetchError::InvalidId(_))));
    }

    #[test]
    fn test_local_fetcher_reads_docs_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/intro.md"), "# Intro\n").unwrap();

        let fetcher = LocalFetcher::new(dir.path());
        assert_eq!(fetcher.fetch("intro.md").unwrap(), "# Intro\n");
    }

    #[test]
    fn test_local_fetcher_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = LocalFetcher::new(dir.path());
        assert!(matches!(fetcher.fetch("nope.md"), Err(FetchError::Status(404))));
    }

    #[test]
    fn test_http_document_url() {
        let fetcher = HttpFetcher::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(fetcher.document_url("api.md"), "http://localhost:8000/docs/api.md");
        assert_eq!(fetcher.describe(), "http://localhost:8000/docs");
    }

    #[test]
    fn test_http_fetch_rejects_bad_id_without_io() {
        let fetcher = HttpFetcher::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(matches!(fetcher.fetch("../x.md"), Err(FetchError::InvalidId(_))));
    }
}
