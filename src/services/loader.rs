use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock};
use std::thread;

use regex::Regex;

use crate::error::FetchError;
use crate::services::defaults;
use crate::services::fetch::Fetcher;

/// Where the text of a loaded document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocSource {
    Cache,
    Fetched,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub id: String,
    pub text: String,
    pub title: String,
    pub source: DocSource,
}

/// Raw text of every document fetched successfully during the session.
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: HashMap<String, String>,
}

impl DocumentCache {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|s| s.as_str())
    }

    pub fn insert(&mut self, id: &str, text: String) {
        self.entries.insert(id.to_string(), text);
    }
}

/// Title from the first top-level heading, the title table, or the id itself
pub fn derive_title(id: &str, text: &str) -> String {
    static HEADING: OnceLock<Option<Regex>> = OnceLock::new();
    let heading = HEADING.get_or_init(|| Regex::new(r"(?m)^#\s+(.+)$").ok());

    heading
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| defaults::file_title(id))
}

/// Result of asking the loader for a document
pub enum LoadRequest {
    Ready(LoadedDocument),
    Pending(PendingLoad),
}

pub enum LoadPoll {
    Pending,
    Done(Result<String, FetchError>),
}

/// A fetch running on a background thread
pub struct PendingLoad {
    id: String,
    receiver: Receiver<Result<String, FetchError>>,
}

impl PendingLoad {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Non-blocking check for the fetch result
    pub fn poll(&self) -> LoadPoll {
        match self.receiver.try_recv() {
            Ok(result) => LoadPoll::Done(result),
            Err(mpsc::TryRecvError::Empty) => LoadPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => LoadPoll::Done(Err(FetchError::Transport(
                "fetch worker exited without a result".to_string(),
            ))),
        }
    }
}

pub struct DocumentLoader {
    cache: DocumentCache,
    fetcher: Arc<dyn Fetcher>,
}

impl DocumentLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cache: DocumentCache::default(),
            fetcher,
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub fn source_description(&self) -> String {
        self.fetcher.describe()
    }

    fn cached(&self, id: &str) -> Option<LoadedDocument> {
        self.cache.get(id).map(|text| LoadedDocument {
            id: id.to_string(),
            title: derive_title(id, text),
            text: text.to_string(),
            source: DocSource::Cache,
        })
    }

    /// Load a document, blocking on the fetch when it is not cached
    pub fn load(&mut self, id: &str) -> LoadedDocument {
        if let Some(doc) = self.cached(id) {
            log::debug!("cache hit for {}", id);
            return doc;
        }
        let result = self.fetcher.fetch(id);
        self.complete(id, result)
    }

    /// Cache hits resolve immediately; anything else is fetched on a worker thread
    pub fn request(&mut self, id: &str) -> LoadRequest {
        if let Some(doc) = self.cached(id) {
            log::debug!("cache hit for {}", id);
            return LoadRequest::Ready(doc);
        }

        let (tx, rx): (Sender<Result<String, FetchError>>, Receiver<Result<String, FetchError>>) =
            mpsc::channel();
        let fetcher = Arc::clone(&self.fetcher);
        let fetch_id = id.to_string();
        thread::spawn(move || {
            let result = fetcher.fetch(&fetch_id);
            let _ = tx.send(result);
        });

        LoadRequest::Pending(PendingLoad {
            id: id.to_string(),
            receiver: rx,
        })
    }

    /// Apply a fetch result: successes are cached, failures fall back without caching
    pub fn complete(&mut self, id: &str, result: Result<String, FetchError>) -> LoadedDocument {
        match result {
            Ok(text) => {
                log::info!("fetched {} ({} bytes)", id, text.len());
                self.cache.insert(id, text.clone());
                LoadedDocument {
                    id: id.to_string(),
                    title: derive_title(id, &text),
                    text,
                    source: DocSource::Fetched,
                }
            }
            Err(e) => {
                log::info!("could not load {}, using default content: {}", id, e);
                let text = defaults::fallback_content(id);
                LoadedDocument {
                    id: id.to_string(),
                    title: derive_title(id, &text),
                    text,
                    source: DocSource::Fallback,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Serves scripted results and counts calls
    struct ScriptedFetcher {
        results: Mutex<VecDeque<Result<String, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(results: Vec<Result<String, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, _id: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Status(500)))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[test]
    fn test_second_load_is_cache_hit() {
        let fetcher = ScriptedFetcher::new(vec![Ok("# Guide\nbody".to_string())]);
        let mut loader = DocumentLoader::new(fetcher.clone());

        let first = loader.load("guide.md");
        assert_eq!(first.source, DocSource::Fetched);
        let second = loader.load("guide.md");
        assert_eq!(second.source, DocSource::Cache);
        assert_eq!(first.text, second.text);
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_missing_document_uses_generic_fallback() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::Status(404))]);
        let mut loader = DocumentLoader::new(fetcher);

        let doc = loader.load("missing.md");
        assert_eq!(doc.source, DocSource::Fallback);
        assert!(doc.text.contains("missing.md"));
        assert_eq!(doc.title, "missing");
        assert!(loader.cache().get("missing.md").is_none());
    }

    #[test]
    fn test_registered_default_on_transport_error() {
        let fetcher = ScriptedFetcher::new(vec![Err(FetchError::Transport("refused".into()))]);
        let mut loader = DocumentLoader::new(fetcher);

        let doc = loader.load("welcome.md");
        assert_eq!(doc.source, DocSource::Fallback);
        assert_eq!(doc.text, defaults::default_content("welcome.md").unwrap());
        assert_eq!(doc.title, "Welcome to docview");
    }

    #[test]
    fn test_fallback_is_not_cached() {
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::Status(503)),
            Ok("# Recovered".to_string()),
        ]);
        let mut loader = DocumentLoader::new(fetcher.clone());

        assert_eq!(loader.load("api.md").source, DocSource::Fallback);
        let doc = loader.load("api.md");
        assert_eq!(doc.source, DocSource::Fetched);
        assert_eq!(doc.text, "# Recovered");
        assert_eq!(loader.load("api.md").source, DocSource::Cache);
        assert_eq!(fetcher.calls(), 2);
    }

    #[test]
    fn test_request_resolves_in_background() {
        let fetcher = ScriptedFetcher::new(vec![Ok("# Async".to_string())]);
        let mut loader = DocumentLoader::new(fetcher);

        let pending = match loader.request("async.md") {
            LoadRequest::Pending(p) => p,
            LoadRequest::Ready(_) => panic!("nothing cached yet"),
        };
        assert_eq!(pending.id(), "async.md");

        let deadline = Instant::now() + Duration::from_secs(5);
        let result = loop {
            match pending.poll() {
                LoadPoll::Done(result) => break result,
                LoadPoll::Pending => {
                    assert!(Instant::now() < deadline, "fetch never completed");
                    thread::sleep(Duration::from_millis(5));
                }
            }
        };

        let doc = loader.complete("async.md", result);
        assert_eq!(doc.title, "Async");
        assert!(matches!(loader.request("async.md"), LoadRequest::Ready(_)));
    }

    #[test]
    fn test_derive_title_precedence() {
        assert_eq!(derive_title("a.md", "intro\n# Real Title\n## Sub"), "Real Title");
        assert_eq!(derive_title("a.md", "## Only sub\ntext"), "a");
        assert_eq!(derive_title("welcome.md", "no heading"), "Welcome");
        assert_eq!(derive_title("a.md", "# Windows\r\nline"), "Windows");
    }
}
