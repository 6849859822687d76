use std::fs;
use std::io;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::keybindings::KeybindingsConfig;

/// Where documents are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentSource {
    /// `GET <base_url>/docs/<id>`
    Http { base_url: String },
    /// `<root>/docs/<id>` on the local filesystem
    Local { root: String },
}

impl Default for DocumentSource {
    fn default() -> Self {
        DocumentSource::Local { root: ".".to_string() }
    }
}

/// One sidebar entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub id: String,
    pub label: String,
}

impl NavEntry {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

fn default_document() -> String {
    "welcome.md".to_string()
}

fn default_navigation() -> Vec<NavEntry> {
    vec![
        NavEntry::new("welcome.md", "Welcome"),
        NavEntry::new("getting-started.md", "Getting Started"),
        NavEntry::new("features.md", "Features"),
        NavEntry::new("api.md", "API Reference"),
        NavEntry::new("examples.md", "Examples"),
        NavEntry::new("CoC.md", "Code of Conduct"),
    ]
}

fn default_auto_theme_interval_secs() -> u64 {
    60
}

fn default_narrow_width() -> u16 {
    100
}

fn default_max_document_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Application settings (~/.docview/settings.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub source: DocumentSource,
    /// Document opened at startup
    #[serde(default = "default_document")]
    pub default_document: String,
    #[serde(default = "default_navigation")]
    pub navigation: Vec<NavEntry>,
    /// Seconds between automatic theme checks
    #[serde(default = "default_auto_theme_interval_secs")]
    pub auto_theme_interval_secs: u64,
    /// Terminals this wide or narrower show the sidebar as an overlay
    #[serde(default = "default_narrow_width")]
    pub narrow_width: u16,
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub keybindings: KeybindingsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: DocumentSource::default(),
            default_document: default_document(),
            navigation: default_navigation(),
            auto_theme_interval_secs: default_auto_theme_interval_secs(),
            narrow_width: default_narrow_width(),
            max_document_bytes: default_max_document_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            keybindings: KeybindingsConfig::default(),
        }
    }
}

impl Settings {
    /// Returns the config directory path (~/.docview)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".docview"))
    }

    /// Returns the config file path (~/.docview/settings.json)
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.json"))
    }

    /// Returns the log file path (~/.docview/docview.log)
    pub fn log_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("docview.log"))
    }

    /// Creates ~/.docview and a default settings.json on first run
    pub fn ensure_config_exists() {
        if let Some(config_dir) = Self::config_dir() {
            if !config_dir.exists() && fs::create_dir_all(&config_dir).is_ok() {
                // User-only access on Unix
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = fs::Permissions::from_mode(0o700);
                    let _ = fs::set_permissions(&config_dir, perms);
                }
            }
        }

        if let Some(config_path) = Self::config_path() {
            if !config_path.exists() {
                let _ = Self::default().save();
            }
        }
    }

    /// Loads settings from the config file, returns default if not found or invalid
    pub fn load() -> Self {
        match Self::load_with_error() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Loads settings from the config file with error information
    pub fn load_with_error() -> Result<Self, String> {
        Self::ensure_config_exists();

        let config_path = Self::config_path()
            .ok_or_else(|| "Could not determine config path".to_string())?;

        let content = fs::read_to_string(&config_path)
            .map_err(|e| format!("Failed to read settings file: {}", e))?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content)
            .map_err(|e| format!("Invalid JSON in settings.json: {}", e))
    }

    /// Saves settings to the config file using atomic write pattern
    pub fn save(&self) -> io::Result<()> {
        let Some(config_dir) = Self::config_dir() else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine config directory",
            ));
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = config_dir.join("settings.json");
        let temp_path = config_dir.join("settings.json.tmp");
        let content = serde_json::to_string_pretty(self)?;

        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &config_path)?;

        Ok(())
    }

    /// Document shown at startup: the configured default, else the first nav entry
    pub fn start_document(&self) -> String {
        if !self.default_document.trim().is_empty() {
            return self.default_document.clone();
        }
        self.navigation
            .first()
            .map(|e| e.id.clone())
            .unwrap_or_else(default_document)
    }
}
