use std::collections::HashMap;
use std::hash::Hash;
use crossterm::event::{KeyCode, KeyModifiers};
use serde::{Deserialize, Serialize};

// ─── Generic key binding infrastructure ────────────────────────────────

/// A key combination (key code + modifiers).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyBind {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

/// Reverse-lookup map from key combination to action, one per context.
pub struct ActionMap<A> {
    map: HashMap<KeyBind, A>,
    display: HashMap<A, Vec<String>>,
}

impl<A: Copy + Eq + Hash> ActionMap<A> {
    /// Merge user overrides on top of defaults.
    ///
    /// An action present in `overrides` loses all of its default keys.
    pub fn build(
        defaults: &HashMap<A, Vec<String>>,
        overrides: &HashMap<A, Vec<String>>,
    ) -> Self {
        let mut merged = defaults.clone();
        for (action, keys) in overrides {
            merged.insert(*action, keys.clone());
        }

        let mut map = HashMap::new();
        let mut display: HashMap<A, Vec<String>> = HashMap::new();
        for (action, key_strings) in &merged {
            for key_str in key_strings {
                for bind in parse_key(key_str) {
                    map.insert(bind, *action);
                }
            }
            let keys: Vec<String> = key_strings.iter()
                .filter(|s| !s.trim().starts_with("//"))
                .map(|s| format_key_display(s))
                .collect();
            display.insert(*action, keys);
        }

        Self { map, display }
    }

    pub fn keys(&self, action: A) -> &[String] {
        self.display.get(&action).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// First display key for an action, or "" when unbound
    pub fn first_key(&self, action: A) -> &str {
        self.keys(action).first().map(|s| s.as_str()).unwrap_or("")
    }

    pub fn lookup(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<A> {
        let bind = KeyBind { code, modifiers };
        if let Some(action) = self.map.get(&bind) {
            return Some(*action);
        }
        // crossterm may report SHIFT for uppercase letters and shifted symbols
        if let KeyCode::Char(_) = code {
            if modifiers.contains(KeyModifiers::SHIFT) {
                let stripped = modifiers & !KeyModifiers::SHIFT;
                return self.map.get(&KeyBind { code, modifiers: stripped }).copied();
            }
        }
        None
    }
}

// ─── Key string parsing ────────────────────────────────────────────────

/// Parse `"ctrl+k"`, `"cmd+d"`, `"pagedown"`, `"q"` into key binds.
///
/// Letters produce both cases so bindings are case-insensitive.
/// Strings starting with `//` are comments.
pub fn parse_key(s: &str) -> Vec<KeyBind> {
    let trimmed = s.trim();
    if trimmed.starts_with("//") {
        return Vec::new();
    }
    let s = trimmed.to_lowercase();
    let parts: Vec<&str> = s.split('+').collect();
    let (key_part, modifier_parts) = match parts.split_last() {
        Some((last, rest)) => (*last, rest),
        None => return Vec::new(),
    };

    let mut modifiers = KeyModifiers::NONE;
    for part in modifier_parts {
        match *part {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            "alt" | "option" => modifiers |= KeyModifiers::ALT,
            "cmd" | "super" | "meta" => modifiers |= KeyModifiers::SUPER,
            _ => {}
        }
    }

    let code = match key_part {
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backtab" => Some(KeyCode::BackTab),
        "space" => Some(KeyCode::Char(' ')),
        "backspace" => Some(KeyCode::Backspace),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        f if f.len() > 1 && f.starts_with('f') => {
            f[1..].parse::<u8>().ok().filter(|n| (1..=12).contains(n)).map(KeyCode::F)
        }
        k if k.chars().count() == 1 => k.chars().next().map(KeyCode::Char),
        _ => None,
    };

    let Some(code) = code else {
        return Vec::new();
    };

    if let KeyCode::Char(ch) = code {
        if ch.is_ascii_alphabetic() {
            return vec![
                KeyBind { code: KeyCode::Char(ch.to_ascii_lowercase()), modifiers },
                KeyBind { code: KeyCode::Char(ch.to_ascii_uppercase()), modifiers },
            ];
        }
    }

    vec![KeyBind { code, modifiers }]
}

/// `"ctrl+k"` → `"Ctrl+K"`, `"cmd+d"` → `"Cmd+D"`, `"pagedown"` → `"PgDn"`
pub fn format_key_display(s: &str) -> String {
    let s = s.trim().to_lowercase();
    let parts: Vec<&str> = s.split('+').collect();
    let last = parts.len().saturating_sub(1);

    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if i < last {
                match *part {
                    "ctrl" | "control" => "Ctrl".to_string(),
                    "shift" => "Shift".to_string(),
                    "alt" | "option" => "Alt".to_string(),
                    "cmd" | "super" | "meta" => "Cmd".to_string(),
                    other => other.to_string(),
                }
            } else {
                match *part {
                    "up" => "Up".to_string(),
                    "down" => "Down".to_string(),
                    "enter" | "return" => "Enter".to_string(),
                    "esc" | "escape" => "Esc".to_string(),
                    "tab" => "Tab".to_string(),
                    "space" => "Space".to_string(),
                    "backspace" => "BkSp".to_string(),
                    "home" => "Home".to_string(),
                    "end" => "End".to_string(),
                    "pageup" => "PgUp".to_string(),
                    "pagedown" => "PgDn".to_string(),
                    k if k.len() == 1 => k.to_uppercase(),
                    f if f.starts_with('f') && f[1..].parse::<u8>().is_ok() => f.to_uppercase(),
                    other => other.to_string(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join("+")
}

// ─── Global context (active in every focus, including search input) ────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalAction {
    FocusSearch,
    ToggleTheme,
    ToggleAutoTheme,
    ToggleSidebar,
    CloseSidebar,
    ForceQuit,
}

pub fn default_global_keybindings() -> HashMap<GlobalAction, Vec<String>> {
    let mut m = HashMap::new();
    m.insert(GlobalAction::FocusSearch, vec!["//Focus the search box".into(), "ctrl+k".into(), "cmd+k".into()]);
    m.insert(GlobalAction::ToggleTheme, vec!["//Toggle light/dark theme".into(), "ctrl+d".into(), "cmd+d".into()]);
    m.insert(GlobalAction::ToggleAutoTheme, vec!["//Toggle time-based theme".into(), "ctrl+t".into()]);
    m.insert(GlobalAction::ToggleSidebar, vec!["//Show or hide the sidebar".into(), "ctrl+b".into()]);
    m.insert(GlobalAction::CloseSidebar, vec!["//Close sidebar overlay".into(), "esc".into()]);
    m.insert(GlobalAction::ForceQuit, vec!["//Quit from anywhere".into(), "ctrl+c".into()]);
    m
}

// ─── Content context ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentAction {
    Quit,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    Top,
    Bottom,
    SwitchFocus,
}

pub fn default_content_keybindings() -> HashMap<ContentAction, Vec<String>> {
    let mut m = HashMap::new();
    m.insert(ContentAction::Quit, vec!["//Quit".into(), "q".into()]);
    m.insert(ContentAction::ScrollUp, vec!["up".into(), "k".into()]);
    m.insert(ContentAction::ScrollDown, vec!["down".into(), "j".into()]);
    m.insert(ContentAction::PageUp, vec!["pageup".into()]);
    m.insert(ContentAction::PageDown, vec!["pagedown".into(), "space".into()]);
    m.insert(ContentAction::Top, vec!["home".into(), "g".into()]);
    m.insert(ContentAction::Bottom, vec!["end".into()]);
    m.insert(ContentAction::SwitchFocus, vec!["//Focus the sidebar".into(), "tab".into()]);
    m
}

// ─── Sidebar context ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarAction {
    Quit,
    MoveUp,
    MoveDown,
    Open,
    SwitchFocus,
}

pub fn default_sidebar_keybindings() -> HashMap<SidebarAction, Vec<String>> {
    let mut m = HashMap::new();
    m.insert(SidebarAction::Quit, vec!["//Quit".into(), "q".into()]);
    m.insert(SidebarAction::MoveUp, vec!["up".into(), "k".into()]);
    m.insert(SidebarAction::MoveDown, vec!["down".into(), "j".into()]);
    m.insert(SidebarAction::Open, vec!["//Open the selected document".into(), "enter".into()]);
    m.insert(SidebarAction::SwitchFocus, vec!["//Focus the document".into(), "tab".into()]);
    m
}

// ─── JSON config & runtime container ───────────────────────────────────

/// Per-context overrides as stored in settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeybindingsConfig {
    #[serde(default = "default_global_keybindings")]
    pub global: HashMap<GlobalAction, Vec<String>>,
    #[serde(default = "default_content_keybindings")]
    pub content: HashMap<ContentAction, Vec<String>>,
    #[serde(default = "default_sidebar_keybindings")]
    pub sidebar: HashMap<SidebarAction, Vec<String>>,
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            global: default_global_keybindings(),
            content: default_content_keybindings(),
            sidebar: default_sidebar_keybindings(),
        }
    }
}

pub struct Keybindings {
    global: ActionMap<GlobalAction>,
    content: ActionMap<ContentAction>,
    sidebar: ActionMap<SidebarAction>,
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::from_config(&KeybindingsConfig::default())
    }
}

impl Keybindings {
    pub fn from_config(config: &KeybindingsConfig) -> Self {
        Self {
            global: ActionMap::build(&default_global_keybindings(), &config.global),
            content: ActionMap::build(&default_content_keybindings(), &config.content),
            sidebar: ActionMap::build(&default_sidebar_keybindings(), &config.sidebar),
        }
    }

    pub fn global_action(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<GlobalAction> {
        self.global.lookup(code, modifiers)
    }
    pub fn global_first_key(&self, action: GlobalAction) -> &str { self.global.first_key(action) }

    pub fn content_action(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<ContentAction> {
        self.content.lookup(code, modifiers)
    }
    pub fn content_first_key(&self, action: ContentAction) -> &str { self.content.first_key(action) }

    pub fn sidebar_action(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<SidebarAction> {
        self.sidebar.lookup(code, modifiers)
    }
    pub fn sidebar_first_key(&self, action: SidebarAction) -> &str { self.sidebar.first_key(action) }
}

// ─── Tests ─────────────────────────────────────────────────────────────
