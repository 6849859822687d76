use chrono::{Local, Timelike};

use crate::services::store::KeyValueStore;

pub const THEME_KEY: &str = "docs-theme";
pub const AUTO_THEME_KEY: &str = "auto-theme-enabled";

/// First hour (inclusive) of the light period
const LIGHT_FROM_HOUR: u32 = 7;
/// First hour (inclusive) of the dark period
const DARK_FROM_HOUR: u32 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

/// Time-of-day rule: 19:00-06:59 is dark, 07:00-18:59 is light
pub fn evaluate(hour: u32) -> ThemeMode {
    if hour >= DARK_FROM_HOUR || hour < LIGHT_FROM_HOUR {
        ThemeMode::Dark
    } else {
        ThemeMode::Light
    }
}

pub fn local_hour() -> u32 {
    Local::now().hour()
}

/// Current theme plus the auto-switch flag, both persisted through a store
pub struct ThemeController {
    mode: ThemeMode,
    auto_enabled: bool,
    store: Box<dyn KeyValueStore>,
}

impl ThemeController {
    /// Restore state from the store. Unknown values mean light / auto off.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let mode = store
            .get(THEME_KEY)
            .and_then(|v| ThemeMode::parse(&v))
            .unwrap_or(ThemeMode::Light);
        let auto_enabled = store.get(AUTO_THEME_KEY).as_deref() == Some("true");

        Self {
            mode,
            auto_enabled,
            store,
        }
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn auto_enabled(&self) -> bool {
        self.auto_enabled
    }

    #[cfg(test)]
    pub fn into_store(self) -> Box<dyn KeyValueStore> {
        self.store
    }

    fn persist(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            log::warn!("failed to persist {}={}: {}", key, value, e);
        }
    }

    pub fn set_theme(&mut self, mode: ThemeMode) {
        self.mode = mode;
        self.persist(THEME_KEY, mode.as_str());
    }

    /// Manual switch; ignores the auto flag
    pub fn toggle(&mut self) -> ThemeMode {
        self.set_theme(self.mode.toggled());
        self.mode
    }

    /// Apply the time-of-day rule for `hour` when auto mode is on.
    /// Returns the new mode if it changed.
    pub fn apply_auto_rule(&mut self, hour: u32) -> Option<ThemeMode> {
        if !self.auto_enabled {
            return None;
        }

        let target = evaluate(hour);
        if target == self.mode {
            return None;
        }

        log::info!(
            "time changed ({:02}:00), switching to {} theme",
            hour,
            target.as_str()
        );
        self.set_theme(target);
        Some(target)
    }

    /// Flip the auto flag; turning it on evaluates the rule at `hour` right away
    pub fn toggle_auto(&mut self, hour: u32) -> bool {
        self.auto_enabled = !self.auto_enabled;
        let value = if self.auto_enabled { "true" } else { "false" };
        self.persist(AUTO_THEME_KEY, value);

        if self.auto_enabled {
            self.apply_auto_rule(hour);
        }
        self.auto_enabled
    }
}
