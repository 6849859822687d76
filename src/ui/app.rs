use std::sync::Arc;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::text::Line;

use crate::config::Settings;
use crate::keybindings::{ContentAction, GlobalAction, Keybindings, SidebarAction};
use crate::services::fetch::Fetcher;
use crate::services::loader::{DocSource, DocumentLoader, LoadPoll, LoadRequest, LoadedDocument, PendingLoad};
use crate::services::navigation::Navigation;
use crate::services::store::KeyValueStore;
use crate::services::theme_controller::{local_hour, ThemeController, ThemeMode};
use crate::utils::markdown::{MarkdownRenderer, Renderer};
use super::theme::Theme;

/// UI ticks a notification stays on screen (~3 seconds at 10 FPS)
const NOTIFICATION_TICKS: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Content,
    Sidebar,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    ticks_left: u8,
}

/// Sidebar presentation. Narrow terminals show it as an overlay,
/// wide ones as a collapsible column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarState {
    pub narrow: bool,
    pub overlay_open: bool,
    pub collapsed: bool,
}

impl SidebarState {
    pub fn visible(&self) -> bool {
        if self.narrow {
            self.overlay_open
        } else {
            !self.collapsed
        }
    }
}

/// The document currently on screen
#[derive(Default)]
pub struct ContentView {
    pub id: String,
    pub title: String,
    pub source: Option<DocSource>,
    pub text: String,
    pub lines: Vec<Line<'static>>,
    /// Set when rendering failed; shown in place of the document
    pub error: Option<String>,
    pub scroll: u16,
    /// Wrapped row count and visible height, both updated by the draw pass
    pub total_rows: u16,
    pub viewport_height: u16,
}

impl ContentView {
    fn max_scroll(&self) -> u16 {
        self.total_rows.saturating_sub(self.viewport_height)
    }
}

pub struct App {
    pub settings: Settings,
    pub keybindings: Keybindings,
    pub theme: Theme,
    pub navigation: Navigation,
    pub focus: Focus,
    pub sidebar: SidebarState,
    pub view: ContentView,
    pub notification: Option<Notification>,
    pub source_label: String,
    pub should_quit: bool,

    loader: DocumentLoader,
    renderer: Box<dyn Renderer>,
    theme_controller: ThemeController,
    true_color: bool,
    pending: Option<PendingLoad>,
    /// Requests overtaken by a newer one; their results only fill the cache
    superseded: Vec<PendingLoad>,
}

impl App {
    pub fn new(
        settings: Settings,
        fetcher: Arc<dyn Fetcher>,
        store: Box<dyn KeyValueStore>,
        true_color: bool,
        width: u16,
    ) -> Self {
        let loader = DocumentLoader::new(fetcher);
        let theme_controller = ThemeController::load(store);
        let theme = Theme::for_mode(theme_controller.mode(), true_color);

        Self {
            keybindings: Keybindings::from_config(&settings.keybindings),
            navigation: Navigation::new(&settings.navigation),
            renderer: Box::new(MarkdownRenderer::new(settings.max_document_bytes)),
            sidebar: SidebarState {
                narrow: width <= settings.narrow_width,
                overlay_open: false,
                collapsed: false,
            },
            source_label: loader.source_description(),
            theme,
            focus: Focus::Content,
            view: ContentView::default(),
            notification: None,
            should_quit: false,
            loader,
            theme_controller,
            true_color,
            pending: None,
            superseded: Vec::new(),
            settings,
        }
    }

    /// Apply the time rule for `hour` and open the start document
    pub fn start(&mut self, hour: u32) {
        self.refresh_auto_theme(hour);
        let id = self.settings.start_document();
        self.open_document(&id);
    }

    pub fn auto_theme_enabled(&self) -> bool {
        self.theme_controller.auto_enabled()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn show_notification(&mut self, message: &str, kind: NotificationKind) {
        self.notification = Some(Notification {
            message: message.to_string(),
            kind,
            ticks_left: NOTIFICATION_TICKS,
        });
    }

    /// Count down the notification, removing it when it expires
    pub fn tick_notification(&mut self) {
        if let Some(n) = self.notification.as_mut() {
            n.ticks_left = n.ticks_left.saturating_sub(1);
            if n.ticks_left == 0 {
                self.notification = None;
            }
        }
    }

    pub fn open_document(&mut self, id: &str) {
        self.navigation.set_active(id);
        match self.loader.request(id) {
            LoadRequest::Ready(doc) => {
                if let Some(old) = self.pending.take() {
                    self.superseded.push(old);
                }
                self.display(doc);
            }
            LoadRequest::Pending(pending) => {
                if let Some(old) = self.pending.replace(pending) {
                    log::debug!("request for {} superseded by {}", old.id(), id);
                    self.superseded.push(old);
                }
            }
        }
    }

    /// Collect finished fetches. Only the latest request reaches the screen.
    pub fn poll_loading(&mut self) {
        let mut still_running = Vec::with_capacity(self.superseded.len());
        for old in std::mem::take(&mut self.superseded) {
            match old.poll() {
                LoadPoll::Pending => still_running.push(old),
                LoadPoll::Done(result) => {
                    self.loader.complete(old.id(), result);
                }
            }
        }
        self.superseded = still_running;

        let Some(pending) = self.pending.as_ref() else {
            return;
        };
        if let LoadPoll::Done(result) = pending.poll() {
            let id = pending.id().to_string();
            self.pending = None;
            let doc = self.loader.complete(&id, result);
            self.display(doc);
        }
    }

    fn display(&mut self, doc: LoadedDocument) {
        self.view.id = doc.id;
        self.view.title = doc.title;
        self.view.source = Some(doc.source);
        self.view.text = doc.text;
        self.view.scroll = 0;
        self.rerender();
    }

    /// Render the current text with the current theme.
    /// A render failure replaces the document with an error panel.
    fn rerender(&mut self) {
        match self.renderer.render(&self.view.text, &self.theme) {
            Ok(lines) => {
                self.view.lines = lines;
                self.view.error = None;
            }
            Err(e) => {
                log::error!("failed to render {}: {}", self.view.id, e);
                self.view.lines.clear();
                self.view.error = Some(e.to_string());
            }
        }
    }

    fn apply_mode(&mut self, mode: ThemeMode) {
        self.theme = Theme::for_mode(mode, self.true_color);
        if !self.view.text.is_empty() {
            self.rerender();
        }
    }

    pub fn toggle_theme(&mut self) {
        let mode = self.theme_controller.toggle();
        self.apply_mode(mode);
    }

    pub fn toggle_auto_theme(&mut self, hour: u32) {
        let before = self.theme_controller.mode();
        let enabled = self.theme_controller.toggle_auto(hour);
        if enabled {
            self.show_notification("Auto theme enabled", NotificationKind::Success);
        } else {
            self.show_notification("Auto theme disabled", NotificationKind::Info);
        }

        let after = self.theme_controller.mode();
        if after != before {
            self.apply_mode(after);
        }
    }

    pub fn refresh_auto_theme(&mut self, hour: u32) {
        if let Some(mode) = self.theme_controller.apply_auto_rule(hour) {
            self.apply_mode(mode);
        }
    }

    /// Periodic ticker fired
    pub fn on_tick(&mut self, hour: u32) {
        self.refresh_auto_theme(hour);
    }

    /// Terminal became visible or focused again
    pub fn on_focus_gained(&mut self, hour: u32) {
        log::debug!("terminal focus regained");
        self.refresh_auto_theme(hour);
    }

    pub fn toggle_sidebar(&mut self) {
        if self.sidebar.narrow {
            self.sidebar.overlay_open = !self.sidebar.overlay_open;
        } else {
            self.sidebar.collapsed = !self.sidebar.collapsed;
        }
        if self.sidebar.visible() {
            self.focus = Focus::Sidebar;
        } else {
            self.focus = Focus::Content;
        }
    }

    fn show_sidebar(&mut self) {
        if self.sidebar.narrow {
            self.sidebar.overlay_open = true;
        } else {
            self.sidebar.collapsed = false;
        }
    }

    /// Escape: close the overlay and leave the search box
    pub fn close_sidebar(&mut self) {
        if self.sidebar.narrow && self.sidebar.overlay_open {
            self.sidebar.overlay_open = false;
            self.focus = Focus::Content;
        } else if self.focus == Focus::Search {
            self.focus = Focus::Sidebar;
        }
    }

    pub fn handle_resize(&mut self, width: u16) {
        let narrow = width <= self.settings.narrow_width;
        if narrow != self.sidebar.narrow {
            log::debug!("layout is now {}", if narrow { "narrow" } else { "wide" });
        }
        self.sidebar.narrow = narrow;
        if !narrow && self.sidebar.overlay_open {
            self.sidebar.overlay_open = false;
        }
        if !self.sidebar.visible() && self.focus != Focus::Content {
            self.focus = Focus::Content;
        }
        self.view.scroll = self.view.scroll.min(self.view.max_scroll());
    }

    pub fn focus_search(&mut self) {
        self.show_sidebar();
        self.focus = Focus::Search;
    }

    /// Open the item under the navigation cursor
    pub fn activate_selected(&mut self) {
        let Some(id) = self.navigation.selected().map(|item| item.id.clone()) else {
            return;
        };
        self.open_document(&id);
        if self.sidebar.narrow {
            self.sidebar.overlay_open = false;
            self.focus = Focus::Content;
        }
    }

    fn search_input(&mut self, c: Option<char>) {
        let mut query = self.navigation.query().to_string();
        match c {
            Some(ch) => query.push(ch),
            None => {
                query.pop();
            }
        }
        self.navigation.filter(&query);
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let target = (self.view.scroll as i32 + delta).clamp(0, self.view.max_scroll() as i32);
        self.view.scroll = target as u16;
    }

    fn page(&self) -> i32 {
        self.view.viewport_height.saturating_sub(1).max(1) as i32
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if let Some(action) = self.keybindings.global_action(code, modifiers) {
            match action {
                GlobalAction::FocusSearch => self.focus_search(),
                GlobalAction::ToggleTheme => self.toggle_theme(),
                GlobalAction::ToggleAutoTheme => self.toggle_auto_theme(local_hour()),
                GlobalAction::ToggleSidebar => self.toggle_sidebar(),
                GlobalAction::CloseSidebar => self.close_sidebar(),
                GlobalAction::ForceQuit => self.should_quit = true,
            }
            return;
        }

        match self.focus {
            Focus::Search => self.handle_search_key(code, modifiers),
            Focus::Sidebar => self.handle_sidebar_key(code, modifiers),
            Focus::Content => self.handle_content_key(code, modifiers),
        }
    }

    fn handle_search_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char(c)
                if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.search_input(Some(c))
            }
            KeyCode::Backspace => self.search_input(None),
            KeyCode::Up => self.navigation.move_cursor(-1),
            KeyCode::Down => self.navigation.move_cursor(1),
            KeyCode::Enter => self.activate_selected(),
            KeyCode::Tab => self.focus = Focus::Sidebar,
            _ => {}
        }
    }

    fn handle_sidebar_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let Some(action) = self.keybindings.sidebar_action(code, modifiers) else {
            return;
        };
        match action {
            SidebarAction::Quit => self.should_quit = true,
            SidebarAction::MoveUp => self.navigation.move_cursor(-1),
            SidebarAction::MoveDown => self.navigation.move_cursor(1),
            SidebarAction::Open => self.activate_selected(),
            SidebarAction::SwitchFocus => self.focus = Focus::Content,
        }
    }

    fn handle_content_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let Some(action) = self.keybindings.content_action(code, modifiers) else {
            return;
        };
        match action {
            ContentAction::Quit => self.should_quit = true,
            ContentAction::ScrollUp => self.scroll_by(-1),
            ContentAction::ScrollDown => self.scroll_by(1),
            ContentAction::PageUp => self.scroll_by(-self.page()),
            ContentAction::PageDown => self.scroll_by(self.page()),
            ContentAction::Top => self.view.scroll = 0,
            ContentAction::Bottom => self.view.scroll = self.view.max_scroll(),
            ContentAction::SwitchFocus => {
                if self.sidebar.visible() {
                    self.focus = Focus::Sidebar;
                }
            }
        }
    }

    #[cfg(test)]
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, RenderError};
    use crate::services::store::MemoryStore;
    use crate::services::theme_controller::{AUTO_THEME_KEY, THEME_KEY};
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    struct MapFetcher {
        docs: HashMap<String, String>,
    }

    impl Fetcher for MapFetcher {
        fn fetch(&self, id: &str) -> Result<String, FetchError> {
            self.docs.get(id).cloned().ok_or(FetchError::Status(404))
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn fetcher(docs: &[(&str, &str)]) -> Arc<dyn Fetcher> {
        Arc::new(MapFetcher {
            docs: docs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        })
    }

    fn app_with(docs: &[(&str, &str)], state: &[(&str, &str)], width: u16) -> App {
        let mut store = MemoryStore::default();
        for (k, v) in state {
            store.set(k, v).unwrap();
        }
        App::new(Settings::default(), fetcher(docs), Box::new(store), false, width)
    }

    fn wait_loaded(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.is_loading() {
            assert!(Instant::now() < deadline, "document never loaded");
            std::thread::sleep(Duration::from_millis(5));
            app.poll_loading();
        }
    }

    fn ctrl(c: char) -> (KeyCode, KeyModifiers) {
        (KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_start_opens_default_document() {
        let mut app = app_with(&[("welcome.md", "# Hello\n\nbody")], &[], 120);
        app.start(12);
        assert!(app.is_loading());
        wait_loaded(&mut app);

        assert_eq!(app.view.id, "welcome.md");
        assert_eq!(app.view.title, "Hello");
        assert_eq!(app.view.source, Some(DocSource::Fetched));
        assert_eq!(app.navigation.active_id(), Some("welcome.md"));
        assert!(!app.view.lines.is_empty());
    }

    #[test]
    fn test_missing_document_shows_fallback() {
        let mut app = app_with(&[], &[], 120);
        app.open_document("api.md");
        wait_loaded(&mut app);
        assert_eq!(app.view.source, Some(DocSource::Fallback));
        assert!(app.view.text.contains("API"));
    }

    #[test]
    fn test_cached_document_is_immediate() {
        let mut app = app_with(&[("a.md", "# A"), ("b.md", "# B")], &[], 120);
        app.open_document("a.md");
        wait_loaded(&mut app);
        app.open_document("b.md");
        wait_loaded(&mut app);

        app.open_document("a.md");
        assert!(!app.is_loading());
        assert_eq!(app.view.title, "A");
        assert_eq!(app.view.source, Some(DocSource::Cache));
    }

    #[test]
    fn test_only_latest_request_is_displayed() {
        let mut app = app_with(&[("a.md", "# A"), ("b.md", "# B")], &[], 120);
        app.open_document("a.md");
        app.open_document("b.md");
        wait_loaded(&mut app);
        assert_eq!(app.view.id, "b.md");

        // The overtaken request still lands in the cache
        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.superseded.is_empty() {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
            app.poll_loading();
        }
        app.open_document("a.md");
        assert_eq!(app.view.source, Some(DocSource::Cache));
    }

    #[test]
    fn test_theme_shortcut_toggles_and_persists() {
        let mut app = app_with(&[], &[], 120);
        assert_eq!(app.theme_controller.mode(), ThemeMode::Light);

        let (code, mods) = ctrl('d');
        app.handle_key(code, mods);
        assert_eq!(app.theme_controller.mode(), ThemeMode::Dark);
        assert_eq!(app.theme.mode, ThemeMode::Dark);

        app.handle_key(KeyCode::Char('d'), KeyModifiers::SUPER);
        assert_eq!(app.theme_controller.mode(), ThemeMode::Light);
        assert_eq!(
            app.theme_controller.into_store().get(THEME_KEY).as_deref(),
            Some("light")
        );
    }

    #[test]
    fn test_start_applies_auto_rule() {
        let mut app = app_with(&[], &[(AUTO_THEME_KEY, "true"), (THEME_KEY, "light")], 120);
        app.start(21);
        assert_eq!(app.theme.mode, ThemeMode::Dark);
    }

    #[test]
    fn test_focus_gained_reapplies_auto_rule() {
        let mut app = app_with(&[], &[(AUTO_THEME_KEY, "true"), (THEME_KEY, "light")], 120);
        app.start(12);
        assert_eq!(app.theme.mode, ThemeMode::Light);

        app.on_focus_gained(19);
        assert_eq!(app.theme.mode, ThemeMode::Dark);
        app.on_focus_gained(7);
        assert_eq!(app.theme.mode, ThemeMode::Light);
    }

    #[test]
    fn test_tick_reapplies_auto_rule_only_when_enabled() {
        let mut app = app_with(&[], &[(THEME_KEY, "light")], 120);
        app.on_tick(23);
        assert_eq!(app.theme.mode, ThemeMode::Light);

        app.toggle_auto_theme(12);
        app.on_tick(6);
        assert_eq!(app.theme.mode, ThemeMode::Dark);
        assert_eq!(
            app.theme_controller.into_store().get(THEME_KEY).as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn test_toggle_auto_notifies() {
        let mut app = app_with(&[], &[], 120);
        app.toggle_auto_theme(22);
        assert!(app.auto_theme_enabled());
        assert_eq!(app.theme.mode, ThemeMode::Dark);
        let n = app.notification.clone().unwrap();
        assert_eq!(n.message, "Auto theme enabled");
        assert_eq!(n.kind, NotificationKind::Success);

        app.toggle_auto_theme(10);
        assert_eq!(app.notification.as_ref().unwrap().message, "Auto theme disabled");
        assert_eq!(app.theme.mode, ThemeMode::Dark);
    }

    #[test]
    fn test_notification_expires() {
        let mut app = app_with(&[], &[], 120);
        app.show_notification("hi", NotificationKind::Info);
        for _ in 0..NOTIFICATION_TICKS - 1 {
            app.tick_notification();
        }
        assert!(app.notification.is_some());
        app.tick_notification();
        assert!(app.notification.is_none());
    }

    #[test]
    fn test_search_filters_navigation() {
        let mut app = app_with(&[], &[], 120);
        let (code, mods) = ctrl('k');
        app.handle_key(code, mods);
        assert_eq!(app.focus, Focus::Search);

        for c in "API".chars() {
            app.handle_key(KeyCode::Char(c), KeyModifiers::SHIFT);
        }
        assert_eq!(app.navigation.query(), "API");
        assert_eq!(app.navigation.visible_count(), 1);

        app.handle_key(KeyCode::Backspace, KeyModifiers::NONE);
        assert_eq!(app.navigation.query(), "AP");

        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.navigation.active_id(), Some("api.md"));
    }

    #[test]
    fn test_narrow_overlay_behaviour() {
        let mut app = app_with(&[], &[], 80);
        assert!(app.sidebar.narrow);
        assert!(!app.sidebar.visible());

        let (code, mods) = ctrl('k');
        app.handle_key(code, mods);
        assert!(app.sidebar.overlay_open);

        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.sidebar.overlay_open);
        assert_eq!(app.focus, Focus::Content);

        // Activating an item closes the overlay
        app.toggle_sidebar();
        app.navigation.move_cursor(2);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert!(!app.sidebar.overlay_open);
        assert_eq!(app.navigation.active_id(), Some("features.md"));
    }

    #[test]
    fn test_resize_to_wide_closes_overlay() {
        let mut app = app_with(&[], &[], 80);
        app.toggle_sidebar();
        assert!(app.sidebar.overlay_open);

        app.handle_resize(140);
        assert!(!app.sidebar.narrow);
        assert!(!app.sidebar.overlay_open);
        assert!(app.sidebar.visible());
    }

    #[test]
    fn test_wide_sidebar_collapses() {
        let mut app = app_with(&[], &[], 140);
        assert!(app.sidebar.visible());
        app.toggle_sidebar();
        assert!(app.sidebar.collapsed);
        assert!(!app.sidebar.visible());
        assert_eq!(app.focus, Focus::Content);

        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert!(app.sidebar.collapsed);
    }

    #[test]
    fn test_scrolling_is_clamped() {
        let mut app = app_with(&[], &[], 140);
        app.view.total_rows = 50;
        app.view.viewport_height = 20;

        app.handle_key(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(app.view.scroll, 1);
        app.handle_key(KeyCode::End, KeyModifiers::NONE);
        assert_eq!(app.view.scroll, 30);
        app.handle_key(KeyCode::PageDown, KeyModifiers::NONE);
        assert_eq!(app.view.scroll, 30);
        app.handle_key(KeyCode::Home, KeyModifiers::NONE);
        assert_eq!(app.view.scroll, 0);
        app.handle_key(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(app.view.scroll, 0);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app_with(&[], &[], 140);
        app.handle_key(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(app.should_quit);

        let mut app = app_with(&[], &[], 140);
        app.focus_search();
        app.handle_key(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(!app.should_quit);
        assert_eq!(app.navigation.query(), "q");
    }

    struct ExplodingRenderer;

    impl Renderer for ExplodingRenderer {
        fn render(&self, _text: &str, _theme: &Theme) -> Result<Vec<Line<'static>>, RenderError> {
            Err(RenderError::Panicked("boom".to_string()))
        }
    }

    #[test]
    fn test_render_failure_shows_error_and_keeps_state() {
        let mut app = app_with(&[("welcome.md", "# Hi")], &[], 140)
            .with_renderer(Box::new(ExplodingRenderer));
        app.open_document("welcome.md");
        wait_loaded(&mut app);

        assert!(app.view.error.as_deref().is_some_and(|e| e.contains("boom")));
        assert!(app.view.lines.is_empty());
        assert_eq!(app.navigation.active_id(), Some("welcome.md"));

        app.toggle_theme();
        assert_eq!(app.theme_controller.mode(), ThemeMode::Dark);
    }
}
