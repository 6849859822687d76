use crate::config::NavEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationItem {
    pub id: String,
    pub label: String,
    pub visible: bool,
}

/// Sidebar entries with search filtering and a cursor over the visible ones
#[derive(Debug)]
pub struct Navigation {
    items: Vec<NavigationItem>,
    query: String,
    cursor: usize,
    active: Option<usize>,
    visible_count: usize,
}

impl Navigation {
    pub fn new(entries: &[NavEntry]) -> Self {
        let items: Vec<NavigationItem> = entries
            .iter()
            .map(|e| NavigationItem {
                id: e.id.clone(),
                label: e.label.clone(),
                visible: true,
            })
            .collect();
        let visible_count = items.len();

        Self {
            items,
            query: String::new(),
            cursor: 0,
            active: None,
            visible_count,
        }
    }

    pub fn items(&self) -> &[NavigationItem] {
        &self.items
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Case-insensitive substring match on labels; an empty query shows everything.
    /// The match count is kept in `visible_count` for the sidebar footer.
    pub fn filter(&mut self, query: &str) -> Vec<&NavigationItem> {
        let term = query.trim().to_lowercase();
        self.query = query.to_string();

        for item in &mut self.items {
            item.visible = term.is_empty() || item.label.to_lowercase().contains(&term);
        }
        self.visible_count = self.items.iter().filter(|i| i.visible).count();
        log::debug!("search \"{}\" found {} results", term, self.visible_count);

        self.clamp_cursor();
        self.items.iter().filter(|i| i.visible).collect()
    }

    /// Keep the cursor on a visible item, preferring the nearest one below
    fn clamp_cursor(&mut self) {
        if self.items.get(self.cursor).is_some_and(|i| i.visible) {
            return;
        }
        let below = (self.cursor..self.items.len()).find(|&i| self.items[i].visible);
        let above = (0..self.cursor.min(self.items.len())).rev().find(|&i| self.items[i].visible);
        if let Some(idx) = below.or(above) {
            self.cursor = idx;
        }
    }

    /// Move the cursor by `delta` visible items
    pub fn move_cursor(&mut self, delta: i32) {
        let visible: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.visible)
            .map(|(i, _)| i)
            .collect();
        if visible.is_empty() {
            return;
        }

        let pos = visible.iter().position(|&i| i == self.cursor).unwrap_or(0) as i64;
        let new_pos = (pos + delta as i64).clamp(0, visible.len() as i64 - 1) as usize;
        self.cursor = visible[new_pos];
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Item under the cursor, if it is visible
    pub fn selected(&self) -> Option<&NavigationItem> {
        self.items.get(self.cursor).filter(|i| i.visible)
    }

    pub fn set_active(&mut self, id: &str) {
        self.active = self.items.iter().position(|i| i.id == id);
        if let Some(idx) = self.active {
            if self.items[idx].visible {
                self.cursor = idx;
            }
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active
            .and_then(|idx| self.items.get(idx))
            .map(|i| i.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav() -> Navigation {
        let entries = [
            ("welcome.md", "Welcome"),
            ("getting-started.md", "Getting Started"),
            ("themes.md", "Themes & Appearance"),
            ("api.md", "API Reference"),
            ("dark-theme.md", "Dark THEME tips"),
        ]
        .iter()
        .map(|(id, label)| NavEntry {
            id: id.to_string(),
            label: label.to_string(),
        })
        .collect::<Vec<_>>();
        Navigation::new(&entries)
    }

    #[test]
    fn test_empty_query_shows_all() {
        let mut nav = nav();
        assert_eq!(nav.filter("").len(), 5);
        assert_eq!(nav.filter("   ").len(), 5);
        assert_eq!(nav.visible_count(), 5);
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let mut nav = nav();
        let ids: Vec<String> = nav.filter("theme").iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["themes.md", "dark-theme.md"]);
        assert_eq!(nav.visible_count(), 2);
        assert!(!nav.items()[0].visible);

        assert_eq!(nav.filter("  API ").len(), 1);
        assert_eq!(nav.filter("zzz").len(), 0);
        assert_eq!(nav.visible_count(), 0);
    }

    #[test]
    fn test_cursor_skips_hidden_items() {
        let mut nav = nav();
        nav.filter("theme");
        assert_eq!(nav.selected().map(|i| i.id.as_str()), Some("themes.md"));
        nav.move_cursor(1);
        assert_eq!(nav.selected().map(|i| i.id.as_str()), Some("dark-theme.md"));
        nav.move_cursor(5);
        assert_eq!(nav.selected().map(|i| i.id.as_str()), Some("dark-theme.md"));
        nav.move_cursor(-3);
        assert_eq!(nav.selected().map(|i| i.id.as_str()), Some("themes.md"));
    }

    #[test]
    fn test_no_selection_when_nothing_matches() {
        let mut nav = nav();
        nav.filter("nothing matches");
        assert!(nav.selected().is_none());
        nav.move_cursor(1);
        assert!(nav.selected().is_none());
    }

    #[test]
    fn test_active_tracked_separately_from_cursor() {
        let mut nav = nav();
        nav.set_active("api.md");
        assert_eq!(nav.active_id(), Some("api.md"));
        assert_eq!(nav.cursor(), 3);
        nav.move_cursor(-2);
        assert_eq!(nav.active_id(), Some("api.md"));

        nav.set_active("not-in-nav.md");
        assert_eq!(nav.active_id(), None);
    }
}
