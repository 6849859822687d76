use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::keybindings::{ContentAction, GlobalAction, SidebarAction};
use crate::services::loader::DocSource;
use crate::services::theme_controller::ThemeMode;
use super::{
    app::{App, Focus, NotificationKind},
    theme::Theme,
};

const APP_TITLE: &str = concat!("docview v", env!("CARGO_PKG_VERSION"));
const SIDEBAR_WIDTH: u16 = 30;
const NOTIFICATION_WIDTH: u16 = 32;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let theme = app.theme.clone();
    let area = frame.area();

    if (area.width as u32 * area.height as u32) > 65534 {
        let msg = Paragraph::new("Terminal too large. Please resize smaller.")
            .style(Style::default().fg(theme.palette.highlight).add_modifier(Modifier::BOLD));
        frame.render_widget(msg, Rect::new(0, 0, area.width.min(80), 1));
        return;
    }

    frame.render_widget(Block::default().style(Style::default().bg(theme.palette.bg)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Sidebar + content
            Constraint::Length(1), // Key hints
        ])
        .split(area);

    draw_header(frame, app, chunks[0], &theme);

    let body = chunks[1];
    if app.sidebar.visible() && !app.sidebar.narrow {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(body);
        draw_sidebar(frame, app, columns[0], &theme);
        draw_content(frame, app, columns[1], &theme);
    } else {
        draw_content(frame, app, body, &theme);
        if app.sidebar.visible() {
            // Overlay on top of the document
            let overlay = Rect::new(body.x, body.y, SIDEBAR_WIDTH.min(body.width), body.height);
            frame.render_widget(Clear, overlay);
            draw_sidebar(frame, app, overlay, &theme);
        }
    }

    draw_status_bar(frame, app, chunks[2], &theme);
    draw_notification(frame, app, body, &theme);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let bar = Style::default().bg(theme.header.bg);

    let mut left = vec![
        Span::styled(format!(" {} ", APP_TITLE), bar.fg(theme.header.text)),
        Span::styled(
            app.view.title.clone(),
            bar.fg(theme.header.title).add_modifier(Modifier::BOLD),
        ),
    ];
    if app.is_loading() {
        left.push(Span::styled("  ⟳ Loading…", bar.fg(theme.header.loading)));
    }

    let mode = match theme.mode {
        ThemeMode::Light => "☀ Light",
        ThemeMode::Dark => "☾ Dark",
    };
    let auto = if app.auto_theme_enabled() { "Auto: on" } else { "Auto: off" };
    let right = format!("{}  {} ", mode, auto);

    let used: usize = left.iter().map(|s| s.content.width()).sum::<usize>() + right.width();
    left.push(Span::styled(" ".repeat((area.width as usize).saturating_sub(used)), bar));
    left.push(Span::styled(right, bar.fg(theme.header.text)));

    frame.render_widget(Paragraph::new(Line::from(left)).style(bar), area);
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let focused = matches!(app.focus, Focus::Sidebar | Focus::Search);
    let border_color = if focused { theme.sidebar.border_active } else { theme.sidebar.border };
    let block = Block::default()
        .title(" Documents ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(theme.sidebar.bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 || inner.width == 0 {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Search box
            Constraint::Min(1),    // Items
            Constraint::Length(1), // Result count
        ])
        .split(inner);

    // Search box
    let query = app.navigation.query();
    let search_line = if app.focus == Focus::Search {
        Line::from(vec![
            Span::styled("/ ", Style::default().fg(theme.sidebar.border_active)),
            Span::styled(query.to_string(), Style::default().fg(theme.sidebar.search_text)),
            Span::styled("█", Style::default().fg(theme.sidebar.search_text)),
        ])
    } else if query.is_empty() {
        let hint = format!("/ Search ({})", app.keybindings.global_first_key(GlobalAction::FocusSearch));
        Line::from(Span::styled(hint, Style::default().fg(theme.sidebar.search_placeholder)))
    } else {
        Line::from(vec![
            Span::styled("/ ", Style::default().fg(theme.sidebar.search_placeholder)),
            Span::styled(query.to_string(), Style::default().fg(theme.sidebar.search_text)),
        ])
    };
    frame.render_widget(Paragraph::new(search_line), rows[0]);

    // Items
    let active = app.navigation.active_id();
    let cursor = app.navigation.cursor();
    let width = rows[1].width as usize;
    let lines: Vec<Line> = app
        .navigation
        .items()
        .iter()
        .enumerate()
        .filter(|(_, item)| item.visible)
        .map(|(idx, item)| {
            let marker = if active == Some(item.id.as_str()) { "▸ " } else { "  " };
            let label = format!("{}{}", marker, item.label);
            let padded = format!("{:<width$}", label, width = width);
            let style = if idx == cursor && focused {
                theme.cursor_style()
            } else if active == Some(item.id.as_str()) {
                theme.active_item_style()
            } else {
                Style::default().fg(theme.sidebar.item_text)
            };
            Line::from(Span::styled(padded, style))
        })
        .collect();

    let visible_rows = rows[1].height as usize;
    let cursor_row = app
        .navigation
        .items()
        .iter()
        .take(cursor)
        .filter(|i| i.visible)
        .count();
    let offset = cursor_row.saturating_sub(visible_rows.saturating_sub(1));
    frame.render_widget(Paragraph::new(lines).scroll((offset as u16, 0)), rows[1]);

    // Result count
    if !query.trim().is_empty() {
        let count = app.navigation.visible_count();
        let text = if count == 1 { "1 result".to_string() } else { format!("{} results", count) };
        frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(theme.sidebar.count_text))),
            rows[2],
        );
    }
}

fn draw_content(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    let focused = app.focus == Focus::Content;
    let title = if app.view.title.is_empty() {
        String::new()
    } else {
        format!(" {} ", app.view.title)
    };
    let border_style = if app.view.error.is_some() {
        Style::default().fg(theme.content.error_border)
    } else {
        theme.border_style(focused)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
        .style(Style::default().bg(theme.content.bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width < 2 {
        return;
    }

    if let Some(error) = app.view.error.as_deref() {
        let panel = Paragraph::new(vec![
            Line::from(Span::styled(
                "Could not display this document",
                theme.error_style().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(error.to_string(), theme.error_style())),
        ])
        .wrap(Wrap { trim: false });
        frame.render_widget(panel, inner);
        app.view.total_rows = 0;
        app.view.viewport_height = inner.height;
        return;
    }

    // Leave the last column for the scrollbar
    let text_area = Rect::new(inner.x, inner.y, inner.width - 1, inner.height);
    let mut paragraph = Paragraph::new(app.view.lines.clone())
        .style(theme.normal_style())
        .wrap(Wrap { trim: false });
    if app.is_loading() {
        paragraph = paragraph.style(theme.normal_style().fg(theme.content.loading_text).add_modifier(Modifier::DIM));
    }

    let total = paragraph.line_count(text_area.width).min(u16::MAX as usize) as u16;
    app.view.total_rows = total;
    app.view.viewport_height = text_area.height;
    app.view.scroll = app.view.scroll.min(total.saturating_sub(text_area.height));

    frame.render_widget(paragraph.scroll((app.view.scroll, 0)), text_area);

    if total > text_area.height {
        let mut state = ScrollbarState::new(total.saturating_sub(text_area.height) as usize)
            .position(app.view.scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(theme.dim_style())
                .begin_symbol(None)
                .end_symbol(None),
            inner,
            &mut state,
        );
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let kb = &app.keybindings;
    let hints: [(String, &str); 6] = [
        (kb.global_first_key(GlobalAction::FocusSearch).to_string(), "search"),
        (kb.global_first_key(GlobalAction::ToggleTheme).to_string(), "theme"),
        (kb.global_first_key(GlobalAction::ToggleAutoTheme).to_string(), "auto"),
        (kb.global_first_key(GlobalAction::ToggleSidebar).to_string(), "sidebar"),
        (kb.global_first_key(GlobalAction::CloseSidebar).to_string(), "close"),
        (kb.content_first_key(ContentAction::Quit).to_string(), "quit"),
    ];

    let mut spans = vec![Span::styled(" ", theme.status_bar_style())];
    if app.focus != Focus::Content {
        let open = kb.sidebar_first_key(SidebarAction::Open);
        if !open.is_empty() {
            spans.push(Span::styled(open.to_string(), theme.shortcut_style()));
            spans.push(Span::styled(" open  ", theme.status_bar_style()));
        }
    }
    for (key, label) in hints.iter().filter(|(key, _)| !key.is_empty()) {
        spans.push(Span::styled(key.clone(), theme.shortcut_style()));
        spans.push(Span::styled(format!(" {}  ", label), theme.status_bar_style()));
    }

    let origin = match app.view.source {
        Some(DocSource::Cache) => "cached",
        Some(DocSource::Fetched) => "fetched",
        Some(DocSource::Fallback) => "default content",
        None => "",
    };
    let right = if origin.is_empty() {
        format!("{} ", app.source_label)
    } else {
        format!("{} · {} ", app.source_label, origin)
    };

    let used: usize = spans.iter().map(|s| s.content.width()).sum::<usize>() + right.width();
    if used <= area.width as usize {
        spans.push(Span::styled(
            " ".repeat(area.width as usize - used),
            theme.status_bar_style(),
        ));
        spans.push(Span::styled(right, theme.status_bar_style()));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(theme.status_bar_style()),
        area,
    );
}

fn draw_notification(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let Some(notification) = app.notification.as_ref() else {
        return;
    };
    let width = NOTIFICATION_WIDTH
        .max(notification.message.width() as u16 + 4)
        .min(area.width);
    if width < 4 || area.height < 3 {
        return;
    }
    let rect = Rect::new(area.x + area.width - width, area.y, width, 3);

    let accent = match notification.kind {
        NotificationKind::Success => theme.notification.success,
        NotificationKind::Info => theme.notification.info,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .style(Style::default().bg(theme.notification.bg));
    let text = Paragraph::new(Span::styled(
        notification.message.clone(),
        Style::default().fg(theme.notification.text).add_modifier(Modifier::BOLD),
    ))
    .block(block);

    frame.render_widget(Clear, rect);
    frame.render_widget(text, rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::error::FetchError;
    use crate::services::fetch::Fetcher;
    use crate::services::store::MemoryStore;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;

    struct OneDoc;

    impl Fetcher for OneDoc {
        fn fetch(&self, id: &str) -> Result<String, FetchError> {
            if id == "welcome.md" {
                Ok("# Welcome\n\nHello from the docs.".to_string())
            } else {
                Err(FetchError::Status(404))
            }
        }

        fn describe(&self) -> String {
            "test source".to_string()
        }
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn loaded_app(width: u16) -> App {
        let mut app = App::new(
            Settings::default(),
            Arc::new(OneDoc),
            Box::new(MemoryStore::default()),
            false,
            width,
        );
        app.start(12);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while app.is_loading() {
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(std::time::Duration::from_millis(5));
            app.poll_loading();
        }
        app
    }

    #[test]
    fn test_draw_wide_layout() {
        let mut app = loaded_app(120);
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Documents"));
        assert!(text.contains("Hello from the docs."));
        assert!(text.contains("Light"));
        assert!(text.contains("Auto: off"));
        assert!(text.contains("test source"));
        assert_eq!(app.view.viewport_height, 30 - 2 - 2);
    }

    #[test]
    fn test_draw_search_results_count() {
        let mut app = loaded_app(120);
        app.focus_search();
        app.navigation.filter("ex");
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("1 result"));
    }

    #[test]
    fn test_draw_narrow_hides_sidebar_until_opened() {
        let mut app = loaded_app(60);
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(!screen_text(&terminal).contains("Documents"));

        app.toggle_sidebar();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Documents"));
    }

    #[test]
    fn test_draw_notification_and_error_panel() {
        let mut app = loaded_app(120);
        app.show_notification("Auto theme enabled", NotificationKind::Success);
        app.view.error = Some("Document too large".to_string());
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Auto theme enabled"));
        assert!(text.contains("Could not display this document"));
    }
}
