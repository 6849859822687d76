use ratatui::style::{Color, Modifier, Style};
use supports_color::Stream;

use crate::services::theme_controller::ThemeMode;

// ═══════════════════════════════════════════════════════════════════════════════
// Base palette
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub bg_alt: Color,
    pub fg: Color,
    pub fg_dim: Color,
    pub fg_strong: Color,
    pub fg_inverse: Color,

    pub accent: Color,
    pub shortcut: Color,
    pub positive: Color,
    pub highlight: Color,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Component colors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
pub struct HeaderColors {
    pub bg: Color,
    pub title: Color,
    pub text: Color,
    pub loading: Color,
}

#[derive(Clone, Copy)]
pub struct SidebarColors {
    pub bg: Color,
    pub border: Color,
    pub border_active: Color,
    pub item_text: Color,
    pub cursor_bg: Color,
    pub cursor_text: Color,
    pub active_text: Color,
    pub search_text: Color,
    pub search_placeholder: Color,
    pub count_text: Color,
}

#[derive(Clone, Copy)]
pub struct ContentColors {
    pub bg: Color,
    pub border: Color,
    pub border_active: Color,
    pub text: Color,
    pub heading: Color,
    pub code: Color,
    pub link: Color,
    pub quote: Color,
    pub loading_text: Color,
    pub error_border: Color,
    pub error_text: Color,
}

#[derive(Clone, Copy)]
pub struct StatusBarColors {
    pub bg: Color,
    pub text: Color,
    pub key: Color,
}

#[derive(Clone, Copy)]
pub struct NotificationColors {
    pub bg: Color,
    pub text: Color,
    pub success: Color,
    pub info: Color,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Theme
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct Theme {
    pub mode: ThemeMode,
    pub palette: Palette,
    pub header: HeaderColors,
    pub sidebar: SidebarColors,
    pub content: ContentColors,
    pub status_bar: StatusBarColors,
    pub notification: NotificationColors,
}

impl Default for Theme {
    fn default() -> Self {
        Self::light(false)
    }
}

/// 24-bit color when the terminal has it, the 256-color index otherwise
fn pick(true_color: bool, indexed: u8, rgb: (u8, u8, u8)) -> Color {
    if true_color {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    } else {
        Color::Indexed(indexed)
    }
}

impl Theme {
    /// Check if terminal supports true color (24-bit RGB)
    pub fn supports_true_color() -> bool {
        supports_color::on(Stream::Stdout)
            .map(|support| support.has_16m)
            .unwrap_or(false)
    }

    pub fn for_mode(mode: ThemeMode, true_color: bool) -> Self {
        match mode {
            ThemeMode::Light => Self::light(true_color),
            ThemeMode::Dark => Self::dark(true_color),
        }
    }

    pub fn light(tc: bool) -> Self {
        let palette = Palette {
            bg: pick(tc, 255, (250, 250, 250)),
            bg_alt: pick(tc, 254, (236, 239, 241)),
            fg: pick(tc, 238, (51, 51, 51)),
            fg_dim: pick(tc, 246, (117, 117, 117)),
            fg_strong: pick(tc, 234, (26, 26, 26)),
            fg_inverse: pick(tc, 231, (255, 255, 255)),
            accent: pick(tc, 25, (25, 118, 210)),
            shortcut: pick(tc, 67, (84, 110, 122)),
            positive: pick(tc, 28, (46, 125, 50)),
            highlight: pick(tc, 161, (198, 40, 40)),
        };
        Self::from_palette(ThemeMode::Light, palette, pick(tc, 130, (176, 96, 0)))
    }

    pub fn dark(tc: bool) -> Self {
        let palette = Palette {
            bg: pick(tc, 235, (30, 30, 30)),
            bg_alt: pick(tc, 236, (45, 45, 45)),
            fg: pick(tc, 252, (212, 212, 212)),
            fg_dim: pick(tc, 243, (128, 128, 128)),
            fg_strong: pick(tc, 255, (240, 240, 240)),
            fg_inverse: pick(tc, 234, (26, 26, 26)),
            accent: pick(tc, 75, (100, 181, 246)),
            shortcut: pick(tc, 109, (128, 203, 196)),
            positive: pick(tc, 114, (129, 199, 132)),
            highlight: pick(tc, 210, (239, 154, 154)),
        };
        Self::from_palette(ThemeMode::Dark, palette, pick(tc, 179, (255, 202, 40)))
    }

    fn from_palette(mode: ThemeMode, p: Palette, code: Color) -> Self {
        Self {
            mode,
            palette: p,
            header: HeaderColors {
                bg: p.bg_alt,
                title: p.fg_strong,
                text: p.fg_dim,
                loading: p.accent,
            },
            sidebar: SidebarColors {
                bg: p.bg_alt,
                border: p.fg_dim,
                border_active: p.accent,
                item_text: p.fg,
                cursor_bg: p.accent,
                cursor_text: p.fg_inverse,
                active_text: p.accent,
                search_text: p.fg_strong,
                search_placeholder: p.fg_dim,
                count_text: p.fg_dim,
            },
            content: ContentColors {
                bg: p.bg,
                border: p.fg_dim,
                border_active: p.accent,
                text: p.fg,
                heading: p.accent,
                code,
                link: p.accent,
                quote: p.shortcut,
                loading_text: p.fg_dim,
                error_border: p.highlight,
                error_text: p.highlight,
            },
            status_bar: StatusBarColors {
                bg: p.bg_alt,
                text: p.fg_dim,
                key: p.shortcut,
            },
            notification: NotificationColors {
                bg: p.bg_alt,
                text: p.fg_strong,
                success: p.positive,
                info: p.accent,
            },
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Style helpers
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn normal_style(&self) -> Style {
        Style::default().fg(self.content.text).bg(self.content.bg)
    }

    pub fn dim_style(&self) -> Style {
        Style::default().fg(self.palette.fg_dim)
    }

    pub fn cursor_style(&self) -> Style {
        Style::default()
            .fg(self.sidebar.cursor_text)
            .bg(self.sidebar.cursor_bg)
    }

    pub fn active_item_style(&self) -> Style {
        Style::default()
            .fg(self.sidebar.active_text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, active: bool) -> Style {
        if active {
            Style::default().fg(self.content.border_active)
        } else {
            Style::default().fg(self.content.border)
        }
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.content.error_text)
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar.text)
            .bg(self.status_bar.bg)
    }

    pub fn shortcut_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar.key)
            .bg(self.status_bar.bg)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_mode_matches_mode() {
        assert_eq!(Theme::for_mode(ThemeMode::Dark, false).mode, ThemeMode::Dark);
        assert_eq!(Theme::for_mode(ThemeMode::Light, true).mode, ThemeMode::Light);
    }

    #[test]
    fn test_palette_depth_follows_terminal_support() {
        assert!(matches!(Theme::dark(false).palette.bg, Color::Indexed(_)));
        assert!(matches!(Theme::dark(true).palette.bg, Color::Rgb(..)));
    }

    #[test]
    fn test_light_and_dark_differ() {
        let light = Theme::light(false);
        let dark = Theme::dark(false);
        assert_ne!(light.palette.bg, dark.palette.bg);
        assert_ne!(light.content.text, dark.content.text);
    }
}
