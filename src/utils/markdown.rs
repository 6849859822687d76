use std::panic::{self, AssertUnwindSafe};

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthStr;

use crate::error::RenderError;
use crate::ui::theme::Theme;

/// Turns raw document text into styled terminal lines
pub trait Renderer {
    fn render(&self, text: &str, theme: &Theme) -> Result<Vec<Line<'static>>, RenderError>;
}

/// Colors the Markdown renderer draws with
#[derive(Clone, Copy)]
pub struct MarkdownTheme {
    pub text: Color,
    pub dim: Color,
    pub heading: Color,
    pub code: Color,
    pub link: Color,
    pub quote: Color,
    pub success: Color,
}

impl MarkdownTheme {
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            text: theme.content.text,
            dim: theme.palette.fg_dim,
            heading: theme.content.heading,
            code: theme.content.code,
            link: theme.content.link,
            quote: theme.content.quote,
            success: theme.palette.positive,
        }
    }
}

/// Markdown renderer with a size cap
pub struct MarkdownRenderer {
    max_bytes: usize,
}

impl MarkdownRenderer {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, text: &str, theme: &Theme) -> Result<Vec<Line<'static>>, RenderError> {
        if text.len() > self.max_bytes {
            return Err(RenderError::TooLarge {
                size: text.len(),
                max: self.max_bytes,
            });
        }

        let colors = MarkdownTheme::from_theme(theme);
        panic::catch_unwind(AssertUnwindSafe(|| render_markdown(text, colors)))
            .map_err(|payload| RenderError::Panicked(panic_message(payload.as_ref())))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// True when every span holds only whitespace (Unicode aware)
pub fn is_line_empty(line: &Line) -> bool {
    line.spans
        .iter()
        .all(|span| span.content.chars().all(|c| c.is_whitespace()))
}

/// Plain text of a rendered line
pub fn line_text(line: &Line) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

enum Block<'a> {
    Fence(&'a str),
    TableRow,
    Heading(usize, &'a str),
    Rule,
    Quote(usize, &'a str),
    Task(usize, bool, &'a str),
    Bullet(usize, &'a str),
    Numbered(usize, &'a str, &'a str),
    Blank,
    Text(&'a str),
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 2 && t.starts_with('|') && t.ends_with('|')
}

/// Leading spaces as nesting depth, two spaces per level
fn split_indent(line: &str) -> (usize, &str) {
    let rest = line.trim_start_matches(' ');
    ((line.len() - rest.len()) / 2, rest)
}

fn classify(line: &str) -> Block<'_> {
    let trimmed = line.trim();
    if let Some(lang) = trimmed.strip_prefix("```") {
        return Block::Fence(lang.trim());
    }
    if trimmed.is_empty() {
        return Block::Blank;
    }
    if is_table_row(line) {
        return Block::TableRow;
    }

    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=4).contains(&hashes) {
        if let Some(content) = line[hashes..].strip_prefix(' ') {
            return Block::Heading(hashes, content.trim());
        }
    }

    if trimmed.len() >= 3
        && trimmed.chars().all(|c| c == '-' || c == '*' || c == '_')
    {
        return Block::Rule;
    }

    if line.starts_with('>') {
        let depth = line.chars().take_while(|&c| c == '>' || c == ' ').filter(|&c| c == '>').count();
        let content = line.trim_start_matches(|c| c == '>' || c == ' ');
        return Block::Quote(depth, content);
    }

    let (depth, rest) = split_indent(line);
    for marker in ["- ", "* ", "+ "] {
        if let Some(item) = rest.strip_prefix(marker) {
            if let Some(done) = item.strip_prefix("[ ] ") {
                return Block::Task(depth, false, done);
            }
            if let Some(done) = item.strip_prefix("[x] ").or_else(|| item.strip_prefix("[X] ")) {
                return Block::Task(depth, true, done);
            }
            return Block::Bullet(depth, item);
        }
    }

    if let Some((number, item)) = rest.split_once(". ") {
        if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
            return Block::Numbered(depth, number, item);
        }
    }

    Block::Text(line)
}

struct MarkdownWriter {
    colors: MarkdownTheme,
    lines: Vec<Line<'static>>,
}

impl MarkdownWriter {
    fn push(&mut self, line: Line<'static>) {
        // At most one blank line in a row
        if is_line_empty(&line) && self.lines.last().is_some_and(is_line_empty) {
            return;
        }
        self.lines.push(line);
    }

    fn prefixed(&mut self, prefix: String, prefix_style: Style, body: Vec<Span<'static>>) {
        let mut spans = vec![Span::styled(prefix, prefix_style)];
        spans.extend(body);
        self.push(Line::from(spans));
    }

    fn code_line(&mut self, code: &str) {
        self.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(code.to_string(), Style::default().fg(self.colors.code)),
        ]));
    }

    fn heading(&mut self, level: usize, content: &str) {
        let c = self.colors;
        let style = match level {
            1 => Style::default().fg(c.heading).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            2 => Style::default().fg(c.heading).add_modifier(Modifier::BOLD),
            3 => Style::default().fg(c.text).add_modifier(Modifier::BOLD),
            _ => Style::default().fg(c.dim).add_modifier(Modifier::ITALIC),
        };
        self.push(Line::from(Span::styled(
            format!("{}{}", " ".repeat(level), content),
            style,
        )));
    }

    fn table(&mut self, rows: &[&str]) {
        let c = self.colors;
        let border = Style::default().fg(c.dim);
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                row.trim()
                    .trim_matches('|')
                    .split('|')
                    .map(|cell| cell.trim().to_string())
                    .collect()
            })
            .collect();

        let is_separator = |row: &Vec<String>| {
            row.iter().all(|cell| {
                cell.contains('-') && cell.chars().all(|ch| ch == '-' || ch == ':' || ch == ' ')
            })
        };
        let separator = cells.iter().position(is_separator);

        let columns = cells.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for (idx, row) in cells.iter().enumerate() {
            if Some(idx) == separator {
                continue;
            }
            for (col, cell) in row.iter().enumerate() {
                widths[col] = widths[col].max(UnicodeWidthStr::width(cell.as_str()));
            }
        }

        let rule = |left: &str, mid: &str, right: &str| {
            let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            Line::from(Span::styled(format!("{}{}{}", left, inner.join(mid), right), border))
        };

        self.push(rule("┌", "┬", "┐"));
        for (idx, row) in cells.iter().enumerate() {
            if Some(idx) == separator {
                self.push(rule("├", "┼", "┤"));
                continue;
            }
            let header = separator.is_some_and(|sep| idx < sep);
            let style = if header {
                Style::default().fg(c.heading).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(c.text)
            };

            let mut spans = vec![Span::styled("│", border)];
            for (col, width) in widths.iter().enumerate() {
                let cell = row.get(col).map(|s| s.as_str()).unwrap_or("");
                let pad = width.saturating_sub(UnicodeWidthStr::width(cell));
                spans.push(Span::styled(format!(" {}{} ", cell, " ".repeat(pad)), style));
                spans.push(Span::styled("│", border));
            }
            self.push(Line::from(spans));
        }
        self.push(rule("└", "┴", "┘"));
    }
}

/// Parse Markdown text into styled lines
pub fn render_markdown(text: &str, colors: MarkdownTheme) -> Vec<Line<'static>> {
    let mut out = MarkdownWriter {
        colors,
        lines: Vec::new(),
    };
    let source: Vec<&str> = text.lines().collect();
    let text_style = Style::default().fg(colors.text);
    let mut in_fence = false;
    let mut i = 0;

    while i < source.len() {
        let line = source[i];
        i += 1;

        if in_fence {
            if line.trim().starts_with("```") {
                in_fence = false;
            } else {
                out.code_line(line);
            }
            continue;
        }

        match classify(line) {
            Block::Fence(lang) => {
                in_fence = true;
                if !lang.is_empty() {
                    out.push(Line::from(Span::styled(
                        format!("  [{}]", lang),
                        Style::default().fg(colors.dim),
                    )));
                }
            }
            Block::TableRow => {
                let start = i - 1;
                while i < source.len() && is_table_row(source[i]) {
                    i += 1;
                }
                out.table(&source[start..i]);
            }
            Block::Heading(level, content) => out.heading(level, content),
            Block::Rule => out.push(Line::from(Span::styled(
                "─".repeat(40),
                Style::default().fg(colors.dim),
            ))),
            Block::Quote(depth, content) => {
                let body = inline_spans(content, &colors)
                    .into_iter()
                    .map(|mut s| {
                        s.style = s.style.add_modifier(Modifier::ITALIC);
                        s
                    })
                    .collect();
                out.prefixed("│ ".repeat(depth), Style::default().fg(colors.quote), body);
            }
            Block::Task(depth, done, content) => {
                let mut body = inline_spans(content, &colors);
                let (mark, mark_color) = if done {
                    for span in &mut body {
                        span.style = span.style.add_modifier(Modifier::CROSSED_OUT);
                    }
                    ("☑ ", colors.success)
                } else {
                    ("☐ ", colors.dim)
                };
                out.prefixed(
                    format!("{}  {}", "  ".repeat(depth), mark),
                    Style::default().fg(mark_color),
                    body,
                );
            }
            Block::Bullet(depth, content) => {
                let bullet = match depth {
                    0 => "•",
                    1 => "◦",
                    _ => "▪",
                };
                out.prefixed(
                    format!("{}  {} ", "  ".repeat(depth), bullet),
                    text_style,
                    inline_spans(content, &colors),
                );
            }
            Block::Numbered(depth, number, content) => out.prefixed(
                format!("{}  {}. ", "  ".repeat(depth), number),
                text_style,
                inline_spans(content, &colors),
            ),
            Block::Blank => out.push(Line::from("")),
            Block::Text(content) => out.push(Line::from(inline_spans(content, &colors))),
        }
    }

    out.lines
}

/// Position of `marker` at or after `from`
fn find_marker(chars: &[char], from: usize, marker: &[char]) -> Option<usize> {
    if marker.is_empty() || chars.len() < marker.len() {
        return None;
    }
    (from..=chars.len() - marker.len()).find(|&i| chars[i..i + marker.len()] == *marker)
}

/// Forward search for one marker that remembers its last answer.
/// Queries from a non-decreasing position reuse it, so a line full of
/// unclosed markers is scanned once instead of once per marker.
struct MarkerScan<'a> {
    chars: &'a [char],
    marker: &'a [char],
    last: Option<(usize, Option<usize>)>,
}

impl<'a> MarkerScan<'a> {
    fn new(chars: &'a [char], marker: &'a [char]) -> Self {
        Self { chars, marker, last: None }
    }

    fn find(&mut self, from: usize) -> Option<usize> {
        if let Some((searched, found)) = self.last {
            if from >= searched && found.map_or(true, |p| p >= from) {
                return found;
            }
        }
        let found = find_marker(self.chars, from, self.marker);
        self.last = Some((from, found));
        found
    }
}

/// `[text](url)` starting at `start`; returns text, url and the index after `)`
fn parse_link(
    chars: &[char],
    start: usize,
    brackets: &mut MarkerScan,
    parens: &mut MarkerScan,
) -> Option<(String, String, usize)> {
    let close = brackets.find(start + 1)?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let paren = parens.find(close + 2)?;
    Some((
        chars[start + 1..close].iter().collect(),
        chars[close + 2..paren].iter().collect(),
        paren + 1,
    ))
}

/// Bold, italic, code, strikethrough and links within one line
fn inline_spans(text: &str, colors: &MarkdownTheme) -> Vec<Span<'static>> {
    let base = Style::default().fg(colors.text);
    let delimited: [(&[char], Style); 6] = [
        (&['*', '*', '*'], base.add_modifier(Modifier::BOLD | Modifier::ITALIC)),
        (&['*', '*'], base.add_modifier(Modifier::BOLD)),
        (&['~', '~'], Style::default().fg(colors.dim).add_modifier(Modifier::CROSSED_OUT)),
        (&['`'], Style::default().fg(colors.code)),
        (&['*'], base.add_modifier(Modifier::ITALIC)),
        (&['_'], base.add_modifier(Modifier::ITALIC)),
    ];

    let chars: Vec<char> = text.chars().collect();
    let mut scans: Vec<MarkerScan> = delimited.iter().map(|(m, _)| MarkerScan::new(&chars, m)).collect();
    let mut brackets = MarkerScan::new(&chars, &[']']);
    let mut parens = MarkerScan::new(&chars, &[')']);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut pos = 0;

    'outer: while pos < chars.len() {
        for ((marker, style), scan) in delimited.iter().zip(scans.iter_mut()) {
            if chars[pos..].starts_with(marker) {
                let inner = pos + marker.len();
                if let Some(end) = scan.find(inner) {
                    if end > inner {
                        spans.push(Span::styled(chars[inner..end].iter().collect::<String>(), *style));
                        pos = end + marker.len();
                        continue 'outer;
                    }
                }
            }
        }

        if chars[pos] == '[' {
            if let Some((label, url, next)) = parse_link(&chars, pos, &mut brackets, &mut parens) {
                spans.push(Span::styled(
                    label,
                    Style::default().fg(colors.link).add_modifier(Modifier::UNDERLINED),
                ));
                spans.push(Span::styled(format!(" ({})", url), Style::default().fg(colors.dim)));
                pos = next;
                continue;
            }
        }

        spans.push(Span::styled(chars[pos].to_string(), base));
        pos += 1;
    }

    merge_spans(spans)
}

/// Join neighbouring spans that share a style
fn merge_spans(spans: Vec<Span<'static>>) -> Vec<Span<'static>> {
    let mut merged: Vec<Span<'static>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.style == span.style => {
                last.content.to_mut().push_str(&span.content);
            }
            _ => merged.push(span),
        }
    }
    merged
}
