//! Built-in documents shown when a fetch fails.

const WELCOME: &str = r#"# Welcome to docview

docview is a terminal viewer for Markdown documentation.

## Features

- Rich Markdown rendering
- Light and dark themes
- Automatic theme switching by time of day
- Sidebar with instant search
- Keyboard shortcuts for everything

## Getting around

Pick a document from the sidebar to start reading. Use the search box to
narrow the list down.

## Shortcuts

- `Ctrl/Cmd + K`: focus the search box
- `Ctrl/Cmd + D`: toggle the theme
- `Ctrl + T`: toggle automatic theme switching
- `Ctrl + B`: show or hide the sidebar
- `Esc`: close the sidebar overlay

Enjoy reading!"#;

const GETTING_STARTED: &str = r#"# Getting Started

This guide gets you from zero to browsing your own documentation.

## Requirements

- A terminal with 256 colors (true color recommended)
- A directory of Markdown files, or a web server that serves them

## Serving documents

### 1. Local directory

Put Markdown files under `docs/` and start the viewer from the parent
directory:

```bash
docview --dir .
```

### 2. Web server

Any static file server works:

```bash
python -m http.server 8000
docview --url http://localhost:8000
```

## Adding documents

1. Create a Markdown file under `docs/`
2. Add a navigation entry to `~/.docview/settings.json`
3. Restart the viewer

## Configuration

- `~/.docview/settings.json` - document source, navigation, key bindings
- `~/.docview/state.json` - remembered theme preferences
- `~/.docview/docview.log` - log output (`RUST_LOG=debug` for more)

## Next steps

Read [Features](features.md) to learn what else the viewer can do."#;

const FEATURES: &str = r#"# Features

docview packs the essentials of a documentation site into a terminal.

## Interface

- **Sidebar navigation**: every configured document, one keystroke away
- **Responsive layout**: narrow terminals get an overlay sidebar
- **Status bar**: current key bindings at a glance

## Theme system

- **Light and dark themes**: switch any time
- **Remembered choice**: the theme is saved between sessions
- **Auto theme**: dark from 19:00 to 06:59, light from 07:00 to 18:59
- **Shortcut**: `Ctrl/Cmd + D` toggles the theme

## Documents

- **Markdown rendering**: headings, lists, tables, quotes, code
- **Caching**: each document is fetched once per session
- **Offline fallback**: built-in pages when a document cannot be fetched

## Search

- **Instant filtering**: the navigation list narrows as you type
- **Case-insensitive**: `THEME` and `theme` match the same entries

## Shortcuts

| Shortcut | Action |
|----------|--------|
| `Ctrl/Cmd + K` | Focus search |
| `Ctrl/Cmd + D` | Toggle theme |
| `Ctrl + T` | Toggle auto theme |
| `Esc` | Close sidebar overlay |

## Planned

- [ ] Document versions
- [ ] Full-text search
- [ ] More themes"#;

const API: &str = r#"# API Reference

docview is configured through `~/.docview/settings.json`.

## Document source

Serve documents over HTTP:

```json
{
  "source": { "kind": "http", "base_url": "http://localhost:8000" }
}
```

Or read them from a local directory:

```json
{
  "source": { "kind": "local", "root": "/path/to/site" }
}
```

Documents are requested as `docs/<id>` relative to the source.

## Navigation

```json
{
  "navigation": [
    { "id": "welcome.md", "label": "Welcome" },
    { "id": "api.md", "label": "API Reference" }
  ]
}
```

## Key bindings

Each context takes a map from action to key list. Entries starting with
`//` are comments.

```json
{
  "keybindings": {
    "global": { "toggle_theme": ["ctrl+d", "cmd+d"] }
  }
}
```

## Persisted state

| Key | Values |
|-----|--------|
| `docs-theme` | `light`, `dark` |
| `auto-theme-enabled` | `true`, `false` |"#;

const EXAMPLES: &str = r#"# Examples

Common ways to use docview.

## Browse a project's docs

```bash
cd my-project
docview --dir .
```

## Preview a remote site

```bash
docview --url https://docs.example.com
```

## Render one document for scripting

```bash
docview --render api.md | less
```

## Writing documents

```markdown
# My first document

Some text.

- Item 1
- Item 2
```

> Tip: the first `# Heading` of a document becomes its title.

## Troubleshooting

**Q: A document shows built-in content instead of my file?**
A: The fetch failed. Check that the file exists under `docs/` and look at
`~/.docview/docview.log`.

**Q: Colors look wrong?**
A: Set `COLORTERM=truecolor` if your terminal supports 24-bit color."#;

/// Built-in body registered for a document identifier
pub fn default_content(id: &str) -> Option<&'static str> {
    match id {
        "welcome.md" => Some(WELCOME),
        "getting-started.md" => Some(GETTING_STARTED),
        "features.md" => Some(FEATURES),
        "api.md" => Some(API),
        "examples.md" => Some(EXAMPLES),
        _ => None,
    }
}

/// Templated body for identifiers without a built-in document
pub fn generic_content(id: &str) -> String {
    format!(
        "# {}\n\nThis is the default content for **{}**.\n\nYou can:\n\n\
         1. Create this file under the docs/ directory\n\
         2. Point the navigation entry at another document\n\
         3. Keep enjoying docview!\n\n---\n\n\
         > Tip: this is a built-in template shown because the document could not be fetched.",
        file_title(id),
        id
    )
}

/// Fallback body for any identifier
pub fn fallback_content(id: &str) -> String {
    match default_content(id) {
        Some(body) => body.to_string(),
        None => generic_content(id),
    }
}

/// Title used when a document has no top-level heading
pub fn file_title(id: &str) -> String {
    match id {
        "welcome.md" => "Welcome".to_string(),
        "CoC.md" => "Code of Conduct".to_string(),
        _ => id.replacen(".md", "", 1),
    }
}
