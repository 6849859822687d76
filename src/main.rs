mod config;
mod error;
mod keybindings;
mod services;
mod ui;
mod utils;

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyEventKind, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::{DocumentSource, Settings};
use crate::services::fetch::{Fetcher, HttpFetcher, LocalFetcher};
use crate::services::loader::DocumentLoader;
use crate::services::store::{JsonFileStore, KeyValueStore, MemoryStore};
use crate::services::theme_controller::{local_hour, ThemeController};
use crate::services::ticker::Ticker;
use crate::ui::app::App;
use crate::ui::theme::Theme;
use crate::utils::markdown::{line_text, MarkdownRenderer, Renderer};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("docview {} - Terminal documentation viewer", VERSION);
    println!();
    println!("USAGE:");
    println!("    docview [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help              Print help information");
    println!("    -v, --version           Print version information");
    println!("    --url <BASE>            Fetch documents from <BASE>/docs/<id>");
    println!("    --dir <ROOT>            Read documents from <ROOT>/docs/<id>");
    println!("    --render <ID>           Render one document to stdout and exit");
    println!();
    println!("Settings are read from ~/.docview/settings.json");
}

fn print_version() {
    println!("docview {}", VERSION);
}

/// Send log output to ~/.docview/docview.log; the terminal belongs to the UI
fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let file = Settings::log_path().and_then(|path| {
        OpenOptions::new().create(true).append(true).open(path).ok()
    });
    match file {
        Some(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            // No log file, stay quiet rather than draw over the UI
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    let _ = builder.try_init();
}

fn build_fetcher(settings: &Settings) -> io::Result<Arc<dyn Fetcher>> {
    match &settings.source {
        DocumentSource::Http { base_url } => {
            let timeout = Duration::from_secs(settings.request_timeout_secs);
            let fetcher = HttpFetcher::new(base_url, timeout).map_err(io::Error::other)?;
            Ok(Arc::new(fetcher))
        }
        DocumentSource::Local { root } => Ok(Arc::new(LocalFetcher::new(root))),
    }
}

fn open_store() -> Box<dyn KeyValueStore> {
    match JsonFileStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("theme state will not persist: {}", e);
            Box::new(MemoryStore::default())
        }
    }
}

/// Ask the terminal to report unambiguous key events so Cmd (SUPER)
/// shortcuts arrive. Returns whether the flags were pushed.
fn push_keyboard_enhancement<W: Write>(out: &mut W, supported: bool) -> io::Result<bool> {
    if !supported {
        return Ok(false);
    }
    queue!(
        out,
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
    )?;
    out.flush()?;
    Ok(true)
}

/// Print one document as plain text, without the TUI
fn render_to_stdout(settings: &Settings, id: &str) -> io::Result<()> {
    let mut loader = DocumentLoader::new(build_fetcher(settings)?);
    let doc = loader.load(id);

    let mode = ThemeController::load(open_store()).mode();
    let theme = Theme::for_mode(mode, false);
    let renderer = MarkdownRenderer::new(settings.max_document_bytes);
    match renderer.render(&doc.text, &theme) {
        Ok(lines) => {
            for line in &lines {
                println!("{}", line_text(line));
            }
            Ok(())
        }
        Err(e) => Err(io::Error::other(e)),
    }
}

fn main() -> io::Result<()> {
    Settings::ensure_config_exists();
    init_logging();

    let mut settings = Settings::load();
    let mut render_id: Option<String> = None;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            "-v" | "--version" => {
                print_version();
                return Ok(());
            }
            "--url" | "--dir" | "--render" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires an argument", args[i]);
                    eprintln!("Use --help for usage information");
                    return Ok(());
                };
                match args[i].as_str() {
                    "--url" => settings.source = DocumentSource::Http { base_url: value.clone() },
                    "--dir" => settings.source = DocumentSource::Local { root: value.clone() },
                    _ => render_id = Some(value.clone()),
                }
                i += 2;
            }
            other => {
                eprintln!("Unknown option: {}", other);
                eprintln!("Use --help for usage information");
                return Ok(());
            }
        }
    }

    if let Some(id) = render_id {
        return render_to_stdout(&settings, &id);
    }

    log::info!("docview {} starting", VERSION);
    let fetcher = build_fetcher(&settings)?;
    let interval = Duration::from_secs(settings.auto_theme_interval_secs.max(1));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    let enhanced = push_keyboard_enhancement(&mut stdout, enhanced)?;
    if !enhanced {
        log::info!("keyboard enhancement unavailable, Cmd shortcuts are not reported");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let width = terminal.size().map(|s| s.width).unwrap_or(80);
    let mut app = App::new(settings, fetcher, open_store(), Theme::supports_true_color(), width);
    app.start(local_hour());

    let mut ticker = Ticker::spawn(interval);
    let result = run_app(&mut terminal, &mut app, &ticker);
    ticker.cancel();

    // Restore terminal
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;

    if let Err(err) = result {
        log::error!("terminated with error: {}", err);
        eprintln!("Error: {}", err);
    }
    log::info!("docview exiting");

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    ticker: &Ticker,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui::draw::draw(f, app))?;

        app.poll_loading();
        if ticker.poll() {
            app.on_tick(local_hour());
        }
        app.tick_notification();

        // Faster polling while a document is loading
        let poll_timeout = if app.is_loading() {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(100)
        };

        if event::poll(poll_timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key.code, key.modifiers);
                }
                Event::FocusGained => app.on_focus_gained(local_hour()),
                Event::Resize(width, _) => app.handle_resize(width),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_enhancement_pushed_when_supported() {
        let mut out: Vec<u8> = Vec::new();
        assert!(push_keyboard_enhancement(&mut out, true).unwrap());
        assert_eq!(out, b"\x1b[>1u");
    }

    #[test]
    fn test_keyboard_enhancement_skipped_when_unsupported() {
        let mut out: Vec<u8> = Vec::new();
        assert!(!push_keyboard_enhancement(&mut out, false).unwrap());
        assert!(out.is_empty());
    }
}
