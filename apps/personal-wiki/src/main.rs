//! Personal Wiki - linked markdown notes in the terminal.
//!
//! Features:
//! - Pages created by linking to them with [[links]]
//! - Backlinks and a numbered outline per page
//! - Revision history with restore
//! - Pinned pages and recently visited ordering
//! - JSON backup export and import
//!
//! Usage:
//!   personal-wiki                  open the wiki
//!   personal-wiki export [FILE]    write a backup and exit
//!   personal-wiki import FILE      replace pages and history from a backup

mod app;
mod config;
mod markdown;
mod ui;

use anyhow::{bail, Context, Result};
use app::App;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::File, io, path::PathBuf, sync::Mutex, time::Duration};
use tracing_subscriber::EnvFilter;
use wiki_engine::{backup_file_name, BlobStore, Engine, SqliteStore};

fn main() -> Result<()> {
    let config = Config::load();
    init_logging()?;
    if Config::config_path().is_some_and(|path| !path.exists()) {
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "could not write default config");
        }
    }

    let db_path = Config::db_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    let mut engine = Engine::open(store, config.engine.clone())?;
    tracing::info!(
        db = %db_path.display(),
        "personal-wiki v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => {}
        Some("export") => {
            let path = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(backup_file_name(chrono::Utc::now())));
            std::fs::write(&path, engine.export_json()?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
            return Ok(());
        }
        Some("import") => {
            let Some(path) = args.get(1) else {
                bail!("usage: personal-wiki import FILE");
            };
            let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            let pages = engine.import_json(&raw)?;
            println!("Imported {} pages from {}", pages, path);
            return Ok(());
        }
        Some(other) => bail!("unknown command `{}` (expected `export` or `import`)", other),
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(engine, config);
    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

/// Log to a file in the data directory; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let path = Config::log_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PERSONAL_WIKI_LOG")
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: BlobStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.can_quit() && key.code == crossterm::event::KeyCode::Char('q') {
                    return Ok(());
                }
                app.handle_key(key);
            }
        }
    }
}
