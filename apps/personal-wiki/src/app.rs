//! Application state and logic.

use crate::config::Config;
use crate::markdown::{self, Rendered};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use wiki_engine::{
    backup_file_name, BlobStore, Engine, EngineResult, Mode, SortMode, WikiEvent,
};

pub struct App<S: BlobStore> {
    pub engine: Engine<S>,
    pub config: Config,
    pub sort: SortMode,
    pub side_tab: SideTab,
    pub info_tab: InfoTab,
    pub pane: Pane,
    /// Selection in the sidebar list.
    pub selected_index: usize,
    /// Selection in the page list or revision list shown in the main pane.
    pub list_index: usize,
    /// Selection in the backlinks pane.
    pub backlink_index: usize,
    pub link_index: Option<usize>,
    pub filter: String,
    pub input_buffer: String,
    pub input_mode: InputMode,
    pub editor_content: Vec<String>,
    pub editor_cursor: (usize, usize),
    pub message: Option<String>,
    pub show_help: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideTab {
    AllPages,
    Pinned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTab {
    Outline,
    Backlinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Sidebar,
    Content,
    Backlinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    None,
    Command,
    Filter,
    Export,
    Import,
}

impl<S: BlobStore> App<S> {
    pub fn new(engine: Engine<S>, config: Config) -> Self {
        let info_tab = if config.display.show_outline || !config.display.show_backlinks {
            InfoTab::Outline
        } else {
            InfoTab::Backlinks
        };
        let mut app = Self {
            engine,
            sort: config.display.sort,
            config,
            side_tab: SideTab::AllPages,
            info_tab,
            pane: Pane::Content,
            selected_index: 0,
            list_index: 0,
            backlink_index: 0,
            link_index: None,
            filter: String::new(),
            input_buffer: String::new(),
            input_mode: InputMode::None,
            editor_content: Vec::new(),
            editor_cursor: (0, 0),
            message: None,
            show_help: false,
        };
        app.sync_editor();
        app
    }

    pub fn can_quit(&self) -> bool {
        self.engine.mode() != Mode::Edit && self.input_mode == InputMode::None
    }

    /// Names shown in the sidebar.
    pub fn sidebar_names(&self) -> Vec<String> {
        match self.side_tab {
            SideTab::AllPages => self.engine.filter_pages(self.sort, &self.filter),
            SideTab::Pinned => self
                .engine
                .visible_pins()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// The current page rendered for the main pane.
    pub fn rendered(&self) -> Rendered {
        let markdown = self.engine.display_markdown().unwrap_or_default();
        markdown::render(&markdown, self.link_index)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        if self.show_help {
            self.show_help = false;
            return;
        }

        if self.input_mode != InputMode::None {
            self.handle_input_key(key);
            return;
        }

        let result = match self.engine.mode() {
            Mode::Edit => self.handle_editor_key(key),
            Mode::View => self.handle_view_key(key),
            Mode::List => self.handle_list_key(key),
            Mode::HistoryList => self.handle_history_key(key),
            Mode::HistoryDetail => self.handle_revision_key(key),
        };
        self.after_operation(result);
    }

    /// Keys available in every non-editing mode. Returns whether the key was
    /// consumed.
    fn handle_common_key(&mut self, key: KeyEvent) -> EngineResult<bool> {
        match key.code {
            KeyCode::Char(':') => self.open_input(InputMode::Command),
            KeyCode::Char('a') => self.engine.list_all()?,
            KeyCode::Char('x') => {
                self.open_input(InputMode::Export);
                self.input_buffer = backup_file_name(chrono::Utc::now());
            }
            KeyCode::Char('i') => self.open_input(InputMode::Import),
            KeyCode::Char('R') => self.engine.rebuild_index()?,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Esc => {
                self.engine.escape()?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn handle_view_key(&mut self, key: KeyEvent) -> EngineResult<()> {
        if self.pane == Pane::Sidebar && self.handle_sidebar_key(key)? {
            return Ok(());
        }
        if self.pane == Pane::Backlinks && self.handle_backlinks_key(key)? {
            return Ok(());
        }
        if self.handle_common_key(key)? {
            return Ok(());
        }
        match key.code {
            KeyCode::Tab => self.pane = Pane::Sidebar,
            KeyCode::Char('e') => {
                self.engine.edit()?;
            }
            KeyCode::Char('h') => {
                self.engine.view_history(None)?;
            }
            KeyCode::Char('p') => {
                self.engine.toggle_current_pin()?;
            }
            KeyCode::Char('o') => {
                self.info_tab = match self.info_tab {
                    InfoTab::Outline => InfoTab::Backlinks,
                    InfoTab::Backlinks => InfoTab::Outline,
                };
            }
            KeyCode::Char('n') | KeyCode::Char('j') | KeyCode::Down => self.cycle_link(1),
            KeyCode::Char('N') | KeyCode::Char('k') | KeyCode::Up => self.cycle_link(-1),
            KeyCode::Enter => self.follow_selected_link()?,
            _ => {}
        }
        Ok(())
    }

    /// Returns whether the key was consumed by the sidebar.
    fn handle_sidebar_key(&mut self, key: KeyEvent) -> EngineResult<bool> {
        let names = self.sidebar_names();
        match key.code {
            KeyCode::Tab if self.config.display.show_backlinks => {
                self.pane = Pane::Backlinks;
                self.info_tab = InfoTab::Backlinks;
                self.backlink_index = 0;
            }
            KeyCode::Tab => self.pane = Pane::Content,
            KeyCode::Char('j') | KeyCode::Down => {
                self.selected_index = step(self.selected_index, 1, names.len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_index = step(self.selected_index, -1, names.len());
            }
            KeyCode::Char('g') => self.selected_index = 0,
            KeyCode::Char('G') => self.selected_index = names.len().saturating_sub(1),
            KeyCode::Char('1') => self.switch_side_tab(SideTab::AllPages),
            KeyCode::Char('2') => self.switch_side_tab(SideTab::Pinned),
            KeyCode::Char('s') => {
                self.sort = self.sort.toggle();
                self.selected_index = 0;
            }
            KeyCode::Char('/') => self.open_input(InputMode::Filter),
            KeyCode::Char('J') => self.move_pin(1)?,
            KeyCode::Char('K') => self.move_pin(-1)?,
            KeyCode::Char('p') => {
                if let Some(name) = names.get(self.selected_index) {
                    self.engine.toggle_pin(name)?;
                }
            }
            KeyCode::Enter => {
                if let Some(name) = names.get(self.selected_index) {
                    self.engine.navigate(name)?;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Returns whether the key was consumed by the backlinks pane.
    fn handle_backlinks_key(&mut self, key: KeyEvent) -> EngineResult<bool> {
        let backlinks = self.engine.backlinks();
        match key.code {
            KeyCode::Tab => self.pane = Pane::Content,
            KeyCode::Char('j') | KeyCode::Down => {
                self.backlink_index = step(self.backlink_index, 1, backlinks.len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.backlink_index = step(self.backlink_index, -1, backlinks.len());
            }
            KeyCode::Enter => {
                if let Some(name) = backlinks.get(self.backlink_index) {
                    self.engine.navigate(name)?;
                    self.pane = Pane::Content;
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn handle_list_key(&mut self, key: KeyEvent) -> EngineResult<()> {
        if self.handle_common_key(key)? {
            return Ok(());
        }
        let names = self.engine.page_names(self.sort);
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.list_index = step(self.list_index, 1, names.len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.list_index = step(self.list_index, -1, names.len());
            }
            KeyCode::Char('s') => self.sort = self.sort.toggle(),
            KeyCode::Enter => {
                if let Some(name) = names.get(self.list_index) {
                    self.engine.navigate(name)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_history_key(&mut self, key: KeyEvent) -> EngineResult<()> {
        if self.handle_common_key(key)? {
            return Ok(());
        }
        let indices: Vec<usize> = self
            .engine
            .history_versions()
            .iter()
            .map(|version| version.original_index)
            .collect();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.list_index = step(self.list_index, 1, indices.len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.list_index = step(self.list_index, -1, indices.len());
            }
            KeyCode::Enter => {
                if let Some(&index) = indices.get(self.list_index) {
                    self.engine.open_version(index)?;
                }
            }
            KeyCode::Char('b') | KeyCode::Backspace => {
                self.engine.back()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_revision_key(&mut self, key: KeyEvent) -> EngineResult<()> {
        if self.handle_common_key(key)? {
            return Ok(());
        }
        match key.code {
            KeyCode::Char('r') => {
                self.engine.restore_open_version()?;
            }
            KeyCode::Char('b') | KeyCode::Backspace => {
                self.engine.back()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> EngineResult<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.engine.cancel()?;
                return Ok(());
            }
            KeyCode::Char('s') if ctrl => {
                self.engine.save()?;
                return Ok(());
            }
            KeyCode::Char('h') if ctrl => {
                self.engine.view_history(None)?;
                return Ok(());
            }
            KeyCode::Char('p') if ctrl => {
                self.open_input(InputMode::Command);
                return Ok(());
            }
            KeyCode::Up => {
                if self.editor_cursor.0 > 0 {
                    self.editor_cursor.0 -= 1;
                    self.clamp_cursor();
                }
                return Ok(());
            }
            KeyCode::Down => {
                if self.editor_cursor.0 < self.editor_content.len().saturating_sub(1) {
                    self.editor_cursor.0 += 1;
                    self.clamp_cursor();
                }
                return Ok(());
            }
            KeyCode::Left => {
                if let Some(line) = self.editor_content.get(self.editor_cursor.0) {
                    self.editor_cursor.1 = prev_boundary(line, self.editor_cursor.1);
                }
                return Ok(());
            }
            KeyCode::Right => {
                if let Some(line) = self.editor_content.get(self.editor_cursor.0) {
                    self.editor_cursor.1 = next_boundary(line, self.editor_cursor.1);
                }
                return Ok(());
            }
            KeyCode::Enter => {
                if let Some(line) = self.editor_content.get_mut(self.editor_cursor.0) {
                    let rest = line.split_off(self.editor_cursor.1);
                    self.editor_content.insert(self.editor_cursor.0 + 1, rest);
                    self.editor_cursor.0 += 1;
                    self.editor_cursor.1 = 0;
                }
            }
            KeyCode::Backspace => {
                if self.editor_cursor.1 > 0 {
                    if let Some(line) = self.editor_content.get_mut(self.editor_cursor.0) {
                        let start = prev_boundary(line, self.editor_cursor.1);
                        line.replace_range(start..self.editor_cursor.1, "");
                        self.editor_cursor.1 = start;
                    }
                } else if self.editor_cursor.0 > 0 {
                    let current = self.editor_content.remove(self.editor_cursor.0);
                    self.editor_cursor.0 -= 1;
                    if let Some(prev) = self.editor_content.get_mut(self.editor_cursor.0) {
                        self.editor_cursor.1 = prev.len();
                        prev.push_str(&current);
                    }
                }
            }
            KeyCode::Char(c) if !ctrl => {
                if self.editor_content.is_empty() {
                    self.editor_content.push(String::new());
                }
                if let Some(line) = self.editor_content.get_mut(self.editor_cursor.0) {
                    line.insert(self.editor_cursor.1, c);
                    self.editor_cursor.1 += c.len_utf8();
                }
            }
            _ => return Ok(()),
        }
        self.engine.set_draft(self.editor_content.join("\n"));
        Ok(())
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                if self.input_mode == InputMode::Filter {
                    self.filter.clear();
                }
                self.input_mode = InputMode::None;
                self.input_buffer.clear();
            }
            KeyCode::Enter => self.finish_input(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
                if self.input_mode == InputMode::Filter {
                    self.apply_filter();
                }
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
                if self.input_mode == InputMode::Filter {
                    self.apply_filter();
                }
            }
            _ => {}
        }
    }

    fn open_input(&mut self, mode: InputMode) {
        self.input_mode = mode;
        self.input_buffer = if mode == InputMode::Filter {
            self.filter.clone()
        } else {
            String::new()
        };
    }

    fn apply_filter(&mut self) {
        self.filter = self.input_buffer.clone();
        self.side_tab = SideTab::AllPages;
        self.selected_index = 0;
    }

    fn finish_input(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        let mode = std::mem::replace(&mut self.input_mode, InputMode::None);
        let result = match mode {
            InputMode::Command => self.engine.run_command(&input).map(|_| ()),
            InputMode::Filter => Ok(()),
            InputMode::Export => {
                self.export_to(Path::new(input.trim()));
                Ok(())
            }
            InputMode::Import => {
                self.import_from(Path::new(input.trim()));
                Ok(())
            }
            InputMode::None => Ok(()),
        };
        self.after_operation(result);
    }

    pub fn export_to(&mut self, path: &Path) {
        let path = if path.as_os_str().is_empty() {
            PathBuf::from(backup_file_name(chrono::Utc::now()))
        } else {
            path.to_path_buf()
        };
        let result = self
            .engine
            .export_json()
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(&path, json).map_err(anyhow::Error::from));
        self.message = Some(match result {
            Ok(()) => {
                info!(path = %path.display(), "exported backup");
                format!("Exported to {}", path.display())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "export failed");
                format!("Export failed: {}", e)
            }
        });
    }

    pub fn import_from(&mut self, path: &Path) {
        let result = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.engine.import_json(&raw).map_err(anyhow::Error::from));
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "import failed");
            self.message = Some(format!("Import failed: {}", e));
        }
    }

    fn switch_side_tab(&mut self, tab: SideTab) {
        self.side_tab = tab;
        self.selected_index = 0;
    }

    /// Move the selected pin by `delta` and persist the new order.
    fn move_pin(&mut self, delta: isize) -> EngineResult<()> {
        if self.side_tab != SideTab::Pinned {
            return Ok(());
        }
        let mut names = self.sidebar_names();
        let from = self.selected_index;
        let Some(to) = from.checked_add_signed(delta).filter(|to| *to < names.len()) else {
            return Ok(());
        };
        names.swap(from, to);
        self.engine.reorder_pins(names)?;
        self.selected_index = to;
        Ok(())
    }

    fn cycle_link(&mut self, delta: isize) {
        let count = self.rendered().links.len();
        if count == 0 {
            self.link_index = None;
            return;
        }
        self.link_index = Some(match self.link_index {
            None if delta >= 0 => 0,
            None => count - 1,
            Some(i) => (i as isize + delta).rem_euclid(count as isize) as usize,
        });
    }

    fn follow_selected_link(&mut self) -> EngineResult<()> {
        let rendered = self.rendered();
        let Some(link) = self.link_index.and_then(|i| rendered.links.get(i)) else {
            return Ok(());
        };
        if !self.engine.follow_link(&link.href)? {
            self.message = Some(format!("External link: {}", link.href));
        }
        Ok(())
    }

    /// Report errors and react to engine events.
    fn after_operation(&mut self, result: EngineResult<()>) {
        if let Err(e) = result {
            warn!(error = %e, "operation failed");
            self.message = Some(e.to_string());
        }
        for event in self.engine.drain_events() {
            match event {
                WikiEvent::ModeChanged { .. } => {
                    self.link_index = None;
                    self.list_index = 0;
                    self.backlink_index = 0;
                    self.sync_editor();
                }
                WikiEvent::PageCreated { name } => {
                    self.message = Some(format!("Created: {}", name));
                }
                WikiEvent::PageSaved { .. } => self.message = Some("Saved".to_string()),
                WikiEvent::PageRestored { name, .. } => {
                    self.message = Some(format!("Restored: {}", name));
                }
                WikiEvent::DraftKept { name } => {
                    self.message = Some(format!("Kept unsaved text of {}", name));
                }
                WikiEvent::PinsChanged => {
                    let count = self.sidebar_names().len();
                    if self.selected_index >= count {
                        self.selected_index = count.saturating_sub(1);
                    }
                }
                WikiEvent::Imported { pages, revisions } => {
                    self.message = Some(format!(
                        "Imported {} pages and {} revisions",
                        pages, revisions
                    ));
                }
                WikiEvent::IndexRebuilt { pages } => {
                    if self.message.is_none() {
                        self.message = Some(format!("Rebuilt link index for {} pages", pages));
                    }
                }
            }
        }
    }

    /// Load the editor buffer from the engine draft.
    fn sync_editor(&mut self) {
        match self.engine.draft() {
            Some(draft) => {
                self.editor_content = draft.split('\n').map(str::to_string).collect();
            }
            None => self.editor_content.clear(),
        }
        self.editor_cursor = (0, 0);
    }

    fn clamp_cursor(&mut self) {
        if let Some(line) = self.editor_content.get(self.editor_cursor.0) {
            let mut col = self.editor_cursor.1.min(line.len());
            while !line.is_char_boundary(col) {
                col -= 1;
            }
            self.editor_cursor.1 = col;
        }
    }
}

fn step(index: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    index.saturating_add_signed(delta).min(len - 1)
}

fn prev_boundary(line: &str, col: usize) -> usize {
    line[..col].char_indices().next_back().map_or(0, |(i, _)| i)
}

fn next_boundary(line: &str, col: usize) -> usize {
    line[col..].chars().next().map_or(col, |c| col + c.len_utf8())
}
