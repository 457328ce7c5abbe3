//! The engine instance.
//!
//! `Engine` owns every collection and the view cursor. Each public operation
//! runs to completion, updates memory, keeps the link index in step with
//! content and then rewrites the blobs it touched. A failed write is
//! reported to the caller but not rolled back: memory stays ahead of disk
//! until the next successful write of that blob.

use crate::documents::{filter_names, DocumentStore, DocumentsRecord, SortMode};
use crate::error::{EngineError, EngineResult, StorageResult};
use crate::events::{EventQueue, WikiEvent};
use crate::link_index::LinkIndex;
use crate::links::{resolve_href, rewrite_wiki_links};
use crate::outline::{outline, OutlineEntry};
use crate::pins::PinStore;
use crate::recency::RecencyTracker;
use crate::revisions::{Revision, RevisionLog, VersionEntry};
use crate::settings::EngineSettings;
use crate::storage::{BlobKey, BlobStore};
use crate::transfer::{export_bundle, ImportBundle};
use crate::view::{Mode, Trigger, ViewState};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Result of reading one blob at startup.
enum Loaded<T> {
    Absent,
    Corrupt,
    Parsed(T),
}

pub struct Engine<S: BlobStore> {
    store: S,
    settings: EngineSettings,
    documents: DocumentStore,
    view: ViewState,
    draft: Option<String>,
    revisions: RevisionLog,
    recency: RecencyTracker,
    pins: PinStore,
    links: LinkIndex,
    events: EventQueue,
}

impl<S: BlobStore> Engine<S> {
    /// Load every blob from `store`.
    ///
    /// Unreadable blobs are replaced with defaults: pages fall back to a
    /// single home page, the link index is rebuilt from content, the rest
    /// start empty. Only failures of the store itself are errors.
    pub fn open(store: S, settings: EngineSettings) -> EngineResult<Self> {
        let mut dirty = Vec::new();

        let (documents, view) = match load::<_, DocumentsRecord>(&store, BlobKey::Documents)? {
            Loaded::Parsed(record) => record.into_parts(),
            Loaded::Absent => {
                dirty.push(BlobKey::Documents);
                seeded(&settings, settings.welcome_body())
            }
            Loaded::Corrupt => {
                dirty.push(BlobKey::Documents);
                seeded(&settings, settings.recovery_body())
            }
        };

        let revisions = match load::<_, Vec<Revision>>(&store, BlobKey::History)? {
            Loaded::Parsed(entries) => RevisionLog::from_entries(entries),
            Loaded::Absent => RevisionLog::new(),
            Loaded::Corrupt => {
                dirty.push(BlobKey::History);
                RevisionLog::new()
            }
        };

        let recency = match store.get(BlobKey::Visited)? {
            None => RecencyTracker::new(),
            Some(raw) => match RecencyTracker::from_json(&raw, Utc::now().timestamp_millis()) {
                Ok((tracker, migrated)) => {
                    if migrated {
                        info!("migrated legacy visit list");
                        dirty.push(BlobKey::Visited);
                    }
                    tracker
                }
                Err(e) => {
                    warn!(
                        blob = BlobKey::Visited.as_str(),
                        error = %e,
                        "discarding unreadable blob"
                    );
                    dirty.push(BlobKey::Visited);
                    RecencyTracker::new()
                }
            },
        };

        let pins = match load::<_, PinStore>(&store, BlobKey::Pinned)? {
            Loaded::Parsed(pins) => pins,
            Loaded::Absent => PinStore::new(),
            Loaded::Corrupt => {
                dirty.push(BlobKey::Pinned);
                PinStore::new()
            }
        };

        let links = match load::<_, LinkIndex>(&store, BlobKey::Links)? {
            Loaded::Parsed(links) => links,
            Loaded::Absent | Loaded::Corrupt => {
                dirty.push(BlobKey::Links);
                info!(pages = documents.len(), "building link index from content");
                LinkIndex::build(&documents)
            }
        };

        let mut engine = Self {
            store,
            settings,
            documents,
            view,
            draft: None,
            revisions,
            recency,
            pins,
            links,
            events: EventQueue::new(),
        };
        engine.repair_cursor(&mut dirty);
        let dirty: Vec<BlobKey> = BlobKey::ALL
            .into_iter()
            .filter(|key| dirty.contains(key))
            .collect();
        engine.persist(&dirty)?;

        debug!(
            pages = engine.documents.len(),
            revisions = engine.revisions.len(),
            mode = engine.view.mode.label(),
            "engine ready"
        );
        Ok(engine)
    }

    /// Make the loaded cursor point at data that exists.
    fn repair_cursor(&mut self, dirty: &mut Vec<BlobKey>) {
        if self.documents.is_empty() {
            let home = self.settings.home_page.clone();
            let body = self.settings.welcome_body();
            self.links.update_one(&home, &body);
            self.documents.set(&home, body);
            self.view = ViewState::new(home);
            dirty.extend([BlobKey::Documents, BlobKey::Links]);
        }
        if self.view.current.trim().is_empty() {
            self.view.current = self.settings.home_page.clone();
            dirty.push(BlobKey::Documents);
        }
        let current = self.view.current.clone();
        if self.materialize(&current) {
            dirty.extend([BlobKey::Documents, BlobKey::Links]);
        }

        let before = self.view.clone();
        let revisions = &self.revisions;
        self.view.normalize(|index| revisions.get(index).is_some());
        if self.view != before {
            dirty.push(BlobKey::Documents);
        }

        if self.view.mode == Mode::Edit {
            self.draft = Some(self.current_content().to_string());
        }
        self.events.drain_all();
    }

    // State

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn mode(&self) -> Mode {
        self.view.mode
    }

    pub fn revisions(&self) -> &RevisionLog {
        &self.revisions
    }

    pub fn recency(&self) -> &RecencyTracker {
        &self.recency
    }

    pub fn pins(&self) -> &PinStore {
        &self.pins
    }

    pub fn links(&self) -> &LinkIndex {
        &self.links
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Editor buffer, present only in edit mode.
    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn current_page(&self) -> &str {
        &self.view.current
    }

    pub fn current_content(&self) -> &str {
        self.current_content_of(&self.view.current)
    }

    fn current_content_of(&self, name: &str) -> &str {
        self.documents.get(name).unwrap_or_default()
    }

    /// Remove and return pending events.
    pub fn drain_events(&mut self) -> Vec<WikiEvent> {
        self.events.drain_all()
    }

    // Queries

    pub fn backlinks_of(&self, name: &str) -> Vec<String> {
        self.links.backlinks_of(name)
    }

    /// Backlinks of the current page.
    pub fn backlinks(&self) -> Vec<String> {
        self.links.backlinks_of(&self.view.current)
    }

    /// Pages the current page links to.
    pub fn outgoing(&self) -> &[String] {
        self.links.outgoing(&self.view.current)
    }

    pub fn visible_pins(&self) -> Vec<&str> {
        self.pins.visible_pins(&self.documents)
    }

    pub fn is_pinned(&self, name: &str) -> bool {
        self.pins.is_pinned(name)
    }

    pub fn page_names(&self, sort: SortMode) -> Vec<String> {
        match sort {
            SortMode::Alphabetical => self.documents.sorted_names(),
            SortMode::Recent => self.recency.recency_order(&self.documents),
        }
    }

    /// Page names containing `query`, ignoring case, in `sort` order.
    pub fn filter_pages(&self, sort: SortMode, query: &str) -> Vec<String> {
        filter_names(self.page_names(sort), query)
    }

    pub fn search(&self, query: &str) -> Vec<String> {
        self.documents.search(query)
    }

    pub fn wanted_pages(&self) -> Vec<(String, usize)> {
        self.links.wanted_pages(&self.documents)
    }

    pub fn orphans(&self) -> Vec<String> {
        self.links.orphans(&self.documents)
    }

    pub fn versions_for(&self, name: &str) -> Vec<VersionEntry<'_>> {
        self.revisions.versions_for(name)
    }

    /// Revisions of the page whose history is being browsed.
    pub fn history_versions(&self) -> Vec<VersionEntry<'_>> {
        self.revisions.versions_for(self.view.history_target())
    }

    /// The revision open in detail mode, if it still exists.
    pub fn open_revision(&self) -> Option<(usize, &Revision)> {
        if self.view.mode != Mode::HistoryDetail {
            return None;
        }
        let index = self.view.history_index?;
        self.revisions.get(index).map(|revision| (index, revision))
    }

    /// Markdown for the renderer, with wiki references rewritten.
    ///
    /// Shows the draft while editing and the open revision in detail mode.
    pub fn display_markdown(&self) -> Option<String> {
        match self.view.mode {
            Mode::View => Some(rewrite_wiki_links(self.current_content())),
            Mode::Edit => Some(rewrite_wiki_links(
                self.draft.as_deref().unwrap_or_else(|| self.current_content()),
            )),
            Mode::HistoryDetail => self
                .open_revision()
                .map(|(_, revision)| rewrite_wiki_links(&revision.content)),
            Mode::List | Mode::HistoryList => None,
        }
    }

    /// Table of contents of what is being read or edited.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        match self.view.mode {
            Mode::View => outline(self.current_content()),
            Mode::Edit => {
                outline(self.draft.as_deref().unwrap_or_else(|| self.current_content()))
            }
            _ => Vec::new(),
        }
    }

    // Triggers

    /// Show `name`, creating it first if it does not exist.
    pub fn navigate(&mut self, name: &str) -> EngineResult<()> {
        if name.trim().is_empty() {
            return Err(EngineError::EmptyPageName);
        }
        let mut dirty = vec![BlobKey::Documents, BlobKey::Visited];
        if self.materialize(name) {
            dirty.push(BlobKey::Links);
        }
        self.draft = None;
        self.view.show(name);
        self.recency.touch(name);
        self.mode_changed();
        self.persist(&dirty)
    }

    /// Follow a rendered link. External targets are ignored.
    pub fn follow_link(&mut self, href: &str) -> EngineResult<bool> {
        match resolve_href(href, &self.settings.home_page) {
            Some(name) => {
                self.navigate(&name)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Start editing the current page.
    pub fn edit(&mut self) -> EngineResult<bool> {
        if !self.view.allows(Trigger::Edit) {
            return Ok(false);
        }
        self.draft = Some(self.current_content().to_string());
        self.view.enter_edit();
        self.mode_changed();
        self.persist(&[BlobKey::Documents])?;
        Ok(true)
    }

    /// Replace the editor buffer. Ignored outside edit mode.
    pub fn set_draft(&mut self, text: impl Into<String>) -> bool {
        if self.view.mode != Mode::Edit {
            return false;
        }
        self.draft = Some(text.into());
        true
    }

    /// Commit the editor buffer as a new revision.
    pub fn save(&mut self) -> EngineResult<bool> {
        if !self.view.allows(Trigger::Save) {
            return Ok(false);
        }
        let content = self
            .draft
            .take()
            .unwrap_or_else(|| self.current_content().to_string());
        let page = self.view.current.clone();

        self.revisions.append(&page, &content);
        self.links.update_one(&page, &content);
        self.documents.set(&page, content);
        self.view.show_current();

        debug!(page = %page, "saved page");
        self.events.push(WikiEvent::PageSaved { name: page });
        self.mode_changed();
        self.persist(&[BlobKey::Documents, BlobKey::History, BlobKey::Links])?;
        Ok(true)
    }

    /// Leave edit mode, discarding the buffer.
    pub fn cancel(&mut self) -> EngineResult<bool> {
        if !self.view.allows(Trigger::Cancel) {
            return Ok(false);
        }
        self.draft = None;
        self.view.show_current();
        self.mode_changed();
        self.persist(&[BlobKey::Documents])?;
        Ok(true)
    }

    /// Show the list of every page.
    pub fn list_all(&mut self) -> EngineResult<()> {
        self.draft = None;
        self.view.enter_list();
        self.mode_changed();
        self.persist(&[BlobKey::Documents])
    }

    /// Browse the revisions of `page`, or of the current page.
    pub fn view_history(&mut self, page: Option<&str>) -> EngineResult<bool> {
        if !self.view.allows(Trigger::ViewHistory) {
            return Ok(false);
        }
        let page = page
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.view.current.clone());
        self.draft = None;
        self.view.enter_history(&page);
        self.mode_changed();
        self.persist(&[BlobKey::Documents])?;
        Ok(true)
    }

    /// Open the revision at `index` of the global log.
    pub fn open_version(&mut self, index: usize) -> EngineResult<bool> {
        if !self.view.allows(Trigger::OpenVersion) || self.revisions.get(index).is_none() {
            return Ok(false);
        }
        self.view.enter_detail(index);
        self.mode_changed();
        self.persist(&[BlobKey::Documents])?;
        Ok(true)
    }

    /// Make the revision at `index` the current content of its page.
    ///
    /// The restore is itself recorded as a new revision. An evicted index
    /// leaves everything untouched.
    pub fn restore(&mut self, index: usize) -> EngineResult<bool> {
        if !self.view.allows(Trigger::Restore) {
            return Ok(false);
        }
        let Some(revision) = self.revisions.get(index).cloned() else {
            return Ok(false);
        };

        self.documents.set(&revision.page, revision.content.as_str());
        self.revisions.append(&revision.page, &revision.content);
        self.links.update_one(&revision.page, &revision.content);
        self.draft = None;
        self.view.show(&revision.page);

        info!(page = %revision.page, from_index = index, "restored revision");
        self.events.push(WikiEvent::PageRestored {
            name: revision.page,
            from_index: index,
        });
        self.mode_changed();
        self.persist(&[BlobKey::Documents, BlobKey::History, BlobKey::Links])?;
        Ok(true)
    }

    /// Restore the revision currently open in detail mode.
    pub fn restore_open_version(&mut self) -> EngineResult<bool> {
        match self.view.history_index {
            Some(index) => self.restore(index),
            None => Ok(false),
        }
    }

    /// Step back out of history browsing.
    ///
    /// From a revision this returns to its page's revision list; from the
    /// list it navigates to the page the history belongs to.
    pub fn back(&mut self) -> EngineResult<bool> {
        match self.view.mode {
            Mode::HistoryDetail => {
                let page = self
                    .view
                    .history_index
                    .and_then(|index| self.revisions.get(index))
                    .map(|revision| revision.page.clone());
                self.view.leave_detail(page.as_deref());
                self.mode_changed();
                self.persist(&[BlobKey::Documents])?;
                Ok(true)
            }
            Mode::HistoryList => {
                let page = self.view.history_target().to_string();
                self.navigate(&page)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Leave whatever is open and read the current page again.
    pub fn escape(&mut self) -> EngineResult<bool> {
        match self.view.mode {
            Mode::View => Ok(false),
            Mode::Edit => self.cancel(),
            Mode::List | Mode::HistoryList | Mode::HistoryDetail => {
                self.draft = None;
                self.view.show_current();
                self.mode_changed();
                self.persist(&[BlobKey::Documents])?;
                Ok(true)
            }
        }
    }

    /// Run a command-prompt entry.
    ///
    /// - `all` lists every page
    /// - `:history [page]` browses revisions of `page` or the current page
    /// - anything else is a page name to open
    ///
    /// While editing, the buffer is first written to the page without
    /// recording a revision so the text survives leaving the editor.
    pub fn run_command(&mut self, input: &str) -> EngineResult<bool> {
        let command = input.trim();
        if command.is_empty() {
            return Ok(false);
        }
        if self.view.mode == Mode::Edit {
            self.keep_draft()?;
        }

        let mut parts = command.splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or_default();
        if head.eq_ignore_ascii_case(":history") {
            let page = parts.next().map(str::trim);
            return self.view_history(page);
        }
        if command.eq_ignore_ascii_case("all") {
            self.list_all()?;
            return Ok(true);
        }
        self.navigate(command)?;
        Ok(true)
    }

    fn keep_draft(&mut self) -> EngineResult<()> {
        let Some(draft) = self.draft.clone() else {
            return Ok(());
        };
        let page = self.view.current.clone();
        self.links.update_one(&page, &draft);
        self.documents.set(&page, draft);
        self.events.push(WikiEvent::DraftKept { name: page });
        self.persist(&[BlobKey::Documents, BlobKey::Links])
    }

    // Pins

    /// Pin or unpin `name`; returns whether it is pinned afterwards.
    pub fn toggle_pin(&mut self, name: &str) -> EngineResult<bool> {
        let pinned = self.pins.toggle(name);
        self.events.push(WikiEvent::PinsChanged);
        self.persist(&[BlobKey::Pinned])?;
        Ok(pinned)
    }

    pub fn toggle_current_pin(&mut self) -> EngineResult<bool> {
        let name = self.view.current.clone();
        self.toggle_pin(&name)
    }

    /// Replace the pin order after a reorder gesture.
    pub fn reorder_pins(&mut self, names: Vec<String>) -> EngineResult<()> {
        self.pins.reorder(names);
        self.events.push(WikiEvent::PinsChanged);
        self.persist(&[BlobKey::Pinned])
    }

    // Bulk operations

    /// Recompute the whole link index from content.
    pub fn rebuild_index(&mut self) -> EngineResult<()> {
        self.links.rebuild_all(&self.documents);
        info!(pages = self.documents.len(), "rebuilt link index");
        self.events.push(WikiEvent::IndexRebuilt {
            pages: self.documents.len(),
        });
        self.persist(&[BlobKey::Links])
    }

    /// Serialize pages and history into a backup bundle.
    pub fn export_json(&self) -> EngineResult<String> {
        Ok(export_bundle(
            self.documents.pages(),
            self.revisions.entries(),
            Utc::now(),
        )?)
    }

    /// Replace pages and history with a backup bundle.
    ///
    /// The payload is validated before anything changes. The current page is
    /// kept when the bundle still contains it; otherwise the bundle's first
    /// page becomes current. Returns the number of pages imported.
    pub fn import_json(&mut self, raw: &str) -> EngineResult<usize> {
        let bundle = ImportBundle::parse(raw)?;
        let first = bundle.first_page().map(str::to_string);

        self.documents.replace_all(bundle.page_map());
        self.revisions.replace_all(bundle.history);

        let current = if self.documents.contains(&self.view.current) {
            self.view.current.clone()
        } else if let Some(first) = first {
            first
        } else {
            let home = self.settings.home_page.clone();
            self.documents.set(&home, self.settings.welcome_body());
            home
        };
        self.draft = None;
        self.view.show(&current);
        self.links.rebuild_all(&self.documents);

        let pages = self.documents.len();
        info!(pages, revisions = self.revisions.len(), "imported backup");
        self.events.push(WikiEvent::Imported {
            pages,
            revisions: self.revisions.len(),
        });
        self.events.push(WikiEvent::IndexRebuilt { pages });
        self.mode_changed();
        self.persist(&[BlobKey::Documents, BlobKey::History, BlobKey::Links])?;
        Ok(pages)
    }

    // Internals

    /// Create `name` with the stub body if missing and index it.
    fn materialize(&mut self, name: &str) -> bool {
        let settings = &self.settings;
        let created = self.documents.ensure(name, || settings.stub_body(name));
        if created {
            self.links
                .update_one(name, self.documents.get(name).unwrap_or_default());
            debug!(page = name, "created page from reference");
            self.events.push(WikiEvent::PageCreated {
                name: name.to_string(),
            });
        }
        created
    }

    fn mode_changed(&mut self) {
        debug!(mode = self.view.mode.label(), page = %self.view.current, "view changed");
        self.events.push(WikiEvent::ModeChanged {
            mode: self.view.mode,
            page: self.view.current.clone(),
        });
    }

    /// Write the given blobs, attempting every one even if an earlier write
    /// fails. Returns the first failure.
    fn persist(&mut self, keys: &[BlobKey]) -> EngineResult<()> {
        let mut first_error = None;
        for &key in keys {
            let result = match key {
                BlobKey::Documents => self.store.put_json(
                    key,
                    &DocumentsRecord::from_parts(&self.documents, &self.view),
                ),
                BlobKey::History => self.store.put_json(key, self.revisions.entries()),
                BlobKey::Visited => self.store.put_json(key, &self.recency),
                BlobKey::Pinned => self.store.put_json(key, &self.pins),
                BlobKey::Links => self.store.put_json(key, &self.links),
            };
            if let Err(e) = result {
                warn!(blob = key.as_str(), error = %e, "write-through failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

fn load<S: BlobStore, T: DeserializeOwned>(store: &S, key: BlobKey) -> StorageResult<Loaded<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(Loaded::Absent);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Loaded::Parsed(value)),
        Err(e) => {
            warn!(blob = key.as_str(), error = %e, "discarding unreadable blob");
            Ok(Loaded::Corrupt)
        }
    }
}

fn seeded(settings: &EngineSettings, body: String) -> (DocumentStore, ViewState) {
    let mut documents = DocumentStore::new();
    documents.set(&settings.home_page, body);
    (documents, ViewState::new(settings.home_page.clone()))
}
