//! Wiki content and link-graph engine.
//!
//! This crate owns everything a personal wiki needs below the presentation
//! layer:
//! - Pages with create-on-reference semantics
//! - A global, capped revision log
//! - Wiki link parsing and a derived backlink index
//! - Pinned pages with a user-defined order
//! - Last-visit tracking for "recent" sorting
//! - The view-mode state machine driven by the front-end
//!
//! The front-end owns rendering. It raises triggers on [`Engine`], re-reads
//! state afterwards and drains [`WikiEvent`]s to learn what changed.

pub mod collation;
pub mod documents;
pub mod engine;
pub mod error;
pub mod events;
pub mod link_index;
pub mod links;
pub mod outline;
pub mod pins;
pub mod recency;
pub mod revisions;
pub mod settings;
pub mod storage;
pub mod transfer;
pub mod view;

pub use documents::{DocumentStore, SortMode};
pub use engine::Engine;
pub use error::{EngineError, EngineResult, StorageError, StorageResult};
pub use events::{EventQueue, WikiEvent};
pub use link_index::LinkIndex;
pub use links::{parse_links, resolve_href, rewrite_wiki_links};
pub use outline::{outline, OutlineEntry};
pub use pins::PinStore;
pub use recency::RecencyTracker;
pub use revisions::{Revision, RevisionLog, VersionEntry, HISTORY_CAP};
pub use settings::EngineSettings;
pub use storage::{BlobKey, BlobStore, MemoryStore, SqliteStore};
pub use transfer::{backup_file_name, ImportBundle};
pub use view::{Mode, Trigger, ViewState};
