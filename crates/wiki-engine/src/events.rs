//! Change notifications for the front-end.
//!
//! Operations push events into a queue owned by the engine; the renderer
//! drains it after each call and re-reads whatever state it shows.

use crate::view::Mode;
use std::collections::VecDeque;

/// Something the renderer may need to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WikiEvent {
    /// A page was materialized from a reference.
    PageCreated { name: String },

    /// Edited content was committed.
    PageSaved { name: String },

    /// An older revision became the current content.
    PageRestored { name: String, from_index: usize },

    /// Unsaved editor text was written to a page without a revision.
    DraftKept { name: String },

    /// The view cursor moved.
    ModeChanged { mode: Mode, page: String },

    /// The pin list changed.
    PinsChanged,

    /// Pages and history were replaced by an import.
    Imported { pages: usize, revisions: usize },

    /// The link index was recomputed from all content.
    IndexRebuilt { pages: usize },
}

impl WikiEvent {
    /// Short machine-readable name.
    pub fn event_type(&self) -> &'static str {
        match self {
            WikiEvent::PageCreated { .. } => "page_created",
            WikiEvent::PageSaved { .. } => "page_saved",
            WikiEvent::PageRestored { .. } => "page_restored",
            WikiEvent::DraftKept { .. } => "draft_kept",
            WikiEvent::ModeChanged { .. } => "mode_changed",
            WikiEvent::PinsChanged => "pins_changed",
            WikiEvent::Imported { .. } => "imported",
            WikiEvent::IndexRebuilt { .. } => "index_rebuilt",
        }
    }

    /// Page the event is about, if any.
    pub fn page_name(&self) -> Option<&str> {
        match self {
            WikiEvent::PageCreated { name }
            | WikiEvent::PageSaved { name }
            | WikiEvent::PageRestored { name, .. }
            | WikiEvent::DraftKept { name } => Some(name),
            WikiEvent::ModeChanged { page, .. } => Some(page),
            _ => None,
        }
    }
}

/// FIFO of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: VecDeque<WikiEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: WikiEvent) {
        self.inner.push_back(event);
    }

    /// Remove and return every pending event.
    pub fn drain_all(&mut self) -> Vec<WikiEvent> {
        self.inner.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_push_and_drain() {
        let mut queue = EventQueue::new();
        queue.push(WikiEvent::PageCreated {
            name: "Notes".to_string(),
        });
        queue.push(WikiEvent::PinsChanged);

        assert_eq!(queue.len(), 2);
        let events = queue.drain_all();
        assert_eq!(events[0].event_type(), "page_created");
        assert_eq!(events[1], WikiEvent::PinsChanged);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_page_name() {
        let event = WikiEvent::ModeChanged {
            mode: Mode::Edit,
            page: "Home".to_string(),
        };
        assert_eq!(event.page_name(), Some("Home"));
        assert_eq!(WikiEvent::Imported { pages: 1, revisions: 0 }.page_name(), None);
    }
}
