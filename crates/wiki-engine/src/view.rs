//! View-mode state machine.
//!
//! `ViewState` is the cursor into the rest of the data: which mode is
//! active, which page is current and, while browsing history, which page and
//! revision are open. It references pages by name and revisions by index and
//! owns neither.
//!
//! | From        | Trigger        | To            |
//! |-------------|----------------|---------------|
//! | any         | `Navigate`     | View          |
//! | View        | `Edit`         | Edit          |
//! | Edit        | `Save`         | View          |
//! | Edit        | `Cancel`       | View          |
//! | any         | `ListAll`      | List          |
//! | View/Edit   | `ViewHistory`  | HistoryList   |
//! | HistoryList | `OpenVersion`  | HistoryDetail |
//! | HistoryDetail | `Restore`    | View          |
//! | HistoryDetail | `Back`       | HistoryList   |
//! | HistoryList | `Back`         | View          |
//!
//! Triggers outside this table are simply unavailable; callers check
//! [`ViewState::allows`] and treat a refused trigger as a no-op.

use serde::{Deserialize, Serialize};

/// The active view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Reading the current page.
    #[default]
    View,
    /// Editing the current page.
    Edit,
    /// Listing every page.
    List,
    /// Listing the revisions of one page.
    #[serde(rename = "history")]
    HistoryList,
    /// Showing a single revision.
    HistoryDetail,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::View => "VIEW",
            Mode::Edit => "EDIT",
            Mode::List => "LIST",
            Mode::HistoryList => "HISTORY",
            Mode::HistoryDetail => "REVISION",
        }
    }
}

/// Inputs that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Navigate,
    Edit,
    Save,
    Cancel,
    ListAll,
    ViewHistory,
    OpenVersion,
    Restore,
    Back,
}

impl Trigger {
    pub const ALL: [Trigger; 9] = [
        Trigger::Navigate,
        Trigger::Edit,
        Trigger::Save,
        Trigger::Cancel,
        Trigger::ListAll,
        Trigger::ViewHistory,
        Trigger::OpenVersion,
        Trigger::Restore,
        Trigger::Back,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub mode: Mode,
    pub current: String,
    pub history_page: Option<String>,
    pub history_index: Option<usize>,
}

impl ViewState {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            mode: Mode::View,
            current: current.into(),
            history_page: None,
            history_index: None,
        }
    }

    /// Whether `trigger` is legal in the current mode.
    pub fn allows(&self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::Navigate | Trigger::ListAll => true,
            Trigger::Edit => self.mode == Mode::View,
            Trigger::Save | Trigger::Cancel => self.mode == Mode::Edit,
            Trigger::ViewHistory => matches!(self.mode, Mode::View | Mode::Edit),
            Trigger::OpenVersion => self.mode == Mode::HistoryList,
            Trigger::Restore => self.mode == Mode::HistoryDetail,
            Trigger::Back => matches!(self.mode, Mode::HistoryList | Mode::HistoryDetail),
        }
    }

    /// Every trigger legal in the current mode.
    pub fn available_triggers(&self) -> Vec<Trigger> {
        Trigger::ALL
            .into_iter()
            .filter(|trigger| self.allows(*trigger))
            .collect()
    }

    /// The page whose history is being browsed.
    pub fn history_target(&self) -> &str {
        self.history_page.as_deref().unwrap_or(&self.current)
    }

    /// Show `page` in reading mode, leaving history browsing.
    pub(crate) fn show(&mut self, page: &str) {
        self.mode = Mode::View;
        self.current = page.to_string();
        self.history_page = None;
        self.history_index = None;
    }

    /// Return to reading the current page.
    pub(crate) fn show_current(&mut self) {
        self.mode = Mode::View;
        self.history_page = None;
        self.history_index = None;
    }

    pub(crate) fn enter_edit(&mut self) {
        self.mode = Mode::Edit;
    }

    pub(crate) fn enter_list(&mut self) {
        self.mode = Mode::List;
        self.history_page = None;
        self.history_index = None;
    }

    pub(crate) fn enter_history(&mut self, page: &str) {
        self.mode = Mode::HistoryList;
        self.history_page = Some(page.to_string());
        self.history_index = None;
    }

    pub(crate) fn enter_detail(&mut self, index: usize) {
        self.mode = Mode::HistoryDetail;
        self.history_index = Some(index);
    }

    /// Return from a revision to the list it was opened from.
    pub(crate) fn leave_detail(&mut self, page: Option<&str>) {
        self.mode = Mode::HistoryList;
        if let Some(page) = page {
            self.history_page = Some(page.to_string());
        }
        self.history_index = None;
    }

    /// Repair a cursor loaded from disk.
    ///
    /// History modes without the data they need fall back one step.
    pub(crate) fn normalize(&mut self, revision_exists: impl Fn(usize) -> bool) {
        if self.mode == Mode::HistoryDetail {
            match self.history_index {
                Some(index) if revision_exists(index) => {}
                _ => self.mode = Mode::HistoryList,
            }
        }
        if self.mode == Mode::HistoryList {
            self.history_index = None;
            if self.history_page.is_none() {
                self.history_page = Some(self.current.clone());
            }
        }
        if matches!(self.mode, Mode::View | Mode::Edit | Mode::List) {
            self.history_page = None;
            self.history_index = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_wire_names() {
        let names: Vec<String> = [
            Mode::View,
            Mode::Edit,
            Mode::List,
            Mode::HistoryList,
            Mode::HistoryDetail,
        ]
        .iter()
        .map(|m| serde_json::to_string(m).unwrap())
        .collect();
        assert_eq!(
            names,
            vec!["\"view\"", "\"edit\"", "\"list\"", "\"history\"", "\"historyDetail\""]
        );
    }

    #[test]
    fn test_allowed_triggers_per_mode() {
        let mut state = ViewState::new("Home");
        assert_eq!(
            state.available_triggers(),
            vec![
                Trigger::Navigate,
                Trigger::Edit,
                Trigger::ListAll,
                Trigger::ViewHistory
            ]
        );

        state.enter_edit();
        assert!(state.allows(Trigger::Save));
        assert!(state.allows(Trigger::Cancel));
        assert!(!state.allows(Trigger::Edit));
        assert!(state.allows(Trigger::ViewHistory));

        state.enter_history("Home");
        assert!(state.allows(Trigger::OpenVersion));
        assert!(state.allows(Trigger::Back));
        assert!(!state.allows(Trigger::Restore));
        assert!(!state.allows(Trigger::Save));

        state.enter_detail(0);
        assert!(state.allows(Trigger::Restore));
        assert!(state.allows(Trigger::Back));
        assert!(!state.allows(Trigger::OpenVersion));
        assert!(!state.allows(Trigger::ViewHistory));

        state.enter_list();
        assert_eq!(
            state.available_triggers(),
            vec![Trigger::Navigate, Trigger::ListAll]
        );
    }

    #[test]
    fn test_history_target_defaults_to_current() {
        let mut state = ViewState::new("Home");
        assert_eq!(state.history_target(), "Home");
        state.enter_history("Notes");
        assert_eq!(state.history_target(), "Notes");
        state.show("Other");
        assert_eq!(state.history_target(), "Other");
    }

    #[test]
    fn test_normalize_missing_revision() {
        let mut state = ViewState {
            mode: Mode::HistoryDetail,
            current: "Home".to_string(),
            history_page: None,
            history_index: Some(42),
        };
        state.normalize(|index| index < 10);
        assert_eq!(state.mode, Mode::HistoryList);
        assert_eq!(state.history_page.as_deref(), Some("Home"));
        assert_eq!(state.history_index, None);
    }

    #[test]
    fn test_normalize_keeps_valid_detail() {
        let mut state = ViewState::new("Home");
        state.enter_history("Home");
        state.enter_detail(3);
        let before = state.clone();
        state.normalize(|index| index < 10);
        assert_eq!(state, before);
    }
}
