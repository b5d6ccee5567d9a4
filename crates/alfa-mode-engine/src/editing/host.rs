use std::path::Path;

use crate::editing::{Position, Range};

/// Handle for a highlight marker installed in the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// The primary selection: `anchor` is where it started, `lead` is the caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub lead: Position,
}

impl Selection {
    pub fn caret(at: Position) -> Self {
        Self {
            anchor: at,
            lead: at,
        }
    }

    pub fn from_range(range: Range) -> Self {
        Self {
            anchor: range.start,
            lead: range.end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.lead
    }

    pub fn range(&self) -> Range {
        if self.anchor <= self.lead {
            Range::new(self.anchor, self.lead)
        } else {
            Range::new(self.lead, self.anchor)
        }
    }
}

/// Selection-change event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionEvent {
    pub lead: Position,
    pub anchor: Position,
    pub is_empty: bool,
}

impl From<Selection> for SelectionEvent {
    fn from(selection: Selection) -> Self {
        Self {
            lead: selection.lead,
            anchor: selection.anchor,
            is_empty: selection.is_empty(),
        }
    }
}

/// Indentation settings of the edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabSettings {
    pub soft_tabs: bool,
    pub tab_size: usize,
}

impl TabSettings {
    /// The text one indent level inserts.
    pub fn tab_string(&self) -> String {
        if self.soft_tabs {
            " ".repeat(self.tab_size)
        } else {
            "\t".to_string()
        }
    }
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            soft_tabs: true,
            tab_size: 4,
        }
    }
}

/// What the snippet core needs from the editor that hosts it.
///
/// The host owns the text. The core reads lines, asks for replacements and
/// moves the selection; it never holds on to host state between calls.
pub trait EditorHost {
    fn line_count(&self) -> usize;

    /// Text of `row` without its line terminator; empty past the last row.
    fn line(&self, row: usize) -> String;

    fn text_range(&self, range: &Range) -> String;

    /// Replace `range` with `text`, returning where the inserted text ends.
    fn replace(&mut self, range: &Range, text: &str) -> Position;

    fn selection(&self) -> Selection;

    /// Make `primary` the main selection and add `others` as secondary
    /// selections.
    fn set_selections(&mut self, primary: Range, others: &[Range]);

    fn tab_settings(&self) -> TabSettings;

    fn file_path(&self) -> Option<&Path>;

    fn add_marker(&mut self, range: &Range) -> MarkerId;

    fn remove_marker(&mut self, id: MarkerId);

    fn cursor(&self) -> Position {
        self.selection().lead
    }

    fn selected_text(&self) -> String {
        self.text_range(&self.selection().range())
    }

    /// Ranges of the selections other than the primary one.
    fn secondary_selections(&self) -> Vec<Range> {
        Vec::new()
    }
}
