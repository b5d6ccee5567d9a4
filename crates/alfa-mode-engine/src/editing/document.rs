use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use xi_rope::{LinesMetric, Rope};

use crate::editing::{
    Bias, Cmd, EditorHost, MarkerId, Patch, Position, Range, Selection, TabSettings,
};

/// Reference host document.
///
/// Holds the text in a single `xi_rope::Rope` and applies every edit as a
/// [`Cmd`] compiled into a rope delta. Selections and highlight markers are
/// carried through each edit with the same rules the tabstop manager uses,
/// so a marker installed over a tabstop region keeps covering it.
///
/// ```rust
/// # use alfa_mode_engine::editing::{Cmd, Document, EditorHost, Position};
/// let mut doc = Document::new("policy {\n}");
/// let patch = doc.apply(Cmd::InsertText {
///     at: Position::new(0, 0),
///     text: "// main\n".to_string(),
/// });
/// assert_eq!(patch.end, Position::new(1, 0));
/// assert_eq!(doc.line(1), "policy {");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// Entire document text
    pub(crate) buffer: Rope,
    /// Primary selection
    pub(crate) selection: Selection,
    /// Secondary selections, e.g. the other regions of a tabstop group
    pub(crate) extra_selections: Vec<Range>,
    /// Incremented on each edit
    pub(crate) version: u64,
    pub(crate) markers: BTreeMap<MarkerId, Range>,
    next_marker: u64,
    tab_settings: TabSettings,
    path: Option<PathBuf>,
}

impl Document {
    pub fn new(text: &str) -> Self {
        Self {
            buffer: Rope::from(text),
            selection: Selection::default(),
            extra_selections: Vec::new(),
            version: 0,
            markers: BTreeMap::new(),
            next_marker: 0,
            tab_settings: TabSettings::default(),
            path: None,
        }
    }

    /// Create a new document from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(text))
    }

    pub fn with_tab_settings(mut self, tab_settings: TabSettings) -> Self {
        self.tab_settings = tab_settings;
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Apply command to document
    ///
    /// Compiles the command into a delta, applies it to the rope, then moves
    /// the selection and every marker through the resulting change events.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let delta = self.compile_command(&cmd);
        let (changes, end) = crate::editing::commands::changes_for_command(self, &cmd);

        self.buffer = delta.apply(&self.buffer);

        for change in &changes {
            self.selection = Selection {
                anchor: self.selection.anchor.transform(change, Bias::Right),
                lead: self.selection.lead.transform(change, Bias::Right),
            };
            for range in &mut self.extra_selections {
                *range = Range::new(
                    range.start.transform(change, Bias::Right),
                    range.end.transform(change, Bias::Right),
                );
            }
            for range in self.markers.values_mut() {
                *range = range.transform(change);
            }
        }

        self.version += 1;

        Patch {
            changes,
            end,
            version: self.version,
        }
    }

    /// Get the current version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the current text content
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Selection {
            anchor: self.clip(selection.anchor),
            lead: self.clip(selection.lead),
        };
        self.extra_selections.clear();
    }

    pub fn extra_selections(&self) -> &[Range] {
        &self.extra_selections
    }

    /// Range currently covered by a marker, if it is still installed
    pub fn marker(&self, id: MarkerId) -> Option<Range> {
        self.markers.get(&id).copied()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Get the buffer length
    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Clamp a position to an existing row and a column within that row.
    pub fn clip(&self, pos: Position) -> Position {
        let last_row = self.line_count() - 1;
        if pos.row > last_row {
            return Position::new(last_row, self.line(last_row).len());
        }
        Position::new(pos.row, pos.column.min(self.line(pos.row).len()))
    }

    pub(crate) fn offset_of(&self, pos: Position) -> usize {
        let pos = self.clip(pos);
        self.buffer.offset_of_line(pos.row) + pos.column
    }

    pub fn position_of(&self, offset: usize) -> Position {
        let offset = offset.min(self.len());
        let row = self.buffer.line_of_offset(offset);
        Position::new(row, offset - self.buffer.offset_of_line(row))
    }

    pub(crate) fn compile_command(&self, cmd: &Cmd) -> xi_rope::Delta<xi_rope::RopeInfo> {
        crate::editing::commands::compile_command(self, cmd)
    }
}

impl EditorHost for Document {
    fn line_count(&self) -> usize {
        self.buffer.measure::<LinesMetric>() + 1
    }

    fn line(&self, row: usize) -> String {
        if row >= self.line_count() {
            return String::new();
        }
        let start = self.buffer.offset_of_line(row);
        let end = self.buffer.offset_of_line(row + 1);
        let text = self.buffer.slice_to_cow(start..end);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        text.strip_suffix('\r').unwrap_or(text).to_string()
    }

    fn text_range(&self, range: &Range) -> String {
        let start = self.offset_of(range.start);
        let end = self.offset_of(range.end).max(start);
        self.buffer.slice_to_cow(start..end).into_owned()
    }

    fn replace(&mut self, range: &Range, text: &str) -> Position {
        self.apply(Cmd::ReplaceRange {
            range: *range,
            text: text.to_string(),
        })
        .end
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selections(&mut self, primary: Range, others: &[Range]) {
        self.set_selection(Selection::from_range(primary));
        self.extra_selections = others.to_vec();
    }

    fn secondary_selections(&self) -> Vec<Range> {
        self.extra_selections.clone()
    }

    fn tab_settings(&self) -> TabSettings {
        self.tab_settings
    }

    fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn add_marker(&mut self, range: &Range) -> MarkerId {
        self.next_marker += 1;
        let id = MarkerId(self.next_marker);
        self.markers.insert(id, *range);
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.buffer.to_string() == other.buffer.to_string()
            && self.selection == other.selection
            && self.version == other.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(row: usize, column: usize) -> Position {
        Position::new(row, column)
    }

    #[test]
    fn test_document_from_bytes_invalid_utf8() {
        let invalid_bytes = vec![0xFF, 0xFE, 0xFD];
        assert!(Document::from_bytes(&invalid_bytes).is_err());
    }

    #[test]
    fn test_lines_and_positions() {
        let doc = Document::new("rule r1 {\n  permit\n}");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.line(1), "  permit");
        assert_eq!(doc.line(7), "");
        assert_eq!(doc.position_of(12), p(1, 2));
        assert_eq!(doc.offset_of(p(2, 0)), 19);
    }

    #[test]
    fn test_line_strips_crlf() {
        let doc = Document::new("a\r\nb");
        assert_eq!(doc.line(0), "a");
        assert_eq!(doc.line(1), "b");
    }

    #[test]
    fn test_clip_out_of_range_positions() {
        let doc = Document::new("ab\ncde");
        assert_eq!(doc.clip(p(0, 10)), p(0, 2));
        assert_eq!(doc.clip(p(5, 0)), p(1, 3));
    }

    #[test]
    fn test_replace_moves_caret_past_typed_text() {
        let mut doc = Document::new("target clause");
        doc.set_selection(Selection::caret(p(0, 6)));

        let end = doc.replace(&Range::point(p(0, 6)), " any");
        assert_eq!(end, p(0, 10));
        assert_eq!(doc.text(), "target any clause");
        assert_eq!(doc.selection().lead, p(0, 10));
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_markers_follow_edits() {
        let mut doc = Document::new("apply firstApplicable");
        let id = doc.add_marker(&Range::new(p(0, 6), p(0, 21)));

        doc.apply(Cmd::InsertText {
            at: p(0, 0),
            text: "\n".to_string(),
        });
        assert_eq!(doc.marker(id), Some(Range::new(p(1, 6), p(1, 21))));

        doc.remove_marker(id);
        assert_eq!(doc.marker(id), None);
    }

    #[test]
    fn test_secondary_carets_move_past_typed_text() {
        let mut doc = Document::new("a b");
        doc.set_selections(Range::point(p(0, 0)), &[Range::point(p(0, 2))]);

        doc.replace(&Range::point(p(0, 2)), "xy");
        assert_eq!(doc.secondary_selections(), vec![Range::point(p(0, 4))]);
    }

    #[test]
    fn test_replace_selection_spanning_lines() {
        let mut doc = Document::new("one\ntwo\nthree");
        let end = doc.replace(&Range::new(p(0, 1), p(2, 2)), "X");
        assert_eq!(doc.text(), "oXree");
        assert_eq!(end, p(0, 2));
        assert_eq!(doc.text_range(&Range::new(p(0, 0), p(0, 2))), "oX");
    }
}
