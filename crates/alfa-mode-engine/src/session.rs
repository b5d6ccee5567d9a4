//! Per-editor controller.
//!
//! An [`EditorSession`] owns the host document together with everything the
//! core remembers about it between events: the tabstop manager of the
//! snippet being filled in, the language mode and the bracket auto-insert
//! state. Hosts either type through the session or report their own edits
//! with [`EditorSession::on_change`] and [`EditorSession::on_selection_change`].

use alfa_mode_syntax::{BracketState, InsertContext, LanguageMode, LineSource, Point, indent_of};

use crate::editing::{Change, EditorHost, Position, Range, Selection, SelectionEvent};
use crate::snippets::expand::Expansion;
use crate::snippets::manager::SnippetManager;
use crate::snippets::tabstops::TabstopManager;
use crate::snippets::variables::{CaptureScope, EditorContext};

/// Lines of a host, for the language helpers.
struct HostLines<'a, H: ?Sized>(&'a H);

impl<H: EditorHost + ?Sized> LineSource for HostLines<'_, H> {
    fn line_count(&self) -> usize {
        self.0.line_count()
    }

    fn line(&self, row: usize) -> String {
        self.0.line(row)
    }
}

fn point(position: Position) -> Point {
    Point::new(position.row, position.column)
}

pub struct EditorSession<H: EditorHost> {
    host: H,
    mode: LanguageMode,
    tabstops: Option<TabstopManager>,
    brackets: BracketState,
}

impl<H: EditorHost> EditorSession<H> {
    pub fn new(host: H, mode: LanguageMode) -> Self {
        Self {
            host,
            mode,
            tabstops: None,
            brackets: BracketState::None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn mode(&self) -> &LanguageMode {
        &self.mode
    }

    /// Snippet scope of the session's language.
    pub fn scope(&self) -> &str {
        &self.mode.id
    }

    /// The tabstop manager of the snippet being filled in, if any.
    pub fn tabstops(&self) -> Option<&TabstopManager> {
        self.tabstops.as_ref()
    }

    pub fn bracket_state(&self) -> &BracketState {
        &self.brackets
    }

    fn drop_detached(&mut self) {
        if self.tabstops.as_ref().is_some_and(|m| !m.is_attached()) {
            self.tabstops = None;
        }
    }

    /// Report an edit the host already applied.
    pub fn on_change(&mut self, change: &Change) {
        if let Some(manager) = self.tabstops.as_mut() {
            manager.on_change(&mut self.host, change, false);
        }
        self.drop_detached();
    }

    /// Report that the host moved its selection.
    pub fn on_selection_change(&mut self) {
        if let Some(manager) = self.tabstops.as_mut() {
            let event = SelectionEvent::from(self.host.selection());
            manager.on_selection_change(&mut self.host, &event);
        }
        self.drop_detached();
    }

    /// Replace `range` as a user edit, returning the end of the new text.
    pub fn replace(&mut self, range: Range, text: &str) -> Position {
        let (changes, _) = Change::replacement(range, text);
        let end = self.host.replace(&range, text);
        for change in &changes {
            self.on_change(change);
        }
        end
    }

    /// Swap in another document. Tracking of the old one stops.
    pub fn replace_document(&mut self, host: H) -> H {
        self.cancel();
        self.brackets = BracketState::None;
        std::mem::replace(&mut self.host, host)
    }

    /// Move to another tabstop. Returns `false` when no snippet is being
    /// filled in, so the host can handle the key itself.
    pub fn tab_next(&mut self, direction: isize) -> bool {
        let Some(manager) = self.tabstops.as_mut() else {
            return false;
        };
        manager.tab_next(&mut self.host, direction);
        self.drop_detached();
        true
    }

    /// Stop tracking the current snippet. Returns whether one was tracked.
    pub fn cancel(&mut self) -> bool {
        let Some(mut manager) = self.tabstops.take() else {
            return false;
        };
        manager.detach(&mut self.host);
        true
    }

    /// Insert a laid-out snippet over the selection and track its tabstops.
    pub(crate) fn insert_expansion(&mut self, expansion: &Expansion) {
        let range = self.host.selection().range();
        let end = self.replace(range, &expansion.text);
        let manager = self.tabstops.get_or_insert_with(TabstopManager::new);
        manager.add_tabstops(&mut self.host, &expansion.tabstops, range.start, end);
        self.drop_detached();
    }

    fn update_linked_fields(&mut self, snippets: &SnippetManager) {
        let Some(manager) = self.tabstops.as_mut() else {
            return;
        };
        let context = EditorContext::from_host(&self.host, snippets.full_name(), &self.mode.comments);
        let resolver = snippets.resolver(&context);
        let captures = CaptureScope::default();
        manager.update_linked_fields(&mut self.host, &|value, transform| {
            resolver.apply_transform(value, transform, &captures)
        });
        self.drop_detached();
    }

    /// Type `text` at every selection.
    ///
    /// With a single selection the language mode gets to rewrite the input:
    /// bracket pairing, indentation of new lines and outdenting of `}`.
    pub fn type_text(&mut self, snippets: &SnippetManager, text: &str) {
        let secondary = self.host.secondary_selections();
        if secondary.is_empty() {
            self.type_at_selection(text);
        } else {
            let mut ranges = secondary;
            ranges.push(self.host.selection().range());
            ranges.sort_by_key(|r| r.start);
            for range in ranges.into_iter().rev() {
                self.replace(range, text);
            }
        }
        self.update_linked_fields(snippets);
        self.on_selection_change();
    }

    fn type_at_selection(&mut self, text: &str) {
        let selection = self.host.selection();
        let mut range = selection.range();
        let tab = self.host.tab_settings().tab_string();

        let is_newline = matches!(text, "\n" | "\r\n");
        if is_newline && range.is_empty() {
            // Whitespace after the caret does not move to the new line.
            let line = self.host.line(range.start.row);
            let column = range.start.column;
            if column > indent_of(&line).len() {
                let trailing = line
                    .get(column..)
                    .map_or(0, |rest| rest.len() - rest.trim_start().len());
                range.end = Position::new(range.start.row, column + trailing);
            }
        }

        let cursor = range.start;
        let line = self.host.line(cursor.row);
        let selected = self.host.text_range(&selection.range());

        let mut insertion = None;
        if let Some(behaviour) = self.mode.behaviour {
            let ctx = InsertContext {
                cursor: point(cursor),
                line: &line,
                selected: &selected,
                tab: &tab,
            };
            insertion = behaviour.on_insert(
                &mut self.brackets,
                &HostLines(&self.host),
                self.mode.indent,
                &ctx,
                text,
            );
        }

        let (text, caret) = match insertion {
            Some(insertion) => (insertion.text, insertion.caret),
            None if is_newline => {
                let before = line.get(..cursor.column).unwrap_or(&line);
                let indent = self
                    .mode
                    .next_line_indent(&HostLines(&self.host), cursor.row, before, &tab);
                (format!("\n{indent}"), None)
            }
            None => (text.to_string(), None),
        };
        let outdent = self.mode.check_outdent(&line, &text);

        self.replace(range, &text);
        if let Some(caret) = caret {
            let at = if caret.row == 0 {
                Position::new(cursor.row, cursor.column + caret.column)
            } else {
                Position::new(cursor.row + caret.row, caret.column)
            };
            self.host.set_selections(Range::point(at), &[]);
        }

        if outdent && let Some(edit) = self.mode.auto_outdent(&HostLines(&self.host), cursor.row) {
            let whitespace = Range::new(Position::new(edit.row, 0), Position::new(edit.row, edit.end_column));
            self.replace(whitespace, &edit.indent);
        }
    }

    /// Delete the selection, or the character before the caret.
    ///
    /// Deleting an opener right before its partner removes both.
    pub fn delete_backward(&mut self, snippets: &SnippetManager) {
        let selection = self.host.selection();
        let mut range = selection.range();

        if selection.is_empty() {
            let caret = selection.lead;
            let line = self.host.line(caret.row);
            if caret.column > 0 {
                let width = line
                    .get(..caret.column)
                    .and_then(|before| before.chars().next_back())
                    .map_or(1, char::len_utf8);
                range.start = Position::new(caret.row, caret.column - width);
            } else if caret.row > 0 {
                range.start = Position::new(caret.row - 1, self.host.line(caret.row - 1).len());
            } else {
                return;
            }

            if let Some(behaviour) = self.mode.behaviour
                && let Some(end) = behaviour.on_delete(&mut self.brackets, &line, point(range.start), point(range.end))
            {
                range.end = Position::new(end.row, end.column);
            }
        }

        self.replace(range, "");
        self.host.set_selections(Range::point(range.start), &[]);
        self.update_linked_fields(snippets);
        self.on_selection_change();
    }

    /// Move the caret, as a host would on a click.
    pub fn set_caret(&mut self, at: Position) {
        let selection = Selection::caret(at);
        self.host.set_selections(selection.range(), &[]);
        self.on_selection_change();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Document;
    use pretty_assertions::assert_eq;

    fn p(row: usize, column: usize) -> Position {
        Position::new(row, column)
    }

    fn alfa(text: &str, caret: Position) -> EditorSession<Document> {
        let mut doc = Document::new(text);
        doc.set_selection(Selection::caret(caret));
        EditorSession::new(doc, LanguageMode::alfa())
    }

    fn type_all(session: &mut EditorSession<Document>, snippets: &SnippetManager, input: &[&str]) {
        for text in input {
            session.type_text(snippets, text);
        }
    }

    #[test]
    fn test_typing_plain_text() {
        let snippets = SnippetManager::new();
        let mut session = alfa("", p(0, 0));
        type_all(&mut session, &snippets, &["p", "e"]);
        assert_eq!(session.host().text(), "pe");
        assert_eq!(session.host().cursor(), p(0, 2));
    }

    #[test]
    fn test_paren_pair_and_skip_closer() {
        let snippets = SnippetManager::new();
        let mut session = alfa("", p(0, 0));
        type_all(&mut session, &snippets, &["(", "a", ")"]);
        assert_eq!(session.host().text(), "(a)");
        assert_eq!(session.host().cursor(), p(0, 3));
    }

    #[test]
    fn test_newline_inside_braces() {
        let snippets = SnippetManager::new();
        let mut session = alfa("policy p {}", p(0, 10));
        session.type_text(&snippets, "\n");
        assert_eq!(session.host().text(), "policy p {\n    \n}");
        assert_eq!(session.host().cursor(), p(1, 4));
    }

    #[test]
    fn test_newline_indents_after_opener() {
        let snippets = SnippetManager::new();
        let mut session = alfa("  target (", p(0, 10));
        session.type_text(&snippets, "\n");
        assert_eq!(session.host().text(), "  target (\n      ");
    }

    #[test]
    fn test_newline_swallows_whitespace_after_caret() {
        let snippets = SnippetManager::new();
        let mut session = alfa("  permit   deny", p(0, 8));
        session.type_text(&snippets, "\n");
        assert_eq!(session.host().text(), "  permit\n  deny");
        assert_eq!(session.host().cursor(), p(1, 2));
    }

    #[test]
    fn test_closing_brace_outdents() {
        let snippets = SnippetManager::new();
        let mut session = alfa("policy p {\n        ", p(1, 8));
        session.type_text(&snippets, "}");
        assert_eq!(session.host().text(), "policy p {\n}");
    }

    #[test]
    fn test_delete_backward_removes_pair() {
        let snippets = SnippetManager::new();
        let mut session = alfa("", p(0, 0));
        session.type_text(&snippets, "(");
        session.delete_backward(&snippets);
        assert_eq!(session.host().text(), "");
    }

    #[test]
    fn test_delete_backward_joins_lines() {
        let snippets = SnippetManager::new();
        let mut session = alfa("a\nb", p(1, 0));
        session.delete_backward(&snippets);
        assert_eq!(session.host().text(), "ab");
        assert_eq!(session.host().cursor(), p(0, 1));
    }

    #[test]
    fn test_typing_into_tabstop_updates_mirror() {
        let snippets = SnippetManager::new();
        let mut session = alfa("", p(0, 0));
        snippets.insert_snippet(&mut session, "${1:x} ${1/a/o/g}");

        type_all(&mut session, &snippets, &["b", "a", "n", "a", "n", "a"]);
        assert_eq!(session.host().text(), "banana bonono");
        assert!(session.tabstops().is_some());
    }

    #[test]
    fn test_typing_at_every_occurrence() {
        let snippets = SnippetManager::new();
        let mut session = alfa("", p(0, 0));
        snippets.insert_snippet(&mut session, "${1:v} = $1;$0");

        type_all(&mut session, &snippets, &["i", "d"]);
        assert_eq!(session.host().text(), "id = id;");
    }

    #[test]
    fn test_tab_next_and_cancel() {
        let snippets = SnippetManager::new();
        let mut session = alfa("", p(0, 0));
        assert!(!session.tab_next(1));

        snippets.insert_snippet(&mut session, "$1 $2");
        assert!(session.tab_next(1));
        assert!(session.cancel());
        assert!(session.tabstops().is_none());
        assert!(!session.cancel());
    }

    #[test]
    fn test_caret_outside_snippet_detaches() {
        let snippets = SnippetManager::new();
        let mut session = alfa("rest", p(0, 0));
        snippets.insert_snippet(&mut session, "${1:a} ");
        assert!(session.tabstops().is_some());

        session.set_caret(p(0, 5));
        assert!(session.tabstops().is_none());
    }

    #[test]
    fn test_replace_document_detaches() {
        let snippets = SnippetManager::new();
        let mut session = alfa("", p(0, 0));
        snippets.insert_snippet(&mut session, "$1 $2");

        let old = session.replace_document(Document::new("other"));
        assert!(session.tabstops().is_none());
        assert_eq!(old.marker_count(), 0);
        assert_eq!(session.host().text(), "other");
    }
}
