//! Bracket and quote auto-insertion.
//!
//! The behaviour is stateless; what it remembers between keystrokes (closers
//! it inserted, braces that may still need closing on Enter) lives in a
//! [`BracketState`] owned by each editing session.

use crate::brackets::{LineSource, Point, find_opening, state_at};
use crate::indent::{IndentPolicy, indent_of};
use crate::lexer::{Token, TokenKind, token_index_at, tokenize_line};

/// What a session remembers about recent bracket insertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BracketState {
    #[default]
    None,
    /// Closers were auto-inserted on `row`; typing one of them again while
    /// the rest of the line still equals `expected_tail` steps over it.
    PendingAutoClose {
        bracket: char,
        row: usize,
        expected_tail: String,
        count: usize,
    },
    /// `{` was typed without a closer; pressing Enter with the line unchanged
    /// inserts `count` closing braces.
    PendingMaybeClose {
        bracket: char,
        row: usize,
        line_snapshot: LineSnapshot,
        count: usize,
    },
}

/// The line around the cursor when a brace was recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSnapshot {
    pub before: String,
    pub after: String,
}

/// Where the cursor is and what is selected when text is typed.
#[derive(Debug, Clone, Copy)]
pub struct InsertContext<'a> {
    pub cursor: Point,
    /// Text of the cursor row
    pub line: &'a str,
    /// Text of the primary selection, empty for a caret
    pub selected: &'a str,
    /// One indent level
    pub tab: &'a str,
}

/// Replacement for the typed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub text: String,
    /// Caret relative to the insertion start (row offset, column); `None`
    /// leaves it after the inserted text.
    pub caret: Option<Point>,
}

impl Insertion {
    fn with_caret(text: impl Into<String>, row: usize, column: usize) -> Self {
        Self {
            text: text.into(),
            caret: Some(Point::new(row, column)),
        }
    }

    fn wrapping(open: char, selected: &str, close: char) -> Self {
        Self {
            text: format!("{open}{selected}{close}"),
            caret: None,
        }
    }
}

/// C-style auto-pairing of `{}`, `()`, `[]` and quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketBehaviour {
    /// Typing an opener over a selection wraps it
    pub wrap_selections: bool,
}

impl Default for BracketBehaviour {
    fn default() -> Self {
        Self {
            wrap_selections: true,
        }
    }
}

fn split_at_column(line: &str, column: usize) -> (&str, &str) {
    match (line.get(..column), line.get(column..)) {
        (Some(before), Some(after)) => (before, after),
        _ => (line, ""),
    }
}

fn char_at(line: &str, column: usize) -> Option<char> {
    line.get(column..).and_then(|rest| rest.chars().next())
}

fn is_auto_inserted_closing(state: &BracketState, cursor: Point, line: &str, typed: char) -> bool {
    match state {
        BracketState::PendingAutoClose {
            row,
            expected_tail,
            count,
            ..
        } => {
            *count > 0
                && *row == cursor.row
                && expected_tail.starts_with(typed)
                && split_at_column(line, cursor.column).1 == expected_tail.as_str()
        }
        _ => false,
    }
}

fn is_maybe_inserted_closing(state: &BracketState, cursor: Point, line: &str) -> bool {
    match state {
        BracketState::PendingMaybeClose {
            row,
            line_snapshot,
            count,
            ..
        } => {
            let (before, after) = split_at_column(line, cursor.column);
            *count > 0 && *row == cursor.row && after == line_snapshot.after && before == line_snapshot.before
        }
        _ => false,
    }
}

fn record_auto_insert(state: &mut BracketState, cursor: Point, line: &str, bracket: char) {
    let current: &BracketState = state;
    let count = match current {
        BracketState::PendingAutoClose {
            expected_tail,
            count,
            ..
        } => {
            let first = expected_tail.chars().next();
            if first.is_some_and(|c| is_auto_inserted_closing(current, cursor, line, c)) {
                *count
            } else {
                0
            }
        }
        _ => 0,
    };
    *state = BracketState::PendingAutoClose {
        bracket,
        row: cursor.row,
        expected_tail: format!("{bracket}{}", split_at_column(line, cursor.column).1),
        count: count + 1,
    };
}

fn record_maybe_insert(state: &mut BracketState, cursor: Point, line: &str, bracket: char) {
    let current: &BracketState = state;
    let count = match current {
        BracketState::PendingMaybeClose { count, .. } if is_maybe_inserted_closing(current, cursor, line) => *count,
        _ => 0,
    };
    let (before, after) = split_at_column(line, cursor.column);
    *state = BracketState::PendingMaybeClose {
        bracket,
        row: cursor.row,
        line_snapshot: LineSnapshot {
            before: format!("{before}{bracket}"),
            after: after.to_string(),
        },
        count: count + 1,
    };
}

fn pop_auto_inserted_closing(state: &mut BracketState) {
    let exhausted = match state {
        BracketState::PendingAutoClose {
            bracket,
            expected_tail,
            count,
            ..
        } => {
            expected_tail.remove(0);
            *count -= 1;
            if let Some(next) = expected_tail.chars().next() {
                *bracket = next;
            }
            *count == 0
        }
        _ => false,
    };
    if exhausted {
        *state = BracketState::None;
    }
}

/// One fewer `{` is waiting for its closer.
fn forget_maybe_inserted(state: &mut BracketState) {
    let exhausted = match state {
        BracketState::PendingMaybeClose { count, .. } => {
            *count = count.saturating_sub(1);
            *count == 0
        }
        _ => false,
    };
    if exhausted {
        *state = BracketState::None;
    }
}

impl BracketBehaviour {
    /// Decide what typing `text` should insert instead.
    ///
    /// Returns `None` when the text should be inserted unchanged.
    pub fn on_insert<L: LineSource + ?Sized>(
        &self,
        state: &mut BracketState,
        lines: &L,
        indent: IndentPolicy,
        ctx: &InsertContext<'_>,
        text: &str,
    ) -> Option<Insertion> {
        match text {
            "{" => self.insert_brace(state, lines, ctx),
            "(" | "[" => {
                let open = text.chars().next()?;
                let close = if open == '(' { ')' } else { ']' };
                self.insert_opener(state, lines, ctx, open, close)
            }
            "}" | ")" | "]" => {
                let close = text.chars().next()?;
                skip_closer(state, lines, ctx, close)
            }
            "\n" | "\r\n" => insert_newline(state, lines, indent, ctx),
            "\"" | "'" => self.insert_quote(lines, ctx, text.chars().next()?),
            _ => None,
        }
    }

    fn insert_brace<L: LineSource + ?Sized>(
        &self,
        state: &mut BracketState,
        lines: &L,
        ctx: &InsertContext<'_>,
    ) -> Option<Insertion> {
        if !ctx.selected.is_empty() && ctx.selected != "{" && self.wrap_selections {
            return Some(Insertion::wrapping('{', ctx.selected, '}'));
        }
        if !is_sane_insertion(lines, ctx.cursor) {
            return None;
        }
        if char_at(ctx.line, ctx.cursor.column).is_some_and(|c| matches!(c, ']' | '}' | ')')) {
            record_auto_insert(state, ctx.cursor, ctx.line, '}');
            Some(Insertion::with_caret("{}", 0, 1))
        } else {
            record_maybe_insert(state, ctx.cursor, ctx.line, '{');
            Some(Insertion::with_caret("{", 0, 1))
        }
    }

    fn insert_opener<L: LineSource + ?Sized>(
        &self,
        state: &mut BracketState,
        lines: &L,
        ctx: &InsertContext<'_>,
        open: char,
        close: char,
    ) -> Option<Insertion> {
        if !ctx.selected.is_empty() && self.wrap_selections {
            return Some(Insertion::wrapping(open, ctx.selected, close));
        }
        if !is_sane_insertion(lines, ctx.cursor) {
            return None;
        }
        record_auto_insert(state, ctx.cursor, ctx.line, close);
        Some(Insertion::with_caret(format!("{open}{close}"), 0, 1))
    }

    fn insert_quote<L: LineSource + ?Sized>(
        &self,
        lines: &L,
        ctx: &InsertContext<'_>,
        quote: char,
    ) -> Option<Insertion> {
        let quote_str = quote.to_string();
        if !ctx.selected.is_empty()
            && ctx.selected != "'"
            && ctx.selected != "\""
            && self.wrap_selections
        {
            return Some(Insertion::wrapping(quote, ctx.selected, quote));
        }

        let column = ctx.cursor.column;
        if column > 0 && ctx.line.get(column - 1..column) == Some("\\") {
            return None;
        }

        let line_state = state_at(lines, ctx.cursor.row);
        let tokens = tokenize_line(ctx.line, line_state).tokens;

        // Walk to the token under the cursor, remembering whether an
        // unmatched quote was seen in non-string text along the way.
        let mut col = 0;
        let mut quote_pos: Option<usize> = None;
        let mut current: Option<&Token<'_>> = None;
        for token in &tokens {
            current = Some(token);
            if token.kind == TokenKind::String {
                quote_pos = None;
            } else if quote_pos.is_none() {
                quote_pos = token.text.find(quote);
            }
            if token.text.len() + col > column {
                break;
            }
            col += token.text.len();
        }

        let Some(token) = current else {
            return self.paired_quote(lines, ctx, &quote_str);
        };
        let closes_string_here = column + 1 != token.text.len() + col
            && token.text.rfind(quote) == Some(token.text.len() - 1);
        if quote_pos.is_none()
            && token.kind != TokenKind::Comment
            && (token.kind != TokenKind::String || closes_string_here)
        {
            return self.paired_quote(lines, ctx, &quote_str);
        }
        if token.kind == TokenKind::String && char_at(ctx.line, column) == Some(quote) {
            return Some(Insertion::with_caret("", 0, 1));
        }
        None
    }

    fn paired_quote<L: LineSource + ?Sized>(
        &self,
        lines: &L,
        ctx: &InsertContext<'_>,
        quote: &str,
    ) -> Option<Insertion> {
        if !is_sane_insertion(lines, ctx.cursor) {
            return None;
        }
        Some(Insertion::with_caret(format!("{quote}{quote}"), 0, 1))
    }

    /// Widen a single-character deletion to also remove the partner of a
    /// deleted opener or quote. Returns the new end of the deleted range.
    pub fn on_delete(&self, state: &mut BracketState, line: &str, start: Point, end: Point) -> Option<Point> {
        if start.row != end.row {
            return None;
        }
        let selected = line.get(start.column..end.column)?;
        let extended = Point::new(end.row, end.column + 1);
        match selected {
            "{" => {
                if char_at(line, end.column) == Some('}') {
                    return Some(extended);
                }
                forget_maybe_inserted(state);
                None
            }
            "(" => (char_at(line, start.column + 1) == Some(')')).then_some(extended),
            "[" => (char_at(line, start.column + 1) == Some(']')).then_some(extended),
            "\"" | "'" => line
                .get(start.column + 1..start.column + 2)
                .filter(|right| *right == selected)
                .map(|_| extended),
            _ => None,
        }
    }
}

fn skip_closer<L: LineSource + ?Sized>(
    state: &mut BracketState,
    lines: &L,
    ctx: &InsertContext<'_>,
    close: char,
) -> Option<Insertion> {
    if char_at(ctx.line, ctx.cursor.column) != Some(close) {
        return None;
    }
    let matching = find_opening(lines, close, ctx.cursor);
    if matching.is_some() && is_auto_inserted_closing(state, ctx.cursor, ctx.line, close) {
        pop_auto_inserted_closing(state);
        return Some(Insertion::with_caret("", 0, 1));
    }
    None
}

fn insert_newline<L: LineSource + ?Sized>(
    state: &mut BracketState,
    lines: &L,
    indent: IndentPolicy,
    ctx: &InsertContext<'_>,
) -> Option<Insertion> {
    let mut closing = String::new();
    if is_maybe_inserted_closing(state, ctx.cursor, ctx.line) {
        if let BracketState::PendingMaybeClose { count, .. } = state {
            closing = "}".repeat(*count);
        }
        *state = BracketState::None;
    }

    if char_at(ctx.line, ctx.cursor.column) != Some('}') && closing.is_empty() {
        return None;
    }
    find_opening(lines, '}', ctx.cursor)?;

    let (before, _) = split_at_column(ctx.line, ctx.cursor.column);
    let next = indent.next_line_indent(state_at(lines, ctx.cursor.row), before, ctx.tab);
    let outer = indent_of(ctx.line);
    Some(Insertion::with_caret(
        format!("\n{next}\n{outer}{closing}"),
        1,
        next.len(),
    ))
}

/// Whether an auto-inserted closer would land somewhere harmless: the cursor
/// is in (or next to) plain text or a closer, and whatever follows on the
/// line is plain text, a closer or a comment.
fn is_sane_insertion<L: LineSource + ?Sized>(lines: &L, cursor: Point) -> bool {
    let line = lines.line(cursor.row);
    let tokens = tokenize_line(&line, state_at(lines, cursor.row)).tokens;

    let kind_at = |index: Option<usize>| index.map_or(TokenKind::Text, |i| tokens[i].kind);
    let current = token_index_at(&tokens, cursor.column);
    if !kind_at(current).is_safe_insert_in() {
        let after = token_index_at(&tokens, cursor.column + 1);
        if !kind_at(after).is_safe_insert_in() {
            return false;
        }
    }

    let next = current.map_or(0, |i| i + 1);
    tokens
        .get(next)
        .is_none_or(|token| token.kind.is_safe_insert_before())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Type `text` into a single-line buffer at `column` and apply the result
    /// the way an editor would.
    fn type_at(
        behaviour: &BracketBehaviour,
        state: &mut BracketState,
        line: &mut String,
        column: &mut usize,
        text: &str,
    ) {
        let lines = [line.clone()];
        let ctx = InsertContext {
            cursor: Point::new(0, *column),
            line: line.as_str(),
            selected: "",
            tab: "  ",
        };
        match behaviour.on_insert(state, &lines[..], IndentPolicy::CStyle, &ctx, text) {
            Some(insertion) => {
                line.insert_str(*column, &insertion.text);
                *column += insertion.caret.map_or(insertion.text.len(), |c| c.column);
            }
            None => {
                line.insert_str(*column, text);
                *column += text.len();
            }
        }
    }

    #[test]
    fn paren_auto_closes_and_steps_over() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let mut line = String::from("f");
        let mut column = 1;

        type_at(&behaviour, &mut state, &mut line, &mut column, "(");
        assert_eq!((line.as_str(), column), ("f()", 2));

        type_at(&behaviour, &mut state, &mut line, &mut column, "(");
        assert_eq!((line.as_str(), column), ("f(())", 3));

        type_at(&behaviour, &mut state, &mut line, &mut column, ")");
        type_at(&behaviour, &mut state, &mut line, &mut column, ")");
        assert_eq!((line.as_str(), column), ("f(())", 5));
        assert_eq!(state, BracketState::None);
    }

    #[test]
    fn closer_typed_without_auto_insert_is_inserted() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let mut line = String::from("(x)");
        let mut column = 2;
        type_at(&behaviour, &mut state, &mut line, &mut column, ")");
        assert_eq!(line, "(x))");
    }

    #[test]
    fn no_auto_close_before_identifier() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let mut line = String::from("abc");
        let mut column = 0;
        type_at(&behaviour, &mut state, &mut line, &mut column, "(");
        assert_eq!(line, "(abc");
    }

    #[test]
    fn brace_is_recorded_for_enter() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let mut line = String::from("rule r ");
        let mut column = 7;
        type_at(&behaviour, &mut state, &mut line, &mut column, "{");
        assert_eq!(line, "rule r {");
        assert!(matches!(state, BracketState::PendingMaybeClose { count: 1, .. }));

        let lines = [line.clone()];
        let ctx = InsertContext {
            cursor: Point::new(0, 8),
            line: &line,
            selected: "",
            tab: "  ",
        };
        let insertion = behaviour.on_insert(&mut state, &lines[..], IndentPolicy::CStyle, &ctx, "\n");
        assert_eq!(insertion, Some(Insertion::with_caret("\n  \n}", 1, 2)));
        assert_eq!(state, BracketState::None);
    }

    #[test]
    fn brace_before_closer_auto_closes() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let mut line = String::from("f()");
        let mut column = 2;
        type_at(&behaviour, &mut state, &mut line, &mut column, "{");
        assert_eq!((line.as_str(), column), ("f({})", 3));
    }

    #[test]
    fn selection_is_wrapped() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let lines = ["a b c"];
        let ctx = InsertContext {
            cursor: Point::new(0, 3),
            line: lines[0],
            selected: "b",
            tab: "  ",
        };
        let insertion = behaviour.on_insert(&mut state, &lines[..], IndentPolicy::CStyle, &ctx, "[");
        assert_eq!(
            insertion,
            Some(Insertion {
                text: "[b]".to_string(),
                caret: None,
            })
        );
    }

    #[test]
    fn quotes_pair_and_step_over() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let mut line = String::from("x = ");
        let mut column = 4;

        type_at(&behaviour, &mut state, &mut line, &mut column, "\"");
        assert_eq!((line.as_str(), column), ("x = \"\"", 5));

        type_at(&behaviour, &mut state, &mut line, &mut column, "a");
        type_at(&behaviour, &mut state, &mut line, &mut column, "\"");
        assert_eq!((line.as_str(), column), ("x = \"a\"", 7));
    }

    #[test]
    fn escaped_quote_is_not_paired() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let mut line = String::from("\"a\\\"");
        let mut column = 3;
        type_at(&behaviour, &mut state, &mut line, &mut column, "\"");
        assert_eq!(line, "\"a\\\"\"");
    }

    #[test]
    fn deleting_opener_removes_partner() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::None;
        let end = behaviour.on_delete(&mut state, "f()", Point::new(0, 1), Point::new(0, 2));
        assert_eq!(end, Some(Point::new(0, 3)));

        let end = behaviour.on_delete(&mut state, "f(x)", Point::new(0, 1), Point::new(0, 2));
        assert_eq!(end, None);
    }

    #[test]
    fn deleting_unclosed_brace_forgets_it() {
        let behaviour = BracketBehaviour::default();
        let mut state = BracketState::PendingMaybeClose {
            bracket: '{',
            row: 0,
            line_snapshot: LineSnapshot {
                before: "x {".to_string(),
                after: String::new(),
            },
            count: 1,
        };
        let end = behaviour.on_delete(&mut state, "x {", Point::new(0, 2), Point::new(0, 3));
        assert_eq!(end, None);
        assert_eq!(state, BracketState::None);
    }
}
