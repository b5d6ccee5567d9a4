//! Bracket matching over tokenized lines.
//!
//! Only characters inside bracket tokens count, so brackets in strings and
//! comments are ignored. Each search tracks a single bracket pair.

use crate::lexer::{LineState, TokenKind, tokenize_line};

/// A row/column location; columns are byte offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// Read access to the lines of a document.
pub trait LineSource {
    fn line_count(&self) -> usize;

    /// Text of `row` without its terminator; empty past the end.
    fn line(&self, row: usize) -> String;
}

impl<T: AsRef<str>> LineSource for [T] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, row: usize) -> String {
        self.get(row).map(|l| l.as_ref().to_string()).unwrap_or_default()
    }
}

impl<T: AsRef<str>> LineSource for Vec<T> {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, row: usize) -> String {
        self.as_slice().line(row)
    }
}

/// The opening bracket for a closer, or the closer for an opener.
pub fn partner(bracket: char) -> Option<char> {
    match bracket {
        '(' => Some(')'),
        ')' => Some('('),
        '[' => Some(']'),
        ']' => Some('['),
        '{' => Some('}'),
        '}' => Some('{'),
        _ => None,
    }
}

/// Tokenizer state at the start of `row`.
pub fn state_at<L: LineSource + ?Sized>(lines: &L, row: usize) -> LineState {
    let mut state = LineState::Start;
    for r in 0..row.min(lines.line_count()) {
        state = tokenize_line(&lines.line(r), state).state;
    }
    state
}

/// Bracket characters of a line with their columns, plus the next line state.
fn bracket_chars(line: &str, state: LineState) -> (Vec<(usize, char)>, LineState) {
    let tokens = tokenize_line(line, state);
    let chars = tokens
        .tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::LParen | TokenKind::RParen))
        .flat_map(|t| t.text.char_indices().map(move |(i, c)| (t.start + i, c)))
        .collect();
    (chars, tokens.state)
}

/// Find the bracket opening `closer`, searching backwards from just before
/// `before`.
pub fn find_opening<L: LineSource + ?Sized>(lines: &L, closer: char, before: Point) -> Option<Point> {
    let opener = partner(closer)?;
    let last_row = before.row.min(lines.line_count().checked_sub(1)?);

    let mut rows = Vec::with_capacity(last_row + 1);
    let mut state = LineState::Start;
    for row in 0..=last_row {
        let (chars, next) = bracket_chars(&lines.line(row), state);
        rows.push(chars);
        state = next;
    }

    let mut depth = 1usize;
    for (row, chars) in rows.iter().enumerate().rev() {
        for &(column, c) in chars.iter().rev() {
            if row == before.row && column >= before.column {
                continue;
            }
            if c == closer {
                depth += 1;
            } else if c == opener {
                depth -= 1;
                if depth == 0 {
                    return Some(Point::new(row, column));
                }
            }
        }
    }
    None
}

/// Find the bracket closing `opener`, searching forwards from `from`.
pub fn find_closing<L: LineSource + ?Sized>(lines: &L, opener: char, from: Point) -> Option<Point> {
    let closer = partner(opener)?;
    let mut state = state_at(lines, from.row);
    let mut depth = 1usize;

    for row in from.row..lines.line_count() {
        let (chars, next) = bracket_chars(&lines.line(row), state);
        state = next;
        for (column, c) in chars {
            if row == from.row && column < from.column {
                continue;
            }
            if c == opener {
                depth += 1;
            } else if c == closer {
                depth -= 1;
                if depth == 0 {
                    return Some(Point::new(row, column));
                }
            }
        }
    }
    None
}
