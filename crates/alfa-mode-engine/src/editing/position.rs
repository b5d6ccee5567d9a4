//! Row/column positions, ranges and the document change events that move them.
//!
//! Columns are byte offsets within a line. Every edit reaches the core as one
//! or more [`Change`] values, and anything that tracks a location in the
//! document (selections, highlight markers, tabstop regions) is carried through
//! the edit with [`Position::transform`] / [`Range::transform`].

use std::fmt;

/// A location in the document: 0-based row, byte column within the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Interpret `self` as relative to `origin`: rows add, and on the first
    /// row the column is offset by the origin column.
    pub fn offset_from(self, origin: Position) -> Position {
        if self.row == 0 {
            Position::new(origin.row, origin.column + self.column)
        } else {
            Position::new(origin.row + self.row, self.column)
        }
    }

    /// Carry this position through `change`.
    ///
    /// On insertion exactly at the position, [`Bias::Left`] keeps it in place
    /// and [`Bias::Right`] moves it past the inserted text. A position inside
    /// a removed span collapses to the start of the removal.
    pub fn transform(self, change: &Change, bias: Bias) -> Position {
        let Change { action, start, end } = *change;
        match action {
            ChangeAction::Insert => {
                if self < start || (self == start && bias == Bias::Left) {
                    self
                } else if self.row == start.row {
                    Position::new(end.row, end.column + (self.column - start.column))
                } else {
                    Position::new(self.row + (end.row - start.row), self.column)
                }
            }
            ChangeAction::Remove => {
                if self <= start {
                    self
                } else if self < end {
                    start
                } else if self.row == end.row {
                    Position::new(start.row, start.column + (self.column - end.column))
                } else {
                    Position::new(self.row - (end.row - start.row), self.column)
                }
            }
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Which way a position moves when text is inserted exactly on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Left,
    Right,
}

/// A span between two positions. `start <= end` for any well-formed range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub const fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Inclusive at both ends, so a caret sitting on either boundary counts.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// True when `[start, end]` lies within this range.
    pub fn covers(&self, start: Position, end: Position) -> bool {
        self.start <= start && end <= self.end
    }

    /// Carry the range through `change`: the start sticks on insertion at its
    /// position and the end grows, so text typed at either boundary lands
    /// inside the range.
    pub fn transform(&self, change: &Change) -> Range {
        self.transform_biased(change, Bias::Left, Bias::Right)
    }

    /// Carry the range through `change` with explicit boundary biases.
    pub fn transform_biased(&self, change: &Change, start: Bias, end: Bias) -> Range {
        Range {
            start: self.start.transform(change, start),
            end: self.end.transform(change, end),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Insert,
    Remove,
}

/// One document edit as reported by the host.
///
/// For an insertion `start..end` is where the new text now sits; for a removal
/// it is the span that was removed, in coordinates from before the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub action: ChangeAction,
    pub start: Position,
    pub end: Position,
}

impl Change {
    pub fn insert(start: Position, end: Position) -> Self {
        Self {
            action: ChangeAction::Insert,
            start,
            end,
        }
    }

    pub fn remove(start: Position, end: Position) -> Self {
        Self {
            action: ChangeAction::Remove,
            start,
            end,
        }
    }

    pub fn is_removal(&self) -> bool {
        self.action == ChangeAction::Remove
    }

    /// The events replacing `range` with `text` produces (removal first, in
    /// pre-edit coordinates) and where the inserted text ends.
    pub fn replacement(range: Range, text: &str) -> (Vec<Change>, Position) {
        let mut changes = Vec::with_capacity(2);
        if !range.is_empty() {
            changes.push(Change::remove(range.start, range.end));
        }
        let end = Change::end_of_insert(range.start, text);
        if !text.is_empty() {
            changes.push(Change::insert(range.start, end));
        }
        (changes, end)
    }

    /// End position of `text` inserted at `start`.
    pub fn end_of_insert(start: Position, text: &str) -> Position {
        match text.rfind('\n') {
            Some(last_newline) => Position::new(
                start.row + text.matches('\n').count(),
                text.len() - last_newline - 1,
            ),
            None => Position::new(start.row, start.column + text.len()),
        }
    }
}
