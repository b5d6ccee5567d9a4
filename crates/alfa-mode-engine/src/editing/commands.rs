use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use crate::editing::{Change, Document, Position, Range};

/// Edits that can be applied to the document
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText { at: Position, text: String },
    DeleteRange { range: Range },
    ReplaceRange { range: Range, text: String },
}

impl Cmd {
    /// The range being replaced and the replacement text.
    fn parts(&self) -> (Range, &str) {
        match self {
            Cmd::InsertText { at, text } => (Range::point(*at), text),
            Cmd::DeleteRange { range } => (*range, ""),
            Cmd::ReplaceRange { range, text } => (*range, text),
        }
    }
}

/// Compile a command into a delta
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Delta<RopeInfo> {
    let (range, text) = cmd.parts();
    let start = doc.offset_of(range.start);
    let end = doc.offset_of(range.end).max(start);

    let mut builder = Builder::new(doc.len());
    if text.is_empty() {
        builder.delete(start..end);
    } else {
        builder.replace(start..end, Rope::from(text));
    }
    builder.build()
}

/// The change events a command produces, in the order a host reports them:
/// the removal (old coordinates) first, then the insertion.
pub(crate) fn changes_for_command(doc: &Document, cmd: &Cmd) -> (Vec<Change>, Position) {
    let (range, text) = cmd.parts();
    let start = doc.clip(range.start);
    let end = doc.clip(range.end).max(start);

    Change::replacement(Range::new(start, end), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replace_reports_removal_then_insertion() {
        let doc = Document::new("hello world");
        let cmd = Cmd::ReplaceRange {
            range: Range::new(Position::new(0, 6), Position::new(0, 11)),
            text: "there\nfriend".to_string(),
        };
        let (changes, end) = changes_for_command(&doc, &cmd);

        assert_eq!(
            changes,
            vec![
                Change::remove(Position::new(0, 6), Position::new(0, 11)),
                Change::insert(Position::new(0, 6), Position::new(1, 6)),
            ]
        );
        assert_eq!(end, Position::new(1, 6));
    }

    #[test]
    fn empty_insert_reports_nothing() {
        let doc = Document::new("abc");
        let cmd = Cmd::InsertText {
            at: Position::new(0, 1),
            text: String::new(),
        };
        let (changes, end) = changes_for_command(&doc, &cmd);
        assert!(changes.is_empty());
        assert_eq!(end, Position::new(0, 1));
    }

    #[test]
    fn delete_compiles_to_shorter_rope() {
        let doc = Document::new("abcdef");
        let delta = compile_command(
            &doc,
            &Cmd::DeleteRange {
                range: Range::new(Position::new(0, 1), Position::new(0, 4)),
            },
        );
        let rope = delta.apply(&Rope::from("abcdef"));
        assert_eq!(rope.to_string(), "aef");
    }
}
