use std::sync::LazyLock;

use regex::Regex;

use crate::brackets::{LineSource, Point, find_closing, find_opening};

static START_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\{|\[)[^\}\]]*$|^\s*(/\*)").expect("valid fold start pattern")
});

static STOP_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\[\{]*(\}|\])|^[\s\*]*(\*/)").expect("valid fold stop pattern")
});

/// Whether fold widgets are shown on block ends as well as block starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FoldStyle {
    #[default]
    MarkBegin,
    MarkBeginEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldWidget {
    Start,
    End,
}

/// A foldable span, from just after the opener to just before the closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldRange {
    pub start: Point,
    pub end: Point,
}

/// Folding on `{`/`[` blocks and `/* */` comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldMode;

impl FoldMode {
    pub fn fold_widget(&self, line: &str, style: FoldStyle) -> Option<FoldWidget> {
        if START_MARKER.is_match(line) {
            return Some(FoldWidget::Start);
        }
        if style == FoldStyle::MarkBeginEnd && STOP_MARKER.is_match(line) {
            return Some(FoldWidget::End);
        }
        None
    }

    pub fn fold_range<L: LineSource + ?Sized>(&self, lines: &L, row: usize, style: FoldStyle) -> Option<FoldRange> {
        let line = lines.line(row);

        if let Some(caps) = START_MARKER.captures(&line) {
            let whole = caps.get(0)?;
            if let Some(bracket) = caps.get(1) {
                let opener = bracket.as_str().chars().next()?;
                return self.opening_bracket_block(lines, opener, Point::new(row, bracket.start()));
            }
            return comment_range_forward(lines, Point::new(row, whole.end()));
        }

        if style != FoldStyle::MarkBeginEnd {
            return None;
        }

        let caps = STOP_MARKER.captures(&line)?;
        let whole = caps.get(0)?;
        if let Some(bracket) = caps.get(1) {
            let closer = bracket.as_str().chars().next()?;
            let mut start = find_opening(lines, closer, Point::new(row, bracket.start()))?;
            start.column += 1;
            return Some(FoldRange {
                start,
                end: Point::new(row, bracket.start()),
            });
        }
        comment_range_backward(lines, Point::new(row, whole.end()))
    }

    fn opening_bracket_block<L: LineSource + ?Sized>(
        &self,
        lines: &L,
        opener: char,
        at: Point,
    ) -> Option<FoldRange> {
        let start = Point::new(at.row, at.column + 1);
        let mut end = find_closing(lines, opener, start)?;

        // A closer that opens the next block (`} else {`) stays visible.
        if end.row > start.row && self.fold_widget(&lines.line(end.row), FoldStyle::MarkBegin) == Some(FoldWidget::Start) {
            end.row -= 1;
            end.column = lines.line(end.row).len();
        }
        Some(FoldRange { start, end })
    }
}

fn comment_range_forward<L: LineSource + ?Sized>(lines: &L, start: Point) -> Option<FoldRange> {
    for row in start.row..lines.line_count() {
        let line = lines.line(row);
        let from = if row == start.row { start.column } else { 0 };
        if let Some(close) = line.get(from..).and_then(|rest| rest.find("*/")) {
            if row == start.row {
                return None;
            }
            return Some(FoldRange {
                start,
                end: Point::new(row, from + close),
            });
        }
    }
    None
}

fn comment_range_backward<L: LineSource + ?Sized>(lines: &L, end: Point) -> Option<FoldRange> {
    let end = Point::new(end.row, end.column.saturating_sub(2));
    for row in (0..end.row).rev() {
        if let Some(open) = lines.line(row).rfind("/*") {
            return Some(FoldRange {
                start: Point::new(row, open + 2),
                end,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("policy p {", FoldStyle::MarkBegin, Some(FoldWidget::Start))]
    #[case("  /* doc", FoldStyle::MarkBegin, Some(FoldWidget::Start))]
    #[case("  }", FoldStyle::MarkBegin, None)]
    #[case("  }", FoldStyle::MarkBeginEnd, Some(FoldWidget::End))]
    #[case("  { x }", FoldStyle::MarkBeginEnd, None)]
    #[case("} else {", FoldStyle::MarkBegin, Some(FoldWidget::Start))]
    #[case("permit", FoldStyle::MarkBeginEnd, None)]
    fn widgets(#[case] line: &str, #[case] style: FoldStyle, #[case] expected: Option<FoldWidget>) {
        assert_eq!(FoldMode.fold_widget(line, style), expected);
    }

    #[test]
    fn brace_block_range() {
        let lines = ["policy p {", "  rule r {", "  }", "}"];
        let range = FoldMode.fold_range(&lines[..], 0, FoldStyle::MarkBegin);
        assert_eq!(
            range,
            Some(FoldRange {
                start: Point::new(0, 10),
                end: Point::new(3, 0),
            })
        );
    }

    #[test]
    fn chained_block_keeps_closer_line_visible() {
        let lines = ["a {", "  x", "} b {", "  y", "}"];
        let range = FoldMode.fold_range(&lines[..], 0, FoldStyle::MarkBegin);
        assert_eq!(
            range,
            Some(FoldRange {
                start: Point::new(0, 3),
                end: Point::new(1, 3),
            })
        );
    }

    #[test]
    fn closing_brace_folds_back_to_opener() {
        let lines = ["rule r {", "  permit", "}"];
        let range = FoldMode.fold_range(&lines[..], 2, FoldStyle::MarkBeginEnd);
        assert_eq!(
            range,
            Some(FoldRange {
                start: Point::new(0, 8),
                end: Point::new(2, 0),
            })
        );
        assert_eq!(FoldMode.fold_range(&lines[..], 2, FoldStyle::MarkBegin), None);
    }

    #[test]
    fn block_comment_range() {
        let lines = ["/* header", " * text", " */", "policy p {}"];
        let range = FoldMode.fold_range(&lines[..], 0, FoldStyle::MarkBegin);
        assert_eq!(
            range,
            Some(FoldRange {
                start: Point::new(0, 2),
                end: Point::new(2, 1),
            })
        );
    }
}
