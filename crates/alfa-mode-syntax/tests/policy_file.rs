use alfa_mode_syntax::{
    FoldMode, FoldRange, FoldStyle, LanguageMode, LineState, OutdentEdit, Point, TokenKind, find_closing, find_opening,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const POLICY: [&str; 7] = [
    "/* rules {",
    "   for the archive */",
    "policy archive {",
    "    rule r {",
    "        permit",
    "    }",
    "}",
];

#[test]
fn tokenizing_a_file_carries_comment_state() {
    let mode = LanguageMode::alfa();
    let mut state = LineState::Start;
    let mut states = Vec::new();

    for line in POLICY {
        let tokens = mode.tokenize(line, state);
        let rebuilt: String = tokens.tokens.iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, line);
        state = tokens.state;
        states.push(state);
    }

    assert_eq!(states[0], LineState::BlockComment);
    assert!(states[1..].iter().all(|s| *s == LineState::Start));

    let second = mode.tokenize(POLICY[1], LineState::BlockComment);
    assert_eq!(second.tokens[0].kind, TokenKind::Comment);
}

#[test]
fn braces_in_comments_do_not_pair() {
    assert_eq!(find_closing(&POLICY[..], '{', Point::new(2, 16)), Some(Point::new(6, 0)));
    assert_eq!(find_opening(&POLICY[..], '}', Point::new(6, 0)), Some(Point::new(2, 15)));
}

#[test]
fn policy_block_folds_to_its_closer() {
    let range = FoldMode.fold_range(&POLICY[..], 2, FoldStyle::MarkBegin);
    assert_eq!(
        range,
        Some(FoldRange {
            start: Point::new(2, 16),
            end: Point::new(6, 0),
        })
    );
}

#[rstest]
#[case::after_rule_opener(3, "        ")]
#[case::inside_rule(4, "        ")]
#[case::after_rule_closer(5, "    ")]
fn next_line_indent_follows_nesting(#[case] row: usize, #[case] expected: &str) {
    let mode = LanguageMode::alfa();
    assert_eq!(mode.next_line_indent(&POLICY[..], row, POLICY[row], "    "), expected);
}

#[test]
fn misindented_closer_is_outdented_to_its_rule() {
    let mode = LanguageMode::alfa();
    let mut lines = POLICY.map(str::to_string).to_vec();
    lines[5] = "        }".to_string();

    assert!(mode.check_outdent("        ", "}"));
    assert_eq!(
        mode.auto_outdent(&lines, 5),
        Some(OutdentEdit {
            row: 5,
            end_column: 8,
            indent: "    ".to_string(),
        })
    );
}
