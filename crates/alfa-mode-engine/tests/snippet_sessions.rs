use alfa_mode_engine::editing::{Document, EditorHost, Position, Range, Selection};
use alfa_mode_engine::io::load_snippet_file;
use alfa_mode_engine::session::EditorSession;
use alfa_mode_engine::snippets::{Snippet, SnippetManager};
use alfa_mode_syntax::LanguageMode;
use pretty_assertions::assert_eq;

fn p(row: usize, column: usize) -> Position {
    Position::new(row, column)
}

fn session(text: &str, caret: Position) -> EditorSession<Document> {
    let mut doc = Document::new(text);
    doc.set_selection(Selection::caret(caret));
    EditorSession::new(doc, LanguageMode::alfa())
}

fn fixture_snippets() -> SnippetManager {
    let path = format!("{}/tests/fixtures/alfa.snippets", env!("CARGO_MANIFEST_DIR"));
    let file = load_snippet_file(path.as_ref()).unwrap();
    assert_eq!(file.scope, "alfa");

    let mut snippets = SnippetManager::new().with_full_name("Ada");
    snippets.register(file.snippets, Some(&file.scope));
    snippets
}

fn type_str(session: &mut EditorSession<Document>, snippets: &SnippetManager, text: &str) {
    for ch in text.chars() {
        session.type_text(snippets, &ch.to_string());
    }
}

#[test]
fn tab_traversal_visits_each_stop_then_detaches() {
    let snippets = SnippetManager::new();
    let mut session = session("", p(0, 0));
    snippets.insert_snippet(&mut session, "${1:a} ${2:b} ${3:c}");

    let mut selections = vec![session.host().selection().range()];
    while session.tab_next(1) {
        selections.push(session.host().selection().range());
    }

    assert_eq!(
        selections,
        vec![
            Range::new(p(0, 0), p(0, 1)),
            Range::new(p(0, 2), p(0, 3)),
            Range::new(p(0, 4), p(0, 5)),
            Range::point(p(0, 5)),
        ]
    );
    assert!(session.tabstops().is_none());
    assert!(!session.tab_next(1));
    assert_eq!(session.host().selection().range(), Range::point(p(0, 5)));
}

#[test]
fn literal_template_is_reindented_to_insertion_line() {
    let snippets = SnippetManager::new();

    let mut after_text = session("    x", p(0, 5));
    snippets.insert_snippet(&mut after_text, "a\nb\n\tc");
    assert_eq!(after_text.host().text(), "    xa\n    b\n        c");

    let mut inside_indent = session("    x", p(0, 2));
    snippets.insert_snippet(&mut inside_indent, "a\nb");
    assert_eq!(inside_indent.host().text(), "  a\n  b  x");
}

#[test]
fn escaped_characters_expand_to_themselves() {
    let snippets = SnippetManager::new();
    let mut session = session("", p(0, 0));
    snippets.insert_snippet(&mut session, r"\$1 \` \\ \}");
    insta::assert_snapshot!(session.host().text(), @r"$1 ` \ \}");
}

#[test]
fn mirror_is_transformed_while_typing() {
    let snippets = fixture_snippets();
    let mut session = session("mir", p(0, 3));

    assert!(snippets.expand_with_tab(&mut session));
    assert_eq!(session.host().text(), "banana bonono");
    assert_eq!(session.host().selection().range(), Range::new(p(0, 0), p(0, 6)));

    type_str(&mut session, &snippets, "xa");
    assert_eq!(session.host().text(), "xa xo");
    assert!(session.tabstops().is_some());
}

#[test]
fn policy_snippet_from_file() {
    let snippets = fixture_snippets();
    let mut session = session("pol", p(0, 3));

    assert!(snippets.expand_with_tab(&mut session));
    assert_eq!(session.host().text(), "policy name {\n    apply denyOverrides\n    \n}");
    assert_eq!(session.host().selection().range(), Range::new(p(0, 7), p(0, 11)));

    type_str(&mut session, &snippets, "p1");
    assert!(session.tab_next(1));
    assert_eq!(session.host().selection().range(), Range::new(p(1, 10), p(1, 23)));
    let choices = session.tabstops().and_then(|t| t.choices()).map(<[String]>::to_vec);
    assert_eq!(
        choices,
        Some(vec![
            "denyOverrides".to_string(),
            "permitOverrides".to_string(),
            "firstApplicable".to_string(),
        ])
    );

    assert!(session.tab_next(1));
    assert_eq!(session.host().cursor(), p(2, 4));
    assert!(session.tabstops().is_none());
    assert_eq!(session.host().marker_count(), 0);
    assert_eq!(session.host().line(0), "policy p1 {");
}

#[test]
fn wildcard_snippets_expand_in_any_scope() {
    let snippets = fixture_snippets();
    let mut session = session("  note", p(0, 6));

    assert!(snippets.expand_with_tab(&mut session));
    assert_eq!(session.host().text(), "  // NOTE(Ada): ");
    assert_eq!(session.host().selection().range(), Range::new(p(0, 10), p(0, 13)));

    let mut text_session = EditorSession::new(Document::new(""), LanguageMode::plain_text());
    assert!(snippets.get_snippet_by_name("note", &text_session).is_some());
    assert!(snippets.get_snippet_by_name("pol", &text_session).is_none());
    snippets.insert_snippet(&mut text_session, "$TM_LINE_COMMENT x");
    assert_eq!(text_session.host().text(), " x");
}

#[test]
fn reregistering_a_name_replaces_the_snippet() {
    let mut snippets = fixture_snippets();
    snippets.register([Snippet::with_tab_trigger("pol", "pol", "policy $1 {}")], Some("alfa"));
    let mut session = session("pol", p(0, 3));

    assert!(snippets.expand_with_tab(&mut session));
    assert_eq!(session.host().text(), "policy  {}");
}

#[test]
fn deletion_spanning_every_region_detaches() {
    let snippets = SnippetManager::new();
    let mut session = session("", p(0, 0));
    snippets.insert_snippet(&mut session, "${1:a} ${2:b}!");
    assert!(session.tabstops().is_some());

    session.replace(Range::new(p(0, 0), p(0, 4)), "");
    assert!(session.tabstops().is_none());
    assert_eq!(session.host().text(), "");
    assert_eq!(session.host().marker_count(), 0);
}

#[test]
fn nested_snippet_inside_active_tabstop() {
    let snippets = fixture_snippets();
    let mut session = session("", p(0, 0));
    snippets.insert_snippet(&mut session, "rule ${1:r} {\n\t$2\n}");

    snippets.insert_snippet(&mut session, "${1:x}-${2:y}");
    assert_eq!(session.host().text(), "rule x-y {\n    \n}");
    assert_eq!(session.host().selection().range(), Range::new(p(0, 5), p(0, 6)));

    assert!(session.tab_next(1));
    assert_eq!(session.host().selection().range(), Range::new(p(0, 7), p(0, 8)));
    // The inner final stop, then the outer $2
    assert!(session.tab_next(1));
    assert!(session.tab_next(1));
    assert_eq!(session.host().cursor(), p(1, 4));
    assert!(session.tabstops().is_some());
}

#[test]
fn text_typed_after_final_stop_follows_the_filled_stop() {
    let snippets = SnippetManager::new();
    let mut session = session("", p(0, 0));
    snippets.insert_snippet(&mut session, "${1:name}$0");

    type_str(&mut session, &snippets, "x");
    assert!(session.tab_next(1));
    assert!(session.tabstops().is_none());
    type_str(&mut session, &snippets, ";");

    assert_eq!(session.host().text(), "x;");
}

#[test]
fn adjacent_stops_keep_their_own_text() {
    let snippets = SnippetManager::new();
    let mut session = session("", p(0, 0));
    snippets.insert_snippet(&mut session, "${1:a}${2:b}");

    type_str(&mut session, &snippets, "x");
    assert!(session.tab_next(1));

    assert_eq!(session.host().text(), "xb");
    assert_eq!(session.host().selection().range(), Range::new(p(0, 1), p(0, 2)));
}
