//! Parser for snippet definition files.
//!
//! ```text
//! # comment
//! snippet rule
//!     rule ${1:name} {
//!         $0
//!     }
//! name wrap in parens
//! regex /\b/\(/\)/
//!     (${1:$TM_SELECTED_TEXT})
//! {"name": "policy", "tabTrigger": "pol", "content": "policy ${1} {\n}"}
//! ```
//!
//! Body lines start with a tab. A body block ends the snippet being
//! described; the metadata lines above it belong to that snippet. A JSON
//! object line is a complete snippet on its own and may continue over
//! several lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::snippets::registry::Snippet;

static REGEX_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/((?:[^/\\]|\\.)*)").expect("valid regex part pattern"));

static FIRST_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\S*").expect("valid word pattern"));

/// Parse a snippet file into records, in file order. Malformed lines are
/// skipped.
pub fn parse_snippet_file(text: &str) -> Vec<Snippet> {
    let text = text.replace('\r', "");
    let lines: Vec<&str> = text.split('\n').collect();

    let mut snippets = Vec::new();
    let mut current = Snippet::default();
    let mut row = 0;

    while row < lines.len() {
        let line = lines[row];

        if line.starts_with('#') {
            row += 1;
        } else if line.starts_with('{') {
            row = parse_json(&lines, row, &mut snippets, &mut current);
        } else if line.starts_with('\t') {
            let (body, next) = body_block(&lines, row);
            current.content = Some(body);
            snippets.push(std::mem::take(&mut current));
            row = next;
        } else {
            metadata(line, &mut current);
            row += 1;
        }
    }
    snippets
}

/// Parse a JSON record starting at `row`, extending it over following lines
/// until it parses. Returns the row after the record.
fn parse_json(lines: &[&str], row: usize, snippets: &mut Vec<Snippet>, current: &mut Snippet) -> usize {
    let mut source = String::new();
    for (end, line) in lines.iter().enumerate().skip(row) {
        if end > row {
            source.push('\n');
        }
        source.push_str(line);
        if !line.trim_end().ends_with('}') {
            continue;
        }
        if let Ok(snippet) = serde_json::from_str::<Snippet>(&source) {
            snippets.push(snippet);
            *current = Snippet::default();
            return end + 1;
        }
    }
    log::debug!("skipping malformed snippet record at line {}", row + 1);
    row + 1
}

/// Collect a run of tab-indented lines; blank lines are kept when more body
/// lines follow. Returns the body and the row after it.
fn body_block(lines: &[&str], row: usize) -> (String, usize) {
    let mut body: Vec<&str> = Vec::new();
    let mut end = row;
    let mut next = row;
    while next < lines.len() {
        let line = lines[next];
        if let Some(stripped) = line.strip_prefix('\t') {
            if !body.is_empty() {
                body.extend(std::iter::repeat_n("", next - end - 1));
            }
            body.push(stripped);
            end = next;
        } else if !line.trim().is_empty() {
            break;
        }
        next += 1;
    }
    (body.join("\n"), end + 1)
}

fn metadata(line: &str, snippet: &mut Snippet) {
    let Some((key, value)) = line.split_once(' ') else {
        return;
    };
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return;
    }

    match key {
        "regex" => {
            let mut parts = REGEX_PART
                .captures_iter(value)
                .map(|caps| caps.get(1).map(|m| m.as_str().to_string()).filter(|p| !p.is_empty()));
            snippet.guard = parts.next().flatten();
            snippet.trigger = parts.next().flatten();
            snippet.end_trigger = parts.next().flatten();
            snippet.end_guard = parts.next().flatten();
        }
        "snippet" => {
            let trigger = FIRST_WORD.find(value).map_or("", |m| m.as_str());
            snippet.tab_trigger = Some(trigger.to_string());
            if snippet.name.is_none() {
                snippet.name = Some(value.to_string());
            }
        }
        _ => {
            let value = value.to_string();
            match key {
                "name" => snippet.name = Some(value),
                "scope" => snippet.scope = Some(value),
                "tabTrigger" => snippet.tab_trigger = Some(value),
                "trigger" => snippet.trigger = Some(value),
                "guard" => snippet.guard = Some(value),
                "endTrigger" => snippet.end_trigger = Some(value),
                "endGuard" => snippet.end_guard = Some(value),
                "content" => snippet.content = Some(value),
                _ => {
                    snippet.extra.insert(key.to_string(), serde_json::Value::String(value));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_snippet_blocks() {
        let text = "# ALFA snippets\r\nsnippet rule main rule\r\n\trule ${1:name} {\r\n\t\t$0\r\n\t}\r\nsnippet pol\r\n\tpolicy $1 {}\r\n";
        let snippets = parse_snippet_file(text);

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].name.as_deref(), Some("rule main rule"));
        assert_eq!(snippets[0].tab_trigger.as_deref(), Some("rule"));
        assert_eq!(snippets[0].content(), "rule ${1:name} {\n\t$0\n}");
        assert_eq!(snippets[1].name.as_deref(), Some("pol"));
        assert_eq!(snippets[1].content(), "policy $1 {}");
    }

    #[test]
    fn test_blank_lines_inside_body_are_kept() {
        let text = "snippet a\n\tone\n\n\n\ttwo\n\nsnippet b\n\tthree";
        let snippets = parse_snippet_file(text);
        assert_eq!(snippets[0].content(), "one\n\n\ntwo");
        assert_eq!(snippets[1].content(), "three");
    }

    #[test]
    fn test_regex_line_fills_fields_positionally() {
        let snippets = parse_snippet_file("name paren\nregex /\\b/\\(/\\)/\n\t($1)");
        let snippet = &snippets[0];
        assert_eq!(snippet.name.as_deref(), Some("paren"));
        assert_eq!(snippet.guard.as_deref(), Some(r"\b"));
        assert_eq!(snippet.trigger.as_deref(), Some(r"\("));
        assert_eq!(snippet.end_trigger.as_deref(), Some(r"\)"));
        assert_eq!(snippet.end_guard, None);
    }

    #[test]
    fn test_regex_line_with_empty_guard() {
        let snippets = parse_snippet_file("regex //x/\n\tbody");
        assert_eq!(snippets[0].guard, None);
        assert_eq!(snippets[0].trigger.as_deref(), Some("x"));
    }

    #[test]
    fn test_json_records() {
        let text = concat!(
            "{\"name\": \"pol\", \"tabTrigger\": \"pol\", \"content\": \"policy\"}\n",
            "{\"name\": \"multi\",\n",
            " \"content\": \"x\"}\n",
            "{not json}\n",
            "snippet after\n",
            "\tz"
        );
        let snippets = parse_snippet_file(text);
        let names: Vec<_> = snippets.iter().map(|s| s.name.clone().unwrap_or_default()).collect();
        assert_eq!(names, vec!["pol", "multi", "after"]);
        assert_eq!(snippets[1].content(), "x");
    }

    #[test]
    fn test_json_record_replaces_pending_metadata() {
        let snippets = parse_snippet_file("scope alfa\n{\"name\": \"j\"}\nsnippet t\n\tbody");
        assert_eq!(snippets[0].scope, None);
        assert_eq!(snippets[1].scope, None);
    }

    #[test]
    fn test_known_and_unknown_keys() {
        let snippets = parse_snippet_file("scope alfa\nendGuard \\s\ndescription wraps things\n\tbody");
        let snippet = &snippets[0];
        assert_eq!(snippet.scope.as_deref(), Some("alfa"));
        assert_eq!(snippet.end_guard.as_deref(), Some(r"\s"));
        assert_eq!(
            snippet.extra.get("description"),
            Some(&serde_json::Value::String("wraps things".to_string()))
        );
    }
}
