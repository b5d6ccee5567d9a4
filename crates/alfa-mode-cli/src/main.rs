use alfa_mode_config::Config;
use alfa_mode_engine::editing::{Document, EditorHost, Position, Selection, TabSettings};
use alfa_mode_engine::io;
use alfa_mode_engine::session::EditorSession;
use alfa_mode_engine::snippets::SnippetManager;
use alfa_mode_syntax::{FoldStyle, FoldWidget, LanguageMode, LineState, TokenKind};
use anyhow::{Context, Result, bail};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::{env, process};

const USAGE: &str = "Usage: alfa-mode [--snippets <path>]... <command>

Commands:
  list [scope]              List registered snippets
  expand <text> [column]    Expand the snippet triggered at column (default: end of text)
  tokens <file>             Print the tokens and fold markers of an ALFA file";

#[derive(Debug, PartialEq)]
enum Command {
    List { scope: Option<String> },
    Expand { text: String, column: Option<usize> },
    Tokens { path: PathBuf },
}

#[derive(Debug, PartialEq)]
struct Args {
    snippet_paths: Vec<PathBuf>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut snippet_paths = Vec::new();
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--snippets" {
            let Some(path) = iter.next() else {
                bail!("--snippets needs a path\n\n{USAGE}");
            };
            snippet_paths.push(PathBuf::from(path));
        } else {
            rest.push(arg.as_str());
        }
    }

    let command = match rest.as_slice() {
        ["list"] => Command::List { scope: None },
        ["list", scope] => Command::List {
            scope: Some(scope.to_string()),
        },
        ["expand", text] => Command::Expand {
            text: text.to_string(),
            column: None,
        },
        ["expand", text, column] => Command::Expand {
            text: text.to_string(),
            column: Some(
                column
                    .parse()
                    .with_context(|| format!("Invalid column {column:?}"))?,
            ),
        },
        ["tokens", path] => Command::Tokens {
            path: PathBuf::from(path),
        },
        _ => bail!("{USAGE}"),
    };

    Ok(Args {
        snippet_paths,
        command,
    })
}

struct App {
    config: Config,
    snippets: SnippetManager,
}

impl App {
    fn new(config: Config, extra_paths: &[PathBuf]) -> Result<Self> {
        let mut files = config.snippet_files()?;
        for path in extra_paths {
            let path = Config::expand_user_path(path);
            if path.is_dir() {
                files.extend(io::scan_snippet_files(&path)?);
            } else {
                files.push(path);
            }
        }

        let mut snippets = SnippetManager::new().with_full_name(config.full_name.clone());
        for file in io::load_snippet_files(files.iter().map(PathBuf::as_path)) {
            snippets.register(file.snippets, Some(&file.scope));
        }
        log::info!("{} snippets registered", snippets.registry().len());

        Ok(Self { config, snippets })
    }

    fn mode(&self) -> LanguageMode {
        LanguageMode {
            id: self.config.default_scope.clone(),
            ..LanguageMode::alfa()
        }
    }

    fn list(&self, scope: Option<&str>) -> Result<String> {
        let registry = self.snippets.registry();
        let mut out = String::new();
        for name in registry.scopes() {
            if scope.is_some_and(|s| s != name) {
                continue;
            }
            for snippet in registry.snippets(name) {
                writeln!(
                    out,
                    "{name}\t{}\t{}",
                    snippet.tab_trigger.as_deref().unwrap_or("-"),
                    snippet.name.as_deref().unwrap_or_default()
                )?;
            }
        }
        Ok(out)
    }

    fn expand(&self, text: &str, column: Option<usize>) -> Result<String> {
        let first_line = text.lines().next().unwrap_or_default();
        let column = column.unwrap_or(first_line.len());
        if !first_line.is_char_boundary(column) {
            bail!("Column {column} is outside {first_line:?}");
        }

        let tab_settings = TabSettings {
            soft_tabs: self.config.soft_tabs,
            tab_size: self.config.tab_size,
        };
        let mut doc = Document::new(text).with_tab_settings(tab_settings);
        doc.set_selection(Selection::caret(Position::new(0, column)));
        let mut session = EditorSession::new(doc, self.mode());

        if !self.snippets.expand_with_tab(&mut session) {
            bail!("No snippet matches before column {column} of {first_line:?}");
        }

        let mut out = String::new();
        writeln!(out, "{}", session.host().text())?;
        if let Some(tabstops) = session.tabstops() {
            for group in tabstops.tabstops() {
                let regions: Vec<String> = group
                    .regions
                    .iter()
                    .map(|r| format!("{}-{}", r.range.start, r.range.end))
                    .collect();
                writeln!(out, "${}\t{}", group.id, regions.join(" "))?;
            }
        } else {
            writeln!(out, "cursor\t{}", session.host().cursor())?;
        }
        Ok(out)
    }

    fn tokens(&self, path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mode = LanguageMode::alfa();

        let mut out = String::new();
        let mut state = LineState::Start;
        for (row, line) in text.lines().enumerate() {
            let tokens = mode.tokenize(line, state);
            let marker = match mode.folding.and_then(|f| f.fold_widget(line, FoldStyle::MarkBeginEnd)) {
                Some(FoldWidget::Start) => '+',
                Some(FoldWidget::End) => '-',
                None => ' ',
            };
            let classes: Vec<String> = tokens
                .tokens
                .iter()
                .filter(|t| t.kind != TokenKind::Whitespace)
                .map(|t| format!("{}({})", t.kind.class(), t.text))
                .collect();
            writeln!(out, "{:>4} {marker} {}", row + 1, classes.join(" "))?;
            state = tokens.state;
        }
        Ok(out)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Config file location: {}", Config::config_path().display());
            process::exit(1);
        }
    };

    let app = App::new(config, &args.snippet_paths)?;
    let output = match &args.command {
        Command::List { scope } => app.list(scope.as_deref())?,
        Command::Expand { text, column } => app.expand(text, *column)?,
        Command::Tokens { path } => app.tokens(path)?,
    };
    print!("{output}");
    Ok(())
}
