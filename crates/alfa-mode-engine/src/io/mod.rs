use std::fs;
use std::path::{Path, PathBuf};

use crate::snippets::{Snippet, WILDCARD_SCOPE, parse_snippet_file};

/// Extension of snippet definition files.
pub const SNIPPET_EXTENSION: &str = "snippets";

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid snippet directory: {0}")]
    InvalidSnippetDir(String),
}

/// Snippets read from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetFile {
    pub path: PathBuf,
    /// Scope for records that don't name one: the file stem
    pub scope: String,
    pub snippets: Vec<Snippet>,
}

/// Read a snippet file and return its content
pub fn read_snippet_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Scope implied by a file name: `alfa.snippets` holds `alfa` snippets.
pub fn scope_for_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(WILDCARD_SCOPE)
        .to_string()
}

/// Read and parse one snippet file.
pub fn load_snippet_file(path: &Path) -> Result<SnippetFile, IoError> {
    let text = read_snippet_file(path)?;
    let snippets = parse_snippet_file(&text);
    log::debug!("loaded {} snippets from {}", snippets.len(), path.display());
    Ok(SnippetFile {
        path: path.to_path_buf(),
        scope: scope_for_path(path),
        snippets,
    })
}

/// Scan for snippet files below a directory
pub fn scan_snippet_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !dir.is_dir() {
        return Err(IoError::InvalidSnippetDir(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    scan_directory_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == SNIPPET_EXTENSION
        {
            files.push(path);
        }
    }

    Ok(())
}

/// Load every file, skipping ones that can't be read.
pub fn load_snippet_files<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Vec<SnippetFile> {
    paths
        .into_iter()
        .filter_map(|path| match load_snippet_file(path) {
            Ok(file) => Some(file),
            Err(err) => {
                log::warn!("skipping snippet file {}: {err}", path.display());
                None
            }
        })
        .collect()
}
