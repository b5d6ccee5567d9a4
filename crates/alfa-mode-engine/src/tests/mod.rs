use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for snippet files
pub fn create_test_snippet_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a snippet file with content
pub fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file_path, content).unwrap();
    file_path
}
