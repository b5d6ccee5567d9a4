use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid snippet file pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// User settings for the ALFA editor mode.
///
/// ```toml
/// snippet_paths = ["~/.config/alfa-mode/snippets/*.snippets"]
/// default_scope = "alfa"
/// tab_size = 2
/// soft_tabs = true
/// full_name = "Ada Lovelace"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glob patterns of snippet files; `~` and `$VAR` are expanded
    pub snippet_paths: Vec<String>,
    /// Scope for snippets whose file and record name none
    pub default_scope: String,
    pub tab_size: usize,
    pub soft_tabs: bool,
    /// Value of `$TM_FULLNAME`
    pub full_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snippet_paths: vec!["~/.config/alfa-mode/snippets/*.snippets".to_string()],
            default_scope: "alfa".to_string(),
            tab_size: 4,
            soft_tabs: true,
            full_name: String::new(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/alfa-mode");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Snippet files matched by `snippet_paths`, sorted, without duplicates.
    ///
    /// Patterns that expand to nothing contribute no files; a pattern that
    /// is not valid glob syntax is an error.
    pub fn snippet_files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut files = Vec::new();
        for pattern in &self.snippet_paths {
            let expanded = Self::expand_pattern(pattern);
            let paths = glob::glob(&expanded).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            files.extend(paths.flatten().filter(|path| path.is_file()));
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn expand_pattern(pattern: &str) -> String {
        match shellexpand::full(pattern) {
            Ok(expanded) => expanded.into_owned(),
            Err(_) => pattern.to_string(),
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    /// Resolve `~` and `$VAR` in a path given on the command line.
    pub fn expand_user_path(path: &Path) -> PathBuf {
        Self::expand_path(path).unwrap_or_else(|| path.to_path_buf())
    }
}
