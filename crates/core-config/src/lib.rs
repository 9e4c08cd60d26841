//! Configuration loading and parsing for `tsm.toml`.
//!
//! The file names the DSL documents to load plus logging and buffer
//! defaults. Unknown fields are tolerated so the format can evolve
//! without breaking older files. Discovery order: explicit path, then
//! `./tsm.toml`, then `<config_dir>/tsm/tsm.toml`; a missing file yields
//! the defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "tsm.toml";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct DocumentsConfig {
    /// Board instruction document (circuits + hops).
    #[serde(default)]
    pub board: Option<PathBuf>,
    /// Renderings instruction document (screens).
    #[serde(default)]
    pub renderings: Option<PathBuf>,
    /// Name of the screen inside the renderings document that serves as
    /// the shared footer template instead of the built-in status bar.
    #[serde(default)]
    pub footer_screen: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// tracing EnvFilter directive, e.g. "info" or "core_tsi=debug".
    #[serde(default = "LoggingConfig::default_filter")]
    pub filter: String,
    /// Log file path; logging to the terminal would fight the renderer.
    #[serde(default = "LoggingConfig::default_file")]
    pub file: PathBuf,
}

impl LoggingConfig {
    fn default_filter() -> String {
        "info".to_string()
    }

    fn default_file() -> PathBuf {
        PathBuf::from("tsm.log")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
            file: Self::default_file(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuffersConfig {
    /// Capacity used when a `_buffer` figure declares none.
    #[serde(default = "BuffersConfig::default_capacity")]
    pub default_capacity: usize,
}

impl BuffersConfig {
    fn default_capacity() -> usize {
        1000
    }
}

impl Default for BuffersConfig {
    fn default() -> Self {
        Self {
            default_capacity: Self::default_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub buffers: BuffersConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Original file text, when one was found.
    pub raw: Option<String>,
    pub file: ConfigFile,
    /// Where the config was loaded from; relative document paths resolve
    /// against its parent directory.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Resolve a document path against the config file's directory.
    pub fn resolve_document(&self, doc: &Path) -> PathBuf {
        if doc.is_absolute() {
            return doc.to_path_buf();
        }
        match self.path.as_ref().and_then(|p| p.parent()) {
            Some(dir) => dir.join(doc),
            None => doc.to_path_buf(),
        }
    }
}

fn discover() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    let dir = dirs::config_dir()?;
    let candidate = dir.join("tsm").join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Load configuration; `override_path` skips discovery entirely.
pub fn load_from(override_path: Option<&Path>) -> Result<Config> {
    let path = match override_path {
        Some(p) => Some(p.to_path_buf()),
        None => discover(),
    };

    let Some(path) = path else {
        info!(target: "config", "no config file found, using defaults");
        return Ok(Config::default());
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&raw)
        .with_context(|| format!("parsing config file {}", path.display()))?;

    info!(target: "config", path = %path.display(), "config loaded");
    Ok(Config {
        raw: Some(raw),
        file,
        path: Some(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut f = fs::File::create(&path).expect("create");
        f.write_all(body.as_bytes()).expect("write");
        path
    }

    #[test]
    fn parses_documents_and_logging() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            dir.path(),
            r#"
            [documents]
            board = "board.tsm"
            renderings = "screens.tsm"
            footer_screen = "footer"

            [logging]
            filter = "debug"
            file = "out.log"
            "#,
        );
        let cfg = load_from(Some(&path)).expect("load");
        assert_eq!(
            cfg.file.documents.board.as_deref(),
            Some(Path::new("board.tsm"))
        );
        assert_eq!(cfg.file.documents.footer_screen.as_deref(), Some("footer"));
        assert_eq!(cfg.file.logging.filter, "debug");
        // Relative documents resolve against the config directory.
        let resolved = cfg.resolve_document(Path::new("board.tsm"));
        assert_eq!(resolved, dir.path().join("board.tsm"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "");
        let cfg = load_from(Some(&path)).expect("load");
        assert!(cfg.file.documents.board.is_none());
        assert_eq!(cfg.file.logging.filter, "info");
        assert_eq!(cfg.file.buffers.default_capacity, 1000);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "[future]\nshiny = true\n");
        assert!(load_from(Some(&path)).is_ok());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "[documents\nboard = ");
        assert!(load_from(Some(&path)).is_err());
    }
}
