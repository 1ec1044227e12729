//! Application settings loaded from `rsync_gui.json`.
//!
//! Every field is optional; a missing file yields the defaults, which invoke
//! `rsync -avh` and append to `rsync_transfer.log` in the working directory.
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the settings file location
pub const CONFIG_ENV: &str = "RSYNC_GUI_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "rsync_gui.json";
pub const DEFAULT_LOG_FILE: &str = "rsync_transfer.log";

/// Where the child's stdout/stderr go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Child shares the launcher's own streams
    #[default]
    Inherit,
    /// Lines are read by the launcher, logged, and shown in the window
    Capture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub program: String,
    pub flags: Vec<String>,
    pub log_file: PathBuf,
    pub output: OutputMode,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            program: "rsync".to_string(),
            flags: vec!["-avh".to_string()],
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            output: OutputMode::Inherit,
            window_width: 480.0,
            window_height: 360.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse settings from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings path from `RSYNC_GUI_CONFIG`, else `./rsync_gui.json`
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl Settings {
    /// Load settings, treating a missing file as "all defaults"
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.program, "rsync");
        assert_eq!(settings.flags, vec!["-avh"]);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "program": "/usr/local/bin/rsync", "output": "capture" }}"#).unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.program, "/usr/local/bin/rsync");
        assert_eq!(settings.output, OutputMode::Capture);
        assert_eq!(settings.flags, vec!["-avh"]);
        assert_eq!(settings.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        match Settings::load(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn unknown_output_mode_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "output": "syslog" }}"#).unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
