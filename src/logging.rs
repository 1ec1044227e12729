//! Append-only event log backed by `env_logger`.
//!
//! One line per lifecycle event. `RUST_LOG` still controls the level; the
//! default is `info`.
use env_logger::{Builder, Env, Target};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

pub fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global logger writing to `log_file`.
///
/// If the file cannot be opened the logger falls back to stderr and the open
/// error is returned so the caller can report it.
pub fn init(log_file: &Path) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    let opened = match open_log_file(log_file) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
            Ok(())
        }
        Err(e) => {
            builder.target(Target::Stderr);
            Err(e)
        }
    };

    builder.init();
    opened
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn log_file_is_appended_not_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsync_transfer.log");

        writeln!(open_log_file(&path).unwrap(), "Application started").unwrap();
        writeln!(open_log_file(&path).unwrap(), "Application closed").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Application started\nApplication closed\n");
    }

    #[test]
    fn unopenable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_log_file(&dir.path().join("missing").join("x.log")).is_err());
    }
}
