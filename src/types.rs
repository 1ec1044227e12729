/// Shared types and event definitions for rsync-gui
use crate::transfer::TransferError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Source and destination chosen for one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl TransferRequest {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    /// Both paths must be non-empty
    pub fn validate(&self) -> Result<(), TransferError> {
        if is_blank(&self.source) || is_blank(&self.dest) {
            return Err(TransferError::Validation);
        }
        Ok(())
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// Directories the user has picked so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub source: Option<PathBuf>,
    pub dest: Option<PathBuf>,
}

impl Selection {
    /// Missing selections become empty paths and fail validation in `start`
    pub fn to_request(&self) -> TransferRequest {
        TransferRequest::new(
            self.source.clone().unwrap_or_default(),
            self.dest.clone().unwrap_or_default(),
        )
    }
}

/// Lifecycle updates from the transfer task to the GUI
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// External tool was spawned with this command line
    Started { id: Uuid, command: String },
    /// One line of captured stdout/stderr
    Output { id: Uuid, line: String },
    /// Sent exactly once per accepted `start`
    Finished {
        id: Uuid,
        result: Result<(), TransferError>,
    },
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Error,
}

/// A (title, message) pair shown in a dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: "Success".to_string(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(err: &TransferError) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: "Error".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_paths_fail_validation() {
        assert_eq!(
            TransferRequest::new("", "/tmp/b").validate(),
            Err(TransferError::Validation)
        );
        assert_eq!(
            TransferRequest::new("/tmp/a", "").validate(),
            Err(TransferError::Validation)
        );
        assert!(TransferRequest::new("/tmp/a", "/tmp/b").validate().is_ok());
    }

    #[test]
    fn partial_selection_yields_invalid_request() {
        let selection = Selection {
            source: Some(PathBuf::from("/tmp/a")),
            dest: None,
        };
        let request = selection.to_request();
        assert_eq!(request.source, PathBuf::from("/tmp/a"));
        assert_eq!(request.validate(), Err(TransferError::Validation));
    }

    #[test]
    fn error_notification_uses_error_text() {
        let note = Notification::error(&TransferError::Conflict);
        assert_eq!(note.kind, NotificationKind::Error);
        assert_eq!(note.title, "Error");
        assert_eq!(note.message, "A transfer is already in progress");
    }
}
