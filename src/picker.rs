/// Native folder dialogs for choosing transfer directories
use std::path::{Path, PathBuf};

pub struct FolderPicker;

impl FolderPicker {
    /// Blocks until the user picks a folder or cancels
    pub fn pick(title: &str, start_in: Option<&Path>) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new().set_title(title);
        if let Some(dir) = start_in.and_then(Self::nearest_existing_dir) {
            dialog = dialog.set_directory(dir);
        }
        dialog.pick_folder()
    }

    /// Closest ancestor that still exists, so a removed folder doesn't
    /// leave the dialog opening somewhere arbitrary
    fn nearest_existing_dir(path: &Path) -> Option<&Path> {
        path.ancestors().find(|p| p.is_dir())
    }
}
