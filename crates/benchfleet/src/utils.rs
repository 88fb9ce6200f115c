use std::{
  fs, io,
  path::{Path, PathBuf},
};

/// Removes a directory tree, treating "already gone" as success. Cleanup
/// paths run after failures that may or may not have created the directory,
/// and the sweeper may race a manual cleanup.
pub(crate) fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
  match fs::remove_dir_all(path) {
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
    other => other,
  }
}

pub(crate) fn remove_file_if_exists(path: &Path) -> io::Result<()> {
  match fs::remove_file(path) {
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
    other => other,
  }
}

/// A child path of `root` that no other task will pick: `<prefix>-<uuid>`.
pub(crate) fn unique_child(root: &Path, prefix: &str) -> PathBuf {
  root.join(format!("{}-{}", prefix, uuid::Uuid::new_v4()))
}
