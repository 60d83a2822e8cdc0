use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Every regular file below `root`, in a stable per-directory order.
/// Entries that cannot be read are yielded as errors so each caller can decide
/// whether to skip or report them.
///
/// Symlinks are not descended into. A link to a regular file is yielded and
/// read through; links to directories, dangling links and special files
/// (FIFOs, sockets, device nodes) are skipped.
pub fn walk_files(root: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter(|entry| match entry {
            Ok(entry) => is_copyable(entry),
            Err(_) => true,
        })
}

fn is_copyable(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return false;
    }
    if file_type.is_file() {
        return true;
    }

    let resolves_to_file = file_type.is_symlink()
        && fs::metadata(entry.path())
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
    if !resolves_to_file {
        debug!("Skipping {}: not a regular file", entry.path().display());
    }
    resolves_to_file
}

/// Path of `path` relative to `root`, falling back to the file name when
/// `path` is not below `root`.
pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf()),
    }
}

/// Best-effort path for a walk error, relative to `root`.
pub fn error_path(root: &Path, error: &walkdir::Error) -> PathBuf {
    error
        .path()
        .map(|path| relative_to(root, path))
        .unwrap_or_else(|| PathBuf::from("."))
}
