use crate::scanner::FileScanner;
use codesift_code_chunker::IngestedFile;
use std::path::{Path, PathBuf};

/// Read every path as UTF-8 text. Unreadable files are logged and skipped.
pub fn read_files(paths: &[PathBuf]) -> Vec<IngestedFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                files.push(
                    IngestedFile::new(path.to_string_lossy(), content)
                        .with_mime_type(guess_mime_type(path)),
                );
            }
            Err(e) => log::warn!("Skipped {}: {e}", path.display()),
        }
    }
    log::info!("Read {} of {} files", files.len(), paths.len());
    files
}

/// Scan `root` and read what it finds
pub fn ingest_dir(root: impl AsRef<Path>) -> Vec<IngestedFile> {
    let paths = FileScanner::new(root).scan();
    read_files(&paths)
}

pub fn guess_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}
