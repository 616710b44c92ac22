use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Finds the source files of a project
pub struct FileScanner {
    root: PathBuf,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan directory for source files (.gitignore aware), sorted by path
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true) // hidden files are not source
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false);
        builder.filter_entry(move |entry| !FileScanner::is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                MAX_FILE_SIZE_BYTES
                            );
                            continue;
                        }
                    }

                    if !Self::is_source_file(path) {
                        continue;
                    }

                    files.push(path.to_path_buf());
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::info!("Found {} source files under {}", files.len(), self.root.display());
        files
    }

    fn is_source_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(ext))
            })
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            for component in relative.components() {
                if let std::path::Component::Normal(name) = component {
                    let lowered = name.to_string_lossy().to_lowercase();
                    if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

const IGNORED_SCOPES: &[&str] = &[
    // VCS
    ".git",
    ".hg",
    ".svn",
    // virtualenvs / packages
    "venv",
    ".venv",
    "node_modules",
    // caches / builds
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    ".cache",
    "build",
    "dist",
];

const MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1 MB

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "java", "cpp", "c", "go", "rb", "php", "html", "css", "json",
];
