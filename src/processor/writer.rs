use super::ProcessingError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Writes generated files beneath a root directory.
///
/// Relative paths are resolved against the root; absolute paths are written
/// as given. A file whose bytes are already identical is left untouched so
/// repeated runs do not churn modification times.
#[derive(Debug, Clone)]
pub struct SourceFileWriter {
    root: PathBuf,
}

impl SourceFileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Write `contents` to `path`, returning whether the file changed
    pub fn write(&self, path: &Path, contents: &[u8]) -> Result<bool, ProcessingError> {
        let target = self.resolve(path);

        if let Ok(existing) = fs::read(&target) {
            if existing == contents {
                trace!("Unchanged: {}", target.display());
                return Ok(false);
            }
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ProcessingError::io(parent, e))?;
        }

        fs::write(&target, contents).map_err(|e| ProcessingError::io(&target, e))?;
        trace!("Wrote {} bytes to {}", contents.len(), target.display());
        Ok(true)
    }

    /// Delete every file under `dir` whose path relative to `dir` is not in
    /// `keep`, then any directories left empty. Returns the number of files
    /// removed. A missing `dir` has nothing to prune.
    pub fn prune(&self, dir: &Path, keep: &HashSet<PathBuf>) -> Result<usize, ProcessingError> {
        let dir = self.resolve(dir);
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in WalkDir::new(&dir).min_depth(1).contents_first(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir.as_path()).to_path_buf();
                ProcessingError::io(path, e.into())
            })?;
            let path = entry.path();

            if entry.file_type().is_dir() {
                let is_empty = fs::read_dir(path)
                    .map_err(|e| ProcessingError::io(path, e))?
                    .next()
                    .is_none();
                if is_empty {
                    fs::remove_dir(path).map_err(|e| ProcessingError::io(path, e))?;
                }
                continue;
            }

            let relative = path.strip_prefix(&dir).unwrap_or(path);
            if !keep.contains(relative) {
                fs::remove_file(path).map_err(|e| ProcessingError::io(path, e))?;
                trace!("Removed stale output {}", path.display());
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Pruned {} stale files from {}", removed, dir.display());
        }
        Ok(removed)
    }
}
