use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Kind of resource file, decided by its resource folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// XML file in a `layout` or `layout-<qualifier>` folder
    Layout,
    /// Anything else; copied through untouched
    Other,
}

impl ResourceKind {
    /// Determine resource kind from a path relative to the resource root
    pub fn from_relative_path(relative: &Path) -> Self {
        let is_xml = relative
            .extension()
            .map(|e| e.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);

        let folder = relative
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str());

        match folder {
            Some(folder) if is_xml && is_layout_folder(folder) => ResourceKind::Layout,
            _ => ResourceKind::Other,
        }
    }
}

fn is_layout_folder(name: &str) -> bool {
    name == "layout" || name.starts_with("layout-")
}

/// A file discovered under a resource directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    /// Absolute path to the file
    pub path: PathBuf,

    /// Path relative to the resource root
    pub relative: PathBuf,

    pub kind: ResourceKind,
}

impl ResourceFile {
    /// Name of the resource folder, e.g. `layout-land`
    pub fn folder(&self) -> &str {
        self.relative
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    /// File name without extension, e.g. `activity_main`
    pub fn resource_name(&self) -> &str {
        self.relative
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }
}

/// Walks a resource directory in a stable order
#[derive(Debug, Default)]
pub struct ResourceFinder;

impl ResourceFinder {
    pub fn new() -> Self {
        Self
    }

    /// Find every non-hidden file under `root`, sorted by path.
    ///
    /// Symlinks are followed; build outputs are often trees of links. A
    /// dangling link is an error.
    pub fn find(&self, root: &Path) -> io::Result<Vec<ResourceFile>> {
        debug!("Scanning resources in: {}", root.display());

        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            let kind = ResourceKind::from_relative_path(&relative);

            trace!("Found {:?}: {}", kind, relative.display());
            files.push(ResourceFile {
                path: path.to_path_buf(),
                relative,
                kind,
            });
        }

        debug!("Found {} resource files", files.len());
        Ok(files)
    }
}
