//! Abstract source paths and their resolution to filesystem directories

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default directory holding build-target outputs, relative to the project root
pub const DEFAULT_GEN_DIR: &str = "buck-out/gen";

/// Source path errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid source path '{input}': {reason}")]
    Invalid { input: String, reason: &'static str },
    #[error("Source path {source_path} does not exist at {}: {cause}", resolved.display())]
    NotFound {
        source_path: String,
        resolved: PathBuf,
        #[source]
        cause: io::Error,
    },
    #[error("Source path {source_path} is not a directory: {}", resolved.display())]
    NotADirectory { source_path: String, resolved: PathBuf },
}

/// Reference to an input of a build step.
///
/// Either a plain path (relative to the project root, or absolute) or the
/// output of another build target, written `//base/path:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SourcePath {
    Path(PathBuf),
    BuildTarget { base_path: String, name: String },
}

impl SourcePath {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        SourcePath::Path(path.into())
    }

    pub fn build_target(base_path: impl Into<String>, name: impl Into<String>) -> Self {
        SourcePath::BuildTarget {
            base_path: base_path.into(),
            name: name.into(),
        }
    }
}

impl FromStr for SourcePath {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ResolveError::Invalid {
            input: s.to_string(),
            reason,
        };

        if s.is_empty() {
            return Err(invalid("empty path"));
        }

        let Some(target) = s.strip_prefix("//") else {
            return Ok(SourcePath::Path(PathBuf::from(s)));
        };

        let (base_path, name) = target
            .rsplit_once(':')
            .ok_or_else(|| invalid("build target is missing ':name'"))?;

        if name.is_empty() || name.contains('/') {
            return Err(invalid("build target name must be a single non-empty segment"));
        }
        if base_path.starts_with('/') || base_path.ends_with('/') {
            return Err(invalid("build target base path must not start or end with '/'"));
        }

        Ok(SourcePath::build_target(base_path, name))
    }
}

impl TryFrom<String> for SourcePath {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SourcePath> for String {
    fn from(path: SourcePath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePath::Path(path) => write!(f, "{}", path.display()),
            SourcePath::BuildTarget { base_path, name } => write!(f, "//{}:{}", base_path, name),
        }
    }
}

/// Maps a [`SourcePath`] to an absolute directory on disk
pub trait SourcePathResolver: Send + Sync {
    fn absolute_path(&self, path: &SourcePath) -> Result<PathBuf, ResolveError>;
}

/// Resolves source paths against a project root
#[derive(Debug, Clone)]
pub struct ProjectSourcePathResolver {
    project_root: PathBuf,
    gen_dir: PathBuf,
}

impl ProjectSourcePathResolver {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            gen_dir: PathBuf::from(DEFAULT_GEN_DIR),
        }
    }

    /// Set the build-output directory (relative to the project root)
    pub fn with_gen_dir(mut self, gen_dir: impl Into<PathBuf>) -> Self {
        self.gen_dir = gen_dir.into();
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Location a source path maps to, before touching the filesystem
    pub fn relative_location(&self, path: &SourcePath) -> PathBuf {
        match path {
            SourcePath::Path(path) => self.project_root.join(path),
            SourcePath::BuildTarget { base_path, name } => self
                .project_root
                .join(&self.gen_dir)
                .join(base_path)
                .join(name),
        }
    }
}

impl SourcePathResolver for ProjectSourcePathResolver {
    fn absolute_path(&self, path: &SourcePath) -> Result<PathBuf, ResolveError> {
        let location = self.relative_location(path);

        let resolved = fs::canonicalize(&location).map_err(|cause| ResolveError::NotFound {
            source_path: path.to_string(),
            resolved: location.clone(),
            cause,
        })?;

        if !resolved.is_dir() {
            return Err(ResolveError::NotADirectory {
                source_path: path.to_string(),
                resolved,
            });
        }

        Ok(resolved)
    }
}
