mod loader;

pub use loader::StepSettings;

use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Step configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Package name must not be empty")]
    EmptyPackageName,
    #[error("Invalid package name '{0}': expected a dotted Java identifier such as com.example.app")]
    InvalidPackageName(String),
    #[error(
        "Resource output dir {} and metadata output dir {} must be distinct, non-nested directories",
        resources.display(),
        metadata.display()
    )]
    OverlappingOutputDirs { resources: PathBuf, metadata: PathBuf },
    #[error("Cannot make {} absolute: {source}", path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn package_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
            .expect("package name pattern is valid")
    })
}

/// Check that `name` is a non-empty dotted identifier
pub fn validate_package_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyPackageName);
    }
    if !package_pattern().is_match(name) {
        return Err(ConfigError::InvalidPackageName(name.to_string()));
    }
    Ok(())
}

/// Anchor a relative directory at the current working directory
pub fn absolute_dir(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
        path: path.clone(),
        source,
    })?;
    Ok(cwd.join(path))
}

/// The two output roots must not be the same directory or contain one another
pub fn validate_output_dirs(resources: &Path, metadata: &Path) -> Result<(), ConfigError> {
    if resources.starts_with(metadata) || metadata.starts_with(resources) {
        return Err(ConfigError::OverlappingOutputDirs {
            resources: resources.to_path_buf(),
            metadata: metadata.to_path_buf(),
        });
    }
    Ok(())
}
