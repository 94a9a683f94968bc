use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures raised by the layout/binding toolchain itself.
///
/// These are recovered by the data-binding step: they are logged and turned
/// into an error status instead of aborting the build.
#[derive(Error, Debug)]
pub enum DataBindingProcessingError {
    #[error("Malformed layout XML in {}: {message}", path.display())]
    MalformedXml { path: PathBuf, message: String },

    #[error("Invalid binding expression in {}: {message}", path.display())]
    InvalidExpression { path: PathBuf, message: String },

    #[error("Invalid binding model for {}: {message}", path.display())]
    BindingModel { path: PathBuf, message: String },

    #[error("XML parser configuration rejected {}: {message}", path.display())]
    ParserConfiguration { path: PathBuf, message: String },
}

impl DataBindingProcessingError {
    pub fn malformed(path: &Path, message: impl Into<String>) -> Self {
        Self::MalformedXml {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn expression(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidExpression {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn binding_model(path: &Path, message: impl Into<String>) -> Self {
        Self::BindingModel {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn parser_configuration(path: &Path, message: impl Into<String>) -> Self {
        Self::ParserConfiguration {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// File the failure was reported against
    pub fn path(&self) -> &Path {
        match self {
            Self::MalformedXml { path, .. }
            | Self::InvalidExpression { path, .. }
            | Self::BindingModel { path, .. }
            | Self::ParserConfiguration { path, .. } => path,
        }
    }
}

/// Anything a layout processor pass can fail with
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error(transparent)]
    DataBinding(#[from] DataBindingProcessingError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProcessingError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
