//! Layout processor interface
//!
//! The data-binding step drives a layout processor through three passes:
//! resource rewriting, layout-info emission and info-class emission. The
//! processor is created per execution through a [`LayoutProcessorFactory`],
//! which lets callers swap in their own toolchain.

mod error;
mod writer;

pub use error::{DataBindingProcessingError, ProcessingError};
pub use writer::SourceFileWriter;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Input and output directories of the resource-processing pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInput {
    pub is_library: bool,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ResourceInput {
    pub fn new(is_library: bool, input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            is_library,
            input_dir,
            output_dir,
        }
    }
}

/// Maps a candidate layout file to the file that is actually processed.
///
/// Returning `None` drops the file.
#[derive(Clone)]
pub struct FileFilter(Arc<dyn Fn(&Path) -> Option<PathBuf> + Send + Sync>);

impl FileFilter {
    pub fn new<F>(filter: F) -> Self
    where
        F: Fn(&Path) -> Option<PathBuf> + Send + Sync + 'static,
    {
        Self(Arc::new(filter))
    }

    /// Accept every file unchanged
    pub fn identity() -> Self {
        Self::new(|file| Some(file.to_path_buf()))
    }

    pub fn apply(&self, file: &Path) -> Option<PathBuf> {
        (self.0)(file)
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for FileFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileFilter(..)")
    }
}

/// Everything a processor is bound to when it is created
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Package the binding classes are generated into
    pub package_name: String,

    /// Writer used for every generated file
    pub writer: SourceFileWriter,

    /// Minimum API level the generated code targets
    pub min_sdk: u32,

    /// Whether the module is a library
    pub is_library: bool,

    /// Hook applied to each candidate layout file
    pub file_filter: FileFilter,
}

/// A data-binding layout processor.
///
/// Callers run the passes in order: `process_resources`, then
/// `write_layout_info_files`, then `write_info_class`. Later passes depend on
/// state gathered by earlier ones.
pub trait LayoutProcessor {
    /// Rewrite the layouts under `input.input_dir` into `input.output_dir`
    fn process_resources(&mut self, input: &ResourceInput) -> Result<(), ProcessingError>;

    /// Emit one layout-info file per data-binding layout into `xml_out_dir`
    fn write_layout_info_files(&mut self, xml_out_dir: &Path) -> Result<(), ProcessingError>;

    /// Emit the class-generation descriptor from the layout info in `xml_out_dir`
    fn write_info_class(
        &mut self,
        sdk_dir: Option<&Path>,
        xml_out_dir: &Path,
        export_class_list_to: Option<&Path>,
    ) -> Result<(), ProcessingError>;
}

/// Creates a fresh processor for each step execution
pub trait LayoutProcessorFactory: Send + Sync {
    fn create(&self, options: ProcessorOptions) -> Result<Box<dyn LayoutProcessor>, ProcessingError>;
}
