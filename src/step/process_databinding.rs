use super::{ExecutionContext, Step, StepError, StepExecutionResult};
use crate::config::{absolute_dir, validate_output_dirs, validate_package_name, ConfigError};
use crate::layout::XmlLayoutProcessorFactory;
use crate::processor::{
    DataBindingProcessingError, FileFilter, LayoutProcessorFactory, ProcessingError, ProcessorOptions,
    ResourceInput, SourceFileWriter,
};
use crate::source_path::{ResolveError, SourcePath, SourcePathResolver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// API level the layout processor targets
pub const DATA_BINDING_MIN_SDK: u32 = 19;

/// Resources are always processed as an application module
pub const LIBRARY_MODE: bool = false;

const SHORT_NAME: &str = "process_databinding_info";

/// Strips data-binding markup from a resource directory and writes binding metadata.
///
/// Runs three passes in order, each finishing before the next starts:
/// 1. rewrite the layouts into `res_out`
/// 2. write per-layout info files into `xml_out`
/// 3. write the class-generation descriptor into `xml_out`
///
/// Failures of the layout toolchain are logged and reported as
/// [`StepExecutionResult::Error`]; I/O and interruption propagate as [`StepError`].
pub struct ProcessDataBindingStep {
    resolver: Arc<dyn SourcePathResolver>,
    processors: Arc<dyn LayoutProcessorFactory>,
    sdk_dir: Option<PathBuf>,
    res_in: SourcePath,
    res_out: PathBuf,
    xml_out: PathBuf,
    package_name: String,
}

enum Failure {
    DataBinding(DataBindingProcessingError),
    Fatal(StepError),
}

impl From<ProcessingError> for Failure {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::DataBinding(e) => Failure::DataBinding(e),
            ProcessingError::Io { path, source } => Failure::Fatal(StepError::Io { path, source }),
        }
    }
}

impl From<StepError> for Failure {
    fn from(err: StepError) -> Self {
        Failure::Fatal(err)
    }
}

impl From<ResolveError> for Failure {
    fn from(err: ResolveError) -> Self {
        Failure::Fatal(err.into())
    }
}

impl ProcessDataBindingStep {
    pub fn new(
        resolver: Arc<dyn SourcePathResolver>,
        sdk_dir: Option<PathBuf>,
        res_in: SourcePath,
        res_out: PathBuf,
        xml_out: PathBuf,
        package_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let package_name = package_name.into();
        validate_package_name(&package_name)?;
        // Outputs never go through the processor writer's input-rooted resolution
        let res_out = absolute_dir(res_out)?;
        let xml_out = absolute_dir(xml_out)?;
        validate_output_dirs(&res_out, &xml_out)?;

        Ok(Self {
            resolver,
            processors: Arc::new(XmlLayoutProcessorFactory),
            sdk_dir,
            res_in,
            res_out,
            xml_out,
            package_name,
        })
    }

    /// Use a different layout processor implementation
    pub fn with_processor_factory(mut self, processors: Arc<dyn LayoutProcessorFactory>) -> Self {
        self.processors = processors;
        self
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn resource_input(&self) -> &SourcePath {
        &self.res_in
    }

    pub fn resource_output_dir(&self) -> &Path {
        &self.res_out
    }

    pub fn metadata_output_dir(&self) -> &Path {
        &self.xml_out
    }

    pub fn sdk_dir(&self) -> Option<&Path> {
        self.sdk_dir.as_deref()
    }

    /// Resolve the input reference to an absolute directory
    pub fn resolve_input_dir(&self) -> Result<PathBuf, ResolveError> {
        self.resolver.absolute_path(&self.res_in)
    }

    fn check_interrupted(context: &ExecutionContext) -> Result<(), StepError> {
        if context.is_interrupted() {
            return Err(StepError::Interrupted);
        }
        Ok(())
    }

    fn process_databinding_layouts(&self, context: &ExecutionContext) -> Result<(), Failure> {
        let input_dir = self.resolve_input_dir()?;
        debug!("Resolved {} to {}", self.res_in, input_dir.display());

        let mut processor = self.processors.create(ProcessorOptions {
            package_name: self.package_name.clone(),
            writer: SourceFileWriter::new(&input_dir),
            min_sdk: DATA_BINDING_MIN_SDK,
            is_library: LIBRARY_MODE,
            file_filter: FileFilter::identity(),
        })?;

        let resource_input = ResourceInput::new(LIBRARY_MODE, input_dir, self.res_out.clone());

        Self::check_interrupted(context)?;
        info!("Processing all res inputs...");
        processor.process_resources(&resource_input)?;
        info!("Process Resources, done");

        Self::check_interrupted(context)?;
        processor.write_layout_info_files(&self.xml_out)?;

        Self::check_interrupted(context)?;
        match self.sdk_dir.as_deref() {
            Some(sdk_dir) => processor.write_info_class(Some(sdk_dir), &self.xml_out, None)?,
            None => {
                debug!("No Android SDK configured");
                processor.write_info_class(None, &self.xml_out, None)?
            }
        }
        info!("Wrote Layout Info files");

        Ok(())
    }
}

impl Step for ProcessDataBindingStep {
    fn execute(&self, context: &ExecutionContext) -> Result<StepExecutionResult, StepError> {
        match self.process_databinding_layouts(context) {
            Ok(()) => Ok(StepExecutionResult::Success),
            Err(Failure::DataBinding(e)) => {
                let message = e.to_string();
                error!("{}", message);
                Ok(StepExecutionResult::error(message))
            }
            Err(Failure::Fatal(e)) => Err(e),
        }
    }

    fn short_name(&self) -> &str {
        SHORT_NAME
    }

    fn description(&self, _context: &ExecutionContext) -> String {
        format!("{} {}", self.short_name(), self.res_in)
    }
}

impl std::fmt::Debug for ProcessDataBindingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessDataBindingStep")
            .field("res_in", &self.res_in)
            .field("res_out", &self.res_out)
            .field("xml_out", &self.xml_out)
            .field("sdk_dir", &self.sdk_dir)
            .field("package_name", &self.package_name)
            .finish_non_exhaustive()
    }
}
