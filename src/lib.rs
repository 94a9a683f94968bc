//! databinding-step - Android data binding layout processing as a build step
//!
//! This library provides the `process_databinding_info` build action: it
//! strips data binding markup from layout resources so the resource compiler
//! can consume them, and emits the metadata a later step uses to generate
//! binding classes.
//!
//! # Architecture
//!
//! One execution of the step runs:
//! 1. **Resolution** - Map the resource input reference to a directory
//! 2. **Resource processing** - Rewrite layouts into the resource output dir
//! 3. **Layout info** - Write one info file per data binding layout
//! 4. **Info class** - Write the class-generation descriptor
//!
//! Toolchain failures (bad XML, bad expressions, bad binding model) become an
//! error result; I/O failures and interruption propagate to the caller.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod layout;
pub mod processor;
pub mod source_path;
pub mod step;

pub use cache::{StepCache, StepFingerprint};
pub use config::{ConfigError, StepSettings};
pub use layout::{DataBindingInfo, XmlLayoutProcessor, XmlLayoutProcessorFactory};
pub use processor::{
    DataBindingProcessingError, FileFilter, LayoutProcessor, LayoutProcessorFactory, ProcessingError,
    ProcessorOptions, ResourceInput,
};
pub use source_path::{ProjectSourcePathResolver, SourcePath, SourcePathResolver};
pub use step::{ExecutionContext, ProcessDataBindingStep, Step, StepError, StepExecutionResult};
