//! Build steps
//!
//! A step is a single action inside a larger build graph. It reports a
//! [`StepExecutionResult`] for failures that belong to the step's own domain
//! and returns a [`StepError`] for infrastructure failures the orchestrator
//! has to handle itself.

mod process_databinding;

pub use process_databinding::{ProcessDataBindingStep, DATA_BINDING_MIN_SDK, LIBRARY_MODE};

use crate::source_path::ResolveError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Environment a step executes in
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    interrupted: Arc<AtomicBool>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that can interrupt steps running in this context
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(Arc::clone(&self.interrupted))
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Outcome of a step that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepExecutionResult {
    Success,
    Error { message: Option<String> },
}

impl StepExecutionResult {
    pub fn error(message: impl Into<String>) -> Self {
        StepExecutionResult::Error {
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepExecutionResult::Success)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            StepExecutionResult::Success => None,
            StepExecutionResult::Error { message } => message.as_deref(),
        }
    }

    /// Process exit code for this result
    pub fn exit_code(&self) -> i32 {
        match self {
            StepExecutionResult::Success => 0,
            StepExecutionResult::Error { .. } => 1,
        }
    }
}

impl fmt::Display for StepExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepExecutionResult::Success => f.write_str("SUCCESS"),
            StepExecutionResult::Error { message: None } => f.write_str("ERROR"),
            StepExecutionResult::Error { message: Some(m) } => write!(f, "ERROR: {}", m),
        }
    }
}

/// Infrastructure failures; never converted into an error result
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Step was interrupted")]
    Interrupted,
}

/// A build action
pub trait Step {
    fn execute(&self, context: &ExecutionContext) -> Result<StepExecutionResult, StepError>;

    /// Short stable name for logs
    fn short_name(&self) -> &str;

    /// Human readable description for progress display
    fn description(&self, context: &ExecutionContext) -> String;
}
