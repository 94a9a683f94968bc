//! Integration tests for the data binding step contract
//!
//! A recording layout processor stands in for the real toolchain so pass
//! ordering, error mapping and the values handed to the processor can be
//! checked directly.

use databinding_step::processor::{
    DataBindingProcessingError, LayoutProcessor, LayoutProcessorFactory, ProcessingError, ProcessorOptions,
    ResourceInput,
};
use databinding_step::source_path::{ResolveError, SourcePath, SourcePathResolver};
use databinding_step::step::{
    ExecutionContext, InterruptHandle, ProcessDataBindingStep, Step, StepError, StepExecutionResult,
    DATA_BINDING_MIN_SDK,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::Level;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create {
        package: String,
        writer_root: PathBuf,
        min_sdk: u32,
        is_library: bool,
        filter_is_identity: bool,
    },
    ProcessResources(ResourceInput),
    WriteLayoutInfo(PathBuf),
    WriteInfoClass {
        sdk_dir: Option<PathBuf>,
        xml_out: PathBuf,
        export: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pass {
    Create,
    ProcessResources,
    WriteLayoutInfo,
    WriteInfoClass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    DataBinding,
    Io,
}

fn failure(kind: Failure) -> ProcessingError {
    match kind {
        Failure::DataBinding => {
            DataBindingProcessingError::malformed(Path::new("layout/broken.xml"), "unexpected end of document")
                .into()
        }
        Failure::Io => ProcessingError::io("layout/broken.xml", io::Error::new(io::ErrorKind::Other, "disk full")),
    }
}

#[derive(Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    fail: Option<(Pass, Failure)>,
    interrupt_during_resources: Option<InterruptHandle>,
}

impl Recorder {
    fn failing(pass: Pass, kind: Failure) -> Self {
        Self {
            fail: Some((pass, kind)),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, pass: Pass) -> Result<(), ProcessingError> {
        match self.fail {
            Some((failing, kind)) if failing == pass => Err(failure(kind)),
            _ => Ok(()),
        }
    }
}

struct RecordingFactory(Arc<Recorder>);

struct RecordingProcessor {
    recorder: Arc<Recorder>,
    resource_output: Option<PathBuf>,
}

impl LayoutProcessorFactory for RecordingFactory {
    fn create(&self, options: ProcessorOptions) -> Result<Box<dyn LayoutProcessor>, ProcessingError> {
        let probe = Path::new("/res/layout/probe.xml");
        self.0.calls.lock().unwrap().push(Call::Create {
            package: options.package_name.clone(),
            writer_root: options.writer.root().to_path_buf(),
            min_sdk: options.min_sdk,
            is_library: options.is_library,
            filter_is_identity: options.file_filter.apply(probe) == Some(probe.to_path_buf()),
        });
        self.0.check(Pass::Create)?;

        Ok(Box::new(RecordingProcessor {
            recorder: Arc::clone(&self.0),
            resource_output: None,
        }))
    }
}

impl LayoutProcessor for RecordingProcessor {
    fn process_resources(&mut self, input: &ResourceInput) -> Result<(), ProcessingError> {
        self.recorder
            .calls
            .lock()
            .unwrap()
            .push(Call::ProcessResources(input.clone()));
        if let Some(handle) = &self.recorder.interrupt_during_resources {
            handle.interrupt();
        }
        self.recorder.check(Pass::ProcessResources)?;

        fs::create_dir_all(input.output_dir.join("layout")).map_err(|e| ProcessingError::io(&input.output_dir, e))?;
        fs::write(input.output_dir.join("layout/main.xml"), "<FrameLayout/>")
            .map_err(|e| ProcessingError::io(&input.output_dir, e))?;
        self.resource_output = Some(input.output_dir.clone());
        Ok(())
    }

    fn write_layout_info_files(&mut self, xml_out_dir: &Path) -> Result<(), ProcessingError> {
        self.recorder
            .calls
            .lock()
            .unwrap()
            .push(Call::WriteLayoutInfo(xml_out_dir.to_path_buf()));
        self.recorder.check(Pass::WriteLayoutInfo)?;

        let resources = self.resource_output.as_ref().expect("resources processed first");
        assert!(resources.join("layout/main.xml").exists());

        fs::create_dir_all(xml_out_dir).map_err(|e| ProcessingError::io(xml_out_dir, e))?;
        fs::write(xml_out_dir.join("main-layout.xml"), "<Layout/>").map_err(|e| ProcessingError::io(xml_out_dir, e))?;
        Ok(())
    }

    fn write_info_class(
        &mut self,
        sdk_dir: Option<&Path>,
        xml_out_dir: &Path,
        export_class_list_to: Option<&Path>,
    ) -> Result<(), ProcessingError> {
        self.recorder.calls.lock().unwrap().push(Call::WriteInfoClass {
            sdk_dir: sdk_dir.map(Path::to_path_buf),
            xml_out: xml_out_dir.to_path_buf(),
            export: export_class_list_to.map(Path::to_path_buf),
        });
        self.recorder.check(Pass::WriteInfoClass)?;

        assert!(xml_out_dir.join("main-layout.xml").exists());
        Ok(())
    }
}

/// Resolves every source path to one fixed directory
struct FixedResolver(PathBuf);

impl SourcePathResolver for FixedResolver {
    fn absolute_path(&self, _path: &SourcePath) -> Result<PathBuf, ResolveError> {
        Ok(self.0.clone())
    }
}

struct MissingResolver;

impl SourcePathResolver for MissingResolver {
    fn absolute_path(&self, path: &SourcePath) -> Result<PathBuf, ResolveError> {
        Err(ResolveError::NotFound {
            source_path: path.to_string(),
            resolved: PathBuf::from("/missing"),
            cause: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        })
    }
}

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(|line| line.trim().to_string())
            .collect()
    }
}

/// Run the step with a subscriber recording INFO and above
fn execute_logged(step: &ProcessDataBindingStep) -> (StepExecutionResult, Vec<String>) {
    let logs = LogBuffer::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || sink.clone())
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || step.execute(&ExecutionContext::new()));
    (result.unwrap(), logs.lines())
}

struct Fixture {
    _temp: TempDir,
    input: PathBuf,
    res_out: PathBuf,
    xml_out: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("res");
        fs::create_dir_all(&input).unwrap();
        let res_out = temp.path().join("out/res");
        let xml_out = temp.path().join("out/dbinfo");
        Self {
            _temp: temp,
            input,
            res_out,
            xml_out,
        }
    }

    fn step(&self, recorder: &Arc<Recorder>, sdk_dir: Option<PathBuf>) -> ProcessDataBindingStep {
        ProcessDataBindingStep::new(
            Arc::new(FixedResolver(self.input.clone())),
            sdk_dir,
            SourcePath::path("res"),
            self.res_out.clone(),
            self.xml_out.clone(),
            "com.example.app",
        )
        .unwrap()
        .with_processor_factory(Arc::new(RecordingFactory(Arc::clone(recorder))))
    }
}

#[test]
fn test_passes_run_in_order() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    let step = fixture.step(&recorder, None);

    let result = step.execute(&ExecutionContext::new()).unwrap();

    assert_eq!(result, StepExecutionResult::Success);
    assert_eq!(
        recorder.calls(),
        vec![
            Call::Create {
                package: "com.example.app".to_string(),
                writer_root: fixture.input.clone(),
                min_sdk: DATA_BINDING_MIN_SDK,
                is_library: false,
                filter_is_identity: true,
            },
            Call::ProcessResources(ResourceInput::new(false, fixture.input.clone(), fixture.res_out.clone())),
            Call::WriteLayoutInfo(fixture.xml_out.clone()),
            Call::WriteInfoClass {
                sdk_dir: None,
                xml_out: fixture.xml_out.clone(),
                export: None,
            },
        ]
    );
}

#[test]
fn test_sdk_dir_is_forwarded_to_info_class() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    let step = fixture.step(&recorder, Some(PathBuf::from("/opt/android-sdk")));

    let result = step.execute(&ExecutionContext::new()).unwrap();

    assert!(result.is_success());
    let calls = recorder.calls();
    assert_eq!(
        calls.last(),
        Some(&Call::WriteInfoClass {
            sdk_dir: Some(PathBuf::from("/opt/android-sdk")),
            xml_out: fixture.xml_out.clone(),
            export: None,
        })
    );
}

#[test]
fn test_domain_failures_become_error_results() {
    let cases = [
        (Pass::Create, 1),
        (Pass::ProcessResources, 2),
        (Pass::WriteLayoutInfo, 3),
        (Pass::WriteInfoClass, 4),
    ];

    for (pass, expected_calls) in cases {
        let fixture = Fixture::new();
        let recorder = Arc::new(Recorder::failing(pass, Failure::DataBinding));
        let step = fixture.step(&recorder, None);

        let result = step.execute(&ExecutionContext::new());

        let result = result.unwrap_or_else(|e| panic!("{:?} should not be fatal: {}", pass, e));
        assert!(!result.is_success(), "{:?} should fail", pass);
        assert!(result.message().unwrap().contains("layout/broken.xml"));
        assert_eq!(recorder.calls().len(), expected_calls, "{:?} stops the pipeline", pass);
    }
}

#[test]
fn test_io_failures_propagate() {
    for pass in [Pass::ProcessResources, Pass::WriteLayoutInfo, Pass::WriteInfoClass] {
        let fixture = Fixture::new();
        let recorder = Arc::new(Recorder::failing(pass, Failure::Io));
        let step = fixture.step(&recorder, None);

        let result = step.execute(&ExecutionContext::new());

        assert!(
            matches!(result, Err(StepError::Io { .. })),
            "{:?} should propagate, got {:?}",
            pass,
            result
        );
    }
}

#[test]
fn test_metadata_untouched_when_resources_fail() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::failing(Pass::ProcessResources, Failure::DataBinding));
    let step = fixture.step(&recorder, None);

    let result = step.execute(&ExecutionContext::new()).unwrap();

    assert!(!result.is_success());
    assert!(!fixture.xml_out.exists());
    assert!(!recorder
        .calls()
        .iter()
        .any(|c| matches!(c, Call::WriteLayoutInfo(_) | Call::WriteInfoClass { .. })));
}

#[test]
fn test_interrupted_before_processing() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    let step = fixture.step(&recorder, None);
    let context = ExecutionContext::new();
    context.interrupt_handle().interrupt();

    let result = step.execute(&context);

    assert!(matches!(result, Err(StepError::Interrupted)));
    assert!(!recorder
        .calls()
        .iter()
        .any(|c| matches!(c, Call::ProcessResources(_))));
}

#[test]
fn test_interrupted_between_passes() {
    let fixture = Fixture::new();
    let context = ExecutionContext::new();
    let recorder = Arc::new(Recorder {
        interrupt_during_resources: Some(context.interrupt_handle()),
        ..Default::default()
    });
    let step = fixture.step(&recorder, None);

    let result = step.execute(&context);

    assert!(matches!(result, Err(StepError::Interrupted)));
    assert_eq!(recorder.calls().len(), 2);
    assert!(!fixture.xml_out.exists());
}

#[test]
fn test_resolver_failure_propagates() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    let step = ProcessDataBindingStep::new(
        Arc::new(MissingResolver),
        None,
        SourcePath::build_target("app", "res"),
        fixture.res_out.clone(),
        fixture.xml_out.clone(),
        "com.example.app",
    )
    .unwrap()
    .with_processor_factory(Arc::new(RecordingFactory(Arc::clone(&recorder))));

    let result = step.execute(&ExecutionContext::new());

    assert!(matches!(result, Err(StepError::Resolve(_))));
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_description_names_the_input() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    let step = ProcessDataBindingStep::new(
        Arc::new(FixedResolver(fixture.input.clone())),
        None,
        SourcePath::build_target("app/src/main", "res"),
        fixture.res_out.clone(),
        fixture.xml_out.clone(),
        "com.example.app",
    )
    .unwrap()
    .with_processor_factory(Arc::new(RecordingFactory(recorder)));

    assert_eq!(
        step.description(&ExecutionContext::new()),
        "process_databinding_info //app/src/main:res"
    );
}

#[test]
fn test_success_logs_progress_without_errors() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::default());
    let step = fixture.step(&recorder, None);

    let (result, lines) = execute_logged(&step);

    assert!(result.is_success());
    let info: Vec<_> = lines.iter().filter(|l| l.starts_with("INFO")).collect();
    assert!(info.iter().any(|l| l.contains("Processing all res inputs...")));
    assert!(info.iter().any(|l| l.contains("Process Resources, done")));
    assert!(info.iter().any(|l| l.contains("Wrote Layout Info files")));
    assert!(!lines.iter().any(|l| l.starts_with("ERROR")), "{:?}", lines);
}

#[test]
fn test_domain_failure_logs_one_error_line() {
    let fixture = Fixture::new();
    let recorder = Arc::new(Recorder::failing(Pass::WriteLayoutInfo, Failure::DataBinding));
    let step = fixture.step(&recorder, None);

    let (result, lines) = execute_logged(&step);

    assert!(!result.is_success());
    let errors: Vec<_> = lines.iter().filter(|l| l.starts_with("ERROR")).collect();
    assert_eq!(errors.len(), 1, "{:?}", lines);
    assert!(errors[0].contains(result.message().unwrap()));
    assert!(errors[0].contains("layout/broken.xml"));
    assert!(!lines.iter().any(|l| l.contains("Wrote Layout Info files")));
}
