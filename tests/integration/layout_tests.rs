//! End-to-end tests of the data binding step with the quick-xml layout processor
//!
//! Each test builds a small resource tree in a temp dir, runs the step and
//! inspects both output directories.

use databinding_step::layout::{DataBindingInfo, INFO_CLASS_FILE_NAME};
use databinding_step::source_path::{ProjectSourcePathResolver, SourcePath};
use databinding_step::step::{ExecutionContext, ProcessDataBindingStep, Step, StepExecutionResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

const ACTIVITY_MAIN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<layout xmlns:android="http://schemas.android.com/apk/res/android">
    <data>
        <variable name="user" type="com.example.app.User"/>
    </data>
    <LinearLayout
        android:layout_width="match_parent"
        android:layout_height="match_parent"
        android:orientation="vertical">
        <TextView
            android:id="@+id/name"
            android:layout_width="wrap_content"
            android:layout_height="wrap_content"
            android:text="@{user.name}"/>
    </LinearLayout>
</layout>
"#;

const PLAIN_LAYOUT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent"
    android:layout_height="match_parent"/>
"#;

struct Project {
    temp: TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            temp: TempDir::new().unwrap(),
        };
        project.write("res/layout/activity_main.xml", ACTIVITY_MAIN);
        project.write("res/layout/item_plain.xml", PLAIN_LAYOUT);
        project.write("res/values/strings.xml", "<resources><string name=\"app\">App</string></resources>\n");
        project
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn res_out(&self) -> PathBuf {
        self.root().join("out/res")
    }

    fn info_out(&self) -> PathBuf {
        self.root().join("out/dbinfo")
    }

    fn step_for(&self, input: SourcePath, sdk_dir: Option<PathBuf>) -> ProcessDataBindingStep {
        ProcessDataBindingStep::new(
            Arc::new(ProjectSourcePathResolver::new(self.root())),
            sdk_dir,
            input,
            self.res_out(),
            self.info_out(),
            "com.example.app",
        )
        .unwrap()
    }

    fn step(&self) -> ProcessDataBindingStep {
        self.step_for(SourcePath::path("res"), None)
    }
}

/// Every file under `dir`, keyed by relative path
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(dir).unwrap().to_path_buf();
            (relative, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[test]
fn test_example_scenario() {
    let project = Project::new();

    let result = project.step().execute(&ExecutionContext::new()).unwrap();
    assert_eq!(result, StepExecutionResult::Success);

    let rewritten = fs::read_to_string(project.res_out().join("layout/activity_main.xml")).unwrap();
    assert!(!rewritten.contains("<layout"));
    assert!(!rewritten.contains("<data"));
    assert!(!rewritten.contains("@{"));
    assert!(rewritten.contains("android:tag=\"layout/activity_main_0\""));
    assert!(rewritten.contains("android:tag=\"binding_1\""));
    assert!(rewritten.contains("xmlns:android=\"http://schemas.android.com/apk/res/android\""));

    let info_files = snapshot(&project.info_out());
    let names: Vec<_> = info_files.keys().cloned().collect();
    assert_eq!(
        names,
        vec![PathBuf::from("DataBindingInfo.json"), PathBuf::from("activity_main-layout.xml")]
    );

    let layout_info = String::from_utf8(info_files[Path::new("activity_main-layout.xml")].clone()).unwrap();
    assert!(layout_info.contains("text=\"user.name\""));
    assert!(layout_info.contains("type=\"com.example.app.User\""));

    let descriptor = DataBindingInfo::load(&project.info_out().join(INFO_CLASS_FILE_NAME)).unwrap();
    assert_eq!(descriptor.module_package, "com.example.app");
    assert_eq!(descriptor.min_sdk, 19);
    assert!(!descriptor.library);
    assert!(descriptor.sdk_dir.is_none());
    assert_eq!(descriptor.layouts.len(), 1);
    assert_eq!(
        descriptor.layouts[0].binding_class,
        "com.example.app.databinding.ActivityMainBinding"
    );
}

#[test]
fn test_non_binding_resources_are_copied() {
    let project = Project::new();

    project.step().execute(&ExecutionContext::new()).unwrap();

    assert_eq!(
        fs::read_to_string(project.res_out().join("layout/item_plain.xml")).unwrap(),
        PLAIN_LAYOUT
    );
    assert!(project.res_out().join("values/strings.xml").exists());
}

#[test]
fn test_both_outputs_populated() {
    let project = Project::new();

    let result = project.step().execute(&ExecutionContext::new()).unwrap();

    assert!(result.is_success());
    assert!(!snapshot(&project.res_out()).is_empty());
    assert!(!snapshot(&project.info_out()).is_empty());
}

#[test]
fn test_rerun_is_byte_identical() {
    let project = Project::new();
    let step = project.step();

    step.execute(&ExecutionContext::new()).unwrap();
    let first_res = snapshot(&project.res_out());
    let first_info = snapshot(&project.info_out());

    step.execute(&ExecutionContext::new()).unwrap();

    assert_eq!(snapshot(&project.res_out()), first_res);
    assert_eq!(snapshot(&project.info_out()), first_info);
}

#[test]
fn test_fresh_step_reproduces_outputs() {
    let project = Project::new();

    project.step().execute(&ExecutionContext::new()).unwrap();
    let first = snapshot(&project.info_out());
    fs::remove_dir_all(project.root().join("out")).unwrap();

    project.step().execute(&ExecutionContext::new()).unwrap();

    assert_eq!(snapshot(&project.info_out()), first);
}

#[test]
fn test_rerun_after_deleting_a_layout_drops_its_outputs() {
    let project = Project::new();
    let step = project.step();

    step.execute(&ExecutionContext::new()).unwrap();
    fs::remove_file(project.root().join("res/layout/activity_main.xml")).unwrap();
    project.write("res/layout/other.xml", ACTIVITY_MAIN);

    let result = step.execute(&ExecutionContext::new()).unwrap();
    assert!(result.is_success());

    assert!(!project.res_out().join("layout/activity_main.xml").exists());
    assert!(!project.info_out().join("activity_main-layout.xml").exists());
    assert!(project.info_out().join("other-layout.xml").exists());

    // Same outputs as a clean run over the current input
    let rerun = (snapshot(&project.res_out()), snapshot(&project.info_out()));
    fs::remove_dir_all(project.root().join("out")).unwrap();
    step.execute(&ExecutionContext::new()).unwrap();
    assert_eq!((snapshot(&project.res_out()), snapshot(&project.info_out())), rerun);
}

#[cfg(unix)]
#[test]
fn test_symlinked_layouts_are_processed() {
    let project = Project::new();
    project.write("sources/main.xml", ACTIVITY_MAIN);
    std::os::unix::fs::symlink(
        project.root().join("sources/main.xml"),
        project.root().join("res/layout/main.xml"),
    )
    .unwrap();

    let result = project.step().execute(&ExecutionContext::new()).unwrap();

    assert!(result.is_success());
    let rewritten = fs::read_to_string(project.res_out().join("layout/main.xml")).unwrap();
    assert!(rewritten.contains("android:tag=\"layout/main_0\""));
    assert!(project.info_out().join("main-layout.xml").exists());
}

#[test]
fn test_malformed_layout_returns_error() {
    let project = Project::new();
    project.write("res/layout/broken.xml", "<layout><LinearLayout></layout>");

    let result = project.step().execute(&ExecutionContext::new());

    let result = result.expect("malformed XML is not an infrastructure failure");
    assert!(!result.is_success());
    assert!(result.message().unwrap().contains("broken.xml"));
    assert!(!project.info_out().join(INFO_CLASS_FILE_NAME).exists());
}

#[test]
fn test_invalid_expression_returns_error() {
    let project = Project::new();
    project.write(
        "res/layout/bad_expr.xml",
        r#"<layout><FrameLayout android:visibility="@{user.visible ? View.VISIBLE"/></layout>"#,
    );

    let result = project.step().execute(&ExecutionContext::new()).unwrap();

    assert!(!result.is_success());
    assert!(result.message().unwrap().contains("expression"));
}

#[test]
fn test_sdk_dir_recorded_when_present() {
    let project = Project::new();
    let sdk = project.root().join("android-sdk");

    let result = project
        .step_for(SourcePath::path("res"), Some(sdk.clone()))
        .execute(&ExecutionContext::new())
        .unwrap();

    assert!(result.is_success());
    let descriptor = DataBindingInfo::load(&project.info_out().join(INFO_CLASS_FILE_NAME)).unwrap();
    assert_eq!(descriptor.sdk_dir, Some(sdk));
}

#[test]
fn test_build_target_input() {
    let project = Project::new();
    project.write("buck-out/gen/app/res/layout/screen.xml", ACTIVITY_MAIN);

    let result = project
        .step_for(SourcePath::build_target("app", "res"), None)
        .execute(&ExecutionContext::new())
        .unwrap();

    assert!(result.is_success());
    assert!(project.res_out().join("layout/screen.xml").exists());
    assert!(project.info_out().join("screen-layout.xml").exists());
}

#[test]
fn test_relative_output_dirs_stay_out_of_the_input() {
    // A temp dir created in "." has a relative path
    let temp = TempDir::new_in(".").unwrap();
    let root = temp.path();
    assert!(root.is_relative());
    fs::create_dir_all(root.join("res/layout")).unwrap();
    fs::write(root.join("res/layout/activity_main.xml"), ACTIVITY_MAIN).unwrap();

    let step = ProcessDataBindingStep::new(
        Arc::new(ProjectSourcePathResolver::new(root)),
        None,
        SourcePath::path("res"),
        root.join("out/res"),
        root.join("out/dbinfo"),
        "com.example.app",
    )
    .unwrap();

    let result = step.execute(&ExecutionContext::new()).unwrap();

    assert_eq!(result, StepExecutionResult::Success);
    assert!(root.join("out/res/layout/activity_main.xml").exists());
    assert!(root.join("out/dbinfo/activity_main-layout.xml").exists());
    assert!(root.join("out/dbinfo").join(INFO_CLASS_FILE_NAME).exists());
    assert!(!root.join("res/out").exists());
}

#[test]
fn test_qualified_layout_folders() {
    let project = Project::new();
    project.write("res/layout-land/activity_main.xml", ACTIVITY_MAIN);

    project.step().execute(&ExecutionContext::new()).unwrap();

    assert!(project.info_out().join("activity_main-layout.xml").exists());
    assert!(project.info_out().join("activity_main-layout-land.xml").exists());

    let descriptor = DataBindingInfo::load(&project.info_out().join(INFO_CLASS_FILE_NAME)).unwrap();
    assert_eq!(descriptor.layouts.len(), 2);
    assert_eq!(descriptor.binding_classes().len(), 1);
}
