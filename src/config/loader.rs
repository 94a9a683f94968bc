use crate::source_path::{ProjectSourcePathResolver, SourcePath};
use crate::step::ProcessDataBindingStep;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings for a data-binding step, read from a config file and the command line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSettings {
    /// Root that relative paths are resolved against
    pub project_root: Option<PathBuf>,

    /// Directory holding build-target outputs, relative to the project root
    pub gen_dir: Option<PathBuf>,

    /// Resource input: a path or `//base/path:name`
    pub resource_input: Option<SourcePath>,

    /// Where rewritten resources are written
    pub resource_output_dir: Option<PathBuf>,

    /// Where layout info and the class descriptor are written
    pub metadata_output_dir: Option<PathBuf>,

    /// Android SDK location
    pub sdk_dir: Option<PathBuf>,

    /// Package of the generated binding classes
    pub package_name: Option<String>,

    /// Fingerprint cache file for incremental runs
    pub cache_path: Option<PathBuf>,
}

impl StepSettings {
    /// Load settings from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(settings) = serde_yaml::from_str(&contents) {
                    Ok(settings)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load settings from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".databinding.yml",
            ".databinding.yaml",
            ".databinding.toml",
            "databinding.yml",
            "databinding.yaml",
            "databinding.toml",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    /// Overlay values set in `other` on top of these settings
    pub fn merge(&mut self, other: StepSettings) {
        let StepSettings {
            project_root,
            gen_dir,
            resource_input,
            resource_output_dir,
            metadata_output_dir,
            sdk_dir,
            package_name,
            cache_path,
        } = other;

        if project_root.is_some() {
            self.project_root = project_root;
        }
        if gen_dir.is_some() {
            self.gen_dir = gen_dir;
        }
        if resource_input.is_some() {
            self.resource_input = resource_input;
        }
        if resource_output_dir.is_some() {
            self.resource_output_dir = resource_output_dir;
        }
        if metadata_output_dir.is_some() {
            self.metadata_output_dir = metadata_output_dir;
        }
        if sdk_dir.is_some() {
            self.sdk_dir = sdk_dir;
        }
        if package_name.is_some() {
            self.package_name = package_name;
        }
        if cache_path.is_some() {
            self.cache_path = cache_path;
        }
    }

    /// Project root, made absolute against `cwd`
    pub fn resolved_project_root(&self, cwd: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        }
    }

    /// Build the step these settings describe.
    ///
    /// Relative output and SDK paths are taken relative to the project root.
    pub fn build_step(&self, cwd: &Path) -> Result<ProcessDataBindingStep> {
        let root = self.resolved_project_root(cwd);

        let resource_input = self
            .resource_input
            .clone()
            .ok_or_else(|| miette::miette!("Missing required setting: resource_input"))?;
        let resource_output_dir = self
            .resource_output_dir
            .as_ref()
            .ok_or_else(|| miette::miette!("Missing required setting: resource_output_dir"))?;
        let metadata_output_dir = self
            .metadata_output_dir
            .as_ref()
            .ok_or_else(|| miette::miette!("Missing required setting: metadata_output_dir"))?;
        let package_name = self
            .package_name
            .clone()
            .ok_or_else(|| miette::miette!("Missing required setting: package_name"))?;

        let mut resolver = ProjectSourcePathResolver::new(&root);
        if let Some(gen_dir) = &self.gen_dir {
            resolver = resolver.with_gen_dir(gen_dir);
        }

        ProcessDataBindingStep::new(
            Arc::new(resolver),
            self.sdk_dir.as_ref().map(|dir| root.join(dir)),
            resource_input,
            root.join(resource_output_dir),
            root.join(metadata_output_dir),
            package_name,
        )
        .into_diagnostic()
        .wrap_err("Invalid data binding step configuration")
    }
}
