use super::info::LayoutInfo;
use crate::processor::{DataBindingProcessingError, ProcessingError};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

/// File name of the class-generation descriptor
pub const INFO_CLASS_FILE_NAME: &str = "DataBindingInfo.json";

/// Current descriptor format version
const INFO_CLASS_VERSION: u32 = 1;

/// Descriptor the binding class generator reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBindingInfo {
    pub version: u32,
    pub module_package: String,
    pub min_sdk: u32,
    pub library: bool,
    /// Android SDK location, `null` when not configured
    pub sdk_dir: Option<PathBuf>,
    /// Hash of every layout-info file this descriptor was built from
    pub build_id: String,
    pub layouts: Vec<LayoutEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEntry {
    pub layout: String,
    pub directory: String,
    pub info_file: String,
    pub binding_class: String,
}

impl DataBindingInfo {
    /// Build the descriptor from layout-info files already written to `info_dir`
    pub fn collect(
        package: &str,
        min_sdk: u32,
        library: bool,
        sdk_dir: Option<&Path>,
        layouts: &[LayoutInfo],
        info_dir: &Path,
    ) -> Result<Self, ProcessingError> {
        let mut hasher = DefaultHasher::new();
        package.hash(&mut hasher);
        min_sdk.hash(&mut hasher);
        library.hash(&mut hasher);

        let mut entries = Vec::with_capacity(layouts.len());
        for layout in layouts {
            let info_file = layout.file_name();
            let path = info_dir.join(&info_file);

            let contents = match fs::read(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(DataBindingProcessingError::binding_model(
                        &path,
                        "layout info file is missing; layout info must be written before the info class",
                    )
                    .into());
                }
                Err(e) => return Err(ProcessingError::io(&path, e)),
            };

            info_file.hash(&mut hasher);
            contents.hash(&mut hasher);

            entries.push(LayoutEntry {
                layout: layout.layout_name.clone(),
                directory: layout.folder.clone(),
                info_file,
                binding_class: layout.binding_class.clone(),
            });
        }

        Ok(Self {
            version: INFO_CLASS_VERSION,
            module_package: package.to_string(),
            min_sdk,
            library,
            sdk_dir: sdk_dir.map(Path::to_path_buf),
            build_id: format!("{:016x}", hasher.finish()),
            layouts: entries,
        })
    }

    /// Binding classes to generate, sorted and deduplicated
    pub fn binding_classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self.layouts.iter().map(|l| l.binding_class.as_str()).collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        Ok(json)
    }

    pub fn load(path: &Path) -> Result<Self, ProcessingError> {
        let contents = fs::read(path).map_err(|e| ProcessingError::io(path, e))?;
        serde_json::from_slice(&contents)
            .map_err(|e| ProcessingError::io(path, io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}
