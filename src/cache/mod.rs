//! Fingerprint cache for the data-binding step
//!
//! Re-running the step with the same configuration over an unchanged input
//! directory produces identical outputs, so a run can be skipped when the
//! fingerprint of both matches the one recorded after the last success.

use crate::discovery::ResourceFinder;
use crate::layout::INFO_CLASS_FILE_NAME;
use crate::step::{ProcessDataBindingStep, DATA_BINDING_MIN_SDK, LIBRARY_MODE};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read cache file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse cache: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Cache version mismatch")]
    VersionMismatch,
}

/// Current cache format version
const CACHE_VERSION: u32 = 1;

/// Content fingerprint of a step configuration and its input directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFingerprint {
    /// Hash of the step configuration
    pub config_hash: String,
    /// Hash of every input file's relative path and contents
    pub input_hash: String,
    /// Number of input files hashed
    pub file_count: usize,
}

impl StepFingerprint {
    /// Fingerprint `step` reading inputs from the already resolved `input_dir`
    pub fn compute(step: &ProcessDataBindingStep, input_dir: &Path) -> std::io::Result<Self> {
        let mut config = DefaultHasher::new();
        step.package_name().hash(&mut config);
        step.resource_input().to_string().hash(&mut config);
        step.resource_output_dir().hash(&mut config);
        step.metadata_output_dir().hash(&mut config);
        step.sdk_dir().hash(&mut config);
        DATA_BINDING_MIN_SDK.hash(&mut config);
        LIBRARY_MODE.hash(&mut config);

        let files = ResourceFinder::new().find(input_dir)?;
        let mut input = DefaultHasher::new();
        for file in &files {
            file.relative.hash(&mut input);
            fs::read(&file.path)?.hash(&mut input);
        }

        Ok(Self {
            config_hash: format!("{:016x}", config.finish()),
            input_hash: format!("{:016x}", input.finish()),
            file_count: files.len(),
        })
    }
}

/// Fingerprint recorded after the last successful run
#[derive(Debug, Serialize, Deserialize)]
pub struct StepCache {
    /// Cache format version
    pub version: u32,
    pub fingerprint: StepFingerprint,
    /// Timestamp when the cache was written
    pub created_at: u64,
}

impl StepCache {
    pub fn new(fingerprint: StepFingerprint) -> Self {
        Self {
            version: CACHE_VERSION,
            fingerprint,
            created_at: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    /// Load cache from disk
    pub fn load(cache_path: &Path) -> Result<Self, CacheError> {
        let file = fs::File::open(cache_path)?;
        let reader = BufReader::new(file);
        let cache: Self = serde_json::from_reader(reader)?;

        if cache.version != CACHE_VERSION {
            return Err(CacheError::VersionMismatch);
        }

        Ok(cache)
    }

    /// Save cache to disk
    pub fn save(&self, cache_path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::File::create(cache_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Default cache location: a hidden file next to the metadata output dir,
    /// so neither output root gains files of its own
    pub fn default_cache_path(metadata_output_dir: &Path) -> PathBuf {
        let name = metadata_output_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "databinding".to_string());
        metadata_output_dir.with_file_name(format!(".{}-cache.json", name))
    }

    /// Whether the recorded run still stands for `fingerprint`
    pub fn is_fresh(&self, fingerprint: &StepFingerprint, step: &ProcessDataBindingStep) -> bool {
        self.fingerprint == *fingerprint
            && step.resource_output_dir().is_dir()
            && step.metadata_output_dir().join(INFO_CLASS_FILE_NAME).is_file()
    }
}
