//! Default layout processor
//!
//! Rewrites data-binding layouts into plain layout XML using quick-xml,
//! writes one `<Layout>` info file per binding layout and a JSON
//! class-generation descriptor.

mod expression;
mod info;
mod info_class;
mod rewrite;

pub use expression::{classify, BindingValue};
pub use info::{
    binding_class_name, binding_class_simple_name, BindingExpression, BindingTarget, Import, LayoutInfo,
    Variable,
};
pub use info_class::{DataBindingInfo, LayoutEntry, INFO_CLASS_FILE_NAME};
pub use rewrite::{LayoutRewriter, LayoutSource, RewriteOutcome};

use crate::discovery::{ResourceFinder, ResourceKind};
use crate::processor::{
    DataBindingProcessingError, LayoutProcessor, LayoutProcessorFactory, ProcessingError, ProcessorOptions,
    ResourceInput,
};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Layout processor backed by quick-xml
#[derive(Debug)]
pub struct XmlLayoutProcessor {
    options: ProcessorOptions,
    layouts: Vec<LayoutInfo>,
}

impl XmlLayoutProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self {
            options,
            layouts: Vec::new(),
        }
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Data-binding layouts found by the last `process_resources` pass
    pub fn layouts(&self) -> &[LayoutInfo] {
        &self.layouts
    }

    fn read_layout(&self, path: &Path) -> Result<String, ProcessingError> {
        let bytes = fs::read(path).map_err(|e| ProcessingError::io(path, e))?;
        String::from_utf8(bytes)
            .map_err(|e| DataBindingProcessingError::malformed(path, format!("not valid UTF-8: {}", e)).into())
    }
}

impl LayoutProcessor for XmlLayoutProcessor {
    fn process_resources(&mut self, input: &ResourceInput) -> Result<(), ProcessingError> {
        self.layouts.clear();

        let files = ResourceFinder::new()
            .find(&input.input_dir)
            .map_err(|e| ProcessingError::io(&input.input_dir, e))?;

        let rewriter = LayoutRewriter::new(&self.options.package_name);
        let mut layouts = Vec::new();
        let mut produced = HashSet::new();

        for file in &files {
            let target = input.output_dir.join(&file.relative);

            match file.kind {
                ResourceKind::Layout => {
                    let Some(source_path) = self.options.file_filter.apply(&file.path) else {
                        trace!("Filtered out: {}", file.relative.display());
                        continue;
                    };

                    let contents = self.read_layout(&source_path)?;
                    let source = LayoutSource {
                        path: &source_path,
                        relative: &file.relative,
                        folder: file.folder(),
                        name: file.resource_name(),
                    };
                    let outcome = rewriter.rewrite(&source, &contents)?;

                    self.options.writer.write(&target, &outcome.contents)?;
                    produced.insert(file.relative.clone());
                    layouts.extend(outcome.info);
                }
                ResourceKind::Other => {
                    let contents = fs::read(&file.path).map_err(|e| ProcessingError::io(&file.path, e))?;
                    self.options.writer.write(&target, &contents)?;
                    produced.insert(file.relative.clone());
                }
            }
        }

        // Outputs of resources removed since the last run
        self.options.writer.prune(&input.output_dir, &produced)?;

        debug!(
            "Processed {} resource files, {} data binding layouts",
            files.len(),
            layouts.len()
        );
        self.layouts = layouts;
        Ok(())
    }

    fn write_layout_info_files(&mut self, xml_out_dir: &Path) -> Result<(), ProcessingError> {
        let mut produced: HashSet<PathBuf> = HashSet::new();
        produced.insert(PathBuf::from(INFO_CLASS_FILE_NAME));

        for layout in &self.layouts {
            produced.insert(PathBuf::from(layout.file_name()));
            let path = xml_out_dir.join(layout.file_name());
            let xml = layout
                .to_xml()
                .map_err(|e| ProcessingError::io(&path, io::Error::new(io::ErrorKind::Other, e.to_string())))?;
            self.options.writer.write(&path, &xml)?;
            trace!("Wrote layout info: {}", path.display());
        }

        self.options.writer.prune(xml_out_dir, &produced)?;
        Ok(())
    }

    fn write_info_class(
        &mut self,
        sdk_dir: Option<&Path>,
        xml_out_dir: &Path,
        export_class_list_to: Option<&Path>,
    ) -> Result<(), ProcessingError> {
        let info = DataBindingInfo::collect(
            &self.options.package_name,
            self.options.min_sdk,
            self.options.is_library,
            sdk_dir,
            &self.layouts,
            xml_out_dir,
        )?;

        let path = xml_out_dir.join(INFO_CLASS_FILE_NAME);
        let json = info
            .to_json()
            .map_err(|e| ProcessingError::io(&path, io::Error::new(io::ErrorKind::Other, e)))?;
        self.options.writer.write(&path, &json)?;
        debug!("Wrote info class {} (build id {})", path.display(), info.build_id);

        if let Some(export_path) = export_class_list_to {
            let mut list = info.binding_classes().join("\n");
            list.push('\n');
            self.options.writer.write(export_path, list.as_bytes())?;
        }

        Ok(())
    }
}

/// Creates [`XmlLayoutProcessor`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlLayoutProcessorFactory;

impl LayoutProcessorFactory for XmlLayoutProcessorFactory {
    fn create(&self, options: ProcessorOptions) -> Result<Box<dyn LayoutProcessor>, ProcessingError> {
        Ok(Box::new(XmlLayoutProcessor::new(options)))
    }
}
