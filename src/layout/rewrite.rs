use super::expression::{self, BindingValue};
use super::info::{binding_class_name, BindingExpression, BindingTarget, Import, LayoutInfo, Variable};
use crate::processor::DataBindingProcessingError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;
use tracing::debug;

const LAYOUT_TAG: &str = "layout";
const DATA_TAG: &str = "data";
const MERGE_TAG: &str = "merge";
const ANDROID_TAG: &str = "android:tag";
const ANDROID_ID: &str = "android:id";

/// A layout file being rewritten
#[derive(Debug, Clone, Copy)]
pub struct LayoutSource<'a> {
    /// File the contents were read from
    pub path: &'a Path,
    /// Path relative to the resource root
    pub relative: &'a Path,
    /// Resource folder, e.g. `layout-land`
    pub folder: &'a str,
    /// Layout name, e.g. `activity_main`
    pub name: &'a str,
}

/// Result of rewriting one layout file
#[derive(Debug)]
pub struct RewriteOutcome {
    /// Plain layout XML for the resource compiler
    pub contents: Vec<u8>,
    /// Present when the layout used data binding
    pub info: Option<LayoutInfo>,
}

/// Strips data-binding markup from layout XML
pub struct LayoutRewriter<'p> {
    package: &'p str,
}

type Result<T> = std::result::Result<T, DataBindingProcessingError>;

impl<'p> LayoutRewriter<'p> {
    pub fn new(package: &'p str) -> Self {
        Self { package }
    }

    pub fn rewrite(&self, source: &LayoutSource<'_>, contents: &str) -> Result<RewriteOutcome> {
        let root = scan_root_element(source.path, contents)?;

        if root != LAYOUT_TAG {
            debug!("Plain layout {}", source.relative.display());
            return Ok(RewriteOutcome {
                contents: contents.as_bytes().to_vec(),
                info: None,
            });
        }

        let (contents, info) = BindingLayoutRewrite::new(self.package, source).run(contents)?;
        debug!(
            "Data binding layout {}: {} targets, {} expressions",
            source.relative.display(),
            info.targets.len(),
            info.expression_count()
        );

        Ok(RewriteOutcome {
            contents,
            info: Some(info),
        })
    }
}

fn malformed_at(path: &Path, reader: &Reader<&[u8]>, err: impl std::fmt::Display) -> DataBindingProcessingError {
    DataBindingProcessingError::malformed(
        path,
        format!("{} at position {}", err, reader.buffer_position()),
    )
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Check the document is well formed and return the name of its root element
fn scan_root_element(path: &Path, contents: &str) -> Result<String> {
    let mut reader = Reader::from_str(contents);
    reader.check_end_names(true);

    let mut depth = 0usize;
    let mut root: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| malformed_at(path, &reader, e))?;
        match event {
            Event::DocType(_) => {
                return Err(DataBindingProcessingError::parser_configuration(
                    path,
                    "DOCTYPE declarations are disabled",
                ));
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err(malformed_at(path, &reader, "more than one root element"));
                    }
                    root = Some(element_name(e));
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed_at(path, &reader, "unexpected closing tag"))?;
            }
            Event::Text(ref t) if depth == 0 => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(malformed_at(path, &reader, "text outside the root element"));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(DataBindingProcessingError::malformed(
            path,
            format!("unexpected end of document with {} unclosed element(s)", depth),
        ));
    }

    root.ok_or_else(|| DataBindingProcessingError::malformed(path, "document has no root element"))
}

/// State for rewriting a single `<layout>` document
struct BindingLayoutRewrite<'a> {
    package: &'a str,
    source: &'a LayoutSource<'a>,
    /// Namespace declarations of `<layout>`, moved onto the root view
    layout_attributes: Vec<(String, String)>,
    custom_class: Option<String>,
    variables: Vec<Variable>,
    imports: Vec<Import>,
    targets: Vec<BindingTarget>,
    root_view: Option<String>,
    next_binding_index: usize,
}

impl<'a> BindingLayoutRewrite<'a> {
    fn new(package: &'a str, source: &'a LayoutSource<'a>) -> Self {
        Self {
            package,
            source,
            layout_attributes: Vec::new(),
            custom_class: None,
            variables: Vec::new(),
            imports: Vec::new(),
            targets: Vec::new(),
            root_view: None,
            next_binding_index: 1,
        }
    }

    fn path(&self) -> &'a Path {
        self.source.path
    }

    fn run(mut self, contents: &str) -> Result<(Vec<u8>, LayoutInfo)> {
        let mut reader = Reader::from_str(contents);
        reader.check_end_names(true);
        let mut writer = Writer::new(Vec::new());

        // Depth 0 is outside <layout>, depth 1 is directly inside it
        let mut depth = 0usize;
        let mut in_data = false;

        loop {
            let event = reader.read_event().map_err(|e| malformed_at(self.path(), &reader, e))?;
            match &event {
                Event::Eof => break,
                Event::Decl(_) => {
                    self.write(&mut writer, &event)?;
                    self.write(&mut writer, &Event::Text(BytesText::new("\n")))?;
                }
                Event::Start(e) | Event::Empty(e) => {
                    let is_start = matches!(event, Event::Start(_));
                    let name = element_name(e);

                    if depth == 0 {
                        self.read_layout_element(e)?;
                        if !is_start {
                            return Err(DataBindingProcessingError::binding_model(
                                self.path(),
                                "<layout> has no root view",
                            ));
                        }
                    } else if in_data {
                        if depth == 2 {
                            self.read_data_child(&name, e)?;
                        }
                    } else if depth == 1 && name == DATA_TAG {
                        self.read_data_element(e)?;
                        in_data = is_start;
                    } else if depth == 1 {
                        let element = self.rewrite_root_view(&name, e)?;
                        self.write_element(&mut writer, element, &event, is_start)?;
                    } else {
                        let element = self.rewrite_child_view(&name, e)?;
                        self.write_element(&mut writer, element, &event, is_start)?;
                    }

                    if is_start {
                        depth += 1;
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if in_data && depth == 1 {
                        in_data = false;
                    } else if depth >= 2 && !in_data {
                        self.write(&mut writer, &event)?;
                    } else if depth == 1 && !in_data {
                        // closing tag of the root view
                        self.write(&mut writer, &event)?;
                    }
                }
                Event::DocType(_) => {
                    return Err(DataBindingProcessingError::parser_configuration(
                        self.path(),
                        "DOCTYPE declarations are disabled",
                    ));
                }
                // Whitespace and comments between <layout>, <data> and the root view are dropped
                _ => {
                    if depth >= 2 && !in_data {
                        self.write(&mut writer, &event)?;
                    }
                }
            }
        }

        if self.root_view.is_none() {
            return Err(DataBindingProcessingError::binding_model(
                self.path(),
                "<layout> has no root view",
            ));
        }

        let mut output = writer.into_inner();
        output.push(b'\n');

        let info = LayoutInfo {
            layout_name: self.source.name.to_string(),
            folder: self.source.folder.to_string(),
            file_path: self
                .source
                .relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            module_package: self.package.to_string(),
            binding_class: binding_class_name(
                self.package,
                self.source.name,
                self.custom_class.as_deref(),
            ),
            is_merge: self.root_view.as_deref() == Some(MERGE_TAG),
            variables: self.variables,
            imports: self.imports,
            targets: self.targets,
        };

        Ok((output, info))
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>, event: &Event<'_>) -> Result<()> {
        writer
            .write_event(event)
            .map_err(|e| DataBindingProcessingError::malformed(self.path(), e.to_string()))
    }

    /// Write a rebuilt element, or the original event when nothing changed
    fn write_element(
        &self,
        writer: &mut Writer<Vec<u8>>,
        rebuilt: Option<BytesStart<'static>>,
        original: &Event<'_>,
        is_start: bool,
    ) -> Result<()> {
        match rebuilt {
            Some(element) if is_start => self.write(writer, &Event::Start(element)),
            Some(element) => self.write(writer, &Event::Empty(element)),
            None => self.write(writer, original),
        }
    }

    fn attributes(&self, e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| DataBindingProcessingError::malformed(self.path(), err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| DataBindingProcessingError::malformed(self.path(), err.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(attributes)
    }

    fn read_layout_element(&mut self, e: &BytesStart<'_>) -> Result<()> {
        self.layout_attributes = self
            .attributes(e)?
            .into_iter()
            .filter(|(key, _)| is_namespace_declaration(key))
            .collect();
        Ok(())
    }

    fn read_data_element(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if let Some((_, class)) = self.attributes(e)?.into_iter().find(|(k, _)| k == "class") {
            if class.trim().is_empty() {
                return Err(DataBindingProcessingError::binding_model(
                    self.path(),
                    "<data class> must not be empty",
                ));
            }
            self.custom_class = Some(class.trim().to_string());
        }
        Ok(())
    }

    fn read_data_child(&mut self, name: &str, e: &BytesStart<'_>) -> Result<()> {
        let attributes = self.attributes(e)?;
        let get = |key: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        match name {
            "variable" => {
                let (Some(var_name), Some(type_name)) = (get("name"), get("type")) else {
                    return Err(DataBindingProcessingError::binding_model(
                        self.path(),
                        "<variable> requires both 'name' and 'type'",
                    ));
                };
                if !is_identifier(&var_name) {
                    return Err(DataBindingProcessingError::binding_model(
                        self.path(),
                        format!("'{}' is not a valid variable name", var_name),
                    ));
                }
                if self.variables.iter().any(|v| v.name == var_name) {
                    return Err(DataBindingProcessingError::binding_model(
                        self.path(),
                        format!("variable '{}' is declared more than once", var_name),
                    ));
                }
                self.variables.push(Variable {
                    name: var_name,
                    type_name,
                });
            }
            "import" => {
                let Some(type_name) = get("type") else {
                    return Err(DataBindingProcessingError::binding_model(
                        self.path(),
                        "<import> requires a 'type'",
                    ));
                };
                let alias = get("alias").unwrap_or_else(|| {
                    type_name
                        .rsplit('.')
                        .next()
                        .unwrap_or(type_name.as_str())
                        .to_string()
                });
                if self.imports.iter().any(|i| i.alias == alias) {
                    return Err(DataBindingProcessingError::binding_model(
                        self.path(),
                        format!("import alias '{}' is declared more than once", alias),
                    ));
                }
                self.imports.push(Import { type_name, alias });
            }
            _ => {}
        }
        Ok(())
    }

    fn rewrite_root_view(&mut self, name: &str, e: &BytesStart<'_>) -> Result<Option<BytesStart<'static>>> {
        if let Some(existing) = &self.root_view {
            return Err(DataBindingProcessingError::binding_model(
                self.path(),
                format!(
                    "<layout> must contain a single root view, found <{}> after <{}>",
                    name, existing
                ),
            ));
        }
        self.root_view = Some(name.to_string());

        let mut attributes = self.attributes(e)?;
        for (key, value) in self.layout_attributes.iter().rev() {
            if !attributes.iter().any(|(k, _)| k == key) {
                attributes.insert(0, (key.clone(), value.clone()));
            }
        }

        if name == MERGE_TAG {
            let (kept, bindings) = self.split_bindings(attributes)?;
            if !bindings.is_empty() {
                return Err(DataBindingProcessingError::binding_model(
                    self.path(),
                    "binding expressions are not allowed on a <merge> root",
                ));
            }
            return Ok(Some(build_element(name, &kept, None)));
        }

        let tag = format!("{}/{}_0", LAYOUT_TAG, self.source.name);
        self.rebuild_target(name, attributes, tag).map(Some)
    }

    fn rewrite_child_view(&mut self, name: &str, e: &BytesStart<'_>) -> Result<Option<BytesStart<'static>>> {
        let attributes = self.attributes(e)?;
        let has_bindings = attributes
            .iter()
            .any(|(_, v)| v.starts_with("@{") || v.starts_with("@={"));
        if !has_bindings {
            return Ok(None);
        }

        let tag = format!("binding_{}", self.next_binding_index);
        self.next_binding_index += 1;
        self.rebuild_target(name, attributes, tag).map(Some)
    }

    /// Record a binding target and rebuild its element with the generated tag
    fn rebuild_target(
        &mut self,
        name: &str,
        attributes: Vec<(String, String)>,
        tag: String,
    ) -> Result<BytesStart<'static>> {
        let (mut kept, expressions) = self.split_bindings(attributes)?;

        let original_tag = kept
            .iter()
            .position(|(k, _)| k == ANDROID_TAG)
            .map(|index| kept.remove(index).1);
        let id = kept
            .iter()
            .find(|(k, _)| k == ANDROID_ID)
            .map(|(_, v)| v.clone());

        let element = build_element(name, &kept, Some(&tag));
        self.targets.push(BindingTarget {
            tag,
            view: name.to_string(),
            id,
            original_tag,
            expressions,
        });
        Ok(element)
    }

    /// Separate bound attributes from plain ones
    fn split_bindings(
        &self,
        attributes: Vec<(String, String)>,
    ) -> Result<(Vec<(String, String)>, Vec<BindingExpression>)> {
        let mut kept = Vec::new();
        let mut expressions = Vec::new();

        for (key, value) in attributes {
            let binding = expression::classify(&value).map_err(|message| {
                DataBindingProcessingError::expression(self.path(), format!("{}: {}", key, message))
            })?;
            match binding {
                BindingValue::Plain => kept.push((key, value)),
                BindingValue::OneWay(text) | BindingValue::TwoWay(text) => {
                    expressions.push(BindingExpression {
                        attribute: key.clone(),
                        text: text.to_string(),
                        two_way: binding.is_two_way(),
                    });
                }
            }
        }

        Ok((kept, expressions))
    }
}

fn build_element(name: &str, attributes: &[(String, String)], tag: Option<&str>) -> BytesStart<'static> {
    let mut element = BytesStart::new(name.to_string());
    for (key, value) in attributes {
        element.push_attribute((key.as_str(), value.as_str()));
    }
    if let Some(tag) = tag {
        element.push_attribute((ANDROID_TAG, tag));
    }
    element
}

fn is_namespace_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
