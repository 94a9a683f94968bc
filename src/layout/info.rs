use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

/// `<variable>` declared in a layout's `<data>` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub type_name: String,
}

/// `<import>` declared in a layout's `<data>` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub type_name: String,
    pub alias: String,
}

/// A bound attribute on a target view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingExpression {
    pub attribute: String,
    pub text: String,
    pub two_way: bool,
}

/// A view the generated binding class keeps a reference to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTarget {
    /// Tag written onto the view in the stripped layout
    pub tag: String,
    pub view: String,
    pub id: Option<String>,
    /// `android:tag` the view carried before it was replaced
    pub original_tag: Option<String>,
    pub expressions: Vec<BindingExpression>,
}

/// Everything extracted from one data-binding layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutInfo {
    pub layout_name: String,
    /// Resource folder, e.g. `layout` or `layout-land`
    pub folder: String,
    /// Layout path relative to the resource root, `/`-separated
    pub file_path: String,
    pub module_package: String,
    pub binding_class: String,
    pub is_merge: bool,
    pub variables: Vec<Variable>,
    pub imports: Vec<Import>,
    pub targets: Vec<BindingTarget>,
}

impl LayoutInfo {
    /// Name of the layout-info file, e.g. `activity_main-layout.xml`
    pub fn file_name(&self) -> String {
        format!("{}-{}.xml", self.layout_name, self.folder)
    }

    pub fn expression_count(&self) -> usize {
        self.targets.iter().map(|t| t.expressions.len()).sum()
    }

    /// Serialize as a `<Layout>` document
    pub fn to_xml(&self) -> quick_xml::Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))?;

        let layout = BytesStart::new("Layout").with_attributes([
            ("layout", self.layout_name.as_str()),
            ("modulePackage", self.module_package.as_str()),
            ("filePath", self.file_path.as_str()),
            ("directory", self.folder.as_str()),
            ("bindingClass", self.binding_class.as_str()),
            ("isMerge", if self.is_merge { "true" } else { "false" }),
        ]);
        writer.write_event(Event::Start(layout))?;

        for variable in &self.variables {
            let element = BytesStart::new("Variables").with_attributes([
                ("name", variable.name.as_str()),
                ("type", variable.type_name.as_str()),
                ("declared", "true"),
            ]);
            writer.write_event(Event::Empty(element))?;
        }

        for import in &self.imports {
            let element = BytesStart::new("Imports").with_attributes([
                ("name", import.alias.as_str()),
                ("type", import.type_name.as_str()),
            ]);
            writer.write_event(Event::Empty(element))?;
        }

        writer.write_event(Event::Start(BytesStart::new("Targets")))?;
        for target in &self.targets {
            let mut element = BytesStart::new("Target");
            if let Some(id) = &target.id {
                element.push_attribute(("id", id.as_str()));
            }
            element.push_attribute(("tag", target.tag.as_str()));
            if let Some(original) = &target.original_tag {
                element.push_attribute(("originalTag", original.as_str()));
            }
            element.push_attribute(("view", target.view.as_str()));

            if target.expressions.is_empty() {
                writer.write_event(Event::Empty(element))?;
                continue;
            }

            writer.write_event(Event::Start(element))?;
            writer.write_event(Event::Start(BytesStart::new("Expressions")))?;
            for expression in &target.expressions {
                let element = BytesStart::new("Expression").with_attributes([
                    ("attribute", expression.attribute.as_str()),
                    ("text", expression.text.as_str()),
                    ("twoWay", if expression.two_way { "true" } else { "false" }),
                ]);
                writer.write_event(Event::Empty(element))?;
            }
            writer.write_event(Event::End(BytesEnd::new("Expressions")))?;
            writer.write_event(Event::End(BytesEnd::new("Target")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("Targets")))?;

        writer.write_event(Event::End(BytesEnd::new("Layout")))?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// `activity_main` -> `ActivityMainBinding`
pub fn binding_class_simple_name(layout_name: &str) -> String {
    let mut name = String::with_capacity(layout_name.len() + 7);
    for part in layout_name.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    name.push_str("Binding");
    name
}

/// Fully qualified binding class for a layout.
///
/// `custom` is the `class` attribute of `<data>`: a leading `.` is relative to
/// the module package, an unqualified name lands in `<package>.databinding`.
pub fn binding_class_name(package: &str, layout_name: &str, custom: Option<&str>) -> String {
    match custom {
        Some(custom) if custom.starts_with('.') => format!("{}{}", package, custom),
        Some(custom) if custom.contains('.') => custom.to_string(),
        Some(custom) => format!("{}.databinding.{}", package, custom),
        None => format!(
            "{}.databinding.{}",
            package,
            binding_class_simple_name(layout_name)
        ),
    }
}
