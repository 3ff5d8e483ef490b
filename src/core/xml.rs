// src/core/xml.rs

//! `xml.in`: reads values out of an XML file.
//!
//! The path `a/b/c` selects the text of every `c` element under `b` under the root
//! element `a`. When no element matches the last segment, `c.attr` selects the `attr`
//! attribute of the `c` elements instead. Dotted element names such as
//! `maven.compiler.source` are matched as elements first; the attribute name is what
//! follows the last dot.

use crate::constants::PATH_SEPARATOR;
use crate::core::{
    attributes::AttributeSpec,
    files::expand_user,
    kinds::ComputedKind,
    property::{Property, PropertyError, PropertyRef, error_detail, error_value},
};
use roxmltree::{Document, Node};
use std::fs;

/// The elements reached by `parents` then `last`, the first name being the root.
fn elements<'a, 'input>(
    root: Node<'a, 'input>,
    parents: &[&str],
    last: &str,
) -> Vec<Node<'a, 'input>> {
    let mut names = parents.iter().copied().chain(std::iter::once(last));
    match names.next() {
        Some(name) if root.tag_name().name() == name => {}
        _ => return Vec::new(),
    }

    let mut nodes = vec![root];
    for name in names {
        nodes = nodes
            .iter()
            .flat_map(|node| {
                node.children()
                    .filter(move |child| child.is_element() && child.tag_name().name() == name)
            })
            .collect();
    }
    nodes
}

fn text_of(node: &Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|text| text.text())
        .collect()
}

/// Evaluates an `a/b/c` or `a/b.attr` path against a parsed document.
pub fn select(document: &Document<'_>, path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return Vec::new();
    };
    let root = document.root_element();

    let matched = elements(root, parents, last);
    if !matched.is_empty() {
        return matched.iter().map(text_of).collect();
    }

    match last.rsplit_once('.') {
        Some((element, attribute)) => elements(root, parents, element)
            .iter()
            .filter_map(|node| node.attribute(attribute).map(str::to_string))
            .collect(),
        None => Vec::new(),
    }
}

/// The `xml.in` property.
pub fn xml_in() -> Result<PropertyRef, PropertyError> {
    let kind = ComputedKind::eager(
        vec![
            AttributeSpec::required("file"),
            AttributeSpec::required("path"),
            AttributeSpec::optional("default", ""),
            AttributeSpec::optional("sep", PATH_SEPARATOR),
        ],
        |property, _| {
            let attrs = property.attributes();
            let (Some(file), Some(path), Some(default), Some(sep)) = (
                attrs.value("file"),
                attrs.value("path"),
                attrs.value("default"),
                attrs.value("sep"),
            ) else {
                return Ok(error_value(property.name()));
            };

            let contents = match fs::read_to_string(expand_user(file)) {
                Ok(contents) => contents,
                Err(e) => return Ok(error_detail(property.name(), e)),
            };
            let document = match Document::parse(&contents) {
                Ok(document) => document,
                Err(e) => return Ok(error_detail(property.name(), e)),
            };

            let values = select(&document, path);
            Ok(if values.is_empty() {
                default.to_string()
            } else {
                values.join(sep)
            })
        },
    );
    Property::new(
        "xml.in",
        "Reads the text or attribute at path from the XML file, separated by sep.",
        kind,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::property_maps::PropertyMaps;
    use pretty_assertions::assert_eq;

    const PROJECT: &str = r#"<project version="2">
  <build>
    <dir>out</dir>
    <classpath><entry kind="lib">a.jar</entry><entry kind="src">src</entry></classpath>
  </build>
</project>"#;

    #[test]
    fn test_select_text_and_attributes() {
        let document = Document::parse(PROJECT).unwrap();
        assert_eq!(select(&document, "project/build/dir"), vec!["out"]);
        assert_eq!(
            select(&document, "project/build/classpath/entry"),
            vec!["a.jar", "src"]
        );
        assert_eq!(
            select(&document, "project/build/classpath/entry.kind"),
            vec!["lib", "src"]
        );
        assert_eq!(select(&document, "project.version"), vec!["2"]);
        assert!(select(&document, "other/build").is_empty());
    }

    #[test]
    fn test_select_dotted_element_names() {
        let document = Document::parse(
            r#"<project>
  <properties>
    <maven.compiler.source kind="release">17</maven.compiler.source>
  </properties>
</project>"#,
        )
        .unwrap();
        assert_eq!(
            select(&document, "project/properties/maven.compiler.source"),
            vec!["17"]
        );
        assert_eq!(
            select(&document, "project/properties/maven.compiler.source.kind"),
            vec!["release"]
        );
        assert!(select(&document, "project/properties/maven.compiler.target").is_empty());
    }

    #[test]
    fn test_xml_in_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("project.xml");
        fs::write(&file, PROJECT).unwrap();
        let file = file.display().to_string();

        let mut context = PropertyMaps::new();
        let property = xml_in().unwrap();
        property.set_attribute("file", file.as_str()).unwrap();
        property
            .set_attribute("path", "project/build/classpath/entry")
            .unwrap();
        property.set_attribute("sep", ",").unwrap();
        assert_eq!(property.get_current(&mut context).unwrap(), "a.jar,src");

        property.set_attribute("path", "project/missing").unwrap();
        property.set_attribute("default", "none").unwrap();
        assert_eq!(property.get_current(&mut context).unwrap(), "none");

        property.set_attribute("file", "/does/not/exist.xml").unwrap();
        assert!(
            property
                .get_current(&mut context)
                .unwrap()
                .starts_with("(xml.in Error: ")
        );
    }
}
