//! Serializes an [`XmlElement`] tree to text with quick-xml.
//!
//! Output is deterministic: namespace declarations are emitted on the first
//! element that needs them, before that element's attributes, and
//! attributes keep their stored order. The signing code relies on this to
//! obtain stable bytes for a value.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{SamlError, SamlResult};

use super::node::{QName, XmlElement, XmlNode, XML_NS};

/// Serializes an element and its subtree.
pub fn write_element(element: &XmlElement) -> SamlResult<String> {
    let mut writer = Writer::new(Vec::new());
    let mut scope = NamespaceScope::default();
    write_tree(&mut writer, element, &mut scope)?;
    String::from_utf8(writer.into_inner()).map_err(|e| SamlError::XmlWrite(e.to_string()))
}

/// In-scope prefix bindings, one frame per open element.
#[derive(Default)]
struct NamespaceScope {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScope {
    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn bound_here(&self, prefix: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.iter().any(|(p, _)| p == prefix))
    }

    /// Finds a non-default prefix currently bound to `uri`.
    fn prefix_for(&self, uri: &str) -> Option<String> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .filter(|(p, u)| !p.is_empty() && u == uri)
            .map(|(p, _)| p.clone())
            .find(|p| self.lookup(p) == Some(uri))
    }

    fn declare(&mut self, prefix: &str, uri: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((prefix.to_string(), uri.to_string()));
        }
    }

    fn fresh_prefix(&self) -> String {
        (0..)
            .map(|n| format!("ns{n}"))
            .find(|candidate| self.lookup(candidate).is_none())
            .unwrap_or_else(|| "ns".to_string())
    }
}

fn write_tree(
    writer: &mut Writer<Vec<u8>>,
    element: &XmlElement,
    scope: &mut NamespaceScope,
) -> SamlResult<()> {
    scope.frames.push(Vec::new());

    let tag = element_tag(element.name(), scope);
    for (prefix, uri) in element.namespace_declarations() {
        if scope.lookup(prefix) != Some(uri.as_str()) && !scope.bound_here(prefix) {
            scope.declare(prefix, uri);
        }
    }
    redeclare_value_prefixes(element, scope);
    let attributes: Vec<(String, &str)> = element
        .attributes()
        .iter()
        .map(|attribute| (attribute_key(attribute.name(), scope), attribute.value()))
        .collect();

    let mut start = BytesStart::new(tag.clone());
    if let Some(frame) = scope.frames.last() {
        for (prefix, uri) in frame {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{prefix}")
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
    }
    for (key, value) in &attributes {
        start.push_attribute((key.as_str(), *value));
    }

    if element.children().is_empty() {
        emit(writer, Event::Empty(start))?;
    } else {
        emit(writer, Event::Start(start))?;
        for child in element.children() {
            match child {
                XmlNode::Element(nested) => write_tree(writer, nested, scope)?,
                XmlNode::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
            }
        }
        emit(writer, Event::End(BytesEnd::new(tag)))?;
    }

    scope.frames.pop();
    Ok(())
}

/// Declares prefixes that attribute values or direct text of a parsed
/// element use as QNames, such as `xsi:type="ext:Custom"`, when the
/// declaration sat on an ancestor that is not written.
fn redeclare_value_prefixes(element: &XmlElement, scope: &mut NamespaceScope) {
    if element.in_scope_namespaces().is_empty() {
        return;
    }
    let text = element.text();
    let values = element
        .attributes()
        .iter()
        .map(|attribute| attribute.value())
        .chain(std::iter::once(text.as_str()));
    for value in values {
        let Some(prefix) = value_prefix(value) else {
            continue;
        };
        let Some(uri) = element.lookup_namespace(prefix) else {
            continue;
        };
        if scope.lookup(prefix) != Some(uri) && !scope.bound_here(prefix) {
            scope.declare(prefix, uri);
        }
    }
}

/// Returns the prefix of `value` when it reads as a prefixed name.
fn value_prefix(value: &str) -> Option<&str> {
    let (prefix, local) = value.trim().split_once(':')?;
    (is_ncname(prefix) && is_ncname(local) && prefix != "xml").then_some(prefix)
}

fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn element_tag(name: &QName, scope: &mut NamespaceScope) -> String {
    match (name.namespace(), name.prefix()) {
        (Some(uri), Some(prefix)) => {
            if scope.lookup(prefix) != Some(uri) {
                scope.declare(prefix, uri);
            }
            name.prefixed()
        }
        (Some(uri), None) => {
            if scope.lookup("") != Some(uri) {
                scope.declare("", uri);
            }
            name.local_name().to_string()
        }
        (None, _) => {
            if scope.lookup("").is_some_and(|uri| !uri.is_empty()) {
                scope.declare("", "");
            }
            name.local_name().to_string()
        }
    }
}

fn attribute_key(name: &QName, scope: &mut NamespaceScope) -> String {
    let Some(uri) = name.namespace() else {
        return name.local_name().to_string();
    };
    if uri == XML_NS {
        return format!("xml:{}", name.local_name());
    }

    let prefix = match name.prefix() {
        Some(preferred) if scope.lookup(preferred) == Some(uri) => preferred.to_string(),
        Some(preferred) if !scope.bound_here(preferred) => {
            scope.declare(preferred, uri);
            preferred.to_string()
        }
        _ => {
            if let Some(existing) = scope.prefix_for(uri) {
                existing
            } else {
                let generated = scope.fresh_prefix();
                scope.declare(&generated, uri);
                generated
            }
        }
    };
    format!("{prefix}:{}", name.local_name())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> SamlResult<()> {
    writer
        .write_event(event)
        .map_err(|e| SamlError::XmlWrite(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{parse_document, XmlAttribute};

    #[test]
    fn declares_each_namespace_once() {
        let root = XmlElement::new(QName::ns("urn:a", "a", "Root"))
            .with_child(XmlElement::new(QName::ns("urn:a", "a", "Child")).with_text("x"))
            .with_child(XmlElement::new(QName::ns("urn:b", "b", "Other")));

        let text = write_element(&root).unwrap();
        assert_eq!(
            text,
            r#"<a:Root xmlns:a="urn:a"><a:Child>x</a:Child><b:Other xmlns:b="urn:b"/></a:Root>"#
        );
    }

    #[test]
    fn escapes_attribute_values_and_text() {
        let root = XmlElement::new(QName::local("e"))
            .with_attribute("q", "a\"<b")
            .with_text("1 < 2 & 3");
        let text = write_element(&root).unwrap();
        let parsed = parse_document(&text).unwrap();
        assert_eq!(parsed.attribute("q"), Some("a\"<b"));
        assert_eq!(parsed.text(), "1 < 2 & 3");
    }

    #[test]
    fn renames_conflicting_attribute_prefix() {
        let mut root = XmlElement::new(QName::ns("urn:a", "p", "Root"));
        root.push_attribute(XmlAttribute::new(QName::ns("urn:other", "p", "attr"), "v"));

        let text = write_element(&root).unwrap();
        let parsed = parse_document(&text).unwrap();
        assert!(parsed.is("urn:a", "Root"));
        assert_eq!(parsed.attribute_ns("urn:other", "attr"), Some("v"));
    }

    #[test]
    fn writes_explicit_declarations_before_attributes() {
        let mut root = XmlElement::new(QName::ns("urn:a", "a", "Value"));
        root.declare_namespace("xs", "http://www.w3.org/2001/XMLSchema");
        root.set_attribute("plain", "1");

        let text = write_element(&root).unwrap();
        assert_eq!(
            text,
            r#"<a:Value xmlns:a="urn:a" xmlns:xs="http://www.w3.org/2001/XMLSchema" plain="1"/>"#
        );
    }

    #[test]
    fn redeclares_prefix_used_in_attribute_value() {
        let root = parse_document(
            r#"<a:Root xmlns:a="urn:a" xmlns:ext="urn:ext" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><a:Statement xsi:type="ext:Custom"/></a:Root>"#,
        )
        .unwrap();
        let statement = root.first_child_element().unwrap();

        let text = write_element(statement).unwrap();
        assert!(text.contains(r#"xmlns:ext="urn:ext""#), "{text}");
        let reparsed = parse_document(&text).unwrap();
        assert_eq!(&reparsed, statement);
        assert_eq!(write_element(&reparsed).unwrap(), text);
    }

    #[test]
    fn redeclares_prefix_used_in_text() {
        let root = parse_document(r#"<r xmlns:q="urn:q"><v>q:name</v></r>"#).unwrap();
        let text = write_element(root.first_child_element().unwrap()).unwrap();
        assert_eq!(text, r#"<v xmlns:q="urn:q">q:name</v>"#);
    }

    #[test]
    fn leaves_uri_values_alone() {
        let root = parse_document(
            r#"<r xmlns:urn="urn:x" xmlns:https="urn:y"><v a="urn:oasis:names:tc:SAML:2.0:protocol">https://idp.example.org</v></r>"#,
        )
        .unwrap();
        let text = write_element(root.first_child_element().unwrap()).unwrap();
        assert!(!text.contains("xmlns"), "{text}");
    }

    #[test]
    fn round_trips_tree_through_text() {
        let root = parse_document(
            r#"<r xmlns="urn:d" xmlns:f="urn:f" f:flag="1"><f:item>one</f:item><item>two</item></r>"#,
        )
        .unwrap();
        let reparsed = parse_document(&write_element(&root).unwrap()).unwrap();
        assert_eq!(root, reparsed);
    }
}
