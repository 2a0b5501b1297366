//! Builds an [`XmlElement`] tree from document text with quick-xml.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::NsReader;

use crate::error::{SamlError, SamlResult};

use super::node::{Bindings, QName, XmlAttribute, XmlElement};

/// Parses a document and returns its root element.
///
/// Namespace prefixes are resolved while reading, and every element keeps
/// the bindings in scope where it appeared. Whitespace-only text between
/// child elements, comments, processing instructions and the XML
/// declaration are dropped; text of an element without child elements is
/// kept as written.
pub fn parse_document(text: &str) -> SamlResult<XmlElement> {
    let mut reader = NsReader::from_str(text);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let bindings = scope_of(&stack, &start)?;
                let element = start_element(&reader, &start, &bindings)?;
                stack.push(Frame {
                    element,
                    bindings,
                    blank_text: Vec::new(),
                });
            }
            Event::Empty(start) => {
                let bindings = scope_of(&stack, &start)?;
                let element = start_element(&reader, &start, &bindings)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| SamlError::XmlParse("unexpected end tag".to_string()))?;
                attach(&mut stack, &mut root, frame.finish())?;
            }
            Event::Text(text) => {
                let value = text.unescape()?;
                push_text(&mut stack, &value, false)?;
            }
            Event::CData(data) => {
                let value = std::str::from_utf8(&data)
                    .map_err(|e| SamlError::XmlParse(format!("invalid UTF-8 in CDATA: {e}")))?;
                push_text(&mut stack, value, true)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(SamlError::XmlParse(format!(
            "unclosed element '{}'",
            open.element.name().prefixed()
        )));
    }
    root.ok_or_else(|| SamlError::XmlParse("document has no root element".to_string()))
}

/// An element whose end tag has not been read yet.
struct Frame {
    element: XmlElement,
    bindings: Bindings,
    /// Positions of whitespace-only text children.
    blank_text: Vec<usize>,
}

impl Frame {
    fn finish(mut self) -> XmlElement {
        if self.element.first_child_element().is_some() {
            self.element.remove_children(&self.blank_text);
        }
        self.element
    }
}

/// Returns the bindings in scope inside `start`: the parent's, overridden
/// by the element's own `xmlns` attributes.
fn scope_of(stack: &[Frame], start: &BytesStart<'_>) -> SamlResult<Bindings> {
    let inherited = stack
        .last()
        .map_or_else(|| Arc::from(Vec::new()), |frame| Arc::clone(&frame.bindings));

    let mut declared = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| SamlError::XmlParse(e.to_string()))?;
        let prefix = match attribute.key.as_namespace_binding() {
            Some(PrefixDeclaration::Default) => String::new(),
            Some(PrefixDeclaration::Named(prefix)) => utf8(prefix)?.to_string(),
            None => continue,
        };
        declared.push((prefix, attribute.unescape_value()?.into_owned()));
    }
    if declared.is_empty() {
        return Ok(inherited);
    }

    let mut bindings: Vec<(String, String)> = inherited
        .iter()
        .filter(|(prefix, _)| !declared.iter().any(|(own, _)| own == prefix))
        .cloned()
        .collect();
    bindings.extend(declared);
    Ok(Arc::from(bindings))
}

fn start_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    bindings: &Bindings,
) -> SamlResult<XmlElement> {
    let (resolved, local) = reader.resolve_element(start.name());
    let namespace = namespace_of(resolved)?;
    let prefix = match start.name().prefix() {
        Some(prefix) => Some(utf8(prefix.as_ref())?.to_string()),
        None => None,
    };
    let mut element = XmlElement::new(QName::new(
        namespace.as_deref(),
        prefix.as_deref(),
        utf8(local.as_ref())?,
    ));
    element.set_in_scope(Arc::clone(bindings));

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| SamlError::XmlParse(e.to_string()))?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attribute.key);
        let namespace = namespace_of(resolved)?;
        let prefix = match attribute.key.prefix() {
            Some(prefix) => Some(utf8(prefix.as_ref())?.to_string()),
            None => None,
        };
        let value = attribute.unescape_value()?;
        element.push_attribute(XmlAttribute::new(
            QName::new(namespace.as_deref(), prefix.as_deref(), utf8(local.as_ref())?),
            value.into_owned(),
        ));
    }

    Ok(element)
}

fn namespace_of(resolved: ResolveResult<'_>) -> SamlResult<Option<String>> {
    match resolved {
        ResolveResult::Bound(namespace) => Ok(Some(utf8(namespace.as_ref())?.to_string())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(SamlError::XmlParse(format!(
            "unknown namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn attach(
    stack: &mut [Frame],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> SamlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.element.append_child(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(SamlError::XmlParse(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Frame], text: &str, cdata: bool) -> SamlResult<()> {
    let blank = text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'));
    match stack.last_mut() {
        Some(frame) => {
            if blank && !cdata {
                frame.blank_text.push(frame.element.children().len());
            }
            frame.element.append_text(text);
            Ok(())
        }
        None if blank => Ok(()),
        None => Err(SamlError::XmlParse(
            "character data outside the root element".to_string(),
        )),
    }
}

fn utf8(bytes: &[u8]) -> SamlResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| SamlError::XmlParse(format!("invalid UTF-8: {e}")))
}
