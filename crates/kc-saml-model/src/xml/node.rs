//! Owned, namespace-aware XML tree.

use std::fmt;
use std::sync::Arc;

/// Namespace URI bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace-qualified name.
///
/// The prefix is a serialization hint only; two names denote the same
/// element or attribute when namespace and local name agree (see
/// [`QName::matches`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    namespace: Option<String>,
    prefix: Option<String>,
    local_name: String,
}

impl QName {
    /// Creates a qualified name from its parts.
    #[must_use]
    pub fn new(namespace: Option<&str>, prefix: Option<&str>, local_name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local_name: local_name.to_string(),
        }
    }

    /// Creates a namespaced name with its preferred prefix.
    #[must_use]
    pub fn ns(namespace: &str, prefix: &str, local_name: &str) -> Self {
        Self::new(Some(namespace), Some(prefix), local_name)
    }

    /// Creates a name in no namespace.
    #[must_use]
    pub fn local(local_name: &str) -> Self {
        Self::new(None, None, local_name)
    }

    /// Returns the namespace URI, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the prefix hint, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns true if namespace and local name match, ignoring the prefix.
    #[must_use]
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local_name == local_name
    }

    /// Returns the name as written in a document (`prefix:local` or `local`).
    #[must_use]
    pub fn prefixed(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// An attribute of an [`XmlElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    name: QName,
    value: String,
}

impl XmlAttribute {
    /// Creates an attribute.
    #[must_use]
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    /// Returns the attribute name.
    #[must_use]
    pub const fn name(&self) -> &QName {
        &self.name
    }

    /// Returns the attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A child node of an [`XmlElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Nested element.
    Element(XmlElement),
    /// Character data.
    Text(String),
}

/// Prefix bindings in scope at an element of a parsed document, innermost
/// last.
pub(crate) type Bindings = Arc<[(String, String)]>;

/// An XML element with its attributes and children in document order.
///
/// This is the parse-tree boundary of the crate: parsers produce it and
/// every SAML element type is read from and written to it.
///
/// Elements read from a document also remember the prefix bindings that
/// were in scope where they appeared. Those resolve prefixed names used as
/// values (`xsi:type="ext:Custom"`) after the element has been moved into
/// another document, and take no part in equality.
#[derive(Debug, Clone)]
pub struct XmlElement {
    name: QName,
    namespaces: Vec<(String, String)>,
    in_scope: Option<Bindings>,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlNode>,
}

impl PartialEq for XmlElement {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespaces == other.namespaces
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Eq for XmlElement {}

impl XmlElement {
    /// Creates an empty element.
    #[must_use]
    pub const fn new(name: QName) -> Self {
        Self {
            name,
            namespaces: Vec::new(),
            in_scope: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the element name.
    #[must_use]
    pub const fn name(&self) -> &QName {
        &self.name
    }

    /// Returns the namespace URI of the element.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace()
    }

    /// Returns the local name of the element.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.local_name()
    }

    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.name.matches(Some(namespace), local_name)
    }

    /// Returns the attributes in document order.
    #[must_use]
    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Returns the value of an attribute in no namespace.
    #[must_use]
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(None, local_name))
            .map(XmlAttribute::value)
    }

    /// Returns the value of a namespaced attribute.
    #[must_use]
    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(Some(namespace), local_name))
            .map(XmlAttribute::value)
    }

    /// Returns the explicit namespace declarations as `(prefix, uri)` pairs.
    ///
    /// Declarations are only needed for prefixes referenced from content,
    /// such as `xsi:type` values; prefixes of element and attribute names are
    /// declared by the writer on demand.
    #[must_use]
    pub fn namespace_declarations(&self) -> &[(String, String)] {
        &self.namespaces
    }

    /// Returns the prefix bindings in scope where a parsed element appeared.
    ///
    /// Empty for elements built in code.
    #[must_use]
    pub fn in_scope_namespaces(&self) -> &[(String, String)] {
        self.in_scope.as_deref().unwrap_or_default()
    }

    /// Resolves `prefix` (empty for the default namespace) against this
    /// element's own declarations, then the bindings it was parsed under.
    #[must_use]
    pub fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.namespaces
            .iter()
            .chain(self.in_scope_namespaces().iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    pub(crate) fn set_in_scope(&mut self, bindings: Bindings) {
        self.in_scope = (!bindings.is_empty()).then_some(bindings);
    }

    /// Removes the child nodes at `positions`.
    pub(crate) fn remove_children(&mut self, positions: &[usize]) {
        for &position in positions.iter().rev() {
            if position < self.children.len() {
                self.children.remove(position);
            }
        }
    }

    /// Returns all child nodes.
    #[must_use]
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Iterates over child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Returns the first child element.
    #[must_use]
    pub fn first_child_element(&self) -> Option<&XmlElement> {
        self.child_elements().next()
    }

    /// Returns the concatenated character data of direct text children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Sets an attribute in no namespace, replacing any previous value.
    pub fn set_attribute(&mut self, local_name: &str, value: impl Into<String>) {
        self.push_attribute(XmlAttribute::new(QName::local(local_name), value));
    }

    /// Adds an attribute, replacing any attribute with the same name.
    pub fn push_attribute(&mut self, attribute: XmlAttribute) {
        let key = (attribute.name.namespace.clone(), attribute.name.local_name.clone());
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name.matches(key.0.as_deref(), &key.1))
        {
            *existing = attribute;
        } else {
            self.attributes.push(attribute);
        }
    }

    /// Declares a namespace prefix on this element.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        if !self.namespaces.iter().any(|(p, _)| p == prefix) {
            self.namespaces.push((prefix.to_string(), uri.to_string()));
        }
    }

    /// Appends a child element.
    pub fn append_child(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Inserts a child element before all existing children.
    pub fn prepend_child(&mut self, child: XmlElement) {
        self.children.insert(0, XmlNode::Element(child));
    }

    /// Appends character data.
    pub fn append_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Builder form of [`XmlElement::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, local_name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(local_name, value);
        self
    }

    /// Builder form of [`XmlElement::append_child`].
    #[must_use]
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.append_child(child);
        self
    }

    /// Builder form of [`XmlElement::append_text`].
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.append_text(text);
        self
    }
}
