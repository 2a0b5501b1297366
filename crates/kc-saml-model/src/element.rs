//! Element contract shared by every SAML element type.
//!
//! An element type names its qualified name through associated constants,
//! reads itself from an [`XmlElement`] and writes itself back. The
//! collection helpers below enforce child cardinality while delegating to
//! each child type's own [`SamlElement::from_xml`].

use crate::error::{SamlError, SamlResult};
use crate::xml::{parse_document, write_element, QName, XmlElement};

/// Two-way mapping between a typed value and its XML element.
///
/// For every validly constructed value `e`,
/// `T::from_xml(&e.to_xml())` is equal to `e`.
pub trait SamlElement: Sized {
    /// Namespace URI of the element.
    const NAMESPACE: &'static str;
    /// Prefix used when the element is written.
    const PREFIX: &'static str;
    /// Local name of the element.
    const LOCAL_NAME: &'static str;

    /// Reads and validates a value from an element node.
    fn from_xml(element: &XmlElement) -> SamlResult<Self>;

    /// Writes the value as a standalone element.
    fn to_xml(&self) -> XmlElement;

    /// Writes the value as the last child of `parent`.
    fn append_to(&self, parent: &mut XmlElement) {
        parent.append_child(self.to_xml());
    }

    /// Returns the qualified name of the element.
    #[must_use]
    fn qualified_name() -> QName {
        QName::ns(Self::NAMESPACE, Self::PREFIX, Self::LOCAL_NAME)
    }

    /// Returns true if `element` has this type's namespace and local name.
    #[must_use]
    fn matches(element: &XmlElement) -> bool {
        element.is(Self::NAMESPACE, Self::LOCAL_NAME)
    }

    /// Parses document text whose root is this element.
    fn from_xml_str(text: &str) -> SamlResult<Self> {
        Self::from_xml(&parse_document(text)?)
    }

    /// Serializes the value to document text.
    fn to_xml_string(&self) -> SamlResult<String> {
        write_element(&self.to_xml())
    }
}

/// Creates an empty element named after `T`.
#[must_use]
pub fn new_element<T: SamlElement>() -> XmlElement {
    XmlElement::new(T::qualified_name())
}

/// Fails with [`SamlError::WrongElement`] unless `element` is a `T`.
pub fn ensure_element<T: SamlElement>(element: &XmlElement) -> SamlResult<()> {
    if T::matches(element) {
        Ok(())
    } else {
        Err(SamlError::WrongElement {
            expected: T::qualified_name().to_string(),
            actual: element.name().to_string(),
        })
    }
}

/// Parses every child of `parent` that is a `T`, in document order.
pub fn children_of<T: SamlElement>(parent: &XmlElement) -> SamlResult<Vec<T>> {
    parent
        .child_elements()
        .filter(|child| T::matches(child))
        .map(T::from_xml)
        .collect()
}

/// Parses the single optional `T` child of `parent`.
pub fn optional_child<T: SamlElement>(parent: &XmlElement) -> SamlResult<Option<T>> {
    let mut matching = parent.child_elements().filter(|child| T::matches(child));
    let first = matching.next();
    if matching.next().is_some() {
        return Err(SamlError::too_many(parent.local_name(), T::LOCAL_NAME));
    }
    first.map(T::from_xml).transpose()
}

/// Parses the single required `T` child of `parent`.
pub fn required_child<T: SamlElement>(parent: &XmlElement) -> SamlResult<T> {
    optional_child(parent)?.ok_or_else(|| {
        SamlError::MissingElement(format!(
            "{} must contain a {} element",
            parent.local_name(),
            T::LOCAL_NAME
        ))
    })
}

/// Parses at least one `T` child of `parent`.
pub fn one_or_more<T: SamlElement>(parent: &XmlElement) -> SamlResult<Vec<T>> {
    let children = children_of::<T>(parent)?;
    if children.is_empty() {
        return Err(SamlError::MissingElement(format!(
            "{} must contain at least one {} element",
            parent.local_name(),
            T::LOCAL_NAME
        )));
    }
    Ok(children)
}

/// Returns the text of every `{namespace}local_name` child.
#[must_use]
pub fn child_texts(parent: &XmlElement, namespace: &str, local_name: &str) -> Vec<String> {
    parent
        .child_elements()
        .filter(|child| child.is(namespace, local_name))
        .map(|child| child.text().trim().to_string())
        .collect()
}

/// Returns the text of the single optional `{namespace}local_name` child.
pub fn optional_child_text(
    parent: &XmlElement,
    namespace: &str,
    local_name: &str,
) -> SamlResult<Option<String>> {
    let mut texts = child_texts(parent, namespace, local_name).into_iter();
    let first = texts.next();
    if texts.next().is_some() {
        return Err(SamlError::too_many(parent.local_name(), local_name));
    }
    Ok(first)
}

/// Clones every `{namespace}local_name` child.
#[must_use]
pub fn opaque_children(parent: &XmlElement, namespace: &str, local_name: &str) -> Vec<XmlElement> {
    parent
        .child_elements()
        .filter(|child| child.is(namespace, local_name))
        .cloned()
        .collect()
}

/// Clones the single optional `{namespace}local_name` child.
pub fn optional_opaque_child(
    parent: &XmlElement,
    namespace: &str,
    local_name: &str,
) -> SamlResult<Option<XmlElement>> {
    let mut children = opaque_children(parent, namespace, local_name).into_iter();
    let first = children.next();
    if children.next().is_some() {
        return Err(SamlError::too_many(parent.local_name(), local_name));
    }
    Ok(first)
}

/// Builds a text-only element.
#[must_use]
pub fn text_element(namespace: &str, prefix: &str, local_name: &str, text: &str) -> XmlElement {
    XmlElement::new(QName::ns(namespace, prefix, local_name)).with_text(text)
}

/// Appends each item to `parent` in order.
pub fn append_all<T: SamlElement>(parent: &mut XmlElement, items: &[T]) {
    for item in items {
        item.append_to(parent);
    }
}

/// Returns the children of `parent` that no known type claims.
///
/// `known` lists `(namespace, local_name)` pairs owned by the caller.
#[must_use]
pub fn unclaimed_children(parent: &XmlElement, known: &[(&str, &str)]) -> Vec<XmlElement> {
    parent
        .child_elements()
        .filter(|child| !known.iter().any(|(ns, local)| child.is(ns, local)))
        .cloned()
        .collect()
}
