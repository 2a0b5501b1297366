//! Pass-through storage for attributes an element does not model.
//!
//! Elements that allow `anyAttribute` keep every attribute they do not claim
//! in an [`ExtendedAttributes`] set. The set is never validated; it is
//! re-emitted after the element's own attributes, in document order.

use crate::xml::{QName, XmlAttribute, XmlElement};

/// Ordered set of foreign attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedAttributes {
    attributes: Vec<XmlAttribute>,
}

impl ExtendedAttributes {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            attributes: Vec::new(),
        }
    }

    /// Collects the attributes of `element` not listed in `claimed`.
    ///
    /// `claimed` holds the unqualified names the element models itself.
    /// Namespaced attributes are never claimed.
    #[must_use]
    pub fn from_element(element: &XmlElement, claimed: &[&str]) -> Self {
        let attributes = element
            .attributes()
            .iter()
            .filter(|attribute| {
                let name = attribute.name();
                name.namespace().is_some() || !claimed.contains(&name.local_name())
            })
            .cloned()
            .collect();
        Self { attributes }
    }

    /// Adds a namespaced attribute, replacing one with the same name.
    #[must_use]
    pub fn with(mut self, namespace: &str, prefix: &str, local_name: &str, value: &str) -> Self {
        let attribute = XmlAttribute::new(QName::ns(namespace, prefix, local_name), value);
        match self
            .attributes
            .iter_mut()
            .find(|existing| existing.name().matches(Some(namespace), local_name))
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }

    /// Returns the value of the attribute `{namespace}local_name`.
    #[must_use]
    pub fn get(&self, namespace: &str, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name().matches(Some(namespace), local_name))
            .map(XmlAttribute::value)
    }

    /// Iterates the attributes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes.iter()
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the set holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Appends every attribute to `element`.
    pub fn write_to(&self, element: &mut XmlElement) {
        for attribute in &self.attributes {
            element.push_attribute(attribute.clone());
        }
    }
}
