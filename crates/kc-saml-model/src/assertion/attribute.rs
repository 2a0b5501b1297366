//! `saml:AttributeStatement`, `saml:Attribute` and `saml:AttributeValue`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::codec::{optional_attribute, parse_bool, set_optional, validate_non_blank};
use crate::constants::{SAML_NS, SAML_PREFIX, XSI_NS, XSI_PREFIX, XS_NS, XS_PREFIX};
use crate::element::{append_all, children_of, ensure_element, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::extensible::ExtendedAttributes;
use crate::xml::{QName, XmlAttribute, XmlElement};

/// Typed content of one `saml:AttributeValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Text value, written with `xsi:type="xs:string"`.
    String(String),
    /// `xs:integer` value.
    Integer(i64),
    /// `xs:base64Binary` value, held decoded.
    Binary(Vec<u8>),
    /// Text value of a declared type other than `xs:string`, `xs:integer`
    /// or `xs:base64Binary`, passed through verbatim.
    Typed {
        /// The `xsi:type` attribute as written, e.g. `xs:dateTime`.
        xsi_type: String,
        /// Namespace bound to the `xsi_type` prefix, declared on write.
        namespace: Option<String>,
        /// The element text.
        text: String,
    },
    /// Complex content such as a nested `saml:NameID`.
    Elements(ElementContent),
    /// `xsi:nil="true"`.
    Nil,
}

/// Child elements of a complex attribute value; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementContent(Vec<XmlElement>);

impl ElementContent {
    /// Wraps the given elements; at least one is required.
    pub fn new(elements: Vec<XmlElement>) -> SamlResult<Self> {
        if elements.is_empty() {
            return Err(SamlError::MissingElement(
                "complex AttributeValue must contain at least one element".to_string(),
            ));
        }
        Ok(Self(elements))
    }

    /// Wraps a single element.
    #[must_use]
    pub fn single(element: XmlElement) -> Self {
        Self(vec![element])
    }

    /// Returns the elements in document order.
    #[must_use]
    pub fn elements(&self) -> &[XmlElement] {
        &self.0
    }
}

impl AttributeValue {
    /// Returns the text of a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the bytes of a binary value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    fn xsi_attribute(local_name: &str, value: &str) -> XmlAttribute {
        XmlAttribute::new(QName::ns(XSI_NS, XSI_PREFIX, local_name), value)
    }
}

/// Splits an `xsi:type` value into prefix (empty when unprefixed) and local
/// name.
fn split_type(xsi_type: &str) -> (&str, &str) {
    xsi_type.split_once(':').unwrap_or(("", xsi_type))
}

impl SamlElement for AttributeValue {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "AttributeValue";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;

        if let Some(nil) = element.attribute_ns(XSI_NS, "nil") {
            if parse_bool(nil, "xsi:nil")? {
                return Ok(Self::Nil);
            }
        }
        if element.first_child_element().is_some() {
            return Ok(Self::Elements(ElementContent(
                element.child_elements().cloned().collect(),
            )));
        }

        let text = element.text();
        let Some(xsi_type) = element.attribute_ns(XSI_NS, "type") else {
            return Ok(Self::String(text));
        };
        let (prefix, local) = split_type(xsi_type);
        let namespace = element.lookup_namespace(prefix);
        // Unbound xs/xsd prefixes are common enough in the wild to accept.
        let schema = namespace.map_or(matches!(prefix, "xs" | "xsd"), |uri| uri == XS_NS);
        match (schema, local) {
            (true, "string") => Ok(Self::String(text)),
            (true, "integer") => text.trim().parse().map(Self::Integer).map_err(|_| {
                SamlError::InvalidValue(format!("'{text}' is not a valid xs:integer"))
            }),
            (true, "base64Binary") => {
                let compact: String = text.split_whitespace().collect();
                STANDARD.decode(compact).map(Self::Binary).map_err(|e| {
                    SamlError::InvalidValue(format!("invalid xs:base64Binary value: {e}"))
                })
            }
            _ => Ok(Self::Typed {
                xsi_type: xsi_type.to_string(),
                namespace: namespace.map(str::to_string),
                text,
            }),
        }
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        let typed = |element: &mut XmlElement, local: &str, text: &str| {
            element.declare_namespace(XS_PREFIX, XS_NS);
            element.push_attribute(Self::xsi_attribute("type", &format!("{XS_PREFIX}:{local}")));
            element.append_text(text);
        };
        match self {
            Self::String(text) => typed(&mut element, "string", text),
            Self::Integer(value) => typed(&mut element, "integer", &value.to_string()),
            Self::Binary(bytes) => typed(&mut element, "base64Binary", &STANDARD.encode(bytes)),
            Self::Typed {
                xsi_type,
                namespace,
                text,
            } => {
                if let Some(namespace) = namespace {
                    element.declare_namespace(split_type(xsi_type).0, namespace);
                }
                element.push_attribute(Self::xsi_attribute("type", xsi_type));
                element.append_text(text.as_str());
            }
            Self::Elements(content) => {
                for child in content.elements() {
                    element.append_child(child.clone());
                }
            }
            Self::Nil => element.push_attribute(Self::xsi_attribute("nil", "true")),
        }
        element
    }
}

/// A named attribute with its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    name_format: Option<String>,
    friendly_name: Option<String>,
    extended_attributes: ExtendedAttributes,
    values: Vec<AttributeValue>,
}

impl Attribute {
    const ATTRIBUTES: [&'static str; 3] = ["Name", "NameFormat", "FriendlyName"];

    /// Creates an attribute with no values.
    pub fn new(name: impl Into<String>) -> SamlResult<Self> {
        let name = name.into();
        validate_non_blank(&name, "Attribute Name")?;
        Ok(Self {
            name,
            name_format: None,
            friendly_name: None,
            extended_attributes: ExtendedAttributes::new(),
            values: Vec::new(),
        })
    }

    /// Sets `NameFormat`.
    #[must_use]
    pub fn with_name_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = Some(format.into());
        self
    }

    /// Sets `FriendlyName`.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the foreign attributes.
    #[must_use]
    pub fn with_extended_attributes(mut self, attributes: ExtendedAttributes) -> Self {
        self.extended_attributes = attributes;
        self
    }

    /// Appends a value.
    #[must_use]
    pub fn with_value(mut self, value: AttributeValue) -> Self {
        self.values.push(value);
        self
    }

    /// Replaces all values, keeping name and metadata.
    #[must_use]
    pub fn with_values(mut self, values: Vec<AttributeValue>) -> Self {
        self.values = values;
        self
    }

    /// Returns `Name`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `NameFormat`.
    #[must_use]
    pub fn name_format(&self) -> Option<&str> {
        self.name_format.as_deref()
    }

    /// Returns `FriendlyName`.
    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    /// Returns the foreign attributes.
    #[must_use]
    pub const fn extended_attributes(&self) -> &ExtendedAttributes {
        &self.extended_attributes
    }

    /// Returns the values in document order.
    #[must_use]
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }
}

impl SamlElement for Attribute {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "Attribute";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let name = element
            .attribute("Name")
            .ok_or_else(|| SamlError::missing_attribute(Self::LOCAL_NAME, "Name"))?;
        Ok(Self {
            name_format: optional_attribute(element, "NameFormat"),
            friendly_name: optional_attribute(element, "FriendlyName"),
            extended_attributes: ExtendedAttributes::from_element(element, &Self::ATTRIBUTES),
            values: children_of(element)?,
            ..Self::new(name)?
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>().with_attribute("Name", self.name.as_str());
        set_optional(&mut element, "NameFormat", self.name_format());
        set_optional(&mut element, "FriendlyName", self.friendly_name());
        self.extended_attributes.write_to(&mut element);
        append_all(&mut element, &self.values);
        element
    }
}

/// One entry of an attribute statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeStatementItem {
    /// Plain attribute.
    Attribute(Attribute),
    /// `saml:EncryptedAttribute`, carried verbatim.
    Encrypted(XmlElement),
}

/// Statement listing attributes of the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeStatement {
    items: Vec<AttributeStatementItem>,
}

impl AttributeStatement {
    /// Creates a statement; at least one entry is required.
    pub fn new(items: Vec<AttributeStatementItem>) -> SamlResult<Self> {
        if items.is_empty() {
            return Err(SamlError::MissingElement(
                "AttributeStatement must contain at least one Attribute element".to_string(),
            ));
        }
        Ok(Self { items })
    }

    /// Creates a statement of plain attributes.
    pub fn from_attributes(attributes: Vec<Attribute>) -> SamlResult<Self> {
        Self::new(
            attributes
                .into_iter()
                .map(AttributeStatementItem::Attribute)
                .collect(),
        )
    }

    /// Returns the entries in document order.
    #[must_use]
    pub fn items(&self) -> &[AttributeStatementItem] {
        &self.items
    }

    /// Iterates the plain attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter_map(|item| match item {
            AttributeStatementItem::Attribute(attribute) => Some(attribute),
            AttributeStatementItem::Encrypted(_) => None,
        })
    }

    /// Returns the first attribute with the given `Name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes().find(|attribute| attribute.name() == name)
    }

    /// Returns a statement with every plain attribute passed through `f`.
    ///
    /// Encrypted entries and the entry order are kept.
    pub fn map_attributes<F>(&self, mut f: F) -> SamlResult<Self>
    where
        F: FnMut(&Attribute) -> SamlResult<Attribute>,
    {
        let items = self
            .items
            .iter()
            .map(|item| match item {
                AttributeStatementItem::Attribute(attribute) => {
                    f(attribute).map(AttributeStatementItem::Attribute)
                }
                AttributeStatementItem::Encrypted(encrypted) => {
                    Ok(AttributeStatementItem::Encrypted(encrypted.clone()))
                }
            })
            .collect::<SamlResult<Vec<_>>>()?;
        Self::new(items)
    }
}

impl SamlElement for AttributeStatement {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "AttributeStatement";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let items = element
            .child_elements()
            .filter_map(|child| {
                if Attribute::matches(child) {
                    Some(Attribute::from_xml(child).map(AttributeStatementItem::Attribute))
                } else if child.is(SAML_NS, "EncryptedAttribute") {
                    Some(Ok(AttributeStatementItem::Encrypted(child.clone())))
                } else {
                    tracing::debug!(
                        element = %child.name(),
                        "skipping unknown AttributeStatement child"
                    );
                    None
                }
            })
            .collect::<SamlResult<Vec<_>>>()?;
        Self::new(items)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        for item in &self.items {
            match item {
                AttributeStatementItem::Attribute(attribute) => attribute.append_to(&mut element),
                AttributeStatementItem::Encrypted(encrypted) => {
                    element.append_child(encrypted.clone());
                }
            }
        }
        element
    }
}
