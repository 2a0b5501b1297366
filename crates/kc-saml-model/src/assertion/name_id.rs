//! `saml:Issuer` and `saml:NameID`.

use crate::codec::{optional_attribute, set_optional, validate_entity_id, validate_non_blank};
use crate::constants::{NameIdFormat, SAML_NS, SAML_PREFIX};
use crate::element::{ensure_element, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// Content shared by every element of the SAML `NameIDType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIdType {
    value: String,
    name_qualifier: Option<String>,
    sp_name_qualifier: Option<String>,
    format: Option<String>,
    sp_provided_id: Option<String>,
}

impl NameIdType {
    /// Creates a name with the given value; surrounding whitespace is removed.
    pub fn new(value: impl Into<String>) -> SamlResult<Self> {
        let value = value.into().trim().to_string();
        validate_non_blank(&value, "name identifier value")?;
        Ok(Self {
            value,
            name_qualifier: None,
            sp_name_qualifier: None,
            format: None,
            sp_provided_id: None,
        })
    }

    /// Sets the `Format` URI.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the `NameQualifier`.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the `SPNameQualifier`.
    #[must_use]
    pub fn with_sp_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.sp_name_qualifier = Some(qualifier.into());
        self
    }

    /// Sets the `SPProvidedID`.
    #[must_use]
    pub fn with_sp_provided_id(mut self, id: impl Into<String>) -> Self {
        self.sp_provided_id = Some(id.into());
        self
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the `Format` URI.
    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Returns the `Format` as a known name identifier format.
    #[must_use]
    pub fn known_format(&self) -> Option<NameIdFormat> {
        self.format.as_deref().and_then(NameIdFormat::from_uri)
    }

    /// Returns the `NameQualifier`.
    #[must_use]
    pub fn name_qualifier(&self) -> Option<&str> {
        self.name_qualifier.as_deref()
    }

    /// Returns the `SPNameQualifier`.
    #[must_use]
    pub fn sp_name_qualifier(&self) -> Option<&str> {
        self.sp_name_qualifier.as_deref()
    }

    /// Returns the `SPProvidedID`.
    #[must_use]
    pub fn sp_provided_id(&self) -> Option<&str> {
        self.sp_provided_id.as_deref()
    }

    fn read(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self {
            name_qualifier: optional_attribute(element, "NameQualifier"),
            sp_name_qualifier: optional_attribute(element, "SPNameQualifier"),
            format: optional_attribute(element, "Format"),
            sp_provided_id: optional_attribute(element, "SPProvidedID"),
            ..Self::new(element.text())?
        })
    }

    fn write(&self, mut element: XmlElement) -> XmlElement {
        set_optional(&mut element, "NameQualifier", self.name_qualifier());
        set_optional(&mut element, "SPNameQualifier", self.sp_name_qualifier());
        set_optional(&mut element, "Format", self.format());
        set_optional(&mut element, "SPProvidedID", self.sp_provided_id());
        element.with_text(self.value.as_str())
    }
}

/// Issuer of an assertion or metadata message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuer(NameIdType);

impl Issuer {
    /// Creates an issuer.
    ///
    /// An issuer in the entity format (the default when `Format` is absent)
    /// must not carry qualifiers and its value must be a valid entity ID.
    pub fn new(name: NameIdType) -> SamlResult<Self> {
        let is_entity = name
            .format()
            .map_or(true, |format| format == NameIdFormat::Entity.uri());
        if is_entity {
            for (attribute, value) in [
                ("NameQualifier", name.name_qualifier()),
                ("SPNameQualifier", name.sp_name_qualifier()),
                ("SPProvidedID", name.sp_provided_id()),
            ] {
                if value.is_some() {
                    return Err(SamlError::ConstraintViolation(format!(
                        "{attribute} is not allowed on an entity Issuer"
                    )));
                }
            }
            validate_entity_id(name.value())?;
        }
        Ok(Self(name))
    }

    /// Creates an entity issuer with no `Format` attribute.
    pub fn entity(entity_id: &str) -> SamlResult<Self> {
        Self::new(NameIdType::new(entity_id)?)
    }

    /// Returns the issuer value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Returns the full name content.
    #[must_use]
    pub const fn name(&self) -> &NameIdType {
        &self.0
    }
}

impl SamlElement for Issuer {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "Issuer";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Self::new(NameIdType::read(element)?)
    }

    fn to_xml(&self) -> XmlElement {
        self.0.write(new_element::<Self>())
    }
}

/// Subject name identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId(NameIdType);

impl NameId {
    /// Creates a name identifier.
    #[must_use]
    pub const fn new(name: NameIdType) -> Self {
        Self(name)
    }

    /// Creates a name identifier with a known format.
    pub fn with_format(value: &str, format: NameIdFormat) -> SamlResult<Self> {
        Ok(Self(NameIdType::new(value)?.with_format(format.uri())))
    }

    /// Returns the identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Returns the full name content.
    #[must_use]
    pub const fn name(&self) -> &NameIdType {
        &self.0
    }
}

impl SamlElement for NameId {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "NameID";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Ok(Self(NameIdType::read(element)?))
    }

    fn to_xml(&self) -> XmlElement {
        self.0.write(new_element::<Self>())
    }
}
