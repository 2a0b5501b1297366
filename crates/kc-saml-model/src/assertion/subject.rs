//! `saml:Subject` and its confirmations.

use chrono::{DateTime, Utc};

use crate::codec::{
    check_ip_address, normalize_datetime, optional_attribute, optional_datetime,
    required_attribute, set_optional, set_optional_datetime, validate_non_blank,
};
use crate::constants::{SAML_NS, SAML_PREFIX};
use crate::element::{
    append_all, children_of, ensure_element, new_element, optional_child, SamlElement,
};
use crate::error::{SamlError, SamlResult};
use crate::extensible::ExtendedAttributes;
use crate::signature::KeyInfo;
use crate::xml::XmlElement;

use super::name_id::NameId;

/// Identifier of a subject or confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectIdentifier {
    /// Plain `saml:NameID`.
    NameId(NameId),
    /// `saml:BaseID` or `saml:EncryptedID`, carried verbatim.
    Other(XmlElement),
}

impl SubjectIdentifier {
    const OPAQUE: [&'static str; 2] = ["BaseID", "EncryptedID"];

    fn read(parent: &XmlElement) -> SamlResult<Option<Self>> {
        let mut found = parent.child_elements().filter(|child| {
            NameId::matches(child)
                || Self::OPAQUE
                    .iter()
                    .any(|local| child.is(SAML_NS, local))
        });
        let first = found.next();
        if found.next().is_some() {
            return Err(SamlError::too_many(parent.local_name(), "identifier"));
        }
        first
            .map(|child| {
                if NameId::matches(child) {
                    NameId::from_xml(child).map(Self::NameId)
                } else {
                    Ok(Self::Other(child.clone()))
                }
            })
            .transpose()
    }

    fn append_to(&self, parent: &mut XmlElement) {
        match self {
            Self::NameId(name_id) => name_id.append_to(parent),
            Self::Other(other) => parent.append_child(other.clone()),
        }
    }
}

/// The principal an assertion is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    identifier: Option<SubjectIdentifier>,
    confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// Creates a subject; it needs an identifier or a confirmation.
    pub fn new(
        identifier: Option<SubjectIdentifier>,
        confirmations: Vec<SubjectConfirmation>,
    ) -> SamlResult<Self> {
        if identifier.is_none() && confirmations.is_empty() {
            return Err(SamlError::ConstraintViolation(
                "Subject requires an identifier or a SubjectConfirmation".to_string(),
            ));
        }
        Ok(Self {
            identifier,
            confirmations,
        })
    }

    /// Creates a subject identified by a name identifier.
    #[must_use]
    pub fn from_name_id(name_id: NameId) -> Self {
        Self {
            identifier: Some(SubjectIdentifier::NameId(name_id)),
            confirmations: Vec::new(),
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn identifier(&self) -> Option<&SubjectIdentifier> {
        self.identifier.as_ref()
    }

    /// Returns the name identifier, if the subject uses one.
    #[must_use]
    pub const fn name_id(&self) -> Option<&NameId> {
        match &self.identifier {
            Some(SubjectIdentifier::NameId(name_id)) => Some(name_id),
            _ => None,
        }
    }

    /// Returns the confirmations in document order.
    #[must_use]
    pub fn confirmations(&self) -> &[SubjectConfirmation] {
        &self.confirmations
    }
}

impl SamlElement for Subject {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "Subject";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Self::new(
            SubjectIdentifier::read(element)?,
            children_of(element)?,
        )
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        if let Some(identifier) = &self.identifier {
            identifier.append_to(&mut element);
        }
        append_all(&mut element, &self.confirmations);
        element
    }
}

/// How the relying party may confirm the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    method: String,
    identifier: Option<SubjectIdentifier>,
    data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// Creates a confirmation with the given `Method` URI.
    pub fn new(
        method: impl Into<String>,
        identifier: Option<SubjectIdentifier>,
        data: Option<SubjectConfirmationData>,
    ) -> SamlResult<Self> {
        let method = method.into();
        validate_non_blank(&method, "SubjectConfirmation Method")?;
        Ok(Self {
            method,
            identifier,
            data,
        })
    }

    /// Returns the `Method` URI.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn identifier(&self) -> Option<&SubjectIdentifier> {
        self.identifier.as_ref()
    }

    /// Returns the confirmation data.
    #[must_use]
    pub const fn data(&self) -> Option<&SubjectConfirmationData> {
        self.data.as_ref()
    }
}

impl SamlElement for SubjectConfirmation {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "SubjectConfirmation";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Self::new(
            required_attribute(element, "Method")?,
            SubjectIdentifier::read(element)?,
            optional_child(element)?,
        )
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>().with_attribute("Method", self.method.as_str());
        if let Some(identifier) = &self.identifier {
            identifier.append_to(&mut element);
        }
        if let Some(data) = &self.data {
            data.append_to(&mut element);
        }
        element
    }
}

/// One child of a `SubjectConfirmationData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationContent {
    /// Holder-of-key material.
    KeyInfo(KeyInfo),
    /// Any other child, carried verbatim.
    Other(XmlElement),
}

/// Restrictions on how the subject may be confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubjectConfirmationData {
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    recipient: Option<String>,
    in_response_to: Option<String>,
    address: Option<String>,
    extended_attributes: ExtendedAttributes,
    content: Vec<ConfirmationContent>,
}

impl SubjectConfirmationData {
    const ATTRIBUTES: [&'static str; 5] = [
        "NotBefore",
        "NotOnOrAfter",
        "Recipient",
        "InResponseTo",
        "Address",
    ];

    /// Starts building confirmation data.
    #[must_use]
    pub fn builder() -> SubjectConfirmationDataBuilder {
        SubjectConfirmationDataBuilder::default()
    }

    /// Returns `NotBefore`.
    #[must_use]
    pub const fn not_before(&self) -> Option<&DateTime<Utc>> {
        self.not_before.as_ref()
    }

    /// Returns `NotOnOrAfter`.
    #[must_use]
    pub const fn not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.not_on_or_after.as_ref()
    }

    /// Returns `Recipient`.
    #[must_use]
    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    /// Returns `InResponseTo`.
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        self.in_response_to.as_deref()
    }

    /// Returns `Address` exactly as supplied, even if it is not an IP address.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the foreign attributes.
    #[must_use]
    pub const fn extended_attributes(&self) -> &ExtendedAttributes {
        &self.extended_attributes
    }

    /// Returns the children in document order.
    #[must_use]
    pub fn content(&self) -> &[ConfirmationContent] {
        &self.content
    }
}

impl SamlElement for SubjectConfirmationData {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "SubjectConfirmationData";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let content = element
            .child_elements()
            .map(|child| {
                if KeyInfo::matches(child) {
                    KeyInfo::from_xml(child).map(ConfirmationContent::KeyInfo)
                } else {
                    Ok(ConfirmationContent::Other(child.clone()))
                }
            })
            .collect::<SamlResult<Vec<_>>>()?;

        Ok(SubjectConfirmationDataBuilder {
            not_before: optional_datetime(element, "NotBefore")?,
            not_on_or_after: optional_datetime(element, "NotOnOrAfter")?,
            recipient: optional_attribute(element, "Recipient"),
            in_response_to: optional_attribute(element, "InResponseTo"),
            address: optional_attribute(element, "Address"),
            extended_attributes: ExtendedAttributes::from_element(element, &Self::ATTRIBUTES),
            content,
        }
        .build())
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        set_optional_datetime(&mut element, "NotBefore", self.not_before.as_ref());
        set_optional_datetime(&mut element, "NotOnOrAfter", self.not_on_or_after.as_ref());
        set_optional(&mut element, "Recipient", self.recipient());
        set_optional(&mut element, "InResponseTo", self.in_response_to());
        set_optional(&mut element, "Address", self.address());
        self.extended_attributes.write_to(&mut element);
        for item in &self.content {
            match item {
                ConfirmationContent::KeyInfo(key_info) => key_info.append_to(&mut element),
                ConfirmationContent::Other(other) => element.append_child(other.clone()),
            }
        }
        element
    }
}

/// Builder for [`SubjectConfirmationData`].
#[derive(Debug, Default)]
pub struct SubjectConfirmationDataBuilder {
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    recipient: Option<String>,
    in_response_to: Option<String>,
    address: Option<String>,
    extended_attributes: ExtendedAttributes,
    content: Vec<ConfirmationContent>,
}

impl SubjectConfirmationDataBuilder {
    /// Sets `NotBefore`.
    #[must_use]
    pub const fn not_before(mut self, instant: DateTime<Utc>) -> Self {
        self.not_before = Some(instant);
        self
    }

    /// Sets `NotOnOrAfter`.
    #[must_use]
    pub const fn not_on_or_after(mut self, instant: DateTime<Utc>) -> Self {
        self.not_on_or_after = Some(instant);
        self
    }

    /// Sets `Recipient`.
    #[must_use]
    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Sets `InResponseTo`.
    #[must_use]
    pub fn in_response_to(mut self, id: impl Into<String>) -> Self {
        self.in_response_to = Some(id.into());
        self
    }

    /// Sets `Address`.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the foreign attributes.
    #[must_use]
    pub fn extended_attributes(mut self, attributes: ExtendedAttributes) -> Self {
        self.extended_attributes = attributes;
        self
    }

    /// Appends a child.
    #[must_use]
    pub fn content(mut self, item: ConfirmationContent) -> Self {
        self.content.push(item);
        self
    }

    /// Builds the confirmation data.
    ///
    /// A malformed `Address` is logged and kept; the attribute is advisory.
    #[must_use]
    pub fn build(self) -> SubjectConfirmationData {
        if let Some(address) = &self.address {
            check_ip_address(address, "Address");
        }
        SubjectConfirmationData {
            not_before: self.not_before.map(normalize_datetime),
            not_on_or_after: self.not_on_or_after.map(normalize_datetime),
            recipient: self.recipient,
            in_response_to: self.in_response_to,
            address: self.address,
            extended_attributes: self.extended_attributes,
            content: self.content,
        }
    }
}
