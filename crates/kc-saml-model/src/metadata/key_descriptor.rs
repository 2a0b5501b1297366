//! `md:KeyDescriptor` and `md:EncryptionMethod`.

use std::fmt;

use crate::codec::required_attribute;
use crate::constants::{MD_NS, MD_PREFIX};
use crate::element::{
    append_all, children_of, ensure_element, new_element, required_child, SamlElement,
};
use crate::error::{SamlError, SamlResult};
use crate::signature::KeyInfo;
use crate::xml::XmlElement;

/// Purpose of a published key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUse {
    /// Key verifies signatures.
    Signing,
    /// Key encrypts content sent to the entity.
    Encryption,
}

impl KeyUse {
    /// Returns the `use` attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Signing => "signing",
            Self::Encryption => "encryption",
        }
    }

    /// Parses a `use` attribute value.
    pub fn parse(raw: &str) -> SamlResult<Self> {
        match raw {
            "signing" => Ok(Self::Signing),
            "encryption" => Ok(Self::Encryption),
            other => Err(SamlError::ProtocolViolation(format!(
                "KeyDescriptor use must be 'signing' or 'encryption', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for KeyUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key published in metadata.
///
/// A descriptor without `use` applies to both signing and encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    key_use: Option<KeyUse>,
    key_info: KeyInfo,
    encryption_methods: Vec<EncryptionMethod>,
}

impl KeyDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(
        key_use: Option<KeyUse>,
        key_info: KeyInfo,
        encryption_methods: Vec<EncryptionMethod>,
    ) -> Self {
        Self {
            key_use,
            key_info,
            encryption_methods,
        }
    }

    /// Creates a signing key descriptor for a base64 certificate.
    pub fn signing_certificate(certificate: &str) -> SamlResult<Self> {
        Ok(Self::new(
            Some(KeyUse::Signing),
            KeyInfo::from_certificate(certificate)?,
            Vec::new(),
        ))
    }

    /// Returns `use`.
    #[must_use]
    pub const fn key_use(&self) -> Option<KeyUse> {
        self.key_use
    }

    /// Returns true if the key may be used for `purpose`.
    #[must_use]
    pub fn is_usable_for(&self, purpose: KeyUse) -> bool {
        self.key_use.is_none() || self.key_use == Some(purpose)
    }

    /// Returns the key material.
    #[must_use]
    pub const fn key_info(&self) -> &KeyInfo {
        &self.key_info
    }

    /// Returns the advertised encryption methods.
    #[must_use]
    pub fn encryption_methods(&self) -> &[EncryptionMethod] {
        &self.encryption_methods
    }
}

impl SamlElement for KeyDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = "KeyDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let key_use = element.attribute("use").map(KeyUse::parse).transpose()?;
        Ok(Self::new(
            key_use,
            required_child(element)?,
            children_of(element)?,
        ))
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        if let Some(key_use) = self.key_use {
            element.set_attribute("use", key_use.as_str());
        }
        self.key_info.append_to(&mut element);
        append_all(&mut element, &self.encryption_methods);
        element
    }
}

/// An encryption algorithm the entity supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionMethod {
    algorithm: String,
    children: Vec<XmlElement>,
}

impl EncryptionMethod {
    /// Creates a method for `algorithm`.
    #[must_use]
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            children: Vec::new(),
        }
    }

    /// Appends a parameter element such as `xenc:KeySize`.
    #[must_use]
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Returns `Algorithm`.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the parameter elements.
    #[must_use]
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }
}

impl SamlElement for EncryptionMethod {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = "EncryptionMethod";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Ok(Self {
            algorithm: required_attribute(element, "Algorithm")?.to_string(),
            children: element.child_elements().cloned().collect(),
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element =
            new_element::<Self>().with_attribute("Algorithm", self.algorithm.as_str());
        for child in &self.children {
            element.append_child(child.clone());
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"<md:KeyDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" use="encryption">
  <ds:KeyInfo><ds:KeyName>enc-key</ds:KeyName></ds:KeyInfo>
  <md:EncryptionMethod Algorithm="http://www.w3.org/2009/xmlenc11#aes256-gcm">
    <xenc:KeySize xmlns:xenc="http://www.w3.org/2001/04/xmlenc#">256</xenc:KeySize>
  </md:EncryptionMethod>
</md:KeyDescriptor>"#;

    #[test]
    fn parses_encryption_descriptor() {
        let descriptor = KeyDescriptor::from_xml_str(DESCRIPTOR).unwrap();
        assert_eq!(descriptor.key_use(), Some(KeyUse::Encryption));
        assert!(!descriptor.is_usable_for(KeyUse::Signing));
        assert_eq!(descriptor.encryption_methods().len(), 1);
        let method = &descriptor.encryption_methods()[0];
        assert_eq!(method.algorithm(), "http://www.w3.org/2009/xmlenc11#aes256-gcm");
        assert_eq!(method.children()[0].text(), "256");

        let text = descriptor.to_xml_string().unwrap();
        assert_eq!(KeyDescriptor::from_xml_str(&text).unwrap(), descriptor);
    }

    #[test]
    fn unknown_use_is_protocol_violation() {
        let err = KeyDescriptor::from_xml_str(&DESCRIPTOR.replace("encryption\"", "both\""))
            .unwrap_err();
        assert!(matches!(err, SamlError::ProtocolViolation(_)));
    }

    #[test]
    fn key_info_is_required_once() {
        let missing = r#"<md:KeyDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"/>"#;
        assert!(matches!(
            KeyDescriptor::from_xml_str(missing),
            Err(SamlError::MissingElement(_))
        ));

        let twice = r#"<md:KeyDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:KeyInfo><ds:KeyName>a</ds:KeyName></ds:KeyInfo><ds:KeyInfo><ds:KeyName>b</ds:KeyName></ds:KeyInfo></md:KeyDescriptor>"#;
        assert_eq!(
            KeyDescriptor::from_xml_str(twice).unwrap_err(),
            SamlError::too_many("KeyDescriptor", "KeyInfo")
        );
    }

    #[test]
    fn descriptor_without_use_serves_both_purposes() {
        let descriptor = KeyDescriptor::new(
            None,
            KeyInfo::from_certificate("MIIB").unwrap(),
            Vec::new(),
        );
        assert!(descriptor.is_usable_for(KeyUse::Signing));
        assert!(descriptor.is_usable_for(KeyUse::Encryption));
        assert!(!descriptor.to_xml_string().unwrap().contains("use="));
    }

    #[test]
    fn encryption_method_requires_algorithm() {
        let err = EncryptionMethod::from_xml_str(
            r#"<md:EncryptionMethod xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"/>"#,
        )
        .unwrap_err();
        assert_eq!(err, SamlError::missing_attribute("EncryptionMethod", "Algorithm"));
    }
}
