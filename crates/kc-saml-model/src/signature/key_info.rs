//! `ds:KeyInfo` and `ds:X509Data`.

use crate::codec::{optional_attribute, set_optional};
use crate::constants::{DS_PREFIX, XMLDSIG_NS};
use crate::element::{ensure_element, new_element, text_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// One child of a `ds:KeyInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfoContent {
    /// `ds:KeyName` text.
    KeyName(String),
    /// `ds:X509Data` block.
    X509Data(X509Data),
    /// Any other child, carried verbatim.
    Other(XmlElement),
}

/// Key material hint attached to signatures and key descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    id: Option<String>,
    content: Vec<KeyInfoContent>,
}

impl KeyInfo {
    /// Creates a key info from its children.
    pub fn new(id: Option<String>, content: Vec<KeyInfoContent>) -> SamlResult<Self> {
        if content.is_empty() {
            return Err(SamlError::MissingElement(
                "KeyInfo must contain at least one child".to_string(),
            ));
        }
        Ok(Self { id, content })
    }

    /// Creates a key info holding a single base64 certificate.
    pub fn from_certificate(certificate: &str) -> SamlResult<Self> {
        let data = X509Data::new(vec![X509Content::Certificate(certificate.to_string())])?;
        Self::new(None, vec![KeyInfoContent::X509Data(data)])
    }

    /// Returns the `Id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the children in document order.
    #[must_use]
    pub fn content(&self) -> &[KeyInfoContent] {
        &self.content
    }

    /// Iterates every certificate in every `ds:X509Data` child.
    pub fn certificates(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .filter_map(|item| match item {
                KeyInfoContent::X509Data(data) => Some(data),
                _ => None,
            })
            .flat_map(X509Data::certificates)
    }
}

impl SamlElement for KeyInfo {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "KeyInfo";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let content = element
            .child_elements()
            .map(|child| {
                if child.is(XMLDSIG_NS, "KeyName") {
                    Ok(KeyInfoContent::KeyName(child.text().trim().to_string()))
                } else if X509Data::matches(child) {
                    X509Data::from_xml(child).map(KeyInfoContent::X509Data)
                } else {
                    Ok(KeyInfoContent::Other(child.clone()))
                }
            })
            .collect::<SamlResult<Vec<_>>>()?;
        Self::new(optional_attribute(element, "Id"), content)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        set_optional(&mut element, "Id", self.id.as_deref());
        for item in &self.content {
            match item {
                KeyInfoContent::KeyName(name) => {
                    element.append_child(text_element(XMLDSIG_NS, DS_PREFIX, "KeyName", name));
                }
                KeyInfoContent::X509Data(data) => data.append_to(&mut element),
                KeyInfoContent::Other(other) => element.append_child(other.clone()),
            }
        }
        element
    }
}

/// One child of a `ds:X509Data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X509Content {
    /// Base64 DER certificate, whitespace removed.
    Certificate(String),
    /// Any other child (issuer serial, SKI, CRL), carried verbatim.
    Other(XmlElement),
}

/// `ds:X509Data` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Data {
    content: Vec<X509Content>,
}

impl X509Data {
    /// Creates an X.509 data block; certificates are stripped of whitespace.
    pub fn new(content: Vec<X509Content>) -> SamlResult<Self> {
        if content.is_empty() {
            return Err(SamlError::MissingElement(
                "X509Data must contain at least one child".to_string(),
            ));
        }
        let content = content
            .into_iter()
            .map(|item| match item {
                X509Content::Certificate(text) => {
                    let compact: String = text.split_whitespace().collect();
                    if compact.is_empty() {
                        Err(SamlError::ConstraintViolation(
                            "X509Certificate must not be blank".to_string(),
                        ))
                    } else {
                        Ok(X509Content::Certificate(compact))
                    }
                }
                other @ X509Content::Other(_) => Ok(other),
            })
            .collect::<SamlResult<Vec<_>>>()?;
        Ok(Self { content })
    }

    /// Returns the children in document order.
    #[must_use]
    pub fn content(&self) -> &[X509Content] {
        &self.content
    }

    /// Iterates the certificates.
    pub fn certificates(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|item| match item {
            X509Content::Certificate(text) => Some(text.as_str()),
            X509Content::Other(_) => None,
        })
    }
}

impl SamlElement for X509Data {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "X509Data";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let content = element
            .child_elements()
            .map(|child| {
                if child.is(XMLDSIG_NS, "X509Certificate") {
                    X509Content::Certificate(child.text())
                } else {
                    X509Content::Other(child.clone())
                }
            })
            .collect();
        Self::new(content)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        for item in &self.content {
            match item {
                X509Content::Certificate(text) => element.append_child(text_element(
                    XMLDSIG_NS,
                    DS_PREFIX,
                    "X509Certificate",
                    text,
                )),
                X509Content::Other(other) => element.append_child(other.clone()),
            }
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_certificate_and_key_name() {
        let key_info = KeyInfo::from_xml_str(
            r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#" Id="k1">
  <ds:KeyName>signing-2024</ds:KeyName>
  <ds:X509Data>
    <ds:X509Certificate>
      MIIB
      AAAA
    </ds:X509Certificate>
  </ds:X509Data>
</ds:KeyInfo>"#,
        )
        .unwrap();

        assert_eq!(key_info.id(), Some("k1"));
        assert_eq!(
            key_info.content()[0],
            KeyInfoContent::KeyName("signing-2024".to_string())
        );
        assert_eq!(key_info.certificates().collect::<Vec<_>>(), vec!["MIIBAAAA"]);
    }

    #[test]
    fn unknown_children_pass_through() {
        let xml = r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:KeyValue><ds:RSAKeyValue/></ds:KeyValue></ds:KeyInfo>"#;
        let key_info = KeyInfo::from_xml_str(xml).unwrap();
        assert!(matches!(key_info.content()[0], KeyInfoContent::Other(_)));
        assert_eq!(key_info.to_xml_string().unwrap(), xml);
    }

    #[test]
    fn empty_key_info_is_rejected() {
        let err = KeyInfo::from_xml_str(
            r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, SamlError::MissingElement(_)));
    }

    #[test]
    fn blank_certificate_is_rejected() {
        assert!(matches!(
            KeyInfo::from_certificate("  \n "),
            Err(SamlError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn round_trip() {
        let key_info = KeyInfo::from_certificate("MIIC\nZZZZ").unwrap();
        let parsed = KeyInfo::from_xml(&key_info.to_xml()).unwrap();
        assert_eq!(parsed, key_info);
        assert_eq!(parsed.certificates().next(), Some("MIICZZZZ"));
    }
}
