//! The embedded `ds:Signature` element.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::codec::required_attribute;
use crate::constants::{DS_PREFIX, XMLDSIG_NS};
use crate::element::{
    children_of, ensure_element, new_element, optional_child, required_child, text_element,
    SamlElement,
};
use crate::error::{SamlError, SamlResult};
use crate::xml::{QName, XmlElement};

use super::key_info::KeyInfo;
use super::{CanonicalizationAlgorithm, SignatureAlgorithm};

const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// XML signature embedded in a signable document.
///
/// `SignedInfo` references are kept as opaque nodes; producing and checking
/// digests is the job of the cryptography backend behind
/// [`Signer`](super::Signer) and [`Verifier`](super::Verifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    canonicalization_method: String,
    signature_method: String,
    references: Vec<XmlElement>,
    value: Vec<u8>,
    key_info: Option<KeyInfo>,
    objects: Vec<XmlElement>,
}

impl Signature {
    /// Creates a signature over the element identified by `reference_id`.
    ///
    /// When `reference_id` is set, `SignedInfo` carries one `Reference`
    /// pointing at `#reference_id` with the enveloped-signature and
    /// canonicalization transforms.
    #[must_use]
    pub fn new(
        algorithm: SignatureAlgorithm,
        canonicalization: CanonicalizationAlgorithm,
        reference_id: Option<&str>,
        value: Vec<u8>,
        key_info: Option<KeyInfo>,
    ) -> Self {
        let references = reference_id
            .map(|id| vec![reference_element(id, algorithm, canonicalization)])
            .unwrap_or_default();
        Self {
            canonicalization_method: canonicalization.uri().to_string(),
            signature_method: algorithm.uri().to_string(),
            references,
            value,
            key_info,
            objects: Vec::new(),
        }
    }

    /// Returns the `CanonicalizationMethod` algorithm URI.
    #[must_use]
    pub fn canonicalization_method(&self) -> &str {
        &self.canonicalization_method
    }

    /// Returns the `SignatureMethod` algorithm URI.
    #[must_use]
    pub fn signature_method(&self) -> &str {
        &self.signature_method
    }

    /// Returns the signature algorithm, if it is one this crate knows.
    #[must_use]
    pub fn algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::from_uri(&self.signature_method)
    }

    /// Returns the `Reference` elements of `SignedInfo`.
    #[must_use]
    pub fn references(&self) -> &[XmlElement] {
        &self.references
    }

    /// Returns the URI of the first reference, e.g. `#_id123`.
    #[must_use]
    pub fn reference_uri(&self) -> Option<&str> {
        self.references.first().and_then(|r| r.attribute("URI"))
    }

    /// Returns the decoded `SignatureValue`.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Returns the `KeyInfo`, if any.
    #[must_use]
    pub const fn key_info(&self) -> Option<&KeyInfo> {
        self.key_info.as_ref()
    }

    fn signed_info(&self) -> XmlElement {
        let mut signed_info = ds("SignedInfo")
            .with_child(CanonicalizationMethod(self.canonicalization_method.clone()).to_xml())
            .with_child(SignatureMethod(self.signature_method.clone()).to_xml());
        for reference in &self.references {
            signed_info.append_child(reference.clone());
        }
        signed_info
    }
}

impl SamlElement for Signature {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "Signature";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;

        let signed_info = required_child::<SignedInfo>(element)?.0;
        let canonicalization_method =
            required_child::<CanonicalizationMethod>(&signed_info)?.0;
        let signature_method = required_child::<SignatureMethod>(&signed_info)?.0;
        let references = signed_info
            .child_elements()
            .filter(|child| child.is(XMLDSIG_NS, "Reference"))
            .cloned()
            .collect();

        let encoded = required_child::<SignatureValue>(element)?.0;
        let value = decode_signature_value(&encoded)?;

        let key_info = optional_child::<KeyInfo>(element)?;
        let objects = children_of::<SignatureObject>(element)?
            .into_iter()
            .map(|object| object.0)
            .collect();

        Ok(Self {
            canonicalization_method,
            signature_method,
            references,
            value,
            key_info,
            objects,
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.append_child(self.signed_info());
        element.append_child(text_element(
            XMLDSIG_NS,
            DS_PREFIX,
            "SignatureValue",
            &STANDARD.encode(&self.value),
        ));
        if let Some(key_info) = &self.key_info {
            key_info.append_to(&mut element);
        }
        for object in &self.objects {
            element.append_child(object.clone());
        }
        element
    }
}

/// Decodes a `SignatureValue`, ignoring embedded whitespace.
fn decode_signature_value(encoded: &str) -> SamlResult<Vec<u8>> {
    let compact: String = encoded.split_whitespace().collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SamlError::SignatureInvalid(format!("SignatureValue is not base64: {e}")))
}

fn ds(local_name: &str) -> XmlElement {
    XmlElement::new(QName::ns(XMLDSIG_NS, DS_PREFIX, local_name))
}

fn reference_element(
    id: &str,
    algorithm: SignatureAlgorithm,
    canonicalization: CanonicalizationAlgorithm,
) -> XmlElement {
    let transforms = ds("Transforms")
        .with_child(ds("Transform").with_attribute("Algorithm", ENVELOPED_SIGNATURE))
        .with_child(ds("Transform").with_attribute("Algorithm", canonicalization.uri()));
    ds("Reference")
        .with_attribute("URI", format!("#{id}"))
        .with_child(transforms)
        .with_child(ds("DigestMethod").with_attribute("Algorithm", algorithm.digest_uri()))
}

// Internal wrappers so the cardinality helpers apply to ds children.

struct SignedInfo(XmlElement);

impl SamlElement for SignedInfo {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "SignedInfo";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self(element.clone()))
    }

    fn to_xml(&self) -> XmlElement {
        self.0.clone()
    }
}

struct CanonicalizationMethod(String);

impl SamlElement for CanonicalizationMethod {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "CanonicalizationMethod";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self(required_attribute(element, "Algorithm")?.to_string()))
    }

    fn to_xml(&self) -> XmlElement {
        new_element::<Self>().with_attribute("Algorithm", self.0.as_str())
    }
}

struct SignatureMethod(String);

impl SamlElement for SignatureMethod {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "SignatureMethod";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self(required_attribute(element, "Algorithm")?.to_string()))
    }

    fn to_xml(&self) -> XmlElement {
        new_element::<Self>().with_attribute("Algorithm", self.0.as_str())
    }
}

struct SignatureValue(String);

impl SamlElement for SignatureValue {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "SignatureValue";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self(element.text()))
    }

    fn to_xml(&self) -> XmlElement {
        new_element::<Self>().with_text(self.0.as_str())
    }
}

struct SignatureObject(XmlElement);

impl SamlElement for SignatureObject {
    const NAMESPACE: &'static str = XMLDSIG_NS;
    const PREFIX: &'static str = DS_PREFIX;
    const LOCAL_NAME: &'static str = "Object";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        Ok(Self(element.clone()))
    }

    fn to_xml(&self) -> XmlElement {
        self.0.clone()
    }
}
