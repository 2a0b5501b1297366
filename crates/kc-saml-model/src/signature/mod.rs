//! XML Signature support for signable SAML documents.
//!
//! A signable document carries at most one embedded `ds:Signature`, which is
//! always written as its first child. Signing and verification run over the
//! document's canonical bytes: the serialized form of the document with its
//! signature removed. The cryptography itself is supplied by the caller
//! through the [`Signer`] and [`Verifier`] capabilities.
//!
//! # Signing Algorithms
//!
//! The following signature algorithms are recognized:
//! - RSA-SHA256 (recommended)
//! - RSA-SHA384
//! - RSA-SHA512
//! - ECDSA-SHA256
//! - ECDSA-SHA384
//! - ECDSA-SHA512
//!
//! Legacy SHA-1 algorithms are accepted for compatibility but not recommended.

mod element;
mod key_info;

pub use element::Signature;
pub use key_info::{KeyInfo, KeyInfoContent, X509Content, X509Data};

use crate::constants::{
    canonicalization_algorithms, digest_algorithms, signature_algorithms, SAML_NS,
};
use crate::element::{optional_child, SamlElement};
use crate::error::SamlResult;
use crate::xml::{write_element, XmlElement};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (recommended).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// ECDSA with SHA-256.
    EcdsaSha256,
    /// ECDSA with SHA-384.
    EcdsaSha384,
    /// ECDSA with SHA-512.
    EcdsaSha512,
    /// Legacy RSA with SHA-1 (not recommended).
    RsaSha1,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::EcdsaSha256 => signature_algorithms::ECDSA_SHA256,
            Self::EcdsaSha384 => signature_algorithms::ECDSA_SHA384,
            Self::EcdsaSha512 => signature_algorithms::ECDSA_SHA512,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
        }
    }

    /// Returns the corresponding digest algorithm URI.
    #[must_use]
    pub const fn digest_uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 | Self::EcdsaSha256 => digest_algorithms::SHA256,
            Self::RsaSha384 | Self::EcdsaSha384 => digest_algorithms::SHA384,
            Self::RsaSha512 | Self::EcdsaSha512 => digest_algorithms::SHA512,
            Self::RsaSha1 => digest_algorithms::SHA1,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            signature_algorithms::ECDSA_SHA256 => Some(Self::EcdsaSha256),
            signature_algorithms::ECDSA_SHA384 => Some(Self::EcdsaSha384),
            signature_algorithms::ECDSA_SHA512 => Some(Self::EcdsaSha512),
            signature_algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            _ => None,
        }
    }

    /// Returns true if this algorithm uses RSA.
    #[must_use]
    pub const fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaSha256 | Self::RsaSha384 | Self::RsaSha512 | Self::RsaSha1
        )
    }

    /// Returns true if this algorithm uses ECDSA.
    #[must_use]
    pub const fn is_ecdsa(&self) -> bool {
        matches!(
            self,
            Self::EcdsaSha256 | Self::EcdsaSha384 | Self::EcdsaSha512
        )
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }
}

/// Canonicalization algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments (recommended).
    #[default]
    ExclusiveC14N,
    /// Exclusive C14N with comments.
    ExclusiveC14NWithComments,
    /// C14N without comments.
    C14N,
    /// C14N with comments.
    C14NWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14N => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14NWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
            Self::C14N => canonicalization_algorithms::C14N,
            Self::C14NWithComments => canonicalization_algorithms::C14N_WITH_COMMENTS,
        }
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::ExclusiveC14N),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveC14NWithComments)
            }
            canonicalization_algorithms::C14N => Some(Self::C14N),
            canonicalization_algorithms::C14N_WITH_COMMENTS => Some(Self::C14NWithComments),
            _ => None,
        }
    }
}

/// Signing capability backed by a private key.
///
/// Implementations must be safe to share between threads; the object model
/// never holds keys itself.
pub trait Signer: Send + Sync {
    /// Returns the algorithm this signer produces.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Returns the canonicalization recorded in `SignedInfo`.
    fn canonicalization(&self) -> CanonicalizationAlgorithm {
        CanonicalizationAlgorithm::default()
    }

    /// Signs the canonical bytes of a document.
    fn sign(&self, data: &[u8]) -> SamlResult<Vec<u8>>;

    /// Returns the key hint to embed in the signature.
    fn key_info(&self) -> Option<KeyInfo> {
        None
    }
}

/// Verification capability backed by trusted key material.
pub trait Verifier: Send + Sync {
    /// Checks `signature` over `data`; `algorithm` is the `SignatureMethod` URI.
    fn verify(&self, data: &[u8], signature: &[u8], algorithm: &str) -> SamlResult<bool>;
}

/// A SAML element that can carry an embedded signature.
///
/// Parsing captures a signature but never verifies it; callers decide
/// when to call [`SignableElement::verify`].
pub trait SignableElement: SamlElement + Clone {
    /// Returns the embedded signature, if any.
    fn signature(&self) -> Option<&Signature>;

    /// Returns a copy of this element carrying `signature` instead.
    #[must_use]
    fn with_signature(&self, signature: Option<Signature>) -> Self;

    /// Returns the `ID` the signature reference points at.
    fn signature_reference(&self) -> Option<&str>;

    /// Returns the bytes that are signed: this element serialized without
    /// its signature.
    fn canonical_bytes(&self) -> SamlResult<Vec<u8>> {
        let unsigned = self.with_signature(None);
        Ok(write_element(&unsigned.to_xml())?.into_bytes())
    }

    /// Returns a signed copy of this element, replacing any prior signature.
    fn sign(&self, signer: &dyn Signer) -> SamlResult<Self> {
        let algorithm = signer.algorithm();
        if algorithm.is_deprecated() {
            tracing::warn!(
                element = Self::LOCAL_NAME,
                algorithm = algorithm.uri(),
                "signing with deprecated algorithm"
            );
        }
        let data = self.canonical_bytes()?;
        let value = signer.sign(&data)?;
        let signature = Signature::new(
            algorithm,
            signer.canonicalization(),
            self.signature_reference(),
            value,
            signer.key_info(),
        );
        tracing::debug!(
            element = Self::LOCAL_NAME,
            id = self.signature_reference(),
            "signed element"
        );
        Ok(self.with_signature(Some(signature)))
    }

    /// Verifies the embedded signature. An unsigned element yields `false`.
    fn verify(&self, verifier: &dyn Verifier) -> SamlResult<bool> {
        let Some(signature) = self.signature() else {
            tracing::debug!(element = Self::LOCAL_NAME, "element carries no signature");
            return Ok(false);
        };
        let data = self.canonical_bytes()?;
        verifier.verify(&data, signature.value(), signature.signature_method())
    }
}

/// Reads the optional `ds:Signature` child of a signable element.
///
/// A signature preceded by anything other than `saml:Issuer` is still
/// accepted but logged, since it is rewritten as the first child.
pub(crate) fn read_signature(element: &XmlElement) -> SamlResult<Option<Signature>> {
    let signature = optional_child::<Signature>(element)?;
    if signature.is_some() {
        let misplaced = element
            .child_elements()
            .take_while(|child| !Signature::matches(child))
            .find(|child| !child.is(SAML_NS, "Issuer"));
        if let Some(preceding) = misplaced {
            tracing::warn!(
                element = %element.name(),
                preceding = %preceding.name(),
                "ds:Signature is not at the start of the element"
            );
        }
    }
    Ok(signature)
}

/// Inserts `signature` as the first child of `element`.
pub(crate) fn write_signature(element: &mut XmlElement, signature: Option<&Signature>) {
    if let Some(signature) = signature {
        element.prepend_child(signature.to_xml());
    }
}
