//! Typed SAML 2.0 object model for Keycloak Rust.
//!
//! This crate converts between SAML 2.0 documents and strongly typed values:
//!
//! - **Assertions** - Subjects, conditions, authentication and attribute statements
//! - **Metadata** - Entity and role descriptors, endpoints, keys and extensions
//! - **XML signature** - Embedded `ds:Signature` placement, signing and verification hooks
//! - **Transformation** - Pluggable assertion transformers, such as base64 attribute decoding
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`xml`] - Owned, namespace-aware XML tree and its quick-xml reader/writer
//! - [`codec`] - Attribute value parsing and canonical formatting
//! - [`element`] - The [`SamlElement`] contract and child cardinality helpers
//! - [`extensible`] - Pass-through storage for foreign attributes
//! - [`signature`] - Signable documents and the signer/verifier capabilities
//! - [`assertion`] - `saml:` assertion elements
//! - [`metadata`] - `md:` metadata elements
//! - [`transform`] - The assertion transformation pipeline
//! - [`error`] - Error types for SAML operations
//!
//! Every element validates on construction and on parse in the same way, and
//! round-trips: `T::from_xml(&value.to_xml())` equals `value`.
//!
//! # Example
//!
//! ```rust,ignore
//! use kc_saml_model::metadata::EntityDescriptor;
//! use kc_saml_model::{SamlElement, SignableElement};
//!
//! let entity = EntityDescriptor::from_xml_str(&metadata_xml)?;
//! if !entity.verify(&trusted_keys)? {
//!     return Err(SamlError::SignatureInvalid("untrusted metadata".into()));
//! }
//! let idp = entity.idp_descriptor();
//! ```
//!
//! # SAML Specifications
//!
//! This implementation follows these specifications:
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Metadata](https://docs.oasis-open.org/security/saml/v2.0/saml-metadata-2.0-os.pdf)
//! - [Metadata Profile for Algorithm Support](https://docs.oasis-open.org/security/saml/Post2.0/sstc-saml-metadata-algsupport-v1.0.html)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assertion;
pub mod codec;
pub mod constants;
pub mod element;
pub mod error;
pub mod extensible;
pub mod metadata;
pub mod signature;
pub mod transform;
pub mod xml;

#[cfg(test)]
mod test_support;

pub use element::SamlElement;
pub use error::{SamlError, SamlResult};
pub use extensible::ExtendedAttributes;
pub use signature::{SignableElement, Signer, Verifier};
pub use transform::{AssertionTransformer, TransformContext, TransformerChain};

/// Generates a fresh SAML `ID` value.
///
/// SAML IDs are `xs:ID` values and must not start with a digit, hence the
/// `_id` prefix.
#[must_use]
pub fn generate_id() -> String {
    format!("_id{}", uuid::Uuid::new_v4())
}
