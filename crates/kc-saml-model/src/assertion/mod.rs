//! SAML 2.0 assertion elements.
//!
//! An [`Assertion`] is built either through [`AssertionBuilder`] or parsed
//! with [`SamlElement::from_xml`](crate::SamlElement::from_xml); both paths
//! run the same validation. Statements keep their document order through
//! parsing, serialization and transformation.

mod attribute;
mod authn;
mod conditions;
mod document;
mod name_id;
mod subject;

pub use attribute::{
    Attribute, AttributeStatement, AttributeStatementItem, AttributeValue, ElementContent,
};
pub use authn::{AuthnContext, AuthnStatement, SubjectLocality};
pub use conditions::{AudienceRestriction, Condition, Conditions, ProxyRestriction};
pub use document::{Assertion, AssertionBuilder, Statement};
pub use name_id::{Issuer, NameId, NameIdType};
pub use subject::{
    ConfirmationContent, Subject, SubjectConfirmation, SubjectConfirmationData,
    SubjectConfirmationDataBuilder, SubjectIdentifier,
};
