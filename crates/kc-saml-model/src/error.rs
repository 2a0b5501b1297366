//! SAML object model error types.
//!
//! Every fallible operation in this crate returns [`SamlResult`]. The
//! variants separate structural failures (wrong element, missing or
//! superfluous children), value failures (constraint and protocol
//! violations), content failures found while transforming an assertion, and
//! wiring failures (a transformer ran without its required capability).

use thiserror::Error;

/// Result type for SAML object model operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML object model errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamlError {
    /// The node's namespace or local name does not match the expected element.
    #[error("wrong element: expected {expected}, got {actual}")]
    WrongElement {
        /// Expected qualified name in `{namespace}local` form.
        expected: String,
        /// Actual qualified name in `{namespace}local` form.
        actual: String,
    },

    /// A required attribute is absent.
    #[error("missing required attribute '{attribute}' on {element}")]
    MissingAttribute {
        /// Local name of the element.
        element: String,
        /// Name of the missing attribute.
        attribute: String,
    },

    /// A required child element is absent.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// A child element occurs more often than its cardinality allows.
    #[error("too many {child} elements in {element}")]
    TooManyElements {
        /// Local name of the parent element.
        element: String,
        /// Local name of the repeated child.
        child: String,
    },

    /// A value is present but violates a constraint (length, blankness,
    /// mutual exclusivity).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A value cannot be interpreted as the expected type.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A value is syntactically present but not SAML conformant.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Assertion content rejected by a transformer.
    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    /// A transformer was run without a capability it depends on.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// XML serialization error.
    #[error("XML write error: {0}")]
    XmlWrite(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// XML signature is malformed or could not be checked.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),
}

impl SamlError {
    /// Builds a [`SamlError::MissingAttribute`].
    pub(crate) fn missing_attribute(element: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    /// Builds a [`SamlError::TooManyElements`].
    pub(crate) fn too_many(element: &str, child: &str) -> Self {
        Self::TooManyElements {
            element: element.to_string(),
            child: child.to_string(),
        }
    }

    /// Returns true if the error stems from missing wiring rather than input.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if the error was caused by the document being processed.
    #[must_use]
    pub const fn is_content_error(&self) -> bool {
        !matches!(
            self,
            Self::Configuration(_) | Self::XmlWrite(_) | Self::SignatureCreation(_)
        )
    }

    /// Returns the SAML status code for this error.
    ///
    /// Content errors are the requester's fault; everything else is reported
    /// as a responder failure.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        if self.is_content_error() {
            "urn:oasis:names:tc:SAML:2.0:status:Requester"
        } else {
            "urn:oasis:names:tc:SAML:2.0:status:Responder"
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}
