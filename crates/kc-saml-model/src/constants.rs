//! SAML 2.0 constants and URIs.
//!
//! Namespace URIs with the prefixes used on output, binding URIs, name ID
//! formats, and algorithm identifiers referenced by the element types.

/// SAML 2.0 assertion namespace URI.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// Prefix emitted for [`SAML_NS`].
pub const SAML_PREFIX: &str = "saml";

/// SAML 2.0 metadata namespace URI.
pub const MD_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";

/// Prefix emitted for [`MD_NS`].
pub const MD_PREFIX: &str = "md";

/// XML Digital Signature namespace URI.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Prefix emitted for [`XMLDSIG_NS`].
pub const DS_PREFIX: &str = "ds";

/// Metadata profile for algorithm support namespace URI.
pub const ALG_NS: &str = "urn:oasis:names:tc:SAML:metadata:algsupport";

/// Prefix emitted for [`ALG_NS`].
pub const ALG_PREFIX: &str = "alg";

/// Shibboleth metadata extension namespace URI.
pub const SHIBMD_NS: &str = "urn:mace:shibboleth:metadata:1.0";

/// Prefix emitted for [`SHIBMD_NS`].
pub const SHIBMD_PREFIX: &str = "shibmd";

/// XSI namespace URI.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Prefix emitted for [`XSI_NS`].
pub const XSI_PREFIX: &str = "xsi";

/// XS namespace URI.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Prefix emitted for [`XS_NS`].
pub const XS_PREFIX: &str = "xs";

/// SAML protocol version carried by assertions.
pub const SAML_VERSION: &str = "2.0";

/// SAML 2.0 protocol support enumeration value.
pub const SAML20_PROTOCOL: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// Maximum length of an entity identifier (SAML 2.0 metadata, section 2.3.2).
pub const ENTITY_ID_MAX_LENGTH: usize = 1024;

// ============================================================================
// Binding URIs
// ============================================================================

/// SAML binding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamlBinding {
    /// HTTP POST binding.
    HttpPost,
    /// HTTP Redirect binding.
    HttpRedirect,
    /// HTTP Artifact binding.
    HttpArtifact,
    /// SOAP binding.
    Soap,
}

impl SamlBinding {
    /// Returns the URI for this binding.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::HttpPost => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            Self::HttpRedirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
            Self::HttpArtifact => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact",
            Self::Soap => "urn:oasis:names:tc:SAML:2.0:bindings:SOAP",
        }
    }

    /// Parses a binding from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" => Some(Self::HttpPost),
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" => Some(Self::HttpRedirect),
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Artifact" => Some(Self::HttpArtifact),
            "urn:oasis:names:tc:SAML:2.0:bindings:SOAP" => Some(Self::Soap),
            _ => None,
        }
    }
}

// ============================================================================
// Name ID Formats
// ============================================================================

/// SAML Name ID formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameIdFormat {
    /// Unspecified name ID format.
    #[default]
    Unspecified,
    /// Email address format.
    Email,
    /// Entity identifier format.
    Entity,
    /// Persistent identifier format.
    Persistent,
    /// Transient identifier format.
    Transient,
}

impl NameIdFormat {
    /// Returns the URI for this name ID format.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
            Self::Email => "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress",
            Self::Entity => "urn:oasis:names:tc:SAML:2.0:nameid-format:entity",
            Self::Persistent => "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
            Self::Transient => "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
        }
    }

    /// Parses a name ID format from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified" => Some(Self::Unspecified),
            "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress" => Some(Self::Email),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:entity" => Some(Self::Entity),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent" => Some(Self::Persistent),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:transient" => Some(Self::Transient),
            _ => None,
        }
    }
}

// ============================================================================
// Authentication Context Classes
// ============================================================================

/// SAML authentication context class references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthnContextClass {
    /// Unspecified authentication context.
    #[default]
    Unspecified,
    /// Password-based authentication.
    Password,
    /// Password protected transport (TLS + password).
    PasswordProtectedTransport,
    /// X.509 certificate authentication.
    X509,
    /// Previous session (SSO).
    PreviousSession,
}

impl AuthnContextClass {
    /// Returns the URI for this authentication context class.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => "urn:oasis:names:tc:SAML:2.0:ac:classes:unspecified",
            Self::Password => "urn:oasis:names:tc:SAML:2.0:ac:classes:Password",
            Self::PasswordProtectedTransport => {
                "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport"
            }
            Self::X509 => "urn:oasis:names:tc:SAML:2.0:ac:classes:X509",
            Self::PreviousSession => "urn:oasis:names:tc:SAML:2.0:ac:classes:PreviousSession",
        }
    }
}

/// Attribute name formats.
pub mod attrname_formats {
    /// URI name format.
    pub const URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

    /// Basic name format.
    pub const BASIC: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:basic";

    /// Unspecified name format.
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified";
}

/// Subject confirmation methods.
pub mod confirmation_methods {
    /// Bearer confirmation method URI.
    pub const BEARER: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

    /// Holder of key confirmation method URI.
    pub const HOLDER_OF_KEY: &str = "urn:oasis:names:tc:SAML:2.0:cm:holder-of-key";

    /// Sender vouches confirmation method URI.
    pub const SENDER_VOUCHES: &str = "urn:oasis:names:tc:SAML:2.0:cm:sender-vouches";
}

// ============================================================================
// Algorithms
// ============================================================================

/// XML signature algorithms.
pub mod signature_algorithms {
    /// RSA-SHA256 signature algorithm.
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

    /// RSA-SHA384 signature algorithm.
    pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";

    /// RSA-SHA512 signature algorithm.
    pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

    /// ECDSA-SHA256 signature algorithm.
    pub const ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";

    /// ECDSA-SHA384 signature algorithm.
    pub const ECDSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384";

    /// ECDSA-SHA512 signature algorithm.
    pub const ECDSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512";

    /// Legacy RSA-SHA1 signature algorithm (not recommended).
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
}

/// Digest algorithms.
pub mod digest_algorithms {
    /// SHA-256 digest algorithm.
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

    /// SHA-384 digest algorithm.
    pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";

    /// SHA-512 digest algorithm.
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

    /// Legacy SHA-1 digest algorithm (not recommended).
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
}

/// Canonicalization algorithms.
pub mod canonicalization_algorithms {
    /// Exclusive C14N without comments.
    pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

    /// Exclusive C14N with comments.
    pub const EXCLUSIVE_C14N_WITH_COMMENTS: &str =
        "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

    /// C14N without comments.
    pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";

    /// C14N with comments.
    pub const C14N_WITH_COMMENTS: &str =
        "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_uri_roundtrip() {
        for binding in [
            SamlBinding::HttpPost,
            SamlBinding::HttpRedirect,
            SamlBinding::HttpArtifact,
            SamlBinding::Soap,
        ] {
            assert_eq!(SamlBinding::from_uri(binding.uri()), Some(binding));
        }
    }

    #[test]
    fn entity_format_is_recognized() {
        assert_eq!(
            NameIdFormat::from_uri("urn:oasis:names:tc:SAML:2.0:nameid-format:entity"),
            Some(NameIdFormat::Entity)
        );
        assert_eq!(NameIdFormat::from_uri("urn:example:custom"), None);
    }
}
