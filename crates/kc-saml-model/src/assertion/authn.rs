//! `saml:AuthnStatement` and its parts.

use chrono::{DateTime, Utc};

use crate::codec::{
    check_ip_address, format_datetime, normalize_datetime, optional_attribute,
    optional_datetime, required_datetime, set_optional, set_optional_datetime,
};
use crate::constants::{AuthnContextClass, SAML_NS, SAML_PREFIX};
use crate::element::{
    child_texts, ensure_element, new_element, optional_child, optional_child_text,
    required_child, text_element, SamlElement,
};
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// Statement that the subject authenticated at a given time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnStatement {
    authn_instant: DateTime<Utc>,
    session_index: Option<String>,
    session_not_on_or_after: Option<DateTime<Utc>>,
    subject_locality: Option<SubjectLocality>,
    authn_context: AuthnContext,
}

impl AuthnStatement {
    /// Creates a statement with the required instant and context.
    #[must_use]
    pub fn new(authn_instant: DateTime<Utc>, authn_context: AuthnContext) -> Self {
        Self {
            authn_instant: normalize_datetime(authn_instant),
            session_index: None,
            session_not_on_or_after: None,
            subject_locality: None,
            authn_context,
        }
    }

    /// Sets `SessionIndex`.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_index = Some(index.into());
        self
    }

    /// Sets `SessionNotOnOrAfter`.
    #[must_use]
    pub fn with_session_not_on_or_after(mut self, instant: DateTime<Utc>) -> Self {
        self.session_not_on_or_after = Some(normalize_datetime(instant));
        self
    }

    /// Sets the subject locality.
    #[must_use]
    pub fn with_subject_locality(mut self, locality: SubjectLocality) -> Self {
        self.subject_locality = Some(locality);
        self
    }

    /// Returns `AuthnInstant`.
    #[must_use]
    pub const fn authn_instant(&self) -> &DateTime<Utc> {
        &self.authn_instant
    }

    /// Returns `SessionIndex`.
    #[must_use]
    pub fn session_index(&self) -> Option<&str> {
        self.session_index.as_deref()
    }

    /// Returns `SessionNotOnOrAfter`.
    #[must_use]
    pub const fn session_not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.session_not_on_or_after.as_ref()
    }

    /// Returns the subject locality.
    #[must_use]
    pub const fn subject_locality(&self) -> Option<&SubjectLocality> {
        self.subject_locality.as_ref()
    }

    /// Returns the authentication context.
    #[must_use]
    pub const fn authn_context(&self) -> &AuthnContext {
        &self.authn_context
    }
}

impl SamlElement for AuthnStatement {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "AuthnStatement";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Ok(Self {
            authn_instant: required_datetime(element, "AuthnInstant")?,
            session_index: optional_attribute(element, "SessionIndex"),
            session_not_on_or_after: optional_datetime(element, "SessionNotOnOrAfter")?,
            subject_locality: optional_child(element)?,
            authn_context: required_child(element)?,
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("AuthnInstant", format_datetime(&self.authn_instant));
        set_optional(&mut element, "SessionIndex", self.session_index());
        set_optional_datetime(
            &mut element,
            "SessionNotOnOrAfter",
            self.session_not_on_or_after.as_ref(),
        );
        if let Some(locality) = &self.subject_locality {
            locality.append_to(&mut element);
        }
        self.authn_context.append_to(&mut element);
        element
    }
}

/// Network location the subject authenticated from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubjectLocality {
    address: Option<String>,
    dns_name: Option<String>,
}

impl SubjectLocality {
    /// Creates a locality. A malformed `Address` is logged and kept.
    #[must_use]
    pub fn new(address: Option<String>, dns_name: Option<String>) -> Self {
        if let Some(address) = &address {
            check_ip_address(address, "Address");
        }
        Self { address, dns_name }
    }

    /// Returns `Address` exactly as supplied.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns `DNSName`.
    #[must_use]
    pub fn dns_name(&self) -> Option<&str> {
        self.dns_name.as_deref()
    }
}

impl SamlElement for SubjectLocality {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "SubjectLocality";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Ok(Self::new(
            optional_attribute(element, "Address"),
            optional_attribute(element, "DNSName"),
        ))
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        set_optional(&mut element, "Address", self.address());
        set_optional(&mut element, "DNSName", self.dns_name());
        element
    }
}

/// How the subject authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnContext {
    class_ref: Option<String>,
    decl_ref: Option<String>,
    authenticating_authorities: Vec<String>,
}

impl AuthnContext {
    /// Creates a context; a class or declaration reference is required.
    pub fn new(
        class_ref: Option<String>,
        decl_ref: Option<String>,
        authenticating_authorities: Vec<String>,
    ) -> SamlResult<Self> {
        if class_ref.is_none() && decl_ref.is_none() {
            return Err(SamlError::MissingElement(
                "AuthnContext must contain AuthnContextClassRef or AuthnContextDeclRef"
                    .to_string(),
            ));
        }
        Ok(Self {
            class_ref,
            decl_ref,
            authenticating_authorities,
        })
    }

    /// Creates a context referring to a well-known class.
    #[must_use]
    pub fn from_class(class: AuthnContextClass) -> Self {
        Self {
            class_ref: Some(class.uri().to_string()),
            decl_ref: None,
            authenticating_authorities: Vec::new(),
        }
    }

    /// Returns `AuthnContextClassRef`.
    #[must_use]
    pub fn class_ref(&self) -> Option<&str> {
        self.class_ref.as_deref()
    }

    /// Returns `AuthnContextDeclRef`.
    #[must_use]
    pub fn decl_ref(&self) -> Option<&str> {
        self.decl_ref.as_deref()
    }

    /// Returns the `AuthenticatingAuthority` entity IDs.
    #[must_use]
    pub fn authenticating_authorities(&self) -> &[String] {
        &self.authenticating_authorities
    }
}

impl SamlElement for AuthnContext {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "AuthnContext";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Self::new(
            optional_child_text(element, SAML_NS, "AuthnContextClassRef")?,
            optional_child_text(element, SAML_NS, "AuthnContextDeclRef")?,
            child_texts(element, SAML_NS, "AuthenticatingAuthority"),
        )
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        if let Some(class_ref) = &self.class_ref {
            element.append_child(text_element(
                SAML_NS,
                SAML_PREFIX,
                "AuthnContextClassRef",
                class_ref,
            ));
        }
        if let Some(decl_ref) = &self.decl_ref {
            element.append_child(text_element(
                SAML_NS,
                SAML_PREFIX,
                "AuthnContextDeclRef",
                decl_ref,
            ));
        }
        for authority in &self.authenticating_authorities {
            element.append_child(text_element(
                SAML_NS,
                SAML_PREFIX,
                "AuthenticatingAuthority",
                authority,
            ));
        }
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_warnings;
    use chrono::TimeZone;

    #[test]
    fn parses_statement() {
        let statement = AuthnStatement::from_xml_str(
            r#"<saml:AuthnStatement xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" AuthnInstant="2024-05-01T09:59:58.999Z" SessionIndex="s-1">
  <saml:SubjectLocality Address="192.0.2.4" DNSName="client.example.com"/>
  <saml:AuthnContext>
    <saml:AuthnContextClassRef>urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport</saml:AuthnContextClassRef>
    <saml:AuthenticatingAuthority>https://upstream-idp</saml:AuthenticatingAuthority>
  </saml:AuthnContext>
</saml:AuthnStatement>"#,
        )
        .unwrap();

        assert_eq!(
            statement.authn_instant(),
            &Utc.with_ymd_and_hms(2024, 5, 1, 9, 59, 58).unwrap()
        );
        assert_eq!(statement.session_index(), Some("s-1"));
        assert_eq!(
            statement.authn_context().class_ref(),
            Some(AuthnContextClass::PasswordProtectedTransport.uri())
        );
        assert_eq!(
            statement.authn_context().authenticating_authorities(),
            ["https://upstream-idp".to_string()]
        );
        assert_eq!(
            statement.subject_locality().and_then(SubjectLocality::dns_name),
            Some("client.example.com")
        );
    }

    #[test]
    fn context_is_required() {
        let err = AuthnStatement::from_xml_str(
            r#"<saml:AuthnStatement xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" AuthnInstant="2024-05-01T10:00:00Z"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, SamlError::MissingElement(_)));
    }

    #[test]
    fn empty_context_is_rejected() {
        assert!(matches!(
            AuthnContext::new(None, None, Vec::new()),
            Err(SamlError::MissingElement(_))
        ));
    }

    #[test]
    fn missing_instant_is_missing_attribute() {
        let err = AuthnStatement::from_xml_str(
            r#"<saml:AuthnStatement xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"><saml:AuthnContext><saml:AuthnContextDeclRef>urn:decl</saml:AuthnContextDeclRef></saml:AuthnContext></saml:AuthnStatement>"#,
        )
        .unwrap_err();
        assert_eq!(err, SamlError::missing_attribute("AuthnStatement", "AuthnInstant"));
    }

    #[test]
    fn malformed_locality_address_only_warns() {
        let warnings = capture_warnings(|| {
            let locality = SubjectLocality::new(Some("999.1.1.1".to_string()), None);
            assert_eq!(locality.address(), Some("999.1.1.1"));
        });
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn built_statement_round_trips() {
        let statement = AuthnStatement::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            AuthnContext::from_class(AuthnContextClass::X509),
        )
        .with_session_index("idx")
        .with_session_not_on_or_after(Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap())
        .with_subject_locality(SubjectLocality::new(Some("::1".to_string()), None));
        let text = statement.to_xml_string().unwrap();
        assert_eq!(AuthnStatement::from_xml_str(&text).unwrap(), statement);
    }
}
