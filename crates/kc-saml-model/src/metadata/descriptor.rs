//! Role descriptors: `md:IDPSSODescriptor` and `md:SPSSODescriptor`.
//!
//! Both share the `RoleDescriptorType` and `SSODescriptorType` parts of the
//! metadata schema, modelled here as [`RoleDescriptor`] and
//! [`SsoDescriptor`]. Each concrete descriptor is signable on its own.

use chrono::{DateTime, Utc};

use crate::assertion::Attribute;
use crate::codec::{
    normalize_datetime, optional_attribute, optional_bool, optional_datetime, set_optional,
    set_optional_bool, set_optional_datetime,
};
use crate::constants::{MD_NS, MD_PREFIX, SAML20_PROTOCOL};
use crate::element::{
    append_all, child_texts, children_of, ensure_element, new_element, one_or_more,
    optional_child, optional_opaque_child, opaque_children, text_element, SamlElement,
};
use crate::error::{SamlError, SamlResult};
use crate::extensible::ExtendedAttributes;
use crate::signature::{read_signature, write_signature, SignableElement, Signature};
use crate::xml::XmlElement;

use super::endpoint::{
    ArtifactResolutionService, AssertionConsumerService, AssertionIdRequestService,
    ManageNameIdService, NameIdMappingService, SingleLogoutService, SingleSignOnService,
};
use super::extensions::Extensions;
use super::key_descriptor::{KeyDescriptor, KeyUse};

const ROLE_ATTRIBUTES: [&str; 5] = [
    "ID",
    "validUntil",
    "cacheDuration",
    "errorURL",
    "protocolSupportEnumeration",
];

// ============================================================================
// Shared parts
// ============================================================================

/// Parts every role descriptor carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    id: Option<String>,
    valid_until: Option<DateTime<Utc>>,
    cache_duration: Option<String>,
    error_url: Option<String>,
    protocol_support: Vec<String>,
    extended_attributes: ExtendedAttributes,
    signature: Option<Signature>,
    extensions: Option<Extensions>,
    key_descriptors: Vec<KeyDescriptor>,
    organization: Option<XmlElement>,
    contact_persons: Vec<XmlElement>,
}

impl RoleDescriptor {
    /// Creates the shared parts for the given protocol URIs.
    pub fn new(protocol_support: Vec<String>) -> SamlResult<Self> {
        if protocol_support.iter().all(|uri| uri.trim().is_empty()) {
            return Err(SamlError::ConstraintViolation(
                "protocolSupportEnumeration must list at least one protocol".to_string(),
            ));
        }
        Ok(Self::supporting(protocol_support))
    }

    /// Creates the shared parts for a SAML 2.0 role.
    #[must_use]
    pub fn saml20() -> Self {
        Self::supporting(vec![SAML20_PROTOCOL.to_string()])
    }

    fn supporting(protocol_support: Vec<String>) -> Self {
        Self {
            id: None,
            valid_until: None,
            cache_duration: None,
            error_url: None,
            protocol_support,
            extended_attributes: ExtendedAttributes::new(),
            signature: None,
            extensions: None,
            key_descriptors: Vec::new(),
            organization: None,
            contact_persons: Vec::new(),
        }
    }

    /// Sets `ID`.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets `validUntil`.
    #[must_use]
    pub fn with_valid_until(mut self, instant: DateTime<Utc>) -> Self {
        self.valid_until = Some(normalize_datetime(instant));
        self
    }

    /// Sets `cacheDuration` (an `xs:duration`, kept as text).
    #[must_use]
    pub fn with_cache_duration(mut self, duration: impl Into<String>) -> Self {
        self.cache_duration = Some(duration.into());
        self
    }

    /// Sets `errorURL`.
    #[must_use]
    pub fn with_error_url(mut self, url: impl Into<String>) -> Self {
        self.error_url = Some(url.into());
        self
    }

    /// Sets the foreign attributes.
    #[must_use]
    pub fn with_extended_attributes(mut self, attributes: ExtendedAttributes) -> Self {
        self.extended_attributes = attributes;
        self
    }

    /// Sets `md:Extensions`.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Appends a key descriptor.
    #[must_use]
    pub fn with_key_descriptor(mut self, descriptor: KeyDescriptor) -> Self {
        self.key_descriptors.push(descriptor);
        self
    }

    /// Sets the `md:Organization` element.
    #[must_use]
    pub fn with_organization(mut self, organization: XmlElement) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Appends an `md:ContactPerson` element.
    #[must_use]
    pub fn with_contact_person(mut self, contact: XmlElement) -> Self {
        self.contact_persons.push(contact);
        self
    }

    /// Returns `ID`.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns `validUntil`.
    #[must_use]
    pub const fn valid_until(&self) -> Option<&DateTime<Utc>> {
        self.valid_until.as_ref()
    }

    /// Returns `cacheDuration`.
    #[must_use]
    pub fn cache_duration(&self) -> Option<&str> {
        self.cache_duration.as_deref()
    }

    /// Returns `errorURL`.
    #[must_use]
    pub fn error_url(&self) -> Option<&str> {
        self.error_url.as_deref()
    }

    /// Returns the supported protocol URIs.
    #[must_use]
    pub fn protocol_support(&self) -> &[String] {
        &self.protocol_support
    }

    /// Returns true if `protocol` is listed in `protocolSupportEnumeration`.
    #[must_use]
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        self.protocol_support.iter().any(|uri| uri == protocol)
    }

    /// Returns the foreign attributes.
    #[must_use]
    pub const fn extended_attributes(&self) -> &ExtendedAttributes {
        &self.extended_attributes
    }

    /// Returns the embedded signature.
    #[must_use]
    pub const fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Returns `md:Extensions`.
    #[must_use]
    pub const fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// Returns the key descriptors.
    #[must_use]
    pub fn key_descriptors(&self) -> &[KeyDescriptor] {
        &self.key_descriptors
    }

    /// Iterates the certificates of keys usable for `purpose`.
    pub fn certificates(&self, purpose: KeyUse) -> impl Iterator<Item = &str> {
        self.key_descriptors
            .iter()
            .filter(move |descriptor| descriptor.is_usable_for(purpose))
            .flat_map(|descriptor| descriptor.key_info().certificates())
    }

    /// Returns `md:Organization`.
    #[must_use]
    pub const fn organization(&self) -> Option<&XmlElement> {
        self.organization.as_ref()
    }

    /// Returns the `md:ContactPerson` elements.
    #[must_use]
    pub fn contact_persons(&self) -> &[XmlElement] {
        &self.contact_persons
    }

    fn read(element: &XmlElement, own_attributes: &[&str]) -> SamlResult<Self> {
        let protocol_support: Vec<String> = element
            .attribute("protocolSupportEnumeration")
            .ok_or_else(|| {
                SamlError::missing_attribute(element.local_name(), "protocolSupportEnumeration")
            })?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let claimed: Vec<&str> = ROLE_ATTRIBUTES
            .iter()
            .chain(own_attributes)
            .copied()
            .collect();
        Ok(Self {
            id: optional_attribute(element, "ID"),
            valid_until: optional_datetime(element, "validUntil")?,
            cache_duration: optional_attribute(element, "cacheDuration"),
            error_url: optional_attribute(element, "errorURL"),
            extended_attributes: ExtendedAttributes::from_element(element, &claimed),
            signature: read_signature(element)?,
            extensions: optional_child(element)?,
            key_descriptors: children_of(element)?,
            organization: optional_opaque_child(element, MD_NS, "Organization")?,
            contact_persons: opaque_children(element, MD_NS, "ContactPerson"),
            ..Self::new(protocol_support)?
        })
    }

    fn write_attributes(&self, element: &mut XmlElement) {
        set_optional(element, "ID", self.id());
        set_optional_datetime(element, "validUntil", self.valid_until.as_ref());
        set_optional(element, "cacheDuration", self.cache_duration());
        element.set_attribute("protocolSupportEnumeration", self.protocol_support.join(" "));
        set_optional(element, "errorURL", self.error_url());
    }

    fn write_children(&self, element: &mut XmlElement) {
        if let Some(extensions) = &self.extensions {
            extensions.append_to(element);
        }
        append_all(element, &self.key_descriptors);
        if let Some(organization) = &self.organization {
            element.append_child(organization.clone());
        }
        for contact in &self.contact_persons {
            element.append_child(contact.clone());
        }
    }
}

/// Parts shared by the single sign-on roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoDescriptor {
    role: RoleDescriptor,
    artifact_resolution_services: Vec<ArtifactResolutionService>,
    single_logout_services: Vec<SingleLogoutService>,
    manage_name_id_services: Vec<ManageNameIdService>,
    name_id_formats: Vec<String>,
}

impl SsoDescriptor {
    /// Wraps the role parts.
    #[must_use]
    pub const fn new(role: RoleDescriptor) -> Self {
        Self {
            role,
            artifact_resolution_services: Vec::new(),
            single_logout_services: Vec::new(),
            manage_name_id_services: Vec::new(),
            name_id_formats: Vec::new(),
        }
    }

    /// Appends an artifact resolution service.
    #[must_use]
    pub fn with_artifact_resolution_service(mut self, service: ArtifactResolutionService) -> Self {
        self.artifact_resolution_services.push(service);
        self
    }

    /// Appends a single logout service.
    #[must_use]
    pub fn with_single_logout_service(mut self, service: SingleLogoutService) -> Self {
        self.single_logout_services.push(service);
        self
    }

    /// Appends a name identifier management service.
    #[must_use]
    pub fn with_manage_name_id_service(mut self, service: ManageNameIdService) -> Self {
        self.manage_name_id_services.push(service);
        self
    }

    /// Appends a supported `NameIDFormat`.
    #[must_use]
    pub fn with_name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_formats.push(format.into());
        self
    }

    /// Returns the role parts.
    #[must_use]
    pub const fn role(&self) -> &RoleDescriptor {
        &self.role
    }

    /// Returns the artifact resolution services.
    #[must_use]
    pub fn artifact_resolution_services(&self) -> &[ArtifactResolutionService] {
        &self.artifact_resolution_services
    }

    /// Returns the single logout services.
    #[must_use]
    pub fn single_logout_services(&self) -> &[SingleLogoutService] {
        &self.single_logout_services
    }

    /// Returns the name identifier management services.
    #[must_use]
    pub fn manage_name_id_services(&self) -> &[ManageNameIdService] {
        &self.manage_name_id_services
    }

    /// Returns the supported `NameIDFormat` URIs.
    #[must_use]
    pub fn name_id_formats(&self) -> &[String] {
        &self.name_id_formats
    }

    fn read(element: &XmlElement, own_attributes: &[&str]) -> SamlResult<Self> {
        Ok(Self {
            role: RoleDescriptor::read(element, own_attributes)?,
            artifact_resolution_services: children_of(element)?,
            single_logout_services: children_of(element)?,
            manage_name_id_services: children_of(element)?,
            name_id_formats: child_texts(element, MD_NS, "NameIDFormat"),
        })
    }

    fn write_children(&self, element: &mut XmlElement) {
        self.role.write_children(element);
        append_all(element, &self.artifact_resolution_services);
        append_all(element, &self.single_logout_services);
        append_all(element, &self.manage_name_id_services);
        for format in &self.name_id_formats {
            element.append_child(text_element(MD_NS, MD_PREFIX, "NameIDFormat", format));
        }
    }

    fn with_signature(&self, signature: Option<Signature>) -> Self {
        let mut copy = self.clone();
        copy.role.signature = signature;
        copy
    }
}

// ============================================================================
// Identity provider
// ============================================================================

/// `md:IDPSSODescriptor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpSsoDescriptor {
    sso: SsoDescriptor,
    want_authn_requests_signed: Option<bool>,
    single_sign_on_services: Vec<SingleSignOnService>,
    name_id_mapping_services: Vec<NameIdMappingService>,
    assertion_id_request_services: Vec<AssertionIdRequestService>,
    attribute_profiles: Vec<String>,
    attributes: Vec<Attribute>,
}

impl IdpSsoDescriptor {
    /// Creates an IdP descriptor; at least one sign-on service is required.
    pub fn new(
        sso: SsoDescriptor,
        single_sign_on_services: Vec<SingleSignOnService>,
    ) -> SamlResult<Self> {
        if single_sign_on_services.is_empty() {
            return Err(SamlError::MissingElement(
                "IDPSSODescriptor must contain at least one SingleSignOnService element"
                    .to_string(),
            ));
        }
        Ok(Self {
            sso,
            want_authn_requests_signed: None,
            single_sign_on_services,
            name_id_mapping_services: Vec::new(),
            assertion_id_request_services: Vec::new(),
            attribute_profiles: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Sets `WantAuthnRequestsSigned`.
    #[must_use]
    pub fn with_want_authn_requests_signed(mut self, want: bool) -> Self {
        self.want_authn_requests_signed = Some(want);
        self
    }

    /// Appends a name identifier mapping service.
    #[must_use]
    pub fn with_name_id_mapping_service(mut self, service: NameIdMappingService) -> Self {
        self.name_id_mapping_services.push(service);
        self
    }

    /// Appends an assertion request service.
    #[must_use]
    pub fn with_assertion_id_request_service(mut self, service: AssertionIdRequestService) -> Self {
        self.assertion_id_request_services.push(service);
        self
    }

    /// Appends a supported attribute profile URI.
    #[must_use]
    pub fn with_attribute_profile(mut self, profile: impl Into<String>) -> Self {
        self.attribute_profiles.push(profile.into());
        self
    }

    /// Appends an attribute the IdP can release.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Returns the SSO parts.
    #[must_use]
    pub const fn sso(&self) -> &SsoDescriptor {
        &self.sso
    }

    /// Returns the role parts.
    #[must_use]
    pub const fn role(&self) -> &RoleDescriptor {
        &self.sso.role
    }

    /// Returns `WantAuthnRequestsSigned` as written.
    #[must_use]
    pub const fn want_authn_requests_signed(&self) -> Option<bool> {
        self.want_authn_requests_signed
    }

    /// Returns the sign-on services.
    #[must_use]
    pub fn single_sign_on_services(&self) -> &[SingleSignOnService] {
        &self.single_sign_on_services
    }

    /// Returns the first sign-on service using `binding`.
    #[must_use]
    pub fn single_sign_on_service(&self, binding: &str) -> Option<&SingleSignOnService> {
        self.single_sign_on_services
            .iter()
            .find(|service| service.binding() == binding)
    }

    /// Returns the name identifier mapping services.
    #[must_use]
    pub fn name_id_mapping_services(&self) -> &[NameIdMappingService] {
        &self.name_id_mapping_services
    }

    /// Returns the assertion request services.
    #[must_use]
    pub fn assertion_id_request_services(&self) -> &[AssertionIdRequestService] {
        &self.assertion_id_request_services
    }

    /// Returns the attribute profile URIs.
    #[must_use]
    pub fn attribute_profiles(&self) -> &[String] {
        &self.attribute_profiles
    }

    /// Returns the attributes the IdP can release.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl SamlElement for IdpSsoDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = "IDPSSODescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let sso = SsoDescriptor::read(element, &["WantAuthnRequestsSigned"])?;
        Ok(Self {
            want_authn_requests_signed: optional_bool(element, "WantAuthnRequestsSigned", None)?,
            name_id_mapping_services: children_of(element)?,
            assertion_id_request_services: children_of(element)?,
            attribute_profiles: child_texts(element, MD_NS, "AttributeProfile"),
            attributes: children_of(element)?,
            ..Self::new(sso, one_or_more(element)?)?
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.sso.role.write_attributes(&mut element);
        set_optional_bool(
            &mut element,
            "WantAuthnRequestsSigned",
            self.want_authn_requests_signed,
        );
        self.sso.role.extended_attributes.write_to(&mut element);
        self.sso.write_children(&mut element);
        append_all(&mut element, &self.single_sign_on_services);
        append_all(&mut element, &self.name_id_mapping_services);
        append_all(&mut element, &self.assertion_id_request_services);
        for profile in &self.attribute_profiles {
            element.append_child(text_element(MD_NS, MD_PREFIX, "AttributeProfile", profile));
        }
        append_all(&mut element, &self.attributes);
        write_signature(&mut element, self.sso.role.signature());
        element
    }
}

impl SignableElement for IdpSsoDescriptor {
    fn signature(&self) -> Option<&Signature> {
        self.sso.role.signature()
    }

    fn with_signature(&self, signature: Option<Signature>) -> Self {
        Self {
            sso: self.sso.with_signature(signature),
            ..self.clone()
        }
    }

    fn signature_reference(&self) -> Option<&str> {
        self.sso.role.id()
    }
}

// ============================================================================
// Service provider
// ============================================================================

/// `md:SPSSODescriptor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpSsoDescriptor {
    sso: SsoDescriptor,
    authn_requests_signed: Option<bool>,
    want_assertions_signed: Option<bool>,
    assertion_consumer_services: Vec<AssertionConsumerService>,
    attribute_consuming_services: Vec<XmlElement>,
}

impl SpSsoDescriptor {
    /// Creates an SP descriptor; at least one consumer service is required.
    pub fn new(
        sso: SsoDescriptor,
        assertion_consumer_services: Vec<AssertionConsumerService>,
    ) -> SamlResult<Self> {
        if assertion_consumer_services.is_empty() {
            return Err(SamlError::MissingElement(
                "SPSSODescriptor must contain at least one AssertionConsumerService element"
                    .to_string(),
            ));
        }
        Ok(Self {
            sso,
            authn_requests_signed: None,
            want_assertions_signed: None,
            assertion_consumer_services,
            attribute_consuming_services: Vec::new(),
        })
    }

    /// Sets `AuthnRequestsSigned`.
    #[must_use]
    pub fn with_authn_requests_signed(mut self, signed: bool) -> Self {
        self.authn_requests_signed = Some(signed);
        self
    }

    /// Sets `WantAssertionsSigned`.
    #[must_use]
    pub fn with_want_assertions_signed(mut self, want: bool) -> Self {
        self.want_assertions_signed = Some(want);
        self
    }

    /// Appends an `md:AttributeConsumingService` element.
    #[must_use]
    pub fn with_attribute_consuming_service(mut self, service: XmlElement) -> Self {
        self.attribute_consuming_services.push(service);
        self
    }

    /// Returns the SSO parts.
    #[must_use]
    pub const fn sso(&self) -> &SsoDescriptor {
        &self.sso
    }

    /// Returns the role parts.
    #[must_use]
    pub const fn role(&self) -> &RoleDescriptor {
        &self.sso.role
    }

    /// Returns `AuthnRequestsSigned` as written.
    #[must_use]
    pub const fn authn_requests_signed(&self) -> Option<bool> {
        self.authn_requests_signed
    }

    /// Returns `WantAssertionsSigned` as written.
    #[must_use]
    pub const fn want_assertions_signed(&self) -> Option<bool> {
        self.want_assertions_signed
    }

    /// Returns the assertion consumer services.
    #[must_use]
    pub fn assertion_consumer_services(&self) -> &[AssertionConsumerService] {
        &self.assertion_consumer_services
    }

    /// Returns the `md:AttributeConsumingService` elements.
    #[must_use]
    pub fn attribute_consuming_services(&self) -> &[XmlElement] {
        &self.attribute_consuming_services
    }
}

impl SamlElement for SpSsoDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = "SPSSODescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let sso =
            SsoDescriptor::read(element, &["AuthnRequestsSigned", "WantAssertionsSigned"])?;
        Ok(Self {
            authn_requests_signed: optional_bool(element, "AuthnRequestsSigned", None)?,
            want_assertions_signed: optional_bool(element, "WantAssertionsSigned", None)?,
            attribute_consuming_services: opaque_children(
                element,
                MD_NS,
                "AttributeConsumingService",
            ),
            ..Self::new(sso, one_or_more(element)?)?
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.sso.role.write_attributes(&mut element);
        set_optional_bool(&mut element, "AuthnRequestsSigned", self.authn_requests_signed);
        set_optional_bool(
            &mut element,
            "WantAssertionsSigned",
            self.want_assertions_signed,
        );
        self.sso.role.extended_attributes.write_to(&mut element);
        self.sso.write_children(&mut element);
        append_all(&mut element, &self.assertion_consumer_services);
        for service in &self.attribute_consuming_services {
            element.append_child(service.clone());
        }
        write_signature(&mut element, self.sso.role.signature());
        element
    }
}

impl SignableElement for SpSsoDescriptor {
    fn signature(&self) -> Option<&Signature> {
        self.sso.role.signature()
    }

    fn with_signature(&self, signature: Option<Signature>) -> Self {
        Self {
            sso: self.sso.with_signature(signature),
            ..self.clone()
        }
    }

    fn signature_reference(&self) -> Option<&str> {
        self.sso.role.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{NameIdFormat, SamlBinding};
    use crate::metadata::{Endpoint, ExtensionItem, Scope};
    use crate::test_support::ReversingSigner;

    const IDP: &str = r#"<md:IDPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:x="urn:x" ID="idp-role" WantAuthnRequestsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol  urn:oasis:names:tc:SAML:1.1:protocol" x:tier="gold">
  <md:KeyDescriptor use="signing">
    <ds:KeyInfo><ds:X509Data><ds:X509Certificate>U0lHTg==</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
  </md:KeyDescriptor>
  <md:KeyDescriptor use="encryption">
    <ds:KeyInfo><ds:X509Data><ds:X509Certificate>RU5D</ds:X509Certificate></ds:X509Data></ds:KeyInfo>
  </md:KeyDescriptor>
  <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp/slo" ResponseLocation="https://idp/slo/response"/>
  <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:persistent</md:NameIDFormat>
  <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp/sso"/>
  <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp/sso"/>
  <saml:Attribute Name="mail" NameFormat="urn:oasis:names:tc:SAML:2.0:attrname-format:basic"/>
</md:IDPSSODescriptor>"#;

    fn sp() -> SpSsoDescriptor {
        let acs = AssertionConsumerService::new(
            Endpoint::with_binding(SamlBinding::HttpPost, "https://sp/acs").unwrap(),
            0,
            Some(true),
        );
        SpSsoDescriptor::new(
            SsoDescriptor::new(RoleDescriptor::saml20().with_id("sp-role"))
                .with_name_id_format(NameIdFormat::Transient.uri()),
            vec![acs],
        )
        .unwrap()
        .with_want_assertions_signed(true)
    }

    #[test]
    fn parses_idp_descriptor() {
        let idp = IdpSsoDescriptor::from_xml_str(IDP).unwrap();
        let role = idp.role();
        assert_eq!(role.id(), Some("idp-role"));
        assert_eq!(role.protocol_support().len(), 2);
        assert!(role.supports_protocol(SAML20_PROTOCOL));
        assert_eq!(role.extended_attributes().get("urn:x", "tier"), Some("gold"));
        assert_eq!(role.certificates(KeyUse::Signing).collect::<Vec<_>>(), vec!["U0lHTg=="]);
        assert_eq!(idp.want_authn_requests_signed(), Some(true));
        assert_eq!(idp.single_sign_on_services().len(), 2);
        assert_eq!(
            idp.single_sign_on_service(SamlBinding::HttpRedirect.uri())
                .map(Endpoint::location),
            Some("https://idp/sso")
        );
        assert_eq!(
            idp.sso().single_logout_services()[0].response_location(),
            Some("https://idp/slo/response")
        );
        assert_eq!(idp.sso().name_id_formats(), [NameIdFormat::Persistent.uri().to_string()]);
        assert_eq!(idp.attributes()[0].name(), "mail");

        let text = idp.to_xml_string().unwrap();
        assert_eq!(IdpSsoDescriptor::from_xml_str(&text).unwrap(), idp);
    }

    #[test]
    fn idp_requires_sign_on_service() {
        let err = IdpSsoDescriptor::from_xml_str(
            r#"<md:IDPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, SamlError::MissingElement(ref m) if m.contains("SingleSignOnService")));
    }

    #[test]
    fn protocol_support_is_required() {
        let err = SpSsoDescriptor::from_xml_str(
            r#"<md:SPSSODescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"><md:AssertionConsumerService Binding="urn:b" Location="https://sp/acs" index="0"/></md:SPSSODescriptor>"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SamlError::missing_attribute("SPSSODescriptor", "protocolSupportEnumeration")
        );
        assert!(matches!(
            RoleDescriptor::new(vec![" ".to_string()]),
            Err(SamlError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn sp_round_trip_with_extensions() {
        let extensions =
            Extensions::new(vec![ExtensionItem::Scope(Scope::new("example.org", false).unwrap())])
                .unwrap();
        let sp = SpSsoDescriptor::new(
            SsoDescriptor::new(RoleDescriptor::saml20().with_extensions(extensions)),
            sp().assertion_consumer_services().to_vec(),
        )
        .unwrap();
        let text = sp.to_xml_string().unwrap();
        assert!(text.contains(r#"regexp="false""#));
        assert_eq!(SpSsoDescriptor::from_xml_str(&text).unwrap(), sp);
    }

    #[test]
    fn signed_sp_descriptor_keeps_signature_first() {
        let signer = ReversingSigner { key: b"role-key".to_vec() };
        let signed = sp().sign(&signer).unwrap();
        let element = signed.to_xml();
        assert!(element
            .first_child_element()
            .is_some_and(|child| child.is(crate::constants::XMLDSIG_NS, "Signature")));
        assert_eq!(
            signed.signature().and_then(Signature::reference_uri),
            Some("#sp-role")
        );

        let parsed = SpSsoDescriptor::from_xml(&element).unwrap();
        assert!(parsed.verify(&signer).unwrap());
        assert!(!sp().verify(&signer).unwrap());
    }
}
