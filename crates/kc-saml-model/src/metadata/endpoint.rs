//! Metadata service endpoints.
//!
//! Every endpoint element shares one shape (`Binding`, `Location`, optional
//! `ResponseLocation`) and differs only in its element name and whether a
//! `ResponseLocation` is permitted. Both are carried by an [`EndpointKind`]
//! marker, so a single [`Endpoint`] type serves all of them.

use std::fmt;
use std::marker::PhantomData;

use crate::codec::{
    optional_attribute, optional_bool, parse_unsigned_short, required_attribute, set_optional,
    set_optional_bool, validate_non_blank,
};
use crate::constants::{SamlBinding, MD_NS, MD_PREFIX};
use crate::element::{ensure_element, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::extensible::ExtendedAttributes;
use crate::xml::XmlElement;

/// Element name and rules of one kind of endpoint.
pub trait EndpointKind: fmt::Debug + Clone + PartialEq + Eq {
    /// Local name of the endpoint element.
    const LOCAL_NAME: &'static str;
    /// Whether the endpoint may carry a `ResponseLocation`.
    const ALLOWS_RESPONSE_LOCATION: bool;
}

macro_rules! endpoint_kind {
    ($(#[$doc:meta])* $kind:ident, $local:literal, $response:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $kind;

        impl EndpointKind for $kind {
            const LOCAL_NAME: &'static str = $local;
            const ALLOWS_RESPONSE_LOCATION: bool = $response;
        }
    };
}

endpoint_kind!(
    /// `md:SingleSignOnService`.
    SingleSignOn, "SingleSignOnService", false
);
endpoint_kind!(
    /// `md:SingleLogoutService`.
    SingleLogout, "SingleLogoutService", true
);
endpoint_kind!(
    /// `md:ManageNameIDService`.
    ManageNameId, "ManageNameIDService", true
);
endpoint_kind!(
    /// `md:NameIDMappingService`.
    NameIdMapping, "NameIDMappingService", false
);
endpoint_kind!(
    /// `md:AssertionIDRequestService`.
    AssertionIdRequest, "AssertionIDRequestService", false
);
endpoint_kind!(
    /// `md:ArtifactResolutionService`.
    ArtifactResolution, "ArtifactResolutionService", false
);
endpoint_kind!(
    /// `md:AssertionConsumerService`.
    AssertionConsumer, "AssertionConsumerService", true
);

/// `md:SingleSignOnService`.
pub type SingleSignOnService = Endpoint<SingleSignOn>;
/// `md:SingleLogoutService`.
pub type SingleLogoutService = Endpoint<SingleLogout>;
/// `md:ManageNameIDService`.
pub type ManageNameIdService = Endpoint<ManageNameId>;
/// `md:NameIDMappingService`.
pub type NameIdMappingService = Endpoint<NameIdMapping>;
/// `md:AssertionIDRequestService`.
pub type AssertionIdRequestService = Endpoint<AssertionIdRequest>;
/// `md:ArtifactResolutionService`.
pub type ArtifactResolutionService = IndexedEndpoint<ArtifactResolution>;
/// `md:AssertionConsumerService`.
pub type AssertionConsumerService = IndexedEndpoint<AssertionConsumer>;

const ENDPOINT_ATTRIBUTES: [&str; 3] = ["Binding", "Location", "ResponseLocation"];
const INDEXED_ATTRIBUTES: [&str; 5] = [
    "Binding",
    "Location",
    "ResponseLocation",
    "index",
    "isDefault",
];

/// A protocol endpoint of kind `K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint<K: EndpointKind> {
    binding: String,
    location: String,
    response_location: Option<String>,
    extended_attributes: ExtendedAttributes,
    children: Vec<XmlElement>,
    kind: PhantomData<K>,
}

impl<K: EndpointKind> Endpoint<K> {
    /// Creates an endpoint.
    ///
    /// Fails with [`SamlError::ConstraintViolation`] if `response_location`
    /// is set on a kind that forbids it.
    pub fn new(
        binding: impl Into<String>,
        location: impl Into<String>,
        response_location: Option<String>,
    ) -> SamlResult<Self> {
        let binding = binding.into();
        let location = location.into();
        validate_non_blank(&binding, "Binding")?;
        validate_non_blank(&location, "Location")?;
        if response_location.is_some() && !K::ALLOWS_RESPONSE_LOCATION {
            return Err(SamlError::ConstraintViolation(format!(
                "ResponseLocation is not allowed on {}",
                K::LOCAL_NAME
            )));
        }
        Ok(Self {
            binding,
            location,
            response_location,
            extended_attributes: ExtendedAttributes::new(),
            children: Vec::new(),
            kind: PhantomData,
        })
    }

    /// Creates an endpoint for a known binding.
    pub fn with_binding(binding: SamlBinding, location: impl Into<String>) -> SamlResult<Self> {
        Self::new(binding.uri(), location, None)
    }

    /// Sets the foreign attributes.
    #[must_use]
    pub fn with_extended_attributes(mut self, attributes: ExtendedAttributes) -> Self {
        self.extended_attributes = attributes;
        self
    }

    /// Appends a foreign child element.
    #[must_use]
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Returns `Binding`.
    #[must_use]
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// Returns `Binding` as a known binding.
    #[must_use]
    pub fn known_binding(&self) -> Option<SamlBinding> {
        SamlBinding::from_uri(&self.binding)
    }

    /// Returns `Location`.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns `ResponseLocation`.
    #[must_use]
    pub fn response_location(&self) -> Option<&str> {
        self.response_location.as_deref()
    }

    /// Returns the foreign attributes.
    #[must_use]
    pub const fn extended_attributes(&self) -> &ExtendedAttributes {
        &self.extended_attributes
    }

    /// Returns the foreign child elements.
    #[must_use]
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    fn read(element: &XmlElement, claimed: &[&str]) -> SamlResult<Self> {
        let endpoint = Self::new(
            required_attribute(element, "Binding")?,
            required_attribute(element, "Location")?,
            optional_attribute(element, "ResponseLocation"),
        )?;
        Ok(Self {
            extended_attributes: ExtendedAttributes::from_element(element, claimed),
            children: element.child_elements().cloned().collect(),
            ..endpoint
        })
    }

    fn write_attributes(&self, element: &mut XmlElement) {
        element.set_attribute("Binding", self.binding.as_str());
        element.set_attribute("Location", self.location.as_str());
        set_optional(element, "ResponseLocation", self.response_location());
    }

    fn write_tail(&self, element: &mut XmlElement) {
        self.extended_attributes.write_to(element);
        for child in &self.children {
            element.append_child(child.clone());
        }
    }
}

impl<K: EndpointKind> SamlElement for Endpoint<K> {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = K::LOCAL_NAME;

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Self::read(element, &ENDPOINT_ATTRIBUTES)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.write_attributes(&mut element);
        self.write_tail(&mut element);
        element
    }
}

/// An endpoint addressed by `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEndpoint<K: EndpointKind> {
    endpoint: Endpoint<K>,
    index: u16,
    is_default: Option<bool>,
}

impl<K: EndpointKind> IndexedEndpoint<K> {
    /// Creates an indexed endpoint. An absent `is_default` stays absent.
    #[must_use]
    pub const fn new(endpoint: Endpoint<K>, index: u16, is_default: Option<bool>) -> Self {
        Self {
            endpoint,
            index,
            is_default,
        }
    }

    /// Returns the endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint<K> {
        &self.endpoint
    }

    /// Returns `index`.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Returns `isDefault` as written.
    #[must_use]
    pub const fn is_default(&self) -> Option<bool> {
        self.is_default
    }
}

impl<K: EndpointKind> SamlElement for IndexedEndpoint<K> {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = K::LOCAL_NAME;

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let endpoint = Endpoint::read(element, &INDEXED_ATTRIBUTES)?;
        let index = parse_unsigned_short(required_attribute(element, "index")?, "index")?;
        let is_default = optional_bool(element, "isDefault", None)?;
        Ok(Self::new(endpoint, index, is_default))
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        self.endpoint.write_attributes(&mut element);
        element.set_attribute("index", self.index.to_string());
        set_optional_bool(&mut element, "isDefault", self.is_default);
        self.endpoint.write_tail(&mut element);
        element
    }
}

/// Picks the default among indexed endpoints.
///
/// The first endpoint with `isDefault="true"` wins, then the first without
/// an `isDefault` attribute, then the first endpoint.
#[must_use]
pub fn default_endpoint<K: EndpointKind>(
    endpoints: &[IndexedEndpoint<K>],
) -> Option<&IndexedEndpoint<K>> {
    endpoints
        .iter()
        .find(|e| e.is_default == Some(true))
        .or_else(|| endpoints.iter().find(|e| e.is_default.is_none()))
        .or_else(|| endpoints.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const POST: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

    #[test]
    fn sso_rejects_response_location() {
        let err = SingleSignOnService::new(POST, "https://idp/sso", Some("https://idp/r".into()))
            .unwrap_err();
        match err {
            SamlError::ConstraintViolation(message) => {
                assert!(message.contains("ResponseLocation"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sso_rejects_response_location_when_parsed() {
        let err = SingleSignOnService::from_xml_str(
            r#"<md:SingleSignOnService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="urn:b" Location="https://idp/sso" ResponseLocation="https://idp/r"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, SamlError::ConstraintViolation(ref m) if m.contains("ResponseLocation")));
    }

    #[test]
    fn logout_allows_response_location() {
        let slo = SingleLogoutService::new(POST, "https://idp/slo", Some("https://idp/slo-r".into()))
            .unwrap();
        assert_eq!(slo.response_location(), Some("https://idp/slo-r"));
        assert_eq!(SingleLogoutService::from_xml(&slo.to_xml()).unwrap(), slo);
    }

    #[test]
    fn wrong_kind_is_wrong_element() {
        let slo = SingleLogoutService::with_binding(SamlBinding::HttpRedirect, "https://idp/slo")
            .unwrap();
        assert!(matches!(
            SingleSignOnService::from_xml(&slo.to_xml()),
            Err(SamlError::WrongElement { .. })
        ));
    }

    #[test]
    fn missing_location_is_missing_attribute() {
        let err = SingleSignOnService::from_xml_str(
            r#"<md:SingleSignOnService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="urn:b"/>"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SamlError::missing_attribute("SingleSignOnService", "Location")
        );
    }

    #[test]
    fn indexed_endpoint_keeps_absent_default() {
        let acs = AssertionConsumerService::from_xml_str(
            r#"<md:AssertionConsumerService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:x="urn:x" Binding="urn:b" Location="https://sp/acs" index="3" x:hint="h"/>"#,
        )
        .unwrap();
        assert_eq!(acs.index(), 3);
        assert_eq!(acs.is_default(), None);
        assert_eq!(acs.endpoint().extended_attributes().get("urn:x", "hint"), Some("h"));

        let text = acs.to_xml_string().unwrap();
        assert!(!text.contains("isDefault"));
        assert_eq!(AssertionConsumerService::from_xml_str(&text).unwrap(), acs);
    }

    #[test]
    fn index_must_fit_unsigned_short() {
        let err = AssertionConsumerService::from_xml_str(
            r#"<md:AssertionConsumerService xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" Binding="urn:b" Location="https://sp/acs" index="70000"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, SamlError::InvalidValue(_)));
    }

    #[test]
    fn default_endpoint_selection() {
        let acs = |index, default| {
            AssertionConsumerService::new(
                Endpoint::new(POST, format!("https://sp/acs/{index}"), None).unwrap(),
                index,
                default,
            )
        };
        let endpoints = vec![acs(0, Some(false)), acs(1, None), acs(2, Some(true))];
        assert_eq!(default_endpoint(&endpoints).map(IndexedEndpoint::index), Some(2));
        assert_eq!(default_endpoint(&endpoints[..2]).map(IndexedEndpoint::index), Some(1));
        assert_eq!(default_endpoint(&endpoints[..1]).map(IndexedEndpoint::index), Some(0));
    }

    proptest! {
        #[test]
        fn indexed_endpoint_round_trip(
            index in any::<u16>(),
            default in proptest::option::of(any::<bool>()),
            location in "https://[a-z]{1,12}\\.example/[a-z0-9/]{0,16}",
        ) {
            let endpoint = ArtifactResolutionService::new(
                Endpoint::new(POST, location, None).unwrap(),
                index,
                default,
            );
            let text = endpoint.to_xml_string().unwrap();
            prop_assert_eq!(ArtifactResolutionService::from_xml_str(&text).unwrap(), endpoint);
        }
    }
}
