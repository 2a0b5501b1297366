//! `md:EntityDescriptor` and `md:EntitiesDescriptor`.

use chrono::{DateTime, Utc};

use crate::codec::{
    normalize_datetime, optional_attribute, optional_datetime, required_attribute, set_optional,
    set_optional_datetime, validate_entity_id,
};
use crate::constants::{MD_NS, MD_PREFIX};
use crate::element::{
    ensure_element, new_element, optional_child, optional_opaque_child, opaque_children,
    SamlElement,
};
use crate::error::{SamlError, SamlResult};
use crate::extensible::ExtendedAttributes;
use crate::signature::{read_signature, write_signature, SignableElement, Signature};
use crate::xml::XmlElement;

use super::descriptor::{IdpSsoDescriptor, SpSsoDescriptor};
use super::extensions::Extensions;

const ENTITY_ATTRIBUTES: [&str; 4] = ["entityID", "ID", "validUntil", "cacheDuration"];

const OTHER_ROLES: [&str; 5] = [
    "RoleDescriptor",
    "AuthnAuthorityDescriptor",
    "AttributeAuthorityDescriptor",
    "PDPDescriptor",
    "AffiliationDescriptor",
];

/// One role an entity plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRole {
    /// `md:IDPSSODescriptor`.
    Idp(IdpSsoDescriptor),
    /// `md:SPSSODescriptor`.
    Sp(SpSsoDescriptor),
    /// Any other role or an `md:AffiliationDescriptor`, carried verbatim.
    Other(XmlElement),
}

impl EntityRole {
    fn is_role(element: &XmlElement) -> bool {
        IdpSsoDescriptor::matches(element)
            || SpSsoDescriptor::matches(element)
            || OTHER_ROLES.iter().any(|local| element.is(MD_NS, local))
    }

    fn read(element: &XmlElement) -> SamlResult<Self> {
        if IdpSsoDescriptor::matches(element) {
            IdpSsoDescriptor::from_xml(element).map(Self::Idp)
        } else if SpSsoDescriptor::matches(element) {
            SpSsoDescriptor::from_xml(element).map(Self::Sp)
        } else {
            Ok(Self::Other(element.clone()))
        }
    }

    fn to_xml(&self) -> XmlElement {
        match self {
            Self::Idp(idp) => idp.to_xml(),
            Self::Sp(sp) => sp.to_xml(),
            Self::Other(element) => element.clone(),
        }
    }
}

/// Metadata describing one SAML entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    entity_id: String,
    id: Option<String>,
    valid_until: Option<DateTime<Utc>>,
    cache_duration: Option<String>,
    extended_attributes: ExtendedAttributes,
    signature: Option<Signature>,
    extensions: Option<Extensions>,
    roles: Vec<EntityRole>,
    organization: Option<XmlElement>,
    contact_persons: Vec<XmlElement>,
    additional_metadata_locations: Vec<XmlElement>,
}

impl EntityDescriptor {
    /// Creates a descriptor for `entity_id` playing `roles`.
    pub fn new(entity_id: impl Into<String>, roles: Vec<EntityRole>) -> SamlResult<Self> {
        let entity_id = entity_id.into();
        validate_entity_id(&entity_id)?;
        if roles.is_empty() {
            return Err(SamlError::MissingElement(
                "EntityDescriptor must contain at least one role descriptor".to_string(),
            ));
        }
        Ok(Self {
            entity_id,
            id: None,
            valid_until: None,
            cache_duration: None,
            extended_attributes: ExtendedAttributes::new(),
            signature: None,
            extensions: None,
            roles,
            organization: None,
            contact_persons: Vec::new(),
            additional_metadata_locations: Vec::new(),
        })
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

    /// Sets `cacheDuration`.
    #[must_use]
    pub fn with_cache_duration(mut self, duration: impl Into<String>) -> Self {
        self.cache_duration = Some(duration.into());
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

    /// Sets `md:Organization`.
    #[must_use]
    pub fn with_organization(mut self, organization: XmlElement) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Appends an `md:ContactPerson`.
    #[must_use]
    pub fn with_contact_person(mut self, contact: XmlElement) -> Self {
        self.contact_persons.push(contact);
        self
    }

    /// Appends an `md:AdditionalMetadataLocation`.
    #[must_use]
    pub fn with_additional_metadata_location(mut self, location: XmlElement) -> Self {
        self.additional_metadata_locations.push(location);
        self
    }

    /// Returns `entityID`.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
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

    /// Returns the foreign attributes.
    #[must_use]
    pub const fn extended_attributes(&self) -> &ExtendedAttributes {
        &self.extended_attributes
    }

    /// Returns `md:Extensions`.
    #[must_use]
    pub const fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// Returns the roles in document order.
    #[must_use]
    pub fn roles(&self) -> &[EntityRole] {
        &self.roles
    }

    /// Returns the first IdP role.
    #[must_use]
    pub fn idp_descriptor(&self) -> Option<&IdpSsoDescriptor> {
        self.roles.iter().find_map(|role| match role {
            EntityRole::Idp(idp) => Some(idp),
            _ => None,
        })
    }

    /// Returns the first SP role.
    #[must_use]
    pub fn sp_descriptor(&self) -> Option<&SpSsoDescriptor> {
        self.roles.iter().find_map(|role| match role {
            EntityRole::Sp(sp) => Some(sp),
            _ => None,
        })
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

    /// Returns the `md:AdditionalMetadataLocation` elements.
    #[must_use]
    pub fn additional_metadata_locations(&self) -> &[XmlElement] {
        &self.additional_metadata_locations
    }
}

impl SamlElement for EntityDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = "EntityDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let roles = element
            .child_elements()
            .filter(|child| EntityRole::is_role(child))
            .map(EntityRole::read)
            .collect::<SamlResult<Vec<_>>>()?;
        Ok(Self {
            id: optional_attribute(element, "ID"),
            valid_until: optional_datetime(element, "validUntil")?,
            cache_duration: optional_attribute(element, "cacheDuration"),
            extended_attributes: ExtendedAttributes::from_element(element, &ENTITY_ATTRIBUTES),
            signature: read_signature(element)?,
            extensions: optional_child(element)?,
            organization: optional_opaque_child(element, MD_NS, "Organization")?,
            contact_persons: opaque_children(element, MD_NS, "ContactPerson"),
            additional_metadata_locations: opaque_children(
                element,
                MD_NS,
                "AdditionalMetadataLocation",
            ),
            ..Self::new(required_attribute(element, "entityID")?, roles)?
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        element.set_attribute("entityID", self.entity_id.as_str());
        set_optional(&mut element, "ID", self.id());
        set_optional_datetime(&mut element, "validUntil", self.valid_until.as_ref());
        set_optional(&mut element, "cacheDuration", self.cache_duration());
        self.extended_attributes.write_to(&mut element);
        if let Some(extensions) = &self.extensions {
            extensions.append_to(&mut element);
        }
        for role in &self.roles {
            element.append_child(role.to_xml());
        }
        if let Some(organization) = &self.organization {
            element.append_child(organization.clone());
        }
        for child in self
            .contact_persons
            .iter()
            .chain(&self.additional_metadata_locations)
        {
            element.append_child(child.clone());
        }
        write_signature(&mut element, self.signature.as_ref());
        element
    }
}

impl SignableElement for EntityDescriptor {
    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn with_signature(&self, signature: Option<Signature>) -> Self {
        Self {
            signature,
            ..self.clone()
        }
    }

    fn signature_reference(&self) -> Option<&str> {
        self.id()
    }
}

// ============================================================================
// Entity groups
// ============================================================================

/// A member of an `md:EntitiesDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitiesMember {
    /// A single entity.
    Entity(EntityDescriptor),
    /// A nested group.
    Group(EntitiesDescriptor),
}

/// A group of entities, typically a federation metadata aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitiesDescriptor {
    name: Option<String>,
    id: Option<String>,
    valid_until: Option<DateTime<Utc>>,
    cache_duration: Option<String>,
    signature: Option<Signature>,
    extensions: Option<Extensions>,
    members: Vec<EntitiesMember>,
}

impl EntitiesDescriptor {
    /// Creates a group; at least one member is required.
    pub fn new(members: Vec<EntitiesMember>) -> SamlResult<Self> {
        if members.is_empty() {
            return Err(SamlError::MissingElement(
                "EntitiesDescriptor must contain at least one EntityDescriptor or \
                 EntitiesDescriptor element"
                    .to_string(),
            ));
        }
        Ok(Self {
            name: None,
            id: None,
            valid_until: None,
            cache_duration: None,
            signature: None,
            extensions: None,
            members,
        })
    }

    /// Sets `Name`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
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

    /// Sets `cacheDuration`.
    #[must_use]
    pub fn with_cache_duration(mut self, duration: impl Into<String>) -> Self {
        self.cache_duration = Some(duration.into());
        self
    }

    /// Sets `md:Extensions`.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Returns `Name`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
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

    /// Returns `md:Extensions`.
    #[must_use]
    pub const fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    /// Returns the direct members in document order.
    #[must_use]
    pub fn members(&self) -> &[EntitiesMember] {
        &self.members
    }

    /// Collects every entity in this group and its nested groups, in
    /// document order.
    #[must_use]
    pub fn entities(&self) -> Vec<&EntityDescriptor> {
        let mut out = Vec::new();
        self.collect_entities(&mut out);
        out
    }

    fn collect_entities<'a>(&'a self, out: &mut Vec<&'a EntityDescriptor>) {
        for member in &self.members {
            match member {
                EntitiesMember::Entity(entity) => out.push(entity),
                EntitiesMember::Group(group) => group.collect_entities(out),
            }
        }
    }

    /// Finds an entity by `entityID` anywhere in the group.
    #[must_use]
    pub fn find_entity(&self, entity_id: &str) -> Option<&EntityDescriptor> {
        self.entities()
            .into_iter()
            .find(|entity| entity.entity_id() == entity_id)
    }
}

impl SamlElement for EntitiesDescriptor {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = "EntitiesDescriptor";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let mut members = Vec::new();
        for child in element.child_elements() {
            if EntityDescriptor::matches(child) {
                members.push(EntitiesMember::Entity(EntityDescriptor::from_xml(child)?));
            } else if Self::matches(child) {
                members.push(EntitiesMember::Group(Self::from_xml(child)?));
            }
        }
        Ok(Self {
            name: optional_attribute(element, "Name"),
            id: optional_attribute(element, "ID"),
            valid_until: optional_datetime(element, "validUntil")?,
            cache_duration: optional_attribute(element, "cacheDuration"),
            signature: read_signature(element)?,
            extensions: optional_child(element)?,
            ..Self::new(members)?
        })
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        set_optional(&mut element, "Name", self.name());
        set_optional(&mut element, "ID", self.id());
        set_optional_datetime(&mut element, "validUntil", self.valid_until.as_ref());
        set_optional(&mut element, "cacheDuration", self.cache_duration());
        if let Some(extensions) = &self.extensions {
            extensions.append_to(&mut element);
        }
        for member in &self.members {
            match member {
                EntitiesMember::Entity(entity) => entity.append_to(&mut element),
                EntitiesMember::Group(group) => group.append_to(&mut element),
            }
        }
        write_signature(&mut element, self.signature.as_ref());
        element
    }
}

impl SignableElement for EntitiesDescriptor {
    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn with_signature(&self, signature: Option<Signature>) -> Self {
        Self {
            signature,
            ..self.clone()
        }
    }

    fn signature_reference(&self) -> Option<&str> {
        self.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{SamlBinding, ENTITY_ID_MAX_LENGTH, XMLDSIG_NS};
    use crate::metadata::{
        Endpoint, IdpSsoDescriptor, RoleDescriptor, SingleSignOnService, SsoDescriptor,
    };
    use crate::test_support::ReversingSigner;

    fn idp_entity(entity_id: &str) -> EntityDescriptor {
        let sso = SingleSignOnService::with_binding(SamlBinding::HttpRedirect, "https://idp/sso")
            .unwrap();
        let idp = IdpSsoDescriptor::new(SsoDescriptor::new(RoleDescriptor::saml20()), vec![sso])
            .unwrap();
        EntityDescriptor::new(entity_id, vec![EntityRole::Idp(idp)]).unwrap()
    }

    #[test]
    fn parses_entity_with_foreign_role() {
        let entity = EntityDescriptor::from_xml_str(
            r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="https://idp.example.org" ID="e1" validUntil="2030-01-01T00:00:00.5Z" cacheDuration="PT1H">
  <md:AttributeAuthorityDescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"/>
  <md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp/sso"/>
  </md:IDPSSODescriptor>
  <md:Organization><md:OrganizationName xml:lang="en">Example</md:OrganizationName></md:Organization>
  <md:ContactPerson contactType="technical"><md:EmailAddress>ops@example.org</md:EmailAddress></md:ContactPerson>
</md:EntityDescriptor>"#,
        )
        .unwrap();

        assert_eq!(entity.entity_id(), "https://idp.example.org");
        assert_eq!(entity.cache_duration(), Some("PT1H"));
        assert_eq!(entity.roles().len(), 2);
        assert!(matches!(
            &entity.roles()[0],
            EntityRole::Other(e) if e.local_name() == "AttributeAuthorityDescriptor"
        ));
        assert!(entity.idp_descriptor().is_some());
        assert!(entity.sp_descriptor().is_none());
        assert_eq!(entity.contact_persons().len(), 1);

        let text = entity.to_xml_string().unwrap();
        assert!(text.contains(r#"validUntil="2030-01-01T00:00:00Z""#));
        assert_eq!(EntityDescriptor::from_xml_str(&text).unwrap(), entity);
    }

    #[test]
    fn entity_needs_a_role() {
        let err = EntityDescriptor::from_xml_str(
            r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="https://idp"/>"#,
        )
        .unwrap_err();
        assert!(matches!(err, SamlError::MissingElement(_)));
    }

    #[test]
    fn entity_id_is_checked() {
        let long = "x".repeat(ENTITY_ID_MAX_LENGTH + 1);
        let roles = idp_entity("https://idp").roles().to_vec();
        assert!(matches!(
            EntityDescriptor::new(long, roles.clone()),
            Err(SamlError::ConstraintViolation(_))
        ));
        assert!(matches!(
            EntityDescriptor::new("  ", roles),
            Err(SamlError::ConstraintViolation(_))
        ));
        let err = EntityDescriptor::from_xml_str(
            r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata"><md:AffiliationDescriptor affiliationOwnerID="o"/></md:EntityDescriptor>"#,
        )
        .unwrap_err();
        assert_eq!(err, SamlError::missing_attribute("EntityDescriptor", "entityID"));
    }

    #[test]
    fn nested_groups_keep_document_order() {
        let inner = EntitiesDescriptor::new(vec![
            EntitiesMember::Entity(idp_entity("https://b")),
            EntitiesMember::Entity(idp_entity("https://c")),
        ])
        .unwrap()
        .with_name("inner");
        let outer = EntitiesDescriptor::new(vec![
            EntitiesMember::Entity(idp_entity("https://a")),
            EntitiesMember::Group(inner),
            EntitiesMember::Entity(idp_entity("https://d")),
        ])
        .unwrap()
        .with_name("federation");

        let text = outer.to_xml_string().unwrap();
        let parsed = EntitiesDescriptor::from_xml_str(&text).unwrap();
        assert_eq!(parsed, outer);
        let ids: Vec<&str> = parsed.entities().iter().map(|e| e.entity_id()).collect();
        assert_eq!(ids, ["https://a", "https://b", "https://c", "https://d"]);
        assert!(parsed.find_entity("https://c").is_some());
        assert!(parsed.find_entity("https://z").is_none());
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(matches!(
            EntitiesDescriptor::new(Vec::new()),
            Err(SamlError::MissingElement(_))
        ));
    }

    #[test]
    fn signed_entity_round_trips_and_verifies() {
        let signer = ReversingSigner { key: b"md".to_vec() };
        let signed = idp_entity("https://idp").with_id("_md1").sign(&signer).unwrap();
        let text = signed.to_xml_string().unwrap();

        let parsed = EntityDescriptor::from_xml_str(&text).unwrap();
        assert_eq!(parsed, signed);
        assert!(parsed
            .to_xml()
            .first_child_element()
            .is_some_and(|child| child.is(XMLDSIG_NS, "Signature")));
        assert!(parsed.verify(&signer).unwrap());

        let tampered =
            EntityDescriptor::from_xml_str(&text.replace("https://idp/sso", "https://evil/sso"))
                .unwrap();
        assert!(!tampered.verify(&signer).unwrap());
    }

    #[test]
    fn two_signatures_are_rejected() {
        let signer = ReversingSigner { key: b"md".to_vec() };
        let signed = idp_entity("https://idp").sign(&signer).unwrap();
        let mut element = signed.to_xml();
        if let Some(signature) = signed.signature() {
            element.append_child(signature.to_xml());
        }
        assert_eq!(
            EntityDescriptor::from_xml(&element).unwrap_err(),
            SamlError::too_many("EntityDescriptor", "Signature")
        );
    }
}
