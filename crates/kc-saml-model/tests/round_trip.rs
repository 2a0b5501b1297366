//! Parse/serialize round trips over complete documents.

mod common;

use kc_saml_model::assertion::{Assertion, AttributeValue, Statement};
use kc_saml_model::constants::SamlBinding;
use kc_saml_model::metadata::{
    default_endpoint, EntitiesDescriptor, EntitiesMember, EntityDescriptor, EntityRole,
    IdpSsoDescriptor, KeyDescriptor, KeyUse, RoleDescriptor, Scope, SingleSignOnService,
    SsoDescriptor,
};
use kc_saml_model::{SamlElement, SamlError, SamlResult};
use proptest::prelude::*;

const SAML20_PROTOCOL: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
const FED_NS: &str = "urn:example:federation";

fn idp_entity(entity_id: &str) -> SamlResult<EntityDescriptor> {
    let sso = SingleSignOnService::with_binding(SamlBinding::HttpPost, "https://idp/sso")?;
    let idp = IdpSsoDescriptor::new(SsoDescriptor::new(RoleDescriptor::saml20()), vec![sso])?;
    EntityDescriptor::new(entity_id, vec![EntityRole::Idp(idp)])
}

/// Metadata read from text keeps every part and survives a write/read cycle.
#[test]
fn idp_metadata_round_trips() -> SamlResult<()> {
    let entity = EntityDescriptor::from_xml_str(common::IDP_METADATA)?;

    assert_eq!(entity.entity_id(), "https://idp.example.org/realms/test");
    assert_eq!(entity.id(), Some("_meta1"));
    assert_eq!(entity.extended_attributes().get(FED_NS, "tier"), Some("gold"));
    assert!(entity.organization().is_some());
    assert_eq!(entity.contact_persons().len(), 1);

    let extensions = entity.extensions().ok_or(SamlError::MissingElement(
        "entity extensions".to_string(),
    ))?;
    assert_eq!(extensions.items().len(), 2);
    let signing = extensions.signing_methods().next().map(|m| m.min_key_size());
    assert_eq!(signing, Some(Some(2048)));

    let idp = entity
        .idp_descriptor()
        .ok_or(SamlError::MissingElement("IDPSSODescriptor".to_string()))?;
    assert_eq!(idp.want_authn_requests_signed(), Some(true));
    assert!(idp.role().supports_protocol(SAML20_PROTOCOL));
    assert_eq!(idp.single_sign_on_services().len(), 2);
    assert_eq!(
        idp.single_sign_on_service(SamlBinding::HttpRedirect.uri())
            .map(SingleSignOnService::location),
        Some("https://idp.example.org/sso")
    );
    assert_eq!(idp.sso().name_id_formats().len(), 2);
    assert_eq!(
        idp.sso().single_logout_services()[0].response_location(),
        Some("https://idp.example.org/slo/done")
    );
    let artifact = default_endpoint(idp.sso().artifact_resolution_services())
        .ok_or(SamlError::MissingElement("ArtifactResolutionService".to_string()))?;
    assert_eq!(artifact.index(), 0);
    assert_eq!(idp.attributes()[0].friendly_name(), Some("mail"));
    assert_eq!(idp.role().certificates(KeyUse::Signing).count(), 1);
    assert_eq!(idp.role().certificates(KeyUse::Encryption).count(), 0);
    let scopes: Vec<&str> = idp
        .role()
        .extensions()
        .into_iter()
        .flat_map(|e| e.scopes())
        .map(Scope::value)
        .collect();
    assert_eq!(scopes, ["example.org"]);

    let written = entity.to_xml_string()?;
    assert_eq!(EntityDescriptor::from_xml_str(&written)?, entity);
    Ok(())
}

/// Foreign attributes are written after the element's own attributes, in
/// the order they were read.
#[test]
fn extended_attributes_keep_document_order() -> SamlResult<()> {
    let entity = EntityDescriptor::from_xml_str(common::IDP_METADATA)?;
    let written = entity.to_xml_string()?;

    assert!(written.contains(&format!("xmlns:fed=\"{FED_NS}\"")));
    assert!(written.contains(
        r#"ID="_meta1" fed:registrationAuthority="https://federation.example" fed:tier="gold""#
    ));
    Ok(())
}

/// A sign-on service may not carry a response location.
#[test]
fn single_sign_on_response_location_is_rejected() {
    let xml = common::IDP_METADATA.replace(
        r#"Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.org/sso""#,
        r#"Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.org/sso" ResponseLocation="https://idp.example.org/back""#,
    );
    assert_ne!(xml, common::IDP_METADATA);

    match EntityDescriptor::from_xml_str(&xml) {
        Err(SamlError::ConstraintViolation(message)) => {
            assert!(message.contains("ResponseLocation"), "{message}");
        }
        other => panic!("expected a constraint violation, got {other:?}"),
    }
}

/// An IdP descriptor without any sign-on service does not parse.
#[test]
fn idp_without_sign_on_service_is_rejected() {
    let xml = common::IDP_METADATA
        .lines()
        .filter(|line| !line.contains("SingleSignOnService"))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(matches!(
        EntityDescriptor::from_xml_str(&xml),
        Err(SamlError::MissingElement(_))
    ));
}

/// Scope always states whether it is a regular expression.
#[test]
fn scope_writes_regexp_flag() -> SamlResult<()> {
    assert_eq!(
        Scope::new("example.org", false)?.to_xml_string()?,
        r#"<shibmd:Scope xmlns:shibmd="urn:mace:shibboleth:metadata:1.0" regexp="false">example.org</shibmd:Scope>"#
    );
    let pattern = Scope::new("^.*\\.example\\.org$", true)?;
    assert!(pattern.to_xml_string()?.contains(r#"regexp="true""#));
    assert_eq!(Scope::from_xml_str(&pattern.to_xml_string()?)?, pattern);
    Ok(())
}

/// Nested groups flatten to their entities in document order.
#[test]
fn entities_group_round_trips() -> SamlResult<()> {
    let inner = EntitiesDescriptor::new(vec![
        EntitiesMember::Entity(idp_entity("https://b.example")?),
        EntitiesMember::Entity(idp_entity("https://c.example")?),
    ])?
    .with_name("inner");
    let group = EntitiesDescriptor::new(vec![
        EntitiesMember::Entity(idp_entity("https://a.example")?),
        EntitiesMember::Group(inner),
        EntitiesMember::Entity(idp_entity("https://d.example")?),
    ])?
    .with_name("federation")
    .with_id("_fed");

    let parsed = EntitiesDescriptor::from_xml_str(&group.to_xml_string()?)?;
    assert_eq!(parsed, group);
    let ids: Vec<&str> = parsed
        .entities()
        .into_iter()
        .map(EntityDescriptor::entity_id)
        .collect();
    assert_eq!(
        ids,
        [
            "https://a.example",
            "https://b.example",
            "https://c.example",
            "https://d.example"
        ]
    );
    assert!(parsed.find_entity("https://c.example").is_some());
    assert!(parsed.find_entity("https://z.example").is_none());
    Ok(())
}

/// Built metadata carrying a signing key round-trips through text.
#[test]
fn built_metadata_round_trips() -> SamlResult<()> {
    let role = RoleDescriptor::saml20()
        .with_id("_role")
        .with_cache_duration("PT1H")
        .with_key_descriptor(KeyDescriptor::signing_certificate("TUlJQw==")?);
    let sso = SingleSignOnService::with_binding(SamlBinding::HttpRedirect, "https://idp/sso")?;
    let idp = IdpSsoDescriptor::new(SsoDescriptor::new(role), vec![sso])?
        .with_want_authn_requests_signed(false);
    let entity = EntityDescriptor::new("https://idp.example", vec![EntityRole::Idp(idp)])?;

    let parsed = EntityDescriptor::from_xml_str(&entity.to_xml_string()?)?;
    assert_eq!(parsed, entity);
    let certificates: Vec<&str> = parsed
        .idp_descriptor()
        .into_iter()
        .flat_map(|idp| idp.role().certificates(KeyUse::Signing))
        .collect();
    assert_eq!(certificates, ["TUlJQw=="]);
    Ok(())
}

/// An assertion keeps its subject, conditions and typed attribute values.
#[test]
fn assertion_round_trips() -> SamlResult<()> {
    let assertion = Assertion::from_xml_str(common::ASSERTION)?;

    assert_eq!(assertion.id(), "_assert1");
    assert_eq!(assertion.issuer().value(), "https://idp.example.org/realms/test");
    let subject = assertion
        .subject()
        .ok_or(SamlError::MissingElement("Subject".to_string()))?;
    assert_eq!(subject.name_id().map(|n| n.value()), Some("G-803528aa"));
    let data = subject.confirmations()[0].data();
    assert_eq!(data.and_then(|d| d.address()), Some("10.0.0.7"));
    assert_eq!(data.and_then(|d| d.in_response_to()), Some("_req1"));

    let conditions = assertion
        .conditions()
        .ok_or(SamlError::MissingElement("Conditions".to_string()))?;
    assert!(conditions.is_one_time_use());
    let audiences: Vec<&String> = conditions
        .audience_restrictions()
        .flat_map(|r| r.audiences())
        .collect();
    assert_eq!(audiences, ["https://sp.example.org"]);

    let session = assertion.authn_statements().next().and_then(|s| s.session_index());
    assert_eq!(session, Some("s-42"));
    let employee = assertion
        .attribute_statements()
        .find_map(|s| s.attribute("employeeNumber"))
        .map(|a| a.values().to_vec());
    assert_eq!(employee, Some(vec![AttributeValue::Integer(1042)]));

    let written = assertion.to_xml_string()?;
    assert_eq!(Assertion::from_xml_str(&written)?, assertion);
    Ok(())
}

/// A custom statement typed with a prefix declared only on the assertion
/// keeps that declaration when written on its own terms.
#[test]
fn custom_statement_keeps_type_namespace() -> SamlResult<()> {
    let xml = common::ASSERTION
        .replacen(
            "<saml:Assertion ",
            r#"<saml:Assertion xmlns:ext="urn:example:ext" "#,
            1,
        )
        .replace(
            "  <saml:AttributeStatement>",
            "  <saml:Statement xsi:type=\"ext:Custom\"/>\n  <saml:AttributeStatement>",
        );
    let assertion = Assertion::from_xml_str(&xml)?;
    assert!(matches!(assertion.statements()[1], Statement::Other(_)));

    let written = assertion.to_xml_string()?;
    assert!(written.contains(r#"xmlns:ext="urn:example:ext""#), "{written}");
    let reparsed = Assertion::from_xml_str(&written)?;
    assert_eq!(reparsed, assertion);
    assert_eq!(reparsed.to_xml_string()?, written);
    Ok(())
}

/// Attribute values keep whitespace-only text.
#[test]
fn blank_attribute_value_round_trips() -> SamlResult<()> {
    let xml = common::ASSERTION.replace("YWRtaW5z_dXNlcnM=", "   ");
    let assertion = Assertion::from_xml_str(&xml)?;
    let groups = assertion
        .attribute_statements()
        .find_map(|s| s.attribute("groups"))
        .map(|a| a.values().to_vec());
    assert_eq!(groups, Some(vec![AttributeValue::String("   ".to_string())]));

    let reparsed = Assertion::from_xml_str(&assertion.to_xml_string()?)?;
    assert_eq!(reparsed, assertion);
    Ok(())
}

/// An element of the wrong kind is reported rather than misread.
#[test]
fn wrong_root_element_is_rejected() {
    assert!(EntityDescriptor::from_xml_str(common::ASSERTION).is_err());
    assert!(Assertion::from_xml_str(common::IDP_METADATA).is_err());
}

proptest! {
    /// Any non-blank scope value survives a write/read cycle trimmed.
    #[test]
    fn scope_values_round_trip(value in "[a-z]{1,12}(\\.[a-z]{2,6}){0,3}", regexp in any::<bool>()) {
        let scope = Scope::new(format!("  {value} "), regexp).unwrap();
        prop_assert_eq!(scope.value(), value.as_str());
        let parsed = Scope::from_xml_str(&scope.to_xml_string().unwrap()).unwrap();
        prop_assert_eq!(parsed, scope);
    }

    /// Entity IDs of any reasonable length survive a write/read cycle.
    #[test]
    fn entity_ids_round_trip(host in "[a-z]{1,20}", path in "[a-zA-Z0-9/_-]{0,40}") {
        let entity_id = format!("https://{host}.example/{path}");
        let entity = idp_entity(&entity_id).unwrap();
        let parsed = EntityDescriptor::from_xml_str(&entity.to_xml_string().unwrap()).unwrap();
        prop_assert_eq!(parsed.entity_id(), entity_id.as_str());
        prop_assert_eq!(parsed, entity);
    }
}
