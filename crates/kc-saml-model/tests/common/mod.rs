//! Common test fixtures shared by the integration tests.

#![allow(dead_code)]

use kc_saml_model::signature::{SignatureAlgorithm, Signer, Verifier};
use kc_saml_model::SamlResult;

/// Identity provider metadata exercising most of the metadata model.
pub const IDP_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:alg="urn:oasis:names:tc:SAML:metadata:algsupport" xmlns:shibmd="urn:mace:shibboleth:metadata:1.0" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:fed="urn:example:federation" entityID="https://idp.example.org/realms/test" ID="_meta1" fed:registrationAuthority="https://federation.example" fed:tier="gold">
  <md:Extensions>
    <alg:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
    <alg:SigningMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" MinKeySize="2048"/>
  </md:Extensions>
  <md:IDPSSODescriptor WantAuthnRequestsSigned="true" protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
    <md:Extensions>
      <shibmd:Scope regexp="false">example.org</shibmd:Scope>
    </md:Extensions>
    <md:KeyDescriptor use="signing">
      <ds:KeyInfo>
        <ds:X509Data>
          <ds:X509Certificate>
            TUlJQ2VqQ0NB
            V0tnQXdJQkFn
          </ds:X509Certificate>
        </ds:X509Data>
      </ds:KeyInfo>
    </md:KeyDescriptor>
    <md:ArtifactResolutionService Binding="urn:oasis:names:tc:SAML:2.0:bindings:SOAP" Location="https://idp.example.org/artifact" index="0" isDefault="true"/>
    <md:SingleLogoutService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.org/slo" ResponseLocation="https://idp.example.org/slo/done"/>
    <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:persistent</md:NameIDFormat>
    <md:NameIDFormat>urn:oasis:names:tc:SAML:2.0:nameid-format:transient</md:NameIDFormat>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://idp.example.org/sso"/>
    <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="https://idp.example.org/sso"/>
    <saml:Attribute Name="urn:oid:0.9.2342.19200300.100.1.3" NameFormat="urn:oasis:names:tc:SAML:2.0:attrname-format:uri" FriendlyName="mail"/>
  </md:IDPSSODescriptor>
  <md:Organization>
    <md:OrganizationName xml:lang="en">Example</md:OrganizationName>
    <md:OrganizationDisplayName xml:lang="en">Example Org</md:OrganizationDisplayName>
    <md:OrganizationURL xml:lang="en">https://example.org</md:OrganizationURL>
  </md:Organization>
  <md:ContactPerson contactType="technical">
    <md:EmailAddress>mailto:ops@example.org</md:EmailAddress>
  </md:ContactPerson>
</md:EntityDescriptor>"#;

/// Assertion with every statement kind the model understands.
pub const ASSERTION: &str = r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" Version="2.0" ID="_assert1" IssueInstant="2024-05-01T10:00:00.123Z">
  <saml:Issuer>https://idp.example.org/realms/test</saml:Issuer>
  <saml:Subject>
    <saml:NameID Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent">G-803528aa</saml:NameID>
    <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
      <saml:SubjectConfirmationData NotOnOrAfter="2024-05-01T10:05:00Z" Recipient="https://sp.example.org/acs" InResponseTo="_req1" Address="10.0.0.7"/>
    </saml:SubjectConfirmation>
  </saml:Subject>
  <saml:Conditions NotBefore="2024-05-01T09:59:30Z" NotOnOrAfter="2024-05-01T10:05:00Z">
    <saml:AudienceRestriction>
      <saml:Audience>https://sp.example.org</saml:Audience>
    </saml:AudienceRestriction>
    <saml:OneTimeUse/>
  </saml:Conditions>
  <saml:AuthnStatement AuthnInstant="2024-05-01T09:59:58Z" SessionIndex="s-42">
    <saml:AuthnContext>
      <saml:AuthnContextClassRef>urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport</saml:AuthnContextClassRef>
    </saml:AuthnContext>
  </saml:AuthnStatement>
  <saml:AttributeStatement>
    <saml:Attribute Name="groups" NameFormat="urn:oasis:names:tc:SAML:2.0:attrname-format:basic">
      <saml:AttributeValue xsi:type="xs:string">YWRtaW5z_dXNlcnM=</saml:AttributeValue>
    </saml:Attribute>
    <saml:Attribute Name="employeeNumber">
      <saml:AttributeValue xsi:type="xs:integer">1042</saml:AttributeValue>
    </saml:Attribute>
  </saml:AttributeStatement>
</saml:Assertion>"#;

/// Keyed stand-in for a real signature backend: the key followed by the
/// signed bytes in reverse order.
pub struct MirrorSigner {
    key: Vec<u8>,
}

impl MirrorSigner {
    /// Creates a signer with the given key.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
        }
    }

    fn mirror(&self, data: &[u8]) -> Vec<u8> {
        let mut out = self.key.clone();
        out.extend(data.iter().rev());
        out
    }
}

impl Signer for MirrorSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::RsaSha256
    }

    fn sign(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        Ok(self.mirror(data))
    }
}

impl Verifier for MirrorSigner {
    fn verify(&self, data: &[u8], signature: &[u8], _algorithm: &str) -> SamlResult<bool> {
        Ok(self.mirror(data) == signature)
    }
}
