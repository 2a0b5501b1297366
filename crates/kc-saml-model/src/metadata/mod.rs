//! SAML 2.0 metadata elements.
//!
//! Metadata describes an entity's roles, endpoints and keys. The top-level
//! documents ([`EntityDescriptor`], [`EntitiesDescriptor`]) and both SSO role
//! descriptors are signable.

mod descriptor;
mod endpoint;
mod entity;
mod extensions;
mod key_descriptor;

pub use descriptor::{IdpSsoDescriptor, RoleDescriptor, SpSsoDescriptor, SsoDescriptor};
pub use endpoint::{
    default_endpoint, ArtifactResolution, ArtifactResolutionService, AssertionConsumer,
    AssertionConsumerService, AssertionIdRequest, AssertionIdRequestService, Endpoint,
    EndpointKind, IndexedEndpoint, ManageNameId, ManageNameIdService, NameIdMapping,
    NameIdMappingService, SingleLogout, SingleLogoutService, SingleSignOn, SingleSignOnService,
};
pub use entity::{EntitiesDescriptor, EntitiesMember, EntityDescriptor, EntityRole};
pub use extensions::{DigestMethod, ExtensionItem, Extensions, Scope, SigningMethod};
pub use key_descriptor::{EncryptionMethod, KeyDescriptor, KeyUse};
