//! Assertion transformation pipeline.
//!
//! A transformer turns one [`Assertion`] into another. Transformers that
//! need to know about the issuing identity provider read it from the
//! [`TransformContext`]; running them without one is a
//! [`SamlError::Configuration`] rather than a content error, so callers can
//! tell wiring mistakes apart from bad input.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kc_saml_model::transform::{
//!     DecodeBase64Transformer, IdentityProviderConfig, TransformContext, TransformerChain,
//! };
//!
//! let chain = TransformerChain::new().with(DecodeBase64Transformer::new());
//! let context = TransformContext::new().with_identity_provider(Arc::new(
//!     IdentityProviderConfig::new("https://idp.example.org").with_base64_attributes(true),
//! ));
//! let assertion = chain.transform(assertion, &context)?;
//! ```

mod decode_base64;
mod identity_provider;

use std::fmt;
use std::sync::Arc;

pub use decode_base64::DecodeBase64Transformer;
pub use identity_provider::{IdentityProvider, IdentityProviderConfig};

use crate::assertion::Assertion;
use crate::error::{SamlError, SamlResult};

/// One step of assertion processing.
pub trait AssertionTransformer: Send + Sync {
    /// Returns a short name used in logs.
    fn name(&self) -> &'static str;

    /// Transforms `assertion`, consuming it.
    fn transform(&self, assertion: Assertion, context: &TransformContext) -> SamlResult<Assertion>;
}

/// Capabilities made available to transformers.
#[derive(Clone, Default)]
pub struct TransformContext {
    identity_provider: Option<Arc<dyn IdentityProvider>>,
}

impl TransformContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies the identity provider.
    #[must_use]
    pub fn with_identity_provider(mut self, idp: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(idp);
        self
    }

    /// Returns the identity provider, or a configuration error if none was
    /// supplied.
    pub fn identity_provider(&self) -> SamlResult<&dyn IdentityProvider> {
        self.identity_provider.as_deref().ok_or_else(|| {
            SamlError::Configuration("no identity provider configured for transformation".into())
        })
    }
}

impl fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field(
                "identity_provider",
                &self.identity_provider.as_ref().map(|idp| idp.entity_id()),
            )
            .finish()
    }
}

/// Ordered transformers applied one after another.
///
/// The first failing stage aborts the chain with its error. A chain is a
/// transformer itself and can be nested.
#[derive(Default)]
pub struct TransformerChain {
    stages: Vec<Box<dyn AssertionTransformer>>,
}

impl TransformerChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn with(mut self, stage: impl AssertionTransformer + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}

impl fmt::Debug for TransformerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl AssertionTransformer for TransformerChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn transform(&self, assertion: Assertion, context: &TransformContext) -> SamlResult<Assertion> {
        self.stages
            .iter()
            .enumerate()
            .try_fold(assertion, |assertion, (index, stage)| {
                tracing::debug!(
                    stage = stage.name(),
                    index,
                    assertion = assertion.id(),
                    "applying assertion transformer"
                );
                stage.transform(assertion, context).map_err(|err| {
                    tracing::debug!(stage = stage.name(), index, error = %err, "transformer failed");
                    err
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::assertion::{Issuer, NameId, NameIdType, Subject};

    /// Rewrites the assertion ID by appending a suffix.
    struct Suffix(&'static str);

    impl AssertionTransformer for Suffix {
        fn name(&self) -> &'static str {
            "suffix"
        }

        fn transform(&self, assertion: Assertion, _: &TransformContext) -> SamlResult<Assertion> {
            let id = format!("{}{}", assertion.id(), self.0);
            assertion.to_builder().id(id).build()
        }
    }

    struct Reject;

    impl AssertionTransformer for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn transform(&self, _: Assertion, _: &TransformContext) -> SamlResult<Assertion> {
            Err(SamlError::InvalidAssertion("rejected".to_string()))
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl AssertionTransformer for Count {
        fn name(&self) -> &'static str {
            "count"
        }

        fn transform(&self, assertion: Assertion, _: &TransformContext) -> SamlResult<Assertion> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(assertion)
        }
    }

    fn assertion() -> Assertion {
        Assertion::builder(Issuer::entity("https://idp").unwrap())
            .id("_a")
            .subject(Subject::from_name_id(NameId::new(
                NameIdType::new("bob").unwrap(),
            )))
            .build()
            .unwrap()
    }

    #[test]
    fn stages_run_in_order() {
        let chain = TransformerChain::new().with(Suffix("1")).with(Suffix("2"));
        let out = chain.transform(assertion(), &TransformContext::new()).unwrap();
        assert_eq!(out.id(), "_a12");
    }

    #[test]
    fn first_failure_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = TransformerChain::new()
            .with(Count(Arc::clone(&calls)))
            .with(Reject)
            .with(Count(Arc::clone(&calls)));
        let err = chain
            .transform(assertion(), &TransformContext::new())
            .unwrap_err();
        assert_eq!(err, SamlError::InvalidAssertion("rejected".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = TransformerChain::new();
        assert!(chain.is_empty());
        let input = assertion();
        assert_eq!(
            chain.transform(input.clone(), &TransformContext::new()).unwrap(),
            input
        );
    }

    #[test]
    fn chains_nest() {
        let inner = TransformerChain::new().with(Suffix("x"));
        let outer = TransformerChain::new().with(inner).with(Suffix("y"));
        assert_eq!(outer.stage_names(), ["chain", "suffix"]);
        let out = outer.transform(assertion(), &TransformContext::new()).unwrap();
        assert_eq!(out.id(), "_axy");
    }

    #[test]
    fn missing_identity_provider_is_reported() {
        let err = TransformContext::new().identity_provider().err().unwrap();
        assert!(err.is_configuration_error());
        let context = TransformContext::new()
            .with_identity_provider(Arc::new(IdentityProviderConfig::new("https://idp")));
        assert_eq!(context.identity_provider().unwrap().entity_id(), "https://idp");
        assert!(format!("{context:?}").contains("https://idp"));
    }
}
