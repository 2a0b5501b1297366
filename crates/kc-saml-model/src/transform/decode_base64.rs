//! Decodes attribute values an IdP sends as underscore-joined base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::assertion::{Assertion, Attribute, AttributeValue, Statement};
use crate::error::{SamlError, SamlResult};

use super::{AssertionTransformer, TransformContext};

/// Replaces every string attribute value `"s1_s2_..."` with one binary value
/// per base64 segment, in segment order.
///
/// Runs only when the identity provider asks for it; otherwise the input
/// assertion is returned as is. Decoding is strict: any character outside
/// the standard alphabet, or non-canonical padding, rejects the assertion.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeBase64Transformer;

impl DecodeBase64Transformer {
    /// Creates the transformer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AssertionTransformer for DecodeBase64Transformer {
    fn name(&self) -> &'static str {
        "decode-base64-attributes"
    }

    fn transform(&self, assertion: Assertion, context: &TransformContext) -> SamlResult<Assertion> {
        let idp = context.identity_provider()?;
        if !idp.requires_base64_decoded_attributes() {
            return Ok(assertion);
        }

        let statements = assertion
            .statements()
            .iter()
            .map(|statement| match statement {
                Statement::Attribute(attributes) => attributes
                    .map_attributes(decode_attribute)
                    .map(Statement::Attribute),
                other => Ok(other.clone()),
            })
            .collect::<SamlResult<Vec<_>>>()?;

        tracing::debug!(
            assertion = assertion.id(),
            idp = idp.entity_id(),
            "decoded base64 attribute values"
        );
        assertion.to_builder().statements(statements).build()
    }
}

fn decode_attribute(attribute: &Attribute) -> SamlResult<Attribute> {
    let mut values = Vec::with_capacity(attribute.values().len());
    for value in attribute.values() {
        match value {
            AttributeValue::String(text) => {
                for segment in text.split('_') {
                    values.push(AttributeValue::Binary(decode_segment(segment)?));
                }
            }
            other => values.push(other.clone()),
        }
    }
    Ok(attribute.clone().with_values(values))
}

fn decode_segment(segment: &str) -> SamlResult<Vec<u8>> {
    STANDARD.decode(segment).map_err(|err| {
        SamlError::InvalidAssertion(format!(
            "attribute value segment '{segment}' is not valid base64: {err}"
        ))
    })
}
