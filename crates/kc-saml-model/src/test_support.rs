//! Helpers shared by unit tests.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::error::{SamlError, SamlResult};
use crate::signature::{SignatureAlgorithm, Signer, Verifier};

#[derive(Clone, Default)]
struct WarningCapture(Arc<Mutex<Vec<String>>>);

struct FieldVisitor(String);

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.push_str(&format!("{}={value:?} ", field.name()));
    }
}

impl<S: tracing::Subscriber> Layer<S> for WarningCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            let mut visitor = FieldVisitor(String::new());
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.0);
        }
    }
}

/// Runs `f` and returns the formatted fields of every warning it logged.
pub(crate) fn capture_warnings(f: impl FnOnce()) -> Vec<String> {
    let capture = WarningCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    let warnings = capture.0.lock().unwrap().clone();
    warnings
}

/// Keyed "signature": the key followed by the signed bytes reversed.
pub(crate) struct ReversingSigner {
    pub key: Vec<u8>,
}

impl ReversingSigner {
    pub(crate) fn expected(&self, data: &[u8]) -> Vec<u8> {
        let mut out = self.key.clone();
        out.extend(data.iter().rev());
        out
    }
}

impl Signer for ReversingSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::RsaSha256
    }

    fn sign(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        Ok(self.expected(data))
    }
}

impl Verifier for ReversingSigner {
    fn verify(&self, data: &[u8], signature: &[u8], _algorithm: &str) -> SamlResult<bool> {
        Ok(self.expected(data) == signature)
    }
}

/// Signer whose backend always fails.
pub(crate) struct FailingSigner;

impl Signer for FailingSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::EcdsaSha384
    }

    fn sign(&self, _data: &[u8]) -> SamlResult<Vec<u8>> {
        Err(SamlError::SignatureCreation("key unavailable".to_string()))
    }
}
