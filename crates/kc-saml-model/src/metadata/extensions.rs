//! `md:Extensions` and the extension elements this crate understands:
//! algorithm support hints and Shibboleth scopes.

use crate::codec::{
    format_bool, optional_bool, parse_positive_int, required_attribute, validate_non_blank,
};
use crate::constants::{ALG_NS, ALG_PREFIX, MD_NS, MD_PREFIX, SHIBMD_NS, SHIBMD_PREFIX};
use crate::element::{ensure_element, new_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

// ============================================================================
// Extensions
// ============================================================================

/// One child of `md:Extensions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionItem {
    /// `alg:SigningMethod`.
    SigningMethod(SigningMethod),
    /// `alg:DigestMethod`.
    DigestMethod(DigestMethod),
    /// `shibmd:Scope`.
    Scope(Scope),
    /// Any other extension, carried verbatim.
    Other(XmlElement),
}

impl ExtensionItem {
    fn read(element: &XmlElement) -> SamlResult<Self> {
        if SigningMethod::matches(element) {
            SigningMethod::from_xml(element).map(Self::SigningMethod)
        } else if DigestMethod::matches(element) {
            DigestMethod::from_xml(element).map(Self::DigestMethod)
        } else if Scope::matches(element) {
            Scope::from_xml(element).map(Self::Scope)
        } else {
            Ok(Self::Other(element.clone()))
        }
    }

    fn to_xml(&self) -> XmlElement {
        match self {
            Self::SigningMethod(method) => method.to_xml(),
            Self::DigestMethod(method) => method.to_xml(),
            Self::Scope(scope) => scope.to_xml(),
            Self::Other(element) => element.clone(),
        }
    }
}

/// Container for metadata extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    items: Vec<ExtensionItem>,
}

impl Extensions {
    /// Creates an extensions block; at least one item is required.
    pub fn new(items: Vec<ExtensionItem>) -> SamlResult<Self> {
        if items.is_empty() {
            return Err(SamlError::MissingElement(
                "Extensions must contain at least one child".to_string(),
            ));
        }
        Ok(Self { items })
    }

    /// Returns the items in document order.
    #[must_use]
    pub fn items(&self) -> &[ExtensionItem] {
        &self.items
    }

    /// Iterates the signing method hints.
    pub fn signing_methods(&self) -> impl Iterator<Item = &SigningMethod> {
        self.items.iter().filter_map(|item| match item {
            ExtensionItem::SigningMethod(method) => Some(method),
            _ => None,
        })
    }

    /// Iterates the digest method hints.
    pub fn digest_methods(&self) -> impl Iterator<Item = &DigestMethod> {
        self.items.iter().filter_map(|item| match item {
            ExtensionItem::DigestMethod(method) => Some(method),
            _ => None,
        })
    }

    /// Iterates the scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.items.iter().filter_map(|item| match item {
            ExtensionItem::Scope(scope) => Some(scope),
            _ => None,
        })
    }
}

impl SamlElement for Extensions {
    const NAMESPACE: &'static str = MD_NS;
    const PREFIX: &'static str = MD_PREFIX;
    const LOCAL_NAME: &'static str = "Extensions";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let items = element
            .child_elements()
            .map(ExtensionItem::read)
            .collect::<SamlResult<Vec<_>>>()?;
        Self::new(items)
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        for item in &self.items {
            element.append_child(item.to_xml());
        }
        element
    }
}

// ============================================================================
// Algorithm support
// ============================================================================

/// A signature algorithm the entity accepts, with optional key size bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningMethod {
    algorithm: String,
    min_key_size: Option<u32>,
    max_key_size: Option<u32>,
}

impl SigningMethod {
    /// Creates a signing method hint.
    ///
    /// Key sizes must be positive and the minimum must not exceed the
    /// maximum.
    pub fn new(
        algorithm: impl Into<String>,
        min_key_size: Option<u32>,
        max_key_size: Option<u32>,
    ) -> SamlResult<Self> {
        let algorithm = algorithm.into();
        validate_non_blank(&algorithm, "Algorithm")?;
        for (name, size) in [("MinKeySize", min_key_size), ("MaxKeySize", max_key_size)] {
            if size == Some(0) {
                return Err(SamlError::InvalidValue(format!(
                    "'{name}' must be a positive integer, got '0'"
                )));
            }
        }
        if let (Some(min), Some(max)) = (min_key_size, max_key_size) {
            if min > max {
                return Err(SamlError::ConstraintViolation(format!(
                    "MinKeySize ({min}) must not exceed MaxKeySize ({max})"
                )));
            }
        }
        Ok(Self {
            algorithm,
            min_key_size,
            max_key_size,
        })
    }

    /// Returns `Algorithm`.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns `MinKeySize`.
    #[must_use]
    pub const fn min_key_size(&self) -> Option<u32> {
        self.min_key_size
    }

    /// Returns `MaxKeySize`.
    #[must_use]
    pub const fn max_key_size(&self) -> Option<u32> {
        self.max_key_size
    }
}

impl SamlElement for SigningMethod {
    const NAMESPACE: &'static str = ALG_NS;
    const PREFIX: &'static str = ALG_PREFIX;
    const LOCAL_NAME: &'static str = "SigningMethod";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let size = |name: &str| {
            element
                .attribute(name)
                .map(|raw| parse_positive_int(raw, name))
                .transpose()
        };
        Self::new(
            required_attribute(element, "Algorithm")?,
            size("MinKeySize")?,
            size("MaxKeySize")?,
        )
    }

    fn to_xml(&self) -> XmlElement {
        let mut element =
            new_element::<Self>().with_attribute("Algorithm", self.algorithm.as_str());
        if let Some(min) = self.min_key_size {
            element.set_attribute("MinKeySize", min.to_string());
        }
        if let Some(max) = self.max_key_size {
            element.set_attribute("MaxKeySize", max.to_string());
        }
        element
    }
}

/// A digest algorithm the entity accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMethod {
    algorithm: String,
}

impl DigestMethod {
    /// Creates a digest method hint.
    pub fn new(algorithm: impl Into<String>) -> SamlResult<Self> {
        let algorithm = algorithm.into();
        validate_non_blank(&algorithm, "Algorithm")?;
        Ok(Self { algorithm })
    }

    /// Returns `Algorithm`.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

impl SamlElement for DigestMethod {
    const NAMESPACE: &'static str = ALG_NS;
    const PREFIX: &'static str = ALG_PREFIX;
    const LOCAL_NAME: &'static str = "DigestMethod";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Self::new(required_attribute(element, "Algorithm")?)
    }

    fn to_xml(&self) -> XmlElement {
        new_element::<Self>().with_attribute("Algorithm", self.algorithm.as_str())
    }
}

// ============================================================================
// Shibboleth scope
// ============================================================================

/// A security domain an IdP is authoritative for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    value: String,
    regexp: bool,
}

impl Scope {
    /// Creates a scope; `regexp` marks the value as a regular expression.
    pub fn new(value: impl Into<String>, regexp: bool) -> SamlResult<Self> {
        let value = value.into().trim().to_string();
        validate_non_blank(&value, "Scope")?;
        Ok(Self { value, regexp })
    }

    /// Returns the scope text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if the value is a regular expression.
    #[must_use]
    pub const fn is_regexp(&self) -> bool {
        self.regexp
    }
}

impl SamlElement for Scope {
    const NAMESPACE: &'static str = SHIBMD_NS;
    const PREFIX: &'static str = SHIBMD_PREFIX;
    const LOCAL_NAME: &'static str = "Scope";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let regexp = optional_bool(element, "regexp", Some(false))?.unwrap_or(false);
        Self::new(element.text(), regexp)
    }

    fn to_xml(&self) -> XmlElement {
        new_element::<Self>()
            .with_attribute("regexp", format_bool(self.regexp))
            .with_text(self.value.as_str())
    }
}
