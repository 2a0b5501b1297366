//! `saml:Conditions` and the condition types it carries.

use chrono::{DateTime, Utc};

use crate::codec::{
    normalize_datetime, optional_datetime, parse_non_negative_int, set_optional_datetime,
};
use crate::constants::{SAML_NS, SAML_PREFIX};
use crate::element::{child_texts, ensure_element, new_element, text_element, SamlElement};
use crate::error::{SamlError, SamlResult};
use crate::xml::{QName, XmlElement};

/// One entry of a `Conditions` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `saml:AudienceRestriction`.
    AudienceRestriction(AudienceRestriction),
    /// `saml:OneTimeUse`.
    OneTimeUse,
    /// `saml:ProxyRestriction`.
    ProxyRestriction(ProxyRestriction),
    /// Any other condition, carried verbatim.
    Other(XmlElement),
}

/// Validity window and usage restrictions of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conditions {
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    conditions: Vec<Condition>,
}

impl Conditions {
    /// Creates conditions.
    ///
    /// `OneTimeUse` and `ProxyRestriction` may each occur once, and the
    /// window must not be empty when both bounds are set.
    pub fn new(
        not_before: Option<DateTime<Utc>>,
        not_on_or_after: Option<DateTime<Utc>>,
        conditions: Vec<Condition>,
    ) -> SamlResult<Self> {
        let not_before = not_before.map(normalize_datetime);
        let not_on_or_after = not_on_or_after.map(normalize_datetime);
        if let (Some(start), Some(end)) = (not_before, not_on_or_after) {
            if start >= end {
                return Err(SamlError::ConstraintViolation(
                    "NotBefore must be earlier than NotOnOrAfter".to_string(),
                ));
            }
        }
        let one_time = conditions
            .iter()
            .filter(|c| matches!(c, Condition::OneTimeUse))
            .count();
        if one_time > 1 {
            return Err(SamlError::too_many("Conditions", "OneTimeUse"));
        }
        let proxy = conditions
            .iter()
            .filter(|c| matches!(c, Condition::ProxyRestriction(_)))
            .count();
        if proxy > 1 {
            return Err(SamlError::too_many("Conditions", "ProxyRestriction"));
        }
        Ok(Self {
            not_before,
            not_on_or_after,
            conditions,
        })
    }

    /// Returns `NotBefore`.
    #[must_use]
    pub const fn not_before(&self) -> Option<&DateTime<Utc>> {
        self.not_before.as_ref()
    }

    /// Returns `NotOnOrAfter`.
    #[must_use]
    pub const fn not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.not_on_or_after.as_ref()
    }

    /// Returns the conditions in document order.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Iterates the audience restrictions.
    pub fn audience_restrictions(&self) -> impl Iterator<Item = &AudienceRestriction> {
        self.conditions.iter().filter_map(|c| match c {
            Condition::AudienceRestriction(restriction) => Some(restriction),
            _ => None,
        })
    }

    /// Returns true if a `OneTimeUse` condition is present.
    #[must_use]
    pub fn is_one_time_use(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| matches!(c, Condition::OneTimeUse))
    }

    /// Returns true if `instant` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, instant: &DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |start| *instant >= start)
            && self.not_on_or_after.map_or(true, |end| *instant < end)
    }
}

impl SamlElement for Conditions {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "Conditions";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let conditions = element
            .child_elements()
            .map(|child| {
                if AudienceRestriction::matches(child) {
                    AudienceRestriction::from_xml(child).map(Condition::AudienceRestriction)
                } else if child.is(SAML_NS, "OneTimeUse") {
                    Ok(Condition::OneTimeUse)
                } else if ProxyRestriction::matches(child) {
                    ProxyRestriction::from_xml(child).map(Condition::ProxyRestriction)
                } else {
                    Ok(Condition::Other(child.clone()))
                }
            })
            .collect::<SamlResult<Vec<_>>>()?;
        Self::new(
            optional_datetime(element, "NotBefore")?,
            optional_datetime(element, "NotOnOrAfter")?,
            conditions,
        )
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        set_optional_datetime(&mut element, "NotBefore", self.not_before.as_ref());
        set_optional_datetime(&mut element, "NotOnOrAfter", self.not_on_or_after.as_ref());
        for condition in &self.conditions {
            match condition {
                Condition::AudienceRestriction(restriction) => restriction.append_to(&mut element),
                Condition::OneTimeUse => {
                    let one_time_use = QName::ns(SAML_NS, SAML_PREFIX, "OneTimeUse");
                    element.append_child(XmlElement::new(one_time_use));
                }
                Condition::ProxyRestriction(restriction) => restriction.append_to(&mut element),
                Condition::Other(other) => element.append_child(other.clone()),
            }
        }
        element
    }
}

/// Audiences the assertion is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceRestriction {
    audiences: Vec<String>,
}

impl AudienceRestriction {
    /// Creates a restriction; at least one audience is required.
    pub fn new(audiences: Vec<String>) -> SamlResult<Self> {
        if audiences.is_empty() {
            return Err(SamlError::MissingElement(
                "AudienceRestriction must contain at least one Audience element".to_string(),
            ));
        }
        Ok(Self { audiences })
    }

    /// Returns the audiences in document order.
    #[must_use]
    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }
}

impl SamlElement for AudienceRestriction {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "AudienceRestriction";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        Self::new(child_texts(element, SAML_NS, "Audience"))
    }

    fn to_xml(&self) -> XmlElement {
        audiences_element(new_element::<Self>(), &self.audiences)
    }
}

/// Limits on issuing further assertions based on this one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyRestriction {
    count: Option<u32>,
    audiences: Vec<String>,
}

impl ProxyRestriction {
    /// Creates a proxy restriction.
    #[must_use]
    pub const fn new(count: Option<u32>, audiences: Vec<String>) -> Self {
        Self { count, audiences }
    }

    /// Returns the maximum number of proxy steps.
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        self.count
    }

    /// Returns the audiences in document order.
    #[must_use]
    pub fn audiences(&self) -> &[String] {
        &self.audiences
    }
}

impl SamlElement for ProxyRestriction {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "ProxyRestriction";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;
        let count = element
            .attribute("Count")
            .map(|raw| parse_non_negative_int(raw, "Count"))
            .transpose()?;
        Ok(Self::new(count, child_texts(element, SAML_NS, "Audience")))
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>();
        if let Some(count) = self.count {
            element.set_attribute("Count", count.to_string());
        }
        audiences_element(element, &self.audiences)
    }
}

fn audiences_element(mut element: XmlElement, audiences: &[String]) -> XmlElement {
    for audience in audiences {
        element.append_child(text_element(SAML_NS, SAML_PREFIX, "Audience", audience));
    }
    element
}
