//! The signable `saml:Assertion`.

use chrono::{DateTime, Utc};

use crate::codec::{format_datetime, normalize_datetime, required_attribute, required_datetime};
use crate::constants::{SAML_NS, SAML_PREFIX, SAML_VERSION};
use crate::element::{
    ensure_element, new_element, optional_child, optional_opaque_child, required_child,
    SamlElement,
};
use crate::error::{SamlError, SamlResult};
use crate::signature::{read_signature, write_signature, SignableElement, Signature};
use crate::xml::XmlElement;

use super::attribute::AttributeStatement;
use super::authn::AuthnStatement;
use super::conditions::Conditions;
use super::name_id::Issuer;
use super::subject::Subject;

/// One statement of an assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `saml:AuthnStatement`.
    Authn(AuthnStatement),
    /// `saml:AttributeStatement`.
    Attribute(AttributeStatement),
    /// Any other statement (`AuthzDecisionStatement`, custom), carried verbatim.
    Other(XmlElement),
}

impl Statement {
    fn is_statement(element: &XmlElement) -> bool {
        AuthnStatement::matches(element)
            || AttributeStatement::matches(element)
            || element.is(SAML_NS, "AuthzDecisionStatement")
            || element.is(SAML_NS, "Statement")
    }

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        if AuthnStatement::matches(element) {
            AuthnStatement::from_xml(element).map(Self::Authn)
        } else if AttributeStatement::matches(element) {
            AttributeStatement::from_xml(element).map(Self::Attribute)
        } else {
            Ok(Self::Other(element.clone()))
        }
    }

    fn append_to(&self, parent: &mut XmlElement) {
        match self {
            Self::Authn(statement) => statement.append_to(parent),
            Self::Attribute(statement) => statement.append_to(parent),
            Self::Other(other) => parent.append_child(other.clone()),
        }
    }
}

/// A SAML 2.0 assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    id: String,
    issue_instant: DateTime<Utc>,
    issuer: Issuer,
    signature: Option<Signature>,
    subject: Option<Subject>,
    conditions: Option<Conditions>,
    advice: Option<XmlElement>,
    statements: Vec<Statement>,
}

impl Assertion {
    /// Starts building an assertion from the issuer.
    ///
    /// The builder starts with a fresh `ID` and the current instant.
    #[must_use]
    pub fn builder(issuer: Issuer) -> AssertionBuilder {
        AssertionBuilder {
            id: crate::generate_id(),
            issue_instant: Utc::now(),
            issuer,
            signature: None,
            subject: None,
            conditions: None,
            advice: None,
            statements: Vec::new(),
        }
    }

    /// Returns a builder seeded with every field of this assertion.
    #[must_use]
    pub fn to_builder(&self) -> AssertionBuilder {
        AssertionBuilder {
            id: self.id.clone(),
            issue_instant: self.issue_instant,
            issuer: self.issuer.clone(),
            signature: self.signature.clone(),
            subject: self.subject.clone(),
            conditions: self.conditions.clone(),
            advice: self.advice.clone(),
            statements: self.statements.clone(),
        }
    }

    /// Returns `ID`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `IssueInstant`.
    #[must_use]
    pub const fn issue_instant(&self) -> &DateTime<Utc> {
        &self.issue_instant
    }

    /// Returns the issuer.
    #[must_use]
    pub const fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Returns the subject.
    #[must_use]
    pub const fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// Returns the conditions.
    #[must_use]
    pub const fn conditions(&self) -> Option<&Conditions> {
        self.conditions.as_ref()
    }

    /// Returns the `Advice` element.
    #[must_use]
    pub const fn advice(&self) -> Option<&XmlElement> {
        self.advice.as_ref()
    }

    /// Returns the statements in document order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Iterates the attribute statements.
    pub fn attribute_statements(&self) -> impl Iterator<Item = &AttributeStatement> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::Attribute(attributes) => Some(attributes),
            _ => None,
        })
    }

    /// Iterates the authentication statements.
    pub fn authn_statements(&self) -> impl Iterator<Item = &AuthnStatement> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::Authn(authn) => Some(authn),
            _ => None,
        })
    }
}

impl SamlElement for Assertion {
    const NAMESPACE: &'static str = SAML_NS;
    const PREFIX: &'static str = SAML_PREFIX;
    const LOCAL_NAME: &'static str = "Assertion";

    fn from_xml(element: &XmlElement) -> SamlResult<Self> {
        ensure_element::<Self>(element)?;

        let version = required_attribute(element, "Version")?;
        if version != SAML_VERSION {
            return Err(SamlError::ProtocolViolation(format!(
                "unsupported assertion Version '{version}'"
            )));
        }

        let advice = optional_opaque_child(element, SAML_NS, "Advice")?;
        let statements = element
            .child_elements()
            .filter(|child| Statement::is_statement(child))
            .map(Statement::from_xml)
            .collect::<SamlResult<Vec<_>>>()?;

        AssertionBuilder {
            id: required_attribute(element, "ID")?.to_string(),
            issue_instant: required_datetime(element, "IssueInstant")?,
            issuer: required_child(element)?,
            signature: read_signature(element)?,
            subject: optional_child(element)?,
            conditions: optional_child(element)?,
            advice,
            statements,
        }
        .build()
    }

    fn to_xml(&self) -> XmlElement {
        let mut element = new_element::<Self>()
            .with_attribute("Version", SAML_VERSION)
            .with_attribute("ID", self.id.as_str())
            .with_attribute("IssueInstant", format_datetime(&self.issue_instant));
        self.issuer.append_to(&mut element);
        if let Some(subject) = &self.subject {
            subject.append_to(&mut element);
        }
        if let Some(conditions) = &self.conditions {
            conditions.append_to(&mut element);
        }
        if let Some(advice) = &self.advice {
            element.append_child(advice.clone());
        }
        for statement in &self.statements {
            statement.append_to(&mut element);
        }
        write_signature(&mut element, self.signature.as_ref());
        element
    }
}

impl SignableElement for Assertion {
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
        Some(&self.id)
    }
}

/// Builder for [`Assertion`].
#[derive(Debug, Clone)]
pub struct AssertionBuilder {
    id: String,
    issue_instant: DateTime<Utc>,
    issuer: Issuer,
    signature: Option<Signature>,
    subject: Option<Subject>,
    conditions: Option<Conditions>,
    advice: Option<XmlElement>,
    statements: Vec<Statement>,
}

impl AssertionBuilder {
    /// Sets `ID`.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets `IssueInstant`.
    #[must_use]
    pub const fn issue_instant(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = instant;
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the conditions.
    #[must_use]
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the `Advice` element.
    #[must_use]
    pub fn advice(mut self, advice: XmlElement) -> Self {
        self.advice = Some(advice);
        self
    }

    /// Appends a statement.
    #[must_use]
    pub fn statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Replaces all statements.
    #[must_use]
    pub fn statements(mut self, statements: Vec<Statement>) -> Self {
        self.statements = statements;
        self
    }

    /// Validates and builds the assertion.
    pub fn build(self) -> SamlResult<Assertion> {
        if self.id.trim().is_empty() {
            return Err(SamlError::ConstraintViolation(
                "Assertion ID must not be blank".to_string(),
            ));
        }
        if self.statements.is_empty() && self.subject.is_none() {
            return Err(SamlError::ConstraintViolation(
                "an Assertion without statements must contain a Subject".to_string(),
            ));
        }
        if let Some(advice) = &self.advice {
            if !advice.is(SAML_NS, "Advice") {
                return Err(SamlError::WrongElement {
                    expected: format!("{{{SAML_NS}}}Advice"),
                    actual: advice.name().to_string(),
                });
            }
        }
        Ok(Assertion {
            id: self.id,
            issue_instant: normalize_datetime(self.issue_instant),
            issuer: self.issuer,
            signature: self.signature,
            subject: self.subject,
            conditions: self.conditions,
            advice: self.advice,
            statements: self.statements,
        })
    }
}
