//! Attribute codec.
//!
//! Typed conversion between raw attribute text and domain values. Each kind
//! has a `parse_*` function that validates raw text and, where the output
//! form differs from the input, a `format_*` counterpart producing the
//! canonical text. The attribute-level helpers read an attribute from an
//! [`XmlElement`] and apply the matching conversion.

use std::net::IpAddr;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::constants::ENTITY_ID_MAX_LENGTH;
use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

/// Parses an `xs:boolean`.
///
/// Accepts exactly `true`, `false`, `1` and `0`.
pub fn parse_bool(raw: &str, attribute: &str) -> SamlResult<bool> {
    match raw {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(SamlError::InvalidValue(format!(
            "'{attribute}' must be a boolean, got '{raw}'"
        ))),
    }
}

/// Returns the canonical text of a boolean.
#[must_use]
pub const fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Parses a SAML timestamp (`YYYY-MM-DDTHH:MM:SS[.fraction]Z`).
///
/// The fraction is accepted and dropped: timestamps carry whole seconds.
pub fn parse_datetime(raw: &str, attribute: &str) -> SamlResult<DateTime<Utc>> {
    let violation = || {
        SamlError::ProtocolViolation(format!(
            "'{attribute}' is not a valid SAML2 timestamp: '{raw}'"
        ))
    };
    if !is_zulu_shape(raw) {
        return Err(violation());
    }
    NaiveDateTime::parse_from_str(&raw[..19], "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| violation())
}

/// Returns the canonical text of a timestamp.
#[must_use]
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Drops sub-second precision so in-memory and parsed values agree.
#[must_use]
pub fn normalize_datetime(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(0)
}

fn is_zulu_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() < 20 || bytes[bytes.len() - 1] != b'Z' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    let fixed = digits(0..4)
        && bytes[4] == b'-'
        && digits(5..7)
        && bytes[7] == b'-'
        && digits(8..10)
        && bytes[10] == b'T'
        && digits(11..13)
        && bytes[13] == b':'
        && digits(14..16)
        && bytes[16] == b':'
        && digits(17..19);
    if !fixed {
        return false;
    }
    match &bytes[19..bytes.len() - 1] {
        [] => true,
        [b'.', fraction @ ..] => !fraction.is_empty() && fraction.iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

/// Parses an integer that must be greater than zero.
pub fn parse_positive_int(raw: &str, attribute: &str) -> SamlResult<u32> {
    match parse_digits(raw) {
        Some(value) if value > 0 => Ok(value),
        _ => Err(SamlError::InvalidValue(format!(
            "'{attribute}' must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Parses an integer that must not be negative.
pub fn parse_non_negative_int(raw: &str, attribute: &str) -> SamlResult<u32> {
    parse_digits(raw).ok_or_else(|| {
        SamlError::InvalidValue(format!(
            "'{attribute}' must be a non-negative integer, got '{raw}'"
        ))
    })
}

/// Parses an `xs:unsignedShort`.
pub fn parse_unsigned_short(raw: &str, attribute: &str) -> SamlResult<u16> {
    parse_digits(raw)
        .and_then(|value| u16::try_from(value).ok())
        .ok_or_else(|| {
            SamlError::InvalidValue(format!(
                "'{attribute}' must be an unsigned short, got '{raw}'"
            ))
        })
}

fn parse_digits(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Checks an entity identifier: non-blank and at most
/// [`ENTITY_ID_MAX_LENGTH`] characters.
pub fn validate_entity_id(value: &str) -> SamlResult<()> {
    validate_non_blank(value, "entityID")?;
    if value.chars().count() > ENTITY_ID_MAX_LENGTH {
        return Err(SamlError::ConstraintViolation(format!(
            "entityID must not exceed {ENTITY_ID_MAX_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Rejects empty or whitespace-only values.
pub fn validate_non_blank(value: &str, what: &str) -> SamlResult<()> {
    if value.trim().is_empty() {
        return Err(SamlError::ConstraintViolation(format!(
            "{what} must not be blank"
        )));
    }
    Ok(())
}

/// Checks an IPv4 or IPv6 address.
///
/// `Address` values are advisory: a malformed address is logged and the
/// caller keeps the raw value.
pub fn check_ip_address(value: &str, attribute: &str) {
    if value.parse::<IpAddr>().is_err() {
        tracing::warn!(
            attribute,
            address = %value,
            "provided address is not a valid IPv4 or IPv6 address, keeping it verbatim"
        );
    }
}

// ============================================================================
// Attribute-level helpers
// ============================================================================

/// Returns a required attribute in no namespace.
pub fn required_attribute<'a>(element: &'a XmlElement, name: &str) -> SamlResult<&'a str> {
    element
        .attribute(name)
        .ok_or_else(|| SamlError::missing_attribute(element.local_name(), name))
}

/// Returns an optional attribute in no namespace as an owned value.
#[must_use]
pub fn optional_attribute(element: &XmlElement, name: &str) -> Option<String> {
    element.attribute(name).map(str::to_string)
}

/// Reads a boolean attribute; an absent attribute yields `default`.
pub fn optional_bool(
    element: &XmlElement,
    name: &str,
    default: Option<bool>,
) -> SamlResult<Option<bool>> {
    element
        .attribute(name)
        .map_or(Ok(default), |raw| parse_bool(raw, name).map(Some))
}

/// Reads an optional timestamp attribute.
pub fn optional_datetime(element: &XmlElement, name: &str) -> SamlResult<Option<DateTime<Utc>>> {
    element
        .attribute(name)
        .map(|raw| parse_datetime(raw, name))
        .transpose()
}

/// Reads a required timestamp attribute.
pub fn required_datetime(element: &XmlElement, name: &str) -> SamlResult<DateTime<Utc>> {
    parse_datetime(required_attribute(element, name)?, name)
}

/// Writes an attribute when a value is present.
pub fn set_optional(element: &mut XmlElement, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        element.set_attribute(name, value);
    }
}

/// Writes a timestamp attribute when a value is present.
pub fn set_optional_datetime(element: &mut XmlElement, name: &str, value: Option<&DateTime<Utc>>) {
    if let Some(value) = value {
        element.set_attribute(name, format_datetime(value));
    }
}

/// Writes a boolean attribute when a value is present.
pub fn set_optional_bool(element: &mut XmlElement, name: &str, value: Option<bool>) {
    if let Some(value) = value {
        element.set_attribute(name, format_bool(value));
    }
}
