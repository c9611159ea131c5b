//! LDAP syntaxes: conversion between wire values and typed [`Value`]s.
//!
//! Every syntax is a stateless unit struct registered under its OID.  A
//! syntax never fails to type-cast: input it cannot interpret comes back as
//! a raw [`Value::String`] (or [`Value::Binary`] when it is not UTF-8).

use std::fmt;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::dn::Dn;

/// Seconds precision part of a GeneralizedTime; fractions and the zone are
/// appended separately.
const TIME_FORMAT: &[FormatItem] =
    format_description!("[year][month][day][hour][minute][second]");

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A host-side attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Binary(Vec<u8>),
    Boolean(bool),
    Integer(i64),
    /// The bits between the quotes of `'0101'B`
    BitString(String),
    Dn(Dn),
    Time(OffsetDateTime),
}

impl Value {
    /// Wrap wire bytes without interpretation.
    pub fn raw(raw: &[u8]) -> Value {
        match std::str::from_utf8(raw) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Binary(raw.to_vec()),
        }
    }

    /// The generic wire form of the value.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Value::String(s) => s.clone().into_bytes(),
            Value::Binary(b) => b.clone(),
            Value::Boolean(true) => b"TRUE".to_vec(),
            Value::Boolean(false) => b"FALSE".to_vec(),
            Value::Integer(i) => i.to_string().into_bytes(),
            Value::BitString(bits) => format!("'{}'B", bits).into_bytes(),
            Value::Dn(dn) => dn.to_string().into_bytes(),
            Value::Time(t) => format_generalized_time(*t).into_bytes(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Quoted rendering used in validation messages.
    pub fn inspect(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::String(s) => format!("{:?}", s),
            other => format!("{:?}", String::from_utf8_lossy(&other.to_bytes())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Dn> for Value {
    fn from(dn: Dn) -> Self {
        Value::Dn(dn)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(t: OffsetDateTime) -> Self {
        Value::Time(t)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

// ---------------------------------------------------------------------------
// Syntax trait and registry
// ---------------------------------------------------------------------------

pub trait Syntax: Sync {
    fn oid(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Values are opaque bytes rather than text.
    fn binary(&self) -> bool {
        false
    }

    /// Interpret a wire value.  Falls back to [`Value::raw`].
    fn type_cast(&self, raw: &[u8]) -> Value {
        Value::raw(raw)
    }

    /// Wire form of a host value.
    fn normalize_value(&self, value: Value) -> Vec<u8> {
        value.to_bytes()
    }

    /// Why `value` is not acceptable, or None.
    fn validate(&self, value: &Value) -> Option<String> {
        let normalized = self.normalize_value(value.clone());
        self.validate_normalized_value(&normalized, value)
    }

    fn validate_normalized_value(&self, _normalized: &[u8], _original: &Value) -> Option<String> {
        None
    }
}

impl fmt::Debug for dyn Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Syntax({} {})", self.oid(), self.description())
    }
}

static SYNTAXES: &[&dyn Syntax] = &[
    &BitString,
    &Boolean,
    &CountryString,
    &DistinguishedName,
    &DirectoryString,
    &GeneralizedTime,
    &Integer,
    &Jpeg,
    &NameAndOptionalUid,
    &NumericString,
    &Oid,
    &OtherMailbox,
    &PostalAddress,
    &PrintableString,
    &TelephoneNumber,
];

/// Look up a syntax by OID.  A `{length}` suffix is ignored.
pub fn get(oid: &str) -> Option<&'static dyn Syntax> {
    let oid = oid.split('{').next().unwrap_or(oid).trim();
    SYNTAXES.iter().copied().find(|s| s.oid() == oid)
}

pub fn all() -> &'static [&'static dyn Syntax] {
    SYNTAXES
}

// ---------------------------------------------------------------------------
// Character classes
// ---------------------------------------------------------------------------

/// PrintableCharacter from RFC 4517.
fn printable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || " '()+,-./:=?".contains(c)
}

fn first_unprintable(s: &str) -> Option<char> {
    s.chars().find(|&c| !printable_char(c))
}

fn is_descriptor(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_numeric_oid(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

fn text(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

// ---------------------------------------------------------------------------
// Syntaxes
// ---------------------------------------------------------------------------

pub struct BitString;

impl Syntax for BitString {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.6"
    }

    fn description(&self) -> &'static str {
        "Bit String"
    }

    fn type_cast(&self, raw: &[u8]) -> Value {
        let s = text(raw);
        match s.strip_prefix('\'').and_then(|s| s.strip_suffix("'B")) {
            Some(bits) if bits.chars().all(|c| c == '0' || c == '1') => {
                Value::BitString(bits.to_string())
            }
            _ => Value::raw(raw),
        }
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        let value = text(normalized);
        if !value.starts_with('\'') {
            return Some(format!("{} doesn't have the first \"'\"", original.inspect()));
        }
        if value.len() < 3 || !value.ends_with("'B") {
            return Some(format!("{} doesn't have the last \"'B\"", original.inspect()));
        }
        let bits = &value[1..value.len() - 2];
        bits.chars().find(|&c| c != '0' && c != '1').map(|c| {
            format!(
                "{} has invalid character '{}'",
                Value::from(&*value).inspect(),
                c
            )
        })
    }
}

pub struct Boolean;

impl Syntax for Boolean {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.7"
    }

    fn description(&self) -> &'static str {
        "Boolean"
    }

    fn type_cast(&self, raw: &[u8]) -> Value {
        match raw {
            b"TRUE" => Value::Boolean(true),
            b"FALSE" => Value::Boolean(false),
            _ => Value::raw(raw),
        }
    }

    fn normalize_value(&self, value: Value) -> Vec<u8> {
        match value {
            Value::Boolean(true) | Value::Integer(1) => b"TRUE".to_vec(),
            Value::Boolean(false) | Value::Integer(0) => b"FALSE".to_vec(),
            Value::String(s) if s == "1" => b"TRUE".to_vec(),
            Value::String(s) if s == "0" => b"FALSE".to_vec(),
            other => other.to_bytes(),
        }
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        match normalized {
            b"TRUE" | b"FALSE" => None,
            _ => Some(format!("{} should be TRUE or FALSE", original.inspect())),
        }
    }
}

pub struct CountryString;

impl Syntax for CountryString {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.11"
    }

    fn description(&self) -> &'static str {
        "Country String"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        let value = text(normalized);
        if value.chars().count() == 2 && first_unprintable(&value).is_none() {
            None
        } else {
            Some(format!(
                "{} should be just 2 printable characters",
                original.inspect()
            ))
        }
    }
}

pub struct DistinguishedName;

impl Syntax for DistinguishedName {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.12"
    }

    fn description(&self) -> &'static str {
        "DN"
    }

    fn type_cast(&self, raw: &[u8]) -> Value {
        match std::str::from_utf8(raw).ok().and_then(|s| Dn::parse(s).ok()) {
            Some(dn) => Value::Dn(dn),
            None => Value::raw(raw),
        }
    }

    fn validate_normalized_value(&self, normalized: &[u8], _original: &Value) -> Option<String> {
        Dn::parse(&text(normalized)).err().map(|e| e.to_string())
    }
}

pub struct DirectoryString;

impl Syntax for DirectoryString {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.15"
    }

    fn description(&self) -> &'static str {
        "Directory String"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        match std::str::from_utf8(normalized) {
            Ok(_) => None,
            Err(_) => Some(format!("{} has invalid UTF-8 character", original.inspect())),
        }
    }
}

pub struct GeneralizedTime;

impl Syntax for GeneralizedTime {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.24"
    }

    fn description(&self) -> &'static str {
        "Generalized Time"
    }

    fn type_cast(&self, raw: &[u8]) -> Value {
        match std::str::from_utf8(raw).ok().and_then(parse_generalized_time) {
            Some(t) => Value::Time(t),
            None => Value::raw(raw),
        }
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        let parts = std::str::from_utf8(normalized)
            .ok()
            .and_then(split_generalized_time);
        match parts {
            None => Some(format!("{} is invalid time format", original.inspect())),
            Some(parts) if parts.digits.len() < TIME_COMPONENTS.len() => Some(format!(
                "{} has missing components: {}",
                original.inspect(),
                TIME_COMPONENTS[parts.digits.len()..].join(", ")
            )),
            Some(_) => None,
        }
    }
}

pub struct Integer;

impl Syntax for Integer {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.27"
    }

    fn description(&self) -> &'static str {
        "INTEGER"
    }

    fn type_cast(&self, raw: &[u8]) -> Value {
        match text(raw).parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::raw(raw),
        }
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        match text(normalized).parse::<i64>() {
            Ok(_) => None,
            Err(_) => Some(format!("{} is invalid integer format", original.inspect())),
        }
    }
}

pub struct Jpeg;

impl Syntax for Jpeg {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.28"
    }

    fn description(&self) -> &'static str {
        "JPEG"
    }

    fn binary(&self) -> bool {
        true
    }

    fn type_cast(&self, raw: &[u8]) -> Value {
        Value::Binary(raw.to_vec())
    }

    fn validate_normalized_value(&self, normalized: &[u8], _original: &Value) -> Option<String> {
        if normalized.starts_with(&[0xff, 0xd8]) {
            None
        } else {
            Some("invalid JPEG format".to_string())
        }
    }
}

/// `dn#'bits'B`, the bit string being optional.
pub struct NameAndOptionalUid;

impl Syntax for NameAndOptionalUid {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.34"
    }

    fn description(&self) -> &'static str {
        "Name And Optional UID"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        let value = text(normalized);
        let Some((dn, bits)) = value.rsplit_once('#') else {
            return DistinguishedName.validate_normalized_value(normalized, original);
        };
        let bits_value = Value::from(bits);
        let dn_value = Value::from(dn);
        let bits_reason = BitString.validate(&bits_value);
        let dn_reason = DistinguishedName.validate(&dn_value);
        match (bits_reason, dn_reason) {
            (None, dn_reason) => dn_reason,
            (Some(bits_reason), None) => Some(bits_reason),
            // "#" may belong to the DN itself (a hex-string value)
            (Some(_), Some(dn_reason)) => {
                DistinguishedName.validate_normalized_value(normalized, original)?;
                Some(dn_reason)
            }
        }
    }
}

pub struct NumericString;

impl Syntax for NumericString {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.36"
    }

    fn description(&self) -> &'static str {
        "Numeric String"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        if !normalized.is_empty() && normalized.iter().all(|&b| b.is_ascii_digit() || b == b' ') {
            None
        } else {
            Some(format!("{} is invalid numeric format", original.inspect()))
        }
    }
}

pub struct Oid;

impl Syntax for Oid {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.38"
    }

    fn description(&self) -> &'static str {
        "OID"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        let value = text(normalized);
        if is_descriptor(&value) || is_numeric_oid(&value) {
            None
        } else {
            Some(format!("{} is invalid OID format", original.inspect()))
        }
    }
}

/// `mailbox-type$mailbox`
pub struct OtherMailbox;

impl Syntax for OtherMailbox {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.39"
    }

    fn description(&self) -> &'static str {
        "Other Mailbox"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        let value = text(normalized);
        let (mailbox_type, mailbox) = match value.split_once('$') {
            Some((t, m)) => (t, m),
            None => (&*value, ""),
        };
        if mailbox_type.is_empty() {
            return Some(format!("{} has no mailbox type", original.inspect()));
        }
        if let Some(c) = first_unprintable(mailbox_type) {
            return Some(format!(
                "{} has unprintable character in mailbox type: '{}'",
                original.inspect(),
                c
            ));
        }
        if mailbox.trim().is_empty() {
            return Some(format!("{} has no mailbox", original.inspect()));
        }
        None
    }
}

pub struct PostalAddress;

impl Syntax for PostalAddress {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.41"
    }

    fn description(&self) -> &'static str {
        "Postal Address"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        if normalized.is_empty() {
            return Some("empty string".to_string());
        }
        match std::str::from_utf8(normalized) {
            Ok(_) => None,
            Err(_) => Some(format!("{} has invalid UTF-8 character", original.inspect())),
        }
    }
}

fn validate_printable(normalized: &[u8], original: &Value) -> Option<String> {
    if normalized.is_empty() {
        return Some("empty string".to_string());
    }
    first_unprintable(&text(normalized)).map(|c| {
        format!(
            "{} has unprintable character: '{}'",
            original.inspect(),
            c
        )
    })
}

pub struct PrintableString;

impl Syntax for PrintableString {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.44"
    }

    fn description(&self) -> &'static str {
        "Printable String"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        validate_printable(normalized, original)
    }
}

pub struct TelephoneNumber;

impl Syntax for TelephoneNumber {
    fn oid(&self) -> &'static str {
        "1.3.6.1.4.1.1466.115.121.1.50"
    }

    fn description(&self) -> &'static str {
        "Telephone Number"
    }

    fn validate_normalized_value(&self, normalized: &[u8], original: &Value) -> Option<String> {
        validate_printable(normalized, original)
    }
}

// ---------------------------------------------------------------------------
// GeneralizedTime helpers
// ---------------------------------------------------------------------------

const TIME_COMPONENTS: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];

struct TimeParts<'a> {
    /// year, then two-digit month, day, hour, minute, second as present
    digits: Vec<&'a str>,
    fraction: Option<&'a str>,
    zone: Option<&'a str>,
}

/// `YYYY[MM[DD[HH[MM[SS]]]]][(.|,)fraction][Z|(+|-)HHMM]`, every piece
/// optional.  None when the text does not have that shape.
fn split_generalized_time(s: &str) -> Option<TimeParts<'_>> {
    let digits_len = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len != 0 && (!(4..=14).contains(&digits_len) || digits_len % 2 != 0) {
        return None;
    }
    let mut digits = Vec::new();
    if digits_len >= 4 {
        digits.push(&s[..4]);
        let mut i = 4;
        while i < digits_len {
            digits.push(&s[i..i + 2]);
            i += 2;
        }
    }

    let mut rest = &s[digits_len..];
    let mut fraction = None;
    if rest.starts_with(['.', ',']) {
        let n = rest[1..].bytes().take_while(u8::is_ascii_digit).count();
        if n == 0 {
            return None;
        }
        fraction = Some(&rest[1..1 + n]);
        rest = &rest[1 + n..];
    }

    let zone = match rest {
        "" => None,
        "Z" => Some(rest),
        z if z.len() == 5
            && z.starts_with(['+', '-'])
            && z[1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(z)
        }
        _ => return None,
    };
    Some(TimeParts {
        digits,
        fraction,
        zone,
    })
}

fn parse_generalized_time(s: &str) -> Option<OffsetDateTime> {
    let parts = split_generalized_time(s)?;
    let year: i32 = parts.digits.first()?.parse().ok()?;
    if year < 1700 {
        return Some(OffsetDateTime::UNIX_EPOCH);
    }

    let component = |i: usize, default: u8| -> Option<u8> {
        match parts.digits.get(i) {
            Some(d) => d.parse().ok(),
            None => Some(default),
        }
    };
    let month = Month::try_from(component(1, 1)?).ok()?;
    let date = Date::from_calendar_date(year, month, component(2, 1)?).ok()?;
    let time = Time::from_hms(component(3, 0)?, component(4, 0)?, component(5, 0)?).ok()?;

    let offset_seconds: i64 = match parts.zone {
        None | Some("Z") => 0,
        Some(zone) => {
            let hours: i64 = zone[1..3].parse().ok()?;
            let minutes: i64 = zone[3..5].parse().ok()?;
            let seconds = hours * 3600 + minutes * 60;
            if zone.starts_with('-') {
                -seconds
            } else {
                seconds
            }
        }
    };

    let mut utc = PrimitiveDateTime::new(date, time)
        .checked_sub(Duration::seconds(offset_seconds))?;
    if let Some(fraction) = parts.fraction {
        // the fraction belongs to the last component given
        let unit: i64 = match parts.digits.len() {
            4 => 3600,
            5 => 60,
            _ => 1,
        };
        let nanos: i64 = format!("{:0<9}", &fraction[..fraction.len().min(9)])
            .parse()
            .ok()?;
        utc = utc.checked_add(Duration::nanoseconds(nanos * unit))?;
    }
    Some(utc.assume_utc())
}

/// `YYYYmmddHHMMSS[.fraction]Z` in UTC, trailing fraction zeros trimmed.
fn format_generalized_time(t: OffsetDateTime) -> String {
    let offset = Duration::seconds(t.offset().whole_seconds().into());
    let utc = PrimitiveDateTime::new(t.date(), t.time())
        .checked_sub(offset)
        .map(PrimitiveDateTime::assume_utc)
        .unwrap_or(t);
    let mut out = utc
        .format(TIME_FORMAT)
        .unwrap_or_else(|_| utc.unix_timestamp().to_string());
    let nanos = utc.nanosecond();
    if nanos != 0 {
        out.push('.');
        out.push_str(format!("{:09}", nanos).trim_end_matches('0'));
    }
    out.push('Z');
    out
}
