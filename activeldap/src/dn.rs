//! Distinguished names.
//!
//! A [`Dn`] is an ordered list of [`Rdn`]s, leaf first.  Comparison is
//! case-insensitive on both attribute types and values: every component is
//! uppercased before comparing, hashing or ordering.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Sub;
use std::str::FromStr;

use crate::error::{DistinguishedNameInvalid, Error, Result};
use crate::parsedn::{DnParser, SPECIAL};

type NormalizedRdn = Vec<(String, Vec<u8>)>;

// ---------------------------------------------------------------------------
// Rdn
// ---------------------------------------------------------------------------

/// One comma-separated component of a DN.  Usually a single
/// `type=value` pair; multi-valued RDNs hold several, joined by `+`.
#[derive(Debug, Clone, Default)]
pub struct Rdn {
    pairs: Vec<(String, Vec<u8>)>,
}

impl Rdn {
    pub fn new() -> Self {
        Rdn { pairs: Vec::new() }
    }

    pub fn single(attr_type: &str, value: impl Into<Vec<u8>>) -> Self {
        let mut rdn = Rdn::new();
        rdn.insert(attr_type, value);
        rdn
    }

    /// Set the value for `attr_type`, replacing an existing pair with the
    /// same (case-insensitive) type.
    pub fn insert(&mut self, attr_type: &str, value: impl Into<Vec<u8>>) {
        let value = value.into();
        match self
            .pairs
            .iter_mut()
            .find(|(t, _)| t.eq_ignore_ascii_case(attr_type))
        {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((attr_type.to_string(), value)),
        }
    }

    pub fn get(&self, attr_type: &str) -> Option<&[u8]> {
        self.pairs
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(attr_type))
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.pairs.iter().map(|(t, v)| (t.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Uppercased pairs, sorted by type.
    fn normalized(&self) -> NormalizedRdn {
        let mut pairs: NormalizedRdn = self
            .pairs
            .iter()
            .map(|(t, v)| (t.to_ascii_uppercase(), upcase(v)))
            .collect();
        pairs.sort();
        pairs
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Rdn {}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<&(String, Vec<u8>)> = self.pairs.iter().collect();
        pairs.sort_by_key(|(t, _)| t.to_ascii_uppercase());
        for (i, (attr_type, value)) in pairs.into_iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}={}", attr_type, Dn::escape_value(value))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dn
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// Parse an RFC 2253 string.  The empty string is the root DN.
    pub fn parse(source: &str) -> std::result::Result<Dn, DistinguishedNameInvalid> {
        DnParser::new(source).parse()
    }

    pub fn new(rdns: Vec<Rdn>) -> Self {
        Dn { rdns }
    }

    pub fn root() -> Self {
        Dn::default()
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// The leaf (most specific) RDN.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// The DN without its leaf RDN; `None` for the root.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Dn::new(self.rdns[1..].to_vec()))
    }

    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Append an RDN on the root side (`dn << rdn`).
    pub fn push(&mut self, rdn: Rdn) -> &mut Self {
        self.rdns.push(rdn);
        self
    }

    /// Prepend an RDN on the leaf side.
    pub fn unshift(&mut self, rdn: Rdn) -> &mut Self {
        self.rdns.insert(0, rdn);
        self
    }

    /// Remove `suffix` from the root end of this DN.  Fails unless `suffix`
    /// is a literal (case-insensitive) suffix.
    pub fn strip_suffix(&self, suffix: &Dn) -> Result<Dn> {
        let mut rdns = self.rdns.clone();
        let mut normalized = self.normalized();
        for rdn in suffix.normalized().into_iter().rev() {
            if normalized.pop().as_ref() == Some(&rdn) {
                rdns.pop();
            } else {
                return Err(Error::InvalidArgument(format!(
                    "{} isn't sub DN of {}",
                    suffix, self
                )));
            }
        }
        Ok(Dn::new(rdns))
    }

    /// True when `ancestor` is a proper suffix of this DN.
    pub fn is_descendant_of(&self, ancestor: &Dn) -> bool {
        if self.rdns.len() <= ancestor.rdns.len() {
            return false;
        }
        let offset = self.rdns.len() - ancestor.rdns.len();
        self.rdns[offset..] == ancestor.rdns[..]
    }

    /// Escape an attribute value for the string form.
    ///
    /// Values with leading or trailing whitespace are quoted, escaping only
    /// `\` and `"`.  Otherwise each of `,=+<>#;\"` gets a backslash.  Bytes
    /// that are not valid UTF-8 are written as `\XX` in either form.
    pub fn escape_value(value: &[u8]) -> String {
        let quoted = value.first().is_some_and(u8::is_ascii_whitespace)
            || value.last().is_some_and(u8::is_ascii_whitespace);
        let mut out = String::with_capacity(value.len() + 2);
        if quoted {
            out.push('"');
        }
        for chunk in value.utf8_chunks() {
            for c in chunk.valid().chars() {
                let escape = if quoted {
                    c == '\\' || c == '"'
                } else {
                    c.is_ascii() && (SPECIAL.contains(&(c as u8)) || c == '\\' || c == '"')
                };
                if escape {
                    out.push('\\');
                }
                out.push(c);
            }
            for byte in chunk.invalid() {
                out.push_str(&format!("\\{:02X}", byte));
            }
        }
        if quoted {
            out.push('"');
        }
        out
    }

    fn normalized(&self) -> Vec<NormalizedRdn> {
        self.rdns.iter().map(Rdn::normalized).collect()
    }
}

/// Uppercase a value for comparison.  UTF-8 text follows Unicode case
/// mapping; anything else is uppercased byte-wise as ASCII.
fn upcase(value: &[u8]) -> Vec<u8> {
    match std::str::from_utf8(value) {
        Ok(s) => s.to_uppercase().into_bytes(),
        Err(_) => value.to_ascii_uppercase(),
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", rdn)?;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = DistinguishedNameInvalid;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Dn::parse(s)
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl Sub<&Dn> for &Dn {
    type Output = Result<Dn>;

    fn sub(self, suffix: &Dn) -> Result<Dn> {
        self.strip_suffix(suffix)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
