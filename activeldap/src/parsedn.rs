//! DN parser -- RFC 2253 string representation.
//!
//! Grammar accepted:
//!
//! ```text
//! dn    = rdn *( "," rdn )
//! rdn   = attr "=" value *( "+" attr "=" value )
//! attr  = ALPHA *( ALPHA / DIGIT / "-" ) / numericoid
//! value = "#" 1*hexpair / DQUOTE *( qchar / pair ) DQUOTE / *( char / pair )
//! ```
//!
//! Whitespace around `,`, `+` and `=` is ignored.  Values are collected as
//! bytes because hex pairs may decode to anything.

use crate::dn::{Dn, Rdn};
use crate::error::{DistinguishedNameInvalid, DnErrorReason};

/// Characters that must be escaped with a backslash pair.
pub(crate) const SPECIAL: &[u8] = b",=+<>#;";

pub struct DnParser<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> DnParser<'a> {
    pub fn new(source: &'a str) -> Self {
        DnParser {
            source,
            input: source.as_bytes(),
            pos: 0,
        }
    }

    pub fn parse(mut self) -> Result<Dn, DistinguishedNameInvalid> {
        let mut rdns = Vec::new();

        self.skip_whitespace();
        if self.scan_separator(b'+') {
            return Err(self.invalid(DnErrorReason::RdnMissing));
        }
        if self.scan_separator(b',') {
            return Err(self.invalid(DnErrorReason::NameComponentMissing));
        }

        let mut rdn = Rdn::new();
        while !self.eos() {
            let attr_type = self.scan_attribute_type()?;
            self.skip_type_value_separator()?;
            let value = self.scan_attribute_value()?;
            rdn.insert(&attr_type, value);

            if self.scan_separator(b'+') {
                if self.eos() {
                    return Err(self.invalid(DnErrorReason::RdnMissing));
                }
            } else if self.scan_separator(b',') {
                rdns.push(std::mem::take(&mut rdn));
                if self.eos() {
                    return Err(self.invalid(DnErrorReason::NameComponentMissing));
                }
            } else {
                // Anything else must start the next attribute type.
                self.skip_whitespace();
            }
        }
        if !rdn.is_empty() {
            rdns.push(rdn);
        }

        Ok(Dn::new(rdns))
    }

    // -- low-level helpers --------------------------------------------------

    fn invalid(&self, reason: DnErrorReason) -> DistinguishedNameInvalid {
        DistinguishedNameInvalid {
            dn: self.source.to_string(),
            reason,
        }
    }

    fn eos(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Scan `\s* sep \s*`.  Leaves the position untouched on failure.
    fn scan_separator(&mut self, sep: u8) -> bool {
        let saved = self.pos;
        self.skip_whitespace();
        if self.peek() == Some(sep) {
            self.pos += 1;
            self.skip_whitespace();
            true
        } else {
            self.pos = saved;
            false
        }
    }

    // -- grammar ------------------------------------------------------------

    fn scan_attribute_type(&mut self) -> Result<String, DistinguishedNameInvalid> {
        self.skip_whitespace();
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'-') {
                    self.pos += 1;
                }
            }
            Some(c) if c.is_ascii_digit() => {
                self.scan_digits();
                while self.peek() == Some(b'.')
                    && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit())
                {
                    self.pos += 1;
                    self.scan_digits();
                }
            }
            _ => return Err(self.invalid(DnErrorReason::AttributeTypeMissing)),
        }
        let attr_type = self.source[start..self.pos].to_string();
        self.skip_whitespace();
        Ok(attr_type)
    }

    fn scan_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn skip_type_value_separator(&mut self) -> Result<(), DistinguishedNameInvalid> {
        if self.scan_separator(b'=') {
            Ok(())
        } else {
            Err(self.invalid(DnErrorReason::AttributeValueMissing))
        }
    }

    fn scan_attribute_value(&mut self) -> Result<Vec<u8>, DistinguishedNameInvalid> {
        let (value, quoted) = if let Some(bytes) = self.scan_hex_string() {
            (bytes, false)
        } else if self.peek() == Some(b'"') {
            self.pos += 1;
            (self.scan_quoted_attribute_value()?, true)
        } else {
            (self.scan_unquoted_attribute_value(), false)
        };

        // Quotes keep whitespace-only content; only `""` is empty.
        let missing = if quoted {
            value.is_empty()
        } else {
            value.iter().all(|c| c.is_ascii_whitespace())
        };
        if missing {
            return Err(self.invalid(DnErrorReason::AttributeValueMissing));
        }
        Ok(value)
    }

    /// `#` followed by one or more hex pairs.
    fn scan_hex_string(&mut self) -> Option<Vec<u8>> {
        if self.peek() != Some(b'#') {
            return None;
        }
        let mut bytes = Vec::new();
        let mut pos = self.pos + 1;
        while let Some(byte) = hex_pair(self.input, pos) {
            bytes.push(byte);
            pos += 2;
        }
        if bytes.is_empty() {
            return None;
        }
        self.pos = pos;
        Some(bytes)
    }

    fn scan_quoted_attribute_value(&mut self) -> Result<Vec<u8>, DistinguishedNameInvalid> {
        let mut result = Vec::new();
        while self.peek() != Some(b'"') {
            let start = self.pos;
            while matches!(self.peek(), Some(c) if c != b'\\' && c != b'"') {
                self.pos += 1;
            }
            let quoted = &self.input[start..self.pos];
            let pairs = self.collect_pairs();
            if self.eos() || (quoted.is_empty() && pairs.is_empty()) {
                return Err(self.invalid(DnErrorReason::UnmatchedQuotation));
            }
            result.extend_from_slice(quoted);
            result.extend_from_slice(&pairs);
        }
        self.pos += 1;
        Ok(result)
    }

    fn scan_unquoted_attribute_value(&mut self) -> Vec<u8> {
        let mut result = Vec::new();
        while !self.eos() {
            let before = result.len();
            let pairs = self.collect_pairs();
            result.extend_from_slice(&pairs);

            let start = self.pos;
            while matches!(self.peek(), Some(c) if !is_string_stop(c)) {
                self.pos += 1;
            }
            let mut strings = &self.input[start..self.pos];
            // Unescaped trailing spaces are not part of the value.
            if matches!(self.peek(), None | Some(b',') | Some(b'+')) {
                while let Some((last, rest)) = strings.split_last() {
                    if !last.is_ascii_whitespace() {
                        break;
                    }
                    strings = rest;
                }
            }
            result.extend_from_slice(strings);

            if result.len() == before && self.pos == start {
                break;
            }
        }
        result
    }

    /// Decode any run of backslash pairs at the current position.
    fn collect_pairs(&mut self) -> Vec<u8> {
        let mut result = Vec::new();
        while self.peek() == Some(b'\\') {
            match self.peek_at(1) {
                Some(c) if SPECIAL.contains(&c) || c == b'\\' || c == b'"' => {
                    result.push(c);
                    self.pos += 2;
                }
                _ => match hex_pair(self.input, self.pos + 1) {
                    Some(byte) => {
                        result.push(byte);
                        self.pos += 3;
                    }
                    None => break,
                },
            }
        }
        result
    }
}

fn is_string_stop(c: u8) -> bool {
    SPECIAL.contains(&c) || c == b'\\' || c == b'"'
}

fn hex_pair(input: &[u8], pos: usize) -> Option<u8> {
    let hi = (*input.get(pos)? as char).to_digit(16)?;
    let lo = (*input.get(pos + 1)? as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Dn {
        DnParser::new(s).parse().unwrap()
    }

    fn reason(s: &str) -> DnErrorReason {
        DnParser::new(s).parse().unwrap_err().reason
    }

    fn pairs(dn: &Dn) -> Vec<Vec<(String, Vec<u8>)>> {
        dn.rdns()
            .iter()
            .map(|rdn| {
                rdn.iter()
                    .map(|(t, v)| (t.to_string(), v.to_vec()))
                    .collect()
            })
            .collect()
    }

    fn rdn(items: &[(&str, &str)]) -> Vec<(String, Vec<u8>)> {
        items
            .iter()
            .map(|(t, v)| (t.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    // ── Group 1: simple DNs ──────────────────────────────────────────────

    #[test]
    fn empty_source_is_root() {
        assert!(parse("").is_empty());
        assert!(parse("   ").is_empty());
    }

    #[test]
    fn single_rdn() {
        assert_eq!(pairs(&parse("cn=foo")), vec![rdn(&[("cn", "foo")])]);
    }

    #[test]
    fn multiple_rdns_in_leaf_first_order() {
        let dn = parse("uid=bob,ou=People,dc=example,dc=com");
        assert_eq!(
            pairs(&dn),
            vec![
                rdn(&[("uid", "bob")]),
                rdn(&[("ou", "People")]),
                rdn(&[("dc", "example")]),
                rdn(&[("dc", "com")]),
            ]
        );
    }

    #[test]
    fn whitespace_around_separators() {
        let dn = parse(" cn = foo , dc = com ");
        assert_eq!(pairs(&dn), vec![rdn(&[("cn", "foo")]), rdn(&[("dc", "com")])]);
    }

    #[test]
    fn multi_valued_rdn() {
        let dn = parse("cn=foo+uid=bar,dc=com");
        assert_eq!(
            pairs(&dn),
            vec![rdn(&[("cn", "foo"), ("uid", "bar")]), rdn(&[("dc", "com")])]
        );
    }

    #[test]
    fn numeric_oid_type() {
        let dn = parse("2.5.4.3=foo");
        assert_eq!(pairs(&dn), vec![rdn(&[("2.5.4.3", "foo")])]);
    }

    #[test]
    fn internal_spaces_are_kept() {
        assert_eq!(pairs(&parse("cn=Foo Bar")), vec![rdn(&[("cn", "Foo Bar")])]);
    }

    // ── Group 2: escapes and encodings ───────────────────────────────────

    #[test]
    fn backslash_specials() {
        let dn = parse(r#"cn=a\,b\+c\"d\\e\#f,dc=com"#);
        assert_eq!(pairs(&dn)[0], rdn(&[("cn", "a,b+c\"d\\e#f")]));
    }

    #[test]
    fn hex_escapes_decode_utf8() {
        let dn = parse(r"cn=Jos\C3\A9");
        assert_eq!(pairs(&dn)[0], rdn(&[("cn", "José")]));
    }

    #[test]
    fn hex_string_value() {
        let dn = parse("cn=#414243,dc=com");
        assert_eq!(pairs(&dn)[0], rdn(&[("cn", "ABC")]));
    }

    #[test]
    fn hex_string_may_be_binary() {
        let dn = parse("cn=#FF00");
        assert_eq!(dn.rdns()[0].get("cn").unwrap(), &[0xFF, 0x00]);
    }

    #[test]
    fn quoted_value() {
        let dn = parse(r#"cn=" a,b ",dc=com"#);
        assert_eq!(pairs(&dn)[0], rdn(&[("cn", " a,b ")]));
    }

    #[test]
    fn quoted_value_with_pairs() {
        let dn = parse(r#"cn="a\"b""#);
        assert_eq!(pairs(&dn)[0], rdn(&[("cn", "a\"b")]));
    }

    #[test]
    fn trailing_space_before_comma_trimmed() {
        let dn = parse("cn=foo   ,dc=com");
        assert_eq!(pairs(&dn)[0], rdn(&[("cn", "foo")]));
    }

    #[test]
    fn escaped_trailing_space_kept() {
        let dn = parse(r"cn=foo\20,dc=com");
        assert_eq!(pairs(&dn)[0], rdn(&[("cn", "foo ")]));
    }

    // ── Group 3: errors ──────────────────────────────────────────────────

    #[test]
    fn value_missing_without_equals() {
        assert_eq!(reason("net"), DnErrorReason::AttributeValueMissing);
    }

    #[test]
    fn leading_comma() {
        assert_eq!(reason(",dc=net"), DnErrorReason::NameComponentMissing);
    }

    #[test]
    fn leading_plus() {
        assert_eq!(reason("+dc=net"), DnErrorReason::RdnMissing);
    }

    #[test]
    fn trailing_comma() {
        assert_eq!(reason("dc=net,"), DnErrorReason::NameComponentMissing);
    }

    #[test]
    fn trailing_plus() {
        assert_eq!(reason("dc=net+"), DnErrorReason::RdnMissing);
    }

    #[test]
    fn empty_value() {
        assert_eq!(reason("cn=,dc=net"), DnErrorReason::AttributeValueMissing);
        assert_eq!(reason("cn="), DnErrorReason::AttributeValueMissing);
    }

    #[test]
    fn empty_quoted_value() {
        assert_eq!(reason(r#"cn="""#), DnErrorReason::AttributeValueMissing);
    }

    #[test]
    fn quoted_whitespace_is_a_value() {
        assert_eq!(pairs(&parse(r#"cn=" ",dc=net"#))[0], rdn(&[("cn", " ")]));
        assert_eq!(pairs(&parse("cn=\"a\t\""))[0], rdn(&[("cn", "a\t")]));
    }

    #[test]
    fn unquoted_whitespace_is_missing() {
        assert_eq!(reason("cn=   ,dc=net"), DnErrorReason::AttributeValueMissing);
    }

    #[test]
    fn missing_type() {
        assert_eq!(reason("=foo"), DnErrorReason::AttributeTypeMissing);
        assert_eq!(reason("cn=a=b"), DnErrorReason::AttributeTypeMissing);
    }

    #[test]
    fn unmatched_quotation() {
        assert_eq!(reason(r#"cn="foo"#), DnErrorReason::UnmatchedQuotation);
        assert_eq!(reason(r#"cn="foo\"#), DnErrorReason::UnmatchedQuotation);
    }

    #[test]
    fn error_carries_source() {
        let err = DnParser::new("cn=").parse().unwrap_err();
        assert_eq!(err.dn, "cn=");
    }
}
