//! LDIF parser (RFC 2849).
//!
//! The source is first split into logical lines: folded continuation lines
//! are joined, comments are dropped and blank lines are kept as record
//! separators.  Each logical line remembers which physical line and column
//! every piece came from, so errors point into the original text.

use std::fs;

use url::Url;

use crate::base64::read_base64;
use crate::config::LdifConfig;
use crate::dn::Dn;
use crate::error::{Error, LdifErrorReason, LdifInvalid, Result};
use crate::ldif::{
    AddRecord, Attributes, ChangeType, ContentRecord, Control, DeleteRecord, LdifDocument,
    ModifyKind, ModifyNameRecord, ModifyRecord, Operation, Record,
};

type ParseResult<T> = std::result::Result<T, LdifInvalid>;

// ---------------------------------------------------------------------------
// External values
// ---------------------------------------------------------------------------

/// Loads the value behind an `attr:< URI` line.
pub trait UriResolver {
    fn resolve(&self, uri: &Url) -> Result<Vec<u8>>;
}

/// Reads `file://` URIs from the local filesystem and rejects every other
/// scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl UriResolver for FileResolver {
    fn resolve(&self, uri: &Url) -> Result<Vec<u8>> {
        if uri.scheme() != "file" {
            return Err(Error::Uri {
                uri: uri.to_string(),
                reason: "unsupported scheme".to_string(),
            });
        }
        let path = uri.to_file_path().map_err(|()| Error::Uri {
            uri: uri.to_string(),
            reason: "not a local path".to_string(),
        })?;
        tracing::debug!(path = %path.display(), "reading external LDIF value");
        Ok(fs::read(&path)?)
    }
}

// ---------------------------------------------------------------------------
// Logical lines
// ---------------------------------------------------------------------------

/// Where a piece of a logical line starts in the source.
#[derive(Debug, Clone, Copy)]
struct Span {
    offset: usize,
    line: usize,
    column: usize,
}

#[derive(Debug)]
struct Line {
    text: String,
    spans: Vec<Span>,
}

impl Line {
    /// 1-based (line, column) of byte `offset` within `text`.
    fn position(&self, offset: usize) -> (usize, usize) {
        let span = self
            .spans
            .iter()
            .rev()
            .find(|s| s.offset <= offset)
            .copied()
            .unwrap_or(Span {
                offset: 0,
                line: 1,
                column: 1,
            });
        let chars = self.text[span.offset..offset].chars().count();
        (span.line, span.column + chars)
    }
}

#[derive(Debug)]
enum Item {
    Line(Line),
    Blank(usize),
}

/// Split `source` into logical lines.  Also returns the position just past
/// the last character.
fn logical_lines(source: &str) -> (Vec<Item>, (usize, usize)) {
    let mut items: Vec<Item> = Vec::new();
    let mut line_no = 0;
    let mut in_comment = false;
    let mut last_len = 0;

    for raw in source.split_inclusive('\n') {
        line_no += 1;
        let physical = match raw.strip_suffix('\n') {
            Some(l) => l.strip_suffix('\r').unwrap_or(l),
            None => raw,
        };
        last_len = physical.chars().count();

        if let Some(rest) = physical.strip_prefix(' ') {
            if in_comment {
                continue;
            }
            if let Some(Item::Line(line)) = items.last_mut() {
                line.spans.push(Span {
                    offset: line.text.len(),
                    line: line_no,
                    column: 2,
                });
                line.text.push_str(rest);
                continue;
            }
        }
        in_comment = false;
        if physical.is_empty() {
            items.push(Item::Blank(line_no));
        } else if physical.starts_with('#') {
            in_comment = true;
        } else {
            items.push(Item::Line(Line {
                text: physical.to_string(),
                spans: vec![Span {
                    offset: 0,
                    line: line_no,
                    column: 1,
                }],
            }));
        }
    }

    let eof = if line_no == 0 {
        (1, 1)
    } else if source.ends_with('\n') {
        (line_no + 1, 1)
    } else {
        (line_no, last_len + 1)
    };
    (items, eof)
}

fn attr_type_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

// Plain values may carry UTF-8 beyond SAFE-CHAR; only the line-breaking
// and NUL characters are refused.
fn safe_char(c: char) -> bool {
    c != '\0' && c != '\n' && c != '\r'
}

fn safe_init_char(c: char) -> bool {
    safe_char(c) && c != ' ' && c != ':' && c != '<'
}

/// DN string form of decoded bytes.  Bytes that are not valid UTF-8
/// become `\XX` pairs so the parsed value keeps them intact.
fn dn_string(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len());
    for chunk in value.utf8_chunks() {
        out.push_str(chunk.valid());
        for byte in chunk.invalid() {
            out.push_str(&format!("\\{:02X}", byte));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// LdifParser
// ---------------------------------------------------------------------------

pub struct LdifParser<'a> {
    source: &'a str,
    items: Vec<Item>,
    eof: (usize, usize),
    index: usize,
    pos: usize,
    config: &'a LdifConfig,
    resolver: &'a dyn UriResolver,
}

impl<'a> LdifParser<'a> {
    pub fn new(source: &'a str, config: &'a LdifConfig, resolver: &'a dyn UriResolver) -> Self {
        let (items, eof) = logical_lines(source);
        LdifParser {
            source,
            items,
            eof,
            index: 0,
            pos: 0,
            config,
            resolver,
        }
    }

    pub fn parse(mut self) -> ParseResult<LdifDocument> {
        self.skip_blank_lines();
        self.parse_version_spec()?;

        let mut records = Vec::new();
        loop {
            self.skip_blank_lines();
            if self.eof() {
                break;
            }
            let record = self.parse_record()?;
            tracing::trace!(
                dn = %record.dn(),
                change_type = ?record.change_type(),
                "parsed LDIF record"
            );
            records.push(record);
            if self.at_line() {
                return Err(self.error(LdifErrorReason::SeparatorMissing));
            }
        }
        tracing::debug!(records = records.len(), "parsed LDIF document");
        Ok(LdifDocument::new(records))
    }

    // -- low-level helpers --------------------------------------------------

    fn line(&self) -> Option<&Line> {
        match self.items.get(self.index) {
            Some(Item::Line(line)) => Some(line),
            _ => None,
        }
    }

    fn rest(&self) -> &str {
        self.line().map(|l| &l.text[self.pos..]).unwrap_or("")
    }

    fn eof(&self) -> bool {
        self.index >= self.items.len()
    }

    fn at_line(&self) -> bool {
        self.line().is_some()
    }

    fn skip_blank_lines(&mut self) {
        while let Some(Item::Blank(_)) = self.items.get(self.index) {
            self.index += 1;
            self.pos = 0;
        }
    }

    fn position(&self) -> (usize, usize) {
        match self.items.get(self.index) {
            None => self.eof,
            Some(Item::Blank(line)) => (*line, 1),
            Some(Item::Line(line)) => line.position(self.pos),
        }
    }

    fn error(&self, reason: LdifErrorReason) -> LdifInvalid {
        self.error_at(reason, self.position())
    }

    fn error_at(&self, reason: LdifErrorReason, (line, column): (usize, usize)) -> LdifInvalid {
        LdifInvalid {
            ldif: self.source.to_string(),
            reason,
            line,
            column,
        }
    }

    fn scan(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Case-insensitive keyword.  A keyword ending in a letter must not run
    /// on into a longer word.
    fn scan_mark(&mut self, mark: &str) -> bool {
        let rest = self.rest();
        let matched = rest
            .get(..mark.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(mark))
            && (!mark.ends_with(attr_type_char) || !rest[mark.len()..].starts_with(attr_type_char));
        if matched {
            self.pos += mark.len();
        }
        matched
    }

    fn scan_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let taken: String = self.rest().chars().take_while(|&c| pred(c)).collect();
        self.pos += taken.len();
        taken
    }

    fn scan_fill(&mut self) {
        self.scan_while(|c| c == ' ');
    }

    fn scan_to_eol(&mut self) -> String {
        let rest = self.rest().to_string();
        self.pos += rest.len();
        rest
    }

    /// `digits *("." digits)`
    fn scan_numeric_oid(&mut self) -> String {
        let mut oid = self.scan_while(|c| c.is_ascii_digit());
        while !oid.is_empty() && self.rest().starts_with('.') {
            let after_dot = &self.rest()[1..];
            if !after_dot.starts_with(|c: char| c.is_ascii_digit()) {
                break;
            }
            self.pos += 1;
            oid.push('.');
            oid.push_str(&self.scan_while(|c| c.is_ascii_digit()));
        }
        oid
    }

    /// Consume the end of the current line.
    fn scan_separator(&mut self) -> ParseResult<()> {
        if self.at_line() && self.rest().is_empty() {
            self.index += 1;
            self.pos = 0;
            Ok(())
        } else {
            Err(self.error(LdifErrorReason::SeparatorMissing))
        }
    }

    // -- grammar ------------------------------------------------------------

    fn parse_version_spec(&mut self) -> ParseResult<()> {
        if !self.scan_mark("version:") {
            return Err(self.error(LdifErrorReason::VersionSpecMissing));
        }
        self.scan_fill();
        let digits = self.scan_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(self.error(LdifErrorReason::VersionNumberMissing));
        }
        let version = digits.parse::<u64>().unwrap_or(u64::MAX);
        if version != 1 {
            return Err(self.error(LdifErrorReason::UnsupportedVersion(version)));
        }
        self.scan_separator()
    }

    fn parse_record(&mut self) -> ParseResult<Record> {
        let dn = self.parse_dn_spec()?;

        let mut controls = Vec::new();
        while self.scan_mark("control:") {
            controls.push(self.parse_control()?);
        }

        let record = match self.parse_change_type()? {
            None => {
                if !controls.is_empty() {
                    return Err(self.error(LdifErrorReason::ChangeTypeMissing));
                }
                let attributes = self.parse_attributes(1)?;
                Record::Content(ContentRecord { dn, attributes })
            }
            Some(ChangeType::Add) => {
                let attributes = self.parse_attributes(0)?;
                Record::Add(AddRecord {
                    dn,
                    controls,
                    attributes,
                })
            }
            Some(ChangeType::Delete) => Record::Delete(DeleteRecord { dn, controls }),
            Some(ChangeType::Modify) => {
                let operations = self.parse_modify_specs()?;
                Record::Modify(ModifyRecord {
                    dn,
                    controls,
                    operations,
                })
            }
            Some(ChangeType::ModDn) => Record::ModifyDn(self.parse_modify_name(dn, controls)?),
            Some(ChangeType::ModRdn) => Record::ModifyRdn(self.parse_modify_name(dn, controls)?),
        };
        Ok(record)
    }

    fn parse_dn_spec(&mut self) -> ParseResult<Dn> {
        if !self.scan_mark("dn:") {
            return Err(self.error(LdifErrorReason::DnMarkMissing));
        }
        let (dn, start) = if self.scan(":") {
            self.scan_fill();
            let start = self.position();
            let encoded = self.scan_to_eol();
            let decoded = read_base64(&encoded)
                .ok_or_else(|| self.error_at(LdifErrorReason::InvalidBase64, start))?;
            (dn_string(&decoded), start)
        } else {
            self.scan_fill();
            let start = self.position();
            let text = self.rest().to_string();
            if text.is_empty() {
                return Err(self.error(LdifErrorReason::DnMissing));
            }
            for (i, c) in text.char_indices() {
                let ok = if i == 0 {
                    safe_init_char(c)
                } else {
                    safe_char(c)
                };
                if !ok {
                    self.pos += i;
                    return Err(self.error(LdifErrorReason::DnInvalidCharacter(c)));
                }
            }
            self.pos += text.len();
            (text, start)
        };

        let parsed = Dn::parse(&dn).map_err(|e| {
            self.error_at(
                LdifErrorReason::DnInvalid {
                    dn: e.dn,
                    reason: e.reason,
                },
                start,
            )
        })?;
        self.scan_separator()?;
        Ok(parsed)
    }

    /// After `control:`.
    fn parse_control(&mut self) -> ParseResult<Control> {
        self.scan_fill();
        let oid = self.scan_numeric_oid();
        if oid.is_empty() {
            return Err(self.error(LdifErrorReason::ControlTypeMissing));
        }

        let mut criticality = None;
        if self.rest().starts_with(' ') {
            self.scan_fill();
            if self.scan_mark("true") {
                criticality = Some(true);
            } else if self.scan_mark("false") {
                criticality = Some(false);
            } else {
                return Err(self.error(LdifErrorReason::CriticalityMissing));
            }
        }

        let value = if self.rest().starts_with(':') {
            Some(self.parse_attribute_value(true)?)
        } else {
            None
        };
        self.scan_separator()?;
        Ok(Control {
            oid,
            criticality,
            value,
        })
    }

    fn parse_change_type(&mut self) -> ParseResult<Option<ChangeType>> {
        if !self.scan_mark("changetype:") {
            return Ok(None);
        }
        self.scan_fill();
        let start = self.position();
        let name = self.scan_while(attr_type_char);
        if name.is_empty() {
            return Err(self.error(LdifErrorReason::ChangeTypeValueMissing));
        }
        let change_type = name
            .to_ascii_lowercase()
            .parse::<ChangeType>()
            .map_err(|_| self.error_at(LdifErrorReason::UnknownChangeType(name.clone()), start))?;
        self.scan_separator()?;
        Ok(Some(change_type))
    }

    /// Attribute lines up to the end of the record.
    fn parse_attributes(&mut self, least: usize) -> ParseResult<Attributes> {
        let mut attributes = Attributes::new();
        let mut count = 0;
        while self.at_line() {
            let (name, options, value) = self.parse_attribute()?;
            attributes.add(&name, options, value);
            count += 1;
        }
        if count < least {
            return Err(self.error(LdifErrorReason::AttributeSpecMissing));
        }
        Ok(attributes)
    }

    /// One complete `type[;options]: value` line.
    fn parse_attribute(&mut self) -> ParseResult<(String, Vec<String>, Vec<u8>)> {
        let (name, options) = self.parse_attribute_description()?;
        let value = self.parse_attribute_value(true)?;
        self.scan_separator()?;
        Ok((name, options, value))
    }

    fn parse_attribute_description(&mut self) -> ParseResult<(String, Vec<String>)> {
        let name = match self.rest().chars().next() {
            Some(c) if c.is_ascii_alphabetic() => self.scan_while(attr_type_char),
            Some(c) if c.is_ascii_digit() => self.scan_numeric_oid(),
            _ => String::new(),
        };
        if name.is_empty() {
            return Err(self.error(LdifErrorReason::AttributeTypeMissing));
        }
        let mut options = Vec::new();
        while self.scan(";") {
            let option = self.scan_while(attr_type_char);
            if option.is_empty() {
                return Err(self.error(LdifErrorReason::OptionMissing));
            }
            options.push(option);
        }
        Ok((name, options))
    }

    /// `: value`, `:: base64` or `:< URI`, up to the end of the line.
    fn parse_attribute_value(&mut self, accept_external_file: bool) -> ParseResult<Vec<u8>> {
        if !self.scan(":") {
            return Err(self.error(LdifErrorReason::AttributeValueSeparatorMissing));
        }

        if self.scan(":") {
            self.scan_fill();
            let start = self.position();
            let encoded = self.scan_to_eol();
            return read_base64(&encoded)
                .ok_or_else(|| self.error_at(LdifErrorReason::InvalidBase64, start));
        }

        if self.rest().starts_with('<') {
            if !accept_external_file || !self.config.allow_external_files {
                return Err(self.error(LdifErrorReason::ExternalFileNotAccepted));
            }
            self.pos += 1;
            self.scan_fill();
            let start = self.position();
            let uri = self.scan_to_eol();
            if uri.is_empty() {
                return Err(self.error(LdifErrorReason::UriMissing));
            }
            return self.resolve_uri(uri, start);
        }

        self.scan_fill();
        let text = self.rest().to_string();
        for (i, c) in text.char_indices() {
            let ok = if i == 0 {
                safe_init_char(c)
            } else {
                safe_char(c)
            };
            if !ok {
                self.pos += i;
                return Err(self.error(LdifErrorReason::SeparatorMissing));
            }
        }
        self.pos += text.len();
        Ok(text.into_bytes())
    }

    fn resolve_uri(&self, uri: String, start: (usize, usize)) -> ParseResult<Vec<u8>> {
        let invalid = |reason: String| {
            self.error_at(
                LdifErrorReason::UriInvalid {
                    uri: uri.clone(),
                    reason,
                },
                start,
            )
        };
        let url = Url::parse(&uri).map_err(|e| invalid(e.to_string()))?;
        tracing::debug!(uri = %url, "resolving external LDIF value");
        self.resolver.resolve(&url).map_err(|e| match e {
            Error::Uri { reason, .. } => invalid(reason),
            other => invalid(other.to_string()),
        })
    }

    fn parse_modify_specs(&mut self) -> ParseResult<Vec<Operation>> {
        let mut operations = Vec::new();
        while self.at_line() {
            let start = self.position();
            let kind_name = self.scan_while(attr_type_char);
            if kind_name.is_empty() || !self.rest().starts_with(':') {
                // not a modify spec; the caller reports the stray line
                self.pos = 0;
                break;
            }
            let kind = ModifyKind::from_name(&kind_name.to_ascii_lowercase()).ok_or_else(|| {
                self.error_at(LdifErrorReason::UnknownModifyType(kind_name.clone()), start)
            })?;
            self.pos += 1;
            self.scan_fill();
            let (attribute, options) = self.parse_attribute_description()?;
            self.scan_separator()?;

            let mut operation = Operation {
                kind,
                attribute,
                options,
                attributes: Attributes::new(),
            };
            while self.at_line() && !self.rest().starts_with('-') {
                let start = self.position();
                let (name, options, value) = self.parse_attribute()?;
                if !name.eq_ignore_ascii_case(&operation.attribute) {
                    return Err(self.error_at(
                        LdifErrorReason::ModifyAttributeMismatch {
                            expected: operation.attribute.clone(),
                            found: name,
                        },
                        start,
                    ));
                }
                operation.attributes.add(&name, options, value);
            }
            if !self.scan("-") {
                return Err(self.error(LdifErrorReason::ModifySpecSeparatorMissing));
            }
            self.scan_separator()?;
            operations.push(operation);
        }
        Ok(operations)
    }

    fn parse_modify_name(
        &mut self,
        dn: Dn,
        controls: Vec<Control>,
    ) -> ParseResult<ModifyNameRecord> {
        if !self.scan_mark("newrdn") {
            return Err(self.error(LdifErrorReason::NewRdnMarkMissing));
        }
        let new_rdn = self.parse_attribute_value(false)?;
        if new_rdn.is_empty() {
            return Err(self.error(LdifErrorReason::NewRdnValueMissing));
        }
        self.scan_separator()?;

        if !self.scan_mark("deleteoldrdn:") {
            return Err(self.error(LdifErrorReason::DeleteOldRdnMarkMissing));
        }
        self.scan_fill();
        let delete_old_rdn = if self.scan("1") {
            true
        } else if self.scan("0") {
            false
        } else {
            return Err(self.error(LdifErrorReason::DeleteOldRdnValueMissing));
        };
        self.scan_separator()?;

        let mut new_superior = None;
        if self.scan_mark("newsuperior") {
            let value = self.parse_attribute_value(false)?;
            if value.is_empty() {
                return Err(self.error(LdifErrorReason::NewSuperiorValueMissing));
            }
            let text = dn_string(&value);
            let superior = Dn::parse(&text).map_err(|e| {
                self.error(LdifErrorReason::DnInvalid {
                    dn: e.dn,
                    reason: e.reason,
                })
            })?;
            self.scan_separator()?;
            new_superior = Some(superior);
        }

        Ok(ModifyNameRecord {
            dn,
            controls,
            new_rdn: dn_string(&new_rdn),
            delete_old_rdn,
            new_superior,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::DnErrorReason;
    use std::io::Write;

    fn parse(source: &str) -> ParseResult<LdifDocument> {
        LdifDocument::parse(source)
    }

    fn parse_one(source: &str) -> Record {
        let doc = parse(source).unwrap();
        assert_eq!(doc.len(), 1);
        doc.records.into_iter().next().unwrap()
    }

    fn fail(source: &str) -> LdifInvalid {
        parse(source).unwrap_err()
    }

    fn attrs(record: &Record) -> &Attributes {
        record.attributes().unwrap()
    }

    // ── Group 1: version spec ───────────────────────────────────────────

    #[test]
    fn empty_document() {
        assert!(parse("version: 1\n").unwrap().is_empty());
        assert!(parse("version: 1").unwrap().is_empty());
    }

    #[test]
    fn version_spec_missing() {
        let e = fail("dn: cn=foo\ncn: foo\n");
        assert_eq!(e.reason, LdifErrorReason::VersionSpecMissing);
        assert_eq!((e.line, e.column), (1, 1));
        assert_eq!(fail("").reason, LdifErrorReason::VersionSpecMissing);
    }

    #[test]
    fn version_number_missing() {
        let e = fail("version:\n");
        assert_eq!(e.reason, LdifErrorReason::VersionNumberMissing);
        assert_eq!((e.line, e.column), (1, 9));
    }

    #[test]
    fn unsupported_version() {
        assert_eq!(fail("version: 0\n").reason, LdifErrorReason::UnsupportedVersion(0));
        assert_eq!(fail("version: 2\n").reason, LdifErrorReason::UnsupportedVersion(2));
    }

    #[test]
    fn garbage_after_version() {
        let e = fail("version: 1 x\n");
        assert_eq!(e.reason, LdifErrorReason::SeparatorMissing);
        assert_eq!((e.line, e.column), (1, 11));
    }

    // ── Group 2: content records ────────────────────────────────────────

    #[test]
    fn simple_content_record() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo,dc=example,dc=com\n\
             objectClass: top\n\
             objectClass: person\n\
             cn: foo\n\
             sn: bar\n",
        );
        assert!(record.is_content());
        assert_eq!(record.dn().to_string(), "cn=foo,dc=example,dc=com");
        let a = attrs(&record);
        assert_eq!(a.values("objectClass"), vec![&b"top"[..], &b"person"[..]]);
        assert_eq!(a.values("sn"), vec![&b"bar"[..]]);
    }

    #[test]
    fn multiple_records() {
        let doc = parse(
            "version: 1\n\
             \n\
             dn: cn=a,dc=example\n\
             cn: a\n\
             \n\
             \n\
             dn: cn=b,dc=example\n\
             cn: b\n\
             \n",
        )
        .unwrap();
        let dns: Vec<String> = doc.iter().map(|r| r.dn().to_string()).collect();
        assert_eq!(dns, vec!["cn=a,dc=example", "cn=b,dc=example"]);
    }

    #[test]
    fn attribute_options() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo\n\
             cn;lang-ja;phonetic: foo\n",
        );
        let values = attrs(&record).get("cn").unwrap();
        assert_eq!(values[0].options, vec!["lang-ja", "phonetic"]);
        assert_eq!(values[0].value, b"foo");
    }

    #[test]
    fn numeric_attribute_type() {
        let record = parse_one("version: 1\ndn: cn=foo\n2.5.4.3: foo\n");
        assert_eq!(attrs(&record).values("2.5.4.3"), vec![&b"foo"[..]]);
    }

    #[test]
    fn empty_value() {
        let record = parse_one("version: 1\ndn: cn=foo\ndescription:\n");
        assert_eq!(attrs(&record).values("description"), vec![&b""[..]]);
    }

    #[test]
    fn base64_value_and_dn() {
        // Y249Zm9vLGRjPWV4YW1wbGUsZGM9Y29t is "cn=foo,dc=example,dc=com"
        let record = parse_one(
            "version: 1\n\
             dn:: Y249Zm9vLGRjPWV4YW1wbGUsZGM9Y29t\n\
             cn:: aGVsbG8=\n",
        );
        assert_eq!(record.dn().to_string(), "cn=foo,dc=example,dc=com");
        assert_eq!(attrs(&record).values("cn"), vec![&b"hello"[..]]);
    }

    #[test]
    fn base64_dn_keeps_invalid_utf8() {
        // Y249/w== is "cn=" followed by the byte 0xFF
        let record = parse_one("version: 1\ndn:: Y249/w==\ncn: x\n");
        assert_eq!(record.dn().rdns()[0].get("cn"), Some(&[0xffu8][..]));

        let reparsed = parse_one(&format!("version: 1\n{}", record));
        assert_eq!(reparsed.dn().rdns()[0].get("cn"), Some(&[0xffu8][..]));
    }

    #[test]
    fn non_ascii_plain_value() {
        let record = parse_one("version: 1\ndn: cn=foo\nsn: José\n");
        assert_eq!(attrs(&record).values("sn"), vec!["José".as_bytes()]);
    }

    #[test]
    fn line_folding() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo,dc=exam\n ple,dc=com\n\
             descr\n iption: hello\n  world\n",
        );
        assert_eq!(record.dn().to_string(), "cn=foo,dc=example,dc=com");
        assert_eq!(attrs(&record).values("description"), vec![&b"hello world"[..]]);
    }

    #[test]
    fn comments_are_skipped() {
        let record = parse_one(
            "# leading comment\n\
             version: 1\n\
             # a long comment\n that folds\n\
             dn: cn=foo\n\
             # between attributes\n\
             cn: foo\n",
        );
        assert_eq!(attrs(&record).values("cn"), vec![&b"foo"[..]]);
    }

    #[test]
    fn crlf_line_endings() {
        let record = parse_one("version: 1\r\ndn: cn=foo\r\ncn: foo\r\n\r\n");
        assert_eq!(record.dn().to_string(), "cn=foo");
        assert_eq!(attrs(&record).values("cn"), vec![&b"foo"[..]]);
    }

    // ── Group 3: DN and attribute errors ────────────────────────────────

    #[test]
    fn dn_mark_missing() {
        let e = fail("version: 1\ncn: foo\n");
        assert_eq!(e.reason, LdifErrorReason::DnMarkMissing);
        assert_eq!((e.line, e.column), (2, 1));
    }

    #[test]
    fn dn_missing() {
        assert_eq!(fail("version: 1\ndn:\ncn: foo\n").reason, LdifErrorReason::DnMissing);
    }

    #[test]
    fn dn_invalid() {
        let e = fail("version: 1\ndn: cn=foo,\ncn: foo\n");
        assert_eq!(
            e.reason,
            LdifErrorReason::DnInvalid {
                dn: "cn=foo,".to_string(),
                reason: DnErrorReason::NameComponentMissing,
            }
        );
        assert_eq!((e.line, e.column), (2, 5));
        assert!(e.to_string().starts_with(
            "invalid LDIF: DN is invalid: cn=foo,: name component is missing:\n"
        ));
    }

    #[test]
    fn dn_invalid_character() {
        let e = fail("version: 1\ndn: <cn=foo\ncn: foo\n");
        assert_eq!(e.reason, LdifErrorReason::DnInvalidCharacter('<'));
    }

    #[test]
    fn content_record_needs_attributes() {
        let e = fail("version: 1\ndn: cn=foo\n\n");
        assert_eq!(e.reason, LdifErrorReason::AttributeSpecMissing);
        assert_eq!((e.line, e.column), (3, 1));
    }

    #[test]
    fn attribute_type_missing() {
        let e = fail("version: 1\ndn: cn=foo\n: foo\n");
        assert_eq!(e.reason, LdifErrorReason::AttributeTypeMissing);
        assert_eq!((e.line, e.column), (3, 1));
    }

    #[test]
    fn option_missing() {
        assert_eq!(
            fail("version: 1\ndn: cn=foo\ncn;: foo\n").reason,
            LdifErrorReason::OptionMissing
        );
    }

    #[test]
    fn value_separator_missing() {
        assert_eq!(
            fail("version: 1\ndn: cn=foo\ncn foo\n").reason,
            LdifErrorReason::AttributeValueSeparatorMissing
        );
    }

    #[test]
    fn invalid_base64() {
        let e = fail("version: 1\ndn: cn=foo\ncn:: !!!invalid!!!\n");
        assert_eq!(e.reason, LdifErrorReason::InvalidBase64);
        assert_eq!((e.line, e.column), (3, 6));
    }

    #[test]
    fn error_position_in_folded_line() {
        let e = fail("version: 1\ndn: cn=foo\ncn:\n  :bad\n");
        assert_eq!(e.reason, LdifErrorReason::SeparatorMissing);
        assert_eq!((e.line, e.column), (4, 3));
        assert_eq!(e.nearest(), "  |@|:bad");
    }

    // ── Group 4: change records ─────────────────────────────────────────

    #[test]
    fn add_record() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo\n\
             changetype: add\n\
             cn: foo\n",
        );
        assert_eq!(record.change_type(), Some(ChangeType::Add));
        assert_eq!(attrs(&record).values("cn"), vec![&b"foo"[..]]);
    }

    #[test]
    fn delete_record() {
        let record = parse_one("version: 1\ndn: cn=foo\nchangetype: delete\n");
        assert_eq!(record.change_type(), Some(ChangeType::Delete));
    }

    #[test]
    fn delete_record_garbage_after() {
        let e = fail("version: 1\ndn: cn=foo\nchangetype: delete\ncn: foo\n");
        assert_eq!(e.reason, LdifErrorReason::SeparatorMissing);
        assert_eq!((e.line, e.column), (4, 1));
    }

    #[test]
    fn controls() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo\n\
             control: 1.2.840.113556.1.4.805 true\n\
             control: 1.2.3.4 false: value\n\
             control: 1.2.3.5:: aGVsbG8=\n\
             changetype: delete\n",
        );
        let controls = record.controls();
        assert_eq!(controls.len(), 3);
        assert_eq!(controls[0].oid, "1.2.840.113556.1.4.805");
        assert_eq!(controls[0].criticality, Some(true));
        assert_eq!(controls[0].value, None);
        assert_eq!(controls[1].criticality, Some(false));
        assert_eq!(controls[1].value.as_deref(), Some(&b"value"[..]));
        assert_eq!(controls[2].criticality, None);
        assert_eq!(controls[2].value.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn control_errors() {
        let e = fail("version: 1\ndn: cn=foo\ncontrol: abc\nchangetype: delete\n");
        assert_eq!(e.reason, LdifErrorReason::ControlTypeMissing);
        let e = fail("version: 1\ndn: cn=foo\ncontrol: 1.2.3 maybe\nchangetype: delete\n");
        assert_eq!(e.reason, LdifErrorReason::CriticalityMissing);
        let e = fail("version: 1\ndn: cn=foo\ncontrol: 1.2.3\ncn: foo\n");
        assert_eq!(e.reason, LdifErrorReason::ChangeTypeMissing);
    }

    #[test]
    fn change_type_errors() {
        assert_eq!(
            fail("version: 1\ndn: cn=foo\nchangetype:\n").reason,
            LdifErrorReason::ChangeTypeValueMissing
        );
        assert_eq!(
            fail("version: 1\ndn: cn=foo\nchangetype: rename\n").reason,
            LdifErrorReason::UnknownChangeType("rename".to_string())
        );
    }

    #[test]
    fn modify_record() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo\n\
             changetype: modify\n\
             add: mail\n\
             mail: foo@example.com\n\
             mail: bar@example.com\n\
             -\n\
             delete: description\n\
             -\n\
             replace: cn;lang-en\n\
             cn;lang-en: Foo\n\
             -\n",
        );
        let Record::Modify(modify) = record else {
            panic!("expected modify record");
        };
        let ops = &modify.operations;
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].kind, ModifyKind::Add);
        assert_eq!(ops[0].attribute, "mail");
        assert_eq!(ops[0].attributes.values("mail").len(), 2);
        assert_eq!(ops[1].kind, ModifyKind::Delete);
        assert!(ops[1].attributes.is_empty());
        assert_eq!(ops[2].kind, ModifyKind::Replace);
        assert_eq!(ops[2].options, vec!["lang-en"]);
        assert_eq!(ops[2].full_attribute_name(), "cn;lang-en");
    }

    #[test]
    fn modify_errors() {
        let e = fail("version: 1\ndn: cn=foo\nchangetype: modify\nchange: cn\n-\n");
        assert_eq!(e.reason, LdifErrorReason::UnknownModifyType("change".to_string()));
        assert_eq!((e.line, e.column), (4, 1));

        let e = fail("version: 1\ndn: cn=foo\nchangetype: modify\nadd: cn\ncn: foo\n");
        assert_eq!(e.reason, LdifErrorReason::ModifySpecSeparatorMissing);

        let e = fail("version: 1\ndn: cn=foo\nchangetype: modify\nadd: cn\nsn: foo\n-\n");
        assert_eq!(
            e.reason,
            LdifErrorReason::ModifyAttributeMismatch {
                expected: "cn".to_string(),
                found: "sn".to_string(),
            }
        );
        assert_eq!((e.line, e.column), (5, 1));
    }

    #[test]
    fn modrdn_record() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo,dc=example\n\
             changetype: modrdn\n\
             newrdn: cn=bar\n\
             deleteoldrdn: 1\n\
             newsuperior: ou=People,dc=example\n",
        );
        let Record::ModifyRdn(r) = record else {
            panic!("expected modrdn record");
        };
        assert_eq!(r.new_rdn, "cn=bar");
        assert!(r.delete_old_rdn);
        assert_eq!(r.new_superior.unwrap().to_string(), "ou=People,dc=example");
    }

    #[test]
    fn moddn_without_new_superior() {
        let record = parse_one(
            "version: 1\n\
             dn: cn=foo,dc=example\n\
             changetype: moddn\n\
             newrdn: cn=bar\n\
             deleteoldrdn: 0\n",
        );
        let Record::ModifyDn(r) = record else {
            panic!("expected moddn record");
        };
        assert!(!r.delete_old_rdn);
        assert!(r.new_superior.is_none());
    }

    #[test]
    fn modify_name_errors() {
        let head = "version: 1\ndn: cn=foo\nchangetype: moddn\n";
        let cases = [
            ("", LdifErrorReason::NewRdnMarkMissing),
            ("newrdn:\n", LdifErrorReason::NewRdnValueMissing),
            ("newrdn: cn=bar\n", LdifErrorReason::DeleteOldRdnMarkMissing),
            ("newrdn: cn=bar\ndeleteoldrdn: x\n", LdifErrorReason::DeleteOldRdnValueMissing),
            (
                "newrdn: cn=bar\ndeleteoldrdn: 1\nnewsuperior:\n",
                LdifErrorReason::NewSuperiorValueMissing,
            ),
            ("newrdn:< file:///etc/hostname\n", LdifErrorReason::ExternalFileNotAccepted),
        ];
        for (tail, reason) in cases {
            let source = format!("{}{}", head, tail);
            assert_eq!(fail(&source).reason, reason, "{}", tail);
        }
    }

    #[test]
    fn new_rdn_missing_at_end_of_input() {
        let e = fail("version: 1\ndn: cn=foo\nchangetype: modrdn\n");
        assert_eq!((e.line, e.column), (4, 1));
        assert_eq!(e.nearest(), "changetype: modrdn\n|@|");
    }

    // ── Group 5: external values ────────────────────────────────────────

    #[test]
    fn file_uri_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xff\xd8binary").unwrap();
        let url = Url::from_file_path(file.path()).unwrap();
        let source = format!("version: 1\ndn: cn=foo\njpegPhoto:< {}\n", url);
        let record = parse_one(&source);
        assert_eq!(attrs(&record).values("jpegPhoto"), vec![&b"\xff\xd8binary"[..]]);
    }

    #[test]
    fn uri_missing() {
        assert_eq!(
            fail("version: 1\ndn: cn=foo\ncn:<\n").reason,
            LdifErrorReason::UriMissing
        );
    }

    #[test]
    fn uri_unsupported_scheme() {
        let e = fail("version: 1\ndn: cn=foo\ncn:< http://example.com/foo\n");
        assert_eq!(
            e.reason,
            LdifErrorReason::UriInvalid {
                uri: "http://example.com/foo".to_string(),
                reason: "unsupported scheme".to_string(),
            }
        );
    }

    #[test]
    fn uri_unparsable() {
        let e = fail("version: 1\ndn: cn=foo\ncn:< not a uri\n");
        assert!(matches!(e.reason, LdifErrorReason::UriInvalid { .. }));
    }

    #[test]
    fn external_files_disabled() {
        let mut config = Config::default();
        config.ldif.allow_external_files = false;
        let e = LdifDocument::parse_with(
            "version: 1\ndn: cn=foo\ncn:< file:///etc/hostname\n",
            &config,
            &FileResolver,
        )
        .unwrap_err();
        assert_eq!(e.reason, LdifErrorReason::ExternalFileNotAccepted);
    }

    struct Fixed;

    impl UriResolver for Fixed {
        fn resolve(&self, uri: &Url) -> Result<Vec<u8>> {
            Ok(uri.path().as_bytes().to_vec())
        }
    }

    #[test]
    fn custom_resolver() {
        let doc = LdifDocument::parse_with(
            "version: 1\ndn: cn=foo\ncn:< http://example.com/value\n",
            &Config::default(),
            &Fixed,
        )
        .unwrap();
        assert_eq!(attrs(&doc.records[0]).values("cn"), vec![&b"/value"[..]]);
    }

    // ── Group 6: round trip ─────────────────────────────────────────────

    #[test]
    fn reparse_serialized_document() {
        let source = "version: 1\n\
                      dn: cn=foo,dc=example\n\
                      cn: foo\n\
                      description:: IGxlYWRpbmcgc3BhY2U=\n\
                      sn: José\n\
                      \n\
                      dn: cn=foo,dc=example\n\
                      control: 1.2.3 true: v\n\
                      changetype: modify\n\
                      replace: sn\n\
                      sn: bar\n\
                      -\n\
                      \n\
                      dn: cn=foo,dc=example\n\
                      changetype: modrdn\n\
                      newrdn: cn=bar\n\
                      deleteoldrdn: 1\n";
        let doc = parse(source).unwrap();
        let again = parse(&doc.to_string()).unwrap();
        assert_eq!(doc, again);
        assert_eq!(again.len(), 3);
    }
}
