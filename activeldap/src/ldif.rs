//! LDIF document model: content records, change records and their
//! serialization back to RFC 2849 text.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::{Config, DEFAULT_LINE_WIDTH};
use crate::dn::Dn;
use crate::error::{Error, LdifInvalid, Result};
use crate::parseldif::{FileResolver, LdifParser, UriResolver};
use crate::print::{encode_attribute, fold_line};

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// One value of an attribute together with the options it was given
/// (`cn;lang-en: ...` has the option `lang-en`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub options: Vec<String>,
    pub value: Vec<u8>,
}

/// Attribute name to its values, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    map: BTreeMap<String, Vec<AttributeValue>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value without options.
    pub fn push(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        self.add(name, Vec::new(), value);
    }

    pub fn add(&mut self, name: &str, options: Vec<String>, value: impl Into<Vec<u8>>) {
        let key = self.key_for(name);
        self.map.entry(key).or_default().push(AttributeValue {
            options,
            value: value.into(),
        });
    }

    /// Values of `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&[AttributeValue]> {
        self.map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// The plain values of `name`, options dropped.
    pub fn values(&self, name: &str) -> Vec<&[u8]> {
        self.get(name)
            .map(|vs| vs.iter().map(|v| v.value.as_slice()).collect())
            .unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[AttributeValue])> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    // Reuse the spelling already present for a name differing only in case.
    fn key_for(&self, name: &str) -> String {
        self.map
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    fn sorted_values(values: &[AttributeValue]) -> Vec<(Vec<String>, Vec<u8>)> {
        let mut flat: Vec<(Vec<String>, Vec<u8>)> = values
            .iter()
            .map(|v| (v.options.clone(), v.value.clone()))
            .collect();
        flat.sort();
        flat
    }

    /// Names sorted, then each name's values sorted by options and value.
    pub fn encode(&self, width: usize) -> String {
        let mut out = String::new();
        for (name, values) in &self.map {
            out.push_str(&crate::print::encode_values(
                name,
                &Self::sorted_values(values),
                width,
            ));
        }
        out
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        let normalize = |attrs: &Attributes| {
            attrs
                .map
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), Self::sorted_values(v)))
                .collect::<BTreeMap<_, _>>()
        };
        normalize(self) == normalize(other)
    }
}

impl Eq for Attributes {}

// ---------------------------------------------------------------------------
// Controls and change types
// ---------------------------------------------------------------------------

/// An LDAP control attached to a change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub oid: String,
    pub criticality: Option<bool>,
    pub value: Option<Vec<u8>>,
}

impl Control {
    fn encode(&self, width: usize) -> String {
        let mut head = format!("control: {}", self.oid);
        if let Some(criticality) = self.criticality {
            head.push_str(if criticality { " true" } else { " false" });
        }
        match &self.value {
            Some(value) => encode_attribute(&head, value, width),
            None => fold_line(&head, width),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Add,
    Delete,
    Modify,
    ModDn,
    ModRdn,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Add => "add",
            ChangeType::Delete => "delete",
            ChangeType::Modify => "modify",
            ChangeType::ModDn => "moddn",
            ChangeType::ModRdn => "modrdn",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(ChangeType::Add),
            "delete" => Ok(ChangeType::Delete),
            "modify" => Ok(ChangeType::Modify),
            "moddn" => Ok(ChangeType::ModDn),
            "modrdn" => Ok(ChangeType::ModRdn),
            _ => Err(Error::InvalidArgument(format!("unknown change type: {}", s))),
        }
    }
}

// ---------------------------------------------------------------------------
// Modify operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifyKind {
    Add,
    Delete,
    Replace,
}

impl ModifyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifyKind::Add => "add",
            ModifyKind::Delete => "delete",
            ModifyKind::Replace => "replace",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(ModifyKind::Add),
            "delete" => Some(ModifyKind::Delete),
            "replace" => Some(ModifyKind::Replace),
            _ => None,
        }
    }
}

/// One `add:`/`delete:`/`replace:` block of a modify record.  A delete
/// with no values removes the whole attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: ModifyKind,
    pub attribute: String,
    pub options: Vec<String>,
    pub attributes: Attributes,
}

impl Operation {
    pub fn new(kind: ModifyKind, attribute: &str) -> Self {
        Operation {
            kind,
            attribute: attribute.to_string(),
            options: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// `attribute` with its options, as written after the kind.
    pub fn full_attribute_name(&self) -> String {
        let mut name = self.attribute.clone();
        for option in &self.options {
            name.push(';');
            name.push_str(option);
        }
        name
    }

    fn encode(&self, width: usize) -> String {
        let mut out = encode_attribute(
            self.kind.as_str(),
            self.full_attribute_name().as_bytes(),
            width,
        );
        out.push_str(&self.attributes.encode(width));
        out.push_str("-\n");
        out
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub dn: Dn,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRecord {
    pub dn: Dn,
    pub controls: Vec<Control>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRecord {
    pub dn: Dn,
    pub controls: Vec<Control>,
}

/// Body of both `moddn` and `modrdn` records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyNameRecord {
    pub dn: Dn,
    pub controls: Vec<Control>,
    pub new_rdn: String,
    pub delete_old_rdn: bool,
    pub new_superior: Option<Dn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyRecord {
    pub dn: Dn,
    pub controls: Vec<Control>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Content(ContentRecord),
    Add(AddRecord),
    Delete(DeleteRecord),
    ModifyDn(ModifyNameRecord),
    ModifyRdn(ModifyNameRecord),
    Modify(ModifyRecord),
}

impl Record {
    pub fn dn(&self) -> &Dn {
        match self {
            Record::Content(r) => &r.dn,
            Record::Add(r) => &r.dn,
            Record::Delete(r) => &r.dn,
            Record::ModifyDn(r) | Record::ModifyRdn(r) => &r.dn,
            Record::Modify(r) => &r.dn,
        }
    }

    /// Controls of a change record; content records have none.
    pub fn controls(&self) -> &[Control] {
        match self {
            Record::Content(_) => &[],
            Record::Add(r) => &r.controls,
            Record::Delete(r) => &r.controls,
            Record::ModifyDn(r) | Record::ModifyRdn(r) => &r.controls,
            Record::Modify(r) => &r.controls,
        }
    }

    /// None for content records.
    pub fn change_type(&self) -> Option<ChangeType> {
        match self {
            Record::Content(_) => None,
            Record::Add(_) => Some(ChangeType::Add),
            Record::Delete(_) => Some(ChangeType::Delete),
            Record::ModifyDn(_) => Some(ChangeType::ModDn),
            Record::ModifyRdn(_) => Some(ChangeType::ModRdn),
            Record::Modify(_) => Some(ChangeType::Modify),
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, Record::Content(_))
    }

    /// Attributes of content and add records.
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Record::Content(r) => Some(&r.attributes),
            Record::Add(r) => Some(&r.attributes),
            _ => None,
        }
    }

    /// Serialize, folding lines at `width`.
    pub fn to_ldif(&self, width: usize) -> String {
        let mut out = encode_attribute("dn", self.dn().to_string().as_bytes(), width);
        for control in self.controls() {
            out.push_str(&control.encode(width));
        }
        if let Some(change_type) = self.change_type() {
            out.push_str(&fold_line(&format!("changetype: {}", change_type), width));
        }
        match self {
            Record::Content(r) => out.push_str(&r.attributes.encode(width)),
            Record::Add(r) => out.push_str(&r.attributes.encode(width)),
            Record::Delete(_) => {}
            Record::ModifyDn(r) | Record::ModifyRdn(r) => {
                out.push_str(&encode_attribute("newrdn", r.new_rdn.as_bytes(), width));
                let delete_old_rdn = if r.delete_old_rdn { "1" } else { "0" };
                out.push_str(&fold_line(&format!("deleteoldrdn: {}", delete_old_rdn), width));
                if let Some(superior) = &r.new_superior {
                    out.push_str(&encode_attribute(
                        "newsuperior",
                        superior.to_string().as_bytes(),
                        width,
                    ));
                }
            }
            Record::Modify(r) => {
                for operation in &r.operations {
                    out.push_str(&operation.encode(width));
                }
            }
        }
        out
    }

    /// Apply this record through `operator`.  Content records are added.
    pub fn load(&self, operator: &mut dyn Operator) -> Result<()> {
        tracing::debug!(dn = %self.dn(), change_type = ?self.change_type(), "loading LDIF record");
        match self {
            Record::Content(r) => operator.add_entry(&r.dn, &r.attributes, &[]),
            Record::Add(r) => operator.add_entry(&r.dn, &r.attributes, &r.controls),
            Record::Delete(r) => operator.delete_entry(&r.dn, &r.controls),
            Record::ModifyDn(r) | Record::ModifyRdn(r) => operator.modify_rdn_entry(
                &r.dn,
                &r.new_rdn,
                r.delete_old_rdn,
                r.new_superior.as_ref(),
                &r.controls,
            ),
            Record::Modify(r) => operator.modify_entry(&r.dn, &r.operations, &r.controls),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldif(DEFAULT_LINE_WIDTH))
    }
}

/// Receiver of change records, usually a directory connection.
pub trait Operator {
    fn add_entry(&mut self, dn: &Dn, attributes: &Attributes, controls: &[Control]) -> Result<()>;

    fn delete_entry(&mut self, dn: &Dn, controls: &[Control]) -> Result<()>;

    fn modify_entry(
        &mut self,
        dn: &Dn,
        operations: &[Operation],
        controls: &[Control],
    ) -> Result<()>;

    fn modify_rdn_entry(
        &mut self,
        dn: &Dn,
        new_rdn: &str,
        delete_old_rdn: bool,
        new_superior: Option<&Dn>,
        controls: &[Control],
    ) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LdifDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LdifDocument {
    pub records: Vec<Record>,
}

impl LdifDocument {
    pub fn new(records: Vec<Record>) -> Self {
        LdifDocument { records }
    }

    /// Parse with the default configuration, resolving `file://` URIs
    /// from the local filesystem.
    pub fn parse(source: &str) -> std::result::Result<LdifDocument, LdifInvalid> {
        Self::parse_with(source, &Config::default(), &FileResolver)
    }

    pub fn parse_with(
        source: &str,
        config: &Config,
        resolver: &dyn UriResolver,
    ) -> std::result::Result<LdifDocument, LdifInvalid> {
        LdifParser::new(source, &config.ldif, resolver).parse()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Serialize with the configured line width.
    pub fn to_ldif(&self, config: &Config) -> String {
        let body: Vec<String> = self
            .records
            .iter()
            .map(|r| r.to_ldif(config.ldif.line_width))
            .collect();
        fold_line("version: 1", config.ldif.line_width) + &body.join("\n")
    }

    /// Apply every record in order, stopping at the first failure.
    pub fn load(&self, operator: &mut dyn Operator) -> Result<()> {
        for record in &self.records {
            record.load(operator)?;
        }
        Ok(())
    }
}

impl fmt::Display for LdifDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ldif(&Config::default()))
    }
}

impl FromStr for LdifDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(LdifDocument::parse(s)?)
    }
}

impl<'a> IntoIterator for &'a LdifDocument {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
