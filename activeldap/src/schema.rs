//! Directory schema, parsed on demand from the subschema subentry.
//!
//! A [`Schema`] holds the raw RFC 4512 definition strings of each group
//! (`attributeTypes`, `objectClasses`, ...).  A lookup parses definitions in
//! list order only until the requested id or name turns up; everything
//! parsed on the way is cached, the rest stays untouched for later lookups.
//! Typed views and derived answers are memoized for the life of the schema.
//!
//! The caches use `RefCell`, so a `Schema` cannot be shared between threads
//! without an outer lock.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use ldap3::SearchEntry;

use crate::syntaxes::{self, Syntax, Value};

/// Field name (uppercased, e.g. `NAME`, `SUP`, `SINGLE-VALUE`) to values.
/// Flags without a value are stored as `["TRUE"]`.
pub type FieldTable = BTreeMap<String, Vec<String>>;

pub const OBJECT_CLASSES: &str = "objectClasses";
pub const ATTRIBUTE_TYPES: &str = "attributeTypes";
pub const LDAP_SYNTAXES: &str = "ldapSyntaxes";
pub const DIT_CONTENT_RULES: &str = "dITContentRules";
pub const MATCHING_RULES: &str = "matchingRules";
pub const MATCHING_RULE_USE: &str = "matchingRuleUse";

const INET_ORG_PERSON_OID: &str = "2.16.840.1.113730.3.2.2";

const KNOWN_GROUPS: [&str; 6] = [
    OBJECT_CLASSES,
    ATTRIBUTE_TYPES,
    LDAP_SYNTAXES,
    DIT_CONTENT_RULES,
    MATCHING_RULES,
    MATCHING_RULE_USE,
];

/// Keywords that never stand for a bare value.
const RESERVED_KEYWORDS: &[&str] = &[
    "NAME",
    "DESC",
    "OBSOLETE",
    "SUP",
    "EQUALITY",
    "ORDERING",
    "SUBSTR",
    "SYNTAX",
    "SINGLE-VALUE",
    "COLLECTIVE",
    "NO-USER-MODIFICATION",
    "USAGE",
    "ABSTRACT",
    "STRUCTURAL",
    "AUXILIARY",
    "MUST",
    "MAY",
    "AUX",
    "NOT",
    "APPLIES",
];

/// Guard against `SUP` cycles when inheriting a syntax.
const MAX_SUPERIOR_DEPTH: usize = 16;

// ---------------------------------------------------------------------------
// RFC 4512 definition parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Dollar,
    Quoted(String),
    Word(String),
}

/// Tokenizer for RFC 4512 schema definitions.
struct SchemaTokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SchemaTokenizer<'a> {
    fn new(input: &'a str) -> Self {
        SchemaTokenizer { input, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Tokens: '(', ')', '$', quoted strings 'name', or bare words.
    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let input = self.input;
        let rest = &input[self.pos..];
        let c = rest.chars().next()?;
        match c {
            '(' | ')' | '$' => {
                self.pos += 1;
                Some(match c {
                    '(' => Token::Open,
                    ')' => Token::Close,
                    _ => Token::Dollar,
                })
            }
            '\'' => {
                let body = &rest[1..];
                let len = body.find('\'').unwrap_or(body.len());
                // skip both quotes; an unterminated string runs to the end
                self.pos = (self.pos + len + 2).min(input.len());
                Some(Token::Quoted(unescape_qdstring(&body[..len])))
            }
            _ => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || "()'$".contains(c))
                    .unwrap_or(rest.len());
                self.pos += len;
                Some(Token::Word(rest[..len].to_string()))
            }
        }
    }

    fn peek_token(&mut self) -> Option<Token> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token
    }

    /// Values of a parenthesized list, the '(' already consumed.  Both
    /// `( a $ b )` and `( 'a' 'b' )` forms are accepted.
    fn read_list(&mut self) -> Vec<String> {
        let mut values = Vec::new();
        while let Some(token) = self.next_token() {
            match token {
                Token::Close => break,
                Token::Open | Token::Dollar => {}
                Token::Quoted(s) | Token::Word(s) => values.push(s),
            }
        }
        values
    }
}

/// `\27` and `\5C` escapes of a qdstring.
fn unescape_qdstring(raw: &str) -> String {
    raw.replace("\\27", "'")
        .replace("\\5C", "\\")
        .replace("\\5c", "\\")
}

fn is_field_name(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '-' || c == '_')
}

fn is_keyword(word: &str) -> bool {
    RESERVED_KEYWORDS.contains(&word) || word.starts_with("X-")
}

/// Parse `( id FIELD value ... )` into the id and its fields.  None when
/// the definition is not wrapped in parentheses or has no id.
fn parse_definition(definition: &str) -> Option<(String, FieldTable)> {
    let mut tok = SchemaTokenizer::new(definition);
    if tok.next_token()? != Token::Open {
        return None;
    }
    let Token::Word(id) = tok.next_token()? else {
        return None;
    };

    let mut fields = FieldTable::new();
    loop {
        match tok.next_token()? {
            Token::Close => break,
            Token::Word(word) if is_field_name(&word) => {
                let values = match tok.peek_token() {
                    Some(Token::Open) => {
                        tok.next_token();
                        tok.read_list()
                    }
                    Some(Token::Quoted(s)) => {
                        tok.next_token();
                        vec![s]
                    }
                    Some(Token::Word(w)) if !is_keyword(&w) => {
                        tok.next_token();
                        vec![w]
                    }
                    _ => vec!["TRUE".to_string()],
                };
                fields
                    .entry(word.to_ascii_uppercase().replace('_', "-"))
                    .or_default()
                    .extend(values);
            }
            // stray token between fields
            _ => {}
        }
    }
    if tok.next_token().is_some() {
        return None;
    }
    Some((id, fields))
}

/// Lowercase, without `;options`.
fn normalize_name(name: &str) -> String {
    name.split(';').next().unwrap_or(name).to_ascii_lowercase()
}

fn normalize_group(group: &str) -> String {
    KNOWN_GROUPS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(group))
        .map(|known| known.to_string())
        .unwrap_or_else(|| group.to_string())
}

/// `1.2.3{32}` -> (`1.2.3`, Some(32))
fn split_syntax_length(spec: &str) -> (String, Option<usize>) {
    match spec.split_once('{') {
        Some((oid, rest)) => (
            oid.trim().to_string(),
            rest.trim_end_matches('}').trim().parse().ok(),
        ),
        None => (spec.trim().to_string(), None),
    }
}

fn push_unique(list: &mut Vec<String>, values: impl IntoIterator<Item = String>) {
    for value in values {
        if !list.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
            list.push(value);
        }
    }
}

// ---------------------------------------------------------------------------
// Group -- one list of definitions with its parse cursor
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Group {
    definitions: Vec<String>,
    /// `definitions[..cursor]` have been parsed.
    cursor: usize,
    tables: HashMap<String, Rc<FieldTable>>,
    /// ids in parse order
    order: Vec<String>,
    /// normalized name or id -> id
    aliases: HashMap<String, String>,
}

impl Group {
    fn cached(&self, id_or_name: &str) -> Option<(String, Rc<FieldTable>)> {
        if let Some(table) = self.tables.get(id_or_name) {
            return Some((id_or_name.to_string(), table.clone()));
        }
        let id = self.aliases.get(&normalize_name(id_or_name))?;
        self.tables.get(id).map(|table| (id.clone(), table.clone()))
    }

    fn find(&mut self, id_or_name: &str) -> Option<(String, Rc<FieldTable>)> {
        loop {
            if let Some(found) = self.cached(id_or_name) {
                return Some(found);
            }
            if !self.parse_next() {
                return None;
            }
        }
    }

    /// Parse the next pending definition.  False when none is left.
    fn parse_next(&mut self) -> bool {
        let Some(definition) = self.definitions.get(self.cursor).cloned() else {
            return false;
        };
        self.cursor += 1;

        let Some((id, fields)) = parse_definition(&definition) else {
            tracing::warn!(definition = %definition, "skipping malformed schema definition");
            return true;
        };
        tracing::trace!(id = %id, "parsed schema definition");
        for name in fields.get("NAME").into_iter().flatten() {
            self.aliases.insert(normalize_name(name), id.clone());
        }
        self.aliases.insert(normalize_name(&id), id.clone());
        if !self.tables.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.tables.insert(id, Rc::new(fields));
        true
    }

    fn parse_all(&mut self) {
        while self.parse_next() {}
    }
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClassKind {
    Abstract,
    Structural,
    Auxiliary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    /// None when the schema does not define the attribute.
    pub id: Option<String>,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub super_attribute: Option<String>,
    /// Syntax OID, own or inherited through `SUP`
    pub syntax: Option<String>,
    pub syntax_length: Option<usize>,
    pub read_only: bool,
    pub single_value: bool,
    pub binary: bool,
    pub binary_required: bool,
    pub directory_operation: bool,
}

impl AttributeType {
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// The syntax implementation, when the OID is one we know.
    pub fn caster(&self) -> Option<&'static dyn Syntax> {
        self.syntax.as_deref().and_then(syntaxes::get)
    }

    pub fn type_cast(&self, raw: &[u8]) -> Value {
        match self.caster() {
            Some(syntax) => syntax.type_cast(raw),
            None => Value::raw(raw),
        }
    }

    pub fn validate(&self, value: &Value) -> Option<String> {
        self.caster().and_then(|syntax| syntax.validate(value))
    }

    /// Every name the attribute answers to.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(|s| s.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectClass {
    pub id: Option<String>,
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub kind: ObjectClassKind,
    pub super_classes: Vec<String>,
    /// Own MUST, including DIT content rule additions
    pub must: Vec<String>,
    pub may: Vec<String>,
    /// MUST and MAY merged over the whole superclass chain
    pub all_must: Vec<String>,
    pub all_may: Vec<String>,
}

impl ObjectClass {
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapSyntax {
    pub id: String,
    pub length: Option<usize>,
    pub description: Option<String>,
    pub binary_transfer_required: bool,
    pub human_readable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassAttributes {
    pub must: Vec<String>,
    pub may: Vec<String>,
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Cache {
    attributes: HashMap<String, Rc<AttributeType>>,
    object_classes: HashMap<String, Rc<ObjectClass>>,
    ldap_syntaxes: HashMap<String, Rc<LdapSyntax>>,
    class_attributes: HashMap<String, Rc<ClassAttributes>>,
}

#[derive(Debug, Default)]
pub struct Schema {
    groups: RefCell<HashMap<String, Group>>,
    cache: RefCell<Cache>,
}

impl Schema {
    /// Build from group name -> raw definitions.  Group names are matched
    /// case-insensitively against the standard ones.
    pub fn new<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut groups: HashMap<String, Group> = HashMap::new();
        for (group, definitions) in entries {
            groups
                .entry(normalize_group(group.as_ref()))
                .or_default()
                .definitions
                .extend(definitions);
        }
        Schema {
            groups: RefCell::new(groups),
            cache: RefCell::new(Cache::default()),
        }
    }

    /// Build from the subschema subentry as returned by a search.
    pub fn from_search_entry(entry: &SearchEntry) -> Self {
        let text = entry
            .attrs
            .iter()
            .map(|(name, values)| (name.clone(), values.clone()));
        let binary = entry.bin_attrs.iter().map(|(name, values)| {
            let values = values
                .iter()
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .collect();
            (name.clone(), values)
        });
        tracing::debug!(dn = %entry.dn, "loading schema from subschema subentry");
        Schema::new(text.chain(binary))
    }

    fn lookup(&self, group: &str, id_or_name: &str) -> Option<(String, Rc<FieldTable>)> {
        let mut groups = self.groups.borrow_mut();
        let Some(group_entries) = groups.get_mut(&normalize_group(group)) else {
            tracing::debug!(group, "unknown schema group");
            return None;
        };
        let found = group_entries.find(id_or_name);
        if found.is_none() {
            tracing::debug!(group, name = id_or_name, "no schema definition");
        }
        found
    }

    /// Parsed fields of a definition.  Empty when the id or name is unknown.
    pub fn entry(&self, group: &str, id_or_name: &str) -> Rc<FieldTable> {
        self.lookup(group, id_or_name)
            .map(|(_, table)| table)
            .unwrap_or_default()
    }

    /// Values of one field; empty when absent.
    pub fn fetch(&self, group: &str, id_or_name: &str, field: &str) -> Vec<String> {
        self.entry(group, id_or_name)
            .get(&field.to_ascii_uppercase())
            .cloned()
            .unwrap_or_default()
    }

    pub fn exist_name(&self, group: &str, name: &str) -> bool {
        self.lookup(group, name).is_some()
    }

    /// The primary name of a definition, or its id when it has no name.
    pub fn resolve_name(&self, group: &str, name: &str) -> Option<String> {
        let (id, table) = self.lookup(group, name)?;
        Some(
            table
                .get("NAME")
                .and_then(|names| names.first().cloned())
                .unwrap_or(id),
        )
    }

    /// All ids of a group in definition order.  Parses the whole group.
    pub fn ids(&self, group: &str) -> Vec<String> {
        let mut groups = self.groups.borrow_mut();
        match groups.get_mut(&normalize_group(group)) {
            Some(g) => {
                g.parse_all();
                g.order.clone()
            }
            None => Vec::new(),
        }
    }

    /// All names of a group in definition order.  Parses the whole group.
    pub fn names(&self, group: &str) -> Vec<String> {
        let mut groups = self.groups.borrow_mut();
        let Some(g) = groups.get_mut(&normalize_group(group)) else {
            return Vec::new();
        };
        g.parse_all();
        g.order
            .iter()
            .filter_map(|id| g.tables.get(id))
            .flat_map(|table| table.get("NAME").cloned().unwrap_or_default())
            .collect()
    }

    // -- attribute types ----------------------------------------------------

    pub fn attribute(&self, name: &str) -> Rc<AttributeType> {
        self.attribute_at_depth(name, 0)
    }

    fn attribute_at_depth(&self, name: &str, depth: usize) -> Rc<AttributeType> {
        let key = normalize_name(name);
        let cached = self.cache.borrow().attributes.get(&key).cloned();
        if let Some(attribute) = cached {
            return attribute;
        }
        let built = Rc::new(self.build_attribute(name, depth));
        self.cache
            .borrow_mut()
            .attributes
            .insert(key, built.clone());
        built
    }

    fn build_attribute(&self, name: &str, depth: usize) -> AttributeType {
        let found = self.lookup(ATTRIBUTE_TYPES, name);
        let (id, fields) = match found {
            Some((id, fields)) => (Some(id), fields),
            None => (None, Rc::default()),
        };
        let first = |field: &str| fields.get(field).and_then(|v| v.first()).cloned();
        let flag = |field: &str| fields.contains_key(field);

        let mut names = fields.get("NAME").cloned().unwrap_or_default();
        let primary = if names.is_empty() {
            id.clone().unwrap_or_else(|| name.to_string())
        } else {
            names.remove(0)
        };

        let super_attribute = first("SUP");
        let (syntax, syntax_length) = match first("SYNTAX") {
            Some(spec) => {
                let (oid, length) = split_syntax_length(&spec);
                (Some(oid), length)
            }
            None => match &super_attribute {
                Some(sup) if depth < MAX_SUPERIOR_DEPTH => {
                    let parent = self.attribute_at_depth(sup, depth + 1);
                    (parent.syntax.clone(), parent.syntax_length)
                }
                _ => (None, None),
            },
        };

        let (binary, binary_required) = match &syntax {
            Some(oid) => {
                let ldap_syntax = self.ldap_syntax(oid);
                (
                    ldap_syntax.binary_transfer_required || !ldap_syntax.human_readable,
                    ldap_syntax.binary_transfer_required,
                )
            }
            None => (false, false),
        };

        AttributeType {
            id,
            name: primary,
            aliases: names,
            description: first("DESC"),
            super_attribute,
            syntax,
            syntax_length,
            read_only: flag("NO-USER-MODIFICATION"),
            single_value: flag("SINGLE-VALUE"),
            binary,
            binary_required,
            directory_operation: first("USAGE")
                .is_some_and(|usage| usage.eq_ignore_ascii_case("directoryOperation")),
        }
    }

    pub fn binary(&self, name: &str) -> bool {
        self.attribute(name).binary
    }

    pub fn binary_required(&self, name: &str) -> bool {
        self.attribute(name).binary_required
    }

    pub fn read_only(&self, name: &str) -> bool {
        self.attribute(name).read_only
    }

    pub fn single_value(&self, name: &str) -> bool {
        self.attribute(name).single_value
    }

    /// Type-cast `raw` with the attribute's syntax.  Unknown attributes and
    /// syntaxes pass the value through.
    pub fn attribute_type_value_cast(&self, name: &str, raw: &[u8]) -> Value {
        self.attribute(name).type_cast(raw)
    }

    pub fn validate_value(&self, name: &str, value: &Value) -> Option<String> {
        self.attribute(name).validate(value)
    }

    // -- LDAP syntaxes ------------------------------------------------------

    /// Accepts a `{length}` suffix on `id`.  Syntaxes missing from the
    /// schema fall back to what the built-in syntax knows.
    pub fn ldap_syntax(&self, id: &str) -> Rc<LdapSyntax> {
        let key = id.trim().to_string();
        let cached = self.cache.borrow().ldap_syntaxes.get(&key).cloned();
        if let Some(syntax) = cached {
            return syntax;
        }

        let (oid, length) = split_syntax_length(id);
        let fields = self.entry(LDAP_SYNTAXES, &oid);
        let builtin = syntaxes::get(&oid);
        let is_true = |field: &str| {
            fields
                .get(field)
                .is_some_and(|v| v.iter().any(|x| x.eq_ignore_ascii_case("TRUE")))
        };
        let human_readable = if fields.contains_key("X-NOT-HUMAN-READABLE") {
            !is_true("X-NOT-HUMAN-READABLE")
        } else {
            !builtin.is_some_and(|s| s.binary())
        };
        let syntax = Rc::new(LdapSyntax {
            description: fields
                .get("DESC")
                .and_then(|v| v.first().cloned())
                .or_else(|| builtin.map(|s| s.description().to_string())),
            binary_transfer_required: is_true("X-BINARY-TRANSFER-REQUIRED"),
            human_readable,
            id: oid,
            length,
        });
        self.cache
            .borrow_mut()
            .ldap_syntaxes
            .insert(key, syntax.clone());
        syntax
    }

    // -- object classes -----------------------------------------------------

    pub fn object_class(&self, name: &str) -> Rc<ObjectClass> {
        let key = normalize_name(name);
        let cached = self.cache.borrow().object_classes.get(&key).cloned();
        if let Some(class) = cached {
            return class;
        }

        let (id, fields) = match self.lookup(OBJECT_CLASSES, name) {
            Some((id, fields)) => (Some(id), fields),
            None => (None, Rc::default()),
        };
        let mut names = fields.get("NAME").cloned().unwrap_or_default();
        let primary = if names.is_empty() {
            id.clone().unwrap_or_else(|| name.to_string())
        } else {
            names.remove(0)
        };
        let kind = if fields.contains_key("ABSTRACT") {
            ObjectClassKind::Abstract
        } else if fields.contains_key("AUXILIARY") {
            ObjectClassKind::Auxiliary
        } else {
            ObjectClassKind::Structural
        };
        let (must, may) = self.own_attributes(name);
        let all = self.class_attributes(name);

        let class = Rc::new(ObjectClass {
            id,
            name: primary,
            aliases: names,
            description: fields.get("DESC").and_then(|v| v.first().cloned()),
            kind,
            super_classes: fields.get("SUP").cloned().unwrap_or_default(),
            must,
            may,
            all_must: all.must.clone(),
            all_may: all.may.clone(),
        });
        self.cache
            .borrow_mut()
            .object_classes
            .insert(key, class.clone());
        class
    }

    /// MUST and MAY of one class, plus what its DIT content rule adds.
    fn own_attributes(&self, name: &str) -> (Vec<String>, Vec<String>) {
        let Some((id, fields)) = self.lookup(OBJECT_CLASSES, name) else {
            return (Vec::new(), Vec::new());
        };
        let mut must = fields.get("MUST").cloned().unwrap_or_default();
        let mut may = fields.get("MAY").cloned().unwrap_or_default();
        if let Some((_, rule)) = self.lookup(DIT_CONTENT_RULES, &id) {
            push_unique(&mut must, rule.get("MUST").cloned().unwrap_or_default());
            push_unique(&mut may, rule.get("MAY").cloned().unwrap_or_default());
        }
        (must, may)
    }

    /// MUST and MAY of `name` merged with those of every superclass,
    /// breadth first, without duplicates.
    pub fn class_attributes(&self, name: &str) -> Rc<ClassAttributes> {
        let key = normalize_name(name);
        let cached = self.cache.borrow().class_attributes.get(&key).cloned();
        if let Some(attributes) = cached {
            return attributes;
        }

        let mut result = ClassAttributes::default();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(class) = queue.pop_front() {
            let identity = self
                .lookup(OBJECT_CLASSES, &class)
                .map(|(id, _)| id)
                .unwrap_or_else(|| normalize_name(&class));
            if !seen.insert(identity) {
                continue;
            }
            let (must, may) = self.own_attributes(&class);
            push_unique(&mut result.must, must);
            push_unique(&mut result.may, may);
            queue.extend(self.fetch(OBJECT_CLASSES, &class, "SUP"));
        }
        let requested = self.lookup(OBJECT_CLASSES, name).map(|(id, _)| id);
        if key == "inetorgperson" || requested.as_deref() == Some(INET_ORG_PERSON_OID) {
            for attribute in result.may.iter_mut() {
                if attribute == "x500uniqueIdentifier" {
                    *attribute = "x500UniqueIdentifier".to_string();
                }
            }
        }

        let result = Rc::new(result);
        self.cache
            .borrow_mut()
            .class_attributes
            .insert(key, result.clone());
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn defs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn make_test_schema() -> Schema {
        Schema::new(vec![
            (
                "attributetypes",
                defs(&[
                    "( 2.5.4.0 NAME 'objectClass' SYNTAX 1.3.6.1.4.1.1466.115.121.1.38 )",
                    "( 2.5.4.41 NAME 'name' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{32768} )",
                    "( 2.5.4.3 NAME ( 'cn' 'commonName' ) DESC 'common name' SUP name )",
                    "( 2.5.4.4 NAME ( 'sn' 'surname' ) SUP name )",
                    "( 0.9.2342.19200300.100.1.60 NAME 'jpegPhoto' \
                     SYNTAX 1.3.6.1.4.1.1466.115.121.1.28 )",
                    "( 2.5.18.1 NAME 'createTimestamp' SYNTAX 1.3.6.1.4.1.1466.115.121.1.24 \
                     SINGLE-VALUE NO-USER-MODIFICATION USAGE directoryOperation )",
                    "( 1.3.6.1.1.1.1.0 NAME 'uidNumber' \
                     SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )",
                    "( 2.5.4.36 NAME 'userCertificate' SYNTAX 1.3.6.1.4.1.1466.115.121.1.8 )",
                ]),
            ),
            (
                "objectClasses",
                defs(&[
                    "( 2.5.6.0 NAME 'top' ABSTRACT MUST objectClass )",
                    "( 2.5.6.6 NAME 'person' SUP top STRUCTURAL MUST ( sn $ cn ) \
                     MAY ( userPassword $ telephoneNumber $ seeAlso $ description ) )",
                    "( 2.5.6.7 NAME 'organizationalPerson' SUP person STRUCTURAL \
                     MAY ( title $ ou $ description ) )",
                    "( 2.16.840.1.113730.3.2.2 NAME 'inetOrgPerson' SUP organizationalPerson \
                     STRUCTURAL MAY ( jpegPhoto $ x500uniqueIdentifier ) )",
                    "( 1.3.6.1.1.1.2.0 NAME 'posixAccount' SUP top AUXILIARY \
                     MUST ( cn $ uid $ uidNumber ) )",
                ]),
            ),
            (
                "ldapSyntaxes",
                defs(&[
                    "( 1.3.6.1.4.1.1466.115.121.1.8 DESC 'Certificate' \
                     X-BINARY-TRANSFER-REQUIRED 'TRUE' X-NOT-HUMAN-READABLE 'TRUE' )",
                    "( 1.3.6.1.4.1.1466.115.121.1.15 DESC 'Directory String' )",
                ]),
            ),
            (
                "dITContentRules",
                defs(&["( 2.5.6.6 NAME 'person' AUX posixAccount MAY ( uid ) )"]),
            ),
        ])
    }

    // -- Group 1: definition parsing --

    #[test]
    fn parse_definition_fields() {
        let (id, fields) = parse_definition(
            "( 2.5.4.3 NAME ( 'cn' 'commonName' ) DESC 'common name' SUP name \
             SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{32768} SINGLE-VALUE X-ORIGIN 'RFC 4519' )",
        )
        .unwrap();
        assert_eq!(id, "2.5.4.3");
        assert_eq!(fields["NAME"], vec!["cn", "commonName"]);
        assert_eq!(fields["SUP"], vec!["name"]);
        assert_eq!(fields["SYNTAX"], vec!["1.3.6.1.4.1.1466.115.121.1.15{32768}"]);
        assert_eq!(fields["SINGLE-VALUE"], vec!["TRUE"]);
        assert_eq!(fields["X-ORIGIN"], vec!["RFC 4519"]);
    }

    #[test]
    fn parse_definition_dollar_lists_and_flags() {
        let (_, fields) =
            parse_definition("( 2.5.6.0 NAME 'top' ABSTRACT MUST ( objectClass $ cn ) )").unwrap();
        assert_eq!(fields["ABSTRACT"], vec!["TRUE"]);
        assert_eq!(fields["MUST"], vec!["objectClass", "cn"]);
    }

    #[test]
    fn parse_definition_escapes() {
        let (_, fields) = parse_definition("( 1.2.3 DESC 'O\\27Brien \\5C' )").unwrap();
        assert_eq!(fields["DESC"], vec!["O'Brien \\"]);
    }

    #[test]
    fn parse_definition_malformed() {
        assert!(parse_definition("2.5.4.3 NAME 'cn'").is_none());
        assert!(parse_definition("( 2.5.4.3 NAME 'cn'").is_none());
        assert!(parse_definition("( )").is_none());
        assert!(parse_definition("( 1.2.3 ) trailing").is_none());
    }

    // -- Group 2: lazy lookups --

    #[test]
    fn lookup_parses_only_what_it_needs() {
        let schema = make_test_schema();
        assert_eq!(schema.fetch(ATTRIBUTE_TYPES, "cn", "DESC"), vec!["common name"]);
        {
            let groups = schema.groups.borrow();
            let group = &groups[ATTRIBUTE_TYPES];
            assert_eq!(group.cursor, 3);
            assert_eq!(group.order, vec!["2.5.4.0", "2.5.4.41", "2.5.4.3"]);
        }
        // already parsed definitions answer without moving the cursor
        assert!(schema.exist_name(ATTRIBUTE_TYPES, "objectclass"));
        assert_eq!(schema.groups.borrow()[ATTRIBUTE_TYPES].cursor, 3);
        // later definitions are still reachable
        assert!(schema.exist_name(ATTRIBUTE_TYPES, "userCertificate"));
        assert_eq!(schema.groups.borrow()[ATTRIBUTE_TYPES].cursor, 8);
    }

    #[test]
    fn lookup_by_oid_alias_and_option() {
        let schema = make_test_schema();
        assert_eq!(schema.resolve_name(ATTRIBUTE_TYPES, "2.5.4.3").unwrap(), "cn");
        assert_eq!(schema.resolve_name(ATTRIBUTE_TYPES, "COMMONNAME").unwrap(), "cn");
        assert_eq!(schema.resolve_name(ATTRIBUTE_TYPES, "cn;lang-en").unwrap(), "cn");
    }

    #[test]
    fn unknown_names_and_groups_are_empty() {
        let schema = make_test_schema();
        assert!(schema.entry(ATTRIBUTE_TYPES, "noSuchAttr").is_empty());
        assert!(schema.fetch("noSuchGroup", "cn", "NAME").is_empty());
        assert!(!schema.exist_name(OBJECT_CLASSES, "noSuchClass"));
        assert!(schema.resolve_name(OBJECT_CLASSES, "noSuchClass").is_none());
    }

    #[test]
    fn malformed_definitions_are_skipped() {
        let schema = Schema::new(vec![(
            ATTRIBUTE_TYPES,
            defs(&["garbage", "( 1.2.3 NAME 'fine' )"]),
        )]);
        assert!(schema.exist_name(ATTRIBUTE_TYPES, "fine"));
        assert_eq!(schema.ids(ATTRIBUTE_TYPES), vec!["1.2.3"]);
    }

    #[test]
    fn names_and_ids() {
        let schema = make_test_schema();
        assert_eq!(
            schema.ids(OBJECT_CLASSES),
            vec![
                "2.5.6.0",
                "2.5.6.6",
                "2.5.6.7",
                "2.16.840.1.113730.3.2.2",
                "1.3.6.1.1.1.2.0"
            ]
        );
        let names = schema.names(ATTRIBUTE_TYPES);
        assert!(names.contains(&"commonName".to_string()));
        assert_eq!(names.len(), 10);
    }

    // -- Group 3: attribute types --

    #[test]
    fn attribute_type_view() {
        let schema = make_test_schema();
        let cn = schema.attribute("commonName");
        assert_eq!(cn.id.as_deref(), Some("2.5.4.3"));
        assert_eq!(cn.name, "cn");
        assert_eq!(cn.aliases, vec!["commonName"]);
        assert_eq!(cn.super_attribute.as_deref(), Some("name"));
        // inherited from `name`
        assert_eq!(cn.syntax.as_deref(), Some("1.3.6.1.4.1.1466.115.121.1.15"));
        assert_eq!(cn.syntax_length, Some(32768));
        assert!(!cn.single_value);
        assert!(!cn.binary);
    }

    #[test]
    fn attribute_predicates() {
        let schema = make_test_schema();
        assert!(schema.single_value("createTimestamp"));
        assert!(schema.read_only("createTimestamp"));
        assert!(schema.attribute("createTimestamp").directory_operation);
        assert!(!schema.read_only("cn"));
        assert!(schema.binary("jpegPhoto"));
        assert!(!schema.binary_required("jpegPhoto"));
        assert!(schema.binary("userCertificate"));
        assert!(schema.binary_required("userCertificate"));
    }

    #[test]
    fn attribute_views_are_memoized() {
        let schema = make_test_schema();
        let a = schema.attribute("cn");
        let b = schema.attribute("CN");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn unknown_attribute() {
        let schema = make_test_schema();
        let attr = schema.attribute("noSuchAttr");
        assert!(!attr.exists());
        assert_eq!(attr.name, "noSuchAttr");
        assert!(attr.caster().is_none());
        assert_eq!(
            schema.attribute_type_value_cast("noSuchAttr", b"x"),
            Value::from("x")
        );
    }

    #[test]
    fn value_cast_and_validate() {
        let schema = make_test_schema();
        assert_eq!(
            schema.attribute_type_value_cast("uidNumber", b"1000"),
            Value::Integer(1000)
        );
        assert_eq!(
            schema.validate_value("uidNumber", &Value::from("x")).unwrap(),
            "\"x\" is invalid integer format"
        );
        assert_eq!(schema.validate_value("cn", &Value::from("Bob")), None);
    }

    #[test]
    fn ldap_syntax_view() {
        let schema = make_test_schema();
        let syntax = schema.ldap_syntax("1.3.6.1.4.1.1466.115.121.1.15{64}");
        assert_eq!(syntax.id, "1.3.6.1.4.1.1466.115.121.1.15");
        assert_eq!(syntax.length, Some(64));
        assert_eq!(syntax.description.as_deref(), Some("Directory String"));
        assert!(syntax.human_readable);
        // not in the schema, described by the built-in syntax
        let jpeg = schema.ldap_syntax("1.3.6.1.4.1.1466.115.121.1.28");
        assert_eq!(jpeg.description.as_deref(), Some("JPEG"));
        assert!(!jpeg.human_readable);
    }

    // -- Group 4: object classes --

    #[test]
    fn class_attributes_follow_superclasses() {
        let schema = make_test_schema();
        let attrs = schema.class_attributes("organizationalPerson");
        assert_eq!(attrs.must, vec!["sn", "cn", "objectClass"]);
        assert_eq!(
            attrs.may,
            vec!["title", "ou", "description", "userPassword", "telephoneNumber", "seeAlso", "uid"]
        );
    }

    #[test]
    fn class_attributes_inet_org_person_casing() {
        let schema = make_test_schema();
        let attrs = schema.class_attributes("inetOrgPerson");
        assert!(attrs.may.contains(&"x500UniqueIdentifier".to_string()));
        assert!(!attrs.may.contains(&"x500uniqueIdentifier".to_string()));
    }

    #[test]
    fn class_attributes_inet_org_person_casing_by_oid() {
        let schema = make_test_schema();
        let attrs = schema.class_attributes("2.16.840.1.113730.3.2.2");
        assert!(attrs.may.contains(&"x500UniqueIdentifier".to_string()));
        assert_eq!(attrs.may, schema.class_attributes("inetOrgPerson").may);
    }

    #[test]
    fn object_class_view() {
        let schema = make_test_schema();
        let person = schema.object_class("PERSON");
        assert_eq!(person.name, "person");
        assert_eq!(person.kind, ObjectClassKind::Structural);
        assert_eq!(person.super_classes, vec!["top"]);
        assert_eq!(person.must, vec!["sn", "cn"]);
        // DIT content rule
        assert!(person.may.contains(&"uid".to_string()));
        assert!(person.all_must.contains(&"objectClass".to_string()));
        assert_eq!(schema.object_class("top").kind, ObjectClassKind::Abstract);
        assert_eq!(
            schema.object_class("posixAccount").kind,
            ObjectClassKind::Auxiliary
        );
        assert!(!schema.object_class("noSuchClass").exists());
    }
}
