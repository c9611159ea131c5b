//! Directory entries as returned by a search, with schema-aware access.

use ldap3::SearchEntry;

use crate::dn::Dn;
use crate::error::DistinguishedNameInvalid;
use crate::ldif::{Attributes, ContentRecord, Record};
use crate::schema::Schema;
use crate::syntaxes::Value;

/// An attribute: a description (name plus `;options`) with its
/// binary-safe values.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub ad: String,
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    pub fn new(ad: String) -> Attribute {
        Attribute {
            ad,
            values: Vec::new(),
        }
    }

    /// Add a value unless an identical one is already present.
    pub fn append_value(&mut self, data: &[u8]) {
        if self.find_value(data).is_none() {
            self.values.push(data.to_vec());
        }
    }

    /// Find a value, returning its index or None.
    pub fn find_value(&self, data: &[u8]) -> Option<usize> {
        self.values.iter().position(|v| v.as_slice() == data)
    }

    /// The name without options.
    pub fn name(&self) -> &str {
        split_description(&self.ad).0
    }

    pub fn options(&self) -> Vec<&str> {
        split_description(&self.ad).1
    }
}

/// `cn;lang-en;binary` -> (`cn`, [`lang-en`, `binary`])
fn split_description(ad: &str) -> (&str, Vec<&str>) {
    let mut parts = ad.split(';');
    let name = parts.next().unwrap_or(ad);
    (name, parts.collect())
}

fn same_options(a: &[&str], b: &[&str]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

/// An LDAP entry: a DN with a list of attributes.
#[derive(Debug, Clone)]
pub struct Entry {
    pub dn: Dn,
    pub attributes: Vec<Attribute>,
}

impl Entry {
    pub fn new(dn: Dn) -> Entry {
        Entry {
            dn,
            attributes: Vec::new(),
        }
    }

    /// Build from raw search results.  Descriptions differing only in case
    /// are merged into one attribute, dropping repeated values.
    pub fn from_raw<I, N>(dn: Dn, attributes: I) -> Entry
    where
        I: IntoIterator<Item = (N, Vec<Vec<u8>>)>,
        N: Into<String>,
    {
        let mut entry = Entry::new(dn);
        for (ad, values) in attributes {
            let ad = ad.into();
            if let Some(attr) = entry.find_attribute(&ad, true) {
                for value in &values {
                    attr.append_value(value);
                }
            }
        }
        entry
    }

    /// Find an attribute by description, ignoring case.
    /// If `create` is true and the attribute doesn't exist, create it.
    pub fn find_attribute(&mut self, ad: &str, create: bool) -> Option<&mut Attribute> {
        let pos = self
            .attributes
            .iter()
            .position(|a| a.ad.eq_ignore_ascii_case(ad));
        match pos {
            Some(i) => Some(&mut self.attributes[i]),
            None if create => {
                self.attributes.push(Attribute::new(ad.to_string()));
                self.attributes.last_mut()
            }
            None => None,
        }
    }

    pub fn get_attribute(&self, ad: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.ad.eq_ignore_ascii_case(ad))
    }

    /// Raw values of the attribute described exactly by `ad`.
    pub fn get(&self, ad: &str) -> Vec<&[u8]> {
        self.get_attribute(ad)
            .map(|a| a.values.iter().map(|v| v.as_slice()).collect())
            .unwrap_or_default()
    }

    /// Raw values under any name of the attribute (`cn` also finds
    /// `commonName`), with the same options as `ad`.
    pub fn get_with_schema(&self, schema: &Schema, ad: &str) -> Vec<&[u8]> {
        let (name, options) = split_description(ad);
        let attribute = schema.attribute(name);
        self.attributes
            .iter()
            .filter(|a| {
                let (other, other_options) = split_description(&a.ad);
                same_options(&options, &other_options)
                    && (other.eq_ignore_ascii_case(name)
                        || attribute.names().any(|n| n.eq_ignore_ascii_case(other)))
            })
            .flat_map(|a| a.values.iter().map(|v| v.as_slice()))
            .collect()
    }

    /// Values of `ad` type-cast by the attribute's syntax.
    pub fn typed(&self, schema: &Schema, ad: &str) -> Vec<Value> {
        let name = split_description(ad).0;
        self.get_with_schema(schema, ad)
            .into_iter()
            .map(|raw| schema.attribute_type_value_cast(name, raw))
            .collect()
    }

    pub fn object_classes(&self) -> Vec<String> {
        self.get("objectClass")
            .into_iter()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect()
    }

    /// Check the entry against the schema.  Returns one message per
    /// problem; an empty list means the entry is valid.
    pub fn validate(&self, schema: &Schema) -> Vec<String> {
        let mut errors = Vec::new();

        let mut required: Vec<(String, String)> = Vec::new();
        for class_name in self.object_classes() {
            let class = schema.object_class(&class_name);
            if !class.exists() {
                errors.push(format!("unknown objectClass: '{}'", class_name));
                continue;
            }
            for must in &class.all_must {
                if !required.iter().any(|(m, _)| m.eq_ignore_ascii_case(must)) {
                    required.push((must.clone(), class.name.clone()));
                }
            }
        }
        for (must, class) in &required {
            if self.get_with_schema(schema, must).is_empty() {
                errors.push(format!(
                    "{} is required attribute by objectClass '{}'",
                    must, class
                ));
            }
        }

        for attr in &self.attributes {
            let name = attr.name();
            let attribute = schema.attribute(name);
            if attribute.single_value && attr.values.len() > 1 {
                errors.push(format!("{} can't have more than one value", attr.ad));
            }
            for raw in &attr.values {
                let value = attribute.type_cast(raw);
                if let Some(reason) = attribute.validate(&value) {
                    errors.push(format!("{} has invalid value: {}", attr.ad, reason));
                }
            }
        }

        if !errors.is_empty() {
            tracing::debug!(dn = %self.dn, problems = errors.len(), "entry failed validation");
        }
        errors
    }

    /// The entry as an LDIF content record.
    pub fn to_record(&self) -> Record {
        let mut attributes = Attributes::new();
        for attr in &self.attributes {
            let options: Vec<String> = attr.options().into_iter().map(String::from).collect();
            for value in &attr.values {
                attributes.add(attr.name(), options.clone(), value.clone());
            }
        }
        Record::Content(ContentRecord {
            dn: self.dn.clone(),
            attributes,
        })
    }
}

impl TryFrom<SearchEntry> for Entry {
    type Error = DistinguishedNameInvalid;

    fn try_from(entry: SearchEntry) -> Result<Self, Self::Error> {
        let dn = Dn::parse(&entry.dn)?;
        let text = entry.attrs.into_iter().map(|(name, values)| {
            let values: Vec<Vec<u8>> = values.into_iter().map(String::into_bytes).collect();
            (name, values)
        });
        Ok(Entry::from_raw(dn, text.chain(entry.bin_attrs)))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.dn == other.dn
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dn.cmp(&other.dn)
    }
}
