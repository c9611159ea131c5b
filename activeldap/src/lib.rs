//! Core data handling for LDAP directories.
//!
//! - `Dn` / `Rdn`: RFC 2253 distinguished names, parsed, compared and
//!   rebuilt without touching a server
//! - `LdifDocument`: RFC 2849 reader and writer, content and change records,
//!   with diagnostics that point at the offending line and column
//! - `Schema`: the subschema subentry, parsed lazily into attribute types,
//!   object classes and syntaxes
//! - `syntaxes`: per-syntax conversion between wire bytes and `Value`s
//! - `Entry`: search results with schema-aware, typed attribute access
//!
//! Nothing here opens a connection.  `ldap3` search results can be turned
//! into entries and schemas, and LDIF records can be replayed through any
//! `Operator`.

pub mod base64;
pub mod config;
pub mod dn;
pub mod entry;
pub mod error;
pub mod ldif;
mod parsedn;
mod parseldif;
pub mod print;
pub mod schema;
pub mod syntaxes;
pub mod user_password;

pub use config::{Config, LdifConfig};
pub use dn::{Dn, Rdn};
pub use entry::{Attribute, Entry};
pub use error::{DistinguishedNameInvalid, Error, LdifInvalid, Result};
pub use ldif::{
    AttributeValue, Attributes, ChangeType, Control, LdifDocument, ModifyKind, Operation,
    Operator, Record,
};
pub use parseldif::{FileResolver, UriResolver};
pub use schema::{AttributeType, LdapSyntax, ObjectClass, ObjectClassKind, Schema};
pub use syntaxes::{Syntax, Value};
