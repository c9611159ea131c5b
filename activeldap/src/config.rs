//! Tunables for parsing and writing directory data.
use serde::{Deserialize, Serialize};

/// Width of an LDIF output line, including the attribute name, per RFC 2849.
pub const DEFAULT_LINE_WIDTH: usize = 75;

/// Library configuration.  Every section falls back to its default, so a
/// partial document deserializes.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// LDIF reading and writing
    pub ldif: LdifConfig,
}

/// How LDIF is read and written
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LdifConfig {
    /// Maximum length of a written line before it is folded
    pub line_width: usize,
    /// Whether `attr:< URI` values may be resolved at all
    pub allow_external_files: bool,
}

impl Default for LdifConfig {
    fn default() -> Self {
        LdifConfig {
            line_width: DEFAULT_LINE_WIDTH,
            allow_external_files: true,
        }
    }
}
