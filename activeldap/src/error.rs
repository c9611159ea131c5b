use std::fmt;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    DistinguishedNameInvalid(#[from] DistinguishedNameInvalid),

    #[error(transparent)]
    LdifInvalid(#[from] LdifInvalid),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("URI is invalid: {uri}: {reason}")]
    Uri { uri: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// DistinguishedNameInvalid
// ---------------------------------------------------------------------------

/// Why a DN string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnErrorReason {
    NameComponentMissing,
    RdnMissing,
    AttributeTypeMissing,
    AttributeValueMissing,
    UnmatchedQuotation,
}

impl fmt::Display for DnErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DnErrorReason::NameComponentMissing => "name component is missing",
            DnErrorReason::RdnMissing => "relative distinguished name (RDN) is missing",
            DnErrorReason::AttributeTypeMissing => "attribute type is missing",
            DnErrorReason::AttributeValueMissing => "attribute value is missing",
            DnErrorReason::UnmatchedQuotation => "found unmatched quotation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{dn} is invalid distinguished name (DN): {reason}")]
pub struct DistinguishedNameInvalid {
    pub dn: String,
    pub reason: DnErrorReason,
}

// ---------------------------------------------------------------------------
// LdifInvalid
// ---------------------------------------------------------------------------

/// Why an LDIF document was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdifErrorReason {
    VersionSpecMissing,
    VersionNumberMissing,
    UnsupportedVersion(u64),
    SeparatorMissing,
    DnMarkMissing,
    DnMissing,
    DnInvalid { dn: String, reason: DnErrorReason },
    DnInvalidCharacter(char),
    AttributeTypeMissing,
    OptionMissing,
    AttributeValueSeparatorMissing,
    UriMissing,
    UriInvalid { uri: String, reason: String },
    ExternalFileNotAccepted,
    InvalidBase64,
    ControlTypeMissing,
    CriticalityMissing,
    ChangeTypeMissing,
    ChangeTypeValueMissing,
    UnknownChangeType(String),
    UnknownModifyType(String),
    ModifySpecSeparatorMissing,
    NewRdnMarkMissing,
    NewRdnValueMissing,
    DeleteOldRdnMarkMissing,
    DeleteOldRdnValueMissing,
    NewSuperiorValueMissing,
    AttributeSpecMissing,
    ModifyAttributeMismatch { expected: String, found: String },
}

impl fmt::Display for LdifErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LdifErrorReason::VersionSpecMissing => f.write_str("version spec is missing"),
            LdifErrorReason::VersionNumberMissing => f.write_str("version number is missing"),
            LdifErrorReason::UnsupportedVersion(v) => write!(f, "unsupported version: {}", v),
            LdifErrorReason::SeparatorMissing => f.write_str("separator is missing"),
            LdifErrorReason::DnMarkMissing => f.write_str("'dn:' is missing"),
            LdifErrorReason::DnMissing => f.write_str("DN is missing"),
            LdifErrorReason::DnInvalid { dn, reason } => {
                write!(f, "DN is invalid: {}: {}", dn, reason)
            }
            LdifErrorReason::DnInvalidCharacter(c) => {
                write!(f, "DN has an invalid character: {}", c)
            }
            LdifErrorReason::AttributeTypeMissing => f.write_str("attribute type is missing"),
            LdifErrorReason::OptionMissing => f.write_str("option is missing"),
            LdifErrorReason::AttributeValueSeparatorMissing => f.write_str("':' is missing"),
            LdifErrorReason::UriMissing => f.write_str("URI is missing"),
            LdifErrorReason::UriInvalid { uri, reason } => {
                write!(f, "URI is invalid: {}: {}", uri, reason)
            }
            LdifErrorReason::ExternalFileNotAccepted => {
                f.write_str("external file is not accepted")
            }
            LdifErrorReason::InvalidBase64 => f.write_str("invalid base64 value"),
            LdifErrorReason::ControlTypeMissing => f.write_str("control type is missing"),
            LdifErrorReason::CriticalityMissing => f.write_str("criticality is missing"),
            LdifErrorReason::ChangeTypeMissing => f.write_str("change type is missing"),
            LdifErrorReason::ChangeTypeValueMissing => {
                f.write_str("change type value is missing")
            }
            LdifErrorReason::UnknownChangeType(t) => write!(f, "unknown change type: {}", t),
            LdifErrorReason::UnknownModifyType(t) => write!(f, "unknown modify type: {}", t),
            LdifErrorReason::ModifySpecSeparatorMissing => f.write_str("'-' is missing"),
            LdifErrorReason::NewRdnMarkMissing => f.write_str("'newrdn:' is missing"),
            LdifErrorReason::NewRdnValueMissing => f.write_str("new RDN value is missing"),
            LdifErrorReason::DeleteOldRdnMarkMissing => f.write_str("'deleteoldrdn:' is missing"),
            LdifErrorReason::DeleteOldRdnValueMissing => {
                f.write_str("deleteoldrdn value is missing")
            }
            LdifErrorReason::NewSuperiorValueMissing => {
                f.write_str("new superior value is missing")
            }
            LdifErrorReason::AttributeSpecMissing => f.write_str("attribute spec is missing"),
            LdifErrorReason::ModifyAttributeMismatch { expected, found } => {
                write!(f, "modify attribute mismatch: {} vs {}", expected, found)
            }
        }
    }
}

/// Marker inserted at the failure column in diagnostics.
pub const NEAREST_MARK: &str = "|@|";

/// A malformed LDIF document.  `line` and `column` are 1-based positions in
/// the original (still folded) source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdifInvalid {
    pub ldif: String,
    pub reason: LdifErrorReason,
    pub line: usize,
    pub column: usize,
}

impl LdifInvalid {
    /// The source line at `line` with [`NEAREST_MARK`] inserted at `column`.
    /// When that line is empty the previous line is prepended, so the
    /// marker always has some context.
    pub fn nearest(&self) -> String {
        let lines: Vec<&str> = self.ldif.lines().collect();
        let mut nearest = lines
            .get(self.line.wrapping_sub(1))
            .copied()
            .unwrap_or("")
            .to_string();
        let at = nearest
            .char_indices()
            .nth(self.column.saturating_sub(1))
            .map(|(i, _)| i)
            .unwrap_or(nearest.len());
        nearest.insert_str(at, NEAREST_MARK);
        if nearest == NEAREST_MARK && self.line >= 2 {
            if let Some(prev) = lines.get(self.line - 2) {
                nearest = format!("{}\n{}", prev, nearest);
            }
        }
        nearest
    }

    fn snippet(&self) -> String {
        let nearest = self.nearest();
        let position = format!("{}:{}: ", self.line, self.column);
        match nearest.split_once('\n') {
            Some((previous, current)) => {
                let width = position.len() - 2;
                format!(
                    "{:>width$}: {}\n{}{}",
                    self.line - 1,
                    previous,
                    position,
                    current,
                    width = width
                )
            }
            None => format!("{}{}", position, nearest),
        }
    }

    fn numbered_ldif(&self) -> String {
        let lines: Vec<&str> = self.ldif.lines().collect();
        let width = lines.len().to_string().len();
        let mut out = String::new();
        for (i, line) in lines.iter().enumerate() {
            out.push_str(&format!("{:>width$}: {}\n", i + 1, line, width = width));
        }
        out
    }
}

impl fmt::Display for LdifInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid LDIF: {}:\n{}\n", self.reason, self.snippet())?;
        f.write_str(&self.numbered_ldif())
    }
}

impl std::error::Error for LdifInvalid {}
