//! Shared fixtures for the activeldap integration tests.
//!
//! - a subschema subentry shaped like what OpenLDAP returns
//! - sample LDIF documents
//! - `RecordingOperator`, which remembers every record it is asked to apply

use std::collections::HashMap;
use std::sync::Once;

use activeldap::{Attributes, Control, Dn, Error, Operation, Operator, Result, Schema};
use ldap3::SearchEntry;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Install a test subscriber once per process.  `RUST_LOG` overrides the
/// default level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::DEBUG.into())
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub const SUBSCHEMA_DN: &str = "cn=Subschema";

pub const ATTRIBUTE_TYPES: &[&str] = &[
    "( 2.5.4.0 NAME 'objectClass' DESC 'RFC4512: object classes of the entity' \
     EQUALITY objectIdentifierMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.38 )",
    "( 2.5.18.1 NAME 'createTimestamp' DESC 'RFC4512: time which object was created' \
     EQUALITY generalizedTimeMatch ORDERING generalizedTimeOrderingMatch \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.24 SINGLE-VALUE NO-USER-MODIFICATION \
     USAGE directoryOperation )",
    "( 2.5.4.41 NAME 'name' DESC 'RFC4519: common supertype of name attributes' \
     EQUALITY caseIgnoreMatch SUBSTR caseIgnoreSubstringsMatch \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{32768} )",
    "( 2.5.4.3 NAME ( 'cn' 'commonName' ) DESC 'RFC4519: common name(s) for which \
     the entity is known by' SUP name )",
    "( 2.5.4.4 NAME ( 'sn' 'surname' ) DESC 'RFC2256: last (family) name(s) for \
     which the entity is known by' SUP name )",
    "( 2.5.4.42 NAME ( 'givenName' 'gn' ) DESC 'RFC2256: first name(s) for which \
     the entity is known by' SUP name )",
    "( 2.5.4.12 NAME 'title' DESC 'RFC2256: title associated with the entity' SUP name )",
    "( 2.5.4.11 NAME ( 'ou' 'organizationalUnitName' ) \
     DESC 'RFC2256: organizational unit this object belongs to' SUP name )",
    "( 2.5.4.13 NAME 'description' DESC 'RFC2256: descriptive information' \
     EQUALITY caseIgnoreMatch SUBSTR caseIgnoreSubstringsMatch \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{1024} )",
    "( 2.5.4.20 NAME 'telephoneNumber' DESC 'RFC2256: Telephone Number' \
     EQUALITY telephoneNumberMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.50{32} )",
    "( 2.5.4.34 NAME 'seeAlso' DESC 'RFC4519: DN of related object' SUP distinguishedName )",
    "( 2.5.4.49 NAME 'distinguishedName' DESC 'RFC4519: common supertype of DN attributes' \
     EQUALITY distinguishedNameMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.12 )",
    "( 2.5.4.35 NAME 'userPassword' DESC 'RFC4519/2307: password of user' \
     EQUALITY octetStringMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.40{128} )",
    "( 0.9.2342.19200300.100.1.1 NAME ( 'uid' 'userid' ) DESC 'RFC4519: user identifier' \
     EQUALITY caseIgnoreMatch SUBSTR caseIgnoreSubstringsMatch \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{256} )",
    "( 0.9.2342.19200300.100.1.3 NAME ( 'mail' 'rfc822Mailbox' ) \
     DESC 'RFC1274: RFC822 Mailbox' EQUALITY caseIgnoreIA5Match \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.26{256} )",
    "( 0.9.2342.19200300.100.1.60 NAME 'jpegPhoto' DESC 'RFC2798: a JPEG image' \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.28 )",
    "( 2.5.4.36 NAME 'userCertificate' DESC 'RFC2256: X.509 user certificate, \
     use ;binary' EQUALITY certificateExactMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.8 )",
    "( 2.5.4.45 NAME 'x500UniqueIdentifier' EQUALITY bitStringMatch \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.6 )",
    "( 1.3.6.1.1.1.1.0 NAME 'uidNumber' DESC 'RFC2307: An integer uniquely identifying \
     a user in an administrative domain' EQUALITY integerMatch ORDERING integerOrderingMatch \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )",
    "( 1.3.6.1.1.1.1.1 NAME 'gidNumber' DESC 'RFC2307: An integer uniquely identifying \
     a group in an administrative domain' EQUALITY integerMatch ORDERING integerOrderingMatch \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )",
    "( 1.3.6.1.1.1.1.3 NAME 'homeDirectory' DESC 'The absolute path to the home directory' \
     EQUALITY caseExactIA5Match SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 SINGLE-VALUE )",
    "( 0.9.2342.19200300.100.1.25 NAME ( 'dc' 'domainComponent' ) \
     DESC 'RFC1274/2247: domain component' EQUALITY caseIgnoreIA5Match \
     SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 SINGLE-VALUE )",
    "( 2.5.4.10 NAME ( 'o' 'organizationName' ) \
     DESC 'RFC2256: organization this object belongs to' SUP name )",
];

pub const OBJECT_CLASSES: &[&str] = &[
    "( 2.5.6.0 NAME 'top' DESC 'top of the superclass chain' ABSTRACT MUST objectClass )",
    "( 2.5.6.6 NAME 'person' DESC 'RFC2256: a person' SUP top STRUCTURAL \
     MUST ( sn $ cn ) MAY ( userPassword $ telephoneNumber $ seeAlso $ description ) )",
    "( 2.5.6.7 NAME 'organizationalPerson' DESC 'RFC2256: an organizational person' \
     SUP person STRUCTURAL MAY ( title $ ou $ telephoneNumber ) )",
    "( 2.16.840.1.113730.3.2.2 NAME 'inetOrgPerson' DESC 'RFC2798: Internet Organizational \
     Person' SUP organizationalPerson STRUCTURAL MAY ( givenName $ mail $ uid $ jpegPhoto $ \
     userCertificate $ x500uniqueIdentifier ) )",
    "( 1.3.6.1.1.1.2.0 NAME 'posixAccount' DESC 'Abstraction of an account with POSIX \
     attributes' SUP top AUXILIARY MUST ( cn $ uid $ uidNumber $ gidNumber $ homeDirectory ) \
     MAY ( userPassword $ description ) )",
    "( 2.5.6.5 NAME 'organizationalUnit' DESC 'RFC2256: an organizational unit' SUP top \
     STRUCTURAL MUST ou MAY ( userPassword $ seeAlso $ telephoneNumber $ description ) )",
    "( 1.3.6.1.4.1.1466.344 NAME 'dcObject' DESC 'RFC2247: domain component object' \
     SUP top AUXILIARY MUST dc )",
    "( 2.5.6.4 NAME 'organization' DESC 'RFC2256: an organization' SUP top STRUCTURAL \
     MUST o MAY ( userPassword $ seeAlso $ telephoneNumber $ description ) )",
];

pub const LDAP_SYNTAXES: &[&str] = &[
    "( 1.3.6.1.4.1.1466.115.121.1.4 DESC 'Audio' X-NOT-HUMAN-READABLE 'TRUE' )",
    "( 1.3.6.1.4.1.1466.115.121.1.5 DESC 'Binary' X-NOT-HUMAN-READABLE 'TRUE' )",
    "( 1.3.6.1.4.1.1466.115.121.1.6 DESC 'Bit String' )",
    "( 1.3.6.1.4.1.1466.115.121.1.7 DESC 'Boolean' )",
    "( 1.3.6.1.4.1.1466.115.121.1.8 DESC 'Certificate' X-BINARY-TRANSFER-REQUIRED 'TRUE' \
     X-NOT-HUMAN-READABLE 'TRUE' )",
    "( 1.3.6.1.4.1.1466.115.121.1.12 DESC 'Distinguished Name' )",
    "( 1.3.6.1.4.1.1466.115.121.1.15 DESC 'Directory String' )",
    "( 1.3.6.1.4.1.1466.115.121.1.24 DESC 'Generalized Time' )",
    "( 1.3.6.1.4.1.1466.115.121.1.26 DESC 'IA5 String' )",
    "( 1.3.6.1.4.1.1466.115.121.1.27 DESC 'Integer' )",
    "( 1.3.6.1.4.1.1466.115.121.1.28 DESC 'JPEG' X-NOT-HUMAN-READABLE 'TRUE' )",
    "( 1.3.6.1.4.1.1466.115.121.1.38 DESC 'OID' )",
    "( 1.3.6.1.4.1.1466.115.121.1.40 DESC 'Octet String' )",
    "( 1.3.6.1.4.1.1466.115.121.1.50 DESC 'Telephone Number' )",
];

pub const DIT_CONTENT_RULES: &[&str] = &[
    "( 2.5.6.4 NAME 'organization' DESC 'organizations may carry a domain component' \
     AUX dcObject MAY dc )",
];

pub const MATCHING_RULES: &[&str] = &[
    "( 2.5.13.2 NAME 'caseIgnoreMatch' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )",
    "( 2.5.13.14 NAME 'integerMatch' SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 )",
];

fn owned(definitions: &[&str]) -> Vec<String> {
    definitions.iter().map(|d| d.to_string()).collect()
}

/// The subschema subentry as a search would return it.
pub fn subschema_entry() -> SearchEntry {
    let attrs = HashMap::from([
        ("attributeTypes".to_string(), owned(ATTRIBUTE_TYPES)),
        ("objectClasses".to_string(), owned(OBJECT_CLASSES)),
        ("ldapSyntaxes".to_string(), owned(LDAP_SYNTAXES)),
        ("dITContentRules".to_string(), owned(DIT_CONTENT_RULES)),
        ("matchingRules".to_string(), owned(MATCHING_RULES)),
    ]);
    SearchEntry {
        dn: SUBSCHEMA_DN.to_string(),
        attrs,
        bin_attrs: HashMap::new(),
    }
}

pub fn schema() -> Schema {
    Schema::from_search_entry(&subschema_entry())
}

/// A search result for one person, the way a server hands it back.
pub fn person_entry() -> SearchEntry {
    let text = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();
    SearchEntry {
        dn: "uid=alice,ou=People,dc=example,dc=com".to_string(),
        attrs: HashMap::from([
            (
                "objectClass".to_string(),
                text(&["top", "person", "organizationalPerson", "inetOrgPerson", "posixAccount"]),
            ),
            ("cn".to_string(), text(&["Alice Liddell"])),
            ("surname".to_string(), text(&["Liddell"])),
            ("uid".to_string(), text(&["alice"])),
            ("uidNumber".to_string(), text(&["1000"])),
            ("gidNumber".to_string(), text(&["1000"])),
            ("homeDirectory".to_string(), text(&["/home/alice"])),
            ("createTimestamp".to_string(), text(&["20240102030405Z"])),
        ]),
        bin_attrs: HashMap::from([(
            "jpegPhoto".to_string(),
            vec![vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]],
        )]),
    }
}

pub const CONTENT_LDIF: &str = "\
version: 1
# the organization
dn: dc=example,dc=com
objectClass: top
objectClass: organization
objectClass: dcObject
o: Example
dc: example

dn: ou=People,dc=example,dc=com
objectClass: top
objectClass: organizationalUnit
ou: People
description: All the people who have an account with Example, in one
  place and nowhere else

dn: uid=alice,ou=People,dc=example,dc=com
objectClass: top
objectClass: person
objectClass: inetOrgPerson
cn: Alice Liddell
cn;lang-fr:: QWxpY2UgTGlkZGVsbCDDoCBQYXJpcw==
sn: Liddell
uid: alice
";

pub const CHANGES_LDIF: &str = "\
version: 1

dn: uid=bob,ou=People,dc=example,dc=com
changetype: add
objectClass: top
objectClass: person
cn: Bob
sn: Builder

dn: uid=alice,ou=People,dc=example,dc=com
control: 1.2.840.113556.1.4.805 true
changetype: modify
replace: mail
mail: alice@example.com
-
add: title
title: Chief Rabbit Chaser
-
delete: description
-

dn: uid=bob,ou=People,dc=example,dc=com
changetype: modrdn
newrdn: uid=robert
deleteoldrdn: 1
newsuperior: ou=Staff,dc=example,dc=com

dn: uid=carol,ou=People,dc=example,dc=com
changetype: delete
";

/// One call received by [`RecordingOperator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add {
        dn: String,
        attributes: Attributes,
        controls: Vec<Control>,
    },
    Delete {
        dn: String,
    },
    Modify {
        dn: String,
        operations: Vec<Operation>,
        controls: Vec<Control>,
    },
    ModifyRdn {
        dn: String,
        new_rdn: String,
        delete_old_rdn: bool,
        new_superior: Option<String>,
    },
}

/// An [`Operator`] that records what it is asked to do.  When `fail_on`
/// names a DN, any record for that DN fails.
#[derive(Debug, Default)]
pub struct RecordingOperator {
    pub calls: Vec<Call>,
    pub fail_on: Option<Dn>,
}

impl RecordingOperator {
    pub fn failing_on(dn: &str) -> Result<Self> {
        Ok(RecordingOperator {
            calls: Vec::new(),
            fail_on: Some(Dn::parse(dn)?),
        })
    }

    fn check(&self, dn: &Dn) -> Result<()> {
        match &self.fail_on {
            Some(bad) if bad == dn => Err(Error::InvalidArgument(format!("refused: {}", dn))),
            _ => Ok(()),
        }
    }
}

impl Operator for RecordingOperator {
    fn add_entry(&mut self, dn: &Dn, attributes: &Attributes, controls: &[Control]) -> Result<()> {
        self.check(dn)?;
        self.calls.push(Call::Add {
            dn: dn.to_string(),
            attributes: attributes.clone(),
            controls: controls.to_vec(),
        });
        Ok(())
    }

    fn delete_entry(&mut self, dn: &Dn, _controls: &[Control]) -> Result<()> {
        self.check(dn)?;
        self.calls.push(Call::Delete { dn: dn.to_string() });
        Ok(())
    }

    fn modify_entry(
        &mut self,
        dn: &Dn,
        operations: &[Operation],
        controls: &[Control],
    ) -> Result<()> {
        self.check(dn)?;
        self.calls.push(Call::Modify {
            dn: dn.to_string(),
            operations: operations.to_vec(),
            controls: controls.to_vec(),
        });
        Ok(())
    }

    fn modify_rdn_entry(
        &mut self,
        dn: &Dn,
        new_rdn: &str,
        delete_old_rdn: bool,
        new_superior: Option<&Dn>,
        _controls: &[Control],
    ) -> Result<()> {
        self.check(dn)?;
        self.calls.push(Call::ModifyRdn {
            dn: dn.to_string(),
            new_rdn: new_rdn.to_string(),
            delete_old_rdn,
            new_superior: new_superior.map(|d| d.to_string()),
        });
        Ok(())
    }
}
