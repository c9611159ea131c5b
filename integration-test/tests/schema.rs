use activeldap::schema::{ATTRIBUTE_TYPES, MATCHING_RULES, OBJECT_CLASSES};
use activeldap::{Dn, ObjectClassKind, Value};
use activeldap_integration_test::{init_tracing, schema};
use time::macros::datetime;

// -- Group 1: attribute types --

#[test]
fn syntax_is_inherited_through_sup() {
    init_tracing();
    let schema = schema();
    let cn = schema.attribute("commonName");
    assert_eq!(cn.name, "cn");
    assert_eq!(cn.syntax.as_deref(), Some("1.3.6.1.4.1.1466.115.121.1.15"));
    assert_eq!(cn.syntax_length, Some(32768));

    let see_also = schema.attribute("seeAlso");
    assert_eq!(see_also.syntax.as_deref(), Some("1.3.6.1.4.1.1466.115.121.1.12"));
    assert_eq!(
        schema.attribute_type_value_cast("seeAlso", b"cn=Bob,dc=example,dc=com"),
        Value::Dn(Dn::parse("cn=Bob,dc=example,dc=com").unwrap())
    );
}

#[test]
fn attribute_flags() {
    let schema = schema();
    assert!(schema.read_only("createTimestamp"));
    assert!(schema.single_value("createTimestamp"));
    assert!(schema.attribute("createTimestamp").directory_operation);
    assert!(schema.single_value("uidNumber"));
    assert!(!schema.single_value("cn"));

    assert!(schema.binary("jpegPhoto"));
    assert!(!schema.binary_required("jpegPhoto"));
    assert!(schema.binary_required("userCertificate"));
    assert!(!schema.binary("mail"));
}

#[test]
fn typed_casts() {
    let schema = schema();
    assert_eq!(
        schema.attribute_type_value_cast("uidNumber", b"1000"),
        Value::Integer(1000)
    );
    assert_eq!(
        schema.attribute_type_value_cast("createTimestamp", b"20240102030405Z"),
        Value::Time(datetime!(2024-01-02 03:04:05 UTC))
    );
    assert_eq!(
        schema
            .attribute_type_value_cast("createTimestamp", b"20240102030405Z")
            .to_bytes(),
        b"20240102030405Z"
    );
    assert_eq!(
        schema.validate_value("uidNumber", &Value::from("ten")),
        Some("\"ten\" is invalid integer format".to_string())
    );
}

// -- Group 2: names --

#[test]
fn names_and_aliases() {
    let schema = schema();
    assert_eq!(schema.resolve_name(ATTRIBUTE_TYPES, "rfc822Mailbox").unwrap(), "mail");
    assert_eq!(schema.resolve_name(ATTRIBUTE_TYPES, "2.5.4.4").unwrap(), "sn");
    assert!(schema.exist_name(MATCHING_RULES, "integerMatch"));
    assert!(!schema.exist_name(OBJECT_CLASSES, "groupOfNames"));
    assert_eq!(schema.ids(OBJECT_CLASSES).len(), 8);
    assert!(schema.names(ATTRIBUTE_TYPES).contains(&"domainComponent".to_string()));
}

// -- Group 3: object classes --

#[test]
fn inet_org_person_attributes() {
    let schema = schema();
    let attrs = schema.class_attributes("inetOrgPerson");
    assert_eq!(attrs.must, vec!["sn", "cn", "objectClass"]);
    assert!(attrs.may.contains(&"x500UniqueIdentifier".to_string()));
    assert!(attrs.may.contains(&"givenName".to_string()));
    assert!(attrs.may.contains(&"seeAlso".to_string()));
    assert_eq!(
        attrs.may.iter().filter(|a| a.as_str() == "telephoneNumber").count(),
        1
    );
}

#[test]
fn content_rules_extend_classes() {
    let schema = schema();
    let organization = schema.object_class("organization");
    assert_eq!(organization.kind, ObjectClassKind::Structural);
    assert_eq!(organization.must, vec!["o"]);
    assert!(organization.may.contains(&"dc".to_string()));
    assert_eq!(organization.all_must, vec!["o", "objectClass"]);
}

#[test]
fn auxiliary_class() {
    let schema = schema();
    let posix = schema.object_class("posixaccount");
    assert_eq!(posix.name, "posixAccount");
    assert_eq!(posix.kind, ObjectClassKind::Auxiliary);
    assert_eq!(posix.super_classes, vec!["top"]);
    assert!(posix.all_must.contains(&"homeDirectory".to_string()));
}
