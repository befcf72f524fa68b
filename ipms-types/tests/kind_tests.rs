use ipms_types::EntityKind;
use proptest::prelude::*;
use std::str::FromStr;

#[test]
fn syncable_kinds_are_known() {
    for kind in EntityKind::SYNCABLE {
        assert!(kind.is_known());
        assert!(kind.resource().is_some());
        assert!(kind.storage_key().is_some());
    }
    assert!(!EntityKind::Unknown.is_known());
}

#[test]
fn unknown_has_no_resource_or_key() {
    assert_eq!(EntityKind::Unknown.resource(), None);
    assert_eq!(EntityKind::Unknown.storage_key(), None);
    assert!(EntityKind::Unknown.file_fields().is_empty());
}

#[test]
fn storage_keys_match_host_names() {
    assert_eq!(EntityKind::Copyrights.storage_key(), Some("ipms_softwares"));
    assert_eq!(EntityKind::Papers.storage_key(), Some("ipms_papers"));
    assert_eq!(EntityKind::Patents.storage_key(), Some("ipms_patents"));
}

#[test]
fn file_fields_per_kind() {
    assert_eq!(EntityKind::Copyrights.file_fields(), &["file_path"]);
    assert_eq!(EntityKind::Papers.file_fields(), &["file_path"]);
    assert_eq!(
        EntityKind::Patents.file_fields(),
        &["application_file", "certificate_file"]
    );
}

#[test]
fn display_and_parse_agree() {
    for kind in [
        EntityKind::Copyrights,
        EntityKind::Papers,
        EntityKind::Patents,
        EntityKind::Unknown,
    ] {
        let parsed = EntityKind::from_str(&kind.to_string()).unwrap();
        assert_eq!(parsed, kind);
    }
}

#[test]
fn parse_rejects_other_names() {
    let err = EntityKind::from_str("softwares").unwrap_err();
    assert!(err.to_string().contains("softwares"));
}

#[test]
fn serializes_lowercase() {
    let json = serde_json::to_string(&EntityKind::Patents).unwrap();
    assert_eq!(json, "\"patents\"");
}

fn any_kind() -> impl Strategy<Value = EntityKind> {
    prop::sample::select(vec![
        EntityKind::Copyrights,
        EntityKind::Papers,
        EntityKind::Patents,
        EntityKind::Unknown,
    ])
}

proptest! {
    /// Display, FromStr and serde agree on every kind.
    #[test]
    fn names_round_trip(kind in any_kind()) {
        prop_assert_eq!(EntityKind::from_str(&kind.to_string()).unwrap(), kind);
        let json = serde_json::to_string(&kind).unwrap();
        prop_assert_eq!(json, format!("\"{kind}\""));
    }

    /// Only the four lowercase names parse.
    #[test]
    fn arbitrary_names_parse_only_when_known(name in "[a-z]{0,12}") {
        let known = ["copyrights", "papers", "patents", "unknown"].contains(&name.as_str());
        prop_assert_eq!(EntityKind::from_str(&name).is_ok(), known);
    }

    /// Known kinds always have a resource and a storage key.
    #[test]
    fn known_kinds_are_addressable(kind in any_kind()) {
        prop_assert_eq!(kind.resource().is_some(), kind.is_known());
        prop_assert_eq!(kind.storage_key().is_some(), kind.is_known());
    }
}
