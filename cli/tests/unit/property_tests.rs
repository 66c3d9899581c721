//! Property-based tests for identifier generation, name validation and the
//! update merge rule.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use deckhand_cli::domain::config::{VALID_CONFIG_KEYS, validate_config_key};
use deckhand_cli::domain::payload::{merge_field, merge_optional};
use deckhand_cli::domain::service::{
    generate_group_id, generate_service_id, validate_group_id, validate_name,
    validate_service_id,
};

proptest! {
    /// Generated ids always pass their own validators.
    #[test]
    fn prop_generated_ids_are_valid(_round in 0u8..32) {
        let svc = generate_service_id();
        let grp = generate_group_id();
        prop_assert!(validate_service_id(&svc).is_ok(), "rejected {}", svc);
        prop_assert!(validate_group_id(&grp).is_ok(), "rejected {}", grp);
        prop_assert!(validate_service_id(&grp).is_err(), "group id accepted as service id");
    }

    /// DNS-label names are accepted.
    #[test]
    fn prop_label_names_accepted(name in "[a-z0-9]([a-z0-9-]{0,40}[a-z0-9])?") {
        prop_assert!(validate_name(&name).is_ok(), "rejected {}", name);
    }

    /// Names with an uppercase letter are rejected.
    #[test]
    fn prop_uppercase_names_rejected(prefix in "[a-z]{0,10}", upper in "[A-Z]", suffix in "[a-z]{0,10}") {
        let name = format!("{prefix}{upper}{suffix}");
        prop_assert!(validate_name(&name).is_err(), "accepted {}", name);
    }

    /// Names that start or end with a dash are rejected.
    #[test]
    fn prop_dash_edges_rejected(core in "[a-z0-9]{1,20}") {
        let leading = format!("-{core}");
        let trailing = format!("{core}-");
        prop_assert!(validate_name(&leading).is_err());
        prop_assert!(validate_name(&trailing).is_err());
    }

    /// A present, non-empty value always wins the merge.
    #[test]
    fn prop_present_value_wins(new in "[a-z]{1,20}", old in "[a-z]{0,20}") {
        prop_assert_eq!(merge_field(Some(&new), &old), new.clone());
        prop_assert_eq!(merge_optional(Some(&new), Some(&old)), Some(new));
    }

    /// Absent and empty values keep what was stored.
    #[test]
    fn prop_blank_value_keeps_stored(old in "[a-z]{0,20}") {
        prop_assert_eq!(merge_field(None, &old), old.clone());
        prop_assert_eq!(merge_field(Some(&String::new()), &old), old.clone());
        prop_assert_eq!(merge_optional(Some(&String::new()), Some(&old)), Some(old));
    }

    /// Zero is indistinguishable from "not provided" for ports.
    #[test]
    fn prop_zero_port_keeps_stored(old in 1u16..) {
        prop_assert_eq!(merge_field(Some(&0u16), &old), old);
    }

    /// Keys outside the whitelist are rejected.
    #[test]
    fn prop_unknown_keys_rejected(key in "[a-z]{1,12}\\.[a-z_]{1,12}") {
        if !VALID_CONFIG_KEYS.contains(&key.as_str()) {
            prop_assert!(validate_config_key(&key).is_err(), "accepted {}", key);
        }
    }
}

#[test]
fn test_service_id_uniqueness_batch() {
    let ids: std::collections::HashSet<_> = (0..100).map(|_| generate_service_id()).collect();
    assert_eq!(ids.len(), 100, "duplicate IDs generated");
}

#[test]
fn test_every_whitelisted_key_validates() {
    for key in VALID_CONFIG_KEYS {
        assert!(validate_config_key(key).is_ok(), "rejected {key}");
    }
}
