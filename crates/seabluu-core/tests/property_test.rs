//! Property-based tests for text normalization.

#![allow(clippy::unwrap_used)]

use proptest::{prelude::*, test_runner::Config as ProptestConfig};
use seabluu_core::parse::{
    digits_only, extract_order_id, normalize_phone, normalize_username, slice_page,
};

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 100,
        failure_persistence: None,
        source_file: None,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn order_id_normalization_is_idempotent(
        prefix in "[a-zA-Z]{1,3}",
        sep in prop::sample::select(vec!["", "-", " ", "_", "–", " - "]),
        suffix in "[a-zA-Z0-9]{2,10}",
    ) {
        let raw = format!("{prefix}{sep}{suffix}");
        let normalized = extract_order_id(&raw).unwrap();

        prop_assert_eq!(normalized.to_uppercase(), normalized.clone());
        prop_assert!(normalized.contains('-'));
        prop_assert_eq!(extract_order_id(&normalized), Some(normalized));
    }

    #[test]
    fn separated_order_ids_keep_both_parts(
        prefix in "[A-Z]{2}",
        suffix in "[0-9]{2,8}",
    ) {
        let raw = format!("{} {}", prefix.to_lowercase(), suffix);
        prop_assert_eq!(extract_order_id(&raw), Some(format!("{prefix}-{suffix}")));
    }

    #[test]
    fn usernames_normalize_once(name in "@?[A-Za-z0-9_]{1,20}") {
        let once = normalize_username(&name);
        prop_assert!(!once.starts_with('@'));
        prop_assert_eq!(normalize_username(&once), once);
    }

    #[test]
    fn kazakh_mobile_numbers_normalize(rest in "[0-9]{10}") {
        for raw in [format!("+7{rest}"), format!("7{rest}"), format!("8{rest}")] {
            prop_assert_eq!(normalize_phone(&raw).unwrap(), format!("8{rest}"));
        }
    }

    #[test]
    fn digits_only_keeps_digits(s in ".{0,40}") {
        prop_assert!(digits_only(&s).chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn pages_stay_in_bounds(len in 0usize..200, page in 0usize..50, per_page in 1usize..20) {
        let slice = slice_page(len, page, per_page);
        prop_assert!(slice.page < slice.pages);
        prop_assert!(slice.range.end <= len);
        prop_assert!(slice.range.len() <= per_page);
    }
}
