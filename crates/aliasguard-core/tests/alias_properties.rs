//! Property tests for the alias codec.

use aliasguard_core::{AliasCodec, SharedKey};
use chrono::NaiveDate;
use proptest::prelude::*;

const KEY: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const ENCRYPTED_PART_LEN: usize = 22;

fn codec() -> AliasCodec {
    AliasCodec::new(SharedKey::from_secret(KEY).unwrap(), "test.com")
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn domain() -> impl Strategy<Value = String> {
    "([a-z0-9]{1,12}\\.)?[a-z0-9][a-z0-9-]{0,24}[a-z0-9]\\.[a-z]{2,6}"
}

fn mint(domain: &str, date: NaiveDate) -> String {
    codec().generate_on(domain, date).unwrap().alias
}

/// Replaces the character at `index` with a different alphanumeric one.
fn tamper(alias: &str, index: usize, replacement: char) -> String {
    let mut chars: Vec<char> = alias.chars().collect();
    chars[index] = if chars[index] == replacement {
        if replacement == 'x' { 'y' } else { 'x' }
    } else {
        replacement
    };
    chars.into_iter().collect()
}

proptest! {
    #[test]
    fn generated_aliases_verify_with_their_date(domain in domain(), date in date()) {
        let alias = mint(&domain, date);
        let result = codec().extract(&alias);

        prop_assert!(result.signature_valid());
        prop_assert_eq!(result.generation_date(), Some(date));
    }

    #[test]
    fn generated_aliases_have_one_dash_and_fit(domain in domain(), date in date()) {
        let alias = mint(&domain, date);
        let local = alias.split('@').next().unwrap();

        prop_assert!(local.len() <= 40);
        prop_assert_eq!(local.matches('-').count(), 1);
        prop_assert!(!local[local.len() - ENCRYPTED_PART_LEN..].contains('-'));
    }

    #[test]
    fn tampered_visible_part_is_rejected(
        date in date(),
        index in 0usize..18,
        replacement in proptest::char::range('a', 'z'),
    ) {
        // Tag `averylongname-` is 14 characters, followed by 4 filler characters.
        let alias = mint("averylongname.example", date);
        prop_assume!(alias.as_bytes()[index] != b'-');
        let tampered = tamper(&alias, index, replacement);

        prop_assert!(!codec().extract(&tampered).signature_valid());
    }

    // The last ciphertext character is left out: only its top two bits
    // carry data, the low four are ignored by the tolerant decoder, so
    // some replacements there decode to the same block and still verify.
    // `codec.rs` pins exactly which ones.
    #[test]
    fn tampered_ciphertext_is_rejected(
        date in date(),
        offset in 0usize..ENCRYPTED_PART_LEN - 1,
        replacement in proptest::char::range('A', 'Z'),
    ) {
        let alias = mint("other.com", date);
        let local_len = alias.find('@').unwrap();
        let index = local_len - ENCRYPTED_PART_LEN + offset;
        let tampered = tamper(&alias, index, replacement);

        prop_assert!(!codec().extract(&tampered).signature_valid());
    }

    #[test]
    fn foreign_key_is_rejected(domain in domain(), date in date(), byte in 0u8..=255) {
        prop_assume!(byte != b'a');
        let alias = mint(&domain, date);
        let other = AliasCodec::new(SharedKey::new(vec![byte; 32]).unwrap(), "test.com");

        let result = other.extract(&alias);
        prop_assert!(!result.signature_valid());
        prop_assert_eq!(result.generation_date(), None);
    }

    #[test]
    fn dash_in_sealed_part_is_legacy(
        prefix in "[a-z]{1,10}-[A-F0-9_]{4,10}",
        sealed in "[A-Za-z0-9_]{10}-[A-Za-z0-9_]{11}",
    ) {
        let alias = format!("{prefix}{sealed}@test.com");
        prop_assert!(!codec().extract(&alias).signature_valid());
    }

    #[test]
    fn extract_is_total_and_idempotent(alias in "\\PC{0,80}") {
        let first = codec().extract(&alias);
        let second = codec().extract(&alias);

        prop_assert_eq!(first.checked_alias(), alias.as_str());
        prop_assert_eq!(&first, &second);
        prop_assert!(first.signature_valid() || first.generation_date().is_none());
    }
}

#[test]
fn known_vectors() {
    let valid = codec().extract("other-0EFCF5804239mM6G490b6pGJAG3uCfBCVA@test.com");
    assert!(valid.signature_valid());
    assert_eq!(valid.generation_date(), NaiveDate::from_ymd_opt(2022, 9, 27));

    let invalid = codec().extract("otger-0EFCF5804239mM6G490b6pGJAG3uCfBCVA@test.com");
    assert!(!invalid.signature_valid());
    assert_eq!(invalid.generation_date(), None);
}

#[test]
fn serialized_result_for_diagnostics() {
    let result = codec().extract("other-0EFCF5804239mM6G490b6pGJAG3uCfBCVA@test.com");
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["signature_valid"], true);
    assert_eq!(json["generation_date"], "2022-09-27");
    assert_eq!(
        json["checked_alias"],
        "other-0EFCF5804239mM6G490b6pGJAG3uCfBCVA@test.com"
    );
}
