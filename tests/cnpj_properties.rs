//! Checksum properties of the identifier validator

use proptest::prelude::*;

use cnpj_process_search::cnpj::{clean, format, validate};
use cnpj_process_search::Cnpj;

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

fn with_check_digits(base: &[u32]) -> String {
    let mut digits = base.to_vec();
    digits.push(check_digit(&digits, &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]));
    digits.push(check_digit(&digits, &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]));
    digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect()
}

proptest! {
    #[test]
    fn generated_identifiers_validate(base in prop::collection::vec(0u32..10, 12)) {
        let raw = with_check_digits(&base);
        prop_assume!(!raw.chars().all(|c| c == raw.as_bytes()[0] as char));

        prop_assert!(validate(&raw));
        prop_assert!(validate(&format(&raw)));

        let cnpj = Cnpj::parse(&format(&raw)).unwrap();
        prop_assert_eq!(cnpj.digits(), raw.as_str());
        prop_assert_eq!(clean(&cnpj.formatted()), raw);
    }

    #[test]
    fn altered_check_digit_fails(base in prop::collection::vec(0u32..10, 12), bump in 1u32..10) {
        let raw = with_check_digits(&base);
        let mut digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
        digits[13] = (digits[13] + bump) % 10;
        let altered: String = digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect();
        prop_assert!(!validate(&altered));
    }

    #[test]
    fn repeated_digits_are_rejected(d in 0u32..10) {
        let raw: String = std::iter::repeat(char::from_digit(d, 10).unwrap()).take(14).collect();
        prop_assert!(!validate(&raw));
        prop_assert!(Cnpj::parse(&raw).is_err());
    }

    #[test]
    fn clean_is_idempotent(raw in ".{0,40}") {
        let once = clean(&raw);
        prop_assert_eq!(clean(&once), once.clone());
        prop_assert!(once.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn wrong_length_is_rejected(digits in "[0-9]{0,13}|[0-9]{15,20}") {
        prop_assert!(!validate(&digits));
    }
}

#[test]
fn known_identifiers() {
    for raw in ["08.049.394/0001-84", "11222333000181", "33.000.167/0001-01"] {
        assert!(validate(raw), "{raw}");
    }
    assert_eq!(format("11222333000181"), "11.222.333/0001-81");
}
