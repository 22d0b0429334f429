//! Property-Based Test Generators
//!
//! Proptest strategies for applicants as they arrive at intake: valid
//! national IDs with correct check digits, the many ways people write the
//! same phone number or plate, and realistic names.

use fake::faker::name::en::Name;
use fake::Fake;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;

use core_kernel::Money;
use domain_applicant::ApplicantCandidate;
use domain_claims::SettlementInput;

/// Appends the two check digits to nine leading digits
pub fn with_check_digits(first_nine: [u8; 9]) -> String {
    let d: Vec<i32> = first_nine.iter().map(|&v| v as i32).collect();
    let odd = d[0] + d[2] + d[4] + d[6] + d[8];
    let even = d[1] + d[3] + d[5] + d[7];
    let tenth = (odd * 7 - even).rem_euclid(10);
    let eleventh = (d.iter().sum::<i32>() + tenth) % 10;

    let mut id: String = first_nine.iter().map(|v| char::from(b'0' + v)).collect();
    id.push(char::from(b'0' + tenth as u8));
    id.push(char::from(b'0' + eleventh as u8));
    id
}

/// Strategy for canonical national IDs with valid checksums
pub fn national_id_strategy() -> impl Strategy<Value = String> {
    (1u8..10, prop::array::uniform8(0u8..10)).prop_map(|(first, rest)| {
        let mut digits = [0u8; 9];
        digits[0] = first;
        digits[1..].copy_from_slice(&rest);
        with_check_digits(digits)
    })
}

/// Strategy for canonical mobile numbers (`05XXXXXXXXX`)
pub fn phone_strategy() -> impl Strategy<Value = String> {
    (3u8..6, 0u64..100_000_000).prop_map(|(operator, subscriber)| {
        format!("05{}{:08}", operator, subscriber)
    })
}

/// A canonical phone together with a notation a person might type it in
pub fn formatted_phone_strategy() -> impl Strategy<Value = (String, String)> {
    (phone_strategy(), 0usize..4).prop_map(|(canonical, style)| {
        let local = &canonical[1..];
        let typed = match style {
            0 => canonical.clone(),
            1 => local.to_string(),
            2 => format!("+90 ({}) {} {} {}", &local[..3], &local[3..6], &local[6..8], &local[8..]),
            _ => format!("0{} {}-{}-{}", &local[..3], &local[3..6], &local[6..8], &local[8..]),
        };
        (canonical, typed)
    })
}

/// Strategy for canonical plates (`34ABC123`)
pub fn plate_strategy() -> impl Strategy<Value = String> {
    (1u8..82, "[A-Z]{1,3}", 10u16..10_000).prop_map(|(province, letters, number)| {
        format!("{:02}{}{}", province, letters, number)
    })
}

/// A canonical plate and a spaced, lowercased spelling of it
pub fn formatted_plate_strategy() -> impl Strategy<Value = (String, String)> {
    (1u8..82, "[A-Z]{1,3}", 10u16..10_000).prop_map(|(province, letters, number)| {
        let canonical = format!("{:02}{}{}", province, letters, number);
        let typed = format!(" {:02} {} {} ", province, letters.to_lowercase(), number);
        (canonical, typed)
    })
}

/// Strategy for realistic full names, reproducible from the proptest seed
pub fn name_strategy() -> impl Strategy<Value = String> {
    any::<u64>().prop_map(|seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        Name().fake_with_rng(&mut rng)
    })
}

/// Strategy for applicants in canonical form
pub fn applicant_strategy() -> impl Strategy<Value = ApplicantCandidate> {
    (name_strategy(), national_id_strategy(), phone_strategy(), plate_strategy()).prop_map(
        |(name, national_id, phone, plate)| ApplicantCandidate::new(name, national_id, phone, plate),
    )
}

/// The same applicant twice: once canonical, once as typed by a hurried
/// clerk (extra spaces, spaced ID, formatted phone, lowercased plate)
pub fn reformatted_applicant_strategy() -> impl Strategy<Value = (ApplicantCandidate, ApplicantCandidate)> {
    (
        name_strategy(),
        national_id_strategy(),
        formatted_phone_strategy(),
        formatted_plate_strategy(),
    )
        .prop_map(|(name, national_id, (phone, typed_phone), (plate, typed_plate))| {
            let spaced_id = format!("{} {} {}", &national_id[..3], &national_id[3..6], &national_id[6..]);
            let canonical = ApplicantCandidate::new(name.clone(), national_id, phone, plate);
            let typed = ApplicantCandidate::new(
                format!("  {}  ", name.to_uppercase()),
                spaced_id,
                typed_phone,
                typed_plate,
            );
            (canonical, typed)
        })
}

/// Strategy for non-negative lira amounts with kuruş precision
pub fn lira_strategy() -> impl Strategy<Value = Money> {
    (0i64..100_000_000).prop_map(|minor| Money::lira(Decimal::new(minor, 2)))
}

/// Closure figures without an explicit net
pub fn settlement_input_strategy() -> impl Strategy<Value = SettlementInput> {
    (
        proptest::option::of(lira_strategy()),
        proptest::option::of(lira_strategy()),
        proptest::option::of(lira_strategy()),
    )
        .prop_map(|(gross_payout, expenses, dealer_commission)| SettlementInput {
            gross_payout,
            expenses,
            dealer_commission,
            net_profit: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_applicant::{national_id_checksum_valid, normalize_phone, normalize_plate};

    #[test]
    fn test_check_digits_of_known_id() {
        assert_eq!(with_check_digits([1, 0, 0, 0, 0, 0, 0, 0, 1]), "10000000146");
    }

    proptest! {
        #[test]
        fn generated_national_ids_pass_checksum(id in national_id_strategy()) {
            prop_assert!(national_id_checksum_valid(&id));
        }

        #[test]
        fn formatted_phones_normalize_back((canonical, typed) in formatted_phone_strategy()) {
            prop_assert_eq!(normalize_phone(&typed).unwrap(), canonical);
        }

        #[test]
        fn formatted_plates_normalize_back((canonical, typed) in formatted_plate_strategy()) {
            prop_assert_eq!(normalize_plate(&typed), canonical);
        }

        #[test]
        fn names_are_never_blank(name in name_strategy()) {
            prop_assert!(!name.trim().is_empty());
        }
    }
}
