//! Identity normalization
//!
//! Pure functions that bring national ID, phone, plate and name strings into
//! a canonical form so two spellings of the same value compare equal. The
//! canonical name is for comparison only and is never displayed.

use crate::applicant::ApplicantCandidate;
use crate::error::NormalizationError;
use crate::validation::national_id_checksum_valid;

/// Combining dot above, produced when lowercasing `İ`
const COMBINING_DOT_ABOVE: char = '\u{0307}';

fn digits_of(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Canonicalizes a mobile phone number to the 11-digit `05XXXXXXXXX` form
///
/// Accepted shapes after stripping every non-digit:
/// - 10 digits starting with `5` (local form without trunk prefix)
/// - 11 digits starting with `05` (already canonical)
/// - 12 digits starting with `905` (country code form)
pub fn normalize_phone(raw: &str) -> Result<String, NormalizationError> {
    let digits = digits_of(raw);
    match digits.len() {
        10 if digits.starts_with('5') => Ok(format!("0{}", digits)),
        11 if digits.starts_with("05") => Ok(digits),
        12 if digits.starts_with("905") => Ok(format!("0{}", &digits[2..])),
        _ => Err(NormalizationError::phone(raw)),
    }
}

/// Canonicalizes a national ID to its 11 digits
///
/// The checksum is not verified here; see
/// [`crate::validation::ApplicantValidator`] and [`normalize_national_id_strict`].
pub fn normalize_national_id(raw: &str) -> Result<String, NormalizationError> {
    let digits = digits_of(raw);
    if digits.len() != 11 {
        return Err(NormalizationError::national_id(
            raw,
            format!("expected 11 digits, found {}", digits.len()),
        ));
    }
    Ok(digits)
}

/// Like [`normalize_national_id`] but also requires a valid checksum
pub fn normalize_national_id_strict(raw: &str) -> Result<String, NormalizationError> {
    let digits = normalize_national_id(raw)?;
    if !national_id_checksum_valid(&digits) {
        return Err(NormalizationError::national_id(raw, "checksum mismatch"));
    }
    Ok(digits)
}

/// Uppercases a plate and removes all whitespace
pub fn normalize_plate(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Trims, lowercases and collapses whitespace runs to a single space
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            word.chars()
                .flat_map(char::to_lowercase)
                .filter(|c| *c != COMBINING_DOT_ABOVE)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical forms of all four identity fields of an applicant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub name: String,
    pub national_id: String,
    pub phone: String,
    pub plate: String,
}

impl NormalizedIdentity {
    /// Normalizes a candidate, returning the first failing field's error
    pub fn from_candidate(
        candidate: &ApplicantCandidate,
        strict_national_id: bool,
    ) -> Result<Self, NormalizationError> {
        let name = normalize_name(&candidate.full_name);
        if name.is_empty() {
            return Err(NormalizationError::EmptyName);
        }
        let plate = normalize_plate(&candidate.plate);
        if plate.is_empty() {
            return Err(NormalizationError::InvalidPlate {
                value: candidate.plate.clone(),
            });
        }

        let national_id = if strict_national_id {
            normalize_national_id_strict(&candidate.national_id)?
        } else {
            normalize_national_id(&candidate.national_id)?
        };

        Ok(Self {
            name,
            national_id,
            phone: normalize_phone(&candidate.phone)?,
            plate,
        })
    }

    /// First three digits of the canonical phone, used by the phone pre-filter
    pub fn phone_prefix(&self) -> &str {
        let end = self.phone.len().min(3);
        &self.phone[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_local_ten_digits() {
        assert_eq!(normalize_phone("532 123 45 67").unwrap(), "05321234567");
    }

    #[test]
    fn test_phone_with_trunk_zero() {
        assert_eq!(normalize_phone("0532-123-45-67").unwrap(), "05321234567");
    }

    #[test]
    fn test_phone_with_country_code() {
        assert_eq!(normalize_phone("+90 532 123 45 67").unwrap(), "05321234567");
        assert_eq!(normalize_phone("905321234567").unwrap(), "05321234567");
    }

    #[test]
    fn test_phone_rejects_other_lengths() {
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("0532 123 45 678").is_err());
    }

    #[test]
    fn test_phone_rejects_landline_shapes() {
        // 10 digits not starting with 5 is a landline without trunk prefix
        assert!(normalize_phone("2121234567").is_err());
    }

    #[test]
    fn test_national_id_strips_formatting() {
        assert_eq!(normalize_national_id("100 000 001 46").unwrap(), "10000000146");
        assert_eq!(normalize_national_id("10000-000146").unwrap(), "10000000146");
    }

    #[test]
    fn test_national_id_wrong_length() {
        let err = normalize_national_id("1234").unwrap_err();
        assert_eq!(err.field(), "national_id");
        assert!(err.to_string().contains("found 4"));
    }

    #[test]
    fn test_national_id_strict_rejects_bad_checksum() {
        assert!(normalize_national_id("12345678901").is_ok());
        assert!(normalize_national_id_strict("12345678901").is_err());
        assert!(normalize_national_id_strict("12345678950").is_ok());
    }

    #[test]
    fn test_plate() {
        assert_eq!(normalize_plate(" 34 abc\t123 "), "34ABC123");
    }

    #[test]
    fn test_name_collapses_whitespace() {
        assert_eq!(normalize_name("  Ali   VELİ\tYılmaz "), "ali veli yılmaz");
    }

    #[test]
    fn test_name_dotted_capital_i_folds_to_plain_i() {
        assert_eq!(normalize_name("İSMAİL"), normalize_name("ismail"));
    }

    #[test]
    fn test_identity_rejects_blank_name_and_plate() {
        let blank_name = ApplicantCandidate::new("   ", "10000000146", "5321234567", "34AB1");
        assert_eq!(
            NormalizedIdentity::from_candidate(&blank_name, false),
            Err(NormalizationError::EmptyName)
        );

        let blank_plate = ApplicantCandidate::new("Ali", "10000000146", "5321234567", " \t");
        let err = NormalizedIdentity::from_candidate(&blank_plate, false).unwrap_err();
        assert_eq!(err.field(), "plate");
    }

    #[test]
    fn test_identity_phone_prefix() {
        let candidate = ApplicantCandidate::new("Ali", "10000000146", "5321234567", "34 AB 1");
        let identity = NormalizedIdentity::from_candidate(&candidate, false).unwrap();
        assert_eq!(identity.phone_prefix(), "053");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn phone_normalization_is_idempotent(
            body in "5[0-9]{9}",
            style in 0u8..4
        ) {
            let raw = match style {
                0 => body.clone(),
                1 => format!("0{}", body),
                2 => format!("+90 {} {} {}", &body[..3], &body[3..6], &body[6..]),
                _ => format!("(0{}) {}-{}", &body[..3], &body[3..6], &body[6..]),
            };
            let once = normalize_phone(&raw).unwrap();
            let twice = normalize_phone(&once).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn name_normalization_is_idempotent(raw in "[ a-zA-ZçğışöüÇĞİŞÖÜ]{0,40}") {
            let once = normalize_name(&raw);
            prop_assert_eq!(normalize_name(&once), once);
        }

        #[test]
        fn plate_normalization_is_idempotent(raw in "[ 0-9a-zA-Z]{0,12}") {
            let once = normalize_plate(&raw);
            prop_assert_eq!(normalize_plate(&once), once);
        }
    }
}
