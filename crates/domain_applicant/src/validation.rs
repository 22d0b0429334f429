//! Applicant validation rules
//!
//! # Rules
//!
//! - Full name, national ID, phone and plate are required (blank counts as missing)
//! - E-mail, when given, must be well formed
//! - Phone and national ID must normalize
//! - National ID checksum: an error in strict mode, a warning otherwise

use validator::Validate;

use crate::applicant::ApplicantCandidate;
use crate::normalize::{normalize_national_id, normalize_national_id_strict, normalize_phone};

/// Result of applicant validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the candidate is valid
    pub is_valid: bool,
    /// List of validation errors
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a successful validation result
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Creates a failed validation result with errors
    pub fn fail(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Adds a warning to the result
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Merges another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Verifies the two trailing check digits of an 11-digit national ID
///
/// The first digit may not be zero. The tenth digit is
/// `(7 * (d1 + d3 + d5 + d7 + d9) - (d2 + d4 + d6 + d8)) mod 10` and the
/// eleventh is the sum of the first ten digits mod 10.
///
/// ```rust
/// use domain_applicant::national_id_checksum_valid;
///
/// assert!(national_id_checksum_valid("10000000146"));
/// assert!(!national_id_checksum_valid("12345678901"));
/// ```
pub fn national_id_checksum_valid(digits: &str) -> bool {
    let d: Vec<i32> = digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|v| v as i32)
        .collect();

    if d.len() != 11 || digits.len() != 11 || d[0] == 0 {
        return false;
    }

    let odd = d[0] + d[2] + d[4] + d[6] + d[8];
    let even = d[1] + d[3] + d[5] + d[7];
    let tenth = (odd * 7 - even).rem_euclid(10);
    let eleventh = d[..10].iter().sum::<i32>() % 10;

    d[9] == tenth && d[10] == eleventh
}

/// Validator for applicant candidates
pub struct ApplicantValidator;

impl ApplicantValidator {
    /// Validates a candidate
    ///
    /// With `strict_national_id` a checksum failure is an error; otherwise it
    /// is reported as a warning so legacy IDs typed from paper forms still pass.
    pub fn validate(candidate: &ApplicantCandidate, strict_national_id: bool) -> ValidationResult {
        let mut result = ValidationResult::ok();

        for field in Self::missing_required_fields(candidate) {
            result.add_error(format!("Missing required field: {}", field));
        }

        if let Err(errors) = candidate.validate() {
            for (field, field_errors) in errors.field_errors() {
                // Blank required fields are already reported above
                if field != "email" {
                    continue;
                }
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    result.add_error(message);
                }
            }
        }

        if !candidate.phone.trim().is_empty() {
            if let Err(e) = normalize_phone(&candidate.phone) {
                result.add_error(e.to_string());
            }
        }

        if !candidate.national_id.trim().is_empty() {
            result.merge(Self::validate_national_id(&candidate.national_id, strict_national_id));
        }

        result
    }

    fn validate_national_id(raw: &str, strict: bool) -> ValidationResult {
        let mut result = ValidationResult::ok();

        match normalize_national_id(raw) {
            Err(e) => result.add_error(e.to_string()),
            Ok(digits) if !national_id_checksum_valid(&digits) => {
                if strict {
                    if let Err(e) = normalize_national_id_strict(raw) {
                        result.add_error(e.to_string());
                    }
                } else {
                    result.add_warning(format!(
                        "National ID {} does not pass the checksum",
                        digits
                    ));
                }
            }
            Ok(_) => {}
        }

        result
    }

    /// Names of required fields that are empty after trimming
    pub fn missing_required_fields(candidate: &ApplicantCandidate) -> Vec<&'static str> {
        [
            ("full_name", &candidate.full_name),
            ("national_id", &candidate.national_id),
            ("phone", &candidate.phone),
            ("plate", &candidate.plate),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> ApplicantCandidate {
        ApplicantCandidate::new("Ayşe Yılmaz", "10000000146", "0532 123 45 67", "34 ABC 123")
    }

    #[test]
    fn test_checksum_known_values() {
        assert!(national_id_checksum_valid("10000000146"));
        assert!(national_id_checksum_valid("12345678950"));
        assert!(!national_id_checksum_valid("12345678901"));
        assert!(!national_id_checksum_valid("01234567890"));
        assert!(!national_id_checksum_valid("1234"));
    }

    #[test]
    fn test_valid_candidate() {
        let result = ApplicantValidator::validate(&candidate(), true);
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_fields_are_named() {
        let mut c = candidate();
        c.full_name = "  ".to_string();
        c.plate = String::new();

        let result = ApplicantValidator::validate(&c, false);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e == "Missing required field: full_name"));
        assert!(result.errors.iter().any(|e| e == "Missing required field: plate"));
    }

    #[test]
    fn test_bad_email() {
        let c = candidate().with_email("not-an-email");
        let result = ApplicantValidator::validate(&c, false);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("e-mail")));
    }

    #[test]
    fn test_checksum_is_warning_when_lenient() {
        let mut c = candidate();
        c.national_id = "12345678901".to_string();

        let lenient = ApplicantValidator::validate(&c, false);
        assert!(lenient.is_valid);
        assert_eq!(lenient.warnings.len(), 1);

        let strict = ApplicantValidator::validate(&c, true);
        assert!(!strict.is_valid);
        assert!(strict.errors[0].contains("checksum"));
    }

    #[test]
    fn test_invalid_phone_reported() {
        let mut c = candidate();
        c.phone = "12".to_string();
        let result = ApplicantValidator::validate(&c, false);
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("phone"));
    }
}
