//! Pre-built Test Fixtures
//!
//! Predictable data shared across the test suite: valid national IDs, a
//! motor-damage file type requiring documents `A` and `B`, and a small
//! office with one user per role plus the dealer "Acme Motors" (#42).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use rust_decimal_macros::dec;

use core_kernel::{Actor, Currency, DealerId, Money, Role, UserId};
use domain_applicant::ApplicantCandidate;
use domain_audit::DirectoryUser;
use domain_claims::{DocumentRequirement, FileType};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn lira(amount: rust_decimal::Decimal) -> Money {
        Money::lira(amount)
    }

    /// Gross payout of the worked closure example
    pub fn gross_1000() -> Money {
        Money::lira(dec!(1000))
    }

    pub fn expenses_200() -> Money {
        Money::lira(dec!(200))
    }

    pub fn commission_100() -> Money {
        Money::lira(dec!(100))
    }

    /// A euro amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    pub fn damage_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()
    }

    pub fn intake_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }
}

/// National IDs with valid checksums
pub struct NationalIdFixtures;

impl NationalIdFixtures {
    pub const PRIMARY: &'static str = "10000000146";
    pub const SECONDARY: &'static str = "12345678950";
    pub const TERTIARY: &'static str = "98765432150";
    /// Eleven digits, wrong check digits
    pub const BAD_CHECKSUM: &'static str = "10000000147";
}

/// Applicants as they are typed in at intake
pub struct ApplicantFixtures;

impl ApplicantFixtures {
    /// The standard applicant; phone and plate in everyday formatting
    pub fn ali_veli() -> ApplicantCandidate {
        ApplicantCandidate::new("Ali Veli", NationalIdFixtures::PRIMARY, "0532 123 45 67", "34 ABC 123")
    }

    /// Same person as [`Self::ali_veli`], typed differently
    pub fn ali_veli_reformatted() -> ApplicantCandidate {
        ApplicantCandidate::new("  ALI   VELI ", "100 000 001 46", "+90 (532) 123-45-67", "34abc123")
    }

    pub fn zeynep_kaya() -> ApplicantCandidate {
        ApplicantCandidate::new("Zeynep Kaya", NationalIdFixtures::SECONDARY, "05449998877", "06 ZK 99")
            .with_email("zeynep@example.com")
    }

    pub fn mehmet_demir() -> ApplicantCandidate {
        ApplicantCandidate::new("Mehmet Demir", NationalIdFixtures::TERTIARY, "5051112233", "35 MD 2020")
    }
}

/// File type templates
pub struct FileTypeFixtures;

impl FileTypeFixtures {
    /// Requires `A` and `B`; `photo` is optional
    pub fn motor_damage() -> FileType {
        FileType::new(
            "Motor damage",
            vec![
                DocumentRequirement::required("A", "Driving licence"),
                DocumentRequirement::required("B", "Police report"),
                DocumentRequirement::optional("photo", "Damage photos"),
            ],
        )
    }

    /// Nothing required; files start in the application stage
    pub fn consultation() -> FileType {
        FileType::new(
            "Consultation",
            vec![DocumentRequirement::optional("memo", "Meeting memo")],
        )
    }
}

/// One user per role, as seen by the identity provider
pub struct UserFixtures;

impl UserFixtures {
    pub const ROOT: UserId = UserId::new(1);
    pub const ADMIN: UserId = UserId::new(2);
    pub const STAFF: UserId = UserId::new(3);
    pub const ACCOUNTANT: UserId = UserId::new(4);
    pub const ACME_USER: UserId = UserId::new(10);
    pub const OTHER_DEALER_USER: UserId = UserId::new(11);
    pub const CUSTOMER: UserId = UserId::new(20);

    pub const ACME: DealerId = DealerId::new(42);
    pub const OTHER_DEALER: DealerId = DealerId::new(7);

    pub fn superadmin() -> Actor {
        Actor::new(Self::ROOT, "Root", Role::Superadmin)
    }

    pub fn admin() -> Actor {
        Actor::new(Self::ADMIN, "Office Admin", Role::Admin)
    }

    pub fn staff() -> Actor {
        Actor::new(Self::STAFF, "Back Office", Role::Staff)
    }

    pub fn accountant() -> Actor {
        Actor::new(Self::ACCOUNTANT, "Finance", Role::Accountant)
    }

    pub fn acme_motors() -> Actor {
        Actor::dealer(Self::ACME_USER, "Acme Motors", Self::ACME)
    }

    pub fn other_dealer() -> Actor {
        Actor::dealer(Self::OTHER_DEALER_USER, "Beta Garage", Self::OTHER_DEALER)
    }

    pub fn customer() -> Actor {
        Actor::new(Self::CUSTOMER, "Ali Veli", Role::Customer)
    }
}

fn directory_user(actor: Actor) -> DirectoryUser {
    DirectoryUser {
        id: actor.id,
        display_name: actor.display_name,
        role: actor.role,
        active: true,
        dealer_id: actor.dealer_id,
    }
}

/// The directory behind every harness; one inactive admin who must never
/// be notified
pub static OFFICE_DIRECTORY: Lazy<Vec<DirectoryUser>> = Lazy::new(|| {
    let mut users: Vec<DirectoryUser> = [
        UserFixtures::superadmin(),
        UserFixtures::admin(),
        UserFixtures::staff(),
        UserFixtures::accountant(),
        UserFixtures::acme_motors(),
        UserFixtures::other_dealer(),
        UserFixtures::customer(),
    ]
    .into_iter()
    .map(directory_user)
    .collect();

    users.push(DirectoryUser {
        id: UserId::new(99),
        display_name: "Former Admin".to_string(),
        role: Role::Admin,
        active: false,
        dealer_id: None,
    });
    users
});

#[cfg(test)]
mod tests {
    use super::*;
    use domain_applicant::national_id_checksum_valid;

    #[test]
    fn test_fixture_ids_have_valid_checksums() {
        for id in [NationalIdFixtures::PRIMARY, NationalIdFixtures::SECONDARY, NationalIdFixtures::TERTIARY] {
            assert!(national_id_checksum_valid(id), "{id}");
        }
        assert!(!national_id_checksum_valid(NationalIdFixtures::BAD_CHECKSUM));
    }

    #[test]
    fn test_directory_has_one_inactive_user() {
        assert_eq!(OFFICE_DIRECTORY.iter().filter(|u| !u.active).count(), 1);
    }
}
