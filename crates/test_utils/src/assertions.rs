//! Custom Test Assertions
//!
//! Assertion helpers for claim files that fail with a readable message
//! instead of a bare `left != right`.

use rust_decimal::Decimal;

use core_kernel::{Money, UserId};
use domain_audit::{AuditAction, AuditEvent, Notification};
use domain_claims::{CustomerFile, DocumentStatus, FileStatus, Settlement};

/// Asserts an optional settlement figure holds exactly `expected` lira
pub fn assert_lira(actual: Option<Money>, expected: Decimal) {
    let money = actual.unwrap_or_else(|| panic!("Expected {} TRY, got no figure", expected));
    assert_eq!(
        money,
        Money::lira(expected),
        "Expected {} TRY, got {} {}",
        expected,
        money.amount(),
        money.currency().code()
    );
}

/// Asserts `net = gross - expenses - commission`, missing figures counting as zero
pub fn assert_settlement_balances(settlement: &Settlement) {
    let net = settlement
        .net_profit
        .unwrap_or_else(|| panic!("Settlement has no net figure: {:?}", settlement));
    let figure = |m: Option<Money>| m.map(|m| m.amount()).unwrap_or_default();

    let expected = figure(settlement.gross_payout)
        - figure(settlement.expenses)
        - figure(settlement.dealer_commission);
    assert_eq!(
        net.amount(),
        expected,
        "Net {} does not balance gross {:?} - expenses {:?} - commission {:?}",
        net.amount(),
        settlement.gross_payout,
        settlement.expenses,
        settlement.dealer_commission
    );
}

/// Asserts a file is closed, locked and carries its closure record
pub fn assert_closed_and_locked(file: &CustomerFile) {
    assert_eq!(file.status, FileStatus::Closed, "File {} is {}, not closed", file.id, file.status);
    assert!(file.locked, "Closed file {} is not locked", file.id);
    assert!(file.closure.is_some(), "Closed file {} has no closure record", file.id);
}

/// Asserts the lock flag agrees with the status
pub fn assert_lock_consistent(file: &CustomerFile) {
    assert_eq!(
        file.locked,
        file.status == FileStatus::Closed,
        "File {} has status {} but locked={}",
        file.id,
        file.status,
        file.locked
    );
}

/// Asserts the file has left the pre-review stages because its documents are complete
pub fn assert_advanced_by_documents(file: &CustomerFile) {
    assert_eq!(
        file.document_status,
        DocumentStatus::Complete,
        "File {} documents are not complete",
        file.id
    );
    assert_eq!(
        file.status,
        FileStatus::ApplicationStage,
        "File {} did not advance to the application stage (status {})",
        file.id,
        file.status
    );
}

/// Asserts the audit trail holds `expected` in this relative order
///
/// Other actions may appear in between.
pub fn assert_actions_in_order(events: &[AuditEvent], expected: &[AuditAction]) {
    let actual: Vec<AuditAction> = events.iter().map(|e| e.action).collect();
    let mut remaining = expected.iter().peekable();
    for action in &actual {
        if remaining.peek() == Some(&action) {
            remaining.next();
        }
    }
    assert!(
        remaining.peek().is_none(),
        "Audit trail {:?} does not contain {:?} in order",
        actual,
        expected
    );
}

/// Notifications addressed to one user
pub fn inbox(notifications: &[Notification], user_id: UserId) -> Vec<&Notification> {
    notifications.iter().filter(|n| n.user_id == user_id).collect()
}

/// Asserts the user received a notification whose message contains `needle`
pub fn assert_notified(notifications: &[Notification], user_id: UserId, needle: &str) {
    let inbox = inbox(notifications, user_id);
    assert!(
        inbox.iter().any(|n| n.message.contains(needle) || n.title.contains(needle)),
        "User {} was not notified about '{}'; inbox: {:?}",
        user_id,
        needle,
        inbox.iter().map(|n| &n.message).collect::<Vec<_>>()
    );
}

/// Asserts the user received nothing at all
pub fn assert_not_notified(notifications: &[Notification], user_id: UserId) {
    let inbox = inbox(notifications, user_id);
    assert!(
        inbox.is_empty(),
        "User {} should not have been notified, got {:?}",
        user_id,
        inbox.iter().map(|n| &n.message).collect::<Vec<_>>()
    );
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!("Expected Err matching {}, got Ok({:?})", stringify!($pattern), value),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_settlement_balances() {
        let settlement = Settlement {
            gross_payout: Some(Money::lira(dec!(1000))),
            expenses: Some(Money::lira(dec!(200))),
            dealer_commission: None,
            net_profit: Some(Money::lira(dec!(800))),
        };
        assert_settlement_balances(&settlement);
    }

    #[test]
    #[should_panic(expected = "does not balance")]
    fn test_settlement_imbalance_panics() {
        let settlement = Settlement {
            gross_payout: Some(Money::lira(dec!(1000))),
            expenses: None,
            dealer_commission: None,
            net_profit: Some(Money::lira(dec!(999))),
        };
        assert_settlement_balances(&settlement);
    }

    #[test]
    fn test_actions_in_order_allows_gaps() {
        use domain_audit::{Audience, EntityRef};
        use core_kernel::{Actor, AuditEventId};

        let event = |action| AuditEvent {
            id: AuditEventId::new(),
            actor: Actor::system(),
            action,
            entity: EntityRef::customer_file("CF-1", "Ali Veli"),
            before: None,
            after: None,
            audience: Audience::default(),
            occurred_at: chrono::Utc::now(),
        };
        let events = vec![
            event(AuditAction::CreateCustomer),
            event(AuditAction::UploadDocument),
            event(AuditAction::UpdateStatus),
            event(AuditAction::CloseFile),
        ];
        assert_actions_in_order(&events, &[AuditAction::CreateCustomer, AuditAction::CloseFile]);
    }
}
