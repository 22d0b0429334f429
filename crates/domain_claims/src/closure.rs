//! File closure and settlement reconciliation
//!
//! Closing is the only way a file reaches [`FileStatus::Closed`] and the
//! only write that sets `locked`. Status, lock, reason, date and settlement
//! are written together in one compare-and-set, so a concurrent write
//! either lands before the closure or is refused after it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use core_kernel::{Actor, Capability, Currency, CustomerFileId, Money, MoneyError};
use domain_audit::{AuditAction, AuditEntry};

use crate::customer_file::{Closure, CustomerFile, FilePatch, FileStatus, Settlement};
use crate::error::ClaimError;
use crate::lifecycle::LifecycleService;

/// Settlement figures as entered at closure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInput {
    pub gross_payout: Option<Money>,
    pub expenses: Option<Money>,
    pub dealer_commission: Option<Money>,
    pub net_profit: Option<Money>,
}

/// A file that has just been closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedFile {
    pub file: CustomerFile,
    pub closure: Closure,
}

/// Fills in the net entitlement when it was left blank
///
/// `net = gross - expenses - commission`, treating missing figures as zero.
/// An explicit net is kept as entered. If no figure at all is given the
/// settlement stays empty. All figures, the net included, must share one
/// currency.
pub fn reconcile(input: SettlementInput) -> Result<Settlement, ClaimError> {
    let figures = [
        ("gross_payout", input.gross_payout),
        ("expenses", input.expenses),
        ("dealer_commission", input.dealer_commission),
    ];
    for (field, value) in figures {
        if value.is_some_and(|m| m.is_negative()) {
            return Err(ClaimError::invalid_field(field, format!("{} may not be negative", field)));
        }
    }

    let currency = settlement_currency(&input)?;

    let net_profit = match input.net_profit {
        Some(net) => Some(net),
        None => match currency {
            None => None,
            Some(currency) => {
                let zero = Money::zero(currency);
                let gross = input.gross_payout.unwrap_or(zero);
                let net = gross
                    .checked_sub(&input.expenses.unwrap_or(zero))?
                    .checked_sub(&input.dealer_commission.unwrap_or(zero))?;
                Some(net)
            }
        },
    };

    Ok(Settlement {
        gross_payout: input.gross_payout,
        expenses: input.expenses,
        dealer_commission: input.dealer_commission,
        net_profit,
    })
}

/// The one currency shared by every figure entered, if any was entered
fn settlement_currency(input: &SettlementInput) -> Result<Option<Currency>, MoneyError> {
    let mut currency: Option<Currency> = None;
    for money in [input.gross_payout, input.expenses, input.dealer_commission, input.net_profit]
        .into_iter()
        .flatten()
    {
        match currency {
            None => currency = Some(money.currency()),
            Some(c) if c != money.currency() => {
                return Err(MoneyError::CurrencyMismatch(c.to_string(), money.currency().to_string()));
            }
            Some(_) => {}
        }
    }
    Ok(currency)
}

impl LifecycleService {
    /// Closes a file, settling its money and locking it
    #[instrument(skip_all, fields(actor = %actor.id, file_id = %file_id))]
    pub async fn close_file(
        &self,
        actor: &Actor,
        file_id: CustomerFileId,
        reason: &str,
        settlement: SettlementInput,
    ) -> Result<ClosedFile, ClaimError> {
        let file = self.store.get_file(file_id).await?;
        self.authorize(actor, Capability::CloseFile, Some(&file))?;
        Self::ensure_unlocked(&file)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ClaimError::missing("closure_reason"));
        }

        let closure = Closure {
            reason: reason.to_string(),
            closed_at: Utc::now(),
            settlement: reconcile(settlement)?,
        };

        let closed = self
            .store
            .update_file_atomic(file_id, file.version, &FilePatch::closing(closure.clone()))
            .await?;
        info!(
            net_profit = ?closure.settlement.net_profit.map(|m| m.amount()),
            "customer file closed and locked"
        );

        self.audit
            .submit(
                AuditEntry::new(AuditAction::CloseFile, closed.entity_ref())
                    .by(actor)
                    .with_before(file.status_snapshot())
                    .with_after(json!({
                        "status": FileStatus::Closed.as_str(),
                        "label": FileStatus::Closed.label(),
                        "reason": closure.reason,
                        "settlement": serde_json::to_value(&closure.settlement).unwrap_or_default(),
                    }))
                    .with_audience(closed.audience()),
            )
            .await;

        Ok(ClosedFile { file: closed, closure })
    }
}
