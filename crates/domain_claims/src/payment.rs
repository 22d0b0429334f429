//! Payments recorded against a customer file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CustomerFileId, Money, PaymentId, UserId};

/// Direction of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Received, e.g. from the insurer
    Incoming,
    /// Paid out, e.g. to the customer or a dealer
    Outgoing,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Incoming => "incoming",
            PaymentKind::Outgoing => "outgoing",
        }
    }
}

/// A payment on a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub file_id: CustomerFileId,
    pub amount: Money,
    pub kind: PaymentKind,
    pub description: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub recorded_by: UserId,
}

/// Caller input for a new payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount: Money,
    pub kind: PaymentKind,
    pub description: Option<String>,
    /// Defaults to now
    pub paid_at: Option<DateTime<Utc>>,
}

impl NewPayment {
    pub fn new(amount: Money, kind: PaymentKind) -> Self {
        Self {
            amount,
            kind,
            description: None,
            paid_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn into_payment(self, file_id: CustomerFileId, recorded_by: UserId, now: DateTime<Utc>) -> Payment {
        Payment {
            id: PaymentId::new_v7(),
            file_id,
            amount: self.amount,
            kind: self.kind,
            description: self.description,
            paid_at: self.paid_at.unwrap_or(now),
            recorded_by,
        }
    }
}
