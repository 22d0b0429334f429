//! Notification fan-out
//!
//! [`plan`] is pure: it decides, from an audit event alone, which batches of
//! notifications to send and how each is worded. [`NotificationFanOut`]
//! resolves the recipients of each batch and writes the rows. Nothing here
//! returns an error; failures are logged and the batch is skipped.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use core_kernel::{Actor, Role, UserId};

use crate::event::{AuditAction, AuditEvent};
use crate::notification::{NotificationBatch, NotificationType, Recipients};
use crate::ports::{NotificationStore, UserDirectory};

fn batch(
    recipients: Recipients,
    actor: &Actor,
    title: impl Into<String>,
    message: impl Into<String>,
    kind: NotificationType,
    link: Option<String>,
) -> NotificationBatch {
    NotificationBatch {
        recipients,
        exclude: Some(actor.id),
        title: title.into(),
        message: message.into(),
        kind,
        link,
    }
}

fn roles(roles: &[Role]) -> Recipients {
    Recipients::Roles(roles.to_vec())
}

/// Numeric reference for a dealer actor: the dealer organisation if known
fn dealer_ref(actor: &Actor) -> String {
    match actor.dealer_id {
        Some(dealer_id) => format!("#{}", dealer_id),
        None => format!("#{}", actor.id),
    }
}

/// Decides which notification batches an event produces
pub fn plan(event: &AuditEvent) -> Vec<NotificationBatch> {
    let actor = &event.actor;
    let subject = event.entity.describe().to_string();
    let link = match (event.entity.entity_type.as_str(), &event.entity.entity_id) {
        ("customer", Some(id)) => Some(format!("/customers/{}", id)),
        _ => None,
    };

    match event.action {
        AuditAction::CreateCustomer if actor.role == Role::Dealer => {
            let reference = dealer_ref(actor);
            vec![
                batch(
                    roles(&[Role::Superadmin]),
                    actor,
                    "New customer file",
                    format!(
                        "Dealer {} ({}) opened a new file for {}",
                        actor.display_name, reference, subject
                    ),
                    NotificationType::Info,
                    link.clone(),
                ),
                batch(
                    roles(&[Role::Admin, Role::Staff]),
                    actor,
                    "New customer file",
                    format!("Dealer {} opened a new file for {}", reference, subject),
                    NotificationType::Info,
                    link,
                ),
            ]
        }
        AuditAction::CreateCustomer => vec![batch(
            roles(Role::ADMIN_ADJACENT),
            actor,
            "New customer file",
            format!("{} opened a new file for {}", actor.display_name, subject),
            NotificationType::Info,
            link,
        )],
        AuditAction::UploadDocument => vec![batch(
            roles(Role::ADMIN_ADJACENT),
            actor,
            "Document uploaded",
            format!("{} uploaded a document to the file of {}", actor.display_name, subject),
            NotificationType::Info,
            link,
        )],
        AuditAction::ReviewDocument => {
            let rejected = event
                .after
                .as_ref()
                .and_then(|after| after.get("approval"))
                .and_then(|v| v.as_str())
                == Some("rejected");
            let (verb, kind) = if rejected {
                ("rejected", NotificationType::Warning)
            } else {
                ("approved", NotificationType::Success)
            };
            vec![batch(
                roles(Role::ADMIN_ADJACENT),
                actor,
                "Document reviewed",
                format!("{} {} a document of {}", actor.display_name, verb, subject),
                kind,
                link,
            )]
        }
        AuditAction::CreatePayment => vec![batch(
            roles(Role::FINANCIAL),
            actor,
            "Payment recorded",
            format!("{} recorded a payment on the file of {}", actor.display_name, subject),
            NotificationType::Info,
            link,
        )],
        AuditAction::CloseFile => vec![batch(
            roles(Role::ADMINISTRATIVE),
            actor,
            "File closed",
            format!("{} closed the file of {}", actor.display_name, subject),
            NotificationType::Success,
            link,
        )],
        AuditAction::DeleteCustomer => vec![batch(
            roles(&[Role::Superadmin]),
            actor,
            "Customer file deleted",
            format!("{} deleted the file of {}", actor.display_name, subject),
            NotificationType::Warning,
            None,
        )],
        AuditAction::CreateDealer => vec![batch(
            roles(&[Role::Superadmin]),
            actor,
            "New dealer",
            format!("{} created dealer {}", actor.display_name, subject),
            NotificationType::Info,
            None,
        )],
        AuditAction::CreateUser => vec![batch(
            roles(&[Role::Superadmin]),
            actor,
            "New user",
            format!("{} created user {}", actor.display_name, subject),
            NotificationType::Info,
            None,
        )],
        AuditAction::Login if actor.role.is_administrative() => vec![batch(
            roles(&[Role::Superadmin]),
            actor,
            "Administrator sign-in",
            format!("{} ({}) signed in", actor.display_name, actor.role),
            NotificationType::Info,
            None,
        )],
        AuditAction::UpdateStatus => status_batches(event, &subject, link),
        AuditAction::Login
        | AuditAction::UpdateCustomer
        | AuditAction::AddNote
        | AuditAction::LoginFailed
        | AuditAction::PurgeAudit => Vec::new(),
    }
}

fn status_batches(event: &AuditEvent, subject: &str, link: Option<String>) -> Vec<NotificationBatch> {
    let actor = &event.actor;
    let old = AuditEvent::snapshot_label(event.before.as_ref()).unwrap_or_else(|| "-".to_string());
    let new = AuditEvent::snapshot_label(event.after.as_ref()).unwrap_or_else(|| "-".to_string());

    let mut batches = vec![batch(
        roles(Role::ADMINISTRATIVE),
        actor,
        "Status changed",
        format!("{}: {} -> {} (by {})", subject, old, new, actor.display_name),
        NotificationType::Info,
        link.clone(),
    )];

    if let Some(dealer_id) = event.audience.dealer_id {
        batches.push(batch(
            Recipients::Dealer(dealer_id),
            actor,
            "Customer status updated",
            format!("The file of your customer {} moved to {}", subject, new),
            NotificationType::Info,
            link.clone(),
        ));
    }

    if let Some(customer) = event.audience.customer_user_id {
        batches.push(batch(
            Recipients::Users(vec![customer]),
            actor,
            "Your file was updated",
            format!("Your claim file is now in status: {}", new),
            NotificationType::Info,
            link,
        ));
    }

    batches
}

/// Resolves recipients and writes notification rows
#[derive(Clone)]
pub struct NotificationFanOut {
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn NotificationStore>,
}

impl NotificationFanOut {
    pub fn new(users: Arc<dyn UserDirectory>, store: Arc<dyn NotificationStore>) -> Self {
        Self { users, store }
    }

    /// Sends every batch [`plan`] produces and returns how many users were notified
    pub async fn fan_out(&self, event: &AuditEvent) -> usize {
        let mut notified = 0;

        for batch in plan(event) {
            let recipients = match self.resolve(&batch).await {
                Ok(recipients) => recipients,
                Err(e) => {
                    warn!(action = %event.action, error = %e, "could not resolve notification recipients");
                    continue;
                }
            };
            if recipients.is_empty() {
                continue;
            }

            let notifications = batch.to_notifications(&recipients, Utc::now());
            match self.store.create_batch(&notifications).await {
                Ok(written) => notified += written,
                Err(e) => warn!(action = %event.action, error = %e, "failed to store notifications"),
            }
        }

        debug!(action = %event.action, notified, "fan-out finished");
        notified
    }

    async fn resolve(&self, batch: &NotificationBatch) -> Result<Vec<UserId>, core_kernel::PortError> {
        let ids: Vec<UserId> = match &batch.recipients {
            Recipients::Users(ids) => ids.clone(),
            Recipients::Roles(roles) => self
                .users
                .active_users_with_roles(roles)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect(),
            Recipients::Dealer(dealer_id) => self
                .users
                .users_of_dealer(*dealer_id)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect(),
        };

        // Ordered and deduplicated
        let unique: BTreeSet<UserId> = ids
            .into_iter()
            .filter(|id| Some(*id) != batch.exclude)
            .collect();
        Ok(unique.into_iter().collect())
    }
}
