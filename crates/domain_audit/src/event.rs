//! Audit events
//!
//! An [`AuditEntry`] is what callers submit; the recorder stamps it with an
//! id, a timestamp and a resolved actor to produce the immutable
//! [`AuditEvent`] that gets stored and fanned out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use core_kernel::{Actor, AuditEventId, DealerId, Role, UserId};

/// Kind of action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateCustomer,
    UpdateCustomer,
    DeleteCustomer,
    UpdateStatus,
    UploadDocument,
    ReviewDocument,
    CreatePayment,
    CloseFile,
    AddNote,
    CreateDealer,
    CreateUser,
    Login,
    LoginFailed,
    PurgeAudit,
}

impl AuditAction {
    /// Stored name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateCustomer => "CREATE_CUSTOMER",
            AuditAction::UpdateCustomer => "UPDATE_CUSTOMER",
            AuditAction::DeleteCustomer => "DELETE_CUSTOMER",
            AuditAction::UpdateStatus => "UPDATE_STATUS",
            AuditAction::UploadDocument => "UPLOAD_DOCUMENT",
            AuditAction::ReviewDocument => "REVIEW_DOCUMENT",
            AuditAction::CreatePayment => "CREATE_PAYMENT",
            AuditAction::CloseFile => "CLOSE_FILE",
            AuditAction::AddNote => "ADD_NOTE",
            AuditAction::CreateDealer => "CREATE_DEALER",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::Login => "LOGIN",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::PurgeAudit => "PURGE_AUDIT",
        }
    }

    /// Parses a stored action name
    pub fn parse(s: &str) -> Option<Self> {
        let action = match s {
            "CREATE_CUSTOMER" => AuditAction::CreateCustomer,
            "UPDATE_CUSTOMER" => AuditAction::UpdateCustomer,
            "DELETE_CUSTOMER" => AuditAction::DeleteCustomer,
            "UPDATE_STATUS" => AuditAction::UpdateStatus,
            "UPLOAD_DOCUMENT" => AuditAction::UploadDocument,
            "REVIEW_DOCUMENT" => AuditAction::ReviewDocument,
            "CREATE_PAYMENT" => AuditAction::CreatePayment,
            "CLOSE_FILE" => AuditAction::CloseFile,
            "ADD_NOTE" => AuditAction::AddNote,
            "CREATE_DEALER" => AuditAction::CreateDealer,
            "CREATE_USER" => AuditAction::CreateUser,
            "LOGIN" => AuditAction::Login,
            "LOGIN_FAILED" => AuditAction::LoginFailed,
            "PURGE_AUDIT" => AuditAction::PurgeAudit,
            _ => return None,
        };
        Some(action)
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity an audit event is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
}

impl EntityRef {
    /// Entity type used for customer files
    pub const CUSTOMER_FILE: &'static str = "customer";

    pub fn new(
        entity_type: impl Into<String>,
        entity_id: Option<String>,
        entity_name: Option<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            entity_name,
        }
    }

    /// Reference to a customer file
    pub fn customer_file(id: impl fmt::Display, name: impl Into<String>) -> Self {
        Self::new(Self::CUSTOMER_FILE, Some(id.to_string()), Some(name.into()))
    }

    /// Name if known, else id, else the entity type
    pub fn describe(&self) -> &str {
        self.entity_name
            .as_deref()
            .or(self.entity_id.as_deref())
            .unwrap_or(&self.entity_type)
    }
}

/// Who, besides the office roles, has a stake in the entity
///
/// Only used to target notifications; never shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audience {
    pub dealer_id: Option<DealerId>,
    pub customer_user_id: Option<UserId>,
}

/// An action submitted for recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Absent for unauthenticated events; recorded as the system actor
    pub actor: Option<Actor>,
    pub action: AuditAction,
    pub entity: EntityRef,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub audience: Audience,
}

impl AuditEntry {
    pub fn new(action: AuditAction, entity: EntityRef) -> Self {
        Self {
            actor: None,
            action,
            entity,
            before: None,
            after: None,
            audience: Audience::default(),
        }
    }

    /// Sets the acting user
    pub fn by(mut self, actor: &Actor) -> Self {
        self.actor = Some(actor.clone());
        self
    }

    pub fn with_before(mut self, before: Value) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: Value) -> Self {
        self.after = Some(after);
        self
    }

    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    /// Successful sign-in of a user
    pub fn login(actor: &Actor) -> Self {
        Self::new(
            AuditAction::Login,
            EntityRef::new("user", Some(actor.id.to_string()), Some(actor.display_name.clone())),
        )
        .by(actor)
        .with_after(json!({ "role": actor.role }))
    }

    /// Failed sign-in; there is no authenticated actor
    pub fn login_failed(username: impl Into<String>) -> Self {
        Self::new(AuditAction::LoginFailed, EntityRef::new("user", None, Some(username.into())))
    }

    /// A dealer organisation was created
    pub fn dealer_created(actor: &Actor, dealer_id: DealerId, name: impl Into<String>) -> Self {
        Self::new(
            AuditAction::CreateDealer,
            EntityRef::new("dealer", Some(dealer_id.to_string()), Some(name.into())),
        )
        .by(actor)
    }

    /// A user account was created
    pub fn user_created(actor: &Actor, user_id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self::new(
            AuditAction::CreateUser,
            EntityRef::new("user", Some(user_id.to_string()), Some(name.into())),
        )
        .by(actor)
        .with_after(json!({ "role": role }))
    }
}

/// An immutable, stored audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub actor: Actor,
    pub action: AuditAction,
    pub entity: EntityRef,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub audience: Audience,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Stamps an entry, substituting the system actor when none was given
    pub fn from_entry(entry: AuditEntry, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: AuditEventId::new_v7(),
            actor: entry.actor.unwrap_or_else(Actor::system),
            action: entry.action,
            entity: entry.entity,
            before: entry.before,
            after: entry.after,
            audience: entry.audience,
            occurred_at,
        }
    }

    /// Human label of a status snapshot, falling back to its raw value
    pub fn snapshot_label(snapshot: Option<&Value>) -> Option<String> {
        let snapshot = snapshot?;
        snapshot
            .get("label")
            .or_else(|| snapshot.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_actor_becomes_system() {
        let entry = AuditEntry::login_failed("mallory");
        let event = AuditEvent::from_entry(entry, Utc::now());
        assert_eq!(event.actor.id, UserId::SYSTEM);
        assert_eq!(event.actor.role, Role::System);
        assert_eq!(event.actor.display_name, "system");
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in [AuditAction::CreateCustomer, AuditAction::CloseFile, AuditAction::PurgeAudit] {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(
            serde_json::to_value(AuditAction::UpdateStatus).unwrap(),
            json!("UPDATE_STATUS")
        );
    }

    #[test]
    fn test_snapshot_label_prefers_label() {
        let snapshot = json!({ "status": "document_stage", "label": "Document stage" });
        assert_eq!(AuditEvent::snapshot_label(Some(&snapshot)).as_deref(), Some("Document stage"));
        let bare = json!({ "status": "closed" });
        assert_eq!(AuditEvent::snapshot_label(Some(&bare)).as_deref(), Some("closed"));
        assert_eq!(AuditEvent::snapshot_label(None), None);
    }
}
