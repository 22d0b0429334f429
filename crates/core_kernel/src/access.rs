//! Actors, roles and capabilities
//!
//! Every mutating call into the engine carries an [`Actor`] supplied by the
//! identity collaborator. Handlers never compare role names directly; they
//! ask [`capabilities_for`] whether the role holds the capability the
//! operation needs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::identifiers::{DealerId, UserId};

/// Role held by a user of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full control, including audit retention
    Superadmin,
    /// Office administrator
    Admin,
    /// Back-office staff handling files day to day
    Staff,
    /// Finance team member
    Accountant,
    /// External dealer (garage, agency) bringing in customers
    Dealer,
    /// The insured customer's own account
    Customer,
    /// Internal actor used when no user is authenticated
    System,
}

impl Role {
    /// Roles that receive administrative notifications
    pub const ADMINISTRATIVE: &'static [Role] = &[Role::Superadmin, Role::Admin];

    /// Administrative roles plus back-office staff
    pub const ADMIN_ADJACENT: &'static [Role] = &[Role::Superadmin, Role::Admin, Role::Staff];

    /// Roles that see money movements
    pub const FINANCIAL: &'static [Role] = &[Role::Superadmin, Role::Admin, Role::Accountant];

    /// Returns the storage/wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Accountant => "accountant",
            Role::Dealer => "dealer",
            Role::Customer => "customer",
            Role::System => "system",
        }
    }

    /// Returns true for superadmin and admin
    pub fn is_administrative(&self) -> bool {
        Self::ADMINISTRATIVE.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "accountant" => Ok(Role::Accountant),
            "dealer" => Ok(Role::Dealer),
            "customer" => Ok(Role::Customer),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// An operation-level permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewFile,
    CreateFile,
    UpdateFile,
    UpdateStatus,
    UploadDocument,
    ReviewDocument,
    RecordPayment,
    AppendNote,
    CloseFile,
    DeleteFile,
    PurgeAudit,
}

impl Capability {
    /// Every capability known to the engine
    pub const ALL: &'static [Capability] = &[
        Capability::ViewFile,
        Capability::CreateFile,
        Capability::UpdateFile,
        Capability::UpdateStatus,
        Capability::UploadDocument,
        Capability::ReviewDocument,
        Capability::RecordPayment,
        Capability::AppendNote,
        Capability::CloseFile,
        Capability::DeleteFile,
        Capability::PurgeAudit,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ViewFile => "view_file",
            Capability::CreateFile => "create_file",
            Capability::UpdateFile => "update_file",
            Capability::UpdateStatus => "update_status",
            Capability::UploadDocument => "upload_document",
            Capability::ReviewDocument => "review_document",
            Capability::RecordPayment => "record_payment",
            Capability::AppendNote => "append_note",
            Capability::CloseFile => "close_file",
            Capability::DeleteFile => "delete_file",
            Capability::PurgeAudit => "purge_audit",
        };
        f.write_str(name)
    }
}

/// Returns the capability set granted to a role
pub fn capabilities_for(role: Role) -> HashSet<Capability> {
    use Capability::*;

    let granted: &[Capability] = match role {
        Role::Superadmin => Capability::ALL,
        Role::Admin => &[
            ViewFile, CreateFile, UpdateFile, UpdateStatus, UploadDocument,
            ReviewDocument, RecordPayment, AppendNote, CloseFile, DeleteFile,
        ],
        Role::Staff => &[
            ViewFile, CreateFile, UpdateFile, UpdateStatus, UploadDocument,
            ReviewDocument, AppendNote,
        ],
        Role::Accountant => &[ViewFile, RecordPayment, AppendNote],
        Role::Dealer => &[ViewFile, CreateFile, UpdateFile, UploadDocument, AppendNote],
        Role::Customer => &[ViewFile, UploadDocument],
        Role::System => &[ViewFile],
    };

    granted.iter().copied().collect()
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub display_name: String,
    pub role: Role,
    /// Set for dealer users: the dealer organisation they act for
    pub dealer_id: Option<DealerId>,
}

impl Actor {
    /// Creates an actor without dealer affiliation
    pub fn new(id: UserId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
            dealer_id: None,
        }
    }

    /// Creates a dealer-role actor bound to its dealer organisation
    pub fn dealer(id: UserId, display_name: impl Into<String>, dealer_id: DealerId) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role: Role::Dealer,
            dealer_id: Some(dealer_id),
        }
    }

    /// The fallback actor for unauthenticated events
    pub fn system() -> Self {
        Self::new(UserId::SYSTEM, "system", Role::System)
    }

    /// Returns true if the actor's role grants the capability
    pub fn can(&self, capability: Capability) -> bool {
        capabilities_for(self.role).contains(&capability)
    }
}
