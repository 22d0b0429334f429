//! Free-text notes on a customer file
//!
//! Notes are append-only and remain writable after the file is locked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CustomerFileId, NoteId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub file_id: CustomerFileId,
    pub author: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(file_id: CustomerFileId, author: UserId, body: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: NoteId::new_v7(),
            file_id,
            author,
            body: body.into(),
            created_at: now,
        }
    }
}
