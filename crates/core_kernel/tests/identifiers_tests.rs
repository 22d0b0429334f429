//! Unit tests for the identifier types
//!
//! Covers creation, parsing, conversion and display for both the UUID-backed
//! record identifiers and the numeric identity-provider keys.

use core_kernel::{
    CustomerFileId, DocumentId, FileTypeId, PaymentId, NoteId,
    AuditEventId, NotificationId, UserId, DealerId,
};
use uuid::Uuid;

mod customer_file_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = CustomerFileId::new();
        let id2 = CustomerFileId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = CustomerFileId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = CustomerFileId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = CustomerFileId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_from_str_with_and_without_prefix() {
        let original = CustomerFileId::new();
        let with_prefix: CustomerFileId = original.to_string().parse().unwrap();
        let without_prefix: CustomerFileId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, with_prefix);
        assert_eq!(original, without_prefix);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("CF-not-a-uuid".parse::<CustomerFileId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = CustomerFileId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(CustomerFileId::prefix(), "CF");
        assert_eq!(FileTypeId::prefix(), "FT");
        assert_eq!(DocumentId::prefix(), "DOC");
        assert_eq!(PaymentId::prefix(), "PAY");
        assert_eq!(NoteId::prefix(), "NOTE");
        assert_eq!(AuditEventId::prefix(), "AUD");
        assert_eq!(NotificationId::prefix(), "NTF");
    }
}

mod serial_id_tests {
    use super::*;

    #[test]
    fn test_value_round_trip() {
        let id = UserId::new(1234);
        let raw: i64 = id.into();
        assert_eq!(raw, 1234);
        assert_eq!(UserId::from(raw), id);
    }

    #[test]
    fn test_display_is_the_number() {
        assert_eq!(DealerId::new(17).to_string(), "17");
    }

    #[test]
    fn test_system_user_is_zero() {
        assert_eq!(UserId::SYSTEM.value(), 0);
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&DealerId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
