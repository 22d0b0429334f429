//! Document completeness evaluation
//!
//! A required code is satisfied when at least one non-rejected document's
//! type code matches it, ignoring case. In [`MatchMode::Loose`] a document
//! whose type code merely contains the required code also counts, so an
//! upload typed `police_report_scan` satisfies `police_report`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::customer_file::DocumentStatus;
use crate::document::Document;

/// How document type codes are compared with required codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Loose,
    Exact,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Loose => f.write_str("loose"),
            MatchMode::Exact => f.write_str("exact"),
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loose" => Ok(MatchMode::Loose),
            "exact" => Ok(MatchMode::Exact),
            other => Err(format!("unknown document match mode '{}'", other)),
        }
    }
}

/// Outcome of an evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub complete: bool,
    /// Unsatisfied required codes in template order
    pub missing: Vec<String>,
}

impl Completeness {
    pub fn document_status(&self) -> DocumentStatus {
        if self.complete {
            DocumentStatus::Complete
        } else {
            DocumentStatus::Incomplete
        }
    }
}

fn satisfies(type_code: &str, required: &str, mode: MatchMode) -> bool {
    let type_code = type_code.to_lowercase();
    let required = required.to_lowercase();
    match mode {
        MatchMode::Exact => type_code == required,
        MatchMode::Loose => type_code == required || type_code.contains(&required),
    }
}

/// Returns true if the required code is met by any counting document
pub fn is_satisfied(required: &str, documents: &[Document], mode: MatchMode) -> bool {
    documents
        .iter()
        .filter(|d| d.approval.counts_towards_completeness())
        .any(|d| satisfies(&d.type_code, required, mode))
}

/// Compares uploaded documents against required codes
pub fn evaluate<S: AsRef<str>>(required: &[S], documents: &[Document], mode: MatchMode) -> Completeness {
    let missing: Vec<String> = required
        .iter()
        .map(AsRef::as_ref)
        .filter(|code| !is_satisfied(code, documents, mode))
        .map(str::to_string)
        .collect();

    Completeness {
        complete: missing.is_empty(),
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ApprovalStatus, DocumentUpload};
    use chrono::Utc;
    use core_kernel::{CustomerFileId, UserId};

    fn doc(code: &str, approval: ApprovalStatus) -> Document {
        let mut d = DocumentUpload::new(code, "blob://x").into_document(CustomerFileId::new(), UserId::new(1), Utc::now());
        d.approval = approval;
        d
    }

    #[test]
    fn test_no_requirements_is_complete() {
        let required: [&str; 0] = [];
        assert!(evaluate(&required, &[], MatchMode::Exact).complete);
    }

    #[test]
    fn test_missing_keeps_template_order() {
        let result = evaluate(&["C", "A", "B"], &[doc("a", ApprovalStatus::Pending)], MatchMode::Exact);
        assert!(!result.complete);
        assert_eq!(result.missing, vec!["C", "B"]);
    }

    #[test]
    fn test_rejected_documents_do_not_count() {
        let result = evaluate(&["A"], &[doc("A", ApprovalStatus::Rejected)], MatchMode::Loose);
        assert_eq!(result.missing, vec!["A"]);

        let result = evaluate(
            &["A"],
            &[doc("A", ApprovalStatus::Rejected), doc("A", ApprovalStatus::Approved)],
            MatchMode::Loose,
        );
        assert!(result.complete);
    }

    #[test]
    fn test_loose_mode_accepts_containment() {
        let docs = [doc("Police_Report_Scan", ApprovalStatus::Pending)];
        assert!(evaluate(&["police_report"], &docs, MatchMode::Loose).complete);
        assert!(!evaluate(&["police_report"], &docs, MatchMode::Exact).complete);
    }

    #[test]
    fn test_match_mode_parse() {
        assert_eq!("EXACT".parse::<MatchMode>().unwrap(), MatchMode::Exact);
        assert!("fuzzy".parse::<MatchMode>().is_err());
        assert_eq!(MatchMode::default(), MatchMode::Loose);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::document::{ApprovalStatus, DocumentUpload};
    use chrono::Utc;
    use core_kernel::{CustomerFileId, UserId};
    use proptest::prelude::*;

    fn doc(code: &str, approval: ApprovalStatus) -> Document {
        let mut d = DocumentUpload::new(code, "blob://x").into_document(CustomerFileId::new(), UserId::new(1), Utc::now());
        d.approval = approval;
        d
    }

    fn approval() -> impl Strategy<Value = ApprovalStatus> {
        prop_oneof![
            Just(ApprovalStatus::Pending),
            Just(ApprovalStatus::Approved),
            Just(ApprovalStatus::Rejected),
        ]
    }

    proptest! {
        #[test]
        fn adding_a_counting_document_never_grows_missing(
            required in prop::collection::vec("[a-d]", 0..4),
            existing in prop::collection::vec(("[a-e]{1,2}", approval()), 0..6),
            extra in "[a-e]{1,2}",
            extra_approval in prop_oneof![Just(ApprovalStatus::Pending), Just(ApprovalStatus::Approved)],
            exact in any::<bool>()
        ) {
            let mode = if exact { MatchMode::Exact } else { MatchMode::Loose };
            let mut docs: Vec<Document> = existing.iter().map(|(c, a)| doc(c, *a)).collect();
            let before = evaluate(&required, &docs, mode);

            docs.push(doc(&extra, extra_approval));
            let after = evaluate(&required, &docs, mode);

            prop_assert!(after.missing.iter().all(|m| before.missing.contains(m)));
            prop_assert!(!before.complete || after.complete);
        }
    }
}
