//! File type templates

use serde::{Deserialize, Serialize};

use core_kernel::FileTypeId;

/// One document slot of a file type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequirement {
    pub code: String,
    pub label: String,
    /// Only required entries take part in completeness
    pub required: bool,
}

impl DocumentRequirement {
    pub fn required(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            required: true,
        }
    }

    pub fn optional(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            required: false,
        }
    }
}

/// A named template listing the documents a kind of claim needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileType {
    pub id: FileTypeId,
    pub name: String,
    pub requirements: Vec<DocumentRequirement>,
}

impl FileType {
    pub fn new(name: impl Into<String>, requirements: Vec<DocumentRequirement>) -> Self {
        Self {
            id: FileTypeId::new_v7(),
            name: name.into(),
            requirements,
        }
    }

    /// Codes of required documents in template order
    pub fn required_codes(&self) -> Vec<&str> {
        self.requirements
            .iter()
            .filter(|r| r.required)
            .map(|r| r.code.as_str())
            .collect()
    }

    pub fn has_required_documents(&self) -> bool {
        self.requirements.iter().any(|r| r.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_codes_skip_optional_and_keep_order() {
        let file_type = FileType::new(
            "Motor damage",
            vec![
                DocumentRequirement::required("B", "Police report"),
                DocumentRequirement::optional("photo", "Photos"),
                DocumentRequirement::required("A", "Licence"),
            ],
        );
        assert_eq!(file_type.required_codes(), vec!["B", "A"]);
        assert!(file_type.has_required_documents());
    }
}
