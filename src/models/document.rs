use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    Identity,
    PropertyDeed,
    TaxDocument,
    Certificate,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::Identity,
        DocumentType::PropertyDeed,
        DocumentType::TaxDocument,
        DocumentType::Certificate,
        DocumentType::Other,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentType::Identity => "identity",
            DocumentType::PropertyDeed => "property_deed",
            DocumentType::TaxDocument => "tax_document",
            DocumentType::Certificate => "certificate",
            DocumentType::Other => "other",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown document type: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub property_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Metadata row written after the blob upload succeeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub property_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub mime_type: String,
}
