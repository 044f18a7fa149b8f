use serde::Serialize;

use crate::models::{Document, DocumentType, HouseOwner, Property, PropertyType, VerificationStatus};

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// `512 B`, `1.5 KB`, `2.0 MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// `property_deed` -> `Property Deed`
pub fn format_document_type(document_type: DocumentType) -> String {
    document_type
        .as_str()
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_property_type(property_type: PropertyType) -> String {
    capitalize(property_type.as_str())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub status: VerificationStatus,
    pub label: &'static str,
    pub color: BadgeColor,
}

pub fn verification_badge(status: VerificationStatus) -> Badge {
    let (label, color) = match status {
        VerificationStatus::Verified => ("Verified", BadgeColor::Green),
        VerificationStatus::Pending => ("Pending", BadgeColor::Yellow),
        VerificationStatus::Rejected => ("Rejected", BadgeColor::Red),
    };
    Badge { status, label, color }
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyView {
    #[serde(flatten)]
    pub property: Property,
    pub type_label: String,
}

impl From<Property> for PropertyView {
    fn from(property: Property) -> Self {
        let type_label = format_property_type(property.property_type);
        Self { property, type_label }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub type_label: String,
    pub size_label: String,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        let type_label = format_document_type(document.document_type);
        let size_label = format_file_size(document.file_size);
        Self { document, type_label, size_label }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerView {
    #[serde(flatten)]
    pub owner: HouseOwner,
    pub badge: Badge,
}

impl From<HouseOwner> for OwnerView {
    fn from(owner: HouseOwner) -> Self {
        let badge = verification_badge(owner.verification_status);
        Self { owner, badge }
    }
}

pub fn properties_heading(count: usize) -> String {
    format!("My Properties ({})", count)
}

pub fn documents_heading(count: usize) -> String {
    format!("Documents ({})", count)
}

pub fn documents_title(selected: bool) -> &'static str {
    if selected {
        "Property Documents"
    } else {
        "All Documents"
    }
}

pub const NO_PROPERTIES: &str = "No properties yet";
pub const NO_DOCUMENTS: &str = "No documents uploaded yet";
