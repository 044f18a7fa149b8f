pub mod document;
pub mod owner;
pub mod property;

pub use document::{Document, DocumentType, NewDocument};
pub use owner::{HouseOwner, VerificationStatus};
pub use property::{NewProperty, Property, PropertyType};

/// Backend tables this application reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    HouseOwners,
    Properties,
    Documents,
}

impl Table {
    pub const fn as_str(self) -> &'static str {
        match self {
            Table::HouseOwners => "house_owners",
            Table::Properties => "properties",
            Table::Documents => "documents",
        }
    }

    /// Column that ties a row to its owning user
    pub const fn owner_column(self) -> &'static str {
        match self {
            Table::HouseOwners => "id",
            Table::Properties | Table::Documents => "owner_id",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
