pub mod document_service;
pub mod owner_service;
pub mod property_service;
pub mod reconcile;

pub use document_service::{DocumentError, DocumentService, UploadRequest};
pub use owner_service::OwnerService;
pub use property_service::{PropertyError, PropertyInput, PropertyService};
pub use reconcile::{ReconcileReport, Reconciler};
