// CODOMI - Condominium Administration Core Library
// Exposes all modules for use in the CLI/TUI, the API server, and tests

pub mod config;         // App configuration (codomi.json + env)
pub mod entities;       // Apartments, owners, buildings, aliquot types
pub mod error;
pub mod filters;        // Listing search/building/status composition
pub mod fixtures;       // Demo data set
pub mod forms;          // Apartment/owner editors and quick edits
pub mod notices;
pub mod pages;          // Listing page state
pub mod relationships;  // Apartment ↔ owner links (sole mutator)
pub mod store;          // In-memory object graph + id authority
pub mod validation;     // Field-level form checks

// Re-export commonly used types
pub use config::AppConfig;
pub use entities::{
    AliquotRegistry, AliquotType,
    Apartment, ApartmentRegistry, ApartmentStats, ApartmentStatus, MeasurementType,
    Building, BuildingRegistry,
    DocumentType, Owner, OwnerRegistry, OwnerStats, OwnerSummary,
};
pub use error::{CodomiError, Result};
pub use filters::{
    filter_apartments, filter_owners, group_by_building,
    ApartmentFilter, OwnerFilter, Selection,
};
pub use forms::{
    ApartmentDraft, ApartmentForm, FormHost, FormPhase,
    OwnerDraft, OwnerForm, QuickEdit, QuickField, ReferenceData,
};
pub use notices::{Notice, NoticeKind};
pub use pages::{ApartmentsPage, OwnersPage, PageContext};
pub use relationships::{
    audit, available_apartments, available_owners, link, reconcile, request_unlink,
    ApartmentOwnerEditor, LinkIssue, LinkOutcome, PendingUnlink, ReconcileReport, UnlinkOutcome,
};
pub use store::{Condominium, Snapshot};
pub use validation::{validate_apartment, validate_document, validate_email, validate_owner, FieldErrors};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
