// Entity Models
//
// Plain records with cross-referencing id lists:
// - Building and AliquotType are reference data
// - Apartment ↔ Owner is many-to-many, kept in sync by crate::relationships

pub mod aliquot;
pub mod apartment;
pub mod building;
pub mod owner;

pub use aliquot::{AliquotRegistry, AliquotType};
pub use apartment::{Apartment, ApartmentRegistry, ApartmentStats, ApartmentStatus, MeasurementType};
pub use building::{Building, BuildingRegistry};
pub use owner::{DocumentType, Owner, OwnerRegistry, OwnerStats, OwnerSummary};

/// Opaque record id, e.g. `apt-6f1c...`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
