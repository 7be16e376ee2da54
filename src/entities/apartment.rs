// 🏠 Apartment Entity - unit of a building, linked to zero or more owners
//
// "ownerIds is the relation, owners is its display copy"
//
// - buildingName and aliquotType are denormalized for listing/grouping
// - ownerIds and owners must always hold the same set of ids
// - Only the relationship module mutates the owner lists

use super::aliquot::AliquotType;
use super::owner::{Owner, OwnerSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// APARTMENT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApartmentStatus {
    Occupied,
    Vacant,
    Maintenance,
}

impl ApartmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApartmentStatus::Occupied => "occupied",
            ApartmentStatus::Vacant => "vacant",
            ApartmentStatus::Maintenance => "maintenance",
        }
    }

    /// Badge label
    pub fn label(&self) -> &'static str {
        match self {
            ApartmentStatus::Occupied => "Ocupado",
            ApartmentStatus::Vacant => "Vacante",
            ApartmentStatus::Maintenance => "Mantenimiento",
        }
    }

    pub fn all() -> [ApartmentStatus; 3] {
        [
            ApartmentStatus::Occupied,
            ApartmentStatus::Vacant,
            ApartmentStatus::Maintenance,
        ]
    }
}

impl fmt::Display for ApartmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApartmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "occupied" => Ok(ApartmentStatus::Occupied),
            "vacant" => Ok(ApartmentStatus::Vacant),
            "maintenance" => Ok(ApartmentStatus::Maintenance),
            other => Err(format!("unknown apartment status: {}", other)),
        }
    }
}

// ============================================================================
// MEASUREMENT TYPE
// ============================================================================

/// How `square_meters` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    Area,
    Percentage,
}

impl MeasurementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Area => "area",
            MeasurementType::Percentage => "percentage",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MeasurementType::Area => "m²",
            MeasurementType::Percentage => "%",
        }
    }
}

impl FromStr for MeasurementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "area" | "m²" | "m2" => Ok(MeasurementType::Area),
            "percentage" | "%" => Ok(MeasurementType::Percentage),
            other => Err(format!("unknown measurement type: {}", other)),
        }
    }
}

// ============================================================================
// APARTMENT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Apartment {
    pub id: String,
    pub number: String,
    pub floor: String,
    pub building_id: String,
    /// Denormalized from the building
    pub building_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_meters: Option<f64>,
    pub measurement_type: MeasurementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliquot_type_id: Option<String>,
    /// Resolved from `aliquot_type_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliquot_type: Option<AliquotType>,
    #[serde(default)]
    pub owner_ids: Vec<String>,
    #[serde(default)]
    pub owners: Vec<OwnerSummary>,
    pub status: ApartmentStatus,
    pub monthly_fee: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Apartment {
    /// Create a new vacant apartment without owners
    pub fn new(
        number: String,
        floor: String,
        building_id: String,
        building_name: String,
        monthly_fee: f64,
    ) -> Self {
        let now = Utc::now();

        Apartment {
            id: super::new_id("apt"),
            number,
            floor,
            building_id,
            building_name,
            square_meters: None,
            measurement_type: MeasurementType::Area,
            aliquot_type_id: None,
            aliquot_type: None,
            owner_ids: Vec::new(),
            owners: Vec::new(),
            status: ApartmentStatus::Vacant,
            monthly_fee,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_area(mut self, square_meters: f64) -> Self {
        self.square_meters = Some(square_meters);
        self.measurement_type = MeasurementType::Area;
        self
    }

    pub fn with_aliquot(mut self, aliquot_type: &AliquotType) -> Self {
        self.aliquot_type_id = Some(aliquot_type.id.clone());
        self.aliquot_type = Some(aliquot_type.clone());
        self
    }

    pub fn with_status(mut self, status: ApartmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn has_owner(&self, owner_id: &str) -> bool {
        self.owner_ids.iter().any(|id| id == owner_id)
    }

    pub fn owner_count(&self) -> usize {
        self.owner_ids.len()
    }

    /// ownerIds and owners hold the same set of ids, without duplicates
    pub fn is_consistent(&self) -> bool {
        let ids: HashSet<&str> = self.owner_ids.iter().map(String::as_str).collect();
        let summaries: HashSet<&str> = self.owners.iter().map(|o| o.id.as_str()).collect();

        ids.len() == self.owner_ids.len()
            && summaries.len() == self.owners.len()
            && ids == summaries
    }

    /// "101 (m²: 85)" style area text for cards
    pub fn measurement_label(&self) -> String {
        match self.square_meters {
            Some(value) => format!("{} {}", value, self.measurement_type.unit()),
            None => "-".to_string(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Append the owner to both lists. No-op when already linked.
    pub(crate) fn link_owner(&mut self, owner: &Owner) -> bool {
        if self.has_owner(&owner.id) {
            return false;
        }
        self.owner_ids.push(owner.id.clone());
        self.owners.push(OwnerSummary::from(owner));
        self.touch();
        true
    }

    /// Remove the owner from both lists. No-op when not linked.
    pub(crate) fn unlink_owner(&mut self, owner_id: &str) -> bool {
        if !self.has_owner(owner_id) {
            return false;
        }
        self.owner_ids.retain(|id| id != owner_id);
        self.owners.retain(|o| o.id != owner_id);
        self.touch();
        true
    }
}

// ============================================================================
// APARTMENT REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentStats {
    pub total: usize,
    pub occupied: usize,
    pub vacant: usize,
    pub maintenance: usize,
    pub total_monthly_fees: f64,
}

impl ApartmentStats {
    /// Share of occupied units, 0.0 when there are none
    pub fn occupancy_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.occupied as f64 / self.total as f64
        }
    }
}

/// Apartments in insertion order
#[derive(Debug, Clone, Default)]
pub struct ApartmentRegistry {
    apartments: Vec<Apartment>,
}

impl ApartmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or replace the apartment with the same id. Returns true on insert.
    pub fn register(&mut self, apartment: Apartment) -> bool {
        match self.apartments.iter_mut().find(|a| a.id == apartment.id) {
            Some(existing) => {
                *existing = apartment;
                false
            }
            None => {
                self.apartments.push(apartment);
                true
            }
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Apartment> {
        self.apartments.iter().find(|a| a.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Apartment> {
        self.apartments.iter_mut().find(|a| a.id == id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Apartment> {
        self.apartments.iter_mut()
    }

    pub fn remove(&mut self, id: &str) -> Option<Apartment> {
        let index = self.apartments.iter().position(|a| a.id == id)?;
        Some(self.apartments.remove(index))
    }

    pub fn all(&self) -> &[Apartment] {
        &self.apartments
    }

    pub fn count(&self) -> usize {
        self.apartments.len()
    }

    pub fn by_building(&self, building_id: &str) -> Vec<&Apartment> {
        self.apartments
            .iter()
            .filter(|a| a.building_id == building_id)
            .collect()
    }

    pub fn by_status(&self, status: ApartmentStatus) -> Vec<&Apartment> {
        self.apartments
            .iter()
            .filter(|a| a.status == status)
            .collect()
    }

    pub fn stats(&self) -> ApartmentStats {
        let mut stats = ApartmentStats {
            total: self.apartments.len(),
            ..ApartmentStats::default()
        };

        for apartment in &self.apartments {
            match apartment.status {
                ApartmentStatus::Occupied => stats.occupied += 1,
                ApartmentStatus::Vacant => stats.vacant += 1,
                ApartmentStatus::Maintenance => stats.maintenance += 1,
            }
            stats.total_monthly_fees += apartment.monthly_fee;
        }

        stats
    }
}

impl From<Vec<Apartment>> for ApartmentRegistry {
    fn from(apartments: Vec<Apartment>) -> Self {
        let mut registry = ApartmentRegistry::new();
        for apartment in apartments {
            registry.register(apartment);
        }
        registry
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DocumentType;

    fn create_test_apartment() -> Apartment {
        Apartment::new(
            "101".to_string(),
            "1".to_string(),
            "1".to_string(),
            "Torre Norte".to_string(),
            25000.0,
        )
    }

    fn create_test_owner() -> Owner {
        Owner::new(
            "Carlos".to_string(),
            DocumentType::Cedula,
            "V-12345678".to_string(),
        )
    }

    #[test]
    fn test_apartment_creation() {
        let apartment = create_test_apartment();

        assert!(apartment.id.starts_with("apt-"));
        assert_eq!(apartment.status, ApartmentStatus::Vacant);
        assert_eq!(apartment.measurement_type, MeasurementType::Area);
        assert!(apartment.owner_ids.is_empty());
        assert!(apartment.is_consistent());
    }

    #[test]
    fn test_link_and_unlink_owner() {
        let mut apartment = create_test_apartment();
        let owner = create_test_owner();
        let before = apartment.updated_at;

        assert!(apartment.link_owner(&owner));
        assert_eq!(apartment.owner_ids, vec![owner.id.clone()]);
        assert_eq!(apartment.owners[0].name, "Carlos");
        assert!(apartment.updated_at >= before);
        assert!(apartment.is_consistent());

        assert!(apartment.unlink_owner(&owner.id));
        assert!(apartment.owner_ids.is_empty());
        assert!(apartment.owners.is_empty());
    }

    #[test]
    fn test_link_owner_idempotent() {
        let mut apartment = create_test_apartment();
        let owner = create_test_owner();

        apartment.link_owner(&owner);
        assert!(!apartment.link_owner(&owner));
        assert_eq!(apartment.owner_count(), 1);
        assert_eq!(apartment.owners.len(), 1);
    }

    #[test]
    fn test_inconsistent_lists_detected() {
        let mut apartment = create_test_apartment();
        apartment.owner_ids.push("ghost".to_string());
        assert!(!apartment.is_consistent());

        let mut duplicated = create_test_apartment();
        let owner = create_test_owner();
        duplicated.link_owner(&owner);
        duplicated.owner_ids.push(owner.id.clone());
        assert!(!duplicated.is_consistent());
    }

    #[test]
    fn test_status_parsing_and_labels() {
        assert_eq!("occupied".parse(), Ok(ApartmentStatus::Occupied));
        assert_eq!(" Vacant ".parse(), Ok(ApartmentStatus::Vacant));
        assert!("sold".parse::<ApartmentStatus>().is_err());
        assert_eq!(ApartmentStatus::Maintenance.label(), "Mantenimiento");
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let apartment = create_test_apartment().with_area(85.0);
        let json = serde_json::to_value(&apartment).unwrap();

        assert_eq!(json["buildingName"], "Torre Norte");
        assert_eq!(json["squareMeters"], 85.0);
        assert_eq!(json["measurementType"], "area");
        assert_eq!(json["status"], "vacant");

        let back: Apartment = serde_json::from_value(json).unwrap();
        assert_eq!(back, apartment);
    }

    #[test]
    fn test_registry_stats() {
        let mut registry = ApartmentRegistry::new();
        registry.register(create_test_apartment().with_status(ApartmentStatus::Occupied));
        registry.register(create_test_apartment());
        registry.register(create_test_apartment().with_status(ApartmentStatus::Maintenance));

        let stats = registry.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.occupied, 1);
        assert_eq!(stats.vacant, 1);
        assert_eq!(stats.maintenance, 1);
        assert_eq!(stats.total_monthly_fees, 75000.0);
        assert!((stats.occupancy_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_registry_replace_keeps_position() {
        let first = create_test_apartment();
        let second = create_test_apartment();
        let mut registry = ApartmentRegistry::from(vec![first.clone(), second.clone()]);

        let mut renamed = first.clone();
        renamed.number = "101-A".to_string();
        assert!(!registry.register(renamed));

        assert_eq!(registry.all()[0].number, "101-A");
        assert_eq!(registry.all()[1].id, second.id);
        assert_eq!(registry.by_building("1").len(), 2);
    }
}
