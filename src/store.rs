// 🗄️ Condominium Store - the in-memory object graph behind every page
//
// The store is the only place ids are issued (`apt-<uuid>`, `owner-<uuid>`).
// Link lists are never written here directly: every change to
// Apartment.ownerIds / Owner.apartmentIds goes through crate::relationships.

use crate::entities::{
    new_id, AliquotRegistry, AliquotType, Apartment, ApartmentRegistry, ApartmentStats,
    Building, BuildingRegistry, Owner, OwnerRegistry, OwnerStats,
};
use crate::error::{CodomiError, Result};
use crate::fixtures;
use crate::forms::{FormHost, ReferenceData};
use crate::relationships;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// SNAPSHOT (read-only seed data)
// ============================================================================

/// JSON seed for the store; loaded once, never written back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub aliquot_types: Vec<AliquotType>,
    #[serde(default)]
    pub apartments: Vec<Apartment>,
    #[serde(default)]
    pub owners: Vec<Owner>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Snapshot::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// CONDOMINIUM
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Condominium {
    buildings: BuildingRegistry,
    aliquot_types: AliquotRegistry,
    apartments: ApartmentRegistry,
    owners: OwnerRegistry,
}

impl Condominium {
    /// Empty condominium with the given reference data
    pub fn new(buildings: BuildingRegistry, aliquot_types: AliquotRegistry) -> Self {
        Condominium {
            buildings,
            aliquot_types,
            apartments: ApartmentRegistry::new(),
            owners: OwnerRegistry::new(),
        }
    }

    /// Demo data set: Torre Norte / Torre Sur, five apartments, three owners
    pub fn with_defaults() -> Self {
        Condominium::from_snapshot(fixtures::demo_snapshot())
    }

    /// Load a snapshot as-is, then repair whatever links it leaves one-sided
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let aliquot_types = if snapshot.aliquot_types.is_empty() {
            AliquotRegistry::with_defaults()
        } else {
            AliquotRegistry::from(snapshot.aliquot_types)
        };

        let mut store = Condominium {
            buildings: BuildingRegistry::from(snapshot.buildings),
            aliquot_types,
            apartments: ApartmentRegistry::from(snapshot.apartments),
            owners: OwnerRegistry::from(snapshot.owners),
        };

        let report = relationships::reconcile(&mut store);
        if report.repaired > 0 {
            tracing::info!(repaired = report.repaired, "snapshot links reconciled");
        }
        for issue in &report.remaining {
            tracing::warn!(%issue, "snapshot issue left unresolved");
        }

        store
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            buildings: self.buildings.all().to_vec(),
            aliquot_types: self.aliquot_types.all().to_vec(),
            apartments: self.apartments.all().to_vec(),
            owners: self.owners.all().to_vec(),
        }
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn building_registry(&self) -> &BuildingRegistry {
        &self.buildings
    }

    pub fn aliquot_registry(&self) -> &AliquotRegistry {
        &self.aliquot_types
    }

    pub fn owners(&self) -> &[Owner] {
        self.owners.all()
    }

    pub fn apartment(&self, id: &str) -> Option<&Apartment> {
        self.apartments.find_by_id(id)
    }

    pub fn owner(&self, id: &str) -> Option<&Owner> {
        self.owners.find_by_id(id)
    }

    pub fn apartment_registry(&self) -> &ApartmentRegistry {
        &self.apartments
    }

    pub fn owner_registry(&self) -> &OwnerRegistry {
        &self.owners
    }

    pub fn apartment_stats(&self) -> ApartmentStats {
        self.apartments.stats()
    }

    pub fn owner_stats(&self) -> OwnerStats {
        self.owners.stats()
    }

    /// Apartments an owner holds (owner profile view)
    pub fn apartments_of(&self, owner_id: &str) -> Result<Vec<&Apartment>> {
        let owner = self
            .owners
            .find_by_id(owner_id)
            .ok_or_else(|| CodomiError::OwnerNotFound(owner_id.to_string()))?;

        Ok(owner
            .apartment_ids
            .iter()
            .filter_map(|id| self.apartments.find_by_id(id))
            .collect())
    }

    pub fn owners_of(&self, apartment_id: &str) -> Result<Vec<&Owner>> {
        let apartment = self
            .apartments
            .find_by_id(apartment_id)
            .ok_or_else(|| CodomiError::ApartmentNotFound(apartment_id.to_string()))?;

        Ok(apartment
            .owner_ids
            .iter()
            .filter_map(|id| self.owners.find_by_id(id))
            .collect())
    }

    pub(crate) fn apartments_mut(&mut self) -> &mut ApartmentRegistry {
        &mut self.apartments
    }

    pub(crate) fn owners_mut(&mut self) -> &mut OwnerRegistry {
        &mut self.owners
    }

    // ------------------------------------------------------------------------
    // Apartments
    // ------------------------------------------------------------------------

    /// Fill building name and aliquot type from their ids
    fn resolve_references(&self, apartment: &mut Apartment) -> Result<()> {
        let building = self
            .buildings
            .find_by_id(&apartment.building_id)
            .ok_or_else(|| CodomiError::BuildingNotFound(apartment.building_id.clone()))?;
        apartment.building_name = building.name.clone();

        apartment.aliquot_type = match apartment.aliquot_type_id.as_deref() {
            Some(id) => Some(
                self.aliquot_types
                    .find_by_id(id)
                    .cloned()
                    .ok_or_else(|| CodomiError::AliquotTypeNotFound(id.to_string()))?,
            ),
            None => None,
        };

        Ok(())
    }

    /// Insert a new apartment or replace an existing one (onSave).
    ///
    /// The owner list of an existing apartment is kept as stored; links only
    /// change through `relationships`. A new apartment arriving with owner ids
    /// is linked to each of them.
    pub fn save_apartment(&mut self, mut record: Apartment) -> Result<Apartment> {
        self.resolve_references(&mut record)?;
        let now = Utc::now();

        if let Some(existing) = self.apartments.find_by_id(&record.id) {
            record.owner_ids = existing.owner_ids.clone();
            record.owners = existing.owners.clone();
            record.created_at = existing.created_at;
            record.updated_at = now;

            tracing::info!(id = %record.id, number = %record.number, "apartment updated");
            self.apartments.register(record.clone());
            return Ok(record);
        }

        if let Some(missing) = record
            .owner_ids
            .iter()
            .find(|id| self.owners.find_by_id(id).is_none())
        {
            return Err(CodomiError::OwnerNotFound(missing.clone()));
        }

        if record.id.is_empty() {
            record.id = new_id("apt");
        }
        record.created_at = now;
        record.updated_at = now;
        let owner_ids = std::mem::take(&mut record.owner_ids);
        record.owners.clear();

        let id = record.id.clone();
        tracing::info!(id = %id, number = %record.number, "apartment created");
        self.apartments.register(record);

        for owner_id in &owner_ids {
            relationships::link(self, &id, owner_id)?;
        }

        self.apartments
            .find_by_id(&id)
            .cloned()
            .ok_or(CodomiError::ApartmentNotFound(id))
    }

    /// Replace an existing apartment without confirmation (onUpdate)
    pub fn update_apartment(&mut self, record: Apartment) -> Result<Apartment> {
        if self.apartments.find_by_id(&record.id).is_none() {
            return Err(CodomiError::ApartmentNotFound(record.id));
        }
        self.save_apartment(record)
    }

    /// Delete an apartment and unlink it from every owner
    pub fn remove_apartment(&mut self, id: &str) -> Result<Apartment> {
        if self.apartments.find_by_id(id).is_none() {
            return Err(CodomiError::ApartmentNotFound(id.to_string()));
        }

        relationships::detach_apartment(self, id);
        let removed = self
            .apartments
            .remove(id)
            .ok_or_else(|| CodomiError::ApartmentNotFound(id.to_string()))?;

        tracing::info!(id = %id, number = %removed.number, "apartment removed");
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Owners
    // ------------------------------------------------------------------------

    /// Insert or replace an owner (onSave). The incoming `apartmentIds` are
    /// applied as link/unlink operations so apartments see the same change.
    pub fn save_owner(&mut self, mut record: Owner) -> Result<Owner> {
        if let Some(missing) = record
            .apartment_ids
            .iter()
            .find(|id| self.apartments.find_by_id(id).is_none())
        {
            return Err(CodomiError::ApartmentNotFound(missing.clone()));
        }

        let now = Utc::now();
        let wanted = std::mem::take(&mut record.apartment_ids);

        match self.owners.find_by_id(&record.id) {
            Some(existing) => {
                record.apartment_ids = existing.apartment_ids.clone();
                record.created_at = existing.created_at;
                tracing::info!(id = %record.id, name = %record.name, "owner updated");
            }
            None => {
                if record.id.is_empty() {
                    record.id = new_id("owner");
                }
                record.created_at = now;
                tracing::info!(id = %record.id, name = %record.name, "owner created");
            }
        }
        record.updated_at = now;

        let id = record.id.clone();
        let current = record.apartment_ids.clone();
        self.owners.register(record);
        relationships::refresh_owner_summaries(self, &id);

        for apartment_id in current.iter().filter(|a| !wanted.contains(a)) {
            relationships::unlink(self, apartment_id, &id)?;
        }
        for apartment_id in &wanted {
            relationships::link(self, apartment_id, &id)?;
        }

        self.owners
            .find_by_id(&id)
            .cloned()
            .ok_or(CodomiError::OwnerNotFound(id))
    }

    /// Replace an existing owner without confirmation (onUpdate)
    pub fn update_owner(&mut self, record: Owner) -> Result<Owner> {
        if self.owners.find_by_id(&record.id).is_none() {
            return Err(CodomiError::OwnerNotFound(record.id));
        }
        self.save_owner(record)
    }

    /// Delete an owner and unlink it from every apartment
    pub fn remove_owner(&mut self, id: &str) -> Result<Owner> {
        if self.owners.find_by_id(id).is_none() {
            return Err(CodomiError::OwnerNotFound(id.to_string()));
        }

        relationships::detach_owner(self, id);
        let removed = self
            .owners
            .remove(id)
            .ok_or_else(|| CodomiError::OwnerNotFound(id.to_string()))?;

        tracing::info!(id = %id, name = %removed.name, "owner removed");
        Ok(removed)
    }
}

// ============================================================================
// FORM CALLBACKS
// ============================================================================

impl ReferenceData for Condominium {
    fn buildings(&self) -> &BuildingRegistry {
        &self.buildings
    }

    fn aliquot_types(&self) -> &AliquotRegistry {
        &self.aliquot_types
    }

    fn apartments(&self) -> &[Apartment] {
        self.apartments.all()
    }
}

impl FormHost<Apartment> for Condominium {
    fn on_save(&mut self, record: Apartment) -> Result<Apartment> {
        self.save_apartment(record)
    }

    fn on_update(&mut self, record: Apartment) -> Result<Apartment> {
        self.update_apartment(record)
    }

    fn on_close(&mut self) {
        tracing::debug!("apartment editor closed");
    }
}

impl FormHost<Owner> for Condominium {
    fn on_save(&mut self, record: Owner) -> Result<Owner> {
        self.save_owner(record)
    }

    fn on_update(&mut self, record: Owner) -> Result<Owner> {
        self.update_owner(record)
    }

    fn on_close(&mut self) {
        tracing::debug!("owner editor closed");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ApartmentStatus, DocumentType};

    fn create_test_apartment(building_id: &str) -> Apartment {
        Apartment::new(
            "501".to_string(),
            "5".to_string(),
            building_id.to_string(),
            String::new(),
            30000.0,
        )
    }

    fn create_test_owner() -> Owner {
        Owner::new(
            "Pedro Pérez".to_string(),
            DocumentType::Cedula,
            "V-11111111".to_string(),
        )
    }

    #[test]
    fn test_defaults_are_consistent() {
        let store = Condominium::with_defaults();

        assert_eq!(store.building_registry().count(), 2);
        assert_eq!(store.aliquot_registry().count(), 5);
        assert_eq!(store.apartments().len(), 5);
        assert_eq!(store.owners().len(), 3);
        assert!(relationships::audit(&store).is_empty());
        assert!(store.apartments().iter().all(Apartment::is_consistent));
    }

    #[test]
    fn test_save_new_apartment_assigns_id_and_resolves_names() {
        let mut store = Condominium::with_defaults();
        let mut record = create_test_apartment("2");
        record.id = String::new();
        record.aliquot_type_id = Some("3".to_string());

        let saved = store.save_apartment(record).unwrap();

        assert!(saved.id.starts_with("apt-"));
        assert_eq!(saved.building_name, "Torre Sur");
        assert_eq!(saved.aliquot_type.unwrap().percentage, 16.0);
        assert_eq!(store.apartments().len(), 6);
    }

    #[test]
    fn test_save_apartment_rejects_unknown_references() {
        let mut store = Condominium::with_defaults();

        let result = store.save_apartment(create_test_apartment("99"));
        assert!(matches!(result, Err(CodomiError::BuildingNotFound(_))));

        let mut record = create_test_apartment("1");
        record.aliquot_type_id = Some("42".to_string());
        let result = store.save_apartment(record);
        assert!(matches!(result, Err(CodomiError::AliquotTypeNotFound(_))));

        assert_eq!(store.apartments().len(), 5);
    }

    #[test]
    fn test_replace_keeps_links_and_created_at() {
        let mut store = Condominium::with_defaults();
        let original = store.apartment("1").unwrap().clone();

        let mut record = original.clone();
        record.owner_ids.clear();
        record.owners.clear();
        record.status = ApartmentStatus::Vacant;

        let saved = store.save_apartment(record).unwrap();
        assert_eq!(saved.owner_ids, original.owner_ids);
        assert_eq!(saved.created_at, original.created_at);
        assert_eq!(saved.status, ApartmentStatus::Vacant);
        assert_eq!(store.apartments().len(), 5);
    }

    #[test]
    fn test_update_requires_existing_apartment() {
        let mut store = Condominium::with_defaults();

        let result = store.update_apartment(create_test_apartment("1"));
        assert!(matches!(result, Err(CodomiError::ApartmentNotFound(_))));
    }

    #[test]
    fn test_save_owner_links_both_sides() {
        let mut store = Condominium::with_defaults();
        let mut owner = create_test_owner();
        owner.apartment_ids = vec!["4".to_string()];

        let saved = store.save_owner(owner).unwrap();

        assert_eq!(saved.apartment_ids, vec!["4".to_string()]);
        let apartment = store.apartment("4").unwrap();
        assert!(apartment.has_owner(&saved.id));
        assert_eq!(apartment.owners[0].name, "Pedro Pérez");
        assert!(relationships::audit(&store).is_empty());
    }

    #[test]
    fn test_save_owner_unlinks_dropped_apartments() {
        let mut store = Condominium::with_defaults();
        let mut carlos = store.owner("1").unwrap().clone();
        carlos.apartment_ids = vec!["5".to_string()];
        carlos.name = "Carlos A. Mendoza".to_string();

        store.save_owner(carlos).unwrap();

        assert!(!store.apartment("1").unwrap().has_owner("1"));
        let apartment = store.apartment("5").unwrap();
        assert_eq!(apartment.owners[0].name, "Carlos A. Mendoza");
        assert!(relationships::audit(&store).is_empty());
    }

    #[test]
    fn test_save_owner_rejects_unknown_apartment() {
        let mut store = Condominium::with_defaults();
        let mut owner = create_test_owner();
        owner.apartment_ids = vec!["ghost".to_string()];

        let result = store.save_owner(owner);
        assert!(matches!(result, Err(CodomiError::ApartmentNotFound(_))));
        assert_eq!(store.owners().len(), 3);
    }

    #[test]
    fn test_remove_cascades() {
        let mut store = Condominium::with_defaults();

        store.remove_apartment("5").unwrap();
        assert_eq!(store.owner("1").unwrap().apartment_ids, vec!["1".to_string()]);

        store.remove_owner("1").unwrap();
        assert!(store.apartment("1").unwrap().owner_ids.is_empty());
        assert!(store.apartment("1").unwrap().owners.is_empty());
        assert!(relationships::audit(&store).is_empty());

        assert!(matches!(
            store.remove_owner("1"),
            Err(CodomiError::OwnerNotFound(_))
        ));
    }

    #[test]
    fn test_profile_lookups() {
        let store = Condominium::with_defaults();

        let numbers: Vec<&str> = store
            .apartments_of("1")
            .unwrap()
            .iter()
            .map(|a| a.number.as_str())
            .collect();
        assert_eq!(numbers, vec!["101", "302"]);

        let names: Vec<&str> = store
            .owners_of("3")
            .unwrap()
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["Ana García"]);
        assert!(store.owners_of("4").unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_roundtrip_through_json() {
        let store = Condominium::with_defaults();
        let json = store.snapshot().to_json().unwrap();

        let restored = Condominium::from_snapshot(Snapshot::from_json(&json).unwrap());
        assert_eq!(restored.apartments(), store.apartments());
        assert_eq!(restored.owners().len(), 3);
    }

    #[test]
    fn test_snapshot_one_sided_links_repaired() {
        let mut snapshot = fixtures::demo_snapshot();
        // Owner claims apartment 4, apartment 4 does not list the owner
        snapshot.owners[1].apartment_ids.push("4".to_string());

        let store = Condominium::from_snapshot(snapshot);
        assert!(store.apartment("4").unwrap().has_owner("2"));
        assert!(relationships::audit(&store).is_empty());
    }

    #[test]
    fn test_snapshot_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codomi-data.json");
        std::fs::write(&path, fixtures::demo_snapshot().to_json().unwrap()).unwrap();

        let snapshot = Snapshot::load(&path).unwrap();
        assert_eq!(snapshot.apartments.len(), 5);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Snapshot::load(&path), Err(CodomiError::Snapshot(_))));
        assert!(matches!(
            Snapshot::load(&dir.path().join("missing.json")),
            Err(CodomiError::Io(_))
        ));
    }
}
