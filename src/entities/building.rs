// 🏢 Building Entity - primary scoping dimension of the admin views
//
// Apartments reference their building by id and carry a denormalized
// copy of its name for grouping.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
}

impl Building {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Building {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ============================================================================
// BUILDING REGISTRY
// ============================================================================

/// Buildings of the condominium, in registration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildingRegistry {
    buildings: Vec<Building>,
}

impl BuildingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a building; an existing id is replaced in place
    pub fn register(&mut self, building: Building) {
        match self.buildings.iter_mut().find(|b| b.id == building.id) {
            Some(existing) => *existing = building,
            None => self.buildings.push(building),
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Find building by name (case-insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<&Building> {
        let lower_name = name.to_lowercase();
        self.buildings
            .iter()
            .find(|b| b.name.to_lowercase() == lower_name)
    }

    pub fn all(&self) -> &[Building] {
        &self.buildings
    }

    pub fn count(&self) -> usize {
        self.buildings.len()
    }
}

impl From<Vec<Building>> for BuildingRegistry {
    fn from(buildings: Vec<Building>) -> Self {
        let mut registry = BuildingRegistry::new();
        for building in buildings {
            registry.register(building);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_existing_id() {
        let mut registry = BuildingRegistry::new();
        registry.register(Building::new("1", "Torre Norte"));
        registry.register(Building::new("2", "Torre Sur"));
        registry.register(Building::new("1", "Torre Norte A"));

        assert_eq!(registry.count(), 2);
        assert_eq!(registry.find_by_id("1").unwrap().name, "Torre Norte A");
        assert_eq!(registry.all()[0].id, "1");
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        let registry = BuildingRegistry::from(vec![Building::new("2", "Torre Sur")]);

        assert_eq!(registry.find_by_name("torre sur").unwrap().id, "2");
        assert!(registry.find_by_name("Torre Este").is_none());
    }
}
