// 📊 Aliquot Types - named expense-share categories
//
// Immutable reference data: an apartment points at one aliquot type and the
// percentage is the share of building expenses it carries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliquotType {
    pub id: String,
    pub name: String,
    /// Share of building expenses (18.0 = 18%)
    pub percentage: f64,
}

impl AliquotType {
    pub fn new(id: impl Into<String>, name: impl Into<String>, percentage: f64) -> Self {
        AliquotType {
            id: id.into(),
            name: name.into(),
            percentage,
        }
    }

    /// Label used by selectors, e.g. "Tipo A (18%)"
    pub fn label(&self) -> String {
        format!("{} ({}%)", self.name, self.percentage)
    }
}

// ============================================================================
// ALIQUOT REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliquotRegistry {
    types: Vec<AliquotType>,
}

impl AliquotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the standard Tipo A..E scale
    pub fn with_defaults() -> Self {
        let mut registry = AliquotRegistry::new();
        for (id, name, percentage) in [
            ("1", "Tipo A", 18.0),
            ("2", "Tipo B", 17.5),
            ("3", "Tipo C", 16.0),
            ("4", "Tipo D", 15.5),
            ("5", "Tipo E", 14.0),
        ] {
            registry.register(AliquotType::new(id, name, percentage));
        }
        registry
    }

    /// Reference data is append-only: a duplicate id is ignored
    pub fn register(&mut self, aliquot_type: AliquotType) {
        if self.find_by_id(&aliquot_type.id).is_none() {
            self.types.push(aliquot_type);
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&AliquotType> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn all(&self) -> &[AliquotType] {
        &self.types
    }

    pub fn count(&self) -> usize {
        self.types.len()
    }
}

impl From<Vec<AliquotType>> for AliquotRegistry {
    fn from(types: Vec<AliquotType>) -> Self {
        let mut registry = AliquotRegistry::new();
        for aliquot_type in types {
            registry.register(aliquot_type);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = AliquotRegistry::with_defaults();

        assert_eq!(registry.count(), 5);
        assert_eq!(registry.find_by_id("2").unwrap().percentage, 17.5);
        assert_eq!(registry.find_by_id("1").unwrap().label(), "Tipo A (18%)");
    }

    #[test]
    fn test_register_never_overwrites() {
        let mut registry = AliquotRegistry::with_defaults();
        registry.register(AliquotType::new("1", "Changed", 1.0));

        assert_eq!(registry.count(), 5);
        assert_eq!(registry.find_by_id("1").unwrap().name, "Tipo A");
    }
}
