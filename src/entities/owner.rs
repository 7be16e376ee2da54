// 👤 Owner Entity - person or company holding one or more apartments
//
// Identity is the id; the document number is validated against the format
// of its document type (Venezuelan cédula or RIF).

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static CEDULA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[VE]-[0-9]{8}$").expect("valid cedula pattern"));
static RIF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[JVE]-[0-9]{8}-[0-9]$").expect("valid rif pattern"));

// ============================================================================
// DOCUMENT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Personal identity card: V-12345678 / E-12345678
    Cedula,

    /// Tax registry number: J-12345678-9
    Rif,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Cedula => "cedula",
            DocumentType::Rif => "rif",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Cedula => "Cédula",
            DocumentType::Rif => "RIF",
        }
    }

    /// Example value shown as placeholder and in error messages
    pub fn example(&self) -> &'static str {
        match self {
            DocumentType::Cedula => "V-12345678",
            DocumentType::Rif => "J-12345678-9",
        }
    }

    pub fn pattern(&self) -> &'static Regex {
        match self {
            DocumentType::Cedula => &CEDULA_RE,
            DocumentType::Rif => &RIF_RE,
        }
    }

    /// Check a document number against this type's format
    pub fn validate(&self, number: &str) -> bool {
        self.pattern().is_match(number)
    }

    pub fn all() -> [DocumentType; 2] {
        [DocumentType::Cedula, DocumentType::Rif]
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cedula" | "cédula" => Ok(DocumentType::Cedula),
            "rif" => Ok(DocumentType::Rif),
            other => Err(format!("unknown document type: {}", other)),
        }
    }
}

// ============================================================================
// OWNER ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: String,
    pub name: String,
    pub document_type: DocumentType,
    pub document_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub apartment_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owner {
    /// Create a new, unlinked owner with a fresh id
    pub fn new(name: String, document_type: DocumentType, document_number: String) -> Self {
        let now = Utc::now();

        Owner {
            id: super::new_id("owner"),
            name,
            document_type,
            document_number,
            email: None,
            phone: None,
            apartment_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_contact(mut self, email: Option<String>, phone: Option<String>) -> Self {
        self.email = email;
        self.phone = phone;
        self
    }

    pub fn has_document_valid(&self) -> bool {
        self.document_type.validate(&self.document_number)
    }

    pub fn owns(&self, apartment_id: &str) -> bool {
        self.apartment_ids.iter().any(|id| id == apartment_id)
    }

    /// Badge text: "CEDULA: V-12345678"
    pub fn document_label(&self) -> String {
        format!(
            "{}: {}",
            self.document_type.as_str().to_uppercase(),
            self.document_number
        )
    }

    pub(crate) fn link_apartment(&mut self, apartment_id: &str) -> bool {
        if self.owns(apartment_id) {
            return false;
        }
        self.apartment_ids.push(apartment_id.to_string());
        self.updated_at = Utc::now();
        true
    }

    pub(crate) fn unlink_apartment(&mut self, apartment_id: &str) -> bool {
        let before = self.apartment_ids.len();
        self.apartment_ids.retain(|id| id != apartment_id);
        if self.apartment_ids.len() == before {
            return false;
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Display snapshot of an owner embedded in an apartment's `owners` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub name: String,
    pub document_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&Owner> for OwnerSummary {
    fn from(owner: &Owner) -> Self {
        OwnerSummary {
            id: owner.id.clone(),
            name: owner.name.clone(),
            document_number: owner.document_number.clone(),
            email: owner.email.clone(),
        }
    }
}

// ============================================================================
// OWNER REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerStats {
    pub total: usize,
    pub cedula: usize,
    pub rif: usize,
    pub without_apartments: usize,
}

/// Owners in insertion order
#[derive(Debug, Clone, Default)]
pub struct OwnerRegistry {
    owners: Vec<Owner>,
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or replace the owner with the same id. Returns true on insert.
    pub fn register(&mut self, owner: Owner) -> bool {
        match self.owners.iter_mut().find(|o| o.id == owner.id) {
            Some(existing) => {
                *existing = owner;
                false
            }
            None => {
                self.owners.push(owner);
                true
            }
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Owner> {
        self.owners.iter().find(|o| o.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Owner> {
        self.owners.iter_mut().find(|o| o.id == id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Owner> {
        self.owners.iter_mut()
    }

    /// Find owner by document number (exact, case-insensitive)
    pub fn find_by_document(&self, document_number: &str) -> Option<&Owner> {
        let wanted = document_number.to_lowercase();
        self.owners
            .iter()
            .find(|o| o.document_number.to_lowercase() == wanted)
    }

    pub fn remove(&mut self, id: &str) -> Option<Owner> {
        let index = self.owners.iter().position(|o| o.id == id)?;
        Some(self.owners.remove(index))
    }

    pub fn all(&self) -> &[Owner] {
        &self.owners
    }

    pub fn count(&self) -> usize {
        self.owners.len()
    }

    pub fn by_document_type(&self, document_type: DocumentType) -> Vec<&Owner> {
        self.owners
            .iter()
            .filter(|o| o.document_type == document_type)
            .collect()
    }

    pub fn stats(&self) -> OwnerStats {
        let mut stats = OwnerStats {
            total: self.owners.len(),
            ..OwnerStats::default()
        };

        for owner in &self.owners {
            match owner.document_type {
                DocumentType::Cedula => stats.cedula += 1,
                DocumentType::Rif => stats.rif += 1,
            }
            if owner.apartment_ids.is_empty() {
                stats.without_apartments += 1;
            }
        }

        stats
    }
}

impl From<Vec<Owner>> for OwnerRegistry {
    fn from(owners: Vec<Owner>) -> Self {
        let mut registry = OwnerRegistry::new();
        for owner in owners {
            registry.register(owner);
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

    fn carlos() -> Owner {
        Owner::new(
            "Carlos Mendoza".to_string(),
            DocumentType::Cedula,
            "V-12345678".to_string(),
        )
    }

    #[test]
    fn test_cedula_format() {
        assert!(DocumentType::Cedula.validate("V-12345678"));
        assert!(DocumentType::Cedula.validate("E-87654321"));
        assert!(!DocumentType::Cedula.validate("12345678"));
        assert!(!DocumentType::Cedula.validate("J-12345678"));
        assert!(!DocumentType::Cedula.validate("V-1234567"));
        assert!(!DocumentType::Cedula.validate(" V-12345678"));
    }

    #[test]
    fn test_rif_format() {
        assert!(DocumentType::Rif.validate("J-12345678-9"));
        assert!(DocumentType::Rif.validate("V-40123456-7"));
        assert!(!DocumentType::Rif.validate("J-12345678"));
        assert!(!DocumentType::Rif.validate("G-12345678-9"));
    }

    #[test]
    fn test_document_type_parsing() {
        assert_eq!("cedula".parse::<DocumentType>(), Ok(DocumentType::Cedula));
        assert_eq!("Cédula".parse::<DocumentType>(), Ok(DocumentType::Cedula));
        assert_eq!("RIF".parse::<DocumentType>(), Ok(DocumentType::Rif));
        assert!("passport".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_owner_creation() {
        let owner = carlos();

        assert!(owner.id.starts_with("owner-"));
        assert!(owner.apartment_ids.is_empty());
        assert!(owner.has_document_valid());
        assert_eq!(owner.document_label(), "CEDULA: V-12345678");
    }

    #[test]
    fn test_link_apartment_is_idempotent() {
        let mut owner = carlos();

        assert!(owner.link_apartment("apt-1"));
        assert!(!owner.link_apartment("apt-1"));
        assert_eq!(owner.apartment_ids, vec!["apt-1".to_string()]);

        assert!(owner.unlink_apartment("apt-1"));
        assert!(!owner.unlink_apartment("apt-1"));
        assert!(owner.apartment_ids.is_empty());
    }

    #[test]
    fn test_serde_shape() {
        let owner = carlos().with_contact(Some("carlos@email.com".to_string()), None);
        let json = serde_json::to_value(&owner).unwrap();

        assert_eq!(json["documentType"], "cedula");
        assert_eq!(json["documentNumber"], "V-12345678");
        assert!(json.get("phone").is_none());
        assert!(json["apartmentIds"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_registry_stats() {
        let mut registry = OwnerRegistry::new();
        let mut linked = carlos();
        linked.link_apartment("apt-1");
        registry.register(linked);
        registry.register(Owner::new(
            "Empresa ABC C.A.".to_string(),
            DocumentType::Rif,
            "J-40123456-7".to_string(),
        ));

        let stats = registry.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.cedula, 1);
        assert_eq!(stats.rif, 1);
        assert_eq!(stats.without_apartments, 1);
        assert!(registry.find_by_document("j-40123456-7").is_some());
    }
}
