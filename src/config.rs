// ⚙️ Application Configuration
//
// Resolution order: built-in defaults → codomi.json (if present) →
// environment (CODOMI_BIND, CODOMI_DATA) → command-line flags.

use crate::error::Result;
use crate::pages::PageContext;
use crate::store::{Condominium, Snapshot};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "codomi.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Address the REST server listens on
    pub bind_addr: String,
    /// JSON snapshot to seed the store from instead of the demo data
    pub data_file: Option<PathBuf>,
    /// Building the admin pages start scoped to
    pub selected_building: Option<String>,
    pub require_aliquot_type: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            data_file: None,
            selected_building: None,
            require_aliquot_type: true,
        }
    }
}

impl AppConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&json)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load the file, then apply environment overrides
    pub fn from_env(path: &Path) -> Result<Self> {
        Ok(AppConfig::load(path)?.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(bind_addr) = lookup("CODOMI_BIND").filter(|v| !v.trim().is_empty()) {
            self.bind_addr = bind_addr;
        }
        if let Some(data_file) = lookup("CODOMI_DATA").filter(|v| !v.trim().is_empty()) {
            self.data_file = Some(PathBuf::from(data_file));
        }
        self
    }

    pub fn page_context(&self) -> PageContext {
        PageContext {
            selected_building: self.selected_building.clone(),
            require_aliquot_type: self.require_aliquot_type,
        }
    }

    /// Seed the store from `data_file`, or the demo data when unset
    pub fn open_store(&self) -> Result<Condominium> {
        match &self.data_file {
            Some(path) => {
                let snapshot = Snapshot::load(path)?;
                tracing::info!(
                    path = %path.display(),
                    apartments = snapshot.apartments.len(),
                    owners = snapshot.owners.len(),
                    "snapshot loaded"
                );
                Ok(Condominium::from_snapshot(snapshot))
            }
            None => Ok(Condominium::with_defaults()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodomiError;
    use crate::fixtures;
    use crate::forms::ReferenceData;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.require_aliquot_type);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, r#"{ "selectedBuilding": "2", "requireAliquotType": false }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.selected_building.as_deref(), Some("2"));
        assert!(!config.require_aliquot_type);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);

        let context = config.page_context();
        assert_eq!(context.selected_building.as_deref(), Some("2"));
        assert!(!context.require_aliquot_type);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "bind_addr = 1").unwrap();

        assert!(matches!(AppConfig::load(&path), Err(CodomiError::Snapshot(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::default().with_overrides(|key| match key {
            "CODOMI_BIND" => Some("127.0.0.1:8080".to_string()),
            "CODOMI_DATA" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.data_file, None);
    }

    #[test]
    fn test_open_store_from_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        let mut snapshot = fixtures::demo_snapshot();
        snapshot.apartments.truncate(2);
        snapshot.owners.truncate(2);
        std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();

        let config = AppConfig {
            data_file: Some(path),
            ..AppConfig::default()
        };
        let store = config.open_store().unwrap();
        assert_eq!(store.apartments().len(), 2);
        // Carlos' link to the dropped apartment 302 is repaired away
        assert_eq!(store.owner("1").unwrap().apartment_ids, vec!["1".to_string()]);

        let default_store = AppConfig::default().open_store().unwrap();
        assert_eq!(default_store.apartments().len(), 5);
    }
}
