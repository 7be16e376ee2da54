// 📐 Form Validation - field-level checks before the save confirmation step
//
// Every validator returns a FieldErrors map (field → message). Saving is
// blocked while the map is non-empty.

use crate::entities::{AliquotRegistry, BuildingRegistry, DocumentType, MeasurementType};
use crate::forms::{ApartmentDraft, OwnerDraft};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

// ============================================================================
// FIELD ERRORS
// ============================================================================

/// Field name → message, in the order the checks ran
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Ok when empty, otherwise the errors themselves
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

// ============================================================================
// FORMAT CHECKS
// ============================================================================

/// Check a document number against the format of its type
pub fn validate_document(document_type: DocumentType, number: &str) -> bool {
    document_type.validate(number)
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Parse an optional numeric field. Blank → Ok(None), garbage → Err(()).
pub(crate) fn parse_number(raw: &str) -> Result<Option<f64>, ()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(()),
    }
}

// ============================================================================
// APARTMENT RULES
// ============================================================================

/// Reference data and variant switches the apartment form validates against
pub struct ApartmentRules<'a> {
    pub buildings: &'a BuildingRegistry,
    pub aliquot_types: &'a AliquotRegistry,
    /// Some form variants let the aliquot type be left empty
    pub require_aliquot_type: bool,
}

pub fn validate_apartment(draft: &ApartmentDraft, rules: &ApartmentRules<'_>) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let building_id = draft.building_id.trim();
    if building_id.is_empty() {
        errors.insert("buildingId", "El edificio es obligatorio");
    } else if rules.buildings.find_by_id(building_id).is_none() {
        errors.insert("buildingId", "El edificio seleccionado no existe");
    }

    if draft.number.trim().is_empty() {
        errors.insert("number", "El número de apartamento es obligatorio");
    }

    let aliquot_type_id = draft.aliquot_type_id.trim();
    if aliquot_type_id.is_empty() {
        if rules.require_aliquot_type {
            errors.insert("aliquotTypeId", "El tipo de alícuota es obligatorio");
        }
    } else if rules.aliquot_types.find_by_id(aliquot_type_id).is_none() {
        errors.insert("aliquotTypeId", "El tipo de alícuota seleccionado no existe");
    }

    match parse_number(&draft.square_meters) {
        Ok(Some(value)) if value <= 0.0 => {
            errors.insert(
                "squareMeters",
                "Los metros cuadrados deben ser un número mayor a 0",
            );
        }
        Ok(Some(value))
            if draft.measurement_type == MeasurementType::Percentage && value > 100.0 =>
        {
            errors.insert("squareMeters", "El porcentaje no puede ser mayor a 100");
        }
        Err(()) => {
            errors.insert(
                "squareMeters",
                "Los metros cuadrados deben ser un número mayor a 0",
            );
        }
        _ => {}
    }

    match parse_number(&draft.monthly_fee) {
        Ok(Some(value)) if value < 0.0 => {
            errors.insert("monthlyFee", "La cuota mensual debe ser un número válido");
        }
        Err(()) => {
            errors.insert("monthlyFee", "La cuota mensual debe ser un número válido");
        }
        _ => {}
    }

    errors
}

// ============================================================================
// OWNER RULES
// ============================================================================

pub fn validate_owner(draft: &OwnerDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let name = draft.name.trim();
    if name.is_empty() {
        errors.insert("name", "El nombre es obligatorio");
    } else if name.chars().count() < 2 {
        errors.insert("name", "El nombre debe tener al menos 2 caracteres");
    }

    if draft.document_number.trim().is_empty() {
        errors.insert("documentNumber", "El documento es obligatorio");
    } else if !validate_document(draft.document_type, &draft.document_number) {
        let message = match draft.document_type {
            DocumentType::Cedula => "Formato de cédula inválido (Ej: V-12345678)",
            DocumentType::Rif => "Formato de RIF inválido (Ej: J-12345678-9)",
        };
        errors.insert("documentNumber", message);
    }

    if !draft.email.is_empty() && !validate_email(&draft.email) {
        errors.insert("email", "Formato de email inválido");
    }

    errors
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Building;

    fn create_test_draft() -> ApartmentDraft {
        ApartmentDraft {
            building_id: "1".to_string(),
            number: "101".to_string(),
            floor: "1".to_string(),
            square_meters: "85.5".to_string(),
            aliquot_type_id: "1".to_string(),
            monthly_fee: "25000".to_string(),
            ..ApartmentDraft::default()
        }
    }

    fn with_rules<T>(require_aliquot_type: bool, f: impl FnOnce(&ApartmentRules<'_>) -> T) -> T {
        let buildings = BuildingRegistry::from(vec![Building::new("1", "Torre Norte")]);
        let aliquot_types = AliquotRegistry::with_defaults();
        let rules = ApartmentRules {
            buildings: &buildings,
            aliquot_types: &aliquot_types,
            require_aliquot_type,
        };
        f(&rules)
    }

    #[test]
    fn test_validate_document_examples() {
        assert!(validate_document(DocumentType::Cedula, "V-12345678"));
        assert!(!validate_document(DocumentType::Cedula, "12345678"));
        assert!(validate_document(DocumentType::Rif, "J-12345678-9"));
    }

    #[test]
    fn test_validate_document_rejects_non_ascii_digits() {
        assert!(!validate_document(DocumentType::Cedula, "V-١٢٣٤٥٦٧٨"));
        assert!(!validate_document(DocumentType::Rif, "J-١٢٣٤٥٦٧٨-٩"));
        assert!(!validate_document(DocumentType::Rif, "J-12345678-٩"));
        assert!(validate_document(DocumentType::Rif, "E-87654321-0"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("carlos@email.com"));
        assert!(!validate_email("carlos@email"));
        assert!(!validate_email("carlos email@x.com"));
        assert!(!validate_email("@email.com"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(""), Ok(None));
        assert_eq!(parse_number("  "), Ok(None));
        assert_eq!(parse_number(" 12.5 "), Ok(Some(12.5)));
        assert_eq!(parse_number("12abc"), Err(()));
        assert_eq!(parse_number("NaN"), Err(()));
    }

    #[test]
    fn test_valid_apartment_draft() {
        let errors = with_rules(true, |rules| validate_apartment(&create_test_draft(), rules));
        assert!(errors.is_empty(), "unexpected errors: {}", errors);
    }

    #[test]
    fn test_negative_monthly_fee_rejected() {
        let mut draft = create_test_draft();
        draft.monthly_fee = "-5".to_string();

        let errors = with_rules(true, |rules| validate_apartment(&draft, rules));
        assert_eq!(
            errors.get("monthlyFee"),
            Some("La cuota mensual debe ser un número válido")
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_zero_fee_and_blank_optionals_accepted() {
        let mut draft = create_test_draft();
        draft.monthly_fee = "0".to_string();
        draft.square_meters = String::new();

        let errors = with_rules(true, |rules| validate_apartment(&draft, rules));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_square_meters_must_be_positive_number() {
        for raw in ["0", "-3", "abc"] {
            let mut draft = create_test_draft();
            draft.square_meters = raw.to_string();

            let errors = with_rules(true, |rules| validate_apartment(&draft, rules));
            assert!(errors.contains("squareMeters"), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_percentage_capped_at_hundred() {
        let mut draft = create_test_draft();
        draft.measurement_type = MeasurementType::Percentage;
        draft.square_meters = "120".to_string();

        let errors = with_rules(true, |rules| validate_apartment(&draft, rules));
        assert!(errors.contains("squareMeters"));

        draft.square_meters = "3.2".to_string();
        let errors = with_rules(true, |rules| validate_apartment(&draft, rules));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_required_fields() {
        let draft = ApartmentDraft::default();

        let errors = with_rules(true, |rules| validate_apartment(&draft, rules));
        assert!(errors.contains("buildingId"));
        assert!(errors.contains("number"));
        assert!(errors.contains("aliquotTypeId"));

        let errors = with_rules(false, |rules| validate_apartment(&draft, rules));
        assert!(!errors.contains("aliquotTypeId"));
    }

    #[test]
    fn test_unknown_references_rejected() {
        let mut draft = create_test_draft();
        draft.building_id = "99".to_string();
        draft.aliquot_type_id = "99".to_string();

        let errors = with_rules(true, |rules| validate_apartment(&draft, rules));
        assert_eq!(errors.get("buildingId"), Some("El edificio seleccionado no existe"));
        assert!(errors.contains("aliquotTypeId"));
    }

    #[test]
    fn test_owner_rules() {
        let valid = OwnerDraft {
            name: "Carlos".to_string(),
            document_number: "V-12345678".to_string(),
            email: "carlos@email.com".to_string(),
            ..OwnerDraft::default()
        };
        assert!(validate_owner(&valid).is_empty());

        let short = OwnerDraft {
            name: " C ".to_string(),
            ..valid.clone()
        };
        assert_eq!(
            validate_owner(&short).get("name"),
            Some("El nombre debe tener al menos 2 caracteres")
        );

        let bad_document = OwnerDraft {
            document_number: "12345678".to_string(),
            ..valid.clone()
        };
        assert_eq!(
            validate_owner(&bad_document).get("documentNumber"),
            Some("Formato de cédula inválido (Ej: V-12345678)")
        );

        let rif = OwnerDraft {
            document_type: DocumentType::Rif,
            document_number: "V-12345678".to_string(),
            ..valid.clone()
        };
        assert_eq!(
            validate_owner(&rif).get("documentNumber"),
            Some("Formato de RIF inválido (Ej: J-12345678-9)")
        );

        let bad_email = OwnerDraft {
            email: "not-an-email".to_string(),
            ..valid
        };
        assert!(validate_owner(&bad_email).contains("email"));
    }

    #[test]
    fn test_owner_missing_everything() {
        let errors = validate_owner(&OwnerDraft::default());

        assert_eq!(errors.get("name"), Some("El nombre es obligatorio"));
        assert_eq!(errors.get("documentNumber"), Some("El documento es obligatorio"));
        assert!(!errors.contains("email"));
    }

    #[test]
    fn test_field_errors_keep_first_message_and_order() {
        let mut errors = FieldErrors::new();
        errors.insert("number", "first");
        errors.insert("buildingId", "other");
        errors.insert("number", "second");

        assert_eq!(errors.get("number"), Some("first"));
        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["number", "buildingId"]);
        assert_eq!(errors.to_string(), "number: first; buildingId: other");
    }
}
