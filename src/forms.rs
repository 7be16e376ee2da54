// 📝 Editor Forms - apartment/owner dialogs and the apartment card quick-edit
//
// Lifecycle of every form:
//
//   Editing ──submit──▶ (invalid) Editing
//                  └──▶ (valid)   Confirming ──cancel──▶ Editing
//                                            └─confirm─▶ Saved
//   Editing/Confirming ──close──▶ Closed
//
// A form owns its working copy until `confirm`, which hands the built record
// to the host's `on_save`. Errors are recomputed on submit only; editing a
// field leaves the previous messages in place.

use crate::entities::{
    AliquotRegistry, Apartment, ApartmentStatus, BuildingRegistry, DocumentType,
    MeasurementType, Owner,
};
use crate::error::{CodomiError, Result};
use crate::notices::Notice;
use crate::relationships;
use crate::validation::{self, ApartmentRules, FieldErrors};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// HOST CONTRACT
// ============================================================================

/// Callback contract between a listing page and its editors
pub trait FormHost<T> {
    /// Persist a confirmed record (insert or replace) and return it as stored
    fn on_save(&mut self, record: T) -> Result<T>;

    /// Replace a single existing record without the confirmation flow
    fn on_update(&mut self, record: T) -> Result<T>;

    /// Editor dismissed; in-progress edits are discarded
    fn on_close(&mut self) {}
}

/// Read access to the data editors resolve ids against
pub trait ReferenceData {
    fn buildings(&self) -> &BuildingRegistry;
    fn aliquot_types(&self) -> &AliquotRegistry;
    fn apartments(&self) -> &[Apartment];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormPhase {
    Editing,
    Confirming,
    Saved,
    Closed,
}

impl fmt::Display for FormPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormPhase::Editing => "editing",
            FormPhase::Confirming => "confirming",
            FormPhase::Saved => "saved",
            FormPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

pub(crate) fn invalid_value(field: &str, message: String) -> CodomiError {
    let mut errors = FieldErrors::new();
    errors.insert(field, message);
    CodomiError::Validation(errors)
}

// ============================================================================
// APARTMENT DRAFT
// ============================================================================

/// Raw form input, exactly as typed
#[derive(Debug, Clone, PartialEq)]
pub struct ApartmentDraft {
    pub building_id: String,
    pub number: String,
    pub floor: String,
    pub square_meters: String,
    pub measurement_type: MeasurementType,
    pub aliquot_type_id: String,
    pub status: ApartmentStatus,
    pub monthly_fee: String,
}

impl Default for ApartmentDraft {
    fn default() -> Self {
        ApartmentDraft {
            building_id: String::new(),
            number: String::new(),
            floor: String::new(),
            square_meters: String::new(),
            measurement_type: MeasurementType::Area,
            aliquot_type_id: String::new(),
            status: ApartmentStatus::Vacant,
            monthly_fee: String::new(),
        }
    }
}

impl From<&Apartment> for ApartmentDraft {
    fn from(apartment: &Apartment) -> Self {
        ApartmentDraft {
            building_id: apartment.building_id.clone(),
            number: apartment.number.clone(),
            floor: apartment.floor.clone(),
            square_meters: apartment
                .square_meters
                .map(|v| v.to_string())
                .unwrap_or_default(),
            measurement_type: apartment.measurement_type,
            aliquot_type_id: apartment.aliquot_type_id.clone().unwrap_or_default(),
            status: apartment.status,
            monthly_fee: apartment.monthly_fee.to_string(),
        }
    }
}

impl ApartmentDraft {
    pub const FIELDS: [&'static str; 8] = [
        "buildingId",
        "number",
        "floor",
        "squareMeters",
        "measurementType",
        "aliquotTypeId",
        "status",
        "monthlyFee",
    ];

    pub fn get(&self, field: &str) -> Result<String> {
        let value = match field {
            "buildingId" => self.building_id.clone(),
            "number" => self.number.clone(),
            "floor" => self.floor.clone(),
            "squareMeters" => self.square_meters.clone(),
            "measurementType" => self.measurement_type.as_str().to_string(),
            "aliquotTypeId" => self.aliquot_type_id.clone(),
            "status" => self.status.as_str().to_string(),
            "monthlyFee" => self.monthly_fee.clone(),
            other => return Err(CodomiError::UnknownField(other.to_string())),
        };
        Ok(value)
    }

    pub fn set(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "buildingId" => self.building_id = value.to_string(),
            "number" => self.number = value.to_string(),
            "floor" => self.floor = value.to_string(),
            "squareMeters" => self.square_meters = value.to_string(),
            "measurementType" => {
                self.measurement_type = value
                    .parse()
                    .map_err(|e: String| invalid_value(field, e))?;
            }
            "aliquotTypeId" => self.aliquot_type_id = value.to_string(),
            "status" => {
                self.status = value
                    .parse()
                    .map_err(|e: String| invalid_value(field, e))?;
            }
            "monthlyFee" => self.monthly_fee = value.to_string(),
            other => return Err(CodomiError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}

// ============================================================================
// APARTMENT FORM
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApartmentForm {
    original: Option<Apartment>,
    draft: ApartmentDraft,
    errors: FieldErrors,
    phase: FormPhase,
    require_aliquot_type: bool,
}

impl ApartmentForm {
    /// Empty form for a new apartment
    pub fn create() -> Self {
        ApartmentForm {
            original: None,
            draft: ApartmentDraft::default(),
            errors: FieldErrors::new(),
            phase: FormPhase::Editing,
            require_aliquot_type: true,
        }
    }

    /// New apartment pre-assigned to the building currently in scope
    pub fn create_in(building_id: &str) -> Self {
        let mut form = ApartmentForm::create();
        form.draft.building_id = building_id.to_string();
        form
    }

    /// Form pre-populated with an existing apartment
    pub fn edit(apartment: &Apartment) -> Self {
        ApartmentForm {
            original: Some(apartment.clone()),
            draft: ApartmentDraft::from(apartment),
            errors: FieldErrors::new(),
            phase: FormPhase::Editing,
            require_aliquot_type: true,
        }
    }

    pub fn with_aliquot_required(mut self, required: bool) -> Self {
        self.require_aliquot_type = required;
        self
    }

    pub fn is_editing(&self) -> bool {
        self.original.is_some()
    }

    pub fn original(&self) -> Option<&Apartment> {
        self.original.as_ref()
    }

    pub fn draft(&self) -> &ApartmentDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn title(&self) -> &'static str {
        if self.is_editing() {
            "Editar Apartamento"
        } else {
            "Crear Nuevo Apartamento"
        }
    }

    /// Edit one field. The building cannot change once the apartment exists.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        if self.phase != FormPhase::Editing {
            return Err(CodomiError::InvalidTransition {
                action: "edit",
                phase: self.phase,
            });
        }
        if field == "buildingId" && self.is_editing() {
            return Err(CodomiError::ReadOnlyField(field.to_string()));
        }
        self.draft.set(field, value)
    }

    /// Validate; on success move to the confirmation step
    pub fn submit<R: ReferenceData + ?Sized>(&mut self, reference: &R) -> Result<bool> {
        if self.phase != FormPhase::Editing {
            return Err(CodomiError::InvalidTransition {
                action: "submit",
                phase: self.phase,
            });
        }

        let rules = ApartmentRules {
            buildings: reference.buildings(),
            aliquot_types: reference.aliquot_types(),
            require_aliquot_type: self.require_aliquot_type,
        };
        self.errors = validation::validate_apartment(&self.draft, &rules);

        if self.errors.is_empty() {
            self.phase = FormPhase::Confirming;
            Ok(true)
        } else {
            tracing::debug!(errors = %self.errors, "apartment form rejected");
            Ok(false)
        }
    }

    /// Back out of the confirmation step, keeping the edits
    pub fn cancel_confirmation(&mut self) -> Result<()> {
        if self.phase != FormPhase::Confirming {
            return Err(CodomiError::InvalidTransition {
                action: "cancel confirmation",
                phase: self.phase,
            });
        }
        self.phase = FormPhase::Editing;
        Ok(())
    }

    /// "¿Está seguro de que desea crear el apartamento 101 en Torre Norte?"
    pub fn confirmation_prompt<R: ReferenceData + ?Sized>(&self, reference: &R) -> String {
        let verb = if self.is_editing() { "actualizar" } else { "crear" };
        let building = reference
            .buildings()
            .find_by_id(self.draft.building_id.trim())
            .map(|b| b.name.as_str())
            .unwrap_or("");
        format!(
            "¿Está seguro de que desea {} el apartamento {} en {}?",
            verb,
            self.draft.number.trim(),
            building
        )
    }

    /// Build the record from the draft; ids and timestamps kept when editing
    pub fn build_record<R: ReferenceData + ?Sized>(&self, reference: &R) -> Apartment {
        let now = Utc::now();
        let building_id = self.draft.building_id.trim().to_string();
        let building_name = reference
            .buildings()
            .find_by_id(&building_id)
            .map(|b| b.name.clone())
            .unwrap_or_default();
        let aliquot_type_id = Some(self.draft.aliquot_type_id.trim().to_string())
            .filter(|id| !id.is_empty());
        let aliquot_type = aliquot_type_id
            .as_deref()
            .and_then(|id| reference.aliquot_types().find_by_id(id))
            .cloned();
        let floor = match self.draft.floor.trim() {
            "" => "1".to_string(),
            floor => floor.to_string(),
        };

        Apartment {
            id: self
                .original
                .as_ref()
                .map(|a| a.id.clone())
                .unwrap_or_default(),
            number: self.draft.number.trim().to_string(),
            floor,
            building_id,
            building_name,
            square_meters: validation::parse_number(&self.draft.square_meters)
                .ok()
                .flatten(),
            measurement_type: self.draft.measurement_type,
            aliquot_type_id,
            aliquot_type,
            owner_ids: self
                .original
                .as_ref()
                .map(|a| a.owner_ids.clone())
                .unwrap_or_default(),
            owners: self
                .original
                .as_ref()
                .map(|a| a.owners.clone())
                .unwrap_or_default(),
            status: self.draft.status,
            monthly_fee: validation::parse_number(&self.draft.monthly_fee)
                .ok()
                .flatten()
                .unwrap_or(0.0),
            created_at: self.original.as_ref().map(|a| a.created_at).unwrap_or(now),
            updated_at: now,
        }
    }

    /// Apply the confirmed edit through the host's `on_save`
    pub fn confirm<H>(&mut self, host: &mut H) -> Result<(Apartment, Notice)>
    where
        H: FormHost<Apartment> + ReferenceData,
    {
        if self.phase != FormPhase::Confirming {
            return Err(CodomiError::InvalidTransition {
                action: "confirm",
                phase: self.phase,
            });
        }

        let record = self.build_record(&*host);
        match host.on_save(record) {
            Ok(saved) => {
                self.phase = FormPhase::Saved;
                let notice = Notice::apartment_saved(!self.is_editing(), &saved.number);
                Ok((saved, notice))
            }
            Err(err) => {
                self.phase = FormPhase::Editing;
                if let CodomiError::Validation(errors) = &err {
                    self.errors = errors.clone();
                }
                Err(err)
            }
        }
    }

    /// Discard edits and notify the host
    pub fn close<H: FormHost<Apartment> + ?Sized>(&mut self, host: &mut H) {
        self.phase = FormPhase::Closed;
        host.on_close();
    }
}

// ============================================================================
// OWNER DRAFT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct OwnerDraft {
    pub name: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub email: String,
    pub phone: String,
}

impl Default for OwnerDraft {
    fn default() -> Self {
        OwnerDraft {
            name: String::new(),
            document_type: DocumentType::Cedula,
            document_number: String::new(),
            email: String::new(),
            phone: String::new(),
        }
    }
}

impl From<&Owner> for OwnerDraft {
    fn from(owner: &Owner) -> Self {
        OwnerDraft {
            name: owner.name.clone(),
            document_type: owner.document_type,
            document_number: owner.document_number.clone(),
            email: owner.email.clone().unwrap_or_default(),
            phone: owner.phone.clone().unwrap_or_default(),
        }
    }
}

impl OwnerDraft {
    pub const FIELDS: [&'static str; 5] =
        ["name", "documentType", "documentNumber", "email", "phone"];

    pub fn get(&self, field: &str) -> Result<String> {
        let value = match field {
            "name" => self.name.clone(),
            "documentType" => self.document_type.as_str().to_string(),
            "documentNumber" => self.document_number.clone(),
            "email" => self.email.clone(),
            "phone" => self.phone.clone(),
            other => return Err(CodomiError::UnknownField(other.to_string())),
        };
        Ok(value)
    }

    pub fn set(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            "name" => self.name = value.to_string(),
            "documentType" => {
                let document_type = value
                    .parse()
                    .map_err(|e: String| invalid_value(field, e))?;
                self.set_document_type(document_type);
            }
            "documentNumber" => self.document_number = value.to_string(),
            "email" => self.email = value.to_string(),
            "phone" => self.phone = value.to_string(),
            other => return Err(CodomiError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    /// Switching the document type clears the number typed for the old one
    pub fn set_document_type(&mut self, document_type: DocumentType) {
        if self.document_type != document_type {
            self.document_type = document_type;
            self.document_number.clear();
        }
    }
}

// ============================================================================
// OWNER FORM
// ============================================================================

#[derive(Debug, Clone)]
pub struct OwnerForm {
    original: Option<Owner>,
    draft: OwnerDraft,
    /// Working copy of the linked apartment ids, applied on save
    linked: Vec<String>,
    apartment_search: String,
    pending_unlink: Option<String>,
    errors: FieldErrors,
    phase: FormPhase,
}

impl OwnerForm {
    pub fn create() -> Self {
        OwnerForm {
            original: None,
            draft: OwnerDraft::default(),
            linked: Vec::new(),
            apartment_search: String::new(),
            pending_unlink: None,
            errors: FieldErrors::new(),
            phase: FormPhase::Editing,
        }
    }

    /// New owner already linked to one apartment (opened from an apartment)
    pub fn create_for_apartment(apartment_id: &str) -> Self {
        let mut form = OwnerForm::create();
        form.linked.push(apartment_id.to_string());
        form
    }

    pub fn edit(owner: &Owner) -> Self {
        OwnerForm {
            original: Some(owner.clone()),
            draft: OwnerDraft::from(owner),
            linked: owner.apartment_ids.clone(),
            apartment_search: String::new(),
            pending_unlink: None,
            errors: FieldErrors::new(),
            phase: FormPhase::Editing,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.original.is_some()
    }

    pub fn original(&self) -> Option<&Owner> {
        self.original.as_ref()
    }

    pub fn draft(&self) -> &OwnerDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn linked_apartment_ids(&self) -> &[String] {
        &self.linked
    }

    pub fn pending_unlink(&self) -> Option<&str> {
        self.pending_unlink.as_deref()
    }

    pub fn apartment_search(&self) -> &str {
        &self.apartment_search
    }

    pub fn title(&self) -> &'static str {
        if self.is_editing() {
            "Editar Propietario"
        } else {
            "Crear Nuevo Propietario"
        }
    }

    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        if self.phase != FormPhase::Editing {
            return Err(CodomiError::InvalidTransition {
                action: "edit",
                phase: self.phase,
            });
        }
        self.draft.set(field, value)
    }

    pub fn set_apartment_search(&mut self, term: &str) {
        self.apartment_search = term.to_string();
    }

    /// Link candidates; empty until something is typed in the search box
    pub fn candidates<'a>(
        &self,
        apartments: &'a [Apartment],
        building_scope: Option<&str>,
    ) -> Vec<&'a Apartment> {
        if self.apartment_search.trim().is_empty() {
            return Vec::new();
        }
        relationships::available_apartments(
            &self.linked,
            apartments,
            &self.apartment_search,
            building_scope,
        )
    }

    /// Add an apartment to the working list; clears the search box
    pub fn link_apartment(&mut self, apartment_id: &str) -> bool {
        self.apartment_search.clear();
        if self.linked.iter().any(|id| id == apartment_id) {
            return false;
        }
        self.linked.push(apartment_id.to_string());
        true
    }

    /// Ask for confirmation before dropping a linked apartment
    pub fn request_unlink(&mut self, apartment_id: &str) -> bool {
        if !self.linked.iter().any(|id| id == apartment_id) {
            return false;
        }
        self.pending_unlink = Some(apartment_id.to_string());
        true
    }

    pub fn confirm_unlink(&mut self) -> Option<String> {
        let apartment_id = self.pending_unlink.take()?;
        self.linked.retain(|id| id != &apartment_id);
        Some(apartment_id)
    }

    pub fn cancel_unlink(&mut self) {
        self.pending_unlink = None;
    }

    pub fn submit(&mut self) -> Result<bool> {
        if self.phase != FormPhase::Editing {
            return Err(CodomiError::InvalidTransition {
                action: "submit",
                phase: self.phase,
            });
        }

        self.errors = validation::validate_owner(&self.draft);

        if self.errors.is_empty() {
            self.phase = FormPhase::Confirming;
            Ok(true)
        } else {
            tracing::debug!(errors = %self.errors, "owner form rejected");
            Ok(false)
        }
    }

    pub fn cancel_confirmation(&mut self) -> Result<()> {
        if self.phase != FormPhase::Confirming {
            return Err(CodomiError::InvalidTransition {
                action: "cancel confirmation",
                phase: self.phase,
            });
        }
        self.phase = FormPhase::Editing;
        Ok(())
    }

    pub fn confirmation_prompt(&self) -> String {
        let verb = if self.is_editing() { "actualizar" } else { "crear" };
        format!(
            "¿Está seguro de que desea {} los datos del propietario {}?",
            verb, self.draft.name
        )
    }

    pub fn build_record(&self) -> Owner {
        let now = Utc::now();
        let optional = |value: &str| Some(value.trim().to_string()).filter(|v| !v.is_empty());

        Owner {
            id: self
                .original
                .as_ref()
                .map(|o| o.id.clone())
                .unwrap_or_default(),
            name: self.draft.name.trim().to_string(),
            document_type: self.draft.document_type,
            document_number: self.draft.document_number.clone(),
            email: optional(&self.draft.email),
            phone: optional(&self.draft.phone),
            apartment_ids: self.linked.clone(),
            created_at: self.original.as_ref().map(|o| o.created_at).unwrap_or(now),
            updated_at: now,
        }
    }

    pub fn confirm<H: FormHost<Owner> + ?Sized>(&mut self, host: &mut H) -> Result<(Owner, Notice)> {
        if self.phase != FormPhase::Confirming {
            return Err(CodomiError::InvalidTransition {
                action: "confirm",
                phase: self.phase,
            });
        }

        match host.on_save(self.build_record()) {
            Ok(saved) => {
                self.phase = FormPhase::Saved;
                let notice = Notice::owner_saved(!self.is_editing(), &saved.name);
                Ok((saved, notice))
            }
            Err(err) => {
                self.phase = FormPhase::Editing;
                if let CodomiError::Validation(errors) = &err {
                    self.errors = errors.clone();
                }
                Err(err)
            }
        }
    }

    pub fn close<H: FormHost<Owner> + ?Sized>(&mut self, host: &mut H) {
        self.phase = FormPhase::Closed;
        host.on_close();
    }
}

// ============================================================================
// QUICK EDIT (apartment card inline fields)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuickField {
    Number,
    SquareMeters,
    AliquotType,
}

impl QuickField {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuickField::Number => "number",
            QuickField::SquareMeters => "squareMeters",
            QuickField::AliquotType => "aliquotType",
        }
    }
}

/// One inline field edit on an apartment card, applied via `on_update`
#[derive(Debug, Clone, PartialEq)]
pub struct QuickEdit {
    pub apartment_id: String,
    pub field: QuickField,
    pub value: String,
}

impl QuickEdit {
    /// Start editing with the current value pre-filled
    pub fn begin(apartment: &Apartment, field: QuickField) -> Self {
        let value = match field {
            QuickField::Number => apartment.number.clone(),
            QuickField::SquareMeters => apartment
                .square_meters
                .map(|v| v.to_string())
                .unwrap_or_default(),
            QuickField::AliquotType => apartment.aliquot_type_id.clone().unwrap_or_default(),
        };
        QuickEdit {
            apartment_id: apartment.id.clone(),
            field,
            value,
        }
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
    }

    /// Apply the edit. Returns Ok(None) when the value is unusable
    /// (blank number, non-positive area, unknown aliquot type).
    pub fn apply<H>(self, host: &mut H) -> Result<Option<Apartment>>
    where
        H: FormHost<Apartment> + ReferenceData,
    {
        let mut apartment = host
            .apartments()
            .iter()
            .find(|a| a.id == self.apartment_id)
            .cloned()
            .ok_or_else(|| CodomiError::ApartmentNotFound(self.apartment_id.clone()))?;

        match self.field {
            QuickField::Number => {
                let number = self.value.trim();
                if number.is_empty() {
                    return Ok(None);
                }
                apartment.number = number.to_string();
            }
            QuickField::SquareMeters => match validation::parse_number(&self.value) {
                Ok(Some(value)) if value > 0.0 => apartment.square_meters = Some(value),
                _ => return Ok(None),
            },
            QuickField::AliquotType => {
                let Some(aliquot_type) = host.aliquot_types().find_by_id(self.value.trim()) else {
                    return Ok(None);
                };
                apartment.aliquot_type_id = Some(aliquot_type.id.clone());
                apartment.aliquot_type = Some(aliquot_type.clone());
            }
        }

        apartment.touch();
        host.on_update(apartment).map(Some)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Condominium;

    fn filled_apartment_form() -> ApartmentForm {
        let mut form = ApartmentForm::create();
        form.set_field("buildingId", "1").unwrap();
        form.set_field("number", " 401 ").unwrap();
        form.set_field("squareMeters", "70").unwrap();
        form.set_field("aliquotTypeId", "2").unwrap();
        form.set_field("monthlyFee", "21000").unwrap();
        form
    }

    #[test]
    fn test_apartment_form_happy_path() {
        let mut store = Condominium::with_defaults();
        let before = store.apartments().len();
        let mut form = filled_apartment_form();

        assert!(form.submit(&store).unwrap());
        assert_eq!(form.phase(), FormPhase::Confirming);
        assert_eq!(
            form.confirmation_prompt(&store),
            "¿Está seguro de que desea crear el apartamento 401 en Torre Norte?"
        );

        let (saved, notice) = form.confirm(&mut store).unwrap();
        assert_eq!(form.phase(), FormPhase::Saved);
        assert!(saved.id.starts_with("apt-"));
        assert_eq!(saved.number, "401");
        assert_eq!(saved.floor, "1");
        assert_eq!(saved.building_name, "Torre Norte");
        assert_eq!(saved.aliquot_type.as_ref().unwrap().name, "Tipo B");
        assert_eq!(notice.title, "Apartamento creado");
        assert_eq!(store.apartments().len(), before + 1);
    }

    #[test]
    fn test_negative_fee_blocks_save() {
        let mut store = Condominium::with_defaults();
        let before = store.apartments().len();
        let mut form = filled_apartment_form();
        form.set_field("monthlyFee", "-5").unwrap();

        assert!(!form.submit(&store).unwrap());
        assert_eq!(form.phase(), FormPhase::Editing);
        assert!(form.errors().contains("monthlyFee"));

        // Not confirmable, so on_save is never reached
        assert!(matches!(
            form.confirm(&mut store),
            Err(CodomiError::InvalidTransition { action: "confirm", .. })
        ));
        assert_eq!(store.apartments().len(), before);
    }

    #[test]
    fn test_errors_clear_only_on_submit() {
        let store = Condominium::with_defaults();
        let mut form = filled_apartment_form();
        form.set_field("number", "").unwrap();
        form.submit(&store).unwrap();
        assert!(form.errors().contains("number"));

        form.set_field("number", "402").unwrap();
        assert!(form.errors().contains("number"));

        assert!(form.submit(&store).unwrap());
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_cancel_confirmation_returns_to_editing() {
        let store = Condominium::with_defaults();
        let mut form = filled_apartment_form();
        form.submit(&store).unwrap();

        form.cancel_confirmation().unwrap();
        assert_eq!(form.phase(), FormPhase::Editing);
        assert!(form.cancel_confirmation().is_err());
        form.set_field("floor", "4").unwrap();
    }

    #[test]
    fn test_fields_locked_while_confirming() {
        let store = Condominium::with_defaults();
        let mut form = filled_apartment_form();
        form.submit(&store).unwrap();

        assert!(matches!(
            form.set_field("number", "999"),
            Err(CodomiError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_edit_keeps_identity_and_links() {
        let mut store = Condominium::with_defaults();
        let existing = store.apartment("1").unwrap().clone();
        let mut form = ApartmentForm::edit(&existing);

        assert_eq!(form.draft().number, "101");
        assert!(matches!(
            form.set_field("buildingId", "2"),
            Err(CodomiError::ReadOnlyField(_))
        ));

        form.set_field("status", "maintenance").unwrap();
        form.submit(&store).unwrap();
        let (saved, notice) = form.confirm(&mut store).unwrap();

        assert_eq!(saved.id, "1");
        assert_eq!(saved.owner_ids, existing.owner_ids);
        assert_eq!(saved.created_at, existing.created_at);
        assert_eq!(saved.status, ApartmentStatus::Maintenance);
        assert_eq!(notice.title, "Apartamento actualizado");
        assert_eq!(store.apartment("1").unwrap().status, ApartmentStatus::Maintenance);
    }

    #[test]
    fn test_unknown_field_and_bad_enum() {
        let mut form = ApartmentForm::create();

        assert!(matches!(
            form.set_field("color", "red"),
            Err(CodomiError::UnknownField(_))
        ));
        assert!(matches!(
            form.set_field("status", "sold"),
            Err(CodomiError::Validation(_))
        ));
    }

    #[test]
    fn test_close_discards() {
        let mut store = Condominium::with_defaults();
        let before = store.apartments().len();
        let mut form = filled_apartment_form();

        form.close(&mut store);
        assert_eq!(form.phase(), FormPhase::Closed);
        assert!(form.submit(&store).is_err());
        assert_eq!(store.apartments().len(), before);
    }

    #[test]
    fn test_owner_form_document_type_switch_clears_number() {
        let mut form = OwnerForm::create();
        form.set_field("documentNumber", "V-12345678").unwrap();
        form.set_field("documentType", "rif").unwrap();

        assert_eq!(form.draft().document_type, DocumentType::Rif);
        assert!(form.draft().document_number.is_empty());

        form.set_field("documentNumber", "J-12345678-9").unwrap();
        form.set_field("documentType", "rif").unwrap();
        assert_eq!(form.draft().document_number, "J-12345678-9");
    }

    #[test]
    fn test_owner_form_links_through_store() {
        let mut store = Condominium::with_defaults();
        let mut form = OwnerForm::create();
        form.set_field("name", "Luisa Rivas").unwrap();
        form.set_field("documentNumber", "E-11223344").unwrap();
        form.set_field("email", "luisa@email.com").unwrap();

        form.set_apartment_search("30");
        let candidates: Vec<String> = form
            .candidates(store.apartments(), None)
            .iter()
            .map(|a| a.id.clone())
            .collect();
        assert_eq!(candidates, vec!["4".to_string(), "5".to_string()]);

        assert!(form.link_apartment("4"));
        assert!(form.apartment_search().is_empty());
        assert!(!form.link_apartment("4"));

        assert!(form.submit().unwrap());
        let (saved, notice) = form.confirm(&mut store).unwrap();

        assert!(saved.id.starts_with("owner-"));
        assert_eq!(saved.apartment_ids, vec!["4".to_string()]);
        assert!(store.apartment("4").unwrap().has_owner(&saved.id));
        assert_eq!(notice.title, "Propietario creado");
    }

    #[test]
    fn test_owner_form_unlink_needs_confirmation() {
        let store = Condominium::with_defaults();
        let owner = store.owner("1").unwrap().clone();
        let mut form = OwnerForm::edit(&owner);

        assert!(form.request_unlink("5"));
        assert_eq!(form.pending_unlink(), Some("5"));
        assert_eq!(form.linked_apartment_ids().len(), 2);

        form.cancel_unlink();
        assert_eq!(form.linked_apartment_ids().len(), 2);

        form.request_unlink("5");
        assert_eq!(form.confirm_unlink(), Some("5".to_string()));
        assert_eq!(form.linked_apartment_ids(), &["1".to_string()]);
        assert!(!form.request_unlink("5"));
    }

    #[test]
    fn test_owner_form_invalid_document_blocks() {
        let mut form = OwnerForm::create();
        form.set_field("name", "Carlos").unwrap();
        form.set_field("documentNumber", "12345678").unwrap();

        assert!(!form.submit().unwrap());
        assert_eq!(
            form.errors().get("documentNumber"),
            Some("Formato de cédula inválido (Ej: V-12345678)")
        );
    }

    #[test]
    fn test_quick_edit_fields() {
        let mut store = Condominium::with_defaults();
        let apartment = store.apartment("4").unwrap().clone();

        let mut edit = QuickEdit::begin(&apartment, QuickField::Number);
        assert_eq!(edit.value, "301");
        edit.set_value("301-B");
        let updated = edit.apply(&mut store).unwrap().unwrap();
        assert_eq!(updated.number, "301-B");
        assert_eq!(store.apartment("4").unwrap().number, "301-B");

        let mut area = QuickEdit::begin(&apartment, QuickField::SquareMeters);
        area.set_value("abc");
        assert_eq!(area.apply(&mut store).unwrap(), None);

        let mut aliquot = QuickEdit::begin(&apartment, QuickField::AliquotType);
        aliquot.set_value("5");
        let updated = aliquot.apply(&mut store).unwrap().unwrap();
        assert_eq!(updated.aliquot_type.unwrap().name, "Tipo E");

        let mut unknown = QuickEdit::begin(&apartment, QuickField::AliquotType);
        unknown.set_value("42");
        assert_eq!(unknown.apply(&mut store).unwrap(), None);
        assert_eq!(
            store.apartment("4").unwrap().aliquot_type_id.as_deref(),
            Some("5")
        );
    }
}
