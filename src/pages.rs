// 📄 Listing Pages - apartment and owner admin views
//
// Page state is filters + whichever dialog is open. The ambient building
// scope comes in through PageContext, never from global state.

use crate::entities::{Apartment, ApartmentStats, Owner, OwnerStats};
use crate::error::{CodomiError, Result};
use crate::filters::{self, ApartmentFilter, OwnerFilter, Selection};
use crate::forms::{
    invalid_value, ApartmentForm, FormPhase, OwnerForm, QuickEdit, QuickField, ReferenceData,
};
use crate::notices::Notice;
use crate::relationships::ApartmentOwnerEditor;
use crate::store::Condominium;
use indexmap::IndexMap;

/// Settings every page is constructed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Building the admin is currently working in, if any
    pub selected_building: Option<String>,
    /// Whether the apartment form insists on an aliquot type
    pub require_aliquot_type: bool,
}

impl Default for PageContext {
    fn default() -> Self {
        PageContext {
            selected_building: None,
            require_aliquot_type: true,
        }
    }
}

// ============================================================================
// APARTMENTS PAGE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ApartmentsPage {
    context: PageContext,
    pub filter: ApartmentFilter,
    pub editor: Option<ApartmentForm>,
    pub owner_manager: Option<ApartmentOwnerEditor>,
    pub quick_edit: Option<QuickEdit>,
    pub notice: Option<Notice>,
}

impl ApartmentsPage {
    pub fn new(context: PageContext) -> Self {
        let filter = ApartmentFilter {
            building: context.selected_building.clone().into(),
            ..ApartmentFilter::default()
        };
        ApartmentsPage {
            context,
            filter,
            ..ApartmentsPage::default()
        }
    }

    pub fn context(&self) -> &PageContext {
        &self.context
    }

    /// Filtered apartments, grouped by building for display
    pub fn sections<'a>(&self, store: &'a Condominium) -> IndexMap<String, Vec<&'a Apartment>> {
        filters::group_by_building(self.visible(store))
    }

    pub fn visible<'a>(&self, store: &'a Condominium) -> Vec<&'a Apartment> {
        filters::filter_apartments(store.apartments(), &self.filter)
    }

    /// Totals for the header cards (unfiltered)
    pub fn stats(&self, store: &Condominium) -> ApartmentStats {
        store.apartment_stats()
    }

    pub fn set_search(&mut self, term: &str) {
        self.filter.search_term = term.to_string();
    }

    pub fn set_building(&mut self, building: Selection<String>) {
        self.filter.building = building;
    }

    pub fn set_status(&mut self, status: &str) -> Result<()> {
        self.filter.status = status
            .parse()
            .map_err(|e: String| invalid_value("status", e))?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Apartment editor
    // ------------------------------------------------------------------------

    pub fn open_create(&mut self) {
        let form = match &self.context.selected_building {
            Some(building_id) => ApartmentForm::create_in(building_id),
            None => ApartmentForm::create(),
        };
        self.editor = Some(form.with_aliquot_required(self.context.require_aliquot_type));
    }

    pub fn open_edit(&mut self, store: &Condominium, apartment_id: &str) -> Result<()> {
        let apartment = store
            .apartment(apartment_id)
            .ok_or_else(|| CodomiError::ApartmentNotFound(apartment_id.to_string()))?;
        self.editor = Some(
            ApartmentForm::edit(apartment).with_aliquot_required(self.context.require_aliquot_type),
        );
        Ok(())
    }

    /// Validate the open editor; a blocked submit leaves an error notice
    pub fn submit_editor(&mut self, store: &Condominium) -> Result<bool> {
        let form = self
            .editor
            .as_mut()
            .ok_or(CodomiError::InvalidTransition {
                action: "submit",
                phase: FormPhase::Closed,
            })?;

        let valid = form.submit(store)?;
        if !valid {
            self.notice = Some(Notice::validation_failed(form.errors().len()));
        }
        Ok(valid)
    }

    /// Apply the confirmed edit and close the editor
    pub fn confirm_editor(&mut self, store: &mut Condominium) -> Result<Apartment> {
        let form = self
            .editor
            .as_mut()
            .ok_or(CodomiError::InvalidTransition {
                action: "confirm",
                phase: FormPhase::Closed,
            })?;

        let (saved, notice) = form.confirm(store)?;
        self.notice = Some(notice);
        self.editor = None;
        Ok(saved)
    }

    pub fn close_editor(&mut self, store: &mut Condominium) {
        if let Some(mut form) = self.editor.take() {
            form.close(store);
        }
    }

    // ------------------------------------------------------------------------
    // Owner manager and inline edits
    // ------------------------------------------------------------------------

    pub fn open_owner_manager(&mut self, store: &Condominium, apartment_id: &str) -> Result<()> {
        if store.apartment(apartment_id).is_none() {
            return Err(CodomiError::ApartmentNotFound(apartment_id.to_string()));
        }
        self.owner_manager = Some(ApartmentOwnerEditor::open(apartment_id));
        Ok(())
    }

    pub fn close_owner_manager(&mut self) {
        if let Some(mut manager) = self.owner_manager.take() {
            manager.cancel_unlink();
        }
    }

    pub fn begin_quick_edit(
        &mut self,
        store: &Condominium,
        apartment_id: &str,
        field: QuickField,
    ) -> Result<()> {
        let apartment = store
            .apartment(apartment_id)
            .ok_or_else(|| CodomiError::ApartmentNotFound(apartment_id.to_string()))?;
        self.quick_edit = Some(QuickEdit::begin(apartment, field));
        Ok(())
    }

    /// Apply the inline edit; unusable values are dropped silently
    pub fn commit_quick_edit(&mut self, store: &mut Condominium) -> Result<Option<Apartment>> {
        match self.quick_edit.take() {
            Some(edit) => edit.apply(store),
            None => Ok(None),
        }
    }

    pub fn remove(&mut self, store: &mut Condominium, apartment_id: &str) -> Result<Apartment> {
        if self
            .owner_manager
            .as_ref()
            .is_some_and(|m| m.apartment_id() == apartment_id)
        {
            self.owner_manager = None;
        }
        store.remove_apartment(apartment_id)
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

// ============================================================================
// OWNERS PAGE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct OwnersPage {
    context: PageContext,
    pub filter: OwnerFilter,
    pub editor: Option<OwnerForm>,
    /// Owner whose profile is open
    pub selected: Option<String>,
    pub notice: Option<Notice>,
}

impl OwnersPage {
    pub fn new(context: PageContext) -> Self {
        let filter = OwnerFilter {
            building: context.selected_building.clone().into(),
            ..OwnerFilter::default()
        };
        OwnersPage {
            context,
            filter,
            ..OwnersPage::default()
        }
    }

    pub fn visible<'a>(&self, store: &'a Condominium) -> Vec<&'a Owner> {
        filters::filter_owners(store.owners(), store.apartments(), &self.filter)
    }

    pub fn stats(&self, store: &Condominium) -> OwnerStats {
        store.owner_stats()
    }

    pub fn set_search(&mut self, term: &str) {
        self.filter.search_term = term.to_string();
    }

    pub fn set_document_type(&mut self, document_type: &str) -> Result<()> {
        self.filter.document_type = document_type
            .parse()
            .map_err(|e: String| invalid_value("documentType", e))?;
        Ok(())
    }

    pub fn select(&mut self, owner_id: Option<&str>) {
        self.selected = owner_id.map(str::to_string);
    }

    /// Selected owner with the apartments it holds
    pub fn profile<'a>(&self, store: &'a Condominium) -> Option<(&'a Owner, Vec<&'a Apartment>)> {
        let owner_id = self.selected.as_deref()?;
        let owner = store.owner(owner_id)?;
        let apartments = store.apartments_of(owner_id).ok()?;
        Some((owner, apartments))
    }

    pub fn open_create(&mut self) {
        self.editor = Some(OwnerForm::create());
    }

    pub fn open_edit(&mut self, store: &Condominium, owner_id: &str) -> Result<()> {
        let owner = store
            .owner(owner_id)
            .ok_or_else(|| CodomiError::OwnerNotFound(owner_id.to_string()))?;
        self.editor = Some(OwnerForm::edit(owner));
        Ok(())
    }

    /// Link candidates for the open editor, within the page's building scope
    pub fn editor_candidates<'a>(&self, store: &'a Condominium) -> Vec<&'a Apartment> {
        match &self.editor {
            Some(form) => form.candidates(store.apartments(), self.context.selected_building.as_deref()),
            None => Vec::new(),
        }
    }

    pub fn submit_editor(&mut self) -> Result<bool> {
        let form = self.editor.as_mut().ok_or(CodomiError::InvalidTransition {
            action: "submit",
            phase: FormPhase::Closed,
        })?;

        let valid = form.submit()?;
        if !valid {
            self.notice = Some(Notice::validation_failed(form.errors().len()));
        }
        Ok(valid)
    }

    pub fn confirm_editor(&mut self, store: &mut Condominium) -> Result<Owner> {
        let form = self.editor.as_mut().ok_or(CodomiError::InvalidTransition {
            action: "confirm",
            phase: FormPhase::Closed,
        })?;

        let (saved, notice) = form.confirm(store)?;
        self.notice = Some(notice);
        self.editor = None;
        Ok(saved)
    }

    pub fn close_editor(&mut self, store: &mut Condominium) {
        if let Some(mut form) = self.editor.take() {
            form.close(store);
        }
    }

    pub fn remove(&mut self, store: &mut Condominium, owner_id: &str) -> Result<Owner> {
        if self.selected.as_deref() == Some(owner_id) {
            self.selected = None;
        }
        store.remove_owner(owner_id)
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}
