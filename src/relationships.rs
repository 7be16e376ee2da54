// 🔗 Apartment ↔ Owner Relationships
//
// "One mutator, both sides, same call"
//
// Every link change updates Apartment.ownerIds + Apartment.owners and
// Owner.apartmentIds together. Unlinking is two-step: request_unlink hands
// back a PendingUnlink, and only PendingUnlink::confirm touches the store.

use crate::entities::{Apartment, Owner, OwnerSummary};
use crate::error::{CodomiError, Result};
use crate::filters::{contains_term, normalize_term};
use crate::forms::ReferenceData;
use crate::notices::Notice;
use crate::store::Condominium;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// LINK / UNLINK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked,
    AlreadyLinked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlinkOutcome {
    Unlinked,
    AlreadyUnlinked,
}

fn ensure_pair(store: &Condominium, apartment_id: &str, owner_id: &str) -> Result<()> {
    if store.apartment(apartment_id).is_none() {
        return Err(CodomiError::ApartmentNotFound(apartment_id.to_string()));
    }
    if store.owner(owner_id).is_none() {
        return Err(CodomiError::OwnerNotFound(owner_id.to_string()));
    }
    Ok(())
}

/// Link an owner to an apartment on both sides. Idempotent.
pub fn link(store: &mut Condominium, apartment_id: &str, owner_id: &str) -> Result<LinkOutcome> {
    ensure_pair(store, apartment_id, owner_id)?;
    let owner = store
        .owner(owner_id)
        .cloned()
        .ok_or_else(|| CodomiError::OwnerNotFound(owner_id.to_string()))?;

    let apartment_changed = store
        .apartments_mut()
        .get_mut(apartment_id)
        .is_some_and(|a| a.link_owner(&owner));
    let owner_changed = store
        .owners_mut()
        .get_mut(owner_id)
        .is_some_and(|o| o.link_apartment(apartment_id));

    if apartment_changed || owner_changed {
        tracing::debug!(apartment = %apartment_id, owner = %owner_id, "owner linked");
        Ok(LinkOutcome::Linked)
    } else {
        Ok(LinkOutcome::AlreadyLinked)
    }
}

/// Immediate unlink; public callers go through `request_unlink`
pub(crate) fn unlink(
    store: &mut Condominium,
    apartment_id: &str,
    owner_id: &str,
) -> Result<UnlinkOutcome> {
    ensure_pair(store, apartment_id, owner_id)?;

    let apartment_changed = store
        .apartments_mut()
        .get_mut(apartment_id)
        .is_some_and(|a| a.unlink_owner(owner_id));
    let owner_changed = store
        .owners_mut()
        .get_mut(owner_id)
        .is_some_and(|o| o.unlink_apartment(apartment_id));

    if apartment_changed || owner_changed {
        tracing::debug!(apartment = %apartment_id, owner = %owner_id, "owner unlinked");
        Ok(UnlinkOutcome::Unlinked)
    } else {
        Ok(UnlinkOutcome::AlreadyUnlinked)
    }
}

/// An unlink awaiting the user's confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an unlink only happens once it is confirmed"]
pub struct PendingUnlink {
    apartment_id: String,
    owner_id: String,
}

impl PendingUnlink {
    pub fn apartment_id(&self) -> &str {
        &self.apartment_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn confirm(self, store: &mut Condominium) -> Result<UnlinkOutcome> {
        unlink(store, &self.apartment_id, &self.owner_id)
    }

    pub fn cancel(self) {
        tracing::debug!(apartment = %self.apartment_id, owner = %self.owner_id, "unlink cancelled");
    }
}

pub fn request_unlink(
    store: &Condominium,
    apartment_id: &str,
    owner_id: &str,
) -> Result<PendingUnlink> {
    ensure_pair(store, apartment_id, owner_id)?;
    Ok(PendingUnlink {
        apartment_id: apartment_id.to_string(),
        owner_id: owner_id.to_string(),
    })
}

/// Drop every reference to an apartment that is about to be deleted
pub(crate) fn detach_apartment(store: &mut Condominium, apartment_id: &str) {
    for owner in store.owners_mut().iter_mut() {
        if owner.unlink_apartment(apartment_id) {
            tracing::debug!(apartment = %apartment_id, owner = %owner.id, "owner detached");
        }
    }
    if let Some(apartment) = store.apartments_mut().get_mut(apartment_id) {
        apartment.owner_ids.clear();
        apartment.owners.clear();
    }
}

/// Drop every reference to an owner that is about to be deleted
pub(crate) fn detach_owner(store: &mut Condominium, owner_id: &str) {
    for apartment in store.apartments_mut().iter_mut() {
        if apartment.unlink_owner(owner_id) {
            tracing::debug!(apartment = %apartment.id, owner = %owner_id, "apartment detached");
        }
    }
    if let Some(owner) = store.owners_mut().get_mut(owner_id) {
        owner.apartment_ids.clear();
    }
}

/// Re-copy an owner's display fields into every apartment that lists it
pub(crate) fn refresh_owner_summaries(store: &mut Condominium, owner_id: &str) {
    let Some(summary) = store.owner(owner_id).map(OwnerSummary::from) else {
        return;
    };
    for apartment in store.apartments_mut().iter_mut() {
        for entry in apartment.owners.iter_mut().filter(|o| o.id == owner_id) {
            *entry = summary.clone();
        }
    }
}

// ============================================================================
// CANDIDATES
// ============================================================================

/// Owners not yet linked to the apartment, matching name, document or email
pub fn available_owners<'a>(apartment: &Apartment, owners: &'a [Owner], term: &str) -> Vec<&'a Owner> {
    let term = normalize_term(term);
    owners
        .iter()
        .filter(|o| !apartment.has_owner(&o.id))
        .filter(|o| {
            contains_term(&o.name, &term)
                || contains_term(&o.document_number, &term)
                || o.email.as_deref().is_some_and(|e| contains_term(e, &term))
        })
        .collect()
}

/// Apartments not in `linked_ids`, matching number or building name,
/// optionally limited to one building
pub fn available_apartments<'a>(
    linked_ids: &[String],
    apartments: &'a [Apartment],
    term: &str,
    building_scope: Option<&str>,
) -> Vec<&'a Apartment> {
    let term = normalize_term(term);
    apartments
        .iter()
        .filter(|a| !linked_ids.contains(&a.id))
        .filter(|a| building_scope.map_or(true, |b| a.building_id == b))
        .filter(|a| contains_term(&a.number, &term) || contains_term(&a.building_name, &term))
        .collect()
}

// ============================================================================
// APARTMENT OWNER EDITOR (owner manager dialog)
// ============================================================================

/// Owner manager for one apartment: search, link, confirm-to-unlink
#[derive(Debug, Clone)]
pub struct ApartmentOwnerEditor {
    apartment_id: String,
    search_term: String,
    pending: Option<PendingUnlink>,
}

impl ApartmentOwnerEditor {
    pub fn open(apartment_id: &str) -> Self {
        ApartmentOwnerEditor {
            apartment_id: apartment_id.to_string(),
            search_term: String::new(),
            pending: None,
        }
    }

    pub fn apartment_id(&self) -> &str {
        &self.apartment_id
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    pub fn pending_unlink(&self) -> Option<&PendingUnlink> {
        self.pending.as_ref()
    }

    pub fn linked_owners<'a>(&self, store: &'a Condominium) -> Vec<&'a Owner> {
        store.owners_of(&self.apartment_id).unwrap_or_default()
    }

    /// Candidates are shown only once something has been typed
    pub fn candidates<'a>(&self, store: &'a Condominium) -> Vec<&'a Owner> {
        if self.search_term.trim().is_empty() {
            return Vec::new();
        }
        match store.apartment(&self.apartment_id) {
            Some(apartment) => available_owners(apartment, store.owners(), &self.search_term),
            None => Vec::new(),
        }
    }

    /// Link and clear the search box. None when the owner was already linked.
    pub fn link(&mut self, store: &mut Condominium, owner_id: &str) -> Result<Option<Notice>> {
        let outcome = link(store, &self.apartment_id, owner_id)?;
        self.search_term.clear();

        if outcome == LinkOutcome::AlreadyLinked {
            return Ok(None);
        }
        Ok(Some(self.notice(store, owner_id, Notice::owner_linked)))
    }

    pub fn request_unlink(&mut self, store: &Condominium, owner_id: &str) -> Result<()> {
        self.pending = Some(request_unlink(store, &self.apartment_id, owner_id)?);
        Ok(())
    }

    /// Apply the pending unlink, if any
    pub fn confirm_unlink(&mut self, store: &mut Condominium) -> Result<Option<Notice>> {
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        let owner_id = pending.owner_id().to_string();

        match pending.confirm(store)? {
            UnlinkOutcome::Unlinked => {
                Ok(Some(self.notice(store, &owner_id, Notice::owner_unlinked)))
            }
            UnlinkOutcome::AlreadyUnlinked => Ok(None),
        }
    }

    pub fn cancel_unlink(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    fn notice(&self, store: &Condominium, owner_id: &str, build: fn(&str, &str) -> Notice) -> Notice {
        let owner_name = store.owner(owner_id).map(|o| o.name.as_str()).unwrap_or("");
        let number = store
            .apartment(&self.apartment_id)
            .map(|a| a.number.as_str())
            .unwrap_or("");
        build(owner_name, number)
    }
}

// ============================================================================
// AUDIT / RECONCILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkIssue {
    /// ownerIds and owners disagree (or hold duplicates)
    OwnerListMismatch { apartment_id: String },
    /// Apartment lists the owner, owner does not list the apartment
    MissingOnOwner { apartment_id: String, owner_id: String },
    /// Owner lists the apartment, apartment does not list the owner
    MissingOnApartment { apartment_id: String, owner_id: String },
    DanglingOwner { apartment_id: String, owner_id: String },
    DanglingApartment { owner_id: String, apartment_id: String },
    UnknownBuilding { apartment_id: String, building_id: String },
    UnknownAliquotType { apartment_id: String, aliquot_type_id: String },
}

impl fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkIssue::OwnerListMismatch { apartment_id } => {
                write!(f, "apartment {}: ownerIds and owners differ", apartment_id)
            }
            LinkIssue::MissingOnOwner { apartment_id, owner_id } => write!(
                f,
                "apartment {} lists owner {}, owner does not list it",
                apartment_id, owner_id
            ),
            LinkIssue::MissingOnApartment { apartment_id, owner_id } => write!(
                f,
                "owner {} lists apartment {}, apartment does not list it",
                owner_id, apartment_id
            ),
            LinkIssue::DanglingOwner { apartment_id, owner_id } => write!(
                f,
                "apartment {} references missing owner {}",
                apartment_id, owner_id
            ),
            LinkIssue::DanglingApartment { owner_id, apartment_id } => write!(
                f,
                "owner {} references missing apartment {}",
                owner_id, apartment_id
            ),
            LinkIssue::UnknownBuilding { apartment_id, building_id } => write!(
                f,
                "apartment {} references missing building {}",
                apartment_id, building_id
            ),
            LinkIssue::UnknownAliquotType { apartment_id, aliquot_type_id } => write!(
                f,
                "apartment {} references missing aliquot type {}",
                apartment_id, aliquot_type_id
            ),
        }
    }
}

/// Every inconsistency in the graph, apartments first, in store order
pub fn audit(store: &Condominium) -> Vec<LinkIssue> {
    let mut issues = Vec::new();

    for apartment in store.apartments() {
        if !apartment.is_consistent() {
            issues.push(LinkIssue::OwnerListMismatch {
                apartment_id: apartment.id.clone(),
            });
        }

        if store.buildings().find_by_id(&apartment.building_id).is_none() {
            issues.push(LinkIssue::UnknownBuilding {
                apartment_id: apartment.id.clone(),
                building_id: apartment.building_id.clone(),
            });
        }

        if let Some(aliquot_type_id) = &apartment.aliquot_type_id {
            if store.aliquot_types().find_by_id(aliquot_type_id).is_none() {
                issues.push(LinkIssue::UnknownAliquotType {
                    apartment_id: apartment.id.clone(),
                    aliquot_type_id: aliquot_type_id.clone(),
                });
            }
        }

        for owner_id in &apartment.owner_ids {
            match store.owner(owner_id) {
                None => issues.push(LinkIssue::DanglingOwner {
                    apartment_id: apartment.id.clone(),
                    owner_id: owner_id.clone(),
                }),
                Some(owner) if !owner.owns(&apartment.id) => {
                    issues.push(LinkIssue::MissingOnOwner {
                        apartment_id: apartment.id.clone(),
                        owner_id: owner_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    for owner in store.owners() {
        for apartment_id in &owner.apartment_ids {
            match store.apartment(apartment_id) {
                None => issues.push(LinkIssue::DanglingApartment {
                    owner_id: owner.id.clone(),
                    apartment_id: apartment_id.clone(),
                }),
                Some(apartment) if !apartment.has_owner(&owner.id) => {
                    issues.push(LinkIssue::MissingOnApartment {
                        apartment_id: apartment_id.clone(),
                        owner_id: owner.id.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    for issue in &issues {
        tracing::warn!(%issue, "link audit");
    }
    issues
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub repaired: usize,
    /// Issues that cannot be fixed by relinking (missing buildings/aliquots)
    pub remaining: Vec<LinkIssue>,
}

/// Repair one-sided and dangling links (union of both sides) and rebuild the
/// denormalized display fields. Records that were already consistent are left
/// untouched.
pub fn reconcile(store: &mut Condominium) -> ReconcileReport {
    let before = audit(store);

    let owner_ids: HashSet<String> = store.owners().iter().map(|o| o.id.clone()).collect();
    let apartment_ids: HashSet<String> =
        store.apartments().iter().map(|a| a.id.clone()).collect();

    // Union of both sides, dropping references to records that do not exist
    let mut pairs: Vec<(String, String)> = Vec::new();
    for apartment in store.apartments() {
        for owner_id in apartment.owner_ids.iter().filter(|id| owner_ids.contains(*id)) {
            pairs.push((apartment.id.clone(), owner_id.clone()));
        }
    }
    for owner in store.owners() {
        for apartment_id in owner
            .apartment_ids
            .iter()
            .filter(|id| apartment_ids.contains(*id))
        {
            pairs.push((apartment_id.clone(), owner.id.clone()));
        }
    }

    let summaries: Vec<OwnerSummary> = store.owners().iter().map(OwnerSummary::from).collect();
    let buildings = store.buildings().clone();
    let aliquot_types = store.aliquot_types().clone();

    for apartment in store.apartments_mut().iter_mut() {
        let mut wanted: Vec<String> = Vec::new();
        for (apartment_id, owner_id) in &pairs {
            if apartment_id == &apartment.id && !wanted.contains(owner_id) {
                wanted.push(owner_id.clone());
            }
        }
        let owners: Vec<OwnerSummary> = wanted
            .iter()
            .filter_map(|id| summaries.iter().find(|s| &s.id == id).cloned())
            .collect();

        let building_name = buildings
            .find_by_id(&apartment.building_id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| apartment.building_name.clone());
        let aliquot_type = match apartment.aliquot_type_id.as_deref() {
            Some(id) => aliquot_types.find_by_id(id).cloned(),
            None => None,
        };

        if apartment.owner_ids != wanted
            || apartment.owners != owners
            || apartment.building_name != building_name
            || apartment.aliquot_type != aliquot_type
        {
            apartment.owner_ids = wanted;
            apartment.owners = owners;
            apartment.building_name = building_name;
            apartment.aliquot_type = aliquot_type;
            apartment.touch();
        }
    }

    for owner in store.owners_mut().iter_mut() {
        let mut wanted: Vec<String> = Vec::new();
        for (apartment_id, owner_id) in &pairs {
            if owner_id == &owner.id && !wanted.contains(apartment_id) {
                wanted.push(apartment_id.clone());
            }
        }
        if owner.apartment_ids != wanted {
            owner.apartment_ids = wanted;
            owner.updated_at = chrono::Utc::now();
        }
    }

    let remaining = audit(store);
    ReconcileReport {
        repaired: before.len().saturating_sub(remaining.len()),
        remaining,
    }
}

// ============================================================================
// TESTS
// ============================================================================
