// 🔍 Listing Filters - search / building / status composition
//
// All filters are pure functions of (records, filter state). Active filters
// combine with AND; `Selection::All` ("all" in the UI) disables a filter.

use crate::entities::{Apartment, ApartmentStatus, DocumentType, Owner};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TERM MATCHING
// ============================================================================

/// Lowercased, trimmed search term; empty means "match everything"
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Case-insensitive substring test against an already normalized term
pub fn contains_term(text: &str, term: &str) -> bool {
    term.is_empty() || text.to_lowercase().contains(term)
}

// ============================================================================
// SELECTION
// ============================================================================

/// A dropdown value: everything, or one specific value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: PartialEq> Selection<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(wanted) => wanted == value,
        }
    }
}

impl<T> Selection<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Selection::All => None,
            Selection::Only(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Selection<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Selection::Only(value),
            None => Selection::All,
        }
    }
}

impl<T: FromStr> FromStr for Selection<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Selection::All),
            value => value.parse().map(Selection::Only),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Only(value) => value.fmt(f),
        }
    }
}

// ============================================================================
// APARTMENTS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApartmentFilter {
    pub search_term: String,
    pub building: Selection<String>,
    pub status: Selection<ApartmentStatus>,
}

impl ApartmentFilter {
    /// Search hits the number, the building name or any linked owner's name
    pub fn matches(&self, apartment: &Apartment) -> bool {
        let term = normalize_term(&self.search_term);
        let matches_search = contains_term(&apartment.number, &term)
            || contains_term(&apartment.building_name, &term)
            || apartment.owners.iter().any(|o| contains_term(&o.name, &term));

        matches_search
            && self.building.accepts(&apartment.building_id)
            && self.status.accepts(&apartment.status)
    }

    pub fn is_active(&self) -> bool {
        !self.search_term.trim().is_empty() || !self.building.is_all() || !self.status.is_all()
    }
}

pub fn filter_apartments<'a>(apartments: &'a [Apartment], filter: &ApartmentFilter) -> Vec<&'a Apartment> {
    apartments.iter().filter(|a| filter.matches(a)).collect()
}

/// Group by building name, sections in first-seen order
pub fn group_by_building<'a, I>(apartments: I) -> IndexMap<String, Vec<&'a Apartment>>
where
    I: IntoIterator<Item = &'a Apartment>,
{
    let mut groups: IndexMap<String, Vec<&'a Apartment>> = IndexMap::new();
    for apartment in apartments {
        groups
            .entry(apartment.building_name.clone())
            .or_default()
            .push(apartment);
    }
    groups
}

// ============================================================================
// OWNERS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnerFilter {
    pub search_term: String,
    pub building: Selection<String>,
    pub document_type: Selection<DocumentType>,
}

impl OwnerFilter {
    /// `owned` are the owner's apartments, used for number search and
    /// building scoping
    pub fn matches(&self, owner: &Owner, owned: &[&Apartment]) -> bool {
        let term = normalize_term(&self.search_term);
        let matches_search = contains_term(&owner.name, &term)
            || contains_term(&owner.document_number, &term)
            || owned.iter().any(|a| contains_term(&a.number, &term));

        let matches_building = match &self.building {
            Selection::All => true,
            Selection::Only(building_id) => owned.iter().any(|a| &a.building_id == building_id),
        };

        matches_search && matches_building && self.document_type.accepts(&owner.document_type)
    }
}

pub fn filter_owners<'a>(
    owners: &'a [Owner],
    apartments: &[Apartment],
    filter: &OwnerFilter,
) -> Vec<&'a Owner> {
    owners
        .iter()
        .filter(|owner| {
            let owned: Vec<&Apartment> = apartments
                .iter()
                .filter(|a| owner.owns(&a.id))
                .collect();
            filter.matches(owner, &owned)
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ReferenceData;
    use crate::store::Condominium;
    use proptest::prelude::*;

    fn numbers(apartments: &[&Apartment]) -> Vec<String> {
        apartments.iter().map(|a| a.number.clone()).collect()
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!("all".parse::<Selection<ApartmentStatus>>(), Ok(Selection::All));
        assert_eq!("".parse::<Selection<String>>(), Ok(Selection::All));
        assert_eq!(
            "vacant".parse::<Selection<ApartmentStatus>>(),
            Ok(Selection::Only(ApartmentStatus::Vacant))
        );
        assert!("sold".parse::<Selection<ApartmentStatus>>().is_err());
        assert_eq!(Selection::Only(ApartmentStatus::Vacant).to_string(), "vacant");
        assert_eq!(Selection::<String>::All.to_string(), "all");
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let store = Condominium::with_defaults();
        let filter = ApartmentFilter::default();

        assert!(!filter.is_active());
        assert_eq!(filter_apartments(store.apartments(), &filter).len(), 5);
    }

    #[test]
    fn test_search_by_owner_name_and_building() {
        let store = Condominium::with_defaults();

        let by_owner = ApartmentFilter {
            search_term: "CARLOS".to_string(),
            ..ApartmentFilter::default()
        };
        assert_eq!(
            numbers(&filter_apartments(store.apartments(), &by_owner)),
            vec!["101", "302"]
        );

        let by_building = ApartmentFilter {
            search_term: "sur".to_string(),
            ..ApartmentFilter::default()
        };
        assert_eq!(
            numbers(&filter_apartments(store.apartments(), &by_building)),
            vec!["301", "302"]
        );
    }

    #[test]
    fn test_filters_combine_with_and() {
        let store = Condominium::with_defaults();
        let filter = ApartmentFilter {
            search_term: String::new(),
            building: Selection::Only("1".to_string()),
            status: Selection::Only(ApartmentStatus::Occupied),
        };

        assert_eq!(
            numbers(&filter_apartments(store.apartments(), &filter)),
            vec!["101", "102"]
        );
    }

    #[test]
    fn test_grouping_preserves_first_seen_order() {
        let store = Condominium::with_defaults();
        let groups = group_by_building(filter_apartments(store.apartments(), &ApartmentFilter::default()));

        let names: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Torre Norte", "Torre Sur"]);
        assert_eq!(groups["Torre Norte"].len(), 3);
        assert_eq!(groups["Torre Sur"].len(), 2);
    }

    #[test]
    fn test_owner_filters() {
        let store = Condominium::with_defaults();
        let names = |filter: &OwnerFilter| -> Vec<String> {
            filter_owners(store.owners(), store.apartments(), filter)
                .iter()
                .map(|o| o.name.clone())
                .collect()
        };

        let by_apartment = OwnerFilter {
            search_term: "302".to_string(),
            ..OwnerFilter::default()
        };
        assert_eq!(names(&by_apartment), vec!["Carlos Mendoza"]);

        let in_sur = OwnerFilter {
            building: Selection::Only("2".to_string()),
            ..OwnerFilter::default()
        };
        assert_eq!(names(&in_sur), vec!["Carlos Mendoza"]);

        let rif = OwnerFilter {
            document_type: Selection::Only(DocumentType::Rif),
            ..OwnerFilter::default()
        };
        assert_eq!(names(&rif), vec!["Ana García"]);

        let by_document = OwnerFilter {
            search_term: "v-876".to_string(),
            ..OwnerFilter::default()
        };
        assert_eq!(names(&by_document), vec!["María López"]);
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    const BUILDINGS: [(&str, &str); 3] = [("1", "Torre Norte"), ("2", "Torre Sur"), ("3", "Anexo")];
    const OWNER_NAMES: [&str; 4] = ["Carlos", "María", "Ana", "Luis"];

    fn arb_apartment() -> impl Strategy<Value = Apartment> {
        (
            "[0-9]{3}",
            0usize..BUILDINGS.len(),
            0usize..3,
            proptest::option::of(0usize..OWNER_NAMES.len()),
        )
            .prop_map(|(number, building, status, owner)| {
                let (building_id, building_name) = BUILDINGS[building];
                let mut apartment = Apartment::new(
                    number,
                    "1".to_string(),
                    building_id.to_string(),
                    building_name.to_string(),
                    0.0,
                )
                .with_status(ApartmentStatus::all()[status]);
                if let Some(owner) = owner {
                    let owner = Owner::new(
                        OWNER_NAMES[owner].to_string(),
                        DocumentType::Cedula,
                        "V-12345678".to_string(),
                    );
                    apartment.link_owner(&owner);
                }
                apartment
            })
    }

    fn arb_filter() -> impl Strategy<Value = ApartmentFilter> {
        (
            prop_oneof![
                Just(String::new()),
                "[0-9]{1,2}",
                Just("torre".to_string()),
                Just("ana".to_string()),
            ],
            proptest::option::of(0usize..BUILDINGS.len()),
            proptest::option::of(0usize..3),
        )
            .prop_map(|(search_term, building, status)| ApartmentFilter {
                search_term,
                building: building.map(|b| BUILDINGS[b].0.to_string()).into(),
                status: status.map(|s| ApartmentStatus::all()[s]).into(),
            })
    }

    /// Each predicate written out on its own
    fn satisfies_all(apartment: &Apartment, filter: &ApartmentFilter) -> bool {
        let term = filter.search_term.to_lowercase();
        let search = term.is_empty()
            || apartment.number.to_lowercase().contains(&term)
            || apartment.building_name.to_lowercase().contains(&term)
            || apartment.owners.iter().any(|o| o.name.to_lowercase().contains(&term));
        let building = match &filter.building {
            Selection::All => true,
            Selection::Only(id) => &apartment.building_id == id,
        };
        let status = match &filter.status {
            Selection::All => true,
            Selection::Only(status) => &apartment.status == status,
        };
        search && building && status
    }

    proptest! {
        #[test]
        fn prop_filter_sound_and_complete(
            apartments in proptest::collection::vec(arb_apartment(), 0..20),
            filter in arb_filter(),
        ) {
            let result = filter_apartments(&apartments, &filter);

            for apartment in &apartments {
                let included = result.iter().any(|a| a.id == apartment.id);
                prop_assert_eq!(included, satisfies_all(apartment, &filter));
            }
        }

        #[test]
        fn prop_grouping_is_partition(
            apartments in proptest::collection::vec(arb_apartment(), 0..20),
            filter in arb_filter(),
        ) {
            let filtered = filter_apartments(&apartments, &filter);
            let groups = group_by_building(filtered.iter().copied());

            let total: usize = groups.values().map(Vec::len).sum();
            prop_assert_eq!(total, filtered.len());
            for apartment in &filtered {
                let hits = groups
                    .values()
                    .flatten()
                    .filter(|a| a.id == apartment.id)
                    .count();
                prop_assert_eq!(hits, 1);
                prop_assert!(groups[&apartment.building_name].iter().any(|a| a.id == apartment.id));
            }
        }

        #[test]
        fn prop_filter_is_deterministic(
            apartments in proptest::collection::vec(arb_apartment(), 0..20),
            filter in arb_filter(),
        ) {
            let first = group_by_building(filter_apartments(&apartments, &filter));
            let second = group_by_building(filter_apartments(&apartments, &filter));
            prop_assert_eq!(first, second);
        }
    }
}
