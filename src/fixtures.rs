// 🧪 Demo data set - two towers, five apartments, three owners
//
// Links are written on both sides so the snapshot loads without repairs.

use crate::entities::{
    AliquotRegistry, Apartment, ApartmentStatus, Building, DocumentType, Owner, OwnerSummary,
};
use crate::store::Snapshot;
use chrono::{DateTime, TimeZone, Utc};

fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn owner(
    id: &str,
    name: &str,
    document_type: DocumentType,
    document_number: &str,
    email: &str,
    phone: &str,
    apartment_ids: &[&str],
) -> Owner {
    let mut owner = Owner::new(name.to_string(), document_type, document_number.to_string())
        .with_contact(Some(email.to_string()), Some(phone.to_string()));
    owner.id = id.to_string();
    owner.apartment_ids = apartment_ids.iter().map(|s| s.to_string()).collect();
    owner.created_at = seeded_at();
    owner.updated_at = seeded_at();
    owner
}

#[allow(clippy::too_many_arguments)]
fn apartment(
    id: &str,
    number: &str,
    floor: &str,
    building: &Building,
    square_meters: f64,
    aliquot_type_id: &str,
    owners: &[&Owner],
    status: ApartmentStatus,
    monthly_fee: f64,
) -> Apartment {
    let aliquot_types = AliquotRegistry::with_defaults();
    let mut apartment = Apartment::new(
        number.to_string(),
        floor.to_string(),
        building.id.clone(),
        building.name.clone(),
        monthly_fee,
    )
    .with_area(square_meters)
    .with_status(status);

    if let Some(aliquot_type) = aliquot_types.find_by_id(aliquot_type_id) {
        apartment = apartment.with_aliquot(aliquot_type);
    }
    apartment.id = id.to_string();
    apartment.owner_ids = owners.iter().map(|o| o.id.clone()).collect();
    apartment.owners = owners.iter().map(|o| OwnerSummary::from(*o)).collect();
    apartment.created_at = seeded_at();
    apartment.updated_at = seeded_at();
    apartment
}

pub fn demo_snapshot() -> Snapshot {
    let norte = Building::new("1", "Torre Norte");
    let sur = Building::new("2", "Torre Sur");

    let carlos = owner(
        "1",
        "Carlos Mendoza",
        DocumentType::Cedula,
        "V-12345678",
        "carlos@email.com",
        "+58-412-1234567",
        &["1", "5"],
    );
    let maria = owner(
        "2",
        "María López",
        DocumentType::Cedula,
        "V-87654321",
        "maria@email.com",
        "+58-414-7654321",
        &["2"],
    );
    let ana = owner(
        "3",
        "Ana García",
        DocumentType::Rif,
        "J-40123456-7",
        "ana@email.com",
        "+58-426-9876543",
        &["3"],
    );

    let apartments = vec![
        apartment("1", "101", "1", &norte, 85.0, "1", &[&carlos], ApartmentStatus::Occupied, 25000.0),
        apartment("2", "102", "1", &norte, 92.0, "2", &[&maria], ApartmentStatus::Occupied, 27000.0),
        apartment("3", "201", "2", &norte, 88.0, "1", &[&ana], ApartmentStatus::Vacant, 26000.0),
        apartment("4", "301", "3", &sur, 75.0, "3", &[], ApartmentStatus::Maintenance, 22000.0),
        apartment("5", "302", "3", &sur, 95.0, "2", &[&carlos], ApartmentStatus::Occupied, 28000.0),
    ];

    Snapshot {
        buildings: vec![norte, sur],
        aliquot_types: AliquotRegistry::with_defaults().all().to_vec(),
        apartments,
        owners: vec![carlos, maria, ana],
    }
}
