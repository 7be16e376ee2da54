// CODOMI - Admin REST API
// Listing, stats, editors and apartment ↔ owner links over axum

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use codomi::config::DEFAULT_CONFIG_FILE;
use codomi::{
    audit, available_apartments, available_owners, filter_owners, link, request_unlink,
    Apartment, ApartmentDraft, ApartmentFilter, ApartmentForm, ApartmentStats, ApartmentStatus,
    AppConfig, CodomiError, Condominium, DocumentType, FieldErrors, LinkIssue, LinkOutcome,
    Notice, Owner, OwnerDraft, OwnerFilter, OwnerForm, OwnerStats, QuickEdit, QuickField,
    ReferenceData, Selection, UnlinkOutcome,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<Condominium>>,
    require_aliquot_type: bool,
}

impl AppState {
    fn store(&self) -> Result<MutexGuard<'_, Condominium>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::internal("store lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            notice: None,
            error: None,
            fields: None,
        }
    }

    fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

struct ApiError {
    status: StatusCode,
    message: String,
    fields: Option<FieldErrors>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn invalid(errors: FieldErrors) -> Self {
        let notice = Notice::validation_failed(errors.len());
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: notice.description,
            fields: Some(errors),
        }
    }
}

impl From<CodomiError> for ApiError {
    fn from(err: CodomiError) -> Self {
        let status = match &err {
            CodomiError::ApartmentNotFound(_)
            | CodomiError::OwnerNotFound(_)
            | CodomiError::BuildingNotFound(_)
            | CodomiError::AliquotTypeNotFound(_) => StatusCode::NOT_FOUND,
            CodomiError::Validation(errors) => return ApiError::invalid(errors.clone()),
            CodomiError::InvalidTransition { .. }
            | CodomiError::ReadOnlyField(_)
            | CodomiError::UnknownField(_) => StatusCode::BAD_REQUEST,
            CodomiError::Snapshot(_) | CodomiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "request rejected");
        }

        let body = ApiResponse {
            success: false,
            data: (),
            notice: None,
            error: Some(self.message),
            fields: self.fields,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

fn parse_selection<T>(field: &str, raw: Option<&str>) -> Result<Selection<T>, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.unwrap_or_default()
        .parse()
        .map_err(|e| ApiError::bad_request(format!("invalid {}: {}", field, e)))
}

/// Form inputs arrive as JSON; the editors take raw text
fn raw_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Request / response shapes
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApartmentQuery {
    search: Option<String>,
    building: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerQuery {
    search: Option<String>,
    building: Option<String>,
    document_type: Option<String>,
}

#[derive(Deserialize)]
struct CandidateQuery {
    #[serde(default)]
    q: String,
    building: Option<String>,
}

#[derive(Deserialize)]
struct UnlinkQuery {
    #[serde(default)]
    confirm: bool,
}

#[derive(Deserialize)]
struct QuickEditRequest {
    field: QuickField,
    value: String,
}

#[derive(Serialize)]
struct BuildingSection<'a> {
    building: String,
    apartments: Vec<&'a Apartment>,
}

#[derive(Serialize)]
struct OwnerProfile<'a> {
    owner: &'a Owner,
    apartments: Vec<&'a Apartment>,
}

#[derive(Serialize)]
struct StatsResponse {
    apartments: ApartmentStats,
    owners: OwnerStats,
}

#[derive(Serialize)]
struct AuditResponse {
    consistent: bool,
    issues: Vec<LinkIssue>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkResponse<T> {
    outcome: T,
    apartment: Apartment,
    owner: Owner,
}

#[derive(Serialize)]
struct UnlinkPrompt {
    prompt: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/stats - Apartment and owner totals
async fn get_stats(State(state): State<AppState>) -> ApiResult {
    let store = state.store()?;
    let stats = StatsResponse {
        apartments: store.apartment_stats(),
        owners: store.owner_stats(),
    };
    Ok((StatusCode::OK, Json(ApiResponse::ok(stats))).into_response())
}

/// GET /api/audit - Link consistency report
async fn get_audit(State(state): State<AppState>) -> ApiResult {
    let store = state.store()?;
    let issues = audit(&store);
    let response = AuditResponse {
        consistent: issues.is_empty(),
        issues,
    };
    Ok((StatusCode::OK, Json(ApiResponse::ok(response))).into_response())
}

// ----------------------------------------------------------------------------
// Apartments
// ----------------------------------------------------------------------------

/// GET /api/apartments?search=&building=&status= - Sections grouped by building
async fn list_apartments(
    State(state): State<AppState>,
    Query(query): Query<ApartmentQuery>,
) -> ApiResult {
    let filter = ApartmentFilter {
        search_term: query.search.unwrap_or_default(),
        building: parse_selection("building", query.building.as_deref())?,
        status: parse_selection::<ApartmentStatus>("status", query.status.as_deref())?,
    };

    let store = state.store()?;
    let sections: Vec<BuildingSection> = codomi::group_by_building(codomi::filter_apartments(
        store.apartments(),
        &filter,
    ))
    .into_iter()
    .map(|(building, apartments)| BuildingSection {
        building,
        apartments,
    })
    .collect();

    Ok((StatusCode::OK, Json(ApiResponse::ok(sections))).into_response())
}

/// GET /api/apartments/:id
async fn get_apartment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let store = state.store()?;
    let apartment = store
        .apartment(&id)
        .ok_or(CodomiError::ApartmentNotFound(id))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(apartment))).into_response())
}

/// Run an apartment form to completion: fill, validate, confirm
fn save_apartment_form(
    store: &mut Condominium,
    mut form: ApartmentForm,
    body: &Map<String, Value>,
) -> Result<(Apartment, Notice), ApiError> {
    for field in ApartmentDraft::FIELDS {
        let Some(value) = body.get(field) else {
            continue;
        };
        let value = raw_text(value);
        // Resending the current building on an edit is not a change
        if field == "buildingId" && form.original().is_some_and(|a| a.building_id == value) {
            continue;
        }
        form.set_field(field, &value)?;
    }

    if !form.submit(&*store)? {
        return Err(ApiError::invalid(form.errors().clone()));
    }
    Ok(form.confirm(store)?)
}

/// POST /api/apartments - Create through the apartment form
async fn create_apartment(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult {
    let mut store = state.store()?;
    let form = ApartmentForm::create().with_aliquot_required(state.require_aliquot_type);
    let (saved, notice) = save_apartment_form(&mut store, form, &body)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(saved).with_notice(notice)),
    )
        .into_response())
}

/// PUT /api/apartments/:id - Edit through the apartment form
async fn update_apartment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult {
    let mut store = state.store()?;
    let existing = store
        .apartment(&id)
        .ok_or_else(|| CodomiError::ApartmentNotFound(id.clone()))?;
    let form = ApartmentForm::edit(existing).with_aliquot_required(state.require_aliquot_type);
    let (saved, notice) = save_apartment_form(&mut store, form, &body)?;

    Ok((StatusCode::OK, Json(ApiResponse::ok(saved).with_notice(notice))).into_response())
}

/// PATCH /api/apartments/:id - Inline card edit (number, squareMeters, aliquotType)
async fn quick_edit_apartment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<QuickEditRequest>,
) -> ApiResult {
    let mut store = state.store()?;
    let apartment = store
        .apartment(&id)
        .ok_or_else(|| CodomiError::ApartmentNotFound(id.clone()))?;

    let mut edit = QuickEdit::begin(apartment, request.field);
    edit.set_value(&request.value);

    match edit.apply(&mut *store)? {
        Some(updated) => Ok((StatusCode::OK, Json(ApiResponse::ok(updated))).into_response()),
        // Unusable values are dropped, the card keeps its current value
        None => {
            let current = store
                .apartment(&id)
                .ok_or(CodomiError::ApartmentNotFound(id))?;
            Ok((StatusCode::OK, Json(ApiResponse::ok(current))).into_response())
        }
    }
}

/// DELETE /api/apartments/:id
async fn delete_apartment(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let mut store = state.store()?;
    let removed = store.remove_apartment(&id)?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(removed))).into_response())
}

/// GET /api/apartments/:id/candidates?q= - Owners that can still be linked
async fn apartment_candidates(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CandidateQuery>,
) -> ApiResult {
    let store = state.store()?;
    let apartment = store
        .apartment(&id)
        .ok_or(CodomiError::ApartmentNotFound(id))?;

    let candidates = if query.q.trim().is_empty() {
        Vec::new()
    } else {
        available_owners(apartment, store.owners(), &query.q)
    };
    Ok((StatusCode::OK, Json(ApiResponse::ok(candidates))).into_response())
}

fn link_response<T: Serialize>(
    store: &Condominium,
    apartment_id: &str,
    owner_id: &str,
    outcome: T,
) -> Result<LinkResponse<T>, ApiError> {
    let apartment = store
        .apartment(apartment_id)
        .cloned()
        .ok_or_else(|| CodomiError::ApartmentNotFound(apartment_id.to_string()))?;
    let owner = store
        .owner(owner_id)
        .cloned()
        .ok_or_else(|| CodomiError::OwnerNotFound(owner_id.to_string()))?;
    Ok(LinkResponse {
        outcome,
        apartment,
        owner,
    })
}

/// POST /api/apartments/:id/owners/:owner_id - Link an owner
async fn link_owner(
    State(state): State<AppState>,
    Path((apartment_id, owner_id)): Path<(String, String)>,
) -> ApiResult {
    let mut store = state.store()?;
    let outcome = link(&mut store, &apartment_id, &owner_id)?;
    let response = link_response(&store, &apartment_id, &owner_id, outcome)?;

    let notice = Notice::owner_linked(&response.owner.name, &response.apartment.number);
    let status = match outcome {
        LinkOutcome::Linked => StatusCode::CREATED,
        LinkOutcome::AlreadyLinked => StatusCode::OK,
    };
    Ok((status, Json(ApiResponse::ok(response).with_notice(notice))).into_response())
}

/// DELETE /api/apartments/:id/owners/:owner_id?confirm=true - Unlink an owner
async fn unlink_owner(
    State(state): State<AppState>,
    Path((apartment_id, owner_id)): Path<(String, String)>,
    Query(query): Query<UnlinkQuery>,
) -> ApiResult {
    let mut store = state.store()?;
    let pending = request_unlink(&store, &apartment_id, &owner_id)?;

    if !query.confirm {
        pending.cancel();
        let apartment = store
            .apartment(&apartment_id)
            .map(|a| a.number.clone())
            .unwrap_or_default();
        let name = store
            .owner(&owner_id)
            .map(|o| o.name.clone())
            .unwrap_or_default();
        let prompt = UnlinkPrompt {
            prompt: format!(
                "¿Está seguro de que desea desvincular a {} del apartamento {}? Repita con ?confirm=true",
                name, apartment
            ),
        };
        let mut body = ApiResponse::ok(prompt);
        body.success = false;
        return Ok((StatusCode::CONFLICT, Json(body)).into_response());
    }

    let outcome = pending.confirm(&mut store)?;
    let response = link_response(&store, &apartment_id, &owner_id, outcome)?;
    let mut body = ApiResponse::ok(response);
    if outcome == UnlinkOutcome::Unlinked {
        let notice = Notice::owner_unlinked(&body.data.owner.name, &body.data.apartment.number);
        body = body.with_notice(notice);
    }
    Ok((StatusCode::OK, Json(body)).into_response())
}

// ----------------------------------------------------------------------------
// Owners
// ----------------------------------------------------------------------------

/// GET /api/owners?search=&building=&documentType=
async fn list_owners(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult {
    let filter = OwnerFilter {
        search_term: query.search.unwrap_or_default(),
        building: parse_selection("building", query.building.as_deref())?,
        document_type: parse_selection::<DocumentType>(
            "documentType",
            query.document_type.as_deref(),
        )?,
    };

    let store = state.store()?;
    let owners = filter_owners(store.owners(), store.apartments(), &filter);
    Ok((StatusCode::OK, Json(ApiResponse::ok(owners))).into_response())
}

/// GET /api/owners/:id - Owner profile with their apartments
async fn get_owner(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let store = state.store()?;
    let owner = store
        .owner(&id)
        .ok_or_else(|| CodomiError::OwnerNotFound(id.clone()))?;
    let profile = OwnerProfile {
        owner,
        apartments: store.apartments_of(&id)?,
    };
    Ok((StatusCode::OK, Json(ApiResponse::ok(profile))).into_response())
}

/// GET /api/owners/:id/candidates?q=&building= - Apartments that can still be linked
async fn owner_candidates(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CandidateQuery>,
) -> ApiResult {
    let store = state.store()?;
    let owner = store
        .owner(&id)
        .ok_or(CodomiError::OwnerNotFound(id))?;

    let candidates = if query.q.trim().is_empty() {
        Vec::new()
    } else {
        available_apartments(
            &owner.apartment_ids,
            store.apartments(),
            &query.q,
            query.building.as_deref(),
        )
    };
    Ok((StatusCode::OK, Json(ApiResponse::ok(candidates))).into_response())
}

/// Run an owner form to completion. `apartmentIds`, when present, replaces
/// the linked list.
fn save_owner_form(
    store: &mut Condominium,
    mut form: OwnerForm,
    body: &Map<String, Value>,
) -> Result<(Owner, Notice), ApiError> {
    for field in OwnerDraft::FIELDS {
        if let Some(value) = body.get(field) {
            form.set_field(field, &raw_text(value))?;
        }
    }

    if let Some(ids) = body.get("apartmentIds") {
        let wanted: Vec<String> = serde_json::from_value(ids.clone())
            .map_err(|e| ApiError::bad_request(format!("invalid apartmentIds: {}", e)))?;

        let current = form.linked_apartment_ids().to_vec();
        for id in current.iter().filter(|id| !wanted.contains(id)) {
            form.request_unlink(id);
            form.confirm_unlink();
        }
        for id in &wanted {
            form.link_apartment(id);
        }
    }

    if !form.submit()? {
        return Err(ApiError::invalid(form.errors().clone()));
    }
    Ok(form.confirm(store)?)
}

/// POST /api/owners
async fn create_owner(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult {
    let mut store = state.store()?;
    let (saved, notice) = save_owner_form(&mut store, OwnerForm::create(), &body)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(saved).with_notice(notice)),
    )
        .into_response())
}

/// PUT /api/owners/:id
async fn update_owner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult {
    let mut store = state.store()?;
    let existing = store
        .owner(&id)
        .ok_or_else(|| CodomiError::OwnerNotFound(id.clone()))?;
    let form = OwnerForm::edit(existing);
    let (saved, notice) = save_owner_form(&mut store, form, &body)?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(saved).with_notice(notice))).into_response())
}

/// DELETE /api/owners/:id
async fn delete_owner(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let mut store = state.store()?;
    let removed = store.remove_owner(&id)?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(removed))).into_response())
}

// ============================================================================
// Main Server
// ============================================================================

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/audit", get(get_audit))
        .route("/apartments", get(list_apartments).post(create_apartment))
        .route(
            "/apartments/:id",
            get(get_apartment)
                .put(update_apartment)
                .patch(quick_edit_apartment)
                .delete(delete_apartment),
        )
        .route("/apartments/:id/candidates", get(apartment_candidates))
        .route(
            "/apartments/:id/owners/:owner_id",
            post(link_owner).delete(unlink_owner),
        )
        .route("/owners", get(list_owners).post(create_owner))
        .route(
            "/owners/:id",
            get(get_owner).put(update_owner).delete(delete_owner),
        )
        .route("/owners/:id/candidates", get(owner_candidates))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("🌐 CODOMI - Admin API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::from_env(std::path::Path::new(DEFAULT_CONFIG_FILE))
        .context("Failed to load config")?;
    let store = config.open_store().context("Failed to open data set")?;
    println!(
        "✓ Data loaded: {} apartamentos, {} propietarios",
        store.apartments().len(),
        store.owners().len()
    );

    // Create shared state
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        require_aliquot_type: config.require_aliquot_type,
    };
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/apartments", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
