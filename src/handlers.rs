use crate::config::Config;
use crate::errors::{AppError, COMPANY_NOT_FOUND, PARTNER_NOT_FOUND};
use crate::models::{CompanyFields, CompanyRequest, PartnerRequest};
use crate::presentation::*;
use crate::services::{CompanyService, PartnerService};
use crate::storage::Storage;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend handed to every service call.
    pub storage: Arc<dyn Storage>,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: Config) -> Self {
        Self { storage, config }
    }

    fn companies(&self) -> CompanyService {
        CompanyService::new(self.storage.clone())
    }

    fn partners(&self) -> PartnerService {
        PartnerService::new(self.storage.clone())
    }
}

/// Path ids that are not integers cannot match any record.
fn parse_id(raw: &str, not_found: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(not_found.to_string()))
}

/// Unwraps a JSON body, turning any rejection into the generic 400.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection);
        AppError::invalid_data()
    })
}

/// Health check endpoint.
///
/// Returns the service status, version and the active storage backend.
#[utoipa::path(
    get, path = "/health", tag = "health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "storage": state.storage.backend(),
        })),
    )
}

// ============ Companies ============

/// GET /api/empresas
///
/// Lists every company with its partners embedded.
#[utoipa::path(
    get, path = "/api/empresas", tag = "Empresas",
    responses((status = 200, description = "Company list", body = [CompanyView]))
)]
pub async fn list_companies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CompanyView>>, AppError> {
    tracing::info!("GET /api/empresas");

    let companies = state.companies().list_all().await?;
    Ok(Json(companies.into_iter().map(CompanyView::from).collect()))
}

/// GET /api/empresas/:id
#[utoipa::path(
    get, path = "/api/empresas/{id}", tag = "Empresas",
    params(("id" = i64, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company detail", body = CompanyView),
        (status = 404, description = "Company not found", body = ErrorResponse)
    )
)]
pub async fn get_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CompanyView>, AppError> {
    tracing::info!("GET /api/empresas/{}", id);

    let id = parse_id(&id, COMPANY_NOT_FOUND)?;
    let company = state
        .companies()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(COMPANY_NOT_FOUND.to_string()))?;

    Ok(Json(company.into()))
}

/// POST /api/empresas
#[utoipa::path(
    post, path = "/api/empresas", tag = "Empresas",
    request_body = crate::openapi::CompanyRequestDoc,
    responses(
        (status = 201, description = "Company created", body = CreatedResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse)
    )
)]
pub async fn create_company(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    tracing::info!("POST /api/empresas");

    let request = json_body(payload)?;
    let company = state.companies().create(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { id: company.id }),
    ))
}

/// PUT /api/empresas/:id
///
/// Replaces legal name and CNPJ. Body errors are reported before unknown ids.
#[utoipa::path(
    put, path = "/api/empresas/{id}", tag = "Empresas",
    params(("id" = i64, Path, description = "Company id")),
    request_body = crate::openapi::CompanyRequestDoc,
    responses(
        (status = 200, description = "Company updated", body = StatusResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse)
    )
)]
pub async fn update_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<CompanyRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    tracing::info!("PUT /api/empresas/{}", id);

    let id = parse_id(&id, COMPANY_NOT_FOUND)?;
    let fields = CompanyFields::from(json_body(payload)?);
    fields.validate()?;

    let companies = state.companies();
    let company = companies
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(COMPANY_NOT_FOUND.to_string()))?;

    companies.update(company, fields).await?;

    Ok(Json(StatusResponse::new("Empresa atualizada")))
}

/// DELETE /api/empresas/:id
///
/// Removes the company and all of its partners.
#[utoipa::path(
    delete, path = "/api/empresas/{id}", tag = "Empresas",
    params(("id" = i64, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company removed", body = StatusResponse),
        (status = 404, description = "Company not found", body = ErrorResponse)
    )
)]
pub async fn delete_company(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    tracing::info!("DELETE /api/empresas/{}", id);

    let id = parse_id(&id, COMPANY_NOT_FOUND)?;
    let companies = state.companies();
    let company = companies
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(COMPANY_NOT_FOUND.to_string()))?;

    companies.delete(company).await?;

    Ok(Json(StatusResponse::new("Empresa removida")))
}

// ============ Partners ============

/// GET /api/socios
#[utoipa::path(
    get, path = "/api/socios", tag = "Sócios",
    responses((status = 200, description = "Partner list", body = [PartnerView]))
)]
pub async fn list_partners(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PartnerView>>, AppError> {
    tracing::info!("GET /api/socios");

    let partners = state.partners().list_all().await?;
    Ok(Json(partners.into_iter().map(PartnerView::from).collect()))
}

/// GET /api/socios/:id
#[utoipa::path(
    get, path = "/api/socios/{id}", tag = "Sócios",
    params(("id" = i64, Path, description = "Partner id")),
    responses(
        (status = 200, description = "Partner detail", body = PartnerView),
        (status = 404, description = "Partner not found", body = ErrorResponse)
    )
)]
pub async fn get_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PartnerView>, AppError> {
    tracing::info!("GET /api/socios/{}", id);

    let id = parse_id(&id, PARTNER_NOT_FOUND)?;
    let partner = state
        .partners()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PARTNER_NOT_FOUND.to_string()))?;

    Ok(Json(partner.into()))
}

/// POST /api/socios
///
/// Creates a partner under an existing company.
#[utoipa::path(
    post, path = "/api/socios", tag = "Sócios",
    request_body = crate::openapi::PartnerRequestDoc,
    responses(
        (status = 201, description = "Partner created", body = CreatedResponse),
        (status = 400, description = "Invalid fields or unknown company", body = ErrorResponse)
    )
)]
pub async fn create_partner(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PartnerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    tracing::info!("POST /api/socios");

    let request = json_body(payload)?;
    let partner = state.partners().create(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { id: partner.id }),
    ))
}

/// PUT /api/socios/:id
#[utoipa::path(
    put, path = "/api/socios/{id}", tag = "Sócios",
    params(("id" = i64, Path, description = "Partner id")),
    request_body = crate::openapi::PartnerRequestDoc,
    responses(
        (status = 200, description = "Partner updated", body = StatusResponse),
        (status = 400, description = "Invalid fields or unknown company", body = ErrorResponse),
        (status = 404, description = "Partner not found", body = ErrorResponse)
    )
)]
pub async fn update_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<PartnerRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    tracing::info!("PUT /api/socios/{}", id);

    let id = parse_id(&id, PARTNER_NOT_FOUND)?;
    let partners = state.partners();
    let partner = partners
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PARTNER_NOT_FOUND.to_string()))?;

    let request = json_body(payload)?;
    partners.update(partner, request.into()).await?;

    Ok(Json(StatusResponse::new("Sócio atualizado")))
}

/// DELETE /api/socios/:id
#[utoipa::path(
    delete, path = "/api/socios/{id}", tag = "Sócios",
    params(("id" = i64, Path, description = "Partner id")),
    responses(
        (status = 200, description = "Partner removed", body = StatusResponse),
        (status = 404, description = "Partner not found", body = ErrorResponse)
    )
)]
pub async fn delete_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    tracing::info!("DELETE /api/socios/{}", id);

    let id = parse_id(&id, PARTNER_NOT_FOUND)?;
    let partners = state.partners();
    let partner = partners
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(PARTNER_NOT_FOUND.to_string()))?;

    partners.delete(partner).await?;

    Ok(Json(StatusResponse::new("Sócio removido")))
}
