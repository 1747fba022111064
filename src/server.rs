use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ServiceError;
use crate::models::{Company, CompanyPage, ScrapedResult};
use crate::service::{CompanyService, FinanceService};

#[derive(Clone)]
pub struct AppState {
    pub companies: Arc<CompanyService>,
    pub finance: Arc<FinanceService>,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::AlreadyExists(_) | ServiceError::DuplicateKey(_) => StatusCode::CONFLICT,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ScrapeFailed { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::PersistenceFailed { .. } | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, AppError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/company", post(save_company).get(list_companies))
        .route("/company/:ticker", delete(delete_company))
        .route("/company/search", get(search_names))
        .route("/company/autocomplete", get(autocomplete))
        .route("/finance/dividend/:company_name", get(dividends_by_name))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    ticker: String,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    ticker: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    page: u32,
    #[serde(default = "default_page_size")]
    size: u32,
}

fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
struct PrefixQuery {
    prefix: String,
}

async fn save_company(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> ApiResult<Json<Company>> {
    let company = state.companies.save(&request.ticker).await?;
    // Registration is deliberately outside save: the company becomes
    // autocomplete-visible only once its row is committed.
    state.companies.register_autocomplete(&company.name);
    Ok(Json(company))
}

async fn delete_company(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let name = state.companies.delete(&ticker).await?;
    Ok(Json(DeleteResponse { ticker, name }))
}

async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<CompanyPage>> {
    let page = state.companies.list(query.page, query.size).await?;
    Ok(Json(page))
}

async fn search_names(
    State(state): State<AppState>,
    Query(query): Query<PrefixQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let names = state.companies.search_names_by_prefix(&query.prefix).await?;
    Ok(Json(names))
}

async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<PrefixQuery>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.companies.autocomplete(&query.prefix)))
}

async fn dividends_by_name(
    State(state): State<AppState>,
    Path(company_name): Path<String>,
) -> ApiResult<Json<ScrapedResult>> {
    let result = state.finance.dividends_by_company_name(&company_name).await?;
    Ok(Json(result))
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
