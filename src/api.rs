// 🚀 REST API with Axum
// POST /sat, GET /registros, POST /limpiar

use crate::error::ApiError;
use crate::extract::extract_record;
use crate::fetcher::PageFetcher;
use crate::store::{self, StampRecord};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Shared application state, built once in `main`
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    fetcher: Arc<dyn PageFetcher>,
}

impl AppState {
    pub fn new(conn: Connection, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            fetcher,
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::StorePoisoned)
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub qr: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub mensaje: &'static str,
}

/// Fetch the QR's page, extract the stamp and store it if the folio is new.
pub async fn submit(state: &AppState, qr: &str) -> Result<StampRecord, ApiError> {
    if qr.is_empty() {
        return Err(ApiError::EmptyQr);
    }

    let text = state.fetcher.fetch(qr).await?;

    let record = extract_record(&text);
    if record.folio.is_empty() {
        return Err(ApiError::InvalidStamp);
    }

    // Check and insert under one lock; the UNIQUE index backs it up
    let conn = state.db()?;
    if store::folio_exists(&conn, &record.folio)? {
        return Err(ApiError::Duplicate {
            folio: record.folio,
        });
    }
    store::insert_record(&conn, &record)?;

    info!("stored marbete {}", record.folio);
    Ok(record)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sat - Verify a stamp from its QR URL
async fn submit_stamp(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<StampRecord>, ApiError> {
    let qr = match payload {
        Ok(Json(SubmitRequest { qr: Some(qr) })) => qr,
        Ok(_) => return Err(ApiError::EmptyQr),
        Err(rejection) => {
            debug!("unreadable submit body: {}", rejection);
            return Err(ApiError::EmptyQr);
        }
    };

    submit(&state, &qr).await.map(Json)
}

/// GET /registros - All stored stamps
async fn list_records(State(state): State<AppState>) -> Result<Json<Vec<StampRecord>>, ApiError> {
    let conn = state.db()?;
    let records = store::get_all_records(&conn)?;

    info!("registros encontrados: {}", records.len());
    Ok(Json(records))
}

/// POST /limpiar - Drop every stored stamp
async fn clear_records(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    let conn = state.db()?;
    let deleted = store::delete_all_records(&conn)?;

    info!("base limpia ({} registros eliminados)", deleted);
    Ok(Json(ClearResponse {
        mensaje: "Base limpia",
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sat", post(submit_stamp))
        .route("/registros", get(list_records))
        .route("/limpiar", post(clear_records))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
