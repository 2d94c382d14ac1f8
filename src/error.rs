// ⚠️ Error taxonomy
// Store, fetch and request errors, plus their HTTP mapping (server mode)

use thiserror::Error;

/// Record store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refusing to store a record without folio")]
    EmptyFolio,
    /// UNIQUE constraint on folio rejected the insert
    #[error("folio {0} already stored")]
    Constraint(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Browser session failures. All of them surface as HTTP 500.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid browser configuration: {0}")]
    Config(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("timed out after {secs}s loading {url}")]
    Timeout { url: String, secs: u64 },
    #[error("could not read page text: {0}")]
    ReadText(String),
}

/// Outcome of a failed Submit / List / Clear request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty `qr` in the request body
    #[error("QR vacío")]
    EmptyQr,
    /// The page text did not contain a folio
    #[error("No se pudo extraer el folio")]
    InvalidStamp,
    #[error("DUPLICADO")]
    Duplicate { folio: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(StoreError),
    #[error("record store lock poisoned")]
    StorePoisoned,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Constraint(folio) => ApiError::Duplicate { folio },
            StoreError::EmptyFolio => ApiError::InvalidStamp,
            other => ApiError::Store(other),
        }
    }
}

// ============================================================================
// HTTP MAPPING
// ============================================================================

#[cfg(feature = "server")]
mod http {
    use super::ApiError;
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    };
    use serde_json::json;

    impl ApiError {
        pub fn status(&self) -> StatusCode {
            match self {
                ApiError::EmptyQr => StatusCode::BAD_REQUEST,
                ApiError::InvalidStamp => StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::Duplicate { .. } => StatusCode::CONFLICT,
                ApiError::Fetch(_) | ApiError::Store(_) | ApiError::StorePoisoned => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }

        /// JSON body sent to the client
        pub fn body(&self) -> serde_json::Value {
            match self {
                ApiError::EmptyQr => json!({ "error": "QR vacío" }),
                ApiError::InvalidStamp => json!({
                    "error": "MARBETE INVALIDO",
                    "detalle": "No se pudo extraer el folio",
                }),
                ApiError::Duplicate { folio } => json!({ "error": "DUPLICADO", "folio": folio }),
                other => json!({ "error": other.to_string() }),
            }
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            match self.status() {
                StatusCode::INTERNAL_SERVER_ERROR => tracing::error!("request failed: {}", self),
                status => tracing::warn!("request rejected ({}): {}", status.as_u16(), self),
            }
            (self.status(), Json(self.body())).into_response()
        }
    }
}
