// Marbete Verifier - Core Library
// Shared by the HTTP server and the maintenance CLI

pub mod config;
pub mod error;
pub mod extract;
pub mod store;

#[cfg(feature = "server")]
pub mod api;
#[cfg(feature = "server")]
pub mod fetcher;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{ApiError, FetchError, StoreError};
pub use extract::{extract, extract_record, Field, FIELD_LABELS};
pub use store::{
    StampRecord, StoredRecord,
    open_database, setup_database, folio_exists, insert_record,
    get_all_records, get_all_rows, delete_all_records, count_records,
};

#[cfg(feature = "server")]
pub use api::{router, submit, AppState};
#[cfg(feature = "server")]
pub use fetcher::{ChromeFetcher, FetcherSettings, PageFetcher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global `tracing` subscriber (`RUST_LOG` overrides `info`)
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
