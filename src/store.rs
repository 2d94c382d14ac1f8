// 🗄️ Record Store - SQLite + WAL
// Single table of verified stamps, unique by folio

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub type Result<T> = std::result::Result<T, StoreError>;

/// StampRecord - Datos extraídos de la página de verificación del marbete
/// Todos los campos son texto libre tal como aparece en la página
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampRecord {
    /// Unique business key printed on the stamp
    pub folio: String,

    #[serde(rename = "tipo_marbete")]
    pub stamp_type: String,

    #[serde(rename = "fecha_elaboracion")]
    pub production_date: String,

    #[serde(rename = "marca")]
    pub brand: String,

    #[serde(rename = "tipo_producto")]
    pub product_type: String,

    #[serde(rename = "alcohol")]
    pub alcohol_content: String,

    #[serde(rename = "capacidad")]
    pub capacity: String,

    #[serde(rename = "origen")]
    pub origin: String,

    #[serde(rename = "productor")]
    pub producer_name: String,

    #[serde(rename = "rfc")]
    pub tax_id: String,
}

/// A stored record plus the moment it was captured (CLI export only)
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub record: StampRecord,
    pub created_at: Option<DateTime<Utc>>,
}

const RECORD_COLUMNS: &str = "folio, tipo_marbete, fecha_elaboracion, marca, tipo_producto,
                              alcohol, capacidad, origen, productor, rfc";

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL keeps readers going while the server writes
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS marbetes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            folio TEXT UNIQUE NOT NULL,
            tipo_marbete TEXT NOT NULL DEFAULT '',
            fecha_elaboracion TEXT NOT NULL DEFAULT '',
            marca TEXT NOT NULL DEFAULT '',
            tipo_producto TEXT NOT NULL DEFAULT '',
            alcohol TEXT NOT NULL DEFAULT '',
            capacidad TEXT NOT NULL DEFAULT '',
            origen TEXT NOT NULL DEFAULT '',
            productor TEXT NOT NULL DEFAULT '',
            rfc TEXT NOT NULL DEFAULT '',
            created_at TEXT
        )",
        [],
    )?;

    Ok(())
}

pub fn folio_exists(conn: &Connection, folio: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM marbetes WHERE folio = ?1)",
        [folio],
        |row| row.get(0),
    )?;

    Ok(exists)
}

/// Insert a new record. A folio that is already stored is rejected,
/// never overwritten.
pub fn insert_record(conn: &Connection, record: &StampRecord) -> Result<()> {
    if record.folio.is_empty() {
        return Err(StoreError::EmptyFolio);
    }

    let result = conn.execute(
        &format!(
            "INSERT INTO marbetes ({}, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            RECORD_COLUMNS
        ),
        params![
            record.folio,
            record.stamp_type,
            record.production_date,
            record.brand,
            record.product_type,
            record.alcohol_content,
            record.capacity,
            record.origin,
            record.producer_name,
            record.tax_id,
            Utc::now().to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::Constraint(record.folio.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StampRecord> {
    Ok(StampRecord {
        folio: row.get(0)?,
        stamp_type: row.get(1)?,
        production_date: row.get(2)?,
        brand: row.get(3)?,
        product_type: row.get(4)?,
        alcohol_content: row.get(5)?,
        capacity: row.get(6)?,
        origin: row.get(7)?,
        producer_name: row.get(8)?,
        tax_id: row.get(9)?,
    })
}

/// All records in insertion order
pub fn get_all_records(conn: &Connection) -> Result<Vec<StampRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM marbetes ORDER BY id",
        RECORD_COLUMNS
    ))?;

    let records = stmt
        .query_map([], record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn get_all_rows(conn: &Connection) -> Result<Vec<StoredRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, created_at FROM marbetes ORDER BY id",
        RECORD_COLUMNS
    ))?;

    let rows = stmt
        .query_map([], |row| {
            let created_at: Option<String> = row.get(10)?;
            Ok(StoredRecord {
                record: record_from_row(row)?,
                created_at: created_at
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Unconditional truncate. Returns the number of rows removed.
pub fn delete_all_records(conn: &Connection) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM marbetes", [])?;
    Ok(deleted)
}

pub fn count_records(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM marbetes", [], |row| row.get(0))?;
    Ok(count)
}
