// Marbete Verifier - maintenance CLI
// Works on the same database file as the server, no browser needed

use anyhow::{bail, Context, Result};
use marbete_verifier::{
    count_records, delete_all_records, extract_record, get_all_records, get_all_rows,
    init_tracing, open_database, ServerConfig, StoredRecord,
};
use rusqlite::Connection;
use std::env;
use std::path::Path;
use tracing::info;

const USAGE: &str = "usage: marbetes <list | count | clear | export <file.csv> | extract <page.txt>>";

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);
    let target = args.get(2).map(Path::new);

    match (command, target) {
        (Some("list"), _) => run_list(),
        (Some("count"), _) => run_count(),
        (Some("clear"), _) => run_clear(),
        (Some("export"), Some(path)) => run_export(path),
        (Some("extract"), Some(path)) => run_extract(path),
        _ => bail!(USAGE),
    }
}

fn connect() -> Result<Connection> {
    let config = ServerConfig::from_env()?;
    let conn = open_database(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    Ok(conn)
}

fn run_list() -> Result<()> {
    let conn = connect()?;
    let records = get_all_records(&conn)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_count() -> Result<()> {
    let conn = connect()?;
    println!("{}", count_records(&conn)?);
    Ok(())
}

fn run_clear() -> Result<()> {
    let conn = connect()?;
    let deleted = delete_all_records(&conn)?;
    info!("Base limpia: {} registros eliminados", deleted);
    Ok(())
}

fn run_export(path: &Path) -> Result<()> {
    let conn = connect()?;
    let rows = get_all_rows(&conn)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    write_csv(&mut writer, &rows)?;
    writer.flush()?;

    info!("✓ Exported {} registros to {:?}", rows.len(), path);
    Ok(())
}

fn write_csv<W: std::io::Write>(writer: &mut csv::Writer<W>, rows: &[StoredRecord]) -> Result<()> {
    writer.write_record([
        "folio",
        "tipo_marbete",
        "fecha_elaboracion",
        "marca",
        "tipo_producto",
        "alcohol",
        "capacidad",
        "origen",
        "productor",
        "rfc",
        "created_at",
    ])?;

    for row in rows {
        let r = &row.record;
        let created_at = row
            .created_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        writer.write_record([
            r.folio.as_str(),
            r.stamp_type.as_str(),
            r.production_date.as_str(),
            r.brand.as_str(),
            r.product_type.as_str(),
            r.alcohol_content.as_str(),
            r.capacity.as_str(),
            r.origin.as_str(),
            r.producer_name.as_str(),
            r.tax_id.as_str(),
            created_at.as_str(),
        ])?;
    }

    Ok(())
}

/// Offline extraction over a saved `innerText` dump
fn run_extract(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;

    let record = extract_record(&text);
    if record.folio.is_empty() {
        bail!("MARBETE INVALIDO: no se pudo extraer el folio de {:?}", path);
    }

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
