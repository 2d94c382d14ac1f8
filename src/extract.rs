// 🔎 Field Extractor
// Label-based extraction over the visible text of the verification page

use crate::store::StampRecord;

/// Which record field a label fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    StampType,
    Folio,
    ProductionDate,
    Brand,
    ProductType,
    AlcoholContent,
    Capacity,
    Origin,
    ProducerName,
    TaxId,
}

/// (field, label as rendered by the SAT page, 1-based occurrence)
///
/// "Tipo:" appears twice: first for the stamp, then for the product.
pub const FIELD_LABELS: [(Field, &str, usize); 10] = [
    (Field::StampType, "Tipo:", 1),
    (Field::Folio, "Folio:", 1),
    (Field::ProductionDate, "Fecha de elaboración:", 1),
    (Field::Brand, "Nombre o marca:", 1),
    (Field::ProductType, "Tipo:", 2),
    (Field::AlcoholContent, "Graduación alcohólica:", 1),
    (Field::Capacity, "Capacidad:", 1),
    (Field::Origin, "Origen del producto", 1),
    (Field::ProducerName, "Nombre:", 1),
    (Field::TaxId, "RFC:", 1),
];

/// Text following the `occurrence`-th `label` up to the end of that line, trimmed.
///
/// Returns "" when the label never appears. An occurrence past the last
/// match falls back to the first match instead of failing. Occurrence 0
/// reads the first line of the text before the first match.
pub fn extract(text: &str, label: &str, occurrence: usize) -> String {
    if label.is_empty() || !text.contains(label) {
        return String::new();
    }

    let segments: Vec<&str> = text.split(label).collect();
    // label is present, so there are at least two segments
    let segment = segments.get(occurrence).copied().unwrap_or(segments[1]);

    segment.split('\n').next().unwrap_or("").trim().to_string()
}

/// Build a full record from page text using [`FIELD_LABELS`].
/// Missing labels leave their field empty; the caller decides whether
/// an empty folio is acceptable.
pub fn extract_record(text: &str) -> StampRecord {
    let mut record = StampRecord::default();

    for (field, label, occurrence) in FIELD_LABELS {
        let value = extract(text, label, occurrence);
        let slot = match field {
            Field::StampType => &mut record.stamp_type,
            Field::Folio => &mut record.folio,
            Field::ProductionDate => &mut record.production_date,
            Field::Brand => &mut record.brand,
            Field::ProductType => &mut record.product_type,
            Field::AlcoholContent => &mut record.alcohol_content,
            Field::Capacity => &mut record.capacity,
            Field::Origin => &mut record.origin,
            Field::ProducerName => &mut record.producer_name,
            Field::TaxId => &mut record.tax_id,
        };
        *slot = value;
    }

    record
}
