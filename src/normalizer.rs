//! Schema normalizer: binds source headers to canonical fields and parses the
//! combined `"<lat>, <lon>"` coordinate column.
//!
//! Source labels follow the municipal open-data export. Canonical names are
//! accepted as headers too, so a cleaned file can be fed back in. Columns that
//! match neither pass through untouched.

use std::collections::HashMap;

use log::warn;
use serde::Serialize;

use crate::{
    error::PipelineError,
    record::{CanonicalBatch, CanonicalRecord, Field, GrowthStage, RawBatch, is_blank},
};

const RAW_FIELD_RENAMES: [(&str, Field); 16] = [
    ("IDBASE", Field::TreeId),
    ("TYPE EMPLACEMENT", Field::LocationType),
    ("DOMANIALITE", Field::Ownership),
    ("ARRONDISSEMENT", Field::District),
    ("COMPLEMENT ADRESSE", Field::AddressComplement),
    ("LIEU / ADRESSE", Field::Address),
    ("IDEMPLACEMENT", Field::LocationId),
    ("LIBELLE FRANCAIS", Field::FrenchName),
    ("GENRE", Field::Genus),
    ("ESPECE", Field::Species),
    ("VARIETE OU CULTIVAR", Field::Variety),
    ("CIRCONFERENCE (cm)", Field::CircumferenceCm),
    ("HAUTEUR (m)", Field::HeightM),
    ("STADE DE DEVELOPPEMENT", Field::GrowthStage),
    ("REMARQUABLE", Field::Remarkable),
    ("geo_point_2d", Field::GeoPoint),
];

/// Columns the pipeline computes itself; input copies are ignored.
const RECOMPUTED_COLUMNS: [&str; 3] = ["genus_species", "arr_num", "is_remarkable"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub coordinates_available: bool,
    pub missing_coordinates: usize,
    pub unparsable_coordinates: usize,
    pub unparsable_measures: usize,
}

/// Resolves a source header to its canonical field.
pub fn canonical_field(header: &str) -> Option<Field> {
    let header = clean_header(header);
    RAW_FIELD_RENAMES
        .iter()
        .find(|(raw, _)| *raw == header)
        .map(|(_, field)| *field)
        .or_else(|| Field::from_name(header))
}

fn clean_header(header: &str) -> &str {
    header.trim().trim_start_matches('\u{feff}').trim()
}

/// Parses `"<lat>, <lon>"`. Anything other than exactly two numeric tokens is `None`.
pub fn parse_coordinates(value: &str) -> Option<(f64, f64)> {
    let mut parts = value.split(',');
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    Some((parse_measure(lat)?, parse_measure(lon)?))
}

/// Parses a finite float; blank, malformed and non-finite values are `None`.
pub fn parse_measure(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Default)]
struct ColumnBindings {
    fields: HashMap<Field, usize>,
    passthrough: Vec<usize>,
}

impl ColumnBindings {
    fn bind(headers: &[String]) -> Result<Self, PipelineError> {
        let mut bindings = ColumnBindings::default();
        for (idx, header) in headers.iter().enumerate() {
            if RECOMPUTED_COLUMNS.contains(&clean_header(header)) {
                continue;
            }
            let Some(field) = canonical_field(header) else {
                bindings.passthrough.push(idx);
                continue;
            };
            if let Some(&first) = bindings.fields.get(&field) {
                return Err(PipelineError::DuplicateColumn {
                    field: field.name(),
                    first: headers[first].clone(),
                    second: header.clone(),
                });
            }
            bindings.fields.insert(field, idx);
        }
        bindings.release_unused_coordinates(headers);
        if !bindings.has(Field::FrenchName) && !bindings.has(Field::Genus) {
            return Err(PipelineError::MissingTaxonomyColumns {
                headers: headers.to_vec(),
            });
        }
        Ok(bindings)
    }

    /// Separate `lat`/`lon` columns are read only as a pair and only without a
    /// combined column. Otherwise they pass through as unmapped columns.
    fn release_unused_coordinates(&mut self, headers: &[String]) {
        let paired = self.has(Field::Lat) && self.has(Field::Lon);
        if paired && !self.has(Field::GeoPoint) {
            return;
        }
        for field in [Field::Lat, Field::Lon] {
            if let Some(idx) = self.fields.remove(&field) {
                warn!(
                    "Coordinate column '{}' is not used for lat/lon; passing it through",
                    headers[idx]
                );
                self.passthrough.push(idx);
            }
        }
        self.passthrough.sort_unstable();
    }

    fn has(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    fn cell<'a>(&self, row: &'a [String], field: Field) -> Option<&'a str> {
        self.fields
            .get(&field)
            .and_then(|idx| row.get(*idx))
            .map(String::as_str)
    }

    fn text(&self, row: &[String], field: Field) -> String {
        self.cell(row, field)
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }
}

/// Maps a raw batch onto the canonical schema.
///
/// Fails only when the batch carries no taxonomy column at all or binds two
/// headers to one field; every field-level defect degrades to a blank or null.
pub fn normalize(raw: &RawBatch) -> Result<(CanonicalBatch, NormalizeStats), PipelineError> {
    let bindings = ColumnBindings::bind(raw.headers())?;
    let use_geo_point = bindings.has(Field::GeoPoint);
    let use_lat_lon = bindings.has(Field::Lat);

    let mut stats = NormalizeStats {
        coordinates_available: use_geo_point || use_lat_lon,
        ..NormalizeStats::default()
    };
    if !stats.coordinates_available {
        warn!("No coordinate column found; lat/lon will be empty for every record");
    }
    if !bindings.has(Field::District) {
        warn!("No district column found; district numbers will be empty");
    }

    let mut records = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let mut record = CanonicalRecord {
            tree_id: bindings.text(row, Field::TreeId),
            location_id: bindings.text(row, Field::LocationId),
            location_type: bindings.text(row, Field::LocationType),
            ownership: bindings.text(row, Field::Ownership),
            district: bindings.text(row, Field::District),
            address: bindings.text(row, Field::Address),
            address_complement: bindings.text(row, Field::AddressComplement),
            genus: bindings.text(row, Field::Genus),
            species: bindings.text(row, Field::Species),
            variety: bindings.text(row, Field::Variety),
            french_name: bindings.text(row, Field::FrenchName),
            en_name: bindings.text(row, Field::EnName),
            remarkable: bindings.text(row, Field::Remarkable),
            passthrough: bindings
                .passthrough
                .iter()
                .map(|idx| row.get(*idx).cloned().unwrap_or_default())
                .collect(),
            ..CanonicalRecord::default()
        };

        let stage = bindings.text(row, Field::GrowthStage);
        if !stage.is_empty() {
            record.growth_stage = Some(GrowthStage::Unmapped(stage));
        }

        record.height_m = measure(&bindings, row, Field::HeightM, &mut stats);
        record.circumference_cm = measure(&bindings, row, Field::CircumferenceCm, &mut stats);

        if use_geo_point {
            let combined = bindings.cell(row, Field::GeoPoint).unwrap_or_default();
            if is_blank(combined) {
                stats.missing_coordinates += 1;
            } else if let Some((lat, lon)) = parse_coordinates(combined) {
                record.lat = Some(lat);
                record.lon = Some(lon);
            } else {
                stats.unparsable_coordinates += 1;
            }
        } else if use_lat_lon {
            let lat = measure(&bindings, row, Field::Lat, &mut stats);
            let lon = measure(&bindings, row, Field::Lon, &mut stats);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                record.lat = Some(lat);
                record.lon = Some(lon);
            } else {
                stats.missing_coordinates += 1;
            }
        }

        records.push(record);
    }

    if stats.unparsable_coordinates > 0 || stats.unparsable_measures > 0 {
        warn!(
            "{} unparsable coordinate(s) and {} unparsable measure(s) degraded to null",
            stats.unparsable_coordinates, stats.unparsable_measures
        );
    }

    let mut source_fields = bindings.fields.keys().copied().collect::<Vec<_>>();
    source_fields.sort();
    let passthrough_headers = bindings
        .passthrough
        .iter()
        .map(|idx| raw.headers()[*idx].clone())
        .collect();

    Ok((
        CanonicalBatch {
            source_fields,
            passthrough_headers,
            records,
        },
        stats,
    ))
}

fn measure(
    bindings: &ColumnBindings,
    row: &[String],
    field: Field,
    stats: &mut NormalizeStats,
) -> Option<f64> {
    let raw = bindings.cell(row, field)?;
    let parsed = parse_measure(raw);
    if parsed.is_none() && !is_blank(raw) {
        stats.unparsable_measures += 1;
    }
    parsed
}
