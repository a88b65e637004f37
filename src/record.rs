//! Record types flowing through the cleaning pipeline.
//!
//! A [`RawBatch`] is what the loader hands over: source headers plus string rows.
//! The schema normalizer turns it into a [`CanonicalBatch`] whose records carry the
//! canonical field set; every later stage consumes and returns that batch by value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// True when the value is empty or whitespace only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBatch {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawBatch {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Canonical fields a source column can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    TreeId,
    LocationId,
    LocationType,
    Ownership,
    District,
    Address,
    AddressComplement,
    FrenchName,
    Genus,
    Species,
    Variety,
    CircumferenceCm,
    HeightM,
    GrowthStage,
    Remarkable,
    GeoPoint,
    Lat,
    Lon,
    EnName,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::TreeId,
        Field::LocationId,
        Field::LocationType,
        Field::Ownership,
        Field::District,
        Field::Address,
        Field::AddressComplement,
        Field::FrenchName,
        Field::Genus,
        Field::Species,
        Field::Variety,
        Field::CircumferenceCm,
        Field::HeightM,
        Field::GrowthStage,
        Field::Remarkable,
        Field::GeoPoint,
        Field::Lat,
        Field::Lon,
        Field::EnName,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Field::TreeId => "tree_id",
            Field::LocationId => "location_id",
            Field::LocationType => "location_type",
            Field::Ownership => "ownership",
            Field::District => "district",
            Field::Address => "address",
            Field::AddressComplement => "address_complement",
            Field::FrenchName => "french_name",
            Field::Genus => "genus",
            Field::Species => "species",
            Field::Variety => "variety",
            Field::CircumferenceCm => "circumference_cm",
            Field::HeightM => "height_m",
            Field::GrowthStage => "growth_stage",
            Field::Remarkable => "remarkable",
            Field::GeoPoint => "geo_point_2d",
            Field::Lat => "lat",
            Field::Lon => "lon",
            Field::EnName => "en_name",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical development stage. Labels the tables do not know are kept verbatim
/// in [`GrowthStage::Unmapped`] so they stay visible downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    #[serde(alias = "Young tree")]
    YoungTree,
    #[serde(alias = "Adult")]
    Adult,
    #[serde(alias = "Mature")]
    Mature,
    #[serde(skip)]
    Unmapped(String),
}

impl GrowthStage {
    pub const CANONICAL: [GrowthStage; 3] =
        [GrowthStage::YoungTree, GrowthStage::Adult, GrowthStage::Mature];

    pub fn label(&self) -> &str {
        match self {
            GrowthStage::YoungTree => "Young tree",
            GrowthStage::Adult => "Adult",
            GrowthStage::Mature => "Mature",
            GrowthStage::Unmapped(raw) => raw,
        }
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, GrowthStage::Unmapped(_))
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One tree in the canonical schema. Text fields use the empty string for
/// "absent"; numeric fields use `None` when missing or unparsable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRecord {
    pub tree_id: String,
    pub location_id: String,
    pub location_type: String,
    pub ownership: String,
    pub district: String,
    pub arr_num: Option<u8>,
    pub address: String,
    pub address_complement: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub genus: String,
    pub species: String,
    pub variety: String,
    pub genus_species: String,
    pub french_name: String,
    pub en_name: String,
    pub height_m: Option<f64>,
    pub circumference_cm: Option<f64>,
    pub growth_stage: Option<GrowthStage>,
    pub remarkable: String,
    pub is_remarkable: bool,
    /// Values of unmapped source columns, aligned with
    /// [`CanonicalBatch::passthrough_headers`].
    pub passthrough: Vec<String>,
}

impl CanonicalRecord {
    pub fn has_name(&self) -> bool {
        !is_blank(&self.french_name) || !is_blank(&self.en_name)
    }

    /// Display label preferring the English name.
    pub fn common_name(&self) -> Option<&str> {
        [self.en_name.as_str(), self.french_name.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    fn to_row(&self) -> Vec<String> {
        let mut row = vec![
            self.tree_id.clone(),
            self.location_id.clone(),
            self.location_type.clone(),
            self.ownership.clone(),
            self.district.clone(),
            render_option(self.arr_num),
            self.address.clone(),
            self.address_complement.clone(),
            render_option(self.lat),
            render_option(self.lon),
            self.genus.clone(),
            self.species.clone(),
            self.variety.clone(),
            self.genus_species.clone(),
            self.french_name.clone(),
            self.en_name.clone(),
            render_option(self.height_m),
            render_option(self.circumference_cm),
            self.growth_stage
                .as_ref()
                .map(|stage| stage.label().to_string())
                .unwrap_or_default(),
            self.remarkable.clone(),
            self.is_remarkable.to_string(),
        ];
        row.extend(self.passthrough.iter().cloned());
        row
    }
}

fn render_option<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Output column order of a cleaned batch, before pass-through columns.
pub const CANONICAL_COLUMNS: [&str; 21] = [
    "tree_id",
    "location_id",
    "location_type",
    "ownership",
    "district",
    "arr_num",
    "address",
    "address_complement",
    "lat",
    "lon",
    "genus",
    "species",
    "variety",
    "genus_species",
    "french_name",
    "en_name",
    "height_m",
    "circumference_cm",
    "growth_stage",
    "remarkable",
    "is_remarkable",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalBatch {
    /// Canonical fields that were bound to a source column.
    pub source_fields: Vec<Field>,
    pub passthrough_headers: Vec<String>,
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_source_field(&self, field: Field) -> bool {
        self.source_fields.contains(&field)
    }

    pub fn headers(&self) -> Vec<String> {
        CANONICAL_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(self.passthrough_headers.iter().cloned())
            .collect()
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.records.iter().map(CanonicalRecord::to_row).collect()
    }

    /// Rebuilds the batch by passing every record through `f`, in order.
    pub fn map_records<F>(mut self, f: F) -> Self
    where
        F: FnMut(CanonicalRecord) -> CanonicalRecord,
    {
        self.records = std::mem::take(&mut self.records)
            .into_iter()
            .map(f)
            .collect();
        self
    }

    /// Splits off the records matching `predicate`, returning `(kept, removed)`.
    pub fn partition<F>(mut self, mut predicate: F) -> (Self, Vec<CanonicalRecord>)
    where
        F: FnMut(&CanonicalRecord) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|record| predicate(record));
        self.records = kept;
        (self, removed)
    }
}
