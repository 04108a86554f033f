//! Feature schema versions and their categorical encoding tables.
//!
//! A schema version pins everything the trained scaler/model pair depends on:
//! the label → code tables, the vector width and any trailing placeholder
//! features. Artifacts are checked against the configured version at startup.

use std::{fmt, str::FromStr};

/// Model year fed to the 9-feature schema in place of the real (unavailable) year.
pub const MODEL_YEAR_PLACEHOLDER: f64 = 2020.0;

/// Value fed to the 9-feature schema for the two features we do not collect.
pub const UNAVAILABLE_FEATURE_PLACEHOLDER: f64 = 0.0;

/// Number of features taken from the request itself.
pub const ENCODED_FEATURES: usize = 6;

const V9_PLACEHOLDERS: [f64; 3] = [
    MODEL_YEAR_PLACEHOLDER,
    UNAVAILABLE_FEATURE_PLACEHOLDER,
    UNAVAILABLE_FEATURE_PLACEHOLDER,
];

/// Immutable label → code mapping for one categorical field.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTable {
    field: &'static str,
    entries: &'static [(&'static str, u32)],
}

impl CategoryTable {
    pub const fn new(field: &'static str, entries: &'static [(&'static str, u32)]) -> Self {
        Self { field, entries }
    }

    /// Exact, case-sensitive lookup.
    pub fn code(&self, label: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(l, _)| *l)
    }
}

// ---------- 6-feature schema (variant A) ----------

const V6_VEHICLE: CategoryTable =
    CategoryTable::new("vehicle", &[("Sedan", 0), ("SUV", 1), ("Hatchback", 2)]);
const V6_TRANS: CategoryTable = CategoryTable::new("trans", &[("Auto", 0), ("Manual", 1)]);
const V6_FUEL: CategoryTable =
    CategoryTable::new("fuel", &[("Petrol", 0), ("Diesel", 1), ("CNG", 2)]);

// ---------- 9-feature schema (variant B) ----------

const V9_VEHICLE: CategoryTable = CategoryTable::new(
    "vehicle",
    &[("Compact", 0), ("SUV", 1), ("Sedan", 2), ("Pickup", 3), ("Van", 4)],
);
const V9_TRANS: CategoryTable = CategoryTable::new(
    "trans",
    &[("AS", 0), ("M", 1), ("AV", 2), ("AM", 3), ("A", 4)],
);
const V9_FUEL: CategoryTable = CategoryTable::new(
    "fuel",
    &[("X", 0), ("Z", 1), ("D", 2), ("E", 3), ("N", 4)],
);

/// The feature layout an artifact pair was trained against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    /// `[vehicle, engine, cyl, trans, co2, fuel]`
    #[default]
    V6,
    /// V6 layout followed by `[year, 0, 0]` placeholders.
    V9,
}

impl SchemaVersion {
    pub fn width(self) -> usize {
        ENCODED_FEATURES + self.placeholders().len()
    }

    pub fn vehicle_table(self) -> &'static CategoryTable {
        match self {
            SchemaVersion::V6 => &V6_VEHICLE,
            SchemaVersion::V9 => &V9_VEHICLE,
        }
    }

    pub fn trans_table(self) -> &'static CategoryTable {
        match self {
            SchemaVersion::V6 => &V6_TRANS,
            SchemaVersion::V9 => &V9_TRANS,
        }
    }

    pub fn fuel_table(self) -> &'static CategoryTable {
        match self {
            SchemaVersion::V6 => &V6_FUEL,
            SchemaVersion::V9 => &V9_FUEL,
        }
    }

    /// Trailing constants appended after the encoded request fields.
    pub fn placeholders(self) -> &'static [f64] {
        match self {
            SchemaVersion::V6 => &[],
            SchemaVersion::V9 => &V9_PLACEHOLDERS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVersion::V6 => "v6",
            SchemaVersion::V9 => "v9",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown feature schema {0:?} (expected \"v6\" or \"v9\")")]
pub struct UnknownSchema(pub String);

impl FromStr for SchemaVersion {
    type Err = UnknownSchema;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v6" | "6" => Ok(SchemaVersion::V6),
            "v9" | "9" => Ok(SchemaVersion::V9),
            _ => Err(UnknownSchema(s.to_string())),
        }
    }
}

impl<'de> serde::Deserialize<'de> for SchemaVersion {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
