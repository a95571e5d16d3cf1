//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary O-Cloud records, keyed by name.
    pub const OCLOUDS: &str = "oclouds";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::OCLOUDS]
}
