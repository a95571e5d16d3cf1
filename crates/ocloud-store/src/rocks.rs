//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options,
};

use crate::error::{Result, StoreError};
use crate::schema::{all_column_families, cf};
use crate::types::{OCloud, OCloudStatus};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    // Serializes read-modify-write sequences so a status write cannot clobber
    // a concurrent spec write.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write a record, assuming the write lock is held.
    fn write_locked(&self, ocloud: &OCloud) -> Result<()> {
        let cf = self.cf(cf::OCLOUDS)?;
        self.db
            .put_cf(&cf, ocloud.name.as_bytes(), Self::serialize(ocloud)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    fn put_ocloud(&self, ocloud: &OCloud) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.write_locked(ocloud)?;
        tracing::debug!(ocloud = %ocloud.name, "Stored O-Cloud");
        Ok(())
    }

    fn get_ocloud(&self, name: &str) -> Result<Option<OCloud>> {
        let cf = self.cf(cf::OCLOUDS)?;

        self.db
            .get_cf(&cf, name.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn update_status(&self, name: &str, status: &OCloudStatus) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut ocloud = self.get_ocloud(name)?.ok_or(StoreError::NotFound)?;
        ocloud.status = status.clone();
        self.write_locked(&ocloud)
    }

    fn delete_ocloud(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let cf = self.cf(cf::OCLOUDS)?;

        if self.get_ocloud(name)?.is_none() {
            return Err(StoreError::NotFound);
        }
        self.db
            .delete_cf(&cf, name.as_bytes())
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(ocloud = %name, "Deleted O-Cloud");
        Ok(())
    }

    fn list_oclouds(&self) -> Result<Vec<OCloud>> {
        let cf = self.cf(cf::OCLOUDS)?;

        let mut oclouds = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            oclouds.push(Self::deserialize(&value)?);
        }

        Ok(oclouds)
    }
}
