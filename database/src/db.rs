use crate::errors::{DbError, DbResult};
use parking_lot::RwLock;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

pub const CF_HEADERS: &str = "headers";
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_GHOSTDAG: &str = "ghostdag";
pub const CF_REACHABILITY: &str = "reachability";
pub const CF_CHILDREN: &str = "children";
pub const CF_UTXO_DIFFS: &str = "utxo_diffs";
pub const CF_MULTISETS: &str = "multisets";
pub const CF_ACCEPTANCE: &str = "acceptance";
pub const CF_UTXO_SET: &str = "utxo_set";
pub const CF_INVALID: &str = "invalid_blocks";
pub const CF_METADATA: &str = "metadata";

pub const COLUMN_FAMILIES: [&str; 11] = [
    CF_HEADERS,
    CF_TRANSACTIONS,
    CF_GHOSTDAG,
    CF_REACHABILITY,
    CF_CHILDREN,
    CF_UTXO_DIFFS,
    CF_MULTISETS,
    CF_ACCEPTANCE,
    CF_UTXO_SET,
    CF_INVALID,
    CF_METADATA,
];

pub struct Database {
    db: Arc<DB>,
    is_closed: Arc<RwLock<bool>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(10000);
        opts.set_keep_log_file_num(10);
        opts.set_max_background_jobs(4);
        opts.set_bytes_per_sync(1048576);
        opts.increase_parallelism(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_write_buffer_size(64 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);

        let cf_descriptors: Vec<_> = COLUMN_FAMILIES.iter().map(|name| ColumnFamilyDescriptor::new(*name, Options::default())).collect();
        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        Ok(Self { db: Arc::new(db), is_closed: Arc::new(RwLock::new(false)) })
    }

    fn check_closed(&self) -> DbResult<()> {
        if *self.is_closed.read() {
            return Err(DbError::DatabaseClosed);
        }
        Ok(())
    }

    pub fn cf_handle(&self, cf_name: &str) -> DbResult<&ColumnFamily> {
        self.db.cf_handle(cf_name).ok_or_else(|| DbError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    pub fn get(&self, cf_name: &str, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    pub fn exists(&self, cf_name: &str, key: &[u8]) -> DbResult<bool> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    /// Every key-value pair of a column family, in key order
    pub fn entries(&self, cf_name: &str) -> DbResult<Vec<(Box<[u8]>, Box<[u8]>)>> {
        self.check_closed()?;
        let cf = self.cf_handle(cf_name)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            entries.push(item?);
        }
        Ok(entries)
    }

    pub fn put_in_batch(&self, batch: &mut WriteBatch, cf_name: &str, key: &[u8], value: &[u8]) -> DbResult<()> {
        batch.put_cf(self.cf_handle(cf_name)?, key, value);
        Ok(())
    }

    pub fn delete_in_batch(&self, batch: &mut WriteBatch, cf_name: &str, key: &[u8]) -> DbResult<()> {
        batch.delete_cf(self.cf_handle(cf_name)?, key);
        Ok(())
    }

    pub fn write_batch(&self, batch: WriteBatch) -> DbResult<()> {
        self.check_closed()?;
        self.db.write(batch)?;
        Ok(())
    }

    pub fn close(&self) {
        *self.is_closed.write() = true;
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), is_closed: self.is_closed.clone() }
    }
}
