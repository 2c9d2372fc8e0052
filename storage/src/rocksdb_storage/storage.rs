//! Implementation for a storage abstraction over RocksDB.
use std::path::Path;

use lazy_static::lazy_static;
use rocksdb::{OptimisticTransactionDB, WriteBatchWithTransaction};

use crate::{Bucket, Error, Storage, StorageBatch};

lazy_static! {
    static ref DEFAULT_OPTS: rocksdb::Options = {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_allow_mmap_writes(true);
        opts.set_allow_mmap_reads(true);
        opts.set_atomic_flush(true);
        opts
    };
}

/// Storage which uses RocksDB as its backend.
pub struct RocksDbStorage {
    db: OptimisticTransactionDB,
}

impl RocksDbStorage {
    /// Open (or create) a database at `path` with the default options.
    pub fn default_rocksdb_with_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let db = OptimisticTransactionDB::open(&DEFAULT_OPTS, &path)?;
        Ok(RocksDbStorage { db })
    }
}

impl Storage for RocksDbStorage {
    fn get(&self, bucket: &Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.get(bucket.key(key))?)
    }

    fn put(&self, bucket: &Bucket, key: &[u8], value: &[u8]) -> Result<(), Error> {
        Ok(self.db.put(bucket.key(key), value)?)
    }

    fn commit_batch(&self, batch: &mut StorageBatch) -> Result<(), Error> {
        let mut db_batch = WriteBatchWithTransaction::<true>::default();
        for (key, value) in batch.iter() {
            db_batch.put(key, value);
        }
        self.db.write(db_batch)?;
        batch.clear();
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(self.db.flush()?)
    }
}
