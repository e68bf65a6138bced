// Low-level storage access traits.

use crate::entities::*;
use std::{error::Error as StdError, path::PathBuf};
use thiserror::Error;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The address store '{}' is corrupt: {source}", path.display())]
    CorruptStore { path: PathBuf, source: Cause },
    #[error("Unable to write the address store '{}': {source}", path.display())]
    StoreWriteFailed { path: PathBuf, source: Cause },
}

impl Error {
    pub fn corrupt_store<P, E>(path: P, source: E) -> Self
    where
        P: Into<PathBuf>,
        E: Into<Cause>,
    {
        Self::CorruptStore {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn store_write_failed<P, E>(path: P, source: E) -> Self
    where
        P: Into<PathBuf>,
        E: Into<Cause>,
    {
        Self::StoreWriteFailed {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Mapping from the canonical string of a coordinate to its address.
pub trait AddressRepo {
    fn get_address(&self, key: &CoordinateKey) -> Option<String>;

    // Only modifies the mapping in memory
    fn put_address(&mut self, key: &CoordinateKey, address: String);

    fn count_addresses(&self) -> usize;

    /// Persist all entries that are currently held in memory.
    fn flush(&mut self) -> Result<()>;
}
