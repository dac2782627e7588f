//! Durable client-side key/value store.
//!
//! State kept here survives a restart but is never trusted on its own: an
//! applied coupon read back from the store is re-validated before use.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{coupons::AppliedCoupon, money::WireAmount};

/// Key under which the last applied coupon is persisted.
pub const APPLIED_COUPON_KEY: &str = "checkout.applied_coupon";

/// Errors returned by stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("failed to access store at {path}")]
    IO {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error("store at {path} is corrupt")]
    Corrupt {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded.
    #[error("failed to encode value for {key}")]
    Encode {
        /// Key being written.
        key: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// A string key/value store.
pub trait KeyValueStore: Send {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be written.
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backing storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: FxHashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);

        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);

        Ok(())
    }
}

/// Store persisted as a JSON object in a single file.
///
/// The file is read once when the store is opened and rewritten in full on
/// every change, via a temporary file renamed into place.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: FxHashMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IO`] if the file cannot be read, or
    /// [`StoreError::Corrupt`] if it does not hold a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => FxHashMap::default(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(source) if source.kind() == io::ErrorKind::NotFound => FxHashMap::default(),
            Err(source) => return Err(StoreError::IO { path, source }),
        };

        Ok(Self { path, values })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let io_error = |source| StoreError::IO {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let contents = serde_json::to_string_pretty(&self.values).map_err(|source| StoreError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;

        let staging = self.path.with_extension("tmp");

        fs::write(&staging, contents).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }

        Ok(())
    }
}

/// The last successfully validated coupon, as persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCouponState {
    /// Normalised coupon code.
    pub code: String,
    /// Discount granted when it was validated.
    pub discount_amount: WireAmount,
    /// When it was validated.
    pub validated_at: Timestamp,
}

impl AppliedCouponState {
    /// Capture an applied coupon.
    pub fn from_applied(applied: &AppliedCoupon<'_>, validated_at: Timestamp) -> Self {
        Self {
            code: applied.code().to_string(),
            discount_amount: WireAmount::from_money(applied.discount_amount()),
            validated_at,
        }
    }

    /// Read the persisted state.
    ///
    /// Unreadable state is discarded and treated as absent.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store itself fails.
    pub fn load(store: &mut dyn KeyValueStore) -> Result<Option<Self>, StoreError> {
        let Some(raw) = store.get(APPLIED_COUPON_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(error) => {
                warn!(%error, "discarding unreadable applied coupon state");

                store.remove(APPLIED_COUPON_KEY)?;

                Ok(None)
            }
        }
    }

    /// Persist this state, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the state cannot be written.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let raw = serde_json::to_string(self).map_err(|source| StoreError::Encode {
            key: APPLIED_COUPON_KEY.to_string(),
            source,
        })?;

        store.set(APPLIED_COUPON_KEY, raw)
    }

    /// Remove the persisted state.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot be written.
    pub fn clear(store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        store.remove(APPLIED_COUPON_KEY)
    }
}
