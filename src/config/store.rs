//! Store Config

use std::path::PathBuf;

use clap::Args;

use crate::store::{FileStore, StoreError};

/// Local state settings.
#[derive(Debug, Args)]
pub struct StoreConfig {
    /// File holding state that survives restarts (the applied coupon)
    #[arg(long, env = "STOREFRONT_STATE_FILE", default_value = ".storefront/state.json")]
    pub state_file: PathBuf,
}

impl StoreConfig {
    /// Open the configured state file.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the file exists but cannot be read.
    pub fn open(&self) -> Result<FileStore, StoreError> {
        FileStore::open(&self.state_file)
    }
}
