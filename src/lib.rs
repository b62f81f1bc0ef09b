//! # Batch uploads to object storage
//! Upload a local file tree to an object-storage bucket, with bounded
//! concurrency and per-file success/failure reporting.
//!
//! - Upload a whole directory with [`BatchUploader::upload_dir`]: every
//!   regular file under the root is mapped to a destination key and
//!   uploaded; one file failing never aborts the batch, and the aggregated
//!   [`BatchResult`] reports counts plus an itemized error list.
//! - Upload one file with [`BatchUploader::upload_file`].
//!
//! The storage backend is abstracted behind the [`ObjectStore`] trait;
//! [`S3Store`] implements it for any S3-compatible endpoint.

use futures::{future::Future, prelude::*, stream};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

mod config;
pub mod err;
mod store;
mod upload;

pub use config::*;
pub use err::Error;
pub use store::*;
pub use upload::*;

#[cfg(test)]
mod mock;

/// Handle tying an [`ObjectStore`] to an [`UploadConfig`]. Cheap to clone.
#[derive(Clone)]
pub struct BatchUploader<S> {
    store: S,
    config: UploadConfig,
}

impl<S> BatchUploader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: UploadConfig::default(),
        }
    }
    pub fn with_config(store: S, config: UploadConfig) -> Self {
        Self { store, config }
    }
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }
}
