use serde::{Deserialize, Serialize};

/// Settings for a batch upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum number of simultaneous upload requests.
    pub concurrency: usize,
    /// Prepended verbatim to every destination key (include a trailing `/`
    /// to get a directory-like prefix).
    pub key_prefix: String,
    /// Make every uploaded object publicly readable.
    pub make_public: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            key_prefix: String::new(),
            make_public: false,
        }
    }
}

impl UploadConfig {
    /// Default configuration with `concurrency` overridden from the
    /// `UPLOAD_CONCURRENCY` environment variable when set and valid.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(n) = std::env::var("UPLOAD_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cfg.concurrency = n;
        }
        cfg
    }
}
