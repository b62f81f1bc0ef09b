use snafu::{Backtrace, Snafu};
use std::io;
use std::path::PathBuf;

/// Error taxonomy of the crate.
///
/// Store-level failures are classified once, inside the `store` module, into
/// `BucketNotFound`, `AccessDenied` or `Transfer`; code above the store only
/// ever matches on these kinds.
#[derive(Snafu, Debug)]
#[snafu(visibility = "pub")]
pub enum Error {
    #[snafu(display("Io error: {}: {}", description, source))]
    Io {
        source: io::Error,
        description: String,
        backtrace: Backtrace,
    },
    /// The source file vanished between enumeration and dispatch.
    #[snafu(display("Local file not found: {}", path.display()))]
    LocalNotFound { path: PathBuf },
    #[snafu(display("Directory not found: {}", path.display()))]
    DirectoryNotFound { path: PathBuf },
    #[snafu(display("Not a directory: {}", path.display()))]
    NotADirectory { path: PathBuf },
    #[snafu(display("Bucket not found or not accessible: {}", bucket))]
    BucketNotFound { bucket: String },
    #[snafu(display("Access denied: {}", detail))]
    AccessDenied { detail: String },
    /// Network, timeout, quota or otherwise unclassified store failure.
    #[snafu(display("Transfer error: {}", detail))]
    Transfer { detail: String },
}
