use std::path::PathBuf;

use thiserror::Error;

/// The crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("malformed store at {path}: {reason}")]
    MalformedStore { path: PathBuf, reason: String },

    #[error(
        "version invariant violation for {path}: full_md5 matches but md5 differs while version {version} is up-to-date"
    )]
    VersionInvariantViolation { path: PathBuf, version: u32 },

    #[error("key collision for {key} while appending {source} into {target}: divergent records")]
    KeyCollision {
        key: String,
        source: PathBuf,
        target: PathBuf,
    },

    #[error("{path} is not a strict ancestor of {child} (trash_with_root)")]
    MissingAncestor { path: PathBuf, child: PathBuf },

    #[error("move destination {0} already exists")]
    DestinationExists(PathBuf),

    #[error("argument error: {0}")]
    Argument(String),

    #[error("aborted by conflict resolver at {0}")]
    Aborted(PathBuf),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Io(a), Error::Io(b)) => a.kind() == b.kind(),
            (Error::Walkdir(_), Error::Walkdir(_)) => true,
            (Error::Glob(_), Error::Glob(_)) => true,
            (
                Error::MalformedStore { path: p1, .. },
                Error::MalformedStore { path: p2, .. },
            ) => p1 == p2,
            (
                Error::VersionInvariantViolation { path: p1, .. },
                Error::VersionInvariantViolation { path: p2, .. },
            ) => p1 == p2,
            (
                Error::KeyCollision { key: k1, .. },
                Error::KeyCollision { key: k2, .. },
            ) => k1 == k2,
            (
                Error::MissingAncestor { path: p1, child: c1 },
                Error::MissingAncestor { path: p2, child: c2 },
            ) => p1 == p2 && c1 == c2,
            (Error::DestinationExists(a), Error::DestinationExists(b)) => a == b,
            (Error::Argument(a), Error::Argument(b)) => a == b,
            (Error::Aborted(a), Error::Aborted(b)) => a == b,
            _ => false,
        }
    }
}
