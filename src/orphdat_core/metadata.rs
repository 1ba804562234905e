//! `MetadataExtractor` collaborator: consumed by the dedup/import verbs
//! (out of scope here, per spec.md §1), not by `HashEngine` itself. Kept as
//! a trait seam so a real tag extractor (e.g. shelling out to `exiftool`,
//! as the teacher's corpus does) can be plugged in without touching the
//! core.

use std::collections::HashMap;
use std::path::Path;

use crate::orphdat_core::error::Result;

pub trait MetadataExtractor {
    fn extract(&self, path: &Path, exclude_sidecars: bool) -> Result<HashMap<String, String>>;
}

/// A `MetadataExtractor` that never finds any tags. Used where the binary
/// needs a concrete collaborator but no verb in this crate's scope reads
/// its output yet.
pub struct NullMetadataExtractor;

impl MetadataExtractor for NullMetadataExtractor {
    fn extract(&self, _path: &Path, _exclude_sidecars: bool) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}
