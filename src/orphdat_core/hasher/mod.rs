//! Format-aware content digest (spec.md §4.4).

mod isobmff;
mod jpeg;
mod png;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::orphdat_core::error::Result;
use crate::orphdat_core::type_registry;

/// The current algorithm version stamped into every newly computed record.
pub const ALGORITHM_VERSION: u32 = 6;

/// The result of hashing a single media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashResult {
    pub version: u32,
    pub md5: String,
    pub full_md5: String,
}

/// Whether `version` is considered up-to-date for `mime`, per the table in
/// spec.md §4.4.3.
pub fn is_version_current(mime: &str, version: u32) -> bool {
    match mime {
        "image/heic" => version >= 6,
        "image/jpeg" => version >= 1,
        "video/mp4v-es" => version >= 2,
        "image/png" => version >= 3,
        "video/quicktime" => version >= 4,
        _ => true,
    }
}

/// Computes `HashResult { version, md5, full_md5 }` for the file at `path`.
///
/// Procedure (spec.md §4.4):
/// 1. Stream the whole file through MD5 to get `full_md5`.
/// 2. Rewind and dispatch to a format extractor by MIME; a failing
///    extractor degrades to `md5 = full_md5` (never propagates — see
///    `FormatError` in spec.md §7).
/// 3. Stamp `ALGORITHM_VERSION`.
pub fn hash(path: &Path) -> Result<HashResult> {
    let mut file = File::open(path)?;
    let full_md5 = full_file_md5(&mut file)?;

    file.seek(SeekFrom::Start(0))?;
    let mime = type_registry::mime(path);

    let md5 = match mime {
        "image/jpeg" => jpeg::content_md5(&mut file).unwrap_or_else(|e| {
            log::warn!("JPEG content extraction failed for {}: {e}", path.display());
            full_md5.clone()
        }),
        "image/png" => png::content_md5(&mut file).unwrap_or_else(|e| {
            log::warn!("PNG content extraction failed for {}: {e}", path.display());
            full_md5.clone()
        }),
        "video/mp4v-es" | "video/quicktime" | "image/heic" => {
            isobmff::content_md5(&mut file, mime).unwrap_or_else(|e| {
                log::warn!("ISOBMFF content extraction failed for {}: {e}", path.display());
                full_md5.clone()
            })
        }
        _ => full_md5.clone(),
    };

    debug_assert!(is_hex32(&md5));
    debug_assert!(is_hex32(&full_md5));

    Ok(HashResult { version: ALGORITHM_VERSION, md5, full_md5 })
}

fn full_file_md5(file: &mut File) -> Result<String> {
    let mut ctx = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(format!("{:x}", ctx.compute()))
}

fn is_hex32(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Read exactly `len` bytes from `reader` at the current position,
/// streaming them through `ctx`, in bounded chunks.
pub(crate) fn consume_exact(
    reader: &mut impl Read,
    ctx: &mut md5::Context,
    mut len: u64,
) -> std::io::Result<()> {
    let mut buf = [0u8; 64 * 1024];
    while len > 0 {
        let chunk = (buf.len() as u64).min(len) as usize;
        reader.read_exact(&mut buf[..chunk])?;
        ctx.consume(&buf[..chunk]);
        len -= chunk as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_format_falls_back_to_full_md5() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("clip.avi");
        std::fs::write(&path, b"some bytes").unwrap();
        let result = hash(&path).unwrap();
        assert_eq!(result.md5, result.full_md5);
        assert_eq!(result.version, ALGORITHM_VERSION);
    }

    #[test]
    fn test_full_md5_is_pure() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"content bytes").unwrap();
        drop(f);

        let r1 = hash(&path).unwrap();
        let r2 = hash(&path).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_is_version_current() {
        assert!(is_version_current("image/heic", 6));
        assert!(!is_version_current("image/heic", 5));
        assert!(is_version_current("image/jpeg", 1));
        assert!(is_version_current("audio/mpeg", 0));
    }
}
