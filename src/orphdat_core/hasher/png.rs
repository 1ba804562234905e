//! PNG content extractor: hashes every chunk's type and data except the
//! text-carrying chunk types, so a changed `tEXt`/`zTXt`/`iTXt` comment
//! does not change identity (spec.md §4.4.1).

use std::io::{Read, Seek, SeekFrom};

use super::consume_exact;

const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const TEXT_CHUNK_TYPES: [&[u8; 4]; 3] = [b"tEXt", b"zTXt", b"iTXt"];

pub fn content_md5(reader: &mut (impl Read + Seek)) -> std::io::Result<String> {
    let mut sig = [0u8; 8];
    reader.read_exact(&mut sig)?;
    if sig != SIGNATURE {
        return Err(format_error("missing PNG signature"));
    }

    let mut ctx = md5::Context::new();

    loop {
        let mut size_buf = [0u8; 4];
        match reader.read_exact(&mut size_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
        let size = u32::from_be_bytes(size_buf);

        let mut chunk_type = [0u8; 4];
        reader.read_exact(&mut chunk_type)?;

        let is_text = TEXT_CHUNK_TYPES.iter().any(|t| **t == chunk_type);
        if !is_text {
            ctx.consume(&chunk_type);
            consume_exact(reader, &mut ctx, size as u64)?;
        } else {
            reader.seek(SeekFrom::Current(size as i64))?;
        }

        // Always seek past the trailing CRC (4 bytes).
        reader.seek(SeekFrom::Current(4))?;
    }

    Ok(format!("{:x}", ctx.compute()))
}

fn format_error(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        out.extend_from_slice(&[0, 0, 0, 0]); // fake CRC, unchecked
        out
    }

    fn build_png(text_value: &[u8]) -> Vec<u8> {
        let mut bytes = SIGNATURE.to_vec();
        bytes.extend(chunk(b"IHDR", b"fake header"));
        bytes.extend(chunk(b"IDAT", b"pixel data"));
        bytes.extend(chunk(b"tEXt", text_value));
        bytes.extend(chunk(b"IEND", b""));
        bytes
    }

    #[test]
    fn test_text_chunks_are_invisible() {
        let a = build_png(b"author=foo");
        let b = build_png(b"author=bar, much longer value here");
        assert_eq!(
            content_md5(&mut Cursor::new(a)).unwrap(),
            content_md5(&mut Cursor::new(b)).unwrap()
        );
    }

    #[test]
    fn test_idat_change_changes_hash() {
        let mut a = SIGNATURE.to_vec();
        a.extend(chunk(b"IHDR", b"h"));
        a.extend(chunk(b"IDAT", b"one"));
        a.extend(chunk(b"IEND", b""));

        let mut b = SIGNATURE.to_vec();
        b.extend(chunk(b"IHDR", b"h"));
        b.extend(chunk(b"IDAT", b"two"));
        b.extend(chunk(b"IEND", b""));

        assert_ne!(
            content_md5(&mut Cursor::new(a)).unwrap(),
            content_md5(&mut Cursor::new(b)).unwrap()
        );
    }

    #[test]
    fn test_missing_signature_is_error() {
        let bytes = vec![0u8; 8];
        assert!(content_md5(&mut Cursor::new(bytes)).is_err());
    }
}
