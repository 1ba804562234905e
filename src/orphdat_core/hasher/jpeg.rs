//! JPEG content extractor: hashes everything from the Start-Of-Scan marker
//! to EOF, so metadata-only edits (APPn segments) do not change identity
//! (spec.md §4.4.1).

use std::io::{Read, Seek, SeekFrom};

const SOI: u16 = 0xFFD8;
const SOS: u16 = 0xFFDA;

pub fn content_md5(reader: &mut (impl Read + Seek)) -> std::io::Result<String> {
    let mut marker_buf = [0u8; 2];
    reader.read_exact(&mut marker_buf)?;
    let soi = u16::from_be_bytes(marker_buf);
    if soi != SOI {
        return Err(format_error("missing JPEG SOI marker"));
    }

    let mut ctx = md5::Context::new();

    loop {
        let mut header = [0u8; 4];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(format_error("EOF before SOS marker"));
            }
            Err(e) => return Err(e),
        }
        let tag = u16::from_be_bytes([header[0], header[1]]);
        let size = u16::from_be_bytes([header[2], header[3]]);

        if tag == SOS {
            let mut buf = [0u8; 64 * 1024];
            loop {
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                ctx.consume(&buf[..n]);
            }
            return Ok(format!("{:x}", ctx.compute()));
        }

        if size < 2 {
            return Err(format_error("marker segment length must be >= 2"));
        }
        reader.seek(SeekFrom::Current((size - 2) as i64))?;
    }
}

fn format_error(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn marker(tag: u16, payload: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&tag.to_be_bytes());
        v.extend_from_slice(&((payload.len() as u16) + 2).to_be_bytes());
        v.extend_from_slice(payload);
        v
    }

    fn build_jpeg(app1_payload: &[u8], scan_body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend(marker(0xFFE1, app1_payload));
        bytes.extend_from_slice(&[0xFF, 0xDA]);
        bytes.extend_from_slice(&[0x00, 0x02]); // SOS header length (no payload before scan)
        bytes.extend_from_slice(scan_body);
        bytes
    }

    #[test]
    fn test_metadata_only_edit_is_invisible() {
        let a = build_jpeg(b"exif one", b"scandata");
        let b = build_jpeg(b"exif two, longer payload", b"scandata");

        let md5_a = content_md5(&mut Cursor::new(a)).unwrap();
        let md5_b = content_md5(&mut Cursor::new(b)).unwrap();
        assert_eq!(md5_a, md5_b);
    }

    #[test]
    fn test_scan_body_change_changes_hash() {
        let a = build_jpeg(b"exif", b"scandata1");
        let b = build_jpeg(b"exif", b"scandata2");
        assert_ne!(
            content_md5(&mut Cursor::new(a)).unwrap(),
            content_md5(&mut Cursor::new(b)).unwrap()
        );
    }

    #[test]
    fn test_missing_soi_is_error() {
        let bytes = vec![0x00, 0x00, 0xFF, 0xDA];
        assert!(content_md5(&mut Cursor::new(bytes)).is_err());
    }
}
