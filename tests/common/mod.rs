use assert_fs::TempDir;
use assert_fs::fixture::ChildPath;
use assert_fs::prelude::PathChild;

/// A scratch directory with one JPEG written into it, ready for `orph`
/// subcommands to operate on.
pub fn dir_with_jpeg(temp_dir: &TempDir, name: &str) -> ChildPath {
    let child = temp_dir.child(name);
    std::fs::write(child.path(), jpeg_bytes(b"exif block one", b"scan body")).unwrap();
    child
}

/// A minimal well-formed JPEG: SOI, one APP1 marker carrying `app1_payload`,
/// then SOS followed by `scan_body` to EOF.
pub fn jpeg_bytes(app1_payload: &[u8], scan_body: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&[0xFF, 0xE1]);
    bytes.extend_from_slice(&((app1_payload.len() as u16) + 2).to_be_bytes());
    bytes.extend_from_slice(app1_payload);
    bytes.extend_from_slice(&[0xFF, 0xDA]);
    bytes.extend_from_slice(&[0x00, 0x02]);
    bytes.extend_from_slice(scan_body);
    bytes
}
