//! ISOBMFF (MP4/MOV/HEIC) content extractor (spec.md §4.4.1).
//!
//! Top-level boxes are `size:u32 be, type:4 bytes ascii`; `size == 1` means
//! a 64-bit size follows immediately; `size == 0` means the box extends to
//! EOF. `ftyp`'s major brand is validated (with the `isom`+single-
//! compatible-brand substitution rule); MP4/MOV hash the first `mdat`
//! box's payload; HEIC follows `pitm` -> `iloc` to the primary item's byte
//! extents.

use std::io::{Read, Seek, SeekFrom};

use super::consume_exact;

const VALID_MAJOR_BRANDS: [&[u8; 4]; 4] = [b"mp41", b"mp42", b"qt  ", b"heic"];

struct BoxHeader {
    box_type: [u8; 4],
    payload_start: u64,
    payload_len: u64,
}

fn read_box_header(
    reader: &mut (impl Read + Seek),
    file_len: u64,
) -> std::io::Result<Option<BoxHeader>> {
    let start = reader.stream_position()?;
    if start >= file_len {
        return Ok(None);
    }

    let mut size_buf = [0u8; 4];
    match reader.read_exact(&mut size_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let mut box_type = [0u8; 4];
    reader.read_exact(&mut box_type)?;

    let size = u32::from_be_bytes(size_buf);
    let (header_len, total_size) = if size == 1 {
        let mut large = [0u8; 8];
        reader.read_exact(&mut large)?;
        (16u64, u64::from_be_bytes(large))
    } else if size == 0 {
        (8u64, file_len - start)
    } else {
        (8u64, size as u64)
    };

    if total_size < header_len {
        return Err(format_error("box size smaller than its own header"));
    }

    let payload_start = start + header_len;
    let payload_len = total_size - header_len;
    Ok(Some(BoxHeader { box_type, payload_start, payload_len }))
}

fn format_error(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}

/// Iterate sibling boxes in `[start, end)`, calling `f` with each header;
/// `f` returning `false` stops iteration early.
fn for_each_box(
    reader: &mut (impl Read + Seek),
    start: u64,
    end: u64,
    mut f: impl FnMut(&mut (dyn ReadSeek), &BoxHeader) -> std::io::Result<bool>,
) -> std::io::Result<()> {
    reader.seek(SeekFrom::Start(start))?;
    loop {
        let pos = reader.stream_position()?;
        if pos >= end {
            break;
        }
        let Some(header) = read_box_header(reader, end)? else { break };
        let next = header.payload_start + header.payload_len;
        let keep_going = f(reader as &mut dyn ReadSeek, &header)?;
        if !keep_going {
            break;
        }
        reader.seek(SeekFrom::Start(next))?;
    }
    Ok(())
}

trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

fn validate_ftyp(payload: &[u8]) -> std::io::Result<()> {
    if payload.len() < 8 {
        return Err(format_error("ftyp box too short"));
    }
    let major_brand: [u8; 4] = payload[0..4].try_into().unwrap();
    let compatible: Vec<[u8; 4]> = payload[8..]
        .chunks_exact(4)
        .map(|c| c.try_into().unwrap())
        .collect();

    let effective_brand = if &major_brand == b"isom" {
        let non_isom: Vec<&[u8; 4]> = compatible.iter().filter(|b| *b != b"isom").collect();
        if non_isom.len() == 1 { *non_isom[0] } else { major_brand }
    } else {
        major_brand
    };

    if VALID_MAJOR_BRANDS.iter().any(|b| **b == effective_brand) {
        Ok(())
    } else {
        Err(format_error(&format!(
            "unrecognized major brand {:?}",
            String::from_utf8_lossy(&effective_brand)
        )))
    }
}

fn file_len(reader: &mut (impl Read + Seek)) -> std::io::Result<u64> {
    let cur = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(cur))?;
    Ok(len)
}

pub fn content_md5(reader: &mut (impl Read + Seek), mime: &str) -> std::io::Result<String> {
    let len = file_len(reader)?;

    let mut ftyp_validated = false;
    let mut mdat: Option<(u64, u64)> = None;
    let mut meta: Option<(u64, u64)> = None;

    for_each_box(reader, 0, len, |r, header| {
        match &header.box_type {
            b"ftyp" => {
                let mut payload = vec![0u8; header.payload_len as usize];
                r.read_exact(&mut payload)?;
                validate_ftyp(&payload)?;
                ftyp_validated = true;
            }
            b"mdat" => {
                if mdat.is_none() {
                    mdat = Some((header.payload_start, header.payload_len));
                }
            }
            b"meta" => {
                if meta.is_none() {
                    meta = Some((header.payload_start, header.payload_len));
                }
            }
            _ => {}
        }
        Ok(true)
    })?;

    if !ftyp_validated {
        return Err(format_error("missing or invalid ftyp box"));
    }

    if mime == "image/heic" {
        let (meta_start, meta_len) = meta.ok_or_else(|| format_error("missing meta box"))?;
        return hash_heic_primary_item(reader, meta_start, meta_len);
    }

    let (mdat_start, mdat_len) = mdat.ok_or_else(|| format_error("missing mdat box"))?;
    reader.seek(SeekFrom::Start(mdat_start))?;
    let mut ctx = md5::Context::new();
    consume_exact(reader, &mut ctx, mdat_len)?;
    Ok(format!("{:x}", ctx.compute()))
}

/// `meta` is a FullBox (4-byte version+flags) wrapping ordinary child
/// boxes, so its children start 4 bytes into its payload.
fn hash_heic_primary_item(
    reader: &mut (impl Read + Seek),
    meta_start: u64,
    meta_len: u64,
) -> std::io::Result<String> {
    let children_start = meta_start + 4;
    let children_end = meta_start + meta_len;

    let mut primary_item_id: Option<u32> = None;
    let mut iloc: Option<(u64, u64)> = None;

    for_each_box(reader, children_start, children_end, |r, header| {
        match &header.box_type {
            b"pitm" => {
                let mut payload = vec![0u8; header.payload_len as usize];
                r.read_exact(&mut payload)?;
                primary_item_id = Some(parse_pitm(&payload)?);
            }
            b"iloc" => {
                iloc = Some((header.payload_start, header.payload_len));
            }
            _ => {}
        }
        Ok(true)
    })?;

    let primary_item_id = primary_item_id.ok_or_else(|| format_error("missing pitm box"))?;
    let (iloc_start, iloc_len) = iloc.ok_or_else(|| format_error("missing iloc box"))?;

    reader.seek(SeekFrom::Start(iloc_start))?;
    let mut payload = vec![0u8; iloc_len as usize];
    reader.read_exact(&mut payload)?;
    let extents = parse_iloc_extents(&payload, primary_item_id)?;

    let mut ctx = md5::Context::new();
    for (offset, length) in extents {
        reader.seek(SeekFrom::Start(offset))?;
        consume_exact(reader, &mut ctx, length)?;
    }
    Ok(format!("{:x}", ctx.compute()))
}

fn parse_pitm(payload: &[u8]) -> std::io::Result<u32> {
    if payload.len() < 4 {
        return Err(format_error("pitm box too short"));
    }
    let version = payload[0];
    if version == 0 {
        if payload.len() < 6 {
            return Err(format_error("pitm box too short"));
        }
        Ok(u16::from_be_bytes([payload[4], payload[5]]) as u32)
    } else {
        if payload.len() < 8 {
            return Err(format_error("pitm box too short"));
        }
        Ok(u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]))
    }
}

fn read_uint(buf: &[u8], pos: &mut usize, size: usize) -> std::io::Result<u64> {
    if size == 0 {
        return Ok(0);
    }
    if *pos + size > buf.len() {
        return Err(format_error("iloc box truncated"));
    }
    let mut value: u64 = 0;
    for b in &buf[*pos..*pos + size] {
        value = (value << 8) | (*b as u64);
    }
    *pos += size;
    Ok(value)
}

/// Parse the item location box and return `(offset, length)` extents, in
/// order, for the item whose ID matches `target_item_id`.
fn parse_iloc_extents(payload: &[u8], target_item_id: u32) -> std::io::Result<Vec<(u64, u64)>> {
    if payload.len() < 6 {
        return Err(format_error("iloc box too short"));
    }
    let version = payload[0];
    let offset_size = (payload[4] >> 4) as usize;
    let length_size = (payload[4] & 0x0F) as usize;
    let base_offset_size = (payload[5] >> 4) as usize;
    let index_size = (payload[5] & 0x0F) as usize;

    let mut pos = 6usize;
    let item_count = if version < 2 {
        let v = read_uint(payload, &mut pos, 2)?;
        v
    } else {
        read_uint(payload, &mut pos, 4)?
    };

    for _ in 0..item_count {
        let item_id = if version < 2 {
            read_uint(payload, &mut pos, 2)?
        } else {
            read_uint(payload, &mut pos, 4)?
        } as u32;

        if version == 1 || version == 2 {
            // construction_method: 12 reserved bits + 4-bit method, as u16.
            read_uint(payload, &mut pos, 2)?;
        }

        read_uint(payload, &mut pos, 2)?; // data_reference_index
        let base_offset = read_uint(payload, &mut pos, base_offset_size)?;
        let extent_count = read_uint(payload, &mut pos, 2)?;

        let mut extents = Vec::new();
        for _ in 0..extent_count {
            if (version == 1 || version == 2) && index_size > 0 {
                read_uint(payload, &mut pos, index_size)?; // extent_index, unused
            }
            let extent_offset = read_uint(payload, &mut pos, offset_size)?;
            let extent_length = read_uint(payload, &mut pos, length_size)?;
            extents.push((base_offset + extent_offset, extent_length));
        }

        if item_id == target_item_id {
            return Ok(extents);
        }
    }

    Err(format_error("primary item id not found in iloc"))
}
