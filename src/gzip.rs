//! Thin gzip container reader: header/trailer framing around one `Session`.
//!
//! Field order, flag-bit layout, and the order in which optional fields are
//! skipped all follow RFC 1952 directly. Driven through repeated
//! `Session::step` calls rather than a one-shot full-buffer parse, so a
//! truncated input simply reports `Status::NeedInput` instead of indexing
//! past the end of a slice.

use log::{debug, warn};

use crate::checksum::Crc32Checksum;
use crate::error::{ContainerErrorKind, DataErrorKind, Status};
use crate::session::Session;

const GZIP_ID1: u8 = 0x1f;
const GZIP_ID2: u8 = 0x8b;
const GZIP_CM_DEFLATE: u8 = 8;

const GZIP_FHCRC: u8 = 1 << 1;
const GZIP_FEXTRA: u8 = 1 << 2;
const GZIP_FNAME: u8 = 1 << 3;
const GZIP_FCOMMENT: u8 = 1 << 4;
const GZIP_FRESERVED: u8 = 0b1110_0000;

/// Parse a gzip header starting at `input[0]`, returning the byte offset of
/// the embedded DEFLATE stream.
fn parse_header(input: &[u8]) -> Result<usize, DataErrorKind> {
    if input.len() < 10 {
        return Err(DataErrorKind::Container(ContainerErrorKind::Truncated));
    }
    if input[0] != GZIP_ID1 || input[1] != GZIP_ID2 {
        return Err(DataErrorKind::Container(ContainerErrorKind::BadMagic));
    }
    if input[2] != GZIP_CM_DEFLATE {
        return Err(DataErrorKind::Container(
            ContainerErrorKind::UnsupportedMethod,
        ));
    }
    let flg = input[3];
    if flg & GZIP_FRESERVED != 0 {
        return Err(DataErrorKind::Container(
            ContainerErrorKind::ReservedFlagSet,
        ));
    }

    // MTIME (4 bytes), XFL (1 byte), OS (1 byte).
    let mut pos = 10usize;

    if flg & GZIP_FEXTRA != 0 {
        let xlen_bytes = input
            .get(pos..pos + 2)
            .ok_or(DataErrorKind::Container(ContainerErrorKind::Truncated))?;
        let xlen = u16::from_le_bytes([xlen_bytes[0], xlen_bytes[1]]) as usize;
        pos += 2 + xlen;
        if pos > input.len() {
            return Err(DataErrorKind::Container(ContainerErrorKind::Truncated));
        }
    }

    if flg & GZIP_FNAME != 0 {
        pos = skip_cstring(input, pos)?;
    }

    if flg & GZIP_FCOMMENT != 0 {
        pos = skip_cstring(input, pos)?;
    }

    if flg & GZIP_FHCRC != 0 {
        pos = pos
            .checked_add(2)
            .ok_or(DataErrorKind::Container(ContainerErrorKind::Truncated))?;
        if pos > input.len() {
            return Err(DataErrorKind::Container(ContainerErrorKind::Truncated));
        }
    }

    debug!("gzip header parsed, deflate stream starts at byte {pos}");
    Ok(pos)
}

fn skip_cstring(input: &[u8], start: usize) -> Result<usize, DataErrorKind> {
    let rest = input
        .get(start..)
        .ok_or(DataErrorKind::Container(ContainerErrorKind::Truncated))?;
    let nul = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or(DataErrorKind::Container(ContainerErrorKind::Truncated))?;
    Ok(start + nul + 1)
}

/// Decompress a complete, in-memory gzip member. A member is exactly one
/// DEFLATE stream; trailing bytes after the CRC32/ISIZE trailer (e.g. a
/// second concatenated member) are left unread.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DataErrorKind> {
    let body_start = parse_header(input)?;

    let mut session = Session::new(1 << 15, Some(Box::new(Crc32Checksum::new())))
        .map_err(|_| DataErrorKind::Container(ContainerErrorKind::Truncated))?;

    let mut out = Vec::new();
    let mut scratch = [0u8; 8192];
    let mut cursor = body_start;

    let trailer_start = loop {
        let (consumed, produced, status) =
            session.step(&input[cursor..], &mut scratch);
        cursor += consumed;
        out.extend_from_slice(&scratch[..produced]);
        match status {
            Status::NeedOutput => continue,
            Status::NeedInput => {
                return Err(DataErrorKind::Container(ContainerErrorKind::Truncated));
            }
            Status::StreamEnd => break cursor,
            Status::DataError(kind) => return Err(kind),
            Status::MemError | Status::StreamError => {
                return Err(DataErrorKind::Container(ContainerErrorKind::Truncated));
            }
        }
    };

    let trailer = input
        .get(trailer_start..trailer_start + 8)
        .ok_or(DataErrorKind::Container(ContainerErrorKind::Truncated))?;
    let stored_crc = u32::from_le_bytes(trailer[0..4].try_into().unwrap());
    let stored_isize = u32::from_le_bytes(trailer[4..8].try_into().unwrap());

    let actual_crc = session.checksum();
    if actual_crc != stored_crc {
        warn!("gzip trailer CRC32 mismatch: stored {stored_crc:#010x}, computed {actual_crc:#010x}");
        return Err(DataErrorKind::Container(
            ContainerErrorKind::TrailerChecksumMismatch,
        ));
    }
    if out.len() as u32 != stored_isize {
        return Err(DataErrorKind::Container(
            ContainerErrorKind::TrailerLengthMismatch,
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(deflate_body: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut v = vec![GZIP_ID1, GZIP_ID2, GZIP_CM_DEFLATE, 0, 0, 0, 0, 0, 0, 0xff];
        v.extend_from_slice(deflate_body);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(payload);
        v.extend_from_slice(&hasher.finalize().to_le_bytes());
        v.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        v
    }

    #[test]
    fn decompresses_empty_stored_block() {
        let gz = wrap(&[0x03, 0x00], b"");
        assert_eq!(decompress(&gz).unwrap(), b"");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut gz = wrap(&[0x03, 0x00], b"");
        gz[0] = 0x00;
        assert_eq!(
            decompress(&gz),
            Err(DataErrorKind::Container(ContainerErrorKind::BadMagic))
        );
    }

    #[test]
    fn skips_fname_field() {
        let mut v = vec![GZIP_ID1, GZIP_ID2, GZIP_CM_DEFLATE, GZIP_FNAME, 0, 0, 0, 0, 0, 0xff];
        v.extend_from_slice(b"hello.txt\0");
        v.extend_from_slice(&[0x03, 0x00]);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(b"");
        v.extend_from_slice(&hasher.finalize().to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(decompress(&v).unwrap(), b"");
    }

    #[test]
    fn rejects_crc_mismatch() {
        let mut gz = wrap(&[0x03, 0x00], b"");
        let bad = gz.len() - 8;
        gz[bad] ^= 0xff;
        assert_eq!(
            decompress(&gz),
            Err(DataErrorKind::Container(
                ContainerErrorKind::TrailerChecksumMismatch
            ))
        );
    }
}
