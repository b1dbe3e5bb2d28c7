//! Thin zlib container reader: header/trailer framing around one `Session`.
//!
//! Validates CMF/FLG the way RFC 1950 specifies (CM, CINFO, FCHECK, FDICT),
//! then drives a resumable `Session` rather than doing a full-buffer
//! one-shot decode.

use log::warn;

use crate::checksum::Adler32Checksum;
use crate::error::{ContainerErrorKind, DataErrorKind, Status};
use crate::session::Session;

const ZLIB_CM_DEFLATE: u8 = 8;

/// Decompress a complete, in-memory zlib stream.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DataErrorKind> {
    if input.len() < 2 {
        return Err(DataErrorKind::Container(ContainerErrorKind::Truncated));
    }
    let cmf = input[0];
    let flg = input[1];

    let cm = cmf & 0x0F;
    let cinfo = cmf >> 4;
    if cm != ZLIB_CM_DEFLATE {
        return Err(DataErrorKind::Container(
            ContainerErrorKind::UnsupportedMethod,
        ));
    }
    if cinfo > 7 {
        return Err(DataErrorKind::Container(
            ContainerErrorKind::UnsupportedMethod,
        ));
    }
    if (u16::from(cmf) * 256 + u16::from(flg)) % 31 != 0 {
        return Err(DataErrorKind::Container(ContainerErrorKind::BadMagic));
    }
    let fdict = (flg >> 5) & 1;
    if fdict != 0 {
        return Err(DataErrorKind::Container(
            ContainerErrorKind::PresetDictionaryUnsupported,
        ));
    }

    let mut session = Session::new(1 << 15, Some(Box::new(Adler32Checksum::new())))
        .map_err(|_| DataErrorKind::Container(ContainerErrorKind::Truncated))?;

    let mut out = Vec::new();
    let mut scratch = [0u8; 8192];
    let mut cursor = 2usize;

    let trailer_start = loop {
        let (consumed, produced, status) = session.step(&input[cursor..], &mut scratch);
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
        .get(trailer_start..trailer_start + 4)
        .ok_or(DataErrorKind::Container(ContainerErrorKind::Truncated))?;
    let stored_adler = u32::from_be_bytes(trailer.try_into().unwrap());
    let actual_adler = session.checksum();
    if actual_adler != stored_adler {
        warn!(
            "zlib trailer Adler-32 mismatch: stored {stored_adler:#010x}, computed {actual_adler:#010x}"
        );
        return Err(DataErrorKind::Container(
            ContainerErrorKind::TrailerChecksumMismatch,
        ));
    }

    Ok(out)
}
