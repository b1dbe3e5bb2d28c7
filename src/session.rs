//! The resumable block-level decoder.
//!
//! The state machine below follows zlib's classic `inflate_blocks()` shape:
//! the same states (`TYPE`, `LENS`, `STORED`, `TABLE`, `BTREE`, `DTREE`,
//! `CODES`, `DRY`, `DONE`), the same fallthrough between them within one
//! call when enough input is present, and the same commit-locals-before-
//! suspend discipline. Where a C implementation spills `bitbuf`/`bitsleft`/
//! pointers into local variables via `LOAD`/`UPDATE` macros, this keeps them
//! in a `BitReader` constructed fresh at the top of `step` and consumed back
//! into `self` at every return. Tree building and code decoding live in
//! their own modules rather than being inlined into one function.

use crate::checksum::Checksum;
use crate::codes::CodesDecoder;
use crate::constants::META_SYMBOL_ORDER;
use crate::error::{DataErrorKind, Status};
use crate::trees::{build_bit_length_tree, build_literal_distance_trees, fixed_trees, HuffmanTable};
use crate::{bitreader::BitReader, window::Window};

/// Resumption token: exactly which step of the block-level grammar the
/// session is in the middle of.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Type,
    Lens,
    Stored,
    Table,
    Btree,
    Dtree,
    Codes,
    Dry,
    Done,
    InfError,
}

/// Fields live only while decoding a dynamic block's header: the code
/// lengths for the meta-alphabet and, once that's built, for the literal
/// and distance alphabets.
struct TreeContext {
    hlit: usize,
    hdist: usize,
    hclen: usize,
    /// `258 + hlit + hdist` lengths once meta decoding starts; the first 19
    /// slots double as the meta-alphabet's own lengths while `mode ==
    /// Btree`.
    lengths: Vec<u8>,
    cursor: usize,
    meta_tree: Option<HuffmanTable>,
}

impl TreeContext {
    fn target_len(&self) -> usize {
        258 + self.hlit + self.hdist
    }
}

pub struct Session {
    window: Window,
    mode: Mode,
    last_block: bool,
    checksum: Option<Box<dyn Checksum>>,
    tree_ctx: Option<TreeContext>,
    codes: Option<CodesDecoder>,
    stored_remaining: u16,
    bit_buffer: u64,
    bit_count: u32,
    fixed_trees: Option<(HuffmanTable, HuffmanTable)>,
    error_kind: Option<DataErrorKind>,
}

impl Session {
    pub fn new(window_size: usize, checksum: Option<Box<dyn Checksum>>) -> Result<Self, Status> {
        if window_size == 0 {
            return Err(Status::StreamError);
        }
        Ok(Self {
            window: Window::new(window_size),
            mode: Mode::Type,
            last_block: false,
            checksum,
            tree_ctx: None,
            codes: None,
            stored_remaining: 0,
            bit_buffer: 0,
            bit_count: 0,
            fixed_trees: None,
            error_kind: None,
        })
    }

    pub fn reset(&mut self) {
        self.window.reset();
        self.mode = Mode::Type;
        self.last_block = false;
        self.tree_ctx = None;
        self.codes = None;
        self.stored_remaining = 0;
        self.bit_buffer = 0;
        self.bit_count = 0;
        self.fixed_trees = None;
        self.error_kind = None;
        if let Some(checksum) = self.checksum.as_mut() {
            checksum.reset();
        }
    }

    pub fn checksum(&self) -> u32 {
        self.checksum.as_ref().map_or(0, |c| c.finish())
    }

    /// Consumes the session, returning the final checksum. Mirrors the
    /// shape of the C API's `session_free`, though `Drop` alone would
    /// release every resource here.
    pub fn finish(self) -> u32 {
        self.checksum()
    }

    /// Advance the state machine as far as `input` and `output` allow.
    /// Returns how many input bytes were consumed, how many output bytes
    /// were produced, and the resulting status.
    pub fn step(&mut self, input: &[u8], output: &mut [u8]) -> (usize, usize, Status) {
        if self.mode == Mode::InfError {
            // Even in the terminal error mode, bytes decoded up to the
            // offending construct may still be sitting in the window from
            // the call that first hit the error (or from a prior call that
            // didn't have enough output space to drain them). Keep handing
            // those out rather than losing them.
            let out_written = self.window.flush_to(output, &mut self.checksum);
            return (0, out_written, Status::DataError(self.current_error_kind()));
        }

        let mut bits = BitReader::resume(input, self.bit_buffer, self.bit_count);
        let mut out_written = 0usize;

        let status = loop {
            // Drain the window into the caller's buffer whenever it holds
            // anything, regardless of mode, so output flows as early as
            // possible.
            if !self.window.is_empty() && out_written < output.len() {
                out_written +=
                    self.window
                        .flush_to(&mut output[out_written..], &mut self.checksum);
            }

            match self.mode {
                Mode::Type => match self.step_type(&mut bits) {
                    Ok(()) => continue,
                    Err(status) => break status,
                },
                Mode::Lens => match self.step_lens(&mut bits) {
                    Ok(()) => continue,
                    Err(status) => break status,
                },
                Mode::Stored => match self.step_stored(&mut bits) {
                    Ok(()) => continue,
                    Err(status) => break status,
                },
                Mode::Table => match self.step_table(&mut bits) {
                    Ok(()) => continue,
                    Err(status) => break status,
                },
                Mode::Btree => match self.step_btree(&mut bits) {
                    Ok(()) => continue,
                    Err(status) => break status,
                },
                Mode::Dtree => match self.step_dtree(&mut bits) {
                    Ok(()) => continue,
                    Err(status) => break status,
                },
                Mode::Codes => match self.step_codes(&mut bits) {
                    Ok(()) => continue,
                    Err(status) => break status,
                },
                Mode::Dry => {
                    if !self.window.is_empty() {
                        if out_written >= output.len() {
                            break Status::NeedOutput;
                        }
                        out_written += self
                            .window
                            .flush_to(&mut output[out_written..], &mut self.checksum);
                        if !self.window.is_empty() {
                            break Status::NeedOutput;
                        }
                    }
                    self.mode = Mode::Done;
                    continue;
                }
                Mode::Done => break Status::StreamEnd,
                Mode::InfError => break Status::DataError(self.current_error_kind()),
            }
        };

        // A sub-state can write its last bytes into the window in the very
        // iteration that then breaks out of the loop (a literal decoded
        // just before a data error, say), too late for the top-of-loop
        // flush to have seen them. Give the window one more chance to
        // drain into `output` before reporting any status, so a data error
        // still surfaces every byte decoded up to the offending construct
        // instead of discarding them.
        if !self.window.is_empty() && out_written < output.len() {
            out_written += self
                .window
                .flush_to(&mut output[out_written..], &mut self.checksum);
        }

        if let Status::DataError(kind) = status {
            self.mode = Mode::InfError;
            self.error_kind = Some(kind);
        }

        self.bit_buffer = bits.bit_buffer();
        self.bit_count = bits.bit_count();
        let consumed = bits.consumed();
        (consumed, out_written, status)
    }

    /// The data-error detail recorded when the session entered `InfError`.
    /// Always `Some` by the time `mode == InfError`; the fallback only
    /// guards against a `Session` reaching that mode some other way.
    fn current_error_kind(&self) -> DataErrorKind {
        self.error_kind.unwrap_or(DataErrorKind::InvalidBlockType)
    }

    fn step_type(&mut self, bits: &mut BitReader) -> Result<(), Status> {
        let header = bits.take_bits(3)?;
        self.last_block = header & 1 != 0;
        let btype = (header >> 1) & 0b11;
        match btype {
            0b00 => {
                bits.align_to_byte();
                self.mode = Mode::Lens;
            }
            0b01 => {
                let (litlen, dist) = self.get_or_build_fixed_trees();
                self.codes = Some(CodesDecoder::new(litlen, dist));
                self.mode = Mode::Codes;
            }
            0b10 => {
                self.mode = Mode::Table;
            }
            _ => {
                return Err(Status::DataError(DataErrorKind::InvalidBlockType));
            }
        }
        Ok(())
    }

    fn get_or_build_fixed_trees(&mut self) -> (HuffmanTable, HuffmanTable) {
        if self.fixed_trees.is_none() {
            self.fixed_trees = Some(fixed_trees());
        }
        self.fixed_trees.clone().expect("just populated above")
    }

    fn step_lens(&mut self, bits: &mut BitReader) -> Result<(), Status> {
        let word = bits.take_bits(32)?;
        let len = (word & 0xFFFF) as u16;
        let nlen = ((word >> 16) & 0xFFFF) as u16;
        if nlen != !len {
            return Err(Status::DataError(DataErrorKind::InvalidStoredLengths));
        }
        self.stored_remaining = len;
        self.mode = if len == 0 {
            if self.last_block {
                Mode::Dry
            } else {
                Mode::Type
            }
        } else {
            Mode::Stored
        };
        Ok(())
    }

    fn step_stored(&mut self, bits: &mut BitReader) -> Result<(), Status> {
        while self.stored_remaining > 0 {
            if self.window.space_available() == 0 {
                return Err(Status::NeedOutput);
            }
            let byte = bits.take_bits(8)? as u8;
            self.window.write_byte(byte);
            self.stored_remaining -= 1;
        }
        self.mode = if self.last_block { Mode::Dry } else { Mode::Type };
        Ok(())
    }

    fn step_table(&mut self, bits: &mut BitReader) -> Result<(), Status> {
        let header = bits.take_bits(14)?;
        let hlit = (header & 0x1F) as usize;
        let hdist = ((header >> 5) & 0x1F) as usize;
        let hclen = ((header >> 10) & 0x0F) as usize;
        if hlit > 29 || hdist > 29 {
            return Err(Status::DataError(DataErrorKind::TooManySymbols));
        }
        let target = 258 + hlit + hdist;
        self.tree_ctx = Some(TreeContext {
            hlit,
            hdist,
            hclen,
            lengths: vec![0u8; target.max(19)],
            cursor: 0,
            meta_tree: None,
        });
        self.mode = Mode::Btree;
        Ok(())
    }

    fn step_btree(&mut self, bits: &mut BitReader) -> Result<(), Status> {
        let ctx = self.tree_ctx.as_mut().expect("Btree mode without context");
        while ctx.cursor < ctx.hclen + 4 {
            let value = bits.take_bits(3)? as u8;
            let slot = META_SYMBOL_ORDER[ctx.cursor] as usize;
            ctx.lengths[slot] = value;
            ctx.cursor += 1;
        }
        for i in ctx.hclen + 4..19 {
            ctx.lengths[META_SYMBOL_ORDER[i] as usize] = 0;
        }
        let meta_tree = build_bit_length_tree(&ctx.lengths[..19])
            .map_err(Status::DataError)?;
        ctx.meta_tree = Some(meta_tree);
        ctx.cursor = 0;
        self.mode = Mode::Dtree;
        Ok(())
    }

    fn step_dtree(&mut self, bits: &mut BitReader) -> Result<(), Status> {
        let ctx = self.tree_ctx.as_mut().expect("Dtree mode without context");
        let target = ctx.target_len();
        while ctx.cursor < target {
            let meta_tree = ctx.meta_tree.as_ref().expect("meta tree built in Btree");
            let symbol = meta_tree.decode(bits)?;
            match symbol {
                0..=15 => {
                    ctx.lengths[ctx.cursor] = symbol as u8;
                    ctx.cursor += 1;
                }
                16 => {
                    if ctx.cursor == 0 {
                        return Err(Status::DataError(DataErrorKind::InvalidLengthRepeat));
                    }
                    let extra = bits.take_bits(2)?;
                    let repeat = 3 + extra as usize;
                    if ctx.cursor + repeat > target {
                        return Err(Status::DataError(DataErrorKind::InvalidLengthRepeat));
                    }
                    let prev = ctx.lengths[ctx.cursor - 1];
                    for _ in 0..repeat {
                        ctx.lengths[ctx.cursor] = prev;
                        ctx.cursor += 1;
                    }
                }
                17 => {
                    let extra = bits.take_bits(3)?;
                    let repeat = 3 + extra as usize;
                    if ctx.cursor + repeat > target {
                        return Err(Status::DataError(DataErrorKind::InvalidLengthRepeat));
                    }
                    ctx.cursor += repeat;
                }
                18 => {
                    let extra = bits.take_bits(7)?;
                    let repeat = 11 + extra as usize;
                    if ctx.cursor + repeat > target {
                        return Err(Status::DataError(DataErrorKind::InvalidLengthRepeat));
                    }
                    ctx.cursor += repeat;
                }
                _ => unreachable!("meta alphabet only emits 0..=18"),
            }
        }

        let ctx = self.tree_ctx.take().expect("Dtree context present");
        let litlen_count = 257 + ctx.hlit;
        let (litlen, dist) =
            build_literal_distance_trees(&ctx.lengths, litlen_count).map_err(Status::DataError)?;
        self.codes = Some(CodesDecoder::new(litlen, dist));
        self.mode = Mode::Codes;
        Ok(())
    }

    fn step_codes(&mut self, bits: &mut BitReader) -> Result<(), Status> {
        let codes = self.codes.as_mut().expect("Codes mode without decoder");
        match codes.step(bits, &mut self.window) {
            Status::StreamEnd => {
                self.codes = None;
                if self.last_block {
                    bits.return_unused_byte();
                    self.mode = Mode::Dry;
                } else {
                    self.mode = Mode::Type;
                }
                Ok(())
            }
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Crc32Checksum;

    #[test]
    fn inf_error_persists_the_specific_kind_across_calls() {
        let mut session = Session::new(1 << 15, None).unwrap();
        // BFINAL=1, BTYPE=11 (reserved).
        let (_, _, first) = session.step(&[0x07], &mut []);
        assert_eq!(
            first,
            Status::DataError(DataErrorKind::InvalidBlockType)
        );
        let (consumed, produced, second) = session.step(&[0xFF; 4], &mut [0u8; 4]);
        assert_eq!(second, Status::DataError(DataErrorKind::InvalidBlockType));
        assert_eq!((consumed, produced), (0, 0));
    }

    #[test]
    fn data_error_still_flushes_bytes_decoded_before_it() {
        let mut session = Session::new(1 << 15, None).unwrap();
        // Fixed-Huffman block: literal 'a', then a length/distance pair whose
        // distance (2) exceeds the single byte emitted so far -- an invalid
        // back-reference, flagged only after 'a' is already in the window.
        let input = [0x4B, 0x04, 0x42];
        let mut out = [0u8; 4];
        let (_, produced, status) = session.step(&input, &mut out);
        assert_eq!(status, Status::DataError(DataErrorKind::InvalidBackReference));
        assert_eq!(&out[..produced], b"a");

        // Once in InfError, further calls keep surfacing the error without
        // losing any more bytes (there are none left to lose here, but the
        // call must not panic or silently drop the already-reported status).
        let (consumed2, produced2, status2) = session.step(&[], &mut out);
        assert_eq!(consumed2, 0);
        assert_eq!(produced2, 0);
        assert_eq!(
            status2,
            Status::DataError(DataErrorKind::InvalidBackReference)
        );
    }

    #[test]
    fn reset_zeroes_the_checksum() {
        let mut session = Session::new(1 << 15, Some(Box::new(Crc32Checksum::new()))).unwrap();
        let mut input = vec![0x01]; // BFINAL=1, BTYPE=00
        let payload = b"abc";
        input.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        input.extend_from_slice(&(!(payload.len() as u16)).to_le_bytes());
        input.extend_from_slice(payload);

        let mut out = [0u8; 16];
        let (_, _, status) = session.step(&input, &mut out);
        assert_eq!(status, Status::StreamEnd);
        assert_ne!(session.checksum(), 0);

        session.reset();
        assert_eq!(session.checksum(), 0);
    }
}
