//! The codes decoder: drives a single block's compressed body, turning
//! decoded literal/length/distance symbols into window writes.
//!
//! The literal-vs-match dispatch is its own small state machine rather than
//! inlined into a hot loop, so it can suspend between symbols instead of
//! assuming the window and input never run out mid-block.

use crate::constants::{DIST_BASE, DIST_EXTRA_BITS, LENGTH_BASE, LENGTH_EXTRA_BITS};
use crate::error::{DataErrorKind, Status};
use crate::trees::HuffmanTable;
use crate::{bitreader::BitReader, window::Window};

const END_OF_BLOCK: u16 = 256;

/// Work already decoded from the bitstream but not yet fully realized in
/// the window, because output space ran out mid-write. Resuming replays
/// this instead of re-decoding the symbol.
enum Pending {
    Literal(u8),
    Match { distance: usize, remaining: usize },
}

pub struct CodesDecoder {
    litlen: HuffmanTable,
    dist: HuffmanTable,
    pending: Option<Pending>,
}

impl CodesDecoder {
    pub fn new(litlen: HuffmanTable, dist: HuffmanTable) -> Self {
        Self {
            litlen,
            dist,
            pending: None,
        }
    }

    /// Decode as much of the block body as current input and output space
    /// allow. Returns `Status::StreamEnd` once the end-of-block symbol has
    /// been decoded (the window may still hold bytes from it, which the
    /// caller flushes separately).
    pub fn step(&mut self, bits: &mut BitReader, window: &mut Window) -> Status {
        loop {
            match self.pending.take() {
                Some(Pending::Literal(byte)) => {
                    if window.space_available() == 0 {
                        self.pending = Some(Pending::Literal(byte));
                        return Status::NeedOutput;
                    }
                    window.write_byte(byte);
                }
                Some(Pending::Match { distance, mut remaining }) => {
                    while remaining > 0 {
                        if window.space_available() == 0 {
                            self.pending = Some(Pending::Match { distance, remaining });
                            return Status::NeedOutput;
                        }
                        let chunk = remaining.min(window.space_available());
                        window.copy_match(distance, chunk);
                        remaining -= chunk;
                    }
                }
                None => {}
            }

            let symbol = match self.litlen.decode(bits) {
                Ok(s) => s,
                Err(status) => return status,
            };

            if symbol < 256 {
                if window.space_available() == 0 {
                    self.pending = Some(Pending::Literal(symbol as u8));
                    return Status::NeedOutput;
                }
                window.write_byte(symbol as u8);
                continue;
            }

            if symbol == END_OF_BLOCK {
                return Status::StreamEnd;
            }

            let len_idx = symbol as usize - 257;
            if len_idx >= LENGTH_BASE.len() {
                return Status::DataError(DataErrorKind::InvalidBackReference);
            }
            let extra_bits = LENGTH_EXTRA_BITS[len_idx] as u32;
            let extra = match bits.take_bits(extra_bits) {
                Ok(v) => v,
                Err(status) => return status,
            };
            let length = LENGTH_BASE[len_idx] as usize + extra as usize;

            let dist_symbol = match self.dist.decode(bits) {
                Ok(s) => s,
                Err(status) => return status,
            };
            let dist_idx = dist_symbol as usize;
            if dist_idx >= DIST_BASE.len() {
                return Status::DataError(DataErrorKind::InvalidBackReference);
            }
            let dist_extra_bits = DIST_EXTRA_BITS[dist_idx] as u32;
            let dist_extra = match bits.take_bits(dist_extra_bits) {
                Ok(v) => v,
                Err(status) => return status,
            };
            let distance = DIST_BASE[dist_idx] as usize + dist_extra as usize;

            if distance == 0 || distance as u64 > window.max_back_reference() {
                return Status::DataError(DataErrorKind::InvalidBackReference);
            }

            let mut remaining = length;
            while remaining > 0 {
                if window.space_available() == 0 {
                    self.pending = Some(Pending::Match { distance, remaining });
                    return Status::NeedOutput;
                }
                let chunk = remaining.min(window.space_available());
                window.copy_match(distance, chunk);
                remaining -= chunk;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trees::fixed_trees;

    #[test]
    fn decodes_literal_then_end_of_block() {
        let (litlen, dist) = fixed_trees();
        let mut decoder = CodesDecoder::new(litlen, dist);
        // Fixed code for 'a' (0x61) is 8 bits: 0x61 is in [144,255] range? no,
        // 'a'=97 is in [0,143] -> 8-bit code = 0x30 + symbol, MSB-first.
        // Simplest: build the bitstream for literal 'a' followed by EOB (256,
        // 7 bits) using the known fixed-code layout.
        // Literal 97: 8-bit code, value = 0x30 + 97 = 0x91, MSB-first bit order.
        // End-of-block 256: 7-bit code, value = 0x0000000, MSB-first.
        let mut bytes = Vec::new();
        let mut bitpos = 0u32;
        let mut acc = 0u32;
        let mut push_msb = |value: u32, len: u32, acc: &mut u32, bitpos: &mut u32, bytes: &mut Vec<u8>| {
            for i in (0..len).rev() {
                let bit = (value >> i) & 1;
                *acc |= bit << *bitpos;
                *bitpos += 1;
                if *bitpos == 8 {
                    bytes.push(*acc as u8);
                    *acc = 0;
                    *bitpos = 0;
                }
            }
        };
        push_msb(0x30 + 97, 8, &mut acc, &mut bitpos, &mut bytes);
        push_msb(0x0000000, 7, &mut acc, &mut bitpos, &mut bytes);
        if bitpos > 0 {
            bytes.push(acc as u8);
        }

        let mut bits = BitReader::new(&bytes);
        let mut window = Window::new(1 << 15);
        let status = decoder.step(&mut bits, &mut window);
        assert_eq!(status, Status::StreamEnd);
        let mut out = [0u8; 16];
        let mut checksum = None;
        let n = window.flush_to(&mut out, &mut checksum);
        assert_eq!(&out[..n], b"a");
    }
}
