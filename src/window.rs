//! The sliding output window: a circular buffer of recent output bytes,
//! doubling as both the back-reference history and the staging area for
//! bytes not yet handed to the caller.
//!
//! A true circular buffer addressed by index rather than a flat buffer with
//! a raw-pointer cursor memmove'd back after every flush — the shape a
//! genuinely resumable decoder needs, since the caller's output slice
//! arrives in arbitrary sizes and flushing cannot assume it drains the
//! whole pending region.

use crate::checksum::Checksum;

pub struct Window {
    buf: Vec<u8>,
    /// Next index to read from when flushing to the caller.
    read_ptr: usize,
    /// Next index to write the following output byte to.
    write_ptr: usize,
    /// Total bytes ever written into the window, used to bound
    /// back-reference distances (a session never looks back further than
    /// what it has actually produced).
    total_written: u64,
}

impl Window {
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0u8; size],
            read_ptr: 0,
            write_ptr: 0,
            total_written: 0,
        }
    }

    pub fn reset(&mut self) {
        self.read_ptr = 0;
        self.write_ptr = 0;
        self.total_written = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes staged in the window but not yet delivered to the caller.
    fn pending(&self) -> usize {
        if self.write_ptr >= self.read_ptr {
            self.write_ptr - self.read_ptr
        } else {
            self.buf.len() - self.read_ptr + self.write_ptr
        }
    }

    /// Slots that can be written before the window must be flushed.
    pub fn space_available(&self) -> usize {
        self.buf.len() - self.pending() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.read_ptr == self.write_ptr
    }

    pub fn write_byte(&mut self, byte: u8) {
        debug_assert!(self.space_available() > 0);
        self.buf[self.write_ptr] = byte;
        self.write_ptr = (self.write_ptr + 1) % self.buf.len();
        self.total_written += 1;
    }

    /// Realize a back-reference by copying `length` bytes from `distance`
    /// bytes behind the current write position. `distance` must already
    /// have been validated against `total_written`.
    pub fn copy_match(&mut self, distance: usize, length: usize) {
        debug_assert!(distance as u64 <= self.total_written);
        debug_assert!(self.space_available() >= length);
        let cap = self.buf.len();
        for _ in 0..length {
            let src = (self.write_ptr + cap - distance) % cap;
            let byte = self.buf[src];
            self.write_byte(byte);
        }
    }

    /// The farthest a back-reference may legally look back right now.
    pub fn max_back_reference(&self) -> u64 {
        self.total_written.min(self.buf.len() as u64)
    }

    /// Copy as much pending data as fits into `out`, updating the checksum
    /// over exactly the bytes delivered. Returns the number of bytes
    /// written to `out`.
    pub fn flush_to(&mut self, out: &mut [u8], checksum: &mut Option<Box<dyn Checksum>>) -> usize {
        let mut written = 0;
        let cap = self.buf.len();
        while written < out.len() && self.read_ptr != self.write_ptr {
            let run_end = if self.write_ptr > self.read_ptr {
                self.write_ptr
            } else {
                cap
            };
            let available = run_end - self.read_ptr;
            let take = available.min(out.len() - written);
            out[written..written + take].copy_from_slice(&self.buf[self.read_ptr..self.read_ptr + take]);
            if let Some(c) = checksum {
                c.update(&self.buf[self.read_ptr..self.read_ptr + take]);
            }
            self.read_ptr = (self.read_ptr + take) % cap;
            written += take;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_flush_roundtrips() {
        let mut w = Window::new(8);
        for b in b"abc" {
            w.write_byte(*b);
        }
        let mut out = [0u8; 8];
        let mut checksum = None;
        let n = w.flush_to(&mut out, &mut checksum);
        assert_eq!(&out[..n], b"abc");
        assert!(w.is_empty());
    }

    #[test]
    fn flush_respects_small_output_slices() {
        let mut w = Window::new(8);
        for b in b"abcd" {
            w.write_byte(*b);
        }
        let mut out = [0u8; 2];
        let mut checksum = None;
        let n = w.flush_to(&mut out, &mut checksum);
        assert_eq!(n, 2);
        assert_eq!(&out[..n], b"ab");
        assert!(!w.is_empty());
        let n2 = w.flush_to(&mut out, &mut checksum);
        assert_eq!(&out[..n2], b"cd");
        assert!(w.is_empty());
    }

    #[test]
    fn copy_match_repeats_recent_bytes() {
        let mut w = Window::new(16);
        for b in b"ab" {
            w.write_byte(*b);
        }
        w.copy_match(2, 4);
        let mut out = [0u8; 16];
        let mut checksum = None;
        let n = w.flush_to(&mut out, &mut checksum);
        assert_eq!(&out[..n], b"ababab");
    }

    #[test]
    fn wraps_around_capacity() {
        let mut w = Window::new(4);
        for b in b"ab" {
            w.write_byte(*b);
        }
        let mut out = [0u8; 4];
        let mut checksum = None;
        w.flush_to(&mut out, &mut checksum);
        for b in b"cde" {
            w.write_byte(*b);
        }
        let n = w.flush_to(&mut out, &mut checksum);
        assert_eq!(&out[..n], b"cde");
    }
}
