//! Pluggable checksum strategy, invoked over bytes as they are flushed from
//! the output window.

use std::hash::Hasher;

/// A running checksum over a byte stream delivered in order, incrementally.
pub trait Checksum: Send {
    fn update(&mut self, bytes: &[u8]);
    fn finish(&self) -> u32;
    /// Restore the running value to what a freshly constructed checksum
    /// would have (0 for Adler-32's multiplicative identity is handled
    /// internally; CRC-32 starts at 0 too).
    fn reset(&mut self);
}

/// Adler-32, used by zlib streams.
pub struct Adler32Checksum {
    hash: simd_adler32::Adler32,
}

impl Adler32Checksum {
    pub fn new() -> Self {
        Self {
            hash: simd_adler32::Adler32::new(),
        }
    }
}

impl Default for Adler32Checksum {
    fn default() -> Self {
        Self::new()
    }
}

impl Checksum for Adler32Checksum {
    fn update(&mut self, bytes: &[u8]) {
        self.hash.write(bytes);
    }

    fn finish(&self) -> u32 {
        self.hash.finish() as u32
    }

    fn reset(&mut self) {
        self.hash = simd_adler32::Adler32::new();
    }
}

/// CRC-32, used by gzip streams.
pub struct Crc32Checksum {
    hasher: crc32fast::Hasher,
}

impl Default for Crc32Checksum {
    fn default() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }
}

impl Crc32Checksum {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checksum for Crc32Checksum {
    fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    fn finish(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    fn reset(&mut self) {
        self.hasher = crc32fast::Hasher::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adler32_matches_known_vector() {
        let mut c = Adler32Checksum::new();
        c.update(b"Wikipedia");
        assert_eq!(c.finish(), 0x11E60398);
    }

    #[test]
    fn crc32_matches_known_vector() {
        let mut c = Crc32Checksum::new();
        c.update(b"123456789");
        assert_eq!(c.finish(), 0xCBF43926);
    }

    #[test]
    fn crc32_reset_matches_fresh_instance() {
        let mut a = Crc32Checksum::new();
        a.update(b"some bytes");
        a.reset();
        let b = Crc32Checksum::new();
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn adler32_reset_matches_fresh_instance() {
        let mut a = Adler32Checksum::new();
        a.update(b"some bytes");
        a.reset();
        let b = Adler32Checksum::new();
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn incremental_update_matches_single_call() {
        let mut a = Crc32Checksum::new();
        a.update(b"hello ");
        a.update(b"world");
        let mut b = Crc32Checksum::new();
        b.update(b"hello world");
        assert_eq!(a.finish(), b.finish());
    }
}
