//! A resumable, block-level DEFLATE (RFC 1951) decoder.
//!
//! [`Session`] is the core: feed it input bytes and an output slice, call
//! [`Session::step`] repeatedly, and it decodes one DEFLATE stream block by
//! block, suspending cleanly whenever input or output space runs out. The
//! [`gzip`] and [`zlib`] modules are thin, optional container readers built
//! on top of one `Session` for callers who just want to decompress a
//! complete in-memory buffer.

pub mod bitreader;
pub mod checksum;
pub mod codes;
pub mod constants;
pub mod error;
pub mod gzip;
pub mod session;
pub mod trees;
pub mod window;
pub mod zlib;

pub use checksum::{Adler32Checksum, Checksum, Crc32Checksum};
pub use error::{ContainerErrorKind, DataErrorKind, Status};
pub use session::Session;
