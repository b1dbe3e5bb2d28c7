//! Caller-visible status and the richer data-error detail behind it.
//!
//! Distinguishes soft, resumable conditions (`NeedInput` / `NeedOutput`)
//! from the terminal ones, since a resumable session must keep telling them
//! apart call after call.

use std::fmt;

/// What exactly was wrong with a bitstream. Kept separate from `Status` so a
/// terminal `DataError` can carry detail without forcing every caller to
/// match on it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataErrorKind {
    InvalidBlockType,
    InvalidStoredLengths,
    TooManySymbols,
    InvalidLengthRepeat,
    IncompleteOrOverfullTree,
    InvalidBackReference,
    Container(ContainerErrorKind),
}

impl fmt::Display for DataErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErrorKind::InvalidBlockType => write!(f, "invalid block type (BTYPE=3)"),
            DataErrorKind::InvalidStoredLengths => {
                write!(f, "stored block LEN/NLEN mismatch")
            }
            DataErrorKind::TooManySymbols => write!(f, "HLIT/HDIST exceed the format's limit"),
            DataErrorKind::InvalidLengthRepeat => {
                write!(f, "invalid code-length repeat (16/17/18)")
            }
            DataErrorKind::IncompleteOrOverfullTree => {
                write!(f, "incomplete or over-subscribed Huffman tree")
            }
            DataErrorKind::InvalidBackReference => {
                write!(f, "back-reference distance exceeds emitted output")
            }
            DataErrorKind::Container(kind) => write!(f, "{kind}"),
        }
    }
}

/// Header/trailer errors specific to the gzip and zlib container wrappers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContainerErrorKind {
    BadMagic,
    UnsupportedMethod,
    ReservedFlagSet,
    PresetDictionaryUnsupported,
    HeaderChecksumMismatch,
    TrailerChecksumMismatch,
    TrailerLengthMismatch,
    Truncated,
}

impl fmt::Display for ContainerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerErrorKind::BadMagic => write!(f, "bad container magic bytes"),
            ContainerErrorKind::UnsupportedMethod => write!(f, "unsupported compression method"),
            ContainerErrorKind::ReservedFlagSet => write!(f, "reserved header flag bit set"),
            ContainerErrorKind::PresetDictionaryUnsupported => {
                write!(f, "preset dictionaries are not supported")
            }
            ContainerErrorKind::HeaderChecksumMismatch => write!(f, "header checksum mismatch"),
            ContainerErrorKind::TrailerChecksumMismatch => write!(f, "trailer checksum mismatch"),
            ContainerErrorKind::TrailerLengthMismatch => write!(f, "trailer ISIZE mismatch"),
            ContainerErrorKind::Truncated => write!(f, "container truncated"),
        }
    }
}

/// Status returned from every `Session::step` call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// The caller must supply more input and call again.
    NeedInput,
    /// The caller must drain `output` and call again.
    NeedOutput,
    /// The final block has been fully decoded and flushed.
    StreamEnd,
    /// The bitstream is corrupt; the session is now permanently in `InfError`.
    DataError(DataErrorKind),
    /// Allocation failure.
    MemError,
    /// Caller misuse (e.g. a zero-length window).
    StreamError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NeedInput => write!(f, "need more input"),
            Status::NeedOutput => write!(f, "need more output space"),
            Status::StreamEnd => write!(f, "stream end"),
            Status::DataError(kind) => write!(f, "data error: {kind}"),
            Status::MemError => write!(f, "memory error"),
            Status::StreamError => write!(f, "stream error"),
        }
    }
}

impl std::error::Error for Status {}
