use font_types::Tag;
use thiserror::Error;

/// Everything that can go wrong while converting between SFNT and the
/// WOFF containers.
///
/// All errors are fatal to the current conversion; there is no partial
/// output and no retry.
#[derive(Error, Debug)]
pub enum Error {
    /// The first four bytes of the input are not a recognized container
    /// signature.
    #[error("bad container signature 0x{found:08X}")]
    BadSignature { found: u32 },

    /// A bounds check against the input failed.
    #[error("unexpected end of input while reading {context}")]
    Truncated { context: &'static str },

    /// The table directory is structurally invalid.
    #[error("invalid table directory: {reason}")]
    BadDirectory { reason: &'static str },

    /// A table transform (or its inverse) cannot be applied.
    #[error("invalid '{tag}' transform: {reason}")]
    BadTransform { tag: Tag, reason: String },

    /// The Brotli codec reported an error or produced the wrong amount
    /// of data.
    #[error("brotli codec failed")]
    BrotliFailed,

    /// The zlib codec reported an error or produced the wrong amount of
    /// data.
    #[error("zlib codec failed")]
    DeflateFailed,

    /// The input SFNT handed to an encoder is not usable.
    #[error("invalid sfnt: {reason}")]
    SfntInvalid { reason: &'static str },
}

impl Error {
    pub(crate) fn bad_transform(tag: Tag, reason: impl Into<String>) -> Self {
        Self::BadTransform {
            tag,
            reason: reason.into(),
        }
    }
}

impl From<bytes::TryGetError> for Error {
    fn from(_value: bytes::TryGetError) -> Self {
        Self::Truncated {
            context: "fixed-width field",
        }
    }
}

pub(crate) fn usize_will_overflow(a: usize, b: usize) -> bool {
    a.checked_add(b).is_none()
}

pub(crate) fn u32_will_overflow(a: u32, b: u32) -> bool {
    a.checked_add(b).is_none()
}

macro_rules! bail {
    ($err: expr) => {
        return Err($err)
    };
}
pub(crate) use bail;

macro_rules! bail_if {
    ($cond: expr, $err: expr) => {
        if $cond {
            return Err($err);
        }
    };
}
pub(crate) use bail_if;
