use std::io;
use thiserror::Error;

/// Everything that can go wrong while marshalling a packet.
///
/// Short reads and writes surface as [`CodecError::Io`] with
/// `ErrorKind::UnexpectedEof` / `ErrorKind::WriteZero` from the underlying
/// stream. The remaining variants are protocol-level: the bytes were
/// readable but the values in them are not acceptable.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("length field was negative")]
    NegativeLength,

    #[error("string too long for a 16-bit length prefix")]
    StringTooLong,

    #[error("well-formed data with an out-of-range value: {0}")]
    OutOfRange(&'static str),

    #[error("chunk payload is {actual} bytes but the declared size needs {expected}")]
    BadChunkSize { expected: usize, actual: usize },

    #[error("unsupported packet id {0:#04x}")]
    UnsupportedPacket(u8),
}
