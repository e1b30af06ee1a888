use protocol::CodecError;
use thiserror::Error;

/// Why a connection worker stopped servicing its socket.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The bytes decoded, but the client broke the rules of the protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("game loop is no longer accepting work")]
    GameStopped,
}
