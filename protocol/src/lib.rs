//! Wire codec for the legacy block-world client protocol.
//!
//! Every packet starts with a 1-byte opcode followed by its body, fields in
//! declaration order. All multi-byte integers and floats are big-endian.
//! Strings travel as a 16-bit code-unit count followed by that many UCS-2
//! code units; in memory they are ordinary UTF-8 [`String`]s.
//!
//! Fixed-layout packet bodies are declared with the [`packet!`] macro, which
//! generates both directions of the codec from the field list. The handful
//! of genuinely variable payloads (chunk bulk data, inventory slot arrays)
//! implement [`Serializable`] and [`Deserializable`] by hand instead.

mod error;
#[macro_use]
mod macros;
mod chunk_payload;
mod primitive_impls;
mod string16;
mod window_items;

pub mod packets;

pub use error::CodecError;

use std::io::{Read, Write};

pub type Result<T> = std::result::Result<T, CodecError>;

/// A value with a wire representation the server can emit.
pub trait Serializable {
    /// Returns how many bytes were written.
    fn to_writer<W: Write>(&self, output: &mut W) -> Result<usize>;
}

/// A value that can be reconstructed from its wire representation.
pub trait Deserializable {
    fn from_reader<R: Read>(input: &mut R) -> Result<Self>
    where
        Self: Sized;
}

/// Serializes a value into a fresh buffer.
pub fn encode<T: Serializable>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.to_writer(&mut buf)?;
    Ok(buf)
}
