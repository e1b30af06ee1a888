//! The wire string codec: UTF-8 in memory, UCS-2 on the wire.
//!
//! A string is an `i16` count of 16-bit code units followed by that many
//! big-endian units. Characters above U+FFFF are carried as surrogate pairs
//! and re-paired on read; nothing is normalised.

use crate::{CodecError, Deserializable, Result, Serializable};
use std::io::{Read, Write};

/// The longest code-unit sequence a 16-bit signed length prefix can carry.
pub const MAX_CODE_UNITS: usize = i16::MAX as usize;

impl Serializable for str {
    fn to_writer<W: Write>(&self, output: &mut W) -> Result<usize> {
        let units: Vec<u16> = self.encode_utf16().collect();
        if units.len() > MAX_CODE_UNITS {
            // checked before anything reaches the stream
            return Err(CodecError::StringTooLong);
        }
        (units.len() as i16).to_writer(output)?;
        for unit in &units {
            unit.to_writer(output)?;
        }
        Ok(2 + units.len() * 2)
    }
}

impl Serializable for String {
    fn to_writer<W: Write>(&self, output: &mut W) -> Result<usize> {
        self.as_str().to_writer(output)
    }
}

impl Deserializable for String {
    fn from_reader<R: Read>(input: &mut R) -> Result<Self> {
        let length = i16::from_reader(input)?;
        if length < 0 {
            return Err(CodecError::NegativeLength);
        }
        let mut units = Vec::with_capacity(length as usize);
        for _ in 0..length {
            units.push(u16::from_reader(input)?);
        }
        // Rejecting unpaired surrogates keeps re-encoding bit-exact for
        // every accepted input.
        char::decode_utf16(units)
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| CodecError::OutOfRange("unpaired surrogate in string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;
    use std::io::Cursor;

    fn roundtrip(s: &str) {
        let bytes = encode(&s.to_string()).unwrap();
        let mut cursor = Cursor::new(&bytes[..]);
        let back = String::from_reader(&mut cursor).unwrap();
        assert_eq!(back, s);
        assert_eq!(cursor.position() as usize, bytes.len());
        // and the re-encoding is bit-exact
        assert_eq!(encode(&back).unwrap(), bytes);
    }

    #[test]
    fn ascii_layout() {
        assert_eq!(encode(&"Ab".to_string()).unwrap(), [0, 2, 0, 0x41, 0, 0x62]);
    }

    #[test]
    fn bmp_and_supplementary_scalars_round_trip() {
        roundtrip("");
        roundtrip("hello");
        roundtrip("héllo wörld");
        roundtrip("ツ\u{30c4}");
        // U+1D11E musical symbol: surrogate pair D834 DD1E on the wire
        roundtrip("\u{1d11e}");
        let bytes = encode(&"\u{1d11e}".to_string()).unwrap();
        assert_eq!(bytes, [0, 2, 0xD8, 0x34, 0xDD, 0x1E]);
    }

    #[test]
    fn oversized_string_writes_nothing() {
        let long = "a".repeat(40_000);
        let mut buf = Vec::new();
        let err = long.as_str().to_writer(&mut buf).unwrap_err();
        assert!(matches!(err, CodecError::StringTooLong));
        assert!(buf.is_empty());
    }

    #[test]
    fn longest_legal_string_is_accepted() {
        let s = "a".repeat(MAX_CODE_UNITS);
        let bytes = encode(&s).unwrap();
        assert_eq!(bytes.len(), 2 + MAX_CODE_UNITS * 2);
    }

    #[test]
    fn negative_length_stops_at_the_length_field() {
        let bytes = [0xFFu8, 0xFE, 0xAA, 0xBB];
        let mut cursor = Cursor::new(&bytes[..]);
        let err = String::from_reader(&mut cursor).unwrap_err();
        assert!(matches!(err, CodecError::NegativeLength));
        // only the two length bytes were consumed
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn unpaired_surrogate_is_rejected() {
        let bytes = [0u8, 1, 0xD8, 0x00];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(matches!(
            String::from_reader(&mut cursor),
            Err(CodecError::OutOfRange(_))
        ));
    }
}
