use crate::{Deserializable, Result, Serializable};
use std::io::{Read, Write};

impl Serializable for bool {
    fn to_writer<W: Write>(&self, output: &mut W) -> Result<usize> {
        output.write_all(&[*self as u8])?;
        Ok(1)
    }
}

impl Deserializable for bool {
    fn from_reader<R: Read>(input: &mut R) -> Result<Self> {
        let mut buf = [0u8; 1];
        input.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }
}

macro_rules! impl_codec_for_primitive {
    ( $( $primitive:ty ),+ ) => {
        $(
            impl Serializable for $primitive {
                fn to_writer<W: Write>(&self, output: &mut W) -> Result<usize> {
                    let buf = self.to_be_bytes();
                    output.write_all(&buf)?;
                    Ok(buf.len())
                }
            }

            impl Deserializable for $primitive {
                fn from_reader<R: Read>(input: &mut R) -> Result<Self> {
                    let mut buf = [0u8; std::mem::size_of::<Self>()];
                    input.read_exact(&mut buf)?;
                    Ok(Self::from_be_bytes(buf))
                }
            }
        )+
    };
}

impl_codec_for_primitive! { u8, u16, u32, u64, i8, i16, i32, i64, f32, f64 }

#[cfg(test)]
mod tests {
    use crate::{encode, Deserializable};
    use std::io::Cursor;

    #[test]
    fn integers_are_big_endian() {
        assert_eq!(encode(&0x0102_0304i32).unwrap(), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(encode(&-1i16).unwrap(), [0xFF, 0xFF]);
        assert_eq!(encode(&0x01FFu16).unwrap(), [0x01, 0xFF]);
    }

    #[test]
    fn floats_are_ieee754_big_endian() {
        assert_eq!(
            encode(&1.0f64).unwrap(),
            [0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(encode(&-2.0f32).unwrap(), [0xC0, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn bool_reads_any_nonzero_as_true() {
        let mut cursor = Cursor::new([0x02u8]);
        assert!(bool::from_reader(&mut cursor).unwrap());
        let mut cursor = Cursor::new([0x00u8]);
        assert!(!bool::from_reader(&mut cursor).unwrap());
    }

    #[test]
    fn short_read_is_an_io_error() {
        let mut cursor = Cursor::new([0x01u8, 0x02]);
        assert!(matches!(
            i32::from_reader(&mut cursor),
            Err(crate::CodecError::Io(_))
        ));
    }
}
