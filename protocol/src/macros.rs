/// Declares a fixed-layout packet body: a struct whose fields are written
/// and read in declaration order. Variable-length payloads do not belong
/// here; give them hand-written trait impls instead.
macro_rules! packet {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($field:ident: $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $(pub $field: $ty,)+
        }

        impl $crate::Serializable for $name {
            fn to_writer<W: std::io::Write>(&self, output: &mut W) -> $crate::Result<usize> {
                let mut sum = 0;
                $(sum += $crate::Serializable::to_writer(&self.$field, output)?;)+
                Ok(sum)
            }
        }

        impl $crate::Deserializable for $name {
            fn from_reader<R: std::io::Read>(input: &mut R) -> $crate::Result<Self> {
                Ok(Self {
                    $($field: $crate::Deserializable::from_reader(input)?,)+
                })
            }
        }
    };
}

/// Declares a packet direction: the opcode table mapping each 1-byte
/// discriminator to its body type, with dispatch in both directions.
macro_rules! packet_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($opcode:literal => $variant:ident($body:ty)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            $($variant($body),)+
        }

        impl $name {
            /// The 1-byte discriminator this packet carries on the wire.
            pub fn opcode(&self) -> u8 {
                match self {
                    $(Self::$variant(_) => $opcode,)+
                }
            }
        }

        impl $crate::Serializable for $name {
            fn to_writer<W: std::io::Write>(&self, output: &mut W) -> $crate::Result<usize> {
                let mut sum = $crate::Serializable::to_writer(&self.opcode(), output)?;
                match self {
                    $(Self::$variant(body) => {
                        sum += $crate::Serializable::to_writer(body, output)?;
                    })+
                }
                Ok(sum)
            }
        }

        impl $crate::Deserializable for $name {
            fn from_reader<R: std::io::Read>(input: &mut R) -> $crate::Result<Self> {
                let opcode: u8 = $crate::Deserializable::from_reader(input)?;
                match opcode {
                    $($opcode => Ok(Self::$variant($crate::Deserializable::from_reader(input)?)),)+
                    other => Err($crate::CodecError::UnsupportedPacket(other)),
                }
            }
        }
    };
}
