use crate::{ByteReader, ByteWriter, ConstByteLength, Serde, SerdeErr};

// Unit

impl Serde for () {
    fn ser(&self, _: &mut ByteWriter) {}

    fn de(_: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(())
    }
}

// Boolean

impl Serde for bool {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(u8::from(*self));
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerdeErr::UnknownTag {
                type_name: "bool",
                tag: u32::from(other),
            }),
        }
    }
}

impl ConstByteLength for bool {
    fn const_byte_length() -> usize {
        1
    }
}

// Integers

macro_rules! impl_serde_for_unsigned {
    ($type:ty, $width:expr, $write:ident, $read:ident) => {
        impl Serde for $type {
            fn ser(&self, writer: &mut ByteWriter) {
                writer.$write(*self);
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                reader.$read()
            }
        }

        impl ConstByteLength for $type {
            fn const_byte_length() -> usize {
                $width
            }
        }
    };
}

// Signed values travel as their two's complement bit pattern
macro_rules! impl_serde_for_signed {
    ($type:ty, $width:expr, $write:ident, $read:ident, $unsigned:ty) => {
        impl Serde for $type {
            fn ser(&self, writer: &mut ByteWriter) {
                writer.$write(*self as $unsigned);
            }

            fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
                Ok(reader.$read()? as $type)
            }
        }

        impl ConstByteLength for $type {
            fn const_byte_length() -> usize {
                $width
            }
        }
    };
}

impl_serde_for_unsigned!(u16, 2, write_u16, read_u16);
impl_serde_for_unsigned!(u32, 4, write_u32, read_u32);
impl_serde_for_unsigned!(u64, 8, write_u64, read_u64);
impl_serde_for_signed!(i16, 2, write_u16, read_u16, u16);
impl_serde_for_signed!(i32, 4, write_u32, read_u32, u32);
impl_serde_for_signed!(i64, 8, write_u64, read_u64, u64);

impl Serde for u8 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_byte(*self);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        reader.read_byte()
    }
}

impl ConstByteLength for u8 {
    fn const_byte_length() -> usize {
        1
    }
}

// Floats

impl Serde for f64 {
    fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u64(self.to_bits());
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(f64::from_bits(reader.read_u64()?))
    }
}

impl ConstByteLength for f64 {
    fn const_byte_length() -> usize {
        8
    }
}

// Option

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        match self {
            Some(value) => {
                true.ser(writer);
                value.ser(writer);
            }
            None => false.ser(writer),
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}

// Tuples

impl<A: Serde, B: Serde> Serde for (A, B) {
    fn ser(&self, writer: &mut ByteWriter) {
        self.0.ser(writer);
        self.1.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok((A::de(reader)?, B::de(reader)?))
    }
}
