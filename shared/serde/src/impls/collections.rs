use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::Hash,
};

use crate::{ByteReader, ByteWriter, Serde, SerdeErr};

fn ser_len(writer: &mut ByteWriter, length: usize) {
    writer.write_u32(length as u32);
}

// Each element takes at least one byte, so a count above the remaining
// bytes can only come from a corrupt frame
fn de_len(reader: &mut ByteReader) -> Result<usize, SerdeErr> {
    let count = reader.read_u32()? as usize;
    if count > reader.remaining() {
        return Err(SerdeErr::LengthOverflow {
            length: count,
            remaining: reader.remaining(),
        });
    }
    Ok(count)
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        ser_len(writer, self.len());
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let count = de_len(reader)?;
        let mut output = Vec::with_capacity(count);
        for _ in 0..count {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }
}

impl<T: Serde + Eq + Hash> Serde for HashSet<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        ser_len(writer, self.len());
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let count = de_len(reader)?;
        let mut output = HashSet::with_capacity(count);
        for _ in 0..count {
            output.insert(T::de(reader)?);
        }
        Ok(output)
    }
}

impl<T: Serde + Ord> Serde for BTreeSet<T> {
    fn ser(&self, writer: &mut ByteWriter) {
        ser_len(writer, self.len());
        for item in self {
            item.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let count = de_len(reader)?;
        let mut output = BTreeSet::new();
        for _ in 0..count {
            output.insert(T::de(reader)?);
        }
        Ok(output)
    }
}

impl<K: Serde + Eq + Hash, V: Serde> Serde for HashMap<K, V> {
    fn ser(&self, writer: &mut ByteWriter) {
        ser_len(writer, self.len());
        for (key, value) in self {
            key.ser(writer);
            value.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let count = de_len(reader)?;
        let mut output = HashMap::with_capacity(count);
        for _ in 0..count {
            let key = K::de(reader)?;
            let value = V::de(reader)?;
            output.insert(key, value);
        }
        Ok(output)
    }
}

impl<K: Serde + Ord, V: Serde> Serde for BTreeMap<K, V> {
    fn ser(&self, writer: &mut ByteWriter) {
        ser_len(writer, self.len());
        for (key, value) in self {
            key.ser(writer);
            value.ser(writer);
        }
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let count = de_len(reader)?;
        let mut output = BTreeMap::new();
        for _ in 0..count {
            let key = K::de(reader)?;
            let value = V::de(reader)?;
            output.insert(key, value);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use crate::{ByteReader, ByteWriter, Serde};

    #[test]
    fn nested_collections() {
        let mut map = BTreeMap::new();
        map.insert(3u32, vec![1u8, 2, 3]);
        map.insert(1u32, Vec::new());
        let set: HashSet<u32> = [5, 9, 11].into_iter().collect();

        let mut writer = ByteWriter::new();
        map.ser(&mut writer);
        set.ser(&mut writer);

        let bytes = writer.to_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(BTreeMap::<u32, Vec<u8>>::de(&mut reader), Ok(map));
        assert_eq!(HashSet::<u32>::de(&mut reader), Ok(set));
        assert!(reader.is_exhausted());
    }

    #[test]
    fn corrupt_count_is_rejected() {
        let bytes = [0xFFu8, 0xFF, 0xFF, 0xFF, 0];
        let mut reader = ByteReader::new(&bytes);
        assert!(Vec::<u8>::de(&mut reader).is_err());
    }
}
