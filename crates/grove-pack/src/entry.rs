use grove_types::{ObjectId, ObjectType, ID_LEN};

use crate::error::{PackError, PackResult};

/// Type tag for pack entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackObjectKind {
    /// Complete object with its full data.
    Full(ObjectType),
    /// Delta against the entry at an earlier offset in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta against an object named by id.
    RefDelta { base: ObjectId },
}

impl PackObjectKind {
    /// The 3-bit type code stored in an entry header.
    pub fn type_bits(&self) -> u8 {
        match self {
            Self::Full(ObjectType::Commit) => 1,
            Self::Full(ObjectType::Tree) => 2,
            Self::Full(ObjectType::Blob) => 3,
            Self::Full(ObjectType::Tag) => 4,
            Self::OfsDelta { .. } => 6,
            Self::RefDelta { .. } => 7,
        }
    }

    /// Parse a type code for a full object (deltas need their base).
    pub fn full_from_type_bits(bits: u8) -> Option<ObjectType> {
        match bits {
            1 => Some(ObjectType::Commit),
            2 => Some(ObjectType::Tree),
            3 => Some(ObjectType::Blob),
            4 => Some(ObjectType::Tag),
            _ => None,
        }
    }

    /// Returns `true` for either delta form.
    pub fn is_delta(&self) -> bool {
        !matches!(self, Self::Full(_))
    }
}

/// A decoded entry header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry type, with the delta base resolved to an offset or id.
    pub kind: PackObjectKind,
    /// Inflated size of the entry data (for deltas, the delta size).
    pub size: u64,
    /// Absolute offset where the zlib stream begins.
    pub data_offset: u64,
}

impl EntryHeader {
    /// Decode the header of the entry starting at `offset` in `pack`.
    pub fn parse(pack: &[u8], offset: u64) -> PackResult<Self> {
        let corrupt = |reason: &str| PackError::CorruptEntry {
            offset,
            reason: reason.to_string(),
        };
        let mut pos = usize::try_from(offset).map_err(|_| corrupt("offset overflows"))?;
        let mut byte = *pack.get(pos).ok_or_else(|| corrupt("offset beyond pack data"))?;
        pos += 1;

        let type_bits = (byte >> 4) & 0x07;
        let mut size = u64::from(byte & 0x0f);
        let mut shift = 4u32;
        while byte & 0x80 != 0 {
            byte = *pack.get(pos).ok_or_else(|| corrupt("truncated size"))?;
            pos += 1;
            if shift > 57 {
                return Err(corrupt("size varint too long"));
            }
            size |= u64::from(byte & 0x7f) << shift;
            shift += 7;
        }

        let kind = match type_bits {
            6 => {
                let mut byte = *pack.get(pos).ok_or_else(|| corrupt("truncated base offset"))?;
                pos += 1;
                let mut distance = u64::from(byte & 0x7f);
                while byte & 0x80 != 0 {
                    byte = *pack.get(pos).ok_or_else(|| corrupt("truncated base offset"))?;
                    pos += 1;
                    distance = distance
                        .checked_add(1)
                        .and_then(|d| d.checked_mul(128))
                        .ok_or_else(|| corrupt("base offset overflows"))?
                        | u64::from(byte & 0x7f);
                }
                let base_offset = offset
                    .checked_sub(distance)
                    .filter(|_| distance > 0)
                    .ok_or_else(|| corrupt("base offset out of range"))?;
                PackObjectKind::OfsDelta { base_offset }
            }
            7 => {
                let raw = pack
                    .get(pos..pos + ID_LEN)
                    .ok_or_else(|| corrupt("truncated base id"))?;
                pos += ID_LEN;
                let base = ObjectId::from_slice(raw).map_err(|e| corrupt(&e.to_string()))?;
                PackObjectKind::RefDelta { base }
            }
            bits => match PackObjectKind::full_from_type_bits(bits) {
                Some(kind) => PackObjectKind::Full(kind),
                None => return Err(corrupt(&format!("unknown type code: {bits}"))),
            },
        };

        Ok(Self {
            kind,
            size,
            data_offset: pos as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_bits_full_kinds() {
        for (kind, bits) in [
            (ObjectType::Commit, 1),
            (ObjectType::Tree, 2),
            (ObjectType::Blob, 3),
            (ObjectType::Tag, 4),
        ] {
            assert_eq!(PackObjectKind::Full(kind).type_bits(), bits);
            assert_eq!(PackObjectKind::full_from_type_bits(bits), Some(kind));
        }
    }

    #[test]
    fn from_type_bits_unknown() {
        assert!(PackObjectKind::full_from_type_bits(0).is_none());
        assert!(PackObjectKind::full_from_type_bits(5).is_none());
        assert!(PackObjectKind::full_from_type_bits(6).is_none());
    }

    #[test]
    fn parse_small_blob_header() {
        // type 3 (blob), size 5, no continuation.
        let pack = [0x35u8, 0xaa];
        let header = EntryHeader::parse(&pack, 0).unwrap();
        assert_eq!(header.kind, PackObjectKind::Full(ObjectType::Blob));
        assert_eq!(header.size, 5);
        assert_eq!(header.data_offset, 1);
    }

    #[test]
    fn parse_multi_byte_size() {
        // type 1 (commit), size = 0xf | (0x01 << 4) = 31.
        let pack = [0x9fu8, 0x01];
        let header = EntryHeader::parse(&pack, 0).unwrap();
        assert_eq!(header.kind, PackObjectKind::Full(ObjectType::Commit));
        assert_eq!(header.size, 31);
        assert_eq!(header.data_offset, 2);
    }

    #[test]
    fn parse_ofs_delta_header() {
        let mut pack = vec![0u8; 200];
        // ofs-delta, size 4, single-byte distance 100.
        pack[150] = 0x64;
        pack[151] = 100;
        let header = EntryHeader::parse(&pack, 150).unwrap();
        assert_eq!(header.kind, PackObjectKind::OfsDelta { base_offset: 50 });
        assert_eq!(header.size, 4);
        assert!(header.kind.is_delta());
    }

    #[test]
    fn parse_two_byte_ofs_distance() {
        let mut pack = vec![0u8; 400];
        // distance bytes 0x81 0x00 decode to ((1 + 1) << 7) | 0 = 256.
        pack[300] = 0x60;
        pack[301] = 0x81;
        pack[302] = 0x00;
        let header = EntryHeader::parse(&pack, 300).unwrap();
        assert_eq!(header.kind, PackObjectKind::OfsDelta { base_offset: 44 });
        assert_eq!(header.data_offset, 303);
    }

    #[test]
    fn parse_ref_delta_header() {
        let mut pack = vec![0x72u8];
        pack.extend_from_slice(&[9u8; 20]);
        let header = EntryHeader::parse(&pack, 0).unwrap();
        assert_eq!(
            header.kind,
            PackObjectKind::RefDelta {
                base: ObjectId::from_hash([9; 20])
            }
        );
        assert_eq!(header.size, 2);
        assert_eq!(header.data_offset, 21);
    }

    #[test]
    fn ofs_delta_before_start_is_corrupt() {
        let pack = [0x60u8, 0x10];
        let err = EntryHeader::parse(&pack, 0).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { .. }));
    }

    #[test]
    fn unknown_type_is_corrupt() {
        let pack = [0x50u8];
        assert!(matches!(
            EntryHeader::parse(&pack, 0),
            Err(PackError::CorruptEntry { .. })
        ));
    }

    #[test]
    fn offset_beyond_data_is_corrupt() {
        assert!(EntryHeader::parse(&[0x30], 5).is_err());
    }
}
