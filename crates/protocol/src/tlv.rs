//! Tag-length-value records
//!
//! Each record is `tag (u32) | block_length (u32) | value_length (u32) |
//! value | padding`, with `block_length` a multiple of 16 and at least
//! `value_length`. Padding bytes are never interpreted.
//!
//! A decrypted payload is a record sequence followed by block-alignment
//! filler. Parsing reads a header whenever at least 12 bytes remain, so only
//! a tail shorter than a header counts as filler. Emitted records span
//! `12 mod 16` bytes, which leaves a gap of 0, 4, 8 or 12 bytes before the
//! next block boundary; `pad_to_block` fills a 12-byte gap with an empty
//! record of tag 0 instead of loose filler.

use crate::binary::{align16, read_u32_be, write_bytes, write_u32_be, write_zeros, BinaryWrite};
use crate::error::ProtocolError;
use crate::tags::{describe, is_list_tag};
use std::io::{self, Write};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of the record header
pub const TLV_HEADER_LEN: usize = 12;

/// Smallest block emitted for a record
const MIN_BLOCK_LEN: usize = 16;

/// Tag of the all-zero empty record that closes a header-sized alignment gap
pub const PADDING_TAG: u32 = 0;

/// Single TLV record
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct TlvRecord {
    pub tag: u32,
    pub value: Vec<u8>,
}

impl TlvRecord {
    pub fn new(tag: u32, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Block length used when this record is emitted
    pub fn block_len(&self) -> usize {
        align16(self.value.len()).max(MIN_BLOCK_LEN)
    }
}

impl std::fmt::Debug for TlvRecord {
    // Values may be key material; only their size is printed
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlvRecord")
            .field("tag", &describe(self.tag))
            .field("value_len", &self.value.len())
            .finish()
    }
}

impl BinaryWrite for TlvRecord {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let block_len = self.block_len();
        let too_large = || io::Error::new(io::ErrorKind::InvalidInput, "TLV value too large");
        write_u32_be(writer, self.tag)?;
        write_u32_be(writer, u32::try_from(block_len).map_err(|_| too_large())?)?;
        write_u32_be(writer, u32::try_from(self.value.len()).map_err(|_| too_large())?)?;
        write_bytes(writer, &self.value)?;
        write_zeros(writer, block_len - self.value.len())
    }

    fn serialized_size(&self) -> usize {
        TLV_HEADER_LEN + self.block_len()
    }
}

/// Ordered set of parsed TLV records
///
/// Apart from the list tags, each tag appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvSet {
    records: Vec<TlvRecord>,
}

impl TlvSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, enforcing the duplicate rule
    pub fn push(&mut self, record: TlvRecord) -> Result<(), ProtocolError> {
        if !is_list_tag(record.tag) && self.contains(record.tag) {
            return Err(ProtocolError::DuplicateTag(record.tag));
        }
        self.records.push(record);
        Ok(())
    }

    /// Value of the first record with `tag`
    pub fn get(&self, tag: u32) -> Option<&[u8]> {
        self.records
            .iter()
            .find(|r| r.tag == tag)
            .map(|r| r.value.as_slice())
    }

    /// Values of every record with `tag`, in wire order
    pub fn get_all(&self, tag: u32) -> impl Iterator<Item = &[u8]> + '_ {
        self.records
            .iter()
            .filter(move |r| r.tag == tag)
            .map(|r| r.value.as_slice())
    }

    /// Value of a tag that must be present
    pub fn require(&self, tag: u32) -> Result<&[u8], ProtocolError> {
        self.get(tag).ok_or(ProtocolError::MissingTag(tag))
    }

    /// Value of a tag that must be present with exactly `len` bytes
    pub fn require_len(&self, tag: u32, len: usize) -> Result<&[u8], ProtocolError> {
        let value = self.require(tag)?;
        if value.len() != len {
            return Err(ProtocolError::InvalidValueLength {
                tag,
                expected: len,
                got: value.len(),
            });
        }
        Ok(value)
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.records.iter().any(|r| r.tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TlvRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[TlvRecord] {
        &self.records
    }
}

/// Parse a decrypted payload into a `TlvSet`
pub fn parse_tlvs(buf: &[u8]) -> Result<TlvSet, ProtocolError> {
    let mut set = TlvSet::new();
    let mut offset = 0;

    while buf.len() - offset >= TLV_HEADER_LEN {
        let mut header = &buf[offset..offset + TLV_HEADER_LEN];
        let tag = read_u32_be(&mut header)?;
        let block_len = read_u32_be(&mut header)? as usize;
        let value_len = read_u32_be(&mut header)? as usize;
        let remaining = buf.len() - offset - TLV_HEADER_LEN;

        if value_len > block_len {
            return Err(ProtocolError::ValueExceedsBlock {
                tag,
                value_len,
                block_len,
            });
        }
        if block_len % 16 != 0 {
            return Err(ProtocolError::UnalignedBlock { tag, block_len });
        }
        if block_len > remaining {
            return Err(ProtocolError::BlockOutOfBounds {
                tag,
                block_len,
                remaining,
            });
        }

        let start = offset + TLV_HEADER_LEN;
        set.push(TlvRecord::new(tag, &buf[start..start + value_len]))?;
        offset = start + block_len;
    }

    Ok(set)
}

/// Serialize records in order, zero padding each value to its block
///
/// The output is allocated once, with room for `pad_to_block`, and wiped on
/// drop, so record values never linger in a freed or regrown allocation.
pub fn emit_tlvs(records: &[TlvRecord]) -> Zeroizing<Vec<u8>> {
    let len: usize = records.iter().map(BinaryWrite::serialized_size).sum();
    let mut buf = Zeroizing::new(Vec::with_capacity(align16(len)));
    for record in records {
        // Writing into a Vec cannot fail
        let _ = record.write_to(&mut *buf);
    }
    buf
}

/// Extend an emitted sequence to a whole number of 16-byte blocks
///
/// A gap shorter than a record header is handed to `fill`. A gap of exactly
/// one header becomes an empty `PADDING_TAG` record so that `parse_tlvs`
/// never reads filler as a header.
pub fn pad_to_block<E>(
    buf: &mut Vec<u8>,
    fill: impl FnOnce(&mut [u8]) -> Result<(), E>,
) -> Result<(), E> {
    let unpadded = buf.len();
    let gap = align16(unpadded) - unpadded;
    buf.resize(unpadded + gap, 0);
    if gap >= TLV_HEADER_LEN {
        // Twelve zero bytes read back as an empty PADDING_TAG record
        return fill(&mut buf[unpadded + TLV_HEADER_LEN..]);
    }
    fill(&mut buf[unpadded..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{ASSET_ID, R2, RETURN_TLVS, SESSION_KEY_R1};

    fn header(tag: u32, block_len: u32, value_len: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&tag.to_be_bytes());
        buf.extend_from_slice(&block_len.to_be_bytes());
        buf.extend_from_slice(&value_len.to_be_bytes());
        buf
    }

    #[test]
    fn test_emit_layout() {
        let record = TlvRecord::new(ASSET_ID, b"track-01".to_vec());
        let bytes = emit_tlvs(std::slice::from_ref(&record));

        assert_eq!(bytes.len(), 12 + 16);
        assert_eq!(&bytes[0..4], &ASSET_ID.to_be_bytes());
        assert_eq!(&bytes[4..8], &16u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &8u32.to_be_bytes());
        assert_eq!(&bytes[12..20], b"track-01");
        assert_eq!(&bytes[20..], &[0u8; 8]);
    }

    #[test]
    fn test_emit_empty_value_takes_a_block() {
        let record = TlvRecord::new(ASSET_ID, Vec::new());
        assert_eq!(record.block_len(), 16);
        assert_eq!(record.serialized_size(), 28);
    }

    #[test]
    fn test_parse_emit_roundtrip() {
        let records = vec![
            TlvRecord::new(SESSION_KEY_R1, vec![0xAB; 112]),
            TlvRecord::new(R2, vec![0x02; 21]),
            TlvRecord::new(ASSET_ID, b"track-01".to_vec()),
            TlvRecord::new(RETURN_TLVS, vec![0, 0, 0, 1]),
            TlvRecord::new(RETURN_TLVS, vec![0, 0, 0, 2]),
            TlvRecord::new(0x1234_5678, Vec::new()),
        ];
        let mut bytes = emit_tlvs(&records);
        // Block alignment filler as left by CBC padding
        let filler = align16(bytes.len()) - bytes.len();
        bytes.extend(std::iter::repeat(0xEE).take(filler));

        let set = parse_tlvs(&bytes).unwrap();
        assert_eq!(set.records(), &records[..]);
        assert_eq!(set.get(R2), Some(&[0x02; 21][..]));
        assert_eq!(set.get_all(RETURN_TLVS).count(), 2);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_tlvs(&[]).unwrap().is_empty());
        assert!(parse_tlvs(&[0u8; 11]).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_zero_block_record() {
        let mut buf = emit_tlvs(&[TlvRecord::new(ASSET_ID, b"a".to_vec())]).to_vec();
        buf.extend_from_slice(&header(R2, 0, 0));
        assert_eq!(buf.len(), 40);

        let set = parse_tlvs(&buf).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(R2), Some(&[][..]));
    }

    #[test]
    fn test_trailing_zero_block_duplicate() {
        let mut buf = emit_tlvs(&[TlvRecord::new(ASSET_ID, b"a".to_vec())]).to_vec();
        buf.extend_from_slice(&header(ASSET_ID, 0, 0));
        assert!(matches!(
            parse_tlvs(&buf),
            Err(ProtocolError::DuplicateTag(ASSET_ID))
        ));
    }

    #[test]
    fn test_short_tail_is_filler() {
        let mut buf = emit_tlvs(&[TlvRecord::new(ASSET_ID, b"a".to_vec())]).to_vec();
        buf.extend_from_slice(&[0xEE; 11]);
        assert_eq!(parse_tlvs(&buf).unwrap().len(), 1);
    }

    #[test]
    fn test_emit_allocates_once() {
        let records = vec![
            TlvRecord::new(ASSET_ID, b"track-01".to_vec()),
            TlvRecord::new(R2, vec![0x02; 21]),
            TlvRecord::new(SESSION_KEY_R1, vec![0xAB; 112]),
        ];
        let mut bytes = emit_tlvs(&records);
        assert_eq!(bytes.len(), 28 + 44 + 124);
        assert!(bytes.capacity() >= align16(bytes.len()));

        let ptr = bytes.as_ptr();
        pad_to_block(&mut bytes, |tail| {
            tail.fill(0xEE);
            Ok::<_, ProtocolError>(())
        })
        .unwrap();
        assert_eq!(bytes.as_ptr(), ptr);
        assert_eq!(bytes.len() % 16, 0);
    }

    #[test]
    fn test_pad_to_block_gaps() {
        // One record leaves a 4-byte gap, three leave a header-sized one
        for (count, gap) in [(1usize, 4usize), (2, 8), (3, 12), (4, 0)] {
            let records: Vec<_> = (0..count)
                .map(|i| TlvRecord::new(0x100 + i as u32, Vec::new()))
                .collect();
            let mut bytes = emit_tlvs(&records);
            let unpadded = bytes.len();
            pad_to_block(&mut bytes, |tail| {
                tail.fill(0xEE);
                Ok::<_, ProtocolError>(())
            })
            .unwrap();
            assert_eq!(bytes.len(), unpadded + gap);

            let set = parse_tlvs(&bytes).unwrap();
            if gap == TLV_HEADER_LEN {
                assert_eq!(set.len(), count + 1);
                assert_eq!(set.get(PADDING_TAG), Some(&[][..]));
            } else {
                assert_eq!(set.records(), &records[..]);
            }
        }
    }

    #[test]
    fn test_value_exceeds_block() {
        let mut buf = header(ASSET_ID, 16, 17);
        buf.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            parse_tlvs(&buf),
            Err(ProtocolError::ValueExceedsBlock {
                value_len: 17,
                block_len: 16,
                ..
            })
        ));
    }

    #[test]
    fn test_unaligned_block() {
        let mut buf = header(ASSET_ID, 20, 8);
        buf.extend_from_slice(&[0u8; 20]);
        assert!(matches!(
            parse_tlvs(&buf),
            Err(ProtocolError::UnalignedBlock { block_len: 20, .. })
        ));
    }

    #[test]
    fn test_block_out_of_bounds() {
        let mut buf = header(ASSET_ID, 32, 8);
        buf.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            parse_tlvs(&buf),
            Err(ProtocolError::BlockOutOfBounds {
                block_len: 32,
                remaining: 16,
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_asset_id() {
        let records = vec![
            TlvRecord::new(ASSET_ID, b"a".to_vec()),
            TlvRecord::new(ASSET_ID, b"b".to_vec()),
        ];
        let bytes = emit_tlvs(&records);
        assert!(matches!(
            parse_tlvs(&bytes),
            Err(ProtocolError::DuplicateTag(ASSET_ID))
        ));
    }

    #[test]
    fn test_require_len() {
        let mut set = TlvSet::new();
        set.push(TlvRecord::new(R2, vec![0u8; 20])).unwrap();
        assert!(matches!(
            set.require_len(R2, 21),
            Err(ProtocolError::InvalidValueLength {
                expected: 21,
                got: 20,
                ..
            })
        ));
        assert!(matches!(
            set.require(ASSET_ID),
            Err(ProtocolError::MissingTag(ASSET_ID))
        ));
    }

    #[test]
    fn test_debug_hides_value() {
        let record = TlvRecord::new(R2, vec![0x42; 21]);
        let debug = format!("{:?}", record);
        assert!(debug.contains("value_len: 21"));
        assert!(!debug.contains("66"));
    }
}
