//! Binary serialization infrastructure for SPC and CKC framing
//!
//! All multi-byte integers on the FairPlay wire are big-endian.

use std::io::{self, Read, Write};

pub mod traits;

pub use traits::{BinaryRead, BinaryWrite};

/// Read a u32 (big-endian) from a reader
pub fn read_u32_be<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Read a fixed-size array from a reader
pub fn read_array<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Write a u32 (big-endian) to a writer
pub fn write_u32_be<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_be_bytes())
}

/// Write bytes to a writer
pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes)
}

/// Write `n` zero bytes to a writer
pub fn write_zeros<W: Write>(writer: &mut W, n: usize) -> io::Result<()> {
    const ZEROS: [u8; 16] = [0u8; 16];
    let mut left = n;
    while left > 0 {
        let chunk = left.min(ZEROS.len());
        writer.write_all(&ZEROS[..chunk])?;
        left -= chunk;
    }
    Ok(())
}

/// Round `len` up to the next multiple of 16
pub fn align16(len: usize) -> usize {
    len.div_ceil(16) * 16
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_u32_roundtrip() {
        let mut buf = Vec::new();
        write_u32_be(&mut buf, 0x1234_5678).unwrap();
        assert_eq!(buf, vec![0x12, 0x34, 0x56, 0x78]);

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_u32_be(&mut cursor).unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_read_array() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = Cursor::new(&data[..]);
        let head: [u8; 3] = read_array(&mut cursor).unwrap();
        assert_eq!(head, [1, 2, 3]);
        assert!(read_array::<_, 3>(&mut cursor).is_err());
    }

    #[test]
    fn test_write_zeros() {
        let mut buf = Vec::new();
        write_zeros(&mut buf, 37).unwrap();
        assert_eq!(buf, vec![0u8; 37]);
    }

    #[test]
    fn test_align16() {
        assert_eq!(align16(0), 0);
        assert_eq!(align16(1), 16);
        assert_eq!(align16(16), 16);
        assert_eq!(align16(21), 32);
    }
}
