//! SPC and CKC outer framing
//!
//! ```text
//! SPC: version | reserved | IV (16) | wrapped key (128) | cert hash (20) | len | payload
//! CKC: version | reserved | IV (16) | len | payload
//! ```
//!
//! Only framing is checked here. The payloads stay encrypted.

use crate::binary::{read_array, read_u32_be, write_bytes, write_u32_be, BinaryRead, BinaryWrite};
use crate::error::ProtocolError;
use std::io::{self, Read, Write};

/// The only container version in use
pub const CONTAINER_VERSION: u32 = 1;
/// AES block sized IV length
pub const IV_LEN: usize = 16;
/// RSA-1024 OAEP ciphertext carrying the session key
pub const WRAPPED_KEY_LEN: usize = 128;
/// SHA-1 of the server certificate
pub const CERT_HASH_LEN: usize = 20;
/// Fixed SPC header size
pub const SPC_HEADER_LEN: usize = 4 + 4 + IV_LEN + WRAPPED_KEY_LEN + CERT_HASH_LEN + 4;
/// Fixed CKC header size
pub const CKC_HEADER_LEN: usize = 4 + 4 + IV_LEN + 4;

fn check_version_and_reserved(version: u32, reserved: u32) -> Result<(), ProtocolError> {
    if version != CONTAINER_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }
    if reserved != 0 {
        return Err(ProtocolError::NonZeroReserved(reserved));
    }
    Ok(())
}

fn payload_slice(bytes: &[u8], header_len: usize, declared: usize) -> Result<&[u8], ProtocolError> {
    let available = bytes.len() - header_len;
    if declared > available {
        return Err(ProtocolError::PayloadOutOfBounds {
            declared,
            available,
        });
    }
    if declared % 16 != 0 {
        return Err(ProtocolError::UnalignedPayload(declared));
    }
    Ok(&bytes[header_len..header_len + declared])
}

/// Fixed-size SPC header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpcHeader {
    pub version: u32,
    pub reserved: u32,
    pub iv: [u8; IV_LEN],
    pub wrapped_key: [u8; WRAPPED_KEY_LEN],
    pub cert_hash: [u8; CERT_HASH_LEN],
    pub payload_len: u32,
}

impl SpcHeader {
    /// Version 1 header with a zero reserved field
    pub fn new(
        iv: [u8; IV_LEN],
        wrapped_key: [u8; WRAPPED_KEY_LEN],
        cert_hash: [u8; CERT_HASH_LEN],
        payload_len: u32,
    ) -> Self {
        Self {
            version: CONTAINER_VERSION,
            reserved: 0,
            iv,
            wrapped_key,
            cert_hash,
            payload_len,
        }
    }
}

impl BinaryRead for SpcHeader {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            version: read_u32_be(reader)?,
            reserved: read_u32_be(reader)?,
            iv: read_array(reader)?,
            wrapped_key: read_array(reader)?,
            cert_hash: read_array(reader)?,
            payload_len: read_u32_be(reader)?,
        })
    }
}

impl BinaryWrite for SpcHeader {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_u32_be(writer, self.version)?;
        write_u32_be(writer, self.reserved)?;
        write_bytes(writer, &self.iv)?;
        write_bytes(writer, &self.wrapped_key)?;
        write_bytes(writer, &self.cert_hash)?;
        write_u32_be(writer, self.payload_len)
    }

    fn serialized_size(&self) -> usize {
        SPC_HEADER_LEN
    }
}

/// Framed SPC borrowing its encrypted payload
#[derive(Debug, Clone)]
pub struct SpcContainer<'a> {
    pub header: SpcHeader,
    pub payload: &'a [u8],
}

impl<'a> SpcContainer<'a> {
    /// Parse and validate SPC framing
    ///
    /// Bytes after the declared payload are ignored.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < SPC_HEADER_LEN {
            return Err(ProtocolError::Truncated {
                needed: SPC_HEADER_LEN,
                available: bytes.len(),
            });
        }
        let mut reader = &bytes[..SPC_HEADER_LEN];
        let header = SpcHeader::read_from(&mut reader)?;
        check_version_and_reserved(header.version, header.reserved)?;
        let payload = payload_slice(bytes, SPC_HEADER_LEN, header.payload_len as usize)?;

        Ok(Self { header, payload })
    }

    /// Bytes past the declared payload
    pub fn trailing_len(&self, total_len: usize) -> usize {
        total_len - SPC_HEADER_LEN - self.payload.len()
    }
}

/// Framed CKC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CkcContainer {
    pub iv: [u8; IV_LEN],
    pub payload: Vec<u8>,
}

impl CkcContainer {
    pub fn new(iv: [u8; IV_LEN], payload: Vec<u8>) -> Self {
        Self { iv, payload }
    }

    /// Parse and validate CKC framing
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < CKC_HEADER_LEN {
            return Err(ProtocolError::Truncated {
                needed: CKC_HEADER_LEN,
                available: bytes.len(),
            });
        }
        let mut reader = bytes;
        let version = read_u32_be(&mut reader)?;
        let reserved = read_u32_be(&mut reader)?;
        check_version_and_reserved(version, reserved)?;
        let iv = read_array(&mut reader)?;
        let declared = read_u32_be(&mut reader)? as usize;
        let payload = payload_slice(bytes, CKC_HEADER_LEN, declared)?;

        Ok(Self {
            iv,
            payload: payload.to_vec(),
        })
    }
}

impl BinaryWrite for CkcContainer {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let len = u32::try_from(self.payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "CKC payload too large"))?;
        write_u32_be(writer, CONTAINER_VERSION)?;
        write_u32_be(writer, 0)?;
        write_bytes(writer, &self.iv)?;
        write_u32_be(writer, len)?;
        write_bytes(writer, &self.payload)
    }

    fn serialized_size(&self) -> usize {
        CKC_HEADER_LEN + self.payload.len()
    }
}
