//! DASk derivation
//!
//! The integrity key for SessionKey_R1 is derived from the Application
//! Secret Key and the device-chosen R2. R2 is padded ISO/IEC 9797-1 style
//! (`0x80` then zeros) to whole blocks and chained through AES-ECB under the
//! ASk starting from a zero block. The final chaining value is DASk.

use crate::aes::aes128_ecb_encrypt;
use crate::types::{Aes128Key, AES_BLOCK_SIZE};
use zeroize::Zeroizing;

/// Size of the R2 value carried in the SPC
pub const R2_LEN: usize = 21;

/// Derive DASk = F(ASk, R2)
pub fn derive_dask(ask: &Aes128Key, r2: &[u8]) -> Aes128Key {
    let padded_len = (r2.len() / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE;
    let mut input = Zeroizing::new(vec![0u8; padded_len]);
    input[..r2.len()].copy_from_slice(r2);
    input[r2.len()] = 0x80;

    let mut state = Zeroizing::new([0u8; AES_BLOCK_SIZE]);
    for block in input.chunks_exact(AES_BLOCK_SIZE) {
        for (s, b) in state.iter_mut().zip(block) {
            *s ^= b;
        }
        *state = aes128_ecb_encrypt(ask, &state);
    }

    Aes128Key(*state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dask_is_deterministic() {
        let ask = Aes128Key::from_slice(&[0x11; 16]).unwrap();
        let r2 = [0x22u8; R2_LEN];
        assert_eq!(
            derive_dask(&ask, &r2).as_slice(),
            derive_dask(&ask, &r2).as_slice()
        );
    }

    #[test]
    fn test_dask_depends_on_inputs() {
        let ask = Aes128Key::from_slice(&[0x11; 16]).unwrap();
        let other_ask = Aes128Key::from_slice(&[0x12; 16]).unwrap();
        let r2 = [0x22u8; R2_LEN];
        let mut other_r2 = r2;
        other_r2[20] ^= 1;

        let base = derive_dask(&ask, &r2);
        assert_ne!(base.as_slice(), derive_dask(&other_ask, &r2).as_slice());
        assert_ne!(base.as_slice(), derive_dask(&ask, &other_r2).as_slice());
    }

    #[test]
    fn test_dask_matches_manual_chain() {
        let ask = Aes128Key::from_slice(&[0x01; 16]).unwrap();
        let r2: Vec<u8> = (0..R2_LEN as u8).collect();

        let mut first = [0u8; 16];
        first.copy_from_slice(&r2[..16]);
        let c1 = aes128_ecb_encrypt(&ask, &first);

        let mut second = [0u8; 16];
        second[..5].copy_from_slice(&r2[16..]);
        second[5] = 0x80;
        for (s, c) in second.iter_mut().zip(c1.iter()) {
            *s ^= c;
        }
        let c2 = aes128_ecb_encrypt(&ask, &second);

        assert_eq!(derive_dask(&ask, &r2).as_slice(), &c2);
    }
}
