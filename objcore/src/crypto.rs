use std::fmt;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// AES-256-CBC key and IV shared by every object store of one deployment,
/// PKCS#7 padded.
#[derive(Clone)]
pub struct StoreCrypto {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl StoreCrypto {
    pub fn new(raw_key: &[u8], raw_iv: &[u8]) -> Result<Self> {
        let key = <[u8; KEY_LEN]>::try_from(raw_key).map_err(|_| {
            Error::InvalidConfig(format!(
                "encryption key must be {} bytes, got {}",
                KEY_LEN,
                raw_key.len()
            ))
        })?;
        let iv = <[u8; IV_LEN]>::try_from(raw_iv).map_err(|_| {
            Error::InvalidConfig(format!(
                "encryption iv must be {} bytes, got {}",
                IV_LEN,
                raw_iv.len()
            ))
        })?;

        Ok(StoreCrypto { key, iv })
    }

    pub fn from_hex(hex_key: &str, hex_iv: &str) -> Result<Self> {
        let raw_key = hex::decode(hex_key.trim())
            .map_err(|e| Error::InvalidConfig(format!("enc_key is not hex: {}", e)))?;
        let raw_iv = hex::decode(hex_iv.trim())
            .map_err(|e| Error::InvalidConfig(format!("enc_iv is not hex: {}", e)))?;
        StoreCrypto::new(&raw_key, &raw_iv)
    }

    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(&self.key.into(), &self.iv.into()).encrypt_padded_vec_mut::<Pkcs7>(data)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() || data.len() % BLOCK_LEN != 0 {
            return Err(Error::Crypto(format!(
                "ciphertext of {} bytes is not a whole number of blocks",
                data.len()
            )));
        }
        Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|_| Error::Crypto("bad padding".to_string()))
    }
}

impl fmt::Debug for StoreCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCrypto").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> StoreCrypto {
        StoreCrypto::new(&[7u8; KEY_LEN], &[3u8; IV_LEN]).unwrap()
    }

    #[test]
    fn roundtrip() {
        let c = crypto();
        let data = b"Hello World!";

        let enc = c.encrypt(data);
        assert_ne!(&enc[..], &data[..]);
        assert_eq!(enc.len(), BLOCK_LEN);
        assert_eq!(c.decrypt(&enc).unwrap(), data);

        // Full block of padding when already aligned
        let aligned = [1u8; 32];
        assert_eq!(c.encrypt(&aligned).len(), 48);
        assert_eq!(c.decrypt(&c.encrypt(&aligned)).unwrap(), aligned);

        assert_eq!(c.decrypt(&c.encrypt(b"")).unwrap(), b"");
    }

    // openssl enc -aes-256-cbc -K 0001..1f -iv 0001..0f
    #[test]
    fn known_ciphertext() {
        let key: Vec<u8> = (0u8..32).collect();
        let iv: Vec<u8> = (0u8..16).collect();
        let c = StoreCrypto::new(&key, &iv).unwrap();

        let expected = hex::decode("c3dd45504c94722c10ae1425eed31067").unwrap();
        assert_eq!(c.encrypt(b"Hello World!"), expected);
        assert_eq!(c.decrypt(&expected).unwrap(), b"Hello World!");
    }

    #[test]
    fn bad_padding() {
        let c = crypto();
        // 28 bytes, the last block ends in four bytes of 0x04 padding
        let mut enc = c.encrypt(&[9u8; 28]);
        assert_eq!(enc.len(), 32);

        // flips the last padding byte of the second block
        enc[15] ^= 0xff;
        assert!(matches!(c.decrypt(&enc), Err(Error::Crypto(_))));
    }

    #[test]
    fn not_block_aligned() {
        assert!(matches!(crypto().decrypt(b"abc"), Err(Error::Crypto(_))));
        assert!(matches!(crypto().decrypt(b""), Err(Error::Crypto(_))));
    }

    #[test]
    fn wrong_key() {
        let enc = crypto().encrypt(b"Hello World!");
        let other = StoreCrypto::new(&[8u8; KEY_LEN], &[3u8; IV_LEN]).unwrap();
        assert_ne!(other.decrypt(&enc).ok().as_deref(), Some(&b"Hello World!"[..]));
    }

    #[test]
    fn bad_lengths() {
        assert!(matches!(
            StoreCrypto::new(&[0u8; 16], &[0u8; IV_LEN]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            StoreCrypto::new(&[0u8; KEY_LEN], &[0u8; 24]),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn from_hex_key_file_lengths() {
        // 64 hex chars of key, 32 of iv
        let c = StoreCrypto::from_hex(&"07".repeat(KEY_LEN), &"03".repeat(IV_LEN)).unwrap();
        let enc = crypto().encrypt(b"data");
        assert_eq!(c.decrypt(&enc).unwrap(), b"data");

        assert!(matches!(
            StoreCrypto::from_hex("xyz", &"03".repeat(IV_LEN)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn debug_hides_key() {
        let s = format!("{:?}", crypto());
        assert!(!s.contains('7'));
    }
}
