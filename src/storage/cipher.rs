use base64::{Engine as _, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};

use super::CacheError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES-128-CBC + PKCS7，密文以 base64 存储
#[derive(Clone)]
pub struct AesCipher {
    key: [u8; 16],
    iv: [u8; 16],
}

impl std::fmt::Debug for AesCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesCipher(..)")
    }
}

impl AesCipher {
    pub fn new(key: &str, iv: &str) -> Result<Self, CacheError> {
        let key: [u8; 16] = key
            .as_bytes()
            .try_into()
            .map_err(|_| CacheError::InvalidKey(key.len()))?;
        let iv: [u8; 16] = iv
            .as_bytes()
            .try_into()
            .map_err(|_| CacheError::InvalidKey(iv.len()))?;
        Ok(Self { key, iv })
    }

    pub fn encrypt(&self, plain: &str) -> Result<String, CacheError> {
        let enc = Aes128CbcEnc::new_from_slices(&self.key, &self.iv)
            .map_err(|_| CacheError::InvalidKey(self.key.len()))?;
        let bytes = enc.encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());
        Ok(STANDARD.encode(bytes))
    }

    pub fn decrypt(&self, cipher_text: &str) -> Result<String, CacheError> {
        let raw = STANDARD
            .decode(cipher_text)
            .map_err(|e| CacheError::Decrypt(e.to_string()))?;
        let dec = Aes128CbcDec::new_from_slices(&self.key, &self.iv)
            .map_err(|_| CacheError::InvalidKey(self.key.len()))?;
        let plain = dec
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|e| CacheError::Decrypt(e.to_string()))?;
        String::from_utf8(plain).map_err(|e| CacheError::Decrypt(e.to_string()))
    }
}
