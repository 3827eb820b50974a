use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, OsRng},
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("暗号化キーの形式が不正です")]
    InvalidKeyFormat,

    #[error("暗号化キーは32バイトである必要があります（実際: {0}）")]
    InvalidKeyLength(usize),

    #[error("暗号化に失敗しました")]
    Encrypt,

    #[error("復号に失敗しました")]
    Decrypt,
}

/// TOTPシークレットの保存時暗号化（AES-256-GCM）
///
/// 保存形式: 96ビットnonce (12バイト) + 暗号文
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; KEY_LEN],
}

impl SecretCipher {
    /// Base64エンコードされた32バイトのキーから作成
    pub fn from_base64(encryption_key_base64: &str) -> Result<Self, CipherError> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};

        let key_bytes = STANDARD.decode(encryption_key_base64).map_err(|e| {
            tracing::error!(error = ?e, "暗号化キーのBase64デコードエラー");
            CipherError::InvalidKeyFormat
        })?;

        if key_bytes.len() != KEY_LEN {
            tracing::error!(
                expected = KEY_LEN,
                actual = key_bytes.len(),
                "暗号化キーの長さが不正"
            );
            return Err(CipherError::InvalidKeyLength(key_bytes.len()));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&key_bytes);
        Ok(Self { key })
    }

    pub fn encrypt(&self, secret: &SecretString) -> Result<Vec<u8>, CipherError> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, secret.expose_secret().as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    pub fn decrypt(&self, encrypted: &[u8]) -> Result<SecretString, CipherError> {
        if encrypted.len() < NONCE_LEN {
            tracing::error!(len = encrypted.len(), "暗号化データが短すぎる");
            return Err(CipherError::Decrypt);
        }

        let cipher = self.cipher()?;
        let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext)
            .map(SecretString::from)
            .map_err(|_| CipherError::Decrypt)
    }

    fn cipher(&self) -> Result<Aes256Gcm, CipherError> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| {
            tracing::error!(error = ?e, "AES-GCM暗号化器の初期化エラー");
            CipherError::InvalidKeyFormat
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    fn create_test_cipher() -> SecretCipher {
        SecretCipher::from_base64(&STANDARD.encode([7u8; 32])).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_secret() {
        let cipher = create_test_cipher();
        let original = SecretString::from("JBSWY3DPEHPK3PXP");

        let encrypted = cipher.encrypt(&original).unwrap();
        // 12バイトnonce + 暗号文 + 16バイトtag
        assert_eq!(encrypted.len(), 12 + 16 + 16);
        assert!(!encrypted.windows(16).any(|w| w == b"JBSWY3DPEHPK3PXP"));

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted.expose_secret(), original.expose_secret());
    }

    #[test]
    fn test_nonce_differs_per_encryption() {
        let cipher = create_test_cipher();
        let secret = SecretString::from("JBSWY3DPEHPK3PXP");
        assert_ne!(
            cipher.encrypt(&secret).unwrap(),
            cipher.encrypt(&secret).unwrap()
        );
    }

    #[test]
    fn test_decrypt_tampered_data() {
        let cipher = create_test_cipher();
        let mut encrypted = cipher.encrypt(&SecretString::from("JBSWY3DPEHPK3PXP")).unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert!(matches!(cipher.decrypt(&encrypted), Err(CipherError::Decrypt)));
    }

    #[test]
    fn test_decrypt_too_short() {
        let cipher = create_test_cipher();
        assert!(matches!(cipher.decrypt(&[0u8; 5]), Err(CipherError::Decrypt)));
    }

    #[test]
    fn test_invalid_key_length() {
        let short_key = STANDARD.encode([0u8; 16]);
        assert!(matches!(
            SecretCipher::from_base64(&short_key),
            Err(CipherError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            SecretCipher::from_base64("not-valid-base64!!!"),
            Err(CipherError::InvalidKeyFormat)
        ));
    }
}
