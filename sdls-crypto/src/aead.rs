use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Narrow interface onto an AEAD primitive. SDLS pipelines call through this
/// trait only; the primitive itself (key schedule, block cipher, GHASH) is
/// out of scope for this crate to reimplement.
pub trait CryptoProvider {
    /// Encrypt `plaintext` under `key`/`nonce`, authenticating `aad`.
    /// Returns ciphertext with the authentication tag appended.
    fn aead_encrypt(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt and verify `ciphertext` (tag appended) under `key`/`nonce`,
    /// checking `aad`. Returns the recovered plaintext.
    fn aead_decrypt(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Authenticate-only: produce a MAC over `aad` with no plaintext payload,
    /// for SAs configured authentication-only (no encryption).
    fn aead_authenticate(
        &self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Verify-only: check a MAC produced by `aead_authenticate`, constant time.
    fn aead_verify(
        &self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<(), CryptoError>;

    /// Run the provider's known-answer test. Returns `Ok(())` if the
    /// implementation reproduces its reference vector.
    fn cipher_kat(&self) -> Result<(), CryptoError>;
}

/// AES-256-GCM `CryptoProvider`, the only cipher suite supported here.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256GcmProvider;

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm, CryptoError> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::BadKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }
    Ok(Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::BadKeyLength {
        expected: KEY_LEN,
        actual: key.len(),
    })?)
}

fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::BadNonceLength {
            expected: NONCE_LEN,
            actual: nonce.len(),
        });
    }
    Ok(())
}

impl CryptoProvider for Aes256GcmProvider {
    fn aead_encrypt(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce)?;
        let cipher = cipher_for(key)?;
        cipher
            .encrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::SealFailed)
    }

    fn aead_decrypt(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce)?;
        let cipher = cipher_for(key)?;
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::OpenFailed)
    }

    fn aead_authenticate(
        &self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        check_nonce(nonce)?;
        let cipher = cipher_for(key)?;
        let sealed = cipher
            .encrypt(Nonce::from_slice(nonce), Payload { msg: &[], aad })
            .map_err(|_| CryptoError::AuthenticateFailed)?;
        Ok(sealed)
    }

    fn aead_verify(
        &self,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        tag: &[u8],
    ) -> Result<(), CryptoError> {
        check_nonce(nonce)?;
        let cipher = cipher_for(key)?;
        let opened = cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: tag, aad })
            .map_err(|_| CryptoError::VerifyFailed)?;
        if opened.is_empty() {
            Ok(())
        } else {
            Err(CryptoError::VerifyFailed)
        }
    }

    fn cipher_kat(&self) -> Result<(), CryptoError> {
        // NIST AES-256-GCM test vector.
        let mut key = [0u8; KEY_LEN];
        let nonce = [0u8; NONCE_LEN];
        let expected_ct = [
            0x53, 0x0f, 0x8a, 0xfb, 0xc7, 0x45, 0x36, 0xb9, 0xa9, 0x63, 0xb4, 0xf1, 0xc4, 0xcb,
            0x73, 0x8b,
        ];
        let result = self.aead_encrypt(&key, &nonce, &[], &[])?;
        key.zeroize();
        if result[..].ct_eq(&expected_ct[..]).into() {
            Ok(())
        } else {
            Err(CryptoError::KatMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let provider = Aes256GcmProvider;
        let key = [0x42u8; KEY_LEN];
        let nonce = [0x01u8; NONCE_LEN];
        let aad = b"gvcid:0:100:0";
        let plaintext = b"telecommand payload";

        let ct = provider
            .aead_encrypt(&key, &nonce, plaintext, aad)
            .expect("encrypt");
        let pt = provider
            .aead_decrypt(&key, &nonce, &ct, aad)
            .expect("decrypt");
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn tampered_aad_rejected() {
        let provider = Aes256GcmProvider;
        let key = [0x42u8; KEY_LEN];
        let nonce = [0x01u8; NONCE_LEN];
        let ct = provider
            .aead_encrypt(&key, &nonce, b"data", b"aad-a")
            .expect("encrypt");
        assert!(provider.aead_decrypt(&key, &nonce, &ct, b"aad-b").is_err());
    }

    #[test]
    fn wrong_key_length_rejected() {
        let provider = Aes256GcmProvider;
        let short_key = [0u8; 16];
        let nonce = [0u8; NONCE_LEN];
        let err = provider
            .aead_encrypt(&short_key, &nonce, b"x", b"")
            .unwrap_err();
        assert_eq!(
            err,
            CryptoError::BadKeyLength {
                expected: KEY_LEN,
                actual: 16
            }
        );
    }

    #[test]
    fn authenticate_then_verify() {
        let provider = Aes256GcmProvider;
        let key = [0x07u8; KEY_LEN];
        let nonce = [0x02u8; NONCE_LEN];
        let aad = b"sdls-pdu";
        let tag = provider.aead_authenticate(&key, &nonce, aad).expect("auth");
        provider
            .aead_verify(&key, &nonce, aad, &tag)
            .expect("verify");
    }
}
