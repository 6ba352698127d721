use std::error::Error;
use std::fmt;

/// Failure modes of the Crypto Provider interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material was not the length the cipher requires.
    BadKeyLength { expected: usize, actual: usize },
    /// Nonce/IV was not the length the cipher requires.
    BadNonceLength { expected: usize, actual: usize },
    /// AEAD seal operation failed.
    SealFailed,
    /// AEAD open (decrypt + verify) failed — ciphertext or tag did not match.
    OpenFailed,
    /// Authenticate-only operation failed.
    AuthenticateFailed,
    /// Verify-only operation rejected the tag.
    VerifyFailed,
    /// A known-answer-test vector did not reproduce the expected output.
    KatMismatch,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::BadKeyLength { expected, actual } => {
                write!(f, "bad key length: expected {expected}, got {actual}")
            }
            CryptoError::BadNonceLength { expected, actual } => {
                write!(f, "bad nonce length: expected {expected}, got {actual}")
            }
            CryptoError::SealFailed => write!(f, "AEAD seal failed"),
            CryptoError::OpenFailed => write!(f, "AEAD open failed"),
            CryptoError::AuthenticateFailed => write!(f, "AEAD authenticate failed"),
            CryptoError::VerifyFailed => write!(f, "AEAD verify failed"),
            CryptoError::KatMismatch => write!(f, "known-answer test did not match"),
        }
    }
}

impl Error for CryptoError {}
