use std::error::Error;
use std::fmt;

use sdls_crypto::CryptoError;
use sdls_store::StoreError;

/// Stable error taxonomy for every public operation. Callers that need the
/// legacy `CRYPTO_LIB_*` numeric contract get it via `code()` without
/// string matching on `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdlsError {
    ConfigurationNotComplete,
    ManagedParamNotFound,
    SadbBackendUnavailable(String),
    SadbInvalidType,
    SaNotFound { spi: u16 },
    SaNotOperational,
    KeyStateInvalid,
    IvRollover,
    AntiReplayReject,
    BadMac,
    BadFecf,
    SpiInvalid,
    SdlsPduMalformed,
    CryptoBackendError,
    NullBuffer,
    InvalidTransition,
    Duplicate,
}

impl SdlsError {
    pub fn code(&self) -> i32 {
        match self {
            SdlsError::ConfigurationNotComplete => 1,
            SdlsError::ManagedParamNotFound => 2,
            SdlsError::SadbBackendUnavailable(_) => 3,
            SdlsError::SadbInvalidType => 4,
            SdlsError::SaNotFound { .. } => 5,
            SdlsError::SaNotOperational => 6,
            SdlsError::KeyStateInvalid => 7,
            SdlsError::IvRollover => 8,
            SdlsError::AntiReplayReject => 9,
            SdlsError::BadMac => 10,
            SdlsError::BadFecf => 11,
            SdlsError::SpiInvalid => 12,
            SdlsError::SdlsPduMalformed => 13,
            SdlsError::CryptoBackendError => 14,
            SdlsError::NullBuffer => 15,
            SdlsError::InvalidTransition => 16,
            SdlsError::Duplicate => 17,
        }
    }
}

impl fmt::Display for SdlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdlsError::ConfigurationNotComplete => write!(f, "configuration not complete"),
            SdlsError::ManagedParamNotFound => write!(f, "managed parameter not found"),
            SdlsError::SadbBackendUnavailable(msg) => write!(f, "sadb backend unavailable: {msg}"),
            SdlsError::SadbInvalidType => write!(f, "invalid sadb type"),
            SdlsError::SaNotFound { spi } => write!(f, "sa not found: spi {spi}"),
            SdlsError::SaNotOperational => write!(f, "sa not operational"),
            SdlsError::KeyStateInvalid => write!(f, "key state invalid"),
            SdlsError::IvRollover => write!(f, "iv rollover"),
            SdlsError::AntiReplayReject => write!(f, "anti-replay reject"),
            SdlsError::BadMac => write!(f, "bad mac"),
            SdlsError::BadFecf => write!(f, "bad fecf"),
            SdlsError::SpiInvalid => write!(f, "spi invalid"),
            SdlsError::SdlsPduMalformed => write!(f, "sdls pdu malformed"),
            SdlsError::CryptoBackendError => write!(f, "crypto backend error"),
            SdlsError::NullBuffer => write!(f, "null buffer"),
            SdlsError::InvalidTransition => write!(f, "invalid sa state transition"),
            SdlsError::Duplicate => write!(f, "duplicate"),
        }
    }
}

impl Error for SdlsError {}

impl From<StoreError> for SdlsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SaNotFound { spi } => SdlsError::SaNotFound { spi },
            StoreError::NoOperationalSa => SdlsError::SaNotOperational,
            StoreError::InvalidTransition { .. } => SdlsError::InvalidTransition,
            StoreError::Duplicate { .. } => SdlsError::Duplicate,
            StoreError::StoreUnavailable(msg) => SdlsError::SadbBackendUnavailable(msg),
            StoreError::KeyNotFound { .. } | StoreError::KeyStateInvalid { .. } => {
                SdlsError::KeyStateInvalid
            }
            StoreError::ManagedParamNotFound => SdlsError::ManagedParamNotFound,
            StoreError::ManagedParamDuplicate => SdlsError::Duplicate,
        }
    }
}

impl From<CryptoError> for SdlsError {
    fn from(_: CryptoError) -> Self {
        SdlsError::CryptoBackendError
    }
}
