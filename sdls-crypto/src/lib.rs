#![forbid(unsafe_code)]

//! Narrow AEAD and CRC interfaces for the SDLS security library. This crate
//! knows nothing about frames, Security Associations, or the SDLS PDU
//! protocol — it only implements the two leaf primitives those layers call
//! through: an authenticated-encryption provider and a table-driven CRC
//! engine.

mod aead;
mod crc;
mod error;
mod gvcid;

pub use aead::{Aes256GcmProvider, CryptoProvider, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use crc::{build_crc16_table, build_crc32_table, CrcEngine};
pub use error::CryptoError;
pub use gvcid::Gvcid;
