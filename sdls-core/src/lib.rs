#![forbid(unsafe_code)]

//! TC/TM security pipelines and SDLS PDU command handling over CCSDS
//! transfer frames. This crate owns the orchestration layer: frame parsing,
//! the apply/process pipelines, the SDLS PDU handler, and the `Library`
//! facade that binds configuration, managed parameters, the key ring, and
//! the SA store together.

pub mod clcw;
pub mod error;
pub mod frame;
pub mod fsr;
pub mod library;
pub mod pdu;
pub mod pipeline;

pub use error::SdlsError;
pub use library::Library;
pub use pipeline::{ProcessOutcome, ProcessRejection};

pub use sdls_crypto::Gvcid;
pub use sdls_store::{Config, SadbType, SqlBackendConfig, TlsMode};
