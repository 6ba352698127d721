//! The top-level facade: init/shutdown lifecycle, binds the Config Registry
//! and Managed-Parameter Table, dispatches the public entry points. A
//! single `Library` context owns everything CryptoLib scattered across
//! process globals (`crypto_config`, `gvcid_managed_parameters`,
//! `sadb_mariadb_config`, `ek_ring`, `tm_frame`).

use sdls_crypto::{Aes256GcmProvider, CrcEngine, CryptoProvider, Gvcid};
use sdls_store::{
    AuditSink, Config, InMemoryAuditSink, KeyRing, ManagedParameterTable, SaStore, SadbType,
    SqlBackendConfig,
};

use crate::error::SdlsError;
use crate::fsr::FrameSecurityReport;
use crate::pipeline::{self, ProcessOutcome, ProcessRejection};

/// Owns every piece of process-wide state the facade's entry points need.
/// Constructed once by `init`, released entirely by `shutdown` — unlike the
/// source's `Crypto_Shutdown`, which leaves the statically-allocated key
/// ring and TM frame buffers behind, dropping this struct frees everything.
pub struct Library {
    config: Option<Config>,
    sql_config: Option<SqlBackendConfig>,
    managed_params: ManagedParameterTable,
    keys: KeyRing,
    store: Option<Box<dyn SaStore>>,
    crypto: Aes256GcmProvider,
    crc: CrcEngine,
    audit: Box<dyn AuditSink>,
    ready: bool,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    pub fn new() -> Self {
        Library {
            config: None,
            sql_config: None,
            managed_params: ManagedParameterTable::new(),
            keys: KeyRing::new(),
            store: None,
            crypto: Aes256GcmProvider,
            crc: CrcEngine::new(),
            audit: Box::new(InMemoryAuditSink::new()),
            ready: false,
        }
    }

    pub fn with_audit_sink(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Mirrors `Crypto_Config_CryptoLib`'s flat parameter configure call.
    pub fn configure(&mut self, config: Config) {
        self.config = Some(config);
    }

    /// Mirrors `Crypto_Config_MariaDB`. Required before `init()` when
    /// `config.sadb_type == SadbType::Sql`.
    pub fn configure_sql_backend(&mut self, sql_config: SqlBackendConfig) {
        self.sql_config = Some(sql_config);
    }

    pub fn add_managed_parameter(
        &mut self,
        tfvn: u8,
        scid: u16,
        vcid: u8,
        has_fecf: bool,
        has_segment_hdrs: bool,
    ) -> Result<(), SdlsError> {
        self.managed_params
            .add(tfvn, scid, vcid, has_fecf, has_segment_hdrs)
            .map_err(Into::into)
    }

    /// Loads the demo key ring (test-scaffolding; real deployments load
    /// keys from a provisioned HSM/keystore instead).
    pub fn load_demo_keys(&mut self) {
        self.keys = KeyRing::with_demo_keys();
    }

    pub fn insert_key(&mut self, key: sdls_store::Key) {
        self.keys.insert(key);
    }

    /// Validates configuration is complete, selects and opens the SA Store
    /// backend, and runs the crypto provider's known-answer test — mirrors
    /// `Crypto_Init`'s validation-then-backend-select-then-KAT sequence.
    pub fn init(&mut self) -> Result<(), SdlsError> {
        let config = self.config.as_ref().ok_or(SdlsError::ConfigurationNotComplete)?;
        if self.managed_params.is_empty() {
            return Err(SdlsError::ManagedParamNotFound);
        }

        self.crypto.cipher_kat()?;

        let store: Box<dyn SaStore> = match config.sadb_type {
            SadbType::InMemory => Box::new(sdls_store::InMemoryStore::new()),
            SadbType::Sql => {
                #[cfg(feature = "sql-backend")]
                {
                    let sql_config = self
                        .sql_config
                        .as_ref()
                        .ok_or(SdlsError::ConfigurationNotComplete)?;
                    Box::new(sdls_store::SqlStore::connect(sql_config)?)
                }
                #[cfg(not(feature = "sql-backend"))]
                {
                    return Err(SdlsError::SadbInvalidType);
                }
            }
        };

        self.store = Some(store);
        self.ready = true;
        Ok(())
    }

    /// Releases every owned resource and resets `ready` so re-init is legal.
    pub fn shutdown(&mut self) {
        self.config = None;
        self.sql_config = None;
        self.store = None;
        self.keys = KeyRing::new();
        self.ready = false;
    }

    fn require_ready(&self) -> Result<(&Config, &dyn SaStore), SdlsError> {
        if !self.ready {
            return Err(SdlsError::ConfigurationNotComplete);
        }
        let config = self.config.as_ref().ok_or(SdlsError::ConfigurationNotComplete)?;
        let store = self
            .store
            .as_deref()
            .ok_or(SdlsError::ConfigurationNotComplete)?;
        Ok((config, store))
    }

    pub fn apply_security_tc(&self, plain: &[u8], gvcid: Gvcid) -> Result<Vec<u8>, SdlsError> {
        let (config, store) = self.require_ready()?;
        pipeline::apply_security_tc(
            config,
            &self.managed_params,
            store,
            &self.keys,
            &self.crypto,
            &self.crc,
            self.audit.as_ref(),
            plain,
            gvcid,
        )
    }

    pub fn apply_security_tm(&self, plain: &[u8]) -> Result<Vec<u8>, SdlsError> {
        let (config, store) = self.require_ready()?;
        pipeline::apply_security_tm(
            config,
            &self.managed_params,
            store,
            &self.keys,
            &self.crypto,
            &self.crc,
            self.audit.as_ref(),
            plain,
        )
    }

    pub fn process_security_tc(&self, protected: &[u8]) -> Result<ProcessOutcome, ProcessRejection> {
        let (config, store) = self.require_ready().map_err(|e| ProcessRejection {
            error: e,
            report: FrameSecurityReport::rejected(0),
        })?;
        pipeline::process_security_tc(
            config,
            &self.managed_params,
            store,
            &self.keys,
            &self.crypto,
            &self.crc,
            self.audit.as_ref(),
            protected,
        )
    }

    pub fn handle_pdu(&self, pdu: &[u8]) -> Result<crate::pdu::PduReply, SdlsError> {
        let (_config, store) = self.require_ready()?;
        crate::pdu::handle_pdu(store, self.audit.as_ref(), pdu)
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Seeds the store with a fully-specified SA (cipher parameters, header
    /// widths, initial state) in one step. The SDLS PDU protocol only
    /// covers lifecycle transitions (start/stop/rekey/...); the initial
    /// cipher provisioning is a deployment/test concern that, in the SQL
    /// backend, corresponds to populating the `security_associations`
    /// table's static columns directly rather than through a PDU.
    pub fn provision_sa(&self, sa: sdls_store::SecurityAssociation) -> Result<(), SdlsError> {
        let (_config, store) = self.require_ready()?;
        store.create(sa.spi, sa.gvcid_tc)?;
        store.save(&sa)?;
        Ok(())
    }
}
