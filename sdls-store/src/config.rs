/// Which `SaStore` backend the facade should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SadbType {
    InMemory,
    Sql,
}

/// TLS posture for the SQL backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    #[default]
    None,
    ServerTls,
    MutualTls,
}

/// Process-wide policy knobs, mirroring CryptoLib's `Crypto_Config_CryptoLib`
/// flat parameter list.
#[derive(Debug, Clone)]
pub struct Config {
    pub sadb_type: SadbType,
    pub create_fecf: bool,
    pub process_sdls_pdus: bool,
    pub has_pus_hdr: bool,
    pub ignore_sa_state: bool,
    pub ignore_anti_replay: bool,
    pub unique_sa_per_mapid: bool,
    pub check_fecf: bool,
    pub vcid_bitmask: u8,
    /// Not in CryptoLib's literal signature. Governs IV-rollover handling
    /// on encryption: when `false` (the default), a rolled-over IV is
    /// rejected rather than silently wrapped.
    pub iv_rollover_wrap: bool,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sadb_type: SadbType,
        create_fecf: bool,
        process_sdls_pdus: bool,
        has_pus_hdr: bool,
        ignore_sa_state: bool,
        ignore_anti_replay: bool,
        unique_sa_per_mapid: bool,
        check_fecf: bool,
        vcid_bitmask: u8,
    ) -> Self {
        Config {
            sadb_type,
            create_fecf,
            process_sdls_pdus,
            has_pus_hdr,
            ignore_sa_state,
            ignore_anti_replay,
            unique_sa_per_mapid,
            check_fecf,
            vcid_bitmask,
            iv_rollover_wrap: false,
        }
    }
}

/// SQL backend connection parameters.
#[derive(Debug, Clone)]
pub struct SqlBackendConfig {
    pub user: String,
    pub pass: String,
    pub host: String,
    pub database: String,
    pub port: u16,
    pub tls_mode: TlsMode,
    pub ssl_cert: Option<String>,
    pub ssl_key: Option<String>,
    pub ssl_ca: Option<String>,
    pub ssl_capath: Option<String>,
}

impl SqlBackendConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user: impl Into<String>,
        pass: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        port: u16,
        tls_mode: TlsMode,
        ssl_cert: Option<String>,
        ssl_key: Option<String>,
        ssl_ca: Option<String>,
        ssl_capath: Option<String>,
    ) -> Self {
        SqlBackendConfig {
            user: user.into(),
            pass: pass.into(),
            host: host.into(),
            database: database.into(),
            port,
            tls_mode,
            ssl_cert,
            ssl_key,
            ssl_ca,
            ssl_capath,
        }
    }
}
