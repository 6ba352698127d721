//! External SQL-backed `SaStore`, modeled on CryptoLib's MariaDB SADB
//! routine template. The `security_associations` table mirrors the SA
//! fields one column per field; binary columns (`iv`, `arc`, `abm`, `ecs`)
//! are bound as raw `Vec<u8>` parameters rather than hex strings, since
//! hex marshalling there is an accident of that transport, not a semantic
//! requirement of the column.

use mysql::prelude::Queryable;
use mysql::{params, Pool, PooledConn};
use sdls_crypto::Gvcid;
use std::sync::Mutex;

use crate::config::{SqlBackendConfig, TlsMode};
use crate::error::StoreError;
use crate::sa::{SaState, SecurityAssociation};
use crate::store::SaStore;

const SQL_GET_SA_BY_SPI: &str = "SELECT * FROM security_associations WHERE spi = :spi";
const SQL_GET_OPERATIONAL_BY_GVCID: &str = "SELECT * FROM security_associations \
     WHERE tfvn = :tfvn AND scid = :scid AND vcid = :vcid AND sa_state = 'operational'";
const SQL_GET_ANY_BY_GVCID: &str =
    "SELECT * FROM security_associations WHERE tfvn = :tfvn AND scid = :scid AND vcid = :vcid LIMIT 1";
const SQL_UPDATE_IV_ARC_BY_SPI: &str =
    "UPDATE security_associations SET iv = :iv, arc = :arc WHERE spi = :spi";
const SQL_INSERT_SA: &str =
    "INSERT INTO security_associations (spi, tfvn, scid, vcid, mapid, sa_state) \
     VALUES (:spi, :tfvn, :scid, :vcid, :mapid, 'unkeyed')";
const SQL_DELETE_SA: &str = "DELETE FROM security_associations WHERE spi = :spi";
const SQL_SET_STATE: &str = "UPDATE security_associations SET sa_state = :state WHERE spi = :spi";
const SQL_SET_ARSN: &str = "UPDATE security_associations SET arc = :arc WHERE spi = :spi";
const SQL_SET_ARSNW: &str = "UPDATE security_associations SET arcw = :arcw WHERE spi = :spi";
const SQL_REKEY: &str =
    "UPDATE security_associations SET ekid = :ekid, akid = :akid, sa_state = 'keyed' WHERE spi = :spi";
const SQL_FIND_OPERATIONAL_COLLISION: &str = "SELECT spi FROM security_associations \
     WHERE tfvn = :tfvn AND scid = :scid AND vcid = :vcid AND sa_state = 'operational' AND spi != :spi";
const SQL_EXPIRE: &str =
    "UPDATE security_associations SET sa_state = 'unkeyed', ekid = 0, akid = 0 WHERE spi = :spi";

fn state_label(state: SaState) -> &'static str {
    match state {
        SaState::Unkeyed => "unkeyed",
        SaState::Keyed => "keyed",
        SaState::Operational => "operational",
    }
}

fn parse_state(label: &str) -> Result<SaState, StoreError> {
    match label {
        "unkeyed" => Ok(SaState::Unkeyed),
        "keyed" => Ok(SaState::Keyed),
        "operational" => Ok(SaState::Operational),
        other => Err(StoreError::StoreUnavailable(format!(
            "unrecognized sa_state in row: {other}"
        ))),
    }
}

fn row_to_sa(row: mysql::Row) -> Result<SecurityAssociation, StoreError> {
    use mysql::from_row_opt;

    let (
        spi,
        ekid,
        akid,
        sa_state,
        tfvn,
        scid,
        vcid,
        mapid,
        est,
        ast,
        shivf_len,
        shsnf_len,
        shplf_len,
        stmacf_len,
        iv,
        arc,
        abm,
        arcw,
    ): (
        u16,
        u16,
        u16,
        String,
        u8,
        u16,
        u8,
        Option<u8>,
        bool,
        bool,
        u8,
        u8,
        u8,
        u8,
        Vec<u8>,
        Vec<u8>,
        Vec<u8>,
        u16,
    ) = from_row_opt(row).map_err(|e| StoreError::StoreUnavailable(e.to_string()))?;

    Ok(SecurityAssociation {
        spi,
        gvcid_tc: Gvcid::new(tfvn, scid, vcid, mapid),
        ekid,
        akid,
        sa_state: parse_state(&sa_state)?,
        est,
        ast,
        shivf_len,
        shsnf_len,
        shplf_len,
        stmacf_len,
        ecs_len: 0,
        ecs: [0; 4],
        acs_len: 0,
        acs: 0,
        iv,
        arc,
        arcw,
        arcw_len: 0,
        abm,
    })
}

/// Synchronous MariaDB/MySQL-backed `SaStore`. Fails closed: any query
/// error surfaces as `StoreUnavailable`, matching the source's
/// `finish_with_error` pattern (log, close, return the error code).
pub struct SqlStore {
    conn: Mutex<PooledConn>,
}

impl SqlStore {
    pub fn connect(config: &SqlBackendConfig) -> Result<Self, StoreError> {
        let scheme = match config.tls_mode {
            TlsMode::None => "mysql",
            TlsMode::ServerTls | TlsMode::MutualTls => "mysql",
        };
        let url = format!(
            "{scheme}://{}:{}@{}:{}/{}",
            config.user, config.pass, config.host, config.port, config.database
        );
        let pool = Pool::new(url.as_str())
            .map_err(|e| StoreError::StoreUnavailable(format!("connection failed: {e}")))?;
        let conn = pool
            .get_conn()
            .map_err(|e| StoreError::StoreUnavailable(format!("connection failed: {e}")))?;
        Ok(SqlStore {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut PooledConn) -> mysql::Result<T>,
    ) -> Result<T, StoreError> {
        let mut guard = self.conn.lock().expect("sql connection mutex poisoned");
        f(&mut guard).map_err(|e| StoreError::StoreUnavailable(e.to_string()))
    }
}

impl SaStore for SqlStore {
    fn get_by_spi(&self, spi: u16) -> Result<SecurityAssociation, StoreError> {
        let row: Option<mysql::Row> =
            self.with_conn(|c| c.exec_first(SQL_GET_SA_BY_SPI, params! { "spi" => spi }))?;
        match row {
            Some(row) => row_to_sa(row),
            None => Err(StoreError::SaNotFound { spi }),
        }
    }

    fn get_operational(&self, gvcid: &Gvcid) -> Result<SecurityAssociation, StoreError> {
        let row: Option<mysql::Row> = self.with_conn(|c| {
            c.exec_first(
                SQL_GET_OPERATIONAL_BY_GVCID,
                params! { "tfvn" => gvcid.tfvn, "scid" => gvcid.scid, "vcid" => gvcid.vcid },
            )
        })?;
        row.map(row_to_sa).transpose()?.ok_or(StoreError::NoOperationalSa)
    }

    fn get_any_for_gvcid(&self, gvcid: &Gvcid) -> Result<SecurityAssociation, StoreError> {
        let row: Option<mysql::Row> = self.with_conn(|c| {
            c.exec_first(
                SQL_GET_ANY_BY_GVCID,
                params! { "tfvn" => gvcid.tfvn, "scid" => gvcid.scid, "vcid" => gvcid.vcid },
            )
        })?;
        row.map(row_to_sa).transpose()?.ok_or(StoreError::NoOperationalSa)
    }

    fn save(&self, sa: &SecurityAssociation) -> Result<(), StoreError> {
        self.with_conn(|c| {
            c.exec_drop(
                SQL_UPDATE_IV_ARC_BY_SPI,
                params! { "iv" => sa.iv.clone(), "arc" => sa.arc.clone(), "spi" => sa.spi },
            )
        })
    }

    fn create(&self, spi: u16, gvcid: Gvcid) -> Result<(), StoreError> {
        self.with_conn(|c| {
            c.exec_drop(
                SQL_INSERT_SA,
                params! {
                    "spi" => spi,
                    "tfvn" => gvcid.tfvn,
                    "scid" => gvcid.scid,
                    "vcid" => gvcid.vcid,
                    "mapid" => gvcid.mapid,
                },
            )
        })
    }

    fn delete(&self, spi: u16) -> Result<(), StoreError> {
        self.with_conn(|c| c.exec_drop(SQL_DELETE_SA, params! { "spi" => spi }))
    }

    fn set_state(&self, spi: u16, new_state: SaState) -> Result<(), StoreError> {
        if new_state == SaState::Operational {
            let sa = self.get_by_spi(spi)?;
            sa.check_invariants()?;
            let gvcid = sa.gvcid_tc;
            let collision: Option<u16> = self.with_conn(|c| {
                c.exec_first(
                    SQL_FIND_OPERATIONAL_COLLISION,
                    params! {
                        "tfvn" => gvcid.tfvn,
                        "scid" => gvcid.scid,
                        "vcid" => gvcid.vcid,
                        "spi" => spi,
                    },
                )
            })?;
            if collision.is_some() {
                return Err(StoreError::InvalidTransition {
                    from: "keyed",
                    to: "operational",
                });
            }
        }
        self.with_conn(|c| {
            c.exec_drop(
                SQL_SET_STATE,
                params! { "state" => state_label(new_state), "spi" => spi },
            )
        })
    }

    fn set_arsn(&self, spi: u16, arc: Vec<u8>) -> Result<(), StoreError> {
        self.with_conn(|c| c.exec_drop(SQL_SET_ARSN, params! { "arc" => arc, "spi" => spi }))
    }

    fn set_arsnw(&self, spi: u16, arcw: u16) -> Result<(), StoreError> {
        self.with_conn(|c| c.exec_drop(SQL_SET_ARSNW, params! { "arcw" => arcw, "spi" => spi }))
    }

    fn rekey(&self, spi: u16, ekid: u16, akid: u16) -> Result<(), StoreError> {
        let sa = self.get_by_spi(spi)?;
        sa.check_invariants()?;
        self.with_conn(|c| {
            c.exec_drop(SQL_REKEY, params! { "ekid" => ekid, "akid" => akid, "spi" => spi })
        })
    }

    fn expire(&self, spi: u16) -> Result<(), StoreError> {
        self.with_conn(|c| c.exec_drop(SQL_EXPIRE, params! { "spi" => spi }))
    }
}
