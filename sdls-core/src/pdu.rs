//! SDLS PDU command handler. Parses the 6-byte SDLS command header,
//! dispatches on PID, mutates the target SA through the `SaStore` trait
//! (a trait stands in for CryptoLib's `SadbRoutineStruct` function-pointer
//! dispatch), and composes the Frame Security Report reply.

use sdls_crypto::Gvcid;
use sdls_store::{AuditAction, AuditEvent, AuditSink, SaState, SaStore};

use crate::error::SdlsError;
use crate::fsr::FrameSecurityReport;

pub const PDU_HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pid {
    SaStart = 1,
    SaStop = 2,
    SaRekey = 3,
    SaExpire = 4,
    SaCreate = 5,
    SaSetArsn = 6,
    SaSetArsnw = 7,
    SaDelete = 8,
    SaStatus = 9,
}

impl Pid {
    fn from_u8(v: u8) -> Result<Self, SdlsError> {
        Ok(match v {
            1 => Pid::SaStart,
            2 => Pid::SaStop,
            3 => Pid::SaRekey,
            4 => Pid::SaExpire,
            5 => Pid::SaCreate,
            6 => Pid::SaSetArsn,
            7 => Pid::SaSetArsnw,
            8 => Pid::SaDelete,
            9 => Pid::SaStatus,
            _ => return Err(SdlsError::SdlsPduMalformed),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PduHeader {
    pub pdu_type: u8,
    pub uf: bool,
    pub sg: bool,
    pub pid: Pid,
    pub pdu_len: u16,
}

impl PduHeader {
    pub fn parse(data: &[u8]) -> Result<Self, SdlsError> {
        if data.len() < PDU_HEADER_LEN {
            return Err(SdlsError::SdlsPduMalformed);
        }
        let pdu_type = data[0];
        let uf = data[1] & 0x80 != 0;
        let sg = data[1] & 0x40 != 0;
        let pid = Pid::from_u8(data[1] & 0x3F)?;
        let pdu_len = u16::from_be_bytes([data[2], data[3]]);
        Ok(PduHeader {
            pdu_type,
            uf,
            sg,
            pid,
            pdu_len,
        })
    }
}

/// SA_STATUS's reply is a status dump, not an FSR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaStatusReport {
    pub spi: u16,
    pub sa_state: SaState,
    pub ekid: u16,
    pub akid: u16,
    pub arc: Vec<u8>,
    pub arcw: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PduReply {
    Fsr(FrameSecurityReport),
    Status(SaStatusReport),
}

fn read_spi(body: &[u8]) -> Result<u16, SdlsError> {
    if body.len() < 2 {
        return Err(SdlsError::SdlsPduMalformed);
    }
    Ok(u16::from_be_bytes([body[0], body[1]]))
}

/// Dispatches one SDLS command PDU. Every transition is validated before
/// mutating, so no call ever applies a partial mutation; a rejected
/// transition returns an FSR with the alarm flag set rather than an error,
/// except malformed input, which is rejected outright.
pub fn handle_pdu(store: &dyn SaStore, audit: &dyn AuditSink, pdu: &[u8]) -> Result<PduReply, SdlsError> {
    let header = PduHeader::parse(pdu)?;
    let body = &pdu[PDU_HEADER_LEN..];

    match header.pid {
        Pid::SaStart => {
            let spi = read_spi(body)?;
            match store.set_state(spi, SaState::Operational) {
                Ok(()) => {
                    audit.record(AuditEvent { spi, action: AuditAction::SaStarted });
                    Ok(PduReply::Fsr(FrameSecurityReport::ok(spi)))
                }
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaStop => {
            let spi = read_spi(body)?;
            match store.set_state(spi, SaState::Keyed) {
                Ok(()) => {
                    audit.record(AuditEvent { spi, action: AuditAction::SaStopped });
                    Ok(PduReply::Fsr(FrameSecurityReport::ok(spi)))
                }
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaRekey => {
            if body.len() < 6 {
                return Err(SdlsError::SdlsPduMalformed);
            }
            let spi = read_spi(body)?;
            let ekid = u16::from_be_bytes([body[2], body[3]]);
            let akid = u16::from_be_bytes([body[4], body[5]]);
            match store.rekey(spi, ekid, akid) {
                Ok(()) => {
                    audit.record(AuditEvent { spi, action: AuditAction::SaRekeyed });
                    Ok(PduReply::Fsr(FrameSecurityReport::ok(spi)))
                }
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaExpire => {
            let spi = read_spi(body)?;
            match store.expire(spi) {
                Ok(()) => {
                    audit.record(AuditEvent { spi, action: AuditAction::SaExpired });
                    Ok(PduReply::Fsr(FrameSecurityReport::ok(spi)))
                }
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaCreate => {
            if body.len() < 6 {
                return Err(SdlsError::SdlsPduMalformed);
            }
            let spi = read_spi(body)?;
            let tfvn = body[2];
            let scid = u16::from_be_bytes([body[3], body[4]]);
            let vcid = body[5];
            let mapid = body.get(6).and_then(|&b| if b == 0xFF { None } else { Some(b) });
            match store.create(spi, Gvcid::new(tfvn, scid, vcid, mapid)) {
                Ok(()) => {
                    audit.record(AuditEvent { spi, action: AuditAction::SaCreated });
                    Ok(PduReply::Fsr(FrameSecurityReport::ok(spi)))
                }
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaSetArsn => {
            if body.len() < 3 {
                return Err(SdlsError::SdlsPduMalformed);
            }
            let spi = read_spi(body)?;
            let arc_len = body[2] as usize;
            let arc = body.get(3..3 + arc_len).ok_or(SdlsError::SdlsPduMalformed)?.to_vec();
            match store.set_arsn(spi, arc) {
                Ok(()) => Ok(PduReply::Fsr(FrameSecurityReport::ok(spi))),
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaSetArsnw => {
            if body.len() < 4 {
                return Err(SdlsError::SdlsPduMalformed);
            }
            let spi = read_spi(body)?;
            let arcw = u16::from_be_bytes([body[2], body[3]]);
            match store.set_arsnw(spi, arcw) {
                Ok(()) => Ok(PduReply::Fsr(FrameSecurityReport::ok(spi))),
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaDelete => {
            let spi = read_spi(body)?;
            match store.delete(spi) {
                Ok(()) => {
                    audit.record(AuditEvent { spi, action: AuditAction::SaDeleted });
                    Ok(PduReply::Fsr(FrameSecurityReport::ok(spi)))
                }
                Err(_) => Ok(PduReply::Fsr(alarm(spi))),
            }
        }
        Pid::SaStatus => {
            let spi = read_spi(body)?;
            let sa = store.get_by_spi(spi)?;
            Ok(PduReply::Status(SaStatusReport {
                spi: sa.spi,
                sa_state: sa.sa_state,
                ekid: sa.ekid,
                akid: sa.akid,
                arc: sa.arc,
                arcw: sa.arcw,
            }))
        }
    }
}

fn alarm(spi: u16) -> FrameSecurityReport {
    FrameSecurityReport {
        af: true,
        ..FrameSecurityReport::ok(spi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdls_store::{InMemoryAuditSink, InMemoryStore};

    fn header(pid: u8) -> [u8; PDU_HEADER_LEN] {
        [0x10, pid, 0, 0, 0, 0]
    }

    #[test]
    fn sa_start_on_keyed_sa_succeeds() {
        let store = InMemoryStore::new();
        let audit = InMemoryAuditSink::new();
        store.create(1, Gvcid::new(0, 0x3FF, 0, None)).unwrap();
        store.rekey(1, 130, 130).unwrap();

        let mut pdu = header(1).to_vec();
        pdu.extend_from_slice(&1u16.to_be_bytes());

        let reply = handle_pdu(&store, &audit, &pdu).unwrap();
        match reply {
            PduReply::Fsr(fsr) => assert!(!fsr.af),
            _ => panic!("expected fsr"),
        }
        assert_eq!(store.get_by_spi(1).unwrap().sa_state, SaState::Operational);
    }

    #[test]
    fn sa_start_on_unkeyed_sa_sets_alarm() {
        let store = InMemoryStore::new();
        let audit = InMemoryAuditSink::new();
        store.create(1, Gvcid::new(0, 0x3FF, 0, None)).unwrap();

        let mut pdu = header(1).to_vec();
        pdu.extend_from_slice(&1u16.to_be_bytes());

        let reply = handle_pdu(&store, &audit, &pdu).unwrap();
        match reply {
            PduReply::Fsr(fsr) => assert!(fsr.af),
            _ => panic!("expected fsr"),
        }
    }

    #[test]
    fn malformed_pid_rejected() {
        let store = InMemoryStore::new();
        let audit = InMemoryAuditSink::new();
        let pdu = header(99).to_vec();
        assert_eq!(handle_pdu(&store, &audit, &pdu), Err(SdlsError::SdlsPduMalformed));
    }
}
