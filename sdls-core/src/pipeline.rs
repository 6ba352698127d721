//! TC Apply and TC Process pipelines.

use sdls_crypto::{CrcEngine, CryptoProvider, Gvcid};
use sdls_store::{
    AuditAction, AuditEvent, AuditSink, Config, KeyRing, ManagedParameterTable, SaState, SaStore,
    SecurityAssociation,
};

use crate::error::SdlsError;
use crate::frame::tc::{TcFrameLayout, TcPrimaryHeader, PRIMARY_HEADER_LEN, SEGMENT_HEADER_LEN};
use crate::frame::tm::TmPrimaryHeader;
use crate::fsr::FrameSecurityReport;
use crate::pdu::{self, PduReply, PDU_HEADER_LEN};

/// Successful outcome of `process_security_tc`: the recovered plaintext
/// payload plus the Frame Security Report every inbound frame produces.
/// `pdu_reply` is populated when the plaintext was recognized and
/// dispatched as an SDLS control PDU; a malformed or unrecognized PDU body
/// is left as plaintext rather than failing the whole process call.
pub struct ProcessOutcome {
    pub plaintext: Vec<u8>,
    pub report: FrameSecurityReport,
    pub pdu_reply: Option<PduReply>,
}

/// A rejected `process_security_tc` call: the `SdlsError` a caller matches
/// on, paired with the Frame Security Report the frame's rejection produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRejection {
    pub error: SdlsError,
    pub report: FrameSecurityReport,
}

impl std::fmt::Display for ProcessRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ProcessRejection {}

/// Computes the next IV/ARC without mutating `sa` — the caller only commits
/// them once the crypto operation that uses them has actually succeeded.
fn next_counters(sa: &SecurityAssociation) -> (Vec<u8>, bool, Vec<u8>) {
    let mut probe = sa.clone();
    let iv_wrapped = probe.increment_iv();
    probe.increment_arc();
    (probe.iv, iv_wrapped, probe.arc)
}

fn build_aad(covered: &[u8], abm: &[u8]) -> Vec<u8> {
    if abm.is_empty() {
        return covered.to_vec();
    }
    covered
        .iter()
        .zip(abm.iter().cycle())
        .map(|(&b, &m)| b & m)
        .collect()
}

fn be_bytes_to_u128(bytes: &[u8]) -> u128 {
    let mut v = 0u128;
    for &b in bytes.iter().rev().take(16).rev() {
        v = (v << 8) | b as u128;
    }
    v
}

fn anti_replay_ok(arsn_rx: u128, arsn_exp: u128, arcw: u128, field_len_bytes: usize) -> bool {
    let bits = (field_len_bytes * 8).min(127) as u32;
    let modulus: u128 = if field_len_bytes * 8 >= 128 {
        0
    } else {
        1u128 << bits
    };
    if modulus == 0 {
        return arsn_rx > arsn_exp && arsn_rx <= arsn_exp.saturating_add(arcw);
    }
    let diff = (arsn_rx + modulus - (arsn_exp % modulus)) % modulus;
    diff != 0 && diff <= arcw
}

#[allow(clippy::too_many_arguments)]
pub fn apply_security_tc(
    config: &Config,
    managed_params: &ManagedParameterTable,
    store: &dyn SaStore,
    keys: &KeyRing,
    crypto: &dyn CryptoProvider,
    crc: &CrcEngine,
    audit: &dyn AuditSink,
    plain: &[u8],
    gvcid: Gvcid,
) -> Result<Vec<u8>, SdlsError> {
    if plain.len() < PRIMARY_HEADER_LEN {
        return Err(SdlsError::NullBuffer);
    }
    let primary = TcPrimaryHeader::parse(plain)?;
    let managed = managed_params.get(primary.tfvn, primary.scid, primary.vcid)?;
    let has_segment_hdr = managed.has_segment_hdrs;
    let has_fecf = managed.has_fecf;

    let mut sa = match store.get_operational(&gvcid) {
        Ok(sa) => sa,
        Err(_) if config.ignore_sa_state => store.get_any_for_gvcid(&gvcid)?,
        Err(e) => return Err(e.into()),
    };

    if sa.sa_state != SaState::Operational && !config.ignore_sa_state {
        audit.record(AuditEvent {
            spi: sa.spi,
            action: AuditAction::ApplyRejected {
                reason: "sa not operational",
            },
        });
        return Err(SdlsError::SaNotOperational);
    }

    let ekey_value = keys.require_encrypt_key(sa.ekid)?.value;
    let akey_value = if sa.ast {
        Some(keys.require_encrypt_key(sa.akid)?.value)
    } else {
        None
    };

    let (next_iv, iv_wrapped, next_arc) = next_counters(&sa);
    if iv_wrapped && !config.iv_rollover_wrap {
        audit.record(AuditEvent {
            spi: sa.spi,
            action: AuditAction::ApplyRejected { reason: "iv rollover" },
        });
        return Err(SdlsError::IvRollover);
    }

    let body_offset = PRIMARY_HEADER_LEN
        + if has_segment_hdr { SEGMENT_HEADER_LEN } else { 0 };
    if plain.len() < body_offset {
        return Err(SdlsError::NullBuffer);
    }
    let body = &plain[body_offset..];

    let mut out = Vec::with_capacity(plain.len() + 32);
    out.extend_from_slice(&plain[..PRIMARY_HEADER_LEN]);
    if has_segment_hdr {
        out.push(plain[PRIMARY_HEADER_LEN]);
    }
    out.extend_from_slice(&sa.spi.to_be_bytes());
    out.extend_from_slice(&next_iv);
    out.extend_from_slice(&next_arc);
    out.extend(std::iter::repeat(0u8).take(sa.shplf_len as usize));

    let aad = build_aad(&out, &sa.abm);

    if sa.est {
        let sealed = crypto.aead_encrypt(&ekey_value, &next_iv, body, &aad)?;
        out.extend_from_slice(&sealed);
    } else if sa.ast {
        let akey = akey_value.expect("ast implies akid resolved above");
        out.extend_from_slice(body);
        let tag = crypto.aead_authenticate(&akey, &next_iv, &aad)?;
        let take = (sa.stmacf_len as usize).min(tag.len());
        out.extend_from_slice(&tag[..take]);
    } else {
        out.extend_from_slice(body);
    }

    if has_fecf && config.create_fecf {
        let crc_value = crc.crc16(&out);
        out.extend_from_slice(&crc_value.to_be_bytes());
    }

    sa.iv = next_iv;
    sa.arc = next_arc;
    store.save(&sa)?;
    audit.record(AuditEvent {
        spi: sa.spi,
        action: AuditAction::ApplySucceeded,
    });

    Ok(out)
}

#[allow(clippy::too_many_arguments)]
pub fn process_security_tc(
    config: &Config,
    managed_params: &ManagedParameterTable,
    store: &dyn SaStore,
    keys: &KeyRing,
    crypto: &dyn CryptoProvider,
    crc: &CrcEngine,
    audit: &dyn AuditSink,
    protected: &[u8],
) -> Result<ProcessOutcome, ProcessRejection> {
    if protected.len() < PRIMARY_HEADER_LEN {
        return Err(ProcessRejection {
            error: SdlsError::NullBuffer,
            report: FrameSecurityReport::rejected(0),
        });
    }
    let primary = TcPrimaryHeader::parse(protected).map_err(|e| ProcessRejection {
        error: e,
        report: FrameSecurityReport::rejected(0),
    })?;
    let managed = managed_params
        .get(primary.tfvn, primary.scid, primary.vcid)
        .map_err(|e| ProcessRejection {
            error: e.into(),
            report: FrameSecurityReport::rejected(0),
        })?;

    let spi_offset = PRIMARY_HEADER_LEN + if managed.has_segment_hdrs { SEGMENT_HEADER_LEN } else { 0 };
    if protected.len() < spi_offset + 2 {
        audit.record(AuditEvent {
            spi: 0,
            action: AuditAction::ProcessRejected { reason: "spi invalid" },
        });
        return Err(ProcessRejection {
            error: SdlsError::SpiInvalid,
            report: FrameSecurityReport::invalid_spi(0),
        });
    }
    let spi = u16::from_be_bytes([protected[spi_offset], protected[spi_offset + 1]]);

    let mut sa = store.get_by_spi(spi).map_err(|_| {
        audit.record(AuditEvent {
            spi,
            action: AuditAction::ProcessRejected { reason: "spi invalid" },
        });
        ProcessRejection {
            error: SdlsError::SpiInvalid,
            report: FrameSecurityReport::invalid_spi(spi),
        }
    })?;

    if sa.sa_state != SaState::Operational {
        audit.record(AuditEvent {
            spi,
            action: AuditAction::ProcessRejected {
                reason: "sa not operational",
            },
        });
        return Err(ProcessRejection {
            error: SdlsError::SaNotOperational,
            report: FrameSecurityReport::rejected(spi),
        });
    }

    let layout = TcFrameLayout::parse(
        protected,
        managed.has_segment_hdrs,
        sa.security_header_len(),
        sa.stmacf_len as usize,
        managed.has_fecf,
    )
    .map_err(|e| ProcessRejection {
        error: e,
        report: FrameSecurityReport::rejected(spi),
    })?;

    if config.check_fecf && managed.has_fecf {
        if let Some(fecf) = layout.fecf {
            let covered = &protected[..protected.len() - 2];
            let expected = crc.crc16(covered).to_be_bytes();
            if expected != fecf {
                audit.record(AuditEvent {
                    spi,
                    action: AuditAction::ProcessRejected { reason: "bad fecf" },
                });
                return Err(ProcessRejection {
                    error: SdlsError::BadFecf,
                    report: FrameSecurityReport::bad_fecf(spi),
                });
            }
        }
    }

    let iv = &layout.security_header[..sa.shivf_len as usize];
    let arsn_bytes = &layout.security_header
        [sa.shivf_len as usize..sa.shivf_len as usize + sa.shsnf_len as usize];
    let arsn_rx = be_bytes_to_u128(arsn_bytes);
    let arsn_exp = be_bytes_to_u128(&sa.arc);

    if !config.ignore_anti_replay
        && !anti_replay_ok(arsn_rx, arsn_exp, sa.arcw as u128, sa.shsnf_len as usize)
    {
        audit.record(AuditEvent {
            spi,
            action: AuditAction::ProcessRejected { reason: "anti-replay" },
        });
        let snval = arsn_bytes.last().copied().unwrap_or(0);
        return Err(ProcessRejection {
            error: SdlsError::AntiReplayReject,
            report: FrameSecurityReport::anti_replay(spi, snval),
        });
    }

    let aad = build_aad(&protected[..layout.aad_covered_len()], &sa.abm);

    let plaintext = if sa.est {
        let ekey_value = keys
            .require_decrypt_key(sa.ekid)
            .map_err(|e| ProcessRejection {
                error: e.into(),
                report: FrameSecurityReport::rejected(spi),
            })?
            .value;

        let mut ciphertext_and_tag =
            Vec::with_capacity(layout.payload.len() + layout.trailer.len());
        ciphertext_and_tag.extend_from_slice(layout.payload);
        ciphertext_and_tag.extend_from_slice(layout.trailer);

        crypto
            .aead_decrypt(&ekey_value, iv, &ciphertext_and_tag, &aad)
            .map_err(|_| {
                audit.record(AuditEvent {
                    spi,
                    action: AuditAction::ProcessRejected { reason: "bad mac" },
                });
                ProcessRejection {
                    error: SdlsError::BadMac,
                    report: FrameSecurityReport::bad_mac(spi),
                }
            })?
    } else if sa.ast {
        let akey_value = keys
            .require_decrypt_key(sa.akid)
            .map_err(|e| ProcessRejection {
                error: e.into(),
                report: FrameSecurityReport::rejected(spi),
            })?
            .value;

        crypto
            .aead_verify(&akey_value, iv, &aad, layout.trailer)
            .map_err(|_| {
                audit.record(AuditEvent {
                    spi,
                    action: AuditAction::ProcessRejected { reason: "bad mac" },
                });
                ProcessRejection {
                    error: SdlsError::BadMac,
                    report: FrameSecurityReport::bad_mac(spi),
                }
            })?;
        layout.payload.to_vec()
    } else {
        layout.payload.to_vec()
    };

    sa.arc = arsn_bytes.to_vec();
    store.save(&sa).map_err(|e| ProcessRejection {
        error: e.into(),
        report: FrameSecurityReport::rejected(spi),
    })?;
    audit.record(AuditEvent {
        spi,
        action: AuditAction::ProcessSucceeded,
    });

    let pdu_reply = if config.process_sdls_pdus && plaintext.len() >= PDU_HEADER_LEN {
        pdu::handle_pdu(store, audit, &plaintext).ok()
    } else {
        None
    };

    Ok(ProcessOutcome {
        plaintext,
        report: FrameSecurityReport::ok(spi),
        pdu_reply,
    })
}

/// TM Apply Pipeline, structured the same way as TC Apply. Builds the SDLS
/// security header after the TM primary header, encrypts or authenticates
/// the data field, and appends the OCF (if `ocff`) and FECF (if the
/// managed parameter for this VC carries one) after the MAC.
#[allow(clippy::too_many_arguments)]
pub fn apply_security_tm(
    config: &Config,
    managed_params: &ManagedParameterTable,
    store: &dyn SaStore,
    keys: &KeyRing,
    crypto: &dyn CryptoProvider,
    crc: &CrcEngine,
    audit: &dyn AuditSink,
    plain: &[u8],
) -> Result<Vec<u8>, SdlsError> {
    use crate::frame::tm::PRIMARY_HEADER_LEN as TM_PRIMARY_HEADER_LEN;

    if plain.len() < TM_PRIMARY_HEADER_LEN {
        return Err(SdlsError::NullBuffer);
    }
    let primary = TmPrimaryHeader::parse(plain)?;
    let managed = managed_params.get(primary.tfvn, primary.scid, primary.vcid)?;
    let gvcid = Gvcid::new(primary.tfvn, primary.scid, primary.vcid, None);

    let mut sa = match store.get_operational(&gvcid) {
        Ok(sa) => sa,
        Err(_) if config.ignore_sa_state => store.get_any_for_gvcid(&gvcid)?,
        Err(e) => return Err(e.into()),
    };

    if sa.sa_state != SaState::Operational && !config.ignore_sa_state {
        audit.record(AuditEvent {
            spi: sa.spi,
            action: AuditAction::ApplyRejected {
                reason: "sa not operational",
            },
        });
        return Err(SdlsError::SaNotOperational);
    }

    let ekey_value = keys.require_encrypt_key(sa.ekid)?.value;
    let akey_value = if sa.ast {
        Some(keys.require_encrypt_key(sa.akid)?.value)
    } else {
        None
    };

    let (next_iv, iv_wrapped, next_arc) = next_counters(&sa);
    if iv_wrapped && !config.iv_rollover_wrap {
        audit.record(AuditEvent {
            spi: sa.spi,
            action: AuditAction::ApplyRejected { reason: "iv rollover" },
        });
        return Err(SdlsError::IvRollover);
    }

    let body = &plain[TM_PRIMARY_HEADER_LEN..];

    let mut out = Vec::with_capacity(plain.len() + 32);
    out.extend_from_slice(&plain[..TM_PRIMARY_HEADER_LEN]);
    out.extend_from_slice(&next_iv);
    out.extend_from_slice(&next_arc);
    out.extend(std::iter::repeat(0u8).take(sa.shplf_len as usize));

    let aad = build_aad(&out, &sa.abm);

    if sa.est {
        let sealed = crypto.aead_encrypt(&ekey_value, &next_iv, body, &aad)?;
        out.extend_from_slice(&sealed);
    } else if sa.ast {
        let akey = akey_value.expect("ast implies akid resolved above");
        out.extend_from_slice(body);
        let tag = crypto.aead_authenticate(&akey, &next_iv, &aad)?;
        let take = (sa.stmacf_len as usize).min(tag.len());
        out.extend_from_slice(&tag[..take]);
    } else {
        out.extend_from_slice(body);
    }

    // The OCF's contents are populated out-of-band by the caller (they carry
    // CLCW/link-layer state this pipeline has no visibility into); only its
    // presence and position are this pipeline's responsibility.
    if primary.ocff {
        out.extend_from_slice(&[0u8; crate::frame::tm::OCF_LEN]);
    }

    if managed.has_fecf && config.create_fecf {
        let crc_value = crc.crc16(&out);
        out.extend_from_slice(&crc_value.to_be_bytes());
    }

    sa.iv = next_iv;
    sa.arc = next_arc;
    store.save(&sa)?;
    audit.record(AuditEvent {
        spi: sa.spi,
        action: AuditAction::ApplySucceeded,
    });

    Ok(out)
}
