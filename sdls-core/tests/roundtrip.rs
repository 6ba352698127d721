use sdls_core::{Config, Gvcid, Library, SadbType, SdlsError};
use sdls_store::{Key, KeyState, SaState, SecurityAssociation};

fn configured_library() -> Library {
    let mut library = Library::new();
    library.configure(Config::new(
        SadbType::InMemory,
        true,  // create_fecf
        false, // process_sdls_pdus
        false, // has_pus_hdr
        false, // ignore_sa_state
        false, // ignore_anti_replay
        false, // unique_sa_per_mapid
        true,  // check_fecf
        0x3F,
    ));
    library
        .add_managed_parameter(0, 0x3FF, 0, true, false)
        .expect("add managed parameter");
    library.load_demo_keys();
    library.init().expect("init");
    library
}

fn gvcid() -> Gvcid {
    Gvcid::new(0, 0x3FF, 0, None)
}

fn sa_with_spi(spi: u16) -> SecurityAssociation {
    let mut sa = SecurityAssociation::new_unkeyed(spi, gvcid());
    sa.ekid = 130;
    sa.akid = 130;
    sa.sa_state = SaState::Operational;
    sa.est = true;
    sa.ast = true;
    sa.shivf_len = 12;
    sa.shsnf_len = 4;
    sa.shplf_len = 0;
    sa.stmacf_len = 16;
    sa.iv = vec![0u8; 12];
    sa.arc = vec![0u8; 4];
    sa.arcw = 16;
    sa.arcw_len = 2;
    sa.abm = Vec::new();
    sa
}

fn tc_plain_frame() -> Vec<u8> {
    // primary header (5 bytes) + body
    let mut frame = vec![0x00, 0x00, 0x00, 0x00, 0x01];
    frame.extend_from_slice(&[0x18, 0x80, 0xD2, 0xC7, 0x00, 0x08, 0x19, 0x7F]);
    frame
}

#[test]
fn apply_then_process_round_trips() {
    let library = configured_library();
    library.provision_sa(sa_with_spi(1)).expect("provision sa");

    let plain = tc_plain_frame();
    let protected = library
        .apply_security_tc(&plain, gvcid())
        .expect("apply should succeed");

    // IV advanced by one from the all-zero starting value.
    assert_ne!(protected.len(), 0);

    let outcome = library
        .process_security_tc(&protected)
        .expect("process should succeed");
    assert_eq!(outcome.plaintext, plain[5..]);
    assert!(!outcome.report.bmacf);
    assert!(!outcome.report.bsnf);
}

#[test]
fn replaying_accepted_frame_is_rejected() {
    let library = configured_library();
    library.provision_sa(sa_with_spi(1)).expect("provision sa");

    let plain = tc_plain_frame();
    let protected = library.apply_security_tc(&plain, gvcid()).unwrap();
    library.process_security_tc(&protected).expect("first accept");

    let replay = library.process_security_tc(&protected);
    assert_eq!(replay.unwrap_err().error, SdlsError::AntiReplayReject);
}

#[test]
fn flipped_mac_byte_is_rejected() {
    let library = configured_library();
    library.provision_sa(sa_with_spi(1)).expect("provision sa");

    let plain = tc_plain_frame();
    let mut protected = library.apply_security_tc(&plain, gvcid()).unwrap();
    let last = protected.len() - 1 - 2; // flip last MAC byte, before the FECF
    protected[last] ^= 0xFF;

    let result = library.process_security_tc(&protected);
    assert_eq!(result.unwrap_err().error, SdlsError::BadMac);
}

#[test]
fn sdls_sa_start_makes_sa_operational() {
    let library = configured_library();
    let mut sa = sa_with_spi(2);
    sa.sa_state = SaState::Keyed;
    library.provision_sa(sa).expect("provision sa");

    let mut pdu = vec![0x10, 1, 0, 0, 0, 0];
    pdu.extend_from_slice(&2u16.to_be_bytes());

    let reply = library.handle_pdu(&pdu).expect("handle pdu");
    match reply {
        sdls_core::pdu::PduReply::Fsr(fsr) => assert!(!fsr.af),
        _ => panic!("expected fsr reply"),
    }
}

#[test]
fn apply_without_managed_parameter_is_rejected() {
    let mut library = Library::new();
    library.configure(Config::new(
        SadbType::InMemory,
        true,
        false,
        false,
        false,
        false,
        false,
        true,
        0x3F,
    ));
    // managed params deliberately left empty; init should refuse.
    let result = library.init();
    assert_eq!(result.unwrap_err(), SdlsError::ManagedParamNotFound);
}

#[test]
fn preactive_key_cannot_be_used_for_encryption() {
    let library = configured_library();
    let mut sa = sa_with_spi(3);
    sa.ekid = 132; // demo key ring marks 132 PreActive
    library.provision_sa(sa).expect("provision sa");

    let plain = tc_plain_frame();
    let result = library.apply_security_tc(&plain, Gvcid::new(0, 0x3FF, 0, None));
    assert!(result.is_err());
}

#[test]
fn insert_key_extends_the_demo_ring() {
    let mut library = configured_library();
    library.insert_key(Key::new(200, [0x55u8; 32], KeyState::Active));
    let mut sa = sa_with_spi(4);
    sa.ekid = 200;
    sa.akid = 200;
    library.provision_sa(sa).expect("provision sa");

    let plain = tc_plain_frame();
    assert!(library.apply_security_tc(&plain, gvcid()).is_ok());
}
