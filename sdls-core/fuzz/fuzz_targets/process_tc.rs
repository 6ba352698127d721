#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

use sdls_core::pipeline;
use sdls_crypto::{Aes256GcmProvider, CrcEngine, Gvcid};
use sdls_store::{
    Config, InMemoryAuditSink, InMemoryStore, Key, KeyRing, KeyState, ManagedParameterTable,
    SaState, SadbType,
};

struct Fixture {
    config: Config,
    managed: ManagedParameterTable,
    store: InMemoryStore,
    keys: KeyRing,
    crypto: Aes256GcmProvider,
    crc: CrcEngine,
    audit: InMemoryAuditSink,
}

static FIXTURE: Lazy<Fixture> = Lazy::new(|| {
    let config = Config::new(SadbType::InMemory, true, false, false, false, false, false, true, 0xFF);

    let mut managed = ManagedParameterTable::new();
    managed.add(0, 0x3FF, 0, true, false).unwrap();

    let gvcid = Gvcid::new(0, 0x3FF, 0, None);
    let store = InMemoryStore::new();
    store.create(1, gvcid).unwrap();
    store.rekey(1, 130, 130).unwrap();
    store.set_arsnw(1, 16).unwrap();
    store.set_state(1, SaState::Operational).unwrap();
    {
        let mut sa = store.get_by_spi(1).unwrap();
        sa.est = true;
        sa.shivf_len = 12;
        sa.shsnf_len = 2;
        sa.stmacf_len = 16;
        sa.iv = vec![0u8; 12];
        sa.arc = vec![0u8; 2];
        store.save(&sa).unwrap();
    }

    let mut keys = KeyRing::new();
    keys.insert(Key::new(130, [0x11u8; 32], KeyState::Active));

    Fixture {
        config,
        managed,
        store,
        keys,
        crypto: Aes256GcmProvider,
        crc: CrcEngine::new(),
        audit: InMemoryAuditSink::new(),
    }
});

// Fuzzes `process_security_tc` against a store pre-seeded with one
// Operational SA. Arbitrary bytes in, never a panic out.
fuzz_target!(|data: &[u8]| {
    let fixture = &*FIXTURE;
    let _ = pipeline::process_security_tc(
        &fixture.config,
        &fixture.managed,
        &fixture.store,
        &fixture.keys,
        &fixture.crypto,
        &fixture.crc,
        &fixture.audit,
        data,
    );
});
