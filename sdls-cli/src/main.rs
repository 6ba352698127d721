//! SDLS CLI — operator tooling for applying and processing SDLS-protected
//! CCSDS TC transfer frames, and for exercising the SDLS PDU command set.
//!
//! Usage:
//!   sdls-cli apply   --tfvn <n> --scid <n> --vcid <n> --spi <n> --ekid <n> --akid <n>
//!                     --shivf-len <n> --shsnf-len <n> --stmacf-len <n>
//!                     [--shplf-len <n>] [--arcw <n>] [--est] [--ast] [--fecf]
//!                     [--segment-hdr] --key <hex32> [--akey <hex32>]
//!                     --input <file|-> --output <file|->
//!   sdls-cli process  <same SA options as apply>
//!                     --input <file|-> --output <file|->
//!   sdls-cli pdu      --pid <n> --spi <n> [--arg <hex>]...
//!   sdls-cli crc16    <file>
//!   sdls-cli crc32    <file>
//!
//! Logging (environment variables):
//!   SDLS_LOG_FORMAT  - "json" for structured logging, "pretty" for dev (default)
//!   RUST_LOG         - standard env-filter directive string

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use sdls_core::pdu::PduReply;
use sdls_core::{Config, Gvcid, Library, SadbType};
use sdls_store::{Key, KeyState, SaState, SecurityAssociation};

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "apply" => cmd_apply_or_process(&args[2..], true),
        "process" => cmd_apply_or_process(&args[2..], false),
        "pdu" => cmd_pdu(&args[2..]),
        "crc16" => cmd_crc16(&args[2..]),
        "crc32" => cmd_crc32(&args[2..]),
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" => {
            println!("sdls-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        cmd => {
            eprintln!("error: unknown command '{cmd}'");
            print_usage();
            Err("unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let log_format = std::env::var("SDLS_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sdls_cli=info,sdls_core=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

fn print_usage() {
    eprintln!(
        r#"SDLS CLI — CCSDS Space Data Link Security for TC transfer frames

USAGE:
    sdls-cli <COMMAND> [OPTIONS]

COMMANDS:
    apply       Apply SDLS security (encrypt/authenticate) to a plaintext TC frame
    process     Validate and strip SDLS security from a protected TC frame
    pdu         Dispatch one SDLS command PDU against a freshly provisioned SA
    crc16       Print the CRC-16-CCITT (FECF) of a file's bytes
    crc32       Print the CRC-32 of a file's bytes

Each `apply`/`process` invocation provisions a single Security Association
from its command-line parameters — this CLI does not persist SA state across
runs; a real ground system wires the library's SQL-backed SA Store in for
that instead (see `sdls-store`'s `sql-backend` feature).

APPLY/PROCESS OPTIONS:
    --tfvn <n>          Transfer Frame Version Number (0-3)
    --scid <n>          Spacecraft Identifier
    --vcid <n>          Virtual Channel Identifier
    --mapid <n>         MAP Identifier (optional)
    --spi <n>           Security Parameter Index for the provisioned SA
    --ekid <n>          Encryption key id (looked up in the demo key ring)
    --akid <n>          Authentication key id (defaults to --ekid)
    --shivf-len <n>     Security header IV field width, bytes
    --shsnf-len <n>     Security header sequence-number field width, bytes
    --shplf-len <n>     Security header pad-length field width, bytes (default 0)
    --stmacf-len <n>    Security trailer MAC field width, bytes
    --arcw <n>          Anti-replay window width (default 0)
    --est               Enable encryption
    --ast               Enable authentication
    --fecf              This virtual channel carries a FECF
    --segment-hdr       This virtual channel carries a segment header
    --key <hex32>       32-byte key, hex-encoded, inserted as key id --ekid
    --akey <hex32>      Separate authentication key; defaults to --key
    --input <file|->    Input frame (default: stdin)
    --output <file|->   Output frame (default: stdout)

PDU OPTIONS:
    --pid <n>           SDLS PID (1=start 2=stop 3=rekey 4=expire 5=create
                         6=set_arsn 7=set_arsnw 8=delete 9=status)
    --spi <n>           Target SPI
    --arg <hex>         Extra PID-specific argument bytes, repeatable

EXAMPLES:
    sdls-cli apply --tfvn 0 --scid 0x3FF --vcid 0 --spi 1 --ekid 130 \
        --shivf-len 12 --shsnf-len 2 --stmacf-len 16 --est --ast \
        --key FEDCBA9876543210FEDCBA9876543210FEDCBA9876543210FEDCBA9876543210 \
        --input frame.bin --output protected.bin
"#
    );
}

struct SaOptions {
    tfvn: u8,
    scid: u16,
    vcid: u8,
    mapid: Option<u8>,
    spi: u16,
    ekid: u16,
    akid: u16,
    shivf_len: u8,
    shsnf_len: u8,
    shplf_len: u8,
    stmacf_len: u8,
    arcw: u16,
    est: bool,
    ast: bool,
    has_fecf: bool,
    has_segment_hdr: bool,
    key: [u8; 32],
    akey: Option<[u8; 32]>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn parse_u16(s: &str) -> Result<u16, Box<dyn std::error::Error>> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u16::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse()?)
    }
}

fn parse_u8(s: &str) -> Result<u8, Box<dyn std::error::Error>> {
    Ok(parse_u16(s)?.try_into()?)
}

fn parse_hex_key(s: &str) -> Result<[u8; 32], Box<dyn std::error::Error>> {
    let bytes = hex::decode(s)?;
    bytes
        .try_into()
        .map_err(|_| "key must be exactly 32 bytes (64 hex characters)".into())
}

fn parse_sa_options(args: &[String]) -> Result<SaOptions, Box<dyn std::error::Error>> {
    let mut tfvn = 0u8;
    let mut scid = 0u16;
    let mut vcid = 0u8;
    let mut mapid = None;
    let mut spi = None;
    let mut ekid = None;
    let mut akid = None;
    let mut shivf_len = 0u8;
    let mut shsnf_len = 0u8;
    let mut shplf_len = 0u8;
    let mut stmacf_len = 0u8;
    let mut arcw = 0u16;
    let mut est = false;
    let mut ast = false;
    let mut has_fecf = false;
    let mut has_segment_hdr = false;
    let mut key = None;
    let mut akey = None;
    let mut input = None;
    let mut output = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--tfvn" => {
                i += 1;
                tfvn = parse_u8(args.get(i).ok_or("missing --tfvn value")?)?;
            }
            "--scid" => {
                i += 1;
                scid = parse_u16(args.get(i).ok_or("missing --scid value")?)?;
            }
            "--vcid" => {
                i += 1;
                vcid = parse_u8(args.get(i).ok_or("missing --vcid value")?)?;
            }
            "--mapid" => {
                i += 1;
                mapid = Some(parse_u8(args.get(i).ok_or("missing --mapid value")?)?);
            }
            "--spi" => {
                i += 1;
                spi = Some(parse_u16(args.get(i).ok_or("missing --spi value")?)?);
            }
            "--ekid" => {
                i += 1;
                ekid = Some(parse_u16(args.get(i).ok_or("missing --ekid value")?)?);
            }
            "--akid" => {
                i += 1;
                akid = Some(parse_u16(args.get(i).ok_or("missing --akid value")?)?);
            }
            "--shivf-len" => {
                i += 1;
                shivf_len = parse_u8(args.get(i).ok_or("missing --shivf-len value")?)?;
            }
            "--shsnf-len" => {
                i += 1;
                shsnf_len = parse_u8(args.get(i).ok_or("missing --shsnf-len value")?)?;
            }
            "--shplf-len" => {
                i += 1;
                shplf_len = parse_u8(args.get(i).ok_or("missing --shplf-len value")?)?;
            }
            "--stmacf-len" => {
                i += 1;
                stmacf_len = parse_u8(args.get(i).ok_or("missing --stmacf-len value")?)?;
            }
            "--arcw" => {
                i += 1;
                arcw = parse_u16(args.get(i).ok_or("missing --arcw value")?)?;
            }
            "--est" => est = true,
            "--ast" => ast = true,
            "--fecf" => has_fecf = true,
            "--segment-hdr" => has_segment_hdr = true,
            "--key" => {
                i += 1;
                key = Some(parse_hex_key(args.get(i).ok_or("missing --key value")?)?);
            }
            "--akey" => {
                i += 1;
                akey = Some(parse_hex_key(args.get(i).ok_or("missing --akey value")?)?);
            }
            "--input" | "-i" => {
                i += 1;
                input = Some(PathBuf::from(args.get(i).ok_or("missing --input value")?));
            }
            "--output" | "-o" => {
                i += 1;
                output = Some(PathBuf::from(args.get(i).ok_or("missing --output value")?));
            }
            other => return Err(format!("unknown option: {other}").into()),
        }
        i += 1;
    }

    let spi = spi.ok_or("missing --spi")?;
    let ekid = ekid.ok_or("missing --ekid")?;
    let key = key.ok_or("missing --key")?;

    Ok(SaOptions {
        tfvn,
        scid,
        vcid,
        mapid,
        spi,
        ekid,
        akid: akid.unwrap_or(ekid),
        shivf_len,
        shsnf_len,
        shplf_len,
        stmacf_len,
        arcw,
        est,
        ast,
        has_fecf,
        has_segment_hdr,
        key,
        akey,
        input,
        output,
    })
}

fn read_input(path: &Option<PathBuf>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match path {
        Some(p) if p.as_os_str() != "-" => Ok(fs::read(p)?),
        _ => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn write_output(path: &Option<PathBuf>, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            fs::write(p, data)?;
            eprintln!("wrote {} bytes to {}", data.len(), p.display());
        }
        _ => io::stdout().write_all(data)?,
    }
    Ok(())
}

fn build_library(opts: &SaOptions) -> Result<(Library, Gvcid), Box<dyn std::error::Error>> {
    let mut library = Library::new();
    library.configure(Config::new(
        SadbType::InMemory,
        opts.has_fecf, // create_fecf
        false,         // process_sdls_pdus
        false,         // has_pus_hdr
        false,         // ignore_sa_state
        false,         // ignore_anti_replay
        false,         // unique_sa_per_mapid
        opts.has_fecf, // check_fecf
        0xFF,
    ));
    library.add_managed_parameter(opts.tfvn, opts.scid, opts.vcid, opts.has_fecf, opts.has_segment_hdr)?;
    library.insert_key(Key::new(opts.ekid, opts.key, KeyState::Active));
    if opts.akid != opts.ekid {
        let akey = opts.akey.unwrap_or(opts.key);
        library.insert_key(Key::new(opts.akid, akey, KeyState::Active));
    }
    library.init()?;

    let gvcid = Gvcid::new(opts.tfvn, opts.scid, opts.vcid, opts.mapid);

    let mut sa = SecurityAssociation::new_unkeyed(opts.spi, gvcid);
    sa.ekid = opts.ekid;
    sa.akid = opts.akid;
    sa.sa_state = SaState::Operational;
    sa.est = opts.est;
    sa.ast = opts.ast;
    sa.shivf_len = opts.shivf_len;
    sa.shsnf_len = opts.shsnf_len;
    sa.shplf_len = opts.shplf_len;
    sa.stmacf_len = opts.stmacf_len;
    sa.iv = vec![0u8; opts.shivf_len as usize];
    sa.arc = vec![0u8; opts.shsnf_len as usize];
    sa.arcw = opts.arcw;
    sa.arcw_len = 2;
    library.provision_sa(sa)?;

    Ok((library, gvcid))
}

fn cmd_apply_or_process(args: &[String], apply: bool) -> Result<(), Box<dyn std::error::Error>> {
    let opts = parse_sa_options(args)?;
    let input = read_input(&opts.input)?;
    let (library, gvcid) = build_library(&opts)?;

    if apply {
        let protected = library.apply_security_tc(&input, gvcid)?;
        write_output(&opts.output, &protected)?;
    } else {
        let outcome = library.process_security_tc(&input)?;
        eprintln!(
            "frame security report: af={} bsnf={} bmacf={} ispif={} lspiu={}",
            outcome.report.af, outcome.report.bsnf, outcome.report.bmacf, outcome.report.ispif, outcome.report.lspiu
        );
        write_output(&opts.output, &outcome.plaintext)?;
    }

    Ok(())
}

fn cmd_pdu(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut pid = None;
    let mut spi = None;
    let mut extra_args: Vec<Vec<u8>> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--pid" => {
                i += 1;
                pid = Some(parse_u8(args.get(i).ok_or("missing --pid value")?)?);
            }
            "--spi" => {
                i += 1;
                spi = Some(parse_u16(args.get(i).ok_or("missing --spi value")?)?);
            }
            "--arg" => {
                i += 1;
                extra_args.push(hex::decode(args.get(i).ok_or("missing --arg value")?)?);
            }
            other => return Err(format!("unknown option: {other}").into()),
        }
        i += 1;
    }

    let pid = pid.ok_or("missing --pid")?;
    let spi = spi.ok_or("missing --spi")?;

    let mut library = Library::new();
    library.configure(Config::new(SadbType::InMemory, false, true, false, false, false, false, false, 0xFF));
    library.add_managed_parameter(0, 0x3FF, 0, false, false)?;
    library.load_demo_keys();
    library.init()?;

    let mut sa = SecurityAssociation::new_unkeyed(spi, Gvcid::new(0, 0x3FF, 0, None));
    sa.ekid = 130;
    sa.akid = 130;
    sa.sa_state = SaState::Keyed;
    sa.shivf_len = 12;
    sa.shsnf_len = 2;
    sa.stmacf_len = 16;
    sa.est = true;
    sa.ast = true;
    sa.iv = vec![0u8; 12];
    sa.arc = vec![0u8; 2];
    library.provision_sa(sa)?;

    let mut pdu = vec![0x10, pid, 0, 0, 0, 0];
    pdu.extend_from_slice(&spi.to_be_bytes());
    for arg in extra_args {
        pdu.extend_from_slice(&arg);
    }

    match library.handle_pdu(&pdu)? {
        PduReply::Fsr(fsr) => {
            println!(
                "FSR: af={} bsnf={} bmacf={} ispif={} lspiu={}",
                fsr.af, fsr.bsnf, fsr.bmacf, fsr.ispif, fsr.lspiu
            );
        }
        PduReply::Status(status) => {
            println!(
                "SA STATUS: spi={} state={:?} ekid={} akid={} arcw={} arc={}",
                status.spi,
                status.sa_state,
                status.ekid,
                status.akid,
                status.arcw,
                hex::encode(&status.arc)
            );
        }
    }

    Ok(())
}

fn cmd_crc16(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.first().ok_or("missing file path")?;
    let data = fs::read(path)?;
    let crc = sdls_crypto::CrcEngine::new();
    println!("{:04X}", crc.crc16(&data));
    Ok(())
}

fn cmd_crc32(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.first().ok_or("missing file path")?;
    let data = fs::read(path)?;
    let crc = sdls_crypto::CrcEngine::new();
    println!("{:08X}", crc.crc32(&data));
    Ok(())
}
