//! Offline developer tool for the signer core: QR framing, payload decoding
//! and demo network data.

use std::fs;
use std::path::PathBuf;

use airgap_signer::decoder::decode_transaction;
use airgap_signer::fixtures;
use airgap_signer::metadata::MetadataRegistry;
use airgap_signer::pipeline::metadata_update_payload;
use airgap_signer::qr::{fragment_bytes, reassemble, QrFrame};
use airgap_signer::signing::parse_envelope;
use airgap_signer::types::Encryption;
use airgap_signer::utils::crypto::unhex;
use airgap_signer::utils::logging;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "airgap-signer", about = "Air-gapped signer developer CLI")]
struct Cli {
    /// Print debug log lines to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split hex data into QR frames, one hex frame per line.
    Fragment(FragmentArgs),
    /// Join hex QR frames (any order) back into the payload.
    Reassemble(ReassembleArgs),
    /// Decode a signing request payload into JSON.
    Decode(DecodeArgs),
    /// Print the built-in Westend demo metadata.
    DemoMetadata(DemoMetadataArgs),
    /// Print a demo transfer request for an author key.
    DemoPayload(DemoPayloadArgs),
}

#[derive(Parser)]
struct FragmentArgs {
    /// Payload as hex
    #[arg(long)]
    hex: String,
    /// Wire bytes per frame, header included
    #[arg(long, default_value_t = 1024)]
    frame_size: usize,
}

#[derive(Parser)]
struct ReassembleArgs {
    /// Hex frames
    #[arg(required = true)]
    frames: Vec<String>,
}

#[derive(Parser)]
struct DecodeArgs {
    /// Request payload as hex
    #[arg(long)]
    payload: String,
    /// Bundled metadata JSON; the Westend demo registry when omitted
    #[arg(long)]
    metadata: Option<PathBuf>,
    #[arg(long, default_value_t = 64)]
    max_depth: usize,
}

#[derive(Parser)]
struct DemoMetadataArgs {
    /// Runtime versions to include
    #[arg(long = "version", default_values_t = [9420u32, 9430])]
    versions: Vec<u32>,
    /// Emit the metadata-update QR payload (hex) of the newest version instead
    #[arg(long)]
    blob: bool,
}

#[derive(Parser)]
struct DemoPayloadArgs {
    /// Author public key, hex
    #[arg(long)]
    author: String,
    #[arg(long, default_value_t = 9430)]
    version: u32,
    /// Planck amount to transfer
    #[arg(long, default_value_t = 1_000_000_000_000)]
    amount: u128,
    #[arg(long, value_parser = parse_encryption, default_value = "sr25519")]
    encryption: Encryption,
}

fn parse_encryption(s: &str) -> Result<Encryption, String> {
    match s {
        "sr25519" => Ok(Encryption::Sr25519),
        "ed25519" => Ok(Encryption::Ed25519),
        "ecdsa" => Ok(Encryption::Ecdsa),
        other => Err(format!("unsupported encryption {}", other)),
    }
}

#[derive(Serialize)]
struct DecodeOutput<'a> {
    envelope: &'a airgap_signer::signing::Envelope,
    transaction: &'a airgap_signer::decoder::DecodedTransaction,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        logging::enable_debug();
    }

    match cli.command {
        Commands::Fragment(args) => run_fragment(args),
        Commands::Reassemble(args) => run_reassemble(args),
        Commands::Decode(args) => run_decode(args),
        Commands::DemoMetadata(args) => run_demo_metadata(args),
        Commands::DemoPayload(args) => run_demo_payload(args),
    }
}

fn run_fragment(args: FragmentArgs) -> Result<()> {
    let data = unhex(&args.hex).context("payload is not valid hex")?;
    for frame in fragment_bytes(&data, args.frame_size)? {
        println!("{}", hex::encode(frame));
    }
    Ok(())
}

fn run_reassemble(args: ReassembleArgs) -> Result<()> {
    let frames = args
        .frames
        .iter()
        .map(|hex_frame| {
            let bytes = unhex(hex_frame).with_context(|| format!("frame {} is not hex", hex_frame))?;
            Ok(QrFrame::from_bytes(&bytes)?)
        })
        .collect::<Result<Vec<_>>>()?;
    let payload = reassemble(&frames)?;
    println!("{}", hex::encode(payload));
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let registry = match &args.metadata {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            MetadataRegistry::load_bundled(&json)?
        }
        None => fixtures::westend_registry(&[9420, 9430]),
    };

    let bytes = unhex(&args.payload).context("payload is not valid hex")?;
    let envelope = parse_envelope(&bytes)?;
    let transaction = decode_transaction(
        &registry,
        &envelope.genesis,
        &envelope.call,
        &envelope.extensions,
        args.max_depth,
    )?;

    let output = DecodeOutput {
        envelope: &envelope,
        transaction: &transaction,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_demo_metadata(args: DemoMetadataArgs) -> Result<()> {
    if args.blob {
        let newest = args
            .versions
            .iter()
            .max()
            .ok_or_else(|| anyhow!("at least one --version is required"))?;
        let payload = metadata_update_payload(&fixtures::westend_record(*newest));
        println!("{}", hex::encode(payload));
        return Ok(());
    }

    let registry = fixtures::westend_registry(&args.versions);
    println!("{}", registry.to_bundled_json()?);
    Ok(())
}

fn run_demo_payload(args: DemoPayloadArgs) -> Result<()> {
    let raw = unhex(&args.author).context("author is not valid hex")?;
    let expected = args.encryption.public_len();
    if raw.len() != expected {
        return Err(anyhow!(
            "{} author must be {} bytes, got {}",
            args.encryption,
            expected,
            raw.len()
        ));
    }

    let chain = fixtures::westend_chain();
    let payload = fixtures::signing_envelope(
        args.encryption,
        &raw,
        &fixtures::transfer_call([0x8e; 32], args.amount),
        &fixtures::extensions(args.version, &chain),
    );
    println!("{}", hex::encode(payload));
    Ok(())
}
