// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::{Context, Result};
use clap::Parser;
use governance_kernel::ledger::codec::decode_ledger;
use governance_kernel::proof::ChainProof;
use governance_kernel::types::PublicKey;
use governance_kernel::verify::{verify_chain, ChainReport};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Offline verifier for governance decision ledgers", long_about = None)]
struct Args {
    /// Path to the ledger file (e.g. decisions.ledger)
    ledger: PathBuf,

    /// Hex Ed25519 key the node signs entries with. Signatures are not
    /// checked without it.
    #[arg(long)]
    public_key: Option<String>,

    /// First sequence id to check.
    #[arg(long, default_value_t = 0)]
    from: u64,

    /// Last sequence id to check (inclusive).
    #[arg(long)]
    to: Option<u64>,

    /// Proof JSON served by a node, to compare against.
    #[arg(long)]
    against: Option<PathBuf>,
}

#[derive(Serialize, Debug)]
struct VerifyOutput {
    report: ChainReport,
    proof: ChainProof,
    torn_tail: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches_node: Option<bool>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    eprintln!("Governance Ledger Verifier v{}", env!("CARGO_PKG_VERSION"));

    let key = args
        .public_key
        .as_deref()
        .map(PublicKey::from_hex)
        .transpose()
        .context("Invalid --public-key")?;

    let bytes = fs::read(&args.ledger).context("Failed to read ledger file")?;
    let decoded = decode_ledger(&bytes).map_err(|e| anyhow::anyhow!("Ledger decode failed: {}", e))?;
    if decoded.torn_tail {
        eprintln!(
            "warning: {} trailing bytes are an incomplete frame",
            bytes.len() - decoded.valid_len
        );
    }

    let report = verify_chain(&decoded.entries, args.from, args.to, key.as_ref());
    let proof = ChainProof::from_entries(&decoded.entries).with_file_hash(&bytes[..decoded.valid_len]);

    let matches_node = match &args.against {
        Some(path) => {
            let raw = fs::read(path).context("Failed to read node proof")?;
            let node: ChainProof = serde_json::from_slice(&raw).context("Failed to parse node proof")?;
            Some(proof.matches(&node))
        }
        None => None,
    };

    let intact = report.is_intact() && matches_node.unwrap_or(true);
    let output = VerifyOutput { report, proof, torn_tail: decoded.torn_tail, matches_node };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !intact {
        std::process::exit(1);
    }
    Ok(())
}
