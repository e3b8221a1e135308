use crate::config::BackendKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "anonclaim")]
#[command(version = BUILD_VERSION)]
#[command(about = "Anonymous utility claims for token holders")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", env = "ANONCLAIM_DATA_DIR", help = "Data directory path")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Write a default configuration")]
    Init {
        #[arg(short, long, help = "Overwrite existing configuration")]
        force: bool,
        #[arg(long, help = "Proof backend to configure")]
        backend: Option<BackendKind>,
    },

    #[command(about = "Generate a secp256k1 claimant key")]
    Keygen {
        #[arg(short, long, value_name = "FILE", help = "Write the private key to a file instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "Generate proving and verifying keys for the configured backend")]
    #[command(long_about = "Generate keys for the configured backend.\n\nFor groth16 this runs the circuit-specific setup; whoever runs it can forge proofs, so only use keys from a setup you trust.")]
    Setup {
        #[arg(short, long, help = "Overwrite existing keys")]
        force: bool,
    },

    #[command(about = "Build snapshot trees and inclusion paths")]
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    #[command(about = "Sign and prove claims")]
    Claim {
        #[command(subcommand)]
        action: ClaimAction,
    },

    #[command(about = "Create utilities and submit claims")]
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
pub enum SnapshotAction {
    #[command(about = "Build a snapshot tree and print its root")]
    Build {
        #[arg(long, value_name = "FILE", help = "Snapshot JSON ({\"tokens\": [...]})")]
        tokens: PathBuf,
        #[arg(short, long, value_name = "FILE", help = "Where to write the normalised snapshot")]
        output: Option<PathBuf>,
    },
    #[command(about = "Print the inclusion path of one leaf")]
    Proof {
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,
        #[arg(long, help = "Leaf index")]
        index: usize,
    },
}

#[derive(clap::Args)]
pub struct ClaimTarget {
    #[arg(long, help = "Utility id (decimal or 0x hex)")]
    pub utility: String,
    #[arg(long, help = "Collection address")]
    pub collection: String,
    #[arg(long, help = "Token id (decimal or 0x hex)")]
    pub token_id: String,
}

#[derive(Subcommand)]
pub enum ClaimAction {
    #[command(about = "Sign the claim message for a token")]
    Sign {
        #[arg(long, value_name = "FILE", help = "Private key file")]
        key: PathBuf,
        #[command(flatten)]
        target: ClaimTarget,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    #[command(about = "Produce a claim proof for one phase")]
    Prove {
        #[arg(long, value_name = "FILE", help = "Private key file", required_unless_present = "signature")]
        key: Option<PathBuf>,
        #[arg(long, value_name = "FILE", help = "Signature JSON from `claim sign`", conflicts_with = "key")]
        signature: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,
        #[command(flatten)]
        target: ClaimTarget,
        #[arg(long, help = "register, enter, vote:<option> or a wire value")]
        phase: String,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum RegistryAction {
    #[command(about = "Create an event or poll utility")]
    Create {
        #[arg(long, help = "Utility id (decimal or 0x hex)")]
        utility: String,
        #[arg(long, help = "Snapshot root (0x hex)", required_unless_present = "snapshot")]
        root: Option<String>,
        #[arg(long, value_name = "FILE", help = "Take the root from a snapshot file", conflicts_with = "root")]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        capacity: u64,
        #[arg(long, default_value = "", help = "Metadata reference, e.g. an IPFS URI")]
        metadata: String,
        #[arg(long, help = "Create a poll with this many options")]
        options: Option<u32>,
        #[arg(long, default_value_t = 0)]
        payment: u64,
    },
    #[command(about = "Submit a registration proof")]
    Register {
        #[arg(long, value_name = "FILE")]
        proof: PathBuf,
        #[arg(long, help = "Poll until the nullifier reads as consumed")]
        confirm: bool,
    },
    #[command(about = "Submit an entrance proof")]
    Enter {
        #[arg(long, value_name = "FILE")]
        proof: PathBuf,
        #[arg(long, help = "Poll until the nullifier reads as consumed")]
        confirm: bool,
    },
    #[command(about = "Submit a vote proof")]
    Vote {
        #[arg(long, value_name = "FILE")]
        proof: PathBuf,
        #[arg(long, help = "Poll until the nullifier reads as consumed")]
        confirm: bool,
    },
    #[command(about = "Dry-run a proof against current registry state")]
    Validate {
        #[arg(long, value_name = "FILE")]
        proof: PathBuf,
    },
    #[command(about = "Show one utility, or list all")]
    Show {
        #[arg(long)]
        utility: Option<String>,
    },
}
