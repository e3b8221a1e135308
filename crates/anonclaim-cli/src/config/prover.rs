use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Groth16,
    /// Keyed BLAKE3 attestations; no zero knowledge.
    Dev,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Groth16 => write!(f, "groth16"),
            BackendKind::Dev => write!(f, "dev"),
        }
    }
}

/// Key locations are relative to the data directory unless absolute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    pub backend: BackendKind,
    pub proving_key: PathBuf,
    pub verifying_key: PathBuf,
    pub dev_key: PathBuf,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Groth16,
            proving_key: PathBuf::from("keys/claim.pk"),
            verifying_key: PathBuf::from("keys/claim.vk"),
            dev_key: PathBuf::from("keys/dev.key"),
        }
    }
}
