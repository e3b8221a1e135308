use super::commands::{Cli, OutputFormat};
use crate::config::{BackendKind, ClaimConfig, LoggingConfig};
use anonclaim_crypto::{DevBackend, Groth16Backend, ProofSystem, Snapshot};
use anonclaim_registry::{ClaimRegistry, SledStore};
use anonclaim_types::{ClaimError, Phase, Secp256k1PrivateKey};
use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init_logging(cli: &Cli, logging: &LoggingConfig) -> anyhow::Result<()> {
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => logging.level.to_string(),
            1 => "info,anonclaim=debug,anonclaim_registry=debug,anonclaim_crypto=debug".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let log_file = cli.log_file.as_ref().or(logging.file.as_ref());
    let file = log_file
        .map(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))
        })
        .transpose()?;

    // Logs go to stderr so command output on stdout stays machine readable.
    let result = match (file, logging.json) {
        (Some(file), true) => subscriber
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .try_init(),
        (Some(file), false) => subscriber
            .with(
                fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .try_init(),
        (None, true) => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        (None, false) => subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(cli.verbose >= 2),
            )
            .try_init(),
    };
    result.map_err(|e| anyhow!("Failed to initialise logging: {}", e))
}

/// `register`, `enter`, `vote:<option>` or a raw wire value.
pub fn parse_phase(s: &str) -> Result<Phase, ClaimError> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "register" => Ok(Phase::Register),
        "enter" => Ok(Phase::Enter),
        _ => {
            if let Some(option) = s.strip_prefix("vote:") {
                return match option.parse::<u32>() {
                    Ok(0) | Err(_) => Err(ClaimError::InvalidPhase(format!("bad vote option {:?}", option))),
                    Ok(n) => Ok(Phase::Vote(n)),
                };
            }
            let wire = s
                .parse::<u64>()
                .map_err(|_| ClaimError::InvalidPhase(format!("unknown phase {:?}", s)))?;
            Phase::from_wire(wire)
        }
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))
}

/// Writes pretty JSON to `output`, or prints it when no file is given.
pub fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            debug!("Wrote {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn print_field(format: OutputFormat, label: &str, value: impl std::fmt::Display) {
    if let OutputFormat::Text = format {
        println!("  {:<14} \x1b[38;5;51m{}\x1b[0m", label, value);
    }
}

pub fn success(format: OutputFormat, message: &str) {
    if let OutputFormat::Text = format {
        println!("\x1b[38;5;46m[+]\x1b[0m {}", message);
    }
}

pub fn read_private_key(path: &Path) -> anyhow::Result<Secp256k1PrivateKey> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read key {:?}", path))?;
    Ok(Secp256k1PrivateKey::from_hex(contents.trim())?)
}

pub fn read_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(Snapshot::from_json(&contents)?)
}

/// Loads the configured backend. Verifier-only backends suffice for the
/// registry; claimants need the proving key.
pub fn load_backend(config: &ClaimConfig, prove: bool) -> anyhow::Result<Arc<dyn ProofSystem>> {
    match config.prover.backend {
        BackendKind::Dev => {
            let path = config.resolve(&config.prover.dev_key);
            let key = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read dev key {:?}; run `anonclaim setup`", path))?;
            Ok(Arc::new(DevBackend::from_hex(&key)?))
        }
        BackendKind::Groth16 if prove => {
            let path = config.resolve(&config.prover.proving_key);
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read proving key {:?}; run `anonclaim setup`", path))?;
            Ok(Arc::new(Groth16Backend::from_proving_key(&bytes)?))
        }
        BackendKind::Groth16 => {
            let path = config.resolve(&config.prover.verifying_key);
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read verifying key {:?}; run `anonclaim setup`", path))?;
            Ok(Arc::new(Groth16Backend::verifier_only(&bytes)?))
        }
    }
}

pub fn open_registry(config: &ClaimConfig) -> anyhow::Result<ClaimRegistry<SledStore>> {
    let backend = load_backend(config, false)?;
    let store = SledStore::open(config.resolve(&config.registry.store))?;
    Ok(ClaimRegistry::new(store, backend).with_unit_price(u128::from(config.registry.unit_price)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_phase() {
        assert_eq!(parse_phase("register").unwrap(), Phase::Register);
        assert_eq!(parse_phase(" Enter ").unwrap(), Phase::Enter);
        assert_eq!(parse_phase("vote:3").unwrap(), Phase::Vote(3));
        assert_eq!(parse_phase("1").unwrap(), Phase::Register);
        assert_eq!(parse_phase("4").unwrap(), Phase::Vote(2));
        assert!(parse_phase("vote:0").is_err());
        assert!(parse_phase("vote:x").is_err());
        assert!(parse_phase("0").is_err());
        assert!(parse_phase("leave").is_err());
    }

    #[test]
    fn test_emit_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("value.json");
        emit_json(&serde_json::json!({"root": "0x01"}), Some(&path)).unwrap();
        let value: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(value["root"], "0x01");
    }

    #[test]
    fn test_dev_backend_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClaimConfig::default();
        config.data_dir = dir.path().to_path_buf();
        config.prover.backend = BackendKind::Dev;
        assert!(load_backend(&config, true).is_err());

        let key_path = config.resolve(&config.prover.dev_key);
        std::fs::create_dir_all(key_path.parent().unwrap()).unwrap();
        std::fs::write(&key_path, DevBackend::new([3; 32]).key_hex()).unwrap();
        assert_eq!(load_backend(&config, true).unwrap().name(), "dev");
    }
}
