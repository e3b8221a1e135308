use super::commands::OutputFormat;
use super::utils::{print_field, success};
use crate::config::{BackendKind, ClaimConfig};
use anonclaim_crypto::{derive_eth_address_from_private, generate_private_key, DevBackend, Groth16Backend};
use anyhow::Context;
use std::path::Path;
use tracing::info;

pub fn init_config(
    config_path: &Path,
    config: &ClaimConfig,
    force: bool,
    backend: Option<BackendKind>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        println!("Configuration already exists at {:?}; use --force to overwrite", config_path);
        return Ok(());
    }

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", config.data_dir))?;

    let mut config = config.clone();
    if let Some(backend) = backend {
        config.prover.backend = backend;
    }
    config.save(config_path)?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "config": config_path,
                "data_dir": config.data_dir,
                "backend": config.prover.backend.to_string(),
            })
        ),
        OutputFormat::Text => {
            success(format, "Configuration written");
            print_field(format, "Config", config_path.display());
            print_field(format, "Data", config.data_dir.display());
            print_field(format, "Backend", config.prover.backend);
            println!();
            println!("Next: \x1b[38;5;51manonclaim setup\x1b[0m to generate proof keys");
        }
    }
    Ok(())
}

pub fn generate_key(output: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    let key = generate_private_key();
    let address = derive_eth_address_from_private(&key)?;

    if let Some(path) = output {
        write_secret(path, key.to_hex().as_bytes())?;
    }

    match format {
        OutputFormat::Json => {
            let mut out = serde_json::json!({ "address": address.to_hex() });
            match output {
                Some(path) => out["key_file"] = serde_json::json!(path),
                None => out["private_key"] = serde_json::json!(key.to_hex()),
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            success(format, "Generated claimant key");
            print_field(format, "Address", address);
            match output {
                Some(path) => print_field(format, "Key file", path.display()),
                None => print_field(format, "Private key", key.to_hex()),
            }
        }
    }
    Ok(())
}

pub fn run_setup(config: &ClaimConfig, force: bool, format: OutputFormat) -> anyhow::Result<()> {
    match config.prover.backend {
        BackendKind::Dev => {
            let path = config.resolve(&config.prover.dev_key);
            refuse_overwrite(&path, force)?;
            write_secret(&path, DevBackend::random().key_hex().as_bytes())?;
            success(format, "Generated dev attestation key");
            print_field(format, "Key", path.display());
        }
        BackendKind::Groth16 => {
            let pk_path = config.resolve(&config.prover.proving_key);
            let vk_path = config.resolve(&config.prover.verifying_key);
            refuse_overwrite(&pk_path, force)?;
            refuse_overwrite(&vk_path, force)?;

            info!("Running Groth16 setup for the claim circuit");
            let backend = Groth16Backend::setup(&mut rand::thread_rng())?;
            write_file(&pk_path, &backend.export_proving_key()?)?;
            write_file(&vk_path, &backend.export_verifying_key()?)?;

            success(format, "Generated Groth16 keys");
            print_field(format, "Proving key", pk_path.display());
            print_field(format, "Verifying key", vk_path.display());
        }
    }

    if let OutputFormat::Json = format {
        println!("{}", serde_json::json!({ "backend": config.prover.backend.to_string() }));
    }
    Ok(())
}

fn refuse_overwrite(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists; use --force to overwrite", path);
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
}

fn write_secret(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    write_file(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
