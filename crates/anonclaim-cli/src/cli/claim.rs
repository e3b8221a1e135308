use super::commands::{ClaimAction, ClaimTarget, OutputFormat};
use super::utils::{emit_json, load_backend, parse_phase, read_json, read_private_key, read_snapshot, success, print_field};
use crate::config::ClaimConfig;
use anonclaim_crypto::{derive_eth_address, prove_claim, ClaimSigner};
use anonclaim_types::{ClaimSignature, EthAddress, Token, TokenId, UtilityId};
use anyhow::Context;
use std::path::Path;
use tracing::info;

struct Target {
    utility: UtilityId,
    collection: EthAddress,
    token_id: TokenId,
}

impl TryFrom<&ClaimTarget> for Target {
    type Error = anyhow::Error;

    fn try_from(args: &ClaimTarget) -> anyhow::Result<Self> {
        Ok(Self {
            utility: UtilityId::parse(&args.utility).context("--utility")?,
            collection: EthAddress::from_hex(&args.collection).context("--collection")?,
            token_id: TokenId::parse(&args.token_id).context("--token-id")?,
        })
    }
}

pub fn handle_claim(action: ClaimAction, config: &ClaimConfig, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        ClaimAction::Sign { key, target, output } => {
            let target = Target::try_from(&target)?;
            let signature = sign(&key, &target)?;
            emit_json(&signature, output.as_deref())?;
            if output.is_some() {
                success(format, "Claim message signed");
            }
            Ok(())
        }
        ClaimAction::Prove {
            key,
            signature,
            snapshot,
            target,
            phase,
            output,
        } => {
            let target = Target::try_from(&target)?;
            let phase = parse_phase(&phase)?;
            let signature = match (signature, key) {
                (Some(path), _) => read_json::<ClaimSignature>(&path)?,
                (None, Some(key)) => sign(&key, &target)?,
                (None, None) => anyhow::bail!("either --key or --signature is required"),
            };

            // The owner is whoever signed; the snapshot must list them for this token.
            let token = Token {
                collection: target.collection,
                token_id: target.token_id,
                owner: derive_eth_address(&signature.public_key),
            };
            let snapshot = read_snapshot(&snapshot)?;
            let index = snapshot.index_of(&token).with_context(|| {
                format!(
                    "token {} of {} owned by {} is not in the snapshot",
                    token.token_id, token.collection, token.owner
                )
            })?;
            let path = snapshot.tree()?.create_proof(index)?;

            let backend = load_backend(config, true)?;
            info!("Proving {} claim with the {} backend", phase, backend.name());
            let proof = prove_claim(backend.as_ref(), target.utility, phase, &token, &signature, &path)?;

            emit_json(&proof, output.as_deref())?;
            if output.is_some() {
                success(format, "Claim proof generated");
                print_field(format, "Phase", phase);
                print_field(format, "Commitment", proof.public_signals.claim_commitment);
                print_field(format, "Nullifier", proof.public_signals.claim_nullifier);
            }
            Ok(())
        }
    }
}

fn sign(key: &Path, target: &Target) -> anyhow::Result<ClaimSignature> {
    let signer = ClaimSigner::new(read_private_key(key)?)?;
    Ok(signer.sign(&target.utility, &target.collection, &target.token_id)?)
}
