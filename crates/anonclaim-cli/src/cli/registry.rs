use super::commands::{OutputFormat, RegistryAction};
use super::utils::{emit_json, open_registry, print_field, read_json, read_snapshot, success};
use crate::config::ClaimConfig;
use anonclaim_registry::{wait_for, ClaimRegistry, CreateUtility, SledStore, UtilityKind, UtilityRecord};
use anonclaim_types::{ClaimProof, FieldBytes, Phase, UtilityId};
use std::path::Path;

#[derive(Clone, Copy)]
enum Submission {
    Register,
    Enter,
    Vote,
}

pub async fn handle_registry(action: RegistryAction, config: &ClaimConfig, format: OutputFormat) -> anyhow::Result<()> {
    let registry = open_registry(config)?;

    match action {
        RegistryAction::Create {
            utility,
            root,
            snapshot,
            capacity,
            metadata,
            options,
            payment,
        } => {
            let id = UtilityId::parse(&utility)?;
            let root = match (root, snapshot) {
                (Some(root), _) => FieldBytes::from_hex(&root)?,
                (None, Some(path)) => read_snapshot(&path)?.tree()?.root_bytes(),
                (None, None) => anyhow::bail!("either --root or --snapshot is required"),
            };
            let request = match options {
                Some(options) => CreateUtility::poll(id, root, capacity, options),
                None => CreateUtility::event(id, root, capacity),
            }
            .with_metadata(metadata);

            let record = registry.create_utility(request, u128::from(payment)).await?;
            success(format, "Utility created");
            show_record(&record, format)?;
        }
        RegistryAction::Register { proof, confirm } => {
            submit(&registry, config, &proof, Submission::Register, confirm, format).await?
        }
        RegistryAction::Enter { proof, confirm } => {
            submit(&registry, config, &proof, Submission::Enter, confirm, format).await?
        }
        RegistryAction::Vote { proof, confirm } => {
            submit(&registry, config, &proof, Submission::Vote, confirm, format).await?
        }
        RegistryAction::Validate { proof } => {
            let proof: ClaimProof = read_json(&proof)?;
            match proof.public_signals.phase {
                Phase::Register => registry.validate_registration(&proof).await?,
                Phase::Enter => registry.validate_entrance(&proof).await?,
                Phase::Vote(_) => registry.validate_vote(&proof).await?,
            }
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "valid": true })),
                OutputFormat::Text => success(format, "Proof would be accepted"),
            }
        }
        RegistryAction::Show { utility: Some(utility) } => {
            let record = registry.utility(&UtilityId::parse(&utility)?).await?;
            show_record(&record, format)?;
        }
        RegistryAction::Show { utility: None } => {
            let records = registry.utilities().await?;
            match format {
                OutputFormat::Json => emit_json(&records, None)?,
                OutputFormat::Text if records.is_empty() => println!("No utilities"),
                OutputFormat::Text => {
                    for record in &records {
                        show_record(record, format)?;
                        println!();
                    }
                }
            }
        }
    }
    Ok(())
}

async fn submit(
    registry: &ClaimRegistry<SledStore>,
    config: &ClaimConfig,
    proof: &Path,
    kind: Submission,
    confirm: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let proof: ClaimProof = read_json(proof)?;
    let record = match kind {
        Submission::Register => registry.register_claim(&proof).await?,
        Submission::Enter => registry.enter_claim(&proof).await?,
        Submission::Vote => registry.cast_vote(&proof).await?,
    };
    success(format, &format!("Accepted {} claim", proof.public_signals.phase));

    if confirm {
        let (registry, id, nullifier) = (
            registry,
            &proof.public_signals.utility_id,
            &proof.public_signals.claim_nullifier,
        );
        let confirmed = wait_for(
            move || registry.is_nullifier_consumed(id, nullifier),
            |consumed| *consumed,
            config.poll.policy(),
        )
        .await;
        if confirmed.is_none() {
            anyhow::bail!("nullifier {} not confirmed after {} reads", nullifier, config.poll.attempts);
        }
        success(format, "Nullifier confirmed consumed");
    }

    show_record(&record, format)
}

fn show_record(record: &UtilityRecord, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => emit_json(record, None)?,
        OutputFormat::Text => {
            print_field(format, "Utility", record.id);
            print_field(format, "Root", record.snapshot_root);
            if !record.metadata_ref.is_empty() {
                print_field(format, "Metadata", &record.metadata_ref);
            }
            print_field(
                format,
                "Registered",
                format!("{}/{}", record.registration_count, record.capacity),
            );
            match record.kind {
                UtilityKind::Event => print_field(format, "Entered", record.entrance_count),
                UtilityKind::Poll { options } => {
                    for option in 1..=options {
                        print_field(
                            format,
                            &format!("Option {}", option),
                            record.vote_result(option).unwrap_or(0),
                        );
                    }
                }
            }
        }
    }
    Ok(())
}
