use super::commands::{OutputFormat, SnapshotAction};
use super::utils::{emit_json, print_field, read_snapshot, success};
use crate::config::ClaimConfig;
use anonclaim_crypto::fr_to_field_bytes;
use anyhow::Context;
use std::path::Path;

pub fn handle_snapshot(action: SnapshotAction, config: &ClaimConfig, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        SnapshotAction::Build { tokens, output } => build(&tokens, output.as_deref(), config, format),
        SnapshotAction::Proof { snapshot, index } => inclusion_path(&snapshot, index),
    }
}

fn build(tokens: &Path, output: Option<&Path>, config: &ClaimConfig, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = read_snapshot(tokens)?;
    let tree = snapshot.tree()?;
    let root = tree.root_bytes();

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.data_dir.join("snapshots").join(format!("{}.json", root.to_hex())));
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, snapshot.to_json()?).with_context(|| format!("Failed to write {:?}", output))?;

    match format {
        OutputFormat::Json => emit_json(
            &serde_json::json!({
                "root": root,
                "leaves": tree.len(),
                "snapshot": output,
            }),
            None,
        )?,
        OutputFormat::Text => {
            success(format, "Snapshot tree built");
            print_field(format, "Root", root);
            print_field(format, "Leaves", tree.len());
            print_field(format, "Snapshot", output.display());
        }
    }
    Ok(())
}

fn inclusion_path(snapshot: &Path, index: usize) -> anyhow::Result<()> {
    let tree = read_snapshot(snapshot)?.tree()?;
    let path = tree.create_proof(index)?;
    let leaf = tree
        .leaf(index)
        .map(|leaf| fr_to_field_bytes(&leaf))
        .with_context(|| format!("no leaf at index {}", index))?;

    emit_json(
        &serde_json::json!({
            "index": index,
            "leaf": leaf,
            "root": tree.root_bytes(),
            "path": path,
        }),
        None,
    )
}
