//! Consolidate command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use govee_cli::consolidate::consolidate_json;
use tracing::{debug, info};

/// Convert every `<model>.json` vendor dump in `input` into `output/<model>.json`.
pub fn cmd_consolidate(input: &Path, output: &Path, quiet: bool) -> Result<()> {
    let entries = fs::read_dir(input)
        .with_context(|| format!("Failed to read directory: {}", input.display()))?;
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create directory: {}", output.display()))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut count = 0;
    for path in paths {
        let Some(model) = path.file_stem().and_then(|s| s.to_str()) else {
            debug!("Skipping {}", path.display());
            continue;
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let catalog = consolidate_json(model, &text)
            .with_context(|| format!("File: {}", path.display()))?;

        let target = output.join(format!("{model}.json"));
        let json = serde_json::to_string(&catalog).context("Failed to serialize catalog")?;
        fs::write(&target, json)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        info!("{} -> {}", path.display(), target.display());
        count += 1;
    }

    if !quiet {
        eprintln!("Consolidated {} model(s) into {}", count, output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consolidate_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join("H6199.json"),
            r#"{ "data": { "categories": [ { "categoryName": "Natural", "scenes": [
                { "sceneName": "Sunrise", "lightEffects": [{ "sceneCode": 10191, "scenceParam": "AQID" }] }
            ] } ] } }"#,
        )
        .unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        cmd_consolidate(input.path(), output.path(), true).unwrap();

        let written = fs::read_to_string(output.path().join("H6199.json")).unwrap();
        let catalog = govee_core::SceneCatalog::from_json(&written).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(!output.path().join("notes.json").exists());
    }

    #[test]
    fn test_consolidate_reports_bad_file() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("H6008.json"), "{").unwrap();

        let err = cmd_consolidate(input.path(), output.path(), true).unwrap_err();
        assert!(format!("{:#}", err).contains("H6008.json"));
    }
}
