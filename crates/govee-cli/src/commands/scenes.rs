//! Scenes command implementation.

use std::path::PathBuf;

use anyhow::Result;
use govee_cli::Config;
use govee_core::SceneCatalog;

use crate::util::scene_dir;

pub fn cmd_scenes(model: &str, dir: Option<PathBuf>, config: &Config) -> Result<()> {
    let path = scene_dir(dir, config).join(format!("{}.json", model.to_uppercase()));
    let catalog = SceneCatalog::load(&path);
    if catalog.is_empty() {
        anyhow::bail!("No scenes for {} in {}", model, path.display());
    }

    println!("{}", serde_json::to_string_pretty(&catalog.summary())?);
    Ok(())
}
