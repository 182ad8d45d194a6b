//! `pronouns init`: write a starter config file.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use pronouns_infra::config::{CONFIG_FILE, render_config};
use pronouns_types::config::PronounsConfig;

/// Write the default config to `{data_dir}/pronouns.toml`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub async fn init(data_dir: &Path, force: bool, json: bool) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    if !force && tokio::fs::try_exists(&path).await.unwrap_or(false) {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("creating {}", data_dir.display()))?;
    let content = render_config(&PronounsConfig::default()).context("rendering default config")?;
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    if json {
        println!("{}", serde_json::json!({ "path": path.display().to_string() }));
    } else {
        println!();
        println!(
            "  {} Wrote {}",
            style("✓").green().bold(),
            style(path.display()).cyan()
        );
        println!();
    }
    Ok(())
}
