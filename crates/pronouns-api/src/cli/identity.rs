//! Identity commands: resolve, link.

use std::str::FromStr;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use pronouns_types::identity::{IdentityId, PlatformId, PlatformLink};

use crate::cli::PlatformArg;
use crate::state::AppState;

pub fn platform_id(platform: PlatformArg, id: &str) -> Result<PlatformId> {
    PlatformId::new(platform.into(), id).with_context(|| format!("invalid {platform:?} id"))
}

/// Resolve a platform ID and show every platform ID sharing its identity.
pub async fn resolve(state: &AppState, platform: PlatformArg, id: &str, json: bool) -> Result<()> {
    let platform_id = platform_id(platform, id)?;
    let identity = state.frontends.resolver.resolve(&platform_id).await?;
    let links = state.frontends.resolver.links(&identity).await?;

    if json {
        let out = serde_json::json!({
            "identity_id": identity,
            "links": links,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}  {}",
        style("Identity:").bold(),
        style(identity).cyan()
    );
    print_links(&links);
    Ok(())
}

/// Re-point a platform ID at an existing identity.
pub async fn link(
    state: &AppState,
    platform: PlatformArg,
    id: &str,
    identity: &str,
    json: bool,
) -> Result<()> {
    let platform_id = platform_id(platform, id)?;
    let identity =
        IdentityId::from_str(identity).with_context(|| format!("invalid identity '{identity}'"))?;

    let previous = state.frontends.resolver.find(&platform_id).await?;
    state
        .frontends
        .resolver
        .link(&platform_id, &identity)
        .await
        .with_context(|| format!("linking {platform_id} to {identity}"))?;
    let links = state.frontends.resolver.links(&identity).await?;

    if json {
        let out = serde_json::json!({
            "platform_id": platform_id,
            "identity_id": identity,
            "previous_identity_id": previous,
            "links": links,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Linked {} to {}",
        style("✓").green().bold(),
        style(&platform_id).cyan(),
        style(identity).cyan()
    );
    if let Some(previous) = previous.filter(|p| *p != identity) {
        println!(
            "  {} Previous identity {} keeps its own record.",
            style("i").blue().bold(),
            style(previous).dim()
        );
    }
    print_links(&links);
    Ok(())
}

fn print_links(links: &[PlatformLink]) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Platform").fg(Color::White),
        Cell::new("ID").fg(Color::White),
        Cell::new("Linked").fg(Color::White),
    ]);
    for link in links {
        table.add_row(vec![
            Cell::new(link.platform_id.platform).fg(Color::Cyan),
            Cell::new(&link.platform_id.external_id),
            Cell::new(link.linked_at.format("%Y-%m-%d %H:%M")).fg(Color::DarkGrey),
        ]);
    }
    println!();
    println!("{table}");
    println!();
}
