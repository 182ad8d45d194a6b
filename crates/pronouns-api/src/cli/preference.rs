//! Record commands: get, set, clear, history, list, sets.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use pronouns_core::adapter::stored_form;
use pronouns_types::identity::PlatformId;
use pronouns_types::record::{FrontEnd, PreferenceRecord};

use crate::cli::PlatformArg;
use crate::cli::identity::platform_id;
use crate::state::AppState;

/// Show a user's current pronouns.
pub async fn get(state: &AppState, platform: PlatformArg, id: &str, json: bool) -> Result<()> {
    let platform_id = platform_id(platform, id)?;
    let Some(identity) = state.frontends.resolver.find(&platform_id).await? else {
        if json {
            println!("null");
        } else {
            println!();
            println!(
                "  {} {} has never been seen.",
                style("i").blue().bold(),
                style(&platform_id).cyan()
            );
            println!();
        }
        return Ok(());
    };

    let record = state.frontends.preferences.get_or_default(&identity).await?;
    print_record(state, &platform_id, &record, json)
}

/// Set a user's pronouns.
///
/// With `expect_version` this is a single compare-and-set; without it,
/// version conflicts are retried against the latest record.
pub async fn set(
    state: &AppState,
    platform: PlatformArg,
    id: &str,
    pronouns: &[String],
    expect_version: Option<u64>,
    json: bool,
) -> Result<()> {
    let platform_id = platform_id(platform, id)?;
    let entries = state
        .frontends
        .registry
        .parse_input(&pronouns.join(" "))
        .context("invalid pronouns")?;
    let stored = stored_form(&entries);

    let record = match expect_version {
        Some(expected) => {
            let identity = state.frontends.resolver.resolve(&platform_id).await?;
            state
                .frontends
                .preferences
                .set(&identity, &stored, expected, FrontEnd::Cli)
                .await
                .with_context(|| format!("setting pronouns for {platform_id}"))?
        }
        None => state
            .frontends
            .write(&platform_id, stored, FrontEnd::Cli)
            .await
            .with_context(|| format!("setting pronouns for {platform_id}"))?,
    };

    if !json {
        println!();
        println!("  {} Pronouns updated", style("✓").green().bold());
    }
    print_record(state, &platform_id, &record, json)
}

/// Clear a user's pronouns.
pub async fn clear(
    state: &AppState,
    platform: PlatformArg,
    id: &str,
    expect_version: Option<u64>,
    json: bool,
) -> Result<()> {
    let platform_id = platform_id(platform, id)?;
    let identity = state
        .frontends
        .resolver
        .find(&platform_id)
        .await?
        .with_context(|| format!("{platform_id} has never been seen"))?;

    let record = match expect_version {
        Some(expected) => state
            .frontends
            .preferences
            .clear(&identity, expected, FrontEnd::Cli)
            .await
            .with_context(|| format!("clearing pronouns for {platform_id}"))?,
        None => state
            .frontends
            .preferences
            .update(&identity, FrontEnd::Cli, |_| Vec::new())
            .await
            .with_context(|| format!("clearing pronouns for {platform_id}"))?,
    };

    if !json {
        println!();
        println!("  {} Pronouns cleared", style("✓").green().bold());
    }
    print_record(state, &platform_id, &record, json)
}

/// Show every revision of a user's record.
pub async fn history(state: &AppState, platform: PlatformArg, id: &str, json: bool) -> Result<()> {
    let platform_id = platform_id(platform, id)?;
    let identity = state
        .frontends
        .resolver
        .find(&platform_id)
        .await?
        .with_context(|| format!("{platform_id} has never been seen"))?;
    let revisions = state.frontends.preferences.history(&identity).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&revisions)?);
        return Ok(());
    }

    if revisions.is_empty() {
        println!();
        println!(
            "  {} No writes yet for {}",
            style("i").blue().bold(),
            style(&platform_id).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = new_table(vec!["Version", "Pronouns", "By", "When"]);
    for revision in &revisions {
        let display = describe(state, &revision.pronouns);
        table.add_row(vec![
            Cell::new(revision.version).fg(Color::Cyan),
            Cell::new(display),
            Cell::new(revision.updated_by),
            Cell::new(revision.updated_at.format("%Y-%m-%d %H:%M:%S")).fg(Color::DarkGrey),
        ]);
    }
    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// List stored records, most recently updated first.
pub async fn list(state: &AppState, limit: i64, offset: i64, json: bool) -> Result<()> {
    let records = state.frontends.preferences.list(limit, offset).await?;
    let total = state.frontends.preferences.count().await?;

    if json {
        let out = serde_json::json!({ "total": total, "records": records });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if records.is_empty() {
        println!();
        println!(
            "  {} No records yet. Set some with: {}",
            style("i").blue().bold(),
            style("pronouns set game <uuid> she/her").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = new_table(vec!["Identity", "Pronouns", "Version", "By", "Updated"]);
    for record in &records {
        table.add_row(vec![
            Cell::new(record.identity_id).fg(Color::Cyan),
            Cell::new(describe(state, &record.pronouns)),
            Cell::new(record.version),
            Cell::new(record.updated_by),
            Cell::new(record.updated_at.format("%Y-%m-%d %H:%M")).fg(Color::DarkGrey),
        ]);
    }
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} of {} record{}",
        style(records.len()).bold(),
        style(total).bold(),
        if total == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

/// List predefined sets.
pub fn sets(state: &AppState, json: bool) -> Result<()> {
    let registry = &state.frontends.registry;

    if json {
        let sets: Vec<String> = registry.predefined().iter().map(ToString::to_string).collect();
        println!("{}", serde_json::to_string_pretty(&sets)?);
        return Ok(());
    }

    let mut table = new_table(vec!["Name", "Forms"]);
    for set in registry.predefined() {
        table.add_row(vec![
            Cell::new(set.formatted()).fg(Color::Cyan),
            Cell::new(set).fg(Color::DarkGrey),
        ]);
    }
    println!();
    println!("{table}");
    if registry.filter().is_enabled() {
        println!(
            "  Custom sets are checked against {} filter pattern{}.",
            style(registry.filter().pattern_count()).bold(),
            if registry.filter().pattern_count() == 1 { "" } else { "s" }
        );
    }
    println!();
    Ok(())
}

fn describe(state: &AppState, pronouns: &[String]) -> String {
    let registry = &state.frontends.registry;
    registry.describe(&registry.interpret(pronouns))
}

fn new_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .into_iter()
            .map(|h| Cell::new(h).fg(Color::White))
            .collect::<Vec<_>>(),
    );
    table
}

fn print_record(
    state: &AppState,
    platform_id: &PlatformId,
    record: &PreferenceRecord,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!();
    println!(
        "  {}  {}",
        style("User:").bold(),
        style(platform_id).cyan()
    );
    println!(
        "  {}  {}",
        style("Pronouns:").bold(),
        describe(state, &record.pronouns)
    );
    println!("  {}  {}", style("Version:").bold(), record.version);
    if record.version > 0 {
        println!(
            "  {}  {} via {}",
            style("Updated:").bold(),
            style(record.updated_at.format("%Y-%m-%d %H:%M:%S")).dim(),
            record.updated_by
        );
    }
    println!(
        "  {}  {}",
        style("Identity:").bold(),
        style(record.identity_id).dim()
    );
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use pronouns_types::error::StoreError;

    use super::*;
    use crate::state::tests::test_state;

    fn words(input: &str) -> Vec<String> {
        input.split_whitespace().map(String::from).collect()
    }

    #[tokio::test]
    async fn set_without_version_then_clear() {
        let (_dir, state) = test_state().await;
        set(&state, PlatformArg::Game, "uuid-123", &words("they them"), None, true)
            .await
            .unwrap();
        set(&state, PlatformArg::Game, "uuid-123", &words("she"), None, true)
            .await
            .unwrap();
        clear(&state, PlatformArg::Game, "uuid-123", None, true).await.unwrap();

        let pid = PlatformId::game("uuid-123").unwrap();
        let identity = state.frontends.resolver.find(&pid).await.unwrap().unwrap();
        let record = state.frontends.preferences.get(&identity).await.unwrap();
        assert_eq!(record.version, 3);
        assert!(record.pronouns.is_empty());
        assert_eq!(record.updated_by, FrontEnd::Cli);
    }

    #[tokio::test]
    async fn stale_expected_version_fails() {
        let (_dir, state) = test_state().await;
        set(&state, PlatformArg::Chat, "1234", &words("he"), Some(0), true)
            .await
            .unwrap();
        let err = set(&state, PlatformArg::Chat, "1234", &words("she"), Some(0), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::VersionConflict { expected: 0, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn clear_unknown_user_fails() {
        let (_dir, state) = test_state().await;
        assert!(clear(&state, PlatformArg::Game, "ghost", None, true).await.is_err());
    }

    #[tokio::test]
    async fn get_unknown_user_does_not_create_identity() {
        let (_dir, state) = test_state().await;
        get(&state, PlatformArg::Game, "ghost", true).await.unwrap();
        let pid = PlatformId::game("ghost").unwrap();
        assert_eq!(state.frontends.resolver.find(&pid).await.unwrap(), None);
    }
}
