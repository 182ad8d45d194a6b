//! System status command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Display record counts, cache settings and storage info.
pub async fn status(state: &AppState, json: bool) -> Result<()> {
    let records = state.frontends.preferences.count().await?;
    let cache = state.frontends.preferences.cache().stats();
    let config = &state.config;
    let filter = state.frontends.registry.filter();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "database_url": state.database_url,
            "records": records,
            "cache": cache,
            "predefined_sets": state.frontends.registry.predefined().len(),
            "filter": {
                "enabled": filter.is_enabled(),
                "patterns": filter.pattern_count(),
            },
            "cloud": {
                "enabled": config.cloud.enabled,
                "url": config.cloud.url,
            },
            "storage": {
                "timeout_ms": config.storage.timeout_ms,
                "retry_attempts": config.retry.max_attempts,
            },
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} ProNouns v{}",
        style("◆").magenta().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Records ──").dim());
    println!("  Stored:   {}", style(records).bold());
    println!(
        "  Sets:     {} predefined",
        state.frontends.registry.predefined().len()
    );
    if filter.is_enabled() {
        println!(
            "  Filter:   {} ({} patterns)",
            style("on").green(),
            filter.pattern_count()
        );
    } else {
        println!("  Filter:   {}", style("off").dim());
    }
    if config.cloud.enabled {
        println!("  Shared:   {} ({})", style("on").green(), style(&config.cloud.url).dim());
    } else {
        println!("  Shared:   {}", style("off").dim());
    }
    println!();

    println!("  {}", style("── Cache ──").dim());
    println!("  Capacity: {}", cache.capacity);
    println!();

    println!("  {}", style("── Storage ──").dim());
    println!(
        "  Timeout:  {} ms, {} attempts",
        config.storage.timeout_ms, config.retry.max_attempts
    );
    println!("  Database: {}", style(&state.database_url).dim());
    println!("  Data dir: {}", style(state.data_dir.display()).dim());
    println!();

    Ok(())
}
