//! Drive the game or chat adapter from the command line.

use anyhow::Result;
use console::style;

use pronouns_core::adapter::Reply;

use crate::cli::PlatformArg;
use crate::state::AppState;

/// Run one front-end command and print the reply.
///
/// Chat writes are acknowledged before they land, so the adapter is flushed
/// before returning.
pub async fn run(state: &AppState, platform: PlatformArg, id: &str, text: &[String], json: bool) -> Result<()> {
    let text = text.join(" ");
    let reply = match platform {
        PlatformArg::Game => state.game.submit(id, &text).await?,
        PlatformArg::Chat => {
            // The user typed the command, not a chat message: add the prefix.
            let message = format!("{}{text}", state.chat.prefix());
            let reply = state.chat.handle_message(id, &message).await;
            state.chat.flush().await;
            match reply {
                Some(reply) => reply,
                None => anyhow::bail!("message was not treated as a command"),
            }
        }
    };

    print_reply(&reply, json)
}

fn print_reply(reply: &Reply, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reply)?);
        return Ok(());
    }

    let marker = if reply.success {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    println!();
    for (i, line) in reply.message.lines().enumerate() {
        if i == 0 {
            println!("  {marker} {line}");
        } else {
            println!("    {line}");
        }
    }
    println!();
    Ok(())
}
