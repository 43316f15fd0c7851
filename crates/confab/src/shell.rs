// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `confab shell` command implementation.
//!
//! Interactive REPL that streams each answer as it arrives. Ctrl+C during a
//! response cancels only that turn; what was received so far is committed.

use std::io::Write;

use colored::Colorize;
use confab_agent::{random_conversation_id, ConversationAgent, Invocation};
use confab_config::ConfabConfig;
use confab_core::types::{CommitReport, ConversationId};
use confab_core::ConfabError;
use futures::StreamExt;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs the REPL for one conversation.
pub async fn run_shell(config: ConfabConfig, id: Option<String>) -> Result<(), ConfabError> {
    crate::serve::init_tracing("warn");

    let agent = crate::serve::build_agent(&config).await?;
    let conversation_id = id.map(ConversationId::new).unwrap_or_else(random_conversation_id);

    let mut rl = DefaultEditor::new()
        .map_err(|e| ConfabError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "confab shell".bold().green());
    println!("conversation {}", conversation_id.as_str().cyan());
    println!("Type {} to exit.\n", "/quit".yellow());

    let prompt = format!("{}> ", "confab".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if is_exit_command(trimmed) {
                    break;
                }
                let _ = rl.add_history_entry(&line);

                let mut stdout = std::io::stdout();
                if let Err(e) = stream_turn(
                    &agent,
                    &conversation_id,
                    trimmed,
                    &mut stdout,
                    wait_for_interrupt(),
                )
                .await
                {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    if !agent.shutdown(std::time::Duration::from_secs(config.stream.shutdown_grace_secs)).await {
        eprintln!("{}", "some turns were not committed before exit".yellow());
    }
    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Empty input and the exit words leave the shell.
fn is_exit_command(input: &str) -> bool {
    matches!(input, "" | "exit" | "quit" | "/quit" | "/exit")
}

async fn wait_for_interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Streams one turn to `out` and waits for its commit.
///
/// `interrupt` resolving cancels the turn's token.
async fn stream_turn<W, F>(
    agent: &ConversationAgent,
    conversation_id: &ConversationId,
    input: &str,
    out: &mut W,
    interrupt: F,
) -> Result<CommitReport, ConfabError>
where
    W: Write,
    F: std::future::Future<Output = ()>,
{
    let cancel = CancellationToken::new();
    let Invocation { mut live, commit } = agent
        .run(conversation_id.clone(), input, cancel.clone())
        .await?;

    let io_err = |e: std::io::Error| ConfabError::Internal(format!("failed to write output: {e}"));

    tokio::pin!(interrupt);
    loop {
        tokio::select! {
            item = live.next() => match item {
                Some(Ok(fragment)) => {
                    write!(out, "{}", fragment.content).map_err(io_err)?;
                    out.flush().map_err(io_err)?;
                }
                Some(Err(e)) => {
                    eprintln!("{}: {e}", "stream error".red());
                    break;
                }
                None => break,
            },
            _ = &mut interrupt => {
                cancel.cancel();
                eprintln!("{}", "(interrupted)".dimmed());
                break;
            }
        }
    }
    writeln!(out).map_err(io_err)?;

    let report = commit.wait().await?;
    debug!(
        conversation_id = %report.conversation_id,
        state = %report.state,
        fragments = report.fragments,
        "turn committed"
    );
    Ok(report)
}
