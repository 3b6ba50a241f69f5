//! Text conversation with a Diatheke model over either protocol.

mod common;

use std::sync::Arc;

use anyhow::{Context, Result};
use diatheke::{Action, CommandStatus, Conversation, StatusCode};
use diatheke_utils::textui::{self, Prompt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::init()?;
    let client_config = common::client_config(&config)?;

    let conversation: Arc<dyn Conversation> = diatheke::open(&client_config, &config.server.model_id)
        .await
        .context("failed to start a conversation")?
        .into();
    common::banner("CLI", &config);
    tracing::info!("conversation started with {:?} protocol", client_config.protocol());

    let actions = tokio::spawn(handle_actions(conversation.clone()));

    let mut prompt = Prompt::new("Diatheke> ");
    prompt.show_help();
    loop {
        let line = tokio::select! {
            line = prompt.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(text) = line else {
            break;
        };
        if text.is_empty() {
            continue;
        }
        if let Err(e) = conversation.push_text(&text).await {
            textui::print_red(&format!("failed to send text: {}", e));
        }
    }

    conversation.end().await.context("failed to end the session")?;
    actions.await??;
    println!("Exiting...");
    Ok(())
}

async fn handle_actions(conversation: Arc<dyn Conversation>) -> Result<()> {
    while let Some(action) = conversation.next_action().await? {
        match action {
            Action::WaitForInput { requires_wake_word, .. } => {
                if requires_wake_word {
                    textui::print_white("(waiting for the wake word)");
                }
            }
            Action::Recognized { text, valid } => {
                let color = if valid { textui::WHITE } else { textui::RED };
                println!("\n{}", textui::colored(color, &format!("Recognized: {}", text)));
            }
            Action::Reply { text, .. } => {
                textui::print_green(&format!("\n  Reply: {}", text));
            }
            Action::Command(status) => {
                conversation.command_finished(&run_command(status)).await?;
            }
            Action::Transcribe(action) => {
                textui::print_white(&format!("(transcription {} needs audio; skipped)", action.id));
            }
        }
    }
    Ok(())
}

/// Stands in for real device control; reports success.
fn run_command(mut status: CommandStatus) -> CommandStatus {
    textui::print_blue(&format!("\n  Command: {} {:?}", status.command_id(), status.params()));
    status.set_status_code(StatusCode::Success);
    status
}
