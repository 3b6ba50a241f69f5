//! Voice conversation over the token API: recorded speech goes through ASR,
//! replies are synthesized and played back.

mod common;

use anyhow::{bail, Context, Result};
use diatheke::types::v2::{self, action_data::Action};
use diatheke::{Client, CommandStatus, StatusCode};
use diatheke_utils::audio::{Player, Recorder};
use diatheke_utils::config::DemoConfig;
use diatheke_utils::textui;

const AUDIO_BUFFER_SIZE: usize = 8192;

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::init()?;
    if !config.recording.is_set() || !config.playback.is_set() {
        bail!("recording and playback applications are required for this demo");
    }

    let client = diatheke::connect_with_config(&common::client_config(&config)?)
        .await
        .context("error creating diatheke client")?;
    let version = client.version().await.context("could not get Diatheke version")?;
    println!("Diatheke version: {}", version.diatheke);
    common::banner("Audio", &config);

    let session = client
        .create_session(&config.server.model_id, "")
        .await
        .context("failed to create a session")?;
    let Some(mut token) = session.token.clone() else {
        bail!("server returned a session without a token");
    };

    let result = tokio::select! {
        result = converse(&client, &config, session) => result,
        _ = tokio::signal::ctrl_c() => Ok(None),
    };
    if let Some(last) = result? {
        token = last;
    }

    client.delete_session(&token).await?;
    println!("Exiting...");
    Ok(())
}

/// Runs the actions of each session update until the server stops asking
/// for input. Returns the last token.
async fn converse(client: &Client, config: &DemoConfig, mut output: v2::SessionOutput) -> Result<Option<v2::TokenData>> {
    loop {
        let token = output.token.clone().context("session output without a token")?;
        let mut next = None;

        for data in std::mem::take(&mut output.action_list) {
            match data.action {
                Some(Action::Input(_)) => {
                    let result = recognize(client, config, &token).await?;
                    if result.text.is_empty() {
                        textui::print_white("(nothing heard)");
                    } else {
                        textui::print_white(&format!("User: {}", result.text));
                    }
                    next = Some(client.process_asr_result(&token, result).await?);
                }
                Some(Action::Reply(reply)) => {
                    textui::print_green(&format!("  Reply: {}", reply.text));
                    speak(client, config, &reply).await?;
                }
                Some(Action::Command(command)) => {
                    let mut status = CommandStatus::from(&command);
                    textui::print_blue(&format!("  Command: {} {:?}", status.command_id(), status.params()));
                    status.set_status_code(StatusCode::Success);
                    next = Some(client.process_command_result(&token, &status).await?);
                }
                Some(Action::Transcribe(action)) => {
                    transcribe(client, config, &action).await?;
                }
                None => tracing::warn!("skipping unknown action"),
            }
            if next.is_some() {
                // A new token supersedes the rest of this update.
                break;
            }
        }

        match next {
            Some(updated) => output = updated,
            None => return Ok(Some(token)),
        }
    }
}

async fn recognize(client: &Client, config: &DemoConfig, token: &v2::TokenData) -> Result<v2::AsrResult> {
    let mut recorder = Recorder::new(&config.recording);
    recorder.start()?;
    textui::print_white("(listening)");

    let stream = client.new_session_asr_stream(token).await?;
    let result = diatheke::read_asr_audio(&stream, &mut recorder, AUDIO_BUFFER_SIZE).await;
    recorder.stop().await?;
    Ok(result?)
}

async fn speak(client: &Client, config: &DemoConfig, reply: &v2::ReplyAction) -> Result<()> {
    let mut player = Player::new(&config.playback);
    player.start()?;
    let mut stream = client.new_tts_stream(reply).await?;
    diatheke::write_tts_audio(&mut stream, &mut player).await?;
    player.stop().await?;
    Ok(())
}

async fn transcribe(client: &Client, config: &DemoConfig, action: &v2::TranscribeAction) -> Result<()> {
    let mut recorder = Recorder::new(&config.recording);
    recorder.start()?;
    textui::print_white("(transcribing, the server decides when to stop)");

    let mut stream = client.new_transcribe_stream(action).await?;
    let result = diatheke::read_transcribe_audio(&mut stream, &mut recorder, AUDIO_BUFFER_SIZE, |result| {
        if !result.is_partial {
            textui::print_white(&format!("Transcript: {}", result.text));
        }
        Ok::<_, anyhow::Error>(())
    })
    .await;
    recorder.stop().await?;
    Ok(result?)
}
