//! Speech synthesis without dialogue: every line entered is spoken.

mod common;

use anyhow::{bail, Context, Result};
use diatheke::types::v2::ReplyAction;
use diatheke_utils::audio::Player;
use diatheke_utils::textui::{self, Prompt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::init()?;
    if !config.playback.is_set() {
        bail!("missing playback application in config file");
    }

    let client = diatheke::connect_with_config(&common::client_config(&config)?)
        .await
        .context("error creating diatheke client")?;
    common::banner("TTS", &config);

    let mut prompt = Prompt::new("Please enter the Luna voice model ID: ");
    let Some(model_id) = prompt.next_line().await? else {
        return Ok(());
    };

    let mut prompt = Prompt::new("Diatheke TTS> ");
    prompt.show_help();
    while let Some(text) = prompt.next_line().await? {
        if text.is_empty() {
            continue;
        }
        if let Err(e) = speak(&client, &model_id, &text, &config.playback).await {
            textui::print_red(&format!("streaming TTS error: {:#}", e));
        }
    }

    println!("Exiting...");
    Ok(())
}

async fn speak(client: &diatheke::Client, model_id: &str, text: &str, playback: &diatheke_utils::config::AudioConfig) -> Result<()> {
    println!("Synthesizing using voice model {} ...", model_id);
    let mut player = Player::new(playback);
    player.start()?;

    let mut stream = client.new_tts_stream(&ReplyAction::new(text, model_id)).await?;
    let written = diatheke::write_tts_audio(&mut stream, &mut player).await;
    player.stop().await?;
    written?;

    println!("Synthesis complete.\n");
    Ok(())
}
