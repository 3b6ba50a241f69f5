//! Speech recognition without dialogue: each Enter records one utterance.

mod common;

use anyhow::{bail, Context, Result};
use diatheke_utils::audio::Recorder;
use diatheke_utils::textui::{self, Prompt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::init()?;
    if !config.recording.is_set() {
        bail!("missing recording application in config file");
    }

    let client = diatheke::connect_with_config(&common::client_config(&config)?)
        .await
        .context("error creating diatheke client")?;
    common::banner("ASR", &config);

    // ASR streams are tied to a session, which selects the model.
    let session = client.create_session(&config.server.model_id, "").await?;
    let token = session.token.context("server returned a session without a token")?;

    let mut prompt = Prompt::new("");
    println!("(Press Enter to record an utterance, Ctrl+D to exit)");
    while prompt.next_line().await?.is_some() {
        let mut recorder = Recorder::new(&config.recording);
        recorder.start()?;
        println!("(Recording, stop talking to finish)");

        let stream = client.new_session_asr_stream(&token).await?;
        let result = diatheke::read_asr_audio(&stream, &mut recorder, 8192).await;
        recorder.stop().await?;

        match result {
            Ok(result) if result.timed_out => textui::print_red("(timed out waiting for speech)"),
            Ok(result) => textui::print_green(&format!("Result: {} ({:.2})", result.text, result.confidence)),
            Err(e) => textui::print_red(&format!("recognition failed: {}", e)),
        }
    }

    client.delete_session(&token).await?;
    println!("Exiting...");
    Ok(())
}
