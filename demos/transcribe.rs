//! Continuous transcription: audio is streamed until Enter is pressed while
//! results are printed as they arrive.

mod common;

use anyhow::{bail, Context, Result};
use diatheke::types::v2::TranscribeAction;
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
    common::banner("Transcribe", &config);

    let mut prompt = Prompt::new("Please enter the Cubic model ID: ");
    let Some(cubic_model) = prompt.next_line().await? else {
        return Ok(());
    };
    let action = TranscribeAction::with_cubic_model(&cubic_model);

    let mut prompt = Prompt::new("");
    println!("(Press Enter to transcribe, Ctrl+D to exit)");
    while prompt.next_line().await?.is_some() {
        let mut stream = client.new_transcribe_stream(&action).await?;
        let context = stream.context().clone();
        let mut recorder = Recorder::new(&config.recording);
        recorder.start()?;

        let task = tokio::spawn(async move {
            let result = diatheke::read_transcribe_audio(&mut stream, &mut recorder, 8192, |result| {
                if result.is_partial {
                    println!("{}", textui::colored(textui::WHITE, &format!("... {}", result.text)));
                } else {
                    textui::print_green(&result.text);
                }
                Ok::<_, anyhow::Error>(())
            })
            .await;
            recorder.stop().await?;
            anyhow::Ok(result)
        });

        println!("(Transcribing, press Enter to stop)");
        prompt.next_line().await?;
        context.cancel();

        match task.await?? {
            Err(e) if !e.is_cancelled() => textui::print_red(&format!("transcription failed: {}", e)),
            _ => println!("(Press Enter to transcribe, Ctrl+D to exit)"),
        }
    }

    println!("Exiting...");
    Ok(())
}
