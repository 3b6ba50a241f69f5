//! Voice conversation over the session id API. Events and synthesized
//! replies arrive on their own streams while the user toggles recording
//! with Enter.

mod common;

use anyhow::{bail, Context, Result};
use diatheke::{AudioInputStream, CommandStatus, Event, EventStream, ReplyFrame, StatusCode};
use diatheke_utils::audio::{Player, Recorder};
use diatheke_utils::config::AudioConfig;
use diatheke_utils::textui::{self, Prompt};
use tokio::io::AsyncReadExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const AUDIO_BUFFER_SIZE: usize = 8192;

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::init()?;
    if !config.recording.is_set() || !config.playback.is_set() {
        bail!("recording and playback applications are required for this demo");
    }

    let client = diatheke::connect_legacy_with_config(&common::client_config(&config)?)
        .await
        .context("error creating diatheke client")?;
    println!("Diatheke version: {}", client.version().await?);
    common::banner("Legacy Audio", &config);

    let session_id = client.new_session(&config.server.model_id).await?;
    let events = tokio::spawn(handle_events(client.session_event_stream(&session_id).await?));
    let mut replies = client.stream_audio_replies(&session_id).await?;
    let playback = config.playback.clone();
    let replies_task = tokio::spawn(async move { play_replies(&mut replies, &playback).await });

    let mut prompt = Prompt::new("");
    let mut recording: Option<(oneshot::Sender<()>, JoinHandle<Result<()>>)> = None;
    println!("(Press Enter to record, Ctrl+D to exit)");
    while prompt.next_line().await?.is_some() {
        match recording.take() {
            None => {
                let input = client.stream_audio_input(&session_id).await?;
                let (stop, stopped) = oneshot::channel();
                recording = Some((stop, tokio::spawn(record(input, config.recording.clone(), stopped))));
                println!("(Recording, press Enter to stop)");
            }
            Some((stop, task)) => {
                let _ = stop.send(());
                if let Err(e) = task.await? {
                    textui::print_red(&format!("recording failed: {}", e));
                }
                println!("(Press Enter to record, Ctrl+D to exit)");
            }
        }
    }

    if let Some((stop, task)) = recording {
        let _ = stop.send(());
        task.await??;
    }
    client.end_session(&session_id).await?;
    events.await??;
    replies_task.await??;
    println!("Exiting...");
    Ok(())
}

async fn record(mut input: AudioInputStream, config: AudioConfig, mut stopped: oneshot::Receiver<()>) -> Result<()> {
    let mut recorder = Recorder::new(&config);
    recorder.start()?;

    let mut buf = vec![0u8; AUDIO_BUFFER_SIZE];
    loop {
        let n = tokio::select! {
            _ = &mut stopped => break,
            n = recorder.read(&mut buf) => n?,
        };
        if n == 0 || !input.push_audio(&buf[..n]).await? {
            break;
        }
    }

    recorder.stop().await?;
    input.finished().await?;
    Ok(())
}

async fn handle_events(mut events: EventStream) -> Result<()> {
    while let Some(event) = events.wait_for_event().await? {
        match event {
            Event::Recognize(e) => {
                let color = if e.valid_input { textui::WHITE } else { textui::RED };
                println!("{}", textui::colored(color, &format!("User: {}", e.text)));
            }
            Event::Reply(e) => textui::print_green(&format!("  Reply: {}", e.text)),
            Event::Command(e) => {
                let mut status = CommandStatus::from(&e);
                textui::print_blue(&format!("  Command: {} {:?}", status.command_id(), status.params()));
                status.set_status_code(StatusCode::Success);
                events.command_finished(&status).await?;
            }
        }
    }
    events.close().await?;
    Ok(())
}

async fn play_replies(replies: &mut diatheke::AudioReplyStream, config: &AudioConfig) -> Result<()> {
    let mut player = Player::new(config);
    while let Some(frame) = replies.wait_for_reply().await? {
        match frame {
            ReplyFrame::Begin(_) => player.start()?,
            ReplyFrame::Data(audio) => {
                if let Err(e) = player.push_audio(&audio).await {
                    tracing::warn!("dropping reply audio: {}", e);
                }
            }
            ReplyFrame::End => player.stop().await?,
        }
    }
    player.stop().await?;
    if replies.protocol_warnings() > 0 {
        tracing::warn!("{} reply frames arrived out of order", replies.protocol_warnings());
    }
    Ok(())
}
