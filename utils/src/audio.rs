//! Audio capture and playback through external programs (sox, aplay, ...).
//!
//! Audio is raw bytes in whatever format the programs are configured for;
//! it has to match what the Diatheke model expects.

use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::config::AudioConfig;

fn command(config: &AudioConfig) -> Command {
    let mut command = Command::new(&config.application);
    command.args(config.arg_list()).kill_on_drop(true);
    command
}

fn not_running(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, format!("{} application is not running", what))
}

/// Reads audio from the stdout of a recording program.
pub struct Recorder {
    config: AudioConfig,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl Recorder {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            config: config.clone(),
            child: None,
            stdout: None,
        }
    }

    /// Starts the program. Does nothing if it is already running.
    pub fn start(&mut self) -> io::Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let mut child = command(&self.config).stdout(Stdio::piped()).spawn()?;
        self.stdout = child.stdout.take();
        self.child = Some(child);
        tracing::debug!("recording with {}", self.config.application);
        Ok(())
    }

    pub async fn stop(&mut self) -> io::Result<()> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
            tracing::debug!("recording stopped");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

impl AsyncRead for Recorder {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.stdout.as_mut() {
            Some(stdout) => Pin::new(stdout).poll_read(cx, buf),
            None => Poll::Ready(Err(not_running("recording"))),
        }
    }
}

/// Writes audio to the stdin of a playback program.
pub struct Player {
    config: AudioConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl Player {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            config: config.clone(),
            child: None,
            stdin: None,
        }
    }

    pub fn start(&mut self) -> io::Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let mut child = command(&self.config).stdin(Stdio::piped()).spawn()?;
        self.stdin = child.stdin.take();
        self.child = Some(child);
        tracing::debug!("playing with {}", self.config.application);
        Ok(())
    }

    pub async fn push_audio(&mut self, audio: &[u8]) -> io::Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| not_running("playback"))?;
        stdin.write_all(audio).await
    }

    /// Closes the program's input and waits for it to play what it has.
    pub async fn stop(&mut self) -> io::Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.shutdown().await?;
        }
        if let Some(mut child) = self.child.take() {
            let status = child.wait().await?;
            tracing::debug!("playback exited with {}", status);
        }
        Ok(())
    }

    /// Plays one complete clip.
    pub async fn play(&mut self, audio: &[u8]) -> io::Result<()> {
        self.start()?;
        self.push_audio(audio).await?;
        self.stop().await
    }
}

impl AsyncWrite for Player {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.stdin.as_mut() {
            Some(stdin) => Pin::new(stdin).poll_write(cx, buf),
            None => Poll::Ready(Err(not_running("playback"))),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stdin.as_mut() {
            Some(stdin) => Pin::new(stdin).poll_flush(cx),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.stdin.as_mut() {
            Some(stdin) => Pin::new(stdin).poll_shutdown(cx),
            None => Poll::Ready(Ok(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn shell(script: &str) -> AudioConfig {
        AudioConfig {
            application: "sh".to_string(),
            args: format!("-c {}", script),
        }
    }

    #[tokio::test]
    async fn test_recorder_reads_program_output() {
        let mut recorder = Recorder::new(&shell("yes"));
        recorder.start().unwrap();

        let mut buf = [0u8; 4];
        recorder.read_exact(&mut buf).await.unwrap();
        recorder.stop().await.unwrap();

        assert_eq!(&buf, b"y\ny\n");
        assert!(!recorder.is_running());
    }

    #[tokio::test]
    async fn test_push_before_start_fails() {
        let mut player = Player::new(&shell("cat"));

        let err = player.push_audio(&[1, 2]).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn test_play_waits_for_program() {
        let mut player = Player::new(&shell("cat>/dev/null"));
        player.play(&[0; 64]).await.unwrap();
        player.stop().await.unwrap();
    }
}
