use std::process::Stdio;
use studydesk_core::{AudioPlayer, PlaybackEvent, PlaybackHandle, Ticket};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

/// Plays dialogue audio by running an external player (ffplay by default)
/// with the clip URL as its last argument.
///
/// Must be used from inside a tokio runtime. End-of-clip notifications are
/// sent on `events` and should be fed to `DialogueEngine::handle_playback_event`.
pub struct ProcessPlayer {
    program: String,
    args: Vec<String>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
}

impl ProcessPlayer {
    pub fn new(command: &[String], events: mpsc::UnboundedSender<PlaybackEvent>) -> Self {
        let (program, args) = match command.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (String::new(), vec![]),
        };
        Self {
            program,
            args,
            events,
        }
    }
}

struct ProcessHandle {
    stop_tx: Option<oneshot::Sender<()>>,
}

impl PlaybackHandle for ProcessHandle {
    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

impl AudioPlayer for ProcessPlayer {
    fn play(&self, url: &str, ticket: Ticket) -> Result<Box<dyn PlaybackHandle>, String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start '{}': {}", self.program, e))?;
        tracing::debug!("Playing {} (ticket {})", url, ticket);

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let events = self.events.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                stop = &mut stop_rx => {
                    if stop.is_ok() {
                        if let Err(e) = child.kill().await {
                            tracing::warn!("Failed to stop audio player: {}", e);
                        }
                        return;
                    }
                    // Handle dropped without stop: let the clip finish.
                    child.wait().await
                }
            };
            let event = match status {
                Ok(status) if status.success() => PlaybackEvent::Ended(ticket),
                Ok(status) => PlaybackEvent::Failed(ticket, format!("player exited with {status}")),
                Err(e) => PlaybackEvent::Failed(ticket, e.to_string()),
            };
            // The receiver is gone only during shutdown.
            let _ = events.send(event);
        });

        Ok(Box::new(ProcessHandle {
            stop_tx: Some(stop_tx),
        }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn player(command: &[&str]) -> (ProcessPlayer, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let command: Vec<String> = command.iter().map(|s| s.to_string()).collect();
        (ProcessPlayer::new(&command, tx), rx)
    }

    #[tokio::test]
    async fn finished_clip_reports_ended() {
        let (player, mut events) = player(&["true"]);

        let _handle = player.play("http://localhost:5000/api/audio/a.mp3", 7).unwrap();

        assert_eq!(events.recv().await, Some(PlaybackEvent::Ended(7)));
    }

    #[tokio::test]
    async fn failing_player_reports_failure() {
        let (player, mut events) = player(&["false"]);

        let _handle = player.play("http://localhost:5000/api/audio/a.mp3", 3).unwrap();

        assert!(matches!(events.recv().await, Some(PlaybackEvent::Failed(3, _))));
    }

    #[tokio::test]
    async fn stopped_clip_reports_nothing() {
        let (player, mut events) = player(&["sh", "-c", "sleep 30"]);

        let mut handle = player.play("http://localhost:5000/api/audio/a.mp3", 1).unwrap();
        handle.stop();

        let next = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
        assert!(next.is_err(), "got {next:?}");
    }

    #[tokio::test]
    async fn missing_program_fails_to_start() {
        let (player, _events) = player(&["studydesk-no-such-player"]);

        assert!(player.play("http://h/a.mp3", 1).is_err());
    }
}
