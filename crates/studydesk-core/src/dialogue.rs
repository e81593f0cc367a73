use crate::error::{Result, StudyError};
use crate::gateway::Gateway;
use crate::playback::{AudioPlayer, PlaybackEvent, PlaybackSlot, PlaybackState};
use std::sync::Arc;
use studydesk_gateway::types::{
    ContinueDialogueRequest, DialogueStarted, DialogueTurnReply, Speaker, StartDialogueRequest,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    Idle,
    Starting,
    Active,
    Continuing,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: Speaker,
    pub message: String,
    /// Backend-relative path, resolved only when played.
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueSession {
    pub id: String,
    pub topic: String,
    pub turns: Vec<Turn>,
    pub turn_cursor: usize,
}

impl DialogueSession {
    fn seeded(topic: &str, started: DialogueStarted) -> Self {
        Self {
            id: started.dialogue_id,
            topic: topic.to_string(),
            turns: vec![
                Turn {
                    speaker: Speaker::Teacher,
                    message: started.initial_message,
                    audio_url: None,
                },
                Turn {
                    speaker: Speaker::Student,
                    message: started.student_question,
                    audio_url: None,
                },
            ],
            turn_cursor: 0,
        }
    }

    /// Whoever did not speak last.
    pub fn next_speaker(&self) -> Speaker {
        self.turns
            .last()
            .map(|turn| turn.speaker.other())
            .unwrap_or(Speaker::Teacher)
    }

    fn append(&mut self, reply: DialogueTurnReply) -> Result<Turn> {
        let expected = self.next_speaker();
        if reply.speaker != expected {
            return Err(StudyError::Protocol(format!(
                "expected a {expected} turn, got {}",
                reply.speaker
            )));
        }
        let turn = Turn {
            speaker: reply.speaker,
            message: reply.message,
            audio_url: reply.audio_url.filter(|url| !url.trim().is_empty()),
        };
        self.turns.push(turn.clone());
        self.turn_cursor = reply.turn_number.min(self.turns.len());
        Ok(turn)
    }
}

/// Result of a request whose reply may arrive after the dialogue moved on.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    /// The dialogue was stopped or restarted while the request was in flight.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueSnapshot {
    pub phase: DialoguePhase,
    pub session: Option<DialogueSession>,
    pub playback: PlaybackState,
}

struct DialogueState {
    phase: DialoguePhase,
    session: Option<DialogueSession>,
    // Bumped on start and stop; replies carry the value they were sent under.
    generation: u64,
    playback: PlaybackSlot,
}

/// Runs a teacher/student audio dialogue and owns its single playback slot.
pub struct DialogueEngine {
    gateway: Arc<dyn Gateway>,
    player: Arc<dyn AudioPlayer>,
    state: Mutex<DialogueState>,
}

impl DialogueEngine {
    pub fn new(gateway: Arc<dyn Gateway>, player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            gateway,
            player,
            state: Mutex::new(DialogueState {
                phase: DialoguePhase::Idle,
                session: None,
                generation: 0,
                playback: PlaybackSlot::default(),
            }),
        }
    }

    pub async fn snapshot(&self) -> DialogueSnapshot {
        let state = self.state.lock().await;
        DialogueSnapshot {
            phase: state.phase,
            session: state.session.clone(),
            playback: state.playback.state(),
        }
    }

    /// Opens a dialogue on `topic`, optionally grounded in a chat session.
    pub async fn start(
        &self,
        topic: &str,
        session_id: Option<String>,
    ) -> Result<Outcome<DialogueSession>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(StudyError::Validation(
                "Enter a topic to start a dialogue".to_string(),
            ));
        }

        let generation = {
            let mut state = self.state.lock().await;
            match state.phase {
                DialoguePhase::Idle | DialoguePhase::Stopped => {}
                DialoguePhase::Starting => return Err(StudyError::Busy("dialogue start")),
                DialoguePhase::Active | DialoguePhase::Continuing => {
                    return Err(StudyError::InvalidState {
                        action: "start a dialogue",
                        state: "another dialogue is running".to_string(),
                    });
                }
            }
            state.phase = DialoguePhase::Starting;
            state.generation += 1;
            state.generation
        };

        let request = StartDialogueRequest::new(topic).with_session_id(session_id);
        let result = self.gateway.start_dialogue(request).await;

        let mut state = self.state.lock().await;
        if state.generation != generation || state.phase != DialoguePhase::Starting {
            tracing::debug!("Dropping dialogue start for '{}'", topic);
            return Ok(Outcome::Stale);
        }
        match result {
            Ok(started) => {
                let session = DialogueSession::seeded(topic, started);
                tracing::info!("Dialogue {} started on '{}'", session.id, topic);
                state.session = Some(session.clone());
                state.phase = DialoguePhase::Active;
                Ok(Outcome::Applied(session))
            }
            Err(e) => {
                tracing::warn!("Failed to start dialogue: {}", e);
                state.phase = DialoguePhase::Idle;
                Err(e.into())
            }
        }
    }

    /// Asks for the next turn, optionally steering it with a learner question.
    pub async fn continue_dialogue(&self, question: Option<&str>) -> Result<Outcome<Turn>> {
        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let (dialogue_id, generation) = {
            let mut state = self.state.lock().await;
            match state.phase {
                DialoguePhase::Active => {}
                DialoguePhase::Continuing => return Err(StudyError::Busy("dialogue continue")),
                phase => {
                    return Err(StudyError::InvalidState {
                        action: "continue the dialogue",
                        state: format!("{phase:?}").to_lowercase(),
                    });
                }
            }
            let Some(dialogue_id) = state.session.as_ref().map(|s| s.id.clone()) else {
                return Err(StudyError::InvalidState {
                    action: "continue the dialogue",
                    state: "no dialogue is open".to_string(),
                });
            };
            state.phase = DialoguePhase::Continuing;
            (dialogue_id, state.generation)
        };

        let request = ContinueDialogueRequest::new().with_user_question(question);
        let result = self.gateway.continue_dialogue(dialogue_id, request).await;

        let mut state = self.state.lock().await;
        if state.generation != generation || state.phase != DialoguePhase::Continuing {
            tracing::debug!("Dropping dialogue turn that arrived after stop");
            return Ok(Outcome::Stale);
        }
        state.phase = DialoguePhase::Active;
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Failed to continue dialogue: {}", e);
                return Err(e.into());
            }
        };
        let Some(session) = state.session.as_mut() else {
            return Ok(Outcome::Stale);
        };
        match session.append(reply) {
            Ok(turn) => Ok(Outcome::Applied(turn)),
            Err(e) => {
                tracing::error!("Discarding dialogue turn: {}", e);
                Err(e)
            }
        }
    }

    /// Ends the dialogue, releases audio, and makes any in-flight reply stale.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.playback.release();
        if let Some(session) = state.session.take() {
            tracing::info!("Dialogue {} stopped", session.id);
        }
        state.phase = DialoguePhase::Stopped;
        state.generation += 1;
    }

    /// Plays the audio of turn `index`, stopping anything else first.
    ///
    /// Once the turn is known to have audio, the current clip is stopped even
    /// if the new one cannot be resolved or started.
    pub async fn play_turn(&self, index: usize) -> Result<PlaybackState> {
        let mut state = self.state.lock().await;
        self.play_locked(&mut state, index)
    }

    pub async fn pause(&self) -> PlaybackState {
        let mut state = self.state.lock().await;
        state.playback.pause();
        state.playback.state()
    }

    /// Pauses turn `index` if it is the one playing, otherwise plays it.
    pub async fn toggle(&self, index: usize) -> Result<PlaybackState> {
        let mut state = self.state.lock().await;
        let current = state.playback.state();
        if current.is_playing && current.now_playing == Some(index) {
            state.playback.pause();
            return Ok(state.playback.state());
        }
        self.play_locked(&mut state, index)
    }

    /// Feeds a player event back in. Events for replaced clips are ignored.
    pub async fn handle_playback_event(&self, event: PlaybackEvent) -> bool {
        let mut state = self.state.lock().await;
        let applied = state.playback.finish(&event);
        if let (true, PlaybackEvent::Failed(_, reason)) = (applied, &event) {
            tracing::warn!("Audio playback failed: {}", reason);
        }
        applied
    }

    fn play_locked(&self, state: &mut DialogueState, index: usize) -> Result<PlaybackState> {
        let session = state.session.as_ref().ok_or_else(|| StudyError::InvalidState {
            action: "play audio",
            state: "no dialogue is open".to_string(),
        })?;
        let turn = session
            .turns
            .get(index)
            .ok_or_else(|| StudyError::Validation(format!("no turn {index}")))?;
        let audio = turn
            .audio_url
            .as_deref()
            .ok_or_else(|| StudyError::Validation(format!("turn {index} has no audio")))?;
        let url = match self.gateway.resolve_asset(audio) {
            Ok(url) => url,
            Err(e) => {
                state.playback.release();
                tracing::warn!("Cannot resolve audio for turn {}: {}", index, e);
                return Err(e.into());
            }
        };

        if let Err(e) = state.playback.acquire(self.player.as_ref(), &url, index) {
            tracing::warn!("Failed to play {}: {}", url, e);
            return Err(StudyError::Playback(e));
        }
        Ok(state.playback.state())
    }
}
