use crate::error::{Result, StudyError};
use crate::gateway::Gateway;
use std::sync::Arc;
use studydesk_gateway::types::{ChatMode, ChatRequest, SessionExchange};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Shown in place of an answer when the backend could not be reached or refused the question.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub sources: Vec<String>,
    pub mode: ChatMode,
}

impl ChatMessage {
    fn user(content: &str, mode: ChatMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.to_string(),
            sources: vec![],
            mode,
        }
    }

    fn assistant(content: String, sources: Vec<String>, mode: ChatMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content,
            sources,
            mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Answered,
    /// The request failed and the apology was appended instead.
    Apologized,
    /// The conversation was reset while the request was in flight.
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSnapshot {
    pub transcript: Vec<ChatMessage>,
    pub session_id: Option<String>,
    pub mode: ChatMode,
    pub pending: bool,
}

#[derive(Default)]
struct ChatState {
    transcript: Vec<ChatMessage>,
    session_id: Option<String>,
    mode: ChatMode,
    pending: bool,
    // Bumped by reset/resume; replies from an older generation are dropped.
    generation: u64,
}

/// Drives one tutoring conversation: the transcript, the backend session id
/// and the answering mode for the next question.
pub struct ChatController {
    gateway: Arc<dyn Gateway>,
    state: Mutex<ChatState>,
}

impl ChatController {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            state: Mutex::new(ChatState::default()),
        }
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        let state = self.state.lock().await;
        ChatSnapshot {
            transcript: state.transcript.clone(),
            session_id: state.session_id.clone(),
            mode: state.mode,
            pending: state.pending,
        }
    }

    /// Applies to the next question only; already sent messages keep their mode.
    pub async fn set_mode(&self, mode: ChatMode) {
        self.state.lock().await.mode = mode;
    }

    /// Sends `text` as the next question.
    ///
    /// A failed request is not an error: the apology is appended and the
    /// session id is left as it was.
    pub async fn send(&self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StudyError::Validation("message is empty".to_string()));
        }

        let (request, generation) = {
            let mut state = self.state.lock().await;
            if state.pending {
                return Err(StudyError::Busy("chat"));
            }
            state.pending = true;
            let mode = state.mode;
            state.transcript.push(ChatMessage::user(text, mode));
            let request = ChatRequest::new(text, mode).with_session_id(state.session_id.clone());
            (request, state.generation)
        };
        let mode = request.mode;

        let result = self.gateway.chat(request).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!("Dropping chat reply from a reset conversation");
            return Ok(SendOutcome::Discarded);
        }
        state.pending = false;
        match result {
            Ok(reply) => {
                if let Some(session_id) = reply.session_id {
                    state.session_id = Some(session_id);
                }
                state
                    .transcript
                    .push(ChatMessage::assistant(reply.response, reply.sources, mode));
                Ok(SendOutcome::Answered)
            }
            Err(e) => {
                tracing::warn!("Chat request failed: {}", e);
                state
                    .transcript
                    .push(ChatMessage::assistant(APOLOGY.to_string(), vec![], mode));
                Ok(SendOutcome::Apologized)
            }
        }
    }

    /// Starts a fresh conversation. Transcript and session id go together.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.transcript.clear();
        state.session_id = None;
        state.pending = false;
        state.generation += 1;
        tracing::info!("Chat reset");
    }

    /// Replaces the conversation with a stored backend session and continues it.
    /// Returns the number of messages loaded.
    pub async fn resume(&self, session_id: &str) -> Result<usize> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(StudyError::Validation("session id is empty".to_string()));
        }
        let generation = {
            let mut state = self.state.lock().await;
            if state.pending {
                return Err(StudyError::Busy("chat"));
            }
            state.pending = true;
            state.generation
        };

        let result = self.gateway.session_messages(session_id.to_string()).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            return Err(StudyError::InvalidState {
                action: "resume",
                state: "the conversation was reset".to_string(),
            });
        }
        state.pending = false;
        let exchanges = result?;
        state.transcript = transcript_from(exchanges);
        state.session_id = Some(session_id.to_string());
        state.generation += 1;
        tracing::info!("Resumed session {} ({} messages)", session_id, state.transcript.len());
        Ok(state.transcript.len())
    }
}

fn transcript_from(exchanges: Vec<SessionExchange>) -> Vec<ChatMessage> {
    exchanges
        .into_iter()
        .flat_map(|exchange| {
            [
                ChatMessage::user(&exchange.user_message, exchange.mode),
                ChatMessage::assistant(exchange.ai_response, exchange.sources, exchange.mode),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::testing::GatedGateway;
    use studydesk_gateway::GatewayError;
    use studydesk_gateway::types::ChatReply;

    fn reply(response: &str, sources: &[&str], session_id: Option<&str>) -> ChatReply {
        ChatReply {
            response: response.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            session_id: session_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn exam_question_adopts_session_id() {
        // --- Arrange ---
        let mut gateway = MockGateway::new();
        gateway
            .expect_chat()
            .withf(|req| {
                req.message == "What is supply and demand?"
                    && req.mode == ChatMode::Exam
                    && req.session_id.is_none()
            })
            .times(1)
            .returning(|_| Ok(reply("Supply and demand is...", &["ch1.pdf"], Some("abc"))));
        let chat = ChatController::new(Arc::new(gateway));
        chat.set_mode(ChatMode::Exam).await;

        // --- Act ---
        let outcome = chat.send("What is supply and demand?").await.unwrap();

        // --- Assert ---
        assert_eq!(outcome, SendOutcome::Answered);
        let snap = chat.snapshot().await;
        assert_eq!(snap.session_id.as_deref(), Some("abc"));
        assert!(!snap.pending);
        assert_eq!(snap.transcript.len(), 2);
        assert_eq!(snap.transcript[0].role, Role::User);
        assert_eq!(snap.transcript[0].mode, ChatMode::Exam);
        assert_eq!(snap.transcript[1].role, Role::Assistant);
        assert_eq!(snap.transcript[1].content, "Supply and demand is...");
        assert_eq!(snap.transcript[1].sources, vec!["ch1.pdf".to_string()]);
    }

    #[tokio::test]
    async fn follow_up_sends_adopted_session_id() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_chat()
            .withf(|req| req.session_id.is_none())
            .times(1)
            .returning(|_| Ok(reply("first", &[], Some("abc"))));
        gateway
            .expect_chat()
            .withf(|req| req.session_id.as_deref() == Some("abc"))
            .times(1)
            .returning(|_| Ok(reply("second", &[], None)));
        let chat = ChatController::new(Arc::new(gateway));

        chat.send("one").await.unwrap();
        chat.send("two").await.unwrap();

        // A reply without a session id leaves the current one alone.
        let snap = chat.snapshot().await;
        assert_eq!(snap.session_id.as_deref(), Some("abc"));
        assert_eq!(snap.transcript.len(), 4);
    }

    #[tokio::test]
    async fn failure_appends_apology_and_keeps_session() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_chat()
            .times(1)
            .returning(|_| Ok(reply("hi", &[], Some("abc"))));
        gateway
            .expect_chat()
            .times(1)
            .returning(|_| Err(GatewayError::Network("connection refused".into())));
        let chat = ChatController::new(Arc::new(gateway));

        chat.send("hello").await.unwrap();
        let outcome = chat.send("again").await.unwrap();

        assert_eq!(outcome, SendOutcome::Apologized);
        let snap = chat.snapshot().await;
        let last = snap.transcript.last().unwrap();
        assert_eq!(last.content, APOLOGY);
        assert!(last.sources.is_empty());
        assert_eq!(snap.session_id.as_deref(), Some("abc"));
        assert!(!snap.pending);
    }

    #[tokio::test]
    async fn blank_message_is_a_no_op() {
        let mut gateway = MockGateway::new();
        gateway.expect_chat().never();
        let chat = ChatController::new(Arc::new(gateway));

        let err = chat.send("   ").await.unwrap_err();

        assert!(matches!(err, StudyError::Validation(_)));
        assert_eq!(chat.snapshot().await, ChatSnapshot::default());
    }

    #[tokio::test]
    async fn second_send_while_pending_is_rejected() {
        let mut inner = MockGateway::new();
        inner
            .expect_chat()
            .times(1)
            .returning(|_| Ok(reply("answer", &[], Some("abc"))));
        let gateway = GatedGateway::new(inner);
        gateway.hold("chat", 1);
        let chat = ChatController::new(gateway.clone());

        let first = chat.send("first");
        tokio::pin!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());

        // The mock allows a single call, so a second request would panic it.
        let err = chat.send("second").await.unwrap_err();
        assert_eq!(err, StudyError::Busy("chat"));
        assert!(chat.snapshot().await.pending);

        gateway.release_one();
        assert_eq!(first.await.unwrap(), SendOutcome::Answered);
        let snap = chat.snapshot().await;
        assert_eq!(snap.transcript.len(), 2);
        assert!(!snap.pending);
    }

    #[tokio::test]
    async fn reset_discards_in_flight_reply() {
        let mut inner = MockGateway::new();
        inner
            .expect_chat()
            .times(1)
            .returning(|_| Ok(reply("late", &[], Some("old"))));
        let gateway = GatedGateway::new(inner);
        gateway.hold("chat", 1);
        let chat = ChatController::new(gateway.clone());

        let send = chat.send("question");
        tokio::pin!(send);
        assert!(futures::poll!(send.as_mut()).is_pending());

        chat.reset().await;
        gateway.release_one();

        assert_eq!(send.await.unwrap(), SendOutcome::Discarded);
        let snap = chat.snapshot().await;
        assert!(snap.transcript.is_empty());
        assert!(snap.session_id.is_none());
        assert!(!snap.pending);
    }

    #[tokio::test]
    async fn mode_change_applies_to_next_question_only() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_chat()
            .returning(|req| Ok(reply(req.mode.as_str(), &[], None)));
        let chat = ChatController::new(Arc::new(gateway));

        chat.send("q1").await.unwrap();
        chat.set_mode(ChatMode::Simple).await;
        chat.send("q2").await.unwrap();

        let snap = chat.snapshot().await;
        let modes: Vec<_> = snap.transcript.iter().map(|m| m.mode).collect();
        assert_eq!(
            modes,
            vec![ChatMode::Normal, ChatMode::Normal, ChatMode::Simple, ChatMode::Simple]
        );
        assert_eq!(snap.transcript[3].content, "simple");
    }

    #[tokio::test]
    async fn resume_loads_stored_exchanges() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_session_messages()
            .withf(|id| id == "abc")
            .times(1)
            .returning(|_| {
                Ok(vec![SessionExchange {
                    id: 1,
                    user_message: "What is GDP?".into(),
                    ai_response: "Gross domestic product...".into(),
                    sources: vec!["ch2.pdf".into()],
                    mode: ChatMode::Simple,
                    created_at: None,
                }])
            });
        gateway
            .expect_chat()
            .withf(|req| req.session_id.as_deref() == Some("abc"))
            .times(1)
            .returning(|_| Ok(reply("more", &[], Some("abc"))));
        let chat = ChatController::new(Arc::new(gateway));

        assert_eq!(chat.resume("abc").await.unwrap(), 2);
        chat.send("tell me more").await.unwrap();

        let snap = chat.snapshot().await;
        assert_eq!(snap.transcript.len(), 4);
        assert_eq!(snap.transcript[0].content, "What is GDP?");
        assert_eq!(snap.transcript[1].sources, vec!["ch2.pdf".to_string()]);
    }

    #[tokio::test]
    async fn failed_resume_keeps_current_conversation() {
        let mut gateway = MockGateway::new();
        gateway.expect_chat().returning(|_| Ok(reply("hi", &[], Some("cur"))));
        gateway.expect_session_messages().returning(|_| {
            Err(GatewayError::Backend {
                status: 404,
                message: "Session not found".into(),
            })
        });
        let chat = ChatController::new(Arc::new(gateway));
        chat.send("hello").await.unwrap();

        let err = chat.resume("gone").await.unwrap_err();

        assert!(matches!(err, StudyError::Gateway(GatewayError::Backend { status: 404, .. })));
        let snap = chat.snapshot().await;
        assert_eq!(snap.session_id.as_deref(), Some("cur"));
        assert_eq!(snap.transcript.len(), 2);
        assert!(!snap.pending);
    }
}
