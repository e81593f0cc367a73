use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Teacher,
    Student,
}

impl Speaker {
    /// The speaker expected to answer this one.
    pub fn other(&self) -> Speaker {
        match self {
            Speaker::Teacher => Speaker::Student,
            Speaker::Student => Speaker::Teacher,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Teacher => f.write_str("teacher"),
            Speaker::Student => f.write_str("student"),
        }
    }
}

/// `POST /audio/dialogue` body
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StartDialogueRequest {
    pub topic: String,
    pub session_id: Option<String>,
}

impl StartDialogueRequest {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Seed of a new dialogue: the teacher's opening and the student's question.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DialogueStarted {
    pub dialogue_id: String,
    pub initial_message: String,
    pub student_question: String,
}

/// `POST /audio/dialogue/{id}/next` body
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContinueDialogueRequest {
    pub user_question: Option<String>,
}

impl ContinueDialogueRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_question(mut self, question: Option<String>) -> Self {
        self.user_question = question;
        self
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DialogueTurnReply {
    pub speaker: Speaker,
    pub message: String,
    pub turn_number: usize,
    #[serde(default)]
    pub audio_url: Option<String>,
}
