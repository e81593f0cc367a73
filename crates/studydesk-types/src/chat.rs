use std::fmt;
use std::str::FromStr;

/// Response style forwarded to the backend with every chat request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Normal,
    /// Concise, bullet-pointed answers.
    Exam,
    /// Explained for a 12 year old.
    Simple,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Normal => "normal",
            ChatMode::Exam => "exam",
            ChatMode::Simple => "simple",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(ChatMode::Normal),
            "exam" => Ok(ChatMode::Exam),
            "simple" => Ok(ChatMode::Simple),
            other => Err(format!("unknown chat mode '{other}'")),
        }
    }
}

/// `POST /chat` body
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub mode: ChatMode,
}

impl ChatRequest {
    pub fn new(message: &str, mode: ChatMode) -> Self {
        Self {
            message: message.to_string(),
            session_id: None,
            mode,
        }
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Assistant answer. Also produced from a non-2xx body that still carries a
/// `response` field, so `session_id` may be absent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}
