use crate::chat::ChatMode;

/// `GET /health`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub rag_initialized: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// `POST /ingest`
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IngestStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// An entry of `GET /sessions`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionSummary {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message_count: usize,
}

/// One stored question/answer pair of `GET /sessions/{id}/messages`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionExchange {
    pub id: i64,
    pub user_message: String,
    pub ai_response: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: ChatMode,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de> + Default,
{
    let value = <Option<T> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct SessionList {
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct ExchangeList {
    #[serde(default)]
    pub messages: Vec<SessionExchange>,
}

pub fn parse_session_list(body: &str) -> serde_json::Result<Vec<SessionSummary>> {
    serde_json::from_str::<SessionList>(body).map(|list| list.sessions)
}

pub fn parse_exchange_list(body: &str) -> serde_json::Result<Vec<SessionExchange>> {
    serde_json::from_str::<ExchangeList>(body).map(|list| list.messages)
}
