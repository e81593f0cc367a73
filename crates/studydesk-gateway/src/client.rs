use crate::types;
use crate::types::{
    AddSourceRequest, ChatReply, ChatRequest, ContentSourceRecord, ContinueDialogueRequest,
    DialogueStarted, DialogueTurnReply, GenerateVideoRequest, HealthStatus, IngestStatus,
    SessionExchange, SessionSummary, StartDialogueRequest, UploadBody, UploadRequest,
    VideoJobRecord, VideoSummary,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

mod config;
mod consts;
mod error;
mod utils;

pub use config::{Config, ConfigBuilder};
pub use error::{GatewayError, Result};

use consts::{
    CHAT_PATH, CONTENT_SOURCES_PATH, CONTENT_UPLOAD_PATH, DIALOGUE_PATH, HEALTH_PATH, INGEST_PATH,
    SESSIONS_PATH, USER_AGENT, VIDEO_GENERATE_PATH, VIDEO_SUMMARIES_PATH,
};

// Holds the pooled HTTP client and the backend location. Owns no session state:
// every call is independent.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Config,
}

impl Client {
    fn new(http: reqwest::Client, config: Config) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    // Sends the request and reads the whole body. Only a missing response is a
    // network error; status handling is left to the caller.
    async fn dispatch(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        tracing::debug!("received {} ({} bytes)", status, body.len());
        Ok((status, body))
    }

    async fn dispatch_ok(&self, request: RequestBuilder) -> Result<String> {
        let (status, body) = self.dispatch(request).await?;
        if !status.is_success() {
            return Err(utils::backend_error(status, &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.dispatch_ok(request).await?;
        utils::decode(&body)
    }

    /// `POST /chat`
    ///
    /// A non-2xx response that still carries an assistant `response` is the
    /// backend answering about its own failure; it is returned as a reply.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.endpoint(CHAT_PATH);
        tracing::debug!("POST {} mode={}", url, request.mode);
        let (status, body) = self.dispatch(self.http.post(&url).json(request)).await?;
        if status.is_success() {
            return utils::decode(&body);
        }
        match serde_json::from_str::<ChatReply>(&body) {
            Ok(reply) => {
                tracing::warn!("chat answered with status {}, using its response", status);
                Ok(reply)
            }
            Err(_) => Err(utils::backend_error(status, &body)),
        }
    }

    /// `POST /audio/dialogue`
    pub async fn start_dialogue(&self, request: &StartDialogueRequest) -> Result<DialogueStarted> {
        let url = self.endpoint(DIALOGUE_PATH);
        tracing::debug!("POST {} topic={:?}", url, request.topic);
        self.send_json(self.http.post(&url).json(request)).await
    }

    /// `POST /audio/dialogue/{id}/next`
    pub async fn continue_dialogue(
        &self,
        dialogue_id: &str,
        request: &ContinueDialogueRequest,
    ) -> Result<DialogueTurnReply> {
        let url =
            utils::endpoint_with_segments(self.config.base_url(), DIALOGUE_PATH, &[dialogue_id, "next"])?;
        tracing::debug!("POST {}", url);
        self.send_json(self.http.post(url).json(request)).await
    }

    /// `GET /content/sources`
    pub async fn list_content_sources(&self) -> Result<Vec<ContentSourceRecord>> {
        let url = self.endpoint(CONTENT_SOURCES_PATH);
        tracing::debug!("GET {}", url);
        let body = self.dispatch_ok(self.http.get(&url)).await?;
        types::content::parse_source_list(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// `POST /content/sources`
    pub async fn add_content_source(&self, request: &AddSourceRequest) -> Result<ContentSourceRecord> {
        if request.url.trim().is_empty() {
            return Err(GatewayError::Validation("Please enter a URL".to_string()));
        }
        let url = self.endpoint(CONTENT_SOURCES_PATH);
        tracing::debug!("POST {} type={}", url, request.source_type);
        self.send_json(self.http.post(&url).json(request)).await
    }

    /// `POST /content/upload` as multipart `file`, `title`, `description`.
    pub async fn upload_content(&self, request: &UploadRequest) -> Result<ContentSourceRecord> {
        request
            .file
            .validate()
            .map_err(|e| GatewayError::Validation(e.to_string()))?;

        let bytes = match request.file.body() {
            UploadBody::Bytes(bytes) => bytes.clone(),
            UploadBody::Path(path) => tokio::fs::read(path).await.map_err(|e| {
                GatewayError::Validation(format!("failed to read {}: {}", path.display(), e))
            })?,
        };
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(request.file.file_name().to_string())
            .mime_str(request.file.mime_type())
            .map_err(|e| GatewayError::Validation(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("title", request.title.clone())
            .text("description", request.description.clone());

        let url = self.endpoint(CONTENT_UPLOAD_PATH);
        tracing::debug!("POST {} file={}", url, request.file.file_name());
        self.send_json(self.http.post(&url).multipart(form)).await
    }

    /// `DELETE /content/sources/{id}`
    pub async fn delete_content_source(&self, id: &str) -> Result<()> {
        let url = utils::endpoint_with_segments(self.config.base_url(), CONTENT_SOURCES_PATH, &[id])?;
        tracing::debug!("DELETE {}", url);
        self.dispatch_ok(self.http.delete(url)).await?;
        Ok(())
    }

    /// `GET /video/summaries`
    pub async fn list_video_summaries(&self) -> Result<Vec<VideoSummary>> {
        let url = self.endpoint(VIDEO_SUMMARIES_PATH);
        tracing::debug!("GET {}", url);
        let body = self.dispatch_ok(self.http.get(&url)).await?;
        types::video::parse_summary_list(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// `POST /video/generate`
    pub async fn generate_video(&self, request: &GenerateVideoRequest) -> Result<VideoJobRecord> {
        let url = self.endpoint(VIDEO_GENERATE_PATH);
        tracing::debug!("POST {} type={}", url, request.kind);
        self.send_json(self.http.post(&url).json(request)).await
    }

    /// `GET /health`
    pub async fn health_check(&self) -> Result<HealthStatus> {
        let url = self.endpoint(HEALTH_PATH);
        self.send_json(self.http.get(&url)).await
    }

    /// `POST /ingest`: asks the backend to rebuild its retrieval index.
    pub async fn ingest(&self) -> Result<IngestStatus> {
        let url = self.endpoint(INGEST_PATH);
        tracing::debug!("POST {}", url);
        self.send_json(self.http.post(&url)).await
    }

    /// `GET /sessions`
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let url = self.endpoint(SESSIONS_PATH);
        let body = self.dispatch_ok(self.http.get(&url)).await?;
        types::system::parse_session_list(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// `GET /sessions/{id}/messages`
    pub async fn session_messages(&self, session_id: &str) -> Result<Vec<SessionExchange>> {
        let url =
            utils::endpoint_with_segments(self.config.base_url(), SESSIONS_PATH, &[session_id, "messages"])?;
        let body = self.dispatch_ok(self.http.get(url)).await?;
        types::system::parse_exchange_list(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Turns a backend-relative audio or video path into a fetchable URL.
    pub fn resolve_asset(&self, asset: &str) -> Result<String> {
        utils::resolve_against(self.config.base_url(), asset)
    }
}

// Builds a client for the given backend. No request is made until an operation is called.
pub fn connect_with_config(config: Config) -> Result<Client> {
    reqwest::Url::parse(config.base_url()).map_err(|e| {
        GatewayError::Validation(format!("invalid base url '{}': {}", config.base_url(), e))
    })?;
    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| GatewayError::Network(e.to_string()))?;
    Ok(Client::new(http, config))
}

// Builds a client for the default local backend.
pub fn connect() -> Result<Client> {
    connect_with_config(Config::new())
}
