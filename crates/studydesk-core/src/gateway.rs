use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use studydesk_gateway::types::{
    AddSourceRequest, ChatReply, ChatRequest, ContentSourceRecord, ContinueDialogueRequest,
    DialogueStarted, DialogueTurnReply, GenerateVideoRequest, HealthStatus, IngestStatus,
    SessionExchange, SessionSummary, StartDialogueRequest, UploadRequest, VideoJobRecord,
    VideoSummary,
};
use studydesk_gateway::{Client, GatewayError};

type Result<T> = std::result::Result<T, GatewayError>;

// The controllers only ever talk to the backend through this trait, so tests can
// swap in `MockGateway` (generated by mockall under `cfg(test)`) and control
// every response, including when it arrives.
//
// Requests are taken by value: the mock's expectations then see plain owned
// arguments and the controllers never hold borrows across an await.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply>;

    async fn start_dialogue(&self, request: StartDialogueRequest) -> Result<DialogueStarted>;

    async fn continue_dialogue(
        &self,
        dialogue_id: String,
        request: ContinueDialogueRequest,
    ) -> Result<DialogueTurnReply>;

    async fn list_content_sources(&self) -> Result<Vec<ContentSourceRecord>>;

    async fn add_content_source(&self, request: AddSourceRequest) -> Result<ContentSourceRecord>;

    async fn upload_content(&self, request: UploadRequest) -> Result<ContentSourceRecord>;

    async fn delete_content_source(&self, id: String) -> Result<()>;

    async fn list_video_summaries(&self) -> Result<Vec<VideoSummary>>;

    async fn generate_video(&self, request: GenerateVideoRequest) -> Result<VideoJobRecord>;

    async fn health_check(&self) -> Result<HealthStatus>;

    async fn ingest(&self) -> Result<IngestStatus>;

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    async fn session_messages(&self, session_id: String) -> Result<Vec<SessionExchange>>;

    /// Turns a backend-relative asset path into something a player can open.
    fn resolve_asset(&self, asset: &str) -> Result<String>;
}

#[async_trait]
impl Gateway for Client {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply> {
        Client::chat(self, &request).await
    }

    async fn start_dialogue(&self, request: StartDialogueRequest) -> Result<DialogueStarted> {
        Client::start_dialogue(self, &request).await
    }

    async fn continue_dialogue(
        &self,
        dialogue_id: String,
        request: ContinueDialogueRequest,
    ) -> Result<DialogueTurnReply> {
        Client::continue_dialogue(self, &dialogue_id, &request).await
    }

    async fn list_content_sources(&self) -> Result<Vec<ContentSourceRecord>> {
        Client::list_content_sources(self).await
    }

    async fn add_content_source(&self, request: AddSourceRequest) -> Result<ContentSourceRecord> {
        Client::add_content_source(self, &request).await
    }

    async fn upload_content(&self, request: UploadRequest) -> Result<ContentSourceRecord> {
        Client::upload_content(self, &request).await
    }

    async fn delete_content_source(&self, id: String) -> Result<()> {
        Client::delete_content_source(self, &id).await
    }

    async fn list_video_summaries(&self) -> Result<Vec<VideoSummary>> {
        Client::list_video_summaries(self).await
    }

    async fn generate_video(&self, request: GenerateVideoRequest) -> Result<VideoJobRecord> {
        Client::generate_video(self, &request).await
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        Client::health_check(self).await
    }

    async fn ingest(&self) -> Result<IngestStatus> {
        Client::ingest(self).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        Client::list_sessions(self).await
    }

    async fn session_messages(&self, session_id: String) -> Result<Vec<SessionExchange>> {
        Client::session_messages(self, &session_id).await
    }

    fn resolve_asset(&self, asset: &str) -> Result<String> {
        Client::resolve_asset(self, asset)
    }
}
