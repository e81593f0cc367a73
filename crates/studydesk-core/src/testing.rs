//! Test doubles shared by the controller tests.

use crate::gateway::{Gateway, MockGateway};
use crate::playback::{AudioPlayer, PlaybackHandle, Ticket};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use studydesk_gateway::GatewayError;
use studydesk_gateway::types::{
    AddSourceRequest, ChatReply, ChatRequest, ContentSourceRecord, ContinueDialogueRequest,
    DialogueStarted, DialogueTurnReply, GenerateVideoRequest, HealthStatus, IngestStatus,
    SessionExchange, SessionSummary, StartDialogueRequest, UploadRequest, VideoJobRecord,
    VideoSummary,
};
use tokio::sync::Notify;

type Result<T> = std::result::Result<T, GatewayError>;

/// Wraps a `MockGateway` and can hold selected calls open until released.
///
/// The inner mock is consulted when the call is made, so the answer is fixed
/// at that point; only its delivery is delayed.
pub struct GatedGateway {
    inner: MockGateway,
    holds: Mutex<HashMap<&'static str, usize>>,
    release: Notify,
}

impl GatedGateway {
    pub fn new(inner: MockGateway) -> Arc<Self> {
        Arc::new(Self {
            inner,
            holds: Mutex::new(HashMap::new()),
            release: Notify::new(),
        })
    }

    /// Holds the next `count` calls to `op`.
    pub fn hold(&self, op: &'static str, count: usize) {
        self.holds.lock().unwrap().insert(op, count);
    }

    /// Lets one held call complete.
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    async fn gate(&self, op: &'static str) {
        let held = {
            let mut holds = self.holds.lock().unwrap();
            match holds.get_mut(op) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if held {
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl Gateway for GatedGateway {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply> {
        let result = self.inner.chat(request).await;
        self.gate("chat").await;
        result
    }

    async fn start_dialogue(&self, request: StartDialogueRequest) -> Result<DialogueStarted> {
        let result = self.inner.start_dialogue(request).await;
        self.gate("start_dialogue").await;
        result
    }

    async fn continue_dialogue(
        &self,
        dialogue_id: String,
        request: ContinueDialogueRequest,
    ) -> Result<DialogueTurnReply> {
        let result = self.inner.continue_dialogue(dialogue_id, request).await;
        self.gate("continue_dialogue").await;
        result
    }

    async fn list_content_sources(&self) -> Result<Vec<ContentSourceRecord>> {
        let result = self.inner.list_content_sources().await;
        self.gate("list_content_sources").await;
        result
    }

    async fn add_content_source(&self, request: AddSourceRequest) -> Result<ContentSourceRecord> {
        let result = self.inner.add_content_source(request).await;
        self.gate("add_content_source").await;
        result
    }

    async fn upload_content(&self, request: UploadRequest) -> Result<ContentSourceRecord> {
        let result = self.inner.upload_content(request).await;
        self.gate("upload_content").await;
        result
    }

    async fn delete_content_source(&self, id: String) -> Result<()> {
        let result = self.inner.delete_content_source(id).await;
        self.gate("delete_content_source").await;
        result
    }

    async fn list_video_summaries(&self) -> Result<Vec<VideoSummary>> {
        let result = self.inner.list_video_summaries().await;
        self.gate("list_video_summaries").await;
        result
    }

    async fn generate_video(&self, request: GenerateVideoRequest) -> Result<VideoJobRecord> {
        let result = self.inner.generate_video(request).await;
        self.gate("generate_video").await;
        result
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        self.inner.health_check().await
    }

    async fn ingest(&self) -> Result<IngestStatus> {
        self.inner.ingest().await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.inner.list_sessions().await
    }

    async fn session_messages(&self, session_id: String) -> Result<Vec<SessionExchange>> {
        let result = self.inner.session_messages(session_id).await;
        self.gate("session_messages").await;
        result
    }

    fn resolve_asset(&self, asset: &str) -> Result<String> {
        self.inner.resolve_asset(asset)
    }
}

/// One handle handed out by `FakePlayer`.
#[derive(Debug, Clone)]
pub struct PlayedClip {
    pub url: String,
    pub ticket: Ticket,
    pub live: Arc<AtomicBool>,
}

struct FakeHandle {
    live: Arc<AtomicBool>,
}

impl PlaybackHandle for FakeHandle {
    fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// Records every clip it was asked to play. URLs containing `broken` fail to start.
#[derive(Default)]
pub struct FakePlayer {
    clips: Mutex<Vec<PlayedClip>>,
}

impl FakePlayer {
    pub fn clips(&self) -> Vec<PlayedClip> {
        self.clips.lock().unwrap().clone()
    }

    pub fn live(&self) -> Vec<PlayedClip> {
        self.clips()
            .into_iter()
            .filter(|c| c.live.load(Ordering::SeqCst))
            .collect()
    }
}

impl AudioPlayer for FakePlayer {
    fn play(&self, url: &str, ticket: Ticket) -> std::result::Result<Box<dyn PlaybackHandle>, String> {
        if url.contains("broken") {
            return Err(format!("cannot decode {url}"));
        }
        let live = Arc::new(AtomicBool::new(true));
        self.clips.lock().unwrap().push(PlayedClip {
            url: url.to_string(),
            ticket,
            live: live.clone(),
        });
        Ok(Box::new(FakeHandle { live }))
    }
}
