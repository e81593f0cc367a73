pub mod chat;
pub mod content;
pub mod dialogue;
pub mod error;
pub mod gateway;
pub mod playback;
pub mod video;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use studydesk_gateway::types::{HealthStatus, SessionSummary};

pub use chat::{ChatController, ChatMessage, ChatSnapshot, Role, SendOutcome};
pub use content::{ContentManager, ContentSnapshot, ContentSource, SettlePolicy, Settled};
pub use dialogue::{DialogueEngine, DialoguePhase, DialogueSession, DialogueSnapshot, Outcome, Turn};
pub use error::{Result, StudyError};
pub use gateway::Gateway;
pub use playback::{AudioPlayer, PlaybackEvent, PlaybackHandle, PlaybackState, Ticket};
pub use video::{SubmittedJob, VideoSnapshot, VideoTracker};

/// Every controller of one learner's desk, sharing a single gateway.
pub struct StudyDesk {
    gateway: Arc<dyn Gateway>,
    pub chat: ChatController,
    pub content: ContentManager,
    pub dialogue: DialogueEngine,
    pub videos: VideoTracker,
}

impl StudyDesk {
    pub fn new(gateway: Arc<dyn Gateway>, player: Arc<dyn AudioPlayer>, policy: SettlePolicy) -> Self {
        Self {
            chat: ChatController::new(gateway.clone()),
            content: ContentManager::with_policy(gateway.clone(), policy),
            dialogue: DialogueEngine::new(gateway.clone(), player),
            videos: VideoTracker::new(gateway.clone()),
            gateway,
        }
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        Ok(self.gateway.health_check().await?)
    }

    /// Stored chat sessions, newest first as the backend returns them.
    pub async fn sessions(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.gateway.list_sessions().await?)
    }

    /// Resolves a backend-relative video or audio path.
    pub fn asset_url(&self, asset: &str) -> Result<String> {
        Ok(self.gateway.resolve_asset(asset)?)
    }
}
