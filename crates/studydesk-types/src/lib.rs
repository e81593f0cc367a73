//now callers of the gateway can share these types
pub mod chat;
pub mod content;
pub mod dialogue;
pub mod system;
pub mod upload;
pub mod video;

//re-export types for easier access
pub use chat::{ChatMode, ChatReply, ChatRequest};
pub use content::{AddSourceRequest, ContentSourceRecord, SourceStatus, SourceType};
pub use dialogue::{ContinueDialogueRequest, DialogueStarted, DialogueTurnReply, Speaker, StartDialogueRequest};
pub use system::{HealthStatus, IngestStatus, SessionExchange, SessionSummary};
pub use upload::{UploadBody, UploadError, UploadFile, UploadRequest};
pub use video::{GenerateVideoRequest, VideoJobRecord, VideoKind, VideoSummary};
