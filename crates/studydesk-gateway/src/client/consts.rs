pub const BASE_URL: &str = "http://localhost:5000/api";
pub const USER_AGENT: &str = concat!("studydesk/", env!("CARGO_PKG_VERSION"));

pub const CHAT_PATH: &str = "/chat";
pub const DIALOGUE_PATH: &str = "/audio/dialogue";
pub const CONTENT_SOURCES_PATH: &str = "/content/sources";
pub const CONTENT_UPLOAD_PATH: &str = "/content/upload";
pub const VIDEO_SUMMARIES_PATH: &str = "/video/summaries";
pub const VIDEO_GENERATE_PATH: &str = "/video/generate";
pub const HEALTH_PATH: &str = "/health";
pub const INGEST_PATH: &str = "/ingest";
pub const SESSIONS_PATH: &str = "/sessions";
