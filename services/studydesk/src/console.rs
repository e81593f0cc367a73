//! Plain-text rendering of controller state for the terminal.

use studydesk_core::{ChatMessage, ContentSource, Role, SubmittedJob, Turn};
use studydesk_gateway::types::{SessionSummary, SourceStatus, VideoSummary};

pub fn message(message: &ChatMessage) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "tutor",
    };
    let mut out = format!("[{who}] {}", message.content);
    if !message.sources.is_empty() {
        out.push_str(&format!("\n  sources: {}", message.sources.join(", ")));
    }
    out
}

pub fn turn(index: usize, turn: &Turn) -> String {
    let audio = if turn.audio_url.is_some() { " \u{266a}" } else { "" };
    format!("{index:>2}. {}{audio}: {}", turn.speaker, turn.message)
}

pub fn source(source: &ContentSource) -> String {
    let status = match source.status {
        SourceStatus::Ready | SourceStatus::Failed => source.status.to_string(),
        other => format!("{other}..."),
    };
    format!(
        "{:<38} {:<9} {:<14} {}\n{:<38} {}",
        source.id,
        source.source_type.as_str(),
        status,
        source.title,
        "",
        source.location
    )
}

pub fn video(summary: &VideoSummary, asset_url: Option<&str>) -> String {
    format!(
        "{:<10} {:<12} {}\n{:<10} {}",
        summary.id,
        summary.kind.as_str(),
        summary.topic,
        "",
        asset_url.unwrap_or("(no video yet)")
    )
}

pub fn awaiting(job: &SubmittedJob) -> String {
    format!(
        "{:<10} {:<12} {} (rendering)",
        job.video_id,
        job.kind.as_str(),
        job.topic
    )
}

pub fn session(summary: &SessionSummary) -> String {
    format!(
        "{}  {} messages  {}",
        summary.id,
        summary.message_count,
        summary.created_at.as_deref().unwrap_or("")
    )
}
