use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    #[default]
    Concept,
    ExamTips,
    Definition,
}

impl VideoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoKind::Concept => "concept",
            VideoKind::ExamTips => "exam_tips",
            VideoKind::Definition => "definition",
        }
    }
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "concept" => Ok(VideoKind::Concept),
            "exam_tips" => Ok(VideoKind::ExamTips),
            "definition" => Ok(VideoKind::Definition),
            other => Err(format!("unknown video type '{other}'")),
        }
    }
}

/// An entry of `GET /video/summaries`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub topic: String,
    #[serde(rename = "type", default)]
    pub kind: VideoKind,
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct SummaryList {
    #[serde(default)]
    pub summaries: Vec<VideoSummary>,
}

/// Unwraps the `{summaries: [...]}` envelope of `GET /video/summaries`.
pub fn parse_summary_list(body: &str) -> serde_json::Result<Vec<VideoSummary>> {
    serde_json::from_str::<SummaryList>(body).map(|list| list.summaries)
}

/// `POST /video/generate` body
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerateVideoRequest {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: VideoKind,
}

impl GenerateVideoRequest {
    pub fn new(topic: &str, kind: VideoKind) -> Self {
        Self {
            topic: topic.to_string(),
            kind,
        }
    }
}

/// Acknowledgement of a generation request.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoJobRecord {
    #[serde(alias = "id")]
    pub video_id: String,
    #[serde(default)]
    pub video_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_list_reads_type_field() {
        let summaries = parse_summary_list(
            r#"{"summaries": [{"id": "v1", "topic": "inflation", "type": "exam_tips",
                "video_url": "/api/video/v1", "created_at": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(summaries[0].kind, VideoKind::ExamTips);
        assert_eq!(summaries[0].video_url.as_deref(), Some("/api/video/v1"));
    }

    #[test]
    fn kind_accepts_dashed_spelling() {
        assert_eq!("exam-tips".parse::<VideoKind>().unwrap(), VideoKind::ExamTips);
    }
}
