use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    PdfFile,
    PdfUrl,
    Youtube,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::PdfFile => "pdf_file",
            SourceType::PdfUrl => "pdf_url",
            SourceType::Youtube => "youtube",
        }
    }

    /// URL-backed sources go through `POST /content/sources`; files are uploaded.
    pub fn is_url(&self) -> bool {
        !matches!(self, SourceType::PdfFile)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf_file" => Ok(SourceType::PdfFile),
            "pdf_url" => Ok(SourceType::PdfUrl),
            "youtube" => Ok(SourceType::Youtube),
            other => Err(format!("unknown source type '{other}'")),
        }
    }
}

/// Processing status of a content source as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Local only: the add request has not been acknowledged yet.
    Submitting,
    Processing,
    Ready,
    Failed,
}

impl SourceStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, SourceStatus::Ready | SourceStatus::Failed)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceStatus::Submitting => "submitting",
            SourceStatus::Processing => "processing",
            SourceStatus::Ready => "ready",
            SourceStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A content source as the backend reports it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContentSourceRecord {
    pub id: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ContentSourceRecord {
    pub fn new(id: &str, source_type: SourceType) -> Self {
        Self {
            id: id.to_string(),
            source_type,
            source_url: None,
            file_path: None,
            title: None,
            description: None,
            is_active: None,
            status: None,
        }
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Where the material lives: the remote URL, or the stored upload path.
    pub fn location(&self) -> &str {
        self.source_url
            .as_deref()
            .or(self.file_path.as_deref())
            .unwrap_or("")
    }

    /// Derives the client-facing status. An explicit `status` field wins, then
    /// `is_active == false` counts as failed, otherwise the source is ready.
    pub fn status(&self) -> SourceStatus {
        if let Some(status) = self.status.as_deref() {
            match status.to_lowercase().as_str() {
                "processing" | "pending" | "queued" => return SourceStatus::Processing,
                "ready" | "processed" | "completed" | "active" => return SourceStatus::Ready,
                "failed" | "error" => return SourceStatus::Failed,
                _ => {}
            }
        }
        match self.is_active {
            Some(false) => SourceStatus::Failed,
            _ => SourceStatus::Ready,
        }
    }
}

/// `POST /content/sources` body
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AddSourceRequest {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub url: String,
    pub title: String,
    pub description: String,
}

impl AddSourceRequest {
    pub fn new(source_type: SourceType, url: &str) -> Self {
        Self {
            source_type,
            url: url.to_string(),
            title: url.to_string(),
            description: String::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct SourceList {
    #[serde(default)]
    pub sources: Vec<ContentSourceRecord>,
}

/// Unwraps the `{sources: [...]}` envelope of `GET /content/sources`.
pub fn parse_source_list(body: &str) -> serde_json::Result<Vec<ContentSourceRecord>> {
    serde_json::from_str::<SourceList>(body).map(|list| list.sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_status_field_is_ready() {
        let body = r#"{"sources": [{
            "id": "7f1", "source_type": "youtube",
            "source_url": "https://youtu.be/abc", "file_path": null,
            "title": "Lecture", "description": null, "is_active": true,
            "created_at": "2024-01-01T00:00:00", "updated_at": null
        }]}"#;
        let sources = parse_source_list(body).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].status(), SourceStatus::Ready);
        assert_eq!(sources[0].location(), "https://youtu.be/abc");
    }

    #[test]
    fn explicit_status_wins_over_is_active() {
        let mut record = ContentSourceRecord::new("1", SourceType::PdfUrl).with_status("processing");
        record.is_active = Some(false);
        assert_eq!(record.status(), SourceStatus::Processing);

        record.status = None;
        assert_eq!(record.status(), SourceStatus::Failed);
    }

    #[test]
    fn add_request_renames_type_field() {
        let body = serde_json::to_value(
            AddSourceRequest::new(SourceType::PdfUrl, "https://x/a.pdf").with_description("ch 5"),
        )
        .unwrap();
        assert_eq!(body["type"], "pdf_url");
        assert_eq!(body["title"], "https://x/a.pdf");
        assert_eq!(body["description"], "ch 5");
    }
}
