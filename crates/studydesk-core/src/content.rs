use crate::error::{Result, StudyError};
use crate::gateway::Gateway;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use studydesk_gateway::GatewayError;
use studydesk_gateway::types::{
    AddSourceRequest, ContentSourceRecord, SourceStatus, SourceType, UploadFile, UploadRequest,
};
use tokio::sync::Mutex;
use uuid::Uuid;

const LOCAL_ID_PREFIX: &str = "local-";

/// One entry of the course material list as the learner sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSource {
    pub id: String,
    pub source_type: SourceType,
    pub title: String,
    pub description: Option<String>,
    /// Remote URL or stored upload path.
    pub location: String,
    pub status: SourceStatus,
}

impl ContentSource {
    fn placeholder(source_type: SourceType, title: &str, location: &str) -> Self {
        Self {
            id: format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()),
            source_type,
            title: title.to_string(),
            description: None,
            location: location.to_string(),
            status: SourceStatus::Submitting,
        }
    }

    /// Still waiting for the backend to acknowledge the submission.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

impl From<ContentSourceRecord> for ContentSource {
    fn from(record: ContentSourceRecord) -> Self {
        let status = record.status();
        let location = record.location().to_string();
        Self {
            title: record.title.unwrap_or_else(|| location.clone()),
            id: record.id,
            source_type: record.source_type,
            description: record.description.filter(|d| !d.is_empty()),
            location,
            status,
        }
    }
}

/// How long `await_settled` keeps re-listing before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Status(SourceStatus),
    /// The source was listed once and then disappeared.
    Removed,
    TimedOut,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSnapshot {
    pub sources: Vec<ContentSource>,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub adding: bool,
}

#[derive(Default)]
struct ContentState {
    sources: Vec<ContentSource>,
    error: Option<String>,
    notice: Option<String>,
    adding: bool,
    // Ids with a delete in flight; they stay visible until it succeeds.
    deleting: HashSet<String>,
    // Deleted id -> epoch at which the delete completed.
    tombstones: HashMap<String, u64>,
    // Acknowledged id -> epoch at which the add completed.
    acked: HashMap<String, u64>,
    // Advanced by every list start, acknowledged add and completed delete.
    epoch: u64,
    // Start epoch of the newest list applied so far.
    applied: u64,
}

impl ContentState {
    fn tick(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    fn apply_list(&mut self, started: u64, records: Vec<ContentSourceRecord>) {
        let mut seen = HashSet::new();
        let mut next: Vec<ContentSource> = records
            .into_iter()
            .filter(|r| self.tombstones.get(&r.id).is_none_or(|&at| at < started))
            .filter(|r| seen.insert(r.id.clone()))
            .map(ContentSource::from)
            .collect();
        // Placeholders, and sources acknowledged after this list started, are not in it yet.
        let pending: Vec<ContentSource> = self
            .sources
            .iter()
            .filter(|s| s.is_local() || self.acked.get(&s.id).is_some_and(|&at| at > started))
            .filter(|s| !seen.contains(&s.id))
            .cloned()
            .collect();
        next.extend(pending);

        self.sources = next;
        self.applied = started;
        // Adds and deletes that finished before this list started are now reflected by the backend.
        self.tombstones.retain(|_, at| *at > started);
        self.acked.retain(|_, at| *at > started);
    }

    fn upsert(&mut self, source: ContentSource) {
        match self.sources.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => *existing = source,
            None => self.sources.push(source),
        }
    }
}

/// Keeps the local view of the uploaded course material in step with the backend.
pub struct ContentManager {
    gateway: Arc<dyn Gateway>,
    policy: SettlePolicy,
    state: Mutex<ContentState>,
}

impl ContentManager {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_policy(gateway, SettlePolicy::default())
    }

    pub fn with_policy(gateway: Arc<dyn Gateway>, policy: SettlePolicy) -> Self {
        Self {
            gateway,
            policy,
            state: Mutex::new(ContentState::default()),
        }
    }

    pub async fn snapshot(&self) -> ContentSnapshot {
        let state = self.state.lock().await;
        ContentSnapshot {
            sources: state.sources.clone(),
            error: state.error.clone(),
            notice: state.notice.clone(),
            adding: state.adding,
        }
    }

    pub async fn clear_banners(&self) {
        let mut state = self.state.lock().await;
        state.error = None;
        state.notice = None;
    }

    /// Replaces the set with the backend's list.
    ///
    /// A list that started before a newer one was applied is dropped. A
    /// source deleted after the list started is never brought back by it,
    /// and one acknowledged after it started is kept.
    pub async fn refresh(&self) -> Result<Vec<ContentSource>> {
        let started = self.state.lock().await.tick();

        let result = self.gateway.list_content_sources().await;

        let mut state = self.state.lock().await;
        match result {
            Ok(records) => {
                if started <= state.applied {
                    tracing::debug!("Dropping stale content list (epoch {})", started);
                } else {
                    state.apply_list(started, records);
                }
                Ok(state.sources.clone())
            }
            Err(e) => {
                tracing::warn!("Failed to load content sources: {}", e);
                state.error = Some("Failed to load content sources".to_string());
                Err(e.into())
            }
        }
    }

    /// Submits a YouTube or PDF link, then re-lists. The title defaults to the URL.
    pub async fn add_url(
        &self,
        source_type: SourceType,
        url: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<ContentSource> {
        if !source_type.is_url() {
            return Err(StudyError::Validation(format!(
                "{source_type} sources are uploaded as files"
            )));
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(StudyError::Validation("Please enter a URL".to_string()));
        }

        let mut request = AddSourceRequest::new(source_type, url);
        if let Some(title) = non_blank(title) {
            request = request.with_title(title);
        }
        if let Some(description) = non_blank(description) {
            request = request.with_description(description);
        }

        let placeholder = ContentSource::placeholder(source_type, &request.title, url);
        let call = self.gateway.add_content_source(request);
        self.submit(placeholder, call).await
    }

    /// Uploads a PDF. Non-PDF or oversized files are rejected before anything is sent.
    pub async fn add_file(
        &self,
        file: UploadFile,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<ContentSource> {
        file.validate()?;

        let mut request = UploadRequest::new(file);
        if let Some(title) = non_blank(title) {
            request = request.with_title(title);
        }
        if let Some(description) = non_blank(description) {
            request = request.with_description(description);
        }

        let placeholder = ContentSource::placeholder(
            SourceType::PdfFile,
            &request.title,
            request.file.file_name(),
        );
        let call = self.gateway.upload_content(request);
        self.submit(placeholder, call).await
    }

    // Shows `placeholder` while `call` runs, swaps in the acknowledged source,
    // then re-lists.
    async fn submit<F>(&self, placeholder: ContentSource, call: F) -> Result<ContentSource>
    where
        F: Future<Output = std::result::Result<ContentSourceRecord, GatewayError>>,
    {
        let local_id = placeholder.id.clone();
        {
            let mut state = self.state.lock().await;
            if state.adding {
                return Err(StudyError::Busy("content submission"));
            }
            state.adding = true;
            state.error = None;
            state.notice = None;
            state.sources.push(placeholder);
        }

        let result = call.await;

        let source = {
            let mut state = self.state.lock().await;
            state.adding = false;
            state.sources.retain(|s| s.id != local_id);
            match result {
                Ok(record) => {
                    let mut source = ContentSource::from(record);
                    // Ready or failed only once a later list says so.
                    source.status = SourceStatus::Processing;
                    tracing::info!("Content source {} accepted", source.id);
                    state.notice = Some(
                        "Content source added successfully! The system is processing it."
                            .to_string(),
                    );
                    let at = state.tick();
                    state.acked.insert(source.id.clone(), at);
                    state.upsert(source.clone());
                    source
                }
                Err(e) => {
                    tracing::warn!("Failed to add content source: {}", e);
                    state.error = Some(match &e {
                        GatewayError::Backend { message, .. } => message.clone(),
                        _ => "Failed to add content source".to_string(),
                    });
                    return Err(e.into());
                }
            }
        };

        if let Err(e) = self.refresh().await {
            tracing::debug!("Refresh after add failed: {}", e);
        }
        Ok(source)
    }

    /// Deletes a source, then re-lists.
    pub async fn delete(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if id.starts_with(LOCAL_ID_PREFIX) {
                return Err(StudyError::InvalidState {
                    action: "delete",
                    state: "the source is still being submitted".to_string(),
                });
            }
            if !state.deleting.insert(id.to_string()) {
                return Err(StudyError::Busy("delete"));
            }
        }

        let result = self.gateway.delete_content_source(id.to_string()).await;

        {
            let mut state = self.state.lock().await;
            state.deleting.remove(id);
            if let Err(e) = result {
                tracing::warn!("Failed to delete content source {}: {}", id, e);
                state.error = Some("Failed to remove content source".to_string());
                return Err(e.into());
            }
            let at = state.tick();
            state.tombstones.insert(id.to_string(), at);
            state.sources.retain(|s| s.id != id);
            state.notice = Some("Content source removed successfully!".to_string());
            tracing::info!("Content source {} deleted", id);
        }

        if let Err(e) = self.refresh().await {
            tracing::debug!("Refresh after delete failed: {}", e);
        }
        Ok(())
    }

    /// Re-lists until `id` reaches ready or failed, it disappears, or the
    /// attempts run out.
    pub async fn await_settled(&self, id: &str) -> Result<Settled> {
        let mut seen = false;
        for attempt in 1..=self.policy.max_attempts {
            tokio::time::sleep(self.policy.interval).await;
            let sources = match self.refresh().await {
                Ok(sources) => sources,
                Err(e) => {
                    tracing::debug!("Settle check {} for {} failed: {}", attempt, id, e);
                    continue;
                }
            };
            match sources.iter().find(|s| s.id == id) {
                Some(source) if source.status.is_settled() => {
                    return Ok(Settled::Status(source.status));
                }
                Some(_) => seen = true,
                None if seen => return Ok(Settled::Removed),
                None => {}
            }
            tracing::debug!("Source {} not settled after check {}", id, attempt);
        }
        Ok(Settled::TimedOut)
    }

    /// Asks the backend to rebuild its index from the current material, then re-lists.
    pub async fn reingest(&self) -> Result<String> {
        match self.gateway.ingest().await {
            Ok(status) => {
                let message = status
                    .message
                    .unwrap_or_else(|| format!("Ingest {}", status.status));
                self.state.lock().await.notice = Some(message.clone());
                if let Err(e) = self.refresh().await {
                    tracing::debug!("Refresh after ingest failed: {}", e);
                }
                Ok(message)
            }
            Err(e) => {
                tracing::warn!("Ingest failed: {}", e);
                self.state.lock().await.error = Some("Failed to ingest content".to_string());
                Err(e.into())
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
