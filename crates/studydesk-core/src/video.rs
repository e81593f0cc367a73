use crate::error::{Result, StudyError};
use crate::gateway::Gateway;
use std::sync::Arc;
use studydesk_gateway::types::{GenerateVideoRequest, VideoKind, VideoSummary};
use tokio::sync::Mutex;

/// A generation request the backend accepted but has not listed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedJob {
    pub video_id: String,
    pub topic: String,
    pub kind: VideoKind,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoSnapshot {
    pub summaries: Vec<VideoSummary>,
    pub awaiting: Vec<SubmittedJob>,
    pub submitting: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct VideoState {
    summaries: Vec<VideoSummary>,
    awaiting: Vec<SubmittedJob>,
    submitting: bool,
    error: Option<String>,
    epoch: u64,
    applied: u64,
}

pub struct VideoTracker {
    gateway: Arc<dyn Gateway>,
    state: Mutex<VideoState>,
}

impl VideoTracker {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            state: Mutex::new(VideoState::default()),
        }
    }

    pub async fn snapshot(&self) -> VideoSnapshot {
        let state = self.state.lock().await;
        VideoSnapshot {
            summaries: state.summaries.clone(),
            awaiting: state.awaiting.clone(),
            submitting: state.submitting,
            error: state.error.clone(),
        }
    }

    /// Jobs still missing from the last applied list.
    pub async fn awaiting(&self) -> Vec<SubmittedJob> {
        self.state.lock().await.awaiting.clone()
    }

    /// Replaces the summaries with the backend's list. Older lists never
    /// overwrite newer ones.
    pub async fn refresh(&self) -> Result<Vec<VideoSummary>> {
        let started = {
            let mut state = self.state.lock().await;
            state.epoch += 1;
            state.epoch
        };

        let result = self.gateway.list_video_summaries().await;

        let mut state = self.state.lock().await;
        match result {
            Ok(summaries) => {
                if started > state.applied {
                    state.applied = started;
                    state.error = None;
                    state
                        .awaiting
                        .retain(|job| !summaries.iter().any(|s| s.id == job.video_id));
                    state.summaries = summaries;
                }
                Ok(state.summaries.clone())
            }
            Err(e) => {
                tracing::warn!("Failed to load video summaries: {}", e);
                state.error = Some("Failed to load video summaries".to_string());
                Err(e.into())
            }
        }
    }

    /// Requests a video on `topic`, then re-lists once. The job stays in
    /// `awaiting` until a list contains its id.
    pub async fn submit(&self, topic: &str, kind: VideoKind) -> Result<SubmittedJob> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(StudyError::Validation("Enter a topic for the video".to_string()));
        }
        {
            let mut state = self.state.lock().await;
            if state.submitting {
                return Err(StudyError::Busy("video generation"));
            }
            state.submitting = true;
            state.error = None;
        }

        let result = self
            .gateway
            .generate_video(GenerateVideoRequest::new(topic, kind))
            .await;

        let job = {
            let mut state = self.state.lock().await;
            state.submitting = false;
            match result {
                Ok(record) => {
                    let job = SubmittedJob {
                        video_id: record.video_id,
                        topic: topic.to_string(),
                        kind,
                        video_url: record.video_url,
                    };
                    tracing::info!("Video {} requested for '{}'", job.video_id, topic);
                    state.awaiting.push(job.clone());
                    job
                }
                Err(e) => {
                    tracing::warn!("Video generation failed: {}", e);
                    state.error = Some("Failed to generate video. Please try again.".to_string());
                    return Err(e.into());
                }
            }
        };

        if let Err(e) = self.refresh().await {
            tracing::debug!("Refresh after video request failed: {}", e);
        }
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::testing::GatedGateway;
    use studydesk_gateway::GatewayError;
    use studydesk_gateway::types::VideoJobRecord;

    fn summary(id: &str, topic: &str) -> VideoSummary {
        VideoSummary {
            id: id.into(),
            topic: topic.into(),
            kind: VideoKind::Concept,
            video_url: Some(format!("/api/video/{id}")),
        }
    }

    #[tokio::test]
    async fn accepted_job_waits_until_listed() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate_video()
            .withf(|req| req.topic == "elasticity" && req.kind == VideoKind::ExamTips)
            .times(1)
            .returning(|_| {
                Ok(VideoJobRecord {
                    video_id: "v9".into(),
                    video_url: None,
                })
            });
        // Not rendered yet on the first list, present on the second.
        gateway
            .expect_list_video_summaries()
            .times(1)
            .returning(|| Ok(vec![summary("v1", "gdp")]));
        gateway
            .expect_list_video_summaries()
            .times(1)
            .returning(|| Ok(vec![summary("v1", "gdp"), summary("v9", "elasticity")]));
        let videos = VideoTracker::new(Arc::new(gateway));

        let job = videos.submit(" elasticity ", VideoKind::ExamTips).await.unwrap();

        assert_eq!(job.video_id, "v9");
        assert_eq!(videos.awaiting().await, vec![job]);

        videos.refresh().await.unwrap();
        assert!(videos.awaiting().await.is_empty());
        assert_eq!(videos.snapshot().await.summaries.len(), 2);
    }

    #[tokio::test]
    async fn failed_generation_sets_error_and_clears_flag() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_generate_video()
            .times(1)
            .returning(|_| Err(GatewayError::Network("connection refused".into())));
        gateway.expect_list_video_summaries().never();
        let videos = VideoTracker::new(Arc::new(gateway));

        let err = videos.submit("gdp", VideoKind::Concept).await.unwrap_err();

        assert!(matches!(err, StudyError::Gateway(GatewayError::Network(_))));
        let snap = videos.snapshot().await;
        assert!(!snap.submitting);
        assert!(snap.awaiting.is_empty());
        assert_eq!(
            snap.error.as_deref(),
            Some("Failed to generate video. Please try again.")
        );
    }

    #[tokio::test]
    async fn successful_list_clears_earlier_failure() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_video_summaries()
            .times(1)
            .returning(|| Err(GatewayError::Network("reset".into())));
        gateway
            .expect_list_video_summaries()
            .times(1)
            .returning(|| Ok(vec![summary("v1", "gdp")]));
        let videos = VideoTracker::new(Arc::new(gateway));

        assert!(videos.refresh().await.is_err());
        assert!(videos.snapshot().await.error.is_some());

        videos.refresh().await.unwrap();

        let snap = videos.snapshot().await;
        assert_eq!(snap.error, None);
        assert_eq!(snap.summaries.len(), 1);
    }

    #[tokio::test]
    async fn blank_topic_makes_no_call() {
        let mut gateway = MockGateway::new();
        gateway.expect_generate_video().never();
        let videos = VideoTracker::new(Arc::new(gateway));

        assert!(matches!(
            videos.submit("  ", VideoKind::Definition).await.unwrap_err(),
            StudyError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn second_submit_while_pending_is_rejected() {
        let mut inner = MockGateway::new();
        inner.expect_generate_video().times(1).returning(|_| {
            Ok(VideoJobRecord {
                video_id: "v1".into(),
                video_url: None,
            })
        });
        inner
            .expect_list_video_summaries()
            .returning(|| Ok(vec![summary("v1", "gdp")]));
        let gateway = GatedGateway::new(inner);
        gateway.hold("generate_video", 1);
        let videos = VideoTracker::new(gateway.clone());

        let first = videos.submit("gdp", VideoKind::Concept);
        tokio::pin!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(videos.snapshot().await.submitting);

        assert_eq!(
            videos.submit("gdp", VideoKind::Concept).await.unwrap_err(),
            StudyError::Busy("video generation")
        );

        gateway.release_one();
        first.await.unwrap();
        assert!(videos.awaiting().await.is_empty());
    }
}
