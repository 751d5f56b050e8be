//! The per-phase work seam.
//!
//! A [`Generator`] performs the real work behind each phase and produces the
//! final result payload. [`SimulatedGenerator`] does no work at all and
//! hands back placeholder asset URLs.

use async_trait::async_trait;
use reelgen_core::job::{Job, JobKind};
use reelgen_core::phases::Phase;

use crate::error::GeneratorError;

/// Default video length reported when the request did not set one.
const DEFAULT_VIDEO_DURATION_SECS: u64 = 30;

/// Placeholder script length reported in script results.
const SIMULATED_SCRIPT_WORDS: u64 = 450;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Execute one phase of `job`. Called after the phase delay elapsed.
    async fn run_phase(&self, job: &Job, phase: &Phase) -> Result<(), GeneratorError>;

    /// Build the result payload once every phase succeeded.
    async fn produce_result(&self, job: &Job) -> Result<serde_json::Value, GeneratorError>;
}

/// Generator that only fabricates results under `asset_base_url`.
#[derive(Debug, Clone)]
pub struct SimulatedGenerator {
    asset_base_url: String,
}

impl SimulatedGenerator {
    pub fn new(asset_base_url: impl Into<String>) -> Self {
        let asset_base_url = asset_base_url.into().trim_end_matches('/').to_string();
        Self { asset_base_url }
    }
}

#[async_trait]
impl Generator for SimulatedGenerator {
    async fn run_phase(&self, job: &Job, phase: &Phase) -> Result<(), GeneratorError> {
        tracing::trace!(job_id = %job.id, percent = phase.percent, "Simulated phase");
        Ok(())
    }

    async fn produce_result(&self, job: &Job) -> Result<serde_json::Value, GeneratorError> {
        let base = &self.asset_base_url;
        let id = job.id;

        let result = match job.kind {
            JobKind::Video => {
                let duration_secs = job
                    .parameters
                    .get("duration_secs")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(DEFAULT_VIDEO_DURATION_SECS);
                serde_json::json!({
                    "video_url": format!("{base}/videos/{id}.mp4"),
                    "thumbnail_url": format!("{base}/thumbnails/{id}.jpg"),
                    "duration_secs": duration_secs,
                })
            }
            JobKind::Script => {
                let title = job
                    .parameters
                    .get("topic")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("Untitled script");
                serde_json::json!({
                    "script_url": format!("{base}/scripts/{id}.md"),
                    "title": title,
                    "word_count": SIMULATED_SCRIPT_WORDS,
                })
            }
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use reelgen_core::job::NewJob;

    use super::*;

    fn job(kind: JobKind, parameters: serde_json::Value) -> Job {
        Job::new_pending(NewJob {
            kind,
            owner_id: 1,
            parameters,
        })
    }

    #[tokio::test]
    async fn video_result_points_under_base_url() {
        let generator = SimulatedGenerator::new("https://cdn.example.com/");
        let job = job(JobKind::Video, serde_json::json!({"duration_secs": 12}));

        let result = generator.produce_result(&job).await.unwrap();

        assert_eq!(
            result["video_url"],
            format!("https://cdn.example.com/videos/{}.mp4", job.id)
        );
        assert_eq!(result["duration_secs"], 12);
    }

    #[tokio::test]
    async fn script_result_uses_topic_as_title() {
        let generator = SimulatedGenerator::new("https://cdn.example.com");
        let job = job(JobKind::Script, serde_json::json!({"topic": "Rust async"}));

        let result = generator.produce_result(&job).await.unwrap();

        assert_eq!(result["title"], "Rust async");
        assert!(result["script_url"].as_str().unwrap().ends_with(".md"));
    }
}
