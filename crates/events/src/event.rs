//! The progress event envelope.

use chrono::Utc;
use reelgen_core::job::JobKind;
use reelgen_core::job_events::{MSG_TYPE_JOB_COMPLETED, MSG_TYPE_JOB_FAILED, MSG_TYPE_JOB_PROGRESS};
use reelgen_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};

/// A job lifecycle update delivered to the job owner's live connections.
///
/// Built via [`ProgressEvent::progress`], [`ProgressEvent::completed`] or
/// [`ProgressEvent::failed`]; `event_type` is one of the `MSG_TYPE_JOB_*`
/// constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub job_id: JobId,
    pub kind: JobKind,
    pub percent: i16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: Timestamp,
}

impl ProgressEvent {
    fn base(event_type: &str, job_id: JobId, kind: JobKind, percent: i16, message: String) -> Self {
        Self {
            event_type: event_type.to_string(),
            job_id,
            kind,
            percent,
            message,
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A phase finished and the job reached `percent`.
    pub fn progress(job_id: JobId, kind: JobKind, percent: i16, message: impl Into<String>) -> Self {
        Self::base(MSG_TYPE_JOB_PROGRESS, job_id, kind, percent, message.into())
    }

    /// The job completed with `result`.
    pub fn completed(job_id: JobId, kind: JobKind, result: serde_json::Value) -> Self {
        let mut event = Self::base(MSG_TYPE_JOB_COMPLETED, job_id, kind, 100, "Completed".into());
        event.result = Some(result);
        event
    }

    /// The job failed at `percent` with `error`.
    pub fn failed(job_id: JobId, kind: JobKind, percent: i16, error: impl Into<String>) -> Self {
        let mut event = Self::base(MSG_TYPE_JOB_FAILED, job_id, kind, percent, "Failed".into());
        event.error = Some(error.into());
        event
    }

    /// `true` for completed/failed events.
    pub fn is_terminal(&self) -> bool {
        self.event_type != MSG_TYPE_JOB_PROGRESS
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, job_id = %self.job_id, "Failed to serialize progress event");
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_wire_shape() {
        let id = uuid::Uuid::now_v7();
        let event = ProgressEvent::progress(id, JobKind::Video, 30, "Generating scenes");
        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();

        assert_eq!(json["type"], "job_progress");
        assert_eq!(json["job_id"], id.to_string());
        assert_eq!(json["kind"], "video");
        assert_eq!(json["percent"], 30);
        assert_eq!(json["message"], "Generating scenes");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
        assert!(!event.is_terminal());
    }

    #[test]
    fn terminal_events_carry_outcome() {
        let id = uuid::Uuid::now_v7();

        let done = ProgressEvent::completed(id, JobKind::Script, serde_json::json!({"k": 1}));
        assert!(done.is_terminal());
        assert_eq!(done.percent, 100);
        assert_eq!(done.result, Some(serde_json::json!({"k": 1})));

        let failed = ProgressEvent::failed(id, JobKind::Script, 40, "boom");
        assert!(failed.is_terminal());
        assert_eq!(failed.event_type, MSG_TYPE_JOB_FAILED);
        assert_eq!(failed.percent, 40);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
