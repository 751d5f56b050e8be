/// User primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Opaque job identifier (UUID v7, time-ordered).
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
