/// Record identifiers are the upstream service's BIGINT primary keys.
pub type RecordId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
