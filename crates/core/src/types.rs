/// Caller-supplied identifier of a unit of work.
pub type JobId = String;

/// Identifier a fleet worker reports itself under.
pub type WorkerId = String;

/// Correlation id linking a sent command to its tracked status.
pub type CommandId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
