use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BadgeError {
    #[error("cannot read color config {}: {source}", .path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("command `{command}` failed: {detail}")]
    Command { command: String, detail: String },
    #[error("command `{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("location lookup failed: {0}")]
    Location(String),
    #[error("malformed location payload: {0}")]
    Payload(String),
    #[error("notification source error: {0}")]
    Notification(String),
    #[error("fatal: {0}")]
    Fatal(String),
}
