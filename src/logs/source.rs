use async_trait::async_trait;

/// A single log event from either the historical fetch or the live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Epoch milliseconds, when the provider supplies one.
    pub timestamp: Option<i64>,
    pub message: String,
    pub event_id: Option<String>,
}

/// Key under which two log lines count as the same event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Event(String),
    TimeMessage(Option<i64>, String),
}

impl LogLine {
    pub fn dedup_key(&self) -> DedupKey {
        match &self.event_id {
            Some(id) => DedupKey::Event(id.clone()),
            None => DedupKey::TimeMessage(self.timestamp, self.message.clone()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogSourceError {
    #[error("no AWS region resolvable: pass --region, set it in the config file, or export AWS_REGION")]
    NoRegion,
    #[error("no AWS account id resolvable: configure credentials for STS or export AWS_ACCOUNT_ID")]
    NoAccount,
    #[error("failed to start live tail: {0}")]
    StreamStart(String),
    #[error("log fetch failed: {0}")]
    Fetch(String),
}

/// Where log lines come from. Implementations own all provider specifics;
/// the tail session only ever sees [`LogLine`]s.
#[async_trait]
pub trait LogSource {
    /// Fetch up to `limit` recent lines, newest window of the stream.
    async fn fetch_recent(
        &self,
        group: &str,
        stream: &str,
        limit: usize,
        filter: Option<&str>,
    ) -> Result<Vec<LogLine>, LogSourceError>;

    /// Open a live stream. Region and account context must already be
    /// resolved; failures here are fatal to the tail operation.
    async fn open_live(
        &self,
        group: &str,
        stream: &str,
        filter: Option<&str>,
    ) -> Result<Box<dyn LiveTail>, LogSourceError>;
}

/// Handle on an open live stream.
///
/// `next_line` must be cancellation safe: callers race it against a timer
/// to observe the session's cancellation flag, and a line must not be lost
/// when the race is abandoned mid-await. `close` releases the underlying
/// stream resource and must be called on every exit path.
#[async_trait]
pub trait LiveTail: Send {
    /// Next line, or `None` once the stream is exhausted or broken.
    async fn next_line(&mut self) -> Option<LogLine>;

    async fn close(&mut self);
}
