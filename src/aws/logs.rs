use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

use crate::aws::command::{AwsCli, AwsCliError};
use crate::aws::sts::build_log_group_arn;
use crate::logs::source::{LiveTail, LogLine, LogSource, LogSourceError};

/// Time we give `start-live-tail` to fail fast on auth/permission errors
/// before treating the stream as established.
const STREAM_START_GRACE: std::time::Duration = std::time::Duration::from_millis(400);

/// CloudWatch Logs as a [`LogSource`], driven through the aws CLI.
pub struct CloudWatchLogs {
    aws: AwsCli,
    region: Option<String>,
    account_id: Option<String>,
}

impl CloudWatchLogs {
    pub fn new(aws: AwsCli, account_id: Option<String>) -> Self {
        let region = aws.region().map(str::to_string);
        Self {
            aws,
            region,
            account_id,
        }
    }

    /// Candidate log groups for the ranking fallback.
    pub async fn list_log_groups(&self, limit: usize) -> Result<Vec<String>, LogSourceError> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "logGroups", default)]
            log_groups: Vec<Group>,
        }
        #[derive(Deserialize)]
        struct Group {
            #[serde(rename = "logGroupName")]
            log_group_name: String,
        }

        let limit = limit.to_string();
        let response: Response = self
            .aws
            .run_json(&["logs", "describe-log-groups", "--limit", limit.as_str()])
            .await
            .map_err(fetch_error)?;
        Ok(response
            .log_groups
            .into_iter()
            .map(|group| group.log_group_name)
            .collect())
    }
}

#[derive(Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawEvent {
    timestamp: Option<i64>,
    message: Option<String>,
    #[serde(rename = "eventId")]
    event_id: Option<String>,
}

impl From<RawEvent> for LogLine {
    fn from(event: RawEvent) -> Self {
        LogLine {
            timestamp: event.timestamp,
            message: event.message.unwrap_or_default(),
            event_id: event.event_id,
        }
    }
}

fn fetch_error(err: AwsCliError) -> LogSourceError {
    LogSourceError::Fetch(err.to_string())
}

#[async_trait]
impl LogSource for CloudWatchLogs {
    async fn fetch_recent(
        &self,
        group: &str,
        stream: &str,
        limit: usize,
        filter: Option<&str>,
    ) -> Result<Vec<LogLine>, LogSourceError> {
        let limit = limit.to_string();
        let response: EventsResponse = match filter {
            // Plain tail of one stream reads newest-first from the end.
            None => self
                .aws
                .run_json(&[
                    "logs",
                    "get-log-events",
                    "--log-group-name",
                    group,
                    "--log-stream-name",
                    stream,
                    "--limit",
                    limit.as_str(),
                    "--no-start-from-head",
                ])
                .await
                .map_err(fetch_error)?,
            // Server-side filtering needs the filter API instead.
            Some(pattern) => self
                .aws
                .run_json(&[
                    "logs",
                    "filter-log-events",
                    "--log-group-name",
                    group,
                    "--log-stream-names",
                    stream,
                    "--filter-pattern",
                    pattern,
                    "--limit",
                    limit.as_str(),
                ])
                .await
                .map_err(fetch_error)?,
        };
        Ok(response.events.into_iter().map(LogLine::from).collect())
    }

    async fn open_live(
        &self,
        group: &str,
        stream: &str,
        filter: Option<&str>,
    ) -> Result<Box<dyn LiveTail>, LogSourceError> {
        let region = self.region.as_deref().ok_or(LogSourceError::NoRegion)?;
        let account_id = self
            .account_id
            .as_deref()
            .ok_or(LogSourceError::NoAccount)?;
        let group_arn = build_log_group_arn(region, account_id, group);

        let mut args: Vec<&str> = vec![
            "logs",
            "start-live-tail",
            "--log-group-identifiers",
            group_arn.as_str(),
            "--log-stream-names",
            stream,
        ];
        if let Some(pattern) = filter {
            args.push("--log-event-filter-pattern");
            args.push(pattern);
        }

        let mut child = self
            .aws
            .stream(&args)
            .map_err(|err| LogSourceError::StreamStart(err.to_string()))?;

        // Auth and permission failures surface as a fast exit; catch them
        // here so they become a typed error instead of a silent dead tail.
        tokio::time::sleep(STREAM_START_GRACE).await;
        if let Ok(Some(status)) = child.try_wait() {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            return Err(LogSourceError::StreamStart(format!(
                "process exited with {status}: {}",
                stderr.trim()
            )));
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LogSourceError::StreamStart("no stdout handle".to_string()))?;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        for log_line in parse_live_frame(&line) {
                            if line_tx.send(log_line).is_err() {
                                return;
                            }
                        }
                    }
                    Ok(None) => return,
                    Err(err) => {
                        debug!("live tail stream read failed: {err}");
                        return;
                    }
                }
            }
        });

        Ok(Box::new(LiveTailChild {
            line_rx,
            child,
            pump,
        }))
    }
}

struct LiveTailChild {
    line_rx: mpsc::UnboundedReceiver<LogLine>,
    child: tokio::process::Child,
    pump: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl LiveTail for LiveTailChild {
    async fn next_line(&mut self) -> Option<LogLine> {
        self.line_rx.recv().await
    }

    async fn close(&mut self) {
        self.pump.abort();
        if let Err(err) = self.child.start_kill() {
            debug!("failed to kill live tail process: {err}");
        }
        let _ = self.child.wait().await;
    }
}

/// Turn one line of `start-live-tail` output into log lines.
///
/// The CLI emits JSON frames: a `sessionStart` acknowledgment (skipped),
/// `sessionUpdate` frames batching events under `sessionResults`, and
/// occasionally bare event objects. Non-JSON output is passed through as a
/// plain message so a CLI format change degrades instead of going dark.
fn parse_live_frame(line: &str) -> Vec<LogLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            if value.get("sessionStart").is_some() {
                return Vec::new();
            }
            if let Some(update) = value.get("sessionUpdate") {
                return update
                    .get("sessionResults")
                    .and_then(Value::as_array)
                    .map(|events| events.iter().filter_map(event_to_line).collect())
                    .unwrap_or_default();
            }
            event_to_line(&value).map_or_else(Vec::new, |l| vec![l])
        }
        Err(_) => vec![LogLine {
            timestamp: None,
            message: trimmed.to_string(),
            event_id: None,
        }],
    }
}

fn event_to_line(value: &Value) -> Option<LogLine> {
    let message = value.get("message").and_then(Value::as_str)?.to_string();
    Some(LogLine {
        timestamp: value.get("timestamp").and_then(Value::as_i64),
        message,
        event_id: value
            .get("eventId")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_start_frames_are_skipped() {
        let frame = r#"{"sessionStart": {"requestId": "abc", "sessionId": "def"}}"#;
        assert!(parse_live_frame(frame).is_empty());
    }

    #[test]
    fn test_session_update_frames_yield_all_events() {
        let frame = r#"{"sessionUpdate": {"sessionResults": [
            {"timestamp": 1700000000000, "message": "one", "eventId": "e1"},
            {"timestamp": 1700000000001, "message": "two", "eventId": "e2"}
        ]}}"#;

        let lines = parse_live_frame(frame);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "one");
        assert_eq!(lines[0].event_id.as_deref(), Some("e1"));
        assert_eq!(lines[1].timestamp, Some(1_700_000_000_001));
    }

    #[test]
    fn test_bare_event_objects_are_accepted() {
        let frame = r#"{"timestamp": 1700000000000, "message": "solo"}"#;
        let lines = parse_live_frame(frame);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "solo");
        assert_eq!(lines[0].event_id, None);
    }

    #[test]
    fn test_non_json_output_passes_through_as_message() {
        let lines = parse_live_frame("plain text line");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "plain text line");
        assert_eq!(lines[0].timestamp, None);
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        assert!(parse_live_frame("   ").is_empty());
        assert!(parse_live_frame("").is_empty());
    }

    #[test]
    fn test_raw_event_conversion() {
        let event = RawEvent {
            timestamp: Some(1000),
            message: None,
            event_id: Some("e1".to_string()),
        };
        let line = LogLine::from(event);
        assert_eq!(line.message, "");
        assert_eq!(line.event_id.as_deref(), Some("e1"));
    }
}
