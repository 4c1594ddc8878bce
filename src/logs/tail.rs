use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::logs::source::{DedupKey, LiveTail, LogLine, LogSource, LogSourceError};

/// How long the main loop sleeps when both queues are empty.
const IDLE_POLL: Duration = Duration::from_millis(10);
/// Granularity at which background workers re-check the cancellation flag.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Single keystrokes the session understands. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyCommand {
    Stop,
    Filter,
    ClearFilter,
}

fn command_for(key: char) -> Option<KeyCommand> {
    match key {
        'q' | 'Q' | '\x03' | '\x1b' => Some(KeyCommand::Stop),
        'f' | 'F' => Some(KeyCommand::Filter),
        'c' | 'C' => Some(KeyCommand::ClearFilter),
        _ => None,
    }
}

/// One keystroke, or the listener reporting broken terminal input.
#[derive(Debug)]
enum KeyEvent {
    Char(char),
    Interrupted(std::io::Error),
}

/// Blocking, timeout-bounded keyboard input. The timeout is what lets the
/// listener thread observe cancellation promptly.
pub trait KeySource: Send + 'static {
    fn poll_key(&mut self, timeout: Duration) -> std::io::Result<Option<char>>;
}

/// Output side of a tail session. The filter prompt is synchronous: the
/// session only calls it after both background workers are down.
pub trait TailRenderer {
    fn line(&mut self, line: &LogLine);
    fn notice(&mut self, message: &str);
    fn prompt_filter(&mut self) -> std::io::Result<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum TailError {
    #[error(transparent)]
    Source(#[from] LogSourceError),
    #[error("terminal input interrupted: {0}")]
    Interrupted(std::io::Error),
}

#[derive(Debug, Clone)]
pub struct TailOptions {
    pub history_limit: usize,
    pub initial_filter: String,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            history_limit: 50,
            initial_filter: String::new(),
        }
    }
}

enum LineEvent {
    Line(LogLine),
    EndOfStream,
}

enum LoopOutcome {
    Stop,
    Filter,
    ClearFilter,
    Interrupted(std::io::Error),
}

/// Run a tail session against one (group, stream) pair.
///
/// Renders up to `history_limit` historical lines, then streams live lines
/// while listening for single-key commands: stop (`q`, Esc, Ctrl-C), set
/// filter (`f`), clear filter (`c`). Every line is deduplicated against a
/// session-scoped seen-set, so an event delivered by both the historical
/// fetch and the live stream renders once. Returns when the user stops the
/// session; stream exhaustion alone does not end it.
pub async fn run_tail_session<S, K, R>(
    source: &S,
    mut keys: K,
    renderer: &mut R,
    group: &str,
    stream: &str,
    options: TailOptions,
) -> Result<(), TailError>
where
    S: LogSource + ?Sized,
    K: KeySource,
    R: TailRenderer,
{
    let mut filter = options.initial_filter;
    let mut seen: HashSet<DedupKey> = HashSet::new();

    loop {
        let pattern = (!filter.is_empty()).then_some(filter.as_str());

        // History first, synchronously, before any live line can render.
        let recent = source
            .fetch_recent(group, stream, options.history_limit, pattern)
            .await?;
        for line in &recent {
            if seen.insert(line.dedup_key()) {
                renderer.line(line);
            }
        }

        // Failures opening the stream are fatal; the state machine is never
        // entered with a broken source.
        let live = source.open_live(group, stream, pattern).await?;

        let mut workers = Workers::spawn(live, keys);
        let outcome = tail_loop(&mut workers, renderer, &mut seen).await;
        keys = workers.shut_down().await;

        match outcome {
            LoopOutcome::Stop => {
                renderer.notice("Stopped tailing.");
                return Ok(());
            }
            LoopOutcome::Interrupted(err) => return Err(TailError::Interrupted(err)),
            LoopOutcome::Filter => {
                filter = renderer.prompt_filter().map_err(TailError::Interrupted)?;
                debug!("re-entering tail with filter {filter:?}");
            }
            LoopOutcome::ClearFilter => {
                filter.clear();
                renderer.notice("Filter cleared.");
            }
        }
    }
}

/// The two background activities of a tailing state: a reader task pumping
/// the live stream onto the line queue and an OS thread polling the
/// keyboard onto the key queue. Both observe one shared cancellation flag.
struct Workers<K: KeySource> {
    cancel: Arc<AtomicBool>,
    line_rx: mpsc::UnboundedReceiver<LineEvent>,
    key_rx: mpsc::UnboundedReceiver<KeyEvent>,
    reader: tokio::task::JoinHandle<()>,
    listener: std::thread::JoinHandle<K>,
}

impl<K: KeySource> Workers<K> {
    fn spawn(mut live: Box<dyn LiveTail>, mut keys: K) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let reader_cancel = Arc::clone(&cancel);
        let reader = tokio::spawn(async move {
            loop {
                if reader_cancel.load(Ordering::SeqCst) {
                    break;
                }
                tokio::select! {
                    maybe_line = live.next_line() => match maybe_line {
                        Some(line) => {
                            if line_tx.send(LineEvent::Line(line)).is_err() {
                                break;
                            }
                        }
                        None => {
                            // Stream exhausted or broken mid-session. The
                            // session stays alive; only the reader ends.
                            let _ = line_tx.send(LineEvent::EndOfStream);
                            break;
                        }
                    },
                    _ = tokio::time::sleep(CANCEL_POLL) => {}
                }
            }
            live.close().await;
        });

        let (key_tx, key_rx) = mpsc::unbounded_channel();
        let listener_cancel = Arc::clone(&cancel);
        let listener = std::thread::spawn(move || {
            while !listener_cancel.load(Ordering::SeqCst) {
                match keys.poll_key(CANCEL_POLL) {
                    Ok(Some(key)) => {
                        if key_tx.send(KeyEvent::Char(key)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        let _ = key_tx.send(KeyEvent::Interrupted(err));
                        break;
                    }
                }
            }
            keys
        });

        Self {
            cancel,
            line_rx,
            key_rx,
            reader,
            listener,
        }
    }

    fn signal(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Signal both workers and wait for them. The reader closes its stream
    /// handle on the way out; the listener thread hands the key source back
    /// for the next tailing phase.
    async fn shut_down(self) -> K {
        let Workers {
            cancel,
            reader,
            listener,
            ..
        } = self;
        cancel.store(true, Ordering::SeqCst);

        if let Err(err) = reader.await {
            warn!("log reader task failed: {err}");
        }

        tokio::task::spawn_blocking(move || listener.join())
            .await
            .expect("join of key listener was aborted")
            .expect("key listener thread panicked")
    }
}

async fn tail_loop<K: KeySource>(
    workers: &mut Workers<K>,
    renderer: &mut impl TailRenderer,
    seen: &mut HashSet<DedupKey>,
) -> LoopOutcome {
    let mut stream_ended = false;

    loop {
        // User input takes priority over pending lines.
        match workers.key_rx.try_recv() {
            Ok(KeyEvent::Char(key)) => {
                if let Some(command) = command_for(key) {
                    workers.signal();
                    match command {
                        KeyCommand::Stop => {
                            // Queued keys are dead once the session stops.
                            while workers.key_rx.try_recv().is_ok() {}
                            return LoopOutcome::Stop;
                        }
                        KeyCommand::Filter => return LoopOutcome::Filter,
                        KeyCommand::ClearFilter => return LoopOutcome::ClearFilter,
                    }
                }
                continue;
            }
            Ok(KeyEvent::Interrupted(err)) => {
                workers.signal();
                return LoopOutcome::Interrupted(err);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
        }

        match workers.line_rx.try_recv() {
            Ok(LineEvent::Line(line)) => {
                if seen.insert(line.dedup_key()) {
                    renderer.line(&line);
                }
            }
            Ok(LineEvent::EndOfStream) => {
                if !stream_ended {
                    stream_ended = true;
                    debug!("live stream ended; session stays open for commands");
                }
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                tokio::time::sleep(IDLE_POLL).await;
            }
        }
    }
}
