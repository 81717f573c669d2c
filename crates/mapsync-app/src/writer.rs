//! Debounced fragment writer
//!
//! Owns the fragment sink and limits how often it is written. High-frequency
//! callers (map drags, typing) go through [`FragmentWriter::request_write`],
//! which coalesces bursts into at most one write per delay window and always
//! lands the latest value. Discrete toggles use
//! [`FragmentWriter::write_immediately`].
//!
//! The timer is a tokio task armed with a fixed deadline; all transitions of
//! [`WriterState`] happen under one mutex.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mapsync_core::prelude::*;

use crate::config::DebounceEdge;
use crate::fragment::FragmentSink;

/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Debounce state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterState {
    /// No timer armed; the next request starts a new window
    Idle,
    /// A window is open and a timer is armed. `pending` holds the latest value
    /// still waiting to be written.
    Writing { pending: Option<String> },
}

struct Shared {
    sink: Box<dyn FragmentSink>,
    delay: Duration,
    edge: DebounceEdge,
    state: Mutex<WriterState>,
}

/// Rate-limited writer for the persisted fragment. Clones share state.
#[derive(Clone)]
pub struct FragmentWriter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for FragmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentWriter")
            .field("delay", &self.shared.delay)
            .field("edge", &self.shared.edge)
            .field("state", &self.state())
            .finish()
    }
}

impl FragmentWriter {
    pub fn new(sink: impl FragmentSink + 'static, delay: Duration, edge: DebounceEdge) -> Self {
        Self {
            shared: Arc::new(Shared {
                sink: Box::new(sink),
                delay,
                edge,
                state: Mutex::new(WriterState::Idle),
            }),
        }
    }

    /// Writer with the default 1s trailing-edge window
    pub fn with_defaults(sink: impl FragmentSink + 'static) -> Self {
        Self::new(
            sink,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            DebounceEdge::default(),
        )
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay
    }

    pub fn edge(&self) -> DebounceEdge {
        self.shared.edge
    }

    pub fn state(&self) -> WriterState {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Ask for `value` to be written, subject to debouncing.
    ///
    /// Within an open window only the latest value is kept.
    pub fn request_write(&self, value: String) {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());

        match &mut *state {
            WriterState::Writing { pending } => {
                trace!("Write window open, replacing pending fragment");
                *pending = Some(value);
            }
            WriterState::Idle => {
                let pending = match self.shared.edge {
                    DebounceEdge::Trailing => Some(value),
                    DebounceEdge::Leading => Self::write_or_retain(&self.shared, value),
                };
                *state = WriterState::Writing { pending };
                drop(state);
                Self::arm(&self.shared);
            }
        }
    }

    /// Write `value` now, bypassing the debounce window.
    ///
    /// `value` is a complete fragment, so any older pending value is dropped.
    /// On failure `value` itself becomes the pending value and is retried
    /// when the timer fires.
    pub fn write_immediately(&self, value: String) {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());

        match Self::write_or_retain(&self.shared, value) {
            None => {
                if let WriterState::Writing { pending } = &mut *state {
                    if pending.take().is_some() {
                        debug!("Immediate write superseded pending fragment");
                    }
                }
            }
            Some(retained) => match &mut *state {
                WriterState::Writing { pending } => *pending = Some(retained),
                WriterState::Idle => {
                    *state = WriterState::Writing {
                        pending: Some(retained),
                    };
                    drop(state);
                    Self::arm(&self.shared);
                }
            },
        }
    }

    /// Write any pending value right away (used on shutdown)
    pub fn flush(&self) -> Result<()> {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());

        if let WriterState::Writing { pending } = &mut *state {
            if let Some(value) = pending.take() {
                if let Err(e) = self.shared.sink.write_fragment(&value) {
                    *pending = Some(value);
                    return Err(e);
                }
                debug!("Flushed pending fragment");
            }
        }
        Ok(())
    }

    /// Timer expiry: write what is pending and decide whether a new window opens
    fn on_timer(shared: &Arc<Shared>) {
        let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());

        let rearm = match std::mem::replace(&mut *state, WriterState::Idle) {
            WriterState::Idle => {
                trace!("Timer fired while idle");
                false
            }
            WriterState::Writing { pending: None } => false,
            WriterState::Writing {
                pending: Some(value),
            } => match Self::write_or_retain(shared, value) {
                Some(retained) => {
                    *state = WriterState::Writing {
                        pending: Some(retained),
                    };
                    true
                }
                None if shared.edge == DebounceEdge::Leading => {
                    *state = WriterState::Writing { pending: None };
                    true
                }
                None => false,
            },
        };

        drop(state);
        if rearm {
            Self::arm(shared);
        }
    }

    /// Write `value`, handing it back if the sink failed
    fn write_or_retain(shared: &Shared, value: String) -> Option<String> {
        match shared.sink.write_fragment(&value) {
            Ok(()) => {
                debug!("Fragment written: {}", value);
                None
            }
            Err(e) => {
                warn!("Fragment write failed, keeping value for retry: {}", e);
                Some(value)
            }
        }
    }

    fn arm(shared: &Arc<Shared>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available; pending fragment waits for flush()");
                return;
            }
        };

        let deadline = tokio::time::Instant::now() + shared.delay;
        let shared = Arc::clone(shared);
        handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            FragmentWriter::on_timer(&shared);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::MemoryFragment;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const D: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS);

    /// Fails the first `failures` writes, then records into `inner`
    struct FlakySink {
        failures: AtomicUsize,
        inner: MemoryFragment,
    }

    impl FragmentSink for FlakySink {
        fn write_fragment(&self, fragment: &str) -> Result<()> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(Error::fragment_write("resource unavailable"));
            }
            self.inner.write_fragment(fragment)
        }
    }

    fn trailing() -> (FragmentWriter, MemoryFragment) {
        let sink = MemoryFragment::new();
        (
            FragmentWriter::new(sink.clone(), D, DebounceEdge::Trailing),
            sink,
        )
    }

    fn leading() -> (FragmentWriter, MemoryFragment) {
        let sink = MemoryFragment::new();
        (
            FragmentWriter::new(sink.clone(), D, DebounceEdge::Leading),
            sink,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_single_write_of_last_value() {
        let (writer, sink) = trailing();

        for i in 1..=5 {
            writer.request_write(format!("#at={}", i));
        }
        assert_eq!(sink.write_count(), 0);

        tokio::time::sleep(D + Duration::from_millis(1)).await;
        assert_eq!(sink.history(), vec!["#at=5"]);

        tokio::time::sleep(D * 3).await;
        assert_eq!(sink.write_count(), 1);
        assert_eq!(writer.state(), WriterState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_write_before_window_ends() {
        let (writer, sink) = trailing();

        writer.request_write("#at=1".to_string());
        tokio::time::sleep(D - Duration::from_millis(10)).await;
        assert_eq!(sink.write_count(), 0);
        assert_eq!(
            writer.state(),
            WriterState::Writing {
                pending: Some("#at=1".to_string())
            }
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successive_windows_are_spaced() {
        let (writer, sink) = trailing();

        writer.request_write("#at=1".to_string());
        tokio::time::sleep(D + Duration::from_millis(10)).await;
        writer.request_write("#at=2".to_string());

        tokio::time::sleep(D / 2).await;
        assert_eq!(sink.history(), vec!["#at=1"]);

        tokio::time::sleep(D).await;
        assert_eq!(sink.history(), vec!["#at=1", "#at=2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_edge_writes_first_and_last() {
        let (writer, sink) = leading();

        writer.request_write("#at=1".to_string());
        assert_eq!(sink.history(), vec!["#at=1"]);

        writer.request_write("#at=2".to_string());
        writer.request_write("#at=3".to_string());
        assert_eq!(sink.write_count(), 1);

        tokio::time::sleep(D + Duration::from_millis(1)).await;
        assert_eq!(sink.history(), vec!["#at=1", "#at=3"]);

        // The follow-up write opened another window, which closes empty
        tokio::time::sleep(D * 2).await;
        assert_eq!(sink.write_count(), 2);
        assert_eq!(writer.state(), WriterState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_edge_single_request_writes_once() {
        let (writer, sink) = leading();

        writer.request_write("#at=1".to_string());
        tokio::time::sleep(D * 3).await;

        assert_eq!(sink.history(), vec!["#at=1"]);
        assert_eq!(writer.state(), WriterState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_write_bypasses_and_supersedes_pending() {
        let (writer, sink) = trailing();

        writer.request_write("#at=1".to_string());
        writer.write_immediately("#at=1&places=x".to_string());
        assert_eq!(sink.history(), vec!["#at=1&places=x"]);

        tokio::time::sleep(D * 2).await;
        assert_eq!(sink.history(), vec!["#at=1&places=x"]);
        assert_eq!(writer.state(), WriterState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_write_when_idle_does_not_open_window() {
        let (writer, sink) = trailing();

        writer.write_immediately("#f=open".to_string());
        assert_eq!(writer.state(), WriterState::Idle);

        writer.request_write("#f=open&at=1".to_string());
        tokio::time::sleep(D + Duration::from_millis(1)).await;
        assert_eq!(sink.history(), vec!["#f=open", "#f=open&at=1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_is_retained_and_retried() {
        let inner = MemoryFragment::new();
        let writer = FragmentWriter::new(
            FlakySink {
                failures: AtomicUsize::new(1),
                inner: inner.clone(),
            },
            D,
            DebounceEdge::Trailing,
        );

        writer.request_write("#at=1".to_string());
        tokio::time::sleep(D + Duration::from_millis(1)).await;
        assert_eq!(inner.write_count(), 0);
        assert_eq!(
            writer.state(),
            WriterState::Writing {
                pending: Some("#at=1".to_string())
            }
        );

        tokio::time::sleep(D).await;
        assert_eq!(inner.history(), vec!["#at=1"]);
        assert_eq!(writer.state(), WriterState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_immediate_write_is_retried() {
        let inner = MemoryFragment::new();
        let writer = FragmentWriter::new(
            FlakySink {
                failures: AtomicUsize::new(1),
                inner: inner.clone(),
            },
            D,
            DebounceEdge::Trailing,
        );

        writer.write_immediately("#layer=osm".to_string());
        assert_eq!(inner.write_count(), 0);

        tokio::time::sleep(D + Duration::from_millis(1)).await;
        assert_eq!(inner.history(), vec!["#layer=osm"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_pending() {
        let (writer, sink) = trailing();

        writer.request_write("#at=9".to_string());
        writer.flush().unwrap();
        assert_eq!(sink.history(), vec!["#at=9"]);

        tokio::time::sleep(D * 2).await;
        assert_eq!(sink.write_count(), 1);
    }

    #[test]
    fn test_request_without_runtime_waits_for_flush() {
        let (writer, sink) = trailing();

        writer.request_write("#at=1".to_string());
        assert_eq!(sink.write_count(), 0);

        writer.flush().unwrap();
        assert_eq!(sink.history(), vec!["#at=1"]);
    }
}
