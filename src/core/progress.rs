use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::info;

/// Event name used when progress is forwarded to a frontend.
pub const PROGRESS_EVENT: &str = "set_taskbar";

/// Payload emitted to listeners on install progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub label: String,
    pub percent: f64,
}

/// Receives `(label, percent)` pairs in emission order.
///
/// Implementations must return promptly and never fail; a listener that
/// goes away is simply ignored.
pub trait ProgressSink: Send + Sync {
    fn report(&self, label: &str, percent: f64);
}

/// Handle the installers report through. No-op when disabled or when no
/// sink is attached.
#[derive(Clone, Default)]
pub struct Progress {
    sink: Option<Arc<dyn ProgressSink>>,
    enabled: bool,
}

impl Progress {
    pub fn new(sink: Arc<dyn ProgressSink>, enabled: bool) -> Self {
        Self {
            sink: Some(sink),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.sink.is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn report(&self, label: &str, percent: f64) {
        if !self.enabled {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.report(label, percent.clamp(0.0, 100.0));
        }
    }
}

/// Logs progress through `tracing`.
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn report(&self, label: &str, percent: f64) {
        info!("[{:>5.1}%] {}", percent, label);
    }
}

/// Forwards progress into an unbounded channel.
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, label: &str, percent: f64) {
        let _ = self.tx.send(ProgressEvent {
            label: label.to_string(),
            percent,
        });
    }
}

/// Emits progress to a Tauri frontend as [`PROGRESS_EVENT`].
#[cfg(feature = "tauri")]
pub struct TauriSink {
    handle: tauri::AppHandle,
}

#[cfg(feature = "tauri")]
impl TauriSink {
    pub fn new(handle: tauri::AppHandle) -> Self {
        Self { handle }
    }
}

#[cfg(feature = "tauri")]
impl ProgressSink for TauriSink {
    fn report(&self, label: &str, percent: f64) {
        use tauri::Emitter;

        let _ = self.handle.emit(
            PROGRESS_EVENT,
            ProgressEvent {
                label: label.to_string(),
                percent,
            },
        );
    }
}

#[cfg(test)]
pub(crate) fn drain(rx: &mut UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
