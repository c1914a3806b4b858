//! Push delivery from the scene manager.
//!
//! The transport decodes each pushed event into a [`PushMessage`] and sends
//! it down the pump's channel. The pump applies status events one at a time,
//! in arrival order, so a burst of pushes never interleaves with itself or
//! with request responses going through the same synchronizer.

use crate::config::StatusConfig;
use crate::error::StatusError;
use crate::sync::StatusSynchronizer;
use crate::types::UpdateSummary;
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// One pushed event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Event name, e.g. `stream-status`.
    pub event: String,
    pub payload: Value,
}

impl PushMessage {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Counters for a pumping run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Status updates applied.
    pub applied: usize,
    /// Messages for other events.
    pub ignored: usize,
    /// Status messages the synchronizer refused.
    pub rejected: usize,
}

/// Drains pushed messages into a [`StatusSynchronizer`].
pub struct PushPump {
    sync: Arc<StatusSynchronizer>,
    status_event: String,
    sender: Sender<PushMessage>,
    receiver: Receiver<PushMessage>,
}

impl PushPump {
    pub fn new(sync: Arc<StatusSynchronizer>, config: &StatusConfig) -> Self {
        let (sender, receiver) = bounded(config.push_buffer_size);
        Self {
            sync,
            status_event: config.status_event.clone(),
            sender,
            receiver,
        }
    }

    /// Sending side, for the transport.
    pub fn sender(&self) -> Sender<PushMessage> {
        self.sender.clone()
    }

    /// Handle one message. Returns `None` for events other than the status
    /// event.
    pub fn handle(&self, message: &PushMessage) -> Option<Result<UpdateSummary, StatusError>> {
        route(&self.sync, &self.status_event, message)
    }

    /// Apply everything already queued, without blocking.
    pub fn pump_pending(&self) -> PumpStats {
        let mut stats = PumpStats::default();
        while let Ok(message) = self.receiver.try_recv() {
            tally(self.handle(&message), &mut stats);
        }
        stats
    }

    /// Apply messages until none arrives for `idle`.
    pub fn pump_for(&self, idle: Duration) -> PumpStats {
        let mut stats = PumpStats::default();
        while let Ok(message) = self.receiver.recv_timeout(idle) {
            tally(self.handle(&message), &mut stats);
        }
        stats
    }

    /// Apply messages until every sender handed out by [`sender`](Self::sender)
    /// has been dropped.
    pub fn run(self) -> PumpStats {
        let PushPump {
            sync,
            status_event,
            sender,
            receiver,
        } = self;
        // Our own sender would keep the channel open forever.
        drop(sender);

        let mut stats = PumpStats::default();
        while let Ok(message) = receiver.recv() {
            tally(route(&sync, &status_event, &message), &mut stats);
        }
        tracing::debug!(
            applied = stats.applied,
            ignored = stats.ignored,
            rejected = stats.rejected,
            "push channel closed"
        );
        stats
    }
}

fn route(
    sync: &StatusSynchronizer,
    status_event: &str,
    message: &PushMessage,
) -> Option<Result<UpdateSummary, StatusError>> {
    if message.event != status_event {
        tracing::debug!(event = message.event.as_str(), "ignoring push event");
        return None;
    }
    Some(sync.update(&message.payload))
}

fn tally(outcome: Option<Result<UpdateSummary, StatusError>>, stats: &mut PumpStats) {
    match outcome {
        None => stats.ignored += 1,
        Some(Ok(_)) => stats.applied += 1,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "push update rejected");
            stats.rejected += 1;
        }
    }
}
