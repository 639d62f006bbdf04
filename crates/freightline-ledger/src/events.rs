//! Event bus: an append-only journal plus a live broadcast feed.
//!
//! Every published event is stamped with a sequence number and kept in the
//! journal, so late observers can catch up with [`EventBus::events_since`].
//! Live observers get the same envelopes through a `tokio::sync::broadcast`
//! receiver. A lagging receiver loses live events but never the journal.
//!
//! The journal is unbounded and lives as long as the ledger: it is the
//! replay source for at-least-once delivery, so any sequence ever handed
//! out stays resolvable. Memory grows by one envelope per state change.
//! Deployments that need a cap should persist and truncate outside this
//! process; `events_since` never reports a gap.

use chrono::Utc;
use freightline_types::{EventEnvelope, FreightEvent};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    /// Every envelope since startup; index `n` holds sequence `n + 1`.
    journal: Mutex<Vec<EventEnvelope>>,
}

impl EventBus {
    /// `capacity` bounds how many live events a slow receiver may fall
    /// behind before it lags.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Append `event` to the journal and broadcast it. Returns its sequence.
    pub fn publish(&self, event: FreightEvent) -> u64 {
        let mut journal = self.journal.lock();
        let sequence = journal.len() as u64 + 1;
        let envelope = EventEnvelope {
            sequence,
            at: Utc::now(),
            event,
        };
        journal.push(envelope.clone());

        let name = envelope.event.name();
        match self.sender.send(envelope) {
            Ok(receivers) => debug!(sequence, event = name, receivers, "Event published"),
            Err(_) => debug!(sequence, event = name, "Event journaled (no live receivers)"),
        }
        sequence
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Journaled events with a sequence greater than `after`, in order.
    #[must_use]
    pub fn events_since(&self, after: u64) -> Vec<EventEnvelope> {
        let journal = self.journal.lock();
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(journal.len());
        journal[start..].to_vec()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.journal.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.journal.lock().is_empty()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
