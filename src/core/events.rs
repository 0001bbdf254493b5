//! Structured progress events emitted while discovering and running a tournament.
//!
//! Callers plug in an [`EventSink`] to receive them: [`TracingSink`] logs them,
//! [`ChannelSink`] forwards them to a UI progress stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{CuisineLabel, CuisineMatch};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    GridBuilt {
        points: usize,
    },
    AreaSearched {
        index: usize,
        total: usize,
        fetched: usize,
        unique_total: usize,
    },
    AreaFailed {
        index: usize,
        reason: String,
    },
    Categorized {
        distribution: BTreeMap<CuisineLabel, usize>,
    },
    InsufficientVariety {
        found: usize,
    },
    TournamentStarted {
        cuisines: Vec<CuisineLabel>,
        matchup: CuisineMatch,
    },
    RoundAdvanced {
        round: u32,
        matchup: CuisineMatch,
        remaining: usize,
    },
    TournamentFinished {
        winner: CuisineLabel,
        rounds: u32,
    },
}

/// Event plus the run it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub run_id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DiscoveryEvent,
}

impl EventEnvelope {
    pub fn new(run_id: Uuid, event: DiscoveryEvent) -> Self {
        Self {
            run_id,
            at: Utc::now(),
            event,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, envelope: EventEnvelope);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _envelope: EventEnvelope) {}
}

/// Writes events to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, envelope: EventEnvelope) {
        let run_id = envelope.run_id;
        match &envelope.event {
            DiscoveryEvent::AreaSearched { index, total, fetched, unique_total } => {
                tracing::debug!(%run_id, index, total, fetched, unique_total, "area searched");
            }
            DiscoveryEvent::AreaFailed { index, reason } => {
                tracing::warn!(%run_id, index, reason = %reason, "area search failed");
            }
            DiscoveryEvent::InsufficientVariety { found } => {
                tracing::info!(%run_id, found, "not enough cuisine variety");
            }
            other => {
                let payload = serde_json::to_string(other).unwrap_or_default();
                tracing::info!(%run_id, event = %payload, "discovery event");
            }
        }
    }
}

/// Forwards events into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, envelope: EventEnvelope) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        let run_id = Uuid::new_v4();

        sink.emit(EventEnvelope::new(run_id, DiscoveryEvent::GridBuilt { points: 5 }));
        sink.emit(EventEnvelope::new(
            run_id,
            DiscoveryEvent::InsufficientVariety { found: 1 },
        ));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.run_id, run_id);
        assert_eq!(first.event, DiscoveryEvent::GridBuilt { points: 5 });
        assert_eq!(
            rx.try_recv().unwrap().event,
            DiscoveryEvent::InsufficientVariety { found: 1 }
        );
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(EventEnvelope::new(Uuid::new_v4(), DiscoveryEvent::GridBuilt { points: 1 }));
    }

    #[test]
    fn test_envelope_serializes_flat() {
        let envelope = EventEnvelope::new(
            Uuid::nil(),
            DiscoveryEvent::TournamentFinished {
                winner: "Thai".to_string(),
                rounds: 3,
            },
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event"], "tournament_finished");
        assert_eq!(json["winner"], "Thai");
        assert_eq!(json["rounds"], 3);
    }
}
