use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::experiment::{ChaosType, ExperimentPhase, ExperimentStatus};

#[derive(Debug, Clone)]
pub enum ExperimentEvent {
    Started {
        experiment_id: String,
        chaos_type: ChaosType,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        experiment_id: String,
        phase: ExperimentPhase,
    },
    ActuatorInvoked {
        experiment_id: String,
        chaos_type: ChaosType,
        success: bool,
    },
    RollbackStarted {
        experiment_id: String,
    },
    RollbackStepCompleted {
        experiment_id: String,
        description: String,
        success: bool,
    },
    Completed {
        experiment_id: String,
        status: ExperimentStatus,
        at: DateTime<Utc>,
    },
    Failed {
        experiment_id: String,
        error: String,
    },
}

/// Sink for experiment lifecycle events. The runner fans every transition
/// out to all registered sinks; a sink failing (panicking aside) never
/// affects the experiment itself.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: ExperimentEvent);
}

/// Channel-based event sink that forwards events to a receiver, e.g. for a
/// dashboard or websocket fan-out in `chaos-api`.
pub struct ChannelEventSink {
    tx: tokio::sync::mpsc::UnboundedSender<ExperimentEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<ExperimentEvent>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: ExperimentEvent) {
        let _ = self.tx.send(event);
    }
}

/// Default sink used when no richer fan-out is configured.
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: ExperimentEvent) {
        tracing::info!(?event, "experiment_event");
    }
}
