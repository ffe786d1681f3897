//! Event types for the torquecal event system
//!
//! Provides shared event definitions and the EventBus used by the worksheet
//! session to publish state changes to whatever UI is attached.

mod worksheet_types;

pub use worksheet_types::{EnvironmentPhase, SavePolicy, SaveStatus, StageId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Worksheet event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI. Every variant carries the job it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalibEvent {
    /// Workflow moved to another stage
    StageChanged {
        job_id: Uuid,
        from: StageId,
        to: StageId,
        timestamp: DateTime<Utc>,
    },

    /// Draft save status changed
    ///
    /// Triggers:
    /// - UI: update the "saving / saved / error" indicator
    SaveStatusChanged {
        job_id: Uuid,
        status: SaveStatus,
        timestamp: DateTime<Utc>,
    },

    /// Repeatability step enabled
    StepAdded {
        job_id: Uuid,
        stage: StageId,
        step_key: u32,
        timestamp: DateTime<Utc>,
    },

    /// Repeatability step disabled
    StepRemoved {
        job_id: Uuid,
        stage: StageId,
        step_key: u32,
        timestamp: DateTime<Utc>,
    },

    /// Standard snapshot replaced by the authoritative backend result
    StandardsRefreshed {
        job_id: Uuid,
        /// True when an existing selection was replaced
        recomputed: bool,
        standard_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Standard refresh failed; displayed standards may be stale
    StandardsRefreshFailed {
        job_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Environment reading stored for PRE/POST check
    EnvironmentRecorded {
        job_id: Uuid,
        phase: EnvironmentPhase,
        is_valid: bool,
        warnings: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Record lock state changed
    LockChanged {
        job_id: Uuid,
        is_locked: bool,
        locked_by: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Job completed
    JobFinished {
        job_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Uncertainty calculation failed after completion
    UncertaintyCalculationFailed {
        job_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Job terminated before completion
    JobTerminated {
        job_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl CalibEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            CalibEvent::StageChanged { .. } => "StageChanged",
            CalibEvent::SaveStatusChanged { .. } => "SaveStatusChanged",
            CalibEvent::StepAdded { .. } => "StepAdded",
            CalibEvent::StepRemoved { .. } => "StepRemoved",
            CalibEvent::StandardsRefreshed { .. } => "StandardsRefreshed",
            CalibEvent::StandardsRefreshFailed { .. } => "StandardsRefreshFailed",
            CalibEvent::EnvironmentRecorded { .. } => "EnvironmentRecorded",
            CalibEvent::LockChanged { .. } => "LockChanged",
            CalibEvent::JobFinished { .. } => "JobFinished",
            CalibEvent::UncertaintyCalculationFailed { .. } => "UncertaintyCalculationFailed",
            CalibEvent::JobTerminated { .. } => "JobTerminated",
        }
    }

    /// Job this event belongs to
    pub fn job_id(&self) -> Uuid {
        match self {
            CalibEvent::StageChanged { job_id, .. }
            | CalibEvent::SaveStatusChanged { job_id, .. }
            | CalibEvent::StepAdded { job_id, .. }
            | CalibEvent::StepRemoved { job_id, .. }
            | CalibEvent::StandardsRefreshed { job_id, .. }
            | CalibEvent::StandardsRefreshFailed { job_id, .. }
            | CalibEvent::EnvironmentRecorded { job_id, .. }
            | CalibEvent::LockChanged { job_id, .. }
            | CalibEvent::JobFinished { job_id, .. }
            | CalibEvent::UncertaintyCalculationFailed { job_id, .. }
            | CalibEvent::JobTerminated { job_id, .. } => *job_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use torquecal_common::events::{CalibEvent, EventBus, StageId};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CalibEvent::StageChanged {
///     job_id: uuid::Uuid::new_v4(),
///     from: StageId::PreCheck,
///     to: StageId::Repeatability,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "StageChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CalibEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CalibEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CalibEvent,
    ) -> Result<usize, broadcast::error::SendError<CalibEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CalibEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Event dropped: no subscribers");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
