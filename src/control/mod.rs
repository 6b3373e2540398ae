mod controller;
mod scheduler;

pub use controller::*;
pub use scheduler::Scheduler;

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::time::Duration;

use crate::api::{ApiError, CampsiteState, Utility};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("{0} is read-only")]
    ReadOnly(Utility),

    #[error("{0} is already updating")]
    Busy(Utility),

    #[error("campsite state has not been loaded")]
    NotLoaded,

    #[error("device is offline")]
    DeviceOffline,

    #[error("device was last seen at {0}")]
    DeviceStale(DateTime<Utc>),

    #[error("command failed: {0}")]
    Command(#[from] ApiError),
}

#[derive(Debug,Clone)]
pub struct ControllerSettings {
    /// from command success to the reconciliation fetch
    pub reconcile_delay: Duration,
    /// from command settle to clearing the busy flag
    pub busy_clear_delay: Duration,
    /// devices silent for longer than this refuse commands
    pub stale_after: Option<Duration>
}

impl Default for ControllerSettings {
    fn default() -> Self {
        ControllerSettings {
            reconcile_delay: Duration::from_millis(2500),
            busy_clear_delay: Duration::from_millis(3000),
            stale_after: None
        }
    }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default)]
pub enum ControlPhase {
    #[default]
    Idle,
    /// command sent, optimistic value shown
    InFlight { previous: bool, desired: bool },
    /// command accepted, waiting for the reconciliation fetch
    AwaitingReconcile { desired: bool }
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default)]
pub enum BarrierMotion {
    #[default]
    Idle,
    Opening,
    Closing
}

/// Published by the controller for whoever displays the campsite
#[derive(Debug,Clone,PartialEq)]
pub enum ControlEvent {
    Refreshed { state: CampsiteState },
    Blocked { utility: Utility, reason: String },
    Projected { utility: Utility, value: bool },
    Reconciled { utility: Utility, state: CampsiteState },
    ReconcileFailed { utility: Utility, reason: String },
    RolledBack { utility: Utility, value: bool, reason: String },
    BusyCleared { utility: Utility }
}

impl fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlEvent::Refreshed { state } => write!(f, "state: {}", state),
            ControlEvent::Blocked { utility, reason } => write!(f, "{}: blocked, {}", utility, reason),
            ControlEvent::Projected { utility, value } => write!(f, "{}: switching {}", utility, if *value { "on" } else { "off" }),
            ControlEvent::Reconciled { utility, state } => write!(f, "{}: confirmed, {}", utility, state),
            ControlEvent::ReconcileFailed { utility, reason } => write!(f, "{}: could not confirm state, {}", utility, reason),
            ControlEvent::RolledBack { utility, value, reason } => write!(f, "{}: failed, back {} ({})", utility, if *value { "on" } else { "off" }, reason),
            ControlEvent::BusyCleared { utility } => write!(f, "{}: ready", utility)
        }
    }
}
