//! Background tasks.
//!
//! The [`Scheduler`] runs each registered [`ScheduledTask`] on its own fixed
//! interval until shutdown is broadcast. A failed run is logged and the task
//! simply waits for its next tick.

mod non_subscribed;
mod scheduler;
mod self_ping;

use thiserror::Error;

use crate::notification::DispatchError;

pub use non_subscribed::{upgrade_payload, NonSubscribedNotifier};
pub use scheduler::{ScheduledTask, Scheduler};
pub use self_ping::SelfPingTask;

/// Errors from a single task run. Never propagated past the scheduler.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Health probe failed: {0}")]
    Probe(String),

    #[error("Health probe request failed: {0}")]
    Request(#[from] reqwest::Error),
}
