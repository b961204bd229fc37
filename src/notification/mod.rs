//! Notification pipeline: audience resolution and fanout dispatch.
//!
//! # Flow
//!
//! 1. [`AudienceResolver`] turns an [`Audience`] into device tokens
//! 2. [`FanoutDispatcher`] hands the payload and tokens to the transport
//!    and aggregates per-token outcomes into a [`DispatchResult`]
//!
//! [`NotificationService`] composes the two for HTTP handlers and
//! scheduled tasks.

mod audience;
mod dispatcher;
mod service;
mod types;

use thiserror::Error;

use crate::store::StoreError;
use crate::transport::TransportError;

pub use audience::{filter_tokens, Audience, AudienceResolver, ResolvedAudience};
pub use dispatcher::{DispatcherStats, DispatcherStatsSnapshot, FanoutDispatcher};
pub use service::{BroadcastOutcome, NotificationService};
pub use types::{
    DeliveryOutcome, DeviceToken, DispatchResult, NotificationPayload, TokenResponse,
    DEFAULT_BODY, DEFAULT_TITLE,
};

/// Errors that abort a dispatch workflow.
///
/// Per-token delivery failures are not errors; they are counted in
/// [`DispatchResult`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
