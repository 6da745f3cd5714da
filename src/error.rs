use thiserror::Error;

use crate::models::DeliveryStatus;

/// Errors surfaced by a [`crate::service::MessageService`].
///
/// Unknown ids are not errors: lookups return an empty list or `None`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("message service unavailable: {0}")]
    Unavailable(String),

    #[error("service event channel closed")]
    ChannelClosed,
}

/// Rejected delivery status change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("invalid delivery transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;
